//! Recording transport for tests.
//!
//! Routes match on method + URL fragment, in registration order. Each route
//! replays its queued replies in order and keeps repeating the last one.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value as JsonValue;

use super::r#trait::{HttpTransport, InboundResponse, Method, OutboundRequest, TransportError};

#[derive(Debug, Clone)]
enum Reply {
    Respond(InboundResponse),
    Fail(String),
}

#[derive(Debug)]
struct Route {
    method: Method,
    fragment: String,
    replies: VecDeque<Reply>,
}

#[derive(Debug, Default)]
pub struct MockTransport {
    routes: Mutex<Vec<Route>>,
    requests: Mutex<Vec<OutboundRequest>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a raw text reply.
    pub fn reply(self, method: Method, fragment: &str, status: u16, body: impl Into<String>) -> Self {
        self.push(method, fragment, Reply::Respond(InboundResponse::new(status, body)))
    }

    /// Queue a JSON reply.
    pub fn reply_json(self, method: Method, fragment: &str, status: u16, body: JsonValue) -> Self {
        self.reply(method, fragment, status, body.to_string())
    }

    /// Queue a reply with response headers.
    pub fn reply_with_headers(
        self,
        method: Method,
        fragment: &str,
        status: u16,
        headers: &[(&str, &str)],
        body: impl Into<String>,
    ) -> Self {
        let mut response = InboundResponse::new(status, body);
        response.headers = headers
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        self.push(method, fragment, Reply::Respond(response))
    }

    /// Queue a transport-level failure.
    pub fn fail(self, method: Method, fragment: &str, message: &str) -> Self {
        self.push(method, fragment, Reply::Fail(message.to_string()))
    }

    /// Every request sent so far, in order.
    pub fn requests(&self) -> Vec<OutboundRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    /// Number of requests whose URL contains `fragment`.
    pub fn calls_to(&self, fragment: &str) -> usize {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.url.contains(fragment))
            .count()
    }

    /// Requests whose URL contains `fragment`, in order.
    pub fn requests_to(&self, fragment: &str) -> Vec<OutboundRequest> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.url.contains(fragment))
            .cloned()
            .collect()
    }

    fn push(self, method: Method, fragment: &str, reply: Reply) -> Self {
        {
            let mut routes = self.routes.lock().unwrap();
            match routes
                .iter_mut()
                .find(|r| r.method == method && r.fragment == fragment)
            {
                Some(route) => route.replies.push_back(reply),
                None => routes.push(Route {
                    method,
                    fragment: fragment.to_string(),
                    replies: VecDeque::from([reply]),
                }),
            }
        }
        self
    }
}

#[async_trait]
impl HttpTransport for MockTransport {
    async fn send(&self, request: OutboundRequest) -> Result<InboundResponse, TransportError> {
        self.requests.lock().unwrap().push(request.clone());

        let reply = {
            let mut routes = self.routes.lock().unwrap();
            let route = routes
                .iter_mut()
                .find(|r| r.method == request.method && request.url.contains(&r.fragment));

            match route {
                Some(route) if route.replies.len() > 1 => route.replies.pop_front(),
                Some(route) => route.replies.front().cloned(),
                None => None,
            }
        };

        match reply {
            Some(Reply::Respond(response)) => Ok(response),
            Some(Reply::Fail(message)) => Err(TransportError::Request {
                url: request.url,
                message,
            }),
            None => Err(TransportError::Request {
                url: request.url,
                message: "no mock route registered".to_string(),
            }),
        }
    }
}
