//! Push fan-out through the FCM HTTP v1 API.
//!
//! One `messages:send` call per device token, sent sequentially. A token that
//! fails is recorded in the report and the fan-out continues.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue, json};
use thiserror::Error;

use herraton_infra::{
    DETAILS_LIMIT, HttpTransport, InboundResponse, OutboundRequest, parse_body, truncate_chars,
};

pub const FCM_API_URL: &str = "https://fcm.googleapis.com";

/// FCM project and OAuth access token with the `firebase.messaging` scope.
#[derive(Debug, Clone, PartialEq)]
pub struct FcmCredentials {
    pub project_id: Option<String>,
    pub access_token: Option<String>,
    pub base_url: String,
}

impl Default for FcmCredentials {
    fn default() -> Self {
        Self {
            project_id: None,
            access_token: None,
            base_url: FCM_API_URL.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PushRequest {
    #[serde(default)]
    pub tokens: Vec<String>,
    pub title: String,
    pub body: String,
    #[serde(default)]
    pub data: Map<String, JsonValue>,
    #[serde(default)]
    pub icon: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushFailure {
    pub token: String,
    pub error: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PushReport {
    pub success_count: usize,
    pub failure_count: usize,
    pub failures: Vec<PushFailure>,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PushError {
    #[error("push is not configured: missing {}", .missing.join(", "))]
    Configuration { missing: Vec<&'static str> },

    #[error("invalid push request: {0}")]
    InvalidRequest(String),
}

pub struct PushDispatcher {
    transport: Arc<dyn HttpTransport>,
    credentials: FcmCredentials,
}

impl PushDispatcher {
    pub fn new(transport: Arc<dyn HttpTransport>, credentials: FcmCredentials) -> Self {
        Self {
            transport,
            credentials,
        }
    }

    #[tracing::instrument(skip_all, fields(tokens = request.tokens.len()))]
    pub async fn dispatch(&self, request: PushRequest) -> Result<PushReport, PushError> {
        let (project_id, access_token) = self.configured()?;

        let tokens: Vec<&str> = request
            .tokens
            .iter()
            .map(|t| t.trim())
            .filter(|t| !t.is_empty())
            .collect();
        if tokens.is_empty() {
            return Err(PushError::InvalidRequest("at least one device token is required".into()));
        }

        let url = format!(
            "{}/v1/projects/{project_id}/messages:send",
            self.credentials.base_url.trim_end_matches('/')
        );
        let data = stringify_data(&request.data);

        let mut report = PushReport::default();
        for token in tokens {
            let outbound = OutboundRequest::post(url.clone())
                .bearer(access_token)
                .json(message(token, &request, &data));

            let outcome = match self.transport.send(outbound).await {
                Ok(response) if response.is_success() => Ok(()),
                Ok(response) => Err(fcm_error(&response)),
                Err(err) => Err(err.to_string()),
            };

            match outcome {
                Ok(()) => report.success_count += 1,
                Err(error) => {
                    tracing::warn!(%error, "push delivery failed");
                    report.failure_count += 1;
                    report.failures.push(PushFailure {
                        token: token.to_string(),
                        error,
                    });
                }
            }
        }

        tracing::info!(
            success_count = report.success_count,
            failure_count = report.failure_count,
            "push fan-out finished"
        );
        Ok(report)
    }

    fn configured(&self) -> Result<(&str, &str), PushError> {
        let project = non_blank(&self.credentials.project_id);
        let token = non_blank(&self.credentials.access_token);
        match (project, token) {
            (Some(project), Some(token)) => Ok((project, token)),
            _ => {
                let mut missing = Vec::new();
                if project.is_none() {
                    missing.push("FCM_PROJECT_ID");
                }
                if token.is_none() {
                    missing.push("FCM_ACCESS_TOKEN");
                }
                Err(PushError::Configuration { missing })
            }
        }
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

/// FCM only accepts string values in `data`.
fn stringify_data(data: &Map<String, JsonValue>) -> BTreeMap<String, String> {
    data.iter()
        .map(|(key, value)| {
            let value = match value {
                JsonValue::String(s) => s.clone(),
                other => other.to_string(),
            };
            (key.clone(), value)
        })
        .collect()
}

fn message(token: &str, request: &PushRequest, data: &BTreeMap<String, String>) -> JsonValue {
    let mut message = json!({
        "token": token,
        "notification": { "title": request.title, "body": request.body },
    });
    if !data.is_empty() {
        message["data"] = json!(data);
    }
    if let Some(icon) = request.icon.as_deref().filter(|i| !i.trim().is_empty()) {
        message["webpush"] = json!({ "notification": { "icon": icon } });
    }
    json!({ "message": message })
}

fn fcm_error(response: &InboundResponse) -> String {
    let message = parse_body(&response.body).ok().and_then(|body| {
        body.get("error")
            .and_then(|e| e.get("message"))
            .and_then(JsonValue::as_str)
            .map(str::to_string)
    });
    match message {
        Some(message) => message,
        None => truncate_chars(
            &format!("fcm returned status {}: {}", response.status, response.body),
            DETAILS_LIMIT,
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use herraton_infra::http::MockTransport;
    use herraton_infra::{Auth, Method};

    fn credentials() -> FcmCredentials {
        FcmCredentials {
            project_id: Some("herraton".to_string()),
            access_token: Some("ya29.token".to_string()),
            ..FcmCredentials::default()
        }
    }

    fn request(tokens: &[&str]) -> PushRequest {
        serde_json::from_value(json!({
            "tokens": tokens,
            "title": "Nowe zamówienie",
            "body": "Zamówienie #42 czeka na akceptację",
            "data": {"orderId": 42, "url": "/orders/42"},
            "icon": "/icons/logo-192.png"
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn one_failing_token_does_not_stop_the_fan_out() {
        let mock = Arc::new(
            MockTransport::new()
                .reply_json(Method::Post, "messages:send", 200, json!({"name": "projects/herraton/messages/1"}))
                .reply_json(
                    Method::Post,
                    "messages:send",
                    404,
                    json!({"error": {"code": 404, "message": "Requested entity was not found.", "status": "NOT_FOUND"}}),
                )
                .reply_json(Method::Post, "messages:send", 200, json!({"name": "projects/herraton/messages/3"})),
        );
        let dispatcher = PushDispatcher::new(mock.clone(), credentials());

        let report = dispatcher.dispatch(request(&["a", "b", "c"])).await.unwrap();

        assert_eq!(report.success_count, 2);
        assert_eq!(report.failure_count, 1);
        assert_eq!(
            report.failures,
            vec![PushFailure {
                token: "b".to_string(),
                error: "Requested entity was not found.".to_string(),
            }]
        );
        assert_eq!(mock.call_count(), 3);
    }

    #[tokio::test]
    async fn message_carries_string_data_and_web_icon() {
        let mock = Arc::new(MockTransport::new().reply_json(Method::Post, "messages:send", 200, json!({})));
        let dispatcher = PushDispatcher::new(mock.clone(), credentials());

        dispatcher.dispatch(request(&["tok"])).await.unwrap();

        let sent = mock.requests();
        assert_eq!(sent[0].url, "https://fcm.googleapis.com/v1/projects/herraton/messages:send");
        assert_eq!(sent[0].auth, Some(Auth::Bearer("ya29.token".to_string())));

        let body = sent[0].json_body().unwrap();
        assert_eq!(body["message"]["token"], "tok");
        assert_eq!(body["message"]["data"]["orderId"], "42");
        assert_eq!(body["message"]["webpush"]["notification"]["icon"], "/icons/logo-192.png");
    }

    #[tokio::test]
    async fn transport_errors_count_as_failures() {
        let mock = Arc::new(MockTransport::new().fail(Method::Post, "messages:send", "connection reset"));
        let dispatcher = PushDispatcher::new(mock.clone(), credentials());

        let report = dispatcher.dispatch(request(&["a", "b"])).await.unwrap();

        assert_eq!(report.success_count, 0);
        assert_eq!(report.failure_count, 2);
    }

    #[tokio::test]
    async fn empty_token_list_is_rejected() {
        let mock = Arc::new(MockTransport::new());
        let dispatcher = PushDispatcher::new(mock.clone(), credentials());

        let err = dispatcher.dispatch(request(&["", "  "])).await.unwrap_err();

        assert!(matches!(err, PushError::InvalidRequest(_)));
        assert_eq!(mock.call_count(), 0);
    }

    #[tokio::test]
    async fn missing_project_is_a_configuration_error() {
        let mock = Arc::new(MockTransport::new());
        let dispatcher = PushDispatcher::new(
            mock.clone(),
            FcmCredentials {
                access_token: Some("t".to_string()),
                ..FcmCredentials::default()
            },
        );

        let err = dispatcher.dispatch(request(&["a"])).await.unwrap_err();

        assert_eq!(err, PushError::Configuration { missing: vec!["FCM_PROJECT_ID"] });
        assert_eq!(mock.call_count(), 0);
    }
}
