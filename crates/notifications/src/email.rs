//! Transactional email through MailerSend.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue, json};
use thiserror::Error;

use herraton_infra::{
    DETAILS_LIMIT, HttpTransport, OutboundRequest, TransportError, parse_body, truncate_chars,
};

pub const MAILERSEND_API_URL: &str = "https://api.mailersend.com";

/// API token and the sender identity used for every message.
#[derive(Debug, Clone, PartialEq)]
pub struct MailerSendCredentials {
    pub api_token: Option<String>,
    pub from_email: Option<String>,
    pub from_name: Option<String>,
    pub base_url: String,
}

impl Default for MailerSendCredentials {
    fn default() -> Self {
        Self {
            api_token: None,
            from_email: None,
            from_name: None,
            base_url: MAILERSEND_API_URL.to_string(),
        }
    }
}

/// Base64-encoded file attached to the message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub filename: String,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailRequest {
    #[serde(default)]
    pub to_email: String,
    #[serde(default)]
    pub to_name: Option<String>,
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub text_content: Option<String>,
    #[serde(default)]
    pub html_content: Option<String>,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailReceipt {
    pub message_id: Option<String>,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EmailError {
    #[error("email is not configured: missing {}", .missing.join(", "))]
    Configuration { missing: Vec<&'static str> },

    #[error("invalid email request: {0}")]
    InvalidRequest(String),

    #[error("mailersend rejected the message: {message}")]
    Rejected {
        status: u16,
        message: String,
        details: String,
    },

    #[error("mailersend request failed: {0}")]
    Transport(#[from] TransportError),
}

impl EmailError {
    pub fn details(&self) -> Option<String> {
        match self {
            EmailError::Configuration { missing } => Some(missing.join(", ")),
            EmailError::InvalidRequest(_) => None,
            EmailError::Rejected { details, .. } => Some(details.clone()),
            EmailError::Transport(source) => Some(source.to_string()),
        }
    }
}

pub struct EmailRelay {
    transport: Arc<dyn HttpTransport>,
    credentials: MailerSendCredentials,
}

impl EmailRelay {
    pub fn new(transport: Arc<dyn HttpTransport>, credentials: MailerSendCredentials) -> Self {
        Self {
            transport,
            credentials,
        }
    }

    #[tracing::instrument(skip_all, fields(attachments = request.attachments.len()))]
    pub async fn send(&self, request: EmailRequest) -> Result<EmailReceipt, EmailError> {
        let (api_token, from_email) = self.configured()?;
        validate(&request)?;

        let mut from = Map::new();
        from.insert("email".into(), json!(from_email));
        if let Some(name) = non_blank(&self.credentials.from_name) {
            from.insert("name".into(), json!(name));
        }

        let mut recipient = Map::new();
        recipient.insert("email".into(), json!(request.to_email.trim()));
        if let Some(name) = non_blank(&request.to_name) {
            recipient.insert("name".into(), json!(name));
        }

        let mut body = Map::new();
        body.insert("from".into(), JsonValue::Object(from));
        body.insert("to".into(), json!([recipient]));
        body.insert("subject".into(), json!(request.subject.trim()));
        if let Some(text) = non_blank(&request.text_content) {
            body.insert("text".into(), json!(text));
        }
        if let Some(html) = non_blank(&request.html_content) {
            body.insert("html".into(), json!(html));
        }
        if !request.attachments.is_empty() {
            let attachments: Vec<JsonValue> = request
                .attachments
                .iter()
                .map(|a| {
                    json!({
                        "content": a.content,
                        "filename": a.filename,
                        "disposition": "attachment",
                    })
                })
                .collect();
            body.insert("attachments".into(), JsonValue::Array(attachments));
        }

        let outbound = OutboundRequest::post(format!(
            "{}/v1/email",
            self.credentials.base_url.trim_end_matches('/')
        ))
        .bearer(api_token)
        .json(JsonValue::Object(body));

        let response = self.transport.send(outbound).await?;
        if !response.is_success() {
            let message = parse_body(&response.body)
                .ok()
                .and_then(|b| b.get("message").and_then(JsonValue::as_str).map(str::to_string))
                .unwrap_or_else(|| format!("status {}", response.status));
            tracing::warn!(status = response.status, %message, "email rejected");
            return Err(EmailError::Rejected {
                status: response.status,
                message,
                details: truncate_chars(&response.body, DETAILS_LIMIT),
            });
        }

        let message_id = response.header("x-message-id").map(str::to_string);
        tracing::info!(message_id = message_id.as_deref().unwrap_or_default(), "email accepted");
        Ok(EmailReceipt { message_id })
    }

    fn configured(&self) -> Result<(&str, &str), EmailError> {
        let token = non_blank(&self.credentials.api_token);
        let from = non_blank(&self.credentials.from_email);
        match (token, from) {
            (Some(token), Some(from)) => Ok((token, from)),
            _ => {
                let mut missing = Vec::new();
                if token.is_none() {
                    missing.push("MAILERSEND_API_TOKEN");
                }
                if from.is_none() {
                    missing.push("MAILERSEND_FROM_EMAIL");
                }
                Err(EmailError::Configuration { missing })
            }
        }
    }
}

fn validate(request: &EmailRequest) -> Result<(), EmailError> {
    if request.to_email.trim().is_empty() {
        return Err(EmailError::InvalidRequest("toEmail is required".into()));
    }
    if !request.to_email.contains('@') {
        return Err(EmailError::InvalidRequest(format!(
            "toEmail is not an address: {}",
            request.to_email.trim()
        )));
    }
    if request.subject.trim().is_empty() {
        return Err(EmailError::InvalidRequest("subject is required".into()));
    }
    if non_blank(&request.text_content).is_none() && non_blank(&request.html_content).is_none() {
        return Err(EmailError::InvalidRequest(
            "textContent or htmlContent is required".into(),
        ));
    }
    for attachment in &request.attachments {
        if attachment.filename.trim().is_empty() || attachment.content.is_empty() {
            return Err(EmailError::InvalidRequest(
                "attachments need a filename and content".into(),
            ));
        }
    }
    Ok(())
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use herraton_infra::http::MockTransport;
    use herraton_infra::{Auth, Method};

    fn credentials() -> MailerSendCredentials {
        MailerSendCredentials {
            api_token: Some("mlsn.token".to_string()),
            from_email: Some("biuro@herraton.test".to_string()),
            from_name: Some("Herraton".to_string()),
            ..MailerSendCredentials::default()
        }
    }

    fn request() -> EmailRequest {
        serde_json::from_value(json!({
            "toEmail": "klient@example.test",
            "toName": "Jan Kowalski",
            "subject": "Faktura FV/77/2024",
            "textContent": "W załączniku faktura.",
            "attachments": [{"filename": "FV-77.pdf", "content": "JVBERi0xLjQK"}]
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn missing_token_makes_no_network_call() {
        let mock = Arc::new(MockTransport::new());
        let relay = EmailRelay::new(
            mock.clone(),
            MailerSendCredentials {
                api_token: None,
                ..credentials()
            },
        );

        let err = relay.send(request()).await.unwrap_err();

        assert_eq!(err, EmailError::Configuration { missing: vec!["MAILERSEND_API_TOKEN"] });
        assert_eq!(mock.call_count(), 0);
    }

    #[tokio::test]
    async fn accepted_message_returns_message_id() {
        let mock = Arc::new(MockTransport::new().reply_with_headers(
            Method::Post,
            "/v1/email",
            202,
            &[("X-Message-Id", "5e42957d51f1d94a1070a733")],
            "",
        ));
        let relay = EmailRelay::new(mock.clone(), credentials());

        let receipt = relay.send(request()).await.unwrap();

        assert_eq!(receipt.message_id.as_deref(), Some("5e42957d51f1d94a1070a733"));

        let sent = mock.requests();
        assert_eq!(sent[0].url, "https://api.mailersend.com/v1/email");
        assert_eq!(sent[0].auth, Some(Auth::Bearer("mlsn.token".to_string())));
        let body = sent[0].json_body().unwrap();
        assert_eq!(body["from"]["email"], "biuro@herraton.test");
        assert_eq!(body["to"][0]["name"], "Jan Kowalski");
        assert_eq!(body["text"], "W załączniku faktura.");
        assert!(body.get("html").is_none());
        assert_eq!(body["attachments"][0]["disposition"], "attachment");
    }

    #[tokio::test]
    async fn rejection_carries_vendor_message() {
        let mock = Arc::new(MockTransport::new().reply_json(
            Method::Post,
            "/v1/email",
            422,
            json!({"message": "The from.email domain must be verified.", "errors": {"from.email": ["not verified"]}}),
        ));
        let relay = EmailRelay::new(mock.clone(), credentials());

        let err = relay.send(request()).await.unwrap_err();

        match err {
            EmailError::Rejected { status, message, details } => {
                assert_eq!(status, 422);
                assert_eq!(message, "The from.email domain must be verified.");
                assert!(details.contains("not verified"));
            }
            other => panic!("expected Rejected, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn content_is_required() {
        let mock = Arc::new(MockTransport::new());
        let relay = EmailRelay::new(mock.clone(), credentials());
        let mut req = request();
        req.text_content = Some("  ".to_string());

        let err = relay.send(req).await.unwrap_err();

        assert!(matches!(err, EmailError::InvalidRequest(_)));
        assert_eq!(mock.call_count(), 0);
    }
}
