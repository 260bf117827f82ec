use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::{Value as JsonValue, json};

use herraton_invoicing::InvoiceError;
use herraton_notifications::{EmailError, PushError};

/// `{success: false, error, code, details?}` with the given status.
pub fn json_error(status: StatusCode, code: &'static str, message: impl Into<String>) -> Response {
    json_error_with_details(status, code, message, None)
}

pub fn json_error_with_details(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
    details: Option<String>,
) -> Response {
    let mut body = json!({
        "success": false,
        "error": message.into(),
        "code": code,
    });
    if let Some(details) = details {
        body["details"] = JsonValue::String(details);
    }
    (status, Json(body)).into_response()
}

pub fn invoice_error_to_response(err: &InvoiceError) -> Response {
    let status = match err {
        InvoiceError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
        InvoiceError::Configuration { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        InvoiceError::CustomerLookup { .. }
        | InvoiceError::CustomerCreation { .. }
        | InvoiceError::DocumentCreation { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        InvoiceError::Authorization { .. }
        | InvoiceError::VendorResponseParse { .. }
        | InvoiceError::Transport { .. } => StatusCode::BAD_GATEWAY,
    };
    json_error_with_details(status, err.code(), err.to_string(), err.details())
}

pub fn push_error_to_response(err: &PushError) -> Response {
    match err {
        PushError::InvalidRequest(_) => {
            json_error(StatusCode::BAD_REQUEST, "invalid_request", err.to_string())
        }
        PushError::Configuration { missing } => json_error_with_details(
            StatusCode::INTERNAL_SERVER_ERROR,
            "configuration_error",
            err.to_string(),
            Some(missing.join(", ")),
        ),
    }
}

pub fn email_error_to_response(err: &EmailError) -> Response {
    let (status, code) = match err {
        EmailError::InvalidRequest(_) => (StatusCode::BAD_REQUEST, "invalid_request"),
        EmailError::Configuration { .. } => (StatusCode::INTERNAL_SERVER_ERROR, "configuration_error"),
        EmailError::Rejected { .. } => (StatusCode::UNPROCESSABLE_ENTITY, "email_rejected"),
        EmailError::Transport(_) => (StatusCode::BAD_GATEWAY, "transport_error"),
    };
    json_error_with_details(status, code, err.to_string(), err.details())
}
