use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::Response;
use serde::Serialize;
use serde_json::Value as JsonValue;

use herraton_core::{DocumentType, InvoiceRequest};
use herraton_notifications::{EmailReceipt, PushReport};

use crate::app::errors;

// -------------------------
// Request DTOs
// -------------------------

pub const DOCUMENT_TYPE_FIELD: &str = "documentType";

/// Split a `POST /invoices/:vendor` body into the order and its document type.
///
/// `documentType` is required; it is never defaulted.
pub fn invoice_body(
    body: Result<axum::Json<JsonValue>, JsonRejection>,
) -> Result<(InvoiceRequest, DocumentType), Response> {
    let axum::Json(mut body) = body.map_err(|rejection| {
        errors::json_error(StatusCode::BAD_REQUEST, "invalid_json", rejection.body_text())
    })?;

    let Some(object) = body.as_object_mut() else {
        return Err(errors::json_error(
            StatusCode::BAD_REQUEST,
            "invalid_request",
            "request body must be a JSON object",
        ));
    };

    let document_type = match object.remove(DOCUMENT_TYPE_FIELD) {
        Some(JsonValue::String(raw)) => raw.parse::<DocumentType>().map_err(|e| {
            errors::json_error(StatusCode::BAD_REQUEST, "invalid_document_type", e.to_string())
        })?,
        Some(_) => {
            return Err(errors::json_error(
                StatusCode::BAD_REQUEST,
                "invalid_document_type",
                "documentType must be \"invoice\" or \"proforma\"",
            ));
        }
        None => {
            return Err(errors::json_error(
                StatusCode::BAD_REQUEST,
                "missing_document_type",
                "documentType is required",
            ));
        }
    };

    let request: InvoiceRequest = serde_json::from_value(body).map_err(|e| {
        errors::json_error(StatusCode::BAD_REQUEST, "invalid_request", e.to_string())
    })?;

    Ok((request, document_type))
}

/// Unwrap a JSON body, turning axum's rejection into the API's error shape.
pub fn json_body<T>(body: Result<axum::Json<T>, JsonRejection>) -> Result<T, Response> {
    body.map(|axum::Json(value)| value).map_err(|rejection| {
        errors::json_error(StatusCode::BAD_REQUEST, "invalid_json", rejection.body_text())
    })
}

// -------------------------
// Response DTOs
// -------------------------

#[derive(Debug, Serialize)]
pub struct PushResponse {
    pub success: bool,
    #[serde(flatten)]
    pub report: PushReport,
}

impl From<PushReport> for PushResponse {
    fn from(report: PushReport) -> Self {
        Self {
            success: true,
            report,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct EmailResponse {
    pub success: bool,
    #[serde(flatten)]
    pub receipt: EmailReceipt,
}

impl From<EmailReceipt> for EmailResponse {
    fn from(receipt: EmailReceipt) -> Self {
        Self {
            success: true,
            receipt,
        }
    }
}
