use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Extension, Path};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::Value as JsonValue;

use herraton_invoicing::Vendor;

use crate::app::services::AppServices;
use crate::app::{dto, errors};

pub async fn create_invoice(
    Extension(services): Extension<Arc<AppServices>>,
    Path(vendor): Path<String>,
    body: Result<Json<JsonValue>, JsonRejection>,
) -> axum::response::Response {
    let vendor: Vendor = match vendor.parse() {
        Ok(v) => v,
        Err(_) => {
            return errors::json_error(
                StatusCode::NOT_FOUND,
                "unknown_vendor",
                format!("unknown invoicing vendor: {vendor}"),
            );
        }
    };

    let (request, document_type) = match dto::invoice_body(body) {
        Ok(parsed) => parsed,
        Err(response) => return response,
    };

    match services
        .invoices
        .create_invoice(services.credentials(vendor), request, document_type)
        .await
    {
        Ok(result) => (StatusCode::OK, Json(result)).into_response(),
        Err(err) => errors::invoice_error_to_response(&err),
    }
}
