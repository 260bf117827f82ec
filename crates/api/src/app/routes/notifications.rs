use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::Extension;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;

use herraton_notifications::{EmailRequest, PushRequest};

use crate::app::services::AppServices;
use crate::app::{dto, errors};

pub async fn send_push(
    Extension(services): Extension<Arc<AppServices>>,
    body: Result<Json<PushRequest>, JsonRejection>,
) -> axum::response::Response {
    let request = match dto::json_body(body) {
        Ok(r) => r,
        Err(response) => return response,
    };

    match services.push.dispatch(request).await {
        Ok(report) => (StatusCode::OK, Json(dto::PushResponse::from(report))).into_response(),
        Err(err) => errors::push_error_to_response(&err),
    }
}

pub async fn send_email(
    Extension(services): Extension<Arc<AppServices>>,
    body: Result<Json<EmailRequest>, JsonRejection>,
) -> axum::response::Response {
    let request = match dto::json_body(body) {
        Ok(r) => r,
        Err(response) => return response,
    };

    match services.email.send(request).await {
        Ok(receipt) => (StatusCode::OK, Json(dto::EmailResponse::from(receipt))).into_response(),
        Err(err) => errors::email_error_to_response(&err),
    }
}
