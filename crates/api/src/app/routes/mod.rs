use axum::{Router, routing::post};

pub mod invoices;
pub mod notifications;
pub mod system;

/// Router for the outbound-service endpoints.
pub fn router() -> Router {
    Router::new()
        .route("/invoices/:vendor", post(invoices::create_invoice))
        .route("/notifications/push", post(notifications::send_push))
        .route("/email", post(notifications::send_email))
}
