use std::sync::Arc;

use chrono::Utc;

use herraton_core::{DocumentType, InvoiceRequest, InvoiceResult};
use herraton_infra::HttpTransport;

use crate::adapter::send_json;
use crate::credentials::VendorCredentials;
use crate::error::InvoiceError;

/// Issues invoices and proformas through the configured vendor.
///
/// Stateless between requests: no tokens, customer ids or documents are
/// cached, so every call re-authorizes and re-resolves the customer.
#[derive(Clone)]
pub struct InvoiceProxy {
    transport: Arc<dyn HttpTransport>,
}

impl InvoiceProxy {
    pub fn new(transport: Arc<dyn HttpTransport>) -> Self {
        Self { transport }
    }

    /// Create one document of `document_type` for `request`.
    ///
    /// Configuration and request validation both fail before any network call.
    #[tracing::instrument(
        skip_all,
        fields(vendor = %credentials.vendor(), document_type = %document_type)
    )]
    pub async fn create_invoice(
        &self,
        credentials: &VendorCredentials,
        request: InvoiceRequest,
        document_type: DocumentType,
    ) -> Result<InvoiceResult, InvoiceError> {
        let adapter = credentials.adapter()?;
        request.validate()?;

        let transport = self.transport.as_ref();
        let session = adapter.authorize(transport).await?;
        let customer = adapter
            .resolve_customer(transport, &session, &request.contractor)
            .await?;

        let issue_date = request.issue_date(Utc::now().date_naive());
        let outbound =
            adapter.shape_document(&session, &request, document_type, &customer, issue_date);
        let (status, body) = send_json(transport, adapter.vendor(), outbound).await?;

        match adapter.parse_result(document_type, &body) {
            Ok(result) => {
                tracing::info!(
                    customer_id = %customer.id,
                    customer_created = customer.created,
                    invoice_id = result.invoice_id.as_deref().unwrap_or_default(),
                    invoice_number = result.invoice_number.as_deref().unwrap_or_default(),
                    "document created"
                );
                Ok(result)
            }
            Err(err) => {
                tracing::warn!(status, code = err.code(), error = %err, "vendor rejected document");
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use herraton_infra::Method;
    use herraton_infra::http::MockTransport;
    use serde_json::json;

    use crate::quickbooks::QuickBooksCredentials;
    use crate::wfirma::WfirmaCredentials;

    fn wfirma() -> VendorCredentials {
        VendorCredentials::Wfirma(WfirmaCredentials {
            access_key: Some("ak".to_string()),
            secret_key: Some("sk".to_string()),
            ..WfirmaCredentials::default()
        })
    }

    fn quickbooks() -> VendorCredentials {
        VendorCredentials::QuickBooks(QuickBooksCredentials {
            client_id: Some("cid".to_string()),
            client_secret: Some("cs".to_string()),
            realm_id: Some("1".to_string()),
            refresh_token: Some("rt".to_string()),
            ..QuickBooksCredentials::default()
        })
    }

    fn order(name: &str) -> InvoiceRequest {
        serde_json::from_value(json!({
            "contractor": {"name": name},
            "invoicecontents": [{"name": "Sofa", "count": 1, "price": 100, "vat": 23}]
        }))
        .unwrap()
    }

    fn proxy(mock: &Arc<MockTransport>) -> InvoiceProxy {
        InvoiceProxy::new(mock.clone())
    }

    fn wfirma_invoice_ok() -> serde_json::Value {
        json!({
            "status": {"code": "OK"},
            "invoices": [{"invoice": {"id": "77", "fullnumber": "FV/77/2024"}}]
        })
    }

    #[tokio::test]
    async fn issues_wfirma_invoice_end_to_end() {
        let mock = Arc::new(
            MockTransport::new()
                .reply_json(
                    Method::Post,
                    "contractors/find",
                    200,
                    json!({"status": {"code": "OK"}, "contractors": {"0": {"contractor": {"id": "5"}}, "parameters": {"total": 1}}}),
                )
                .reply_json(Method::Post, "invoices/add", 200, wfirma_invoice_ok()),
        );

        let result = proxy(&mock)
            .create_invoice(&wfirma(), order("Jan Kowalski"), DocumentType::Invoice)
            .await
            .unwrap();

        assert!(result.success);
        assert_eq!(result.invoice_id.as_deref(), Some("77"));
        assert_eq!(result.invoice_number.as_deref(), Some("FV/77/2024"));
        assert_eq!(mock.calls_to("contractors/add"), 0);
    }

    #[tokio::test]
    async fn missing_contractor_is_created_exactly_once() {
        let mock = Arc::new(
            MockTransport::new()
                .reply_json(
                    Method::Post,
                    "contractors/find",
                    200,
                    json!({"status": {"code": "OK"}, "contractors": {"parameters": {"total": 0}}}),
                )
                .reply_json(
                    Method::Post,
                    "contractors/add",
                    200,
                    json!({"status": {"code": "OK"}, "contractors": [{"contractor": {"id": "9"}}]}),
                )
                .reply_json(Method::Post, "invoices/add", 200, wfirma_invoice_ok()),
        );

        proxy(&mock)
            .create_invoice(&wfirma(), order("Nowy Klient"), DocumentType::Invoice)
            .await
            .unwrap();

        assert_eq!(mock.calls_to("contractors/add"), 1);
        let invoices = mock.requests_to("invoices/add");
        let body = invoices[0].json_body().unwrap();
        assert_eq!(body["api"]["invoices"][0]["invoice"]["contractor"]["id"], "9");
    }

    #[tokio::test]
    async fn proforma_is_forwarded_to_each_vendor() {
        let mock = Arc::new(
            MockTransport::new()
                .reply_json(
                    Method::Post,
                    "contractors/find",
                    200,
                    json!({"status": {"code": "OK"}, "contractors": [{"contractor": {"id": "5"}}]}),
                )
                .reply_json(Method::Post, "invoices/add", 200, wfirma_invoice_ok()),
        );
        proxy(&mock)
            .create_invoice(&wfirma(), order("Jan"), DocumentType::Proforma)
            .await
            .unwrap();
        let sent = mock.requests_to("invoices/add");
        assert_eq!(sent[0].json_body().unwrap()["api"]["invoices"][0]["invoice"]["type"], "proforma");

        let mock = Arc::new(
            MockTransport::new()
                .reply_json(Method::Post, "tokens/bearer", 200, json!({"access_token": "at", "refresh_token": "rt"}))
                .reply_json(Method::Get, "/query", 200, json!({"QueryResponse": {"Customer": [{"Id": "3"}]}}))
                .reply_json(Method::Post, "/estimate", 200, json!({"Estimate": {"Id": "44", "DocNumber": "1044"}})),
        );
        let result = proxy(&mock)
            .create_invoice(&quickbooks(), order("Jan"), DocumentType::Proforma)
            .await
            .unwrap();
        assert_eq!(result.invoice_id.as_deref(), Some("44"));
        assert_eq!(mock.calls_to("/invoice"), 0);
    }

    #[tokio::test]
    async fn missing_credentials_make_no_network_calls() {
        let mock = Arc::new(MockTransport::new());
        let creds = VendorCredentials::QuickBooks(QuickBooksCredentials::default());

        let err = proxy(&mock)
            .create_invoice(&creds, order("Jan"), DocumentType::Invoice)
            .await
            .unwrap_err();

        assert!(matches!(err, InvoiceError::Configuration { .. }));
        assert_eq!(mock.call_count(), 0);
    }

    #[tokio::test]
    async fn invalid_request_makes_no_network_calls() {
        let mock = Arc::new(MockTransport::new());
        let mut request = order("Jan");
        request.line_items.clear();

        let err = proxy(&mock)
            .create_invoice(&wfirma(), request, DocumentType::Invoice)
            .await
            .unwrap_err();

        assert_eq!(err.code(), "invalid_request");
        assert_eq!(mock.call_count(), 0);
    }

    #[tokio::test]
    async fn out_of_range_line_amount_makes_no_network_calls() {
        let mock = Arc::new(MockTransport::new());
        let request: InvoiceRequest = serde_json::from_value(json!({
            "contractor": {"name": "Jan"},
            "invoicecontents": [{"name": "Sofa", "count": "1000000000000000", "price": "1000000000000000", "vat": 23}]
        }))
        .unwrap();

        let err = proxy(&mock)
            .create_invoice(&quickbooks(), request, DocumentType::Invoice)
            .await
            .unwrap_err();

        assert_eq!(err.code(), "invalid_request");
        assert!(err.to_string().contains("line 1: amount out of range"));
        assert_eq!(mock.call_count(), 0);
    }

    #[tokio::test]
    async fn non_json_document_response_has_bounded_details() {
        let mock = Arc::new(
            MockTransport::new()
                .reply_json(
                    Method::Post,
                    "contractors/find",
                    200,
                    json!({"status": {"code": "OK"}, "contractors": [{"contractor": {"id": "5"}}]}),
                )
                .reply(Method::Post, "invoices/add", 503, "<html>".to_string() + &"x".repeat(2_000)),
        );

        let err = proxy(&mock)
            .create_invoice(&wfirma(), order("Jan"), DocumentType::Invoice)
            .await
            .unwrap_err();

        let result = err.to_result();
        assert!(!result.success);
        assert!(result.details.unwrap().chars().count() <= 500);
    }

    #[tokio::test]
    async fn vendor_rejection_message_is_surfaced() {
        let mock = Arc::new(
            MockTransport::new()
                .reply_json(Method::Post, "tokens/bearer", 200, json!({"access_token": "at"}))
                .reply_json(Method::Get, "/query", 200, json!({"QueryResponse": {"Customer": [{"Id": "3"}]}}))
                .reply_json(
                    Method::Post,
                    "/invoice",
                    400,
                    json!({"Fault": {"Error": [{"Message": "Business Validation Error", "Detail": "Business Validation Error"}]}}),
                ),
        );

        let err = proxy(&mock)
            .create_invoice(&quickbooks(), order("Jan"), DocumentType::Invoice)
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), "Business Validation Error");
        assert_eq!(err.code(), "document_creation_error");
    }

    #[tokio::test]
    async fn transport_failure_is_reported() {
        let mock = Arc::new(MockTransport::new().fail(Method::Post, "contractors/find", "connection refused"));

        let err = proxy(&mock)
            .create_invoice(&wfirma(), order("Jan"), DocumentType::Invoice)
            .await
            .unwrap_err();

        assert_eq!(err.code(), "transport_error");
        assert_eq!(mock.calls_to("invoices/add"), 0);
    }
}
