use core::str::FromStr;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use herraton_core::{Contractor, DocumentType, DomainError, InvoiceRequest, InvoiceResult};
use herraton_infra::{Auth, HttpTransport, OutboundRequest, parse_body};

use crate::error::InvoiceError;

/// Supported invoicing services.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Vendor {
    Wfirma,
    QuickBooks,
}

impl Vendor {
    pub fn as_str(&self) -> &'static str {
        match self {
            Vendor::Wfirma => "wfirma",
            Vendor::QuickBooks => "quickbooks",
        }
    }
}

impl core::fmt::Display for Vendor {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Vendor {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "wfirma" => Ok(Vendor::Wfirma),
            "quickbooks" => Ok(Vendor::QuickBooks),
            other => Err(DomainError::validation(format!("unknown vendor: {other}"))),
        }
    }
}

/// Vendor-side customer identifier, valid for the current request only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomerRef {
    pub id: String,
    /// Whether the customer was created during this request.
    pub created: bool,
}

/// Authentication material for the calls of one request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VendorSession {
    headers: Vec<(String, String)>,
    auth: Option<Auth>,
}

impl VendorSession {
    pub fn with_headers(headers: Vec<(String, String)>) -> Self {
        Self {
            headers,
            auth: None,
        }
    }

    pub fn with_bearer(token: impl Into<String>) -> Self {
        Self {
            headers: vec![("Accept".to_string(), "application/json".to_string())],
            auth: Some(Auth::Bearer(token.into())),
        }
    }

    /// Attach the session's credentials to an outbound request.
    pub fn apply(&self, mut request: OutboundRequest) -> OutboundRequest {
        request.headers.extend(self.headers.iter().cloned());
        if let Some(auth) = &self.auth {
            request.auth = Some(auth.clone());
        }
        request
    }
}

/// One invoicing service.
///
/// Adapters own everything vendor-specific: authentication, lookup query
/// syntax, payload schema and the success convention of responses. The
/// `DocumentType` is always passed in by the caller and forwarded as-is.
#[async_trait]
pub trait VendorAdapter: Send + Sync {
    fn vendor(&self) -> Vendor;

    /// Obtain the credentials used by the following calls.
    async fn authorize(&self, transport: &dyn HttpTransport) -> Result<VendorSession, InvoiceError>;

    /// Find the customer by exact display name, creating it when absent.
    async fn resolve_customer(
        &self,
        transport: &dyn HttpTransport,
        session: &VendorSession,
        contractor: &Contractor,
    ) -> Result<CustomerRef, InvoiceError>;

    /// Build the create-document call.
    fn shape_document(
        &self,
        session: &VendorSession,
        request: &InvoiceRequest,
        document_type: DocumentType,
        customer: &CustomerRef,
        issue_date: NaiveDate,
    ) -> OutboundRequest;

    /// Normalize the create-document response.
    fn parse_result(
        &self,
        document_type: DocumentType,
        body: &JsonValue,
    ) -> Result<InvoiceResult, InvoiceError>;
}

/// Send a request and parse its body as JSON, whatever the status code.
///
/// Vendors put their error details in the body, so status handling is left
/// to the adapter.
pub async fn send_json(
    transport: &dyn HttpTransport,
    vendor: Vendor,
    request: OutboundRequest,
) -> Result<(u16, JsonValue), InvoiceError> {
    let response = transport
        .send(request)
        .await
        .map_err(|source| InvoiceError::Transport { vendor, source })?;

    let body = parse_body(&response.body).map_err(|malformed| {
        tracing::warn!(%vendor, status = response.status, "vendor body is not JSON");
        InvoiceError::VendorResponseParse {
            vendor,
            reason: malformed.reason,
            raw: malformed.excerpt,
        }
    })?;

    Ok((response.status, body))
}

#[cfg(test)]
mod tests {
    use super::*;
    use herraton_infra::Method;
    use herraton_infra::http::MockTransport;

    #[test]
    fn vendor_names_round_trip_through_paths() {
        assert_eq!("QuickBooks".parse::<Vendor>().unwrap(), Vendor::QuickBooks);
        assert_eq!(Vendor::Wfirma.to_string(), "wfirma");
        assert!("fakturownia".parse::<Vendor>().is_err());
    }

    #[test]
    fn session_attaches_headers_and_auth() {
        let session = VendorSession::with_bearer("abc");
        let req = session.apply(OutboundRequest::get("https://x.test/q"));

        assert_eq!(req.auth, Some(Auth::Bearer("abc".to_string())));
        assert!(req.headers.iter().any(|(k, v)| k == "Accept" && v == "application/json"));
    }

    #[tokio::test]
    async fn html_error_page_becomes_parse_error_with_bounded_details() {
        let page = format!("<!DOCTYPE html><html><body>{}</body></html>", "Bad gateway ".repeat(200));
        let mock = MockTransport::new().reply(Method::Post, "/x", 502, page);

        let err = send_json(&mock, Vendor::Wfirma, OutboundRequest::post("https://x.test/x"))
            .await
            .unwrap_err();

        match err {
            InvoiceError::VendorResponseParse { raw, .. } => {
                assert!(raw.chars().count() <= 500);
                assert!(raw.starts_with("<!DOCTYPE html>"));
            }
            other => panic!("expected VendorResponseParse, got {other:?}"),
        }
    }
}
