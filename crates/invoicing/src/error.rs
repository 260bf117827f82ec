use serde_json::Value as JsonValue;
use thiserror::Error;

use herraton_core::{DomainError, InvoiceResult};
use herraton_infra::{DETAILS_LIMIT, TransportError, truncate_chars};

use crate::adapter::Vendor;

/// Failure of one invoice request. None of these are retried by the proxy.
///
/// `raw` fields hold the vendor payload, already cut to `DETAILS_LIMIT` characters.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum InvoiceError {
    /// Required credentials are missing. Raised before any network call.
    #[error("{vendor} is not configured: missing {}", .missing.join(", "))]
    Configuration {
        vendor: Vendor,
        missing: Vec<&'static str>,
    },

    /// The request itself is malformed. Raised before any network call.
    #[error("invalid invoice request: {0}")]
    InvalidRequest(#[from] DomainError),

    /// The vendor refused to issue an access token.
    #[error("{vendor} authorization failed: {message}")]
    Authorization {
        vendor: Vendor,
        message: String,
        raw: String,
    },

    /// The vendor rejected the customer lookup query.
    #[error("{vendor} customer lookup failed: {message}")]
    CustomerLookup {
        vendor: Vendor,
        message: String,
        raw: String,
    },

    /// The vendor did not return an identifier for the new customer.
    #[error("{vendor} customer creation failed: {message}")]
    CustomerCreation {
        vendor: Vendor,
        message: String,
        raw: String,
    },

    /// The vendor body was not JSON.
    #[error("{vendor} returned an unreadable response: {reason}")]
    VendorResponseParse {
        vendor: Vendor,
        reason: String,
        raw: String,
    },

    /// The vendor explicitly rejected the document.
    #[error("{message}")]
    DocumentCreation {
        vendor: Vendor,
        message: String,
        raw: String,
    },

    #[error("{vendor} request failed: {source}")]
    Transport {
        vendor: Vendor,
        source: TransportError,
    },
}

impl InvoiceError {
    /// Stable machine-readable code for API responses and logs.
    pub fn code(&self) -> &'static str {
        match self {
            InvoiceError::Configuration { .. } => "configuration_error",
            InvoiceError::InvalidRequest(_) => "invalid_request",
            InvoiceError::Authorization { .. } => "authorization_error",
            InvoiceError::CustomerLookup { .. } => "customer_lookup_error",
            InvoiceError::CustomerCreation { .. } => "customer_creation_error",
            InvoiceError::VendorResponseParse { .. } => "vendor_response_parse_error",
            InvoiceError::DocumentCreation { .. } => "document_creation_error",
            InvoiceError::Transport { .. } => "transport_error",
        }
    }

    /// Diagnostic payload for the caller (bounded).
    pub fn details(&self) -> Option<String> {
        match self {
            InvoiceError::Configuration { missing, .. } => Some(missing.join(", ")),
            InvoiceError::InvalidRequest(_) => None,
            InvoiceError::Authorization { raw, .. }
            | InvoiceError::CustomerLookup { raw, .. }
            | InvoiceError::CustomerCreation { raw, .. }
            | InvoiceError::VendorResponseParse { raw, .. }
            | InvoiceError::DocumentCreation { raw, .. } => Some(raw.clone()),
            InvoiceError::Transport { source, .. } => Some(source.to_string()),
        }
    }

    /// Failure-shaped `InvoiceResult` for this error.
    pub fn to_result(&self) -> InvoiceResult {
        InvoiceResult::failed(self.to_string(), self.details())
    }
}

/// Vendor payload rendered for error details, cut to `DETAILS_LIMIT` characters.
pub(crate) fn bounded(value: &JsonValue) -> String {
    truncate_chars(&value.to_string(), DETAILS_LIMIT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn configuration_error_lists_missing_keys() {
        let err = InvoiceError::Configuration {
            vendor: Vendor::Wfirma,
            missing: vec!["accessKey", "secretKey"],
        };

        assert_eq!(err.to_string(), "wfirma is not configured: missing accessKey, secretKey");
        assert_eq!(err.details().as_deref(), Some("accessKey, secretKey"));
        assert_eq!(err.code(), "configuration_error");
    }

    #[test]
    fn document_error_surfaces_vendor_message_verbatim() {
        let err = InvoiceError::DocumentCreation {
            vendor: Vendor::QuickBooks,
            message: "Business Validation Error: Missing TaxCode".to_string(),
            raw: bounded(&json!({"Fault": {}})),
        };
        let result = err.to_result();

        assert!(!result.success);
        assert_eq!(result.error.as_deref(), Some("Business Validation Error: Missing TaxCode"));
        assert_eq!(result.details.as_deref(), Some("{\"Fault\":{}}"));
    }

    #[test]
    fn bounded_details_are_capped() {
        let big = json!({"blob": "x".repeat(5_000)});
        assert_eq!(bounded(&big).chars().count(), DETAILS_LIMIT);
    }
}
