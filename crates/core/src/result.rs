use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Normalized outcome of one invoice request, independent of the vendor.
///
/// Built per request and handed back to the caller; never stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceResult {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invoice_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invoice_number: Option<String>,
    /// Vendor object the result was extracted from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<JsonValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl InvoiceResult {
    pub fn succeeded(
        invoice_id: impl Into<String>,
        invoice_number: Option<String>,
        data: JsonValue,
    ) -> Self {
        Self {
            success: true,
            invoice_id: Some(invoice_id.into()),
            invoice_number,
            data: Some(data),
            error: None,
            details: None,
        }
    }

    pub fn failed(error: impl Into<String>, details: Option<String>) -> Self {
        Self {
            success: false,
            invoice_id: None,
            invoice_number: None,
            data: None,
            error: Some(error.into()),
            details,
        }
    }
}
