use core::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// Kind of document the caller wants issued.
///
/// No `Default` impl: every caller names the type it
/// wants, and adapters forward it verbatim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentType {
    /// Final VAT invoice.
    Invoice,
    /// Non-binding preliminary invoice.
    Proforma,
}

impl DocumentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentType::Invoice => "invoice",
            DocumentType::Proforma => "proforma",
        }
    }
}

impl core::fmt::Display for DocumentType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DocumentType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "invoice" => Ok(DocumentType::Invoice),
            "proforma" => Ok(DocumentType::Proforma),
            other => Err(DomainError::validation(format!(
                "unknown document type: {other}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_case_insensitively() {
        assert_eq!("Proforma".parse::<DocumentType>().unwrap(), DocumentType::Proforma);
        assert_eq!(" invoice ".parse::<DocumentType>().unwrap(), DocumentType::Invoice);
    }

    #[test]
    fn rejects_unknown_type() {
        let err = "receipt".parse::<DocumentType>().unwrap_err();
        assert!(matches!(err, DomainError::Validation(msg) if msg.contains("receipt")));
    }

    #[test]
    fn serde_uses_lowercase_names() {
        let json = serde_json::to_string(&DocumentType::Proforma).unwrap();
        assert_eq!(json, "\"proforma\"");
        let back: DocumentType = serde_json::from_str("\"invoice\"").unwrap();
        assert_eq!(back, DocumentType::Invoice);
    }
}
