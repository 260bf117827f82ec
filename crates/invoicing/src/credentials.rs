use crate::adapter::{Vendor, VendorAdapter};
use crate::error::InvoiceError;
use crate::quickbooks::{QuickBooksAdapter, QuickBooksCredentials};
use crate::wfirma::{WfirmaAdapter, WfirmaCredentials};

/// Credentials of one invoicing service; the variant selects the adapter.
#[derive(Debug, Clone, PartialEq)]
pub enum VendorCredentials {
    Wfirma(WfirmaCredentials),
    QuickBooks(QuickBooksCredentials),
}

impl VendorCredentials {
    pub fn vendor(&self) -> Vendor {
        match self {
            VendorCredentials::Wfirma(_) => Vendor::Wfirma,
            VendorCredentials::QuickBooks(_) => Vendor::QuickBooks,
        }
    }

    /// Build the adapter, failing with `Configuration` when a required
    /// credential is missing. No network access happens here.
    pub fn adapter(&self) -> Result<Box<dyn VendorAdapter>, InvoiceError> {
        match self {
            VendorCredentials::Wfirma(c) => Ok(Box::new(WfirmaAdapter::from_credentials(c)?)),
            VendorCredentials::QuickBooks(c) => {
                Ok(Box::new(QuickBooksAdapter::from_credentials(c)?))
            }
        }
    }
}

/// Names of the credentials that are absent or blank.
pub(crate) fn missing_keys(fields: &[(&'static str, &Option<String>)]) -> Vec<&'static str> {
    fields
        .iter()
        .filter(|(_, value)| value.as_deref().map(str::trim).unwrap_or_default().is_empty())
        .map(|(name, _)| *name)
        .collect()
}

/// Value of a credential already checked by `missing_keys`.
pub(crate) fn present(value: &Option<String>) -> String {
    value.as_deref().map(str::trim).unwrap_or_default().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_values_count_as_missing() {
        let a = Some("key".to_string());
        let b = Some("  ".to_string());
        let c = None;

        assert_eq!(missing_keys(&[("a", &a), ("b", &b), ("c", &c)]), vec!["b", "c"]);
    }

    #[test]
    fn variant_selects_vendor() {
        let creds = VendorCredentials::Wfirma(WfirmaCredentials::default());
        assert_eq!(creds.vendor(), Vendor::Wfirma);

        let err = creds.adapter().err().unwrap();
        assert!(matches!(err, InvoiceError::Configuration { vendor: Vendor::Wfirma, .. }));
    }
}
