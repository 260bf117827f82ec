use serde_json::{Value as JsonValue, json};

use herraton_core::VatRate;

/// How a vendor expects tax on a line item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaxScheme {
    /// Rate label per line: `"23"`, `"8"`, `"zw"`, `"np"`.
    VatPercent,
    /// Reference to a tax code defined in the vendor account.
    TaxCode { taxable: String, exempt: String },
}

impl TaxScheme {
    /// Name of the line-item field carrying the tax.
    pub fn field(&self) -> &'static str {
        match self {
            TaxScheme::VatPercent => "vat",
            TaxScheme::TaxCode { .. } => "TaxCodeRef",
        }
    }

    /// Value of the tax field for a line with the given rate.
    pub fn line_tax(&self, rate: &VatRate) -> JsonValue {
        match self {
            TaxScheme::VatPercent => JsonValue::String(rate.label()),
            TaxScheme::TaxCode { taxable, exempt } => {
                let code = if rate.is_taxable() { taxable } else { exempt };
                json!({ "value": code })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn quickbooks_codes() -> TaxScheme {
        TaxScheme::TaxCode {
            taxable: "TAX".to_string(),
            exempt: "NON".to_string(),
        }
    }

    #[test]
    fn percent_scheme_emits_rate_labels() {
        let scheme = TaxScheme::VatPercent;

        assert_eq!(scheme.field(), "vat");
        assert_eq!(scheme.line_tax(&VatRate::Percent(Decimal::new(2300, 2))), json!("23"));
        assert_eq!(scheme.line_tax(&VatRate::Exempt), json!("zw"));
        assert_eq!(scheme.line_tax(&VatRate::NotSubject), json!("np"));
    }

    #[test]
    fn code_scheme_maps_rates_to_codes() {
        let scheme = quickbooks_codes();

        assert_eq!(scheme.field(), "TaxCodeRef");
        assert_eq!(scheme.line_tax(&VatRate::default()), json!({"value": "TAX"}));
        assert_eq!(scheme.line_tax(&VatRate::Percent(Decimal::ZERO)), json!({"value": "NON"}));
        assert_eq!(scheme.line_tax(&VatRate::Exempt), json!({"value": "NON"}));
    }
}
