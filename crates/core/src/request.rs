//! Invoice request as received from the order panel.
//!
//! Field names on the wire follow the order panel's JSON (`paymentdate`,
//! `invoicecontents`, `count`, ...); the Rust names describe what the fields mean.

use core::str::FromStr;

use chrono::{DateTime, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value as JsonValue;

use crate::error::{DomainError, DomainResult};

/// Billing identity of the invoice recipient.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contractor {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub street: Option<String>,
    #[serde(default)]
    pub zip: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
}

impl Contractor {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Display name used for the exact-match customer lookup.
    pub fn display_name(&self) -> &str {
        self.name.trim()
    }

    pub fn street(&self) -> Option<&str> {
        non_blank(&self.street)
    }

    pub fn zip(&self) -> Option<&str> {
        non_blank(&self.zip)
    }

    pub fn city(&self) -> Option<&str> {
        non_blank(&self.city)
    }

    pub fn email(&self) -> Option<&str> {
        non_blank(&self.email)
    }

    pub fn phone(&self) -> Option<&str> {
        non_blank(&self.phone)
    }

    /// Country code, falling back to `default` when the order carries none.
    pub fn country_or<'a>(&'a self, default: &'a str) -> &'a str {
        non_blank(&self.country).unwrap_or(default)
    }
}

/// VAT rate of a single line.
///
/// Accepts `23`, `"23"`, `"23%"`, `"zw"` (exempt) and `"np"` (not subject to VAT).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "JsonValue", into = "String")]
pub enum VatRate {
    Percent(Decimal),
    Exempt,
    NotSubject,
}

impl VatRate {
    /// Label in the `"23"` / `"zw"` / `"np"` convention.
    pub fn label(&self) -> String {
        match self {
            VatRate::Percent(p) => p.normalize().to_string(),
            VatRate::Exempt => "zw".to_string(),
            VatRate::NotSubject => "np".to_string(),
        }
    }

    /// Whether the line carries a non-zero tax.
    pub fn is_taxable(&self) -> bool {
        matches!(self, VatRate::Percent(p) if !p.is_zero())
    }
}

/// Polish standard rate; applied when a line carries no rate.
impl Default for VatRate {
    fn default() -> Self {
        VatRate::Percent(Decimal::from(23))
    }
}

impl FromStr for VatRate {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s.trim().trim_end_matches('%').trim().to_lowercase();
        match raw.as_str() {
            "zw" => return Ok(VatRate::Exempt),
            "np" => return Ok(VatRate::NotSubject),
            _ => {}
        }

        let percent = Decimal::from_str(&raw)
            .or_else(|_| Decimal::from_scientific(&raw))
            .map_err(|_| DomainError::validation(format!("invalid VAT rate: {s}")))?;

        if percent.is_sign_negative() || percent > Decimal::from(100) {
            return Err(DomainError::validation(format!(
                "VAT rate out of range: {s}"
            )));
        }

        Ok(VatRate::Percent(percent))
    }
}

impl TryFrom<JsonValue> for VatRate {
    type Error = DomainError;

    fn try_from(value: JsonValue) -> Result<Self, Self::Error> {
        match value {
            JsonValue::String(s) => s.parse(),
            JsonValue::Number(n) => n.to_string().parse(),
            other => Err(DomainError::validation(format!(
                "VAT rate must be a number or string, got {other}"
            ))),
        }
    }
}

impl From<VatRate> for String {
    fn from(value: VatRate) -> Self {
        value.label()
    }
}

/// One position on the invoice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    pub name: String,
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default, rename = "count")]
    pub quantity: Option<Decimal>,
    #[serde(rename = "price")]
    pub unit_price: Decimal,
    #[serde(default, rename = "vat")]
    pub vat_rate: VatRate,
}

impl LineItem {
    /// Quantity with the order panel's default of one unit.
    pub fn quantity_or_default(&self) -> Decimal {
        self.quantity.unwrap_or(Decimal::ONE)
    }

    /// Net amount of the line (quantity × unit price), `None` when it
    /// exceeds the `Decimal` range.
    pub fn net_amount(&self) -> Option<Decimal> {
        self.quantity_or_default().checked_mul(self.unit_price)
    }

    pub fn unit(&self) -> Option<&str> {
        non_blank(&self.unit)
    }
}

/// Billing data of one order, as sent by the order panel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceRequest {
    pub contractor: Contractor,
    #[serde(default, deserialize_with = "optional_date")]
    pub date: Option<NaiveDate>,
    #[serde(default, rename = "paymentdate", deserialize_with = "optional_date")]
    pub payment_due_date: Option<NaiveDate>,
    #[serde(default, rename = "paymentmethod")]
    pub payment_method: Option<String>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, rename = "alreadypaid")]
    pub already_paid: Option<Decimal>,
    #[serde(default, rename = "invoicecontents")]
    pub line_items: Vec<LineItem>,
}

impl InvoiceRequest {
    /// Check the request invariants.
    ///
    /// Runs before any vendor call so a malformed order never reaches the network.
    pub fn validate(&self) -> DomainResult<()> {
        if self.contractor.display_name().is_empty() {
            return Err(DomainError::validation("contractor name is required"));
        }

        if self.line_items.is_empty() {
            return Err(DomainError::validation(
                "invoice requires at least one line item",
            ));
        }

        for (idx, line) in self.line_items.iter().enumerate() {
            let line_no = idx + 1;
            if line.name.trim().is_empty() {
                return Err(DomainError::validation(format!(
                    "line {line_no}: name is required"
                )));
            }
            if line.unit_price.is_sign_negative() && !line.unit_price.is_zero() {
                return Err(DomainError::validation(format!(
                    "line {line_no}: price must be non-negative"
                )));
            }
            if let Some(quantity) = line.quantity {
                if quantity <= Decimal::ZERO {
                    return Err(DomainError::validation(format!(
                        "line {line_no}: count must be positive"
                    )));
                }
            }
            if line.net_amount().is_none() {
                return Err(DomainError::validation(format!(
                    "line {line_no}: amount out of range"
                )));
            }
        }

        if self.net_total().is_none() {
            return Err(DomainError::validation("invoice total out of range"));
        }

        if let Some(paid) = self.already_paid {
            if paid.is_sign_negative() && !paid.is_zero() {
                return Err(DomainError::validation("alreadypaid must be non-negative"));
            }
        }

        Ok(())
    }

    /// Issue date, falling back to `today` when the order carries none.
    pub fn issue_date(&self, today: NaiveDate) -> NaiveDate {
        self.date.unwrap_or(today)
    }

    pub fn payment_method(&self) -> Option<&str> {
        non_blank(&self.payment_method)
    }

    pub fn currency(&self) -> Option<&str> {
        non_blank(&self.currency)
    }

    pub fn description(&self) -> Option<&str> {
        non_blank(&self.description)
    }

    /// Amount already paid, when it is a positive value.
    pub fn already_paid(&self) -> Option<Decimal> {
        self.already_paid.filter(|paid| *paid > Decimal::ZERO)
    }

    /// Sum of the net line amounts, `None` on overflow.
    pub fn net_total(&self) -> Option<Decimal> {
        self.line_items
            .iter()
            .try_fold(Decimal::ZERO, |total, line| total.checked_add(line.net_amount()?))
    }
}

/// Trimmed value of an optional text field; blank strings count as absent.
pub fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

/// Accepts `YYYY-MM-DD`, an RFC 3339 timestamp, `null` or an empty string.
fn optional_date<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    let Some(raw) = raw.map(|s| s.trim().to_string()).filter(|s| !s.is_empty()) else {
        return Ok(None);
    };

    if let Ok(date) = NaiveDate::parse_from_str(&raw, "%Y-%m-%d") {
        return Ok(Some(date));
    }

    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| Some(dt.date_naive()))
        .map_err(|_| serde::de::Error::custom(format!("invalid date: {raw}")))
}
