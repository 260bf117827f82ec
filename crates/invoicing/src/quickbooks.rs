//! QuickBooks Online adapter.
//!
//! Each request exchanges the configured refresh token for a short-lived
//! access token. Success is signalled by an `Id` on the returned entity;
//! failures come back as `{"Fault": {"Error": [...]}}`.
//!
//! Proformas are issued as QuickBooks estimates.

use core::str::FromStr;

use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::{Decimal, RoundingStrategy};
use serde_json::{Map, Value as JsonValue, json};

use herraton_core::{Contractor, DocumentType, DomainError, InvoiceRequest, InvoiceResult};
use herraton_infra::{HttpTransport, OutboundRequest, as_sequence, first_element, scalar_string};

use crate::adapter::{CustomerRef, Vendor, VendorAdapter, VendorSession, send_json};
use crate::credentials::{missing_keys, present};
use crate::error::{InvoiceError, bounded};
use crate::tax::TaxScheme;

pub const QUICKBOOKS_TOKEN_URL: &str = "https://oauth.platform.intuit.com/oauth2/v1/tokens/bearer";
pub const QUICKBOOKS_SANDBOX_URL: &str = "https://sandbox-quickbooks.api.intuit.com";
pub const QUICKBOOKS_PRODUCTION_URL: &str = "https://quickbooks.api.intuit.com";

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum QuickBooksEnvironment {
    Sandbox,
    Production,
}

impl QuickBooksEnvironment {
    pub fn base_url(&self) -> &'static str {
        match self {
            QuickBooksEnvironment::Sandbox => QUICKBOOKS_SANDBOX_URL,
            QuickBooksEnvironment::Production => QUICKBOOKS_PRODUCTION_URL,
        }
    }
}

impl FromStr for QuickBooksEnvironment {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "sandbox" | "development" => Ok(QuickBooksEnvironment::Sandbox),
            "production" => Ok(QuickBooksEnvironment::Production),
            other => Err(DomainError::validation(format!(
                "unknown QuickBooks environment: {other}"
            ))),
        }
    }
}

/// OAuth client, company realm and account settings.
#[derive(Debug, Clone, PartialEq)]
pub struct QuickBooksCredentials {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub realm_id: Option<String>,
    pub refresh_token: Option<String>,
    pub environment: QuickBooksEnvironment,
    pub minor_version: String,
    pub token_url: String,
    /// Overrides the environment's API base (tests, proxies).
    pub base_url: Option<String>,
    pub default_country: String,
    pub taxable_code: String,
    pub exempt_code: String,
    /// Product/service used for every line, when the account requires one.
    pub item_id: Option<String>,
}

impl Default for QuickBooksCredentials {
    fn default() -> Self {
        Self {
            client_id: None,
            client_secret: None,
            realm_id: None,
            refresh_token: None,
            environment: QuickBooksEnvironment::Sandbox,
            minor_version: "65".to_string(),
            token_url: QUICKBOOKS_TOKEN_URL.to_string(),
            base_url: None,
            default_country: "PL".to_string(),
            taxable_code: "TAX".to_string(),
            exempt_code: "NON".to_string(),
            item_id: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct QuickBooksAdapter {
    client_id: String,
    client_secret: String,
    refresh_token: String,
    company_url: String,
    token_url: String,
    minor_version: String,
    default_country: String,
    item_id: Option<String>,
    tax: TaxScheme,
}

impl QuickBooksAdapter {
    pub fn from_credentials(c: &QuickBooksCredentials) -> Result<Self, InvoiceError> {
        let missing = missing_keys(&[
            ("clientId", &c.client_id),
            ("clientSecret", &c.client_secret),
            ("realmId", &c.realm_id),
            ("refreshToken", &c.refresh_token),
        ]);
        if !missing.is_empty() {
            return Err(InvoiceError::Configuration {
                vendor: Vendor::QuickBooks,
                missing,
            });
        }

        let base = c
            .base_url
            .as_deref()
            .unwrap_or(c.environment.base_url())
            .trim_end_matches('/');

        Ok(Self {
            client_id: present(&c.client_id),
            client_secret: present(&c.client_secret),
            refresh_token: present(&c.refresh_token),
            company_url: format!("{base}/v3/company/{}", present(&c.realm_id)),
            token_url: c.token_url.clone(),
            minor_version: c.minor_version.clone(),
            default_country: c.default_country.clone(),
            item_id: c.item_id.clone().filter(|id| !id.trim().is_empty()),
            tax: TaxScheme::TaxCode {
                taxable: c.taxable_code.clone(),
                exempt: c.exempt_code.clone(),
            },
        })
    }

    fn company_endpoint(&self, session: &VendorSession, request: OutboundRequest) -> OutboundRequest {
        session.apply(request.query("minorversion", self.minor_version.clone()))
    }

    fn customer_payload(&self, contractor: &Contractor) -> JsonValue {
        let mut customer = Map::new();
        customer.insert("DisplayName".into(), json!(contractor.display_name()));
        if let Some(email) = contractor.email() {
            customer.insert("PrimaryEmailAddr".into(), json!({ "Address": email }));
        }
        if let Some(phone) = contractor.phone() {
            customer.insert("PrimaryPhone".into(), json!({ "FreeFormNumber": phone }));
        }

        let mut address = Map::new();
        for (key, value) in [
            ("Line1", contractor.street()),
            ("City", contractor.city()),
            ("PostalCode", contractor.zip()),
        ] {
            if let Some(value) = value {
                address.insert(key.into(), json!(value));
            }
        }
        address.insert(
            "Country".into(),
            json!(contractor.country_or(&self.default_country)),
        );
        customer.insert("BillAddr".into(), JsonValue::Object(address));

        JsonValue::Object(customer)
    }

    /// Entity name used in the URL path and in the response envelope.
    fn document_entity(document_type: DocumentType) -> (&'static str, &'static str) {
        match document_type {
            DocumentType::Invoice => ("invoice", "Invoice"),
            DocumentType::Proforma => ("estimate", "Estimate"),
        }
    }
}

#[async_trait]
impl VendorAdapter for QuickBooksAdapter {
    fn vendor(&self) -> Vendor {
        Vendor::QuickBooks
    }

    async fn authorize(&self, transport: &dyn HttpTransport) -> Result<VendorSession, InvoiceError> {
        let exchange = OutboundRequest::post(self.token_url.clone())
            .basic(self.client_id.clone(), self.client_secret.clone())
            .header("Accept", "application/json")
            .form(vec![
                ("grant_type".to_string(), "refresh_token".to_string()),
                ("refresh_token".to_string(), self.refresh_token.clone()),
            ]);
        let (status, body) = send_json(transport, Vendor::QuickBooks, exchange).await?;

        let access_token = body
            .get("access_token")
            .and_then(JsonValue::as_str)
            .filter(|t| !t.is_empty());

        let Some(access_token) = access_token else {
            let message = body
                .get("error_description")
                .or_else(|| body.get("error"))
                .and_then(JsonValue::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| format!("token endpoint returned status {status}"));
            return Err(InvoiceError::Authorization {
                vendor: Vendor::QuickBooks,
                message,
                raw: bounded(&body),
            });
        };

        // Rotated refresh tokens are not persisted; the operator has to update the secret.
        if let Some(rotated) = body.get("refresh_token").and_then(JsonValue::as_str) {
            if rotated != self.refresh_token {
                tracing::warn!(
                    "quickbooks issued a new refresh token; update QUICKBOOKS_REFRESH_TOKEN before the old one expires"
                );
            }
        }

        Ok(VendorSession::with_bearer(access_token))
    }

    async fn resolve_customer(
        &self,
        transport: &dyn HttpTransport,
        session: &VendorSession,
        contractor: &Contractor,
    ) -> Result<CustomerRef, InvoiceError> {
        let query = format!(
            "select * from Customer where DisplayName = '{}'",
            escape_query_literal(contractor.display_name())
        );
        let lookup = self.company_endpoint(
            session,
            OutboundRequest::get(format!("{}/query", self.company_url)).query("query", query),
        );
        let (status, body) = send_json(transport, Vendor::QuickBooks, lookup).await?;

        // Anything but a successful query response is a failed lookup, never "not found".
        let query_response = match body.get("QueryResponse") {
            Some(response) if (200..300).contains(&status) && body.get("Fault").is_none() => response,
            _ => {
                let message = if body.get("Fault").is_some() {
                    fault_message(&body)
                } else {
                    format!("customer query returned status {status} without QueryResponse")
                };
                return Err(InvoiceError::CustomerLookup {
                    vendor: Vendor::QuickBooks,
                    message,
                    raw: bounded(&body),
                });
            }
        };

        if let Some(id) = query_response
            .get("Customer")
            .and_then(first_element)
            .and_then(|c| c.get("Id"))
            .and_then(scalar_string)
        {
            tracing::info!(customer_id = %id, "quickbooks customer found");
            return Ok(CustomerRef { id, created: false });
        }

        let create = self.company_endpoint(
            session,
            OutboundRequest::post(format!("{}/customer", self.company_url))
                .json(self.customer_payload(contractor)),
        );
        let (_, body) = send_json(transport, Vendor::QuickBooks, create).await?;

        match body
            .get("Customer")
            .and_then(|c| c.get("Id"))
            .and_then(scalar_string)
        {
            Some(id) => {
                tracing::info!(customer_id = %id, "quickbooks customer created");
                Ok(CustomerRef { id, created: true })
            }
            None => Err(InvoiceError::CustomerCreation {
                vendor: Vendor::QuickBooks,
                message: fault_message(&body),
                raw: bounded(&body),
            }),
        }
    }

    fn shape_document(
        &self,
        session: &VendorSession,
        request: &InvoiceRequest,
        document_type: DocumentType,
        customer: &CustomerRef,
        issue_date: NaiveDate,
    ) -> OutboundRequest {
        let lines: Vec<JsonValue> = request
            .line_items
            .iter()
            .map(|line| {
                let mut detail = Map::new();
                detail.insert("Qty".into(), decimal_number(line.quantity_or_default()));
                detail.insert("UnitPrice".into(), decimal_number(line.unit_price));
                detail.insert(self.tax.field().into(), self.tax.line_tax(&line.vat_rate));
                if let Some(item_id) = &self.item_id {
                    detail.insert("ItemRef".into(), json!({ "value": item_id }));
                }

                json!({
                    "DetailType": "SalesItemLineDetail",
                    // In range once `InvoiceRequest::validate` has passed.
                    "Amount": money(line.net_amount().unwrap_or_default()),
                    "Description": line.name.trim(),
                    "SalesItemLineDetail": detail,
                })
            })
            .collect();

        let mut document = Map::new();
        document.insert("CustomerRef".into(), json!({ "value": customer.id }));
        document.insert("TxnDate".into(), json!(issue_date.format("%Y-%m-%d").to_string()));
        if let Some(due) = request.payment_due_date {
            let field = match document_type {
                DocumentType::Invoice => "DueDate",
                DocumentType::Proforma => "ExpirationDate",
            };
            document.insert(field.into(), json!(due.format("%Y-%m-%d").to_string()));
        }
        if let Some(currency) = request.currency() {
            document.insert("CurrencyRef".into(), json!({ "value": currency }));
        }
        if let Some(description) = request.description() {
            document.insert("CustomerMemo".into(), json!({ "value": description }));
        }
        if let (DocumentType::Invoice, Some(paid)) = (document_type, request.already_paid()) {
            document.insert("Deposit".into(), money(paid));
        }
        if let Some(email) = request.contractor.email() {
            document.insert("BillEmail".into(), json!({ "Address": email }));
        }
        document.insert("Line".into(), JsonValue::Array(lines));

        let (path, _) = Self::document_entity(document_type);
        self.company_endpoint(
            session,
            OutboundRequest::post(format!("{}/{path}", self.company_url))
                .json(JsonValue::Object(document)),
        )
    }

    fn parse_result(
        &self,
        document_type: DocumentType,
        body: &JsonValue,
    ) -> Result<InvoiceResult, InvoiceError> {
        let (_, entity) = Self::document_entity(document_type);
        let document = body.get(entity);

        match document.and_then(|d| d.get("Id")).and_then(scalar_string) {
            Some(id) => {
                let number = document
                    .and_then(|d| d.get("DocNumber"))
                    .and_then(scalar_string);
                let data = document.cloned().unwrap_or(JsonValue::Null);
                Ok(InvoiceResult::succeeded(id, number, data))
            }
            None => Err(InvoiceError::DocumentCreation {
                vendor: Vendor::QuickBooks,
                message: fault_message(body),
                raw: bounded(body),
            }),
        }
    }
}

/// Escape a string literal for the QuickBooks query language.
fn escape_query_literal(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "\\'")
}

/// JSON numbers are `f64`; parsing the decimal text picks the nearest one,
/// which prints back as the same digits for amounts of up to 15 digits.
fn decimal_number(value: Decimal) -> JsonValue {
    let text = value.normalize().to_string();
    match text.parse::<f64>() {
        Ok(number) if number.is_finite() => json!(number),
        _ => json!(text),
    }
}

/// Currency amount rounded half away from zero to cents.
fn money(value: Decimal) -> JsonValue {
    decimal_number(value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero))
}

/// First error of a `Fault` envelope as `"Message: Detail"`.
fn fault_message(body: &JsonValue) -> String {
    let first = body
        .get("Fault")
        .and_then(|f| f.get("Error"))
        .and_then(as_sequence)
        .and_then(|errors| errors.into_iter().next());

    let Some(error) = first else {
        return "quickbooks response contains no identifier".to_string();
    };

    let message = error.get("Message").and_then(JsonValue::as_str).unwrap_or("unknown error");
    match error.get("Detail").and_then(JsonValue::as_str) {
        Some(detail) if !detail.is_empty() && detail != message => format!("{message}: {detail}"),
        _ => message.to_string(),
    }
}
