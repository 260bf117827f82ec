//! wFirma adapter.
//!
//! Authenticates with a static key pair sent as headers. Every response
//! carries `status.code`; only `"OK"` means success. Collections come back
//! as `{"0": {...}, "1": {...}, "parameters": {...}}` rather than arrays.

use async_trait::async_trait;
use chrono::NaiveDate;
use serde_json::{Map, Value as JsonValue, json};

use herraton_core::{Contractor, DocumentType, InvoiceRequest, InvoiceResult};
use herraton_infra::{HttpTransport, OutboundRequest, as_sequence, first_element, scalar_string, without_keys};

use crate::adapter::{CustomerRef, Vendor, VendorAdapter, VendorSession, send_json};
use crate::credentials::{missing_keys, present};
use crate::error::{InvoiceError, bounded};
use crate::tax::TaxScheme;

pub const WFIRMA_API_URL: &str = "https://api2.wfirma.pl";

const STATUS_OK: &str = "OK";
const DEFAULT_UNIT: &str = "szt.";
const DEFAULT_CURRENCY: &str = "PLN";
const DEFAULT_PAYMENT_METHOD: &str = "transfer";

/// wFirma API key set plus account settings.
#[derive(Debug, Clone, PartialEq)]
pub struct WfirmaCredentials {
    pub access_key: Option<String>,
    pub secret_key: Option<String>,
    pub app_key: Option<String>,
    pub company_id: Option<String>,
    pub base_url: String,
    /// Country code used for new contractors without one.
    pub default_country: String,
}

impl Default for WfirmaCredentials {
    fn default() -> Self {
        Self {
            access_key: None,
            secret_key: None,
            app_key: None,
            company_id: None,
            base_url: WFIRMA_API_URL.to_string(),
            default_country: "PL".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct WfirmaAdapter {
    base_url: String,
    access_key: String,
    secret_key: String,
    app_key: Option<String>,
    company_id: Option<String>,
    default_country: String,
    tax: TaxScheme,
}

impl WfirmaAdapter {
    pub fn from_credentials(c: &WfirmaCredentials) -> Result<Self, InvoiceError> {
        let missing = missing_keys(&[("accessKey", &c.access_key), ("secretKey", &c.secret_key)]);
        if !missing.is_empty() {
            return Err(InvoiceError::Configuration {
                vendor: Vendor::Wfirma,
                missing,
            });
        }

        Ok(Self {
            base_url: c.base_url.trim_end_matches('/').to_string(),
            access_key: present(&c.access_key),
            secret_key: present(&c.secret_key),
            app_key: c.app_key.clone().filter(|k| !k.trim().is_empty()),
            company_id: c.company_id.clone().filter(|k| !k.trim().is_empty()),
            default_country: c.default_country.clone(),
            tax: TaxScheme::VatPercent,
        })
    }

    fn endpoint(&self, session: &VendorSession, path: &str) -> OutboundRequest {
        let mut request = OutboundRequest::post(format!("{}/{}", self.base_url, path))
            .query("inputFormat", "json")
            .query("outputFormat", "json");
        if let Some(company_id) = &self.company_id {
            request = request.query("company_id", company_id.clone());
        }
        session.apply(request)
    }

    fn contractor_payload(&self, contractor: &Contractor) -> JsonValue {
        let mut fields = Map::new();
        fields.insert("name".into(), json!(contractor.display_name()));
        for (key, value) in [
            ("street", contractor.street()),
            ("zip", contractor.zip()),
            ("city", contractor.city()),
            ("email", contractor.email()),
            ("phone", contractor.phone()),
        ] {
            if let Some(value) = value {
                fields.insert(key.into(), json!(value));
            }
        }
        fields.insert(
            "country".into(),
            json!(contractor.country_or(&self.default_country)),
        );

        json!({ "api": { "contractors": [ { "contractor": fields } ] } })
    }

    fn document_kind(document_type: DocumentType) -> &'static str {
        match document_type {
            DocumentType::Invoice => "normal",
            DocumentType::Proforma => "proforma",
        }
    }
}

#[async_trait]
impl VendorAdapter for WfirmaAdapter {
    fn vendor(&self) -> Vendor {
        Vendor::Wfirma
    }

    async fn authorize(&self, _transport: &dyn HttpTransport) -> Result<VendorSession, InvoiceError> {
        let mut headers = vec![
            ("accessKey".to_string(), self.access_key.clone()),
            ("secretKey".to_string(), self.secret_key.clone()),
        ];
        if let Some(app_key) = &self.app_key {
            headers.push(("appKey".to_string(), app_key.clone()));
        }
        Ok(VendorSession::with_headers(headers))
    }

    async fn resolve_customer(
        &self,
        transport: &dyn HttpTransport,
        session: &VendorSession,
        contractor: &Contractor,
    ) -> Result<CustomerRef, InvoiceError> {
        let name = contractor.display_name();

        let find = self.endpoint(session, "contractors/find").json(json!({
            "api": {
                "contractors": {
                    "parameters": {
                        "conditions": {
                            "condition": { "field": "name", "operator": "eq", "value": name }
                        }
                    }
                }
            }
        }));
        let (_, body) = send_json(transport, Vendor::Wfirma, find).await?;
        let body = unwrap_api(&body);

        if status_code(body) != Some(STATUS_OK) {
            return Err(InvoiceError::CustomerLookup {
                vendor: Vendor::Wfirma,
                message: error_message(body, "contractors", "contractor"),
                raw: bounded(body),
            });
        }

        if let Some(id) = first_entity(body, "contractors", "contractor")
            .and_then(|c| c.get("id"))
            .and_then(scalar_string)
        {
            tracing::info!(customer_id = %id, "wfirma contractor found");
            return Ok(CustomerRef { id, created: false });
        }

        let add = self
            .endpoint(session, "contractors/add")
            .json(self.contractor_payload(contractor));
        let (_, body) = send_json(transport, Vendor::Wfirma, add).await?;
        let body = unwrap_api(&body);

        let created_id = (status_code(body) == Some(STATUS_OK))
            .then(|| first_entity(body, "contractors", "contractor"))
            .flatten()
            .and_then(|c| c.get("id"))
            .and_then(scalar_string);

        match created_id {
            Some(id) => {
                tracing::info!(customer_id = %id, "wfirma contractor created");
                Ok(CustomerRef { id, created: true })
            }
            None => Err(InvoiceError::CustomerCreation {
                vendor: Vendor::Wfirma,
                message: error_message(body, "contractors", "contractor"),
                raw: bounded(body),
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
        let contents: Vec<JsonValue> = request
            .line_items
            .iter()
            .map(|line| {
                let mut content = Map::new();
                content.insert("name".into(), json!(line.name.trim()));
                content.insert("unit".into(), json!(line.unit().unwrap_or(DEFAULT_UNIT)));
                content.insert("count".into(), json!(line.quantity_or_default().normalize().to_string()));
                content.insert("price".into(), json!(line.unit_price.normalize().to_string()));
                content.insert(self.tax.field().into(), self.tax.line_tax(&line.vat_rate));
                json!({ "invoicecontent": content })
            })
            .collect();

        let mut invoice = Map::new();
        invoice.insert("contractor".into(), json!({ "id": customer.id }));
        invoice.insert("type".into(), json!(Self::document_kind(document_type)));
        invoice.insert("date".into(), json!(issue_date.format("%Y-%m-%d").to_string()));
        if let Some(due) = request.payment_due_date {
            invoice.insert("paymentdate".into(), json!(due.format("%Y-%m-%d").to_string()));
        }
        invoice.insert(
            "paymentmethod".into(),
            json!(request.payment_method().unwrap_or(DEFAULT_PAYMENT_METHOD)),
        );
        invoice.insert(
            "currency".into(),
            json!(request.currency().unwrap_or(DEFAULT_CURRENCY)),
        );
        if let Some(description) = request.description() {
            invoice.insert("description".into(), json!(description));
        }
        if let Some(paid) = request.already_paid() {
            invoice.insert("alreadypaid_initial".into(), json!(paid.normalize().to_string()));
        }
        invoice.insert("invoicecontents".into(), JsonValue::Array(contents));

        self.endpoint(session, "invoices/add")
            .json(json!({ "api": { "invoices": [ { "invoice": invoice } ] } }))
    }

    fn parse_result(
        &self,
        _document_type: DocumentType,
        body: &JsonValue,
    ) -> Result<InvoiceResult, InvoiceError> {
        let body = unwrap_api(body);
        let invoice = first_entity(body, "invoices", "invoice");
        let id = invoice.and_then(|i| i.get("id")).and_then(scalar_string);

        match (status_code(body) == Some(STATUS_OK), id, invoice) {
            (true, Some(id), Some(invoice)) => {
                let number = invoice
                    .get("fullnumber")
                    .and_then(scalar_string)
                    .or_else(|| invoice.get("number").and_then(scalar_string));
                Ok(InvoiceResult::succeeded(id, number, invoice.clone()))
            }
            _ => Err(InvoiceError::DocumentCreation {
                vendor: Vendor::Wfirma,
                message: error_message(body, "invoices", "invoice"),
                raw: bounded(body),
            }),
        }
    }
}

/// Responses may or may not be wrapped in an `api` root.
fn unwrap_api(body: &JsonValue) -> &JsonValue {
    body.get("api").unwrap_or(body)
}

fn status_code(body: &JsonValue) -> Option<&str> {
    body.get("status")?.get("code")?.as_str()
}

/// First `{entity: {...}}` element of a collection, unwrapped.
fn first_entity<'a>(body: &'a JsonValue, collection: &str, entity: &str) -> Option<&'a JsonValue> {
    let items = body.get(collection)?;
    let first = match items {
        JsonValue::Object(map) if map.contains_key("parameters") => {
            let entries = without_keys(items, &["parameters"]);
            if as_sequence(&entries).is_none_or(|seq| seq.is_empty()) {
                return None;
            }
            items.get("0")?
        }
        _ => first_element(items)?,
    };
    first.get(entity).or(Some(first))
}

/// Best human-readable error from a non-OK response.
fn error_message(body: &JsonValue, collection: &str, entity: &str) -> String {
    if let Some(message) = body
        .get("status")
        .and_then(|s| s.get("message"))
        .and_then(JsonValue::as_str)
        .filter(|m| !m.is_empty())
    {
        return message.to_string();
    }

    let messages: Vec<String> = first_entity(body, collection, entity)
        .and_then(|e| e.get("errors"))
        .and_then(as_sequence)
        .unwrap_or_default()
        .into_iter()
        .filter_map(|item| {
            let error = item.get("error").unwrap_or(item);
            let message = error.get("message").and_then(JsonValue::as_str)?;
            Some(match error.get("field").and_then(JsonValue::as_str) {
                Some(field) if !field.is_empty() => format!("{field}: {message}"),
                _ => message.to_string(),
            })
        })
        .collect();

    if !messages.is_empty() {
        return messages.join("; ");
    }

    match status_code(body) {
        Some(code) => format!("wfirma returned status {code}"),
        None => "wfirma response has no status".to_string(),
    }
}
