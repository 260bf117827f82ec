//! `herraton-core`: domain types shared by the invoicing and API crates.
//!
//! This crate contains **pure domain** types (no IO, no HTTP, no vendor schemas).

pub mod document;
pub mod error;
pub mod request;
pub mod result;

pub use document::DocumentType;
pub use error::{DomainError, DomainResult};
pub use request::{Contractor, InvoiceRequest, LineItem, VatRate};
pub use result::InvoiceResult;
