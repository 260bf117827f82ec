//! Invoice proxy: issues invoices and proformas in an external invoicing service.
//!
//! Each supported service is a `VendorAdapter`; the adapter is picked from the
//! `VendorCredentials` the caller passes in. The proxy itself only sequences
//! the steps (authorize → resolve customer → create document → parse result).

pub mod adapter;
pub mod credentials;
pub mod error;
pub mod proxy;
pub mod quickbooks;
pub mod tax;
pub mod wfirma;

pub use adapter::{CustomerRef, Vendor, VendorAdapter, VendorSession};
pub use credentials::VendorCredentials;
pub use error::InvoiceError;
pub use proxy::InvoiceProxy;
pub use quickbooks::{QuickBooksAdapter, QuickBooksCredentials, QuickBooksEnvironment};
pub use tax::TaxScheme;
pub use wfirma::{WfirmaAdapter, WfirmaCredentials};
