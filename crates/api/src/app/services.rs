use std::sync::Arc;

use herraton_infra::HttpTransport;
use herraton_invoicing::{InvoiceProxy, Vendor, VendorCredentials};
use herraton_notifications::{EmailRelay, PushDispatcher};

use crate::config::Config;

/// Everything the handlers need, built once at startup and shared read-only.
pub struct AppServices {
    pub invoices: InvoiceProxy,
    pub push: PushDispatcher,
    pub email: EmailRelay,
    wfirma: VendorCredentials,
    quickbooks: VendorCredentials,
}

impl AppServices {
    pub fn new(config: &Config, transport: Arc<dyn HttpTransport>) -> Self {
        Self {
            invoices: InvoiceProxy::new(transport.clone()),
            push: PushDispatcher::new(transport.clone(), config.fcm.clone()),
            email: EmailRelay::new(transport, config.mailersend.clone()),
            wfirma: VendorCredentials::Wfirma(config.wfirma.clone()),
            quickbooks: VendorCredentials::QuickBooks(config.quickbooks.clone()),
        }
    }

    pub fn credentials(&self, vendor: Vendor) -> &VendorCredentials {
        match vendor {
            Vendor::Wfirma => &self.wfirma,
            Vendor::QuickBooks => &self.quickbooks,
        }
    }

    /// Report at startup which vendors can be used. Never logs secret values.
    pub fn log_readiness(&self) {
        for credentials in [&self.wfirma, &self.quickbooks] {
            match credentials.adapter() {
                Ok(_) => tracing::info!(vendor = %credentials.vendor(), "invoicing vendor configured"),
                Err(err) => tracing::warn!(
                    vendor = %credentials.vendor(),
                    missing = err.details().unwrap_or_default(),
                    "invoicing vendor not configured"
                ),
            }
        }
    }
}
