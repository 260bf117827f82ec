//! Startup configuration.
//!
//! Plain settings come from environment variables with defaults. Secrets are
//! read from the environment or, failing that, from `/run/secrets/<NAME>`.
//! A missing secret is not a startup error: the affected vendor reports a
//! configuration error when it is first used.

use std::collections::HashMap;
use std::env;
use std::fmt::Display;
use std::fs::read_to_string;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::anyhow;

use herraton_invoicing::{QuickBooksCredentials, QuickBooksEnvironment, WfirmaCredentials};
use herraton_notifications::{FcmCredentials, MailerSendCredentials};

pub const SECRETS_DIR: &str = "/run/secrets";

/// Where configuration values come from.
pub trait ConfigSource {
    fn var(&self, key: &str) -> Option<String>;

    /// Secrets default to plain variables.
    fn secret(&self, key: &str) -> Option<String> {
        self.var(key)
    }
}

/// Process environment plus mounted secret files.
#[derive(Debug, Clone)]
pub struct EnvSource {
    pub secrets_dir: PathBuf,
}

impl Default for EnvSource {
    fn default() -> Self {
        Self {
            secrets_dir: PathBuf::from(SECRETS_DIR),
        }
    }
}

impl ConfigSource for EnvSource {
    fn var(&self, key: &str) -> Option<String> {
        env::var(key).ok().filter(|v| !v.trim().is_empty())
    }

    fn secret(&self, key: &str) -> Option<String> {
        self.var(key).or_else(|| {
            read_to_string(self.secrets_dir.join(key))
                .ok()
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
        })
    }
}

impl ConfigSource for HashMap<&str, &str> {
    fn var(&self, key: &str) -> Option<String> {
        self.get(key).map(|v| v.to_string())
    }
}

/// Immutable after startup; shared through `AppServices`.
#[derive(Clone)]
pub struct Config {
    pub port: u16,
    pub http_timeout: Duration,
    pub wfirma: WfirmaCredentials,
    pub quickbooks: QuickBooksCredentials,
    pub fcm: FcmCredentials,
    pub mailersend: MailerSendCredentials,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 8080,
            http_timeout: Duration::from_secs(30),
            wfirma: WfirmaCredentials::default(),
            quickbooks: QuickBooksCredentials::default(),
            fcm: FcmCredentials::default(),
            mailersend: MailerSendCredentials::default(),
        }
    }
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        Self::from_source(&EnvSource::default())
    }

    pub fn from_source(source: &impl ConfigSource) -> anyhow::Result<Self> {
        let defaults = Config::default();
        let country: String = try_load(source, "DEFAULT_COUNTRY", "PL")?;
        let timeout_secs: u64 = try_load(source, "HTTP_TIMEOUT_SECS", "30")?;
        if timeout_secs == 0 {
            return Err(anyhow!("HTTP_TIMEOUT_SECS must be positive"));
        }

        let wfirma = WfirmaCredentials {
            access_key: source.secret("WFIRMA_ACCESS_KEY"),
            secret_key: source.secret("WFIRMA_SECRET_KEY"),
            app_key: source.secret("WFIRMA_APP_KEY"),
            company_id: source.var("WFIRMA_COMPANY_ID"),
            base_url: source.var("WFIRMA_BASE_URL").unwrap_or(defaults.wfirma.base_url),
            default_country: country.clone(),
        };

        let qb = defaults.quickbooks;
        let quickbooks = QuickBooksCredentials {
            client_id: source.secret("QUICKBOOKS_CLIENT_ID"),
            client_secret: source.secret("QUICKBOOKS_CLIENT_SECRET"),
            realm_id: source.var("QUICKBOOKS_REALM_ID"),
            refresh_token: source.secret("QUICKBOOKS_REFRESH_TOKEN"),
            environment: try_load::<QuickBooksEnvironment>(source, "QUICKBOOKS_ENVIRONMENT", "sandbox")?,
            minor_version: source.var("QUICKBOOKS_MINOR_VERSION").unwrap_or(qb.minor_version),
            token_url: source.var("QUICKBOOKS_TOKEN_URL").unwrap_or(qb.token_url),
            base_url: source.var("QUICKBOOKS_BASE_URL"),
            default_country: country,
            taxable_code: source.var("QUICKBOOKS_TAXABLE_CODE").unwrap_or(qb.taxable_code),
            exempt_code: source.var("QUICKBOOKS_EXEMPT_CODE").unwrap_or(qb.exempt_code),
            item_id: source.var("QUICKBOOKS_ITEM_ID"),
        };

        let fcm = FcmCredentials {
            project_id: source.var("FCM_PROJECT_ID"),
            access_token: source.secret("FCM_ACCESS_TOKEN"),
            base_url: source.var("FCM_BASE_URL").unwrap_or(defaults.fcm.base_url),
        };

        let mailersend = MailerSendCredentials {
            api_token: source.secret("MAILERSEND_API_TOKEN"),
            from_email: source.var("MAILERSEND_FROM_EMAIL"),
            from_name: source.var("MAILERSEND_FROM_NAME"),
            base_url: source
                .var("MAILERSEND_BASE_URL")
                .unwrap_or(defaults.mailersend.base_url),
        };

        Ok(Self {
            port: try_load(source, "PORT", "8080")?,
            http_timeout: Duration::from_secs(timeout_secs),
            wfirma,
            quickbooks,
            fcm,
            mailersend,
        })
    }
}

fn try_load<T>(source: &impl ConfigSource, key: &str, default: &str) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: Display,
{
    let raw = source.var(key).unwrap_or_else(|| {
        tracing::info!("{key} not set, using default: {default}");
        default.to_string()
    });
    raw.trim()
        .parse()
        .map_err(|e| anyhow!("invalid {key} value {raw:?}: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_when_nothing_is_set() {
        let config = Config::from_source(&HashMap::<&str, &str>::new()).unwrap();

        assert_eq!(config.port, 8080);
        assert_eq!(config.http_timeout, Duration::from_secs(30));
        assert_eq!(config.quickbooks.environment, QuickBooksEnvironment::Sandbox);
        assert_eq!(config.wfirma.default_country, "PL");
        assert!(config.wfirma.access_key.is_none());
        assert!(config.mailersend.api_token.is_none());
    }

    #[test]
    fn values_are_read_from_the_source() {
        let source = HashMap::from([
            ("PORT", "9000"),
            ("DEFAULT_COUNTRY", "DE"),
            ("QUICKBOOKS_ENVIRONMENT", "production"),
            ("QUICKBOOKS_REFRESH_TOKEN", "rt"),
            ("WFIRMA_ACCESS_KEY", "ak"),
        ]);

        let config = Config::from_source(&source).unwrap();

        assert_eq!(config.port, 9000);
        assert_eq!(config.quickbooks.environment, QuickBooksEnvironment::Production);
        assert_eq!(config.quickbooks.default_country, "DE");
        assert_eq!(config.quickbooks.refresh_token.as_deref(), Some("rt"));
        assert_eq!(config.wfirma.access_key.as_deref(), Some("ak"));
    }

    #[test]
    fn malformed_values_fail_startup() {
        assert!(Config::from_source(&HashMap::from([("PORT", "eighty")])).is_err());
        assert!(Config::from_source(&HashMap::from([("HTTP_TIMEOUT_SECS", "0")])).is_err());
        assert!(Config::from_source(&HashMap::from([("QUICKBOOKS_ENVIRONMENT", "staging")])).is_err());
    }

    #[test]
    fn secrets_fall_back_to_mounted_files() {
        let dir = std::env::temp_dir().join(format!("herraton-secrets-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("HERRATON_TEST_ONLY_SECRET"), "  from-file\n").unwrap();

        let source = EnvSource { secrets_dir: dir.clone() };
        assert_eq!(source.secret("HERRATON_TEST_ONLY_SECRET").as_deref(), Some("from-file"));
        assert_eq!(source.secret("HERRATON_TEST_ABSENT_SECRET"), None);

        std::fs::remove_dir_all(dir).unwrap();
    }
}
