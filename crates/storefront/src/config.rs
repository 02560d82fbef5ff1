//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `STOREFRONT_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//! - `STOREFRONT_BASE_URL` - Public URL for the storefront
//! - `STOREFRONT_SESSION_SECRET` - Session signing secret (min 32 chars, high entropy)
//! - `CATALOG_BACKEND` - `rest` or `headless`
//!
//! ## Catalog backend (`rest`)
//! - `REST_CATALOG_URL` - Base URL of the catalog/order API (e.g. `https://shop.example/wp-json/wc/v3`)
//! - `REST_CATALOG_KEY` - Basic auth consumer key
//! - `REST_CATALOG_SECRET` - Basic auth consumer secret
//! - `REST_CART_URL` - Base URL of the cart sub-API (optional; enables cart mirroring)
//!
//! ## Catalog backend (`headless`)
//! - `HEADLESS_STORE` - Store domain (e.g. `souq.myshopify.com`)
//! - `HEADLESS_ACCESS_TOKEN` - Storefront API access token
//! - `HEADLESS_API_VERSION` - API version (default: 2025-01)
//!
//! ## Optional
//! - `STOREFRONT_HOST` - Bind address (default: 127.0.0.1)
//! - `STOREFRONT_PORT` - Listen port (default: 3000)
//! - `STORE_CURRENCY` - Currency orders are placed in (default: USD)
//! - `FREE_SHIPPING_THRESHOLD` - Subtotal at which shipping is free (default: 100)
//! - `FLAT_SHIPPING_FEE` - Shipping fee below the threshold (default: 15)
//! - `TAX_RATE` - Tax rate as a fraction (default: 0)
//! - `WEBHOOK_SECRET` - Shared secret for order webhook signatures
//! - `NOTIFY_API_KEY` - Bearer key for `POST /api/notifications/email`
//! - `SMTP_HOST`, `SMTP_PORT`, `SMTP_USERNAME`, `SMTP_PASSWORD`, `SMTP_FROM` -
//!   outgoing email; all of host, username, password and from must be set to
//!   enable email
//! - `SENTRY_DSN` - Sentry error tracking DSN

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;

use rust_decimal::Decimal;
use secrecy::{ExposeSecret, SecretString};
use souq_core::CurrencyCode;
use souq_core::cart::PricingPolicy;
use thiserror::Error;
use url::Url;

const MIN_SESSION_SECRET_LENGTH: usize = 32;
const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;

/// Substrings that mark a secret as an unfilled template value (case-insensitive).
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "secret",
    "password",
    "xxx",
    "todo",
    "insert",
    "put-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Storefront application configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL for the storefront
    pub base_url: String,
    /// Session signing secret
    pub session_secret: SecretString,
    /// Active catalog backend
    pub catalog: CatalogConfig,
    /// Shipping and tax rules for cart totals
    pub pricing: PricingPolicy,
    /// Currency orders are placed in
    pub store_currency: CurrencyCode,
    /// Shared secret for order webhook HMAC signatures
    pub webhook_secret: Option<SecretString>,
    /// Bearer key protecting the notification endpoint
    pub notify_api_key: Option<SecretString>,
    /// Outgoing email; `None` disables sending
    pub email: Option<EmailConfig>,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
}

/// Which external commerce backend serves the catalog and accepts orders.
#[derive(Debug, Clone)]
pub enum CatalogConfig {
    Rest(RestCatalogConfig),
    Headless(HeadlessCatalogConfig),
}

/// REST catalog/order API configuration.
///
/// Implements `Debug` manually to redact the consumer secret.
#[derive(Clone)]
pub struct RestCatalogConfig {
    /// API base URL without trailing slash
    pub base_url: String,
    /// Basic auth user
    pub consumer_key: String,
    /// Basic auth password
    pub consumer_secret: SecretString,
    /// Cart sub-API base URL without trailing slash
    pub cart_url: Option<String>,
}

impl std::fmt::Debug for RestCatalogConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RestCatalogConfig")
            .field("base_url", &self.base_url)
            .field("consumer_key", &self.consumer_key)
            .field("consumer_secret", &"[REDACTED]")
            .field("cart_url", &self.cart_url)
            .finish()
    }
}

/// Headless storefront (GraphQL) configuration.
///
/// Implements `Debug` manually to redact the access token.
#[derive(Clone)]
pub struct HeadlessCatalogConfig {
    /// Store domain
    pub store: String,
    /// API version segment of the GraphQL endpoint
    pub api_version: String,
    /// Storefront API access token
    pub access_token: SecretString,
}

impl std::fmt::Debug for HeadlessCatalogConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HeadlessCatalogConfig")
            .field("store", &self.store)
            .field("api_version", &self.api_version)
            .field("access_token", &"[REDACTED]")
            .finish()
    }
}

impl HeadlessCatalogConfig {
    /// The GraphQL endpoint URL.
    #[must_use]
    pub fn endpoint(&self) -> String {
        format!("https://{}/api/{}/graphql.json", self.store, self.api_version)
    }
}

/// Email (SMTP) configuration.
///
/// Implements `Debug` manually to redact the password.
#[derive(Clone)]
pub struct EmailConfig {
    /// SMTP server hostname
    pub smtp_host: String,
    /// SMTP server port
    pub smtp_port: u16,
    /// SMTP authentication username
    pub smtp_username: String,
    /// SMTP authentication password
    pub smtp_password: SecretString,
    /// Email sender address (From header)
    pub from_address: String,
}

impl std::fmt::Debug for EmailConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmailConfig")
            .field("smtp_host", &self.smtp_host)
            .field("smtp_port", &self.smtp_port)
            .field("smtp_username", &self.smtp_username)
            .field("smtp_password", &"[REDACTED]")
            .field("from_address", &self.from_address)
            .finish()
    }
}

impl StorefrontConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if secrets fail validation (placeholder detection, entropy check).
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Self::from_source(&|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// See [`StorefrontConfig::from_env`].
    pub fn from_source(lookup: &dyn Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let env = Env { lookup };

        let database_url = env
            .optional("STOREFRONT_DATABASE_URL")
            .or_else(|| env.optional("DATABASE_URL"))
            .map(SecretString::from)
            .ok_or_else(|| ConfigError::MissingEnvVar("STOREFRONT_DATABASE_URL".to_string()))?;
        let host = env.parsed_or("STOREFRONT_HOST", "127.0.0.1")?;
        let port = env.parsed_or("STOREFRONT_PORT", "3000")?;
        let base_url = env.http_url("STOREFRONT_BASE_URL")?;
        let session_secret = env.validated_secret("STOREFRONT_SESSION_SECRET")?;
        validate_session_secret(&session_secret, "STOREFRONT_SESSION_SECRET")?;

        let catalog = CatalogConfig::from_env(&env)?;
        let pricing = PricingPolicy {
            free_shipping_threshold: env.parsed_or::<Decimal>("FREE_SHIPPING_THRESHOLD", "100")?,
            flat_shipping_fee: env.parsed_or::<Decimal>("FLAT_SHIPPING_FEE", "15")?,
            tax_rate: env.parsed_or::<Decimal>("TAX_RATE", "0")?,
        };
        let store_currency = env.parsed_or("STORE_CURRENCY", "USD")?;

        let webhook_secret = env
            .optional("WEBHOOK_SECRET")
            .map(|value| {
                validate_secret_strength(&value, "WEBHOOK_SECRET")?;
                Ok::<_, ConfigError>(SecretString::from(value))
            })
            .transpose()?;
        let notify_api_key = env.optional("NOTIFY_API_KEY").map(SecretString::from);
        let email = EmailConfig::from_env(&env)?;
        let sentry_dsn = env.optional("SENTRY_DSN");

        Ok(Self {
            database_url,
            host,
            port,
            base_url,
            session_secret,
            catalog,
            pricing,
            store_currency,
            webhook_secret,
            notify_api_key,
            email,
            sentry_dsn,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Whether the storefront is served over HTTPS (secure cookies).
    #[must_use]
    pub fn is_https(&self) -> bool {
        self.base_url.starts_with("https://")
    }
}

impl CatalogConfig {
    fn from_env(env: &Env<'_>) -> Result<Self, ConfigError> {
        match env.required("CATALOG_BACKEND")?.trim().to_ascii_lowercase().as_str() {
            "rest" => Ok(Self::Rest(RestCatalogConfig {
                base_url: env.http_url("REST_CATALOG_URL")?,
                consumer_key: env.required("REST_CATALOG_KEY")?,
                consumer_secret: env.validated_secret("REST_CATALOG_SECRET")?,
                cart_url: env
                    .optional("REST_CART_URL")
                    .map(|url| url.trim_end_matches('/').to_string()),
            })),
            "headless" => Ok(Self::Headless(HeadlessCatalogConfig {
                store: env.required("HEADLESS_STORE")?,
                api_version: env.or_default("HEADLESS_API_VERSION", "2025-01"),
                access_token: env.validated_secret("HEADLESS_ACCESS_TOKEN")?,
            })),
            other => Err(ConfigError::InvalidEnvVar(
                "CATALOG_BACKEND".to_string(),
                format!("expected 'rest' or 'headless', got '{other}'"),
            )),
        }
    }
}

impl EmailConfig {
    /// Email is enabled only when `SMTP_HOST` is set; the rest is then required.
    fn from_env(env: &Env<'_>) -> Result<Option<Self>, ConfigError> {
        let Some(smtp_host) = env.optional("SMTP_HOST") else {
            return Ok(None);
        };

        Ok(Some(Self {
            smtp_host,
            smtp_port: env.parsed_or("SMTP_PORT", "587")?,
            smtp_username: env.required("SMTP_USERNAME")?,
            smtp_password: env.validated_secret("SMTP_PASSWORD")?,
            from_address: env.required("SMTP_FROM")?,
        }))
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Variable lookup shared by the section loaders.
struct Env<'a> {
    lookup: &'a dyn Fn(&str) -> Option<String>,
}

impl Env<'_> {
    /// An optional variable; empty values count as unset.
    fn optional(&self, key: &str) -> Option<String> {
        (self.lookup)(key).filter(|value| !value.trim().is_empty())
    }

    fn required(&self, key: &str) -> Result<String, ConfigError> {
        self.optional(key)
            .ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))
    }

    fn or_default(&self, key: &str, default: &str) -> String {
        self.optional(key).unwrap_or_else(|| default.to_string())
    }

    fn parsed_or<T>(&self, key: &str, default: &str) -> Result<T, ConfigError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        self.or_default(key, default)
            .trim()
            .parse::<T>()
            .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
    }

    /// A required absolute `http(s)` URL, without trailing slash.
    fn http_url(&self, key: &str) -> Result<String, ConfigError> {
        let value = self.required(key)?;
        let parsed = Url::parse(value.trim())
            .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ConfigError::InvalidEnvVar(
                key.to_string(),
                format!("expected an http(s) URL, got scheme '{}'", parsed.scheme()),
            ));
        }
        Ok(value.trim().trim_end_matches('/').to_string())
    }

    fn validated_secret(&self, key: &str) -> Result<SecretString, ConfigError> {
        let value = self.required(key)?;
        validate_secret_strength(&value, key)?;
        Ok(SecretString::from(value))
    }
}

/// Validate that a session secret meets minimum length requirements.
fn validate_session_secret(secret: &SecretString, var_name: &str) -> Result<(), ConfigError> {
    let len = secret.expose_secret().len();
    if len < MIN_SESSION_SECRET_LENGTH {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!("must be at least {MIN_SESSION_SECRET_LENGTH} characters (got {len})"),
        ));
    }
    Ok(())
}

/// Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    let mut freq: HashMap<char, usize> = HashMap::new();
    let mut total = 0_usize;
    for c in s.chars() {
        *freq.entry(c).or_default() += 1;
        total += 1;
    }
    if total == 0 {
        return 0.0;
    }

    #[allow(clippy::cast_precision_loss)] // secret lengths are far below f64 precision
    let len = total as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)]
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Reject placeholder values and low-entropy secrets.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();
    if let Some(pattern) = PLACEHOLDER_PATTERNS.iter().find(|p| lower.contains(*p)) {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!("appears to be a placeholder (contains '{pattern}')"),
        ));
    }

    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Use a randomly generated secret."
            ),
        ));
    }

    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const STRONG: &str = "aB3$xY9!mK2@nL5#pQ7&rT0*uW4^zC6vE8";

    fn load(vars: &[(&str, &str)]) -> Result<StorefrontConfig, ConfigError> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        StorefrontConfig::from_source(&|key| map.get(key).cloned())
    }

    fn rest_vars() -> Vec<(&'static str, &'static str)> {
        vec![
            ("DATABASE_URL", "postgres://localhost/souq"),
            ("STOREFRONT_BASE_URL", "https://souq.test"),
            ("STOREFRONT_SESSION_SECRET", STRONG),
            ("CATALOG_BACKEND", "rest"),
            ("REST_CATALOG_URL", "https://catalog.test/wp-json/wc/v3/"),
            ("REST_CATALOG_KEY", "ck_live"),
            ("REST_CATALOG_SECRET", STRONG),
        ]
    }

    #[test]
    fn test_shannon_entropy() {
        assert!(shannon_entropy("").abs() < f64::EPSILON);
        assert!(shannon_entropy("aaaaaaa").abs() < f64::EPSILON);
        assert!((shannon_entropy("ab") - 1.0).abs() < 0.01);
        assert!(shannon_entropy(STRONG) > 3.3);
    }

    #[test]
    fn test_validate_secret_strength() {
        assert!(matches!(
            validate_secret_strength("your-api-key-here", "TEST_VAR"),
            Err(ConfigError::InsecureSecret(_, _))
        ));
        assert!(validate_secret_strength("changeme123", "TEST_VAR").is_err());
        assert!(validate_secret_strength(&"a".repeat(33), "TEST_VAR").is_err());
        assert!(validate_secret_strength(STRONG, "TEST_VAR").is_ok());
    }

    #[test]
    fn test_validate_session_secret_length() {
        assert!(validate_session_secret(&SecretString::from("short"), "S").is_err());
        assert!(validate_session_secret(&SecretString::from("a".repeat(32)), "S").is_ok());
    }

    #[test]
    fn test_load_rest_backend_with_defaults() {
        let config = load(&rest_vars()).unwrap();

        assert_eq!(config.socket_addr().to_string(), "127.0.0.1:3000");
        assert!(config.is_https());
        assert_eq!(config.store_currency, CurrencyCode::USD);
        assert_eq!(config.pricing.free_shipping_threshold, Decimal::from(100));
        assert_eq!(config.pricing.flat_shipping_fee, Decimal::from(15));
        assert!(config.email.is_none());
        assert!(config.webhook_secret.is_none());
        match config.catalog {
            CatalogConfig::Rest(rest) => {
                assert_eq!(rest.base_url, "https://catalog.test/wp-json/wc/v3");
            }
            CatalogConfig::Headless(_) => panic!("expected rest backend"),
        }
    }

    #[test]
    fn test_load_headless_backend() {
        let mut vars = rest_vars();
        vars.retain(|(k, _)| !k.starts_with("REST_") && *k != "CATALOG_BACKEND");
        vars.push(("CATALOG_BACKEND", "Headless"));
        vars.push(("HEADLESS_STORE", "souq.myshopify.com"));
        vars.push(("HEADLESS_ACCESS_TOKEN", STRONG));

        let config = load(&vars).unwrap();
        let CatalogConfig::Headless(headless) = config.catalog else {
            panic!("expected headless backend");
        };
        assert_eq!(
            headless.endpoint(),
            "https://souq.myshopify.com/api/2025-01/graphql.json"
        );
    }

    #[test]
    fn test_unknown_backend_is_rejected() {
        let mut vars = rest_vars();
        vars.retain(|(k, _)| *k != "CATALOG_BACKEND");
        vars.push(("CATALOG_BACKEND", "graphql"));
        assert!(matches!(
            load(&vars),
            Err(ConfigError::InvalidEnvVar(key, _)) if key == "CATALOG_BACKEND"
        ));
    }

    #[test]
    fn test_catalog_url_must_be_http() {
        let mut vars = rest_vars();
        vars.retain(|(k, _)| *k != "REST_CATALOG_URL");
        vars.push(("REST_CATALOG_URL", "ftp://catalog.test"));
        assert!(matches!(
            load(&vars),
            Err(ConfigError::InvalidEnvVar(key, _)) if key == "REST_CATALOG_URL"
        ));

        vars.retain(|(k, _)| *k != "REST_CATALOG_URL");
        vars.push(("REST_CATALOG_URL", "catalog.test/wp-json"));
        assert!(load(&vars).is_err());
    }

    #[test]
    fn test_missing_database_url() {
        let mut vars = rest_vars();
        vars.retain(|(k, _)| *k != "DATABASE_URL");
        assert!(matches!(
            load(&vars),
            Err(ConfigError::MissingEnvVar(key)) if key == "STOREFRONT_DATABASE_URL"
        ));
    }

    #[test]
    fn test_partial_smtp_config_is_an_error() {
        let mut vars = rest_vars();
        vars.push(("SMTP_HOST", "smtp.mail.test"));
        assert!(matches!(
            load(&vars),
            Err(ConfigError::MissingEnvVar(key)) if key == "SMTP_USERNAME"
        ));
    }

    #[test]
    fn test_invalid_pricing_value() {
        let mut vars = rest_vars();
        vars.push(("TAX_RATE", "fourteen"));
        assert!(matches!(
            load(&vars),
            Err(ConfigError::InvalidEnvVar(key, _)) if key == "TAX_RATE"
        ));
    }

    #[test]
    fn test_config_debug_redacts_secrets() {
        let rest = RestCatalogConfig {
            base_url: "https://catalog.test".to_string(),
            consumer_key: "ck_visible".to_string(),
            consumer_secret: SecretString::from("cs_super_secret_value"),
            cart_url: None,
        };
        let output = format!("{rest:?}");
        assert!(output.contains("ck_visible"));
        assert!(output.contains("[REDACTED]"));
        assert!(!output.contains("cs_super_secret_value"));

        let email = EmailConfig {
            smtp_host: "smtp.mail.test".to_string(),
            smtp_port: 587,
            smtp_username: "orders@souq.test".to_string(),
            smtp_password: SecretString::from("smtp_super_secret"),
            from_address: "Souq <orders@souq.test>".to_string(),
        };
        let output = format!("{email:?}");
        assert!(output.contains("smtp.mail.test"));
        assert!(!output.contains("smtp_super_secret"));
    }
}
