use std::env;

use anyhow::{Context, bail};

pub const IYZIPAY_SANDBOX_URL: &str = "https://sandbox-api.iyzipay.com";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub jwt_secret: String,
    /// Take the client address from `X-Forwarded-For`. Only enable behind a
    /// reverse proxy that overwrites the header.
    pub trust_forwarded_for: bool,
    pub payment: PaymentConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentProviderKind {
    Iyzipay,
    Mock,
}

#[derive(Clone)]
pub struct PaymentConfig {
    pub provider: PaymentProviderKind,
    pub api_key: String,
    pub secret_key: String,
    pub base_url: String,
    pub currency: String,
    pub locale: String,
    pub timeout_secs: u64,
}

impl std::fmt::Debug for PaymentConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PaymentConfig")
            .field("provider", &self.provider)
            .field("api_key", &"***")
            .field("secret_key", &"***")
            .field("base_url", &self.base_url)
            .field("currency", &self.currency)
            .field("locale", &self.locale)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl Default for PaymentConfig {
    fn default() -> Self {
        Self {
            provider: PaymentProviderKind::Mock,
            api_key: String::new(),
            secret_key: String::new(),
            base_url: IYZIPAY_SANDBOX_URL.to_string(),
            currency: "TRY".to_string(),
            locale: "tr".to_string(),
            timeout_secs: 30,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = env::var("DATABASE_URL").context("DATABASE_URL is not set")?;
        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .ok()
            .and_then(|p| p.parse::<u16>().ok())
            .unwrap_or(3000);
        let jwt_secret = env::var("JWT_SECRET").context("JWT_SECRET is not set")?;
        let trust_forwarded_for = env::var("TRUST_FORWARDED_FOR")
            .map(|v| matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(false);
        Ok(Self {
            port,
            database_url,
            host,
            jwt_secret,
            trust_forwarded_for,
            payment: PaymentConfig::from_env()?,
        })
    }
}

impl PaymentConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let defaults = Self::default();
        let provider = match env::var("PAYMENT_PROVIDER")
            .unwrap_or_else(|_| "iyzipay".to_string())
            .to_ascii_lowercase()
            .as_str()
        {
            "iyzipay" => PaymentProviderKind::Iyzipay,
            "mock" => PaymentProviderKind::Mock,
            other => bail!("unsupported PAYMENT_PROVIDER `{other}`"),
        };

        let api_key = env::var("IYZIPAY_API_KEY").unwrap_or_default();
        let secret_key = env::var("IYZIPAY_SECRET_KEY").unwrap_or_default();
        if provider == PaymentProviderKind::Iyzipay && (api_key.is_empty() || secret_key.is_empty())
        {
            bail!("IYZIPAY_API_KEY and IYZIPAY_SECRET_KEY are required for the iyzipay provider");
        }

        Ok(Self {
            provider,
            api_key,
            secret_key,
            base_url: env::var("IYZIPAY_BASE_URL").unwrap_or(defaults.base_url),
            currency: env::var("PAYMENT_CURRENCY").unwrap_or(defaults.currency),
            locale: env::var("PAYMENT_LOCALE").unwrap_or(defaults.locale),
            timeout_secs: env::var("PAYMENT_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(defaults.timeout_secs),
        })
    }
}
