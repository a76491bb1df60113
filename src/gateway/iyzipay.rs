use std::time::Duration;

use anyhow::{Context, anyhow};
use base64::{Engine, engine::general_purpose::STANDARD};
use chrono::Utc;
use hmac::{Hmac, Mac};
use rand::Rng;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use sha2::Sha256;

use super::{PaymentGateway, PaymentRequest, PaymentResponse};
use crate::config::PaymentConfig;

const PAYMENT_PATH: &str = "/payment/auth";
const CLIENT_VERSION: &str = concat!("storefront-checkout-", env!("CARGO_PKG_VERSION"));

type HmacSha256 = Hmac<Sha256>;

/// iyzico "non 3-D secure" payment client using `IYZWSv2` request signing.
pub struct IyzipayClient {
    http: reqwest::Client,
    api_key: String,
    secret_key: String,
    base_url: String,
}

impl IyzipayClient {
    pub fn new(config: &PaymentConfig) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("failed to build payment http client")?;
        Ok(Self {
            http,
            api_key: config.api_key.clone(),
            secret_key: config.secret_key.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }
}

fn random_key() -> String {
    let suffix: u32 = rand::thread_rng().gen_range(100_000_000..1_000_000_000);
    format!("{}{}", Utc::now().timestamp_millis(), suffix)
}

/// `IYZWSv2 base64("apiKey:..&randomKey:..&signature:hex(hmac(secret, rnd + path + body)))")`
fn authorization_header(
    api_key: &str,
    secret_key: &str,
    random_key: &str,
    uri_path: &str,
    body: &str,
) -> anyhow::Result<String> {
    let mut mac = HmacSha256::new_from_slice(secret_key.as_bytes())
        .map_err(|err| anyhow!("invalid signing key: {err}"))?;
    mac.update(random_key.as_bytes());
    mac.update(uri_path.as_bytes());
    mac.update(body.as_bytes());
    let signature = hex::encode(mac.finalize().into_bytes());

    let params = format!("apiKey:{api_key}&randomKey:{random_key}&signature:{signature}");
    Ok(format!("IYZWSv2 {}", STANDARD.encode(params)))
}

#[async_trait::async_trait]
impl PaymentGateway for IyzipayClient {
    fn name(&self) -> &'static str {
        "iyzipay"
    }

    async fn create_payment(&self, request: &PaymentRequest) -> anyhow::Result<PaymentResponse> {
        let body = serde_json::to_string(request).context("failed to encode payment request")?;
        let rnd = random_key();
        let authorization =
            authorization_header(&self.api_key, &self.secret_key, &rnd, PAYMENT_PATH, &body)?;

        let response = self
            .http
            .post(format!("{}{}", self.base_url, PAYMENT_PATH))
            .header(AUTHORIZATION, authorization)
            .header(CONTENT_TYPE, "application/json")
            .header("x-iyzi-rnd", rnd)
            .header("x-iyzi-client-version", CLIENT_VERSION)
            .body(body)
            .send()
            .await
            .context("payment provider request failed")?;

        let status = response.status();
        let bytes = response
            .bytes()
            .await
            .context("failed to read payment provider response")?;
        tracing::debug!(http_status = %status, "payment provider responded");

        serde_json::from_slice::<PaymentResponse>(&bytes)
            .with_context(|| format!("undecodable payment provider response (HTTP {status})"))
    }
}
