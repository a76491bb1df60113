//! Boundary to the external payment processor.
//!
//! The checkout builds a [`PaymentRequest`], hands it to a [`PaymentGateway`]
//! and gets a [`PaymentResponse`] back. Nothing outside the payment service
//! sees these types.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::config::{PaymentConfig, PaymentProviderKind};

pub mod iyzipay;
pub mod mock;

pub use iyzipay::IyzipayClient;
pub use mock::MockGateway;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRequest {
    pub locale: String,
    pub conversation_id: String,
    pub price: String,
    pub paid_price: String,
    pub currency: String,
    pub installment: u8,
    pub basket_id: String,
    pub payment_channel: String,
    pub payment_group: String,
    pub payment_card: PaymentCard,
    pub buyer: Buyer,
    pub shipping_address: PostalAddress,
    pub billing_address: PostalAddress,
    pub basket_items: Vec<BasketItem>,
}

#[derive(Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentCard {
    pub card_holder_name: String,
    pub card_number: String,
    pub expire_month: String,
    pub expire_year: String,
    pub cvc: String,
    pub register_card: u8,
}

impl std::fmt::Debug for PaymentCard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PaymentCard")
            .field("card_holder_name", &self.card_holder_name)
            .field("card_number", &"****")
            .field("expire_month", &"**")
            .field("expire_year", &"****")
            .field("cvc", &"***")
            .finish()
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Buyer {
    pub id: String,
    pub name: String,
    pub surname: String,
    pub gsm_number: String,
    pub email: String,
    pub identity_number: String,
    pub last_login_date: String,
    pub registration_date: String,
    pub registration_address: String,
    pub ip: String,
    pub city: String,
    pub country: String,
    pub zip_code: String,
}

/// The provider requires both addresses on every charge; an order without a
/// usable address sends one with empty fields.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostalAddress {
    pub contact_name: String,
    pub city: String,
    pub country: String,
    pub address: String,
    pub zip_code: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BasketItem {
    pub id: String,
    pub name: String,
    pub category1: String,
    pub item_type: String,
    pub price: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentResponse {
    pub status: Option<String>,
    pub error_code: Option<String>,
    pub error_message: Option<String>,
    pub payment_id: Option<String>,
    pub conversation_id: Option<String>,
    pub auth_code: Option<String>,
    pub host_reference: Option<String>,
}

impl PaymentResponse {
    pub fn is_success(&self) -> bool {
        self.status
            .as_deref()
            .is_some_and(|status| status.eq_ignore_ascii_case("success"))
    }
}

#[async_trait::async_trait]
pub trait PaymentGateway: Send + Sync {
    fn name(&self) -> &'static str;

    /// Submit one charge. `Err` means the provider could not be reached or
    /// answered with something undecodable; a declined card is an `Ok`
    /// response with a non-success status.
    async fn create_payment(&self, request: &PaymentRequest) -> anyhow::Result<PaymentResponse>;
}

pub fn build_gateway(config: &PaymentConfig) -> anyhow::Result<Arc<dyn PaymentGateway>> {
    let gateway: Arc<dyn PaymentGateway> = match config.provider {
        PaymentProviderKind::Iyzipay => Arc::new(IyzipayClient::new(config)?),
        PaymentProviderKind::Mock => Arc::new(MockGateway::approving()),
    };
    tracing::info!(provider = gateway.name(), "payment gateway configured");
    Ok(gateway)
}
