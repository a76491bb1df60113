use std::sync::Mutex;

use anyhow::anyhow;
use uuid::Uuid;

use super::{PaymentGateway, PaymentRequest, PaymentResponse};

/// How the mock answers the next charges.
#[derive(Debug, Clone)]
pub enum MockBehavior {
    Approve,
    Decline(String),
    /// Simulates a transport failure such as a timeout.
    Unreachable,
}

/// In-process gateway for local development and tests. Records every request
/// it receives.
pub struct MockGateway {
    behavior: Mutex<MockBehavior>,
    requests: Mutex<Vec<PaymentRequest>>,
}

impl MockGateway {
    pub fn new(behavior: MockBehavior) -> Self {
        Self {
            behavior: Mutex::new(behavior),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn approving() -> Self {
        Self::new(MockBehavior::Approve)
    }

    pub fn declining(message: impl Into<String>) -> Self {
        Self::new(MockBehavior::Decline(message.into()))
    }

    pub fn unreachable() -> Self {
        Self::new(MockBehavior::Unreachable)
    }

    pub fn set_behavior(&self, behavior: MockBehavior) {
        *self.behavior.lock().unwrap_or_else(|e| e.into_inner()) = behavior;
    }

    pub fn requests(&self) -> Vec<PaymentRequest> {
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

#[async_trait::async_trait]
impl PaymentGateway for MockGateway {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn create_payment(&self, request: &PaymentRequest) -> anyhow::Result<PaymentResponse> {
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(request.clone());

        let behavior = self
            .behavior
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone();

        match behavior {
            MockBehavior::Approve => Ok(PaymentResponse {
                status: Some("success".into()),
                payment_id: Some(Uuid::new_v4().simple().to_string()),
                conversation_id: Some(request.conversation_id.clone()),
                auth_code: Some("000000".into()),
                host_reference: Some("mock".into()),
                ..Default::default()
            }),
            MockBehavior::Decline(message) => Ok(PaymentResponse {
                status: Some("failure".into()),
                error_code: Some("10051".into()),
                error_message: Some(message),
                conversation_id: Some(request.conversation_id.clone()),
                ..Default::default()
            }),
            MockBehavior::Unreachable => Err(anyhow!("connection timed out")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::{Buyer, PaymentCard, PostalAddress};

    fn request(order_number: &str) -> PaymentRequest {
        PaymentRequest {
            locale: "tr".into(),
            conversation_id: order_number.into(),
            price: "10.00".into(),
            paid_price: "10.00".into(),
            currency: "TRY".into(),
            installment: 1,
            basket_id: order_number.into(),
            payment_channel: "WEB".into(),
            payment_group: "PRODUCT".into(),
            payment_card: PaymentCard {
                card_holder_name: "Ada".into(),
                card_number: "5528790000000008".into(),
                expire_month: "12".into(),
                expire_year: "2030".into(),
                cvc: "123".into(),
                register_card: 0,
            },
            buyer: Buyer {
                id: "1".into(),
                name: "Ada".into(),
                surname: "Lovelace".into(),
                gsm_number: "+900000000000".into(),
                email: "ada@example.com".into(),
                identity_number: "11111111110".into(),
                last_login_date: "2026-01-01 00:00:00".into(),
                registration_date: "2026-01-01 00:00:00".into(),
                registration_address: String::new(),
                ip: "127.0.0.1".into(),
                city: String::new(),
                country: "Turkey".into(),
                zip_code: "00000".into(),
            },
            shipping_address: PostalAddress::default(),
            billing_address: PostalAddress::default(),
            basket_items: Vec::new(),
        }
    }

    #[tokio::test]
    async fn approving_echoes_conversation() {
        let gateway = MockGateway::approving();
        let response = gateway.create_payment(&request("SC1")).await.unwrap();
        assert!(response.is_success());
        assert_eq!(response.conversation_id.as_deref(), Some("SC1"));
        assert!(response.payment_id.is_some());
    }

    #[tokio::test]
    async fn declining_and_unreachable() {
        let gateway = MockGateway::declining("Do not honour");
        let response = gateway.create_payment(&request("SC2")).await.unwrap();
        assert!(!response.is_success());
        assert_eq!(response.error_message.as_deref(), Some("Do not honour"));

        let gateway = MockGateway::unreachable();
        assert!(gateway.create_payment(&request("SC3")).await.is_err());
        assert_eq!(gateway.requests().len(), 1);
    }
}
