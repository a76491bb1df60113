use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    entity::orders::OrderStatus,
    models::{Address, CartLine, Order, OrderItem, ShippingOption},
};

#[derive(Debug, Serialize, ToSchema)]
pub struct CheckoutView {
    pub items: Vec<CartLine>,
    pub subtotal: Decimal,
    pub shipping_options: Vec<ShippingOption>,
    pub addresses: Vec<Address>,
    pub selected_address_id: Option<Uuid>,
    pub shipping_provider: String,
    pub shipping_cost: Decimal,
    pub total: Decimal,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CheckoutRequest {
    pub shipping_provider: String,
    /// Absent or the nil UUID means "no address".
    pub address_id: Option<Uuid>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CheckoutResult {
    pub order: Order,
    pub items: Vec<OrderItem>,
    pub payment_path: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PaymentView {
    pub order_number: String,
    pub total: Decimal,
    pub shipping_provider: String,
    pub status: OrderStatus,
    pub payment_status: Option<String>,
    pub payment_last_error: Option<String>,
}

#[derive(Deserialize, ToSchema)]
pub struct PayOrderRequest {
    pub card_name: String,
    pub card_number: String,
    /// `MM/YY`, `MM/YYYY`, `MM-YY` or `MM-YYYY`.
    pub expiry: String,
    pub cvc: String,
}

impl std::fmt::Debug for PayOrderRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PayOrderRequest")
            .field("card_name", &self.card_name)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PaymentConfirmation {
    pub provider: String,
    pub order_number: String,
    pub total: Decimal,
    pub payment_id: Option<String>,
    pub conversation_id: Option<String>,
    pub auth_code: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderWithItems {
    pub order: Order,
    pub items: Vec<OrderItem>,
    pub address: Option<Address>,
    pub total_items: i64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderList {
    pub items: Vec<OrderWithItems>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateOrderStatusRequest {
    pub status: OrderStatus,
}
