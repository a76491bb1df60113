use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::entity::{
    order_items::Model as OrderItemModel,
    orders::{Model as OrderModel, OrderStatus},
    products::Model as ProductModel,
    user_addresses::Model as AddressModel,
};

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub category: Option<String>,
    pub price: Decimal,
    pub created_at: DateTime<Utc>,
}

/// One line of a user's cart joined with its product.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CartLine {
    pub id: Uuid,
    pub product: Product,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub created_at: DateTime<Utc>,
}

impl CartLine {
    pub fn line_total(&self) -> Decimal {
        self.unit_price * Decimal::from(self.quantity)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct ShippingOption {
    pub provider: String,
    pub display_name: String,
    pub cost: Decimal,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct Address {
    pub id: Uuid,
    pub title: String,
    pub full_name: String,
    pub phone: String,
    pub city: String,
    pub district: String,
    pub neighborhood: String,
    pub details: String,
    pub is_default: bool,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct Order {
    pub id: Uuid,
    pub order_number: String,
    pub user_id: Uuid,
    pub shipping_provider: String,
    pub address_id: Option<Uuid>,
    pub subtotal: Decimal,
    pub shipping_cost: Decimal,
    pub total: Decimal,
    pub status: OrderStatus,
    pub payment_id: Option<String>,
    pub conversation_id: Option<String>,
    pub payment_status: Option<String>,
    pub payment_last_error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct OrderItem {
    pub id: Uuid,
    pub order_id: Uuid,
    pub product_id: Uuid,
    pub product_name: Option<String>,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub line_total: Decimal,
}

/// Provider references returned by a successful charge.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct PaymentInfo {
    pub payment_id: Option<String>,
    pub conversation_id: Option<String>,
    pub status: Option<String>,
    pub auth_code: Option<String>,
    pub host_reference: Option<String>,
}

impl From<ProductModel> for Product {
    fn from(model: ProductModel) -> Self {
        Self {
            id: model.id,
            name: model.name,
            category: model.category,
            price: model.price,
            created_at: model.created_at.with_timezone(&Utc),
        }
    }
}

impl From<AddressModel> for Address {
    fn from(model: AddressModel) -> Self {
        Self {
            id: model.id,
            title: model.title,
            full_name: model.full_name,
            phone: model.phone,
            city: model.city,
            district: model.district,
            neighborhood: model.neighborhood,
            details: model.details,
            is_default: model.is_default,
        }
    }
}

impl From<OrderModel> for Order {
    fn from(model: OrderModel) -> Self {
        Self {
            id: model.id,
            order_number: model.order_number,
            user_id: model.user_id,
            shipping_provider: model.shipping_provider,
            address_id: model.address_id,
            subtotal: model.subtotal,
            shipping_cost: model.shipping_cost,
            total: model.total,
            status: model.status,
            payment_id: model.payment_id,
            conversation_id: model.conversation_id,
            payment_status: model.payment_status,
            payment_last_error: model.payment_last_error,
            created_at: model.created_at.with_timezone(&Utc),
            updated_at: model.updated_at.with_timezone(&Utc),
        }
    }
}

impl OrderItem {
    pub fn from_entity(model: OrderItemModel, product_name: Option<String>) -> Self {
        Self {
            id: model.id,
            order_id: model.order_id,
            product_id: model.product_id,
            product_name,
            quantity: model.quantity,
            unit_price: model.unit_price,
            line_total: model.line_total(),
        }
    }
}
