use utoipa::{
    Modify, OpenApi,
    openapi::{
        self,
        OpenApi as OpenApiSpec,
        security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    },
};
use utoipa_scalar::{Scalar, Servable};

use crate::{
    dto::{
        cart::{AddToCartRequest, CartView, UpdateCartItemRequest},
        orders::{
            CheckoutRequest, CheckoutResult, CheckoutView, OrderList, OrderWithItems,
            PayOrderRequest, PaymentConfirmation, PaymentView, UpdateOrderStatusRequest,
        },
    },
    entity::orders::OrderStatus,
    models::{Address, CartLine, Order, OrderItem, Product, ShippingOption},
    response::{ApiResponse, Meta},
    routes::{admin, cart, checkout, health, orders, params, payments},
};

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        cart::cart_list,
        cart::add_to_cart,
        cart::update_cart_item,
        cart::remove_from_cart,
        checkout::checkout_view,
        checkout::submit_checkout,
        payments::payment_view,
        payments::pay_order,
        orders::list_orders,
        orders::get_order,
        orders::cancel_order,
        admin::update_order_status
    ),
    components(
        schemas(
            Product,
            CartLine,
            ShippingOption,
            Address,
            Order,
            OrderItem,
            OrderStatus,
            AddToCartRequest,
            UpdateCartItemRequest,
            CartView,
            CheckoutView,
            CheckoutRequest,
            CheckoutResult,
            PaymentView,
            PayOrderRequest,
            PaymentConfirmation,
            OrderList,
            OrderWithItems,
            UpdateOrderStatusRequest,
            params::Pagination,
            params::SortOrder,
            params::OrderListQuery,
            Meta,
            ApiResponse<CartView>,
            ApiResponse<CheckoutView>,
            ApiResponse<CheckoutResult>,
            ApiResponse<PaymentView>,
            ApiResponse<PaymentConfirmation>,
            ApiResponse<OrderWithItems>,
            ApiResponse<OrderList>,
            ApiResponse<Order>
        )
    ),
    security(
        ("bearer_auth" = [])
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Health check endpoint"),
        (name = "Cart", description = "Cart endpoints"),
        (name = "Checkout", description = "Shipping selection and order creation"),
        (name = "Payments", description = "Card payment for pending orders"),
        (name = "Orders", description = "Order history and cancellation"),
        (name = "Admin", description = "Admin endpoints"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}
