mod common;

use rust_decimal_macros::dec;
use storefront_checkout::{
    dto::{
        cart::AddToCartRequest,
        orders::{CheckoutRequest, PayOrderRequest, UpdateOrderStatusRequest},
    },
    entity::orders::OrderStatus,
    error::AppError,
    middleware::auth::AuthUser,
    models::Order,
    routes::params::{OrderListQuery, Pagination},
    services::{admin_service, cart_service, order_service, payment_service},
};

use common::{TestApp, auth, create_address, create_product, create_user, setup};

async fn place_order(app: &TestApp, me: &AuthUser, carrier: &str) -> anyhow::Result<Order> {
    let product = create_product(
        &app.state.orm,
        &format!("Widget {carrier} {}", uuid::Uuid::new_v4()),
        None,
        dec!(15),
    )
    .await?;
    cart_service::add_to_cart(&app.state, me, AddToCartRequest { product_id: product.id, quantity: 2 })
        .await?;
    let order = order_service::submit_checkout(
        &app.state,
        me,
        CheckoutRequest {
            shipping_provider: carrier.into(),
            address_id: None,
        },
    )
    .await?
    .data
    .expect("checkout result")
    .order;
    Ok(order)
}

async fn pay(app: &TestApp, me: &AuthUser, order: &Order) -> anyhow::Result<()> {
    payment_service::submit_payment(
        &app.state,
        me,
        &order.order_number,
        PayOrderRequest {
            card_name: "Ada Lovelace".into(),
            card_number: "4603450000000000".into(),
            expiry: "01/29".into(),
            cvc: "000".into(),
        },
        None,
    )
    .await?;
    Ok(())
}

// Integration flow: checkout -> cancel while pending; checkout -> pay -> admin ships.
#[tokio::test]
async fn cancel_pay_and_ship_flow() -> anyhow::Result<()> {
    let app = setup().await?;
    let user = create_user(&app.state.orm, "user@example.com", None, "user").await?;
    let admin = create_user(&app.state.orm, "admin@example.com", None, "admin").await?;
    let me = auth(&user);
    let auth_admin = auth(&admin);

    let first = place_order(&app, &me, "Yurtici").await?;
    let cancelled = order_service::cancel_order(&app.state, &me, &first.order_number)
        .await?
        .data
        .expect("cancelled order");
    assert_eq!(cancelled.status, OrderStatus::Cancelled);

    // Cancelled orders cannot be paid.
    let err = payment_service::submit_payment(
        &app.state,
        &me,
        &first.order_number,
        PayOrderRequest {
            card_name: "Ada".into(),
            card_number: "4603450000000000".into(),
            expiry: "01/29".into(),
            cvc: "000".into(),
        },
        None,
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));

    let second = place_order(&app, &me, "Aras").await?;
    pay(&app, &me, &second).await?;

    let err = order_service::cancel_order(&app.state, &me, &second.order_number)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));

    let err = admin_service::update_order_status(
        &app.state,
        &me,
        &second.order_number,
        UpdateOrderStatusRequest {
            status: OrderStatus::Shipped,
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::Forbidden));

    let shipped = admin_service::update_order_status(
        &app.state,
        &auth_admin,
        &second.order_number,
        UpdateOrderStatusRequest {
            status: OrderStatus::Shipped,
        },
    )
    .await?
    .data
    .expect("updated order");
    assert_eq!(shipped.status, OrderStatus::Shipped);

    let err = admin_service::update_order_status(
        &app.state,
        &auth_admin,
        "SC00000000000000000",
        UpdateOrderStatusRequest {
            status: OrderStatus::Shipped,
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::NotFound));
    Ok(())
}

#[tokio::test]
async fn order_history_lists_own_orders_with_details() -> anyhow::Result<()> {
    let app = setup().await?;
    let user = create_user(&app.state.orm, "hist@example.com", None, "user").await?;
    let other = create_user(&app.state.orm, "other@example.com", None, "user").await?;
    let me = auth(&user);
    let address = create_address(&app.state.orm, user.id, "Grace Hopper", true).await?;

    let product = create_product(&app.state.orm, "Notebook", None, dec!(7.5)).await?;
    cart_service::add_to_cart(&app.state, &me, AddToCartRequest { product_id: product.id, quantity: 4 })
        .await?;
    let with_address = order_service::submit_checkout(
        &app.state,
        &me,
        CheckoutRequest {
            shipping_provider: "Mng".into(),
            address_id: Some(address.id),
        },
    )
    .await?
    .data
    .expect("checkout result")
    .order;
    pay(&app, &me, &with_address).await?;

    let pending = place_order(&app, &me, "Yurtici").await?;
    place_order(&app, &auth(&other), "Aras").await?;

    let all = order_service::list_orders(&app.state, &me, OrderListQuery::default())
        .await?;
    assert_eq!(all.meta.as_ref().and_then(|m| m.total), Some(2));
    let all = all.data.expect("order list");
    assert_eq!(all.items.len(), 2);
    assert!(all.items.iter().all(|o| o.order.user_id == user.id));

    let pending_only = order_service::list_orders(
        &app.state,
        &me,
        OrderListQuery {
            pagination: Pagination::default(),
            status: Some(OrderStatus::Pending),
            sort_order: None,
        },
    )
    .await?
    .data
    .expect("order list");
    assert_eq!(pending_only.items.len(), 1);
    assert_eq!(pending_only.items[0].order.order_number, pending.order_number);

    let details = order_service::get_order(&app.state, &me, &with_address.order_number)
        .await?
        .data
        .expect("order details");
    assert_eq!(details.order.status, OrderStatus::Paid);
    assert_eq!(details.total_items, 4);
    assert_eq!(details.items.len(), 1);
    assert_eq!(details.items[0].product_name.as_deref(), Some("Notebook"));
    assert_eq!(details.items[0].line_total.round_dp(2), dec!(30.00));
    assert_eq!(
        details.address.as_ref().map(|a| a.full_name.as_str()),
        Some("Grace Hopper")
    );

    let err = order_service::get_order(&app.state, &auth(&other), &with_address.order_number)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound));
    Ok(())
}
