mod common;

use std::sync::Arc;

use rust_decimal_macros::dec;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, Set};
use storefront_checkout::{
    config::PaymentConfig,
    db::OrmConn,
    dto::{
        cart::AddToCartRequest,
        orders::{CheckoutRequest, PayOrderRequest},
    },
    entity::{
        cart_items::{Column as CartCol, Entity as CartItems},
        orders::{self, Column as OrderCol, Entity as Orders, Model as OrderModel, OrderStatus},
    },
    error::AppError,
    gateway::{PaymentGateway, PaymentRequest, PaymentResponse},
    middleware::auth::AuthUser,
    models::PaymentInfo,
    services::{
        cart_service, order_service, payment_service, payment_service::PaymentService,
        reconciliation,
    },
};

use common::{TestApp, auth, create_product, create_user, setup};

/// Places an order and returns the stored row as it was right after checkout.
async fn pending_order(app: &TestApp, me: &AuthUser) -> anyhow::Result<OrderModel> {
    let product = create_product(&app.state.orm, "Lamp", None, dec!(40)).await?;
    cart_service::add_to_cart(&app.state, me, AddToCartRequest { product_id: product.id, quantity: 1 })
        .await?;
    let order = order_service::submit_checkout(
        &app.state,
        me,
        CheckoutRequest {
            shipping_provider: "Yurtici".into(),
            address_id: None,
        },
    )
    .await?
    .data
    .expect("checkout result")
    .order;
    Ok(stored(&app.state.orm, &order.order_number).await?)
}

async fn stored(orm: &OrmConn, order_number: &str) -> anyhow::Result<OrderModel> {
    Ok(Orders::find()
        .filter(OrderCol::OrderNumber.eq(order_number))
        .one(orm)
        .await?
        .expect("stored order"))
}

fn card() -> PayOrderRequest {
    PayOrderRequest {
        card_name: "Ada Lovelace".into(),
        card_number: "4603450000000000".into(),
        expiry: "01/29".into(),
        cvc: "000".into(),
    }
}

fn approved(payment_id: &str) -> PaymentInfo {
    PaymentInfo {
        payment_id: Some(payment_id.into()),
        conversation_id: Some("conv-1".into()),
        status: Some("success".into()),
        auth_code: None,
        host_reference: None,
    }
}

#[tokio::test]
async fn cancel_with_outdated_copy_keeps_paid_order() -> anyhow::Result<()> {
    let app = setup().await?;
    let user = create_user(&app.state.orm, "late-cancel@example.com", None, "user").await?;
    let me = auth(&user);

    let outdated = pending_order(&app, &me).await?;
    payment_service::submit_payment(&app.state, &me, &outdated.order_number, card(), None).await?;

    let err = reconciliation::cancel(&app.state.orm, outdated.clone())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(ref m) if m.contains("Paid")));

    let order = stored(&app.state.orm, &outdated.order_number).await?;
    assert_eq!(order.status, OrderStatus::Paid);
    assert!(order.payment_id.is_some());
    assert_eq!(order.payment_status.as_deref(), Some("success"));
    Ok(())
}

#[tokio::test]
async fn paying_a_cancelled_order_is_rejected_and_keeps_cart() -> anyhow::Result<()> {
    let app = setup().await?;
    let user = create_user(&app.state.orm, "late-pay@example.com", None, "user").await?;
    let me = auth(&user);

    let outdated = pending_order(&app, &me).await?;
    reconciliation::cancel(&app.state.orm, outdated.clone()).await?;

    let err = reconciliation::mark_paid(&app.state.orm, outdated.clone(), Some(&approved("pay-42")))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));

    let order = stored(&app.state.orm, &outdated.order_number).await?;
    assert_eq!(order.status, OrderStatus::Cancelled);
    assert_eq!(order.payment_id, None);

    let cart_lines = CartItems::find()
        .filter(CartCol::UserId.eq(user.id))
        .all(&app.state.orm)
        .await?;
    assert_eq!(cart_lines.len(), 1);
    Ok(())
}

#[tokio::test]
async fn late_failure_does_not_touch_paid_order() -> anyhow::Result<()> {
    let app = setup().await?;
    let user = create_user(&app.state.orm, "late-fail@example.com", None, "user").await?;
    let me = auth(&user);

    let outdated = pending_order(&app, &me).await?;
    let paid = reconciliation::mark_paid(&app.state.orm, outdated.clone(), Some(&approved("pay-7")))
        .await?;
    assert_eq!(paid.status, OrderStatus::Paid);

    let after = reconciliation::record_failure(&app.state.orm, outdated, "Card declined").await?;
    assert_eq!(after.status, OrderStatus::Paid);
    assert_eq!(after.payment_status.as_deref(), Some("success"));
    assert_eq!(after.payment_last_error, None);
    assert_eq!(after.payment_id.as_deref(), Some("pay-7"));
    Ok(())
}

/// Approves every charge, but cancels the order while the charge is in flight.
struct CancelsDuringCharge {
    orm: OrmConn,
}

#[async_trait::async_trait]
impl PaymentGateway for CancelsDuringCharge {
    fn name(&self) -> &'static str {
        "cancels-during-charge"
    }

    async fn create_payment(&self, request: &PaymentRequest) -> anyhow::Result<PaymentResponse> {
        Orders::update_many()
            .set(orders::ActiveModel {
                status: Set(OrderStatus::Cancelled),
                ..Default::default()
            })
            .filter(OrderCol::OrderNumber.eq(request.basket_id.as_str()))
            .exec(&self.orm)
            .await?;

        Ok(PaymentResponse {
            status: Some("success".into()),
            payment_id: Some("pay-in-flight".into()),
            conversation_id: Some(request.conversation_id.clone()),
            ..Default::default()
        })
    }
}

#[tokio::test]
async fn order_cancelled_during_charge_is_not_marked_paid() -> anyhow::Result<()> {
    let mut app = setup().await?;
    let user = create_user(&app.state.orm, "race@example.com", None, "user").await?;
    let me = auth(&user);
    let order = pending_order(&app, &me).await?;

    let gateway = CancelsDuringCharge {
        orm: app.state.orm.clone(),
    };
    app.state.payments = PaymentService::new(Arc::new(gateway), &PaymentConfig::default());

    let err = payment_service::submit_payment(&app.state, &me, &order.order_number, card(), None)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));

    let order = stored(&app.state.orm, &order.order_number).await?;
    assert_eq!(order.status, OrderStatus::Cancelled);
    assert_eq!(order.payment_id, None);
    assert_ne!(order.payment_status.as_deref(), Some("success"));
    Ok(())
}
