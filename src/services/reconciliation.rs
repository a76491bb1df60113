//! Order status transitions driven by payment outcomes and user cancellation.
//!
//! ```text
//! Pending --charge ok--> Paid --admin--> Shipped
//!    |  \--charge failed--> Pending (payment_status = "failure", retryable)
//!    \--user cancel--> Cancelled
//! ```
//!
//! Every transition out of Pending is a single `UPDATE .. WHERE status =
//! 'Pending'`, so a caller holding a stale copy of the order cannot overwrite
//! a transition that happened in between.

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    Set, TransactionTrait,
};

use crate::{
    entity::{
        cart_items::{Column as CartCol, Entity as CartItems},
        orders::{
            ActiveModel as OrderActive, Column as OrderCol, Entity as Orders, Model as OrderModel,
            OrderStatus,
        },
    },
    error::{AppError, AppResult},
    models::PaymentInfo,
};

pub const PAYMENT_STATUS_SUCCESS: &str = "success";
pub const PAYMENT_STATUS_FAILURE: &str = "failure";

/// Column width of `orders.payment_last_error`.
const LAST_ERROR_MAX_CHARS: usize = 256;

/// Apply `changes` only if the order is still Pending. Returns the number of
/// rows touched (0 or 1).
async fn update_if_pending<C: ConnectionTrait>(
    conn: &C,
    order: &OrderModel,
    changes: OrderActive,
) -> AppResult<u64> {
    let result = Orders::update_many()
        .set(changes)
        .filter(OrderCol::Id.eq(order.id))
        .filter(OrderCol::Status.eq(OrderStatus::Pending))
        .exec(conn)
        .await?;
    Ok(result.rows_affected)
}

async fn reload<C: ConnectionTrait>(conn: &C, order: &OrderModel) -> AppResult<OrderModel> {
    Orders::find_by_id(order.id)
        .one(conn)
        .await?
        .ok_or(AppError::NotFound)
}

/// Record a successful charge: the order becomes Paid and the user's whole
/// cart is emptied (not only the lines that made up this order), in one
/// transaction. Fails without side effects if the order left Pending while
/// the charge was in flight.
pub async fn mark_paid(
    conn: &DatabaseConnection,
    order: OrderModel,
    info: Option<&PaymentInfo>,
) -> AppResult<OrderModel> {
    let txn = conn.begin().await?;

    let mut changes = OrderActive {
        status: Set(OrderStatus::Paid),
        payment_status: Set(Some(PAYMENT_STATUS_SUCCESS.to_string())),
        payment_last_error: Set(None),
        updated_at: Set(Utc::now().into()),
        ..Default::default()
    };
    if let Some(info) = info {
        changes.payment_id = Set(info.payment_id.clone());
        changes.conversation_id = Set(info.conversation_id.clone());
    }

    if update_if_pending(&txn, &order, changes).await? == 0 {
        let current = reload(&txn, &order).await?;
        txn.rollback().await?;
        tracing::error!(
            order_number = %order.order_number,
            status = current.status.as_str(),
            payment_id = ?info.and_then(|i| i.payment_id.as_deref()),
            "charge succeeded but order is no longer pending"
        );
        return Err(AppError::BadRequest(format!(
            "Order in status {} is not awaiting payment",
            current.status.as_str()
        )));
    }

    let removed = CartItems::delete_many()
        .filter(CartCol::UserId.eq(order.user_id))
        .exec(&txn)
        .await?;

    let order = reload(&txn, &order).await?;
    txn.commit().await?;

    tracing::info!(
        order_number = %order.order_number,
        payment_id = ?order.payment_id,
        cart_lines_removed = removed.rows_affected,
        "order paid"
    );
    Ok(order)
}

/// Record a declined or failed charge. Status stays Pending and the cart is
/// untouched so the same order number can be paid again. An order that left
/// Pending in the meantime keeps its payment fields as they are.
pub async fn record_failure<C: ConnectionTrait>(
    conn: &C,
    order: OrderModel,
    message: &str,
) -> AppResult<OrderModel> {
    let changes = OrderActive {
        payment_status: Set(Some(PAYMENT_STATUS_FAILURE.to_string())),
        payment_last_error: Set(Some(message.chars().take(LAST_ERROR_MAX_CHARS).collect())),
        updated_at: Set(Utc::now().into()),
        ..Default::default()
    };

    if update_if_pending(conn, &order, changes).await? == 0 {
        tracing::warn!(
            order_number = %order.order_number,
            "payment failure not recorded, order is no longer pending"
        );
    }
    reload(conn, &order).await
}

pub async fn cancel<C: ConnectionTrait>(conn: &C, order: OrderModel) -> AppResult<OrderModel> {
    let rejected = |status: OrderStatus| {
        AppError::BadRequest(format!(
            "Order in status {} cannot be cancelled",
            status.as_str()
        ))
    };
    if !order.status.can_cancel() {
        return Err(rejected(order.status));
    }

    let changes = OrderActive {
        status: Set(OrderStatus::Cancelled),
        updated_at: Set(Utc::now().into()),
        ..Default::default()
    };
    if update_if_pending(conn, &order, changes).await? == 0 {
        let current = reload(conn, &order).await?;
        return Err(rejected(current.status));
    }

    let order = reload(conn, &order).await?;
    tracing::info!(order_number = %order.order_number, "order cancelled");
    Ok(order)
}

/// Administrative override used for fulfilment (e.g. Paid -> Shipped).
pub async fn set_status<C: ConnectionTrait>(
    conn: &C,
    order: OrderModel,
    status: OrderStatus,
) -> AppResult<OrderModel> {
    let previous = order.status;
    let mut active: OrderActive = order.into();
    active.status = Set(status);
    active.updated_at = Set(Utc::now().into());
    let order = active.update(conn).await?;

    tracing::info!(
        order_number = %order.order_number,
        from = previous.as_str(),
        to = status.as_str(),
        "order status changed"
    );
    Ok(order)
}
