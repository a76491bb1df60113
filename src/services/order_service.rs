use std::collections::HashMap;

use anyhow::anyhow;
use chrono::Utc;
use rand::Rng;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DatabaseConnection, DbErr,
    EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set, SqlErr,
    TransactionTrait,
};
use uuid::Uuid;

use crate::{
    audit,
    dto::orders::{CheckoutRequest, CheckoutResult, CheckoutView, OrderList, OrderWithItems},
    entity::{
        order_items::{
            ActiveModel as OrderItemActive, Column as OrderItemCol, Entity as OrderItems,
            Model as OrderItemModel,
        },
        orders::{
            ActiveModel as OrderActive, Column as OrderCol, Entity as Orders, Model as OrderModel,
            OrderStatus,
        },
        products::Entity as Products,
        user_addresses::{Column as AddressCol, Entity as UserAddresses, Model as AddressModel},
    },
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::{Address, Order, OrderItem},
    response::{ApiResponse, Meta},
    routes::params::{OrderListQuery, SortOrder},
    services::{
        cart_service::{self, CartSnapshot},
        reconciliation,
        shipping::{self, Carrier},
    },
    state::AppState,
};

pub const DEFAULT_CARRIER: Carrier = Carrier::Yurtici;

/// Attempts at allocating an unused order number before giving up.
pub const MAX_ORDER_NUMBER_ATTEMPTS: usize = 5;

/// `SC` + UTC timestamp to the second + three random digits.
pub fn generate_order_number() -> String {
    let suffix: u16 = rand::thread_rng().gen_range(100..999);
    format!("SC{}{}", Utc::now().format("%Y%m%d%H%M%S"), suffix)
}

fn is_unique_violation(err: &DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}

/// A freshly persisted order and its lines.
#[derive(Debug, Clone)]
pub struct PlacedOrder {
    pub order: OrderModel,
    pub items: Vec<OrderItemModel>,
}

/// Turn a cart snapshot into a Pending order. The cart itself is left alone;
/// it is cleared only once payment succeeds.
pub async fn create_order(
    conn: &DatabaseConnection,
    user_id: Uuid,
    cart: &CartSnapshot,
    carrier_code: &str,
    address_id: Option<Uuid>,
) -> AppResult<PlacedOrder> {
    create_order_with(
        conn,
        user_id,
        cart,
        carrier_code,
        address_id,
        generate_order_number,
    )
    .await
}

/// [`create_order`] with a caller-supplied order number source.
pub async fn create_order_with<F>(
    conn: &DatabaseConnection,
    user_id: Uuid,
    cart: &CartSnapshot,
    carrier_code: &str,
    address_id: Option<Uuid>,
    mut next_order_number: F,
) -> AppResult<PlacedOrder>
where
    F: FnMut() -> String,
{
    if cart.is_empty() {
        return Err(AppError::BadRequest("Your cart is empty".into()));
    }

    let subtotal: Decimal = cart.lines.iter().map(|line| line.line_total()).sum();
    let shipping_cost = shipping::shipping_cost(carrier_code, &cart.lines);
    let total = subtotal + shipping_cost;
    let address_id = address_id.filter(|id| !id.is_nil());
    let shipping_provider = Carrier::parse(carrier_code)
        .map(|carrier| carrier.code().to_string())
        .unwrap_or_else(|| carrier_code.trim().to_string());

    for attempt in 1..=MAX_ORDER_NUMBER_ATTEMPTS {
        let order_number = next_order_number();
        let now = Utc::now();
        let txn = conn.begin().await?;

        let inserted = OrderActive {
            id: Set(Uuid::new_v4()),
            order_number: Set(order_number.clone()),
            user_id: Set(user_id),
            shipping_provider: Set(shipping_provider.clone()),
            address_id: Set(address_id),
            subtotal: Set(subtotal),
            shipping_cost: Set(shipping_cost),
            total: Set(total),
            status: Set(OrderStatus::Pending),
            payment_id: Set(None),
            conversation_id: Set(None),
            payment_status: Set(None),
            payment_last_error: Set(None),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        }
        .insert(&txn)
        .await;

        let order = match inserted {
            Ok(order) => order,
            Err(err) if is_unique_violation(&err) => {
                txn.rollback().await?;
                tracing::warn!(%order_number, attempt, "order number already taken, retrying");
                continue;
            }
            Err(err) => return Err(err.into()),
        };

        let mut items = Vec::with_capacity(cart.lines.len());
        for line in &cart.lines {
            let item = OrderItemActive {
                id: Set(Uuid::new_v4()),
                order_id: Set(order.id),
                product_id: Set(line.product.id),
                quantity: Set(line.quantity),
                unit_price: Set(line.unit_price),
                created_at: Set(now.into()),
            }
            .insert(&txn)
            .await?;
            items.push(item);
        }

        txn.commit().await?;

        tracing::info!(
            order_number = %order.order_number,
            %user_id,
            %subtotal,
            %shipping_cost,
            %total,
            "order created"
        );
        return Ok(PlacedOrder { order, items });
    }

    Err(AppError::Internal(anyhow!(
        "no unique order number after {MAX_ORDER_NUMBER_ATTEMPTS} attempts"
    )))
}

/// The user's addresses, default first, then oldest first.
async fn user_addresses<C: ConnectionTrait>(conn: &C, user_id: Uuid) -> AppResult<Vec<AddressModel>> {
    let addresses = UserAddresses::find()
        .filter(AddressCol::UserId.eq(user_id))
        .order_by_desc(AddressCol::IsDefault)
        .order_by_asc(AddressCol::CreatedAt)
        .all(conn)
        .await?;
    Ok(addresses)
}

pub async fn checkout_view(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<CheckoutView>> {
    let cart = cart_service::snapshot(&state.orm, user.user_id).await?;
    let addresses = user_addresses(&state.orm, user.user_id).await?;

    let selected_address_id = addresses
        .iter()
        .find(|a| a.is_default)
        .or_else(|| addresses.first())
        .map(|a| a.id);
    let shipping_cost = DEFAULT_CARRIER.cost(&cart.lines);

    let view = CheckoutView {
        shipping_options: shipping::shipping_options(&cart.lines),
        total: cart.subtotal + shipping_cost,
        subtotal: cart.subtotal,
        items: cart.lines,
        addresses: addresses.into_iter().map(Address::from).collect(),
        selected_address_id,
        shipping_provider: DEFAULT_CARRIER.code().to_string(),
        shipping_cost,
    };

    Ok(ApiResponse::ok(view))
}

pub async fn submit_checkout(
    state: &AppState,
    user: &AuthUser,
    payload: CheckoutRequest,
) -> AppResult<ApiResponse<CheckoutResult>> {
    let cart = cart_service::snapshot(&state.orm, user.user_id).await?;
    if cart.is_empty() {
        return Err(AppError::BadRequest("Your cart is empty".into()));
    }

    if payload.shipping_provider.trim().is_empty() {
        return Err(AppError::BadRequest("Please select a shipping provider".into()));
    }
    let carrier = Carrier::parse(&payload.shipping_provider).ok_or_else(|| {
        AppError::BadRequest(format!(
            "Unsupported shipping provider {}",
            payload.shipping_provider
        ))
    })?;

    let address_id = payload.address_id.filter(|id| !id.is_nil());
    if let Some(address_id) = address_id {
        let owned = UserAddresses::find()
            .filter(
                Condition::all()
                    .add(AddressCol::Id.eq(address_id))
                    .add(AddressCol::UserId.eq(user.user_id)),
            )
            .one(&state.orm)
            .await?;
        if owned.is_none() {
            return Err(AppError::BadRequest("Please select a valid address".into()));
        }
    }

    let placed = create_order(&state.orm, user.user_id, &cart, carrier.code(), address_id).await?;

    audit::record(
        &state.orm,
        user.user_id,
        "checkout",
        "orders",
        serde_json::json!({
            "order_number": placed.order.order_number,
            "total": placed.order.total,
        }),
    )
    .await;

    let items = placed
        .items
        .into_iter()
        .zip(&cart.lines)
        .map(|(item, line)| OrderItem::from_entity(item, Some(line.product.name.clone())))
        .collect();

    let payment_path = format!("/api/payments/{}", placed.order.order_number);
    Ok(ApiResponse::success(
        "Order created",
        CheckoutResult {
            order: Order::from(placed.order),
            items,
            payment_path,
        },
        Some(Meta::empty()),
    ))
}

/// Look up an order by number, scoped to its owner. Other users' orders are
/// indistinguishable from missing ones.
pub async fn find_user_order<C: ConnectionTrait>(
    conn: &C,
    user_id: Uuid,
    order_number: &str,
) -> AppResult<OrderModel> {
    Orders::find()
        .filter(
            Condition::all()
                .add(OrderCol::OrderNumber.eq(order_number))
                .add(OrderCol::UserId.eq(user_id)),
        )
        .one(conn)
        .await?
        .ok_or(AppError::NotFound)
}

pub async fn find_order_by_number<C: ConnectionTrait>(
    conn: &C,
    order_number: &str,
) -> AppResult<OrderModel> {
    Orders::find()
        .filter(OrderCol::OrderNumber.eq(order_number))
        .one(conn)
        .await?
        .ok_or(AppError::NotFound)
}

/// Attach items (with product names) and addresses to a batch of orders.
pub async fn with_details<C: ConnectionTrait>(
    conn: &C,
    orders: Vec<OrderModel>,
) -> AppResult<Vec<OrderWithItems>> {
    let order_ids: Vec<Uuid> = orders.iter().map(|o| o.id).collect();
    let address_ids: Vec<Uuid> = orders.iter().filter_map(|o| o.address_id).collect();

    let mut items_by_order: HashMap<Uuid, Vec<OrderItem>> = HashMap::new();
    if !order_ids.is_empty() {
        let rows = OrderItems::find()
            .filter(OrderItemCol::OrderId.is_in(order_ids))
            .order_by_asc(OrderItemCol::CreatedAt)
            .find_also_related(Products)
            .all(conn)
            .await?;
        for (item, product) in rows {
            items_by_order
                .entry(item.order_id)
                .or_default()
                .push(OrderItem::from_entity(item, product.map(|p| p.name)));
        }
    }

    let mut addresses: HashMap<Uuid, AddressModel> = HashMap::new();
    if !address_ids.is_empty() {
        for address in UserAddresses::find()
            .filter(AddressCol::Id.is_in(address_ids))
            .all(conn)
            .await?
        {
            addresses.insert(address.id, address);
        }
    }

    Ok(orders
        .into_iter()
        .map(|order| {
            let items = items_by_order.remove(&order.id).unwrap_or_default();
            let address = order
                .address_id
                .and_then(|id| addresses.get(&id).cloned())
                .map(Address::from);
            let total_items: i64 = items.iter().map(|i| i64::from(i.quantity)).sum();
            OrderWithItems {
                order: Order::from(order),
                items,
                address,
                total_items,
            }
        })
        .collect())
}

pub async fn list_orders(
    state: &AppState,
    user: &AuthUser,
    query: OrderListQuery,
) -> AppResult<ApiResponse<OrderList>> {
    let (page, limit, offset) = query.pagination.normalize();
    let mut condition = Condition::all().add(OrderCol::UserId.eq(user.user_id));
    if let Some(status) = query.status {
        condition = condition.add(OrderCol::Status.eq(status));
    }

    let mut finder = Orders::find().filter(condition);
    finder = match query.sort_order.unwrap_or(SortOrder::Desc) {
        SortOrder::Asc => finder.order_by_asc(OrderCol::CreatedAt),
        SortOrder::Desc => finder.order_by_desc(OrderCol::CreatedAt),
    };

    let total = finder.clone().count(&state.orm).await? as i64;
    let orders = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?;

    let items = with_details(&state.orm, orders).await?;
    Ok(ApiResponse::success(
        "Ok",
        OrderList { items },
        Some(Meta::new(page, limit, total)),
    ))
}

pub async fn get_order(
    state: &AppState,
    user: &AuthUser,
    order_number: &str,
) -> AppResult<ApiResponse<OrderWithItems>> {
    let order = find_user_order(&state.orm, user.user_id, order_number).await?;
    let details = with_details(&state.orm, vec![order])
        .await?
        .pop()
        .ok_or(AppError::NotFound)?;
    Ok(ApiResponse::ok(details))
}

pub async fn cancel_order(
    state: &AppState,
    user: &AuthUser,
    order_number: &str,
) -> AppResult<ApiResponse<Order>> {
    let order = find_user_order(&state.orm, user.user_id, order_number).await?;
    let order = reconciliation::cancel(&state.orm, order).await?;

    audit::record(
        &state.orm,
        user.user_id,
        "order_cancel",
        "orders",
        serde_json::json!({ "order_number": order.order_number }),
    )
    .await;

    Ok(ApiResponse::success(
        "Order cancelled",
        Order::from(order),
        Some(Meta::empty()),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_number_layout() {
        let number = generate_order_number();
        assert!(number.starts_with("SC"));
        assert_eq!(number.len(), 2 + 14 + 3);
        assert!(number[2..].chars().all(|c| c.is_ascii_digit()));

        let suffix: u16 = number[16..].parse().unwrap();
        assert!((100..999).contains(&suffix));
    }
}
