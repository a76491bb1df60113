use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, EntityTrait, ModelTrait,
    QueryFilter, QueryOrder, Set,
};
use uuid::Uuid;

use crate::{
    audit,
    dto::cart::{AddToCartRequest, CartView, UpdateCartItemRequest},
    entity::{
        cart_items::{ActiveModel as CartActive, Column as CartCol, Entity as CartItems},
        products::Entity as Products,
    },
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::{CartLine, Product},
    response::{ApiResponse, Meta},
    state::AppState,
};

/// The user's cart as read at one instant.
#[derive(Debug, Clone)]
pub struct CartSnapshot {
    pub lines: Vec<CartLine>,
    pub subtotal: Decimal,
}

impl CartSnapshot {
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

/// Read the user's cart lines, oldest first, with their products. Always
/// hits the database.
pub async fn snapshot<C: ConnectionTrait>(conn: &C, user_id: Uuid) -> AppResult<CartSnapshot> {
    let rows = CartItems::find()
        .filter(CartCol::UserId.eq(user_id))
        .order_by_asc(CartCol::CreatedAt)
        .find_also_related(Products)
        .all(conn)
        .await?;

    let lines: Vec<CartLine> = rows
        .into_iter()
        .filter_map(|(item, product)| {
            let product = product?;
            Some(CartLine {
                id: item.id,
                product: Product::from(product),
                quantity: item.quantity,
                unit_price: item.unit_price,
                created_at: item.created_at.with_timezone(&Utc),
            })
        })
        .collect();

    let subtotal = lines.iter().map(CartLine::line_total).sum();
    Ok(CartSnapshot { lines, subtotal })
}

pub async fn view_cart(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<CartView>> {
    cart_response(state, user.user_id, "OK").await
}

pub async fn add_to_cart(
    state: &AppState,
    user: &AuthUser,
    payload: AddToCartRequest,
) -> AppResult<ApiResponse<CartView>> {
    let quantity = payload.quantity.max(1);

    let product = Products::find_by_id(payload.product_id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    let existing = CartItems::find()
        .filter(
            Condition::all()
                .add(CartCol::UserId.eq(user.user_id))
                .add(CartCol::ProductId.eq(product.id)),
        )
        .one(&state.orm)
        .await?;

    match existing {
        Some(item) => {
            let new_quantity = item.quantity.saturating_add(quantity);
            let mut active: CartActive = item.into();
            active.quantity = Set(new_quantity);
            active.unit_price = Set(product.price);
            active.update(&state.orm).await?;
        }
        None => {
            CartActive {
                id: Set(Uuid::new_v4()),
                user_id: Set(user.user_id),
                product_id: Set(product.id),
                quantity: Set(quantity),
                unit_price: Set(product.price),
                created_at: Set(Utc::now().into()),
            }
            .insert(&state.orm)
            .await?;
        }
    }

    audit::record(
        &state.orm,
        user.user_id,
        "cart_add",
        "cart_items",
        serde_json::json!({ "product_id": product.id, "quantity": quantity }),
    )
    .await;

    cart_response(state, user.user_id, "Added to cart").await
}

/// Set a line's quantity; anything below one removes the line.
pub async fn update_cart_item(
    state: &AppState,
    user: &AuthUser,
    item_id: Uuid,
    payload: UpdateCartItemRequest,
) -> AppResult<ApiResponse<CartView>> {
    let item = find_owned_item(state, user.user_id, item_id).await?;

    if payload.quantity < 1 {
        item.delete(&state.orm).await?;
    } else {
        let mut active: CartActive = item.into();
        active.quantity = Set(payload.quantity);
        active.update(&state.orm).await?;
    }

    cart_response(state, user.user_id, "Cart updated").await
}

pub async fn remove_from_cart(
    state: &AppState,
    user: &AuthUser,
    item_id: Uuid,
) -> AppResult<ApiResponse<CartView>> {
    let item = find_owned_item(state, user.user_id, item_id).await?;
    let product_id = item.product_id;
    item.delete(&state.orm).await?;

    audit::record(
        &state.orm,
        user.user_id,
        "cart_remove",
        "cart_items",
        serde_json::json!({ "product_id": product_id }),
    )
    .await;

    cart_response(state, user.user_id, "Removed from cart").await
}

async fn find_owned_item(
    state: &AppState,
    user_id: Uuid,
    item_id: Uuid,
) -> AppResult<crate::entity::cart_items::Model> {
    CartItems::find()
        .filter(
            Condition::all()
                .add(CartCol::Id.eq(item_id))
                .add(CartCol::UserId.eq(user_id)),
        )
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)
}

async fn cart_response(
    state: &AppState,
    user_id: Uuid,
    message: &str,
) -> AppResult<ApiResponse<CartView>> {
    let CartSnapshot { lines, subtotal } = snapshot(&state.orm, user_id).await?;
    let meta = Meta::total(lines.len());
    Ok(ApiResponse::success(
        message,
        CartView {
            items: lines,
            subtotal,
        },
        Some(meta),
    ))
}
