use crate::{
    audit,
    dto::orders::UpdateOrderStatusRequest,
    error::AppResult,
    middleware::auth::{AuthUser, ensure_admin},
    models::Order,
    response::{ApiResponse, Meta},
    services::{order_service, reconciliation},
    state::AppState,
};

/// Fulfilment override: an admin may move an order to any status.
pub async fn update_order_status(
    state: &AppState,
    user: &AuthUser,
    order_number: &str,
    payload: UpdateOrderStatusRequest,
) -> AppResult<ApiResponse<Order>> {
    ensure_admin(user)?;

    let existing = order_service::find_order_by_number(&state.orm, order_number).await?;
    let order = reconciliation::set_status(&state.orm, existing, payload.status).await?;

    audit::record(
        &state.orm,
        user.user_id,
        "order_status_update",
        "orders",
        serde_json::json!({
            "order_number": order.order_number,
            "status": order.status.as_str(),
        }),
    )
    .await;

    Ok(ApiResponse::success(
        "Order updated",
        Order::from(order),
        Some(Meta::empty()),
    ))
}
