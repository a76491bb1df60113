use axum::{
    Json, Router,
    extract::{Path, State},
    routing::get,
};

use crate::{
    dto::orders::{PayOrderRequest, PaymentConfirmation, PaymentView},
    error::AppResult,
    middleware::{auth::AuthUser, client_ip::ClientIp},
    response::ApiResponse,
    services::payment_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new().route("/{order_number}", get(payment_view).post(pay_order))
}

#[utoipa::path(
    get,
    path = "/api/payments/{order_number}",
    params(
        ("order_number" = String, Path, description = "Order number")
    ),
    responses(
        (status = 200, description = "Amount due and last payment attempt", body = ApiResponse<PaymentView>),
        (status = 404, description = "Not Found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Payments"
)]
pub async fn payment_view(
    State(state): State<AppState>,
    user: AuthUser,
    Path(order_number): Path<String>,
) -> AppResult<Json<ApiResponse<PaymentView>>> {
    let resp = payment_service::payment_view(&state, &user, &order_number).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/payments/{order_number}",
    params(
        ("order_number" = String, Path, description = "Order number")
    ),
    request_body = PayOrderRequest,
    responses(
        (status = 200, description = "Payment accepted, order is Paid", body = ApiResponse<PaymentConfirmation>),
        (status = 400, description = "Order is not awaiting payment"),
        (status = 402, description = "Payment declined; the order can be paid again"),
        (status = 404, description = "Not Found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Payments"
)]
pub async fn pay_order(
    State(state): State<AppState>,
    user: AuthUser,
    ClientIp(ip): ClientIp,
    Path(order_number): Path<String>,
    Json(payload): Json<PayOrderRequest>,
) -> AppResult<Json<ApiResponse<PaymentConfirmation>>> {
    let resp =
        payment_service::submit_payment(&state, &user, &order_number, payload, ip.as_deref())
            .await?;
    Ok(Json(resp))
}
