use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{ColumnTrait, Condition, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder};

use crate::{
    audit,
    config::PaymentConfig,
    dto::orders::{PayOrderRequest, PaymentConfirmation, PaymentView},
    entity::{
        order_items::{Column as OrderItemCol, Entity as OrderItems, Model as OrderItemModel},
        orders::{Model as OrderModel, OrderStatus},
        products::{Entity as Products, Model as ProductModel},
        user_addresses::{Column as AddressCol, Entity as UserAddresses, Model as AddressModel},
        users::{Entity as Users, Model as UserModel},
    },
    error::{AppError, AppResult},
    gateway::{BasketItem, Buyer, PaymentCard, PaymentGateway, PaymentRequest, PostalAddress},
    middleware::auth::AuthUser,
    models::PaymentInfo,
    response::{ApiResponse, Meta},
    services::{order_service, reconciliation},
    state::AppState,
};

/// Shown when the provider declines without saying why.
pub const PAYMENT_DECLINED_MESSAGE: &str = "Payment failed.";
/// Shown when the provider could not be reached or answered garbage.
pub const PAYMENT_ERROR_MESSAGE: &str = "An error occurred while processing the payment.";

const DEFAULT_CATEGORY: &str = "Genel";
const SHIPPING_ITEM_ID: &str = "SHIP";
const SHIPPING_CATEGORY: &str = "Kargo";
const ITEM_TYPE_PHYSICAL: &str = "PHYSICAL";
const COUNTRY: &str = "Turkey";
const PLACEHOLDER_ZIP: &str = "00000";
const PLACEHOLDER_GSM: &str = "+900000000000";
const PLACEHOLDER_IDENTITY: &str = "11111111110";
const PLACEHOLDER_EMAIL: &str = "email@email.com";
const FALLBACK_IP: &str = "127.0.0.1";
const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Card fields as entered by the buyer. Never logged or stored.
#[derive(Clone)]
pub struct CardDetails {
    pub holder_name: String,
    pub number: String,
    pub expire_month: String,
    pub expire_year: String,
    pub cvc: String,
}

impl std::fmt::Debug for CardDetails {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CardDetails")
            .field("holder_name", &self.holder_name)
            .finish_non_exhaustive()
    }
}

impl From<PayOrderRequest> for CardDetails {
    fn from(request: PayOrderRequest) -> Self {
        let (expire_month, expire_year) = parse_expiry(&request.expiry);
        Self {
            holder_name: request.card_name.trim().to_string(),
            number: request.card_number.replace(' ', ""),
            expire_month,
            expire_year,
            cvc: request.cvc.trim().to_string(),
        }
    }
}

/// Split `MM/YY`, `MM-YYYY` and friends into `(month, four-digit year)`.
/// Anything that is not exactly two parts yields two empty strings.
pub fn parse_expiry(expiry: &str) -> (String, String) {
    let compact: String = expiry.chars().filter(|c| !c.is_whitespace()).collect();
    let parts: Vec<&str> = compact.split(['/', '-']).collect();
    match parts.as_slice() {
        [month, year] if !compact.is_empty() => {
            let year = if year.len() == 2 {
                format!("20{year}")
            } else {
                year.to_string()
            };
            (month.to_string(), year)
        }
        _ => (String::new(), String::new()),
    }
}

/// Fixed two-decimal rendering expected by the provider, e.g. `35.90`.
pub fn format_amount(amount: Decimal) -> String {
    let mut amount = amount.round_dp(2);
    amount.rescale(2);
    amount.to_string()
}

/// First whitespace-separated token, then the rest joined by single spaces.
fn split_name(full_name: &str) -> (String, String) {
    let mut tokens = full_name.split_whitespace();
    let given = tokens.next().unwrap_or_default().to_string();
    let family = tokens.collect::<Vec<_>>().join(" ");
    (given, family)
}

/// Result of one charge attempt, in checkout terms.
#[derive(Debug, Clone, PartialEq)]
pub struct ChargeOutcome {
    pub success: bool,
    pub error_message: Option<String>,
    pub info: Option<PaymentInfo>,
}

impl ChargeOutcome {
    fn succeeded(info: PaymentInfo) -> Self {
        Self {
            success: true,
            error_message: None,
            info: Some(info),
        }
    }

    fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            error_message: Some(message.into()),
            info: None,
        }
    }
}

/// Everything a charge request is assembled from.
pub struct ChargeContext<'a> {
    pub order: &'a OrderModel,
    pub user: &'a UserModel,
    pub items: &'a [(OrderItemModel, Option<ProductModel>)],
    pub address: Option<&'a AddressModel>,
    pub card: &'a CardDetails,
    pub client_ip: Option<&'a str>,
}

/// Adapter between orders and the configured [`PaymentGateway`].
#[derive(Clone)]
pub struct PaymentService {
    gateway: Arc<dyn PaymentGateway>,
    currency: String,
    locale: String,
}

impl PaymentService {
    pub fn new(gateway: Arc<dyn PaymentGateway>, config: &PaymentConfig) -> Self {
        Self {
            gateway,
            currency: config.currency.clone(),
            locale: config.locale.clone(),
        }
    }

    /// Charge `order` with the given card.
    ///
    /// Order lines are re-read from storage so the basket always matches what
    /// was persisted. Storage errors abort before the provider is contacted;
    /// every provider-side problem is folded into a failed [`ChargeOutcome`].
    pub async fn charge_order<C: ConnectionTrait>(
        &self,
        conn: &C,
        order: &OrderModel,
        user: &UserModel,
        card: &CardDetails,
        client_ip: Option<&str>,
    ) -> AppResult<ChargeOutcome> {
        let items = OrderItems::find()
            .filter(OrderItemCol::OrderId.eq(order.id))
            .order_by_asc(OrderItemCol::CreatedAt)
            .find_also_related(Products)
            .all(conn)
            .await?;

        let address = match order.address_id {
            Some(address_id) => {
                UserAddresses::find()
                    .filter(
                        Condition::all()
                            .add(AddressCol::Id.eq(address_id))
                            .add(AddressCol::UserId.eq(user.id)),
                    )
                    .one(conn)
                    .await?
            }
            None => None,
        };

        let request = self.build_request(ChargeContext {
            order,
            user,
            items: &items,
            address: address.as_ref(),
            card,
            client_ip,
        });

        tracing::info!(
            order_number = %order.order_number,
            gateway = self.gateway.name(),
            price = %request.price,
            basket_items = request.basket_items.len(),
            "submitting payment"
        );

        match self.gateway.create_payment(&request).await {
            Ok(response) if response.is_success() => Ok(ChargeOutcome::succeeded(PaymentInfo {
                payment_id: response.payment_id,
                conversation_id: response.conversation_id,
                status: response.status,
                auth_code: response.auth_code,
                host_reference: response.host_reference,
            })),
            Ok(response) => {
                tracing::warn!(
                    order_number = %order.order_number,
                    status = ?response.status,
                    error_code = ?response.error_code,
                    error_message = ?response.error_message,
                    "payment declined by provider"
                );
                let message = response
                    .error_message
                    .filter(|m| !m.trim().is_empty())
                    .or(response.status.filter(|s| !s.trim().is_empty()))
                    .unwrap_or_else(|| PAYMENT_DECLINED_MESSAGE.to_string());
                Ok(ChargeOutcome::failed(message))
            }
            Err(err) => {
                tracing::error!(
                    order_number = %order.order_number,
                    error = ?err,
                    "payment gateway call failed"
                );
                Ok(ChargeOutcome::failed(PAYMENT_ERROR_MESSAGE))
            }
        }
    }

    pub fn build_request(&self, ctx: ChargeContext<'_>) -> PaymentRequest {
        let ChargeContext {
            order,
            user,
            items,
            address,
            card,
            client_ip,
        } = ctx;

        let mut basket_items: Vec<BasketItem> = items
            .iter()
            .map(|(item, product)| BasketItem {
                id: item.product_id.to_string(),
                name: product
                    .as_ref()
                    .map(|p| p.name.clone())
                    .unwrap_or_else(|| format!("Product {}", item.product_id)),
                category1: product
                    .as_ref()
                    .and_then(|p| p.category.clone())
                    .filter(|c| !c.trim().is_empty())
                    .unwrap_or_else(|| DEFAULT_CATEGORY.to_string()),
                item_type: ITEM_TYPE_PHYSICAL.to_string(),
                price: format_amount(item.line_total()),
            })
            .collect();

        if order.shipping_cost > Decimal::ZERO {
            basket_items.push(BasketItem {
                id: SHIPPING_ITEM_ID.to_string(),
                name: format!("Kargo ({})", order.shipping_provider),
                category1: SHIPPING_CATEGORY.to_string(),
                item_type: ITEM_TYPE_PHYSICAL.to_string(),
                price: format_amount(order.shipping_cost),
            });
        }

        let profile_name = user
            .full_name
            .as_deref()
            .filter(|n| !n.trim().is_empty())
            .unwrap_or(&user.email);
        let (mut name, mut surname) = split_name(profile_name);
        let mut registration_address = String::new();
        let mut city = String::new();

        let postal = match address {
            Some(address) => {
                let (given, family) = split_name(&address.full_name);
                if !given.is_empty() {
                    name = given;
                }
                if !family.is_empty() {
                    surname = family;
                }
                registration_address = address.description();
                city = address.city.clone();

                PostalAddress {
                    contact_name: address.full_name.clone(),
                    city: address.city.clone(),
                    country: COUNTRY.to_string(),
                    address: address.description(),
                    zip_code: PLACEHOLDER_ZIP.to_string(),
                }
            }
            None => PostalAddress::default(),
        };

        if name.is_empty() {
            name = "Customer".to_string();
        }

        let buyer = Buyer {
            id: user.id.to_string(),
            name,
            surname,
            gsm_number: PLACEHOLDER_GSM.to_string(),
            email: if user.email.is_empty() {
                PLACEHOLDER_EMAIL.to_string()
            } else {
                user.email.clone()
            },
            identity_number: PLACEHOLDER_IDENTITY.to_string(),
            last_login_date: Utc::now().format(DATE_FORMAT).to_string(),
            registration_date: user.created_at.format(DATE_FORMAT).to_string(),
            registration_address,
            ip: client_ip
                .filter(|ip| !ip.is_empty())
                .unwrap_or(FALLBACK_IP)
                .to_string(),
            city,
            country: COUNTRY.to_string(),
            zip_code: PLACEHOLDER_ZIP.to_string(),
        };

        let total = format_amount(order.total);
        PaymentRequest {
            locale: self.locale.clone(),
            conversation_id: order.order_number.clone(),
            price: total.clone(),
            paid_price: total,
            currency: self.currency.clone(),
            installment: 1,
            basket_id: order.order_number.clone(),
            payment_channel: "WEB".to_string(),
            payment_group: "PRODUCT".to_string(),
            payment_card: PaymentCard {
                card_holder_name: card.holder_name.clone(),
                card_number: card.number.clone(),
                expire_month: card.expire_month.clone(),
                expire_year: card.expire_year.clone(),
                cvc: card.cvc.clone(),
                register_card: 0,
            },
            buyer,
            billing_address: postal.clone(),
            shipping_address: postal,
            basket_items,
        }
    }
}

pub async fn payment_view(
    state: &AppState,
    user: &AuthUser,
    order_number: &str,
) -> AppResult<ApiResponse<PaymentView>> {
    let order = order_service::find_user_order(&state.orm, user.user_id, order_number).await?;
    Ok(ApiResponse::ok(PaymentView {
        order_number: order.order_number,
        total: order.total,
        shipping_provider: order.shipping_provider,
        status: order.status,
        payment_status: order.payment_status,
        payment_last_error: order.payment_last_error,
    }))
}

/// Charge a Pending order and reconcile the outcome. A failed charge is
/// persisted on the order and then reported as [`AppError::PaymentFailed`].
pub async fn submit_payment(
    state: &AppState,
    user: &AuthUser,
    order_number: &str,
    payload: PayOrderRequest,
    client_ip: Option<&str>,
) -> AppResult<ApiResponse<PaymentConfirmation>> {
    let order = order_service::find_user_order(&state.orm, user.user_id, order_number).await?;
    if order.status != OrderStatus::Pending {
        return Err(AppError::BadRequest(format!(
            "Order in status {} is not awaiting payment",
            order.status.as_str()
        )));
    }

    let customer = Users::find_by_id(user.user_id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    let card = CardDetails::from(payload);
    let outcome = state
        .payments
        .charge_order(&state.orm, &order, &customer, &card, client_ip)
        .await?;

    if outcome.success {
        let order = reconciliation::mark_paid(&state.orm, order, outcome.info.as_ref()).await?;

        audit::record(
            &state.orm,
            user.user_id,
            "payment_success",
            "orders",
            serde_json::json!({
                "order_number": order.order_number,
                "payment_id": order.payment_id,
            }),
        )
        .await;

        let auth_code = outcome.info.and_then(|info| info.auth_code);
        return Ok(ApiResponse::success(
            "Payment received",
            PaymentConfirmation {
                provider: order.shipping_provider,
                order_number: order.order_number,
                total: order.total,
                payment_id: order.payment_id,
                conversation_id: order.conversation_id,
                auth_code,
            },
            Some(Meta::empty()),
        ));
    }

    let message = outcome
        .error_message
        .unwrap_or_else(|| PAYMENT_DECLINED_MESSAGE.to_string());
    tracing::warn!(order_number = %order.order_number, error = %message, "payment failed");

    let order = reconciliation::record_failure(&state.orm, order, &message).await?;

    audit::record(
        &state.orm,
        user.user_id,
        "payment_failure",
        "orders",
        serde_json::json!({ "order_number": order.order_number }),
    )
    .await;

    Err(AppError::PaymentFailed {
        order_number: order.order_number,
        message,
    })
}
