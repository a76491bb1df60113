#![allow(dead_code)]

use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, ConnectOptions, ConnectionTrait, Database, Set};
use storefront_checkout::{
    config::PaymentConfig,
    db::OrmConn,
    entity::{
        products::{self, Model as ProductModel},
        user_addresses::{self, Model as AddressModel},
        users::{self, Model as UserModel},
    },
    gateway::{MockGateway, PaymentGateway},
    middleware::auth::AuthUser,
    services::payment_service::PaymentService,
    state::AppState,
};
use uuid::Uuid;

pub const JWT_SECRET: &str = "test-secret";

pub struct TestApp {
    pub state: AppState,
    pub gateway: Arc<MockGateway>,
}

/// Fresh in-memory SQLite database and an approving mock gateway.
pub async fn setup() -> anyhow::Result<TestApp> {
    let mut options = ConnectOptions::new("sqlite::memory:");
    // One connection, otherwise every pooled connection gets its own empty database.
    options
        .max_connections(1)
        .min_connections(1)
        .sqlx_logging(false);
    let orm = Database::connect(options).await?;
    create_schema(&orm).await?;

    let gateway = Arc::new(MockGateway::approving());
    let dyn_gateway: Arc<dyn PaymentGateway> = gateway.clone();
    let state = AppState {
        orm,
        payments: PaymentService::new(dyn_gateway, &PaymentConfig::default()),
        jwt_secret: Arc::from(JWT_SECRET),
        trust_forwarded_for: false,
    };

    Ok(TestApp { state, gateway })
}

/// SQLite mirror of `migrations/0001_init.sql`. Money columns are REAL here;
/// SQLite has no fixed-point type and SeaORM round-trips `Decimal` through f64.
const SQLITE_SCHEMA: &[&str] = &[
    "CREATE TABLE users (
        id uuid_text NOT NULL PRIMARY KEY,
        email TEXT NOT NULL UNIQUE,
        full_name TEXT,
        role TEXT NOT NULL,
        created_at timestamp_with_timezone_text NOT NULL
    )",
    "CREATE TABLE products (
        id uuid_text NOT NULL PRIMARY KEY,
        name TEXT NOT NULL UNIQUE,
        category TEXT,
        price REAL NOT NULL,
        created_at timestamp_with_timezone_text NOT NULL
    )",
    "CREATE TABLE user_addresses (
        id uuid_text NOT NULL PRIMARY KEY,
        user_id uuid_text NOT NULL REFERENCES users (id) ON DELETE CASCADE,
        title TEXT NOT NULL,
        full_name TEXT NOT NULL,
        phone TEXT NOT NULL,
        city TEXT NOT NULL,
        district TEXT NOT NULL,
        neighborhood TEXT NOT NULL,
        details TEXT NOT NULL,
        is_default BOOLEAN NOT NULL,
        created_at timestamp_with_timezone_text NOT NULL
    )",
    "CREATE TABLE cart_items (
        id uuid_text NOT NULL PRIMARY KEY,
        user_id uuid_text NOT NULL REFERENCES users (id) ON DELETE CASCADE,
        product_id uuid_text NOT NULL REFERENCES products (id) ON DELETE CASCADE,
        quantity INTEGER NOT NULL,
        unit_price REAL NOT NULL,
        created_at timestamp_with_timezone_text NOT NULL,
        UNIQUE (user_id, product_id)
    )",
    "CREATE TABLE orders (
        id uuid_text NOT NULL PRIMARY KEY,
        order_number TEXT NOT NULL UNIQUE,
        user_id uuid_text NOT NULL REFERENCES users (id),
        shipping_provider TEXT NOT NULL,
        address_id uuid_text REFERENCES user_addresses (id) ON DELETE SET NULL,
        subtotal REAL NOT NULL,
        shipping_cost REAL NOT NULL,
        total REAL NOT NULL,
        status TEXT NOT NULL,
        payment_id TEXT,
        conversation_id TEXT,
        payment_status TEXT,
        payment_last_error TEXT,
        created_at timestamp_with_timezone_text NOT NULL,
        updated_at timestamp_with_timezone_text NOT NULL
    )",
    "CREATE TABLE order_items (
        id uuid_text NOT NULL PRIMARY KEY,
        order_id uuid_text NOT NULL REFERENCES orders (id) ON DELETE CASCADE,
        product_id uuid_text NOT NULL REFERENCES products (id),
        quantity INTEGER NOT NULL,
        unit_price REAL NOT NULL,
        created_at timestamp_with_timezone_text NOT NULL
    )",
    "CREATE TABLE audit_logs (
        id uuid_text NOT NULL PRIMARY KEY,
        user_id uuid_text,
        action TEXT NOT NULL,
        resource TEXT,
        metadata json_text,
        created_at timestamp_with_timezone_text NOT NULL
    )",
];

async fn create_schema(orm: &OrmConn) -> anyhow::Result<()> {
    for ddl in SQLITE_SCHEMA {
        orm.execute_unprepared(ddl).await?;
    }
    Ok(())
}

pub async fn create_user(
    orm: &OrmConn,
    email: &str,
    full_name: Option<&str>,
    role: &str,
) -> anyhow::Result<UserModel> {
    let user = users::ActiveModel {
        id: Set(Uuid::new_v4()),
        email: Set(email.to_string()),
        full_name: Set(full_name.map(str::to_string)),
        role: Set(role.to_string()),
        created_at: Set(Utc::now().into()),
    }
    .insert(orm)
    .await?;
    Ok(user)
}

pub async fn create_product(
    orm: &OrmConn,
    name: &str,
    category: Option<&str>,
    price: Decimal,
) -> anyhow::Result<ProductModel> {
    let product = products::ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(name.to_string()),
        category: Set(category.map(str::to_string)),
        price: Set(price),
        created_at: Set(Utc::now().into()),
    }
    .insert(orm)
    .await?;
    Ok(product)
}

pub async fn create_address(
    orm: &OrmConn,
    user_id: Uuid,
    full_name: &str,
    is_default: bool,
) -> anyhow::Result<AddressModel> {
    let address = user_addresses::ActiveModel {
        id: Set(Uuid::new_v4()),
        user_id: Set(user_id),
        title: Set("Home".into()),
        full_name: Set(full_name.to_string()),
        phone: Set("+905551112233".into()),
        city: Set("Istanbul".into()),
        district: Set("Kadikoy".into()),
        neighborhood: Set("Moda".into()),
        details: Set("Street 1 No 2".into()),
        is_default: Set(is_default),
        created_at: Set(Utc::now().into()),
    }
    .insert(orm)
    .await?;
    Ok(address)
}

pub fn auth(user: &UserModel) -> AuthUser {
    AuthUser {
        user_id: user.id,
        role: user.role.clone(),
    }
}
