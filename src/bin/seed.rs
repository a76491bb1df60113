use chrono::Utc;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set};
use storefront_checkout::{
    config::AppConfig,
    db::{OrmConn, create_orm_conn, run_migrations},
    entity::{
        products::{ActiveModel as ProductActive, Column as ProductCol, Entity as Products},
        user_addresses::{
            ActiveModel as AddressActive, Column as AddressCol, Entity as UserAddresses,
        },
        users::{ActiveModel as UserActive, Column as UserCol, Entity as Users},
    },
};
use uuid::Uuid;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env()?;

    let orm = create_orm_conn(&config.database_url).await?;
    // Ensure migrations are applied.
    run_migrations(&orm).await?;

    let admin_id = ensure_user(&orm, "admin@example.com", "Store Admin", "admin").await?;
    let user_id = ensure_user(&orm, "user@example.com", "Ayse Yilmaz", "user").await?;
    ensure_default_address(&orm, user_id, "Ayse Yilmaz").await?;
    seed_products(&orm).await?;

    println!("Seed completed. Admin ID: {admin_id}, User ID: {user_id}");
    Ok(())
}

async fn ensure_user(
    orm: &OrmConn,
    email: &str,
    full_name: &str,
    role: &str,
) -> anyhow::Result<Uuid> {
    if let Some(existing) = Users::find()
        .filter(UserCol::Email.eq(email))
        .one(orm)
        .await?
    {
        println!("User {email} already present");
        return Ok(existing.id);
    }

    let user = UserActive {
        id: Set(Uuid::new_v4()),
        email: Set(email.to_string()),
        full_name: Set(Some(full_name.to_string())),
        role: Set(role.to_string()),
        created_at: Set(Utc::now().into()),
    }
    .insert(orm)
    .await?;

    println!("Ensured user {email} (role={role})");
    Ok(user.id)
}

async fn ensure_default_address(
    orm: &OrmConn,
    user_id: Uuid,
    full_name: &str,
) -> anyhow::Result<()> {
    let existing = UserAddresses::find()
        .filter(AddressCol::UserId.eq(user_id))
        .one(orm)
        .await?;
    if existing.is_some() {
        return Ok(());
    }

    AddressActive {
        id: Set(Uuid::new_v4()),
        user_id: Set(user_id),
        title: Set("Home".into()),
        full_name: Set(full_name.to_string()),
        phone: Set("+905551112233".into()),
        city: Set("Istanbul".into()),
        district: Set("Kadikoy".into()),
        neighborhood: Set("Caferaga".into()),
        details: Set("Moda Cd. No:10 D:3".into()),
        is_default: Set(true),
        created_at: Set(Utc::now().into()),
    }
    .insert(orm)
    .await?;

    println!("Seeded address");
    Ok(())
}

async fn seed_products(orm: &OrmConn) -> anyhow::Result<()> {
    let products: [(&str, Option<&str>, Decimal); 4] = [
        ("Ceramic Mug", Some("Kitchen"), dec!(149.90)),
        ("Linen Tea Towel", Some("Kitchen"), dec!(89.50)),
        ("Notebook A5", Some("Stationery"), dec!(59.00)),
        ("Gift Card", None, dec!(250.00)),
    ];

    for (name, category, price) in products {
        let exists = Products::find()
            .filter(ProductCol::Name.eq(name))
            .one(orm)
            .await?
            .is_some();
        if exists {
            continue;
        }

        ProductActive {
            id: Set(Uuid::new_v4()),
            name: Set(name.to_string()),
            category: Set(category.map(str::to_string)),
            price: Set(price),
            created_at: Set(Utc::now().into()),
        }
        .insert(orm)
        .await?;
    }

    println!("Seeded products");
    Ok(())
}
