use bridal_api::{
    config::AppConfig,
    db::{create_orm_conn, create_pool, run_migrations},
    services::auth_service::hash_password,
};
use uuid::Uuid;

const CUSTOMERS: &[(&str, &str)] = &[
    ("sofia", "Sofia Abera"),
    ("liam", "Liam Tadesse"),
    ("maya", "Maya Kassa"),
    ("noah", "Noah Hailu"),
    ("zoe", "Zoe Bekele"),
];

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env()?;

    let orm = create_orm_conn(&config.database_url).await?;
    run_migrations(&orm).await?;
    let pool = create_pool(&config.database_url).await?;

    let admin_id = ensure_user(&pool, "admin", "admin@example.com", "admin1234", "admin").await?;
    for (username, full_name) in CUSTOMERS {
        let email = format!("{username}@example.com");
        ensure_user(&pool, username, &email, "customer123", "customer").await?;
        println!("Ensured customer {full_name}");
    }

    let designer_user =
        ensure_user(&pool, "selam", "selam@example.com", "designer123", "designer").await?;
    let designer_id = ensure_designer(&pool, designer_user, "Selam Atelier").await?;
    let collection_id = ensure_collection(&pool, designer_id, "Spring Vows").await?;
    seed_dresses(&pool, designer_id, collection_id).await?;

    println!("Seed completed. Admin ID: {admin_id}, Designer ID: {designer_id}");
    Ok(())
}

async fn ensure_user(
    pool: &sqlx::PgPool,
    username: &str,
    email: &str,
    password: &str,
    role: &str,
) -> anyhow::Result<Uuid> {
    let password_hash = hash_password(password)?;

    let (user_id,): (Uuid,) = sqlx::query_as(
        r#"
        INSERT INTO users (id, username, email, password_hash, role)
        VALUES ($1, $2, $3, $4, $5)
        ON CONFLICT (email) DO UPDATE SET role = EXCLUDED.role
        RETURNING id
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(username)
    .bind(email)
    .bind(password_hash)
    .bind(role)
    .fetch_one(pool)
    .await?;

    println!("Ensured user {email} (role={role})");
    Ok(user_id)
}

async fn ensure_designer(pool: &sqlx::PgPool, user_id: Uuid, name: &str) -> anyhow::Result<Uuid> {
    let (designer_id,): (Uuid,) = sqlx::query_as(
        r#"
        INSERT INTO designers (id, user_id, name, bio)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (user_id) DO UPDATE SET name = EXCLUDED.name
        RETURNING id
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(user_id)
    .bind(name)
    .bind("Handmade bridal gowns from Addis Ababa")
    .fetch_one(pool)
    .await?;
    Ok(designer_id)
}

async fn ensure_collection(
    pool: &sqlx::PgPool,
    designer_id: Uuid,
    name: &str,
) -> anyhow::Result<Uuid> {
    let existing: Option<(Uuid,)> =
        sqlx::query_as("SELECT id FROM collections WHERE designer_id = $1 AND name = $2")
            .bind(designer_id)
            .bind(name)
            .fetch_optional(pool)
            .await?;
    if let Some((id,)) = existing {
        return Ok(id);
    }

    let (id,): (Uuid,) = sqlx::query_as(
        "INSERT INTO collections (id, designer_id, name, description) VALUES ($1, $2, $3, $4) RETURNING id",
    )
    .bind(Uuid::new_v4())
    .bind(designer_id)
    .bind(name)
    .bind("Light silhouettes for outdoor ceremonies")
    .fetch_one(pool)
    .await?;
    Ok(id)
}

async fn seed_dresses(
    pool: &sqlx::PgPool,
    designer_id: Uuid,
    collection_id: Uuid,
) -> anyhow::Result<()> {
    let dresses = vec![
        ("Aurora Lace Gown", "Long sleeve lace with a cathedral train", "M", 4_500_000_i64, 3),
        ("Lily Satin Slip", "Bias cut satin with a cowl neck", "S", 2_800_000, 6),
        ("Meskel Habesha Dress", "Hand woven tibeb border", "L", 3_200_000, 4),
        ("Celeste Ball Gown", "Tulle skirt with beaded bodice", "M", 5_900_000, 2),
    ];

    for (name, desc, size, price, stock) in dresses {
        let exists: Option<(Uuid,)> =
            sqlx::query_as("SELECT id FROM dresses WHERE designer_id = $1 AND name = $2")
                .bind(designer_id)
                .bind(name)
                .fetch_optional(pool)
                .await?;
        if exists.is_some() {
            continue;
        }

        sqlx::query(
            r#"
            INSERT INTO dresses (id, designer_id, collection_id, name, description, size, price, stock)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(designer_id)
        .bind(collection_id)
        .bind(name)
        .bind(desc)
        .bind(size)
        .bind(price)
        .bind(stock)
        .execute(pool)
        .await?;
    }

    println!("Seeded dresses");
    Ok(())
}
