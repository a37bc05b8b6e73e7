use chrono::{DateTime, Utc};
use sqlx::{Connection, FromRow, PgConnection};
use uuid::Uuid;

use crate::{
    audit,
    db::DbPool,
    db_access::{logged, with_connection},
    dto::cart::{AddToCartRequest, CartLine, CartView, UpdateCartItemRequest},
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::Dress,
    response::{ApiResponse, Meta},
    state::AppState,
};

const ENSURE_CART: &str = r#"
    INSERT INTO carts (id, user_id) VALUES ($1, $2)
    ON CONFLICT (user_id) DO NOTHING
"#;

const CART_LINES: &str = r#"
    SELECT ci.id AS item_id, ci.quantity,
           d.id AS dress_id, d.designer_id, d.collection_id, d.name, d.description,
           d.size, d.price, d.stock, d.view_count, d.created_at
    FROM cart_items ci
    JOIN dresses d ON d.id = ci.dress_id
    WHERE ci.cart_id = $1
    ORDER BY ci.created_at ASC, ci.id ASC
"#;

#[derive(FromRow)]
struct CartLineRow {
    item_id: Uuid,
    quantity: i32,
    dress_id: Uuid,
    designer_id: Uuid,
    collection_id: Option<Uuid>,
    name: String,
    description: Option<String>,
    size: String,
    price: i64,
    stock: i32,
    view_count: i64,
    created_at: DateTime<Utc>,
}

impl From<CartLineRow> for CartLine {
    fn from(row: CartLineRow) -> Self {
        CartLine {
            id: row.item_id,
            subtotal: row.price.saturating_mul(i64::from(row.quantity)),
            quantity: row.quantity,
            dress: Dress {
                id: row.dress_id,
                designer_id: row.designer_id,
                collection_id: row.collection_id,
                name: row.name,
                description: row.description,
                size: row.size,
                price: row.price,
                stock: row.stock,
                view_count: row.view_count,
                created_at: row.created_at,
            },
        }
    }
}

pub async fn get_cart(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<CartView>> {
    let cart_id = ensure_cart(&state.pool, user.user_id).await?;
    let view = load_cart(&state.pool, cart_id, user.user_id).await?;
    Ok(ApiResponse::success("Cart", view, None))
}

pub async fn add_item(
    state: &AppState,
    user: &AuthUser,
    payload: AddToCartRequest,
) -> AppResult<ApiResponse<CartView>> {
    let quantity = payload.quantity.unwrap_or(1);
    if quantity <= 0 {
        return Err(AppError::BadRequest(
            "quantity must be greater than 0".to_string(),
        ));
    }

    let cart_id = ensure_cart(&state.pool, user.user_id).await?;
    let dress_id = payload.dress_id;

    // The dress row lock serialises concurrent adds of the same dress, so the
    // read-modify-write of the line quantity cannot lose an increment.
    let new_quantity = with_connection(&state.pool, move |conn| {
        Box::pin(async move {
            let mut tx = conn.begin().await?;
            let stock = locked_dress_stock(&mut *tx, dress_id).await?;

            let current: Option<(i32,)> = sqlx::query_as(
                "SELECT quantity FROM cart_items WHERE cart_id = $1 AND dress_id = $2",
            )
            .bind(cart_id)
            .bind(dress_id)
            .fetch_optional(&mut *tx)
            .await?;

            let new_quantity =
                combined_quantity(current.map(|(q,)| q).unwrap_or(0), quantity, stock)?;

            sqlx::query(
                r#"
                INSERT INTO cart_items (id, cart_id, dress_id, quantity)
                VALUES ($1, $2, $3, $4)
                ON CONFLICT (cart_id, dress_id) DO UPDATE SET quantity = EXCLUDED.quantity
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(cart_id)
            .bind(dress_id)
            .bind(new_quantity)
            .execute(&mut *tx)
            .await?;

            tx.commit().await?;
            Ok::<_, AppError>(new_quantity)
        })
    })
    .await?;

    audit::record(
        &state.pool,
        Some(user.user_id),
        "cart_add",
        "cart_items",
        serde_json::json!({ "dress_id": dress_id, "quantity": new_quantity }),
    )
    .await;

    let view = load_cart(&state.pool, cart_id, user.user_id).await?;
    Ok(ApiResponse::success("Added to cart", view, Some(Meta::empty())))
}

pub async fn update_item(
    state: &AppState,
    user: &AuthUser,
    item_id: Uuid,
    payload: UpdateCartItemRequest,
) -> AppResult<ApiResponse<CartView>> {
    if payload.quantity <= 0 {
        return Err(AppError::BadRequest(
            "quantity must be greater than 0".to_string(),
        ));
    }

    let line: Option<(Uuid, i32)> = sqlx::query_as(
        r#"
        SELECT c.id, d.stock
        FROM cart_items ci
        JOIN carts c ON c.id = ci.cart_id
        JOIN dresses d ON d.id = ci.dress_id
        WHERE ci.id = $1 AND c.user_id = $2
        "#,
    )
    .bind(item_id)
    .bind(user.user_id)
    .fetch_optional(&state.pool)
    .await?;
    let (cart_id, stock) = line.ok_or(AppError::NotFound)?;
    ensure_in_stock(payload.quantity, stock)?;

    sqlx::query("UPDATE cart_items SET quantity = $2 WHERE id = $1")
        .bind(item_id)
        .bind(payload.quantity)
        .execute(&state.pool)
        .await?;

    audit::record(
        &state.pool,
        Some(user.user_id),
        "cart_update",
        "cart_items",
        serde_json::json!({ "item_id": item_id, "quantity": payload.quantity }),
    )
    .await;

    let view = load_cart(&state.pool, cart_id, user.user_id).await?;
    Ok(ApiResponse::success("Updated", view, Some(Meta::empty())))
}

pub async fn remove_item(
    state: &AppState,
    user: &AuthUser,
    item_id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    let result = sqlx::query(
        r#"
        DELETE FROM cart_items ci
        USING carts c
        WHERE ci.id = $1 AND ci.cart_id = c.id AND c.user_id = $2
        "#,
    )
    .bind(item_id)
    .bind(user.user_id)
    .execute(&state.pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound);
    }

    audit::record(
        &state.pool,
        Some(user.user_id),
        "cart_remove",
        "cart_items",
        serde_json::json!({ "item_id": item_id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Removed from cart",
        serde_json::json!({}),
        Some(Meta::empty()),
    ))
}

pub async fn clear_cart(
    state: &AppState,
    user: &AuthUser,
) -> AppResult<ApiResponse<serde_json::Value>> {
    let result = sqlx::query(
        "DELETE FROM cart_items WHERE cart_id IN (SELECT id FROM carts WHERE user_id = $1)",
    )
    .bind(user.user_id)
    .execute(&state.pool)
    .await?;

    audit::record(
        &state.pool,
        Some(user.user_id),
        "cart_clear",
        "cart_items",
        serde_json::json!({ "removed": result.rows_affected() }),
    )
    .await;

    Ok(ApiResponse::success(
        "Cart cleared",
        serde_json::json!({}),
        Some(Meta::empty()),
    ))
}

/// Returns the id of the user's cart, creating it on first use.
pub(crate) async fn ensure_cart(pool: &DbPool, user_id: Uuid) -> AppResult<Uuid> {
    logged(
        "cart_ensure",
        ENSURE_CART,
        sqlx::query(ENSURE_CART)
            .bind(Uuid::new_v4())
            .bind(user_id)
            .execute(pool),
    )
    .await?;

    let (id,): (Uuid,) = sqlx::query_as("SELECT id FROM carts WHERE user_id = $1")
        .bind(user_id)
        .fetch_one(pool)
        .await?;
    Ok(id)
}

async fn load_cart(pool: &DbPool, cart_id: Uuid, user_id: Uuid) -> AppResult<CartView> {
    let rows = logged(
        "cart_lines",
        CART_LINES,
        sqlx::query_as::<_, CartLineRow>(CART_LINES)
            .bind(cart_id)
            .fetch_all(pool),
    )
    .await?;

    let items: Vec<CartLine> = rows.into_iter().map(CartLine::from).collect();
    let total = items
        .iter()
        .fold(0i64, |acc, line| acc.saturating_add(line.subtotal));

    Ok(CartView {
        id: cart_id,
        user_id,
        items,
        total,
    })
}

async fn locked_dress_stock(conn: &mut PgConnection, dress_id: Uuid) -> AppResult<i32> {
    let row: Option<(i32,)> =
        sqlx::query_as("SELECT stock FROM dresses WHERE id = $1 FOR UPDATE")
            .bind(dress_id)
            .fetch_optional(&mut *conn)
            .await?;
    row.map(|(stock,)| stock)
        .ok_or_else(|| AppError::BadRequest("dress not found".to_string()))
}

/// Quantity of a cart line after adding `added` to `current`, checked
/// against the dress stock.
pub fn combined_quantity(current: i32, added: i32, stock: i32) -> AppResult<i32> {
    let quantity = current
        .checked_add(added)
        .ok_or_else(|| AppError::BadRequest(format!("Only {stock} left in stock")))?;
    if quantity <= 0 {
        return Err(AppError::BadRequest(
            "quantity must be greater than 0".to_string(),
        ));
    }
    ensure_in_stock(quantity, stock)?;
    Ok(quantity)
}

fn ensure_in_stock(quantity: i32, stock: i32) -> AppResult<()> {
    if quantity > stock {
        return Err(AppError::BadRequest(format!(
            "Only {stock} left in stock"
        )));
    }
    Ok(())
}
