mod common;

use bridal_api::{
    db_access::{transactional, with_connection},
    dto::{cart::AddToCartRequest, dresses::CreateDressRequest},
    error::AppError,
    middleware::auth::AuthUser,
    models::Role,
    routes::params::OrderListQuery,
    services::{cart_service, dress_service, order_service},
    state::AppState,
};
use sea_orm::{ConnectionTrait, DbBackend, Statement};
use uuid::Uuid;

async fn new_dress(
    state: &AppState,
    designer: &AuthUser,
    name: &str,
    stock: i32,
) -> anyhow::Result<Uuid> {
    let dress = dress_service::create_dress(
        state,
        designer,
        CreateDressRequest {
            name: name.into(),
            description: None,
            size: "M".into(),
            price: 100_000,
            stock,
            collection_id: None,
            designer_id: None,
        },
    )
    .await?
    .data
    .expect("dress");
    Ok(dress.id)
}

async fn add(state: &AppState, user: &AuthUser, dress_id: Uuid, quantity: i32) -> anyhow::Result<()> {
    cart_service::add_item(
        state,
        user,
        AddToCartRequest {
            dress_id,
            quantity: Some(quantity),
        },
    )
    .await?;
    Ok(())
}

async fn stock_of(state: &AppState, dress_id: Uuid) -> anyhow::Result<i32> {
    let (stock,): (i32,) = sqlx::query_as("SELECT stock FROM dresses WHERE id = $1")
        .bind(dress_id)
        .fetch_one(&state.pool)
        .await?;
    Ok(stock)
}

async fn audit_count(state: &AppState, action: &str) -> anyhow::Result<i64> {
    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM audit_logs WHERE action = $1")
        .bind(action)
        .fetch_one(&state.pool)
        .await?;
    Ok(count)
}

fn insert_audit(action: &str) -> Statement {
    Statement::from_sql_and_values(
        DbBackend::Postgres,
        "INSERT INTO audit_logs (id, action) VALUES ($1, $2)",
        [Uuid::new_v4().into(), action.into()],
    )
}

// Failed writes leave nothing behind, and ordered dresses outlive deletion.
#[tokio::test]
async fn failed_writes_change_nothing() -> anyhow::Result<()> {
    let Some(database_url) = common::database_url() else {
        return Ok(());
    };
    let state = common::setup_state(&database_url).await?;

    // Transaction helper: Err rolls back, Ok commits.
    let rolled_back: Result<(), AppError> =
        transactional(&state.orm, "rollback_check", |txn| {
            Box::pin(async move {
                txn.execute(insert_audit("rollback_check")).await?;
                Err(AppError::BadRequest("stop".into()))
            })
        })
        .await;
    assert!(matches!(rolled_back, Err(AppError::BadRequest(msg)) if msg == "stop"));
    assert_eq!(audit_count(&state, "rollback_check").await?, 0);

    transactional(&state.orm, "commit_check", |txn| {
        Box::pin(async move {
            txn.execute(insert_audit("commit_check")).await?;
            Ok::<_, AppError>(())
        })
    })
    .await?;
    assert_eq!(audit_count(&state, "commit_check").await?, 1);

    // Scoped connections go back to the pool on success and on error alike;
    // more rounds than the pool has connections would otherwise time out.
    for round in 0..25 {
        let value: i32 = with_connection(&state.pool, |conn| {
            Box::pin(async move {
                let (one,): (i32,) = sqlx::query_as("SELECT 1").fetch_one(&mut *conn).await?;
                Ok::<_, AppError>(one)
            })
        })
        .await?;
        assert_eq!(value, 1);

        let failed: Result<(), AppError> = with_connection(&state.pool, move |_conn| {
            Box::pin(async move { Err(AppError::BadRequest(format!("round {round}"))) })
        })
        .await;
        assert!(matches!(failed, Err(AppError::BadRequest(_))));
    }

    let designer = common::register(&state, "selam", Role::Designer).await?;
    let first = common::register(&state, "sofia", Role::Customer).await?;
    let second = common::register(&state, "maya", Role::Customer).await?;

    let scarce = new_dress(&state, &designer, "Aurora Lace Gown", 2).await?;
    let plenty = new_dress(&state, &designer, "Lily Satin Slip", 5).await?;
    let unsold = new_dress(&state, &designer, "Celeste Ball Gown", 1).await?;

    add(&state, &first, scarce, 2).await?;
    add(&state, &second, plenty, 1).await?;
    add(&state, &second, scarce, 2).await?;

    order_service::checkout(&state, &first).await?;
    assert_eq!(stock_of(&state, scarce).await?, 0);

    // The second cart no longer fits: checkout is refused as a whole.
    let oversold = order_service::checkout(&state, &second).await;
    assert!(matches!(oversold, Err(AppError::BadRequest(msg)) if msg.contains("Insufficient stock")));
    assert_eq!(stock_of(&state, scarce).await?, 0);
    assert_eq!(stock_of(&state, plenty).await?, 5);

    let cart = cart_service::get_cart(&state, &second).await?.data.expect("cart");
    assert_eq!(cart.items.len(), 2);
    let orders = order_service::list_orders(&state, &second, OrderListQuery::default()).await?;
    assert_eq!(orders.meta.and_then(|m| m.total), Some(0));

    // An ordered dress cannot be deleted; its order lines stay intact.
    let first_orders = order_service::list_orders(&state, &first, OrderListQuery::default())
        .await?
        .data
        .expect("orders");
    let order_id = first_orders.items[0].id;

    let refused = dress_service::delete_dress(&state, &designer, scarce).await;
    assert!(matches!(refused, Err(AppError::BadRequest(msg)) if msg.contains("has orders")));
    let order = order_service::get_order(&state, &first, order_id)
        .await?
        .data
        .expect("order");
    assert_eq!(order.items.len(), 1);
    assert_eq!(order.items[0].dress_id, scarce);
    assert_eq!(order.order.total_amount, 200_000);

    // Cancelling still restocks the kept line.
    order_service::cancel_order(&state, &first, order_id).await?;
    assert_eq!(stock_of(&state, scarce).await?, 2);

    dress_service::delete_dress(&state, &designer, unsold).await?;
    let gone = dress_service::get_dress(&state, unsold).await;
    assert!(matches!(gone, Err(AppError::NotFound)));

    Ok(())
}
