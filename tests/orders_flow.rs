mod common;

use bridal_api::{
    dto::{
        admin::InventoryAdjustRequest, cart::AddToCartRequest, dresses::CreateDressRequest,
        orders::UpdateOrderStatusRequest,
    },
    error::AppError,
    models::{OrderStatus, Role},
    routes::params::{LowStockQuery, Pagination},
    services::{admin_service, cart_service, dress_service, order_service},
};

// Designer lists a dress, customer buys it, cancels, and the admin follows up.
#[tokio::test]
async fn checkout_cancel_and_admin_flow() -> anyhow::Result<()> {
    let Some(database_url) = common::database_url() else {
        return Ok(());
    };
    let state = common::setup_state(&database_url).await?;

    let designer = common::register(&state, "selam", Role::Designer).await?;
    let customer = common::register(&state, "sofia", Role::Customer).await?;
    let admin = common::register_admin(&state, "root").await?;

    let dress = dress_service::create_dress(
        &state,
        &designer,
        CreateDressRequest {
            name: "Aurora Lace Gown".into(),
            description: None,
            size: "M".into(),
            price: 250_000,
            stock: 3,
            collection_id: None,
            designer_id: None,
        },
    )
    .await?
    .data
    .expect("dress");

    // Customers cannot list dresses.
    let denied = dress_service::create_dress(
        &state,
        &customer,
        CreateDressRequest {
            name: "Knockoff".into(),
            description: None,
            size: "S".into(),
            price: 1,
            stock: 1,
            collection_id: None,
            designer_id: None,
        },
    )
    .await;
    assert!(matches!(denied, Err(AppError::Forbidden)));

    // Viewing counts.
    let viewed = dress_service::get_dress(&state, dress.id).await?.data.expect("dress");
    assert_eq!(viewed.view_count, 1);

    // More than in stock is refused.
    let too_many = cart_service::add_item(
        &state,
        &customer,
        AddToCartRequest {
            dress_id: dress.id,
            quantity: Some(4),
        },
    )
    .await;
    assert!(matches!(too_many, Err(AppError::BadRequest(_))));

    let cart = cart_service::add_item(
        &state,
        &customer,
        AddToCartRequest {
            dress_id: dress.id,
            quantity: Some(2),
        },
    )
    .await?
    .data
    .expect("cart");
    assert_eq!(cart.total, 500_000);
    assert_eq!(cart.items.len(), 1);

    let placed = order_service::checkout(&state, &customer)
        .await?
        .data
        .expect("order");
    assert_eq!(placed.order.total_amount, 500_000);
    assert_eq!(placed.order.status, "pending");
    assert_eq!(placed.items.len(), 1);
    assert_eq!(placed.items[0].price, 250_000);

    let after_checkout = dress_service::get_dress(&state, dress.id).await?.data.expect("dress");
    assert_eq!(after_checkout.stock, 1);

    let emptied = cart_service::get_cart(&state, &customer).await?.data.expect("cart");
    assert!(emptied.items.is_empty());

    // An empty cart cannot be checked out.
    let again = order_service::checkout(&state, &customer).await;
    assert!(matches!(again, Err(AppError::BadRequest(_))));

    // Low stock listing sees the remaining dress.
    let low = admin_service::list_low_stock(
        &state,
        &admin,
        LowStockQuery {
            pagination: Pagination::new(1, 20),
            threshold: Some(2),
        },
    )
    .await?
    .data
    .expect("low stock");
    assert!(low.items.iter().any(|d| d.id == dress.id));

    let cancelled = order_service::cancel_order(&state, &customer, placed.order.id)
        .await?
        .data
        .expect("cancelled");
    assert_eq!(cancelled.order.status, "cancelled");

    let restocked = dress_service::get_dress(&state, dress.id).await?.data.expect("dress");
    assert_eq!(restocked.stock, 3);

    // Cancelled is terminal.
    let revive = admin_service::update_order_status(
        &state,
        &admin,
        placed.order.id,
        UpdateOrderStatusRequest {
            status: OrderStatus::Paid,
        },
    )
    .await;
    assert!(matches!(revive, Err(AppError::BadRequest(_))));

    // Second order walks the admin lifecycle.
    cart_service::add_item(
        &state,
        &customer,
        AddToCartRequest {
            dress_id: dress.id,
            quantity: None,
        },
    )
    .await?;
    let second = order_service::checkout(&state, &customer)
        .await?
        .data
        .expect("order");
    for status in [OrderStatus::Paid, OrderStatus::Shipped] {
        let updated = admin_service::update_order_status(
            &state,
            &admin,
            second.order.id,
            UpdateOrderStatusRequest { status },
        )
        .await?
        .data
        .expect("order");
        assert_eq!(updated.status, status.as_str());
    }
    let late_cancel = order_service::cancel_order(&state, &customer, second.order.id).await;
    assert!(matches!(late_cancel, Err(AppError::BadRequest(_))));

    // Customers are not admins.
    let forbidden = admin_service::stats(&state, &customer).await;
    assert!(matches!(forbidden, Err(AppError::Forbidden)));

    let adjusted = admin_service::adjust_inventory(
        &state,
        &admin,
        dress.id,
        InventoryAdjustRequest { delta: 5 },
    )
    .await?
    .data
    .expect("dress");
    assert_eq!(adjusted.stock, 7);

    let negative = admin_service::adjust_inventory(
        &state,
        &admin,
        dress.id,
        InventoryAdjustRequest { delta: -100 },
    )
    .await;
    assert!(matches!(negative, Err(AppError::BadRequest(_))));

    let stats = admin_service::stats(&state, &admin).await?.data.expect("stats");
    assert_eq!(stats.users, 3);
    assert_eq!(stats.designers, 1);
    assert_eq!(stats.dresses, 1);
    assert_eq!(stats.orders, 2);
    assert_eq!(stats.pending_orders, 0);
    assert_eq!(stats.revenue, 250_000);

    Ok(())
}
