use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ActiveValue::NotSet, ColumnTrait, Condition, DatabaseTransaction,
    EntityTrait, FromQueryResult, JoinType, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect,
    RelationTrait, Set,
};
use sea_orm::sea_query::{Expr, LockType};
use uuid::Uuid;

use crate::{
    audit,
    db_access::transactional,
    dto::orders::{OrderList, OrderWithItems},
    entity::{
        cart_items::{self, Column as CartItemCol, Entity as CartItems},
        carts::{Column as CartCol, Entity as Carts},
        dresses::{Column as DressCol, Entity as Dresses},
        order_items::{ActiveModel as OrderItemActive, Column as OrderItemCol, Entity as OrderItems},
        orders::{ActiveModel as OrderActive, Column as OrderCol, Entity as Orders, Model as OrderModel},
        payments::{Column as PaymentCol, Entity as Payments},
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_owner_or_admin},
    models::{Order, OrderItem, OrderStatus, Payment},
    response::{ApiResponse, Meta},
    routes::params::{OrderListQuery, SortOrder},
    state::AppState,
};

#[derive(Debug, FromQueryResult)]
struct CheckoutLine {
    dress_id: Uuid,
    name: String,
    quantity: i32,
    price: i64,
    stock: i32,
}

/// Sum of `price * quantity` over order lines, rejecting totals that do not
/// fit in minor units.
pub fn order_total<I>(lines: I) -> AppResult<i64>
where
    I: IntoIterator<Item = (i64, i32)>,
{
    lines.into_iter().try_fold(0i64, |total, (price, quantity)| {
        price
            .checked_mul(i64::from(quantity))
            .and_then(|line| total.checked_add(line))
            .ok_or_else(|| AppError::BadRequest("Order total is too large".into()))
    })
}

/// Lists the caller's orders. Admins see every order.
pub async fn list_orders(
    state: &AppState,
    user: &AuthUser,
    query: OrderListQuery,
) -> AppResult<ApiResponse<OrderList>> {
    let scope = if user.is_admin() {
        None
    } else {
        Some(user.user_id)
    };
    let (items, meta) = query_orders(state, scope, query).await?;
    Ok(ApiResponse::success("Ok", OrderList { items }, Some(meta)))
}

pub(crate) async fn query_orders(
    state: &AppState,
    owner: Option<Uuid>,
    query: OrderListQuery,
) -> AppResult<(Vec<Order>, Meta)> {
    let (page, limit, offset) = query.pagination.normalize();
    let mut condition = Condition::all();
    if let Some(owner) = owner {
        condition = condition.add(OrderCol::UserId.eq(owner));
    }
    if let Some(status) = query.status.as_ref().filter(|s| !s.is_empty()) {
        let status: OrderStatus = status.parse().map_err(AppError::BadRequest)?;
        condition = condition.add(OrderCol::Status.eq(status.as_str()));
    }

    let sort_order = query.sort_order.unwrap_or(SortOrder::Desc);

    let mut finder = Orders::find().filter(condition);
    finder = match sort_order {
        SortOrder::Asc => finder.order_by_asc(OrderCol::CreatedAt),
        SortOrder::Desc => finder.order_by_desc(OrderCol::CreatedAt),
    };

    let total = finder.clone().count(&state.orm).await? as i64;

    let orders = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(Order::from)
        .collect();

    Ok((orders, Meta::new(page, limit, total)))
}

/// Turns the caller's cart into a pending order in one transaction.
pub async fn checkout(
    state: &AppState,
    user: &AuthUser,
) -> AppResult<ApiResponse<OrderWithItems>> {
    let user_id = user.user_id;

    let (order, items) = transactional(&state.orm, "checkout", move |txn| {
        Box::pin(async move {
            let cart = Carts::find()
                .filter(CartCol::UserId.eq(user_id))
                .one(txn)
                .await?
                .ok_or_else(|| AppError::BadRequest("Cart is empty".into()))?;

            let lines = CartItems::find()
                .select_only()
                .column_as(CartItemCol::DressId, "dress_id")
                .column_as(CartItemCol::Quantity, "quantity")
                .column_as(DressCol::Name, "name")
                .column_as(DressCol::Price, "price")
                .column_as(DressCol::Stock, "stock")
                .join(JoinType::InnerJoin, cart_items::Relation::Dresses.def())
                .filter(CartItemCol::CartId.eq(cart.id))
                .order_by_asc(CartItemCol::DressId)
                .lock(LockType::Update)
                .into_model::<CheckoutLine>()
                .all(txn)
                .await?;

            if lines.is_empty() {
                return Err(AppError::BadRequest("Cart is empty".into()));
            }

            for line in &lines {
                if line.quantity <= 0 {
                    return Err(AppError::BadRequest("Cart has invalid quantity".into()));
                }
                if line.stock < line.quantity {
                    return Err(AppError::BadRequest(format!(
                        "Insufficient stock for {}",
                        line.name
                    )));
                }
            }
            let total_amount =
                order_total(lines.iter().map(|line| (line.price, line.quantity)))?;

            let order = OrderActive {
                id: Set(Uuid::new_v4()),
                user_id: Set(user_id),
                status: Set(OrderStatus::Pending.as_str().into()),
                total_amount: Set(total_amount),
                created_at: NotSet,
                updated_at: NotSet,
            }
            .insert(txn)
            .await?;

            let mut items = Vec::with_capacity(lines.len());
            for line in &lines {
                let item = OrderItemActive {
                    id: Set(Uuid::new_v4()),
                    order_id: Set(order.id),
                    dress_id: Set(line.dress_id),
                    quantity: Set(line.quantity),
                    price: Set(line.price),
                    created_at: NotSet,
                }
                .insert(txn)
                .await?;
                items.push(OrderItem::from(item));

                let updated = Dresses::update_many()
                    .col_expr(DressCol::Stock, Expr::col(DressCol::Stock).sub(line.quantity))
                    .filter(DressCol::Id.eq(line.dress_id))
                    .filter(DressCol::Stock.gte(line.quantity))
                    .exec(txn)
                    .await?;
                if updated.rows_affected != 1 {
                    return Err(AppError::BadRequest(format!(
                        "Insufficient stock for {}",
                        line.name
                    )));
                }
            }

            CartItems::delete_many()
                .filter(CartItemCol::CartId.eq(cart.id))
                .exec(txn)
                .await?;

            Ok::<_, AppError>((order, items))
        })
    })
    .await?;

    state.dress_cache.invalidate_all();

    audit::record(
        &state.pool,
        Some(user.user_id),
        "checkout",
        "orders",
        serde_json::json!({ "order_id": order.id, "total_amount": order.total_amount }),
    )
    .await;

    Ok(ApiResponse::success(
        "Checkout success",
        OrderWithItems {
            order: Order::from(order),
            items,
            payment: None,
        },
        Some(Meta::empty()),
    ))
}

pub async fn get_order(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<OrderWithItems>> {
    let order = find_order(state, id).await?;
    ensure_owner_or_admin(user, order.user_id)?;

    let details = order_details(state, order).await?;
    Ok(ApiResponse::success("OK", details, Some(Meta::empty())))
}

/// Cancels a pending or paid order and puts its stock back.
pub async fn cancel_order(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<OrderWithItems>> {
    let order = find_order(state, id).await?;
    ensure_owner_or_admin(user, order.user_id)?;

    let order = change_status(state, id, OrderStatus::Cancelled).await?;

    audit::record(
        &state.pool,
        Some(user.user_id),
        "order_cancel",
        "orders",
        serde_json::json!({ "order_id": order.id }),
    )
    .await;

    let details = order_details(state, order).await?;
    Ok(ApiResponse::success("Order cancelled", details, Some(Meta::empty())))
}

/// Locks the order and moves it to `next`, restocking on cancellation.
pub(crate) async fn change_status(
    state: &AppState,
    id: Uuid,
    next: OrderStatus,
) -> AppResult<OrderModel> {
    let order = transactional(&state.orm, "order_status", move |txn| {
        Box::pin(async move {
            let order = Orders::find_by_id(id)
                .lock(LockType::Update)
                .one(txn)
                .await?
                .ok_or(AppError::NotFound)?;
            apply_status_change(txn, order, next).await
        })
    })
    .await?;

    if next == OrderStatus::Cancelled {
        state.dress_cache.invalidate_all();
    }
    Ok(order)
}

/// Applies a lifecycle move inside an open transaction. The order row must
/// already be locked by the caller.
pub(crate) async fn apply_status_change(
    txn: &DatabaseTransaction,
    order: OrderModel,
    next: OrderStatus,
) -> AppResult<OrderModel> {
    let current: OrderStatus = order
        .status
        .parse()
        .map_err(|e: String| AppError::Internal(anyhow::anyhow!(e)))?;
    if !current.can_transition_to(next) {
        return Err(AppError::BadRequest(format!(
            "Cannot change order status from {current} to {next}"
        )));
    }

    if next == OrderStatus::Cancelled {
        restock(txn, order.id).await?;
    }

    let mut active: OrderActive = order.into();
    active.status = Set(next.as_str().into());
    active.updated_at = Set(Utc::now().into());
    Ok(active.update(txn).await?)
}

async fn restock(txn: &DatabaseTransaction, order_id: Uuid) -> AppResult<()> {
    let items = OrderItems::find()
        .filter(OrderItemCol::OrderId.eq(order_id))
        .all(txn)
        .await?;

    for item in items {
        Dresses::update_many()
            .col_expr(DressCol::Stock, Expr::col(DressCol::Stock).add(item.quantity))
            .filter(DressCol::Id.eq(item.dress_id))
            .exec(txn)
            .await?;
    }
    Ok(())
}

pub(crate) async fn find_order(state: &AppState, id: Uuid) -> AppResult<OrderModel> {
    Orders::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)
}

pub(crate) async fn order_details(state: &AppState, order: OrderModel) -> AppResult<OrderWithItems> {
    let items = OrderItems::find()
        .filter(OrderItemCol::OrderId.eq(order.id))
        .order_by_asc(OrderItemCol::CreatedAt)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(OrderItem::from)
        .collect();

    let payment = Payments::find()
        .filter(PaymentCol::OrderId.eq(order.id))
        .one(&state.orm)
        .await?
        .map(Payment::from);

    Ok(OrderWithItems {
        order: Order::from(order),
        items,
        payment,
    })
}
