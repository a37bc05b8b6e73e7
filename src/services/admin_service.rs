use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect,
};
use sea_orm::sea_query::LockType;
use sea_orm::ActiveValue::Set;
use uuid::Uuid;

use crate::{
    audit,
    db_access::{logged, transactional},
    dto::{
        admin::{AuditLogList, DashboardStats, InventoryAdjustRequest, LowStockList},
        orders::{OrderList, OrderWithItems, UpdateOrderStatusRequest},
    },
    entity::{
        audit_logs::{Column as AuditCol, Entity as AuditLogs},
        designers::Entity as Designers,
        dresses::{ActiveModel as DressActive, Column as DressCol, Entity as Dresses},
        orders::{Column as OrderCol, Entity as Orders},
        users::Entity as Users,
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin},
    models::{AuditLog, Dress, Order, OrderStatus},
    response::{ApiResponse, Meta},
    routes::params::{AuditLogQuery, LowStockQuery, OrderListQuery},
    services::order_service::{change_status, find_order, order_details, query_orders},
    state::AppState,
};

pub const DEFAULT_LOW_STOCK_THRESHOLD: i32 = 5;

const PAID_REVENUE: &str = r#"
    SELECT COALESCE(SUM(total_amount), 0)::bigint
    FROM orders
    WHERE status IN ('paid', 'shipped', 'delivered')
"#;

pub async fn list_all_orders(
    state: &AppState,
    user: &AuthUser,
    query: OrderListQuery,
) -> AppResult<ApiResponse<OrderList>> {
    ensure_admin(user)?;
    let (items, meta) = query_orders(state, None, query).await?;
    Ok(ApiResponse::success("Orders", OrderList { items }, Some(meta)))
}

pub async fn get_order_admin(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<OrderWithItems>> {
    ensure_admin(user)?;
    let order = find_order(state, id).await?;
    let data = order_details(state, order).await?;
    Ok(ApiResponse::success("Order found", data, Some(Meta::empty())))
}

pub async fn update_order_status(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateOrderStatusRequest,
) -> AppResult<ApiResponse<Order>> {
    ensure_admin(user)?;

    let order = change_status(state, id, payload.status).await?;

    audit::record(
        &state.pool,
        Some(user.user_id),
        "order_status_update",
        "orders",
        serde_json::json!({ "order_id": order.id, "status": order.status }),
    )
    .await;

    Ok(ApiResponse::success(
        "Order updated",
        Order::from(order),
        Some(Meta::empty()),
    ))
}

pub async fn list_low_stock(
    state: &AppState,
    user: &AuthUser,
    query: LowStockQuery,
) -> AppResult<ApiResponse<LowStockList>> {
    ensure_admin(user)?;
    let threshold = query.threshold.unwrap_or(DEFAULT_LOW_STOCK_THRESHOLD);
    let (page, limit, offset) = query.pagination.normalize();

    let finder = Dresses::find()
        .filter(DressCol::Stock.lte(threshold))
        .order_by_asc(DressCol::Stock)
        .order_by_desc(DressCol::CreatedAt);

    let total = finder.clone().count(&state.orm).await? as i64;

    let items = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(Dress::from)
        .collect();

    let meta = Meta::new(page, limit, total);
    Ok(ApiResponse::success("Low stock", LowStockList { items }, Some(meta)))
}

pub async fn adjust_inventory(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: InventoryAdjustRequest,
) -> AppResult<ApiResponse<Dress>> {
    ensure_admin(user)?;
    let delta = payload.delta;
    if delta == 0 {
        return Err(AppError::BadRequest("delta must not be 0".into()));
    }

    let updated = transactional(&state.orm, "inventory_adjust", move |txn| {
        Box::pin(async move {
            let dress = Dresses::find_by_id(id)
                .lock(LockType::Update)
                .one(txn)
                .await?
                .ok_or(AppError::NotFound)?;

            let new_stock = adjusted_stock(dress.stock, delta)?;

            let mut active: DressActive = dress.into();
            active.stock = Set(new_stock);
            Ok::<_, AppError>(active.update(txn).await?)
        })
    })
    .await?;
    state.dress_cache.invalidate_all();

    audit::record(
        &state.pool,
        Some(user.user_id),
        "inventory_adjust",
        "dresses",
        serde_json::json!({ "dress_id": updated.id, "delta": delta, "stock": updated.stock }),
    )
    .await;

    Ok(ApiResponse::success(
        "Inventory updated",
        Dress::from(updated),
        Some(Meta::empty()),
    ))
}

/// Stock after applying an inventory delta. Never negative.
pub fn adjusted_stock(stock: i32, delta: i32) -> AppResult<i32> {
    match stock.checked_add(delta) {
        Some(new_stock) if new_stock >= 0 => Ok(new_stock),
        Some(_) => Err(AppError::BadRequest("stock cannot be negative".into())),
        None => Err(AppError::BadRequest("stock adjustment is out of range".into())),
    }
}

pub async fn list_audit_logs(
    state: &AppState,
    user: &AuthUser,
    query: AuditLogQuery,
) -> AppResult<ApiResponse<AuditLogList>> {
    ensure_admin(user)?;
    let (page, limit, offset) = query.pagination.normalize();

    let mut condition = Condition::all();
    if let Some(action) = query.action.as_ref().filter(|s| !s.is_empty()) {
        condition = condition.add(AuditCol::Action.eq(action.clone()));
    }

    let finder = AuditLogs::find()
        .filter(condition)
        .order_by_desc(AuditCol::CreatedAt);
    let total = finder.clone().count(&state.orm).await? as i64;

    let items = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(AuditLog::from)
        .collect();

    Ok(ApiResponse::success(
        "Audit logs",
        AuditLogList { items },
        Some(Meta::new(page, limit, total)),
    ))
}

/// Dashboard counters. The queries are independent and run concurrently.
pub async fn stats(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<DashboardStats>> {
    ensure_admin(user)?;
    let orm = &state.orm;

    let (users, designers, dresses, orders, pending_orders, revenue) = tokio::try_join!(
        async { Ok::<_, AppError>(Users::find().count(orm).await? as i64) },
        async { Ok::<_, AppError>(Designers::find().count(orm).await? as i64) },
        async { Ok::<_, AppError>(Dresses::find().count(orm).await? as i64) },
        async { Ok::<_, AppError>(Orders::find().count(orm).await? as i64) },
        async {
            let pending = Orders::find()
                .filter(OrderCol::Status.eq(OrderStatus::Pending.as_str()))
                .count(orm)
                .await?;
            Ok::<_, AppError>(pending as i64)
        },
        async {
            let (revenue,): (i64,) = logged(
                "paid_revenue",
                PAID_REVENUE,
                sqlx::query_as(PAID_REVENUE).fetch_one(&state.pool),
            )
            .await?;
            Ok::<_, AppError>(revenue)
        },
    )?;

    Ok(ApiResponse::success(
        "Stats",
        DashboardStats {
            users,
            designers,
            dresses,
            orders,
            pending_orders,
            revenue,
        },
        Some(Meta::empty()),
    ))
}
