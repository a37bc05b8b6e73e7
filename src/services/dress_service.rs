use sea_orm::{
    ActiveModelTrait, ActiveValue::NotSet, ColumnTrait, Condition, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set,
};
use sea_orm::sea_query::{Expr, extension::postgres::PgExpr};
use uuid::Uuid;

use crate::{
    audit,
    db_access::logged,
    dto::dresses::{CreateDressRequest, DressList, DressPage, UpdateDressRequest},
    entity::dresses::{ActiveModel, Column, Entity as Dresses, Model as DressModel},
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::Dress,
    response::{ApiResponse, Meta},
    routes::params::{DressQuery, DressSortBy, SortOrder},
    services::{
        collection_service::find_collection,
        designer_service::{acting_designer, ensure_catalog_owner},
    },
    state::AppState,
};

const INCREMENT_VIEWS: &str = "UPDATE dresses SET view_count = view_count + 1 WHERE id = $1";

pub async fn list_dresses(
    state: &AppState,
    query: DressQuery,
) -> AppResult<ApiResponse<DressList>> {
    let (page, limit, offset) = query.pagination.normalize();
    let key = query.cache_key();

    let result = state
        .dress_cache
        .get_or_load(key, load_dress_page(&state.orm, &query, limit, offset))
        .await?;

    let meta = Meta::new(page, limit, result.total);
    Ok(ApiResponse::success(
        "Dresses",
        DressList {
            items: result.items,
        },
        Some(meta),
    ))
}

async fn load_dress_page(
    orm: &DatabaseConnection,
    query: &DressQuery,
    limit: i64,
    offset: i64,
) -> AppResult<DressPage> {
    let mut condition = Condition::all();

    if let Some(search) = query.q.as_ref().filter(|s| !s.is_empty()) {
        let pattern = format!("%{}%", search);
        condition = condition.add(
            Condition::any()
                .add(Expr::col(Column::Name).ilike(pattern.clone()))
                .add(Expr::col(Column::Description).ilike(pattern)),
        );
    }
    if let Some(designer) = query.designer {
        condition = condition.add(Column::DesignerId.eq(designer));
    }
    if let Some(collection) = query.collection {
        condition = condition.add(Column::CollectionId.eq(collection));
    }
    if let Some(size) = query.size.as_ref().filter(|s| !s.is_empty()) {
        condition = condition.add(Expr::col(Column::Size).ilike(size.clone()));
    }
    if let Some(min_price) = query.min_price {
        condition = condition.add(Column::Price.gte(min_price));
    }
    if let Some(max_price) = query.max_price {
        condition = condition.add(Column::Price.lte(max_price));
    }
    match query.in_stock {
        Some(true) => condition = condition.add(Column::Stock.gt(0)),
        Some(false) => condition = condition.add(Column::Stock.eq(0)),
        None => {}
    }

    let sort_col = match query.sort_by.unwrap_or(DressSortBy::CreatedAt) {
        DressSortBy::CreatedAt => Column::CreatedAt,
        DressSortBy::Price => Column::Price,
        DressSortBy::Name => Column::Name,
        DressSortBy::ViewCount => Column::ViewCount,
    };

    let mut finder = Dresses::find().filter(condition);
    finder = match query.sort_order.unwrap_or(SortOrder::Desc) {
        SortOrder::Asc => finder.order_by_asc(sort_col),
        SortOrder::Desc => finder.order_by_desc(sort_col),
    };
    // Tie-break so pages never overlap when the sort column repeats.
    finder = finder.order_by_asc(Column::Id);

    let total = finder.clone().count(orm).await? as i64;
    let items = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(orm)
        .await?
        .into_iter()
        .map(Dress::from)
        .collect();

    Ok(DressPage { items, total })
}

/// Returns the dress and counts the view. A failed counter update is logged
/// and does not fail the read.
pub async fn get_dress(state: &AppState, id: Uuid) -> AppResult<ApiResponse<Dress>> {
    if let Err(err) = logged(
        "dress_view_count",
        INCREMENT_VIEWS,
        sqlx::query(INCREMENT_VIEWS).bind(id).execute(&state.pool),
    )
    .await
    {
        tracing::warn!(error = %err, dress_id = %id, "dress view count update failed");
    }

    let dress = find_dress(state, id).await?;
    Ok(ApiResponse::success("Dress", Dress::from(dress), None))
}

pub async fn create_dress(
    state: &AppState,
    user: &AuthUser,
    payload: CreateDressRequest,
) -> AppResult<ApiResponse<Dress>> {
    let designer = acting_designer(state, user, payload.designer_id).await?;

    let name = payload.name.trim().to_string();
    let size = payload.size.trim().to_string();
    validate_dress(&name, &size, payload.price, payload.stock)?;
    if let Some(collection_id) = payload.collection_id {
        ensure_collection_of(state, collection_id, designer.id).await?;
    }

    let dress = ActiveModel {
        id: Set(Uuid::new_v4()),
        designer_id: Set(designer.id),
        collection_id: Set(payload.collection_id),
        name: Set(name),
        description: Set(payload.description),
        size: Set(size),
        price: Set(payload.price),
        stock: Set(payload.stock),
        view_count: Set(0),
        created_at: NotSet,
    }
    .insert(&state.orm)
    .await?;
    state.dress_cache.invalidate_all();

    audit::record(
        &state.pool,
        Some(user.user_id),
        "dress_create",
        "dresses",
        serde_json::json!({ "dress_id": dress.id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Dress created",
        Dress::from(dress),
        Some(Meta::empty()),
    ))
}

pub async fn update_dress(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateDressRequest,
) -> AppResult<ApiResponse<Dress>> {
    let existing = find_dress(state, id).await?;
    ensure_catalog_owner(state, user, existing.designer_id).await?;

    let name = payload
        .name
        .map(|n| n.trim().to_string())
        .unwrap_or_else(|| existing.name.clone());
    let size = payload
        .size
        .map(|s| s.trim().to_string())
        .unwrap_or_else(|| existing.size.clone());
    let price = payload.price.unwrap_or(existing.price);
    let stock = payload.stock.unwrap_or(existing.stock);
    validate_dress(&name, &size, price, stock)?;
    if let Some(collection_id) = payload.collection_id {
        ensure_collection_of(state, collection_id, existing.designer_id).await?;
    }

    let mut active: ActiveModel = existing.into();
    active.name = Set(name);
    active.size = Set(size);
    active.price = Set(price);
    active.stock = Set(stock);
    if let Some(description) = payload.description {
        active.description = Set(Some(description));
    }
    if let Some(collection_id) = payload.collection_id {
        active.collection_id = Set(Some(collection_id));
    }
    let dress = active.update(&state.orm).await?;
    state.dress_cache.invalidate_all();

    audit::record(
        &state.pool,
        Some(user.user_id),
        "dress_update",
        "dresses",
        serde_json::json!({ "dress_id": dress.id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Updated",
        Dress::from(dress),
        Some(Meta::empty()),
    ))
}

pub async fn delete_dress(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    let existing = find_dress(state, id).await?;
    ensure_catalog_owner(state, user, existing.designer_id).await?;

    Dresses::delete_by_id(id)
        .exec(&state.orm)
        .await
        .map_err(|err| {
            AppError::from(err).foreign_key_as_bad_request(
                "Dress has orders and cannot be deleted",
            )
        })?;
    state.dress_cache.invalidate_all();

    audit::record(
        &state.pool,
        Some(user.user_id),
        "dress_delete",
        "dresses",
        serde_json::json!({ "dress_id": id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Deleted",
        serde_json::json!({}),
        Some(Meta::empty()),
    ))
}

pub fn validate_dress(name: &str, size: &str, price: i64, stock: i32) -> AppResult<()> {
    if name.is_empty() {
        return Err(AppError::BadRequest("name must not be empty".into()));
    }
    if size.is_empty() {
        return Err(AppError::BadRequest("size must not be empty".into()));
    }
    if price < 0 {
        return Err(AppError::BadRequest("price must not be negative".into()));
    }
    if stock < 0 {
        return Err(AppError::BadRequest("stock must not be negative".into()));
    }
    Ok(())
}

pub(crate) async fn find_dress(state: &AppState, id: Uuid) -> AppResult<DressModel> {
    Dresses::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)
}

async fn ensure_collection_of(
    state: &AppState,
    collection_id: Uuid,
    designer_id: Uuid,
) -> AppResult<()> {
    let collection = find_collection(state, collection_id)
        .await
        .map_err(|err| match err {
            AppError::NotFound => AppError::BadRequest("Collection not found".into()),
            other => other,
        })?;
    if collection.designer_id != designer_id {
        return Err(AppError::BadRequest(
            "Collection belongs to another designer".into(),
        ));
    }
    Ok(())
}
