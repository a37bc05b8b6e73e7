use sea_orm::{
    ActiveModelTrait, ActiveValue::NotSet, ColumnTrait, Condition, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set,
};
use sea_orm::sea_query::{Expr, extension::postgres::PgExpr};
use uuid::Uuid;

use crate::{
    audit,
    dto::collections::{CollectionList, CreateCollectionRequest, UpdateCollectionRequest},
    entity::collections::{ActiveModel, Column, Entity as Collections, Model as CollectionModel},
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::Collection,
    response::{ApiResponse, Meta},
    routes::params::NameQuery,
    services::designer_service::{acting_designer, ensure_catalog_owner},
    state::AppState,
};

pub async fn list_collections(
    state: &AppState,
    query: NameQuery,
) -> AppResult<ApiResponse<CollectionList>> {
    let (page, limit, offset) = query.pagination.normalize();
    let mut condition = Condition::all();
    if let Some(name) = query.name.as_ref().filter(|s| !s.is_empty()) {
        condition = condition.add(Expr::col(Column::Name).ilike(format!("%{}%", name)));
    }
    if let Some(designer) = query.designer {
        condition = condition.add(Column::DesignerId.eq(designer));
    }

    let finder = Collections::find()
        .filter(condition)
        .order_by_desc(Column::CreatedAt);
    let total = finder.clone().count(&state.orm).await? as i64;

    let items = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(Collection::from)
        .collect();

    Ok(ApiResponse::success(
        "Collections",
        CollectionList { items },
        Some(Meta::new(page, limit, total)),
    ))
}

pub async fn get_collection(state: &AppState, id: Uuid) -> AppResult<ApiResponse<Collection>> {
    let collection = find_collection(state, id).await?;
    Ok(ApiResponse::success(
        "Collection",
        Collection::from(collection),
        None,
    ))
}

pub async fn create_collection(
    state: &AppState,
    user: &AuthUser,
    payload: CreateCollectionRequest,
) -> AppResult<ApiResponse<Collection>> {
    let designer = acting_designer(state, user, payload.designer_id).await?;
    let name = payload.name.trim().to_string();
    if name.is_empty() {
        return Err(AppError::BadRequest("name must not be empty".into()));
    }

    let collection = ActiveModel {
        id: Set(Uuid::new_v4()),
        designer_id: Set(designer.id),
        name: Set(name),
        description: Set(payload.description),
        created_at: NotSet,
    }
    .insert(&state.orm)
    .await?;

    audit::record(
        &state.pool,
        Some(user.user_id),
        "collection_create",
        "collections",
        serde_json::json!({ "collection_id": collection.id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Collection created",
        Collection::from(collection),
        Some(Meta::empty()),
    ))
}

pub async fn update_collection(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateCollectionRequest,
) -> AppResult<ApiResponse<Collection>> {
    let existing = find_collection(state, id).await?;
    ensure_catalog_owner(state, user, existing.designer_id).await?;

    let mut active: ActiveModel = existing.into();
    if let Some(name) = payload.name {
        let name = name.trim().to_string();
        if name.is_empty() {
            return Err(AppError::BadRequest("name must not be empty".into()));
        }
        active.name = Set(name);
    }
    if let Some(description) = payload.description {
        active.description = Set(Some(description));
    }
    let collection = active.update(&state.orm).await?;

    Ok(ApiResponse::success(
        "Updated",
        Collection::from(collection),
        Some(Meta::empty()),
    ))
}

pub async fn delete_collection(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    let existing = find_collection(state, id).await?;
    ensure_catalog_owner(state, user, existing.designer_id).await?;

    Collections::delete_by_id(id).exec(&state.orm).await?;
    // Dresses in the collection lose their collection_id.
    state.dress_cache.invalidate_all();

    audit::record(
        &state.pool,
        Some(user.user_id),
        "collection_delete",
        "collections",
        serde_json::json!({ "collection_id": id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Deleted",
        serde_json::json!({}),
        Some(Meta::empty()),
    ))
}

pub(crate) async fn find_collection(state: &AppState, id: Uuid) -> AppResult<CollectionModel> {
    Collections::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)
}
