use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::get,
};
use uuid::Uuid;

use crate::{
    dto::collections::{CollectionList, CreateCollectionRequest, UpdateCollectionRequest},
    error::AppResult,
    middleware::auth::AuthUser,
    models::Collection,
    response::ApiResponse,
    routes::extract::{AppJson, AppPath, AppQuery},
    routes::params::NameQuery,
    services::collection_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_collections).post(create_collection))
        .route(
            "/{id}",
            get(get_collection)
                .patch(update_collection)
                .delete(delete_collection),
        )
}

#[utoipa::path(
    get,
    path = "/api/collections",
    params(
        ("page" = Option<i64>, Query, description = "Page number, default 1"),
        ("per_page" = Option<i64>, Query, description = "Items per page, default 10"),
        ("name" = Option<String>, Query, description = "Name contains (case-insensitive)"),
        ("designer" = Option<Uuid>, Query, description = "Designer ID")
    ),
    responses(
        (status = 200, description = "List collections", body = ApiResponse<CollectionList>)
    ),
    tag = "Collections"
)]
pub async fn list_collections(
    State(state): State<AppState>,
    AppQuery(query): AppQuery<NameQuery>,
) -> AppResult<Json<ApiResponse<CollectionList>>> {
    let resp = collection_service::list_collections(&state, query).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/collections/{id}",
    params(("id" = Uuid, Path, description = "Collection ID")),
    responses(
        (status = 200, description = "Get collection", body = ApiResponse<Collection>),
        (status = 404, description = "Not Found")
    ),
    tag = "Collections"
)]
pub async fn get_collection(
    State(state): State<AppState>,
    AppPath(id): AppPath<Uuid>,
) -> AppResult<Json<ApiResponse<Collection>>> {
    let resp = collection_service::get_collection(&state, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/collections",
    request_body = CreateCollectionRequest,
    responses(
        (status = 201, description = "Create collection", body = ApiResponse<Collection>),
        (status = 400, description = "Invalid input"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Collections"
)]
pub async fn create_collection(
    State(state): State<AppState>,
    user: AuthUser,
    AppJson(payload): AppJson<CreateCollectionRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<Collection>>)> {
    let resp = collection_service::create_collection(&state, &user, payload).await?;
    Ok((StatusCode::CREATED, Json(resp)))
}

#[utoipa::path(
    patch,
    path = "/api/collections/{id}",
    params(("id" = Uuid, Path, description = "Collection ID")),
    request_body = UpdateCollectionRequest,
    responses(
        (status = 200, description = "Update collection", body = ApiResponse<Collection>),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Not Found")
    ),
    security(("bearer_auth" = [])),
    tag = "Collections"
)]
pub async fn update_collection(
    State(state): State<AppState>,
    user: AuthUser,
    AppPath(id): AppPath<Uuid>,
    AppJson(payload): AppJson<UpdateCollectionRequest>,
) -> AppResult<Json<ApiResponse<Collection>>> {
    let resp = collection_service::update_collection(&state, &user, id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    delete,
    path = "/api/collections/{id}",
    params(("id" = Uuid, Path, description = "Collection ID")),
    responses(
        (status = 200, description = "Delete collection"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Not Found")
    ),
    security(("bearer_auth" = [])),
    tag = "Collections"
)]
pub async fn delete_collection(
    State(state): State<AppState>,
    user: AuthUser,
    AppPath(id): AppPath<Uuid>,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    let resp = collection_service::delete_collection(&state, &user, id).await?;
    Ok(Json(resp))
}
