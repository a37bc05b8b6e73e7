use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::get,
};
use uuid::Uuid;

use crate::{
    dto::dresses::{CreateDressRequest, DressList, DressReviews, UpdateDressRequest},
    error::AppResult,
    middleware::auth::AuthUser,
    models::Dress,
    response::ApiResponse,
    routes::extract::{AppJson, AppPath, AppQuery},
    routes::params::{DressQuery, Pagination},
    services::{dress_service, review_service},
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_dresses).post(create_dress))
        .route(
            "/{id}",
            get(get_dress).patch(update_dress).delete(delete_dress),
        )
        .route("/{id}/reviews", get(dress_reviews))
}

#[utoipa::path(
    get,
    path = "/api/dresses",
    params(
        ("page" = Option<i64>, Query, description = "Page number, default 1"),
        ("per_page" = Option<i64>, Query, description = "Items per page, default 10, max 100"),
        ("q" = Option<String>, Query, description = "Search name or description"),
        ("designer" = Option<Uuid>, Query, description = "Designer ID"),
        ("collection" = Option<Uuid>, Query, description = "Collection ID"),
        ("size" = Option<String>, Query, description = "Exact size, case-insensitive"),
        ("min_price" = Option<i64>, Query, description = "Minimum price in minor units"),
        ("max_price" = Option<i64>, Query, description = "Maximum price in minor units"),
        ("in_stock" = Option<bool>, Query, description = "Only dresses with (or without) stock"),
        ("sort_by" = Option<String>, Query, description = "created_at, price, name, view_count"),
        ("sort_order" = Option<String>, Query, description = "asc or desc")
    ),
    responses(
        (status = 200, description = "List dresses", body = ApiResponse<DressList>)
    ),
    tag = "Dresses"
)]
pub async fn list_dresses(
    State(state): State<AppState>,
    AppQuery(query): AppQuery<DressQuery>,
) -> AppResult<Json<ApiResponse<DressList>>> {
    let resp = dress_service::list_dresses(&state, query).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/dresses/{id}",
    params(("id" = Uuid, Path, description = "Dress ID")),
    responses(
        (status = 200, description = "Get dress and count the view", body = ApiResponse<Dress>),
        (status = 404, description = "Not Found")
    ),
    tag = "Dresses"
)]
pub async fn get_dress(
    State(state): State<AppState>,
    AppPath(id): AppPath<Uuid>,
) -> AppResult<Json<ApiResponse<Dress>>> {
    let resp = dress_service::get_dress(&state, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/dresses",
    request_body = CreateDressRequest,
    responses(
        (status = 201, description = "Create dress", body = ApiResponse<Dress>),
        (status = 400, description = "Invalid input"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Dresses"
)]
pub async fn create_dress(
    State(state): State<AppState>,
    user: AuthUser,
    AppJson(payload): AppJson<CreateDressRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<Dress>>)> {
    let resp = dress_service::create_dress(&state, &user, payload).await?;
    Ok((StatusCode::CREATED, Json(resp)))
}

#[utoipa::path(
    patch,
    path = "/api/dresses/{id}",
    params(("id" = Uuid, Path, description = "Dress ID")),
    request_body = UpdateDressRequest,
    responses(
        (status = 200, description = "Update dress", body = ApiResponse<Dress>),
        (status = 400, description = "Invalid input"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Not Found")
    ),
    security(("bearer_auth" = [])),
    tag = "Dresses"
)]
pub async fn update_dress(
    State(state): State<AppState>,
    user: AuthUser,
    AppPath(id): AppPath<Uuid>,
    AppJson(payload): AppJson<UpdateDressRequest>,
) -> AppResult<Json<ApiResponse<Dress>>> {
    let resp = dress_service::update_dress(&state, &user, id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    delete,
    path = "/api/dresses/{id}",
    params(("id" = Uuid, Path, description = "Dress ID")),
    responses(
        (status = 200, description = "Delete dress"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Not Found")
    ),
    security(("bearer_auth" = [])),
    tag = "Dresses"
)]
pub async fn delete_dress(
    State(state): State<AppState>,
    user: AuthUser,
    AppPath(id): AppPath<Uuid>,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    let resp = dress_service::delete_dress(&state, &user, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/dresses/{id}/reviews",
    params(
        ("id" = Uuid, Path, description = "Dress ID"),
        ("page" = Option<i64>, Query, description = "Page number, default 1"),
        ("per_page" = Option<i64>, Query, description = "Items per page, default 10")
    ),
    responses(
        (status = 200, description = "Reviews of a dress with the average rating", body = ApiResponse<DressReviews>),
        (status = 404, description = "Not Found")
    ),
    tag = "Dresses"
)]
pub async fn dress_reviews(
    State(state): State<AppState>,
    AppPath(id): AppPath<Uuid>,
    AppQuery(pagination): AppQuery<Pagination>,
) -> AppResult<Json<ApiResponse<DressReviews>>> {
    let resp = review_service::dress_reviews(&state, id, pagination).await?;
    Ok(Json(resp))
}
