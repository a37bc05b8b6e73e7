use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::get,
};
use uuid::Uuid;

use crate::{
    dto::designers::{CreateDesignerRequest, DesignerList, UpdateDesignerRequest},
    error::AppResult,
    middleware::auth::AuthUser,
    models::Designer,
    response::ApiResponse,
    routes::extract::{AppJson, AppPath, AppQuery},
    routes::params::NameQuery,
    services::designer_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_designers).post(create_designer))
        .route(
            "/{id}",
            get(get_designer)
                .patch(update_designer)
                .delete(delete_designer),
        )
}

#[utoipa::path(
    get,
    path = "/api/designers",
    params(
        ("page" = Option<i64>, Query, description = "Page number, default 1"),
        ("per_page" = Option<i64>, Query, description = "Items per page, default 10"),
        ("name" = Option<String>, Query, description = "Name contains (case-insensitive)")
    ),
    responses(
        (status = 200, description = "List designers", body = ApiResponse<DesignerList>)
    ),
    tag = "Designers"
)]
pub async fn list_designers(
    State(state): State<AppState>,
    AppQuery(query): AppQuery<NameQuery>,
) -> AppResult<Json<ApiResponse<DesignerList>>> {
    let resp = designer_service::list_designers(&state, query).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/designers/{id}",
    params(("id" = Uuid, Path, description = "Designer ID")),
    responses(
        (status = 200, description = "Get designer", body = ApiResponse<Designer>),
        (status = 404, description = "Not Found")
    ),
    tag = "Designers"
)]
pub async fn get_designer(
    State(state): State<AppState>,
    AppPath(id): AppPath<Uuid>,
) -> AppResult<Json<ApiResponse<Designer>>> {
    let resp = designer_service::get_designer(&state, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/designers",
    request_body = CreateDesignerRequest,
    responses(
        (status = 201, description = "Create designer profile", body = ApiResponse<Designer>),
        (status = 400, description = "Invalid input or profile exists"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Designers"
)]
pub async fn create_designer(
    State(state): State<AppState>,
    user: AuthUser,
    AppJson(payload): AppJson<CreateDesignerRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<Designer>>)> {
    let resp = designer_service::create_designer(&state, &user, payload).await?;
    Ok((StatusCode::CREATED, Json(resp)))
}

#[utoipa::path(
    patch,
    path = "/api/designers/{id}",
    params(("id" = Uuid, Path, description = "Designer ID")),
    request_body = UpdateDesignerRequest,
    responses(
        (status = 200, description = "Update designer (owner or admin)", body = ApiResponse<Designer>),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Not Found")
    ),
    security(("bearer_auth" = [])),
    tag = "Designers"
)]
pub async fn update_designer(
    State(state): State<AppState>,
    user: AuthUser,
    AppPath(id): AppPath<Uuid>,
    AppJson(payload): AppJson<UpdateDesignerRequest>,
) -> AppResult<Json<ApiResponse<Designer>>> {
    let resp = designer_service::update_designer(&state, &user, id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    delete,
    path = "/api/designers/{id}",
    params(("id" = Uuid, Path, description = "Designer ID")),
    responses(
        (status = 200, description = "Delete designer (admin only)"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Not Found")
    ),
    security(("bearer_auth" = [])),
    tag = "Designers"
)]
pub async fn delete_designer(
    State(state): State<AppState>,
    user: AuthUser,
    AppPath(id): AppPath<Uuid>,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    let resp = designer_service::delete_designer(&state, &user, id).await?;
    Ok(Json(resp))
}
