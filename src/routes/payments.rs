use axum::{
    Json, Router,
    extract::State,
    routing::{get, post},
};
use uuid::Uuid;

use crate::{
    dto::payments::{InitiatePaymentRequest, PaymentWithOrder},
    error::AppResult,
    middleware::auth::AuthUser,
    response::ApiResponse,
    routes::extract::{AppJson, AppPath},
    services::payment_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/initiate", post(initiate_payment))
        .route("/verify/{tx_ref}", get(verify_payment))
        .route("/{id}", get(get_payment))
}

#[utoipa::path(
    post,
    path = "/api/payments/initiate",
    request_body = InitiatePaymentRequest,
    responses(
        (status = 200, description = "Start payment; card and paypal return a checkout_url", body = ApiResponse<PaymentWithOrder>),
        (status = 400, description = "Order not payable or gateway not configured"),
        (status = 403, description = "Forbidden"),
        (status = 502, description = "Payment gateway error")
    ),
    security(("bearer_auth" = [])),
    tag = "Payments"
)]
pub async fn initiate_payment(
    State(state): State<AppState>,
    user: AuthUser,
    AppJson(payload): AppJson<InitiatePaymentRequest>,
) -> AppResult<Json<ApiResponse<PaymentWithOrder>>> {
    let resp = payment_service::initiate_payment(&state, &user, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/payments/verify/{tx_ref}",
    params(("tx_ref" = String, Path, description = "Transaction reference")),
    responses(
        (status = 200, description = "Verify with the gateway and record the outcome", body = ApiResponse<PaymentWithOrder>),
        (status = 404, description = "Not Found"),
        (status = 502, description = "Payment gateway error")
    ),
    security(("bearer_auth" = [])),
    tag = "Payments"
)]
pub async fn verify_payment(
    State(state): State<AppState>,
    user: AuthUser,
    AppPath(tx_ref): AppPath<String>,
) -> AppResult<Json<ApiResponse<PaymentWithOrder>>> {
    let resp = payment_service::verify_payment(&state, &user, tx_ref).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/payments/{id}",
    params(("id" = Uuid, Path, description = "Payment ID")),
    responses(
        (status = 200, description = "Payment with its order", body = ApiResponse<PaymentWithOrder>),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Not Found")
    ),
    security(("bearer_auth" = [])),
    tag = "Payments"
)]
pub async fn get_payment(
    State(state): State<AppState>,
    user: AuthUser,
    AppPath(id): AppPath<Uuid>,
) -> AppResult<Json<ApiResponse<PaymentWithOrder>>> {
    let resp = payment_service::get_payment(&state, &user, id).await?;
    Ok(Json(resp))
}
