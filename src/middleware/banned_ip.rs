use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::{error::AppError, middleware::client_ip::client_ip, state::AppState};

/// Rejects requests from addresses listed in `BANNED_IPS` with 403.
pub async fn reject_banned_ips(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    if state.config.banned_ips.is_empty() {
        return next.run(request).await;
    }

    if let Some(ip) = client_ip(request.headers(), request.extensions()) {
        if state.config.banned_ips.contains(&ip) {
            tracing::warn!(%ip, path = %request.uri().path(), "blocked banned ip");
            return AppError::Forbidden.into_response();
        }
    }

    next.run(request).await
}
