use axum::Router;

use crate::state::AppState;

pub mod admin;
pub mod appointments;
pub mod auth;
pub mod cart;
pub mod collections;
pub mod designers;
pub mod doc;
pub mod extract;
pub mod dresses;
pub mod health;
pub mod orders;
pub mod params;
pub mod payments;
pub mod reviews;
pub mod users;

// Build the API router without binding state; it will be provided at the top level.
pub fn create_api_router() -> Router<AppState> {
    Router::new()
        .nest("/auth", auth::router())
        .nest("/users", users::router())
        .nest("/designers", designers::router())
        .nest("/collections", collections::router())
        .nest("/dresses", dresses::router())
        .nest("/cart", cart::router())
        .nest("/orders", orders::router())
        .nest("/payments", payments::router())
        .nest("/appointments", appointments::router())
        .nest("/reviews", reviews::router())
        .nest("/admin", admin::router())
}
