pub mod auth;
pub mod banned_ip;
pub mod client_ip;
pub mod rate_limit;

use axum::http::{HeaderName, HeaderValue};
use tower_http::set_header::SetResponseHeaderLayer;

pub const BRAND_HEADER: &str = "x-benareyo-api";
pub const BRAND_VALUE: &str = "benareyo-bridal-backend";

/// Stamps every response with the service branding header.
pub fn brand_header_layer() -> SetResponseHeaderLayer<HeaderValue> {
    SetResponseHeaderLayer::overriding(
        HeaderName::from_static(BRAND_HEADER),
        HeaderValue::from_static(BRAND_VALUE),
    )
}
