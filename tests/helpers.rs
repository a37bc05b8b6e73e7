use std::{
    net::{IpAddr, SocketAddr},
    sync::Arc,
    time::Duration,
};

use axum::{
    extract::ConnectInfo,
    http::{Extensions, HeaderMap, HeaderValue, StatusCode},
};
use bridal_api::{
    config::parse_ip_list,
    db::split_statements,
    error::AppError,
    middleware::{
        client_ip::client_ip,
        rate_limit::{ClientLimiter, prune_idle, replenish_interval},
    },
    payment_gateway::{VerifiedStatus, build_tx_ref, format_amount},
    services::{
        admin_service::adjusted_stock, appointment_service::ensure_future,
        cart_service::combined_quantity, dress_service::validate_dress,
        order_service::order_total, review_service::validate_rating,
    },
};
use chrono::Utc;
use governor::{Quota, RateLimiter};
use uuid::Uuid;

#[test]
fn migration_files_split_into_statements() {
    let sql = r#"
        -- users first
        CREATE TABLE a (id INT);

        CREATE INDEX a_idx ON a (id);
        -- trailing comment only
    "#;
    let statements = split_statements(sql);
    assert_eq!(
        statements,
        vec![
            "CREATE TABLE a (id INT);".to_string(),
            "CREATE INDEX a_idx ON a (id);".to_string(),
        ]
    );
}

#[test]
fn amounts_render_in_major_units() {
    assert_eq!(format_amount(123_450), "1234.50");
    assert_eq!(format_amount(5), "0.05");
    assert_eq!(format_amount(0), "0.00");
    assert_eq!(format_amount(-250), "-2.50");
}

#[test]
fn tx_refs_are_unique_per_attempt() {
    let order_id = Uuid::new_v4();
    let first = build_tx_ref(order_id);
    let second = build_tx_ref(order_id);

    let prefix = format!("bridal-{}-", &order_id.simple().to_string()[..8]);
    assert!(first.starts_with(&prefix));
    assert_ne!(first, second);
}

#[test]
fn gateway_statuses_map_to_outcomes() {
    assert_eq!(VerifiedStatus::from_gateway("SUCCESS"), VerifiedStatus::Success);
    assert_eq!(VerifiedStatus::from_gateway("pending"), VerifiedStatus::Pending);
    assert_eq!(VerifiedStatus::from_gateway("failed"), VerifiedStatus::Failed);
    assert_eq!(VerifiedStatus::from_gateway("reversed"), VerifiedStatus::Failed);
}

#[test]
fn banned_ip_list_skips_garbage() {
    let ips = parse_ip_list(" 10.0.0.1, ,nonsense,::1");
    assert_eq!(
        ips,
        vec![
            "10.0.0.1".parse::<IpAddr>().unwrap(),
            "::1".parse::<IpAddr>().unwrap(),
        ]
    );
    assert!(parse_ip_list("").is_empty());
}

#[test]
fn client_ip_prefers_forwarded_headers() {
    let mut extensions = Extensions::new();
    extensions.insert(ConnectInfo("192.168.1.9:4000".parse::<SocketAddr>().unwrap()));

    let mut headers = HeaderMap::new();
    assert_eq!(
        client_ip(&headers, &extensions),
        Some("192.168.1.9".parse().unwrap())
    );

    headers.insert("x-real-ip", HeaderValue::from_static("172.16.0.2"));
    assert_eq!(
        client_ip(&headers, &extensions),
        Some("172.16.0.2".parse().unwrap())
    );

    headers.insert(
        "x-forwarded-for",
        HeaderValue::from_static("203.0.113.7, 10.0.0.1"),
    );
    assert_eq!(
        client_ip(&headers, &extensions),
        Some("203.0.113.7".parse().unwrap())
    );
}

#[test]
fn client_ip_is_none_without_any_source() {
    assert_eq!(client_ip(&HeaderMap::new(), &Extensions::new()), None);
}

#[test]
fn rate_limit_spreads_requests_over_a_minute() {
    assert_eq!(replenish_interval(60), Duration::from_secs(1));
    assert_eq!(replenish_interval(120), Duration::from_millis(500));
    assert_eq!(replenish_interval(0), Duration::from_secs(60));
}

#[test]
fn ratings_must_be_one_to_five() {
    assert!(validate_rating(1).is_ok());
    assert!(validate_rating(5).is_ok());
    assert!(validate_rating(0).is_err());
    assert!(validate_rating(6).is_err());
}

#[test]
fn dresses_need_name_size_and_non_negative_numbers() {
    assert!(validate_dress("Aurora", "M", 1000, 0).is_ok());
    assert!(validate_dress("", "M", 1000, 1).is_err());
    assert!(validate_dress("Aurora", "", 1000, 1).is_err());
    assert!(validate_dress("Aurora", "M", -1, 1).is_err());
    assert!(validate_dress("Aurora", "M", 1000, -1).is_err());
}

#[test]
fn appointments_must_be_in_the_future() {
    assert!(ensure_future(Utc::now() + chrono::Duration::hours(1)).is_ok());
    assert!(ensure_future(Utc::now() - chrono::Duration::hours(1)).is_err());
}

#[test]
fn errors_map_to_status_codes() {
    assert_eq!(AppError::NotFound.status(), StatusCode::NOT_FOUND);
    assert_eq!(AppError::BadRequest("x".into()).status(), StatusCode::BAD_REQUEST);
    assert_eq!(AppError::Forbidden.status(), StatusCode::FORBIDDEN);
    assert_eq!(
        AppError::Unauthorized("x".into()).status(),
        StatusCode::UNAUTHORIZED
    );
    assert_eq!(AppError::Gateway("down".into()).status(), StatusCode::BAD_GATEWAY);
}

#[test]
fn cart_quantity_overflow_is_a_bad_request() {
    assert_eq!(combined_quantity(1, 2, 5).unwrap(), 3);

    let err = combined_quantity(1, i32::MAX, 5).unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));

    let err = combined_quantity(2, 4, 5).unwrap_err();
    assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    assert!(err.to_string().contains("Only 5 left in stock"));
}

#[test]
fn inventory_delta_is_checked() {
    assert_eq!(adjusted_stock(3, -3).unwrap(), 0);
    assert_eq!(adjusted_stock(3, 4).unwrap(), 7);
    assert!(matches!(adjusted_stock(3, -4), Err(AppError::BadRequest(_))));
    assert!(matches!(adjusted_stock(i32::MAX, 1), Err(AppError::BadRequest(_))));
    assert!(matches!(adjusted_stock(0, i32::MIN), Err(AppError::BadRequest(_))));
}

#[test]
fn order_totals_reject_overflow() {
    assert_eq!(order_total([(1_000, 2), (250, 4)]).unwrap(), 3_000);
    assert_eq!(order_total(Vec::new()).unwrap(), 0);
    assert!(matches!(
        order_total([(i64::MAX, 2)]),
        Err(AppError::BadRequest(_))
    ));
    assert!(matches!(
        order_total([(i64::MAX, 1), (1, 1)]),
        Err(AppError::BadRequest(_))
    ));
}

#[test]
fn idle_rate_limit_buckets_are_pruned() {
    let quota = Quota::with_period(Duration::from_millis(1)).unwrap();
    let limiter: ClientLimiter = RateLimiter::keyed(quota);
    for last in 1..=50u8 {
        let ip = IpAddr::from([10, 0, 0, last]);
        assert!(limiter.check_key(&ip).is_ok());
    }
    assert_eq!(limiter.len(), 50);

    std::thread::sleep(Duration::from_millis(20));
    assert_eq!(prune_idle(&limiter), 0);
}

#[test]
fn shared_errors_keep_their_status() {
    let sole = AppError::from(Arc::new(AppError::NotFound));
    assert!(matches!(sole, AppError::NotFound));

    let shared = Arc::new(AppError::BadRequest("bad filter".into()));
    let _waiter = shared.clone();
    let unwrapped = AppError::from(shared);
    assert!(matches!(unwrapped, AppError::BadRequest(msg) if msg == "bad filter"));

    let db = Arc::new(AppError::DbError(sqlx::Error::PoolTimedOut));
    let _waiter = db.clone();
    assert_eq!(AppError::from(db).status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[test]
fn constraint_mapping_leaves_other_errors_alone() {
    let untouched = AppError::NotFound.unique_as_bad_request("taken");
    assert!(matches!(untouched, AppError::NotFound));

    let pool = AppError::DbError(sqlx::Error::PoolTimedOut);
    assert!(!pool.is_unique_violation());
    assert!(!pool.is_foreign_key_violation());
    let pool = pool.foreign_key_as_bad_request("in use");
    assert_eq!(pool.status(), StatusCode::INTERNAL_SERVER_ERROR);
}
