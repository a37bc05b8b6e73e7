use bridal_api::{
    response::Meta,
    routes::params::{DressQuery, LowStockQuery, MAX_PAGE_SIZE, Pagination},
};

#[test]
fn pagination_defaults_and_clamps() {
    assert_eq!(Pagination::default().normalize(), (1, 10, 0));
    assert_eq!(Pagination::new(3, 20).normalize(), (3, 20, 40));
    assert_eq!(Pagination::new(0, 0).normalize(), (1, 1, 0));
    assert_eq!(
        Pagination::new(2, 1_000).normalize(),
        (2, MAX_PAGE_SIZE, MAX_PAGE_SIZE)
    );
}

#[test]
fn pagination_accepts_page_size_alias_and_string_numbers() {
    let parsed: Pagination =
        serde_json::from_value(serde_json::json!({ "page": "2", "page_size": "5" })).unwrap();
    assert_eq!(parsed.normalize(), (2, 5, 5));

    let parsed: Pagination =
        serde_json::from_value(serde_json::json!({ "page": 4, "per_page": 25 })).unwrap();
    assert_eq!(parsed.normalize(), (4, 25, 75));
}

#[test]
fn blank_numbers_are_treated_as_missing() {
    let parsed: LowStockQuery =
        serde_json::from_value(serde_json::json!({ "threshold": " " })).unwrap();
    assert_eq!(parsed.threshold, None);
}

#[test]
fn garbage_numbers_are_rejected() {
    let parsed = serde_json::from_value::<Pagination>(serde_json::json!({ "page": "two" }));
    assert!(parsed.is_err());
}

#[test]
fn dress_cache_key_tracks_filters() {
    let plain: DressQuery = serde_json::from_value(serde_json::json!({})).unwrap();
    let filtered: DressQuery = serde_json::from_value(serde_json::json!({
        "q": "lace",
        "min_price": "1000",
        "in_stock": "true",
        "sort_by": "price",
        "sort_order": "asc"
    }))
    .unwrap();

    assert_eq!(filtered.min_price, Some(1000));
    assert_eq!(filtered.in_stock, Some(true));
    assert_ne!(plain.cache_key(), filtered.cache_key());
    assert!(filtered.cache_key().contains(r#""price","ASC""#));
    assert!(plain.cache_key().contains(r#""created_at","DESC""#));
}

#[test]
fn dress_cache_key_cannot_be_forged_through_text_filters() {
    let smuggled: DressQuery = serde_json::from_value(serde_json::json!({
        "q": "lace:designer=:collection=:size=X"
    }))
    .unwrap();
    let split: DressQuery = serde_json::from_value(serde_json::json!({
        "q": "lace",
        "size": "X:designer=:collection=:size="
    }))
    .unwrap();
    assert_ne!(smuggled.cache_key(), split.cache_key());

    let quoted: DressQuery =
        serde_json::from_value(serde_json::json!({ "q": "a\",\"b" })).unwrap();
    let pair: DressQuery =
        serde_json::from_value(serde_json::json!({ "q": "a", "size": "b" })).unwrap();
    assert_ne!(quoted.cache_key(), pair.cache_key());
}

#[test]
fn huge_page_numbers_do_not_overflow_the_offset() {
    let (page, per_page, offset) = Pagination::new(i64::MAX, 100).normalize();
    assert_eq!(page, i64::MAX);
    assert_eq!(per_page, 100);
    assert!(offset >= 0);
    assert_eq!(offset, i64::MAX);

    let parsed: Pagination =
        serde_json::from_value(serde_json::json!({ "page": "9223372036854775807" })).unwrap();
    let (_, _, offset) = parsed.normalize();
    assert!(offset > 0);
}

#[test]
fn meta_rounds_total_pages_up() {
    let meta = Meta::new(1, 10, 21);
    assert_eq!(meta.total_pages, Some(3));
    assert_eq!(meta.has_next, Some(true));
    assert_eq!(meta.has_previous, Some(false));

    let last = Meta::new(3, 10, 21);
    assert_eq!(last.has_next, Some(false));
    assert_eq!(last.has_previous, Some(true));

    let empty = Meta::new(1, 10, 0);
    assert_eq!(empty.total_pages, Some(0));
}
