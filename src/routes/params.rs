use std::{fmt, str::FromStr};

use serde::{Deserialize, Deserializer};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::{AppointmentStatus, Role};

pub const DEFAULT_PAGE_SIZE: i64 = 10;
pub const MAX_PAGE_SIZE: i64 = 100;

/// Query strings arrive as text once a struct is flattened, so numeric
/// parameters accept either a number or its string form.
fn opt_number<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr + Deserialize<'de>,
    T::Err: fmt::Display,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw<T> {
        Value(T),
        Text(String),
    }

    match Option::<Raw<T>>::deserialize(deserializer)? {
        None => Ok(None),
        Some(Raw::Value(v)) => Ok(Some(v)),
        Some(Raw::Text(s)) if s.trim().is_empty() => Ok(None),
        Some(Raw::Text(s)) => s.trim().parse().map(Some).map_err(serde::de::Error::custom),
    }
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct Pagination {
    #[serde(default, deserialize_with = "opt_number")]
    pub page: Option<i64>,
    #[serde(default, alias = "page_size", deserialize_with = "opt_number")]
    pub per_page: Option<i64>,
}

impl Pagination {
    pub fn new(page: i64, per_page: i64) -> Self {
        Self {
            page: Some(page),
            per_page: Some(per_page),
        }
    }

    /// Returns `(page, per_page, offset)` with page >= 1 and per_page in 1..=100.
    pub fn normalize(&self) -> (i64, i64, i64) {
        let page = self.page.unwrap_or(1).max(1);
        let per_page = self
            .per_page
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .clamp(1, MAX_PAGE_SIZE);
        let offset = (page - 1).saturating_mul(per_page);
        (page, per_page, offset)
    }
}

#[derive(Debug, Clone, Copy, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    pub fn as_sql(&self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum DressSortBy {
    CreatedAt,
    Price,
    Name,
    ViewCount,
}

impl DressSortBy {
    pub fn as_sql(&self) -> &'static str {
        match self {
            DressSortBy::CreatedAt => "created_at",
            DressSortBy::Price => "price",
            DressSortBy::Name => "name",
            DressSortBy::ViewCount => "view_count",
        }
    }
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct DressQuery {
    #[serde(flatten)]
    pub pagination: Pagination,
    pub q: Option<String>,
    pub designer: Option<Uuid>,
    pub collection: Option<Uuid>,
    pub size: Option<String>,
    #[serde(default, deserialize_with = "opt_number")]
    pub min_price: Option<i64>,
    #[serde(default, deserialize_with = "opt_number")]
    pub max_price: Option<i64>,
    #[serde(default, deserialize_with = "opt_number")]
    pub in_stock: Option<bool>,
    pub sort_by: Option<DressSortBy>,
    pub sort_order: Option<SortOrder>,
}

impl DressQuery {
    /// Stable cache key covering every parameter that shapes the result page.
    /// Values are JSON encoded so free text cannot forge another key.
    pub fn cache_key(&self) -> String {
        let (page, per_page, _) = self.pagination.normalize();
        let parts = serde_json::json!([
            page,
            per_page,
            self.q,
            self.designer,
            self.collection,
            self.size,
            self.min_price,
            self.max_price,
            self.in_stock,
            self.sort_by.unwrap_or(DressSortBy::CreatedAt).as_sql(),
            self.sort_order.unwrap_or(SortOrder::Desc).as_sql(),
        ]);
        format!("dresses:{parts}")
    }
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct OrderListQuery {
    #[serde(flatten)]
    pub pagination: Pagination,
    pub status: Option<String>,
    pub sort_order: Option<SortOrder>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct UserQuery {
    #[serde(flatten)]
    pub pagination: Pagination,
    pub q: Option<String>,
    pub role: Option<Role>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct NameQuery {
    #[serde(flatten)]
    pub pagination: Pagination,
    pub name: Option<String>,
    pub designer: Option<Uuid>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct ReviewQuery {
    #[serde(flatten)]
    pub pagination: Pagination,
    pub dress: Option<Uuid>,
    pub user: Option<Uuid>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct LowStockQuery {
    #[serde(flatten)]
    pub pagination: Pagination,
    #[serde(default, deserialize_with = "opt_number")]
    pub threshold: Option<i32>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct AppointmentQuery {
    #[serde(flatten)]
    pub pagination: Pagination,
    pub status: Option<AppointmentStatus>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct AuditLogQuery {
    #[serde(flatten)]
    pub pagination: Pagination,
    pub action: Option<String>,
}
