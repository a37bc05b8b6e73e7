use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::{Dress, Review};

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateDressRequest {
    pub name: String,
    pub description: Option<String>,
    pub size: String,
    pub price: i64,
    pub stock: i32,
    pub collection_id: Option<Uuid>,
    /// Admin only; designers list dresses under their own profile.
    pub designer_id: Option<Uuid>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateDressRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub size: Option<String>,
    pub price: Option<i64>,
    pub stock: Option<i32>,
    pub collection_id: Option<Uuid>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DressList {
    pub items: Vec<Dress>,
}

/// One page of the dress listing together with the unpaged total.
#[derive(Debug, Clone)]
pub struct DressPage {
    pub items: Vec<Dress>,
    pub total: i64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DressReviews {
    pub dress_id: Uuid,
    pub average_rating: Option<f64>,
    pub items: Vec<Review>,
}
