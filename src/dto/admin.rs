use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::{AuditLog, Dress};

#[derive(Debug, Deserialize, ToSchema)]
pub struct InventoryAdjustRequest {
    pub delta: i32,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LowStockList {
    pub items: Vec<Dress>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AuditLogList {
    pub items: Vec<AuditLog>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DashboardStats {
    pub users: i64,
    pub designers: i64,
    pub dresses: i64,
    pub orders: i64,
    pub pending_orders: i64,
    pub revenue: i64,
}
