use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::{Order, Payment, PaymentMethod};

#[derive(Debug, Deserialize, ToSchema)]
pub struct InitiatePaymentRequest {
    pub order_id: Uuid,
    pub method: PaymentMethod,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PaymentWithOrder {
    pub payment: Payment,
    pub order: Order,
}
