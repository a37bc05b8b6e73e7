use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::Designer;

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateDesignerRequest {
    /// Required for admins; designers always create their own profile.
    pub user_id: Option<Uuid>,
    pub name: Option<String>,
    pub bio: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateDesignerRequest {
    pub name: Option<String>,
    pub bio: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DesignerList {
    pub items: Vec<Designer>,
}
