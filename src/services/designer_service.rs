use sea_orm::{
    ActiveModelTrait, ActiveValue::NotSet, ColumnTrait, Condition, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set,
};
use sea_orm::sea_query::{Expr, extension::postgres::PgExpr};
use uuid::Uuid;

use crate::{
    audit,
    dto::designers::{CreateDesignerRequest, DesignerList, UpdateDesignerRequest},
    entity::{
        designers::{ActiveModel, Column, Entity as Designers, Model as DesignerModel},
        users::Entity as Users,
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin, ensure_owner_or_admin},
    models::{Designer, Role},
    response::{ApiResponse, Meta},
    routes::params::NameQuery,
    state::AppState,
};

const DUPLICATE_PROFILE: &str = "Designer profile already exists for this user";

pub async fn list_designers(
    state: &AppState,
    query: NameQuery,
) -> AppResult<ApiResponse<DesignerList>> {
    let (page, limit, offset) = query.pagination.normalize();
    let mut condition = Condition::all();
    if let Some(name) = query.name.as_ref().filter(|s| !s.is_empty()) {
        condition = condition.add(Expr::col(Column::Name).ilike(format!("%{}%", name)));
    }

    let finder = Designers::find()
        .filter(condition)
        .order_by_asc(Column::Name)
        .order_by_asc(Column::CreatedAt);
    let total = finder.clone().count(&state.orm).await? as i64;

    let items = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(Designer::from)
        .collect();

    Ok(ApiResponse::success(
        "Designers",
        DesignerList { items },
        Some(Meta::new(page, limit, total)),
    ))
}

pub async fn get_designer(state: &AppState, id: Uuid) -> AppResult<ApiResponse<Designer>> {
    let designer = find_designer(state, id).await?;
    Ok(ApiResponse::success("Designer", Designer::from(designer), None))
}

pub async fn create_designer(
    state: &AppState,
    user: &AuthUser,
    payload: CreateDesignerRequest,
) -> AppResult<ApiResponse<Designer>> {
    let owner_id = match user.role {
        Role::Admin => payload
            .user_id
            .ok_or_else(|| AppError::BadRequest("user_id is required".into()))?,
        Role::Designer => user.user_id,
        Role::Customer => return Err(AppError::Forbidden),
    };

    let owner = Users::find_by_id(owner_id)
        .one(&state.orm)
        .await?
        .ok_or_else(|| AppError::BadRequest("User not found".into()))?;
    if owner.role != Role::Designer.as_str() {
        return Err(AppError::BadRequest(
            "Designer profiles can only belong to designer accounts".into(),
        ));
    }

    let existing = Designers::find()
        .filter(Column::UserId.eq(owner_id))
        .one(&state.orm)
        .await?;
    if existing.is_some() {
        return Err(AppError::BadRequest(DUPLICATE_PROFILE.into()));
    }

    let designer = ActiveModel {
        id: Set(Uuid::new_v4()),
        user_id: Set(owner_id),
        name: Set(payload.name.or(Some(owner.username))),
        bio: Set(payload.bio),
        phone: Set(payload.phone.or(owner.phone)),
        email: Set(payload.email.or(Some(owner.email))),
        created_at: NotSet,
    }
    .insert(&state.orm)
    .await
    .map_err(|err| AppError::from(err).unique_as_bad_request(DUPLICATE_PROFILE))?;

    audit::record(
        &state.pool,
        Some(user.user_id),
        "designer_create",
        "designers",
        serde_json::json!({ "designer_id": designer.id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Designer created",
        Designer::from(designer),
        Some(Meta::empty()),
    ))
}

pub async fn update_designer(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateDesignerRequest,
) -> AppResult<ApiResponse<Designer>> {
    let existing = find_designer(state, id).await?;
    ensure_owner_or_admin(user, existing.user_id)?;

    let mut active: ActiveModel = existing.into();
    if let Some(name) = payload.name {
        active.name = Set(Some(name));
    }
    if let Some(bio) = payload.bio {
        active.bio = Set(Some(bio));
    }
    if let Some(phone) = payload.phone {
        active.phone = Set(Some(phone));
    }
    if let Some(email) = payload.email {
        active.email = Set(Some(email));
    }
    let designer = active.update(&state.orm).await?;

    audit::record(
        &state.pool,
        Some(user.user_id),
        "designer_update",
        "designers",
        serde_json::json!({ "designer_id": designer.id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Updated",
        Designer::from(designer),
        Some(Meta::empty()),
    ))
}

pub async fn delete_designer(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    ensure_admin(user)?;
    let result = Designers::delete_by_id(id)
        .exec(&state.orm)
        .await
        .map_err(|err| {
            AppError::from(err).foreign_key_as_bad_request(
                "Designer has ordered dresses and cannot be deleted",
            )
        })?;
    if result.rows_affected == 0 {
        return Err(AppError::NotFound);
    }
    // Cascades remove the designer's dresses.
    state.dress_cache.invalidate_all();

    audit::record(
        &state.pool,
        Some(user.user_id),
        "designer_delete",
        "designers",
        serde_json::json!({ "designer_id": id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Deleted",
        serde_json::json!({}),
        Some(Meta::empty()),
    ))
}

pub(crate) async fn find_designer(state: &AppState, id: Uuid) -> AppResult<DesignerModel> {
    Designers::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)
}

/// The designer profile owned by the calling account, if any.
pub(crate) async fn own_profile(state: &AppState, user: &AuthUser) -> AppResult<DesignerModel> {
    Designers::find()
        .filter(Column::UserId.eq(user.user_id))
        .one(&state.orm)
        .await?
        .ok_or_else(|| AppError::BadRequest("No designer profile for this account".into()))
}

/// Resolves which designer a catalog write acts for: admins name one
/// explicitly, designers always act for their own profile.
pub(crate) async fn acting_designer(
    state: &AppState,
    user: &AuthUser,
    requested: Option<Uuid>,
) -> AppResult<DesignerModel> {
    match user.role {
        Role::Admin => {
            let id = requested
                .ok_or_else(|| AppError::BadRequest("designer_id is required".into()))?;
            Designers::find_by_id(id)
                .one(&state.orm)
                .await?
                .ok_or_else(|| AppError::BadRequest("Designer not found".into()))
        }
        Role::Designer => own_profile(state, user).await,
        Role::Customer => Err(AppError::Forbidden),
    }
}

/// Admins may touch any catalog entry; designers only their own.
pub(crate) async fn ensure_catalog_owner(
    state: &AppState,
    user: &AuthUser,
    designer_id: Uuid,
) -> AppResult<()> {
    if user.is_admin() {
        return Ok(());
    }
    if !user.is_designer() {
        return Err(AppError::Forbidden);
    }
    let profile = own_profile(state, user).await?;
    if profile.id != designer_id {
        return Err(AppError::Forbidden);
    }
    Ok(())
}
