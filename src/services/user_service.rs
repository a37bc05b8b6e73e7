use sea_orm::{
    ActiveModelTrait, ActiveValue::NotSet, ColumnTrait, Condition, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set,
};
use sea_orm::sea_query::{Expr, extension::postgres::PgExpr};
use uuid::Uuid;

use crate::{
    audit,
    db_access::transactional,
    dto::users::{UpdateUserRequest, UserList},
    entity::{
        designers::{ActiveModel as DesignerActive, Column as DesignerCol, Entity as Designers},
        users::{ActiveModel, Column, Entity as Users, Model as UserModel},
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin, ensure_owner_or_admin},
    models::{Role, User},
    response::{ApiResponse, Meta},
    routes::params::UserQuery,
    state::AppState,
};

pub async fn list_users(
    state: &AppState,
    user: &AuthUser,
    query: UserQuery,
) -> AppResult<ApiResponse<UserList>> {
    ensure_admin(user)?;
    let (page, limit, offset) = query.pagination.normalize();

    let mut condition = Condition::all();
    if let Some(search) = query.q.as_ref().filter(|s| !s.is_empty()) {
        let pattern = format!("%{}%", search);
        condition = condition.add(
            Condition::any()
                .add(Expr::col(Column::Username).ilike(pattern.clone()))
                .add(Expr::col(Column::Email).ilike(pattern)),
        );
    }
    if let Some(role) = query.role {
        condition = condition.add(Column::Role.eq(role.as_str()));
    }

    let finder = Users::find()
        .filter(condition)
        .order_by_desc(Column::CreatedAt);
    let total = finder.clone().count(&state.orm).await? as i64;

    let items = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(User::from)
        .collect();

    Ok(ApiResponse::success(
        "Users",
        UserList { items },
        Some(Meta::new(page, limit, total)),
    ))
}

pub async fn me(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<User>> {
    let model = find_user(state, user.user_id).await?;
    Ok(ApiResponse::success("Me", User::from(model), None))
}

pub async fn get_user(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<User>> {
    ensure_owner_or_admin(user, id)?;
    let model = find_user(state, id).await?;
    Ok(ApiResponse::success("User", User::from(model), None))
}

/// Updates contact details. Only admins may change a role; promoting an
/// account to designer also gives it a designer profile.
pub async fn update_user(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateUserRequest,
) -> AppResult<ApiResponse<User>> {
    ensure_owner_or_admin(user, id)?;
    if payload.role.is_some() && !user.is_admin() {
        return Err(AppError::Forbidden);
    }

    let existing = find_user(state, id).await?;

    let email = match payload.email {
        Some(email) => {
            let email = email.trim().to_lowercase();
            let valid = email
                .split_once('@')
                .is_some_and(|(local, domain)| !local.is_empty() && domain.contains('.'));
            if !valid {
                return Err(AppError::BadRequest("Enter a valid email address".into()));
            }
            let taken = Users::find()
                .filter(Column::Email.eq(email.clone()))
                .filter(Column::Id.ne(id))
                .one(&state.orm)
                .await?;
            if taken.is_some() {
                return Err(AppError::BadRequest("Email is already taken".into()));
            }
            Some(email)
        }
        None => None,
    };

    let phone = payload.phone;
    let address = payload.address;
    let role = payload.role;

    let updated = transactional(&state.orm, "update_user", move |txn| {
        Box::pin(async move {
            let mut active: ActiveModel = existing.into();
            if let Some(email) = email {
                active.email = Set(email);
            }
            if let Some(phone) = phone {
                active.phone = Set(Some(phone));
            }
            if let Some(address) = address {
                active.address = Set(Some(address));
            }
            if let Some(role) = role {
                active.role = Set(role.as_str().to_string());
            }
            let updated = active.update(txn).await?;

            if role == Some(Role::Designer) {
                let profile = Designers::find()
                    .filter(DesignerCol::UserId.eq(updated.id))
                    .one(txn)
                    .await?;
                if profile.is_none() {
                    DesignerActive {
                        id: Set(Uuid::new_v4()),
                        user_id: Set(updated.id),
                        name: Set(Some(updated.username.clone())),
                        bio: Set(None),
                        phone: Set(updated.phone.clone()),
                        email: Set(Some(updated.email.clone())),
                        created_at: NotSet,
                    }
                    .insert(txn)
                    .await?;
                }
            }

            Ok::<_, AppError>(updated)
        })
    })
    .await?;

    audit::record(
        &state.pool,
        Some(user.user_id),
        "user_update",
        "users",
        serde_json::json!({ "user_id": updated.id, "role": updated.role }),
    )
    .await;

    Ok(ApiResponse::success(
        "Updated",
        User::from(updated),
        Some(Meta::empty()),
    ))
}

pub async fn delete_user(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    ensure_admin(user)?;
    if id == user.user_id {
        return Err(AppError::BadRequest("Admins cannot delete themselves".into()));
    }

    let result = Users::delete_by_id(id)
        .exec(&state.orm)
        .await
        .map_err(|err| {
            AppError::from(err).foreign_key_as_bad_request(
                "User owns ordered dresses and cannot be deleted",
            )
        })?;
    if result.rows_affected == 0 {
        return Err(AppError::NotFound);
    }
    // A deleted designer takes their dresses along.
    state.dress_cache.invalidate_all();

    audit::record(
        &state.pool,
        Some(user.user_id),
        "user_delete",
        "users",
        serde_json::json!({ "user_id": id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Deleted",
        serde_json::json!({}),
        Some(Meta::empty()),
    ))
}

async fn find_user(state: &AppState, id: Uuid) -> AppResult<UserModel> {
    Users::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)
}
