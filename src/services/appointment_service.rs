use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ActiveValue::NotSet, ColumnTrait, Condition, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set,
};
use uuid::Uuid;

use crate::{
    audit,
    dto::appointments::{AppointmentList, CreateAppointmentRequest, UpdateAppointmentRequest},
    entity::{
        appointments::{ActiveModel, Column, Entity as Appointments, Model as AppointmentModel},
        designers::{Column as DesignerCol, Entity as Designers},
    },
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::{Appointment, AppointmentStatus, Role},
    response::{ApiResponse, Meta},
    routes::params::AppointmentQuery,
    state::AppState,
};

pub async fn list_appointments(
    state: &AppState,
    user: &AuthUser,
    query: AppointmentQuery,
) -> AppResult<ApiResponse<AppointmentList>> {
    let (page, limit, offset) = query.pagination.normalize();

    let mut condition = Condition::all();
    match user.role {
        Role::Admin => {}
        Role::Customer => condition = condition.add(Column::UserId.eq(user.user_id)),
        Role::Designer => {
            let mut visible = Condition::any().add(Column::UserId.eq(user.user_id));
            if let Some(profile_id) = designer_profile_id(state, user.user_id).await? {
                visible = visible.add(Column::DesignerId.eq(profile_id));
            }
            condition = condition.add(visible);
        }
    }
    if let Some(status) = query.status {
        condition = condition.add(Column::Status.eq(status.as_str()));
    }

    let finder = Appointments::find()
        .filter(condition)
        .order_by_asc(Column::ScheduledAt);
    let total = finder.clone().count(&state.orm).await? as i64;

    let items = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(Appointment::from)
        .collect();

    Ok(ApiResponse::success(
        "Appointments",
        AppointmentList { items },
        Some(Meta::new(page, limit, total)),
    ))
}

pub async fn create_appointment(
    state: &AppState,
    user: &AuthUser,
    payload: CreateAppointmentRequest,
) -> AppResult<ApiResponse<Appointment>> {
    ensure_future(payload.scheduled_at)?;

    let designer = Designers::find_by_id(payload.designer_id)
        .one(&state.orm)
        .await?
        .ok_or_else(|| AppError::BadRequest("Designer not found".into()))?;

    let appointment = ActiveModel {
        id: Set(Uuid::new_v4()),
        user_id: Set(user.user_id),
        designer_id: Set(designer.id),
        scheduled_at: Set(payload.scheduled_at.into()),
        notes: Set(payload.notes),
        status: Set(AppointmentStatus::Scheduled.as_str().into()),
        created_at: NotSet,
    }
    .insert(&state.orm)
    .await?;

    audit::record(
        &state.pool,
        Some(user.user_id),
        "appointment_create",
        "appointments",
        serde_json::json!({
            "appointment_id": appointment.id,
            "designer_id": appointment.designer_id,
        }),
    )
    .await;

    Ok(ApiResponse::success(
        "Appointment booked",
        Appointment::from(appointment),
        Some(Meta::empty()),
    ))
}

pub async fn get_appointment(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<Appointment>> {
    let appointment = find_visible(state, user, id).await?;
    Ok(ApiResponse::success(
        "Appointment",
        Appointment::from(appointment),
        None,
    ))
}

pub async fn update_appointment(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateAppointmentRequest,
) -> AppResult<ApiResponse<Appointment>> {
    let existing = find_visible(state, user, id).await?;

    let mut active: ActiveModel = existing.into();
    if let Some(scheduled_at) = payload.scheduled_at {
        ensure_future(scheduled_at)?;
        active.scheduled_at = Set(scheduled_at.into());
    }
    if let Some(notes) = payload.notes {
        active.notes = Set(Some(notes));
    }
    if let Some(status) = payload.status {
        active.status = Set(status.as_str().into());
    }
    let appointment = active.update(&state.orm).await?;

    audit::record(
        &state.pool,
        Some(user.user_id),
        "appointment_update",
        "appointments",
        serde_json::json!({ "appointment_id": appointment.id, "status": appointment.status }),
    )
    .await;

    Ok(ApiResponse::success(
        "Updated",
        Appointment::from(appointment),
        Some(Meta::empty()),
    ))
}

/// Appointments are never removed, deleting one cancels it.
pub async fn cancel_appointment(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<Appointment>> {
    let existing = find_visible(state, user, id).await?;
    if existing.status == AppointmentStatus::Completed.as_str() {
        return Err(AppError::BadRequest(
            "Completed appointments cannot be cancelled".into(),
        ));
    }

    let mut active: ActiveModel = existing.into();
    active.status = Set(AppointmentStatus::Cancelled.as_str().into());
    let appointment = active.update(&state.orm).await?;

    audit::record(
        &state.pool,
        Some(user.user_id),
        "appointment_cancel",
        "appointments",
        serde_json::json!({ "appointment_id": appointment.id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Appointment cancelled",
        Appointment::from(appointment),
        Some(Meta::empty()),
    ))
}

pub fn ensure_future(scheduled_at: DateTime<Utc>) -> AppResult<()> {
    if scheduled_at <= Utc::now() {
        return Err(AppError::BadRequest(
            "Appointment must be scheduled in the future".into(),
        ));
    }
    Ok(())
}

/// Loads an appointment the caller may see: the customer who booked it,
/// the designer it is booked with, or an admin.
async fn find_visible(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<AppointmentModel> {
    let appointment = Appointments::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    if user.is_admin() || appointment.user_id == user.user_id {
        return Ok(appointment);
    }
    if user.is_designer()
        && designer_profile_id(state, user.user_id).await? == Some(appointment.designer_id)
    {
        return Ok(appointment);
    }
    Err(AppError::Forbidden)
}

async fn designer_profile_id(state: &AppState, user_id: Uuid) -> AppResult<Option<Uuid>> {
    let profile = Designers::find()
        .filter(DesignerCol::UserId.eq(user_id))
        .one(&state.orm)
        .await?;
    Ok(profile.map(|p| p.id))
}
