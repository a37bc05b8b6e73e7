use sea_orm::{
    ActiveModelTrait, ActiveValue::NotSet, ColumnTrait, Condition, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set,
};
use uuid::Uuid;

use crate::{
    audit,
    db_access::logged,
    dto::{
        dresses::DressReviews,
        reviews::{CreateReviewRequest, ReviewList, UpdateReviewRequest},
    },
    entity::reviews::{ActiveModel, Column, Entity as Reviews, Model as ReviewModel},
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_owner_or_admin},
    models::Review,
    response::{ApiResponse, Meta},
    routes::params::{Pagination, ReviewQuery},
    services::dress_service::find_dress,
    state::AppState,
};

pub const DEFAULT_RATING: i32 = 5;
const DUPLICATE_REVIEW: &str = "You have already reviewed this dress";

const AVERAGE_RATING: &str = "SELECT AVG(rating)::float8 FROM reviews WHERE dress_id = $1";

pub async fn list_reviews(
    state: &AppState,
    query: ReviewQuery,
) -> AppResult<ApiResponse<ReviewList>> {
    let mut condition = Condition::all();
    if let Some(dress) = query.dress {
        condition = condition.add(Column::DressId.eq(dress));
    }
    if let Some(user) = query.user {
        condition = condition.add(Column::UserId.eq(user));
    }
    let (items, meta) = page_reviews(state, condition, &query.pagination).await?;
    Ok(ApiResponse::success("Reviews", ReviewList { items }, Some(meta)))
}

/// Reviews of one dress with their mean rating (`None` when unrated).
pub async fn dress_reviews(
    state: &AppState,
    dress_id: Uuid,
    pagination: Pagination,
) -> AppResult<ApiResponse<DressReviews>> {
    find_dress(state, dress_id).await?;

    let (items, meta) = page_reviews(
        state,
        Condition::all().add(Column::DressId.eq(dress_id)),
        &pagination,
    )
    .await?;

    let (average_rating,): (Option<f64>,) = logged(
        "dress_average_rating",
        AVERAGE_RATING,
        sqlx::query_as(AVERAGE_RATING)
            .bind(dress_id)
            .fetch_one(&state.pool),
    )
    .await?;

    Ok(ApiResponse::success(
        "Reviews",
        DressReviews {
            dress_id,
            average_rating,
            items,
        },
        Some(meta),
    ))
}

pub async fn create_review(
    state: &AppState,
    user: &AuthUser,
    payload: CreateReviewRequest,
) -> AppResult<ApiResponse<Review>> {
    let rating = payload.rating.unwrap_or(DEFAULT_RATING);
    validate_rating(rating)?;

    find_dress(state, payload.dress_id)
        .await
        .map_err(|err| match err {
            AppError::NotFound => AppError::BadRequest("Dress not found".into()),
            other => other,
        })?;

    let duplicate = Reviews::find()
        .filter(Column::UserId.eq(user.user_id))
        .filter(Column::DressId.eq(payload.dress_id))
        .one(&state.orm)
        .await?;
    if duplicate.is_some() {
        return Err(AppError::BadRequest(DUPLICATE_REVIEW.into()));
    }

    let review = ActiveModel {
        id: Set(Uuid::new_v4()),
        user_id: Set(user.user_id),
        dress_id: Set(payload.dress_id),
        rating: Set(rating),
        comment: Set(payload.comment),
        created_at: NotSet,
    }
    .insert(&state.orm)
    .await
    .map_err(|err| AppError::from(err).unique_as_bad_request(DUPLICATE_REVIEW))?;

    audit::record(
        &state.pool,
        Some(user.user_id),
        "review_create",
        "reviews",
        serde_json::json!({ "review_id": review.id, "dress_id": review.dress_id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Review created",
        Review::from(review),
        Some(Meta::empty()),
    ))
}

pub async fn update_review(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateReviewRequest,
) -> AppResult<ApiResponse<Review>> {
    let existing = find_review(state, id).await?;
    ensure_owner_or_admin(user, existing.user_id)?;

    let mut active: ActiveModel = existing.into();
    if let Some(rating) = payload.rating {
        validate_rating(rating)?;
        active.rating = Set(rating);
    }
    if let Some(comment) = payload.comment {
        active.comment = Set(Some(comment));
    }
    let review = active.update(&state.orm).await?;

    Ok(ApiResponse::success(
        "Updated",
        Review::from(review),
        Some(Meta::empty()),
    ))
}

pub async fn delete_review(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    let existing = find_review(state, id).await?;
    ensure_owner_or_admin(user, existing.user_id)?;

    Reviews::delete_by_id(id).exec(&state.orm).await?;

    audit::record(
        &state.pool,
        Some(user.user_id),
        "review_delete",
        "reviews",
        serde_json::json!({ "review_id": id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Deleted",
        serde_json::json!({}),
        Some(Meta::empty()),
    ))
}

pub fn validate_rating(rating: i32) -> AppResult<()> {
    if !(1..=5).contains(&rating) {
        return Err(AppError::BadRequest(
            "rating must be between 1 and 5".into(),
        ));
    }
    Ok(())
}

async fn find_review(state: &AppState, id: Uuid) -> AppResult<ReviewModel> {
    Reviews::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)
}

async fn page_reviews(
    state: &AppState,
    condition: Condition,
    pagination: &Pagination,
) -> AppResult<(Vec<Review>, Meta)> {
    let (page, limit, offset) = pagination.normalize();
    let finder = Reviews::find()
        .filter(condition)
        .order_by_desc(Column::CreatedAt);
    let total = finder.clone().count(&state.orm).await? as i64;

    let items = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(Review::from)
        .collect();

    Ok((items, Meta::new(page, limit, total)))
}
