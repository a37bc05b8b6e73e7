mod common;

use bridal_api::{
    dto::{
        appointments::{CreateAppointmentRequest, UpdateAppointmentRequest},
        dresses::CreateDressRequest,
        reviews::CreateReviewRequest,
    },
    error::AppError,
    models::Role,
    routes::params::{AppointmentQuery, Pagination},
    services::{appointment_service, designer_service, dress_service, review_service},
};
use chrono::{Duration, Utc};

// Reviews average per dress, and appointments are visible to both parties only.
#[tokio::test]
async fn reviews_and_appointments_flow() -> anyhow::Result<()> {
    let Some(database_url) = common::database_url() else {
        return Ok(());
    };
    let state = common::setup_state(&database_url).await?;

    let designer = common::register(&state, "hana", Role::Designer).await?;
    let maya = common::register(&state, "maya", Role::Customer).await?;
    let noah = common::register(&state, "noah", Role::Customer).await?;

    // Registering as a designer creates the profile.
    let profiles = designer_service::list_designers(&state, Default::default())
        .await?
        .data
        .expect("designers");
    assert_eq!(profiles.items.len(), 1);
    let profile = &profiles.items[0];
    assert_eq!(profile.user_id, designer.user_id);

    let dress = dress_service::create_dress(
        &state,
        &designer,
        CreateDressRequest {
            name: "Celeste Ball Gown".into(),
            description: Some("Tulle skirt".into()),
            size: "L".into(),
            price: 590_000,
            stock: 2,
            collection_id: None,
            designer_id: None,
        },
    )
    .await?
    .data
    .expect("dress");

    let unrated = review_service::dress_reviews(&state, dress.id, Pagination::default())
        .await?
        .data
        .expect("reviews");
    assert_eq!(unrated.average_rating, None);

    review_service::create_review(
        &state,
        &maya,
        CreateReviewRequest {
            dress_id: dress.id,
            rating: Some(4),
            comment: Some("Lovely fit".into()),
        },
    )
    .await?;
    let defaulted = review_service::create_review(
        &state,
        &noah,
        CreateReviewRequest {
            dress_id: dress.id,
            rating: None,
            comment: None,
        },
    )
    .await?
    .data
    .expect("review");
    assert_eq!(defaulted.rating, 5);

    let duplicate = review_service::create_review(
        &state,
        &maya,
        CreateReviewRequest {
            dress_id: dress.id,
            rating: Some(1),
            comment: None,
        },
    )
    .await;
    assert!(matches!(duplicate, Err(AppError::BadRequest(_))));

    let out_of_range = review_service::create_review(
        &state,
        &designer,
        CreateReviewRequest {
            dress_id: dress.id,
            rating: Some(9),
            comment: None,
        },
    )
    .await;
    assert!(matches!(out_of_range, Err(AppError::BadRequest(_))));

    let rated = review_service::dress_reviews(&state, dress.id, Pagination::default())
        .await?
        .data
        .expect("reviews");
    assert_eq!(rated.items.len(), 2);
    assert_eq!(rated.average_rating, Some(4.5));

    // Others cannot delete a review.
    let maya_review = rated
        .items
        .iter()
        .find(|r| r.user_id == maya.user_id)
        .expect("maya review");
    let foreign = review_service::delete_review(&state, &noah, maya_review.id).await;
    assert!(matches!(foreign, Err(AppError::Forbidden)));

    let past = appointment_service::create_appointment(
        &state,
        &maya,
        CreateAppointmentRequest {
            designer_id: profile.id,
            scheduled_at: Utc::now() - Duration::days(1),
            notes: None,
        },
    )
    .await;
    assert!(matches!(past, Err(AppError::BadRequest(_))));

    let booked = appointment_service::create_appointment(
        &state,
        &maya,
        CreateAppointmentRequest {
            designer_id: profile.id,
            scheduled_at: Utc::now() + Duration::days(3),
            notes: Some("First fitting".into()),
        },
    )
    .await?
    .data
    .expect("appointment");
    assert_eq!(booked.status, "scheduled");

    let seen_by_designer = appointment_service::list_appointments(
        &state,
        &designer,
        AppointmentQuery::default(),
    )
    .await?
    .data
    .expect("appointments");
    assert_eq!(seen_by_designer.items.len(), 1);

    let seen_by_noah =
        appointment_service::list_appointments(&state, &noah, AppointmentQuery::default())
            .await?
            .data
            .expect("appointments");
    assert!(seen_by_noah.items.is_empty());

    let snooping = appointment_service::get_appointment(&state, &noah, booked.id).await;
    assert!(matches!(snooping, Err(AppError::Forbidden)));

    let moved = appointment_service::update_appointment(
        &state,
        &maya,
        booked.id,
        UpdateAppointmentRequest {
            scheduled_at: Some(Utc::now() + Duration::days(5)),
            notes: None,
            status: None,
        },
    )
    .await?
    .data
    .expect("appointment");
    assert_eq!(moved.notes.as_deref(), Some("First fitting"));

    let cancelled = appointment_service::cancel_appointment(&state, &designer, booked.id)
        .await?
        .data
        .expect("appointment");
    assert_eq!(cancelled.status, "cancelled");

    Ok(())
}
