use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ActiveValue::NotSet, ColumnTrait, EntityTrait, QueryFilter, QuerySelect, Set,
};
use sea_orm::sea_query::LockType;
use uuid::Uuid;

use crate::{
    audit,
    db_access::{RetryPolicy, retry, transactional},
    dto::payments::{InitiatePaymentRequest, PaymentWithOrder},
    entity::{
        orders::{Entity as Orders, Model as OrderModel},
        payments::{ActiveModel as PaymentActive, Column as PaymentCol, Entity as Payments, Model as PaymentModel},
        users::Entity as Users,
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_owner_or_admin},
    models::{Order, OrderStatus, Payment, PaymentMethod, PaymentStatus},
    payment_gateway::{VerifiedStatus, build_tx_ref},
    response::{ApiResponse, Meta},
    services::order_service::{apply_status_change, find_order},
    state::AppState,
};

/// Starts payment of a pending order. Cash is recorded without contacting
/// the gateway; card and paypal get a hosted checkout link.
pub async fn initiate_payment(
    state: &AppState,
    user: &AuthUser,
    payload: InitiatePaymentRequest,
) -> AppResult<ApiResponse<PaymentWithOrder>> {
    if payload.method.uses_gateway() && !state.gateway.is_configured() {
        return Err(AppError::BadRequest(
            "Online payments are not configured".into(),
        ));
    }

    let order = find_order(state, payload.order_id).await?;
    if order.user_id != user.user_id {
        return Err(AppError::Forbidden);
    }
    if order.status != OrderStatus::Pending.as_str() {
        return Err(AppError::BadRequest(
            "Only pending orders can be paid".into(),
        ));
    }

    let existing = Payments::find()
        .filter(PaymentCol::OrderId.eq(order.id))
        .one(&state.orm)
        .await?;
    if let Some(payment) = &existing {
        if payment.status == PaymentStatus::Completed.as_str() {
            return Err(AppError::BadRequest("Order already paid".into()));
        }
        if payment.status == PaymentStatus::Pending.as_str() {
            return Ok(ApiResponse::success(
                "Payment already initiated",
                PaymentWithOrder {
                    payment: Payment::from(payment.clone()),
                    order: Order::from(order),
                },
                Some(Meta::empty()),
            ));
        }
    }

    let tx_ref = build_tx_ref(order.id);
    let checkout_url = if payload.method.uses_gateway() {
        let customer = Users::find_by_id(order.user_id)
            .one(&state.orm)
            .await?
            .ok_or(AppError::NotFound)?;
        let url = retry(&RetryPolicy::default(), "gateway_initialize", || {
            state.gateway.initialize(
                order.total_amount,
                &customer.email,
                &customer.username,
                &tx_ref,
            )
        })
        .await?;
        Some(url)
    } else {
        None
    };

    // A failed attempt is reused so the order keeps a single payment row.
    let payment = match existing {
        Some(failed) => {
            let mut active: PaymentActive = failed.into();
            active.method = Set(payload.method.as_str().into());
            active.amount = Set(order.total_amount);
            active.status = Set(PaymentStatus::Pending.as_str().into());
            active.tx_ref = Set(tx_ref);
            active.checkout_url = Set(checkout_url);
            active.paid_at = Set(None);
            active.update(&state.orm).await?
        }
        None => {
            PaymentActive {
                id: Set(Uuid::new_v4()),
                order_id: Set(order.id),
                method: Set(payload.method.as_str().into()),
                amount: Set(order.total_amount),
                status: Set(PaymentStatus::Pending.as_str().into()),
                tx_ref: Set(tx_ref),
                checkout_url: Set(checkout_url),
                paid_at: Set(None),
                created_at: NotSet,
            }
            .insert(&state.orm)
            .await?
        }
    };

    audit::record(
        &state.pool,
        Some(user.user_id),
        "payment_initiate",
        "payments",
        serde_json::json!({
            "payment_id": payment.id,
            "order_id": order.id,
            "method": payment.method,
        }),
    )
    .await;

    Ok(ApiResponse::success(
        "Payment initiated",
        PaymentWithOrder {
            payment: Payment::from(payment),
            order: Order::from(order),
        },
        Some(Meta::empty()),
    ))
}

/// Asks the gateway how the transaction settled and records the outcome.
/// Verifying an already completed payment changes nothing.
pub async fn verify_payment(
    state: &AppState,
    user: &AuthUser,
    tx_ref: String,
) -> AppResult<ApiResponse<PaymentWithOrder>> {
    let payment = Payments::find()
        .filter(PaymentCol::TxRef.eq(tx_ref.clone()))
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;
    let order = find_order(state, payment.order_id).await?;
    ensure_owner_or_admin(user, order.user_id)?;

    if payment.status == PaymentStatus::Completed.as_str() {
        return Ok(ApiResponse::success(
            "Payment already verified",
            PaymentWithOrder {
                payment: Payment::from(payment),
                order: Order::from(order),
            },
            Some(Meta::empty()),
        ));
    }
    if payment.method == PaymentMethod::Cash.as_str() {
        return Err(AppError::BadRequest(
            "Cash payments are settled on delivery".into(),
        ));
    }

    let outcome = retry(&RetryPolicy::default(), "gateway_verify", || {
        state.gateway.verify(&tx_ref)
    })
    .await?;

    let (payment, order) = match outcome {
        VerifiedStatus::Pending => (payment, order),
        VerifiedStatus::Failed => {
            let mut active: PaymentActive = payment.into();
            active.status = Set(PaymentStatus::Failed.as_str().into());
            (active.update(&state.orm).await?, order)
        }
        VerifiedStatus::Success => settle(state, payment).await?,
    };

    audit::record(
        &state.pool,
        Some(user.user_id),
        "payment_verify",
        "payments",
        serde_json::json!({ "payment_id": payment.id, "status": payment.status }),
    )
    .await;

    Ok(ApiResponse::success(
        "Payment verified",
        PaymentWithOrder {
            payment: Payment::from(payment),
            order: Order::from(order),
        },
        Some(Meta::empty()),
    ))
}

pub async fn get_payment(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<PaymentWithOrder>> {
    let payment = Payments::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;
    let order = find_order(state, payment.order_id).await?;
    ensure_owner_or_admin(user, order.user_id)?;

    Ok(ApiResponse::success(
        "Payment",
        PaymentWithOrder {
            payment: Payment::from(payment),
            order: Order::from(order),
        },
        None,
    ))
}

/// Marks the payment completed and its order paid in one transaction.
/// Money that arrives for an order that is no longer pending (cancelled
/// meanwhile, or already paid another way) is flagged for a refund.
async fn settle(
    state: &AppState,
    payment: PaymentModel,
) -> AppResult<(PaymentModel, OrderModel)> {
    let (payment, order, was_pending) = transactional(&state.orm, "payment_settle", move |txn| {
        Box::pin(async move {
            let order = Orders::find_by_id(payment.order_id)
                .lock(LockType::Update)
                .one(txn)
                .await?
                .ok_or(AppError::NotFound)?;

            let was_pending = order.status == OrderStatus::Pending.as_str();
            let order = if was_pending {
                apply_status_change(txn, order, OrderStatus::Paid).await?
            } else {
                order
            };

            let mut active: PaymentActive = payment.into();
            active.status = Set(PaymentStatus::Completed.as_str().into());
            active.paid_at = Set(Some(Utc::now().into()));
            let payment = active.update(txn).await?;

            Ok::<_, AppError>((payment, order, was_pending))
        })
    })
    .await?;

    if !was_pending {
        tracing::warn!(
            payment_id = %payment.id,
            order_id = %order.id,
            order_status = %order.status,
            amount = payment.amount,
            "payment settled for an order that is no longer pending; refund required"
        );
        audit::record(
            &state.pool,
            None,
            "payment_needs_refund",
            "payments",
            serde_json::json!({
                "payment_id": payment.id,
                "order_id": order.id,
                "order_status": order.status,
                "amount": payment.amount,
            }),
        )
        .await;
    }

    Ok((payment, order))
}
