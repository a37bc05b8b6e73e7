mod common;

use std::sync::{Arc, Mutex};

use axum::{
    Json, Router,
    extract::{Path, State},
    http::HeaderMap,
    routing::{get, post},
};
use bridal_api::{
    dto::{cart::AddToCartRequest, dresses::CreateDressRequest, payments::InitiatePaymentRequest},
    error::AppError,
    middleware::auth::AuthUser,
    models::{PaymentMethod, Role},
    services::{cart_service, dress_service, order_service, payment_service},
    state::AppState,
};
use serde_json::{Value, json};
use uuid::Uuid;

/// Stand-in for the hosted checkout API. `outcome` is what verify reports.
#[derive(Clone, Default)]
struct MockGateway {
    outcome: Arc<Mutex<&'static str>>,
    initialized: Arc<Mutex<Vec<(Option<String>, Value)>>>,
}

impl MockGateway {
    fn report(&self, outcome: &'static str) {
        *self.outcome.lock().unwrap() = outcome;
    }
}

async fn initialize(
    State(mock): State<MockGateway>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Json<Value> {
    let auth = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let tx_ref = body["tx_ref"].as_str().unwrap_or_default().to_string();
    mock.initialized.lock().unwrap().push((auth, body));
    Json(json!({
        "status": "success",
        "message": "Hosted Link",
        "data": { "checkout_url": format!("https://checkout.test/{tx_ref}") }
    }))
}

async fn verify(State(mock): State<MockGateway>, Path(tx_ref): Path<String>) -> Json<Value> {
    let status = *mock.outcome.lock().unwrap();
    Json(json!({
        "status": "success",
        "message": "Payment details",
        "data": { "status": status, "tx_ref": tx_ref }
    }))
}

async fn spawn_gateway(mock: MockGateway) -> anyhow::Result<String> {
    let app = Router::new()
        .route("/transaction/initialize", post(initialize))
        .route("/transaction/verify/{tx_ref}", get(verify))
        .with_state(mock);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    tokio::spawn(async move { axum::serve(listener, app).await });
    Ok(format!("http://{addr}"))
}

async fn place_order(state: &AppState, customer: &AuthUser, dress_id: Uuid) -> anyhow::Result<Uuid> {
    cart_service::add_item(
        state,
        customer,
        AddToCartRequest {
            dress_id,
            quantity: Some(1),
        },
    )
    .await?;
    let placed = order_service::checkout(state, customer)
        .await?
        .data
        .expect("order");
    Ok(placed.order.id)
}

fn pay(order_id: Uuid, method: PaymentMethod) -> InitiatePaymentRequest {
    InitiatePaymentRequest { order_id, method }
}

// Card payment through a mock gateway: failure, retry, pending, success,
// repeat verification, and a settlement that lands after cancellation.
#[tokio::test]
async fn payment_lifecycle_against_gateway() -> anyhow::Result<()> {
    let Some(database_url) = common::database_url() else {
        return Ok(());
    };
    let mock = MockGateway::default();
    mock.report("pending");
    let gateway_url = spawn_gateway(mock.clone()).await?;
    let state = common::setup_state_with(&database_url, |config| {
        config.payment.gateway_url = gateway_url;
        config.payment.secret_key = Some("test-key".into());
    })
    .await?;

    let designer = common::register(&state, "selam", Role::Designer).await?;
    let customer = common::register(&state, "zoe", Role::Customer).await?;
    let stranger = common::register(&state, "noah", Role::Customer).await?;
    let dress = dress_service::create_dress(
        &state,
        &designer,
        CreateDressRequest {
            name: "Meskel Habesha Dress".into(),
            description: None,
            size: "L".into(),
            price: 320_050,
            stock: 3,
            collection_id: None,
            designer_id: None,
        },
    )
    .await?
    .data
    .expect("dress");

    let order_id = place_order(&state, &customer, dress.id).await?;

    // Without a secret key no gateway call is attempted.
    let unconfigured = AppState::new(
        state.pool.clone(),
        state.orm.clone(),
        common::test_config(&database_url),
    )?;
    let refused =
        payment_service::initiate_payment(&unconfigured, &customer, pay(order_id, PaymentMethod::Card))
            .await;
    assert!(matches!(refused, Err(AppError::BadRequest(msg)) if msg.contains("not configured")));

    let foreign =
        payment_service::initiate_payment(&state, &stranger, pay(order_id, PaymentMethod::Card))
            .await;
    assert!(matches!(foreign, Err(AppError::Forbidden)));

    let first = payment_service::initiate_payment(&state, &customer, pay(order_id, PaymentMethod::Card))
        .await?
        .data
        .expect("payment");
    assert_eq!(first.payment.status, "pending");
    assert_eq!(first.payment.amount, 320_050);
    assert_eq!(
        first.payment.checkout_url.as_deref(),
        Some(format!("https://checkout.test/{}", first.payment.tx_ref).as_str())
    );
    {
        let calls = mock.initialized.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0.as_deref(), Some("Bearer test-key"));
        assert_eq!(calls[0].1["amount"], "3200.50");
        assert_eq!(calls[0].1["email"], "zoe@example.com");
    }

    // A pending payment is handed back rather than duplicated.
    let again = payment_service::initiate_payment(&state, &customer, pay(order_id, PaymentMethod::Card))
        .await?
        .data
        .expect("payment");
    assert_eq!(again.payment.id, first.payment.id);
    assert_eq!(mock.initialized.lock().unwrap().len(), 1);

    // Gateway still pending: nothing moves.
    let waiting = payment_service::verify_payment(&state, &customer, first.payment.tx_ref.clone())
        .await?
        .data
        .expect("payment");
    assert_eq!(waiting.payment.status, "pending");
    assert_eq!(waiting.order.status, "pending");

    // Declined: the attempt is marked failed and the order stays payable.
    mock.report("failed");
    let declined = payment_service::verify_payment(&state, &customer, first.payment.tx_ref.clone())
        .await?
        .data
        .expect("payment");
    assert_eq!(declined.payment.status, "failed");
    assert_eq!(declined.order.status, "pending");

    // Retrying reuses the failed row under a fresh reference.
    let retried = payment_service::initiate_payment(&state, &customer, pay(order_id, PaymentMethod::Paypal))
        .await?
        .data
        .expect("payment");
    assert_eq!(retried.payment.id, first.payment.id);
    assert_eq!(retried.payment.method, "paypal");
    assert_eq!(retried.payment.status, "pending");
    assert_ne!(retried.payment.tx_ref, first.payment.tx_ref);

    // The old reference no longer resolves.
    let stale = payment_service::verify_payment(&state, &customer, first.payment.tx_ref.clone()).await;
    assert!(matches!(stale, Err(AppError::NotFound)));

    mock.report("success");
    let settled = payment_service::verify_payment(&state, &customer, retried.payment.tx_ref.clone())
        .await?
        .data
        .expect("payment");
    assert_eq!(settled.payment.status, "completed");
    assert!(settled.payment.paid_at.is_some());
    assert_eq!(settled.order.status, "paid");

    // Verifying again changes nothing.
    mock.report("failed");
    let repeat = payment_service::verify_payment(&state, &customer, retried.payment.tx_ref.clone())
        .await?;
    assert_eq!(repeat.message, "Payment already verified");
    let repeat = repeat.data.expect("payment");
    assert_eq!(repeat.payment.status, "completed");
    assert_eq!(repeat.payment.paid_at, settled.payment.paid_at);
    assert_eq!(repeat.order.status, "paid");

    let paid_twice =
        payment_service::initiate_payment(&state, &customer, pay(order_id, PaymentMethod::Card)).await;
    assert!(matches!(paid_twice, Err(AppError::BadRequest(_))));

    // Money arriving for an order cancelled in the meantime is flagged.
    let late_order = place_order(&state, &customer, dress.id).await?;
    let late = payment_service::initiate_payment(&state, &customer, pay(late_order, PaymentMethod::Card))
        .await?
        .data
        .expect("payment");
    order_service::cancel_order(&state, &customer, late_order).await?;
    mock.report("success");
    let orphaned = payment_service::verify_payment(&state, &customer, late.payment.tx_ref.clone())
        .await?
        .data
        .expect("payment");
    assert_eq!(orphaned.payment.status, "completed");
    assert_eq!(orphaned.order.status, "cancelled");
    let (flagged,): (i64,) = sqlx::query_as(
        "SELECT COUNT(*) FROM audit_logs WHERE action = 'payment_needs_refund' AND metadata->>'order_id' = $1",
    )
    .bind(late_order.to_string())
    .fetch_one(&state.pool)
    .await?;
    assert_eq!(flagged, 1);

    // Cash is recorded without the gateway and cannot be verified online.
    let cash_order = place_order(&state, &customer, dress.id).await?;
    let cash = payment_service::initiate_payment(&state, &customer, pay(cash_order, PaymentMethod::Cash))
        .await?
        .data
        .expect("payment");
    assert_eq!(cash.payment.checkout_url, None);
    assert_eq!(mock.initialized.lock().unwrap().len(), 3);
    let cash_verify = payment_service::verify_payment(&state, &customer, cash.payment.tx_ref).await;
    assert!(matches!(cash_verify, Err(AppError::BadRequest(_))));

    Ok(())
}
