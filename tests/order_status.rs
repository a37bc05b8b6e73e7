use bridal_api::models::{OrderStatus, PaymentMethod, Role};

#[test]
fn lifecycle_moves_forward_only() {
    use OrderStatus::*;

    assert!(Pending.can_transition_to(Paid));
    assert!(Paid.can_transition_to(Shipped));
    assert!(Shipped.can_transition_to(Delivered));

    assert!(!Pending.can_transition_to(Shipped));
    assert!(!Delivered.can_transition_to(Pending));
    assert!(!Cancelled.can_transition_to(Paid));
    assert!(!Paid.can_transition_to(Paid));
}

#[test]
fn only_unshipped_orders_can_be_cancelled() {
    use OrderStatus::*;

    assert!(Pending.is_cancellable());
    assert!(Paid.is_cancellable());
    assert!(!Shipped.is_cancellable());
    assert!(!Delivered.is_cancellable());
    assert!(!Cancelled.is_cancellable());
}

#[test]
fn statuses_parse_from_their_wire_names() {
    for status in [
        OrderStatus::Pending,
        OrderStatus::Paid,
        OrderStatus::Shipped,
        OrderStatus::Delivered,
        OrderStatus::Cancelled,
    ] {
        assert_eq!(status.as_str().parse::<OrderStatus>(), Ok(status));
    }
    assert!("refunded".parse::<OrderStatus>().is_err());
}

#[test]
fn roles_parse_and_reject_unknown() {
    assert_eq!("designer".parse::<Role>(), Ok(Role::Designer));
    let err = "owner".parse::<Role>().unwrap_err();
    assert!(err.contains("not a valid role"));
}

#[test]
fn cash_skips_the_gateway() {
    assert!(!PaymentMethod::Cash.uses_gateway());
    assert!(PaymentMethod::Card.uses_gateway());
    assert!(PaymentMethod::Paypal.uses_gateway());
}
