use bridal_api::{
    dto::auth::TokenKind,
    error::AppError,
    services::auth_service::{
        decode_token, hash_password, issue_token, validate_registration, verify_password,
    },
};
use chrono::Duration;
use uuid::Uuid;

const SECRET: &str = "test-secret";

#[test]
fn issued_tokens_decode_with_their_claims() {
    let user_id = Uuid::new_v4();
    let (token, claims) =
        issue_token(SECRET, user_id, "designer", TokenKind::Access, Duration::minutes(5)).unwrap();

    let decoded = decode_token(SECRET, &token).unwrap();
    assert_eq!(decoded.sub, user_id.to_string());
    assert_eq!(decoded.role, "designer");
    assert_eq!(decoded.token_type, TokenKind::Access);
    assert_eq!(decoded.jti, claims.jti);
}

#[test]
fn refresh_tokens_carry_their_kind() {
    let (token, _) = issue_token(
        SECRET,
        Uuid::new_v4(),
        "customer",
        TokenKind::Refresh,
        Duration::days(1),
    )
    .unwrap();
    assert_eq!(decode_token(SECRET, &token).unwrap().token_type, TokenKind::Refresh);
}

#[test]
fn tokens_signed_with_another_secret_are_rejected() {
    let (token, _) = issue_token(
        SECRET,
        Uuid::new_v4(),
        "customer",
        TokenKind::Access,
        Duration::minutes(5),
    )
    .unwrap();
    assert!(matches!(
        decode_token("other-secret", &token),
        Err(AppError::Unauthorized(_))
    ));
}

#[test]
fn expired_tokens_are_rejected() {
    let (token, _) = issue_token(
        SECRET,
        Uuid::new_v4(),
        "customer",
        TokenKind::Access,
        Duration::minutes(-10),
    )
    .unwrap();
    assert!(decode_token(SECRET, &token).is_err());
}

#[test]
fn password_hashes_verify() {
    let hash = hash_password("correct horse").unwrap();
    assert_ne!(hash, "correct horse");
    assert!(verify_password("correct horse", &hash).unwrap());
    assert!(!verify_password("wrong horse", &hash).unwrap());
}

#[test]
fn registration_input_is_validated() {
    assert!(validate_registration("sofia", "sofia@example.com", "longenough").is_ok());
    assert!(validate_registration("", "sofia@example.com", "longenough").is_err());
    assert!(validate_registration("so fia", "sofia@example.com", "longenough").is_err());
    assert!(validate_registration("sofia", "not-an-email", "longenough").is_err());
    assert!(validate_registration("sofia", "sofia@example.com", "short").is_err());
}
