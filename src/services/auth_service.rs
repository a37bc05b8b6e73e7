use argon2::{
    Argon2, PasswordHasher,
    password_hash::{PasswordHash, PasswordVerifier, SaltString},
};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use password_hash::rand_core::OsRng;
use sea_orm::{
    ActiveModelTrait, ActiveValue::NotSet, ColumnTrait, Condition, EntityTrait, QueryFilter, Set,
};
use uuid::Uuid;

use crate::{
    audit,
    config::AppConfig,
    db_access::{transactional, with_connection},
    dto::auth::{Claims, LoginRequest, RefreshRequest, RegisterRequest, TokenKind, TokenPair},
    entity::{
        designers::ActiveModel as DesignerActive,
        users::{ActiveModel as UserActive, Column as UserCol, Entity as Users, Model as UserModel},
    },
    error::{AppError, AppResult},
    models::{Role, User},
    response::{ApiResponse, Meta},
    state::AppState,
};

pub const MIN_PASSWORD_LEN: usize = 8;

pub async fn register_user(
    state: &AppState,
    payload: RegisterRequest,
) -> AppResult<ApiResponse<User>> {
    let RegisterRequest {
        username,
        email,
        password,
        role,
        phone,
        address,
    } = payload;

    let username = username.trim().to_string();
    let email = email.trim().to_lowercase();
    validate_registration(&username, &email, &password)?;

    let role = role.unwrap_or(Role::Customer);
    if role == Role::Admin {
        return Err(AppError::BadRequest(
            "Admin accounts cannot be self-registered".into(),
        ));
    }

    let exist = Users::find()
        .filter(
            Condition::any()
                .add(UserCol::Username.eq(username.clone()))
                .add(UserCol::Email.eq(email.clone())),
        )
        .one(&state.orm)
        .await?;
    if let Some(existing) = exist {
        let field = if existing.username == username {
            "Username"
        } else {
            "Email"
        };
        return Err(AppError::BadRequest(format!("{field} is already taken")));
    }

    let password_hash = hash_password(&password)?;

    // The designer profile is created with the account so the two never drift.
    let user = transactional(&state.orm, "register_user", move |txn| {
        Box::pin(async move {
            let user = UserActive {
                id: Set(Uuid::new_v4()),
                username: Set(username.clone()),
                email: Set(email.clone()),
                password_hash: Set(password_hash),
                role: Set(role.as_str().to_string()),
                phone: Set(phone),
                address: Set(address),
                created_at: NotSet,
            }
            .insert(txn)
            .await?;

            if role == Role::Designer {
                DesignerActive {
                    id: Set(Uuid::new_v4()),
                    user_id: Set(user.id),
                    name: Set(Some(username)),
                    bio: Set(None),
                    phone: Set(user.phone.clone()),
                    email: Set(Some(email)),
                    created_at: NotSet,
                }
                .insert(txn)
                .await?;
            }

            Ok::<_, AppError>(user)
        })
    })
    .await
    .map_err(|err| err.unique_as_bad_request("Username or email is already taken"))?;

    audit::record(
        &state.pool,
        Some(user.id),
        "user_register",
        "users",
        serde_json::json!({ "user_id": user.id, "role": user.role }),
    )
    .await;

    Ok(ApiResponse::success("User created", User::from(user), None))
}

pub async fn login_user(
    state: &AppState,
    payload: LoginRequest,
) -> AppResult<ApiResponse<TokenPair>> {
    let LoginRequest { username, password } = payload;
    let login = username.trim().to_string();

    let user = Users::find()
        .filter(
            Condition::any()
                .add(UserCol::Username.eq(login.clone()))
                .add(UserCol::Email.eq(login.to_lowercase())),
        )
        .one(&state.orm)
        .await?;

    let user = match user {
        Some(u) => u,
        None => return Err(AppError::BadRequest("Invalid username or password".into())),
    };

    if !verify_password(&password, &user.password_hash)? {
        return Err(AppError::BadRequest("Invalid username or password".into()));
    }

    let pair = issue_pair(&state.config, &user)?;

    audit::record(
        &state.pool,
        Some(user.id),
        "user_login",
        "users",
        serde_json::json!({ "user_id": user.id }),
    )
    .await;

    Ok(ApiResponse::success("Logged in", pair, Some(Meta::empty())))
}

pub async fn refresh_tokens(
    state: &AppState,
    payload: RefreshRequest,
) -> AppResult<ApiResponse<TokenPair>> {
    let claims = decode_refresh(&state.config.jwt_secret, &payload.refresh)?;

    let user_id = Uuid::parse_str(&claims.sub)
        .map_err(|_| AppError::Unauthorized("Invalid user id in token".into()))?;
    let user = Users::find_by_id(user_id)
        .one(&state.orm)
        .await?
        .ok_or_else(|| AppError::Unauthorized("User no longer exists".into()))?;

    // Rotate: the presented refresh token cannot be used again. Only the
    // caller whose insert lands may mint a new pair.
    if !revoke(state, &claims).await? {
        return Err(AppError::Unauthorized("Token has been revoked".into()));
    }
    let pair = issue_pair(&state.config, &user)?;

    Ok(ApiResponse::success("Token refreshed", pair, Some(Meta::empty())))
}

pub async fn logout(
    state: &AppState,
    payload: RefreshRequest,
) -> AppResult<ApiResponse<serde_json::Value>> {
    let claims = decode_refresh(&state.config.jwt_secret, &payload.refresh)?;
    revoke(state, &claims).await?;

    audit::record(
        &state.pool,
        Uuid::parse_str(&claims.sub).ok(),
        "user_logout",
        "users",
        serde_json::json!({ "jti": claims.jti }),
    )
    .await;

    Ok(ApiResponse::success(
        "Logged out",
        serde_json::json!({}),
        Some(Meta::empty()),
    ))
}

pub fn validate_registration(username: &str, email: &str, password: &str) -> AppResult<()> {
    if username.is_empty() || username.len() > 150 {
        return Err(AppError::BadRequest(
            "Username must be between 1 and 150 characters".into(),
        ));
    }
    if !username
        .chars()
        .all(|c| c.is_alphanumeric() || matches!(c, '@' | '.' | '+' | '-' | '_'))
    {
        return Err(AppError::BadRequest(
            "Username may only contain letters, digits and @/./+/-/_".into(),
        ));
    }
    let valid_email = email
        .split_once('@')
        .is_some_and(|(local, domain)| !local.is_empty() && domain.contains('.'));
    if !valid_email {
        return Err(AppError::BadRequest("Enter a valid email address".into()));
    }
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::BadRequest(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}

pub fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AppError::Internal(anyhow::anyhow!(e.to_string())))?
        .to_string();
    Ok(hash)
}

pub fn verify_password(password: &str, hash: &str) -> AppResult<bool> {
    let parsed_hash = PasswordHash::new(hash)
        .map_err(|_| AppError::Internal(anyhow::anyhow!("Invalid password hash")))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

/// Signs a token of the given kind; returns the encoded token and its claims.
pub fn issue_token(
    secret: &str,
    user_id: Uuid,
    role: &str,
    kind: TokenKind,
    ttl: Duration,
) -> AppResult<(String, Claims)> {
    let expiration = Utc::now()
        .checked_add_signed(ttl)
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("Failed to set expiration")))?;

    let claims = Claims {
        sub: user_id.to_string(),
        role: role.to_string(),
        exp: expiration.timestamp() as usize,
        jti: Uuid::new_v4().to_string(),
        token_type: kind,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(anyhow::anyhow!(e.to_string())))?;

    Ok((token, claims))
}

pub fn decode_token(secret: &str, token: &str) -> AppResult<Claims> {
    let decoded = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|_| AppError::Unauthorized("Invalid or expired token".into()))?;
    Ok(decoded.claims)
}

fn decode_refresh(secret: &str, token: &str) -> AppResult<Claims> {
    let claims = decode_token(secret, token)?;
    if claims.token_type != TokenKind::Refresh {
        return Err(AppError::Unauthorized("Refresh token required".into()));
    }
    Ok(claims)
}

fn issue_pair(config: &AppConfig, user: &UserModel) -> AppResult<TokenPair> {
    let (access, _) = issue_token(
        &config.jwt_secret,
        user.id,
        &user.role,
        TokenKind::Access,
        Duration::minutes(config.access_token_ttl_minutes),
    )?;
    let (refresh, _) = issue_token(
        &config.jwt_secret,
        user.id,
        &user.role,
        TokenKind::Refresh,
        Duration::days(config.refresh_token_ttl_days),
    )?;
    Ok(TokenPair {
        access,
        refresh,
        token_type: "Bearer".into(),
    })
}

/// Records the token's jti as revoked. Returns false when it already was.
async fn revoke(state: &AppState, claims: &Claims) -> AppResult<bool> {
    let jti = claims.jti.clone();
    let expires_at = DateTime::<Utc>::from_timestamp(claims.exp as i64, 0).unwrap_or_else(Utc::now);

    with_connection(&state.pool, move |conn| {
        Box::pin(async move {
            // Expired revocations are dead weight; prune them on the same connection.
            sqlx::query("DELETE FROM revoked_tokens WHERE expires_at < now()")
                .execute(&mut *conn)
                .await?;
            let inserted = sqlx::query(
                "INSERT INTO revoked_tokens (jti, expires_at) VALUES ($1, $2) ON CONFLICT (jti) DO NOTHING",
            )
            .bind(jti)
            .bind(expires_at)
            .execute(&mut *conn)
            .await?;
            Ok::<_, AppError>(inserted.rows_affected() == 1)
        })
    })
    .await
}
