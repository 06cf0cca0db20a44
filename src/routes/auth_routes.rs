use axum::{
    Json, Router,
    extract::State,
    routing::{get, post},
};
use chrono::{Duration, Utc};

use serde::{Deserialize, Serialize};

use crate::{
    auth::{
        generate_access_token, hash_access_token, hash_password, password_meets_complexity,
        verify_password,
    },
    error::ApiError,
    middleware::auth_context::AuthContext,
    models::*,
};

// TTL when the client ticks "remember me" at login.
const REMEMBER_ME_TTL_HOURS: i64 = 24 * 7;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/me", get(me))
        .route("/logout", post(logout))
        .route("/change_password", post(change_password))
}

async fn load_firm_name(state: &AppState) -> Result<String, ApiError> {
    let firm_name: Option<String> = sqlx::query_scalar(
        r#"
        SELECT firm_name
        FROM firm_settings
        WHERE singleton_id = TRUE
        "#,
    )
    .fetch_optional(&state.db)
    .await
    .map_err(|e| ApiError::Internal(format!("db error: {e}")))?;

    Ok(firm_name.unwrap_or_else(|| "Law Office".to_string()))
}

async fn open_session(
    state: &AppState,
    user: &UserRow,
    device_name: Option<&str>,
    ttl_hours: i64,
) -> Result<(String, SessionTokenRow), ApiError> {
    let access_token = generate_access_token();
    let token_hash = hash_access_token(&access_token);
    let expires_at = Utc::now() + Duration::hours(ttl_hours);

    let session: SessionTokenRow = sqlx::query_as::<_, SessionTokenRow>(
        r#"
        INSERT INTO session_token
            (user_id, session_token_hash, device_name, expires_at)
        VALUES
            ($1, $2, $3, $4)
        RETURNING session_token_id, expires_at
        "#,
    )
    .bind(user.user_id)
    .bind(&token_hash)
    .bind(device_name)
    .bind(expires_at)
    .fetch_one(&state.db)
    .await
    .map_err(|e| ApiError::Internal(format!("db error: {e}")))?;

    Ok((access_token, session))
}

fn validate_email(email: &str) -> Result<(), ApiError> {
    let e = email.trim();
    if e.is_empty() || !e.contains('@') || e.len() > 254 {
        return Err(ApiError::BadRequest(
            "VALIDATION_ERROR",
            "a valid email address is required".into(),
        ));
    }
    Ok(())
}

fn validate_new_password(password: &str) -> Result<(), ApiError> {
    if !password_meets_complexity(password) {
        return Err(ApiError::BadRequest(
            "VALIDATION_ERROR",
            "password must be at least 8 characters and contain uppercase, lowercase, numbers and special characters"
                .into(),
        ));
    }
    Ok(())
}

pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let email = req.email.trim().to_lowercase();
    validate_email(&email)?;
    validate_new_password(&req.password)?;

    let full_name = req.full_name.trim().to_string();
    if full_name.is_empty() {
        return Err(ApiError::BadRequest(
            "VALIDATION_ERROR",
            "full_name is required".into(),
        ));
    }

    let exists: Option<i32> = sqlx::query_scalar(
        r#"
        SELECT 1
        FROM app_user
        WHERE email = $1
        "#,
    )
    .bind(&email)
    .fetch_optional(&state.db)
    .await
    .map_err(|e| ApiError::Internal(format!("db error: {e}")))?;

    if exists.is_some() {
        return Err(ApiError::Conflict(
            "EMAIL_TAKEN",
            "an account with this email already exists".into(),
        ));
    }

    // The configured firm address registers as admin, everyone else as client.
    let role = if email == state.admin_email.to_lowercase() {
        ROLE_ADMIN
    } else {
        ROLE_CLIENT
    };

    let password_hash = hash_password(&req.password).map_err(ApiError::Internal)?;

    let user: UserRow = sqlx::query_as::<_, UserRow>(
        r#"
        INSERT INTO app_user (email, full_name, password_hash, role, phone)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING user_id, email, full_name, password_hash, role, phone, show_cancelled, is_active
        "#,
    )
    .bind(&email)
    .bind(&full_name)
    .bind(&password_hash)
    .bind(role)
    .bind(req.phone.as_deref().map(str::trim))
    .fetch_one(&state.db)
    .await
    .map_err(|e| ApiError::Internal(format!("db error: {e}")))?;

    tracing::info!(email = %user.email, "registered new account");

    let (access_token, session) =
        open_session(&state, &user, None, state.session_ttl_hours).await?;
    let firm_name = load_firm_name(&state).await?;

    Ok(Json(LoginResponse {
        data: LoginResponseData {
            access_token,
            expires_at: session.expires_at,
            user: user.profile(),
            firm: FirmProfile { firm_name },
        },
    }))
}

pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let email = req.email.trim().to_lowercase();
    if email.is_empty() || req.password.is_empty() {
        return Err(ApiError::BadRequest(
            "VALIDATION_ERROR",
            "email and password are required".into(),
        ));
    }

    let user: UserRow = sqlx::query_as::<_, UserRow>(
        r#"
        SELECT user_id, email, full_name, password_hash, role, phone, show_cancelled, is_active
        FROM app_user
        WHERE email = $1
        "#,
    )
    .bind(&email)
    .fetch_optional(&state.db)
    .await
    .map_err(|e| ApiError::Internal(format!("db error: {e}")))?
    .ok_or_else(ApiError::invalid_credentials)?;

    if !user.is_active {
        return Err(ApiError::Forbidden(
            "FORBIDDEN",
            "Account is disabled".into(),
        ));
    }

    if !verify_password(&req.password, &user.password_hash) {
        return Err(ApiError::invalid_credentials());
    }

    let ttl_hours = if req.remember_me.unwrap_or(false) {
        REMEMBER_ME_TTL_HOURS
    } else {
        state.session_ttl_hours
    };

    let (access_token, session) =
        open_session(&state, &user, req.device_name.as_deref(), ttl_hours).await?;
    let firm_name = load_firm_name(&state).await?;

    Ok(Json(LoginResponse {
        data: LoginResponseData {
            access_token,
            expires_at: session.expires_at,
            user: user.profile(),
            firm: FirmProfile { firm_name },
        },
    }))
}

pub async fn me(
    State(state): State<AppState>,
    auth: AuthContext,
) -> Result<Json<MeResponse>, ApiError> {
    let user: UserRow = sqlx::query_as::<_, UserRow>(
        r#"
        SELECT user_id, email, full_name, password_hash, role, phone, show_cancelled, is_active
        FROM app_user
        WHERE user_id = $1
        "#,
    )
    .bind(auth.user_id)
    .fetch_optional(&state.db)
    .await
    .map_err(|e| ApiError::Internal(format!("db error: {e}")))?
    .ok_or_else(ApiError::session_expired)?;

    if !user.is_active {
        return Err(ApiError::session_expired());
    }

    let firm_name = load_firm_name(&state).await?;

    let session: SessionTokenRow = sqlx::query_as::<_, SessionTokenRow>(
        r#"
        SELECT session_token_id, expires_at
        FROM session_token
        WHERE session_token_id = $1
          AND user_id = $2
          AND revoked_at IS NULL
          AND expires_at > now()
        "#,
    )
    .bind(auth.session_token_id)
    .bind(auth.user_id)
    .fetch_optional(&state.db)
    .await
    .map_err(|e| ApiError::Internal(format!("db error: {e}")))?
    .ok_or_else(ApiError::session_expired)?;

    Ok(Json(MeResponse {
        data: MeResponseData {
            user: user.profile(),
            firm: FirmProfile { firm_name },
            session: SessionInfo {
                session_token_id: session.session_token_id,
                expires_at: session.expires_at,
            },
        },
    }))
}

pub async fn logout(
    State(state): State<AppState>,
    auth: AuthContext,
) -> Result<Json<OkResponse>, ApiError> {
    let rows = sqlx::query(
        r#"
        UPDATE session_token
        SET revoked_at = now()
        WHERE session_token_id = $1
          AND user_id = $2
          AND revoked_at IS NULL
        "#,
    )
    .bind(auth.session_token_id)
    .bind(auth.user_id)
    .execute(&state.db)
    .await
    .map_err(|e| ApiError::Internal(format!("db error: {e}")))?;

    if rows.rows_affected() == 0 {
        return Err(ApiError::session_expired());
    }

    Ok(Json(OkResponse {
        data: OkData { ok: true },
    }))
}

#[derive(Debug, Deserialize)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

#[derive(Debug, Serialize)]
pub struct ChangePasswordResponse {
    pub data: ChangePasswordData,
}

#[derive(Debug, Serialize)]
pub struct ChangePasswordData {
    pub ok: bool,
    pub revoked_sessions: i64,
}

/// POST /api/v1/auth/change_password
/// Re-hashes the credential and revokes every other active session.
pub async fn change_password(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(req): Json<ChangePasswordRequest>,
) -> Result<Json<ChangePasswordResponse>, ApiError> {
    validate_new_password(&req.new_password)?;

    let user: UserRow = sqlx::query_as::<_, UserRow>(
        r#"
        SELECT user_id, email, full_name, password_hash, role, phone, show_cancelled, is_active
        FROM app_user
        WHERE user_id = $1
        "#,
    )
    .bind(auth.user_id)
    .fetch_optional(&state.db)
    .await
    .map_err(|e| ApiError::Internal(format!("db error: {e}")))?
    .ok_or_else(ApiError::session_expired)?;

    if !verify_password(&req.current_password, &user.password_hash) {
        return Err(ApiError::invalid_credentials());
    }

    let new_hash = hash_password(&req.new_password).map_err(ApiError::Internal)?;

    sqlx::query(
        r#"
        UPDATE app_user
        SET password_hash = $1,
            updated_at = now()
        WHERE user_id = $2
        "#,
    )
    .bind(&new_hash)
    .bind(auth.user_id)
    .execute(&state.db)
    .await
    .map_err(|e| ApiError::Internal(format!("db error: {e}")))?;

    let revoked = sqlx::query(
        r#"
        UPDATE session_token
        SET revoked_at = now()
        WHERE user_id = $1
          AND revoked_at IS NULL
          AND expires_at > now()
          AND session_token_id <> $2
        "#,
    )
    .bind(auth.user_id)
    .bind(auth.session_token_id)
    .execute(&state.db)
    .await
    .map_err(|e| ApiError::Internal(format!("db error: {e}")))?;

    Ok(Json(ChangePasswordResponse {
        data: ChangePasswordData {
            ok: true,
            revoked_sessions: revoked.rows_affected() as i64,
        },
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_email() {
        assert!(validate_email("client@example.com").is_ok());
        assert!(validate_email("no-at-sign").is_err());
        assert!(validate_email("").is_err());
        assert!(validate_email("   ").is_err());
    }

    #[test]
    fn test_validate_new_password_uses_complexity_rules() {
        assert!(validate_new_password("Sup3r$ecret").is_ok());
        assert!(validate_new_password("weakpass").is_err());
        assert!(validate_new_password("Sh0rt!").is_err());
    }
}
