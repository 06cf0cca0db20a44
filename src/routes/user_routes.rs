// src/routes/user_routes.rs

use axum::{
    extract::State,
    routing::{get, patch},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use sqlx::Row;
use uuid::Uuid;

use crate::{
    error::ApiError,
    middleware::auth_context::AuthContext,
    models::{role_to_string, AppState, OkData, OkResponse, UserProfile, ROLE_ADMIN, ROLE_CLIENT},
    scheduling::status::{AppointmentStatus, CaseType},
};

fn ensure_admin(auth: &AuthContext) -> Result<(), ApiError> {
    if auth.role == ROLE_ADMIN {
        Ok(())
    } else {
        Err(ApiError::Forbidden(
            "FORBIDDEN",
            "Only the firm admin can list clients".into(),
        ))
    }
}

pub fn router() -> Router<AppState> {
    Router::new()
        // /api/v1/users/profile
        .route("/profile", get(get_profile).patch(update_profile))
        // /api/v1/users/settings
        .route("/settings", patch(update_settings))
        // /api/v1/users/clients
        .route("/clients", get(list_clients))
}

/* ============================================================
   Profile
   ============================================================ */

#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub data: UserProfile,
}

pub async fn get_profile(
    State(state): State<AppState>,
    auth: AuthContext,
) -> Result<Json<ProfileResponse>, ApiError> {
    let profile = load_profile(&state, auth.user_id).await?;
    Ok(Json(ProfileResponse { data: profile }))
}

async fn load_profile(state: &AppState, user_id: Uuid) -> Result<UserProfile, ApiError> {
    let row = sqlx::query(
        r#"
        SELECT user_id, email, full_name, role, phone, show_cancelled
        FROM app_user
        WHERE user_id = $1
        "#,
    )
    .bind(user_id)
    .fetch_optional(&state.db)
    .await
    .map_err(|e| ApiError::Internal(format!("db error: {e}")))?
    .ok_or_else(|| ApiError::NotFound("NOT_FOUND", "user not found".into()))?;

    Ok(UserProfile {
        user_id: row.try_get("user_id").map_err(internal_row)?,
        email: row.try_get("email").map_err(internal_row)?,
        full_name: row.try_get("full_name").map_err(internal_row)?,
        role: role_to_string(row.try_get("role").map_err(internal_row)?),
        phone: row.try_get("phone").map_err(internal_row)?,
        show_cancelled: row.try_get("show_cancelled").map_err(internal_row)?,
    })
}

#[derive(Debug, Deserialize)]
pub struct UpdateProfileRequest {
    pub email: Option<String>,
    pub full_name: Option<String>,
    pub phone: Option<Option<String>>,
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

fn validate_full_name(full_name: &str) -> Result<(), ApiError> {
    if full_name.trim().is_empty() {
        return Err(ApiError::BadRequest(
            "VALIDATION_ERROR",
            "full_name is required".into(),
        ));
    }
    Ok(())
}

pub async fn update_profile(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(req): Json<UpdateProfileRequest>,
) -> Result<Json<ProfileResponse>, ApiError> {
    let email = match req.email.as_deref().map(str::trim) {
        Some(e) if !e.is_empty() => {
            validate_email(e)?;
            let e = e.to_lowercase();

            // email must stay unique across other accounts
            let taken: Option<i32> = sqlx::query_scalar(
                r#"
                SELECT 1
                FROM app_user
                WHERE email = $1
                  AND user_id <> $2
                "#,
            )
            .bind(&e)
            .bind(auth.user_id)
            .fetch_optional(&state.db)
            .await
            .map_err(|e| ApiError::Internal(format!("db error: {e}")))?;

            if taken.is_some() {
                return Err(ApiError::Conflict(
                    "EMAIL_TAKEN",
                    "email already in use".into(),
                ));
            }
            Some(e)
        }
        _ => None,
    };

    let full_name = match req.full_name.as_deref().map(str::trim) {
        Some(n) if !n.is_empty() => {
            validate_full_name(n)?;
            Some(n.to_string())
        }
        _ => None,
    };

    sqlx::query(
        r#"
        UPDATE app_user
        SET email = COALESCE($2, email),
            full_name = COALESCE($3, full_name),
            phone = CASE WHEN $4 THEN $5 ELSE phone END,
            updated_at = now()
        WHERE user_id = $1
        "#,
    )
    .bind(auth.user_id)
    .bind(email)
    .bind(full_name)
    .bind(req.phone.is_some())
    .bind(req.phone.unwrap_or(None))
    .execute(&state.db)
    .await
    .map_err(|e| ApiError::Internal(format!("db error: {e}")))?;

    let profile = load_profile(&state, auth.user_id).await?;
    Ok(Json(ProfileResponse { data: profile }))
}

/* ============================================================
   Settings (listing preferences)
   ============================================================ */

#[derive(Debug, Deserialize)]
pub struct UpdateSettingsRequest {
    pub show_cancelled: bool,
}

/// Persists the show/hide-cancelled listing preference on the account, so
/// it travels with the user instead of living in one browser's storage.
pub async fn update_settings(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(req): Json<UpdateSettingsRequest>,
) -> Result<Json<OkResponse>, ApiError> {
    sqlx::query(
        r#"
        UPDATE app_user
        SET show_cancelled = $2,
            updated_at = now()
        WHERE user_id = $1
        "#,
    )
    .bind(auth.user_id)
    .bind(req.show_cancelled)
    .execute(&state.db)
    .await
    .map_err(|e| ApiError::Internal(format!("db error: {e}")))?;

    Ok(Json(OkResponse {
        data: OkData { ok: true },
    }))
}

/* ============================================================
   GET /users/clients  (admin)
   ============================================================ */

#[derive(Debug, Serialize)]
pub struct ClientsResponse {
    pub data: ClientsData,
}

#[derive(Debug, Serialize)]
pub struct ClientsData {
    pub clients: Vec<ClientDto>,
}

#[derive(Debug, Serialize)]
pub struct ClientDto {
    pub user_id: Uuid,
    pub email: String,
    pub full_name: String,
    pub phone: Option<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub appointments: Vec<AppointmentBriefDto>,
}

#[derive(Debug, Serialize)]
pub struct AppointmentBriefDto {
    pub appointment_id: Uuid,
    pub date: String,
    pub time: String,
    pub status: AppointmentStatus,
    pub case_type: CaseType,
}

pub async fn list_clients(
    State(state): State<AppState>,
    auth: AuthContext,
) -> Result<Json<ClientsResponse>, ApiError> {
    ensure_admin(&auth)?;

    let rows = sqlx::query(
        r#"
        SELECT
          u.user_id,
          u.email,
          u.full_name,
          u.phone,
          u.created_at,

          a.appointment_id AS apt_id,
          a.date           AS apt_date,
          a.time           AS apt_time,
          a.status         AS apt_status,
          a.case_type      AS apt_case_type

        FROM app_user u
        LEFT JOIN appointment a ON a.user_id = u.user_id

        WHERE u.role = $1

        ORDER BY u.created_at DESC, a.date DESC, a.time DESC
        "#,
    )
    .bind(ROLE_CLIENT)
    .fetch_all(&state.db)
    .await
    .map_err(|e| ApiError::Internal(format!("db error: {e}")))?;

    Ok(Json(ClientsResponse {
        data: ClientsData {
            clients: fold_rows_into_clients(rows)?,
        },
    }))
}

/* ============================================================
   Helper: fold joined rows into client records
   ============================================================ */

fn fold_rows_into_clients(rows: Vec<sqlx::postgres::PgRow>) -> Result<Vec<ClientDto>, ApiError> {
    use std::collections::BTreeMap;

    // preserves the query's newest-first ordering by insertion index
    let mut order: Vec<Uuid> = vec![];
    let mut map: BTreeMap<Uuid, ClientDto> = BTreeMap::new();

    for r in rows {
        let user_id: Uuid = r.try_get("user_id").map_err(internal_row)?;

        if !map.contains_key(&user_id) {
            order.push(user_id);
            map.insert(
                user_id,
                ClientDto {
                    user_id,
                    email: r.try_get("email").map_err(internal_row)?,
                    full_name: r.try_get("full_name").map_err(internal_row)?,
                    phone: r.try_get("phone").map_err(internal_row)?,
                    created_at: r.try_get("created_at").map_err(internal_row)?,
                    appointments: vec![],
                },
            );
        }

        // collect the joined appointment if one exists
        let apt_id: Option<Uuid> = r.try_get("apt_id").ok().flatten();
        if let Some(appointment_id) = apt_id {
            let date: chrono::NaiveDate = r.try_get("apt_date").map_err(internal_row)?;
            let time: chrono::NaiveTime = r.try_get("apt_time").map_err(internal_row)?;
            let entry = map.get_mut(&user_id).expect("inserted above");
            entry.appointments.push(AppointmentBriefDto {
                appointment_id,
                date: date.format("%Y-%m-%d").to_string(),
                time: time.format("%H:%M").to_string(),
                status: r.try_get("apt_status").map_err(internal_row)?,
                case_type: r.try_get("apt_case_type").map_err(internal_row)?,
            });
        }
    }

    Ok(order
        .into_iter()
        .filter_map(|id| map.remove(&id))
        .collect())
}

fn internal_row(e: sqlx::Error) -> ApiError {
    ApiError::Internal(format!("row decode error: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_email() {
        assert!(validate_email("alice@example.com").is_ok());
        assert!(validate_email("no-at-sign").is_err());
        assert!(validate_email("").is_err());
        assert!(validate_email("  ").is_err());
    }

    #[test]
    fn test_validate_full_name() {
        assert!(validate_full_name("Alice Stone").is_ok());
        assert!(validate_full_name("").is_err());
        assert!(validate_full_name("   ").is_err());
    }
}
