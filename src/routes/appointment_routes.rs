// src/routes/appointment_routes.rs

use axum::{
    extract::{Path, Query, State},
    routing::{get, patch, post},
    Json, Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::Row;
use uuid::Uuid;

use crate::{
    error::ApiError,
    middleware::auth_context::AuthContext,
    models::{AppState, AppointmentRow, ROLE_ADMIN},
    scheduling::{
        slots::{generate_slots, parse_date, validate_booking},
        status::{AppointmentStatus, CaseType},
        SchedulingError,
    },
};

const MAX_NOTES_LEN: usize = 2000;

fn is_admin(auth: &AuthContext) -> bool {
    auth.role == ROLE_ADMIN
}

fn ensure_admin(auth: &AuthContext) -> Result<(), ApiError> {
    if is_admin(auth) {
        Ok(())
    } else {
        Err(ApiError::Forbidden(
            "FORBIDDEN",
            "Only the firm admin can manage appointments".into(),
        ))
    }
}

fn ensure_owner_or_admin(auth: &AuthContext, owner_id: Uuid) -> Result<(), ApiError> {
    if is_admin(auth) || auth.user_id == owner_id {
        Ok(())
    } else {
        Err(ApiError::Forbidden(
            "FORBIDDEN",
            "You can only access your own appointments".into(),
        ))
    }
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/slots", get(get_slots))
        .route("/all", get(list_all_appointments))
        .route("/user/{user_id}", get(list_user_appointments))
        .route("/", post(create_appointment))
        .route("/{appointment_id}", get(get_appointment))
        .route("/{appointment_id}/status", patch(update_status))
        .route("/{appointment_id}/reschedule", patch(reschedule_appointment))
}

/* ============================================================
   Response DTOs
   ============================================================ */

#[derive(Debug, Serialize)]
pub struct ApiOk<T> {
    pub data: T,
}

#[derive(Debug, Serialize)]
pub struct AppointmentDto {
    pub appointment_id: Uuid,
    pub user_id: Uuid,
    pub date: String,
    pub time: String,
    pub case_type: CaseType,
    pub status: AppointmentStatus,
    pub notes: Option<String>,
    pub created_at: chrono::DateTime<Utc>,
    pub updated_at: chrono::DateTime<Utc>,
}

impl From<AppointmentRow> for AppointmentDto {
    fn from(row: AppointmentRow) -> Self {
        AppointmentDto {
            appointment_id: row.appointment_id,
            user_id: row.user_id,
            date: row.date.format("%Y-%m-%d").to_string(),
            time: row.time.format("%H:%M").to_string(),
            case_type: row.case_type,
            status: row.status,
            notes: row.notes,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Admin listing row: appointment plus the owning client's contact details.
#[derive(Debug, Serialize)]
pub struct AppointmentDetailDto {
    #[serde(flatten)]
    pub appointment: AppointmentDto,
    pub client_name: String,
    pub client_email: String,
    pub client_phone: Option<String>,
}

/* ============================================================
   GET /appointments/slots?date=YYYY-MM-DD
   ============================================================ */

#[derive(Debug, Deserialize)]
pub struct SlotsQuery {
    pub date: String,
}

#[derive(Debug, Serialize)]
pub struct SlotsData {
    pub date: String,
    pub slots: Vec<String>,
}

/// Bookable times for one day, for the booking and reschedule forms. The
/// same generator validates submissions, so the form and the server cannot
/// disagree.
pub async fn get_slots(
    State(_state): State<AppState>,
    _auth: AuthContext,
    Query(q): Query<SlotsQuery>,
) -> Result<Json<ApiOk<SlotsData>>, ApiError> {
    let date = parse_date(&q.date)?;
    let today = Utc::now().date_naive();
    if date < today {
        return Err(SchedulingError::InvalidDate(format!("{date} is in the past")).into());
    }

    let slots = generate_slots(date)
        .map(|t| t.format("%H:%M").to_string())
        .collect();

    Ok(Json(ApiOk {
        data: SlotsData {
            date: date.format("%Y-%m-%d").to_string(),
            slots,
        },
    }))
}

/* ============================================================
   GET /appointments/all  (admin)
   ============================================================ */

#[derive(Debug, Deserialize)]
pub struct ListAllQuery {
    /// Explicit listing preference; replaces the old ambient show/hide
    /// toggle. Defaults to true.
    pub include_cancelled: Option<bool>,
}

pub async fn list_all_appointments(
    State(state): State<AppState>,
    auth: AuthContext,
    Query(q): Query<ListAllQuery>,
) -> Result<Json<ApiOk<Vec<AppointmentDetailDto>>>, ApiError> {
    ensure_admin(&auth)?;

    let include_cancelled = q.include_cancelled.unwrap_or(true);

    let rows = sqlx::query(
        r#"
        SELECT
          a.appointment_id,
          a.user_id,
          a.date,
          a.time,
          a.case_type,
          a.status,
          a.notes,
          a.created_at,
          a.updated_at,

          u.full_name AS client_name,
          u.email     AS client_email,
          u.phone     AS client_phone

        FROM appointment a
        JOIN app_user u ON u.user_id = a.user_id

        WHERE ($1 OR a.status <> $2)

        ORDER BY a.date DESC, a.time DESC
        "#,
    )
    .bind(include_cancelled)
    .bind(AppointmentStatus::Cancelled)
    .fetch_all(&state.db)
    .await
    .map_err(|e| ApiError::Internal(format!("db error: {e}")))?;

    let mut out = Vec::with_capacity(rows.len());
    for r in rows {
        let appointment = AppointmentDto::from(AppointmentRow {
            appointment_id: r.try_get("appointment_id").map_err(internal_row)?,
            user_id: r.try_get("user_id").map_err(internal_row)?,
            date: r.try_get("date").map_err(internal_row)?,
            time: r.try_get("time").map_err(internal_row)?,
            case_type: r.try_get("case_type").map_err(internal_row)?,
            status: r.try_get("status").map_err(internal_row)?,
            notes: r.try_get("notes").map_err(internal_row)?,
            created_at: r.try_get("created_at").map_err(internal_row)?,
            updated_at: r.try_get("updated_at").map_err(internal_row)?,
        });
        out.push(AppointmentDetailDto {
            appointment,
            client_name: r.try_get("client_name").map_err(internal_row)?,
            client_email: r.try_get("client_email").map_err(internal_row)?,
            client_phone: r.try_get("client_phone").map_err(internal_row)?,
        });
    }

    Ok(Json(ApiOk { data: out }))
}

/* ============================================================
   GET /appointments/user/{user_id}
   ============================================================ */

pub async fn list_user_appointments(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(user_id): Path<Uuid>,
) -> Result<Json<ApiOk<Vec<AppointmentDto>>>, ApiError> {
    ensure_owner_or_admin(&auth, user_id)?;

    let rows: Vec<AppointmentRow> = sqlx::query_as::<_, AppointmentRow>(
        r#"
        SELECT appointment_id, user_id, date, time, case_type, status, notes,
               created_at, updated_at
        FROM appointment
        WHERE user_id = $1
        ORDER BY date DESC, time DESC
        "#,
    )
    .bind(user_id)
    .fetch_all(&state.db)
    .await
    .map_err(|e| ApiError::Internal(format!("db error: {e}")))?;

    Ok(Json(ApiOk {
        data: rows.into_iter().map(AppointmentDto::from).collect(),
    }))
}

/* ============================================================
   GET /appointments/{id}
   ============================================================ */

async fn load_appointment(
    state: &AppState,
    appointment_id: Uuid,
) -> Result<AppointmentRow, ApiError> {
    sqlx::query_as::<_, AppointmentRow>(
        r#"
        SELECT appointment_id, user_id, date, time, case_type, status, notes,
               created_at, updated_at
        FROM appointment
        WHERE appointment_id = $1
        "#,
    )
    .bind(appointment_id)
    .fetch_optional(&state.db)
    .await
    .map_err(|e| ApiError::Internal(format!("db error: {e}")))?
    .ok_or_else(ApiError::appointment_not_found)
}

pub async fn get_appointment(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(appointment_id): Path<Uuid>,
) -> Result<Json<ApiOk<AppointmentDto>>, ApiError> {
    let row = load_appointment(&state, appointment_id).await?;
    ensure_owner_or_admin(&auth, row.user_id)?;

    Ok(Json(ApiOk {
        data: AppointmentDto::from(row),
    }))
}

/* ============================================================
   POST /appointments  (create, always pending)
   ============================================================ */

#[derive(Debug, Deserialize)]
pub struct CreateAppointmentRequest {
    pub date: String,
    pub time: String,
    pub case_type: String,
    pub notes: Option<String>,
}

fn validate_notes(notes: Option<&str>) -> Result<Option<String>, ApiError> {
    match notes.map(str::trim) {
        None => Ok(None),
        Some("") => Ok(None),
        Some(n) if n.len() > MAX_NOTES_LEN => Err(ApiError::BadRequest(
            "VALIDATION_ERROR",
            format!("notes too long (max {MAX_NOTES_LEN})"),
        )),
        Some(n) => Ok(Some(n.to_string())),
    }
}

fn parse_case_type(raw: &str) -> Result<CaseType, ApiError> {
    raw.parse::<CaseType>()
        .map_err(|msg| ApiError::BadRequest("VALIDATION_ERROR", msg))
}

pub async fn create_appointment(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(req): Json<CreateAppointmentRequest>,
) -> Result<Json<ApiOk<AppointmentDto>>, ApiError> {
    let today = Utc::now().date_naive();
    let (date, time) = validate_booking(&req.date, &req.time, today)?;
    let case_type = parse_case_type(&req.case_type)?;
    let notes = validate_notes(req.notes.as_deref())?;

    // Booked for the authenticated client; every appointment starts pending.
    let row: AppointmentRow = sqlx::query_as::<_, AppointmentRow>(
        r#"
        INSERT INTO appointment (user_id, date, time, case_type, status, notes)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING appointment_id, user_id, date, time, case_type, status, notes,
                  created_at, updated_at
        "#,
    )
    .bind(auth.user_id)
    .bind(date)
    .bind(time)
    .bind(case_type)
    .bind(AppointmentStatus::Pending)
    .bind(&notes)
    .fetch_one(&state.db)
    .await
    .map_err(|e| ApiError::BadRequest("APPOINTMENT_CREATE_FAILED", format!("{e}")))?;

    tracing::info!(appointment_id = %row.appointment_id, %date, %time, "appointment booked");

    Ok(Json(ApiOk {
        data: AppointmentDto::from(row),
    }))
}

/* ============================================================
   PATCH /appointments/{id}/status
   ============================================================ */

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: String,
}

/// Status machine endpoint. The admin may perform any legal transition; a
/// client may only cancel their own appointment. Validation happens before
/// the single UPDATE, so a rejected request mutates nothing.
pub async fn update_status(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(appointment_id): Path<Uuid>,
    Json(req): Json<UpdateStatusRequest>,
) -> Result<Json<ApiOk<AppointmentDto>>, ApiError> {
    let requested: AppointmentStatus = req
        .status
        .parse()
        .map_err(|e: SchedulingError| ApiError::from(e))?;

    let current = load_appointment(&state, appointment_id).await?;

    if !is_admin(&auth) {
        ensure_owner_or_admin(&auth, current.user_id)?;
        if requested != AppointmentStatus::Cancelled {
            return Err(ApiError::Forbidden(
                "FORBIDDEN",
                "Clients may only cancel their appointments".into(),
            ));
        }
    }

    let next = current.status.transition_to(requested)?;

    let row: AppointmentRow = sqlx::query_as::<_, AppointmentRow>(
        r#"
        UPDATE appointment
        SET status = $2,
            updated_at = now()
        WHERE appointment_id = $1
        RETURNING appointment_id, user_id, date, time, case_type, status, notes,
                  created_at, updated_at
        "#,
    )
    .bind(appointment_id)
    .bind(next)
    .fetch_optional(&state.db)
    .await
    .map_err(|e| ApiError::Internal(format!("db error: {e}")))?
    .ok_or_else(ApiError::appointment_not_found)?;

    tracing::info!(
        appointment_id = %appointment_id,
        from = %current.status,
        to = %next,
        "appointment status changed"
    );

    Ok(Json(ApiOk {
        data: AppointmentDto::from(row),
    }))
}

/* ============================================================
   PATCH /appointments/{id}/reschedule
   ============================================================ */

#[derive(Debug, Deserialize)]
pub struct RescheduleRequest {
    pub date: String,
    pub time: String,
}

/// Moves an appointment to a new validated (date, time) and resets it to
/// pending. Cancelled appointments stay cancelled.
pub async fn reschedule_appointment(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(appointment_id): Path<Uuid>,
    Json(req): Json<RescheduleRequest>,
) -> Result<Json<ApiOk<AppointmentDto>>, ApiError> {
    let current = load_appointment(&state, appointment_id).await?;
    ensure_owner_or_admin(&auth, current.user_id)?;

    if !current.status.can_reschedule() {
        return Err(SchedulingError::IllegalTransition {
            from: current.status,
            to: AppointmentStatus::Pending,
        }
        .into());
    }

    let today = Utc::now().date_naive();
    let (date, time) = validate_booking(&req.date, &req.time, today)?;

    let row: AppointmentRow = sqlx::query_as::<_, AppointmentRow>(
        r#"
        UPDATE appointment
        SET date = $2,
            time = $3,
            status = $4,
            updated_at = now()
        WHERE appointment_id = $1
        RETURNING appointment_id, user_id, date, time, case_type, status, notes,
                  created_at, updated_at
        "#,
    )
    .bind(appointment_id)
    .bind(date)
    .bind(time)
    .bind(AppointmentStatus::Pending)
    .fetch_optional(&state.db)
    .await
    .map_err(|e| ApiError::Internal(format!("db error: {e}")))?
    .ok_or_else(ApiError::appointment_not_found)?;

    tracing::info!(appointment_id = %appointment_id, %date, %time, "appointment rescheduled");

    Ok(Json(ApiOk {
        data: AppointmentDto::from(row),
    }))
}

fn internal_row(e: sqlx::Error) -> ApiError {
    ApiError::Internal(format!("row decode error: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx(role: i16) -> AuthContext {
        AuthContext {
            user_id: Uuid::new_v4(),
            role,
            session_token_id: Uuid::new_v4(),
        }
    }

    #[test]
    fn test_ensure_admin() {
        assert!(ensure_admin(&ctx(ROLE_ADMIN)).is_ok());
        assert!(ensure_admin(&ctx(0)).is_err());
    }

    #[test]
    fn test_ensure_owner_or_admin() {
        let client = ctx(0);
        assert!(ensure_owner_or_admin(&client, client.user_id).is_ok());
        assert!(ensure_owner_or_admin(&client, Uuid::new_v4()).is_err());
        // admin may touch anyone's
        assert!(ensure_owner_or_admin(&ctx(ROLE_ADMIN), Uuid::new_v4()).is_ok());
    }

    #[test]
    fn test_validate_notes() {
        assert_eq!(validate_notes(None).unwrap(), None);
        assert_eq!(validate_notes(Some("   ")).unwrap(), None);
        assert_eq!(
            validate_notes(Some("  custody dispute  ")).unwrap(),
            Some("custody dispute".to_string())
        );
        let long = "x".repeat(MAX_NOTES_LEN + 1);
        assert!(validate_notes(Some(&long)).is_err());
    }

    #[test]
    fn test_parse_case_type_maps_to_validation_error() {
        assert!(parse_case_type("family").is_ok());
        assert!(matches!(
            parse_case_type("tax"),
            Err(ApiError::BadRequest("VALIDATION_ERROR", _))
        ));
    }
}
