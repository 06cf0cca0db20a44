// src/routes/report_routes.rs

use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::Row;

use crate::{
    error::ApiError,
    middleware::auth_context::AuthContext,
    models::{AppState, ROLE_ADMIN},
    scheduling::{
        slots::parse_date,
        status::{AppointmentStatus, CaseType},
    },
};

pub fn router() -> Router<AppState> {
    Router::new().route("/summary", get(get_summary))
}

#[derive(Debug, Deserialize)]
pub struct SummaryQuery {
    /// Inclusive date range; either bound may be omitted.
    pub from: Option<String>,
    pub to: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SummaryResponse {
    pub data: SummaryData,
}

#[derive(Debug, Serialize)]
pub struct SummaryData {
    pub total: i64,
    pub by_status: StatusCounts,
    pub by_case_type: Vec<CaseTypeCount>,
}

#[derive(Debug, Default, Serialize)]
pub struct StatusCounts {
    pub pending: i64,
    pub confirmed: i64,
    pub completed: i64,
    pub cancelled: i64,
}

#[derive(Debug, Serialize)]
pub struct CaseTypeCount {
    pub case_type: CaseType,
    pub count: i64,
}

/// GET /api/v1/reports/summary?from=&to=
/// Aggregate appointment counts for the admin dashboard charts.
pub async fn get_summary(
    State(state): State<AppState>,
    auth: AuthContext,
    Query(q): Query<SummaryQuery>,
) -> Result<Json<SummaryResponse>, ApiError> {
    if auth.role != ROLE_ADMIN {
        return Err(ApiError::Forbidden(
            "FORBIDDEN",
            "Only the firm admin can view reports".into(),
        ));
    }

    let from: Option<NaiveDate> = match q.from.as_deref() {
        Some(raw) => Some(parse_date(raw)?),
        None => None,
    };
    let to: Option<NaiveDate> = match q.to.as_deref() {
        Some(raw) => Some(parse_date(raw)?),
        None => None,
    };
    if let (Some(f), Some(t)) = (from, to) {
        if f > t {
            return Err(ApiError::BadRequest(
                "VALIDATION_ERROR",
                "from must not be after to".into(),
            ));
        }
    }

    let status_rows = sqlx::query(
        r#"
        SELECT status, COUNT(*) AS n
        FROM appointment
        WHERE ($1::date IS NULL OR date >= $1)
          AND ($2::date IS NULL OR date <= $2)
        GROUP BY status
        "#,
    )
    .bind(from)
    .bind(to)
    .fetch_all(&state.db)
    .await
    .map_err(|e| ApiError::Internal(format!("db error: {e}")))?;

    let mut total: i64 = 0;
    let mut by_status = StatusCounts::default();
    for r in status_rows {
        let status: AppointmentStatus = r.try_get("status").map_err(internal_row)?;
        let n: i64 = r.try_get("n").map_err(internal_row)?;
        total += n;
        match status {
            AppointmentStatus::Pending => by_status.pending = n,
            AppointmentStatus::Confirmed => by_status.confirmed = n,
            AppointmentStatus::Completed => by_status.completed = n,
            AppointmentStatus::Cancelled => by_status.cancelled = n,
            AppointmentStatus::Rescheduled => {}
        }
    }

    let case_rows = sqlx::query(
        r#"
        SELECT case_type, COUNT(*) AS n
        FROM appointment
        WHERE ($1::date IS NULL OR date >= $1)
          AND ($2::date IS NULL OR date <= $2)
        GROUP BY case_type
        ORDER BY n DESC, case_type ASC
        "#,
    )
    .bind(from)
    .bind(to)
    .fetch_all(&state.db)
    .await
    .map_err(|e| ApiError::Internal(format!("db error: {e}")))?;

    let mut by_case_type = Vec::with_capacity(case_rows.len());
    for r in case_rows {
        by_case_type.push(CaseTypeCount {
            case_type: r.try_get("case_type").map_err(internal_row)?,
            count: r.try_get("n").map_err(internal_row)?,
        });
    }

    Ok(Json(SummaryResponse {
        data: SummaryData {
            total,
            by_status,
            by_case_type,
        },
    }))
}

fn internal_row(e: sqlx::Error) -> ApiError {
    ApiError::Internal(format!("row decode error: {e}"))
}
