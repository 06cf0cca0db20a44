// src/routes/firm_routes.rs

use axum::{
    extract::State,
    routing::{get, patch},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::{
    error::ApiError,
    middleware::auth_context::AuthContext,
    models::{AppState, ROLE_ADMIN},
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/firm", get(get_firm))
        .route("/firm", patch(update_firm))
}

#[derive(Debug, Serialize)]
pub struct FirmResponse {
    pub data: FirmData,
}

#[derive(Debug, Serialize)]
pub struct FirmData {
    pub firm_name: String,
}

pub async fn get_firm(
    State(state): State<AppState>,
    _auth: AuthContext, // require login for now (consistent + simplest)
) -> Result<Json<FirmResponse>, ApiError> {
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

    Ok(Json(FirmResponse {
        data: FirmData {
            firm_name: firm_name.unwrap_or_else(|| "Law Office".to_string()),
        },
    }))
}

#[derive(Debug, Deserialize)]
pub struct UpdateFirmRequest {
    pub firm_name: String,
}

fn ensure_admin(auth: &AuthContext) -> Result<(), ApiError> {
    if auth.role == ROLE_ADMIN {
        Ok(())
    } else {
        Err(ApiError::Forbidden(
            "FORBIDDEN",
            "Only the firm admin can update firm settings".into(),
        ))
    }
}

pub async fn update_firm(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(req): Json<UpdateFirmRequest>,
) -> Result<Json<FirmResponse>, ApiError> {
    ensure_admin(&auth)?;

    let name = req.firm_name.trim();
    if name.is_empty() {
        return Err(ApiError::BadRequest(
            "VALIDATION_ERROR",
            "firm_name is required".into(),
        ));
    }
    if name.len() > 128 {
        return Err(ApiError::BadRequest(
            "VALIDATION_ERROR",
            "firm_name is too long (max 128)".into(),
        ));
    }

    // Upsert singleton row (safe even if missing)
    let firm_name: String = sqlx::query_scalar(
        r#"
        INSERT INTO firm_settings (singleton_id, firm_name)
        VALUES (TRUE, $1)
        ON CONFLICT (singleton_id)
        DO UPDATE SET firm_name = EXCLUDED.firm_name
        RETURNING firm_name
        "#,
    )
    .bind(name)
    .fetch_one(&state.db)
    .await
    .map_err(|e| ApiError::Internal(format!("db error: {e}")))?;

    Ok(Json(FirmResponse {
        data: FirmData { firm_name },
    }))
}
