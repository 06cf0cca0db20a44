use axum::{Json, Router, extract::State, routing::get};

use crate::error::ApiError;
use crate::middleware::auth_context::AuthContext;
use crate::models::{role_to_string, AppState};

#[derive(serde::Serialize)]
pub struct HomeResponse {
    pub data: HomeData,
}

#[derive(serde::Serialize)]
pub struct HomeData {
    pub view: String,
    pub message: String,
}

pub fn router() -> Router<AppState> {
    Router::new().route("/home", get(home))
}

pub async fn home(
    State(_state): State<AppState>,
    auth: AuthContext,
) -> Result<Json<HomeResponse>, ApiError> {
    // role smallint: 0 client, 1 admin
    let view = role_to_string(auth.role);

    Ok(Json(HomeResponse {
        data: HomeData {
            view,
            message: "placeholder home payload (role-based)".to_string(),
        },
    }))
}
