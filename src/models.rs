use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::scheduling::status::{AppointmentStatus, CaseType};

#[derive(Clone)]
pub struct AppState {
    pub db: sqlx::PgPool,
    pub session_ttl_hours: i64,
    pub admin_email: String,
}

/* -------------------------
   API DTOs
--------------------------*/

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
    pub device_name: Option<String>,
    pub remember_me: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub full_name: String,
    pub phone: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub data: LoginResponseData,
}

#[derive(Debug, Serialize)]
pub struct LoginResponseData {
    pub access_token: String,
    pub expires_at: DateTime<Utc>,
    pub user: UserProfile,
    pub firm: FirmProfile,
}

#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub data: MeResponseData,
}

#[derive(Debug, Serialize)]
pub struct MeResponseData {
    pub user: UserProfile,
    pub firm: FirmProfile,
    pub session: SessionInfo,
}

#[derive(Debug, Serialize)]
pub struct OkResponse {
    pub data: OkData,
}

#[derive(Debug, Serialize)]
pub struct OkData {
    pub ok: bool,
}

#[derive(Debug, Serialize)]
pub struct UserProfile {
    pub user_id: Uuid,
    pub email: String,
    pub full_name: String,
    pub role: String,
    pub phone: Option<String>,
    pub show_cancelled: bool,
}

#[derive(Debug, Serialize)]
pub struct FirmProfile {
    pub firm_name: String,
}

#[derive(Debug, Serialize)]
pub struct SessionInfo {
    pub session_token_id: Uuid,
    pub expires_at: DateTime<Utc>,
}

/* -------------------------
   DB Row Models
--------------------------*/

#[derive(Debug, sqlx::FromRow)]
pub struct UserRow {
    pub user_id: Uuid,
    pub email: String,
    pub full_name: String,
    pub password_hash: String,
    pub role: i16,
    pub phone: Option<String>,
    pub show_cancelled: bool,
    pub is_active: bool,
}

impl UserRow {
    pub fn profile(&self) -> UserProfile {
        UserProfile {
            user_id: self.user_id,
            email: self.email.clone(),
            full_name: self.full_name.clone(),
            role: role_to_string(self.role),
            phone: self.phone.clone(),
            show_cancelled: self.show_cancelled,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
pub struct SessionTokenRow {
    pub session_token_id: Uuid,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct AppointmentRow {
    pub appointment_id: Uuid,
    pub user_id: Uuid,
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub case_type: CaseType,
    pub status: AppointmentStatus,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/* -------------------------
   Helpers
--------------------------*/

pub const ROLE_CLIENT: i16 = 0;
pub const ROLE_ADMIN: i16 = 1;

pub fn role_to_string(role: i16) -> String {
    match role {
        ROLE_CLIENT => "client",
        ROLE_ADMIN => "admin",
        _ => "unknown",
    }
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_mapping() {
        assert_eq!(role_to_string(ROLE_CLIENT), "client");
        assert_eq!(role_to_string(ROLE_ADMIN), "admin");
        assert_eq!(role_to_string(7), "unknown");
    }
}
