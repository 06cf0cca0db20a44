// src/scheduling/status.rs

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::scheduling::SchedulingError;

/// Appointment lifecycle states. Stored as smallint, serialized as the
/// lowercase strings the frontend already uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "smallint")]
#[serde(rename_all = "snake_case")]
#[repr(i16)]
pub enum AppointmentStatus {
    Pending = 0,
    Confirmed = 1,
    Completed = 2,
    Cancelled = 3,
    /// Reserved in the enumeration; no transition produces it.
    Rescheduled = 4,
}

impl AppointmentStatus {
    pub const ALL: [AppointmentStatus; 5] = [
        AppointmentStatus::Pending,
        AppointmentStatus::Confirmed,
        AppointmentStatus::Completed,
        AppointmentStatus::Cancelled,
        AppointmentStatus::Rescheduled,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            AppointmentStatus::Pending => "pending",
            AppointmentStatus::Confirmed => "confirmed",
            AppointmentStatus::Completed => "completed",
            AppointmentStatus::Cancelled => "cancelled",
            AppointmentStatus::Rescheduled => "rescheduled",
        }
    }

    /// Legal admin/client status transitions:
    ///   pending   -> confirmed | completed
    ///   confirmed -> completed
    ///   any non-cancelled -> cancelled
    /// Cancelled is terminal. Nothing transitions *into* pending here;
    /// only a reschedule resets to pending (see `can_reschedule`).
    pub fn can_transition_to(self, next: AppointmentStatus) -> bool {
        use AppointmentStatus::*;
        match (self, next) {
            (Pending, Confirmed) => true,
            (Pending, Completed) => true,
            (Confirmed, Completed) => true,
            (from, Cancelled) => from != Cancelled,
            _ => false,
        }
    }

    pub fn transition_to(
        self,
        next: AppointmentStatus,
    ) -> Result<AppointmentStatus, SchedulingError> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(SchedulingError::IllegalTransition {
                from: self,
                to: next,
            })
        }
    }

    /// Rescheduling moves any live appointment back to pending with a new
    /// date/time. A cancelled appointment stays cancelled.
    pub fn can_reschedule(self) -> bool {
        self != AppointmentStatus::Cancelled
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AppointmentStatus {
    type Err = SchedulingError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim() {
            "pending" => Ok(AppointmentStatus::Pending),
            "confirmed" => Ok(AppointmentStatus::Confirmed),
            "completed" => Ok(AppointmentStatus::Completed),
            "cancelled" => Ok(AppointmentStatus::Cancelled),
            "rescheduled" => Ok(AppointmentStatus::Rescheduled),
            other => Err(SchedulingError::InvalidStatus(other.to_string())),
        }
    }
}

/// Legal matter categories, fixed enumeration. Same storage/wire treatment
/// as the status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "smallint")]
#[serde(rename_all = "snake_case")]
#[repr(i16)]
pub enum CaseType {
    Corporate = 0,
    Family = 1,
    Civil = 2,
    Criminal = 3,
    RealEstate = 4,
    IntellectualProperty = 5,
}

impl CaseType {
    pub fn as_str(self) -> &'static str {
        match self {
            CaseType::Corporate => "corporate",
            CaseType::Family => "family",
            CaseType::Civil => "civil",
            CaseType::Criminal => "criminal",
            CaseType::RealEstate => "real_estate",
            CaseType::IntellectualProperty => "intellectual_property",
        }
    }
}

impl fmt::Display for CaseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CaseType {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim() {
            "corporate" => Ok(CaseType::Corporate),
            "family" => Ok(CaseType::Family),
            "civil" => Ok(CaseType::Civil),
            "criminal" => Ok(CaseType::Criminal),
            "real_estate" => Ok(CaseType::RealEstate),
            "intellectual_property" => Ok(CaseType::IntellectualProperty),
            other => Err(format!("unknown case type: {other}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use AppointmentStatus::*;

    #[test]
    fn test_admin_transitions() {
        assert!(Pending.can_transition_to(Confirmed));
        assert!(Pending.can_transition_to(Completed));
        assert!(Confirmed.can_transition_to(Completed));

        assert!(!Confirmed.can_transition_to(Confirmed));
        assert!(!Completed.can_transition_to(Confirmed));
        assert!(!Completed.can_transition_to(Pending));
        assert!(!Confirmed.can_transition_to(Pending));
    }

    #[test]
    fn test_any_live_state_can_cancel() {
        assert!(Pending.can_transition_to(Cancelled));
        assert!(Confirmed.can_transition_to(Cancelled));
        assert!(Completed.can_transition_to(Cancelled));
        assert!(Rescheduled.can_transition_to(Cancelled));
    }

    #[test]
    fn test_cancelled_is_terminal() {
        for next in AppointmentStatus::ALL {
            assert!(
                !Cancelled.can_transition_to(next),
                "cancelled must not reach {next}"
            );
        }
        assert!(!Cancelled.can_reschedule());
    }

    #[test]
    fn test_rescheduled_is_unreachable() {
        for from in AppointmentStatus::ALL {
            assert!(!from.can_transition_to(Rescheduled));
        }
    }

    #[test]
    fn test_transition_to_reports_illegal_pair() {
        let err = Cancelled.transition_to(Completed).unwrap_err();
        assert_eq!(
            err,
            SchedulingError::IllegalTransition {
                from: Cancelled,
                to: Completed,
            }
        );
        assert_eq!(Pending.transition_to(Confirmed).unwrap(), Confirmed);
    }

    #[test]
    fn test_reschedule_allowed_from_live_states() {
        assert!(Pending.can_reschedule());
        assert!(Confirmed.can_reschedule());
        assert!(Completed.can_reschedule());
    }

    #[test]
    fn test_status_round_trips_through_strings() {
        for s in AppointmentStatus::ALL {
            assert_eq!(s.as_str().parse::<AppointmentStatus>().unwrap(), s);
        }
        assert!(matches!(
            "archived".parse::<AppointmentStatus>(),
            Err(SchedulingError::InvalidStatus(_))
        ));
        assert!(matches!(
            "".parse::<AppointmentStatus>(),
            Err(SchedulingError::InvalidStatus(_))
        ));
    }

    #[test]
    fn test_case_type_parsing() {
        assert_eq!("real_estate".parse::<CaseType>().unwrap(), CaseType::RealEstate);
        assert_eq!(
            "intellectual_property".parse::<CaseType>().unwrap(),
            CaseType::IntellectualProperty
        );
        assert!("maritime".parse::<CaseType>().is_err());
    }

    #[test]
    fn test_wire_format_is_snake_case() {
        assert_eq!(
            serde_json::to_string(&AppointmentStatus::Pending).unwrap(),
            "\"pending\""
        );
        assert_eq!(
            serde_json::to_string(&CaseType::IntellectualProperty).unwrap(),
            "\"intellectual_property\""
        );
        let s: AppointmentStatus = serde_json::from_str("\"cancelled\"").unwrap();
        assert_eq!(s, AppointmentStatus::Cancelled);
    }
}
