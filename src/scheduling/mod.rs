// src/scheduling/mod.rs
//
// Booking domain core: office-hours slot generation and the appointment
// status lifecycle. Pure logic, no DB access — routes call into this and
// map SchedulingError onto the API error envelope.

pub mod slots;
pub mod status;

use thiserror::Error;

use crate::scheduling::status::AppointmentStatus;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchedulingError {
    #[error("invalid appointment date: {0}")]
    InvalidDate(String),
    #[error("{0} is not a bookable time slot for the requested date")]
    InvalidTime(String),
    #[error("unknown appointment status: {0}")]
    InvalidStatus(String),
    #[error("status cannot change from {from} to {to}")]
    IllegalTransition {
        from: AppointmentStatus,
        to: AppointmentStatus,
    },
}
