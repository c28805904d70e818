use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use shared_database::StoreError;
use shared_models::error::AppError;
use shared_models::records::AppointmentStatus;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookAppointmentRequest {
    pub doctor_id: uuid::Uuid,
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: AppointmentStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReprogramRequest {
    pub date: NaiveDate,
    pub time: NaiveTime,
}

#[derive(Debug, Error)]
pub enum AppointmentError {
    #[error("patient profile not found")]
    PatientProfileNotFound,

    #[error("doctor not found")]
    DoctorNotFound,

    #[error("doctor is not accepting bookings")]
    DoctorUnavailable,

    #[error("appointment not found")]
    AppointmentNotFound,

    #[error("cannot book in the past")]
    PastBooking,

    #[error("appointment window does not fit within the day")]
    InvalidWindow,

    #[error("time must fall on a whole minute")]
    SubMinuteTime,

    #[error("cannot change a {0} appointment")]
    TerminalStatus(AppointmentStatus),

    #[error("transition from {from} to {to} is not allowed")]
    InvalidTransition {
        from: AppointmentStatus,
        to: AppointmentStatus,
    },

    #[error("not authorized for this appointment")]
    NotAuthorized,

    #[error("appointment was modified concurrently, retry")]
    ConcurrentUpdate,

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<AppointmentError> for AppError {
    fn from(err: AppointmentError) -> Self {
        match err {
            AppointmentError::PatientProfileNotFound
            | AppointmentError::DoctorNotFound
            | AppointmentError::AppointmentNotFound => AppError::NotFound(err.to_string()),
            AppointmentError::PastBooking
            | AppointmentError::InvalidWindow
            | AppointmentError::SubMinuteTime
            | AppointmentError::TerminalStatus(_)
            | AppointmentError::InvalidTransition { .. } => AppError::Validation(err.to_string()),
            AppointmentError::NotAuthorized => AppError::Forbidden(err.to_string()),
            AppointmentError::DoctorUnavailable | AppointmentError::ConcurrentUpdate => {
                AppError::Conflict(err.to_string())
            }
            AppointmentError::Store(store_err) => match store_err {
                StoreError::NoCoveringSlot | StoreError::AlreadyBooked => {
                    AppError::Conflict(store_err.to_string())
                }
                StoreError::StaleStatus => AppError::Conflict(store_err.to_string()),
                StoreError::AppointmentNotFound
                | StoreError::DoctorNotFound
                | StoreError::PatientNotFound => AppError::NotFound(store_err.to_string()),
                other => AppError::Database(other.to_string()),
            },
        }
    }
}
