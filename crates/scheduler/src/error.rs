use thiserror::Error;

/// Why a schedule does not produce an activation instant.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ScheduleError {
    #[error("scheduling is disabled")]
    Disabled,
    #[error("no scheduled time configured")]
    MissingTime,
    #[error("scheduled time {0:?} is not a valid 24-hour HH:MM")]
    InvalidTime(String),
    #[error("scheduled time {0} does not exist in the local time zone")]
    NonexistentLocalTime(String),
}
