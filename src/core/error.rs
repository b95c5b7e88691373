//! Error types for booking operations.

use thiserror::Error;

/// Reasons a reservation transition conflicts with existing state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ConflictKind {
    /// The user already holds a reservation for this slot on the active day.
    #[error("already reserved here")]
    AlreadyReserved,
    /// The post-insert verification found the bucket over capacity.
    #[error("capacity exhausted by concurrency")]
    CapacityExhausted,
    /// Cancel was requested but no matching reservation exists.
    #[error("no reservation here")]
    NotReserved,
    /// The active day's cutoff passed while the reservation was being taken.
    #[error("booking for this day has closed")]
    DayClosed,
}

/// Errors produced by the booking core.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BookingError {
    /// Input rejected before any store access.
    #[error("{0}")]
    Validation(String),
    /// A referenced entity does not exist.
    #[error("{0}")]
    NotFound(String),
    /// The transition conflicts with stored reservations.
    #[error(transparent)]
    Conflict(#[from] ConflictKind),
    /// The user's gender cannot be charged against either capacity bucket, or
    /// the session and the user directory disagree on it.
    #[error("user gender cannot be mapped to a capacity bucket")]
    UnclassifiedGender,
    /// Backend-specific failure with context.
    #[error("backend error: {0}")]
    Backend(String),
}

impl BookingError {
    /// Shorthand for a validation failure.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Shorthand for a lookup miss.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    /// Shorthand for a backend failure.
    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend(message.into())
    }

    /// Stable machine-readable code for API payloads.
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "VALIDATION",
            Self::NotFound(_) => "NOT_FOUND",
            Self::Conflict(ConflictKind::AlreadyReserved) => "ALREADY_RESERVED",
            Self::Conflict(ConflictKind::CapacityExhausted) => "CAPACITY_EXHAUSTED",
            Self::Conflict(ConflictKind::NotReserved) => "NOT_RESERVED",
            Self::Conflict(ConflictKind::DayClosed) => "DAY_CLOSED",
            Self::UnclassifiedGender => "UNCLASSIFIED_GENDER",
            Self::Backend(_) => "BACKEND",
        }
    }
}

/// Result alias for booking-core operations.
pub type BookingResult<T> = Result<T, BookingError>;

/// Application-facing result using anyhow for higher-level contexts.
pub type AppResult<T> = Result<T, anyhow::Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conflict_messages_are_client_facing() {
        let err = BookingError::from(ConflictKind::CapacityExhausted);
        assert_eq!(err.to_string(), "capacity exhausted by concurrency");
        assert_eq!(err.code(), "CAPACITY_EXHAUSTED");
    }

    #[test]
    fn backend_errors_carry_context() {
        let err = BookingError::backend("connection refused");
        assert_eq!(err.to_string(), "backend error: connection refused");
    }
}
