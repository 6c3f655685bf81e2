use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::calendar::Period;
use crate::decimal::Money;
use crate::types::{PropertyId, SessionId, SessionStatus};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum LedgerError {
    #[error("invalid coverage: {message}")]
    InvalidCoverage {
        message: String,
    },

    #[error("invalid range: {start} is after {end}")]
    InvalidRange {
        start: Period,
        end: Period,
    },

    #[error("invalid range: {periods} periods exceeds the limit of {limit}")]
    RangeTooLong {
        periods: u32,
        limit: u32,
    },

    #[error("invalid session transition for {session_id}: {from} -> {to}")]
    InvalidTransition {
        session_id: SessionId,
        from: SessionStatus,
        to: SessionStatus,
    },

    #[error("stale write for property {property_id} period {period}: expected {expected:?}, found {actual:?}")]
    StaleWrite {
        property_id: PropertyId,
        period: Period,
        expected: Option<DateTime<Utc>>,
        actual: Option<DateTime<Utc>>,
    },

    #[error("{entity} not found: {id}")]
    NotFound {
        entity: &'static str,
        id: String,
    },

    #[error("invalid period: {year}-{month}")]
    InvalidPeriod {
        year: i32,
        month: u32,
    },

    #[error("invalid amount: {amount}")]
    InvalidAmount {
        amount: Money,
    },

    #[error("proration mismatch: {amount} does not cover {days_covered} days (expected {expected})")]
    ProrationMismatch {
        amount: Money,
        expected: Money,
        days_covered: u32,
    },

    #[error("unknown session status: {status}")]
    UnknownStatus {
        status: String,
    },

    #[error("unsupported currency: {currency}")]
    UnsupportedCurrency {
        currency: String,
    },

    #[error("invalid configuration: {message}")]
    InvalidConfiguration {
        message: String,
    },

    #[error("storage error: {message}")]
    Storage {
        message: String,
    },
}

/// stable discriminant for mapping errors to user-facing messages
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidCoverage,
    InvalidRange,
    InvalidTransition,
    StaleWrite,
    NotFound,
    UnknownStatus,
    Validation,
    Storage,
}

impl LedgerError {
    pub fn property_not_found(id: PropertyId) -> Self {
        LedgerError::NotFound {
            entity: "property",
            id: id.to_string(),
        }
    }

    pub fn session_not_found(id: impl ToString) -> Self {
        LedgerError::NotFound {
            entity: "collection session",
            id: id.to_string(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            LedgerError::InvalidCoverage { .. } => ErrorKind::InvalidCoverage,
            LedgerError::InvalidRange { .. } | LedgerError::RangeTooLong { .. } => ErrorKind::InvalidRange,
            LedgerError::InvalidTransition { .. } => ErrorKind::InvalidTransition,
            LedgerError::StaleWrite { .. } => ErrorKind::StaleWrite,
            LedgerError::NotFound { .. } => ErrorKind::NotFound,
            LedgerError::UnknownStatus { .. } => ErrorKind::UnknownStatus,
            LedgerError::InvalidPeriod { .. }
            | LedgerError::InvalidAmount { .. }
            | LedgerError::ProrationMismatch { .. }
            | LedgerError::UnsupportedCurrency { .. }
            | LedgerError::InvalidConfiguration { .. } => ErrorKind::Validation,
            LedgerError::Storage { .. } => ErrorKind::Storage,
        }
    }
}

pub type Result<T> = std::result::Result<T, LedgerError>;

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_messages_name_the_kind() {
        let err = LedgerError::InvalidRange {
            start: Period::new(2024, 3).unwrap(),
            end: Period::new(2024, 1).unwrap(),
        };
        assert_eq!(err.to_string(), "invalid range: 2024-03 is after 2024-01");
        assert_eq!(err.kind(), ErrorKind::InvalidRange);

        let err = LedgerError::property_not_found(Uuid::nil());
        assert!(err.to_string().starts_with("property not found"));
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }
}
