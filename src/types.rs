use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::decimal::Money;
use crate::errors::{LedgerError, Result};

/// unique identifier for a property
pub type PropertyId = Uuid;

/// unique identifier for a collection session
pub type SessionId = Uuid;

/// property as seen by the ledger (read-only)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Property {
    pub id: PropertyId,
    pub monthly_rent: Money,
    /// day of month rent is due, 1..=31
    pub rent_due_day: u32,
    pub tenant_present: bool,
}

impl Property {
    pub fn new(id: PropertyId, monthly_rent: Money, rent_due_day: u32, tenant_present: bool) -> Result<Self> {
        if !(1..=31).contains(&rent_due_day) {
            return Err(LedgerError::InvalidConfiguration {
                message: format!("rent_due_day must be within 1..=31, got {}", rent_due_day),
            });
        }
        if monthly_rent.as_decimal().is_sign_negative() {
            return Err(LedgerError::InvalidAmount { amount: monthly_rent });
        }
        Ok(Self {
            id,
            monthly_rent,
            rent_due_day,
            tenant_present,
        })
    }
}

/// ledger status as stored
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LedgerStatus {
    Paid,
    Unpaid,
    Partial,
}

/// who performed a ledger write
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LedgerMutationSource {
    /// landlord action in the ui
    Manual,
    /// processor-confirmed collection session
    Reconciliation { session_id: SessionId },
}

impl LedgerMutationSource {
    pub fn session_id(&self) -> Option<SessionId> {
        match self {
            LedgerMutationSource::Manual => None,
            LedgerMutationSource::Reconciliation { session_id } => Some(*session_id),
        }
    }
}

/// collection session status as reported by the processor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Open,
    Paid,
    PastDue,
    Expired,
    Canceled,
}

impl SessionStatus {
    /// terminal states absorb every later transition
    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionStatus::Paid | SessionStatus::Expired | SessionStatus::Canceled)
    }

    /// whether `self -> next` is a legal move (same-state is handled by the caller)
    pub fn can_transition_to(&self, next: SessionStatus) -> bool {
        match (self, next) {
            (_, SessionStatus::Open) => false,
            (SessionStatus::Open, _) => true,
            (SessionStatus::PastDue, SessionStatus::PastDue) => false,
            (SessionStatus::PastDue, _) => true,
            _ => false,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Open => "open",
            SessionStatus::Paid => "paid",
            SessionStatus::PastDue => "past_due",
            SessionStatus::Expired => "expired",
            SessionStatus::Canceled => "canceled",
        }
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SessionStatus {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "open" => Ok(SessionStatus::Open),
            "paid" => Ok(SessionStatus::Paid),
            "past_due" => Ok(SessionStatus::PastDue),
            "expired" => Ok(SessionStatus::Expired),
            "canceled" | "cancelled" => Ok(SessionStatus::Canceled),
            other => Err(LedgerError::UnknownStatus {
                status: other.to_string(),
            }),
        }
    }
}

/// read-side rent classification for a property-month
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RentStatus {
    Paid,
    Partial,
    Unpaid,
    Overdue,
}
