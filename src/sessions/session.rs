use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::calendar::Period;
use crate::decimal::Money;
use crate::types::{PropertyId, SessionId, SessionStatus};

/// one externally hosted checkout attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionSession {
    pub id: SessionId,
    pub property_id: PropertyId,
    pub tenant_email: Option<String>,
    pub amount: Money,
    pub currency: String,
    pub is_recurring: bool,
    pub due_date: Option<NaiveDate>,
    pub status: SessionStatus,
    /// processor-side identifier used by webhooks
    pub external_reference: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CollectionSession {
    /// ledger period this session pays for: due date month, else creation month
    pub fn ledger_period(&self) -> Period {
        match self.due_date {
            Some(due) => Period::containing(due),
            None => Period::containing(self.created_at.date_naive()),
        }
    }
}

/// request to open a new collection session
#[derive(Debug, Clone, PartialEq)]
pub struct NewSession {
    pub property_id: PropertyId,
    pub amount: Money,
    pub currency: String,
    pub tenant_email: Option<String>,
    pub due_date: Option<NaiveDate>,
    pub is_recurring: bool,
    pub external_reference: Option<String>,
}

impl NewSession {
    pub fn new(property_id: PropertyId, amount: Money, currency: impl Into<String>) -> Self {
        Self {
            property_id,
            amount,
            currency: currency.into(),
            tenant_email: None,
            due_date: None,
            is_recurring: false,
            external_reference: None,
        }
    }

    pub fn tenant_email(mut self, email: impl Into<String>) -> Self {
        self.tenant_email = Some(email.into());
        self
    }

    pub fn due_date(mut self, due: NaiveDate) -> Self {
        self.due_date = Some(due);
        self
    }

    pub fn recurring(mut self, is_recurring: bool) -> Self {
        self.is_recurring = is_recurring;
        self
    }

    /// reference issued by the processor; generated when absent
    pub fn external_reference(mut self, reference: impl Into<String>) -> Self {
        self.external_reference = Some(reference.into());
        self
    }
}

pub(crate) fn generate_external_reference() -> String {
    format!("cs_{}", Uuid::new_v4().simple())
}

/// result of a status update
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusUpdate {
    pub session: CollectionSession,
    pub previous: SessionStatus,
    /// false when the update repeated the current status
    pub changed: bool,
}

impl StatusUpdate {
    /// a fresh transition into `paid`
    pub fn newly_paid(&self) -> bool {
        self.changed && self.session.status == SessionStatus::Paid
    }
}
