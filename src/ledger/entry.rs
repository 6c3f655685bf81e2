use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::calendar::Period;
use crate::decimal::Money;
use crate::types::{LedgerMutationSource, LedgerStatus, PropertyId, SessionId};

/// rent status for one property-month; unique per (property_id, period)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RentLedgerEntry {
    pub property_id: PropertyId,
    pub period: Period,
    pub amount: Money,
    pub status: LedgerStatus,
    pub paid_date: Option<NaiveDate>,
    pub days_covered: Option<u32>,
    pub move_in_date: Option<NaiveDate>,
    pub move_out_date: Option<NaiveDate>,
    pub notes: Option<String>,
    /// writer of the current row state
    pub source: LedgerMutationSource,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl RentLedgerEntry {
    /// blank unpaid row for a period
    pub fn unpaid(property_id: PropertyId, period: Period, timestamp: DateTime<Utc>) -> Self {
        Self {
            property_id,
            period,
            amount: Money::ZERO,
            status: LedgerStatus::Unpaid,
            paid_date: None,
            days_covered: None,
            move_in_date: None,
            move_out_date: None,
            notes: None,
            source: LedgerMutationSource::Manual,
            created_at: timestamp,
            updated_at: timestamp,
        }
    }

    pub fn year(&self) -> i32 {
        self.period.year()
    }

    pub fn month(&self) -> u32 {
        self.period.month()
    }

    pub fn is_paid(&self) -> bool {
        self.status == LedgerStatus::Paid
    }

    /// carries partial-month metadata
    pub fn has_proration(&self) -> bool {
        self.days_covered.is_some() || self.move_in_date.is_some() || self.move_out_date.is_some()
    }

    /// session that produced the current row, if any
    pub fn reconciled_session(&self) -> Option<SessionId> {
        self.source.session_id()
    }

    /// whether this row already records the given session
    pub fn references_session(&self, session_id: SessionId) -> bool {
        if self.reconciled_session() == Some(session_id) {
            return true;
        }
        let needle = session_id.to_string();
        self.notes.as_deref().is_some_and(|n| n.contains(&needle))
    }

    pub(crate) fn clear_payment(&mut self) {
        self.status = LedgerStatus::Unpaid;
        self.paid_date = None;
        self.days_covered = None;
        self.move_in_date = None;
        self.move_out_date = None;
    }

    /// income contributed to its month: Paid rows only
    pub fn income(&self) -> Money {
        if self.is_paid() {
            self.amount
        } else {
            Money::ZERO
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_references_session_by_source_or_note() {
        let session_id = Uuid::new_v4();
        let mut entry = RentLedgerEntry::unpaid(Uuid::new_v4(), Period::new(2024, 1).unwrap(), Utc::now());
        assert!(!entry.references_session(session_id));

        entry.notes = Some(format!("collected via session {}", session_id));
        assert!(entry.references_session(session_id));

        entry.notes = None;
        entry.source = LedgerMutationSource::Reconciliation { session_id };
        assert!(entry.references_session(session_id));
    }

    #[test]
    fn test_unpaid_contributes_no_income() {
        let mut entry = RentLedgerEntry::unpaid(Uuid::new_v4(), Period::new(2024, 1).unwrap(), Utc::now());
        entry.amount = Money::from_major(1500);
        assert_eq!(entry.income(), Money::ZERO);

        entry.status = LedgerStatus::Paid;
        assert_eq!(entry.income(), Money::from_major(1500));
    }
}
