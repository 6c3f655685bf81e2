use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::calendar::Period;
use crate::decimal::Money;
use crate::types::{LedgerMutationSource, PropertyId, SessionId, SessionStatus};

/// audit events emitted by ledger and session operations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    // ledger events
    RentMarkedPaid {
        property_id: PropertyId,
        period: Period,
        amount: Money,
        days_covered: Option<u32>,
        source: LedgerMutationSource,
        timestamp: DateTime<Utc>,
    },
    RentMarkedUnpaid {
        property_id: PropertyId,
        period: Period,
        source: LedgerMutationSource,
        timestamp: DateTime<Utc>,
    },
    BulkPaymentApplied {
        property_id: PropertyId,
        start: Period,
        end: Period,
        applied: u32,
        failed: u32,
        timestamp: DateTime<Utc>,
    },

    // session events
    SessionCreated {
        session_id: SessionId,
        property_id: PropertyId,
        amount: Money,
        is_recurring: bool,
        timestamp: DateTime<Utc>,
    },
    SessionStatusChanged {
        session_id: SessionId,
        old_status: SessionStatus,
        new_status: SessionStatus,
        timestamp: DateTime<Utc>,
    },
    SessionTransitionRejected {
        session_id: SessionId,
        from: SessionStatus,
        to: SessionStatus,
        timestamp: DateTime<Utc>,
    },

    // reconciliation events
    PaymentReconciled {
        session_id: SessionId,
        property_id: PropertyId,
        period: Period,
        amount: Money,
        prior_amount: Option<Money>,
        timestamp: DateTime<Utc>,
    },
}

/// append-only event log shared between components
#[derive(Debug, Default)]
pub struct EventStore {
    events: Mutex<Vec<Event>>,
}

impl EventStore {
    pub fn new() -> Self {
        Self {
            events: Mutex::new(Vec::new()),
        }
    }

    fn guard(&self) -> MutexGuard<'_, Vec<Event>> {
        self.events.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn emit(&self, event: Event) {
        self.guard().push(event);
    }

    pub fn take_events(&self) -> Vec<Event> {
        std::mem::take(&mut *self.guard())
    }

    /// copy of everything recorded so far
    pub fn events(&self) -> Vec<Event> {
        self.guard().clone()
    }

    pub fn len(&self) -> usize {
        self.guard().len()
    }

    pub fn is_empty(&self) -> bool {
        self.guard().is_empty()
    }

    pub fn count_where(&self, predicate: impl Fn(&Event) -> bool) -> usize {
        self.guard().iter().filter(|e| predicate(e)).count()
    }

    pub fn clear(&self) {
        self.guard().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_emit_and_take() {
        let store = EventStore::new();
        let property_id = Uuid::new_v4();
        let period = Period::new(2024, 1).unwrap();

        store.emit(Event::RentMarkedUnpaid {
            property_id,
            period,
            source: LedgerMutationSource::Manual,
            timestamp: Utc::now(),
        });
        assert_eq!(store.len(), 1);
        assert_eq!(
            store.count_where(|e| matches!(e, Event::RentMarkedUnpaid { .. })),
            1
        );

        let taken = store.take_events();
        assert_eq!(taken.len(), 1);
        assert!(store.is_empty());
    }
}
