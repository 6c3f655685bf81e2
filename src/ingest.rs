use serde::{Deserialize, Serialize};
use std::collections::{HashSet, VecDeque};
use std::sync::{Mutex, PoisonError};
use tracing::{debug, info, warn};

use crate::errors::{LedgerError, Result};
use crate::reconciliation::{ReconciliationOutcome, ReconciliationPolicy};
use crate::sessions::CollectionSessionTracker;
use crate::types::SessionStatus;

/// a status notification from the payment processor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessorEvent {
    /// processor-side delivery id; redeliveries reuse it
    pub event_id: String,
    pub external_reference: String,
    pub status: String,
}

impl ProcessorEvent {
    pub fn new(
        event_id: impl Into<String>,
        external_reference: impl Into<String>,
        status: impl Into<String>,
    ) -> Self {
        Self {
            event_id: event_id.into(),
            external_reference: external_reference.into(),
            status: status.into(),
        }
    }
}

/// what ingesting one processor event did
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "receipt", rename_all = "snake_case")]
pub enum IngestReceipt {
    /// event id seen before; nothing re-applied
    Duplicate,
    /// acknowledged without effect
    Ignored { reason: String },
    Applied(ReconciliationOutcome),
}

/// handled event ids, forgetting the oldest past `capacity`
#[derive(Debug)]
struct SeenEvents {
    ids: HashSet<String>,
    order: VecDeque<String>,
    capacity: usize,
}

impl SeenEvents {
    fn new(capacity: usize) -> Self {
        Self {
            ids: HashSet::new(),
            order: VecDeque::new(),
            capacity: capacity.max(1),
        }
    }

    fn contains(&self, event_id: &str) -> bool {
        self.ids.contains(event_id)
    }

    /// returns the id evicted to make room, if any
    fn insert(&mut self, event_id: &str) -> Option<String> {
        if !self.ids.insert(event_id.to_string()) {
            return None;
        }
        self.order.push_back(event_id.to_string());
        if self.order.len() <= self.capacity {
            return None;
        }
        let oldest = self.order.pop_front()?;
        self.ids.remove(&oldest);
        Some(oldest)
    }
}

/// turns processor notifications into session updates and ledger writes
pub struct PaymentEventIngestor {
    tracker: CollectionSessionTracker,
    policy: ReconciliationPolicy,
    seen: Mutex<SeenEvents>,
}

impl PaymentEventIngestor {
    /// remembers up to `max_seen_events` ids from the tracker's config
    pub fn new(tracker: CollectionSessionTracker, policy: ReconciliationPolicy) -> Self {
        let capacity = tracker.context().config.max_seen_events;
        Self {
            tracker,
            policy,
            seen: Mutex::new(SeenEvents::new(capacity)),
        }
    }

    /// Apply one processor event.
    ///
    /// Unknown statuses and illegal transitions are acknowledged as
    /// `Ignored` so the processor stops redelivering them. A session that
    /// does not exist is an error. The event id is only remembered once the
    /// event has been handled, so a failed delivery can be retried. Once an
    /// id is forgotten a redelivery is processed again, which is harmless
    /// because status updates and reconciliation are idempotent.
    pub async fn ingest(&self, event: &ProcessorEvent) -> Result<IngestReceipt> {
        if self.has_seen(&event.event_id) {
            debug!(event_id = %event.event_id, "duplicate processor event");
            return Ok(IngestReceipt::Duplicate);
        }

        let status: SessionStatus = match event.status.parse() {
            Ok(status) => status,
            Err(_) => {
                warn!(event_id = %event.event_id, status = %event.status, "unknown processor status");
                self.remember(&event.event_id);
                return Ok(IngestReceipt::Ignored {
                    reason: format!("unknown status {}", event.status),
                });
            }
        };

        let session = self
            .tracker
            .find_by_external_reference(&event.external_reference)
            .await?;

        let update = match self.tracker.update_status(session.id, status).await {
            Ok(update) => update,
            Err(err @ LedgerError::InvalidTransition { .. }) => {
                warn!(event_id = %event.event_id, error = %err, "processor event ignored");
                self.remember(&event.event_id);
                return Ok(IngestReceipt::Ignored { reason: err.to_string() });
            }
            Err(err) => return Err(err),
        };

        let outcome = self.policy.on_status_change(&update).await?;
        self.remember(&event.event_id);
        info!(
            event_id = %event.event_id,
            session_id = %update.session.id,
            status = %status,
            ledger_written = outcome.mutated(),
            "processor event ingested"
        );
        Ok(IngestReceipt::Applied(outcome))
    }

    fn has_seen(&self, event_id: &str) -> bool {
        self.seen
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(event_id)
    }

    fn remember(&self, event_id: &str) {
        let evicted = self
            .seen
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(event_id);
        if let Some(evicted) = evicted {
            debug!(event_id = %evicted, "forgot oldest processor event id");
        }
    }
}
