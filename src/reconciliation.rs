use serde::Serialize;
use tracing::{debug, info, warn};

use crate::calendar::Period;
use crate::decimal::Money;
use crate::errors::{LedgerError, Result};
use crate::events::Event;
use crate::ledger::{PaymentDetails, RentLedger, RentLedgerEntry};
use crate::sessions::{CollectionSession, StatusUpdate};
use crate::store::RowExpectation;
use crate::types::{LedgerMutationSource, SessionStatus};

/// what reconciling a session did to the ledger
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ReconciliationOutcome {
    /// the session is not `paid`
    Skipped { status: SessionStatus },
    /// the period already records this session
    AlreadyReconciled { entry: RentLedgerEntry },
    Recorded { entry: RentLedgerEntry },
    /// replaced a different paid amount; both amounts are in the notes
    Overwrote { entry: RentLedgerEntry, prior_amount: Money },
}

impl ReconciliationOutcome {
    pub fn entry(&self) -> Option<&RentLedgerEntry> {
        match self {
            ReconciliationOutcome::Skipped { .. } => None,
            ReconciliationOutcome::AlreadyReconciled { entry }
            | ReconciliationOutcome::Recorded { entry }
            | ReconciliationOutcome::Overwrote { entry, .. } => Some(entry),
        }
    }

    /// whether the ledger was written
    pub fn mutated(&self) -> bool {
        matches!(
            self,
            ReconciliationOutcome::Recorded { .. } | ReconciliationOutcome::Overwrote { .. }
        )
    }
}

/// applies processor-confirmed payments onto the ledger (session -> ledger only)
#[derive(Clone)]
pub struct ReconciliationPolicy {
    ledger: RentLedger,
}

impl ReconciliationPolicy {
    pub fn new(ledger: RentLedger) -> Self {
        Self { ledger }
    }

    /// React to a tracker status update.
    ///
    /// Any update that leaves the session `paid` is reconciled, including a
    /// redelivery that did not change the status. A previous delivery may
    /// have committed `paid` and then failed before the ledger write, and
    /// reconciling is idempotent per session.
    pub async fn on_status_change(&self, update: &StatusUpdate) -> Result<ReconciliationOutcome> {
        if update.session.status != SessionStatus::Paid {
            debug!(
                session_id = %update.session.id,
                status = %update.session.status,
                changed = update.changed,
                "reconciliation skipped"
            );
            return Ok(ReconciliationOutcome::Skipped {
                status: update.session.status,
            });
        }
        if !update.changed {
            debug!(session_id = %update.session.id, "paid redelivery, confirming ledger");
        }
        self.reconcile(&update.session).await
    }

    /// write a paid session onto its ledger period.
    ///
    /// The target row is read and then written conditionally on what was
    /// read, so a manual edit landing in between forces a re-read instead of
    /// being overwritten without an audit note.
    pub async fn reconcile(&self, session: &CollectionSession) -> Result<ReconciliationOutcome> {
        if session.status != SessionStatus::Paid {
            return Ok(ReconciliationOutcome::Skipped { status: session.status });
        }

        let ctx = self.ledger.context();
        let period = session.ledger_period();
        let max_attempts = ctx.config.reconciliation.max_attempts;
        let mut attempt = 0;

        loop {
            attempt += 1;
            let existing = self.ledger.get(session.property_id, period).await?;

            // a row naming this session was already reconciled; a later
            // manual edit on it, paid or unpaid, stands
            if let Some(entry) = existing.as_ref() {
                if entry.references_session(session.id) {
                    debug!(session_id = %session.id, period = %period, "session already reconciled");
                    return Ok(ReconciliationOutcome::AlreadyReconciled { entry: entry.clone() });
                }
            }

            let prior_amount = existing
                .as_ref()
                .filter(|e| e.is_paid() && e.amount != session.amount)
                .map(|e| e.amount);
            let details = self.details_for(session, existing.as_ref(), prior_amount);
            let expectation = match existing.as_ref() {
                Some(entry) => RowExpectation::UpdatedAt(entry.updated_at),
                None => RowExpectation::Absent,
            };

            let written = self
                .ledger
                .write_paid(
                    session.property_id,
                    period,
                    session.amount,
                    details,
                    LedgerMutationSource::Reconciliation { session_id: session.id },
                    expectation,
                )
                .await;

            match written {
                Ok(entry) => return Ok(self.finish(session, period, entry, prior_amount)),
                Err(LedgerError::StaleWrite { .. }) if attempt < max_attempts => {
                    debug!(session_id = %session.id, period = %period, attempt, "ledger row moved, retrying reconciliation");
                }
                Err(err) => return Err(err),
            }
        }
    }

    fn details_for(
        &self,
        session: &CollectionSession,
        existing: Option<&RentLedgerEntry>,
        prior_amount: Option<Money>,
    ) -> PaymentDetails {
        let mut notes = format!(
            "paid online via collection session {} (ref {})",
            session.id, session.external_reference
        );
        if let Some(prior) = prior_amount {
            notes.push_str(&format!(
                "; replaced prior paid amount {} with {}",
                prior, session.amount
            ));
        }
        if let Some(carried) = existing.and_then(carried_note) {
            notes.push_str("; ");
            notes.push_str(&carried);
        }

        let mut details = PaymentDetails::new()
            .paid_on(self.ledger.context().today())
            .notes(notes);

        // same amount already paid: keep its proration metadata
        if let Some(entry) = existing.filter(|e| e.is_paid() && e.amount == session.amount) {
            details.days_covered = entry.days_covered;
            details.move_in = entry.move_in_date;
            details.move_out = entry.move_out_date;
        }
        details
    }

    fn finish(
        &self,
        session: &CollectionSession,
        period: Period,
        entry: RentLedgerEntry,
        prior_amount: Option<Money>,
    ) -> ReconciliationOutcome {
        let ctx = self.ledger.context();
        ctx.events.emit(Event::PaymentReconciled {
            session_id: session.id,
            property_id: session.property_id,
            period,
            amount: session.amount,
            prior_amount,
            timestamp: entry.updated_at,
        });

        match prior_amount {
            Some(prior_amount) => {
                warn!(
                    session_id = %session.id,
                    property_id = %session.property_id,
                    period = %period,
                    prior_amount = %prior_amount,
                    amount = %session.amount,
                    "reconciliation replaced a different paid amount"
                );
                ReconciliationOutcome::Overwrote { entry, prior_amount }
            }
            None => {
                info!(
                    session_id = %session.id,
                    property_id = %session.property_id,
                    period = %period,
                    amount = %session.amount,
                    "payment reconciled"
                );
                ReconciliationOutcome::Recorded { entry }
            }
        }
    }
}

/// longest slice of a landlord note copied into a reconciliation note
const MAX_CARRIED_NOTE_CHARS: usize = 200;

const PREVIOUS_NOTES: &str = "previous notes: ";

/// what a reconciliation note keeps of the row it replaces.
///
/// Only the row's own note is carried. A row written by an earlier
/// reconciliation is referenced by its session id instead of copying its
/// note, so notes never nest.
fn carried_note(existing: &RentLedgerEntry) -> Option<String> {
    if let LedgerMutationSource::Reconciliation { session_id } = existing.source {
        return Some(format!("previously reconciled by collection session {}", session_id));
    }
    let own = existing
        .notes
        .as_deref()?
        .split(PREVIOUS_NOTES)
        .next()
        .unwrap_or_default()
        .trim_end_matches([';', ' '])
        .trim();
    if own.is_empty() {
        return None;
    }
    let mut carried: String = own.chars().take(MAX_CARRIED_NOTE_CHARS).collect();
    if own.chars().count() > MAX_CARRIED_NOTE_CHARS {
        carried.push_str("...");
    }
    Some(format!("{}{}", PREVIOUS_NOTES, carried))
}
