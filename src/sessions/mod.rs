pub mod session;

use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::context::LedgerContext;
use crate::errors::{LedgerError, Result};
use crate::events::Event;
use crate::types::{PropertyId, SessionId, SessionStatus};

pub use session::{CollectionSession, NewSession, StatusUpdate};

/// compare-and-set retries before giving up on a contended session
const MAX_STATUS_RETRIES: usize = 8;

/// records externally initiated checkout attempts
#[derive(Clone)]
pub struct CollectionSessionTracker {
    ctx: LedgerContext,
}

impl CollectionSessionTracker {
    pub fn new(ctx: LedgerContext) -> Self {
        Self { ctx }
    }

    /// open a session; status starts `open`
    pub fn context(&self) -> &LedgerContext {
        &self.ctx
    }

    pub async fn create_session(&self, request: NewSession) -> Result<CollectionSession> {
        if !request.amount.is_positive() {
            return Err(LedgerError::InvalidAmount { amount: request.amount });
        }
        if !self.ctx.config.accepts_currency(&request.currency) {
            return Err(LedgerError::UnsupportedCurrency {
                currency: request.currency,
            });
        }
        self.ctx.properties.get_property(request.property_id).await?;

        let now = self.ctx.now();
        let session = CollectionSession {
            id: Uuid::new_v4(),
            property_id: request.property_id,
            tenant_email: request.tenant_email,
            amount: request.amount,
            currency: self.ctx.config.currency.clone(),
            is_recurring: request.is_recurring,
            due_date: request.due_date,
            status: SessionStatus::Open,
            external_reference: request
                .external_reference
                .unwrap_or_else(session::generate_external_reference),
            created_at: now,
            updated_at: now,
        };
        self.ctx.session_store.insert(session.clone()).await?;

        info!(
            session_id = %session.id,
            property_id = %session.property_id,
            amount = %session.amount,
            recurring = session.is_recurring,
            "collection session created"
        );
        self.ctx.events.emit(Event::SessionCreated {
            session_id: session.id,
            property_id: session.property_id,
            amount: session.amount,
            is_recurring: session.is_recurring,
            timestamp: now,
        });

        Ok(session)
    }

    pub async fn get(&self, session_id: SessionId) -> Result<CollectionSession> {
        self.ctx
            .session_store
            .get(session_id)
            .await?
            .ok_or_else(|| LedgerError::session_not_found(session_id))
    }

    pub async fn find_by_external_reference(&self, reference: &str) -> Result<CollectionSession> {
        self.ctx
            .session_store
            .find_by_external_reference(reference)
            .await?
            .ok_or_else(|| LedgerError::session_not_found(reference))
    }

    /// apply a processor-reported status.
    ///
    /// Repeating the current status is an accepted no-op (`changed == false`)
    /// that writes nothing and emits no event. Moves out of a terminal state, or back to `open`, are
    /// `InvalidTransition`.
    pub async fn update_status(&self, session_id: SessionId, new_status: SessionStatus) -> Result<StatusUpdate> {
        for _ in 0..MAX_STATUS_RETRIES {
            let current = self.get(session_id).await?;
            let previous = current.status;

            if previous == new_status {
                debug!(session_id = %session_id, status = %new_status, "duplicate session status ignored");
                return Ok(StatusUpdate {
                    session: current,
                    previous,
                    changed: false,
                });
            }

            if !previous.can_transition_to(new_status) {
                warn!(session_id = %session_id, from = %previous, to = %new_status, "session transition rejected");
                self.ctx.events.emit(Event::SessionTransitionRejected {
                    session_id,
                    from: previous,
                    to: new_status,
                    timestamp: self.ctx.now(),
                });
                return Err(LedgerError::InvalidTransition {
                    session_id,
                    from: previous,
                    to: new_status,
                });
            }

            let now = self.ctx.now();
            let swapped = self
                .ctx
                .session_store
                .compare_and_set_status(session_id, previous, new_status, now)
                .await?;

            if let Some(session) = swapped {
                info!(session_id = %session_id, from = %previous, to = %new_status, "session status changed");
                self.ctx.events.emit(Event::SessionStatusChanged {
                    session_id,
                    old_status: previous,
                    new_status,
                    timestamp: now,
                });
                return Ok(StatusUpdate {
                    session,
                    previous,
                    changed: true,
                });
            }
            // lost a race with another writer; re-read and re-validate
        }

        Err(LedgerError::Storage {
            message: format!("session {} kept changing during status update", session_id),
        })
    }

    /// most recent first; `None` uses the configured default limit
    pub async fn list_for_property(
        &self,
        property_id: PropertyId,
        limit: Option<usize>,
    ) -> Result<Vec<CollectionSession>> {
        let limit = limit.unwrap_or(self.ctx.config.default_session_limit);
        self.ctx
            .session_store
            .list_for_property(property_id, limit)
            .await
    }
}
