pub mod memory;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;

use crate::calendar::Period;
use crate::errors::Result;
use crate::ledger::RentLedgerEntry;
use crate::sessions::CollectionSession;
use crate::types::{Property, PropertyId, SessionId, SessionStatus};

pub use memory::{InMemoryLedgerStore, InMemoryPropertyProvider, InMemorySessionStore};

/// precondition on the stored row for a conditional write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowExpectation {
    /// unconditional, last write wins
    Any,
    /// no row may exist yet
    Absent,
    /// the row must carry exactly this `updated_at`
    UpdatedAt(DateTime<Utc>),
}

impl From<Option<DateTime<Utc>>> for RowExpectation {
    fn from(expected: Option<DateTime<Utc>>) -> Self {
        match expected {
            Some(ts) => RowExpectation::UpdatedAt(ts),
            None => RowExpectation::Any,
        }
    }
}

/// durable ledger rows keyed by (property_id, period)
#[async_trait]
pub trait LedgerStore: Send + Sync {
    async fn get(&self, property_id: PropertyId, period: Period) -> Result<Option<RentLedgerEntry>>;

    /// one batch read for many properties in the same period
    async fn get_many(
        &self,
        property_ids: &[PropertyId],
        period: Period,
    ) -> Result<HashMap<PropertyId, RentLedgerEntry>>;

    /// insert or replace a row as one unit.
    ///
    /// Fails with `StaleWrite` when `expectation` does not hold for the stored
    /// row. The returned row's `updated_at` is strictly greater than the one it
    /// replaced, and `created_at` is kept from the first write.
    async fn upsert(&self, entry: RentLedgerEntry, expectation: RowExpectation) -> Result<RentLedgerEntry>;

    async fn list_for_period(&self, period: Period) -> Result<Vec<RentLedgerEntry>>;
}

/// collection sessions keyed by id, indexed by property
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn insert(&self, session: CollectionSession) -> Result<()>;

    async fn get(&self, id: SessionId) -> Result<Option<CollectionSession>>;

    async fn find_by_external_reference(&self, reference: &str) -> Result<Option<CollectionSession>>;

    /// atomically move `expected -> new`; `None` when the stored status is no longer `expected`
    async fn compare_and_set_status(
        &self,
        id: SessionId,
        expected: SessionStatus,
        new: SessionStatus,
        at: DateTime<Utc>,
    ) -> Result<Option<CollectionSession>>;

    /// most recent first
    async fn list_for_property(&self, property_id: PropertyId, limit: usize) -> Result<Vec<CollectionSession>>;
}

/// read-only view of the property-management module
#[async_trait]
pub trait PropertyProvider: Send + Sync {
    async fn get_property(&self, id: PropertyId) -> Result<Property>;

    async fn get_properties(&self, ids: &[PropertyId]) -> Result<Vec<Property>>;
}
