use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::calendar::Period;
use crate::errors::{LedgerError, Result};
use crate::ledger::RentLedgerEntry;
use crate::sessions::CollectionSession;
use crate::store::{LedgerStore, PropertyProvider, RowExpectation, SessionStore};
use crate::types::{Property, PropertyId, SessionId, SessionStatus};

/// in-memory ledger table
#[derive(Debug, Default)]
pub struct InMemoryLedgerStore {
    rows: RwLock<HashMap<(PropertyId, Period), RentLedgerEntry>>,
}

impl InMemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.rows.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.rows.read().await.is_empty()
    }
}

#[async_trait]
impl LedgerStore for InMemoryLedgerStore {
    async fn get(&self, property_id: PropertyId, period: Period) -> Result<Option<RentLedgerEntry>> {
        Ok(self.rows.read().await.get(&(property_id, period)).cloned())
    }

    async fn get_many(
        &self,
        property_ids: &[PropertyId],
        period: Period,
    ) -> Result<HashMap<PropertyId, RentLedgerEntry>> {
        let rows = self.rows.read().await;
        Ok(property_ids
            .iter()
            .filter_map(|id| rows.get(&(*id, period)).map(|e| (*id, e.clone())))
            .collect())
    }

    async fn upsert(&self, mut entry: RentLedgerEntry, expectation: RowExpectation) -> Result<RentLedgerEntry> {
        let key = (entry.property_id, entry.period);
        let mut rows = self.rows.write().await;
        let current = rows.get(&key);
        let actual = current.map(|row| row.updated_at);

        let expected = match expectation {
            RowExpectation::Any => actual,
            RowExpectation::Absent => None,
            RowExpectation::UpdatedAt(ts) => Some(ts),
        };
        if actual != expected {
            return Err(LedgerError::StaleWrite {
                property_id: entry.property_id,
                period: entry.period,
                expected,
                actual,
            });
        }

        if let Some(current) = current {
            entry.created_at = current.created_at;
            if entry.updated_at <= current.updated_at {
                entry.updated_at = current.updated_at + Duration::microseconds(1);
            }
        }

        rows.insert(key, entry.clone());
        Ok(entry)
    }

    async fn list_for_period(&self, period: Period) -> Result<Vec<RentLedgerEntry>> {
        let rows = self.rows.read().await;
        let mut entries: Vec<RentLedgerEntry> =
            rows.values().filter(|e| e.period == period).cloned().collect();
        entries.sort_by_key(|e| e.property_id);
        Ok(entries)
    }
}

/// in-memory session table with a property index
#[derive(Debug, Default)]
pub struct InMemorySessionStore {
    inner: RwLock<SessionTables>,
}

#[derive(Debug, Default)]
struct SessionTables {
    by_id: HashMap<SessionId, CollectionSession>,
    by_property: HashMap<PropertyId, Vec<SessionId>>,
    by_reference: HashMap<String, SessionId>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn insert(&self, session: CollectionSession) -> Result<()> {
        let mut tables = self.inner.write().await;
        if tables.by_id.contains_key(&session.id) {
            return Err(LedgerError::Storage {
                message: format!("duplicate session id {}", session.id),
            });
        }
        if tables.by_reference.contains_key(&session.external_reference) {
            return Err(LedgerError::Storage {
                message: format!("duplicate external reference {}", session.external_reference),
            });
        }

        tables
            .by_property
            .entry(session.property_id)
            .or_default()
            .push(session.id);
        tables
            .by_reference
            .insert(session.external_reference.clone(), session.id);
        tables.by_id.insert(session.id, session);
        Ok(())
    }

    async fn get(&self, id: SessionId) -> Result<Option<CollectionSession>> {
        Ok(self.inner.read().await.by_id.get(&id).cloned())
    }

    async fn find_by_external_reference(&self, reference: &str) -> Result<Option<CollectionSession>> {
        let tables = self.inner.read().await;
        Ok(tables
            .by_reference
            .get(reference)
            .and_then(|id| tables.by_id.get(id))
            .cloned())
    }

    async fn compare_and_set_status(
        &self,
        id: SessionId,
        expected: SessionStatus,
        new: SessionStatus,
        at: DateTime<Utc>,
    ) -> Result<Option<CollectionSession>> {
        let mut tables = self.inner.write().await;
        let session = tables
            .by_id
            .get_mut(&id)
            .ok_or_else(|| LedgerError::session_not_found(id))?;

        if session.status != expected {
            return Ok(None);
        }
        session.status = new;
        session.updated_at = at.max(session.updated_at);
        Ok(Some(session.clone()))
    }

    async fn list_for_property(&self, property_id: PropertyId, limit: usize) -> Result<Vec<CollectionSession>> {
        let tables = self.inner.read().await;
        let mut sessions: Vec<CollectionSession> = tables
            .by_property
            .get(&property_id)
            .map(|ids| ids.iter().filter_map(|id| tables.by_id.get(id).cloned()).collect())
            .unwrap_or_default();

        sessions.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| b.id.cmp(&a.id)));
        sessions.truncate(limit);
        Ok(sessions)
    }
}

/// in-memory property directory
#[derive(Debug, Default)]
pub struct InMemoryPropertyProvider {
    properties: RwLock<HashMap<PropertyId, Property>>,
}

impl InMemoryPropertyProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_properties(properties: impl IntoIterator<Item = Property>) -> Self {
        Self {
            properties: RwLock::new(properties.into_iter().map(|p| (p.id, p)).collect()),
        }
    }

    pub async fn insert(&self, property: Property) {
        self.properties.write().await.insert(property.id, property);
    }

    pub async fn remove(&self, id: PropertyId) -> Option<Property> {
        self.properties.write().await.remove(&id)
    }
}

#[async_trait]
impl PropertyProvider for InMemoryPropertyProvider {
    async fn get_property(&self, id: PropertyId) -> Result<Property> {
        self.properties
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or_else(|| LedgerError::property_not_found(id))
    }

    async fn get_properties(&self, ids: &[PropertyId]) -> Result<Vec<Property>> {
        let properties = self.properties.read().await;
        ids.iter()
            .map(|id| {
                properties
                    .get(id)
                    .cloned()
                    .ok_or_else(|| LedgerError::property_not_found(*id))
            })
            .collect()
    }
}
