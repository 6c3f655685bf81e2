use chrono::{DateTime, NaiveDate, Utc};
use hourglass_rs::{SafeTimeProvider, TimeSource};
use std::sync::Arc;

use crate::config::LedgerConfig;
use crate::errors::Result;
use crate::events::EventStore;
use crate::store::{
    InMemoryLedgerStore, InMemoryPropertyProvider, InMemorySessionStore, LedgerStore,
    PropertyProvider, SessionStore,
};

/// handles every ledger operation runs against; cheap to clone
#[derive(Clone)]
pub struct LedgerContext {
    pub ledger_store: Arc<dyn LedgerStore>,
    pub session_store: Arc<dyn SessionStore>,
    pub properties: Arc<dyn PropertyProvider>,
    pub time: Arc<SafeTimeProvider>,
    pub config: Arc<LedgerConfig>,
    pub events: Arc<EventStore>,
}

impl LedgerContext {
    pub fn new(
        ledger_store: Arc<dyn LedgerStore>,
        session_store: Arc<dyn SessionStore>,
        properties: Arc<dyn PropertyProvider>,
        time: Arc<SafeTimeProvider>,
        config: LedgerConfig,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            ledger_store,
            session_store,
            properties,
            time,
            config: Arc::new(config),
            events: Arc::new(EventStore::new()),
        })
    }

    /// fully in-memory context over the given properties
    pub fn in_memory(time: Arc<SafeTimeProvider>, properties: Arc<InMemoryPropertyProvider>) -> Self {
        Self {
            ledger_store: Arc::new(InMemoryLedgerStore::new()),
            session_store: Arc::new(InMemorySessionStore::new()),
            properties,
            time,
            config: Arc::new(LedgerConfig::default()),
            events: Arc::new(EventStore::new()),
        }
    }

    /// in-memory context on the system clock
    pub fn in_memory_system(properties: Arc<InMemoryPropertyProvider>) -> Self {
        Self::in_memory(Arc::new(SafeTimeProvider::new(TimeSource::System)), properties)
    }

    pub fn with_config(mut self, config: LedgerConfig) -> Result<Self> {
        config.validate()?;
        self.config = Arc::new(config);
        Ok(self)
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.time.now()
    }

    pub fn today(&self) -> NaiveDate {
        self.time.now().date_naive()
    }
}
