pub mod calendar;
pub mod config;
pub mod context;
pub mod decimal;
pub mod errors;
pub mod events;
pub mod ingest;
pub mod ledger;
pub mod portfolio;
pub mod reconciliation;
pub mod sessions;
pub mod store;
pub mod types;

// re-export key types
pub use calendar::{daily_rate, month_range, prorate, prorated_amount, Coverage, Period, Proration};
pub use config::{LedgerConfig, ReconciliationConfig};
pub use context::LedgerContext;
pub use decimal::Money;
pub use errors::{ErrorKind, LedgerError, Result};
pub use events::{Event, EventStore};
pub use ingest::{IngestReceipt, PaymentEventIngestor, ProcessorEvent};
pub use ledger::{
    BulkFailure, BulkOutcome, BulkPaymentApplier, BulkPaymentRequest, PaymentDetails, RentLedger,
    RentLedgerEntry,
};
pub use portfolio::{classify, PortfolioSnapshot, PortfolioStatusAggregator, PropertyRentStatus};
pub use reconciliation::{ReconciliationOutcome, ReconciliationPolicy};
pub use sessions::{CollectionSession, CollectionSessionTracker, NewSession, StatusUpdate};
pub use store::{
    InMemoryLedgerStore, InMemoryPropertyProvider, InMemorySessionStore, LedgerStore,
    PropertyProvider, RowExpectation, SessionStore,
};
pub use types::{
    LedgerMutationSource, LedgerStatus, Property, PropertyId, RentStatus, SessionId, SessionStatus,
};

// re-export external dependencies that users will need
pub use chrono;
pub use hourglass_rs::{SafeTimeProvider, TimeSource};
pub use rust_decimal::Decimal;
pub use uuid::Uuid;
