/// webhook reconciliation - processor events flowing into the ledger
use std::sync::Arc;

use chrono::{TimeZone, Utc};
use rent_ledger_rs::{
    CollectionSessionTracker, InMemoryPropertyProvider, LedgerContext, Money, NewSession, PaymentDetails,
    PaymentEventIngestor, Period, ProcessorEvent, Property, ReconciliationPolicy, RentLedger,
    SafeTimeProvider, TimeSource, Uuid,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let _ = tracing_subscriber::fmt().with_env_filter("debug").try_init();
    println!("=== webhook reconciliation example ===\n");

    let time = Arc::new(SafeTimeProvider::new(TimeSource::Test(
        Utc.with_ymd_and_hms(2024, 7, 3, 14, 0, 0).unwrap(),
    )));
    let unit = Property::new(Uuid::new_v4(), Money::from_major(2200), 1, true)?;
    let properties = Arc::new(InMemoryPropertyProvider::with_properties([unit.clone()]));
    let ctx = LedgerContext::in_memory(time, properties);

    let ledger = RentLedger::new(ctx.clone());
    let tracker = CollectionSessionTracker::new(ctx.clone());
    let ingestor = PaymentEventIngestor::new(tracker.clone(), ReconciliationPolicy::new(ledger.clone()));

    // landlord already typed in a different amount by hand
    let july = Period::new(2024, 7)?;
    ledger
        .mark_paid(unit.id, july, Money::from_major(2000), PaymentDetails::new().notes("cash"))
        .await?;

    // tenant starts a hosted checkout
    let session = tracker
        .create_session(NewSession::new(unit.id, Money::from_major(2200), "USD").tenant_email("tenant@example.com"))
        .await?;
    println!("session {} opened with ref {}", session.id, session.external_reference);

    // processor delivers "paid" twice, then a stale cancellation
    let deliveries = [
        ProcessorEvent::new("evt_001", session.external_reference.clone(), "paid"),
        ProcessorEvent::new("evt_001", session.external_reference.clone(), "paid"),
        ProcessorEvent::new("evt_002", session.external_reference.clone(), "paid"),
        ProcessorEvent::new("evt_003", session.external_reference.clone(), "cancelled"),
    ];
    for event in &deliveries {
        let receipt = ingestor.ingest(event).await?;
        println!("{} ({}): {:?}", event.event_id, event.status, receipt);
    }

    if let Some(entry) = ledger.get(unit.id, july).await? {
        println!("\nledger for {}: {} {:?}", july, entry.amount, entry.status);
        println!("notes: {}", entry.notes.unwrap_or_default());
    }

    println!("\naudit trail:");
    for event in ctx.events.events() {
        println!("  {:?}", event);
    }

    Ok(())
}
