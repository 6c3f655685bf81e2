use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, NaiveDate, TimeZone, Utc};
use rent_ledger_rs::{
    BulkPaymentApplier, BulkPaymentRequest, CollectionSessionTracker, Event, InMemoryLedgerStore,
    InMemoryPropertyProvider, IngestReceipt, LedgerContext, LedgerError, LedgerMutationSource,
    LedgerStatus, LedgerStore, Money, NewSession, PaymentDetails, PaymentEventIngestor, Period,
    PortfolioStatusAggregator, ProcessorEvent, Property, PropertyId, ReconciliationOutcome,
    ReconciliationPolicy, RentLedger, RentLedgerEntry, RentStatus, Result, RowExpectation,
    SafeTimeProvider, SessionStatus, TimeSource, Uuid,
};

struct Harness {
    ctx: LedgerContext,
    time: Arc<SafeTimeProvider>,
    ledger: RentLedger,
    tracker: CollectionSessionTracker,
    ingestor: PaymentEventIngestor,
    portfolio: PortfolioStatusAggregator,
}

impl Harness {
    fn with_context(ctx: LedgerContext, time: Arc<SafeTimeProvider>) -> Self {
        let ledger = RentLedger::new(ctx.clone());
        let tracker = CollectionSessionTracker::new(ctx.clone());
        Self {
            ingestor: PaymentEventIngestor::new(tracker.clone(), ReconciliationPolicy::new(ledger.clone())),
            portfolio: PortfolioStatusAggregator::new(ledger.clone()),
            ctx,
            time,
            ledger,
            tracker,
        }
    }
}

fn clock(year: i32, month: u32, day: u32) -> Arc<SafeTimeProvider> {
    Arc::new(SafeTimeProvider::new(TimeSource::Test(
        Utc.with_ymd_and_hms(year, month, day, 10, 0, 0).unwrap(),
    )))
}

fn harness(time: Arc<SafeTimeProvider>, properties: &[Property]) -> Harness {
    let provider = Arc::new(InMemoryPropertyProvider::with_properties(properties.to_vec()));
    let ctx = LedgerContext::in_memory(time.clone(), provider);
    Harness::with_context(ctx, time)
}

fn property(rent: i64, due_day: u32) -> Property {
    Property::new(Uuid::new_v4(), Money::from_major(rent), due_day, true).unwrap()
}

#[tokio::test]
async fn overdue_property_becomes_paid() {
    let a = property(1500, 1);
    let h = harness(clock(2024, 9, 15), &[a.clone()]);

    assert_eq!(h.portfolio.classify_property(a.id).await.unwrap(), RentStatus::Overdue);

    let this_month = Period::containing(h.ctx.today());
    h.ledger
        .mark_paid(a.id, this_month, Money::from_major(1500), PaymentDetails::new())
        .await
        .unwrap();
    assert_eq!(h.portfolio.classify_property(a.id).await.unwrap(), RentStatus::Paid);
}

#[tokio::test]
async fn due_day_boundary_moves_with_the_clock() {
    let p = property(1200, 5);
    let h = harness(clock(2024, 9, 3), &[p.clone()]);
    assert_eq!(h.portfolio.classify_property(p.id).await.unwrap(), RentStatus::Unpaid);

    h.time.test_control().unwrap().advance(Duration::days(7));
    assert_eq!(h.portfolio.classify_property(p.id).await.unwrap(), RentStatus::Overdue);
}

#[tokio::test]
async fn prorated_move_in_is_partial_on_the_dashboard() {
    let p = property(3100, 1);
    let h = harness(clock(2024, 3, 25), &[p.clone()]);
    let march = Period::new(2024, 3).unwrap();

    let entry = h
        .ledger
        .mark_paid(
            p.id,
            march,
            Money::from_major(1200),
            PaymentDetails::new().move_in(NaiveDate::from_ymd_opt(2024, 3, 20).unwrap()),
        )
        .await
        .unwrap();
    assert_eq!(entry.days_covered, Some(12));
    assert_eq!(entry.status, LedgerStatus::Paid);

    assert_eq!(h.portfolio.classify_property(p.id).await.unwrap(), RentStatus::Partial);
    assert_eq!(h.ledger.monthly_income(march).await.unwrap(), Money::from_major(1200));
}

#[tokio::test]
async fn bulk_quarter_then_income_per_month() {
    let p = property(1000, 1);
    let h = harness(clock(2024, 4, 2), &[p.clone()]);

    let applier = BulkPaymentApplier::new(h.ledger.clone());
    let outcome = applier
        .apply_bulk(&BulkPaymentRequest::new(
            p.id,
            Period::new(2024, 1).unwrap(),
            Period::new(2024, 3).unwrap(),
            Money::from_major(1000),
        ))
        .await
        .unwrap();
    assert!(outcome.is_complete());

    for month in 1..=3 {
        let period = Period::new(2024, month).unwrap();
        assert_eq!(h.ledger.monthly_income(period).await.unwrap(), Money::from_major(1000));
    }
    // unpaid april contributes nothing
    let april = Period::new(2024, 4).unwrap();
    assert_eq!(h.ledger.monthly_income(april).await.unwrap(), Money::ZERO);
}

#[tokio::test]
async fn racing_paid_deliveries_reconcile_once() {
    let p = property(2000, 1);
    let h = harness(clock(2024, 5, 2), &[p.clone()]);
    let session = h
        .tracker
        .create_session(NewSession::new(p.id, Money::from_major(2000), "usd"))
        .await
        .unwrap();

    let reference = session.external_reference.clone();
    let events: Vec<ProcessorEvent> = (0..4)
        .map(|i| ProcessorEvent::new(format!("evt_{}", i), reference.clone(), "paid"))
        .collect();
    let (a, b, c, d) = tokio::join!(
        h.ingestor.ingest(&events[0]),
        h.ingestor.ingest(&events[1]),
        h.ingestor.ingest(&events[2]),
        h.ingestor.ingest(&events[3]),
    );

    let mut recorded = 0;
    for receipt in [a, b, c, d] {
        match receipt.unwrap() {
            IngestReceipt::Applied(outcome) if outcome.mutated() => recorded += 1,
            IngestReceipt::Applied(_) => {}
            other => panic!("unexpected receipt {:?}", other),
        }
    }
    assert_eq!(recorded, 1);

    let events = h.ctx.events.clone();
    assert_eq!(events.count_where(|e| matches!(e, Event::SessionStatusChanged { .. })), 1);
    assert_eq!(events.count_where(|e| matches!(e, Event::PaymentReconciled { .. })), 1);
    assert_eq!(h.tracker.get(session.id).await.unwrap().status, SessionStatus::Paid);
}

#[tokio::test]
async fn concurrent_manual_payments_leave_one_row_last_write_wins() {
    let p = property(1500, 1);
    let h = harness(clock(2024, 6, 5), &[p.clone()]);
    let june = Period::new(2024, 6).unwrap();

    let (a, b) = tokio::join!(
        h.ledger.mark_paid(p.id, june, Money::from_major(1500), PaymentDetails::new().notes("transfer")),
        h.ledger.mark_paid(p.id, june, Money::from_major(1450), PaymentDetails::new().notes("cash")),
    );
    let (a, b) = (a.unwrap(), b.unwrap());
    assert_ne!(a.updated_at, b.updated_at);

    let rows = h.ledger.context().ledger_store.list_for_period(june).await.unwrap();
    assert_eq!(rows.len(), 1);
    let last = if a.updated_at > b.updated_at { &a } else { &b };
    assert_eq!(rows[0].amount, last.amount);
    assert_eq!(rows[0].notes, last.notes);
    assert_eq!(rows[0].updated_at, a.updated_at.max(b.updated_at));
    assert_eq!(rows[0].created_at, a.created_at.min(b.created_at));
}

#[tokio::test]
async fn redelivered_paid_event_recovers_a_failed_ledger_write() {
    let p = property(2100, 1);
    let time = clock(2024, 11, 3);
    let provider = Arc::new(InMemoryPropertyProvider::with_properties([p.clone()]));
    let mut ctx = LedgerContext::in_memory(time.clone(), provider);
    ctx.ledger_store = Arc::new(FailOnceStore {
        inner: InMemoryLedgerStore::new(),
        failed: AtomicBool::new(false),
    });
    let h = Harness::with_context(ctx, time);
    let november = Period::new(2024, 11).unwrap();

    let session = h
        .tracker
        .create_session(NewSession::new(p.id, Money::from_major(2100), "usd"))
        .await
        .unwrap();
    let event = ProcessorEvent::new("evt_1", session.external_reference.clone(), "paid");

    let err = h.ingestor.ingest(&event).await.unwrap_err();
    assert!(matches!(err, LedgerError::Storage { .. }));
    // status is committed even though the ledger write failed
    assert_eq!(h.tracker.get(session.id).await.unwrap().status, SessionStatus::Paid);
    assert!(h.ledger.get(p.id, november).await.unwrap().is_none());

    let receipt = h.ingestor.ingest(&event).await.unwrap();
    assert!(matches!(receipt, IngestReceipt::Applied(ReconciliationOutcome::Recorded { .. })));
    let entry = h.ledger.get(p.id, november).await.unwrap().unwrap();
    assert_eq!(entry.status, LedgerStatus::Paid);
    assert_eq!(entry.amount, Money::from_major(2100));
    assert_eq!(entry.reconciled_session(), Some(session.id));

    assert_eq!(h.ingestor.ingest(&event).await.unwrap(), IngestReceipt::Duplicate);
}

#[tokio::test]
async fn expired_session_leaves_manual_entry_alone() {
    let p = property(1800, 1);
    let h = harness(clock(2024, 8, 4), &[p.clone()]);
    let august = Period::new(2024, 8).unwrap();

    let manual = h
        .ledger
        .mark_paid(p.id, august, Money::from_major(1800), PaymentDetails::new().notes("cheque"))
        .await
        .unwrap();

    let session = h
        .tracker
        .create_session(NewSession::new(p.id, Money::from_major(1800), "usd"))
        .await
        .unwrap();
    let receipt = h
        .ingestor
        .ingest(&ProcessorEvent::new("evt_1", session.external_reference, "expired"))
        .await
        .unwrap();
    assert!(matches!(receipt, IngestReceipt::Applied(ReconciliationOutcome::Skipped { .. })));

    let entry = h.ledger.get(p.id, august).await.unwrap().unwrap();
    assert_eq!(entry, manual);
}

/// ledger store that lets a manual write land between the reconciliation
/// read and its conditional write, once
struct InterleavingStore {
    inner: InMemoryLedgerStore,
    fired: AtomicBool,
}

#[async_trait]
impl LedgerStore for InterleavingStore {
    async fn get(&self, property_id: PropertyId, period: Period) -> Result<Option<RentLedgerEntry>> {
        self.inner.get(property_id, period).await
    }

    async fn get_many(
        &self,
        property_ids: &[PropertyId],
        period: Period,
    ) -> Result<HashMap<PropertyId, RentLedgerEntry>> {
        self.inner.get_many(property_ids, period).await
    }

    async fn upsert(&self, entry: RentLedgerEntry, expectation: RowExpectation) -> Result<RentLedgerEntry> {
        let from_reconciliation = matches!(entry.source, LedgerMutationSource::Reconciliation { .. });
        if from_reconciliation && !self.fired.swap(true, Ordering::SeqCst) {
            let mut manual = RentLedgerEntry::unpaid(entry.property_id, entry.period, entry.updated_at);
            manual.status = LedgerStatus::Paid;
            manual.amount = Money::from_major(1900);
            manual.notes = Some("entered by landlord".to_string());
            self.inner.upsert(manual, RowExpectation::Any).await?;
        }
        self.inner.upsert(entry, expectation).await
    }

    async fn list_for_period(&self, period: Period) -> Result<Vec<RentLedgerEntry>> {
        self.inner.list_for_period(period).await
    }
}

/// ledger store whose first write fails as if the connection dropped
struct FailOnceStore {
    inner: InMemoryLedgerStore,
    failed: AtomicBool,
}

#[async_trait]
impl LedgerStore for FailOnceStore {
    async fn get(&self, property_id: PropertyId, period: Period) -> Result<Option<RentLedgerEntry>> {
        self.inner.get(property_id, period).await
    }

    async fn get_many(
        &self,
        property_ids: &[PropertyId],
        period: Period,
    ) -> Result<HashMap<PropertyId, RentLedgerEntry>> {
        self.inner.get_many(property_ids, period).await
    }

    async fn upsert(&self, entry: RentLedgerEntry, expectation: RowExpectation) -> Result<RentLedgerEntry> {
        if !self.failed.swap(true, Ordering::SeqCst) {
            return Err(LedgerError::Storage {
                message: "connection reset".to_string(),
            });
        }
        self.inner.upsert(entry, expectation).await
    }

    async fn list_for_period(&self, period: Period) -> Result<Vec<RentLedgerEntry>> {
        self.inner.list_for_period(period).await
    }
}

#[tokio::test]
async fn concurrent_manual_edit_is_audited_not_clobbered() {
    let p = property(2000, 1);
    let time = clock(2024, 10, 2);
    let provider = Arc::new(InMemoryPropertyProvider::with_properties([p.clone()]));
    let mut ctx = LedgerContext::in_memory(time.clone(), provider);
    ctx.ledger_store = Arc::new(InterleavingStore {
        inner: InMemoryLedgerStore::new(),
        fired: AtomicBool::new(false),
    });
    let h = Harness::with_context(ctx, time);

    let session = h
        .tracker
        .create_session(NewSession::new(p.id, Money::from_major(2000), "usd"))
        .await
        .unwrap();
    let receipt = h
        .ingestor
        .ingest(&ProcessorEvent::new("evt_1", session.external_reference, "paid"))
        .await
        .unwrap();

    match receipt {
        IngestReceipt::Applied(ReconciliationOutcome::Overwrote { entry, prior_amount }) => {
            assert_eq!(prior_amount, Money::from_major(1900));
            assert_eq!(entry.amount, Money::from_major(2000));
            let notes = entry.notes.unwrap();
            assert!(notes.contains("1900.00"));
            assert!(notes.contains("entered by landlord"));
        }
        other => panic!("expected an audited overwrite, got {:?}", other),
    }
}

#[tokio::test]
async fn stale_manual_edit_is_rejected() {
    let p = property(1500, 1);
    let h = harness(clock(2024, 2, 10), &[p.clone()]);
    let feb = Period::new(2024, 2).unwrap();

    let first = h
        .ledger
        .mark_paid(p.id, feb, Money::from_major(1500), PaymentDetails::new())
        .await
        .unwrap();
    h.ledger.mark_unpaid(p.id, feb).await.unwrap();

    let err = h
        .ledger
        .mark_paid(p.id, feb, Money::from_major(1400), PaymentDetails::new().expecting(first.updated_at))
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::StaleWrite { .. }));

    let entry = h.ledger.get(p.id, feb).await.unwrap().unwrap();
    assert_eq!(entry.status, LedgerStatus::Unpaid);
}
