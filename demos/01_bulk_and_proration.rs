/// bulk payments and partial-month proration under controlled time
use std::sync::Arc;

use chrono::{NaiveDate, TimeZone, Utc};
use rent_ledger_rs::{
    daily_rate, prorate, BulkPaymentApplier, BulkPaymentRequest, Coverage, InMemoryPropertyProvider,
    LedgerContext, Money, PaymentDetails, Period, Property, RentLedger, SafeTimeProvider, TimeSource,
    Uuid,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let _ = tracing_subscriber::fmt().with_env_filter("info").try_init();
    println!("=== bulk and proration example ===\n");

    let time = Arc::new(SafeTimeProvider::new(TimeSource::Test(
        Utc.with_ymd_and_hms(2024, 4, 2, 9, 0, 0).unwrap(),
    )));
    let house = Property::new(Uuid::new_v4(), Money::from_major(1000), 1, true)?;
    let flat = Property::new(Uuid::new_v4(), Money::from_major(3100), 1, true)?;
    let properties = Arc::new(InMemoryPropertyProvider::with_properties([house.clone(), flat.clone()]));
    let ledger = RentLedger::new(LedgerContext::in_memory(time.clone(), properties));

    // catch up a quarter in one go
    let applier = BulkPaymentApplier::new(ledger.clone());
    let request = BulkPaymentRequest::new(
        house.id,
        Period::new(2024, 1)?,
        Period::new(2024, 3)?,
        Money::from_major(1000),
    )
    .notes("q1 paid by cheque");
    let outcome = applier.apply_bulk(&request).await?;
    println!("bulk applied {} months, {} failed", outcome.applied.len(), outcome.failures.len());
    for entry in &outcome.applied {
        println!("  {} -> {}", entry.period, entry.amount);
    }

    // partial first month: move-in on the 20th of a 31-day month
    let march = Period::new(2024, 3)?;
    let move_in = NaiveDate::from_ymd_opt(2024, 3, 20).ok_or("bad date")?;
    println!("\ndaily rate for {}: {}", march, daily_rate(flat.monthly_rent, march));

    let proration = prorate(flat.monthly_rent, march, Coverage::MoveIn(move_in))?;
    println!(
        "move-in {}: {} days of {} -> {}",
        move_in, proration.days_covered, proration.days_in_month, proration.amount
    );

    let entry = ledger
        .mark_paid(flat.id, march, proration.amount, PaymentDetails::new().move_in(move_in))
        .await?;
    println!("recorded prorated entry: {} for {:?} days", entry.amount, entry.days_covered);

    println!("\nmarch income: {}", ledger.monthly_income(march).await?);

    Ok(())
}
