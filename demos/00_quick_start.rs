/// quick start - record a month of rent and read the portfolio back
use std::sync::Arc;

use rent_ledger_rs::{
    InMemoryPropertyProvider, LedgerContext, Money, PaymentDetails, Period, PortfolioStatusAggregator,
    Property, RentLedger, Uuid,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let _ = tracing_subscriber::fmt().with_env_filter("info").try_init();

    // one occupied unit, rent due on the 1st
    let unit = Property::new(Uuid::new_v4(), Money::from_major(1500), 1, true)?;
    let properties = Arc::new(InMemoryPropertyProvider::with_properties([unit.clone()]));
    let ctx = LedgerContext::in_memory_system(properties);

    let ledger = RentLedger::new(ctx.clone());
    let portfolio = PortfolioStatusAggregator::new(ledger.clone());

    println!("before payment: {:?}", portfolio.classify_property(unit.id).await?);

    // landlord records this month's rent
    let period = Period::containing(ctx.today());
    let entry = ledger
        .mark_paid(unit.id, period, Money::from_major(1500), PaymentDetails::new().notes("bank transfer"))
        .await?;
    println!("recorded {} for {} ({:?})", entry.amount, entry.period, entry.status);

    let snapshot = portfolio.snapshot(&[unit.id]).await?;
    println!("{}", snapshot.to_json_pretty());

    Ok(())
}
