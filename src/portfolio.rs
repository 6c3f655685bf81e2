use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::debug;

use crate::calendar::Period;
use crate::decimal::{round_cents, Money};
use crate::errors::Result;
use crate::ledger::{RentLedger, RentLedgerEntry};
use crate::types::{LedgerStatus, Property, PropertyId, RentStatus};

/// classify one property-month as of `today`
pub fn classify(property: &Property, entry: Option<&RentLedgerEntry>, today: NaiveDate) -> RentStatus {
    match entry {
        Some(entry) if entry.status == LedgerStatus::Paid => {
            if entry.has_proration() {
                RentStatus::Partial
            } else {
                RentStatus::Paid
            }
        }
        Some(entry) if entry.status == LedgerStatus::Partial => RentStatus::Partial,
        _ if today.day() > property.rent_due_day => RentStatus::Overdue,
        _ => RentStatus::Unpaid,
    }
}

/// one occupied property in a snapshot
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PropertyRentStatus {
    pub property_id: PropertyId,
    pub status: RentStatus,
    pub monthly_rent: Money,
    /// amount recorded as paid this period, zero otherwise
    pub collected: Money,
    pub rent_due_day: u32,
}

/// read-time classification of a portfolio for one month
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PortfolioSnapshot {
    pub period: Period,
    pub as_of: NaiveDate,
    pub rows: Vec<PropertyRentStatus>,
    pub paid: usize,
    pub partial: usize,
    pub unpaid: usize,
    pub overdue: usize,
    /// percent of occupied properties that are paid or partial
    pub collection_rate: Decimal,
    pub collected: Money,
    pub expected: Money,
}

impl PortfolioSnapshot {
    pub fn occupied(&self) -> usize {
        self.rows.len()
    }

    pub fn status_of(&self, property_id: PropertyId) -> Option<RentStatus> {
        self.rows
            .iter()
            .find(|row| row.property_id == property_id)
            .map(|row| row.status)
    }

    pub fn to_json_pretty(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|e| format!("JSON error: {}", e))
    }
}

/// joins occupied properties against the current month of the ledger
#[derive(Clone)]
pub struct PortfolioStatusAggregator {
    ledger: RentLedger,
}

impl PortfolioStatusAggregator {
    pub fn new(ledger: RentLedger) -> Self {
        Self { ledger }
    }

    /// classify a single property for the current month
    pub async fn classify_property(&self, property_id: PropertyId) -> Result<RentStatus> {
        let ctx = self.ledger.context();
        let today = ctx.today();
        let property = ctx.properties.get_property(property_id).await?;
        let entry = self.ledger.get(property_id, Period::containing(today)).await?;
        Ok(classify(&property, entry.as_ref(), today))
    }

    /// snapshot of the current month; vacant properties are left out entirely
    pub async fn snapshot(&self, property_ids: &[PropertyId]) -> Result<PortfolioSnapshot> {
        let ctx = self.ledger.context();
        let today = ctx.today();
        let period = Period::containing(today);

        let occupied: Vec<Property> = ctx
            .properties
            .get_properties(property_ids)
            .await?
            .into_iter()
            .filter(|p| p.tenant_present)
            .collect();
        let ids: Vec<PropertyId> = occupied.iter().map(|p| p.id).collect();
        let entries = self.ledger.status_for_all(&ids, period).await?;

        let mut snapshot = PortfolioSnapshot {
            period,
            as_of: today,
            rows: Vec::with_capacity(occupied.len()),
            paid: 0,
            partial: 0,
            unpaid: 0,
            overdue: 0,
            collection_rate: Decimal::ZERO,
            collected: Money::ZERO,
            expected: Money::ZERO,
        };

        for property in &occupied {
            let entry = entries.get(&property.id).and_then(Option::as_ref);
            let status = classify(property, entry, today);
            let collected = entry.map(RentLedgerEntry::income).unwrap_or(Money::ZERO);

            match status {
                RentStatus::Paid => snapshot.paid += 1,
                RentStatus::Partial => snapshot.partial += 1,
                RentStatus::Unpaid => snapshot.unpaid += 1,
                RentStatus::Overdue => snapshot.overdue += 1,
            }
            snapshot.collected += collected;
            snapshot.expected += property.monthly_rent;
            snapshot.rows.push(PropertyRentStatus {
                property_id: property.id,
                status,
                monthly_rent: property.monthly_rent,
                collected,
                rent_due_day: property.rent_due_day,
            });
        }

        if !occupied.is_empty() {
            let settled = Decimal::from((snapshot.paid + snapshot.partial) as u64);
            let total = Decimal::from(occupied.len() as u64);
            snapshot.collection_rate = round_cents(settled * Decimal::ONE_HUNDRED / total);
        }

        debug!(
            period = %period,
            requested = property_ids.len(),
            occupied = occupied.len(),
            overdue = snapshot.overdue,
            "portfolio snapshot built"
        );
        Ok(snapshot)
    }
}
