pub mod bulk;
pub mod entry;

use chrono::{DateTime, NaiveDate, Utc};
use std::collections::HashMap;
use tracing::{debug, info};

use crate::calendar::{prorate, Coverage, Period};
use crate::context::LedgerContext;
use crate::decimal::Money;
use crate::errors::{LedgerError, Result};
use crate::events::Event;
use crate::store::RowExpectation;
use crate::types::{LedgerMutationSource, LedgerStatus, PropertyId};

pub use bulk::{BulkFailure, BulkOutcome, BulkPaymentApplier, BulkPaymentRequest};
pub use entry::RentLedgerEntry;

/// optional fields for a paid write
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PaymentDetails {
    pub paid_date: Option<NaiveDate>,
    pub notes: Option<String>,
    pub days_covered: Option<u32>,
    pub move_in: Option<NaiveDate>,
    pub move_out: Option<NaiveDate>,
    /// optimistic concurrency token: the `updated_at` the caller last saw
    pub expected_updated_at: Option<DateTime<Utc>>,
}

impl PaymentDetails {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn paid_on(mut self, date: NaiveDate) -> Self {
        self.paid_date = Some(date);
        self
    }

    pub fn notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    pub fn days_covered(mut self, days: u32) -> Self {
        self.days_covered = Some(days);
        self
    }

    pub fn move_in(mut self, date: NaiveDate) -> Self {
        self.move_in = Some(date);
        self
    }

    pub fn move_out(mut self, date: NaiveDate) -> Self {
        self.move_out = Some(date);
        self
    }

    pub fn expecting(mut self, updated_at: DateTime<Utc>) -> Self {
        self.expected_updated_at = Some(updated_at);
        self
    }

    fn has_proration(&self) -> bool {
        self.days_covered.is_some() || self.move_in.is_some() || self.move_out.is_some()
    }

    /// occupied days in `period`; explicit days win over move dates
    pub fn resolve_days(&self, period: Period) -> Result<Option<u32>> {
        if let Some(days) = self.days_covered {
            return Coverage::Days(days).days_covered(period).map(Some);
        }

        match (self.move_in, self.move_out) {
            (None, None) => Ok(None),
            (Some(move_in), None) => Coverage::MoveIn(move_in).days_covered(period).map(Some),
            (None, Some(move_out)) => Coverage::MoveOut(move_out).days_covered(period).map(Some),
            (Some(move_in), Some(move_out)) => {
                // overlap of [move_in, month end] and [day 1, move_out]
                let from_move_in = Coverage::MoveIn(move_in).days_covered(period)? as i64;
                let to_move_out = Coverage::MoveOut(move_out).days_covered(period)? as i64;
                let days = from_move_in + to_move_out - period.days() as i64;
                if days <= 0 {
                    return Err(LedgerError::InvalidCoverage {
                        message: format!("move-out {} precedes move-in {}", move_out, move_in),
                    });
                }
                Ok(Some(days as u32))
            }
        }
    }
}

/// per-(property, month) rent ledger
#[derive(Clone)]
pub struct RentLedger {
    ctx: LedgerContext,
}

impl RentLedger {
    pub fn new(ctx: LedgerContext) -> Self {
        Self { ctx }
    }

    pub fn context(&self) -> &LedgerContext {
        &self.ctx
    }

    /// record rent for a period as paid by a landlord action
    pub async fn mark_paid(
        &self,
        property_id: PropertyId,
        period: Period,
        amount: Money,
        details: PaymentDetails,
    ) -> Result<RentLedgerEntry> {
        let expectation = RowExpectation::from(details.expected_updated_at);
        self.write_paid(property_id, period, amount, details, LedgerMutationSource::Manual, expectation)
            .await
    }

    pub(crate) async fn write_paid(
        &self,
        property_id: PropertyId,
        period: Period,
        amount: Money,
        details: PaymentDetails,
        source: LedgerMutationSource,
        expectation: RowExpectation,
    ) -> Result<RentLedgerEntry> {
        if !amount.is_positive() {
            return Err(LedgerError::InvalidAmount { amount });
        }

        let property = self.ctx.properties.get_property(property_id).await?;
        let days_covered = details.resolve_days(period)?;
        if let Some(days) = days_covered {
            let expected = prorate(property.monthly_rent, period, Coverage::Days(days))?.amount;
            if !amount.within(expected, self.ctx.config.proration_tolerance) {
                return Err(LedgerError::ProrationMismatch {
                    amount,
                    expected,
                    days_covered: days,
                });
            }
        }

        let now = self.ctx.now();
        let mut entry = self
            .ctx
            .ledger_store
            .get(property_id, period)
            .await?
            .unwrap_or_else(|| RentLedgerEntry::unpaid(property_id, period, now));

        entry.amount = amount;
        entry.status = LedgerStatus::Paid;
        entry.paid_date = Some(details.paid_date.unwrap_or_else(|| now.date_naive()));
        entry.days_covered = days_covered;
        entry.move_in_date = details.move_in;
        entry.move_out_date = details.move_out;
        if details.notes.is_some() {
            entry.notes = details.notes.clone();
        }
        entry.source = source;
        entry.updated_at = now;

        let stored = self
            .ctx
            .ledger_store
            .upsert(entry, expectation)
            .await?;

        info!(
            property_id = %property_id,
            period = %period,
            amount = %amount,
            prorated = details.has_proration(),
            source = ?source,
            "rent marked paid"
        );
        self.ctx.events.emit(Event::RentMarkedPaid {
            property_id,
            period,
            amount,
            days_covered,
            source,
            timestamp: stored.updated_at,
        });

        Ok(stored)
    }

    /// reset a period to unpaid, keeping the row
    pub async fn mark_unpaid(&self, property_id: PropertyId, period: Period) -> Result<RentLedgerEntry> {
        self.write_unpaid(property_id, period, RowExpectation::Any).await
    }

    /// reset to unpaid only if the row still carries `expected_updated_at`
    pub async fn mark_unpaid_if_unchanged(
        &self,
        property_id: PropertyId,
        period: Period,
        expected_updated_at: DateTime<Utc>,
    ) -> Result<RentLedgerEntry> {
        self.write_unpaid(property_id, period, RowExpectation::UpdatedAt(expected_updated_at))
            .await
    }

    async fn write_unpaid(
        &self,
        property_id: PropertyId,
        period: Period,
        expectation: RowExpectation,
    ) -> Result<RentLedgerEntry> {
        let now = self.ctx.now();
        let mut entry = match self.ctx.ledger_store.get(property_id, period).await? {
            Some(entry) => entry,
            None => {
                // only known properties get fresh rows
                self.ctx.properties.get_property(property_id).await?;
                RentLedgerEntry::unpaid(property_id, period, now)
            }
        };

        entry.clear_payment();
        entry.source = LedgerMutationSource::Manual;
        entry.updated_at = now;

        let stored = self
            .ctx
            .ledger_store
            .upsert(entry, expectation)
            .await?;

        info!(property_id = %property_id, period = %period, "rent marked unpaid");
        self.ctx.events.emit(Event::RentMarkedUnpaid {
            property_id,
            period,
            source: LedgerMutationSource::Manual,
            timestamp: stored.updated_at,
        });

        Ok(stored)
    }

    pub async fn get(&self, property_id: PropertyId, period: Period) -> Result<Option<RentLedgerEntry>> {
        self.ctx.ledger_store.get(property_id, period).await
    }

    /// batch read of the current month for many properties
    pub async fn current_month_status_for_all(
        &self,
        property_ids: &[PropertyId],
    ) -> Result<HashMap<PropertyId, Option<RentLedgerEntry>>> {
        let period = Period::containing(self.ctx.today());
        self.status_for_all(property_ids, period).await
    }

    /// batch read of one period for many properties; missing rows map to `None`
    pub async fn status_for_all(
        &self,
        property_ids: &[PropertyId],
        period: Period,
    ) -> Result<HashMap<PropertyId, Option<RentLedgerEntry>>> {
        let mut found = self.ctx.ledger_store.get_many(property_ids, period).await?;
        debug!(period = %period, requested = property_ids.len(), found = found.len(), "ledger batch read");

        Ok(property_ids
            .iter()
            .map(|id| (*id, found.remove(id)))
            .collect())
    }

    /// income for a month: sum of Paid amounts in that month only
    pub async fn monthly_income(&self, period: Period) -> Result<Money> {
        let entries = self.ctx.ledger_store.list_for_period(period).await?;
        Ok(entries.iter().map(RentLedgerEntry::income).sum())
    }
}
