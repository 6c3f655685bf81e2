use chrono::NaiveDate;
use tracing::{info, warn};

use crate::calendar::{month_range, Period};
use crate::decimal::Money;
use crate::errors::{LedgerError, Result};
use crate::events::Event;
use crate::ledger::{PaymentDetails, RentLedger, RentLedgerEntry};
use crate::types::PropertyId;

/// same payment applied to every month of an inclusive range
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulkPaymentRequest {
    pub property_id: PropertyId,
    pub start: Period,
    pub end: Period,
    pub amount_per_month: Money,
    pub paid_date: Option<NaiveDate>,
    pub notes: Option<String>,
}

impl BulkPaymentRequest {
    pub fn new(property_id: PropertyId, start: Period, end: Period, amount_per_month: Money) -> Self {
        Self {
            property_id,
            start,
            end,
            amount_per_month,
            paid_date: None,
            notes: None,
        }
    }

    pub fn paid_on(mut self, date: NaiveDate) -> Self {
        self.paid_date = Some(date);
        self
    }

    pub fn notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    fn details(&self) -> PaymentDetails {
        PaymentDetails {
            paid_date: self.paid_date,
            notes: self.notes.clone(),
            ..PaymentDetails::default()
        }
    }
}

/// a period that was not written
#[derive(Debug, Clone, PartialEq)]
pub struct BulkFailure {
    pub period: Period,
    pub error: LedgerError,
}

/// what a bulk application actually wrote
#[derive(Debug, Clone, PartialEq)]
pub struct BulkOutcome {
    pub applied: Vec<RentLedgerEntry>,
    pub failures: Vec<BulkFailure>,
}

impl BulkOutcome {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    /// periods to retry; rewriting applied ones is harmless
    pub fn pending_periods(&self) -> Vec<Period> {
        self.failures.iter().map(|f| f.period).collect()
    }
}

/// expands a month range into per-period paid writes
#[derive(Clone)]
pub struct BulkPaymentApplier {
    ledger: RentLedger,
}

impl BulkPaymentApplier {
    pub fn new(ledger: RentLedger) -> Self {
        Self { ledger }
    }

    /// apply one payment per month; each period commits on its own and a
    /// failed period does not stop the rest
    pub async fn apply_bulk(&self, request: &BulkPaymentRequest) -> Result<BulkOutcome> {
        let periods = month_range(request.start, request.end)?;
        let limit = self.ledger.context().config.max_bulk_periods;
        if periods.len() as u32 > limit {
            return Err(LedgerError::RangeTooLong {
                periods: periods.len() as u32,
                limit,
            });
        }
        if !request.amount_per_month.is_positive() {
            return Err(LedgerError::InvalidAmount {
                amount: request.amount_per_month,
            });
        }
        self.ledger
            .context()
            .properties
            .get_property(request.property_id)
            .await?;

        let mut outcome = BulkOutcome {
            applied: Vec::with_capacity(periods.len()),
            failures: Vec::new(),
        };

        for period in periods {
            match self
                .ledger
                .mark_paid(request.property_id, period, request.amount_per_month, request.details())
                .await
            {
                Ok(entry) => outcome.applied.push(entry),
                Err(error) => {
                    warn!(
                        property_id = %request.property_id,
                        period = %period,
                        error = %error,
                        "bulk payment period failed"
                    );
                    outcome.failures.push(BulkFailure { period, error });
                }
            }
        }

        info!(
            property_id = %request.property_id,
            start = %request.start,
            end = %request.end,
            applied = outcome.applied.len(),
            failed = outcome.failures.len(),
            "bulk payment applied"
        );
        let ctx = self.ledger.context();
        ctx.events.emit(Event::BulkPaymentApplied {
            property_id: request.property_id,
            start: request.start,
            end: request.end,
            applied: outcome.applied.len() as u32,
            failed: outcome.failures.len() as u32,
            timestamp: ctx.now(),
        });

        Ok(outcome)
    }
}
