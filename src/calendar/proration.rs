use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::calendar::Period;
use crate::decimal::Money;
use crate::errors::{LedgerError, Result};

/// how much of a month a tenant occupied
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Coverage {
    /// occupied from this date (inclusive) to month end
    MoveIn(NaiveDate),
    /// occupied from day 1 through this date (inclusive)
    MoveOut(NaiveDate),
    /// explicit day count
    Days(u32),
}

impl Coverage {
    /// days covered within `period`; move dates outside the period cover the full month
    pub fn days_covered(&self, period: Period) -> Result<u32> {
        let total = period.days();
        let days = match *self {
            Coverage::MoveIn(date) if period.contains(date) => total - date.day() + 1,
            Coverage::MoveOut(date) if period.contains(date) => date.day(),
            Coverage::MoveIn(_) | Coverage::MoveOut(_) => total,
            Coverage::Days(days) => days,
        };

        if days == 0 || days > total {
            return Err(LedgerError::InvalidCoverage {
                message: format!("{} days is outside 1..={} for {}", days, total, period),
            });
        }
        Ok(days)
    }
}

/// result of a proration calculation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proration {
    pub period: Period,
    pub amount: Money,
    pub days_covered: u32,
    pub days_in_month: u32,
}

impl Proration {
    pub fn is_full_month(&self) -> bool {
        self.days_covered == self.days_in_month
    }
}

/// unrounded daily rate for a month; never stored
pub fn daily_rate(monthly_rent: Money, period: Period) -> Decimal {
    monthly_rent.as_decimal() / Decimal::from(period.days())
}

/// prorate monthly rent for partial occupancy, rounded half-up to cents
pub fn prorate(monthly_rent: Money, period: Period, coverage: Coverage) -> Result<Proration> {
    let days_covered = coverage.days_covered(period)?;
    let days_in_month = period.days();

    // multiply before dividing so a full month reproduces the rent exactly
    let amount = if days_covered == days_in_month {
        monthly_rent
    } else {
        Money::from_decimal(
            monthly_rent.as_decimal() * Decimal::from(days_covered) / Decimal::from(days_in_month),
        )
    };

    if !amount.is_positive() {
        return Err(LedgerError::InvalidCoverage {
            message: format!("prorated amount {} must be positive", amount),
        });
    }

    Ok(Proration {
        period,
        amount,
        days_covered,
        days_in_month,
    })
}

pub fn prorated_amount(monthly_rent: Money, period: Period, coverage: Coverage) -> Result<Money> {
    prorate(monthly_rent, period, coverage).map(|p| p.amount)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn period(year: i32, month: u32) -> Period {
        Period::new(year, month).unwrap()
    }

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    #[test]
    fn test_daily_rates_sum_to_rent() {
        let rents = [
            Money::from_major(1000),
            Money::from_major(1500),
            Money::from_str_exact("1234.56").unwrap(),
            Money::from_major(3100),
            Money::from_str_exact("999.99").unwrap(),
        ];

        for rent in rents {
            for year in [2023, 2024] {
                for month in 1..=12 {
                    let p = period(year, month);
                    let rate = daily_rate(rent, p);
                    let total: Decimal = (0..p.days()).map(|_| rate).sum();
                    assert!(
                        (total - rent.as_decimal()).abs() <= dec!(0.01),
                        "{} in {} summed to {}",
                        rent,
                        p,
                        total
                    );
                }
            }
        }
    }

    #[test]
    fn test_full_month_days_equals_rent_exactly() {
        let rent = Money::from_major(1000);
        for month in 1..=12 {
            let p = period(2024, month);
            let amount = prorated_amount(rent, p, Coverage::Days(p.days())).unwrap();
            assert_eq!(amount, rent);
        }
    }

    #[test]
    fn test_move_in_on_day_one_is_full_month() {
        let rent = Money::from_str_exact("1234.56").unwrap();
        let amount = prorated_amount(rent, period(2024, 3), Coverage::MoveIn(date(2024, 3, 1))).unwrap();
        assert_eq!(amount, rent);
    }

    #[test]
    fn test_move_out_on_day_one_is_one_day() {
        let rent = Money::from_major(3000);
        let p = period(2024, 6); // 30 days
        let amount = prorated_amount(rent, p, Coverage::MoveOut(date(2024, 6, 1))).unwrap();
        assert_eq!(amount, Money::from_major(100));

        let rent = Money::from_major(1000);
        let p = period(2024, 1);
        let amount = prorated_amount(rent, p, Coverage::MoveOut(date(2024, 1, 1))).unwrap();
        assert_eq!(amount, Money::from_decimal(daily_rate(rent, p)));
        assert_eq!(amount, Money::from_str_exact("32.26").unwrap());
    }

    #[test]
    fn test_move_in_day_twenty_of_31_day_month() {
        let rent = Money::from_major(3100);
        let proration = prorate(rent, period(2024, 1), Coverage::MoveIn(date(2024, 1, 20))).unwrap();
        assert_eq!(proration.days_covered, 12);
        assert_eq!(proration.amount, Money::from_major(1200));
        assert!(!proration.is_full_month());
    }

    #[test]
    fn test_move_dates_outside_period_cover_full_month() {
        let rent = Money::from_major(1500);
        let p = period(2024, 2);
        assert_eq!(prorated_amount(rent, p, Coverage::MoveIn(date(2024, 1, 15))).unwrap(), rent);
        assert_eq!(prorated_amount(rent, p, Coverage::MoveOut(date(2024, 3, 15))).unwrap(), rent);
    }

    #[test]
    fn test_rounding_is_half_up() {
        // 1000 * 10 / 31 = 322.580645...
        let amount = prorated_amount(Money::from_major(1000), period(2024, 1), Coverage::Days(10)).unwrap();
        assert_eq!(amount, Money::from_str_exact("322.58").unwrap());

        // 1.05 * 15 / 30 = 0.525
        let amount = prorated_amount(Money::from_str_exact("1.05").unwrap(), period(2024, 6), Coverage::Days(15)).unwrap();
        assert_eq!(amount, Money::from_str_exact("0.53").unwrap());
    }

    #[test]
    fn test_invalid_coverage() {
        let rent = Money::from_major(1000);
        let feb = period(2023, 2);
        assert!(matches!(
            prorate(rent, feb, Coverage::Days(0)),
            Err(LedgerError::InvalidCoverage { .. })
        ));
        assert!(matches!(
            prorate(rent, feb, Coverage::Days(29)),
            Err(LedgerError::InvalidCoverage { .. })
        ));
        assert!(matches!(
            prorate(Money::ZERO, feb, Coverage::Days(10)),
            Err(LedgerError::InvalidCoverage { .. })
        ));
    }
}
