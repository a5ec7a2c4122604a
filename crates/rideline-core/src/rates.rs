//! Rate tables and payout splits.
//!
//! A [`RideRates`] aggregate is reference data supplied by configuration. The
//! fare calculator reads it and never mutates it. Range checks live in
//! [`RideRates::validation_errors`], which the configuration loader runs once
//! at startup.

use serde::{Deserialize, Serialize};

use crate::time_window::{uncovered_windows, ClockTime, TimeWindow};

/// Tolerance used when checking that payout percentages sum to 100.
pub const PAYOUT_SUM_TOLERANCE: f64 = 1e-4;

/// Pricing for one time-of-day band.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateTable {
    /// First minute of the band, `"HH:mm"`.
    pub start_time: ClockTime,

    /// Last minute of the band, `"HH:mm"`. May be earlier than `start_time`
    /// when the band crosses midnight.
    pub end_time: ClockTime,

    /// Flat fare charged for every ride.
    pub base_fare: f64,

    /// Price per kilometer travelled.
    pub price_per_km: f64,

    /// Waiting minutes included for free.
    pub wait_time_free_minutes: f64,

    /// Price per waiting minute beyond the free allowance.
    pub price_per_minute: f64,
}

impl RateTable {
    /// The time-of-day window this table applies to.
    #[must_use]
    pub const fn window(&self) -> TimeWindow {
        TimeWindow::new(self.start_time, self.end_time)
    }

    /// Returns `true` if the band is active at `time`.
    #[must_use]
    pub const fn applies_at(&self, time: ClockTime) -> bool {
        self.window().contains(time)
    }

    fn numeric_fields(&self) -> [(&'static str, f64); 4] {
        [
            ("base_fare", self.base_fare),
            ("price_per_km", self.price_per_km),
            ("wait_time_free_minutes", self.wait_time_free_minutes),
            ("price_per_minute", self.price_per_minute),
        ]
    }
}

/// Percentage split of a fare between driver, company and pension fund.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PayoutSplit {
    /// Driver share, 0-100.
    pub driver_percent: f64,
    /// Company share, 0-100.
    pub company_percent: f64,
    /// Pension/emergency fund share, 0-100.
    pub pension_fund_percent: f64,
}

impl PayoutSplit {
    /// Sum of the three shares.
    #[must_use]
    pub fn total_percent(&self) -> f64 {
        self.driver_percent + self.company_percent + self.pension_fund_percent
    }
}

impl Default for PayoutSplit {
    fn default() -> Self {
        Self {
            driver_percent: 73.0,
            company_percent: 25.0,
            pension_fund_percent: 2.0,
        }
    }
}

/// The complete pricing configuration for rides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RideRates {
    /// Daytime band.
    pub day_rates: RateTable,

    /// Night band. Also used for any time covered by neither band.
    pub night_rates: RateTable,

    /// Insurance surcharge applied to the subtotal, 0-100.
    pub insurance_percent: f64,

    /// How the rounded total is split.
    pub payouts: PayoutSplit,
}

impl Default for RideRates {
    fn default() -> Self {
        Self {
            day_rates: RateTable {
                start_time: ClockTime::wrapping(6, 30),
                end_time: ClockTime::wrapping(17, 30),
                base_fare: 1000.0,
                price_per_km: 300.0,
                wait_time_free_minutes: 5.0,
                price_per_minute: 100.0,
            },
            night_rates: RateTable {
                start_time: ClockTime::wrapping(17, 31),
                end_time: ClockTime::wrapping(6, 29),
                base_fare: 1500.0,
                price_per_km: 400.0,
                wait_time_free_minutes: 5.0,
                price_per_minute: 150.0,
            },
            insurance_percent: 2.0,
            payouts: PayoutSplit::default(),
        }
    }
}

/// A single problem found while validating [`RideRates`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateIssue {
    /// Dotted path of the offending field, e.g. `day_rates.price_per_km`.
    pub field: String,
    /// Human-readable description.
    pub message: String,
}

impl RateIssue {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl RideRates {
    /// Windows of the day covered by neither band.
    ///
    /// Rides priced during a gap use the night rates.
    #[must_use]
    pub fn coverage_gaps(&self) -> Vec<TimeWindow> {
        uncovered_windows(&[self.day_rates.window(), self.night_rates.window()])
    }

    /// Checks every numeric field and returns all problems found.
    ///
    /// An empty vector means the rates are safe to price with.
    #[must_use]
    pub fn validation_errors(&self) -> Vec<RateIssue> {
        let mut issues = Vec::new();

        for (band, table) in [("day_rates", &self.day_rates), ("night_rates", &self.night_rates)] {
            for (name, value) in table.numeric_fields() {
                if !value.is_finite() {
                    issues.push(RateIssue::new(
                        format!("{band}.{name}"),
                        format!("must be a finite number (got {value})"),
                    ));
                } else if value < 0.0 {
                    issues.push(RateIssue::new(
                        format!("{band}.{name}"),
                        format!("must not be negative (got {value})"),
                    ));
                }
            }
        }

        let percents = [
            ("insurance_percent", self.insurance_percent),
            ("payouts.driver_percent", self.payouts.driver_percent),
            ("payouts.company_percent", self.payouts.company_percent),
            ("payouts.pension_fund_percent", self.payouts.pension_fund_percent),
        ];
        for (name, value) in percents {
            if !(0.0..=100.0).contains(&value) {
                issues.push(RateIssue::new(
                    name,
                    format!("must be between 0 and 100 (got {value})"),
                ));
            }
        }

        let sum = self.payouts.total_percent();
        if (sum - 100.0).abs() > PAYOUT_SUM_TOLERANCE {
            issues.push(RateIssue::new(
                "payouts",
                format!("percentages must sum to 100 (got {sum})"),
            ));
        }

        issues
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_rates_are_valid() {
        let rates = RideRates::default();
        assert!(rates.validation_errors().is_empty());
        assert!(rates.coverage_gaps().is_empty());
    }

    #[test]
    fn test_negative_and_non_finite_fields_are_reported() {
        let mut rates = RideRates::default();
        rates.day_rates.price_per_km = -1.0;
        rates.night_rates.base_fare = f64::NAN;

        let issues = rates.validation_errors();
        let fields: Vec<&str> = issues.iter().map(|i| i.field.as_str()).collect();
        assert_eq!(fields, vec!["day_rates.price_per_km", "night_rates.base_fare"]);
        assert!(issues[0].message.contains("negative"));
        assert!(issues[1].message.contains("finite"));
    }

    #[test]
    fn test_percent_out_of_range() {
        let mut rates = RideRates::default();
        rates.insurance_percent = 150.0;

        let issues = rates.validation_errors();
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].field, "insurance_percent");
    }

    #[test]
    fn test_payout_sum_must_be_100() {
        let mut rates = RideRates::default();
        rates.payouts.company_percent = 20.0;

        let issues = rates.validation_errors();
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].field, "payouts");
        assert!(issues[0].message.contains("95"));
    }

    #[test]
    fn test_coverage_gap_detected() {
        let mut rates = RideRates::default();
        rates.night_rates.end_time = "22:00".parse().unwrap();

        let gaps = rates.coverage_gaps();
        assert_eq!(gaps.len(), 1);
        assert_eq!(gaps[0].to_string(), "22:01-06:29");
    }

    #[test]
    fn test_rate_table_applies_at() {
        let rates = RideRates::default();
        let ten = "10:00".parse().unwrap();
        let late = "23:15".parse().unwrap();
        assert!(rates.day_rates.applies_at(ten));
        assert!(!rates.night_rates.applies_at(ten));
        assert!(rates.night_rates.applies_at(late));
    }
}
