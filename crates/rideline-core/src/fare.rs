//! Ride fare computation.
//!
//! Prices a ride from its distance and accumulated waiting time using the
//! rate band active at the time of pricing, adds the insurance surcharge and
//! splits the total into payouts.
//!
//! Every monetary figure is rounded to whole currency units on its own: the
//! breakdown fields, the total and each payout. Their sums therefore may
//! differ from the total by a unit or two. Persisted fares rely on this, so
//! it must not be replaced by a round-once-and-redistribute scheme.

use chrono::{DateTime, TimeZone};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::rates::{RateTable, RideRates};
use crate::time_window::ClockTime;

/// Errors raised for ride inputs that cannot be priced.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    /// Distance was below zero.
    #[error("Distance must not be negative (got {0} km)")]
    NegativeDistance(f64),

    /// Waiting time was below zero.
    #[error("Waiting time must not be negative (got {0} min)")]
    NegativeWait(f64),

    /// An input was NaN or infinite.
    #[error("{field} must be a finite number (got {value})")]
    NonFinite {
        /// Name of the input.
        field: &'static str,
        /// Value received.
        value: f64,
    },

    /// A rounded amount does not fit in the integer currency range.
    #[error("{field} is too large to price (got {value})")]
    AmountOutOfRange {
        /// Name of the amount.
        field: &'static str,
        /// Unrounded amount.
        value: f64,
    },
}

/// Which band priced a ride.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RateBand {
    /// The day band.
    Day,
    /// The night band, or a time covered by neither band.
    Night,
}

/// Rounded components of a fare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FareBreakdown {
    /// Flat base fare.
    pub base_fare: i64,
    /// Distance component.
    pub distance_cost: i64,
    /// Waiting component, beyond the free minutes.
    pub wait_cost: i64,
    /// Insurance surcharge on the subtotal.
    pub insurance_fee: i64,
}

/// Rounded payout amounts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payouts {
    /// Driver's share of the total.
    pub driver_earnings: i64,
    /// Company's share of the total.
    pub company_earnings: i64,
    /// Pension/emergency fund share of the total.
    pub pension_fund: i64,
}

/// The priced fare of a ride.
///
/// Created once when a ride is accepted or completed and stored verbatim with
/// the ride afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FareResult {
    /// Subtotal plus insurance, rounded.
    pub total: i64,
    /// Individually rounded components.
    pub breakdown: FareBreakdown,
    /// Split of `total`.
    pub payouts: Payouts,
    /// Band that priced the ride.
    pub band: RateBand,
    /// Waiting minutes that were charged.
    pub extra_wait_minutes: f64,
}

/// Picks the rate table active at `at`.
///
/// The day band is tested first, then the night band. A time covered by
/// neither band is priced with the night rates.
#[must_use]
pub fn select_rate_band(rates: &RideRates, at: ClockTime) -> (RateBand, &RateTable) {
    if rates.day_rates.applies_at(at) {
        (RateBand::Day, &rates.day_rates)
    } else if rates.night_rates.applies_at(at) {
        (RateBand::Night, &rates.night_rates)
    } else {
        debug!(time = %at, "time outside both rate bands, using night rates");
        (RateBand::Night, &rates.night_rates)
    }
}

/// Prices a ride at the wall-clock time of `now`.
///
/// The time of day is taken in `now`'s own timezone, so callers pass a
/// timestamp already converted to the operating timezone.
///
/// # Errors
///
/// Returns a [`ValidationError`] if `distance_km` or `wait_minutes` is
/// negative or not finite.
pub fn calculate_fare<Tz: TimeZone>(
    distance_km: f64,
    wait_minutes: f64,
    rates: &RideRates,
    now: &DateTime<Tz>,
) -> Result<FareResult, ValidationError> {
    calculate_fare_at(distance_km, wait_minutes, rates, ClockTime::of(now))
}

/// Prices a ride at a given wall-clock time of day.
///
/// # Errors
///
/// Returns a [`ValidationError`] if `distance_km` or `wait_minutes` is
/// negative or not finite, or if an amount overflows `i64` once rounded.
pub fn calculate_fare_at(
    distance_km: f64,
    wait_minutes: f64,
    rates: &RideRates,
    at: ClockTime,
) -> Result<FareResult, ValidationError> {
    check_input("distance_km", distance_km)?;
    check_input("wait_minutes", wait_minutes)?;
    if distance_km < 0.0 {
        return Err(ValidationError::NegativeDistance(distance_km));
    }
    if wait_minutes < 0.0 {
        return Err(ValidationError::NegativeWait(wait_minutes));
    }

    let (band, rate) = select_rate_band(rates, at);

    let extra_wait_minutes = (wait_minutes - rate.wait_time_free_minutes).max(0.0);
    let distance_cost = distance_km * rate.price_per_km;
    let wait_cost = extra_wait_minutes * rate.price_per_minute;
    let subtotal = rate.base_fare + distance_cost + wait_cost;
    let insurance_fee = subtotal * rates.insurance_percent / 100.0;
    let total = round_money("total", subtotal + insurance_fee)?;

    let split = &rates.payouts;
    let result = FareResult {
        total,
        breakdown: FareBreakdown {
            base_fare: round_money("base_fare", rate.base_fare)?,
            distance_cost: round_money("distance_cost", distance_cost)?,
            wait_cost: round_money("wait_cost", wait_cost)?,
            insurance_fee: round_money("insurance_fee", insurance_fee)?,
        },
        payouts: Payouts {
            driver_earnings: share_of("driver_earnings", total, split.driver_percent)?,
            company_earnings: share_of("company_earnings", total, split.company_percent)?,
            pension_fund: share_of("pension_fund", total, split.pension_fund_percent)?,
        },
        band,
        extra_wait_minutes,
    };

    debug!(
        time = %at,
        ?band,
        distance_km,
        wait_minutes,
        total = result.total,
        "priced ride"
    );

    Ok(result)
}

fn check_input(field: &'static str, value: f64) -> Result<(), ValidationError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(ValidationError::NonFinite { field, value })
    }
}

#[allow(clippy::cast_precision_loss)]
fn share_of(field: &'static str, total: i64, percent: f64) -> Result<i64, ValidationError> {
    round_money(field, total as f64 * percent / 100.0)
}

/// 2^63, the first magnitude outside `i64`.
#[allow(clippy::cast_precision_loss)]
const I64_LIMIT: f64 = i64::MAX as f64;

/// Rounds half away from zero, which for the non-negative amounts priced here
/// is round-half-up.
#[allow(clippy::cast_possible_truncation)]
fn round_money(field: &'static str, value: f64) -> Result<i64, ValidationError> {
    let rounded = value.round();
    if (-I64_LIMIT..I64_LIMIT).contains(&rounded) {
        Ok(rounded as i64)
    } else {
        Err(ValidationError::AmountOutOfRange { field, value })
    }
}
