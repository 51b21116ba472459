use std::{
    fmt::Display,
    iter::Sum,
    ops::{Add, AddAssign, Sub},
};

use serde::{Deserialize, Serialize};
use sqlx::Type;
use thiserror::Error;

use crate::op;

pub const DEFAULT_CURRENCY_CODE: &str = "INR";
/// Every currency the gateway is configured for uses two decimal places (paise, cents).
pub const MINOR_UNITS_PER_MAJOR: i64 = 100;

//--------------------------------------     MinorUnits       ---------------------------------------------------------
/// An amount of money expressed in the smallest unit of its currency, e.g. paise for INR.
///
/// Enrollment prices are captured as decimal major units on the checkout form. The payment gateway only ever deals
/// in integer minor units, so the conversion happens exactly once, when a payment session is created.
#[derive(Debug, Clone, Copy, Default, Type, Ord, PartialOrd, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[sqlx(transparent)]
#[serde(transparent)]
pub struct MinorUnits(i64);

op!(binary MinorUnits, Add, add);
op!(binary MinorUnits, Sub, sub);
op!(inplace MinorUnits, AddAssign, add_assign);

impl Sum for MinorUnits {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), Add::add)
    }
}

#[derive(Debug, Clone, Error)]
#[error("Value cannot be represented in minor currency units: {0}")]
pub struct MinorUnitsConversionError(String);

impl From<i64> for MinorUnits {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl Display for MinorUnits {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let whole = self.0 / MINOR_UNITS_PER_MAJOR;
        let fraction = (self.0 % MINOR_UNITS_PER_MAJOR).abs();
        let sign = if self.0 < 0 && whole == 0 { "-" } else { "" };
        write!(f, "{sign}{whole}.{fraction:02}")
    }
}

impl MinorUnits {
    pub fn value(&self) -> i64 {
        self.0
    }

    pub fn is_positive(&self) -> bool {
        self.0 > 0
    }

    /// Converts a decimal amount in major units into minor units, rounding to the nearest unit.
    ///
    /// NaN, infinities and values that overflow an `i64` are rejected.
    pub fn from_major(amount: f64) -> Result<Self, MinorUnitsConversionError> {
        if !amount.is_finite() {
            return Err(MinorUnitsConversionError(format!("{amount} is not a finite number")));
        }
        let minor = (amount * MINOR_UNITS_PER_MAJOR as f64).round();
        if minor > i64::MAX as f64 || minor < i64::MIN as f64 {
            return Err(MinorUnitsConversionError(format!("{amount} is out of range")));
        }
        #[allow(clippy::cast_possible_truncation)]
        Ok(Self(minor as i64))
    }
}
