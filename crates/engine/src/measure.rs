//! Fixed-point milk measures: litres and fat percentage.

use std::{
    fmt,
    ops::{Add, Sub},
    str::FromStr,
};

use crate::{
    EngineError, ResultEngine,
    money::{parse_decimal, parse_decimal_f64},
};

/// Milk quantity in **thousandths of a litre**.
///
/// ```rust
/// use engine::Quantity;
///
/// let qty: Quantity = "12.5".parse().unwrap();
/// assert_eq!(qty.milli(), 12_500);
/// assert_eq!(qty.to_string(), "12.5");
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct Quantity(i64);

impl Quantity {
    pub const ZERO: Quantity = Quantity(0);

    /// One trillion litres.
    pub const MAX: Quantity = Quantity(1_000_000_000_000_000);

    #[must_use]
    pub const fn from_milli(milli: i64) -> Self {
        Self(milli)
    }

    #[must_use]
    pub const fn milli(self) -> i64 {
        self.0
    }

    #[must_use]
    pub const fn is_positive(self) -> bool {
        self.0 > 0
    }

    pub fn from_litres(value: f64) -> ResultEngine<Quantity> {
        Quantity::bounded(parse_decimal_f64(value, 3, "quantity")?)
    }

    fn bounded(milli: i64) -> ResultEngine<Quantity> {
        if milli.unsigned_abs() > Quantity::MAX.0.unsigned_abs() {
            return Err(EngineError::invalid("quantity too large"));
        }
        Ok(Quantity(milli))
    }

    #[must_use]
    pub fn to_litres(self) -> f64 {
        self.0 as f64 / 1000.0
    }
}

impl Add for Quantity {
    type Output = Quantity;

    fn add(self, rhs: Quantity) -> Self::Output {
        Quantity(self.0 + rhs.0)
    }
}

impl Sub for Quantity {
    type Output = Quantity;

    fn sub(self, rhs: Quantity) -> Self::Output {
        Quantity(self.0 - rhs.0)
    }
}

/// Shortest form: `90`, `45.5`, `0.125`.
impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_trimmed(f, self.0, 1000, 3)
    }
}

impl FromStr for Quantity {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Quantity::bounded(parse_decimal(s, 3, "quantity")?)
    }
}

/// Butterfat percentage in **hundredths of a percent**.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct FatPercentage(i64);

impl FatPercentage {
    /// 100.00 %
    pub const MAX: FatPercentage = FatPercentage(100_00);

    #[must_use]
    pub const fn from_centi(centi: i64) -> Self {
        Self(centi)
    }

    #[must_use]
    pub const fn centi(self) -> i64 {
        self.0
    }

    pub fn from_percent(value: f64) -> ResultEngine<FatPercentage> {
        parse_decimal_f64(value, 2, "fat percentage").map(FatPercentage)
    }

    #[must_use]
    pub fn to_percent(self) -> f64 {
        self.0 as f64 / 100.0
    }

    /// `true` when `0 < fat <= 100`.
    #[must_use]
    pub const fn is_valid(self) -> bool {
        self.0 > 0 && self.0 <= Self::MAX.0
    }
}

impl fmt::Display for FatPercentage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_trimmed(f, self.0, 100, 2)
    }
}

impl FromStr for FatPercentage {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_decimal(s, 2, "fat percentage").map(FatPercentage)
    }
}

fn write_trimmed(f: &mut fmt::Formatter<'_>, value: i64, unit: u64, scale: usize) -> fmt::Result {
    let sign = if value < 0 { "-" } else { "" };
    let abs = value.unsigned_abs();
    let whole = abs / unit;
    let frac = abs % unit;
    if frac == 0 {
        return write!(f, "{sign}{whole}");
    }
    let digits = format!("{frac:0scale$}");
    write!(f, "{sign}{whole}.{}", digits.trim_end_matches('0'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quantity_accepts_three_decimals() {
        assert_eq!(Quantity::from_litres(0.125).unwrap().milli(), 125);
        assert_eq!(Quantity::from_litres(100.0).unwrap().milli(), 100_000);
        assert!(Quantity::from_litres(0.0001).is_err());
        assert_eq!(Quantity::from_litres(1e12).unwrap(), Quantity::MAX);
        assert_eq!(
            Quantity::from_litres(2e12),
            Err(EngineError::invalid("quantity too large"))
        );
    }

    #[test]
    fn quantity_display_is_trimmed() {
        assert_eq!(Quantity::from_milli(90_000).to_string(), "90");
        assert_eq!(Quantity::from_milli(45_500).to_string(), "45.5");
        assert_eq!(Quantity::from_milli(125).to_string(), "0.125");
    }

    #[test]
    fn fat_bounds() {
        assert!(FatPercentage::from_percent(3.5).unwrap().is_valid());
        assert!(FatPercentage::from_percent(100.0).unwrap().is_valid());
        assert!(!FatPercentage::from_percent(100.01).unwrap().is_valid());
        assert!(!FatPercentage::from_percent(0.0).unwrap().is_valid());
        assert!(FatPercentage::from_percent(3.555).is_err());
        assert_eq!(FatPercentage::from_centi(350).to_string(), "3.5");
    }
}
