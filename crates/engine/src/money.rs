use std::{
    fmt,
    iter::Sum,
    ops::{Add, AddAssign, Neg, Sub, SubAssign},
    str::FromStr,
};

use crate::{EngineError, Quantity, ResultEngine};

/// Signed money amount represented as **integer minor units** (paise).
///
/// Use this type for **all** monetary values in the engine (prices, totals,
/// payments, ledger amounts) to avoid floating-point drift.
///
/// # Examples
///
/// ```rust
/// use engine::Money;
///
/// let amount = Money::new(12_34);
/// assert_eq!(amount.minor(), 1234);
/// assert_eq!(amount.to_string(), "12.34");
/// ```
///
/// Parsing from user input (accepts `.` or `,` as decimal separator; rejects >
/// 2 decimals):
///
/// ```rust
/// use engine::Money;
///
/// assert_eq!("10".parse::<Money>().unwrap().minor(), 1000);
/// assert_eq!("10,5".parse::<Money>().unwrap().minor(), 1050);
/// assert!("12.345".parse::<Money>().is_err());
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct Money(i64);

impl Money {
    pub const ZERO: Money = Money(0);

    /// Largest magnitude accepted from input or produced by [`Money::times`]
    /// (ten trillion rupees). Keeps column sums inside `i64`.
    pub const MAX: Money = Money(1_000_000_000_000_000);

    /// Creates a new amount from integer minor units.
    #[must_use]
    pub const fn new(minor: i64) -> Self {
        Self(minor)
    }

    /// Returns the raw value in minor units.
    #[must_use]
    pub const fn minor(self) -> i64 {
        self.0
    }

    /// Returns `true` if the amount is positive.
    #[must_use]
    pub const fn is_positive(self) -> bool {
        self.0 > 0
    }

    /// Checked addition (returns `None` on overflow).
    #[must_use]
    pub fn checked_add(self, rhs: Money) -> Option<Money> {
        self.0.checked_add(rhs.0).map(Money)
    }

    /// Checked subtraction (returns `None` on overflow).
    #[must_use]
    pub fn checked_sub(self, rhs: Money) -> Option<Money> {
        self.0.checked_sub(rhs.0).map(Money)
    }

    /// Converts a JSON number into an amount.
    ///
    /// The number is read through its shortest decimal representation, so
    /// `45.5` becomes exactly `4550` minor units.
    pub fn from_major(value: f64) -> ResultEngine<Money> {
        Money::bounded(i128::from(parse_decimal_f64(value, 2, "amount")?), "amount")
    }

    /// Returns the amount in major units, for presentation only.
    #[must_use]
    pub fn to_major(self) -> f64 {
        self.0 as f64 / 100.0
    }

    /// Unit price times quantity, rounded half away from zero to the paisa.
    ///
    /// ```rust
    /// use engine::{Money, Quantity};
    ///
    /// let price = Money::new(45_50);
    /// let qty = Quantity::from_milli(100_000);
    /// assert_eq!(price.times(qty).unwrap(), Money::new(4_550_00));
    /// assert!(Money::MAX.times(Quantity::from_milli(2_000)).is_err());
    /// ```
    pub fn times(self, quantity: Quantity) -> ResultEngine<Money> {
        let product = i128::from(self.0) * i128::from(quantity.milli());
        Money::bounded(div_round(product, 1000), "total amount")
    }

    /// Mean of `count` amounts summing to `self`, rounded to the paisa.
    #[must_use]
    pub fn average(self, count: u64) -> Money {
        if count == 0 {
            return Money::ZERO;
        }
        let mean = div_round(i128::from(self.0), i128::from(count));
        // |mean| <= |self| for any count >= 1.
        i64::try_from(mean).map_or(self, Money)
    }

    fn bounded(minor: i128, label: &str) -> ResultEngine<Money> {
        i64::try_from(minor)
            .ok()
            .filter(|value| value.unsigned_abs() <= Money::MAX.0.unsigned_abs())
            .map(Money)
            .ok_or_else(|| EngineError::invalid(format!("{label} too large")))
    }

    /// `self` as a percentage of `base` with two decimals, `"0"` when `base`
    /// is not positive.
    #[must_use]
    pub fn percent_of(self, base: Money) -> String {
        if !base.is_positive() {
            return "0".to_string();
        }
        format!("{:.2}", self.0 as f64 / base.0 as f64 * 100.0)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        let rupees = abs / 100;
        let paise = abs % 100;
        write!(f, "{sign}{rupees}.{paise:02}")
    }
}

impl From<i64> for Money {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl From<Money> for i64 {
    fn from(value: Money) -> Self {
        value.0
    }
}

impl Add for Money {
    type Output = Money;

    fn add(self, rhs: Money) -> Self::Output {
        Money(self.0 + rhs.0)
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, rhs: Money) {
        self.0 += rhs.0;
    }
}

impl Sub for Money {
    type Output = Money;

    fn sub(self, rhs: Money) -> Self::Output {
        Money(self.0 - rhs.0)
    }
}

impl SubAssign for Money {
    fn sub_assign(&mut self, rhs: Money) {
        self.0 -= rhs.0;
    }
}

impl Neg for Money {
    type Output = Money;

    fn neg(self) -> Self::Output {
        Money(-self.0)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::ZERO, Add::add)
    }
}

impl FromStr for Money {
    type Err = EngineError;

    /// Parses a decimal string into minor units.
    ///
    /// Accepts `.` or `,` as decimal separator and an optional leading `+`/`-`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Money::bounded(i128::from(parse_decimal(s, 2, "amount")?), "amount")
    }
}

fn div_round(numerator: i128, denominator: i128) -> i128 {
    let quotient = numerator / denominator;
    let remainder = numerator % denominator;
    if remainder.abs() * 2 >= denominator.abs() {
        quotient + numerator.signum() * denominator.signum()
    } else {
        quotient
    }
}

/// Reads a float through its shortest round-trip representation and parses it
/// as a fixed-point decimal with `scale` fractional digits.
pub(crate) fn parse_decimal_f64(value: f64, scale: u32, label: &str) -> ResultEngine<i64> {
    if !value.is_finite() {
        return Err(EngineError::invalid(format!("invalid {label}")));
    }
    parse_decimal(&value.to_string(), scale, label)
}

/// Parses a decimal string into an integer scaled by `10^scale`.
///
/// Rejects more than `scale` fractional digits.
pub(crate) fn parse_decimal(s: &str, scale: u32, label: &str) -> ResultEngine<i64> {
    let invalid = || EngineError::invalid(format!("invalid {label}"));
    let overflow = || EngineError::invalid(format!("{label} too large"));

    let trimmed = s.trim();
    let (negative, rest) = if let Some(stripped) = trimmed.strip_prefix('-') {
        (true, stripped)
    } else if let Some(stripped) = trimmed.strip_prefix('+') {
        (false, stripped)
    } else {
        (false, trimmed)
    };
    if rest.is_empty() {
        return Err(EngineError::invalid(format!("empty {label}")));
    }

    let rest = rest.replace(',', ".");
    let mut parts = rest.split('.');
    let whole_str = parts.next().ok_or_else(invalid)?;
    let frac_str = parts.next().unwrap_or("");
    if parts.next().is_some() {
        return Err(invalid());
    }
    if whole_str.is_empty() || !whole_str.chars().all(|c| c.is_ascii_digit()) {
        return Err(invalid());
    }
    if !frac_str.chars().all(|c| c.is_ascii_digit()) {
        return Err(invalid());
    }
    if frac_str.len() > scale as usize {
        return Err(EngineError::invalid(format!(
            "{label} must have at most {scale} decimal places"
        )));
    }

    let whole: i64 = whole_str.parse().map_err(|_| overflow())?;
    let frac: i64 = if frac_str.is_empty() {
        0
    } else {
        let padding = 10i64.pow(scale - frac_str.len() as u32);
        frac_str.parse::<i64>().map_err(|_| invalid())? * padding
    };

    let total = whole
        .checked_mul(10i64.pow(scale))
        .and_then(|v| v.checked_add(frac))
        .ok_or_else(overflow)?;

    if negative {
        total.checked_neg().ok_or_else(overflow)
    } else {
        Ok(total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_formats_two_decimals() {
        assert_eq!(Money::new(0).to_string(), "0.00");
        assert_eq!(Money::new(1).to_string(), "0.01");
        assert_eq!(Money::new(1050).to_string(), "10.50");
        assert_eq!(Money::new(-1050).to_string(), "-10.50");
    }

    #[test]
    fn parse_accepts_dot_or_comma() {
        assert_eq!("10".parse::<Money>().unwrap().minor(), 1000);
        assert_eq!("10.5".parse::<Money>().unwrap().minor(), 1050);
        assert_eq!("10,50".parse::<Money>().unwrap().minor(), 1050);
        assert_eq!("-0.01".parse::<Money>().unwrap().minor(), -1);
        assert_eq!("  2.30 ".parse::<Money>().unwrap().minor(), 230);
    }

    #[test]
    fn parse_rejects_more_than_two_decimals() {
        assert!("12.345".parse::<Money>().is_err());
        assert!("0.001".parse::<Money>().is_err());
    }

    #[test]
    fn from_major_reads_shortest_representation() {
        assert_eq!(Money::from_major(45.5).unwrap(), Money::new(4550));
        assert_eq!(Money::from_major(0.1).unwrap(), Money::new(10));
        assert_eq!(Money::from_major(1000.0).unwrap(), Money::new(100_000));
        assert!(Money::from_major(1.005).is_err());
        assert!(Money::from_major(f64::NAN).is_err());
    }

    #[test]
    fn times_rounds_half_away_from_zero() {
        // 0.01 * 0.5 = 0.005 -> 0.01
        assert_eq!(
            Money::new(1).times(Quantity::from_milli(500)).unwrap(),
            Money::new(1)
        );
        // 0.01 * 0.499 -> 0.00
        assert_eq!(
            Money::new(1).times(Quantity::from_milli(499)).unwrap(),
            Money::ZERO
        );
        assert_eq!(
            Money::new(4800).times(Quantity::from_milli(90_000)).unwrap(),
            Money::new(432_000)
        );
    }

    #[test]
    fn oversized_amounts_are_rejected() {
        let too_large = Err(EngineError::invalid("total amount too large"));
        assert_eq!(Money::MAX.times(Quantity::from_milli(1_000)), Ok(Money::MAX));
        assert_eq!(Money::MAX.times(Quantity::from_milli(1_001)), too_large);
        assert_eq!(
            Money::new(i64::MAX).times(Quantity::from_milli(i64::MAX)),
            too_large
        );
        assert_eq!(
            Money::from_major(1e16),
            Err(EngineError::invalid("amount too large"))
        );
        assert!("10000000000000".parse::<Money>().is_ok());
        assert!("10000000000000.01".parse::<Money>().is_err());
        assert_eq!(Money::new(i64::MIN).average(1), Money::new(i64::MIN));
        assert_eq!(Money::new(i64::MAX).average(2), Money::new(i64::MAX / 2 + 1));
    }

    #[test]
    fn average_and_percent() {
        assert_eq!(Money::new(1000).average(3), Money::new(333));
        assert_eq!(Money::new(2000).average(3), Money::new(667));
        assert_eq!(Money::new(500).average(0), Money::ZERO);
        assert_eq!(Money::new(2500).percent_of(Money::new(10_000)), "25.00");
        assert_eq!(Money::new(2500).percent_of(Money::ZERO), "0");
    }
}
