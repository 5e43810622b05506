//! Typed field values

use chrono::{DateTime, Utc};
use std::fmt;
use std::str::FromStr;

use super::error::RecordError;
use super::field::FieldType;

const SCALE: i64 = 1000;
const MAX_INTEGER_DIGITS: usize = 7;
const MAX_FRACTION_DIGITS: usize = 3;
const LIMIT: i64 = 10_000_000 * SCALE;

/// Fixed-point DECIMAL(10,3), stored as thousandths
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Decimal(i64);

impl Decimal {
    /// Build from thousandths; `None` when the value needs more than 7 integer digits
    pub fn from_thousandths(thousandths: i64) -> Option<Self> {
        (thousandths.unsigned_abs() < LIMIT.unsigned_abs()).then_some(Self(thousandths))
    }

    /// Nearest representable value, rounding half away from zero
    pub fn from_f64(value: f64) -> Option<Self> {
        if !value.is_finite() {
            return None;
        }
        let scaled = (value * SCALE as f64).round();
        if scaled.abs() >= LIMIT as f64 {
            return None;
        }
        Some(Self(scaled as i64))
    }

    pub fn thousandths(self) -> i64 {
        self.0
    }

    pub fn to_f64(self) -> f64 {
        self.0 as f64 / SCALE as f64
    }
}

impl FromStr for Decimal {
    type Err = RecordError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || RecordError::InvalidDecimal(s.to_string());

        let (negative, unsigned) = match s.as_bytes().first() {
            Some(b'-') => (true, &s[1..]),
            Some(b'+') => (false, &s[1..]),
            _ => (false, s),
        };

        let (int_part, frac_part) = unsigned.split_once('.').unwrap_or((unsigned, ""));

        let all_digits = |part: &str| part.bytes().all(|b| b.is_ascii_digit());
        if (int_part.is_empty() && frac_part.is_empty())
            || !all_digits(int_part)
            || !all_digits(frac_part)
        {
            return Err(invalid());
        }

        // Leading zeros do not count towards the integer digits
        let significant = int_part.trim_start_matches('0');
        if significant.len() > MAX_INTEGER_DIGITS {
            return Err(invalid());
        }
        let int_value: i64 = if significant.is_empty() {
            0
        } else {
            significant.parse().map_err(|_| invalid())?
        };

        // Digits past the third are rounded half away from zero
        let mut frac_value: i64 = 0;
        for (i, digit) in frac_part.bytes().take(MAX_FRACTION_DIGITS + 1).enumerate() {
            let digit = i64::from(digit - b'0');
            if i < MAX_FRACTION_DIGITS {
                frac_value = frac_value * 10 + digit;
            } else if digit >= 5 {
                frac_value += 1;
            }
        }
        for _ in frac_part.len()..MAX_FRACTION_DIGITS {
            frac_value *= 10;
        }

        let magnitude = int_value * SCALE + frac_value;
        if magnitude >= LIMIT {
            return Err(invalid());
        }
        Ok(Self(if negative { -magnitude } else { magnitude }))
    }
}

impl fmt::Display for Decimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let magnitude = self.0.abs();
        write!(f, "{}{}.{:03}", sign, magnitude / SCALE, magnitude % SCALE)
    }
}

/// A single value in a [`Record`](super::Record)
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Text(String),
    Integer(i64),
    Decimal(Decimal),
    DateTime(DateTime<Utc>),
    Null,
}

impl FieldValue {
    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }

    /// Whether this value may be stored in a field of `field_type`; null fits anywhere
    pub fn fits(&self, field_type: FieldType) -> bool {
        matches!(
            (self, field_type),
            (FieldValue::Null, _)
                | (FieldValue::Text(_), FieldType::Text)
                | (FieldValue::Integer(_), FieldType::Integer)
                | (FieldValue::Decimal(_), FieldType::Decimal)
                | (FieldValue::DateTime(_), FieldType::DateTime)
        )
    }

    pub fn kind(&self) -> &'static str {
        match self {
            FieldValue::Text(_) => "text",
            FieldValue::Integer(_) => "integer",
            FieldValue::Decimal(_) => "decimal",
            FieldValue::DateTime(_) => "datetime",
            FieldValue::Null => "null",
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            FieldValue::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_decimal(&self) -> Option<Decimal> {
        match self {
            FieldValue::Decimal(d) => Some(*d),
            _ => None,
        }
    }

    pub fn as_datetime(&self) -> Option<DateTime<Utc>> {
        match self {
            FieldValue::DateTime(t) => Some(*t),
            _ => None,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Text(s) => write!(f, "'{}'", s),
            FieldValue::Integer(i) => write!(f, "{}", i),
            FieldValue::Decimal(d) => write!(f, "{}", d),
            FieldValue::DateTime(t) => write!(f, "{}", t.to_rfc3339()),
            FieldValue::Null => write!(f, "NULL"),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Text(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Integer(value)
    }
}

impl From<i32> for FieldValue {
    fn from(value: i32) -> Self {
        FieldValue::Integer(i64::from(value))
    }
}

impl From<Decimal> for FieldValue {
    fn from(value: Decimal) -> Self {
        FieldValue::Decimal(value)
    }
}

impl From<DateTime<Utc>> for FieldValue {
    fn from(value: DateTime<Utc>) -> Self {
        FieldValue::DateTime(value)
    }
}

impl<T: Into<FieldValue>> From<Option<T>> for FieldValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(FieldValue::Null, Into::into)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    #[test]
    fn test_decimal_parsing() {
        assert_eq!(dec("12.5").thousandths(), 12_500);
        assert_eq!(dec("-0.001").thousandths(), -1);
        assert_eq!(dec("+7").thousandths(), 7_000);
        assert_eq!(dec(".25").thousandths(), 250);
        assert_eq!(dec("9999999.999").thousandths(), 9_999_999_999);
        assert_eq!(dec("1.").thousandths(), 1_000);
        assert_eq!(dec("0001234.500").thousandths(), 1_234_500);
    }

    #[test]
    fn test_decimal_rounds_extra_fraction_digits() {
        assert_eq!(dec("12.3450").thousandths(), 12_345);
        assert_eq!(dec("1.2345").thousandths(), 1_235);
        assert_eq!(dec("1.23449999").thousandths(), 1_234);
        assert_eq!(dec("-0.0005").thousandths(), -1);
        assert_eq!(dec("0.9996").thousandths(), 1_000);
        assert!("9999999.9995".parse::<Decimal>().is_err());
    }

    #[test]
    fn test_from_thousandths_bounds() {
        assert_eq!(
            Decimal::from_thousandths(-9_999_999_999).map(Decimal::thousandths),
            Some(-9_999_999_999)
        );
        assert_eq!(Decimal::from_thousandths(10_000_000_000), None);
        assert_eq!(Decimal::from_thousandths(i64::MIN), None);
    }

    #[test]
    fn test_decimal_rejects_malformed() {
        for bad in ["", "-", ".", "12345678", "1.2.3", "1,5", "1e3", " 1", "--1"] {
            assert!(bad.parse::<Decimal>().is_err(), "accepted {:?}", bad);
        }
    }

    #[test]
    fn test_decimal_display() {
        assert_eq!(dec("12.5").to_string(), "12.500");
        assert_eq!(dec("-0.25").to_string(), "-0.250");
        assert_eq!(Decimal::default().to_string(), "0.000");
    }

    #[test]
    fn test_decimal_from_f64_rounds_to_thousandths() {
        assert_eq!(Decimal::from_f64(1.2346), Some(dec("1.235")));
        assert_eq!(Decimal::from_f64(-2.0004), Some(dec("-2")));
        assert_eq!(Decimal::from_f64(0.1 + 0.2), Some(dec("0.3")));
        assert_eq!(Decimal::from_f64(f64::NAN), None);
        assert_eq!(Decimal::from_f64(1e12), None);
    }

    #[test]
    fn test_value_fits_type() {
        assert!(FieldValue::from("x").fits(FieldType::Text));
        assert!(!FieldValue::from("x").fits(FieldType::Integer));
        assert!(FieldValue::Null.fits(FieldType::DateTime));
        assert!(FieldValue::from(None::<i64>).is_null());
    }
}
