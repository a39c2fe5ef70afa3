//! Decimal amount parsing and base-unit conversion
//!
//! User-entered amounts are kept as strings until planning. Conversion to base
//! units is done on the decimal digits directly so that truncation is exact:
//! `"1.9999995"` at 6 decimals is `1_999_999`, never `2_000_000`.

use thiserror::Error;

/// Decimals of the native asset (lamports per SOL = 10^9)
pub const NATIVE_DECIMALS: u8 = 9;

/// Fraction digits shown in totals and summaries
pub const DISPLAY_DECIMALS: usize = 6;

/// Largest precision accepted for any asset. 10^19 no longer fits in a u64.
pub const MAX_DECIMALS: u8 = 19;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AmountError {
    #[error("amount is empty")]
    Empty,

    #[error("'{0}' is not a decimal number")]
    NotANumber(String),

    #[error("amount must be greater than zero")]
    NotPositive,

    #[error("amount does not fit in base units")]
    Overflow,

    #[error("unsupported precision: {0} decimals")]
    UnsupportedDecimals(u8),
}

/// A non-negative decimal split into its integer and fractional digits
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecimalAmount {
    integer: String,
    fraction: String,
}

impl DecimalAmount {
    /// Parse a user-entered amount. Surrounding whitespace is ignored.
    ///
    /// Accepts `[+]digits[.digits]`, `[+].digits` and `digits.`.
    pub fn parse(input: &str) -> Result<Self, AmountError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(AmountError::Empty);
        }

        let unsigned = trimmed.strip_prefix('+').unwrap_or(trimmed);
        let (integer, fraction) = match unsigned.split_once('.') {
            Some((i, f)) => (i, f),
            None => (unsigned, ""),
        };

        let all_digits = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
        if (integer.is_empty() && fraction.is_empty()) || !all_digits(integer) || !all_digits(fraction)
        {
            return Err(AmountError::NotANumber(trimmed.to_string()));
        }

        let integer = integer.trim_start_matches('0');
        let fraction = fraction.trim_end_matches('0');

        Ok(Self {
            integer: integer.to_string(),
            fraction: fraction.to_string(),
        })
    }

    /// Parse and require a value strictly greater than zero
    pub fn parse_positive(input: &str) -> Result<Self, AmountError> {
        let amount = Self::parse(input)?;
        if amount.is_zero() {
            return Err(AmountError::NotPositive);
        }
        Ok(amount)
    }

    pub fn is_zero(&self) -> bool {
        self.integer.is_empty() && self.fraction.is_empty()
    }

    /// `floor(self × 10^decimals)`; fractional base units are discarded.
    pub fn to_base_units(&self, decimals: u8) -> Result<u64, AmountError> {
        if decimals > MAX_DECIMALS {
            return Err(AmountError::UnsupportedDecimals(decimals));
        }

        let mut digits = String::with_capacity(self.integer.len() + decimals as usize);
        digits.push_str(&self.integer);
        for i in 0..decimals as usize {
            digits.push(self.fraction.as_bytes().get(i).map_or('0', |b| *b as char));
        }

        let digits = digits.trim_start_matches('0');
        if digits.is_empty() {
            return Ok(0);
        }
        digits.parse::<u64>().map_err(|_| AmountError::Overflow)
    }

    /// Lossy float view used only for display totals
    pub fn to_f64(&self) -> f64 {
        format!("{}.{}", self.integer_or_zero(), self.fraction_or_zero())
            .parse()
            .unwrap_or(0.0)
    }

    fn integer_or_zero(&self) -> &str {
        if self.integer.is_empty() {
            "0"
        } else {
            &self.integer
        }
    }

    fn fraction_or_zero(&self) -> &str {
        if self.fraction.is_empty() {
            "0"
        } else {
            &self.fraction
        }
    }
}

impl std::fmt::Display for DecimalAmount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.fraction.is_empty() {
            write!(f, "{}", self.integer_or_zero())
        } else {
            write!(f, "{}.{}", self.integer_or_zero(), self.fraction)
        }
    }
}

/// Convert a user-entered amount straight to base units
pub fn to_base_units(input: &str, decimals: u8) -> Result<u64, AmountError> {
    DecimalAmount::parse_positive(input)?.to_base_units(decimals)
}

/// Render base units back as a decimal string with full precision
pub fn format_base_units(units: u64, decimals: u8) -> String {
    if decimals == 0 {
        return units.to_string();
    }
    let scale = 10u128.pow(decimals as u32);
    let units = units as u128;
    format!(
        "{}.{:0width$}",
        units / scale,
        units % scale,
        width = decimals as usize
    )
}

/// Base units for display: at least `DISPLAY_DECIMALS` fraction digits, more
/// only when the value needs them
pub fn format_display_units(units: u64, decimals: u8) -> String {
    let full = format_base_units(units, decimals);
    let Some((whole, fraction)) = full.split_once('.') else {
        return format!("{}.{:0<width$}", full, "", width = DISPLAY_DECIMALS);
    };
    let kept = fraction.trim_end_matches('0');
    let width = kept.len().max(DISPLAY_DECIMALS);
    format!("{}.{:0<width$}", whole, kept, width = width)
}
