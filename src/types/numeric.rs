//! PostgreSQL NUMERIC handling
//!
//! NUMERIC values are kept in their exact decimal text form so that no
//! precision is lost; conversion to `i64` or `f64` is available on demand.
//!
//! The binary wire format (used by the extended query protocol) is:
//! - ndigits (i16): number of base-10000 digits that follow
//! - weight (i16): power of 10000 of the first digit
//! - sign (u16): 0x0000 positive, 0x4000 negative, 0xC000 NaN,
//!   0xD000 +Infinity, 0xF000 -Infinity
//! - dscale (u16): number of decimal digits after the point
//! - digits (ndigits x i16): each 0..=9999

use std::fmt;
use std::str::FromStr;

use bytes::Buf;

use crate::error::{Error, Result};

const SIGN_POSITIVE: u16 = 0x0000;
const SIGN_NEGATIVE: u16 = 0x4000;
const SIGN_NAN: u16 = 0xC000;
const SIGN_POS_INFINITY: u16 = 0xD000;
const SIGN_NEG_INFINITY: u16 = 0xF000;

/// Special NUMERIC values
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Special {
    Finite,
    NaN,
    PosInfinity,
    NegInfinity,
}

/// Exact decimal value of a NUMERIC column
#[derive(Debug, Clone)]
pub struct Numeric {
    /// Decimal text as received
    value: String,
    special: Special,
}

impl Numeric {
    /// Parse the text form of a NUMERIC (`-12.340`, `NaN`, `Infinity`)
    pub fn parse(text: &str) -> Result<Self> {
        let trimmed = text.trim();
        let special = if trimmed.eq_ignore_ascii_case("nan") {
            Special::NaN
        } else if trimmed.eq_ignore_ascii_case("infinity") || trimmed.eq_ignore_ascii_case("+infinity") {
            Special::PosInfinity
        } else if trimmed.eq_ignore_ascii_case("-infinity") {
            Special::NegInfinity
        } else {
            Special::Finite
        };

        if special == Special::Finite && !is_decimal_literal(trimmed) {
            return Err(Error::DataConversion(format!(
                "invalid numeric literal: {:?}",
                text
            )));
        }

        Ok(Self {
            value: trimmed.to_string(),
            special,
        })
    }

    /// Decode the binary wire format of a NUMERIC
    pub fn from_binary(mut raw: &[u8]) -> Result<Self> {
        if raw.remaining() < 8 {
            return Err(Error::DataConversion(format!(
                "binary numeric requires at least 8 bytes, got {}",
                raw.len()
            )));
        }

        let ndigits = raw.get_i16();
        let weight = raw.get_i16();
        let sign = raw.get_u16();
        let dscale = raw.get_u16() as usize;

        match sign {
            SIGN_NAN => return Self::parse("NaN"),
            SIGN_POS_INFINITY => return Self::parse("Infinity"),
            SIGN_NEG_INFINITY => return Self::parse("-Infinity"),
            SIGN_POSITIVE | SIGN_NEGATIVE => {}
            other => {
                return Err(Error::DataConversion(format!(
                    "invalid binary numeric sign: {:#06x}",
                    other
                )));
            }
        }

        if ndigits < 0 || raw.remaining() < ndigits as usize * 2 {
            return Err(Error::DataConversion(format!(
                "binary numeric truncated: {} digits declared",
                ndigits
            )));
        }

        let mut digits = Vec::with_capacity(ndigits as usize);
        for _ in 0..ndigits {
            let digit = raw.get_i16();
            if !(0..=9999).contains(&digit) {
                return Err(Error::DataConversion(format!(
                    "invalid base-10000 digit in numeric: {}",
                    digit
                )));
            }
            digits.push(digit);
        }
        let digit_at = |idx: i32| -> i16 {
            if idx < 0 {
                0
            } else {
                digits.get(idx as usize).copied().unwrap_or(0)
            }
        };

        let mut text = String::new();
        if sign == SIGN_NEGATIVE {
            text.push('-');
        }

        if weight < 0 {
            text.push('0');
        } else {
            text.push_str(&digit_at(0).to_string());
            for idx in 1..=weight as i32 {
                text.push_str(&format!("{:04}", digit_at(idx)));
            }
        }

        if dscale > 0 {
            let mut fraction = String::with_capacity(dscale + 4);
            let mut idx = weight as i32 + 1;
            while fraction.len() < dscale {
                fraction.push_str(&format!("{:04}", digit_at(idx)));
                idx += 1;
            }
            fraction.truncate(dscale);
            text.push('.');
            text.push_str(&fraction);
        }

        Self::parse(&text)
    }

    /// Get the decimal text as received
    pub fn as_str(&self) -> &str {
        &self.value
    }

    /// Check if this is `NaN`
    pub fn is_nan(&self) -> bool {
        self.special == Special::NaN
    }

    /// Check if this is a positive or negative infinity
    pub fn is_infinite(&self) -> bool {
        matches!(self.special, Special::PosInfinity | Special::NegInfinity)
    }

    /// Check if the value has no fractional part
    pub fn is_integer(&self) -> bool {
        self.special == Special::Finite && !self.normalized().contains('.')
    }

    /// Number of digits after the decimal point, as written
    pub fn scale(&self) -> usize {
        match self.value.split_once('.') {
            Some((_, fraction)) if self.special == Special::Finite => fraction.len(),
            _ => 0,
        }
    }

    /// Canonical text: no leading integer zeros, no trailing fraction zeros,
    /// no negative zero
    pub fn normalized(&self) -> String {
        match self.special {
            Special::NaN => return "NaN".to_string(),
            Special::PosInfinity => return "Infinity".to_string(),
            Special::NegInfinity => return "-Infinity".to_string(),
            Special::Finite => {}
        }

        let negative = self.value.starts_with('-');
        let unsigned = self.value.trim_start_matches(|c: char| c == '+' || c == '-');
        let (integer, fraction) = unsigned.split_once('.').unwrap_or((unsigned, ""));
        let integer = integer.trim_start_matches('0');
        let fraction = fraction.trim_end_matches('0');

        if integer.is_empty() && fraction.is_empty() {
            return "0".to_string();
        }

        let mut out = String::with_capacity(self.value.len());
        if negative {
            out.push('-');
        }
        out.push_str(if integer.is_empty() { "0" } else { integer });
        if !fraction.is_empty() {
            out.push('.');
            out.push_str(fraction);
        }
        out
    }

    /// Try to convert to i64 (only whole numbers in range)
    pub fn to_i64(&self) -> Result<i64> {
        if !self.is_integer() {
            return Err(Error::DataConversion(format!(
                "numeric {} is not a whole number",
                self.value
            )));
        }
        self.normalized()
            .parse()
            .map_err(|e| Error::DataConversion(format!("Cannot parse as i64: {}", e)))
    }

    /// Convert to f64 (may lose precision)
    pub fn to_f64(&self) -> Result<f64> {
        match self.special {
            Special::NaN => Ok(f64::NAN),
            Special::PosInfinity => Ok(f64::INFINITY),
            Special::NegInfinity => Ok(f64::NEG_INFINITY),
            Special::Finite => self
                .value
                .parse()
                .map_err(|e| Error::DataConversion(format!("Cannot parse as f64: {}", e))),
        }
    }
}

/// Optional sign, digits, optional point and fraction, at least one digit
fn is_decimal_literal(text: &str) -> bool {
    let unsigned = text
        .strip_prefix('-')
        .or_else(|| text.strip_prefix('+'))
        .unwrap_or(text);
    let (integer, fraction) = unsigned.split_once('.').unwrap_or((unsigned, ""));
    !(integer.is_empty() && fraction.is_empty())
        && integer.bytes().all(|b| b.is_ascii_digit())
        && fraction.bytes().all(|b| b.is_ascii_digit())
}

impl PartialEq for Numeric {
    fn eq(&self, other: &Self) -> bool {
        self.normalized() == other.normalized()
    }
}

impl Eq for Numeric {}

impl FromStr for Numeric {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl From<i64> for Numeric {
    fn from(v: i64) -> Self {
        Self {
            value: v.to_string(),
            special: Special::Finite,
        }
    }
}

impl fmt::Display for Numeric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.value)
    }
}
