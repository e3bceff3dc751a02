//! Human-readable size parsing for size-valued flags
//!
//! Accepts:
//! - Plain integers: `4096`
//! - Hexadecimal: `0x1000`
//! - One binary unit suffix: `4K`, `16m`, `1G`, `2T`
//! - An optional trailing `B` or `iB`: `4KB`, `4KiB`

use thiserror::Error;

/// Errors produced by [`parse_size`]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SizeParseError {
    #[error("empty size")]
    Empty,

    #[error("invalid number in size: {0}")]
    InvalidNumber(String),

    #[error("unknown unit suffix: {0}")]
    InvalidSuffix(String),

    #[error("size overflows 64 bits: {0}")]
    Overflow(String),
}

/// Parse a size such as `4096`, `0x1000`, `4K` or `16MiB` into bytes
///
/// # Example
/// ```
/// use sysperf::size::parse_size;
///
/// assert_eq!(parse_size("4K").unwrap(), 4096);
/// assert_eq!(parse_size("0x10").unwrap(), 16);
/// assert!(parse_size("4KK").is_err());
/// ```
pub fn parse_size(input: &str) -> Result<u64, SizeParseError> {
    let input = input.trim();
    if input.is_empty() {
        return Err(SizeParseError::Empty);
    }

    let (digits, radix) = match input
        .strip_prefix("0x")
        .or_else(|| input.strip_prefix("0X"))
    {
        Some(hex) => (hex, 16),
        None => (input, 10),
    };

    let split = digits
        .find(|c: char| !c.is_digit(radix))
        .unwrap_or(digits.len());
    let (number, suffix) = digits.split_at(split);
    if number.is_empty() {
        return Err(SizeParseError::InvalidNumber(input.to_string()));
    }

    let value = u64::from_str_radix(number, radix)
        .map_err(|_| SizeParseError::Overflow(input.to_string()))?;
    let shift = unit_shift(suffix)?;

    value
        .checked_mul(1u64 << shift)
        .ok_or_else(|| SizeParseError::Overflow(input.to_string()))
}

/// Binary shift for a unit suffix; exactly one unit letter is allowed
fn unit_shift(suffix: &str) -> Result<u32, SizeParseError> {
    let mut chars = suffix.chars();
    let shift = match chars.next() {
        None => return Ok(0),
        Some('k' | 'K') => 10,
        Some('m' | 'M') => 20,
        Some('g' | 'G') => 30,
        Some('t' | 'T') => 40,
        Some('b' | 'B') if suffix.len() == 1 => return Ok(0),
        Some(_) => return Err(SizeParseError::InvalidSuffix(suffix.to_string())),
    };

    match chars.as_str() {
        "" | "b" | "B" | "ib" | "iB" => Ok(shift),
        _ => Err(SizeParseError::InvalidSuffix(suffix.to_string())),
    }
}

/// clap value parser for size flags
pub fn parse_size_arg(input: &str) -> Result<u64, String> {
    parse_size(input).map_err(|e| e.to_string())
}
