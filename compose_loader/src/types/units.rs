//! Duration and byte-size scalars with their unit-suffix grammars.
//!
//! Durations follow the `1h30m`, `1.5s`, `300ms` grammar. Byte sizes accept
//! an optional binary unit (`b`, `k`, `m`, `g`, `t`, `p`, optionally
//! followed by `i` and/or `b`, case-insensitive), so `512m`, `1.5GiB` and
//! `64kb` are all valid.

use std::fmt;

use serde::{Deserialize, Serialize};

const NANOS_PER_MICRO: u128 = 1_000;
const NANOS_PER_MILLI: u128 = 1_000_000;
const NANOS_PER_SECOND: u128 = 1_000_000_000;
const NANOS_PER_MINUTE: u128 = 60 * NANOS_PER_SECOND;
const NANOS_PER_HOUR: u128 = 60 * NANOS_PER_MINUTE;

/// Signed span of time with nanosecond precision.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Duration(i64);

impl Duration {
    /// Duration of `nanos` nanoseconds.
    #[must_use]
    pub const fn from_nanos(nanos: i64) -> Self {
        Self(nanos)
    }

    /// Duration of `secs` whole seconds, saturating on overflow.
    #[must_use]
    pub const fn from_secs(secs: i64) -> Self {
        Self(secs.saturating_mul(1_000_000_000))
    }

    /// Length in nanoseconds.
    #[must_use]
    pub const fn as_nanos(self) -> i64 {
        self.0
    }

    /// Convert to [`std::time::Duration`]. Returns `None` for negative spans.
    #[must_use]
    pub fn to_std(self) -> Option<std::time::Duration> {
        u64::try_from(self.0).ok().map(std::time::Duration::from_nanos)
    }

    /// Parse a unit-suffixed duration such as `1m30s` or `-1.5h`.
    ///
    /// # Errors
    ///
    /// Returns a message describing the invalid input.
    ///
    /// # Examples
    ///
    /// ```
    /// use compose_loader::types::Duration;
    /// assert_eq!(Duration::parse("1m30s"), Ok(Duration::from_secs(90)));
    /// assert_eq!(Duration::parse("1.5s"), Ok(Duration::from_nanos(1_500_000_000)));
    /// assert!(Duration::parse("10").is_err());
    /// ```
    pub fn parse(input: &str) -> Result<Self, String> {
        let invalid = || format!("time: invalid duration {input:?}");
        let (negative, body) = input
            .strip_prefix('-')
            .map_or_else(|| (false, input.strip_prefix('+').unwrap_or(input)), |rest| (true, rest));
        if body == "0" {
            return Ok(Self(0));
        }
        if body.is_empty() {
            return Err(invalid());
        }
        let mut total: u128 = 0;
        let mut rest = body;
        while !rest.is_empty() {
            let (number, after_number) = split_number(rest);
            if number.whole.is_empty() && number.fraction.is_empty() {
                return Err(invalid());
            }
            let unit_len = after_number
                .find(|c: char| c.is_ascii_digit() || c == '.')
                .unwrap_or(after_number.len());
            let (unit, remainder) = after_number.split_at(unit_len);
            if unit.is_empty() {
                return Err(format!("time: missing unit in duration {input:?}"));
            }
            let scale = duration_unit(unit)
                .ok_or_else(|| format!("time: unknown unit {unit:?} in duration {input:?}"))?;
            let amount = number.scaled(scale).ok_or_else(invalid)?;
            total = total.checked_add(amount).ok_or_else(invalid)?;
            rest = remainder;
        }
        let magnitude = i64::try_from(total).map_err(|_| invalid())?;
        Ok(Self(if negative { -magnitude } else { magnitude }))
    }
}

fn duration_unit(unit: &str) -> Option<u128> {
    Some(match unit {
        "ns" => 1,
        "us" | "\u{b5}s" | "\u{3bc}s" => NANOS_PER_MICRO,
        "ms" => NANOS_PER_MILLI,
        "s" => NANOS_PER_SECOND,
        "m" => NANOS_PER_MINUTE,
        "h" => NANOS_PER_HOUR,
        _ => return None,
    })
}

impl fmt::Display for Duration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0 == 0 {
            return f.write_str("0s");
        }
        if self.0 < 0 {
            f.write_str("-")?;
        }
        let nanos = u128::from(self.0.unsigned_abs());
        if nanos < NANOS_PER_MICRO {
            return write!(f, "{nanos}ns");
        }
        if nanos < NANOS_PER_MILLI {
            return write!(f, "{}\u{b5}s", decimal(nanos, NANOS_PER_MICRO));
        }
        if nanos < NANOS_PER_SECOND {
            return write!(f, "{}ms", decimal(nanos, NANOS_PER_MILLI));
        }
        let hours = nanos.div_euclid(NANOS_PER_HOUR);
        let minutes = nanos.rem_euclid(NANOS_PER_HOUR).div_euclid(NANOS_PER_MINUTE);
        let seconds = decimal(nanos.rem_euclid(NANOS_PER_MINUTE), NANOS_PER_SECOND);
        if hours > 0 {
            write!(f, "{hours}h{minutes}m{seconds}s")
        } else if minutes > 0 {
            write!(f, "{minutes}m{seconds}s")
        } else {
            write!(f, "{seconds}s")
        }
    }
}

/// Render `value / scale` with trailing fractional zeros removed.
fn decimal(value: u128, scale: u128) -> String {
    let whole = value.div_euclid(scale);
    let fraction = value.rem_euclid(scale);
    if fraction == 0 {
        return whole.to_string();
    }
    let width = scale.to_string().len().saturating_sub(1);
    let digits = format!("{fraction:0width$}");
    format!("{whole}.{}", digits.trim_end_matches('0'))
}

/// Amount of memory or storage in bytes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UnitBytes(i64);

impl UnitBytes {
    /// Size of `bytes` bytes.
    #[must_use]
    pub const fn new(bytes: i64) -> Self {
        Self(bytes)
    }

    /// Size in bytes.
    #[must_use]
    pub const fn bytes(self) -> i64 {
        self.0
    }

    /// Parse a human-readable size with binary units.
    ///
    /// # Errors
    ///
    /// Returns a message describing the invalid input.
    ///
    /// # Examples
    ///
    /// ```
    /// use compose_loader::types::UnitBytes;
    /// assert_eq!(UnitBytes::parse("512m"), Ok(UnitBytes::new(512 * 1024 * 1024)));
    /// assert_eq!(UnitBytes::parse("1.5k"), Ok(UnitBytes::new(1536)));
    /// assert!(UnitBytes::parse("12 apples").is_err());
    /// ```
    pub fn parse(input: &str) -> Result<Self, String> {
        let invalid = || format!("invalid size: {input:?}");
        let (number, suffix) = split_number(input);
        if number.whole.is_empty() {
            return Err(invalid());
        }
        let unit = suffix.strip_prefix(' ').unwrap_or(suffix);
        let mut chars = unit.chars().peekable();
        let power = match chars.peek().map(char::to_ascii_lowercase) {
            Some('k') => 1,
            Some('m') => 2,
            Some('g') => 3,
            Some('t') => 4,
            Some('p') => 5,
            _ => 0,
        };
        if power > 0 {
            chars.next();
        }
        if chars.peek().is_some_and(|c| c.eq_ignore_ascii_case(&'i')) {
            chars.next();
        }
        if chars.peek().is_some_and(|c| c.eq_ignore_ascii_case(&'b')) {
            chars.next();
        }
        if chars.next().is_some() {
            return Err(invalid());
        }
        let scale = 1024_u128.pow(power);
        let bytes = number.scaled(scale).ok_or_else(invalid)?;
        i64::try_from(bytes).map(Self).map_err(|_| invalid())
    }
}

impl fmt::Display for UnitBytes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Decimal literal split into its whole and fractional digit runs.
struct DecimalLiteral<'a> {
    whole: &'a str,
    fraction: &'a str,
}

impl DecimalLiteral<'_> {
    /// Multiply the literal by `scale`, truncating any remaining fraction.
    fn scaled(&self, scale: u128) -> Option<u128> {
        let whole: u128 = if self.whole.is_empty() {
            0
        } else {
            self.whole.parse().ok()?
        };
        let amount = whole.checked_mul(scale)?;
        let digits: String = self.fraction.chars().take(18).collect();
        if digits.is_empty() {
            return Some(amount);
        }
        let fraction: u128 = digits.parse().ok()?;
        let denominator = 10_u128.pow(u32::try_from(digits.len()).ok()?);
        amount.checked_add(fraction.checked_mul(scale)?.div_euclid(denominator))
    }
}

/// Split a leading `digits[.digits]` literal off `input`.
fn split_number(input: &str) -> (DecimalLiteral<'_>, &str) {
    let whole_len = input.find(|c: char| !c.is_ascii_digit()).unwrap_or(input.len());
    let (whole, after_whole) = input.split_at(whole_len);
    let Some(after_dot) = after_whole.strip_prefix('.') else {
        return (DecimalLiteral { whole, fraction: "" }, after_whole);
    };
    let fraction_len = after_dot
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(after_dot.len());
    let (fraction, rest) = after_dot.split_at(fraction_len);
    (DecimalLiteral { whole, fraction }, rest)
}
