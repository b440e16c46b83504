//! Rational timing types for exact musical timing
//!
//! All positions and durations are exact rationals measured in whole notes,
//! so `1/4` is a quarter note. Nothing here ever rounds, which keeps
//! repeated concatenation, stretching and shifting free of drift.
//!
//! Sums and products of rationals grow their denominators quickly, so code
//! combining caller-supplied times goes through [`try_add`], [`try_sub`],
//! [`try_mul`] and [`try_div`], which fail with
//! [`ValidationError::TimeOverflow`] instead of wrapping.

use crate::error::{Result, ValidationError};
use num_rational::Ratio;
use num_traits::{CheckedAdd, CheckedDiv, CheckedMul, CheckedSub, Signed, Zero};

/// Exact time point or duration in whole notes
pub type Time = Ratio<i64>;

/// The origin
pub const ZERO: Time = Ratio::new_raw(0, 1);

/// Whole-note to quarter-note factor used by tick conversion
const QUARTERS_PER_WHOLE: i64 = 4;

/// A half-open time span [start, end)
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TimeSpan {
    pub start: Time,
    pub end: Time,
}

impl TimeSpan {
    /// Create a new span from start to end
    pub fn new(start: Time, end: Time) -> Self {
        Self { start, end }
    }

    /// Length of this span
    pub fn duration(&self) -> Result<Time> {
        try_sub(self.end, self.start)
    }

    /// Check if a time point falls within this span [start, end)
    pub fn contains(&self, t: Time) -> bool {
        t >= self.start && t < self.end
    }

    /// Check if this span overlaps with another
    pub fn overlaps(&self, other: &TimeSpan) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// True when the span covers no time at all
    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }
}

/// Helper to create Time from a ratio n/d
#[inline]
pub fn time(n: i64, d: i64) -> Time {
    Ratio::new(n, d)
}

/// Create Time from a whole number of whole notes
#[inline]
pub fn whole(n: i64) -> Time {
    Ratio::from_integer(n)
}

/// True for any time strictly below zero
#[inline]
pub fn is_negative(t: Time) -> bool {
    t.is_negative()
}

/// Exact `a + b`
pub fn try_add(a: Time, b: Time) -> Result<Time> {
    a.checked_add(&b)
        .ok_or_else(|| ValidationError::TimeOverflow(format!("{} + {}", a, b)))
}

/// Exact `a - b`
pub fn try_sub(a: Time, b: Time) -> Result<Time> {
    a.checked_sub(&b)
        .ok_or_else(|| ValidationError::TimeOverflow(format!("{} - {}", a, b)))
}

/// Exact `a * b`
pub fn try_mul(a: Time, b: Time) -> Result<Time> {
    a.checked_mul(&b)
        .ok_or_else(|| ValidationError::TimeOverflow(format!("{} * {}", a, b)))
}

/// Exact `a / b`; dividing by zero is reported like an overflow
pub fn try_div(a: Time, b: Time) -> Result<Time> {
    a.checked_div(&b)
        .ok_or_else(|| ValidationError::TimeOverflow(format!("{} / {}", a, b)))
}

fn ticks_per_whole(ppq: u16) -> Result<i64> {
    if ppq == 0 {
        return Err(ValidationError::InvalidConfig(
            "ppq must be positive".to_string(),
        ));
    }
    Ok(ppq as i64 * QUARTERS_PER_WHOLE)
}

/// Convert a MIDI tick count at `ppq` pulses per quarter note to Time
pub fn ticks_to_time(ticks: u64, ppq: u16) -> Result<Time> {
    let ticks = i64::try_from(ticks)
        .map_err(|_| ValidationError::TimeOverflow(format!("{} ticks", ticks)))?;
    Ok(Ratio::new(ticks, ticks_per_whole(ppq)?))
}

/// Convert a Time to the nearest MIDI tick at `ppq` pulses per quarter note.
///
/// Negative times map to tick 0.
pub fn time_to_ticks(t: Time, ppq: u16) -> Result<u64> {
    let per_whole = ticks_per_whole(ppq)?;
    if t.is_negative() || t.is_zero() {
        return Ok(0);
    }
    let ticks = try_mul(t, whole(per_whole))?;
    Ok(ticks.round().to_integer() as u64)
}

/// Convert rational to f64 for display
#[inline]
pub fn to_f64(t: Time) -> f64 {
    *t.numer() as f64 / *t.denom() as f64
}

/// Parse "3/8", "2" or "-1/4" into Time
pub fn parse_time(s: &str) -> Option<Time> {
    s.trim().parse::<Time>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_time_creation() {
        let t = time(2, 6);
        assert_eq!(*t.numer(), 1);
        assert_eq!(*t.denom(), 3);
    }

    #[test]
    fn test_time_arithmetic() {
        let a = time(1, 3);
        let b = time(1, 6);
        assert_eq!(a + b, time(1, 2));
        assert_eq!(a - b, time(1, 6));
        assert!(a > b);
    }

    #[test]
    fn test_zero_constant() {
        assert_eq!(ZERO, whole(0));
        assert!(!is_negative(ZERO));
        assert!(is_negative(time(-1, 8)));
    }

    #[test]
    fn test_span_contains() {
        let span = TimeSpan::new(ZERO, time(1, 3));
        assert!(span.contains(ZERO));
        assert!(span.contains(time(1, 6)));
        assert!(!span.contains(time(1, 3))); // End is exclusive
        assert_eq!(span.duration(), Ok(time(1, 3)));
        assert!(TimeSpan::new(time(1, 2), time(1, 2)).is_empty());
    }

    #[test]
    fn test_span_overlaps() {
        let a = TimeSpan::new(ZERO, time(1, 2));
        let b = TimeSpan::new(time(1, 4), whole(1));
        let c = TimeSpan::new(time(1, 2), whole(1));
        assert!(a.overlaps(&b));
        assert!(!a.overlaps(&c));
    }

    #[test]
    fn test_tick_conversion() {
        // A quarter note at 480 ppq is 480 ticks
        assert_eq!(time_to_ticks(time(1, 4), 480), Ok(480));
        assert_eq!(ticks_to_time(480, 480), Ok(time(1, 4)));
        assert_eq!(ticks_to_time(1920, 480), Ok(whole(1)));
        assert_eq!(time_to_ticks(time(-1, 4), 480), Ok(0));
    }

    #[test]
    fn test_tick_rounding_is_nearest() {
        // 1/3 of a whole note at 96 ppq is exactly 128 ticks
        assert_eq!(time_to_ticks(time(1, 3), 96), Ok(128));
        // 1/7 at 96 ppq is 54.857... ticks
        assert_eq!(time_to_ticks(time(1, 7), 96), Ok(55));
    }

    #[test]
    fn test_tick_conversion_rejects_bad_input() {
        assert!(matches!(
            ticks_to_time(10, 0),
            Err(ValidationError::InvalidConfig(_))
        ));
        assert!(matches!(
            time_to_ticks(time(1, 4), 0),
            Err(ValidationError::InvalidConfig(_))
        ));
        assert!(matches!(
            ticks_to_time(u64::MAX, 480),
            Err(ValidationError::TimeOverflow(_))
        ));
        assert!(matches!(
            time_to_ticks(whole(i64::MAX / 2), 480),
            Err(ValidationError::TimeOverflow(_))
        ));
    }

    #[test]
    fn test_checked_arithmetic() {
        assert_eq!(try_add(time(1, 3), time(1, 6)), Ok(time(1, 2)));
        assert_eq!(try_sub(time(1, 3), time(1, 6)), Ok(time(1, 6)));
        assert_eq!(try_mul(time(2, 3), time(3, 4)), Ok(time(1, 2)));
        assert_eq!(try_div(time(1, 2), time(1, 4)), Ok(whole(2)));

        let big = time(1, i64::MAX - 1);
        assert!(matches!(
            try_add(big, time(1, i64::MAX - 2)),
            Err(ValidationError::TimeOverflow(_))
        ));
        assert!(matches!(
            try_mul(whole(i64::MAX), whole(2)),
            Err(ValidationError::TimeOverflow(_))
        ));
        assert!(matches!(
            try_div(whole(1), ZERO),
            Err(ValidationError::TimeOverflow(_))
        ));
    }

    #[test]
    fn test_parse_time() {
        assert_eq!(parse_time("3/8"), Some(time(3, 8)));
        assert_eq!(parse_time(" 2 "), Some(whole(2)));
        assert_eq!(parse_time("-1/4"), Some(time(-1, 4)));
        assert_eq!(parse_time("abc"), None);
    }

    #[test]
    fn test_to_f64() {
        assert_eq!(to_f64(time(1, 4)), 0.25);
    }
}
