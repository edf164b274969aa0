//! Numeric helpers shared by the combat rules.
//!
//! The combat rules are written in decimal percentages with one-decimal
//! rounding, so the engine works in `f64` and funnels every
//! balance-critical rounding step through the helpers here.

/// Round to one decimal place, half away from zero.
///
/// All effect powers and stat transfers are stored at one-decimal
/// precision; this is the single rounding policy for them.
#[must_use]
pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Clamp a percentage chance into `[0, 100]`.
#[must_use]
pub fn clamp_chance(chance: f64) -> f64 {
    chance.clamp(0.0, 100.0)
}

/// Format a one-decimal power value for log lines.
///
/// Whole values print without the trailing `.0` (`2` rather than `2.0`),
/// fractional values keep one decimal.
#[must_use]
pub fn fmt_power(value: f64) -> String {
    let rounded = round1(value);
    if rounded.fract() == 0.0 {
        format!("{}", rounded as i64)
    } else {
        format!("{rounded:.1}")
    }
}
