//! Numeric helpers: rounding modes, integer checks, epsilon comparisons.
//!
//! Ledger amounts are integers; percent math and stats are `f64`. Every
//! conversion from `f64` back to a ledger integer goes through
//! [`to_integer`] or [`round_to_integer`], which reject non-finite and
//! fractional values as configuration errors.

use serde::{Deserialize, Serialize};

use super::error::{EngineError, EngineResult};

/// Magnitudes below this are treated as zero.
pub const EPSILON: f64 = 1e-9;

/// Rounding applied to percent-derived values.
///
/// Effects round the magnitude and keep the sign (see
/// [`RoundingMode::apply_to_magnitude`]), so a removal rounded `Up` removes
/// more. [`RoundingMode::apply`] rounds a signed value as-is.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoundingMode {
    /// Magnitude away from zero.
    Up,
    /// Magnitude toward zero.
    Down,
    /// Nearest integer, ties away from zero.
    Nearest,
}

impl RoundingMode {
    /// Round a signed value: `Up` is ceiling, `Down` is floor.
    #[must_use]
    pub fn apply(self, value: f64) -> f64 {
        match self {
            RoundingMode::Up => value.ceil(),
            RoundingMode::Down => value.floor(),
            RoundingMode::Nearest => value.round(),
        }
    }

    /// Round the magnitude of a value, keeping its sign.
    ///
    /// `Up` moves away from zero and `Down` toward zero.
    #[must_use]
    pub fn apply_to_magnitude(self, value: f64) -> f64 {
        let magnitude = self.apply(value.abs());
        if value < 0.0 {
            -magnitude
        } else {
            magnitude
        }
    }
}

/// True if the value is within [`EPSILON`] of zero.
#[must_use]
pub fn is_negligible(value: f64) -> bool {
    value.abs() < EPSILON
}

/// Reject non-finite values.
pub fn ensure_finite(value: f64, context: impl FnOnce() -> String) -> EngineResult<f64> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(EngineError::NonFinite { context: context() })
    }
}

/// Convert an exact integral `f64` to `i64`.
pub fn to_integer(value: f64, context: impl Fn() -> String) -> EngineResult<i64> {
    let value = ensure_finite(value, &context)?;
    if value.fract() != 0.0 || value.abs() > i64::MAX as f64 {
        return Err(EngineError::NonInteger {
            context: context(),
            value,
        });
    }
    Ok(value as i64)
}

/// Round a value's magnitude with the given mode, then convert to `i64`.
pub fn round_to_integer(
    value: f64,
    mode: RoundingMode,
    context: impl Fn() -> String,
) -> EngineResult<i64> {
    let value = ensure_finite(value, &context)?;
    to_integer(mode.apply_to_magnitude(value), context)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rounding_modes() {
        assert_eq!(RoundingMode::Up.apply(2.1), 3.0);
        assert_eq!(RoundingMode::Down.apply(2.9), 2.0);
        assert_eq!(RoundingMode::Nearest.apply(2.5), 3.0);
        assert_eq!(RoundingMode::Nearest.apply(-2.5), -3.0);
        assert_eq!(RoundingMode::Up.apply(-2.5), -2.0);
    }

    #[test]
    fn test_rounding_magnitude() {
        assert_eq!(RoundingMode::Up.apply_to_magnitude(-2.1), -3.0);
        assert_eq!(RoundingMode::Down.apply_to_magnitude(-2.9), -2.0);
        assert_eq!(RoundingMode::Up.apply_to_magnitude(2.1), 3.0);
    }

    #[test]
    fn test_to_integer() {
        assert_eq!(to_integer(4.0, || "x".into()), Ok(4));
        assert!(matches!(
            to_integer(4.5, || "x".into()),
            Err(EngineError::NonInteger { .. })
        ));
        assert!(matches!(
            to_integer(f64::NAN, || "x".into()),
            Err(EngineError::NonFinite { .. })
        ));
    }

    #[test]
    fn test_round_to_integer() {
        assert_eq!(round_to_integer(21.0 * 0.10 * 2.0, RoundingMode::Up, || "x".into()), Ok(5));
        assert_eq!(round_to_integer(2.5, RoundingMode::Down, || "x".into()), Ok(2));
        assert_eq!(round_to_integer(-2.5, RoundingMode::Up, || "x".into()), Ok(-3));
    }

    #[test]
    fn test_negligible() {
        assert!(is_negligible(1e-12));
        assert!(!is_negligible(0.001));
    }
}
