//! Ratio and percentage values with an explicit undefined state.
//!
//! Every derived value in the API goes through [`Ratio::from_division`] or
//! [`percentage`], so a zero denominator never produces `NaN` or
//! `Infinity`.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// JSON representation of an undefined ratio.
pub const UNDEFINED_SENTINEL: &str = "N/A";

/// A derived ratio that is undefined when its denominator is zero.
///
/// Serializes as a JSON number when defined and as the string `"N/A"`
/// otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Ratio {
    /// A finite value.
    Defined(f64),
    /// The denominator was zero (or the inputs were not finite).
    #[default]
    Undefined,
}

impl Ratio {
    /// Divides `numerator` by `denominator`.
    #[must_use]
    pub fn from_division(numerator: f64, denominator: f64) -> Self {
        if denominator == 0.0 {
            return Self::Undefined;
        }
        Self::from_value(numerator / denominator)
    }

    /// Divides two counts.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn from_counts(numerator: u64, denominator: u64) -> Self {
        Self::from_division(numerator as f64, denominator as f64)
    }

    /// Wraps a plain value, mapping non-finite values to
    /// [`Ratio::Undefined`].
    #[must_use]
    pub const fn from_value(value: f64) -> Self {
        if value.is_finite() {
            Self::Defined(value)
        } else {
            Self::Undefined
        }
    }

    /// Multiplies a defined value by `factor`.
    #[must_use]
    pub fn scaled(self, factor: f64) -> Self {
        match self {
            Self::Defined(v) => Self::from_value(v * factor),
            Self::Undefined => Self::Undefined,
        }
    }

    /// Rounds a defined value to two decimals.
    #[must_use]
    pub fn rounded(self) -> Self {
        match self {
            Self::Defined(v) => Self::Defined(round2(v)),
            Self::Undefined => Self::Undefined,
        }
    }

    /// Returns the value if defined.
    #[must_use]
    pub const fn value(self) -> Option<f64> {
        match self {
            Self::Defined(v) => Some(v),
            Self::Undefined => None,
        }
    }

    /// Returns `true` if the ratio carries a value.
    #[must_use]
    pub const fn is_defined(self) -> bool {
        matches!(self, Self::Defined(_))
    }

    /// Subtracts `other` from `self` when both sides are defined.
    #[must_use]
    pub fn difference(self, other: Self) -> Option<f64> {
        match (self, other) {
            (Self::Defined(a), Self::Defined(b)) => Some(round2(a - b)),
            _ => None,
        }
    }
}

impl From<u64> for Ratio {
    #[allow(clippy::cast_precision_loss)]
    fn from(value: u64) -> Self {
        Self::Defined(value as f64)
    }
}

impl std::fmt::Display for Ratio {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Defined(v) => write!(f, "{v:.2}"),
            Self::Undefined => f.write_str(UNDEFINED_SENTINEL),
        }
    }
}

impl Serialize for Ratio {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Defined(v) => serializer.serialize_f64(*v),
            Self::Undefined => serializer.serialize_str(UNDEFINED_SENTINEL),
        }
    }
}

impl<'de> Deserialize<'de> for Ratio {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Number(f64),
            Text(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Number(v) => Ok(Self::from_value(v)),
            Raw::Text(s) if s == UNDEFINED_SENTINEL => Ok(Self::Undefined),
            Raw::Text(s) => Err(serde::de::Error::custom(format!(
                "expected a number or \"{UNDEFINED_SENTINEL}\", got \"{s}\""
            ))),
        }
    }
}

/// Returns `part / whole * 100`, or `0` when `whole` is zero.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn percentage(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        return 0.0;
    }
    round2(part as f64 / whole as f64 * 100.0)
}

/// Rounds to two decimals.
#[must_use]
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
