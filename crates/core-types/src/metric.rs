use serde::{Deserialize, Serialize};
use std::fmt;

/// Why a statistic has no value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UndefinedReason {
    /// The return series had no observations.
    EmptySeries,
    /// The standard deviation was zero, so a ratio over it does not exist.
    ZeroVariance,
    /// Fewer than two jointly observed rows.
    InsufficientOverlap,
    /// The computation produced NaN or an infinity.
    NonFinite,
}

impl fmt::Display for UndefinedReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            UndefinedReason::EmptySeries => "empty series",
            UndefinedReason::ZeroVariance => "zero variance",
            UndefinedReason::InsufficientOverlap => "fewer than two overlapping observations",
            UndefinedReason::NonFinite => "non-finite result",
        };
        f.write_str(text)
    }
}

/// A single statistic: either a finite number or an explicit "undefined"
/// marker carrying its reason.
///
/// Serializes as `{"value": 1.25}` or `{"undefined": "zero_variance"}`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    Value(f64),
    Undefined(UndefinedReason),
}

impl Metric {
    /// Wraps a computed number, mapping NaN and infinities to `Undefined`.
    pub fn from_f64(value: f64) -> Self {
        if value.is_finite() {
            Metric::Value(value)
        } else {
            Metric::Undefined(UndefinedReason::NonFinite)
        }
    }

    pub fn value(&self) -> Option<f64> {
        match self {
            Metric::Value(v) => Some(*v),
            Metric::Undefined(_) => None,
        }
    }

    pub fn is_defined(&self) -> bool {
        matches!(self, Metric::Value(_))
    }

    pub fn undefined_reason(&self) -> Option<UndefinedReason> {
        match self {
            Metric::Value(_) => None,
            Metric::Undefined(reason) => Some(*reason),
        }
    }

    /// Rounds to `decimal_places`. Only for the presentation boundary.
    pub fn rounded(&self, decimal_places: u32) -> Self {
        match self {
            Metric::Value(v) => Metric::from_f64(round_to(*v, decimal_places)),
            undefined => *undefined,
        }
    }
}

/// The most decimal places an `f64` can meaningfully be rounded to.
pub const MAX_DECIMAL_PLACES: u32 = 15;

/// Rounds half away from zero to `decimal_places`, normalizing `-0.0` to `0.0`.
///
/// `decimal_places` is capped at [`MAX_DECIMAL_PLACES`]. Values too large to
/// scale are returned unchanged.
pub fn round_to(value: f64, decimal_places: u32) -> f64 {
    let scale = 10f64.powi(decimal_places.min(MAX_DECIMAL_PLACES) as i32);
    let scaled = value * scale;
    if !scaled.is_finite() {
        return value;
    }
    let r = scaled.round() / scale;
    if r == 0.0 { 0.0 } else { r }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Metric::Value(v) => write!(f, "{v}"),
            Metric::Undefined(reason) => write!(f, "n/a ({reason})"),
        }
    }
}
