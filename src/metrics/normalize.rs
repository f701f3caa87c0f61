//! Tagged metric values and the normalization policy

use serde::{Deserialize, Serialize};

/// A sub-score in [0, 1].
///
/// `estimated` is set when the value is the neutral 0.5 substituted for data
/// that was missing or undefined, or when any input it was derived from was
/// itself estimated.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MetricValue {
    pub value: f64,
    pub estimated: bool,
}

impl MetricValue {
    pub const NEUTRAL: f64 = 0.5;

    /// A genuinely computed value. Non-finite input degrades to neutral.
    pub fn computed(value: f64) -> Self {
        if !value.is_finite() {
            return Self::neutral();
        }
        Self {
            value: value.clamp(0.0, 1.0),
            estimated: false,
        }
    }

    /// The "unknown" value
    pub fn neutral() -> Self {
        Self {
            value: Self::NEUTRAL,
            estimated: true,
        }
    }

    /// Weighted mean of `(value, weight)` parts.
    ///
    /// Neutral when the weights carry no mass.
    pub fn weighted(parts: &[(MetricValue, f64)]) -> Self {
        let total: f64 = parts.iter().map(|(_, w)| w).sum();
        if !(total.is_finite() && total > 0.0) {
            return Self::neutral();
        }
        let sum: f64 = parts.iter().map(|(m, w)| m.value * w).sum();
        let mut out = Self::computed(sum / total);
        out.estimated |= parts.iter().any(|(m, w)| m.estimated && *w > 0.0);
        out
    }
}

/// What `normalize` does when the caller has no maximum to divide by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NormalizationFallback {
    /// max = 2 × value, so every non-zero value normalizes to 0.5
    #[default]
    DoubleValue,
    /// Treat the value as already normalized and clamp it into [0, 1]
    Unit,
}

/// Min-max normalizer with min fixed at 0.
#[derive(Debug, Clone, Copy, Default)]
pub struct Normalizer {
    pub fallback: NormalizationFallback,
}

impl Normalizer {
    pub fn new(fallback: NormalizationFallback) -> Self {
        Self { fallback }
    }

    /// Normalize `value` against `max`.
    ///
    /// With a maximum of zero (or less) nothing was observed, so the result is
    /// a computed 0. Non-finite inputs are neutral.
    pub fn normalize(&self, value: f64, max: Option<f64>) -> MetricValue {
        if !value.is_finite() {
            return MetricValue::neutral();
        }
        match max {
            Some(max) if !max.is_finite() => MetricValue::neutral(),
            Some(max) if max <= 0.0 => MetricValue::computed(0.0),
            Some(max) => MetricValue::computed(value / max),
            None => self.fallback_normalize(value),
        }
    }

    fn fallback_normalize(&self, value: f64) -> MetricValue {
        match self.fallback {
            NormalizationFallback::DoubleValue => {
                let max = value * 2.0;
                if max == 0.0 {
                    MetricValue::neutral()
                } else {
                    MetricValue::computed(value / max)
                }
            }
            NormalizationFallback::Unit => MetricValue::computed(value),
        }
    }
}
