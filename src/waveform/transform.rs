//! Stateless signal-conditioning operations and the tagged [`Transform`]
//! record that names one of them together with its parameters.
//!
//! Every operation borrows its input and returns a fresh sequence, so the
//! output of one is always a valid input to another.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::filter::{low_pass_filter, validate_low_pass};
use crate::drivers::ExplorerError;

/// Centered running mean with "same"-mode convolution edges: samples outside
/// the input count as zero, so the first and last few outputs are attenuated.
pub fn moving_average(data: &[f64], window: usize) -> Result<Vec<f64>, ExplorerError> {
    if window < 1 {
        return Err(ExplorerError::InvalidParameter(
            "window must be at least 1".into(),
        ));
    }
    let n = data.len();
    // Offset of "same" output relative to the full convolution.
    let offset = (window - 1) / 2;
    let divisor = window as f64;
    let averaged = (0..n)
        .map(|i| {
            let end = i + offset; // inclusive
            let start = (end + 1).saturating_sub(window);
            let end = end.min(n - 1);
            let sum: f64 = data[start..=end].iter().sum();
            sum / divisor
        })
        .collect();
    Ok(averaged)
}

/// Keep every `factor`-th sample starting at index 0. No anti-alias filtering.
pub fn decimate(data: &[f64], factor: usize) -> Result<Vec<f64>, ExplorerError> {
    if factor < 1 {
        return Err(ExplorerError::InvalidParameter(
            "decimation factor must be at least 1".into(),
        ));
    }
    Ok(data.iter().step_by(factor).copied().collect())
}

pub fn remove_offset(data: &[f64]) -> Vec<f64> {
    if data.is_empty() {
        return Vec::new();
    }
    let mean = mean(data);
    data.iter().map(|v| v - mean).collect()
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NormalizeMethod {
    /// `(x - min) / (max - min)` into `[0, 1]`.
    #[default]
    MinMax,
    /// Zero mean, unit (population) standard deviation.
    ZScore,
}

impl NormalizeMethod {
    pub const ALL: [NormalizeMethod; 2] = [NormalizeMethod::MinMax, NormalizeMethod::ZScore];

    pub fn as_str(&self) -> &'static str {
        match self {
            NormalizeMethod::MinMax => "minmax",
            NormalizeMethod::ZScore => "zscore",
        }
    }
}

impl fmt::Display for NormalizeMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NormalizeMethod {
    type Err = ExplorerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "minmax" => Ok(NormalizeMethod::MinMax),
            "zscore" => Ok(NormalizeMethod::ZScore),
            other => Err(ExplorerError::InvalidParameter(format!(
                "unknown normalization method '{other}'"
            ))),
        }
    }
}

/// Constant input (including a single sample) normalizes to all zeros.
pub fn normalize(data: &[f64], method: NormalizeMethod) -> Vec<f64> {
    if data.is_empty() {
        return Vec::new();
    }
    let (min, max) = min_max(data);
    if max == min {
        return vec![0.0; data.len()];
    }
    match method {
        NormalizeMethod::MinMax => {
            let span = max - min;
            data.iter().map(|v| (v - min) / span).collect()
        }
        NormalizeMethod::ZScore => {
            let mean = mean(data);
            let std = std_dev(data, mean);
            if std == 0.0 {
                return vec![0.0; data.len()];
            }
            data.iter().map(|v| (v - mean) / std).collect()
        }
    }
}

pub(crate) fn mean(data: &[f64]) -> f64 {
    data.iter().sum::<f64>() / data.len() as f64
}

/// Population standard deviation around a precomputed mean.
pub(crate) fn std_dev(data: &[f64], mean: f64) -> f64 {
    let variance = data
        .iter()
        .map(|v| {
            let delta = v - mean;
            delta * delta
        })
        .sum::<f64>()
        / data.len() as f64;
    variance.sqrt()
}

pub(crate) fn min_max(data: &[f64]) -> (f64, f64) {
    data.iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        })
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TransformKind {
    MovingAverage,
    Decimation,
    LowPassFilter,
    OffsetRemoval,
    Normalization,
}

impl TransformKind {
    pub const ALL: [TransformKind; 5] = [
        TransformKind::MovingAverage,
        TransformKind::Decimation,
        TransformKind::LowPassFilter,
        TransformKind::OffsetRemoval,
        TransformKind::Normalization,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TransformKind::MovingAverage => "moving_average",
            TransformKind::Decimation => "decimation",
            TransformKind::LowPassFilter => "low_pass_filter",
            TransformKind::OffsetRemoval => "offset_removal",
            TransformKind::Normalization => "normalization",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            TransformKind::MovingAverage => "Moving average",
            TransformKind::Decimation => "Decimation",
            TransformKind::LowPassFilter => "Low-pass filter",
            TransformKind::OffsetRemoval => "Offset removal",
            TransformKind::Normalization => "Normalization",
        }
    }
}

/// One transform together with exactly the parameters it needs.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Transform {
    MovingAverage { window: usize },
    #[serde(rename = "decimation")]
    Decimate { factor: usize },
    #[serde(rename = "low_pass_filter")]
    LowPass { cutoff_hz: f64, sample_rate_hz: f64 },
    #[serde(rename = "offset_removal")]
    RemoveOffset,
    #[serde(rename = "normalization")]
    Normalize { method: NormalizeMethod },
}

impl Transform {
    pub fn kind(&self) -> TransformKind {
        match self {
            Transform::MovingAverage { .. } => TransformKind::MovingAverage,
            Transform::Decimate { .. } => TransformKind::Decimation,
            Transform::LowPass { .. } => TransformKind::LowPassFilter,
            Transform::RemoveOffset => TransformKind::OffsetRemoval,
            Transform::Normalize { .. } => TransformKind::Normalization,
        }
    }

    /// Reject out-of-domain parameters before any channel is touched.
    pub fn validate(&self) -> Result<(), ExplorerError> {
        match *self {
            Transform::MovingAverage { window } if window < 1 => Err(
                ExplorerError::InvalidParameter("window must be at least 1".into()),
            ),
            Transform::Decimate { factor } if factor < 1 => Err(ExplorerError::InvalidParameter(
                "decimation factor must be at least 1".into(),
            )),
            Transform::LowPass {
                cutoff_hz,
                sample_rate_hz,
            } => validate_low_pass(cutoff_hz, sample_rate_hz),
            _ => Ok(()),
        }
    }

    pub fn apply(&self, data: &[f64]) -> Result<Vec<f64>, ExplorerError> {
        match *self {
            Transform::MovingAverage { window } => moving_average(data, window),
            Transform::Decimate { factor } => decimate(data, factor),
            Transform::LowPass {
                cutoff_hz,
                sample_rate_hz,
            } => low_pass_filter(data, cutoff_hz, sample_rate_hz),
            Transform::RemoveOffset => Ok(remove_offset(data)),
            Transform::Normalize { method } => Ok(normalize(data, method)),
        }
    }

    /// Spacing, in original sample indices, between consecutive output samples.
    pub fn stride(&self) -> usize {
        match *self {
            Transform::Decimate { factor } => factor.max(1),
            _ => 1,
        }
    }

    /// Compact form for the per-channel processing column.
    pub fn summary(&self) -> String {
        match self {
            Transform::MovingAverage { window } => format!("MA({window})"),
            Transform::Decimate { factor } => format!("Decimate({factor})"),
            Transform::LowPass { cutoff_hz, .. } => format!("LPF({cutoff_hz} Hz)"),
            Transform::RemoveOffset => "Offset removed".to_owned(),
            Transform::Normalize { method } => format!("Norm({method})"),
        }
    }
}

impl fmt::Display for Transform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Transform::MovingAverage { window } => write!(f, "moving average (window={window})"),
            Transform::Decimate { factor } => write!(f, "decimation (factor={factor})"),
            Transform::LowPass {
                cutoff_hz,
                sample_rate_hz,
            } => write!(
                f,
                "low-pass filter (cutoff={cutoff_hz} Hz, sample rate={sample_rate_hz} Hz)"
            ),
            Transform::RemoveOffset => f.write_str("offset removal"),
            Transform::Normalize { method } => write!(f, "{method} normalization"),
        }
    }
}
