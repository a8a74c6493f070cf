//! Built-in statistics
//!
//! Standard statistics work on single-band arrays and produce one value per
//! asset, in asset order. Masked pixels are excluded; an array with no
//! valid pixels yields NaN for the floating-point statistics.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::value::StatValue;
use crate::errors::{DrillError, DrillResult};
use crate::extractor::ArrayInfo;

/// Identifier of a built-in statistic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StdStat {
    Mean,
    #[serde(alias = "stdev")]
    Stddev,
    Count,
    #[serde(rename = "countnull")]
    CountNull,
    Min,
    Max,
}

impl StdStat {
    /// Every standard statistic
    pub const ALL: [StdStat; 6] = [
        StdStat::Mean,
        StdStat::Stddev,
        StdStat::Count,
        StdStat::CountNull,
        StdStat::Min,
        StdStat::Max,
    ];

    /// Name the statistic is stored under
    pub fn name(&self) -> &'static str {
        match self {
            StdStat::Mean => "mean",
            StdStat::Stddev => "stddev",
            StdStat::Count => "count",
            StdStat::CountNull => "countnull",
            StdStat::Min => "min",
            StdStat::Max => "max",
        }
    }

    /// Computes the statistic over one array per asset
    pub fn compute(&self, arrays: &[ArrayInfo]) -> StatValue {
        match self {
            StdStat::Count => StatValue::Counts(arrays.iter().map(|a| a.data.count_valid()).collect()),
            StdStat::CountNull => StatValue::Counts(arrays.iter().map(|a| a.data.count_masked()).collect()),
            _ => StatValue::Floats(arrays.iter().map(|a| self.reduce(&a.data.valid_values(0))).collect()),
        }
    }

    fn reduce(&self, values: &[f64]) -> f64 {
        if values.is_empty() {
            return f64::NAN;
        }
        let n = values.len() as f64;
        match self {
            StdStat::Mean => values.iter().sum::<f64>() / n,
            StdStat::Stddev => {
                let mean = values.iter().sum::<f64>() / n;
                (values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n).sqrt()
            }
            StdStat::Min => values.iter().copied().fold(f64::INFINITY, f64::min),
            StdStat::Max => values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            StdStat::Count | StdStat::CountNull => n,
        }
    }
}

impl FromStr for StdStat {
    type Err = DrillError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "mean" => Ok(StdStat::Mean),
            "stddev" | "stdev" | "std" => Ok(StdStat::Stddev),
            "count" => Ok(StdStat::Count),
            "countnull" | "count_null" => Ok(StdStat::CountNull),
            "min" => Ok(StdStat::Min),
            "max" => Ok(StdStat::Max),
            other => Err(DrillError::Configuration(format!("Unknown standard statistic: {}", other))),
        }
    }
}

impl fmt::Display for StdStat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Fails unless every array holds exactly one band
pub fn check_single_band(arrays: &[ArrayInfo]) -> DrillResult<()> {
    match arrays.iter().find(|a| a.data.band_count() != 1) {
        Some(multi) => Err(DrillError::UnsupportedBandCount {
            asset_id: multi.asset_id.clone(),
            bands: multi.data.band_count(),
        }),
        None => Ok(()),
    }
}
