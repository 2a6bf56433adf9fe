use serde::{Deserialize, Serialize};

use crate::error::OfferSyncError;

/// Per-fetch price statistics, memoized against the owning fetch.
///
/// An empty offer set yields the all-zero summary; callers must tolerate it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OfferSummary {
    /// Fetch time (Unix seconds)
    pub time: f64,
    pub min: f64,
    pub max: f64,
    pub avg: f64,
    pub median: f64,
    pub count: i64,
}

impl OfferSummary {
    /// Compute statistics over prices **in stored order**.
    ///
    /// "median" is `prices[len / 2]` on the unsorted sequence. This
    /// replicates the established contract; downstream diff fixtures depend
    /// on the exact definition, so it must not be swapped for a sorted
    /// median.
    pub fn from_prices(time: f64, prices: &[i64]) -> Self {
        if prices.is_empty() {
            return OfferSummary {
                time,
                min: 0.0,
                max: 0.0,
                avg: 0.0,
                median: 0.0,
                count: 0,
            };
        }

        let min = prices.iter().copied().min().unwrap_or(0);
        let max = prices.iter().copied().max().unwrap_or(0);
        let sum: i64 = prices.iter().sum();

        OfferSummary {
            time,
            min: min as f64,
            max: max as f64,
            avg: sum as f64 / prices.len() as f64,
            median: prices[prices.len() / 2] as f64,
            count: prices.len() as i64,
        }
    }
}

/// Percentage change per statistic between two summaries. Ephemeral, never
/// persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OfferPriceDiff {
    pub min: f64,
    pub max: f64,
    pub avg: f64,
    pub median: f64,
}

impl OfferPriceDiff {
    /// `(end - start) / start` for each statistic. A zero start statistic
    /// makes the ratio undefined and is a reportable error, never an
    /// infinity/NaN.
    pub fn between(start: &OfferSummary, end: &OfferSummary) -> Result<Self, OfferSyncError> {
        Ok(OfferPriceDiff {
            min: ratio("min", start.min, end.min)?,
            max: ratio("max", start.max, end.max)?,
            avg: ratio("avg", start.avg, end.avg)?,
            median: ratio("median", start.median, end.median)?,
        })
    }
}

fn ratio(stat: &str, start: f64, end: f64) -> Result<f64, OfferSyncError> {
    if start == 0.0 {
        return Err(OfferSyncError::UndefinedPriceChange(format!(
            "baseline {} price is zero",
            stat
        )));
    }
    Ok((end - start) / start)
}
