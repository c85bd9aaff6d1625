//! Expected return / volatility / correlation estimates for the holdings.
//!
//! With at least [`MIN_HISTORY_POINTS`] closes a holding's estimates come from
//! its own price history, shrunk halfway toward the sector prior. Otherwise the
//! sector prior is used alone and the model is flagged as a fallback estimate.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::{sector_profile, Portfolio};
use crate::market::HistoricalData;
use crate::utils::stats::{correlation, mean, std_dev};

/// Minimum closes (and overlapping returns) needed before history is trusted.
pub const MIN_HISTORY_POINTS: usize = 20;

const HISTORY_SHRINKAGE: f64 = 0.5;
const SAME_SECTOR_CORRELATION: f64 = 0.80;
const CROSS_SECTOR_CORRELATION: f64 = 0.50;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetEstimate {
    pub ticker: String,
    /// Annual total return (price + yield)
    pub expected_return: f64,
    /// Annualized volatility
    pub volatility: f64,
    pub from_history: bool,
}

#[derive(Debug, Clone)]
pub struct ReturnModel {
    pub assets: Vec<AssetEstimate>,
    correlation: Vec<Vec<f64>>,
}

impl ReturnModel {
    pub fn estimate(portfolio: &Portfolio, history: &HistoricalData) -> Self {
        let mut assets = Vec::with_capacity(portfolio.holdings.len());
        let mut dated_returns: Vec<Option<BTreeMap<NaiveDate, f64>>> = Vec::new();

        for holding in &portfolio.holdings {
            let prior = sector_profile(&holding.sector);
            let series = history.price_series(&holding.ticker);

            if series.len() >= MIN_HISTORY_POINTS {
                let returns = dated_simple_returns(&series);
                let values: Vec<f64> = returns.values().copied().collect();
                let periods = periods_per_year(&series);
                let hist_return = mean(&values) * periods + holding.annual_yield;
                let hist_vol = std_dev(&values) * periods.sqrt();

                assets.push(AssetEstimate {
                    ticker: holding.ticker.clone(),
                    expected_return: shrink(hist_return, prior.expected_return).clamp(-0.5, 1.0),
                    volatility: shrink(hist_vol, prior.volatility).clamp(0.0, 2.0),
                    from_history: true,
                });
                dated_returns.push(Some(returns));
            } else {
                assets.push(AssetEstimate {
                    ticker: holding.ticker.clone(),
                    expected_return: prior.expected_return,
                    volatility: prior.volatility,
                    from_history: false,
                });
                dated_returns.push(None);
            }
        }

        let n = assets.len();
        let mut corr = vec![vec![0.0; n]; n];
        for i in 0..n {
            corr[i][i] = 1.0;
            for j in (i + 1)..n {
                let from_history = match (&dated_returns[i], &dated_returns[j]) {
                    (Some(a), Some(b)) => aligned_correlation(a, b),
                    _ => None,
                };
                let c = from_history.unwrap_or_else(|| {
                    if portfolio.holdings[i].sector.eq_ignore_ascii_case(&portfolio.holdings[j].sector) {
                        SAME_SECTOR_CORRELATION
                    } else {
                        CROSS_SECTOR_CORRELATION
                    }
                });
                corr[i][j] = c;
                corr[j][i] = c;
            }
        }

        Self {
            assets,
            correlation: corr,
        }
    }

    pub fn len(&self) -> usize {
        self.assets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }

    /// True when any holding had to use the sector prior.
    pub fn used_fallback(&self) -> bool {
        self.assets.iter().any(|a| !a.from_history)
    }

    pub fn correlation(&self, i: usize, j: usize) -> f64 {
        self.correlation[i][j]
    }

    pub fn portfolio_return(&self, weights: &[f64]) -> f64 {
        self.assets
            .iter()
            .zip(weights)
            .map(|(a, w)| a.expected_return * w)
            .sum()
    }

    /// `sqrt(w' Σ w)`; a slightly non-PSD blended matrix is floored at zero.
    pub fn portfolio_volatility(&self, weights: &[f64]) -> f64 {
        let n = self.assets.len().min(weights.len());
        let mut variance = 0.0;
        for i in 0..n {
            for j in 0..n {
                variance += weights[i]
                    * weights[j]
                    * self.correlation[i][j]
                    * self.assets[i].volatility
                    * self.assets[j].volatility;
            }
        }
        if variance > 0.0 {
            variance.sqrt()
        } else {
            0.0
        }
    }
}

fn shrink(estimate: f64, prior: f64) -> f64 {
    if estimate.is_finite() {
        HISTORY_SHRINKAGE * estimate + (1.0 - HISTORY_SHRINKAGE) * prior
    } else {
        prior
    }
}

fn dated_simple_returns(series: &BTreeMap<NaiveDate, f64>) -> BTreeMap<NaiveDate, f64> {
    let points: Vec<(&NaiveDate, &f64)> = series.iter().collect();
    points
        .windows(2)
        .map(|w| (*w[1].0, w[1].1 / w[0].1 - 1.0))
        .collect()
}

/// Observation frequency inferred from the average calendar gap between closes.
/// Daily trading data (gaps of ~1.45 calendar days) maps to ~252.
fn periods_per_year(series: &BTreeMap<NaiveDate, f64>) -> f64 {
    let (first, last) = match (series.keys().next(), series.keys().next_back()) {
        (Some(first), Some(last)) => (*first, *last),
        _ => return 1.0,
    };
    let intervals = series.len().saturating_sub(1).max(1) as f64;
    let span_days = (last - first).num_days().max(1) as f64;
    (365.25 / (span_days / intervals)).clamp(1.0, 365.0)
}

fn aligned_correlation(a: &BTreeMap<NaiveDate, f64>, b: &BTreeMap<NaiveDate, f64>) -> Option<f64> {
    let (xs, ys): (Vec<f64>, Vec<f64>) = a
        .iter()
        .filter_map(|(date, ra)| b.get(date).map(|rb| (*ra, *rb)))
        .unzip();
    if xs.len() < MIN_HISTORY_POINTS {
        return None;
    }
    correlation(&xs, &ys)
}
