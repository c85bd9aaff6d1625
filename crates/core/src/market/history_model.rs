//! Read-only historical series. Any of them may be empty.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PricePoint {
    pub ticker: String,
    pub date: NaiveDate,
    pub close: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DividendPayment {
    pub ticker: String,
    pub date: NaiveDate,
    pub amount_per_share: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketEvent {
    pub date: NaiveDate,
    pub description: String,
    /// Broad market move over the event, as a fraction
    pub market_change: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoricalData {
    #[serde(default)]
    pub price_history: Vec<PricePoint>,
    #[serde(default)]
    pub dividend_history: Vec<DividendPayment>,
    #[serde(default)]
    pub market_events: Vec<MarketEvent>,
}

impl HistoricalData {
    pub fn is_empty(&self) -> bool {
        self.price_history.is_empty()
            && self.dividend_history.is_empty()
            && self.market_events.is_empty()
    }

    /// Date-ordered closes for a ticker. Non-finite or non-positive closes are skipped.
    pub fn price_series(&self, ticker: &str) -> BTreeMap<NaiveDate, f64> {
        self.price_history
            .iter()
            .filter(|p| p.ticker == ticker && p.close.is_finite() && p.close > 0.0)
            .map(|p| (p.date, p.close))
            .collect()
    }

    /// Date-ordered per-share payments for a ticker.
    pub fn dividend_series(&self, ticker: &str) -> Vec<(NaiveDate, f64)> {
        let mut out: Vec<(NaiveDate, f64)> = self
            .dividend_history
            .iter()
            .filter(|d| d.ticker == ticker && d.amount_per_share.is_finite())
            .map(|d| (d.date, d.amount_per_share))
            .collect();
        out.sort_by_key(|(date, _)| *date);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_empty_history() {
        let history = HistoricalData::default();
        assert!(history.is_empty());
        assert!(history.price_series("SCHD").is_empty());
    }

    #[test]
    fn test_series_are_date_ordered() {
        let history = HistoricalData {
            dividend_history: vec![
                DividendPayment {
                    ticker: "O".to_string(),
                    date: date(2024, 3, 1),
                    amount_per_share: 0.26,
                },
                DividendPayment {
                    ticker: "O".to_string(),
                    date: date(2024, 1, 1),
                    amount_per_share: 0.25,
                },
            ],
            market_events: vec![
                MarketEvent {
                    date: date(2020, 3, 16),
                    description: "Covid crash".to_string(),
                    market_change: -0.34,
                },
                MarketEvent {
                    date: date(2022, 6, 1),
                    description: "Rate shock".to_string(),
                    market_change: -0.20,
                },
            ],
            ..Default::default()
        };
        let series = history.dividend_series("O");
        assert_eq!(series[0].0, date(2024, 1, 1));
        assert_eq!(history.worst_market_drawdown(), Some(0.34));
    }
}
