//! Simulated market conditions, immutable for the duration of an evaluation.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::constants::BASELINE_VIX;
use crate::errors::{Result, ValidationError};
use crate::utils::stats::clamp01;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[derive(Default)]
pub enum MarketSentiment {
    Bullish,
    #[default]
    Neutral,
    Bearish,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[derive(Default)]
pub enum YieldTrend {
    Rising,
    #[default]
    Stable,
    Falling,
}

/// Treasury curve points as fractions (0.045 = 4.5%).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RateCurve {
    pub short_term: f64,
    pub ten_year: f64,
    pub thirty_year: f64,
}

impl RateCurve {
    /// True when short rates exceed the 10-year yield.
    pub fn is_inverted(&self) -> bool {
        self.short_term > self.ten_year
    }
}

impl Default for RateCurve {
    fn default() -> Self {
        Self {
            short_term: 0.045,
            ten_year: 0.042,
            thirty_year: 0.044,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MacroIndicators {
    pub gdp_growth: f64,
    pub inflation: f64,
    pub unemployment: f64,
}

impl Default for MacroIndicators {
    fn default() -> Self {
        Self {
            gdp_growth: 0.02,
            inflation: 0.03,
            unemployment: 0.04,
        }
    }
}

/// Market backdrop for one evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketConditions {
    /// VIX level in index points
    pub volatility_index: f64,
    #[serde(default)]
    pub rates: RateCurve,
    #[serde(default)]
    pub sentiment: MarketSentiment,
    /// Investment-grade credit spread as a fraction
    pub credit_spread: f64,
    #[serde(default)]
    pub dividend_yield_trend: YieldTrend,
    #[serde(default, rename = "macro")]
    pub macro_indicators: MacroIndicators,
    /// Valuation date, used for calendar-bound opportunity windows
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub as_of: Option<NaiveDate>,
}

impl Default for MarketConditions {
    fn default() -> Self {
        Self {
            volatility_index: 18.0,
            rates: RateCurve::default(),
            sentiment: MarketSentiment::default(),
            credit_spread: 0.012,
            dividend_yield_trend: YieldTrend::default(),
            macro_indicators: MacroIndicators::default(),
            as_of: None,
        }
    }
}

impl MarketConditions {
    pub fn risk_free_rate(&self) -> f64 {
        self.rates.short_term
    }

    /// Multiplier applied to historical volatility for the current regime,
    /// `VIX / 20` bounded to `[0.5, 3.0]`.
    pub fn volatility_regime(&self) -> f64 {
        (self.volatility_index / BASELINE_VIX).clamp(0.5, 3.0)
    }

    /// Market-wide liquidity stress in `[0, 1]` from credit spreads and VIX.
    pub fn liquidity_stress(&self) -> f64 {
        let spread_stress = clamp01((self.credit_spread - 0.01) / 0.05);
        let vix_stress = clamp01((self.volatility_index - 12.0) / 38.0);
        0.6 * spread_stress + 0.4 * vix_stress
    }

    pub fn validate(&self) -> Result<()> {
        ValidationError::check_non_negative("market.volatilityIndex", self.volatility_index)?;
        ValidationError::check_non_negative("market.creditSpread", self.credit_spread)?;
        ValidationError::check_finite("market.rates.shortTerm", self.rates.short_term)?;
        ValidationError::check_finite("market.rates.tenYear", self.rates.ten_year)?;
        ValidationError::check_finite("market.rates.thirtyYear", self.rates.thirty_year)?;
        ValidationError::check_finite("market.macro.gdpGrowth", self.macro_indicators.gdp_growth)?;
        ValidationError::check_finite("market.macro.inflation", self.macro_indicators.inflation)?;
        ValidationError::check_finite(
            "market.macro.unemployment",
            self.macro_indicators.unemployment,
        )?;
        Ok(())
    }
}
