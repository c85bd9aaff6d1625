//! Margin result records and configuration.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use crate::errors::{Error, Result};

// =============================================================================
// Configuration
// =============================================================================

/// A named market-drop scenario. `market_drop` is a positive fraction (0.25 = -25%).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StressScenario {
    pub name: String,
    pub market_drop: f64,
}

impl StressScenario {
    pub fn new(name: impl Into<String>, market_drop: f64) -> Self {
        Self {
            name: name.into(),
            market_drop,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MarginConfig {
    /// Brokerage maintenance requirement as equity / market value (default: 0.30)
    pub maintenance_margin: f64,
    /// House buffer above maintenance where calls are issued (default: 0.05)
    pub call_buffer: f64,
    /// Annualized volatility mapped to a volatility score of 1.0 (default: 0.60)
    pub volatility_ceiling: f64,
    /// Utilization the recommendations steer toward (default: 0.30)
    pub target_utilization: f64,
    /// Utilization above which a pay-down is recommended (default: 0.50)
    pub high_utilization: f64,
    pub scenarios: Vec<StressScenario>,
}

impl Default for MarginConfig {
    fn default() -> Self {
        Self {
            maintenance_margin: 0.30,
            call_buffer: 0.05,
            volatility_ceiling: 0.60,
            target_utilization: 0.30,
            high_utilization: 0.50,
            scenarios: vec![
                StressScenario::new("Moderate correction -10%", 0.10),
                StressScenario::new("Bear market -25%", 0.25),
                StressScenario::new("Crash -40%", 0.40),
            ],
        }
    }
}

impl MarginConfig {
    /// Equity ratio below which a house call is issued.
    pub fn call_threshold(&self) -> f64 {
        self.maintenance_margin + self.call_buffer
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.maintenance_margin > 0.0 && self.maintenance_margin < 1.0) {
            return Err(Error::InvalidConfigValue(format!(
                "margin.maintenanceMargin must be in (0, 1), got {}",
                self.maintenance_margin
            )));
        }
        if !(self.call_buffer >= 0.0 && self.call_threshold() < 1.0) {
            return Err(Error::InvalidConfigValue(format!(
                "margin.callBuffer must be >= 0 and keep the call threshold below 1, got {}",
                self.call_buffer
            )));
        }
        if !(self.volatility_ceiling > 0.0) {
            return Err(Error::InvalidConfigValue(
                "margin.volatilityCeiling must be positive".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.target_utilization)
            || !(0.0..=1.0).contains(&self.high_utilization)
            || self.target_utilization > self.high_utilization
        {
            return Err(Error::InvalidConfigValue(
                "margin utilization thresholds must satisfy 0 <= target <= high <= 1".to_string(),
            ));
        }
        for scenario in &self.scenarios {
            if !(0.0..=1.0).contains(&scenario.market_drop) {
                return Err(Error::InvalidConfigValue(format!(
                    "stress scenario '{}' has a market drop outside [0, 1]: {}",
                    scenario.name, scenario.market_drop
                )));
            }
        }
        Ok(())
    }
}

// =============================================================================
// Results
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarginUsage {
    pub margin_used: f64,
    pub margin_available: f64,
    /// `used / available` clamped to [0, 1]
    pub utilization_ratio: f64,
    /// Annual dividend income per $1,000 of margin deployed
    pub velocity_score: f64,
    /// Effective annual rate with daily accrual on an actual/360 basis
    pub effective_rate: f64,
    /// Interest accrued over the days outstanding
    pub interest_cost: f64,
    pub annual_interest_cost: f64,
    /// Loan / portfolio market value
    pub loan_to_value: f64,
    pub equity: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarginRiskAssessment {
    /// Portfolio market value at which equity falls to the maintenance requirement
    pub liquidation_price: Option<f64>,
    /// Fractional market drop that would reach `liquidation_price`
    pub distance_to_liquidation: Option<f64>,
    /// First-passage estimate in trading days
    pub time_to_liquidation: Option<f64>,
    /// Probability of touching the liquidation level within one year
    pub liquidation_probability_1y: f64,
    /// Annual dividend income / annual interest cost; `None` without interest
    pub dividend_coverage_ratio: Option<f64>,
    /// Regime-adjusted volatility normalized to [0, 1]
    pub volatility_score: f64,
    pub effective_volatility: f64,
    /// Current equity / market value; `None` for an empty portfolio
    pub equity_ratio: Option<f64>,
    pub in_margin_call: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StressTestResult {
    pub scenario: String,
    pub market_drop: f64,
    pub post_shock_value: f64,
    pub post_shock_equity: f64,
    pub equity_ratio: f64,
    pub margin_call_trigger: bool,
    pub liquidation_trigger: bool,
    /// Cash needed to lift equity back to the call threshold
    pub shortfall: f64,
    pub action_required: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MarginAction {
    Increase,
    Decrease,
    Optimize,
    Hold,
}

impl MarginAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            MarginAction::Increase => "increase",
            MarginAction::Decrease => "decrease",
            MarginAction::Optimize => "optimize",
            MarginAction::Hold => "hold",
        }
    }
}

/// Which lever of the margin position a recommendation pulls.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MarginFocus {
    /// Size of the balance relative to the line
    #[default]
    Utilization,
    /// Yield of the holdings the balance funds
    IncomeRotation,
    /// Interest rate charged on the balance
    RateReduction,
}

impl MarginFocus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MarginFocus::Utilization => "utilization",
            MarginFocus::IncomeRotation => "income-rotation",
            MarginFocus::RateReduction => "rate-reduction",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarginRecommendation {
    pub description: String,
    #[serde(rename = "type")]
    pub kind: MarginAction,
    #[serde(default)]
    pub focus: MarginFocus,
    /// Expected annual return of acting, as a fraction
    pub expected_return: f64,
    /// 0 (no added risk) to 1
    pub risk_score: f64,
    /// 0 to 1
    pub confidence: f64,
    /// Dollar amount the action applies to, when there is one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<f64>,
}

impl MarginRecommendation {
    /// `confidence × |expected_return| / (1 + risk_score)`
    pub fn ranking_score(&self) -> f64 {
        self.confidence * self.expected_return.abs() / (1.0 + self.risk_score)
    }

    /// Ranking order: higher score first, ties broken by lower risk.
    pub fn rank_cmp(a: &Self, b: &Self) -> Ordering {
        b.ranking_score()
            .partial_cmp(&a.ranking_score())
            .unwrap_or(Ordering::Equal)
            .then_with(|| {
                a.risk_score
                    .partial_cmp(&b.risk_score)
                    .unwrap_or(Ordering::Equal)
            })
    }
}

/// Sorts recommendations into ranking order.
pub fn rank_margin_recommendations(recommendations: &mut [MarginRecommendation]) {
    recommendations.sort_by(MarginRecommendation::rank_cmp);
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarginTaxOptimization {
    pub annual_interest_expense: f64,
    /// Interest deductible against net investment income this year
    pub deductible_interest: f64,
    pub estimated_tax_savings: f64,
    pub after_tax_margin_rate: f64,
    /// Extra savings from electing to treat qualified dividends as investment income
    pub qualified_election_benefit: f64,
    /// Interest above investment income, carried forward to later years
    pub carryforward_interest: f64,
    pub opportunities: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarginIntelligenceResult {
    pub has_margin: bool,
    pub current_usage: MarginUsage,
    pub risk_assessment: MarginRiskAssessment,
    pub stress_tests: Vec<StressTestResult>,
    pub recommendations: Vec<MarginRecommendation>,
    pub tax_optimization: MarginTaxOptimization,
    /// Volatility came from sector priors rather than history
    pub has_estimate: bool,
}

impl MarginIntelligenceResult {
    /// Stress scenarios that end in a house call.
    pub fn margin_call_scenarios(&self) -> impl Iterator<Item = &StressTestResult> {
        self.stress_tests.iter().filter(|s| s.margin_call_trigger)
    }
}
