//! Risk assessment configuration and result records.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;

use crate::constants::{MIN_MONTE_CARLO_PATHS, WEIGHT_SUM_TOLERANCE};
use crate::errors::{Error, Result};

// =============================================================================
// Configuration
// =============================================================================

/// Weights of the risk sub-scores in the overall score. Must sum to 1.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RiskWeights {
    pub concentration: f64,
    pub volatility: f64,
    pub leverage: f64,
    pub sector: f64,
    pub liquidity: f64,
}

impl Default for RiskWeights {
    fn default() -> Self {
        Self {
            concentration: 0.25,
            volatility: 0.25,
            leverage: 0.20,
            sector: 0.15,
            liquidity: 0.15,
        }
    }
}

impl RiskWeights {
    pub fn sum(&self) -> f64 {
        self.concentration + self.volatility + self.leverage + self.sector + self.liquidity
    }

    pub fn validate(&self) -> Result<()> {
        let all = [
            self.concentration,
            self.volatility,
            self.leverage,
            self.sector,
            self.liquidity,
        ];
        if all.iter().any(|w| !w.is_finite() || *w < 0.0) {
            return Err(Error::InvalidConfigValue(
                "risk weights must be finite and non-negative".to_string(),
            ));
        }
        if (self.sum() - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(Error::InvalidConfigValue(format!(
                "risk weights must sum to 1.0, got {}",
                self.sum()
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MonteCarloConfig {
    /// Number of simulated paths (default: 1,000)
    pub paths: usize,
    /// Projection horizon in years (default: 10)
    pub horizon_years: u32,
    /// Time steps per simulated year (default: 12, monthly)
    pub steps_per_year: u32,
}

impl Default for MonteCarloConfig {
    fn default() -> Self {
        Self {
            paths: MIN_MONTE_CARLO_PATHS,
            horizon_years: 10,
            steps_per_year: 12,
        }
    }
}

impl MonteCarloConfig {
    pub fn total_steps(&self) -> usize {
        self.horizon_years as usize * self.steps_per_year as usize
    }

    pub fn validate(&self) -> Result<()> {
        if self.paths < MIN_MONTE_CARLO_PATHS {
            return Err(Error::InvalidConfigValue(format!(
                "risk.monteCarlo.paths must be at least {}, got {}",
                MIN_MONTE_CARLO_PATHS, self.paths
            )));
        }
        if !(1..=50).contains(&self.horizon_years) {
            return Err(Error::InvalidConfigValue(format!(
                "risk.monteCarlo.horizonYears must be in 1..=50, got {}",
                self.horizon_years
            )));
        }
        if !(1..=365).contains(&self.steps_per_year) {
            return Err(Error::InvalidConfigValue(format!(
                "risk.monteCarlo.stepsPerYear must be in 1..=365, got {}",
                self.steps_per_year
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RiskConfig {
    pub weights: RiskWeights,
    pub monte_carlo: MonteCarloConfig,
    /// Single-position weight above which trimming is recommended (default: 0.20)
    pub max_position_weight: f64,
    /// Single-sector weight above which diversification is recommended (default: 0.40)
    pub max_sector_weight: f64,
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            weights: RiskWeights::default(),
            monte_carlo: MonteCarloConfig::default(),
            max_position_weight: 0.20,
            max_sector_weight: 0.40,
        }
    }
}

impl RiskConfig {
    pub fn validate(&self) -> Result<()> {
        self.weights.validate()?;
        self.monte_carlo.validate()?;
        for (name, value) in [
            ("risk.maxPositionWeight", self.max_position_weight),
            ("risk.maxSectorWeight", self.max_sector_weight),
        ] {
            if !(value > 0.0 && value <= 1.0) {
                return Err(Error::InvalidConfigValue(format!(
                    "{} must be in (0, 1], got {}",
                    name, value
                )));
            }
        }
        Ok(())
    }
}

// =============================================================================
// Overall score
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskLevel {
    Low,
    Moderate,
    High,
}

impl RiskLevel {
    /// `< 30` Low, `[30, 70]` Moderate, `> 70` High.
    pub fn from_score(score: f64) -> Self {
        if score < 30.0 {
            RiskLevel::Low
        } else if score <= 70.0 {
            RiskLevel::Moderate
        } else {
            RiskLevel::High
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "Low",
            RiskLevel::Moderate => "Moderate",
            RiskLevel::High => "High",
        }
    }
}

/// Sub-scores on a 0-100 scale.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskBreakdown {
    pub concentration: f64,
    pub volatility: f64,
    pub leverage: f64,
    pub sector: f64,
    pub liquidity: f64,
}

impl RiskBreakdown {
    pub fn weighted_score(&self, weights: &RiskWeights) -> f64 {
        self.concentration * weights.concentration
            + self.volatility * weights.volatility
            + self.leverage * weights.leverage
            + self.sector * weights.sector
            + self.liquidity * weights.liquidity
    }
}

// =============================================================================
// Monte Carlo
// =============================================================================

/// Distribution of simulated terminal portfolio values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonteCarloProjection {
    pub paths: usize,
    pub horizon_years: u32,
    pub starting_value: f64,
    pub annual_return: f64,
    pub annual_volatility: f64,
    pub goal_value: f64,
    pub percentile_5: f64,
    pub percentile_25: f64,
    pub percentile_50: f64,
    pub percentile_75: f64,
    pub percentile_95: f64,
    pub mean_terminal_value: f64,
    /// Share of paths ending at or above `goal_value`
    pub probability_of_success: f64,
    /// Share of paths ending below `starting_value`
    pub probability_of_loss: f64,
    /// Median of the per-path maximum peak-to-trough decline
    pub median_max_drawdown: f64,
}

impl MonteCarloProjection {
    /// True when every terminal statistic is a finite number.
    pub fn is_finite(&self) -> bool {
        self.percentiles().iter().all(|v| v.is_finite())
            && self.mean_terminal_value.is_finite()
            && self.median_max_drawdown.is_finite()
    }

    /// Percentiles in ascending order (5, 25, 50, 75, 95).
    pub fn percentiles(&self) -> [f64; 5] {
        [
            self.percentile_5,
            self.percentile_25,
            self.percentile_50,
            self.percentile_75,
            self.percentile_95,
        ]
    }
}

// =============================================================================
// Concentration
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Diversification {
    WellDiversified,
    ModeratelyConcentrated,
    HighlyConcentrated,
    /// No holdings with value
    NotApplicable,
}

impl Diversification {
    /// `< 0.15` well diversified, `[0.15, 0.25]` moderate, `> 0.25` high.
    pub fn from_hhi(hhi: Option<f64>) -> Self {
        match hhi {
            None => Diversification::NotApplicable,
            Some(h) if h < 0.15 => Diversification::WellDiversified,
            Some(h) if h <= 0.25 => Diversification::ModeratelyConcentrated,
            Some(_) => Diversification::HighlyConcentrated,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Diversification::WellDiversified => "well diversified",
            Diversification::ModeratelyConcentrated => "moderately concentrated",
            Diversification::HighlyConcentrated => "highly concentrated",
            Diversification::NotApplicable => "not applicable",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionWeight {
    pub ticker: String,
    pub weight: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConcentrationRisk {
    /// Herfindahl-Hirschman index over position weights; `None` when not applicable
    pub hhi: Option<f64>,
    pub sector_hhi: Option<f64>,
    /// Largest position weight in percent (0-100)
    pub largest_position_risk: f64,
    /// `1 / HHI`
    pub effective_positions: Option<f64>,
    pub diversification: Diversification,
    pub top_holdings: Vec<PositionWeight>,
    pub sector_weights: BTreeMap<String, f64>,
}

// =============================================================================
// Recommendations
// =============================================================================

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Priority {
    #[default]
    Low,
    Medium,
    High,
    Critical,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
            Priority::Critical => "critical",
        }
    }

    pub fn timeframe(&self) -> &'static str {
        match self {
            Priority::Critical => "Immediate (1-3 days)",
            Priority::High => "Within 2 weeks",
            Priority::Medium => "Within 1-3 months",
            Priority::Low => "Next annual review",
        }
    }
}

/// Risk driver a recommendation addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskFactor {
    Concentration,
    Sector,
    Leverage,
    Volatility,
    Liquidity,
    General,
}

impl RiskFactor {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskFactor::Concentration => "concentration",
            RiskFactor::Sector => "sector",
            RiskFactor::Leverage => "leverage",
            RiskFactor::Volatility => "volatility",
            RiskFactor::Liquidity => "liquidity",
            RiskFactor::General => "general",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskRecommendation {
    pub factor: RiskFactor,
    pub title: String,
    pub description: String,
    pub priority: Priority,
    /// Expected drop of the overall risk score, in points
    pub expected_risk_reduction: f64,
    /// Risk reduction per unit of implementation cost
    pub cost_benefit: f64,
    pub timeframe: String,
}

impl RiskRecommendation {
    /// Most severe first, then the better cost-benefit ratio.
    pub fn rank_cmp(a: &Self, b: &Self) -> Ordering {
        b.priority.cmp(&a.priority).then_with(|| {
            b.cost_benefit
                .partial_cmp(&a.cost_benefit)
                .unwrap_or(Ordering::Equal)
        })
    }
}

// =============================================================================
// Result
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskAssessmentResult {
    /// Weighted sub-score total, 0-100
    pub overall_risk_score: f64,
    pub risk_level: RiskLevel,
    pub risk_breakdown: RiskBreakdown,
    pub monte_carlo: MonteCarloProjection,
    pub concentration_risk: ConcentrationRisk,
    pub recommendations: Vec<RiskRecommendation>,
    /// Portfolio volatility scaled to the current VIX regime
    pub effective_volatility: f64,
    pub expected_return: f64,
    /// Return and volatility came from sector priors
    pub has_estimate: bool,
}
