//! Advanced analytics configuration and result records.

use serde::{Deserialize, Serialize};

use crate::errors::{Error, Result};
use crate::portfolio::AccountType;

// =============================================================================
// Configuration
// =============================================================================

/// Multi-start simulated annealing settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OptimizerConfig {
    /// Random starting points in addition to the current and equal weights
    pub random_starts: usize,
    /// Annealing iterations per start
    pub iterations: usize,
    pub initial_temperature: f64,
    /// Multiplicative temperature decay per iteration
    pub cooling_rate: f64,
    /// Largest weight shifted between two assets in one move
    pub step_size: f64,
    /// Per-asset weight cap; raised to `1/N` when smaller
    pub max_weight: f64,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            random_starts: 6,
            iterations: 1_500,
            initial_temperature: 0.05,
            cooling_rate: 0.995,
            step_size: 0.05,
            max_weight: 0.25,
        }
    }
}

impl OptimizerConfig {
    pub fn validate(&self) -> Result<()> {
        if self.iterations == 0 {
            return Err(Error::InvalidConfigValue(
                "analytics.optimizer.iterations must be positive".to_string(),
            ));
        }
        if !(self.initial_temperature > 0.0) {
            return Err(Error::InvalidConfigValue(
                "analytics.optimizer.initialTemperature must be positive".to_string(),
            ));
        }
        if !(self.cooling_rate > 0.0 && self.cooling_rate < 1.0) {
            return Err(Error::InvalidConfigValue(format!(
                "analytics.optimizer.coolingRate must be in (0, 1), got {}",
                self.cooling_rate
            )));
        }
        if !(self.step_size > 0.0 && self.step_size <= 1.0) {
            return Err(Error::InvalidConfigValue(format!(
                "analytics.optimizer.stepSize must be in (0, 1], got {}",
                self.step_size
            )));
        }
        if !(self.max_weight > 0.0 && self.max_weight <= 1.0) {
            return Err(Error::InvalidConfigValue(format!(
                "analytics.optimizer.maxWeight must be in (0, 1], got {}",
                self.max_weight
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AnalyticsConfig {
    pub optimizer: OptimizerConfig,
    /// Growth trajectory horizons in years (default: 5, 10, 20)
    pub horizons: Vec<u32>,
    /// Minimum loss, as a fraction of cost, worth harvesting (default: 0.05)
    pub harvest_threshold: f64,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            optimizer: OptimizerConfig::default(),
            horizons: vec![5, 10, 20],
            harvest_threshold: 0.05,
        }
    }
}

impl AnalyticsConfig {
    pub fn validate(&self) -> Result<()> {
        self.optimizer.validate()?;
        if self.horizons.is_empty() || self.horizons.iter().any(|h| *h == 0 || *h > 100) {
            return Err(Error::InvalidConfigValue(
                "analytics.horizons must be a non-empty list of years in 1..=100".to_string(),
            ));
        }
        if !(0.0..1.0).contains(&self.harvest_threshold) {
            return Err(Error::InvalidConfigValue(format!(
                "analytics.harvestThreshold must be in [0, 1), got {}",
                self.harvest_threshold
            )));
        }
        Ok(())
    }
}

// =============================================================================
// Data quality
// =============================================================================

/// What the analysis had to work with.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataQuality {
    pub has_price_history: bool,
    pub has_dividend_history: bool,
    pub has_feedback: bool,
    /// At least one holding used sector priors instead of its own history
    pub used_fallback_estimates: bool,
    pub notes: Vec<String>,
}

impl DataQuality {
    /// 0-1 multiplier for downstream confidence.
    pub fn confidence_factor(&self) -> f64 {
        let mut factor = 1.0;
        if self.used_fallback_estimates {
            factor -= 0.15;
        }
        if !self.has_feedback {
            factor -= 0.05;
        }
        if !self.has_dividend_history {
            factor -= 0.05;
        }
        factor
    }
}

// =============================================================================
// Optimization
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AllocationTarget {
    pub ticker: String,
    pub current_weight: f64,
    pub target_weight: f64,
}

impl AllocationTarget {
    pub fn drift(&self) -> f64 {
        self.current_weight - self.target_weight
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptimizationResult {
    pub expected_return: f64,
    pub expected_volatility: f64,
    /// `(expected_return - risk_free) / expected_volatility`, 0 when volatility is 0
    pub sharpe_ratio: f64,
    /// Relative Sharpe improvement over the equal-weight portfolio
    pub quantum_advantage: f64,
    pub baseline_sharpe: f64,
    pub current_expected_return: f64,
    pub current_volatility: f64,
    pub current_sharpe: f64,
    pub target_allocation: Vec<AllocationTarget>,
    pub iterations: usize,
}

// =============================================================================
// Behavioral insights
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecisionQuality {
    /// 0-100
    pub overall_score: f64,
    /// 0-1, share of decisions not reversed within the whipsaw window
    pub consistency: f64,
    /// 0-1, how quickly the user acts on triggers
    pub timeliness: f64,
    /// Share of decisions with a positive outcome
    pub hit_rate: f64,
    pub follow_through_rate: Option<f64>,
    pub decisions_analyzed: usize,
}

impl Default for DecisionQuality {
    fn default() -> Self {
        Self {
            overall_score: 50.0,
            consistency: 0.5,
            timeliness: 0.5,
            hit_rate: 0.5,
            follow_through_rate: None,
            decisions_analyzed: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[derive(Default)]
pub enum EmotionalStateKind {
    #[default]
    Calm,
    Confident,
    Anxious,
    Fearful,
    Euphoric,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmotionalState {
    pub current_state: EmotionalStateKind,
    /// 0-1, confidence in the inferred state
    pub confidence: f64,
    /// 0-1
    pub stress_level: f64,
}

impl Default for EmotionalState {
    fn default() -> Self {
        Self {
            current_state: EmotionalStateKind::Calm,
            confidence: 0.0,
            stress_level: 0.5,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BiasType {
    LossAversion,
    RecencyBias,
    Overconfidence,
    HerdBehavior,
    DispositionEffect,
}

impl BiasType {
    pub fn label(&self) -> &'static str {
        match self {
            BiasType::LossAversion => "loss aversion",
            BiasType::RecencyBias => "recency bias",
            BiasType::Overconfidence => "overconfidence",
            BiasType::HerdBehavior => "herd behavior",
            BiasType::DispositionEffect => "disposition effect",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl Severity {
    pub fn from_strength(strength: f64) -> Self {
        if strength >= 0.75 {
            Severity::High
        } else if strength >= 0.5 {
            Severity::Medium
        } else {
            Severity::Low
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectedBias {
    #[serde(rename = "type")]
    pub bias_type: BiasType,
    /// Estimated annual return drag, as a fraction
    pub impact: f64,
    pub severity: Severity,
    pub evidence: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BehavioralInsights {
    pub decision_quality: DecisionQuality,
    pub emotional_state: EmotionalState,
    pub bias_detection: Vec<DetectedBias>,
    /// True when there was no feedback and neutral defaults were used
    pub has_estimate: bool,
}

// =============================================================================
// Tax optimization
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationMove {
    pub ticker: String,
    pub from: AccountType,
    pub to: AccountType,
    /// Market value to relocate
    pub amount: f64,
    pub annual_tax_saving: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetLocation {
    /// Annual dividend tax paid with the current placement
    pub current_tax_drag: f64,
    /// Annual dividend tax with the greedy placement
    pub optimal_tax_drag: f64,
    pub estimated_benefit: f64,
    pub moves: Vec<LocationMove>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HarvestCandidate {
    pub ticker: String,
    pub unrealized_loss: f64,
    pub tax_savings: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaxOptimization {
    /// Location benefit plus harvesting savings
    pub estimated_tax_savings: f64,
    pub asset_location: AssetLocation,
    pub harvestable_losses: f64,
    pub harvesting_savings: f64,
    pub harvest_candidates: Vec<HarvestCandidate>,
    /// Federal tax avoided through the 20% pass-through deduction
    pub section_199a_deduction_value: f64,
}

// =============================================================================
// Portfolio evolution
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GrowthProjection {
    pub years: u32,
    /// 10th percentile terminal value
    pub conservative_growth: f64,
    /// Median terminal value
    pub expected_growth: f64,
    /// 90th percentile terminal value
    pub optimistic_growth: f64,
    /// Dividend income at the median value and current yield
    pub projected_annual_income: f64,
    pub probability_of_success: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioEvolution {
    pub goal_value: f64,
    pub growth_trajectory: Vec<GrowthProjection>,
}

// =============================================================================
// Result
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdvancedAnalyticsResult {
    pub optimization: OptimizationResult,
    pub behavioral_insights: BehavioralInsights,
    pub tax_optimization: TaxOptimization,
    pub portfolio_evolution: PortfolioEvolution,
    pub data_quality: DataQuality,
}
