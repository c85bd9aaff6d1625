//! Personalized recommendation output records and generator configuration.

use serde::{Deserialize, Serialize};

use crate::analytics::BiasType;
use crate::errors::{Error, Result};
use crate::risk::Priority;

// =============================================================================
// Configuration
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RecommendationConfig {
    /// Overall risk score above which an emergency alert is raised (default: 80)
    pub critical_risk_score: f64,
    /// Trading days to liquidation below which a margin alert is raised (default: 30)
    pub liquidation_alert_days: f64,
    /// Weight drift from target that triggers rebalancing (default: 0.05)
    pub rebalance_drift_threshold: f64,
    /// Drop in per-share payment treated as a dividend cut (default: 0.10)
    pub dividend_cut_threshold: f64,
    /// Most recommendations returned (default: 10)
    pub max_recommendations: usize,
    /// Window for tax-loss harvesting when no reference date is known (default: 30)
    pub default_harvest_window_days: u32,
}

impl Default for RecommendationConfig {
    fn default() -> Self {
        Self {
            critical_risk_score: 80.0,
            liquidation_alert_days: 30.0,
            rebalance_drift_threshold: 0.05,
            dividend_cut_threshold: 0.10,
            max_recommendations: 10,
            default_harvest_window_days: 30,
        }
    }
}

impl RecommendationConfig {
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=100.0).contains(&self.critical_risk_score) {
            return Err(Error::InvalidConfigValue(format!(
                "recommendations.criticalRiskScore must be in [0, 100], got {}",
                self.critical_risk_score
            )));
        }
        if !(self.liquidation_alert_days >= 0.0) {
            return Err(Error::InvalidConfigValue(
                "recommendations.liquidationAlertDays must not be negative".to_string(),
            ));
        }
        for (name, value) in [
            ("rebalanceDriftThreshold", self.rebalance_drift_threshold),
            ("dividendCutThreshold", self.dividend_cut_threshold),
        ] {
            if !(value > 0.0 && value < 1.0) {
                return Err(Error::InvalidConfigValue(format!(
                    "recommendations.{} must be in (0, 1), got {}",
                    name, value
                )));
            }
        }
        if self.max_recommendations == 0 {
            return Err(Error::InvalidConfigValue(
                "recommendations.maxRecommendations must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

// =============================================================================
// Personalized recommendations
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RecommendationCategory {
    Margin,
    Risk,
    Tax,
    Behavioral,
    Rebalance,
    Income,
}

impl RecommendationCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecommendationCategory::Margin => "margin",
            RecommendationCategory::Risk => "risk",
            RecommendationCategory::Tax => "tax",
            RecommendationCategory::Behavioral => "behavioral",
            RecommendationCategory::Rebalance => "rebalance",
            RecommendationCategory::Income => "income",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpectedImpact {
    /// Annual dollars
    pub income_increase: f64,
    /// Overall risk score points; negative when the action adds risk
    pub risk_reduction: f64,
    /// Annual dollars
    pub tax_savings: f64,
    /// Days until the benefit shows up
    pub time_to_realize: u32,
}

impl ExpectedImpact {
    /// Sums the amounts and keeps the longer realization time.
    pub fn combine(&self, other: &Self) -> Self {
        Self {
            income_increase: self.income_increase + other.income_increase,
            risk_reduction: self.risk_reduction + other.risk_reduction,
            tax_savings: self.tax_savings + other.tax_savings,
            time_to_realize: self.time_to_realize.max(other.time_to_realize),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImplementationPhase {
    pub order: u32,
    pub name: String,
    pub description: String,
    pub duration_days: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonalizedRecommendation {
    pub id: String,
    pub category: RecommendationCategory,
    pub title: String,
    pub description: String,
    pub priority: Priority,
    /// 0-1, after data-quality and follow-through adjustment
    pub ai_confidence: f64,
    pub expected_impact: ExpectedImpact,
    pub personalized_reasoning: String,
    pub implementation: Vec<ImplementationPhase>,
}

// =============================================================================
// Nudges, alerts and opportunities
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BehavioralNudge {
    pub bias_type: BiasType,
    pub message: String,
    pub suggested_action: String,
    pub priority: Priority,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlertKind {
    ActiveMarginCall,
    MarginCallRisk,
    CriticalRiskScore,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmergencyAlert {
    pub kind: AlertKind,
    pub severity: Priority,
    pub title: String,
    pub message: String,
    pub timeframe: String,
    /// In the order they should be taken
    pub immediate_actions: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OpportunityKind {
    TaxLossHarvesting,
    Rebalancing,
    AssetLocation,
    MarginDeployment,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Opportunity {
    pub kind: OpportunityKind,
    pub title: String,
    pub description: String,
    /// Annual dollars
    pub potential_benefit: f64,
    /// Days the opportunity stays open
    pub time_window: u32,
    pub confidence: f64,
}

// =============================================================================
// Result
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntelligentRecommendationResult {
    pub personalized_recommendations: Vec<PersonalizedRecommendation>,
    pub behavioral_nudges: Vec<BehavioralNudge>,
    pub emergency_alerts: Vec<EmergencyAlert>,
    pub opportunity_detection: Vec<Opportunity>,
    /// Multiplier applied to every candidate's base confidence
    pub confidence_adjustment: f64,
}
