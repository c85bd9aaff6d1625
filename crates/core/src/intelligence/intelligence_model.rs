//! Engine configuration, pipeline inputs and the combined report.

use serde::{Deserialize, Serialize};

use crate::analytics::{AdvancedAnalyticsResult, AnalyticsConfig};
use crate::errors::{Error, Result};
use crate::feedback::UserFeedback;
use crate::margin::{MarginConfig, MarginIntelligenceResult};
use crate::market::{HistoricalData, MarketConditions};
use crate::portfolio::Portfolio;
use crate::recommendations::{IntelligentRecommendationResult, RecommendationConfig};
use crate::risk::{RiskAssessmentResult, RiskConfig};
use crate::users::User;

/// Configuration for the whole pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EngineConfig {
    pub margin: MarginConfig,
    pub risk: RiskConfig,
    pub analytics: AnalyticsConfig,
    pub recommendations: RecommendationConfig,
    /// Seed used when a request does not bring one. `None` draws a fresh seed per request.
    pub seed: Option<u64>,
    /// Most reports the service keeps memoized (default: 64)
    pub cache_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            margin: MarginConfig::default(),
            risk: RiskConfig::default(),
            analytics: AnalyticsConfig::default(),
            recommendations: RecommendationConfig::default(),
            seed: None,
            cache_capacity: 64,
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<()> {
        self.margin.validate()?;
        self.risk.validate()?;
        self.analytics.validate()?;
        self.recommendations.validate()?;
        Ok(())
    }

    /// Parses and validates a JSON configuration. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: EngineConfig = serde_json::from_str(json)
            .map_err(|e| Error::InvalidConfigValue(format!("engine config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }
}

/// Immutable snapshot evaluated by the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationInputs {
    pub portfolio: Portfolio,
    pub user: User,
    #[serde(default)]
    pub market: MarketConditions,
    #[serde(default)]
    pub history: HistoricalData,
    #[serde(default)]
    pub feedback: UserFeedback,
}

impl EvaluationInputs {
    pub fn new(portfolio: Portfolio, user: User, market: MarketConditions) -> Self {
        Self {
            portfolio,
            user,
            market,
            history: HistoricalData::default(),
            feedback: UserFeedback::default(),
        }
    }

    pub fn with_history(mut self, history: HistoricalData) -> Self {
        self.history = history;
        self
    }

    pub fn with_feedback(mut self, feedback: UserFeedback) -> Self {
        self.feedback = feedback;
        self
    }

    pub fn validate(&self) -> Result<()> {
        self.portfolio.validate()?;
        self.user.validate()?;
        self.market.validate()?;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntelligenceReport {
    pub margin: MarginIntelligenceResult,
    pub risk: RiskAssessmentResult,
    pub analytics: AdvancedAnalyticsResult,
    pub recommendations: IntelligentRecommendationResult,
    /// Seed the report was computed with; re-running with it reproduces the report
    pub seed: u64,
}
