//! Fan-out/fan-in evaluation of the four components.

use log::debug;
use sha2::{Digest, Sha256};

use super::{EngineConfig, EvaluationInputs, IntelligenceReport};
use crate::analytics::AdvancedAnalyticsEngine;
use crate::errors::Result;
use crate::margin::MarginIntelligenceCalculator;
use crate::recommendations::RecommendationGenerator;
use crate::risk::RiskAssessmentEngine;
use crate::utils::rng::derive_seed;

const RISK_STREAM: u64 = 1;
const ANALYTICS_STREAM: u64 = 2;

#[derive(Debug, Clone, Default)]
pub struct IntelligenceEngine {
    margin: MarginIntelligenceCalculator,
    risk: RiskAssessmentEngine,
    analytics: AdvancedAnalyticsEngine,
    recommendations: RecommendationGenerator,
}

impl IntelligenceEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: EngineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            margin: MarginIntelligenceCalculator::with_config(config.margin),
            risk: RiskAssessmentEngine::with_config(config.risk),
            analytics: AdvancedAnalyticsEngine::with_config(config.analytics),
            recommendations: RecommendationGenerator::with_config(config.recommendations),
        })
    }

    /// Runs margin, risk and analytics concurrently on the same snapshot, then
    /// the recommendation stage once all three have finished.
    ///
    /// A validation failure in any leaf stops the pipeline before the
    /// recommendation stage; when several fail, the margin error is reported
    /// first, then risk, then analytics.
    pub fn evaluate(&self, inputs: &EvaluationInputs, seed: u64) -> Result<IntelligenceReport> {
        inputs.validate()?;
        let EvaluationInputs {
            portfolio,
            user,
            market,
            history,
            feedback,
        } = inputs;

        let ((margin, risk), analytics) = rayon::join(
            || {
                rayon::join(
                    || self.margin.compute(portfolio, user, market),
                    || {
                        self.risk
                            .assess(portfolio, user, market, derive_seed(seed, RISK_STREAM))
                    },
                )
            },
            || {
                self.analytics.analyze(
                    portfolio,
                    user,
                    history,
                    feedback,
                    market,
                    derive_seed(seed, ANALYTICS_STREAM),
                )
            },
        );
        let margin = margin?;
        let risk = risk?;
        let analytics = analytics?;

        let recommendations = self.recommendations.generate(
            portfolio, user, &margin, &risk, &analytics, history, feedback,
        );
        debug!(
            "Evaluated {} holdings (seed {}): risk {:.1}, {} recommendations",
            portfolio.holdings.len(),
            seed,
            risk.overall_risk_score,
            recommendations.personalized_recommendations.len()
        );

        Ok(IntelligenceReport {
            margin,
            risk,
            analytics,
            recommendations,
            seed,
        })
    }
}

/// Hex SHA-256 of the serialized inputs, configuration and seed.
///
/// Equal fingerprints mean the pipeline would produce equal reports.
pub fn fingerprint(inputs: &EvaluationInputs, config: &EngineConfig, seed: u64) -> Result<String> {
    let mut hasher = Sha256::new();
    hasher.update(serde_json::to_vec(inputs)?);
    hasher.update(b"|");
    hasher.update(serde_json::to_vec(config)?);
    hasher.update(b"|");
    hasher.update(seed.to_le_bytes());
    Ok(hex::encode(hasher.finalize()))
}
