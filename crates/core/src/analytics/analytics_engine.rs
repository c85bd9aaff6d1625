//! Optimization, behavioral, tax and growth analytics over one snapshot.

use log::{debug, info};

use super::{
    AdvancedAnalyticsResult, AnalyticsConfig, BehavioralAnalyzer, DataQuality, GrowthProjection,
    PortfolioEvolution, PortfolioOptimizer, TaxLocationAnalyzer,
};
use crate::constants::{SAFE_WITHDRAWAL_RATE, Z_P10, Z_P90};
use crate::errors::Result;
use crate::feedback::UserFeedback;
use crate::market::{HistoricalData, MarketConditions};
use crate::portfolio::{Portfolio, ReturnModel};
use crate::users::User;
use crate::utils::stats::norm_cdf;

#[derive(Debug, Clone, Default)]
pub struct AdvancedAnalyticsEngine {
    config: AnalyticsConfig,
}

impl AdvancedAnalyticsEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: AnalyticsConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AnalyticsConfig {
        &self.config
    }

    /// Empty history or feedback degrade to documented estimates and are
    /// reported through [`DataQuality`]; only malformed input fails.
    pub fn analyze(
        &self,
        portfolio: &Portfolio,
        user: &User,
        history: &HistoricalData,
        feedback: &UserFeedback,
        market: &MarketConditions,
        seed: u64,
    ) -> Result<AdvancedAnalyticsResult> {
        portfolio.validate()?;
        user.validate()?;
        market.validate()?;

        let model = ReturnModel::estimate(portfolio, history);
        let data_quality = data_quality(portfolio, history, feedback, &model);
        if data_quality.used_fallback_estimates && !portfolio.holdings.is_empty() {
            info!(
                "Analytics using sector priors for {} of {} holdings",
                model.assets.iter().filter(|a| !a.from_history).count(),
                model.len()
            );
        }

        let weights = portfolio.weights();
        let optimization = PortfolioOptimizer::new(self.config.optimizer).optimize(
            &model,
            &weights,
            market.risk_free_rate(),
            seed,
        );
        let behavioral_insights = BehavioralAnalyzer::new().analyze(feedback, history, market.as_of);
        let tax_optimization = TaxLocationAnalyzer::new(self.config.harvest_threshold)
            .analyze(portfolio, &user.tax_profile);
        let portfolio_evolution = self.evolution(portfolio, user, &model, &weights);

        debug!(
            "Analytics: sharpe {:.3} (baseline {:.3}), {} biases, tax savings {:.0}",
            optimization.sharpe_ratio,
            optimization.baseline_sharpe,
            behavioral_insights.bias_detection.len(),
            tax_optimization.estimated_tax_savings
        );

        Ok(AdvancedAnalyticsResult {
            optimization,
            behavioral_insights,
            tax_optimization,
            portfolio_evolution,
            data_quality,
        })
    }

    /// Lognormal terminal-value quantiles for each horizon.
    ///
    /// With `ν = μ - σ²/2`, the value after `T` years at standard-normal
    /// quantile `z` is `V₀·exp(νT + zσ√T)`; p10/p50/p90 are therefore
    /// ordered for any inputs. Success is `P(V_T ≥ goal) =
    /// Φ((ln(V₀/goal) + νT) / (σ√T))`.
    pub fn evolution(
        &self,
        portfolio: &Portfolio,
        user: &User,
        model: &ReturnModel,
        weights: &[f64],
    ) -> PortfolioEvolution {
        let start = portfolio.total_value();
        let portfolio_yield = portfolio.portfolio_yield();
        let goal_value = user.goals.target_value(portfolio_yield, SAFE_WITHDRAWAL_RATE);
        let mu = model.portfolio_return(weights);
        let sigma = model.portfolio_volatility(weights);
        let nu = mu - sigma * sigma / 2.0;

        let growth_trajectory = self
            .config
            .horizons
            .iter()
            .map(|&years| {
                let t = years as f64;
                let spread = sigma * t.sqrt();
                let at = |z: f64| start * (nu * t + z * spread).exp();
                let median = at(0.0);

                let probability_of_success = if goal_value <= 0.0 {
                    1.0
                } else if start <= 0.0 {
                    0.0
                } else if spread <= 0.0 {
                    if median >= goal_value {
                        1.0
                    } else {
                        0.0
                    }
                } else {
                    norm_cdf(((start / goal_value).ln() + nu * t) / spread)
                };

                GrowthProjection {
                    years,
                    conservative_growth: at(Z_P10),
                    expected_growth: median,
                    optimistic_growth: at(Z_P90),
                    projected_annual_income: median * portfolio_yield,
                    probability_of_success,
                }
            })
            .collect();

        PortfolioEvolution {
            goal_value,
            growth_trajectory,
        }
    }
}

fn data_quality(
    portfolio: &Portfolio,
    history: &HistoricalData,
    feedback: &UserFeedback,
    model: &ReturnModel,
) -> DataQuality {
    let has_price_history = !history.price_history.is_empty();
    let has_dividend_history = !history.dividend_history.is_empty();
    let has_feedback = !feedback.is_empty();
    let used_fallback_estimates = model.used_fallback();

    let mut notes = Vec::new();
    if !has_price_history {
        notes.push(
            "No price history: returns and volatility use sector estimates".to_string(),
        );
    } else if used_fallback_estimates {
        let missing: Vec<&str> = model
            .assets
            .iter()
            .filter(|a| !a.from_history)
            .map(|a| a.ticker.as_str())
            .collect();
        notes.push(format!(
            "Insufficient price history for {}: sector estimates used",
            missing.join(", ")
        ));
    }
    if !has_dividend_history {
        notes.push("No dividend history: income uses stated yields".to_string());
    }
    if !has_feedback {
        notes.push("No feedback: behavioral insights use neutral defaults".to_string());
    }
    if portfolio.is_empty() {
        notes.push("Portfolio has no value: analytics are not applicable".to_string());
    }

    DataQuality {
        has_price_history,
        has_dividend_history,
        has_feedback,
        used_fallback_estimates,
        notes,
    }
}
