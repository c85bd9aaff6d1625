//! Composite risk scoring, Monte Carlo projection and concentration analysis.

use log::debug;

use super::{
    ConcentrationRisk, Diversification, MonteCarloSimulator, PositionWeight, Priority,
    RiskAssessmentResult, RiskBreakdown, RiskConfig, RiskFactor, RiskLevel, RiskRecommendation,
};
use crate::constants::SAFE_WITHDRAWAL_RATE;
use crate::errors::{Error, Result};
use crate::market::{HistoricalData, MarketConditions};
use crate::portfolio::{Portfolio, ReturnModel};
use crate::users::User;
use crate::utils::stats::{herfindahl, safe_div};

/// Annualized volatility that maps to a volatility sub-score of 100.
const VOLATILITY_CEILING: f64 = 0.40;
/// Loan-to-value that maps to a leverage sub-score of 100.
const LEVERAGE_CEILING: f64 = 0.50;
const CONCENTRATION_SCALE: f64 = 200.0;
const SECTOR_SCALE: f64 = 150.0;
const TOP_HOLDINGS: usize = 5;

#[derive(Debug, Clone, Default)]
pub struct RiskAssessmentEngine {
    config: RiskConfig,
}

impl RiskAssessmentEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: RiskConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RiskConfig {
        &self.config
    }

    pub fn assess(
        &self,
        portfolio: &Portfolio,
        user: &User,
        market: &MarketConditions,
        seed: u64,
    ) -> Result<RiskAssessmentResult> {
        portfolio.validate()?;
        user.validate()?;
        market.validate()?;

        let model = ReturnModel::estimate(portfolio, &HistoricalData::default());
        let weights = portfolio.weights();
        let expected_return = model.portfolio_return(&weights);
        let base_volatility = model.portfolio_volatility(&weights);
        let effective_volatility = base_volatility * market.volatility_regime();

        let breakdown = self.breakdown(portfolio, user, market, effective_volatility);
        let overall_risk_score = breakdown.weighted_score(&self.config.weights).clamp(0.0, 100.0);
        let risk_level = RiskLevel::from_score(overall_risk_score);

        // Long-horizon paths use the unscaled volatility; the VIX regime is a
        // near-term condition.
        let goal = user
            .goals
            .target_value(portfolio.portfolio_yield(), SAFE_WITHDRAWAL_RATE);
        let monte_carlo = MonteCarloSimulator::new(self.config.monte_carlo).simulate(
            portfolio.total_value(),
            expected_return,
            base_volatility,
            goal,
            seed,
        );
        if !monte_carlo.is_finite() {
            return Err(Error::Calculation(format!(
                "Monte Carlo projection of {:.3e} over {} years left the f64 range",
                portfolio.total_value(),
                monte_carlo.horizon_years
            )));
        }

        let concentration_risk = concentration(portfolio);
        let recommendations =
            self.recommendations(portfolio, user, market, &breakdown, &concentration_risk);

        debug!(
            "Risk assessment: score {:.1} ({}), HHI {:?}, MC p50 {:.0} over {} paths",
            overall_risk_score,
            risk_level.as_str(),
            concentration_risk.hhi,
            monte_carlo.percentile_50,
            monte_carlo.paths
        );

        Ok(RiskAssessmentResult {
            overall_risk_score,
            risk_level,
            risk_breakdown: breakdown,
            monte_carlo,
            concentration_risk,
            recommendations,
            effective_volatility,
            expected_return,
            has_estimate: model.used_fallback(),
        })
    }

    /// Sub-scores on 0-100. An empty portfolio scores 0 everywhere.
    pub fn breakdown(
        &self,
        portfolio: &Portfolio,
        user: &User,
        market: &MarketConditions,
        effective_volatility: f64,
    ) -> RiskBreakdown {
        if portfolio.is_empty() {
            return RiskBreakdown::default();
        }
        let loan_to_value = safe_div(user.margin.used, portfolio.total_value(), 0.0);
        RiskBreakdown {
            concentration: concentration_score(portfolio.herfindahl_index()),
            volatility: 100.0 * (effective_volatility / VOLATILITY_CEILING).min(1.0),
            leverage: leverage_score(loan_to_value),
            sector: portfolio
                .sector_herfindahl_index()
                .map_or(0.0, |h| (h * SECTOR_SCALE).min(100.0)),
            liquidity: 100.0 * market.liquidity_stress(),
        }
    }

    fn recommendations(
        &self,
        portfolio: &Portfolio,
        user: &User,
        market: &MarketConditions,
        breakdown: &RiskBreakdown,
        concentration: &ConcentrationRisk,
    ) -> Vec<RiskRecommendation> {
        let w = &self.config.weights;
        let mut out = Vec::new();

        if portfolio.is_empty() {
            return out;
        }

        // Trim the largest position to the cap, spreading the excess pro rata.
        let max_weight = self.config.max_position_weight;
        if let Some(top) = concentration.top_holdings.first() {
            if top.weight > max_weight {
                let after_hhi = if portfolio.holdings.len() > 1 {
                    herfindahl(&trimmed_weights(&portfolio.weights(), max_weight))
                } else {
                    // A lone position can only be diluted by new ones.
                    Some(max_weight)
                };
                let after = concentration_score(after_hhi);
                let reduction = w.concentration * (breakdown.concentration - after).max(0.0);
                let turnover = top.weight - max_weight;
                let priority = if top.weight > 0.35 {
                    Priority::High
                } else {
                    Priority::Medium
                };
                out.push(RiskRecommendation {
                    factor: RiskFactor::Concentration,
                    title: format!("Trim {} position", top.ticker),
                    description: format!(
                        "{} is {:.1}% of the portfolio; reducing it to {:.0}% lowers single-name risk",
                        top.ticker,
                        top.weight * 100.0,
                        max_weight * 100.0
                    ),
                    priority,
                    expected_risk_reduction: reduction,
                    cost_benefit: cost_benefit(reduction, turnover),
                    timeframe: priority.timeframe().to_string(),
                });
            }
        }

        let largest_sector = concentration
            .sector_weights
            .iter()
            .max_by(|a, b| a.1.partial_cmp(b.1).unwrap_or(std::cmp::Ordering::Equal));
        if let Some((sector, weight)) = largest_sector {
            if *weight > self.config.max_sector_weight {
                let after = (SECTOR_SCALE * 0.25).min(100.0);
                let reduction = w.sector * (breakdown.sector - after).max(0.0);
                let priority = if *weight > 0.60 {
                    Priority::High
                } else {
                    Priority::Medium
                };
                out.push(RiskRecommendation {
                    factor: RiskFactor::Sector,
                    title: "Diversify across sectors".to_string(),
                    description: format!(
                        "{} makes up {:.1}% of holdings; add exposure to uncorrelated sectors",
                        sector,
                        weight * 100.0
                    ),
                    priority,
                    expected_risk_reduction: reduction,
                    cost_benefit: cost_benefit(reduction, weight - self.config.max_sector_weight),
                    timeframe: priority.timeframe().to_string(),
                });
            }
        }

        let loan_to_value = safe_div(user.margin.used, portfolio.total_value(), 0.0);
        if loan_to_value > 0.30 {
            let target = 0.25;
            let reduction = w.leverage * (breakdown.leverage - leverage_score(target)).max(0.0);
            let priority = if loan_to_value >= LEVERAGE_CEILING {
                Priority::Critical
            } else {
                Priority::High
            };
            out.push(RiskRecommendation {
                factor: RiskFactor::Leverage,
                title: "Reduce margin leverage".to_string(),
                description: format!(
                    "Margin is {:.1}% of portfolio value; paying down ${:.0} brings it to {:.0}%",
                    loan_to_value * 100.0,
                    user.margin.used - target * portfolio.total_value(),
                    target * 100.0
                ),
                priority,
                expected_risk_reduction: reduction,
                cost_benefit: cost_benefit(reduction, loan_to_value - target),
                timeframe: priority.timeframe().to_string(),
            });
        }

        if breakdown.volatility > 60.0 {
            let reduction = w.volatility * (breakdown.volatility - 60.0);
            out.push(RiskRecommendation {
                factor: RiskFactor::Volatility,
                title: "Add low-volatility income holdings".to_string(),
                description: "Shift part of the portfolio toward utilities, bonds or broad dividend ETFs to dampen swings".to_string(),
                priority: Priority::Medium,
                expected_risk_reduction: reduction,
                cost_benefit: cost_benefit(reduction, 0.20),
                timeframe: Priority::Medium.timeframe().to_string(),
            });
        }

        if market.liquidity_stress() > 0.5 {
            let reduction = w.liquidity * (breakdown.liquidity - 50.0).max(0.0) * 0.5;
            out.push(RiskRecommendation {
                factor: RiskFactor::Liquidity,
                title: "Build a cash buffer".to_string(),
                description: format!(
                    "Credit spreads at {:.2}% and VIX at {:.0} signal tight liquidity; hold cash to avoid forced sales",
                    market.credit_spread * 100.0,
                    market.volatility_index
                ),
                priority: Priority::Medium,
                expected_risk_reduction: reduction,
                cost_benefit: cost_benefit(reduction, 0.05),
                timeframe: Priority::Medium.timeframe().to_string(),
            });
        }

        if out.is_empty() {
            out.push(RiskRecommendation {
                factor: RiskFactor::General,
                title: "Maintain current allocation".to_string(),
                description: format!(
                    "Risk profile is {}; review allocation at the next scheduled rebalance",
                    RiskLevel::from_score(breakdown.weighted_score(w)).as_str()
                ),
                priority: Priority::Low,
                expected_risk_reduction: 0.0,
                cost_benefit: 0.0,
                timeframe: Priority::Low.timeframe().to_string(),
            });
        }

        out.sort_by(RiskRecommendation::rank_cmp);
        out
    }
}

/// HHI-based concentration summary. Empty portfolios are not applicable.
pub fn concentration(portfolio: &Portfolio) -> ConcentrationRisk {
    let hhi = portfolio.herfindahl_index();
    let weights = portfolio.weights();

    let mut top_holdings: Vec<PositionWeight> = portfolio
        .holdings
        .iter()
        .zip(&weights)
        .map(|(h, w)| PositionWeight {
            ticker: h.ticker.clone(),
            weight: *w,
        })
        .collect();
    top_holdings.sort_by(|a, b| {
        b.weight
            .partial_cmp(&a.weight)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    top_holdings.truncate(TOP_HOLDINGS);

    ConcentrationRisk {
        hhi,
        sector_hhi: portfolio.sector_herfindahl_index(),
        largest_position_risk: weights.iter().copied().fold(0.0, f64::max) * 100.0,
        effective_positions: hhi.and_then(|h| (h > 0.0).then_some(1.0 / h)),
        diversification: Diversification::from_hhi(hhi),
        top_holdings,
        sector_weights: portfolio.sector_weights(),
    }
}

fn concentration_score(hhi: Option<f64>) -> f64 {
    hhi.map_or(0.0, |h| (h * CONCENTRATION_SCALE).min(100.0))
}

fn leverage_score(loan_to_value: f64) -> f64 {
    100.0 * (loan_to_value / LEVERAGE_CEILING).clamp(0.0, 1.0)
}

/// Risk points per 10 points of portfolio turnover.
fn cost_benefit(reduction: f64, turnover: f64) -> f64 {
    safe_div(reduction, (turnover.max(0.0) * 10.0).max(0.1), 0.0)
}

/// Caps every weight at `cap` (raised to `1/N` when the cap cannot hold
/// the whole portfolio) and redistributes the excess over the positions
/// still below the cap, in proportion to their weight.
fn trimmed_weights(weights: &[f64], cap: f64) -> Vec<f64> {
    let n = weights.len();
    if n == 0 {
        return Vec::new();
    }
    let cap = cap.max(1.0 / n as f64);
    let mut out = weights.to_vec();
    for _ in 0..n {
        let excess: f64 = out.iter().map(|w| (w - cap).max(0.0)).sum();
        if excess <= 1e-12 {
            break;
        }
        let uncapped: Vec<usize> = (0..n).filter(|i| out[*i] < cap).collect();
        if uncapped.is_empty() {
            break;
        }
        let room: f64 = uncapped.iter().map(|i| out[*i]).sum();
        let slots = uncapped.len() as f64;
        for w in out.iter_mut() {
            *w = w.min(cap);
        }
        for i in uncapped {
            let share = if room > 0.0 { out[i] / room } else { 1.0 / slots };
            out[i] += excess * share;
        }
    }
    out
}
