//! Margin usage, liquidation risk, stress tests and margin tax notes.

use log::debug;

use super::{
    rank_margin_recommendations, MarginAction, MarginConfig, MarginFocus,
    MarginIntelligenceResult, MarginRecommendation, MarginRiskAssessment, MarginTaxOptimization,
    MarginUsage, StressTestResult,
};
use crate::constants::{MARGIN_DAY_COUNT_BASIS, TRADING_DAYS_PER_YEAR};
use crate::errors::Result;
use crate::market::{HistoricalData, MarketConditions};
use crate::portfolio::{IncomeClassification, Portfolio, ReturnModel};
use crate::users::User;
use crate::utils::stats::{checked_ratio, clamp01, norm_cdf, safe_div};

/// Computes [`MarginIntelligenceResult`] from a portfolio/user/market snapshot.
#[derive(Debug, Clone, Default)]
pub struct MarginIntelligenceCalculator {
    config: MarginConfig,
}

impl MarginIntelligenceCalculator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: MarginConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &MarginConfig {
        &self.config
    }

    /// Fails only on malformed input; otherwise always returns a complete result.
    pub fn compute(
        &self,
        portfolio: &Portfolio,
        user: &User,
        market: &MarketConditions,
    ) -> Result<MarginIntelligenceResult> {
        portfolio.validate()?;
        user.validate()?;
        market.validate()?;

        // Margin analysis runs on cross-sectional estimates only.
        let model = ReturnModel::estimate(portfolio, &HistoricalData::default());
        let weights = portfolio.weights();
        let expected_return = model.portfolio_return(&weights);
        let volatility = model.portfolio_volatility(&weights) * market.volatility_regime();

        let usage = self.current_usage(portfolio, user);
        let risk = self.risk_assessment(portfolio, user, &usage, expected_return, volatility);
        let stress_tests = self.stress_tests(portfolio, user);
        let tax = self.tax_optimization(portfolio, user, &usage);
        let recommendations = self.recommendations(portfolio, user, market, &usage, &risk, &tax);

        debug!(
            "Margin intelligence: utilization {:.3}, coverage {:?}, {} of {} scenarios trigger a call",
            usage.utilization_ratio,
            risk.dividend_coverage_ratio,
            stress_tests.iter().filter(|s| s.margin_call_trigger).count(),
            stress_tests.len()
        );

        Ok(MarginIntelligenceResult {
            has_margin: user.margin.used > 0.0,
            current_usage: usage,
            risk_assessment: risk,
            stress_tests,
            recommendations,
            tax_optimization: tax,
            has_estimate: model.used_fallback(),
        })
    }

    pub fn current_usage(&self, portfolio: &Portfolio, user: &User) -> MarginUsage {
        let margin = &user.margin;
        let total_value = portfolio.total_value();
        let income = portfolio.annual_dividend_income();

        let utilization_ratio = clamp01(safe_div(margin.used, margin.available, 0.0));
        let velocity_score = safe_div(income, margin.used / 1_000.0, 0.0);
        let effective_rate =
            (1.0 + margin.rate / MARGIN_DAY_COUNT_BASIS).powf(MARGIN_DAY_COUNT_BASIS) - 1.0;
        let interest_cost =
            margin.used * margin.rate * margin.days_outstanding as f64 / MARGIN_DAY_COUNT_BASIS;

        MarginUsage {
            margin_used: margin.used,
            margin_available: margin.available,
            utilization_ratio,
            velocity_score,
            effective_rate,
            interest_cost,
            annual_interest_cost: margin.used * margin.rate,
            loan_to_value: safe_div(margin.used, total_value, 0.0),
            equity: total_value - margin.used,
        }
    }

    /// Liquidation level and first-passage estimates.
    ///
    /// With value `V`, loan `L`, maintenance `m`, the liquidation level is
    /// `B = L / (1 - m)`. Using the log-distance `b = ln(V / B)`, regime
    /// volatility `σ` and drift `ν = μ - σ²/2`:
    ///
    /// - time to liquidation `T = (b / σ)²` years (a one-sigma diffusion move
    ///   covers the distance), replaced by `b / |ν|` when the drift is negative
    ///   and reaches the barrier sooner; reported in trading days.
    /// - one-year hit probability from the reflection principle for drifted
    ///   Brownian motion: `Φ((-b - ν)/σ) + e^(-2νb/σ²) Φ((-b + ν)/σ)`.
    pub fn risk_assessment(
        &self,
        portfolio: &Portfolio,
        user: &User,
        usage: &MarginUsage,
        expected_return: f64,
        volatility: f64,
    ) -> MarginRiskAssessment {
        let total_value = portfolio.total_value();
        let loan = user.margin.used;
        let m = self.config.maintenance_margin;

        let equity_ratio = checked_ratio(total_value - loan, total_value);
        let in_margin_call =
            loan > 0.0 && equity_ratio.map_or(true, |r| r < self.config.call_threshold());
        let dividend_coverage_ratio =
            checked_ratio(portfolio.annual_dividend_income(), usage.annual_interest_cost);
        let volatility_score = clamp01(volatility / self.config.volatility_ceiling);

        let base = MarginRiskAssessment {
            liquidation_price: None,
            distance_to_liquidation: None,
            time_to_liquidation: None,
            liquidation_probability_1y: 0.0,
            dividend_coverage_ratio,
            volatility_score,
            effective_volatility: volatility,
            equity_ratio,
            in_margin_call,
        };

        if loan <= 0.0 {
            return base;
        }

        let barrier = loan / (1.0 - m);
        if total_value <= barrier {
            return MarginRiskAssessment {
                liquidation_price: Some(barrier),
                distance_to_liquidation: Some(0.0),
                time_to_liquidation: Some(0.0),
                liquidation_probability_1y: 1.0,
                ..base
            };
        }

        let b = (total_value / barrier).ln();
        let drift = expected_return - volatility * volatility / 2.0;

        let years = if volatility > 0.0 {
            let diffusion = (b / volatility).powi(2);
            if drift < 0.0 {
                Some(diffusion.min(b / -drift))
            } else {
                Some(diffusion)
            }
        } else if drift < 0.0 {
            Some(b / -drift)
        } else {
            None
        };

        let probability = if volatility > 0.0 {
            let s = volatility;
            let p = norm_cdf((-b - drift) / s)
                + (-2.0 * drift * b / (s * s)).exp() * norm_cdf((-b + drift) / s);
            if p.is_finite() {
                clamp01(p)
            } else if drift < 0.0 {
                1.0
            } else {
                0.0
            }
        } else if drift < 0.0 && b / -drift <= 1.0 {
            1.0
        } else {
            0.0
        };

        MarginRiskAssessment {
            liquidation_price: Some(barrier),
            distance_to_liquidation: Some(clamp01(1.0 - barrier / total_value)),
            time_to_liquidation: years.map(|y| y * TRADING_DAYS_PER_YEAR as f64),
            liquidation_probability_1y: probability,
            ..base
        }
    }

    /// Applies each configured market drop to the whole portfolio.
    pub fn stress_tests(&self, portfolio: &Portfolio, user: &User) -> Vec<StressTestResult> {
        let total_value = portfolio.total_value();
        let loan = user.margin.used;
        let m = self.config.maintenance_margin;
        let call = self.config.call_threshold();

        self.config
            .scenarios
            .iter()
            .map(|scenario| {
                let post_shock_value = total_value * (1.0 - scenario.market_drop);
                let post_shock_equity = post_shock_value - loan;
                let equity_ratio = safe_div(post_shock_equity, post_shock_value, 0.0);
                let margin_call_trigger = loan > 0.0 && equity_ratio < call;
                let liquidation_trigger = loan > 0.0 && equity_ratio < m;
                let shortfall = if margin_call_trigger {
                    (call * post_shock_value - post_shock_equity).max(0.0)
                } else {
                    0.0
                };

                let action_required = if loan <= 0.0 {
                    "No margin exposure; no action required".to_string()
                } else if liquidation_trigger {
                    format!(
                        "Forced liquidation risk: deposit ${:.0} or sell holdings to repay the loan immediately",
                        shortfall
                    )
                } else if margin_call_trigger {
                    format!(
                        "Margin call: deposit ${:.0} or pay down the loan within the broker's call window",
                        shortfall
                    )
                } else if equity_ratio < call + 0.10 {
                    "Monitor closely: equity would sit within 10 points of the call threshold"
                        .to_string()
                } else {
                    "No action required".to_string()
                };

                StressTestResult {
                    scenario: scenario.name.clone(),
                    market_drop: scenario.market_drop,
                    post_shock_value,
                    post_shock_equity,
                    equity_ratio,
                    margin_call_trigger,
                    liquidation_trigger,
                    shortfall,
                    action_required,
                }
            })
            .collect()
    }

    /// Investment-interest deduction relative to the user's tax profile.
    ///
    /// Interest is deductible up to net investment income (ordinary and
    /// Section 199A distributions in taxable accounts). Qualified dividends
    /// can be elected into investment income; doing so trades the preferential
    /// rate for the deduction, a net gain of `elected × qualified_rate`.
    pub fn tax_optimization(
        &self,
        portfolio: &Portfolio,
        user: &User,
        usage: &MarginUsage,
    ) -> MarginTaxOptimization {
        let tax = &user.tax_profile;
        let interest = usage.annual_interest_cost;

        let taxable = portfolio
            .holdings
            .iter()
            .filter(|h| !h.account_type.is_tax_advantaged());
        let (mut investment_income, mut qualified_income) = (0.0, 0.0);
        for holding in taxable {
            match holding.income_classification {
                IncomeClassification::Ordinary | IncomeClassification::Section199A => {
                    investment_income += holding.annual_income()
                }
                IncomeClassification::Qualified => qualified_income += holding.annual_income(),
                IncomeClassification::ReturnOfCapital => {}
            }
        }

        let mut opportunities = Vec::new();

        if interest <= 0.0 {
            return MarginTaxOptimization {
                annual_interest_expense: 0.0,
                deductible_interest: 0.0,
                estimated_tax_savings: 0.0,
                after_tax_margin_rate: user.margin.rate,
                qualified_election_benefit: 0.0,
                carryforward_interest: 0.0,
                opportunities,
            };
        }

        if !tax.itemizes_deductions {
            opportunities.push(format!(
                "${:.0} of margin interest is not deductible without itemizing; compare itemized vs. standard deduction",
                interest
            ));
            return MarginTaxOptimization {
                annual_interest_expense: interest,
                deductible_interest: 0.0,
                estimated_tax_savings: 0.0,
                after_tax_margin_rate: user.margin.rate,
                qualified_election_benefit: 0.0,
                carryforward_interest: 0.0,
                opportunities,
            };
        }

        let deductible = interest.min(investment_income);
        let savings = deductible * tax.ordinary_rate();
        let electable = (interest - deductible).min(qualified_income).max(0.0);
        let election_benefit = electable * tax.qualified_rate();
        let carryforward = (interest - deductible - electable).max(0.0);

        if deductible > 0.0 {
            opportunities.push(format!(
                "Deduct ${:.0} of investment interest on Form 4952 (saves ~${:.0})",
                deductible, savings
            ));
        }
        if election_benefit > 0.0 {
            opportunities.push(format!(
                "Electing ${:.0} of qualified dividends as investment income frees ~${:.0} of additional deduction value",
                electable, election_benefit
            ));
        }
        if carryforward > 0.0 {
            opportunities.push(format!(
                "${:.0} of interest exceeds investment income and carries forward to future years",
                carryforward
            ));
        }

        let deductible_share = safe_div(deductible, interest, 0.0);
        MarginTaxOptimization {
            annual_interest_expense: interest,
            deductible_interest: deductible,
            estimated_tax_savings: savings,
            after_tax_margin_rate: user.margin.rate * (1.0 - tax.ordinary_rate() * deductible_share),
            qualified_election_benefit: election_benefit,
            carryforward_interest: carryforward,
            opportunities,
        }
    }

    fn recommendations(
        &self,
        portfolio: &Portfolio,
        user: &User,
        market: &MarketConditions,
        usage: &MarginUsage,
        risk: &MarginRiskAssessment,
        tax: &MarginTaxOptimization,
    ) -> Vec<MarginRecommendation> {
        let margin = &user.margin;
        let after_tax_rate = tax.after_tax_margin_rate;
        let spread = portfolio.portfolio_yield() - after_tax_rate;
        let mut out = Vec::new();

        let coverage_short = risk.dividend_coverage_ratio.map_or(false, |c| c < 1.0);
        let over_utilized = usage.utilization_ratio > self.config.high_utilization;
        let needs_decrease = margin.used > 0.0
            && (over_utilized
                || coverage_short
                || risk.in_margin_call
                || risk.liquidation_probability_1y > 0.20);

        if needs_decrease {
            let to_target = margin.used - self.config.target_utilization * margin.available;
            let to_coverage = if coverage_short && margin.rate > 0.0 {
                margin.used - portfolio.annual_dividend_income() / margin.rate
            } else {
                0.0
            };
            let amount = to_target.max(to_coverage).max(margin.used * 0.10).min(margin.used);
            let severity = [
                over_utilized,
                coverage_short,
                risk.in_margin_call,
                risk.liquidation_probability_1y > 0.20,
            ]
            .iter()
            .filter(|b| **b)
            .count() as f64;
            out.push(MarginRecommendation {
                description: format!(
                    "Pay down ${:.0} of margin to cut interest and move utilization toward {:.0}%",
                    amount,
                    self.config.target_utilization * 100.0
                ),
                kind: MarginAction::Decrease,
                focus: MarginFocus::Utilization,
                expected_return: after_tax_rate,
                risk_score: 0.1,
                confidence: clamp01(0.6 + 0.1 * severity),
                amount: Some(amount),
            });
        }

        let calm_market = market.volatility_index < 25.0;
        let coverage_ok = risk.dividend_coverage_ratio.map_or(true, |c| c >= 2.0);
        let headroom = self.config.target_utilization * margin.available - margin.used;
        if !needs_decrease
            && !portfolio.is_empty()
            && headroom > 0.0
            && spread > 0.01
            && calm_market
            && coverage_ok
            && risk.liquidation_probability_1y < 0.05
        {
            out.push(MarginRecommendation {
                description: format!(
                    "Deploy up to ${:.0} of additional margin into holdings yielding above the {:.2}% after-tax borrowing cost",
                    headroom,
                    after_tax_rate * 100.0
                ),
                kind: MarginAction::Increase,
                focus: MarginFocus::Utilization,
                expected_return: spread,
                risk_score: clamp01(0.3 + risk.volatility_score * 0.5),
                confidence: clamp01(0.45 + spread * 5.0),
                amount: Some(headroom),
            });
        }

        if margin.used > 0.0 && spread < 0.0 && !portfolio.is_empty() {
            out.push(MarginRecommendation {
                description: format!(
                    "Rotate margin-funded positions toward holdings yielding above {:.2}% so income covers borrowing cost",
                    after_tax_rate * 100.0
                ),
                kind: MarginAction::Optimize,
                focus: MarginFocus::IncomeRotation,
                expected_return: -spread,
                risk_score: 0.3,
                confidence: 0.55,
                amount: None,
            });
        }

        let benchmark_rate = market.rates.short_term + 0.015;
        if margin.used > 0.0 && margin.rate > benchmark_rate + 0.015 {
            out.push(MarginRecommendation {
                description: format!(
                    "Negotiate the {:.2}% margin rate down toward {:.2}% or move the balance to a cheaper credit line",
                    margin.rate * 100.0,
                    benchmark_rate * 100.0
                ),
                kind: MarginAction::Optimize,
                focus: MarginFocus::RateReduction,
                expected_return: margin.rate - benchmark_rate,
                risk_score: 0.05,
                confidence: 0.5,
                amount: Some(margin.used),
            });
        }

        let has_directional = out
            .iter()
            .any(|r| matches!(r.kind, MarginAction::Increase | MarginAction::Decrease));
        if !has_directional {
            let description = if margin.used > 0.0 {
                "Maintain the current margin position; usage and coverage are within targets"
            } else {
                "No margin in use; keep the line available as a liquidity backstop"
            };
            out.push(MarginRecommendation {
                description: description.to_string(),
                kind: MarginAction::Hold,
                focus: MarginFocus::Utilization,
                expected_return: spread.max(0.0) * usage.utilization_ratio,
                risk_score: clamp01(risk.volatility_score * usage.utilization_ratio),
                confidence: 0.7,
                amount: None,
            });
        }

        rank_margin_recommendations(&mut out);
        out
    }
}
