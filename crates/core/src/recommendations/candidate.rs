//! Upstream suggestions before they are merged into personalized recommendations.

use crate::analytics::{AllocationTarget, BiasType, DetectedBias, Severity};
use crate::margin::{MarginAction, MarginFocus, MarginRecommendation};
use crate::risk::{Priority, RiskFactor, RiskRecommendation};

use super::{ExpectedImpact, ImplementationPhase, RecommendationCategory};

/// Shared ranking interface used by the merge step.
pub trait Rankable {
    /// Candidates with the same key describe the same action and are merged.
    fn dedup_key(&self) -> String;
    fn priority(&self) -> Priority;
    /// Base confidence in [0, 1], before data-quality adjustment.
    fn confidence(&self) -> f64;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaxAction {
    AssetLocation,
    LossHarvesting,
    MarginInterest,
}

impl TaxAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaxAction::AssetLocation => "asset-location",
            TaxAction::LossHarvesting => "loss-harvesting",
            TaxAction::MarginInterest => "margin-interest",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TaxCandidate {
    pub action: TaxAction,
    pub annual_savings: f64,
    /// Tickers or opportunities the action touches
    pub details: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RebalanceCandidate {
    /// Targets whose drift exceeds the rebalancing threshold, largest first
    pub drifts: Vec<AllocationTarget>,
    pub return_gain: f64,
    pub sharpe_gain: f64,
}

impl RebalanceCandidate {
    pub fn max_drift(&self) -> f64 {
        self.drifts
            .iter()
            .map(|t| t.drift().abs())
            .fold(0.0, f64::max)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct IncomeCandidate {
    pub ticker: String,
    pub previous_payment: f64,
    pub latest_payment: f64,
    /// Annual income lost if the cut persists
    pub income_at_risk: f64,
}

impl IncomeCandidate {
    pub fn cut(&self) -> f64 {
        if self.previous_payment > 0.0 {
            1.0 - self.latest_payment / self.previous_payment
        } else {
            0.0
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RecommendationCandidate {
    Margin(MarginRecommendation),
    Risk(RiskRecommendation),
    Tax(TaxCandidate),
    Behavioral(DetectedBias),
    Rebalance(RebalanceCandidate),
    Income(IncomeCandidate),
}

impl Rankable for RecommendationCandidate {
    fn dedup_key(&self) -> String {
        match self {
            RecommendationCandidate::Margin(rec) => match rec.kind {
                MarginAction::Decrease => "margin:decrease".to_string(),
                MarginAction::Increase => "margin:increase".to_string(),
                kind => format!("margin:{}:{}", kind.as_str(), rec.focus.as_str()),
            },
            RecommendationCandidate::Risk(rec) => match rec.factor {
                RiskFactor::Leverage => "margin:decrease".to_string(),
                RiskFactor::Concentration => "rebalance:positions".to_string(),
                factor => format!("risk:{}", factor.as_str()),
            },
            RecommendationCandidate::Tax(tax) => format!("tax:{}", tax.action.as_str()),
            RecommendationCandidate::Behavioral(bias) => {
                format!("behavioral:{}", bias.bias_type.label().replace(' ', "-"))
            }
            RecommendationCandidate::Rebalance(_) => "rebalance:positions".to_string(),
            RecommendationCandidate::Income(income) => {
                format!("income:{}", income.ticker.to_ascii_lowercase())
            }
        }
    }

    fn priority(&self) -> Priority {
        match self {
            RecommendationCandidate::Margin(rec) => match rec.kind {
                MarginAction::Decrease if rec.confidence >= 0.8 => Priority::Critical,
                MarginAction::Decrease => Priority::High,
                MarginAction::Optimize => Priority::Medium,
                MarginAction::Increase | MarginAction::Hold => Priority::Low,
            },
            RecommendationCandidate::Risk(rec) => rec.priority,
            RecommendationCandidate::Tax(tax) => {
                if tax.annual_savings >= 1_000.0 {
                    Priority::Medium
                } else {
                    Priority::Low
                }
            }
            RecommendationCandidate::Behavioral(bias) => match bias.severity {
                Severity::High => Priority::High,
                Severity::Medium => Priority::Medium,
                Severity::Low => Priority::Low,
            },
            RecommendationCandidate::Rebalance(_) => Priority::Medium,
            RecommendationCandidate::Income(income) => {
                if income.cut() >= 0.25 {
                    Priority::High
                } else {
                    Priority::Medium
                }
            }
        }
    }

    fn confidence(&self) -> f64 {
        match self {
            RecommendationCandidate::Margin(rec) => rec.confidence,
            RecommendationCandidate::Risk(rec) => match rec.factor {
                RiskFactor::Concentration | RiskFactor::Sector | RiskFactor::Leverage => 0.85,
                RiskFactor::Volatility | RiskFactor::Liquidity => 0.7,
                RiskFactor::General => 0.6,
            },
            RecommendationCandidate::Tax(tax) => match tax.action {
                TaxAction::AssetLocation => 0.8,
                TaxAction::LossHarvesting => 0.75,
                TaxAction::MarginInterest => 0.7,
            },
            RecommendationCandidate::Behavioral(bias) => match bias.severity {
                Severity::High => 0.75,
                Severity::Medium => 0.6,
                Severity::Low => 0.45,
            },
            RecommendationCandidate::Rebalance(_) => 0.65,
            RecommendationCandidate::Income(_) => 0.8,
        }
    }
}

impl RecommendationCandidate {
    pub fn category(&self) -> RecommendationCategory {
        match self {
            RecommendationCandidate::Margin(_) => RecommendationCategory::Margin,
            RecommendationCandidate::Risk(_) => RecommendationCategory::Risk,
            RecommendationCandidate::Tax(_) => RecommendationCategory::Tax,
            RecommendationCandidate::Behavioral(_) => RecommendationCategory::Behavioral,
            RecommendationCandidate::Rebalance(_) => RecommendationCategory::Rebalance,
            RecommendationCandidate::Income(_) => RecommendationCategory::Income,
        }
    }

    pub fn title(&self) -> String {
        match self {
            RecommendationCandidate::Margin(rec) => match rec.kind {
                MarginAction::Decrease => "Reduce margin balance".to_string(),
                MarginAction::Increase => "Deploy unused margin capacity".to_string(),
                MarginAction::Optimize => match rec.focus {
                    MarginFocus::IncomeRotation => "Rotate margin-funded holdings toward higher yield",
                    MarginFocus::RateReduction => "Lower the margin interest rate",
                    MarginFocus::Utilization => "Lower the cost of margin",
                }
                .to_string(),
                MarginAction::Hold => "Hold the margin position".to_string(),
            },
            RecommendationCandidate::Risk(rec) => rec.title.clone(),
            RecommendationCandidate::Tax(tax) => match tax.action {
                TaxAction::AssetLocation => "Relocate income holdings to sheltered accounts",
                TaxAction::LossHarvesting => "Harvest unrealized losses",
                TaxAction::MarginInterest => "Deduct margin interest",
            }
            .to_string(),
            RecommendationCandidate::Behavioral(bias) => {
                format!("Counter {}", bias.bias_type.label())
            }
            RecommendationCandidate::Rebalance(_) => {
                "Rebalance toward the optimized allocation".to_string()
            }
            RecommendationCandidate::Income(income) => {
                format!("Review {} after its dividend cut", income.ticker)
            }
        }
    }

    pub fn description(&self) -> String {
        match self {
            RecommendationCandidate::Margin(rec) => rec.description.clone(),
            RecommendationCandidate::Risk(rec) => rec.description.clone(),
            RecommendationCandidate::Tax(tax) => match tax.action {
                TaxAction::AssetLocation => format!(
                    "Move {} into tax-advantaged accounts to save about ${:.0} a year in dividend tax",
                    tax.details.join(", "),
                    tax.annual_savings
                ),
                TaxAction::LossHarvesting => format!(
                    "Sell {} at a loss and replace with similar exposure to save about ${:.0}",
                    tax.details.join(", "),
                    tax.annual_savings
                ),
                TaxAction::MarginInterest => format!(
                    "Claim margin interest as an investment expense to save about ${:.0}",
                    tax.annual_savings
                ),
            },
            RecommendationCandidate::Behavioral(bias) => bias.evidence.clone(),
            RecommendationCandidate::Rebalance(rebalance) => {
                let moves: Vec<String> = rebalance
                    .drifts
                    .iter()
                    .take(3)
                    .map(|t| {
                        format!(
                            "{} {:.0}% -> {:.0}%",
                            t.ticker,
                            t.current_weight * 100.0,
                            t.target_weight * 100.0
                        )
                    })
                    .collect();
                format!("Shift weights: {}", moves.join(", "))
            }
            RecommendationCandidate::Income(income) => format!(
                "{} cut its payment {:.0}% (from ${:.4} to ${:.4} a share), putting ${:.0} of annual income at risk",
                income.ticker,
                income.cut() * 100.0,
                income.previous_payment,
                income.latest_payment,
                income.income_at_risk
            ),
        }
    }

    /// Why the action matters, before the user-profile note is appended.
    pub fn reasoning(&self) -> String {
        match self {
            RecommendationCandidate::Margin(rec) => format!(
                "Acting returns about {:.2}% a year for a risk score of {:.2}.",
                rec.expected_return * 100.0,
                rec.risk_score
            ),
            RecommendationCandidate::Risk(rec) => format!(
                "This lowers the overall risk score by about {:.1} points.",
                rec.expected_risk_reduction
            ),
            RecommendationCandidate::Tax(tax) => format!(
                "Your tax profile makes this worth about ${:.0}.",
                tax.annual_savings
            ),
            RecommendationCandidate::Behavioral(bias) => format!(
                "Your recent decisions show {} costing about {:.2}% a year.",
                bias.bias_type.label(),
                bias.impact * 100.0
            ),
            RecommendationCandidate::Rebalance(rebalance) => format!(
                "The optimized allocation improves the Sharpe ratio by {:.2}.",
                rebalance.sharpe_gain
            ),
            RecommendationCandidate::Income(income) => format!(
                "A {:.0}% cut often signals further pressure on the payout.",
                income.cut() * 100.0
            ),
        }
    }

    /// Expected impact for a portfolio of `total_value` dollars.
    pub fn impact(&self, total_value: f64) -> ExpectedImpact {
        match self {
            RecommendationCandidate::Margin(rec) => {
                let amount = rec.amount.unwrap_or(0.0);
                match rec.kind {
                    MarginAction::Increase => ExpectedImpact {
                        income_increase: amount * rec.expected_return,
                        risk_reduction: -10.0 * rec.risk_score,
                        time_to_realize: 30,
                        ..Default::default()
                    },
                    _ => ExpectedImpact {
                        income_increase: amount * rec.expected_return,
                        time_to_realize: 7,
                        ..Default::default()
                    },
                }
            }
            RecommendationCandidate::Risk(rec) => ExpectedImpact {
                risk_reduction: rec.expected_risk_reduction,
                time_to_realize: days_for(rec.priority),
                ..Default::default()
            },
            RecommendationCandidate::Tax(tax) => ExpectedImpact {
                tax_savings: tax.annual_savings,
                time_to_realize: match tax.action {
                    TaxAction::MarginInterest => 365,
                    _ => 30,
                },
                ..Default::default()
            },
            RecommendationCandidate::Behavioral(bias) => ExpectedImpact {
                income_increase: bias.impact * total_value,
                time_to_realize: 90,
                ..Default::default()
            },
            RecommendationCandidate::Rebalance(rebalance) => ExpectedImpact {
                income_increase: rebalance.return_gain.max(0.0) * total_value,
                time_to_realize: 30,
                ..Default::default()
            },
            RecommendationCandidate::Income(income) => ExpectedImpact {
                income_increase: income.income_at_risk,
                time_to_realize: 60,
                ..Default::default()
            },
        }
    }

    pub fn implementation(&self) -> Vec<ImplementationPhase> {
        match self {
            RecommendationCandidate::Margin(rec) => match rec.kind {
                MarginAction::Decrease => phases(&[
                    ("Plan", "Choose the cash or positions that fund the pay-down", 1),
                    ("Execute", "Repay the margin balance", 2),
                    ("Monitor", "Track equity ratio against the call threshold", 30),
                ]),
                MarginAction::Increase => phases(&[
                    ("Select", "Pick holdings whose yield clears the after-tax rate", 3),
                    ("Stage", "Deploy the new margin in two or three tranches", 14),
                    ("Monitor", "Recheck coverage and utilization monthly", 30),
                ]),
                _ => phases(&[
                    ("Review", "Compare margin rates and holding yields", 7),
                    ("Execute", "Move the balance or rotate positions", 7),
                ]),
            },
            RecommendationCandidate::Risk(rec) => phases(&[
                ("Review", "Confirm the exposure and pick the positions to change", 2),
                ("Execute", "Place the trades", days_for(rec.priority).min(14)),
                ("Verify", "Re-run the risk assessment", 7),
            ]),
            RecommendationCandidate::Tax(tax) => match tax.action {
                TaxAction::LossHarvesting => phases(&[
                    ("Identify", "Confirm lots and pick replacement exposure", 2),
                    ("Execute", "Sell the losing lots and buy replacements", 1),
                    ("Wait", "Avoid repurchasing the same security during the wash-sale window", 31),
                ]),
                TaxAction::AssetLocation => phases(&[
                    ("Plan", "Match holdings to available tax-advantaged room", 3),
                    ("Execute", "Sell in the sheltered account and rebuy in taxable, or direct new contributions", 14),
                ]),
                TaxAction::MarginInterest => phases(&[
                    ("Document", "Collect the year's margin interest statements", 14),
                    ("File", "Claim the deduction on Form 4952", 30),
                ]),
            },
            RecommendationCandidate::Behavioral(_) => phases(&[
                ("Reflect", "Review the decisions listed as evidence", 1),
                ("Commit", "Write down the rule you will follow next time", 1),
                ("Practice", "Apply the rule to every trade for a quarter", 90),
            ]),
            RecommendationCandidate::Rebalance(_) => phases(&[
                ("Plan", "Size the trades from the target weights", 2),
                ("Execute", "Trim overweight positions and add to underweight ones", 7),
                ("Review", "Check drift again next quarter", 90),
            ]),
            RecommendationCandidate::Income(_) => phases(&[
                ("Research", "Read the company's statement on the cut", 7),
                ("Decide", "Hold, trim or replace with a steadier payer", 14),
            ]),
        }
    }
}

fn days_for(priority: Priority) -> u32 {
    match priority {
        Priority::Critical => 3,
        Priority::High => 14,
        Priority::Medium => 60,
        Priority::Low => 365,
    }
}

fn phases(steps: &[(&str, &str, u32)]) -> Vec<ImplementationPhase> {
    steps
        .iter()
        .enumerate()
        .map(|(i, (name, description, days))| ImplementationPhase {
            order: i as u32 + 1,
            name: name.to_string(),
            description: description.to_string(),
            duration_days: *days,
        })
        .collect()
}

/// Message and follow-up action for a detected bias.
pub fn nudge_text(bias: BiasType) -> (&'static str, &'static str) {
    match bias {
        BiasType::LossAversion => (
            "Selling after drops has locked in losses that later recovered.",
            "Set a 48-hour cooling-off period before selling into a decline.",
        ),
        BiasType::RecencyBias => (
            "Buying after rallies has meant paying peak prices.",
            "Add to positions on a fixed schedule instead of after big moves.",
        ),
        BiasType::Overconfidence => (
            "Overriding recommendations has cost more than it earned.",
            "Write a one-line thesis before any trade that goes against a recommendation.",
        ),
        BiasType::HerdBehavior => (
            "Your trades cluster around headline market events.",
            "Wait three trading days after a major event before acting.",
        ),
        BiasType::DispositionEffect => (
            "Winners were sold early while losers were held.",
            "Review losing positions against their original thesis each quarter.",
        ),
    }
}
