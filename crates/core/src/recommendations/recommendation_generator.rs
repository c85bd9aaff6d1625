//! Merges margin, risk and analytics output into one ranked set of actions.

use chrono::{Datelike, NaiveDate};
use log::debug;
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

use super::candidate::{
    nudge_text, IncomeCandidate, Rankable, RebalanceCandidate, RecommendationCandidate,
    TaxAction, TaxCandidate,
};
use super::{
    AlertKind, BehavioralNudge, EmergencyAlert, IntelligentRecommendationResult, Opportunity,
    OpportunityKind, PersonalizedRecommendation, RecommendationConfig,
};
use crate::analytics::{AdvancedAnalyticsResult, Severity};
use crate::feedback::UserFeedback;
use crate::margin::{MarginAction, MarginIntelligenceResult};
use crate::market::HistoricalData;
use crate::portfolio::Portfolio;
use crate::risk::{Priority, RiskAssessmentResult};
use crate::users::{RiskTolerance, User};
use crate::utils::stats::clamp01;

#[derive(Debug, Clone, Default)]
pub struct RecommendationGenerator {
    config: RecommendationConfig,
}

impl RecommendationGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: RecommendationConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RecommendationConfig {
        &self.config
    }

    /// Pure aggregation over upstream results; does no market computation of its own.
    #[allow(clippy::too_many_arguments)]
    pub fn generate(
        &self,
        portfolio: &Portfolio,
        user: &User,
        margin: &MarginIntelligenceResult,
        risk: &RiskAssessmentResult,
        analytics: &AdvancedAnalyticsResult,
        history: &HistoricalData,
        feedback: &UserFeedback,
    ) -> IntelligentRecommendationResult {
        let follow_through = feedback.follow_through_rate();
        let confidence_adjustment = analytics.data_quality.confidence_factor()
            * follow_through.map_or(1.0, |rate| 0.8 + 0.4 * rate);

        let candidates = self.candidates(portfolio, user, margin, risk, analytics, history);
        let personalized_recommendations = self.personalize(
            &candidates,
            portfolio,
            user,
            follow_through,
            confidence_adjustment,
        );
        let behavioral_nudges = nudges(analytics);
        let emergency_alerts = self.alerts(margin, risk);
        let reference_date = reference_date(history, feedback);
        let opportunity_detection = self.opportunities(
            portfolio,
            user,
            margin,
            analytics,
            reference_date,
            confidence_adjustment,
        );

        debug!(
            "Recommendations: {} candidates -> {} personalized, {} nudges, {} alerts, {} opportunities",
            candidates.len(),
            personalized_recommendations.len(),
            behavioral_nudges.len(),
            emergency_alerts.len(),
            opportunity_detection.len()
        );

        IntelligentRecommendationResult {
            personalized_recommendations,
            behavioral_nudges,
            emergency_alerts,
            opportunity_detection,
            confidence_adjustment,
        }
    }

    /// Every upstream suggestion, in margin, risk, tax, behavioral, rebalance, income order.
    pub fn candidates(
        &self,
        portfolio: &Portfolio,
        user: &User,
        margin: &MarginIntelligenceResult,
        risk: &RiskAssessmentResult,
        analytics: &AdvancedAnalyticsResult,
        history: &HistoricalData,
    ) -> Vec<RecommendationCandidate> {
        let mut out = Vec::new();

        for rec in &margin.recommendations {
            match rec.kind {
                MarginAction::Hold => continue,
                MarginAction::Increase if user.risk_tolerance == RiskTolerance::Conservative => {
                    continue
                }
                _ => out.push(RecommendationCandidate::Margin(rec.clone())),
            }
        }
        out.extend(
            risk.recommendations
                .iter()
                .cloned()
                .map(RecommendationCandidate::Risk),
        );

        let tax = &analytics.tax_optimization;
        if tax.asset_location.estimated_benefit > 0.0 {
            // First occurrence wins so the largest saving stays first.
            let mut seen = HashSet::new();
            let tickers: Vec<String> = tax
                .asset_location
                .moves
                .iter()
                .filter(|m| m.annual_tax_saving > 0.0 && seen.insert(m.ticker.as_str()))
                .map(|m| m.ticker.clone())
                .collect();
            out.push(RecommendationCandidate::Tax(TaxCandidate {
                action: TaxAction::AssetLocation,
                annual_savings: tax.asset_location.estimated_benefit,
                details: tickers,
            }));
        }
        if tax.harvesting_savings > 0.0 {
            out.push(RecommendationCandidate::Tax(TaxCandidate {
                action: TaxAction::LossHarvesting,
                annual_savings: tax.harvesting_savings,
                details: tax
                    .harvest_candidates
                    .iter()
                    .map(|c| c.ticker.clone())
                    .collect(),
            }));
        }
        let margin_tax = &margin.tax_optimization;
        let margin_tax_savings =
            margin_tax.estimated_tax_savings + margin_tax.qualified_election_benefit;
        if margin.has_margin && margin_tax_savings > 0.0 {
            out.push(RecommendationCandidate::Tax(TaxCandidate {
                action: TaxAction::MarginInterest,
                annual_savings: margin_tax_savings,
                details: margin_tax.opportunities.clone(),
            }));
        }

        out.extend(
            analytics
                .behavioral_insights
                .bias_detection
                .iter()
                .cloned()
                .map(RecommendationCandidate::Behavioral),
        );

        if let Some(rebalance) = self.rebalance_candidate(analytics) {
            out.push(RecommendationCandidate::Rebalance(rebalance));
        }

        out.extend(
            self.dividend_cuts(portfolio, history)
                .into_iter()
                .map(RecommendationCandidate::Income),
        );
        out
    }

    fn rebalance_candidate(&self, analytics: &AdvancedAnalyticsResult) -> Option<RebalanceCandidate> {
        let opt = &analytics.optimization;
        let sharpe_gain = opt.sharpe_ratio - opt.current_sharpe;
        if sharpe_gain <= 1e-9 {
            return None;
        }
        let mut drifts: Vec<_> = opt
            .target_allocation
            .iter()
            .filter(|t| t.drift().abs() > self.config.rebalance_drift_threshold)
            .cloned()
            .collect();
        if drifts.is_empty() {
            return None;
        }
        drifts.sort_by(|a, b| {
            b.drift()
                .abs()
                .partial_cmp(&a.drift().abs())
                .unwrap_or(Ordering::Equal)
        });
        Some(RebalanceCandidate {
            drifts,
            return_gain: opt.expected_return - opt.current_expected_return,
            sharpe_gain,
        })
    }

    /// Holdings whose latest per-share payment fell by at least the cut threshold.
    fn dividend_cuts(&self, portfolio: &Portfolio, history: &HistoricalData) -> Vec<IncomeCandidate> {
        portfolio
            .holdings
            .iter()
            .filter_map(|holding| {
                let series = history.dividend_series(&holding.ticker);
                let [.., (_, previous), (_, latest)] = series.as_slice() else {
                    return None;
                };
                if *previous <= 0.0 || *latest < 0.0 {
                    return None;
                }
                let cut = 1.0 - latest / previous;
                (cut >= self.config.dividend_cut_threshold).then(|| IncomeCandidate {
                    ticker: holding.ticker.clone(),
                    previous_payment: *previous,
                    latest_payment: *latest,
                    income_at_risk: holding.annual_income() * cut,
                })
            })
            .collect()
    }

    fn personalize(
        &self,
        candidates: &[RecommendationCandidate],
        portfolio: &Portfolio,
        user: &User,
        follow_through: Option<f64>,
        confidence_adjustment: f64,
    ) -> Vec<PersonalizedRecommendation> {
        let total_value = portfolio.total_value();
        let profile_note = profile_note(user, total_value, follow_through);

        // Group by key in first-seen order; the highest-priority member leads.
        let mut order: Vec<String> = Vec::new();
        let mut groups: HashMap<String, Vec<&RecommendationCandidate>> = HashMap::new();
        for candidate in candidates {
            let key = candidate.dedup_key();
            groups
                .entry(key.clone())
                .or_insert_with(|| {
                    order.push(key);
                    Vec::new()
                })
                .push(candidate);
        }

        let mut out: Vec<PersonalizedRecommendation> = order
            .iter()
            .filter_map(|key| {
                let members = groups.get(key)?;
                let lead = members.iter().copied().reduce(|best, c| {
                    if c.priority() > best.priority() {
                        c
                    } else {
                        best
                    }
                })?;
                let priority = members.iter().map(|c| c.priority()).max()?;
                let confidence = members.iter().map(|c| c.confidence()).fold(0.0, f64::max);
                let expected_impact = members
                    .iter()
                    .map(|c| c.impact(total_value))
                    .reduce(|a, b| a.combine(&b))?;
                let reasons: Vec<String> = members.iter().map(|c| c.reasoning()).collect();

                Some(PersonalizedRecommendation {
                    id: key.replace(':', "-"),
                    category: lead.category(),
                    title: lead.title(),
                    description: lead.description(),
                    priority,
                    ai_confidence: clamp01(confidence * confidence_adjustment),
                    expected_impact,
                    personalized_reasoning: format!("{} {}", reasons.join(" "), profile_note),
                    implementation: lead.implementation(),
                })
            })
            .collect();

        out.sort_by(|a, b| {
            b.priority
                .cmp(&a.priority)
                .then_with(|| {
                    b.ai_confidence
                        .partial_cmp(&a.ai_confidence)
                        .unwrap_or(Ordering::Equal)
                })
                .then_with(|| a.id.cmp(&b.id))
        });
        out.truncate(self.config.max_recommendations);
        out
    }

    fn alerts(&self, margin: &MarginIntelligenceResult, risk: &RiskAssessmentResult) -> Vec<EmergencyAlert> {
        let mut out = Vec::new();
        let assessment = &margin.risk_assessment;

        if assessment.in_margin_call {
            out.push(EmergencyAlert {
                kind: AlertKind::ActiveMarginCall,
                severity: Priority::Critical,
                title: "Margin call in effect".to_string(),
                message: format!(
                    "Equity is at {:.0}% of market value, below the maintenance requirement",
                    assessment.equity_ratio.unwrap_or(0.0) * 100.0
                ),
                timeframe: Priority::Critical.timeframe().to_string(),
                immediate_actions: vec![
                    "Deposit cash or marginable securities to restore equity".to_string(),
                    "Sell the most volatile margin-funded positions".to_string(),
                    "Stop new margin borrowing until the call is cleared".to_string(),
                ],
            });
        } else if let Some(days) = assessment
            .time_to_liquidation
            .filter(|d| *d < self.config.liquidation_alert_days)
        {
            if let Some(scenario) = margin.margin_call_scenarios().next() {
                let severity = if days < self.config.liquidation_alert_days / 3.0 {
                    Priority::Critical
                } else {
                    Priority::High
                };
                let mut immediate_actions = Vec::new();
                if scenario.shortfall > 0.0 {
                    immediate_actions.push(format!(
                        "Set aside ${:.0} of cash to cover a call under '{}'",
                        scenario.shortfall, scenario.scenario
                    ));
                }
                immediate_actions.push("Pay down part of the margin balance".to_string());
                if let Some(price) = assessment.liquidation_price {
                    immediate_actions
                        .push(format!("Set a portfolio value alert at ${:.0}", price));
                }
                out.push(EmergencyAlert {
                    kind: AlertKind::MarginCallRisk,
                    severity,
                    title: "Margin call risk".to_string(),
                    message: format!(
                        "A '{}' scenario triggers a margin call and liquidation is about {:.0} trading days away",
                        scenario.scenario, days
                    ),
                    timeframe: severity.timeframe().to_string(),
                    immediate_actions,
                });
            }
        }

        if risk.overall_risk_score > self.config.critical_risk_score {
            let mut immediate_actions: Vec<String> = risk
                .recommendations
                .iter()
                .filter(|r| r.priority >= Priority::High)
                .take(3)
                .map(|r| r.title.clone())
                .collect();
            if immediate_actions.is_empty() {
                immediate_actions.push("Review the largest risk contributors".to_string());
            }
            out.push(EmergencyAlert {
                kind: AlertKind::CriticalRiskScore,
                severity: Priority::High,
                title: "Portfolio risk is critical".to_string(),
                message: format!(
                    "Overall risk score {:.0} exceeds the critical level of {:.0}",
                    risk.overall_risk_score, self.config.critical_risk_score
                ),
                timeframe: Priority::High.timeframe().to_string(),
                immediate_actions,
            });
        }

        out.sort_by(|a, b| b.severity.cmp(&a.severity));
        out
    }

    fn opportunities(
        &self,
        portfolio: &Portfolio,
        user: &User,
        margin: &MarginIntelligenceResult,
        analytics: &AdvancedAnalyticsResult,
        reference_date: Option<NaiveDate>,
        confidence_adjustment: f64,
    ) -> Vec<Opportunity> {
        let mut out = Vec::new();
        let tax_window = reference_date
            .map(days_to_year_end)
            .unwrap_or(self.config.default_harvest_window_days);
        let tax = &analytics.tax_optimization;

        if tax.harvesting_savings > 0.0 {
            out.push(Opportunity {
                kind: OpportunityKind::TaxLossHarvesting,
                title: "Tax-loss harvesting window".to_string(),
                description: format!(
                    "${:.0} of harvestable losses across {} holdings",
                    tax.harvestable_losses,
                    tax.harvest_candidates.len()
                ),
                potential_benefit: tax.harvesting_savings,
                time_window: tax_window,
                confidence: clamp01(0.8 * confidence_adjustment),
            });
        }

        if tax.asset_location.estimated_benefit > 0.0 {
            out.push(Opportunity {
                kind: OpportunityKind::AssetLocation,
                title: "Asset location improvement".to_string(),
                description: format!(
                    "{} moves cut annual dividend tax from ${:.0} to ${:.0}",
                    tax.asset_location.moves.len(),
                    tax.asset_location.current_tax_drag,
                    tax.asset_location.optimal_tax_drag
                ),
                potential_benefit: tax.asset_location.estimated_benefit,
                time_window: tax_window,
                confidence: clamp01(0.75 * confidence_adjustment),
            });
        }

        if let Some(rebalance) = self.rebalance_candidate(analytics) {
            out.push(Opportunity {
                kind: OpportunityKind::Rebalancing,
                title: "Rebalancing trigger".to_string(),
                description: format!(
                    "{} positions drifted more than {:.0}% from target (largest {:.1}%)",
                    rebalance.drifts.len(),
                    self.config.rebalance_drift_threshold * 100.0,
                    rebalance.max_drift() * 100.0
                ),
                potential_benefit: rebalance.return_gain.max(0.0) * portfolio.total_value(),
                time_window: 30,
                confidence: clamp01(0.65 * confidence_adjustment),
            });
        }

        if user.risk_tolerance != RiskTolerance::Conservative {
            if let Some(rec) = margin
                .recommendations
                .iter()
                .find(|r| r.kind == MarginAction::Increase)
            {
                out.push(Opportunity {
                    kind: OpportunityKind::MarginDeployment,
                    title: "Positive carry on margin".to_string(),
                    description: rec.description.clone(),
                    potential_benefit: rec.amount.unwrap_or(0.0) * rec.expected_return,
                    time_window: 30,
                    confidence: clamp01(rec.confidence * confidence_adjustment),
                });
            }
        }

        out.sort_by(|a, b| {
            b.potential_benefit
                .partial_cmp(&a.potential_benefit)
                .unwrap_or(Ordering::Equal)
        });
        out
    }
}

fn nudges(analytics: &AdvancedAnalyticsResult) -> Vec<BehavioralNudge> {
    analytics
        .behavioral_insights
        .bias_detection
        .iter()
        .map(|bias| {
            let (message, action) = nudge_text(bias.bias_type);
            BehavioralNudge {
                bias_type: bias.bias_type,
                message: message.to_string(),
                suggested_action: action.to_string(),
                priority: match bias.severity {
                    Severity::High => Priority::High,
                    Severity::Medium => Priority::Medium,
                    Severity::Low => Priority::Low,
                },
            }
        })
        .collect()
}

fn profile_note(user: &User, total_value: f64, follow_through: Option<f64>) -> String {
    let tolerance = match user.risk_tolerance {
        RiskTolerance::Conservative => "conservative",
        RiskTolerance::Moderate => "moderate",
        RiskTolerance::Aggressive => "aggressive",
    };
    let mut note = format!(
        "Sized for a {} investor with ${:.0} invested.",
        tolerance, total_value
    );
    if let Some(rate) = follow_through {
        note.push_str(&format!(
            " You have acted on {:.0}% of past recommendations.",
            rate * 100.0
        ));
    }
    note
}

/// Newest dated record in the inputs, standing in for "today".
fn reference_date(history: &HistoricalData, feedback: &UserFeedback) -> Option<NaiveDate> {
    let prices = history.price_history.iter().map(|p| p.date);
    let dividends = history.dividend_history.iter().map(|d| d.date);
    let events = history.market_events.iter().map(|e| e.date);
    prices
        .chain(dividends)
        .chain(events)
        .chain(feedback.latest_date())
        .max()
}

fn days_to_year_end(date: NaiveDate) -> u32 {
    NaiveDate::from_ymd_opt(date.year(), 12, 31)
        .map(|end| (end - date).num_days().max(1) as u32)
        .unwrap_or(1)
}
