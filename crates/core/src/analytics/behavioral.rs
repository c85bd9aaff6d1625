//! Rule-based behavioral analysis of past decisions and satisfaction scores.
//!
//! "Now" is the latest date in the feedback, or the market valuation date
//! when that is later, so the analysis never depends on the wall clock.

use chrono::NaiveDate;
use std::collections::HashMap;

use super::{
    BehavioralInsights, BiasType, DecisionQuality, DetectedBias, EmotionalState,
    EmotionalStateKind, Severity,
};
use crate::feedback::{Decision, DecisionAction, PreferenceChange, UserFeedback};
use crate::market::HistoricalData;
use crate::utils::stats::{clamp01, mean, safe_div, trend_slope};

/// A buy and a sell of the same ticker within this many days is a reversal.
const WHIPSAW_DAYS: i64 = 30;
/// Acting on a trigger after this many days scores zero timeliness.
const SLOW_ACTION_DAYS: f64 = 30.0;
/// Window used for recent activity and mood.
const RECENT_DAYS: i64 = 90;
/// Market move before a decision that counts as a trigger.
const MARKET_MOVE_TRIGGER: f64 = 0.05;
/// Decisions within this many days of a large market event count as reactive.
const EVENT_WINDOW_DAYS: i64 = 3;
const EVENT_MOVE_TRIGGER: f64 = 0.03;
/// Risk-preference edits this many days after a major market event count as reactive.
const PREFERENCE_REACTION_DAYS: i64 = 30;
/// Minimum matching decisions before a rule can fire on decisions alone.
const MIN_EVIDENCE: usize = 2;

#[derive(Debug, Clone, Copy, Default)]
pub struct BehavioralAnalyzer;

impl BehavioralAnalyzer {
    pub fn new() -> Self {
        Self
    }

    pub fn analyze(
        &self,
        feedback: &UserFeedback,
        history: &HistoricalData,
        as_of: Option<NaiveDate>,
    ) -> BehavioralInsights {
        if feedback.is_empty() {
            return BehavioralInsights {
                has_estimate: true,
                ..BehavioralInsights::default()
            };
        }

        let decisions: Vec<&Decision> = feedback
            .decisions_by_date()
            .into_iter()
            .filter(|d| d.outcome_return.is_finite() && d.market_change_before.is_finite())
            .collect();
        let now = match (feedback.latest_date(), as_of) {
            (Some(a), Some(b)) => Some(a.max(b)),
            (a, b) => a.or(b),
        };

        BehavioralInsights {
            decision_quality: decision_quality(&decisions, feedback),
            emotional_state: emotional_state(&decisions, feedback, now),
            bias_detection: detect_biases(&decisions, feedback, history),
            has_estimate: decisions.is_empty(),
        }
    }
}

fn decision_quality(decisions: &[&Decision], feedback: &UserFeedback) -> DecisionQuality {
    if decisions.is_empty() {
        return DecisionQuality {
            follow_through_rate: feedback.follow_through_rate(),
            ..DecisionQuality::default()
        };
    }

    let n = decisions.len() as f64;
    let hit_rate = decisions.iter().filter(|d| d.outcome_return > 0.0).count() as f64 / n;
    let consistency = 1.0 - safe_div(reversals(decisions) as f64, n, 0.0);
    let timeliness = mean(
        &decisions
            .iter()
            .map(|d| clamp01(1.0 - d.days_to_act as f64 / SLOW_ACTION_DAYS))
            .collect::<Vec<_>>(),
    );

    DecisionQuality {
        overall_score: 100.0 * (0.4 * hit_rate + 0.3 * consistency + 0.3 * timeliness),
        consistency,
        timeliness,
        hit_rate,
        follow_through_rate: feedback.follow_through_rate(),
        decisions_analyzed: decisions.len(),
    }
}

/// Decisions that undo a buy or sell of the same ticker within the whipsaw window.
fn reversals(decisions: &[&Decision]) -> usize {
    let mut last: HashMap<&str, (DecisionAction, NaiveDate)> = HashMap::new();
    let mut count = 0;
    for d in decisions {
        let Some(ticker) = d.ticker.as_deref() else {
            continue;
        };
        if !matches!(d.action, DecisionAction::Buy | DecisionAction::Sell) {
            continue;
        }
        if let Some((prev_action, prev_date)) = last.get(ticker) {
            if *prev_action != d.action && (d.date - *prev_date).num_days() <= WHIPSAW_DAYS {
                count += 1;
            }
        }
        last.insert(ticker, (d.action, d.date));
    }
    count
}

fn emotional_state(
    decisions: &[&Decision],
    feedback: &UserFeedback,
    now: Option<NaiveDate>,
) -> EmotionalState {
    let recent: Vec<&&Decision> = match now {
        Some(now) => decisions
            .iter()
            .filter(|d| (now - d.date).num_days() <= RECENT_DAYS)
            .collect(),
        None => decisions.iter().collect(),
    };
    let scores = feedback.scores_by_date();

    // Activity: ten or more decisions in the window is maximal.
    let activity = clamp01(recent.len() as f64 / 10.0);
    let slope = trend_slope(&scores);
    let falling_mood = clamp01(-slope / 0.5);
    let latest_mood = if scores.is_empty() {
        None
    } else {
        Some(mean(&scores[scores.len().saturating_sub(3)..]))
    };
    let unhappy = latest_mood.map_or(0.5, |m| clamp01((7.0 - m) / 6.0));
    let stress_level = clamp01(0.4 * activity + 0.3 * falling_mood + 0.3 * unhappy);

    let sells = recent
        .iter()
        .filter(|d| d.action == DecisionAction::Sell)
        .count() as f64;
    let buys = recent
        .iter()
        .filter(|d| d.action == DecisionAction::Buy)
        .count() as f64;
    let sell_share = safe_div(sells, sells + buys, 0.0);
    let buy_share = safe_div(buys, sells + buys, 0.0);
    let mood = latest_mood.unwrap_or(5.5);

    let current_state = if stress_level > 0.7 {
        if sell_share > 0.6 {
            EmotionalStateKind::Fearful
        } else {
            EmotionalStateKind::Anxious
        }
    } else if stress_level > 0.45 {
        EmotionalStateKind::Anxious
    } else if mood >= 8.0 && buy_share > 0.7 && slope > 0.0 {
        EmotionalStateKind::Euphoric
    } else if mood >= 7.0 {
        EmotionalStateKind::Confident
    } else {
        EmotionalStateKind::Calm
    };

    EmotionalState {
        current_state,
        confidence: clamp01((recent.len() + scores.len()) as f64 / 20.0),
        stress_level,
    }
}

fn detect_biases(
    decisions: &[&Decision],
    feedback: &UserFeedback,
    history: &HistoricalData,
) -> Vec<DetectedBias> {
    let mut out = Vec::new();
    let count = |f: &dyn Fn(&Decision) -> bool| decisions.iter().filter(|d| f(d)).count();

    // Loss aversion: selling into declines.
    let sells = count(&|d| d.action == DecisionAction::Sell);
    let panic_sells = count(&|d| {
        d.action == DecisionAction::Sell && d.market_change_before <= -MARKET_MOVE_TRIGGER
    });
    let tagged = feedback.has_pattern(&["loss_aversion", "loss aversion", "panic"]);
    if let Some(strength) = rule_strength(panic_sells, sells, tagged) {
        out.push(bias(
            BiasType::LossAversion,
            strength,
            0.020,
            format!(
                "{} of {} sells followed a market drop of {:.0}% or more",
                panic_sells,
                sells,
                MARKET_MOVE_TRIGGER * 100.0
            ),
        ));
    }

    let big_events: Vec<NaiveDate> = history
        .market_events
        .iter()
        .filter(|e| e.market_change.is_finite() && e.market_change.abs() >= EVENT_MOVE_TRIGGER)
        .map(|e| e.date)
        .collect();

    // Recency: buying after rallies, or re-setting risk preferences right
    // after a big move.
    let buys = count(&|d| d.action == DecisionAction::Buy);
    let chased = count(&|d| {
        d.action == DecisionAction::Buy && d.market_change_before >= MARKET_MOVE_TRIGGER
    });
    let risk_edits: Vec<&PreferenceChange> = feedback
        .preference_changes
        .iter()
        .filter(|p| p.is_risk_setting() && p.from != p.to)
        .collect();
    let reactive_edits = risk_edits
        .iter()
        .filter(|p| {
            big_events.iter().any(|e| {
                let lag = (p.date - *e).num_days();
                (0..=PREFERENCE_REACTION_DAYS).contains(&lag)
            })
        })
        .count();
    let tagged = feedback.has_pattern(&["recency", "fomo", "chasing"]);
    if let Some(strength) =
        rule_strength(chased + reactive_edits, buys + risk_edits.len(), tagged)
    {
        out.push(bias(
            BiasType::RecencyBias,
            strength,
            0.015,
            format!(
                "{} of {} buys came after a market rally of {:.0}% or more; {} of {} risk-setting changes followed a major market event within {} days",
                chased,
                buys,
                MARKET_MOVE_TRIGGER * 100.0,
                reactive_edits,
                risk_edits.len(),
                PREFERENCE_REACTION_DAYS
            ),
        ));
    }

    // Overconfidence: frequent trading that ignores recommendations and loses.
    let trades = buys + sells;
    let ignored_losers = count(&|d| {
        matches!(d.action, DecisionAction::Buy | DecisionAction::Sell)
            && !d.followed_recommendation
            && d.outcome_return < 0.0
    });
    let tagged = feedback.has_pattern(&["overconfiden", "overtrading"]);
    if trades >= 5 || tagged {
        if let Some(strength) = rule_strength(ignored_losers, trades, tagged) {
            out.push(bias(
                BiasType::Overconfidence,
                strength,
                0.025,
                format!(
                    "{} of {} trades overrode a recommendation and lost money",
                    ignored_losers, trades
                ),
            ));
        }
    }

    // Herding: decisions clustered around large market events.
    let reactive = count(&|d| {
        d.action != DecisionAction::Hold
            && big_events
                .iter()
                .any(|e| (d.date - *e).num_days().abs() <= EVENT_WINDOW_DAYS)
    });
    let active = count(&|d| d.action != DecisionAction::Hold);
    let tagged = feedback.has_pattern(&["herd", "crowd", "social"]);
    if let Some(strength) = rule_strength(reactive, active, tagged) {
        out.push(bias(
            BiasType::HerdBehavior,
            strength,
            0.010,
            format!(
                "{} of {} trades landed within {} days of a major market event",
                reactive, active, EVENT_WINDOW_DAYS
            ),
        ));
    }

    // Disposition: selling winners that kept rising, holding losers that kept falling.
    let exits_and_holds = count(&|d| matches!(d.action, DecisionAction::Sell | DecisionAction::Hold));
    let disposition = count(&|d| {
        (d.action == DecisionAction::Sell && d.outcome_return > 0.0)
            || (d.action == DecisionAction::Hold && d.outcome_return < 0.0)
    });
    let tagged = feedback.has_pattern(&["disposition", "holding_losers", "holding losers"]);
    if let Some(strength) = rule_strength(disposition, exits_and_holds, tagged) {
        out.push(bias(
            BiasType::DispositionEffect,
            strength,
            0.015,
            format!(
                "{} of {} sells/holds sold a rising position or held a falling one",
                disposition, exits_and_holds
            ),
        ));
    }

    out.sort_by(|a, b| {
        b.severity.cmp(&a.severity).then_with(|| {
            b.impact
                .partial_cmp(&a.impact)
                .unwrap_or(std::cmp::Ordering::Equal)
        })
    });
    out
}

/// Fires when at least half of the relevant decisions match (with a minimum
/// count), or when the user's own tags name the bias. Tags alone give a
/// low-strength detection.
fn rule_strength(matching: usize, relevant: usize, tagged: bool) -> Option<f64> {
    let ratio = safe_div(matching as f64, relevant as f64, 0.0);
    let from_decisions = (matching >= MIN_EVIDENCE && ratio >= 0.5).then_some(ratio);
    match (from_decisions, tagged) {
        (Some(r), true) => Some(clamp01(r + 0.15)),
        (Some(r), false) => Some(r),
        (None, true) => Some(0.4_f64.max(ratio)),
        (None, false) => None,
    }
}

fn bias(bias_type: BiasType, strength: f64, max_drag: f64, evidence: String) -> DetectedBias {
    DetectedBias {
        bias_type,
        impact: max_drag * strength,
        severity: Severity::from_strength(strength),
        evidence,
    }
}
