//! Unit tests for behavioral bias detection.

use super::*;
use crate::feedback::{Decision, DecisionAction, PreferenceChange, SatisfactionScore, UserFeedback};
use crate::market::{HistoricalData, MarketEvent};
use chrono::NaiveDate;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn decision(
    date: NaiveDate,
    action: DecisionAction,
    ticker: &str,
    outcome: f64,
    market_before: f64,
) -> Decision {
    Decision {
        date,
        action,
        ticker: Some(ticker.to_string()),
        outcome_return: outcome,
        market_change_before: market_before,
        followed_recommendation: false,
        days_to_act: 0,
    }
}

fn analyze(feedback: &UserFeedback) -> BehavioralInsights {
    BehavioralAnalyzer::new().analyze(feedback, &HistoricalData::default(), None)
}

#[test]
fn test_empty_feedback_is_neutral() {
    let insights = analyze(&UserFeedback::default());
    assert!(insights.has_estimate);
    assert!(insights.bias_detection.is_empty());
    assert_eq!(insights.decision_quality.overall_score, 50.0);
    assert_eq!(insights.emotional_state.current_state, EmotionalStateKind::Calm);
    assert_eq!(insights.emotional_state.confidence, 0.0);
}

#[test]
fn test_decision_quality_scores() {
    let mut sell = decision(date(2024, 3, 10), DecisionAction::Sell, "AAPL", -0.02, 0.0);
    sell.days_to_act = 15;
    let mut buy = decision(date(2024, 3, 1), DecisionAction::Buy, "AAPL", 0.05, 0.0);
    buy.followed_recommendation = true;
    let feedback = UserFeedback {
        decisions: vec![sell, buy],
        ..UserFeedback::default()
    };

    let quality = analyze(&feedback).decision_quality;
    assert_eq!(quality.decisions_analyzed, 2);
    assert!((quality.hit_rate - 0.5).abs() < 1e-12);
    // The sell reverses the buy nine days later.
    assert!((quality.consistency - 0.5).abs() < 1e-12);
    assert!((quality.timeliness - 0.75).abs() < 1e-12);
    assert!((quality.overall_score - 57.5).abs() < 1e-9);
    assert_eq!(quality.follow_through_rate, Some(0.5));
}

#[test]
fn test_panic_selling_is_loss_aversion() {
    let feedback = UserFeedback {
        decisions: vec![
            decision(date(2024, 1, 5), DecisionAction::Sell, "SPY", 0.04, -0.08),
            decision(date(2024, 2, 5), DecisionAction::Sell, "QQQ", 0.06, -0.10),
            decision(date(2024, 3, 5), DecisionAction::Sell, "IWM", 0.03, -0.07),
        ],
        ..UserFeedback::default()
    };
    let insights = analyze(&feedback);
    let loss = insights
        .bias_detection
        .iter()
        .find(|b| b.bias_type == BiasType::LossAversion)
        .unwrap();
    assert_eq!(loss.severity, Severity::High);
    assert!((loss.impact - 0.02).abs() < 1e-12);
    assert!(loss.evidence.starts_with("3 of 3 sells"));
}

#[test]
fn test_tag_only_detection_is_low_severity() {
    let feedback = UserFeedback {
        behavioral_patterns: vec!["FOMO buying".to_string()],
        ..UserFeedback::default()
    };
    let insights = analyze(&feedback);
    assert_eq!(insights.bias_detection.len(), 1);
    assert_eq!(insights.bias_detection[0].bias_type, BiasType::RecencyBias);
    assert_eq!(insights.bias_detection[0].severity, Severity::Low);
    assert!(insights.has_estimate);
}

#[test]
fn test_trades_around_market_events_are_herding() {
    let history = HistoricalData {
        market_events: vec![MarketEvent {
            date: date(2024, 8, 5),
            description: "Yen carry unwind".to_string(),
            market_change: -0.06,
        }],
        ..HistoricalData::default()
    };
    let feedback = UserFeedback {
        decisions: vec![
            decision(date(2024, 8, 5), DecisionAction::Buy, "NVDA", 0.10, 0.0),
            decision(date(2024, 8, 6), DecisionAction::Buy, "AMD", 0.08, 0.0),
            decision(date(2024, 11, 1), DecisionAction::Buy, "KO", 0.01, 0.0),
        ],
        ..UserFeedback::default()
    };
    let insights = BehavioralAnalyzer::new().analyze(&feedback, &history, None);
    let herd = insights
        .bias_detection
        .iter()
        .find(|b| b.bias_type == BiasType::HerdBehavior)
        .unwrap();
    assert_eq!(herd.severity, Severity::Medium);
}

fn preference(date: NaiveDate, field: &str, from: &str, to: &str) -> PreferenceChange {
    PreferenceChange {
        date,
        field: field.to_string(),
        from: from.to_string(),
        to: to.to_string(),
    }
}

#[test]
fn test_risk_setting_flips_after_market_event_are_recency() {
    let history = HistoricalData {
        market_events: vec![MarketEvent {
            date: date(2024, 8, 5),
            description: "Yen carry unwind".to_string(),
            market_change: -0.06,
        }],
        ..HistoricalData::default()
    };
    let feedback = UserFeedback {
        preference_changes: vec![
            preference(date(2024, 8, 12), "riskTolerance", "MODERATE", "CONSERVATIVE"),
            preference(date(2024, 9, 1), "riskTolerance", "CONSERVATIVE", "MODERATE"),
            preference(date(2024, 9, 2), "dividendReinvestment", "true", "false"),
        ],
        ..UserFeedback::default()
    };

    let insights = BehavioralAnalyzer::new().analyze(&feedback, &history, None);
    let recency = insights
        .bias_detection
        .iter()
        .find(|b| b.bias_type == BiasType::RecencyBias)
        .unwrap();
    assert_eq!(recency.severity, Severity::High);
    assert!(recency.evidence.contains("2 of 2 risk-setting changes"));

    // The same edits with no market event behind them are not reactive.
    let calm = BehavioralAnalyzer::new().analyze(&feedback, &HistoricalData::default(), None);
    assert!(calm
        .bias_detection
        .iter()
        .all(|b| b.bias_type != BiasType::RecencyBias));
}

#[test]
fn test_stressed_seller_is_fearful() {
    let start = date(2024, 6, 1);
    let decisions = (0..10)
        .map(|i| {
            decision(
                start + chrono::Duration::days(i * 5),
                DecisionAction::Sell,
                &format!("T{}", i),
                -0.01,
                -0.02,
            )
        })
        .collect();
    let satisfaction_scores = [8.0, 6.0, 4.0, 2.0]
        .iter()
        .enumerate()
        .map(|(i, score)| SatisfactionScore {
            date: start + chrono::Duration::days(i as i64 * 10),
            score: *score,
        })
        .collect();
    let feedback = UserFeedback {
        decisions,
        satisfaction_scores,
        ..UserFeedback::default()
    };

    let state = analyze(&feedback).emotional_state;
    assert_eq!(state.current_state, EmotionalStateKind::Fearful);
    assert!(state.stress_level > 0.7);
    assert!(state.confidence > 0.5);
}

#[test]
fn test_analysis_ignores_wall_clock() {
    let feedback = UserFeedback {
        decisions: vec![decision(date(2020, 1, 1), DecisionAction::Buy, "VTI", 0.1, 0.0)],
        ..UserFeedback::default()
    };
    let a = analyze(&feedback);
    let b = BehavioralAnalyzer::new().analyze(
        &feedback,
        &HistoricalData::default(),
        Some(date(2020, 1, 1)),
    );
    assert_eq!(a, b);
}
