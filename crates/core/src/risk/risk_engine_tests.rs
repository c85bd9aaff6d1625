//! Unit tests for the risk assessment engine.

use super::*;
use crate::market::MarketConditions;
use crate::portfolio::{Holding, Portfolio};
use crate::users::User;

fn fast_engine() -> RiskAssessmentEngine {
    RiskAssessmentEngine::with_config(RiskConfig {
        monte_carlo: MonteCarloConfig {
            paths: 200,
            ..MonteCarloConfig::default()
        },
        ..RiskConfig::default()
    })
}

fn two_equal_holdings() -> Portfolio {
    Portfolio::new(vec![
        Holding::new("VZ", 500.0, 38.0, 40.0, "Telecom", 0.065),
        Holding::new("XLU", 250.0, 70.0, 80.0, "Utilities", 0.031),
    ])
}

fn diversified(n: usize) -> Portfolio {
    let sectors = ["Technology", "Utilities", "Healthcare", "Financials", "Energy"];
    Portfolio::new(
        (0..n)
            .map(|i| {
                Holding::new(
                    format!("T{}", i),
                    100.0,
                    90.0,
                    100.0,
                    sectors[i % sectors.len()],
                    0.03,
                )
            })
            .collect(),
    )
}

// ============================================================================
// Concentration
// ============================================================================

#[test]
fn test_equal_weight_pair_is_highly_concentrated() {
    let result = fast_engine()
        .assess(&two_equal_holdings(), &User::new("u1"), &MarketConditions::default(), 42)
        .unwrap();
    let concentration = &result.concentration_risk;
    assert!((concentration.hhi.unwrap() - 0.5).abs() < 1e-12);
    assert_eq!(concentration.diversification, Diversification::HighlyConcentrated);
    assert!((concentration.largest_position_risk - 50.0).abs() < 1e-9);
    assert!((concentration.effective_positions.unwrap() - 2.0).abs() < 1e-9);
    assert_eq!(concentration.top_holdings.len(), 2);
}

#[test]
fn test_ten_positions_are_well_diversified() {
    let result = fast_engine()
        .assess(&diversified(10), &User::new("u1"), &MarketConditions::default(), 42)
        .unwrap();
    let hhi = result.concentration_risk.hhi.unwrap();
    assert!((hhi - 0.1).abs() < 1e-12);
    assert_eq!(
        result.concentration_risk.diversification,
        Diversification::WellDiversified
    );
    assert_eq!(result.concentration_risk.top_holdings.len(), 5);
}

#[test]
fn test_diversification_boundaries() {
    assert_eq!(Diversification::from_hhi(Some(0.1499)), Diversification::WellDiversified);
    assert_eq!(
        Diversification::from_hhi(Some(0.15)),
        Diversification::ModeratelyConcentrated
    );
    assert_eq!(
        Diversification::from_hhi(Some(0.25)),
        Diversification::ModeratelyConcentrated
    );
    assert_eq!(Diversification::from_hhi(Some(0.2501)), Diversification::HighlyConcentrated);
    assert_eq!(Diversification::from_hhi(None), Diversification::NotApplicable);
}

// ============================================================================
// Overall score
// ============================================================================

#[test]
fn test_risk_level_boundaries() {
    assert_eq!(RiskLevel::from_score(0.0), RiskLevel::Low);
    assert_eq!(RiskLevel::from_score(29.99), RiskLevel::Low);
    assert_eq!(RiskLevel::from_score(30.0), RiskLevel::Moderate);
    assert_eq!(RiskLevel::from_score(70.0), RiskLevel::Moderate);
    assert_eq!(RiskLevel::from_score(70.01), RiskLevel::High);
}

#[test]
fn test_breakdown_for_equal_pair() {
    let result = fast_engine()
        .assess(&two_equal_holdings(), &User::new("u1"), &MarketConditions::default(), 42)
        .unwrap();
    let b = result.risk_breakdown;
    assert!((b.concentration - 100.0).abs() < 1e-9);
    assert!((b.sector - 75.0).abs() < 1e-9);
    assert_eq!(b.leverage, 0.0);
    assert!((b.liquidity - 100.0 * MarketConditions::default().liquidity_stress()).abs() < 1e-9);
    let expected = b.weighted_score(&RiskWeights::default());
    assert!((result.overall_risk_score - expected).abs() < 1e-9);
    assert!(result.has_estimate);
}

#[test]
fn test_empty_portfolio_baseline() {
    let result = fast_engine()
        .assess(&Portfolio::default(), &User::new("u1"), &MarketConditions::default(), 42)
        .unwrap();
    assert_eq!(result.overall_risk_score, 0.0);
    assert_eq!(result.risk_level, RiskLevel::Low);
    assert_eq!(result.concentration_risk.hhi, None);
    assert_eq!(result.concentration_risk.effective_positions, None);
    assert_eq!(
        result.concentration_risk.diversification,
        Diversification::NotApplicable
    );
    assert_eq!(result.concentration_risk.largest_position_risk, 0.0);
    assert_eq!(result.monte_carlo.percentile_95, 0.0);
    assert!(result.recommendations.is_empty());
}

#[test]
fn test_leverage_raises_score() {
    let market = MarketConditions::default();
    let unlevered = fast_engine()
        .assess(&diversified(10), &User::new("u1"), &market, 1)
        .unwrap();
    // 50,000 on a 100,000 portfolio
    let levered_user = User::new("u1").with_margin(50_000.0, 100_000.0, 0.08);
    let levered = fast_engine()
        .assess(&diversified(10), &levered_user, &market, 1)
        .unwrap();
    assert_eq!(levered.risk_breakdown.leverage, 100.0);
    assert!((levered.overall_risk_score - unlevered.overall_risk_score - 20.0).abs() < 1e-9);

    let first = &levered.recommendations[0];
    assert_eq!(first.priority, Priority::Critical);
    assert_eq!(first.title, "Reduce margin leverage");
}

#[test]
fn test_stressed_market_raises_volatility_and_liquidity() {
    let calm = fast_engine()
        .assess(&diversified(5), &User::new("u1"), &MarketConditions::default(), 3)
        .unwrap();
    let stressed_market = MarketConditions {
        volatility_index: 45.0,
        credit_spread: 0.05,
        ..MarketConditions::default()
    };
    let stressed = fast_engine()
        .assess(&diversified(5), &User::new("u1"), &stressed_market, 3)
        .unwrap();
    assert!(stressed.risk_breakdown.volatility > calm.risk_breakdown.volatility);
    assert!(stressed.risk_breakdown.liquidity > calm.risk_breakdown.liquidity);
    assert!(stressed
        .recommendations
        .iter()
        .any(|r| r.title == "Build a cash buffer"));
}

#[test]
fn test_weights_must_sum_to_one() {
    assert!(RiskWeights::default().validate().is_ok());
    let bad = RiskWeights {
        concentration: 0.5,
        ..RiskWeights::default()
    };
    assert!(bad.validate().is_err());
    let negative = RiskWeights {
        concentration: -0.25,
        volatility: 0.75,
        ..RiskWeights::default()
    };
    assert!(negative.validate().is_err());
}

#[test]
fn test_path_count_floor_enforced_by_config() {
    assert!(RiskConfig::default().validate().is_ok());
    let config = RiskConfig {
        monte_carlo: MonteCarloConfig {
            paths: 999,
            ..MonteCarloConfig::default()
        },
        ..RiskConfig::default()
    };
    assert!(config.validate().is_err());
}

// ============================================================================
// Monte Carlo and recommendations
// ============================================================================

#[test]
fn test_assessment_is_seed_deterministic() {
    let user = User::new("u1").with_monthly_expenses(1_000.0);
    let a = fast_engine()
        .assess(&two_equal_holdings(), &user, &MarketConditions::default(), 1234)
        .unwrap();
    let b = fast_engine()
        .assess(&two_equal_holdings(), &user, &MarketConditions::default(), 1234)
        .unwrap();
    assert_eq!(a, b);
    let p = a.monte_carlo.percentiles();
    assert!(p.windows(2).all(|w| w[0] <= w[1]));
}

#[test]
fn test_goal_success_probability() {
    // No expenses: the goal is trivially met on every path.
    let result = fast_engine()
        .assess(&two_equal_holdings(), &User::new("u1"), &MarketConditions::default(), 5)
        .unwrap();
    assert_eq!(result.monte_carlo.goal_value, 0.0);
    assert_eq!(result.monte_carlo.probability_of_success, 1.0);

    // $10,000/month capitalized at the 4.8% yield is $2.5M; $40,000 will not get there.
    let user = User::new("u2").with_monthly_expenses(10_000.0);
    let result = fast_engine()
        .assess(&two_equal_holdings(), &user, &MarketConditions::default(), 5)
        .unwrap();
    assert!(result.monte_carlo.probability_of_success < 0.01);
}

#[test]
fn test_recommendations_sorted_by_priority_then_cost_benefit() {
    let user = User::new("u1").with_margin(15_000.0, 50_000.0, 0.08);
    let result = fast_engine()
        .assess(&two_equal_holdings(), &user, &MarketConditions::default(), 9)
        .unwrap();
    assert!(result.recommendations.len() >= 2);
    for pair in result.recommendations.windows(2) {
        assert!(RiskRecommendation::rank_cmp(&pair[0], &pair[1]) != std::cmp::Ordering::Greater);
    }
}

#[test]
fn test_balanced_portfolio_gets_maintain_advice() {
    let result = fast_engine()
        .assess(&diversified(10), &User::new("u1"), &MarketConditions::default(), 9)
        .unwrap();
    assert_eq!(result.recommendations.len(), 1);
    assert_eq!(result.recommendations[0].priority, Priority::Low);
}

#[test]
fn test_trim_recommendation_reports_reduction_with_position_at_cap() {
    let portfolio = Portfolio::new(vec![
        Holding::new("AAA", 500.0, 90.0, 100.0, "Technology", 0.01),
        Holding::new("BBB", 200.0, 90.0, 100.0, "Utilities", 0.03),
        Holding::new("CCC", 200.0, 90.0, 100.0, "Healthcare", 0.02),
        Holding::new("DDD", 100.0, 90.0, 100.0, "Energy", 0.04),
    ]);
    let result = fast_engine()
        .assess(&portfolio, &User::new("u1"), &MarketConditions::default(), 9)
        .unwrap();
    let trim = result
        .recommendations
        .iter()
        .find(|r| r.factor == RiskFactor::Concentration)
        .unwrap();
    assert_eq!(trim.title, "Trim AAA position");
    assert!(trim.expected_risk_reduction > 0.0);
    assert!(trim.cost_benefit > 0.0);
}

#[test]
fn test_projection_beyond_f64_range_is_a_calculation_error() {
    // 1.7e308 of market value is valid input but cannot grow.
    let portfolio = Portfolio::new(vec![Holding::new(
        "BIG", 1e154, 1.0, 1.7e154, "Technology", 0.0,
    )]);
    let err = fast_engine()
        .assess(&portfolio, &User::new("u1"), &MarketConditions::default(), 3)
        .unwrap_err();
    assert!(matches!(err, crate::errors::Error::Calculation(_)));
}
