//! Unit tests for the margin intelligence calculator.

use super::*;
use crate::errors::{Error, ValidationError};
use crate::market::MarketConditions;
use crate::portfolio::{AccountType, Holding, IncomeClassification, Portfolio};
use crate::users::User;

// ============================================================================
// Fixtures
// ============================================================================

/// $100,000 portfolio split across two income sectors.
fn income_portfolio() -> Portfolio {
    Portfolio::new(vec![
        Holding::new("SCHD", 625.0, 70.0, 80.0, "ETF", 0.035),
        Holding::new("O", 1_000.0, 55.0, 50.0, "Real Estate", 0.06)
            .with_income_classification(IncomeClassification::Section199A),
    ])
}

fn calculator() -> MarginIntelligenceCalculator {
    MarginIntelligenceCalculator::new()
}

// ============================================================================
// Current usage
// ============================================================================

#[test]
fn test_utilization_ratio_quarter() {
    let user = User::new("u1").with_margin(10_000.0, 40_000.0, 0.08);
    let result = calculator()
        .compute(&income_portfolio(), &user, &MarketConditions::default())
        .unwrap();
    assert!((result.current_usage.utilization_ratio - 0.25).abs() < 1e-12);
    assert!(result.has_margin);
}

#[test]
fn test_utilization_is_clamped_when_over_extended() {
    let user = User::new("u1").with_margin(50_000.0, 40_000.0, 0.08);
    let usage = calculator().current_usage(&income_portfolio(), &user);
    assert_eq!(usage.utilization_ratio, 1.0);
}

#[test]
fn test_utilization_zero_without_a_margin_line() {
    let user = User::new("u1");
    let usage = calculator().current_usage(&Portfolio::default(), &user);
    assert_eq!(usage.utilization_ratio, 0.0);
    assert_eq!(usage.velocity_score, 0.0);
    assert_eq!(usage.loan_to_value, 0.0);
}

#[test]
fn test_velocity_and_interest() {
    let mut user = User::new("u1").with_margin(20_000.0, 50_000.0, 0.072);
    user.margin.days_outstanding = 90;
    let usage = calculator().current_usage(&income_portfolio(), &user);
    // income = 50,000 * 0.035 + 50,000 * 0.06 = 4,750 per 20 thousand deployed
    assert!((usage.velocity_score - 237.5).abs() < 1e-9);
    assert!((usage.interest_cost - 20_000.0 * 0.072 * 90.0 / 360.0).abs() < 1e-9);
    assert!((usage.annual_interest_cost - 1_440.0).abs() < 1e-9);
    assert!(usage.effective_rate > 0.072 && usage.effective_rate < 0.075);
    assert!((usage.loan_to_value - 0.2).abs() < 1e-12);
}

// ============================================================================
// Risk assessment
// ============================================================================

#[test]
fn test_liquidation_price_and_coverage() {
    let user = User::new("u1").with_margin(35_000.0, 100_000.0, 0.08);
    let result = calculator()
        .compute(&income_portfolio(), &user, &MarketConditions::default())
        .unwrap();
    let risk = &result.risk_assessment;
    // 35,000 / (1 - 0.30) = 50,000
    assert!((risk.liquidation_price.unwrap() - 50_000.0).abs() < 1e-6);
    assert!((risk.distance_to_liquidation.unwrap() - 0.5).abs() < 1e-9);
    // 4,750 / 2,800
    assert!((risk.dividend_coverage_ratio.unwrap() - 4_750.0 / 2_800.0).abs() < 1e-9);
    assert!(risk.time_to_liquidation.unwrap() > 0.0);
    assert!(risk.liquidation_probability_1y >= 0.0 && risk.liquidation_probability_1y <= 1.0);
    assert!(!risk.in_margin_call);
}

#[test]
fn test_no_margin_means_not_applicable() {
    let user = User::new("u1");
    let result = calculator()
        .compute(&income_portfolio(), &user, &MarketConditions::default())
        .unwrap();
    let risk = &result.risk_assessment;
    assert_eq!(risk.liquidation_price, None);
    assert_eq!(risk.time_to_liquidation, None);
    assert_eq!(risk.dividend_coverage_ratio, None);
    assert_eq!(risk.liquidation_probability_1y, 0.0);
    assert!(!result.has_margin);
}

#[test]
fn test_more_leverage_liquidates_sooner() {
    let market = MarketConditions::default();
    let low = calculator()
        .compute(&income_portfolio(), &User::new("a").with_margin(20_000.0, 100_000.0, 0.08), &market)
        .unwrap();
    let high = calculator()
        .compute(&income_portfolio(), &User::new("b").with_margin(55_000.0, 100_000.0, 0.08), &market)
        .unwrap();
    assert!(
        high.risk_assessment.time_to_liquidation.unwrap()
            < low.risk_assessment.time_to_liquidation.unwrap()
    );
    assert!(
        high.risk_assessment.liquidation_probability_1y
            >= low.risk_assessment.liquidation_probability_1y
    );
}

#[test]
fn test_higher_vix_raises_volatility_score() {
    let user = User::new("u1").with_margin(20_000.0, 100_000.0, 0.08);
    let calm = calculator()
        .compute(&income_portfolio(), &user, &MarketConditions::default())
        .unwrap();
    let stressed_market = MarketConditions {
        volatility_index: 40.0,
        ..MarketConditions::default()
    };
    let stressed = calculator()
        .compute(&income_portfolio(), &user, &stressed_market)
        .unwrap();
    assert!(stressed.risk_assessment.volatility_score > calm.risk_assessment.volatility_score);
}

#[test]
fn test_account_under_water_is_at_barrier() {
    let user = User::new("u1").with_margin(90_000.0, 100_000.0, 0.08);
    let result = calculator()
        .compute(&income_portfolio(), &user, &MarketConditions::default())
        .unwrap();
    assert_eq!(result.risk_assessment.time_to_liquidation, Some(0.0));
    assert_eq!(result.risk_assessment.liquidation_probability_1y, 1.0);
    assert!(result.risk_assessment.in_margin_call);
}

// ============================================================================
// Stress tests
// ============================================================================

#[test]
fn test_bear_market_triggers_call_at_fifty_percent_leverage() {
    // Loan equal to 50% of portfolio value, 30% maintenance requirement.
    let user = User::new("u1").with_margin(50_000.0, 100_000.0, 0.08);
    let result = calculator()
        .compute(&income_portfolio(), &user, &MarketConditions::default())
        .unwrap();

    let bear = result
        .stress_tests
        .iter()
        .find(|s| s.scenario.starts_with("Bear market"))
        .unwrap();
    assert!(bear.margin_call_trigger);
    assert!(!bear.liquidation_trigger);
    assert!((bear.post_shock_value - 75_000.0).abs() < 1e-6);
    assert!((bear.post_shock_equity - 25_000.0).abs() < 1e-6);
    // 0.35 * 75,000 - 25,000
    assert!((bear.shortfall - 1_250.0).abs() < 1e-6);
    assert!(bear.action_required.starts_with("Margin call"));

    let moderate = &result.stress_tests[0];
    assert!(!moderate.margin_call_trigger);

    let crash = &result.stress_tests[2];
    assert!(crash.margin_call_trigger);
    assert!(crash.liquidation_trigger);
}

#[test]
fn test_stress_tests_are_deterministic() {
    let user = User::new("u1").with_margin(30_000.0, 100_000.0, 0.08);
    let a = calculator().stress_tests(&income_portfolio(), &user);
    let b = calculator().stress_tests(&income_portfolio(), &user);
    assert_eq!(a, b);
    assert_eq!(a.len(), 3);
}

#[test]
fn test_stress_tests_without_margin_never_call() {
    let result = calculator()
        .compute(&income_portfolio(), &User::new("u1"), &MarketConditions::default())
        .unwrap();
    assert!(result.stress_tests.iter().all(|s| !s.margin_call_trigger));
    assert_eq!(result.margin_call_scenarios().count(), 0);
}

#[test]
fn test_custom_maintenance_requirement() {
    let config = MarginConfig {
        maintenance_margin: 0.25,
        call_buffer: 0.0,
        ..MarginConfig::default()
    };
    let user = User::new("u1").with_margin(50_000.0, 100_000.0, 0.08);
    let tests = MarginIntelligenceCalculator::with_config(config).stress_tests(&income_portfolio(), &user);
    // 25,000 / 75,000 = 0.333 stays above 0.25
    assert!(!tests[1].margin_call_trigger);
}

// ============================================================================
// Recommendations
// ============================================================================

fn rec(confidence: f64, risk_score: f64, expected_return: f64) -> MarginRecommendation {
    MarginRecommendation {
        description: format!("c={}", confidence),
        kind: MarginAction::Optimize,
        focus: MarginFocus::RateReduction,
        expected_return,
        risk_score,
        confidence,
        amount: None,
    }
}

#[test]
fn test_ranking_prefers_confidence() {
    let mut recs = vec![rec(0.6, 0.2, 0.05), rec(0.9, 0.2, 0.05)];
    rank_margin_recommendations(&mut recs);
    assert_eq!(recs[0].confidence, 0.9);
}

#[test]
fn test_ranking_tie_breaks_on_lower_risk() {
    // 0.5 * 0.5 / 2.0 == 0.5 * 0.25 / 1.0
    let mut recs = vec![rec(0.5, 1.0, 0.5), rec(0.5, 0.0, 0.25)];
    rank_margin_recommendations(&mut recs);
    assert_eq!(recs[0].ranking_score(), recs[1].ranking_score());
    assert_eq!(recs[0].risk_score, 0.0);
}

#[test]
fn test_ranking_uses_magnitude_over_risk() {
    // 0.6 * 0.075 / 1.5 = 0.03 ; 0.5 * 0.04 / 1.0 = 0.02
    let mut recs = vec![rec(0.5, 0.0, 0.04), rec(0.6, 0.5, 0.075)];
    rank_margin_recommendations(&mut recs);
    assert_eq!(recs[0].confidence, 0.6);
}

#[test]
fn test_over_utilized_account_gets_decrease_first() {
    let user = User::new("u1").with_margin(60_000.0, 100_000.0, 0.09);
    let result = calculator()
        .compute(&income_portfolio(), &user, &MarketConditions::default())
        .unwrap();
    assert!(result
        .recommendations
        .iter()
        .any(|r| r.kind == MarginAction::Decrease));
    assert!(result
        .recommendations
        .iter()
        .all(|r| r.kind != MarginAction::Increase));
    let scores: Vec<f64> = result.recommendations.iter().map(|r| r.ranking_score()).collect();
    assert!(scores.windows(2).all(|w| w[0] >= w[1]));
}

#[test]
fn test_unused_line_in_calm_market_can_increase() {
    let user = User::new("u1").with_margin(0.0, 100_000.0, 0.05);
    let result = calculator()
        .compute(&income_portfolio(), &user, &MarketConditions::default())
        .unwrap();
    // yield 4.75% vs 5% borrowing cost: no positive spread, so no increase
    assert!(result.recommendations.iter().all(|r| r.kind != MarginAction::Increase));

    let cheap = User::new("u1").with_margin(0.0, 100_000.0, 0.02);
    let result = calculator()
        .compute(&income_portfolio(), &cheap, &MarketConditions::default())
        .unwrap();
    let increase = result
        .recommendations
        .iter()
        .find(|r| r.kind == MarginAction::Increase)
        .unwrap();
    assert!((increase.amount.unwrap() - 30_000.0).abs() < 1e-6);
}

#[test]
fn test_hold_when_nothing_to_do() {
    let result = calculator()
        .compute(&income_portfolio(), &User::new("u1"), &MarketConditions::default())
        .unwrap();
    assert_eq!(result.recommendations.len(), 1);
    assert_eq!(result.recommendations[0].kind, MarginAction::Hold);
}

// ============================================================================
// Tax optimization
// ============================================================================

#[test]
fn test_interest_deductible_up_to_investment_income() {
    // Section 199A income: 3,000 ; qualified: 1,750 ; interest: 40,000 * 0.09 = 3,600
    let user = User::new("u1").with_margin(40_000.0, 100_000.0, 0.09);
    let calc = calculator();
    let usage = calc.current_usage(&income_portfolio(), &user);
    let tax = calc.tax_optimization(&income_portfolio(), &user, &usage);
    assert!((tax.deductible_interest - 3_000.0).abs() < 1e-9);
    assert!((tax.estimated_tax_savings - 3_000.0 * 0.27).abs() < 1e-9);
    // 600 of qualified dividends elected at a 20% combined qualified rate
    assert!((tax.qualified_election_benefit - 600.0 * 0.20).abs() < 1e-9);
    assert_eq!(tax.carryforward_interest, 0.0);
    assert!(tax.after_tax_margin_rate < 0.09);
    assert_eq!(tax.opportunities.len(), 2);
}

#[test]
fn test_no_deduction_without_itemizing() {
    let mut user = User::new("u1").with_margin(40_000.0, 100_000.0, 0.09);
    user.tax_profile.itemizes_deductions = false;
    let calc = calculator();
    let usage = calc.current_usage(&income_portfolio(), &user);
    let tax = calc.tax_optimization(&income_portfolio(), &user, &usage);
    assert_eq!(tax.deductible_interest, 0.0);
    assert_eq!(tax.after_tax_margin_rate, 0.09);
    assert_eq!(tax.opportunities.len(), 1);
}

#[test]
fn test_tax_advantaged_income_is_not_investment_income() {
    let portfolio = Portfolio::new(vec![Holding::new("BND", 1_000.0, 70.0, 72.0, "Bonds", 0.04)
        .with_account_type(AccountType::TaxDeferred)
        .with_income_classification(IncomeClassification::Ordinary)]);
    let user = User::new("u1").with_margin(10_000.0, 50_000.0, 0.08);
    let calc = calculator();
    let usage = calc.current_usage(&portfolio, &user);
    let tax = calc.tax_optimization(&portfolio, &user, &usage);
    assert_eq!(tax.deductible_interest, 0.0);
    assert!((tax.carryforward_interest - 800.0).abs() < 1e-9);
}

// ============================================================================
// Validation
// ============================================================================

#[test]
fn test_negative_shares_fail_validation() {
    let portfolio = Portfolio::new(vec![Holding::new("JEPI", -1.0, 50.0, 55.0, "ETF", 0.07)]);
    let err = calculator()
        .compute(&portfolio, &User::new("u1"), &MarketConditions::default())
        .unwrap_err();
    assert!(matches!(
        err,
        Error::Validation(ValidationError::NegativeValue { .. })
    ));
}

#[test]
fn test_empty_portfolio_is_complete() {
    let result = calculator()
        .compute(&Portfolio::default(), &User::new("u1"), &MarketConditions::default())
        .unwrap();
    assert_eq!(result.current_usage.utilization_ratio, 0.0);
    assert_eq!(result.risk_assessment.equity_ratio, None);
    assert!(result.stress_tests.iter().all(|s| s.post_shock_value == 0.0));
    assert!(result.stress_tests.iter().all(|s| s.equity_ratio.is_finite()));
}

#[test]
fn test_config_validation() {
    assert!(MarginConfig::default().validate().is_ok());
    let bad = MarginConfig {
        maintenance_margin: 1.2,
        ..MarginConfig::default()
    };
    assert!(bad.validate().is_err());
    let bad_scenario = MarginConfig {
        scenarios: vec![StressScenario::new("Impossible", 1.5)],
        ..MarginConfig::default()
    };
    assert!(bad_scenario.validate().is_err());
}
