//! Integration tests for the async intelligence service and pipeline timing.

use std::sync::Arc;
use std::time::{Duration, Instant};

use income_clarity_core::analytics::OptimizerConfig;
use income_clarity_core::errors::ValidationError;
use income_clarity_core::market::MarketConditions;
use income_clarity_core::portfolio::{Holding, Portfolio};
use income_clarity_core::risk::{MonteCarloConfig, MonteCarloSimulator};
use income_clarity_core::users::User;
use income_clarity_core::{
    EngineConfig, Error, EvaluationInputs, IntelligenceService, IntelligenceServiceTrait,
};

fn light_config() -> EngineConfig {
    let mut config = EngineConfig::default();
    config.analytics.optimizer = OptimizerConfig {
        random_starts: 2,
        iterations: 300,
        ..OptimizerConfig::default()
    };
    config
}

/// $100,000 of holdings against a $50,000 margin loan.
fn levered_inputs() -> EvaluationInputs {
    let portfolio = Portfolio::new(vec![
        Holding::new("SCHD", 625.0, 75.0, 80.0, "ETF", 0.035),
        Holding::new("O", 1_000.0, 55.0, 50.0, "Real Estate", 0.06),
    ]);
    let user = User::new("u1")
        .with_margin(50_000.0, 100_000.0, 0.07)
        .with_monthly_expenses(3_000.0);
    EvaluationInputs::new(portfolio, user, MarketConditions::default())
}

#[tokio::test]
async fn test_seeded_requests_are_memoized() {
    let service = IntelligenceService::with_config(light_config()).unwrap();
    let first = service.evaluate(levered_inputs(), Some(5)).await.unwrap();
    assert_eq!(service.cached_reports(), 1);
    let second = service.evaluate(levered_inputs(), Some(5)).await.unwrap();
    assert_eq!(service.cached_reports(), 1);
    assert_eq!(first, second);

    service.evaluate(levered_inputs(), Some(6)).await.unwrap();
    assert_eq!(service.cached_reports(), 2);
    service.clear_cache();
    assert_eq!(service.cached_reports(), 0);
}

#[tokio::test]
async fn test_unseeded_requests_are_not_cached() {
    let service = IntelligenceService::with_config(light_config()).unwrap();
    let report = service.evaluate(levered_inputs(), None).await.unwrap();
    assert_eq!(service.cached_reports(), 0);

    // The reported seed reproduces the report.
    let replay = service
        .evaluate(levered_inputs(), Some(report.seed))
        .await
        .unwrap();
    assert_eq!(report, replay);
}

#[tokio::test]
async fn test_configured_seed_applies_to_unseeded_requests() {
    let mut config = light_config();
    config.seed = Some(99);
    let service = IntelligenceService::with_config(config).unwrap();
    let report = service.evaluate(levered_inputs(), None).await.unwrap();
    assert_eq!(report.seed, 99);
    assert_eq!(service.cached_reports(), 1);
}

#[tokio::test]
async fn test_update_config() {
    let service = IntelligenceService::with_config(light_config()).unwrap();
    service.evaluate(levered_inputs(), Some(1)).await.unwrap();

    let mut bad = light_config();
    bad.risk.monte_carlo.paths = 10;
    assert!(matches!(
        service.update_config(bad).await,
        Err(Error::InvalidConfigValue(_))
    ));
    assert_eq!(service.get_config().await.risk.monte_carlo.paths, 1_000);
    assert_eq!(service.cached_reports(), 1);

    let mut good = light_config();
    good.recommendations.max_recommendations = 1;
    service.update_config(good).await.unwrap();
    assert_eq!(service.cached_reports(), 0);
    let report = service.evaluate(levered_inputs(), Some(1)).await.unwrap();
    assert!(report.recommendations.personalized_recommendations.len() <= 1);
}

#[tokio::test]
async fn test_validation_error_surfaces_from_service() {
    let service = IntelligenceService::with_config(light_config()).unwrap();
    let mut inputs = levered_inputs();
    inputs.portfolio.holdings[0].current_price = f64::NAN;
    let err = service.evaluate(inputs, Some(1)).await.unwrap_err();
    assert!(matches!(
        err,
        Error::Validation(ValidationError::NonFinite { .. })
    ));
    assert_eq!(service.cached_reports(), 0);
}

#[tokio::test]
async fn test_concurrent_requests_agree() {
    let service = Arc::new(IntelligenceService::with_config(light_config()).unwrap());
    let handles: Vec<_> = (0..4)
        .map(|_| {
            let service = Arc::clone(&service);
            tokio::spawn(async move { service.evaluate(levered_inputs(), Some(11)).await })
        })
        .collect();
    let reports: Vec<_> = futures::future::join_all(handles)
        .await
        .into_iter()
        .map(|joined| joined.unwrap().unwrap())
        .collect();
    for report in &reports[1..] {
        assert_eq!(report, &reports[0]);
    }
}

#[tokio::test]
async fn test_bear_market_triggers_margin_call_end_to_end() {
    let service = IntelligenceService::with_config(light_config()).unwrap();
    let report = service.evaluate(levered_inputs(), Some(3)).await.unwrap();
    let bear = report
        .margin
        .stress_tests
        .iter()
        .find(|s| s.scenario == "Bear market -25%")
        .unwrap();
    assert!(bear.margin_call_trigger);
    assert!(report.risk.monte_carlo.paths >= 1_000);
}

#[test]
fn test_monte_carlo_thousand_paths_is_fast() {
    let simulator = MonteCarloSimulator::new(MonteCarloConfig::default());
    let started = Instant::now();
    let projection = simulator.simulate(250_000.0, 0.07, 0.18, 400_000.0, 42);
    let elapsed = started.elapsed();
    assert_eq!(projection.paths, 1_000);
    assert!(
        elapsed < Duration::from_secs(1),
        "1,000 paths took {:?}",
        elapsed
    );
}
