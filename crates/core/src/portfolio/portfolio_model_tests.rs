use super::*;
use crate::errors::{Error, ValidationError};
use crate::market::{HistoricalData, PricePoint};
use chrono::{Duration, NaiveDate};

fn two_equal_holdings() -> Portfolio {
    Portfolio::new(vec![
        Holding::new("SCHD", 100.0, 70.0, 80.0, "ETF", 0.035),
        Holding::new("O", 160.0, 55.0, 50.0, "Real Estate", 0.06),
    ])
}

#[test]
fn test_derived_aggregates() {
    let portfolio = two_equal_holdings();
    assert_eq!(portfolio.total_value(), 16_000.0);
    assert_eq!(portfolio.total_cost_basis(), 7_000.0 + 8_800.0);
    assert!((portfolio.annual_dividend_income() - (280.0 + 480.0)).abs() < 1e-9);
    assert!((portfolio.portfolio_yield() - 760.0 / 16_000.0).abs() < 1e-12);
}

#[test]
fn test_equal_weights_hhi_is_one_half() {
    let portfolio = two_equal_holdings();
    let weights = portfolio.weights();
    assert_eq!(weights, vec![0.5, 0.5]);
    assert!((portfolio.herfindahl_index().unwrap() - 0.5).abs() < 1e-12);
}

#[test]
fn test_empty_portfolio_has_no_weights() {
    let portfolio = Portfolio::default();
    assert!(portfolio.is_empty());
    assert!(portfolio.weights().is_empty());
    assert_eq!(portfolio.herfindahl_index(), None);
    assert_eq!(portfolio.portfolio_yield(), 0.0);
}

#[test]
fn test_sector_weights_aggregate() {
    let portfolio = Portfolio::new(vec![
        Holding::new("NEE", 10.0, 60.0, 70.0, "Utilities", 0.03),
        Holding::new("DUK", 10.0, 90.0, 100.0, "Utilities", 0.04),
        Holding::new("MSFT", 1.0, 300.0, 330.0, "Technology", 0.008),
    ]);
    let sectors = portfolio.sector_weights();
    assert!((sectors["Utilities"] - 1_700.0 / 2_030.0).abs() < 1e-12);
    assert!((sectors["Technology"] - 330.0 / 2_030.0).abs() < 1e-12);
}

#[test]
fn test_validate_rejects_negative_shares() {
    let portfolio = Portfolio::new(vec![Holding::new("JEPI", -5.0, 50.0, 55.0, "ETF", 0.07)]);
    match portfolio.validate() {
        Err(Error::Validation(ValidationError::NegativeValue { field, value })) => {
            assert_eq!(field, "holdings[0].shares");
            assert_eq!(value, -5.0);
        }
        other => panic!("unexpected result: {:?}", other),
    }
}

#[test]
fn test_validate_rejects_non_finite_price() {
    let portfolio = Portfolio::new(vec![Holding::new("JEPI", 5.0, 50.0, f64::NAN, "ETF", 0.07)]);
    assert!(matches!(
        portfolio.validate(),
        Err(Error::Validation(ValidationError::NonFinite { .. }))
    ));
}

#[test]
fn test_validate_rejects_overflowing_market_value() {
    let portfolio = Portfolio::new(vec![
        Holding::new("AAA", 1e200, 1.0, 1e200, "Technology", 0.0),
        Holding::new("SCHD", 100.0, 70.0, 80.0, "ETF", 0.035),
    ]);
    match portfolio.validate() {
        Err(Error::Validation(ValidationError::NonFinite { field })) => {
            assert_eq!(field, "holdings[0].marketValue");
        }
        other => panic!("expected NonFinite, got {:?}", other),
    }
}

#[test]
fn test_validate_rejects_overflowing_total_value() {
    let portfolio = Portfolio::new(vec![
        Holding::new("AAA", 1e154, 1.0, 1.5e154, "Technology", 0.0),
        Holding::new("BBB", 1e154, 1.0, 1.5e154, "Technology", 0.0),
    ]);
    match portfolio.validate() {
        Err(Error::Validation(ValidationError::NonFinite { field })) => {
            assert_eq!(field, "totalValue");
        }
        other => panic!("expected NonFinite, got {:?}", other),
    }
}

#[test]
fn test_validate_rejects_blank_ticker() {
    let portfolio = Portfolio::new(vec![Holding::new(" ", 5.0, 50.0, 50.0, "ETF", 0.07)]);
    assert!(matches!(
        portfolio.validate(),
        Err(Error::Validation(ValidationError::MissingField(_)))
    ));
}

#[test]
fn test_return_model_falls_back_to_sector_priors() {
    let portfolio = two_equal_holdings();
    let model = ReturnModel::estimate(&portfolio, &HistoricalData::default());
    assert!(model.used_fallback());
    assert_eq!(model.assets[1].volatility, sector_profile("Real Estate").volatility);
    assert_eq!(model.correlation(0, 1), 0.50);
    assert_eq!(model.correlation(1, 1), 1.0);
}

#[test]
fn test_return_model_uses_history_when_available() {
    let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
    let mut price_history = Vec::new();
    for day in 0..60 {
        let date = start + Duration::days(day);
        // Alternating +1% / -0.5% moves
        let close = 100.0 * (1.0 + if day % 2 == 0 { 0.01 } else { -0.005 }) + day as f64 * 0.1;
        price_history.push(PricePoint {
            ticker: "SCHD".to_string(),
            date,
            close,
        });
    }
    let history = HistoricalData {
        price_history,
        ..Default::default()
    };
    let model = ReturnModel::estimate(&two_equal_holdings(), &history);
    assert!(model.assets[0].from_history);
    assert!(!model.assets[1].from_history);
    assert!(model.used_fallback());
    assert!(model.assets[0].volatility > 0.0);
}

#[test]
fn test_portfolio_volatility_single_asset() {
    let portfolio = Portfolio::new(vec![Holding::new("XLU", 10.0, 60.0, 65.0, "Utilities", 0.03)]);
    let model = ReturnModel::estimate(&portfolio, &HistoricalData::default());
    assert!((model.portfolio_volatility(&[1.0]) - 0.16).abs() < 1e-12);
    assert!((model.portfolio_return(&[1.0]) - 0.065).abs() < 1e-12);
}
