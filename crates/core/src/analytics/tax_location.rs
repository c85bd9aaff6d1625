//! Dividend tax drag, asset location and loss harvesting.

use super::{AssetLocation, HarvestCandidate, LocationMove, TaxOptimization};
use crate::constants::SECTION_199A_DEDUCTION;
use crate::portfolio::{AccountType, Holding, IncomeClassification, Portfolio};
use crate::users::TaxProfile;

/// Marginal tax rate on a holding's distributions in a taxable account.
pub fn dividend_tax_rate(classification: IncomeClassification, tax: &TaxProfile) -> f64 {
    match classification {
        IncomeClassification::Qualified => tax.capital_gains_rate + tax.state_rate,
        IncomeClassification::Ordinary => tax.federal_rate + tax.state_rate,
        IncomeClassification::Section199A => {
            tax.federal_rate * (1.0 - SECTION_199A_DEDUCTION) + tax.state_rate
        }
        IncomeClassification::ReturnOfCapital => 0.0,
    }
}

/// Annual tax on the holding's income if it sat in a taxable account.
fn drag_if_taxable(holding: &Holding, tax: &TaxProfile) -> f64 {
    holding.annual_income() * dividend_tax_rate(holding.income_classification, tax)
}

#[derive(Debug, Clone, Copy)]
pub struct TaxLocationAnalyzer {
    harvest_threshold: f64,
}

impl Default for TaxLocationAnalyzer {
    fn default() -> Self {
        Self {
            harvest_threshold: 0.05,
        }
    }
}

impl TaxLocationAnalyzer {
    pub fn new(harvest_threshold: f64) -> Self {
        Self { harvest_threshold }
    }

    pub fn analyze(&self, portfolio: &Portfolio, tax: &TaxProfile) -> TaxOptimization {
        let asset_location = asset_location(portfolio, tax);

        let harvest_candidates: Vec<HarvestCandidate> = portfolio
            .holdings
            .iter()
            .filter(|h| !h.account_type.is_tax_advantaged())
            .filter(|h| {
                h.unrealized_gain() < 0.0 && -h.unrealized_return() >= self.harvest_threshold
            })
            .map(|h| HarvestCandidate {
                ticker: h.ticker.clone(),
                unrealized_loss: -h.unrealized_gain(),
                tax_savings: -h.unrealized_gain() * tax.capital_gains_rate,
            })
            .collect();
        let harvestable_losses: f64 = harvest_candidates.iter().map(|c| c.unrealized_loss).sum();
        let harvesting_savings = harvestable_losses * tax.capital_gains_rate;

        let section_199a_deduction_value: f64 = portfolio
            .holdings
            .iter()
            .filter(|h| {
                !h.account_type.is_tax_advantaged()
                    && h.income_classification == IncomeClassification::Section199A
            })
            .map(|h| h.annual_income() * SECTION_199A_DEDUCTION * tax.federal_rate)
            .sum();

        TaxOptimization {
            estimated_tax_savings: asset_location.estimated_benefit + harvesting_savings,
            asset_location,
            harvestable_losses,
            harvesting_savings,
            harvest_candidates,
            section_199a_deduction_value,
        }
    }
}

/// Greedy placement: fill the existing tax-advantaged capacity with the
/// holdings that lose the most tax per dollar, everything else is taxable.
fn asset_location(portfolio: &Portfolio, tax: &TaxProfile) -> AssetLocation {
    let current_tax_drag: f64 = portfolio
        .holdings
        .iter()
        .filter(|h| !h.account_type.is_tax_advantaged())
        .map(|h| drag_if_taxable(h, tax))
        .sum();

    let capacity = portfolio.tax_advantaged_value();
    if capacity <= 0.0 {
        return AssetLocation {
            current_tax_drag,
            optimal_tax_drag: current_tax_drag,
            estimated_benefit: 0.0,
            moves: Vec::new(),
        };
    }

    let mut ranked: Vec<(usize, f64)> = portfolio
        .holdings
        .iter()
        .enumerate()
        .filter(|(_, h)| h.market_value() > 0.0)
        .map(|(i, h)| (i, drag_if_taxable(h, tax) / h.market_value()))
        .collect();
    // Highest drag first; holding order breaks ties.
    ranked.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.0.cmp(&b.0))
    });

    let mut sheltered = vec![0.0; portfolio.holdings.len()];
    let mut remaining = capacity;
    for (i, _) in &ranked {
        if remaining <= 0.0 {
            break;
        }
        let value = portfolio.holdings[*i].market_value();
        let placed = value.min(remaining);
        sheltered[*i] = placed;
        remaining -= placed;
    }

    let optimal_tax_drag: f64 = portfolio
        .holdings
        .iter()
        .zip(&sheltered)
        .map(|(h, s)| {
            let taxable_share = 1.0 - s / h.market_value().max(f64::MIN_POSITIVE);
            drag_if_taxable(h, tax) * taxable_share.max(0.0)
        })
        .sum();

    // Destination for sheltered money: the account type holding most of the capacity.
    let deferred: f64 = portfolio
        .holdings
        .iter()
        .filter(|h| h.account_type == AccountType::TaxDeferred)
        .map(Holding::market_value)
        .sum();
    let shelter = if deferred * 2.0 >= capacity {
        AccountType::TaxDeferred
    } else {
        AccountType::TaxFree
    };

    let mut moves = Vec::new();
    for (h, s) in portfolio.holdings.iter().zip(&sheltered) {
        let value = h.market_value();
        if h.account_type.is_tax_advantaged() {
            let out = value - s;
            if out > 0.01 {
                moves.push(LocationMove {
                    ticker: h.ticker.clone(),
                    from: h.account_type,
                    to: AccountType::Taxable,
                    amount: out,
                    annual_tax_saving: -drag_if_taxable(h, tax) * out / value,
                });
            }
        } else if *s > 0.01 {
            moves.push(LocationMove {
                ticker: h.ticker.clone(),
                from: AccountType::Taxable,
                to: shelter,
                amount: *s,
                annual_tax_saving: drag_if_taxable(h, tax) * s / value,
            });
        }
    }

    AssetLocation {
        current_tax_drag,
        optimal_tax_drag,
        estimated_benefit: (current_tax_drag - optimal_tax_drag).max(0.0),
        moves,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dividend_tax_rates() {
        let tax = TaxProfile::default();
        assert!((dividend_tax_rate(IncomeClassification::Qualified, &tax) - 0.20).abs() < 1e-12);
        assert!((dividend_tax_rate(IncomeClassification::Ordinary, &tax) - 0.27).abs() < 1e-12);
        assert!(
            (dividend_tax_rate(IncomeClassification::Section199A, &tax) - (0.176 + 0.05)).abs()
                < 1e-12
        );
        assert_eq!(dividend_tax_rate(IncomeClassification::ReturnOfCapital, &tax), 0.0);
    }
}
