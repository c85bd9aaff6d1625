//! Holding and portfolio domain models.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::errors::{Result, ValidationError};
use crate::utils::stats::{herfindahl, safe_div};

/// Account wrapper a holding lives in. Drives asset-location analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[derive(Default)]
pub enum AccountType {
    #[default]
    Taxable,
    /// Traditional IRA / 401(k): income taxed on withdrawal
    TaxDeferred,
    /// Roth accounts: income never taxed
    TaxFree,
}

impl AccountType {
    pub fn is_tax_advantaged(&self) -> bool {
        !matches!(self, AccountType::Taxable)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AccountType::Taxable => "TAXABLE",
            AccountType::TaxDeferred => "TAX_DEFERRED",
            AccountType::TaxFree => "TAX_FREE",
        }
    }
}

/// Tax character of the distributions a holding pays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[derive(Default)]
pub enum IncomeClassification {
    /// Qualified dividends, taxed at the capital-gains rate
    #[default]
    Qualified,
    /// Ordinary income (bond interest, non-qualified dividends)
    Ordinary,
    /// REIT / pass-through dividends eligible for the Section 199A deduction
    Section199A,
    /// Return of capital: reduces basis, no current tax
    ReturnOfCapital,
}

/// A single position in the portfolio.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Holding {
    pub ticker: String,
    pub shares: f64,
    /// Average cost per share
    pub cost_basis: f64,
    pub current_price: f64,
    pub sector: String,
    /// Estimated annual distribution yield as a fraction of price (0.045 = 4.5%)
    pub annual_yield: f64,
    #[serde(default)]
    pub account_type: AccountType,
    #[serde(default)]
    pub income_classification: IncomeClassification,
}

impl Holding {
    pub fn new(
        ticker: impl Into<String>,
        shares: f64,
        cost_basis: f64,
        current_price: f64,
        sector: impl Into<String>,
        annual_yield: f64,
    ) -> Self {
        Self {
            ticker: ticker.into(),
            shares,
            cost_basis,
            current_price,
            sector: sector.into(),
            annual_yield,
            account_type: AccountType::default(),
            income_classification: IncomeClassification::default(),
        }
    }

    pub fn with_account_type(mut self, account_type: AccountType) -> Self {
        self.account_type = account_type;
        self
    }

    pub fn with_income_classification(mut self, classification: IncomeClassification) -> Self {
        self.income_classification = classification;
        self
    }

    pub fn market_value(&self) -> f64 {
        self.shares * self.current_price
    }

    pub fn cost_value(&self) -> f64 {
        self.shares * self.cost_basis
    }

    pub fn unrealized_gain(&self) -> f64 {
        self.market_value() - self.cost_value()
    }

    /// Unrealized gain as a fraction of cost. Zero when cost is zero.
    pub fn unrealized_return(&self) -> f64 {
        safe_div(self.unrealized_gain(), self.cost_value(), 0.0)
    }

    pub fn annual_income(&self) -> f64 {
        self.market_value() * self.annual_yield
    }

    fn validate(&self, index: usize) -> Result<()> {
        if self.ticker.trim().is_empty() {
            return Err(ValidationError::MissingField(format!("holdings[{}].ticker", index)).into());
        }
        let field = |name: &str| format!("holdings[{}].{}", index, name);
        ValidationError::check_non_negative(field("shares"), self.shares)?;
        ValidationError::check_non_negative(field("costBasis"), self.cost_basis)?;
        ValidationError::check_non_negative(field("currentPrice"), self.current_price)?;
        ValidationError::check_non_negative(field("annualYield"), self.annual_yield)?;
        if self.annual_yield > 1.0 {
            return Err(ValidationError::InvalidInput(format!(
                "{} must be a fraction not above 1.0 (got {})",
                field("annualYield"),
                self.annual_yield
            ))
            .into());
        }
        ValidationError::check_finite(field("marketValue"), self.market_value())?;
        ValidationError::check_finite(field("costValue"), self.cost_value())?;
        Ok(())
    }
}

/// Ordered set of holdings. Aggregates are always derived, never stored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Portfolio {
    pub holdings: Vec<Holding>,
}

impl Portfolio {
    pub fn new(holdings: Vec<Holding>) -> Self {
        Self { holdings }
    }

    pub fn is_empty(&self) -> bool {
        self.holdings.is_empty() || self.total_value() <= 0.0
    }

    pub fn total_value(&self) -> f64 {
        self.holdings.iter().map(Holding::market_value).sum()
    }

    pub fn total_cost_basis(&self) -> f64 {
        self.holdings.iter().map(Holding::cost_value).sum()
    }

    pub fn annual_dividend_income(&self) -> f64 {
        self.holdings.iter().map(Holding::annual_income).sum()
    }

    /// Income-weighted yield of the whole portfolio. Zero for an empty portfolio.
    pub fn portfolio_yield(&self) -> f64 {
        safe_div(self.annual_dividend_income(), self.total_value(), 0.0)
    }

    /// Each holding's fraction of total value, in holding order.
    /// Empty when the portfolio has no value.
    pub fn weights(&self) -> Vec<f64> {
        let total = self.total_value();
        if total <= 0.0 {
            return Vec::new();
        }
        self.holdings
            .iter()
            .map(|h| h.market_value() / total)
            .collect()
    }

    /// Value weights aggregated by sector, keyed alphabetically.
    pub fn sector_weights(&self) -> BTreeMap<String, f64> {
        let mut out = BTreeMap::new();
        for (holding, weight) in self.holdings.iter().zip(self.weights()) {
            *out.entry(holding.sector.clone()).or_insert(0.0) += weight;
        }
        out
    }

    /// HHI over position weights. `None` when the portfolio has no value.
    pub fn herfindahl_index(&self) -> Option<f64> {
        herfindahl(&self.weights())
    }

    /// HHI over sector weights. `None` when the portfolio has no value.
    pub fn sector_herfindahl_index(&self) -> Option<f64> {
        let weights: Vec<f64> = self.sector_weights().into_values().collect();
        herfindahl(&weights)
    }

    /// Market value held inside tax-advantaged accounts.
    pub fn tax_advantaged_value(&self) -> f64 {
        self.holdings
            .iter()
            .filter(|h| h.account_type.is_tax_advantaged())
            .map(Holding::market_value)
            .sum()
    }

    /// Validates every holding. Fails on the first malformed field.
    pub fn validate(&self) -> Result<()> {
        for (index, holding) in self.holdings.iter().enumerate() {
            holding.validate(index)?;
        }
        ValidationError::check_finite("totalValue", self.total_value())?;
        ValidationError::check_finite("totalCostBasis", self.total_cost_basis())?;
        Ok(())
    }
}
