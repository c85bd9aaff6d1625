use serde::{Deserialize, Serialize};

use crate::errors::{Result, ValidationError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[derive(Default)]
pub enum RiskTolerance {
    Conservative,
    #[default]
    Moderate,
    Aggressive,
}

fn default_true() -> bool {
    true
}

/// Marginal tax rates as fractions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaxProfile {
    pub federal_rate: f64,
    pub state_rate: f64,
    pub capital_gains_rate: f64,
    /// Investment interest is only deductible when itemizing
    #[serde(default = "default_true")]
    pub itemizes_deductions: bool,
}

impl TaxProfile {
    /// Combined marginal rate on ordinary income.
    pub fn ordinary_rate(&self) -> f64 {
        self.federal_rate + self.state_rate
    }

    /// Combined marginal rate on qualified dividends and long-term gains.
    pub fn qualified_rate(&self) -> f64 {
        self.capital_gains_rate + self.state_rate
    }
}

impl Default for TaxProfile {
    fn default() -> Self {
        Self {
            federal_rate: 0.22,
            state_rate: 0.05,
            capital_gains_rate: 0.15,
            itemizes_deductions: true,
        }
    }
}

fn default_coverage() -> f64 {
    1.0
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IncomeGoals {
    pub monthly_expenses: f64,
    /// Share of expenses dividends should cover (1.0 = fully covered)
    #[serde(default = "default_coverage")]
    pub target_coverage_ratio: f64,
    /// Explicit portfolio value goal; derived from expenses when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_portfolio_value: Option<f64>,
}

impl Default for IncomeGoals {
    fn default() -> Self {
        Self {
            monthly_expenses: 0.0,
            target_coverage_ratio: 1.0,
            target_portfolio_value: None,
        }
    }
}

impl IncomeGoals {
    pub fn annual_income_need(&self) -> f64 {
        self.monthly_expenses * 12.0 * self.target_coverage_ratio
    }

    /// Portfolio value that would meet the goal.
    ///
    /// Uses the explicit target when present, otherwise capitalizes the annual
    /// income need at `max(portfolio_yield, safe_withdrawal_rate)`.
    pub fn target_value(&self, portfolio_yield: f64, safe_withdrawal_rate: f64) -> f64 {
        if let Some(target) = self.target_portfolio_value {
            return target.max(0.0);
        }
        let need = self.annual_income_need();
        if need <= 0.0 {
            return 0.0;
        }
        let rate = portfolio_yield.max(safe_withdrawal_rate);
        if rate <= 0.0 {
            return 0.0;
        }
        need / rate
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarginAccount {
    /// Outstanding margin loan
    pub used: f64,
    /// Total borrowing capacity
    pub available: f64,
    /// Annual interest rate as a fraction
    pub rate: f64,
    #[serde(default = "default_days_outstanding")]
    pub days_outstanding: u32,
}

fn default_days_outstanding() -> u32 {
    30
}

impl Default for MarginAccount {
    fn default() -> Self {
        Self {
            used: 0.0,
            available: 0.0,
            rate: 0.0,
            days_outstanding: default_days_outstanding(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    #[serde(default)]
    pub tax_profile: TaxProfile,
    #[serde(default)]
    pub goals: IncomeGoals,
    #[serde(default)]
    pub margin: MarginAccount,
    #[serde(default)]
    pub risk_tolerance: RiskTolerance,
}

impl User {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            tax_profile: TaxProfile::default(),
            goals: IncomeGoals::default(),
            margin: MarginAccount::default(),
            risk_tolerance: RiskTolerance::default(),
        }
    }

    pub fn with_margin(mut self, used: f64, available: f64, rate: f64) -> Self {
        self.margin.used = used;
        self.margin.available = available;
        self.margin.rate = rate;
        self
    }

    pub fn with_monthly_expenses(mut self, monthly_expenses: f64) -> Self {
        self.goals.monthly_expenses = monthly_expenses;
        self
    }

    pub fn with_tax_profile(mut self, tax_profile: TaxProfile) -> Self {
        self.tax_profile = tax_profile;
        self
    }

    pub fn validate(&self) -> Result<()> {
        let tax = &self.tax_profile;
        ValidationError::check_rate("user.taxProfile.federalRate", tax.federal_rate)?;
        ValidationError::check_rate("user.taxProfile.stateRate", tax.state_rate)?;
        ValidationError::check_rate("user.taxProfile.capitalGainsRate", tax.capital_gains_rate)?;
        if tax.ordinary_rate() >= 1.0 {
            return Err(ValidationError::InvalidInput(
                "combined federal and state rate must be below 1.0".to_string(),
            )
            .into());
        }

        ValidationError::check_non_negative("user.goals.monthlyExpenses", self.goals.monthly_expenses)?;
        ValidationError::check_non_negative(
            "user.goals.targetCoverageRatio",
            self.goals.target_coverage_ratio,
        )?;
        if let Some(target) = self.goals.target_portfolio_value {
            ValidationError::check_non_negative("user.goals.targetPortfolioValue", target)?;
        }

        ValidationError::check_non_negative("user.margin.used", self.margin.used)?;
        ValidationError::check_non_negative("user.margin.available", self.margin.available)?;
        ValidationError::check_non_negative("user.margin.rate", self.margin.rate)?;
        Ok(())
    }
}
