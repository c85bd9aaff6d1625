/// Trading days per year used for annualization
pub const TRADING_DAYS_PER_YEAR: u32 = 252;

/// Day-count basis brokers use for margin interest (actual/360)
pub const MARGIN_DAY_COUNT_BASIS: f64 = 360.0;

/// VIX level treated as a "normal" volatility regime
pub const BASELINE_VIX: f64 = 20.0;

/// Standard normal quantile for the 10th percentile
pub const Z_P10: f64 = -1.281_551_565_545;

/// Standard normal quantile for the 90th percentile
pub const Z_P90: f64 = 1.281_551_565_545;

/// Tolerance used when comparing configured weights against 1.0
pub const WEIGHT_SUM_TOLERANCE: f64 = 1e-6;

/// Section 199A deduction applied to qualified REIT dividends
pub const SECTION_199A_DEDUCTION: f64 = 0.20;

/// Withdrawal rate used to capitalize an income need into a portfolio goal
/// when the portfolio yields less
pub const SAFE_WITHDRAWAL_RATE: f64 = 0.04;

/// Smallest Monte Carlo path count accepted by engine configuration
pub const MIN_MONTE_CARLO_PATHS: usize = 1_000;
