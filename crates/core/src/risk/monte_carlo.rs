//! Geometric Brownian motion simulation of portfolio value.

use rand::Rng;
use rand_distr::StandardNormal;
use rayon::prelude::*;

use super::{MonteCarloConfig, MonteCarloProjection};
use crate::utils::rng::stream_rng;
use crate::utils::stats::{mean, percentile_sorted, safe_div, sorted};

#[derive(Debug, Clone, Copy)]
struct PathOutcome {
    terminal: f64,
    max_drawdown: f64,
}

/// Simulates independent value paths in parallel.
///
/// Path `i` draws from its own RNG stream derived from `(seed, i)`, and the
/// outcomes are collected in path order, so a seed fully determines the result.
#[derive(Debug, Clone, Default)]
pub struct MonteCarloSimulator {
    config: MonteCarloConfig,
}

impl MonteCarloSimulator {
    pub fn new(config: MonteCarloConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &MonteCarloConfig {
        &self.config
    }

    pub fn simulate(
        &self,
        starting_value: f64,
        annual_return: f64,
        annual_volatility: f64,
        goal_value: f64,
        seed: u64,
    ) -> MonteCarloProjection {
        let paths = self.config.paths.max(1);
        let steps = self.config.total_steps().max(1);
        let dt = 1.0 / self.config.steps_per_year.max(1) as f64;
        let sigma = annual_volatility.max(0.0);
        let drift = (annual_return - sigma * sigma / 2.0) * dt;
        let diffusion = sigma * dt.sqrt();

        let outcomes: Vec<PathOutcome> = if starting_value > 0.0 {
            (0..paths)
                .into_par_iter()
                .map(|i| {
                    let mut rng = stream_rng(seed, i as u64);
                    let mut value = starting_value;
                    let mut peak = starting_value;
                    let mut max_drawdown: f64 = 0.0;
                    for _ in 0..steps {
                        let z: f64 = rng.sample(StandardNormal);
                        value *= (drift + diffusion * z).exp();
                        if value > peak {
                            peak = value;
                        } else {
                            max_drawdown = max_drawdown.max(1.0 - value / peak);
                        }
                    }
                    PathOutcome {
                        terminal: value,
                        max_drawdown,
                    }
                })
                .collect()
        } else {
            vec![
                PathOutcome {
                    terminal: 0.0,
                    max_drawdown: 0.0,
                };
                paths
            ]
        };

        let terminals: Vec<f64> = outcomes.iter().map(|o| o.terminal).collect();
        let drawdowns = sorted(&outcomes.iter().map(|o| o.max_drawdown).collect::<Vec<_>>());
        let ranked = sorted(&terminals);
        let n = paths as f64;

        let successes = terminals.iter().filter(|v| **v >= goal_value).count() as f64;
        let losses = terminals
            .iter()
            .filter(|v| **v < starting_value)
            .count() as f64;

        MonteCarloProjection {
            paths,
            horizon_years: self.config.horizon_years,
            starting_value,
            annual_return,
            annual_volatility: sigma,
            goal_value,
            percentile_5: percentile_sorted(&ranked, 5.0),
            percentile_25: percentile_sorted(&ranked, 25.0),
            percentile_50: percentile_sorted(&ranked, 50.0),
            percentile_75: percentile_sorted(&ranked, 75.0),
            percentile_95: percentile_sorted(&ranked, 95.0),
            mean_terminal_value: mean(&terminals),
            probability_of_success: safe_div(successes, n, 0.0),
            probability_of_loss: safe_div(losses, n, 0.0),
            median_max_drawdown: percentile_sorted(&drawdowns, 50.0),
        }
    }
}
