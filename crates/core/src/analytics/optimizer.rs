//! Long-only Sharpe maximization by multi-start simulated annealing.
//!
//! Each start walks the capped simplex by moving a random amount of weight
//! from one asset to another. Worse moves are accepted with probability
//! `exp(Δ / T)` while the temperature cools geometrically. The best point
//! ever visited is kept, so the result is never worse than any start, and
//! the equal-weight portfolio is always one of the starts.

use rand::rngs::StdRng;
use rand::Rng;
use rayon::prelude::*;

use super::{AllocationTarget, OptimizationResult, OptimizerConfig};
use crate::portfolio::ReturnModel;
use crate::utils::rng::stream_rng;
use crate::utils::stats::safe_div;

#[derive(Debug, Clone)]
struct Candidate {
    weights: Vec<f64>,
    sharpe: f64,
}

#[derive(Debug, Clone, Default)]
pub struct PortfolioOptimizer {
    config: OptimizerConfig,
}

impl PortfolioOptimizer {
    pub fn new(config: OptimizerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &OptimizerConfig {
        &self.config
    }

    /// `current_weights` may be empty (portfolio without value); equal
    /// weights stand in for it then.
    pub fn optimize(
        &self,
        model: &ReturnModel,
        current_weights: &[f64],
        risk_free_rate: f64,
        seed: u64,
    ) -> OptimizationResult {
        let n = model.len();
        if n == 0 {
            return OptimizationResult {
                expected_return: 0.0,
                expected_volatility: 0.0,
                sharpe_ratio: 0.0,
                quantum_advantage: 0.0,
                baseline_sharpe: 0.0,
                current_expected_return: 0.0,
                current_volatility: 0.0,
                current_sharpe: 0.0,
                target_allocation: Vec::new(),
                iterations: 0,
            };
        }

        let cap = self.config.max_weight.max(1.0 / n as f64);
        let equal = vec![1.0 / n as f64; n];
        let current = if current_weights.len() == n {
            current_weights.to_vec()
        } else {
            equal.clone()
        };

        let objective = |w: &[f64]| sharpe(model, w, risk_free_rate);
        let baseline_sharpe = objective(&equal);

        // Stream 0 and 1 are the deterministic starts.
        let starts = 2 + self.config.random_starts;
        let best = (0..starts)
            .into_par_iter()
            .map(|k| {
                let mut rng = stream_rng(seed, k as u64);
                let start = match k {
                    0 => equal.clone(),
                    1 => project_to_capped_simplex(&current, cap),
                    _ => random_point(&mut rng, n, cap),
                };
                self.anneal(start, cap, &mut rng, &objective)
            })
            .collect::<Vec<Candidate>>()
            .into_iter()
            .fold(None::<Candidate>, |best, c| match best {
                Some(b) if b.sharpe >= c.sharpe => Some(b),
                _ => Some(c),
            })
            .unwrap_or(Candidate {
                sharpe: baseline_sharpe,
                weights: equal.clone(),
            });

        let quantum_advantage = if baseline_sharpe != 0.0 {
            (best.sharpe - baseline_sharpe) / baseline_sharpe.abs()
        } else {
            0.0
        };

        let target_allocation = model
            .assets
            .iter()
            .zip(&best.weights)
            .zip(&current)
            .map(|((asset, target), current)| AllocationTarget {
                ticker: asset.ticker.clone(),
                current_weight: *current,
                target_weight: *target,
            })
            .collect();

        OptimizationResult {
            expected_return: model.portfolio_return(&best.weights),
            expected_volatility: model.portfolio_volatility(&best.weights),
            sharpe_ratio: best.sharpe,
            quantum_advantage,
            baseline_sharpe,
            current_expected_return: model.portfolio_return(&current),
            current_volatility: model.portfolio_volatility(&current),
            current_sharpe: objective(&current),
            target_allocation,
            iterations: starts * self.config.iterations,
        }
    }

    fn anneal<F>(&self, start: Vec<f64>, cap: f64, rng: &mut StdRng, objective: &F) -> Candidate
    where
        F: Fn(&[f64]) -> f64,
    {
        let n = start.len();
        let mut current_sharpe = objective(&start);
        let mut best = Candidate {
            weights: start.clone(),
            sharpe: current_sharpe,
        };
        if n < 2 {
            return best;
        }

        let mut weights = start;
        let mut temperature = self.config.initial_temperature;
        for _ in 0..self.config.iterations {
            let from = rng.gen_range(0..n);
            let to = (from + rng.gen_range(1..n)) % n;
            let room = weights[from].min(cap - weights[to]);
            if room > 0.0 {
                let delta = rng.gen::<f64>() * self.config.step_size.min(room);
                weights[from] -= delta;
                weights[to] += delta;

                let candidate = objective(&weights);
                let improvement = candidate - current_sharpe;
                let accept =
                    improvement >= 0.0 || rng.gen::<f64>() < (improvement / temperature).exp();
                if accept {
                    current_sharpe = candidate;
                    if candidate > best.sharpe {
                        best = Candidate {
                            weights: weights.clone(),
                            sharpe: candidate,
                        };
                    }
                } else {
                    weights[from] += delta;
                    weights[to] -= delta;
                }
            }
            temperature *= self.config.cooling_rate;
        }
        best
    }
}

/// `(return - rf) / volatility`; 0 when volatility is 0.
pub fn sharpe(model: &ReturnModel, weights: &[f64], risk_free_rate: f64) -> f64 {
    let volatility = model.portfolio_volatility(weights);
    safe_div(model.portfolio_return(weights) - risk_free_rate, volatility, 0.0)
}

/// Normalizes `weights` to sum to 1 and caps each at `cap`, redistributing
/// the excess over uncapped assets. `cap` must be at least `1/N`.
fn project_to_capped_simplex(weights: &[f64], cap: f64) -> Vec<f64> {
    let n = weights.len();
    let total: f64 = weights.iter().map(|w| w.max(0.0)).sum();
    if total <= 0.0 {
        return vec![1.0 / n as f64; n];
    }
    let mut out: Vec<f64> = weights.iter().map(|w| w.max(0.0) / total).collect();
    for _ in 0..n {
        let excess: f64 = out.iter().map(|w| (w - cap).max(0.0)).sum();
        if excess <= 1e-12 {
            break;
        }
        let uncapped: Vec<usize> = (0..n).filter(|i| out[*i] < cap).collect();
        if uncapped.is_empty() {
            break;
        }
        let room: f64 = uncapped.iter().map(|i| out[*i]).sum();
        let slots = uncapped.len() as f64;
        for w in out.iter_mut() {
            *w = w.min(cap);
        }
        for i in uncapped {
            let share = if room > 0.0 { out[i] / room } else { 1.0 / slots };
            out[i] += excess * share;
        }
    }
    out
}

fn random_point(rng: &mut StdRng, n: usize, cap: f64) -> Vec<f64> {
    let raw: Vec<f64> = (0..n).map(|_| -rng.gen::<f64>().max(f64::MIN_POSITIVE).ln()).collect();
    project_to_capped_simplex(&raw, cap)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_projection_respects_cap_and_sum() {
        let out = project_to_capped_simplex(&[0.7, 0.2, 0.1, 0.0], 0.4);
        assert!((out.iter().sum::<f64>() - 1.0).abs() < 1e-9);
        assert!(out.iter().all(|w| *w <= 0.4 + 1e-9 && *w >= 0.0));
    }

    #[test]
    fn test_projection_of_zero_weights_is_equal() {
        let out = project_to_capped_simplex(&[0.0, 0.0], 0.5);
        assert_eq!(out, vec![0.5, 0.5]);
    }
}
