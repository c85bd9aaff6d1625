use async_trait::async_trait;

use super::{EngineConfig, EvaluationInputs, IntelligenceReport};
use crate::errors::Result;

/// Trait for portfolio intelligence service operations
#[async_trait]
pub trait IntelligenceServiceTrait: Send + Sync {
    /// Evaluates the pipeline. With a seed (given here or configured) the
    /// result is deterministic and memoized.
    async fn evaluate(
        &self,
        inputs: EvaluationInputs,
        seed: Option<u64>,
    ) -> Result<IntelligenceReport>;
    async fn get_config(&self) -> EngineConfig;
    async fn update_config(&self, config: EngineConfig) -> Result<()>;
    fn clear_cache(&self);
    fn cached_reports(&self) -> usize;
}
