//! Async front end for the intelligence pipeline.
//!
//! Evaluation is CPU-bound, so it runs on tokio's blocking pool. Seeded
//! requests are pure and are memoized by fingerprint.

use async_trait::async_trait;
use dashmap::DashMap;
use log::{debug, info};
use std::sync::Arc;
use tokio::sync::RwLock;

use super::intelligence_engine::fingerprint;
use super::{
    EngineConfig, EvaluationInputs, IntelligenceEngine, IntelligenceReport,
    IntelligenceServiceTrait,
};
use crate::errors::{Error, Result};

pub struct IntelligenceService {
    config: RwLock<EngineConfig>,
    cache: DashMap<String, Arc<IntelligenceReport>>,
}

impl Default for IntelligenceService {
    fn default() -> Self {
        Self {
            config: RwLock::new(EngineConfig::default()),
            cache: DashMap::new(),
        }
    }
}

impl IntelligenceService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: EngineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config: RwLock::new(config),
            cache: DashMap::new(),
        })
    }
}

#[async_trait]
impl IntelligenceServiceTrait for IntelligenceService {
    async fn evaluate(
        &self,
        inputs: EvaluationInputs,
        seed: Option<u64>,
    ) -> Result<IntelligenceReport> {
        let config = self.config.read().await.clone();
        let fixed_seed = seed.or(config.seed);

        let key = match fixed_seed {
            Some(seed) => {
                let key = fingerprint(&inputs, &config, seed)?;
                if let Some(hit) = self.cache.get(&key) {
                    debug!("Intelligence cache hit {}", &key[..12]);
                    return Ok(hit.as_ref().clone());
                }
                Some(key)
            }
            None => None,
        };
        let seed = fixed_seed.unwrap_or_else(rand::random);
        let capacity = config.cache_capacity;

        let report = tokio::task::spawn_blocking(move || {
            IntelligenceEngine::with_config(config)?.evaluate(&inputs, seed)
        })
        .await
        .map_err(|e| Error::Unexpected(format!("evaluation task failed: {}", e)))??;

        if let Some(key) = key {
            if capacity > 0 {
                if self.cache.len() >= capacity {
                    self.cache.clear();
                }
                self.cache.insert(key, Arc::new(report.clone()));
            }
        }
        Ok(report)
    }

    async fn get_config(&self) -> EngineConfig {
        self.config.read().await.clone()
    }

    async fn update_config(&self, config: EngineConfig) -> Result<()> {
        config.validate()?;
        *self.config.write().await = config;
        self.cache.clear();
        info!("Intelligence engine configuration updated");
        Ok(())
    }

    fn clear_cache(&self) {
        self.cache.clear();
    }

    fn cached_reports(&self) -> usize {
        self.cache.len()
    }
}
