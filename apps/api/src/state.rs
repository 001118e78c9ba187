use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;

use crate::config::Config;
use crate::llm_client::RetryPolicy;
use crate::screening::analyzer::{CandidateAnalyzer, ScorePolicy, ScoringBackend};
use crate::screening::classifier::Threshold;
use crate::screening::pipeline::{PipelineSettings, ScreeningPipeline};
use crate::store::JobStore;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<ScreeningPipeline>,
    pub config: Config,
}

impl AppState {
    /// Wires the pipeline from configuration. The scoring backend and the
    /// store are passed in so the same wiring serves production and tests.
    pub fn new(
        config: Config,
        backend: Arc<dyn ScoringBackend>,
        store: Arc<dyn JobStore>,
    ) -> Result<Self> {
        let retry = RetryPolicy {
            max_retries: config.ai_max_retries,
            base_backoff: Duration::from_millis(config.ai_backoff_ms),
        };
        let score_policy = if config.clamp_scores {
            ScorePolicy::Clamp
        } else {
            ScorePolicy::Strict
        };
        let analyzer = CandidateAnalyzer::new(backend, retry, score_policy);

        let settings = PipelineSettings {
            default_threshold: Threshold::new(config.screening_threshold)?,
            max_concurrency: config.max_concurrency,
            max_files: config.max_files,
            max_file_bytes: config.max_file_bytes,
            retain_extracted_text: true,
        };

        Ok(Self {
            pipeline: Arc::new(ScreeningPipeline::new(Arc::new(analyzer), store, settings)),
            config,
        })
    }
}
