// 🔗 Event Pipeline - RawEvent in, NormalizedEvent out
//
// Stages are built once in `new` and only read afterwards, so a pipeline can
// be shared across threads and run concurrently. A run is all-or-nothing:
// the first failing stage ends it and nothing partial is returned.

use crate::config::PipelineConfig;
use crate::error::PipelineResult;
use crate::event::{NormalizedEvent, RawEvent};
use crate::lookup::ContextResolver;
use crate::sink::SharedSink;
use crate::stages::{
    normalize_stage, sanitize_stage, timestamp_stage, NormalizeStage, Normalizer, SanitizeStage,
    TimestampStage,
};
use std::sync::Arc;
use uuid::Uuid;

pub struct EventPipeline {
    timestamp: TimestampStage,
    sanitize: SanitizeStage,
    normalize: NormalizeStage,
}

impl EventPipeline {
    pub fn new(config: &PipelineConfig, sink: SharedSink, resolver: Arc<dyn ContextResolver>) -> Self {
        let detail = config.log_detail();
        let normalizer = Normalizer::from_config(config, resolver);

        EventPipeline {
            timestamp: timestamp_stage(&sink, detail),
            sanitize: sanitize_stage(&sink, detail),
            normalize: normalize_stage(&sink, detail, normalizer),
        }
    }

    /// Default config with the resolver built from its rules
    pub fn with_defaults(sink: SharedSink) -> Self {
        let config = PipelineConfig::default();
        let resolver = Arc::new(config.resolver());
        Self::new(&config, sink, resolver)
    }

    /// Build from a config, using the rule-based resolver it describes
    pub fn from_config(config: &PipelineConfig, sink: SharedSink) -> Self {
        let resolver = Arc::new(config.resolver());
        Self::new(config, sink, resolver)
    }

    /// Run one event through timestamp → sanitize → normalize
    pub fn run(&self, raw: RawEvent) -> PipelineResult<NormalizedEvent> {
        let run_id = Uuid::new_v4();
        let span = tracing::info_span!(
            "pipeline_run",
            %run_id,
            user_id = %raw.envelope.identity.user_id,
            action = %raw.envelope.action
        );
        let _guard = span.enter();

        let result = self
            .timestamp
            .execute(raw)
            .and_then(|event| self.sanitize.execute(event))
            .and_then(|event| self.normalize.execute(event));

        match &result {
            Ok(event) => tracing::info!(region = %event.normalized_context.region, "event processed"),
            Err(e) => tracing::warn!(error = %e, "event rejected"),
        }

        result
    }

    pub fn stage_names(&self) -> [&str; 3] {
        [self.timestamp.name(), self.sanitize.name(), self.normalize.name()]
    }

    /// One line per stage with its modifiers, in execution order
    pub fn describe(&self) -> Vec<String> {
        vec![
            self.timestamp.describe(),
            self.sanitize.describe(),
            self.normalize.describe(),
        ]
    }
}

// ============================================================================
// TESTS
// ============================================================================
