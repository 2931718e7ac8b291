// Event Enrichment Pipeline - Core Library
// Exposes all modules for use in the CLI, API server, and tests

pub mod config;     // Lookup policy, fallbacks, resolver rules
pub mod error;      // ValidationError, LookupError, PipelineError
pub mod event;      // One record type per stage
pub mod function;   // Decoratable Function
pub mod lookup;     // Region / timezone / locale resolution
pub mod modifier;   // Logger, Timer, Validator
pub mod pipeline;   // timestamp → sanitize → normalize
pub mod samples;    // Fixture events
pub mod sink;       // Log sink trait + implementations
pub mod stages;     // Stage transformations and their modifier sets

// Re-export commonly used types
pub use config::{FallbackContext, LookupPolicy, PipelineConfig, LOG_ENV};
pub use error::{LookupError, LookupKind, PipelineError, PipelineResult, ValidationError};
pub use event::{
    DeviceContext, EventAction, EventEnvelope, EventWithProcessingTimestamp, NormalizedContext,
    NormalizedEvent, ProcessedEvent, RawEvent, RawEventContext, SanitizedData, SanitizedEvent,
    SensitiveData, UserIdentity,
};
pub use function::DecoratableFunction;
pub use lookup::{ContextResolver, GeoRule, LocaleRule, ResolverRules, StaticResolver};
pub use modifier::{Callable, LogDetail, Logger, Modifier, Timer, Validator};
pub use pipeline::EventPipeline;
pub use sink::{LogEntry, LogSink, MemorySink, SharedSink, TracingSink};
pub use stages::{
    add_processing_timestamp, normalize_stage, sanitize_event, sanitize_stage, timestamp_stage,
    Normalizer,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize tracing from `EVENT_PIPELINE_LOG`, defaulting to "info".
///
/// Meant for binaries; calling it twice panics.
pub fn init_tracing() {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_env(LOG_ENV)
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
