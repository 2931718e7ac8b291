// 🏭 Pipeline Stages - timestamp → sanitize → normalize
//
// Each stage is a plain transformation plus the modifiers it always runs
// with. The transformations are usable on their own; the `*_stage`
// constructors attach the modifiers.

use crate::config::{FallbackContext, LookupPolicy, PipelineConfig};
use crate::error::{LookupError, LookupKind, PipelineResult, ValidationError};
use crate::event::{
    EventWithProcessingTimestamp, NormalizedContext, NormalizedEvent, RawEvent, SanitizedData,
    SanitizedEvent,
};
use crate::function::DecoratableFunction;
use crate::lookup::ContextResolver;
use crate::modifier::{LogDetail, Logger, Timer, Validator};
use crate::sink::SharedSink;
use chrono::Utc;
use std::sync::Arc;

pub const TIMESTAMP_STAGE: &str = "timestamp";
pub const SANITIZE_STAGE: &str = "sanitize";
pub const NORMALIZE_STAGE: &str = "normalize";

const PROCESSED_AT_RULE: &str = "processed_at_required";

pub type TimestampStage = DecoratableFunction<RawEvent, EventWithProcessingTimestamp>;
pub type SanitizeStage = DecoratableFunction<EventWithProcessingTimestamp, SanitizedEvent>;
pub type NormalizeStage = DecoratableFunction<SanitizedEvent, NormalizedEvent>;

// ============================================================================
// TRANSFORMATIONS
// ============================================================================

/// Attach the pipeline's wall-clock pickup time
pub fn add_processing_timestamp(raw: RawEvent) -> EventWithProcessingTimestamp {
    EventWithProcessingTimestamp::stamped(raw, Utc::now())
}

/// Replace credentials with presence flags.
///
/// The credential values are dropped with the input; the output type has
/// nowhere to hold them. Credentials on an action that should not carry
/// them are sanitized the same way and reported with a warning.
pub fn sanitize_event(event: EventWithProcessingTimestamp) -> PipelineResult<SanitizedEvent> {
    let processed_at = event.processed_at.ok_or_else(|| {
        ValidationError::new(SANITIZE_STAGE, PROCESSED_AT_RULE, "event was never timestamped")
    })?;

    if event.has_unexpected_credentials() {
        tracing::warn!(
            action = %event.envelope.action,
            user_id = %event.envelope.identity.user_id,
            "credentials attached to an action that does not carry them"
        );
    }

    let sanitized_data = SanitizedData::from_sensitive(event.sensitive_data.as_ref());

    Ok(SanitizedEvent {
        envelope: event.envelope,
        processed_at,
        sanitized_data,
    })
}

/// Derives region, timezone and locale for an event
#[derive(Clone)]
pub struct Normalizer {
    resolver: Arc<dyn ContextResolver>,
    policy: LookupPolicy,
    fallback: FallbackContext,
}

impl Normalizer {
    pub fn new(resolver: Arc<dyn ContextResolver>, policy: LookupPolicy, fallback: FallbackContext) -> Self {
        Normalizer {
            resolver,
            policy,
            fallback,
        }
    }

    pub fn from_config(config: &PipelineConfig, resolver: Arc<dyn ContextResolver>) -> Self {
        Self::new(resolver, config.lookup_policy, config.fallback.clone())
    }

    pub fn normalize(&self, event: SanitizedEvent) -> PipelineResult<NormalizedEvent> {
        let ip = &event.envelope.context.ip_address;
        let os = &event.envelope.device.os;

        let region = self.resolve(LookupKind::Region, ip, self.resolver.region_of(ip), &self.fallback.region)?;
        let timezone = self.resolve(
            LookupKind::Timezone,
            ip,
            self.resolver.timezone_of(ip),
            &self.fallback.timezone,
        )?;
        let locale = self.resolve(LookupKind::Locale, os, self.resolver.locale_of(os), &self.fallback.locale)?;

        Ok(NormalizedEvent {
            sanitized: event,
            normalized_context: NormalizedContext {
                region,
                timezone,
                locale,
            },
        })
    }

    /// Apply the lookup policy to one resolver answer. Blank answers count
    /// as unresolved.
    fn resolve(
        &self,
        kind: LookupKind,
        input: &str,
        lookup: Result<String, LookupError>,
        fallback: &str,
    ) -> PipelineResult<String> {
        let error = match lookup {
            Ok(value) if !value.trim().is_empty() => return Ok(value),
            Ok(_) => LookupError::Unresolved {
                kind,
                input: input.to_string(),
            },
            Err(e) => e,
        };

        match self.policy {
            LookupPolicy::Strict => Err(error.into()),
            LookupPolicy::Fallback => {
                tracing::warn!(kind = %kind, error = %error, fallback, "lookup failed, using fallback");
                Ok(fallback.to_string())
            }
        }
    }
}

// ============================================================================
// CONFIGURED STAGES
// ============================================================================

/// Timestamp stage: Logger, then Timer
pub fn timestamp_stage(sink: &SharedSink, detail: LogDetail) -> TimestampStage {
    DecoratableFunction::new(TIMESTAMP_STAGE, add_processing_timestamp)
        .with(Logger::new(TIMESTAMP_STAGE, Arc::clone(sink)).with_detail(detail))
        .with(Timer::new(TIMESTAMP_STAGE, Arc::clone(sink)))
}

/// Sanitize stage: Logger, then a Validator requiring `processed_at`.
///
/// The Validator is outermost, so a rejected event leaves no log entries.
pub fn sanitize_stage(sink: &SharedSink, detail: LogDetail) -> SanitizeStage {
    DecoratableFunction::fallible(SANITIZE_STAGE, sanitize_event)
        .with(Logger::new(SANITIZE_STAGE, Arc::clone(sink)).with_detail(detail))
        .with(Validator::new(
            SANITIZE_STAGE,
            PROCESSED_AT_RULE,
            |event: &EventWithProcessingTimestamp| event.is_timestamped(),
        ))
}

/// Normalize stage: Logger, then Timer
pub fn normalize_stage(sink: &SharedSink, detail: LogDetail, normalizer: Normalizer) -> NormalizeStage {
    let normalize = move |event: SanitizedEvent| normalizer.normalize(event);
    DecoratableFunction::fallible(NORMALIZE_STAGE, normalize)
        .with(Logger::new(NORMALIZE_STAGE, Arc::clone(sink)).with_detail(detail))
        .with(Timer::new(NORMALIZE_STAGE, Arc::clone(sink)))
}

// ============================================================================
// TESTS
// ============================================================================
