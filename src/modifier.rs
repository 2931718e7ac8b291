// 🧩 Behavior Modifiers - Logging, timing and validation around a callable
//
// A modifier takes the current callable and returns a new one with the same
// signature. Wrapping is one-directional: the inner callable is kept alive
// inside the new closure and is never handed back.

use crate::error::{PipelineResult, ValidationError};
use crate::sink::{LogEntry, SharedSink};
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Instant;

/// A transformation step whose failures are pipeline errors
pub type Callable<I, O> = Arc<dyn Fn(I) -> PipelineResult<O> + Send + Sync>;

/// Wraps a callable in added behavior without changing its signature.
///
/// The most recently applied modifier becomes the outermost layer.
pub trait Modifier<I, O>: Send + Sync {
    fn name(&self) -> &str;

    fn wrap(&self, inner: Callable<I, O>) -> Callable<I, O>;
}

// ============================================================================
// LOGGER
// ============================================================================

/// How much of a value the Logger writes to the sink
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogDetail {
    /// The full serialized value
    #[default]
    Full,
    /// Only the top-level field names
    FieldsOnly,
}

impl LogDetail {
    fn render<T: Serialize>(&self, value: &T) -> Value {
        let full = match serde_json::to_value(value) {
            Ok(v) => v,
            Err(e) => return json!({ "unserializable": e.to_string() }),
        };

        match (self, full) {
            (LogDetail::Full, v) => v,
            (LogDetail::FieldsOnly, Value::Object(map)) => {
                json!({ "fields": map.keys().cloned().collect::<Vec<_>>() })
            }
            (LogDetail::FieldsOnly, other) => json!({ "fields": [], "kind": kind_of(&other) }),
        }
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Records the input before the call and the output after it
pub struct Logger {
    label: String,
    sink: SharedSink,
    detail: LogDetail,
}

impl Logger {
    pub fn new(label: &str, sink: SharedSink) -> Self {
        Logger {
            label: label.to_string(),
            sink,
            detail: LogDetail::Full,
        }
    }

    pub fn with_detail(mut self, detail: LogDetail) -> Self {
        self.detail = detail;
        self
    }
}

impl<I, O> Modifier<I, O> for Logger
where
    I: Serialize + 'static,
    O: Serialize + 'static,
{
    fn name(&self) -> &str {
        "logger"
    }

    fn wrap(&self, inner: Callable<I, O>) -> Callable<I, O> {
        let stage = self.label.clone();
        let input_label = format!("{}.input", self.label);
        let output_label = format!("{}.output", self.label);
        let sink = Arc::clone(&self.sink);
        let detail = self.detail;

        Arc::new(move |input: I| {
            sink.record(LogEntry::new(input_label.as_str(), detail.render(&input)));

            let result = inner(input);

            match &result {
                Ok(output) => {
                    sink.record(LogEntry::new(output_label.as_str(), detail.render(output)))
                }
                Err(e) => tracing::warn!(stage = %stage, error = %e, "stage failed, no output logged"),
            }

            result
        })
    }
}

// ============================================================================
// TIMER
// ============================================================================

/// Records how long the wrapped callable took, failures included
pub struct Timer {
    label: String,
    sink: SharedSink,
}

impl Timer {
    pub fn new(label: &str, sink: SharedSink) -> Self {
        Timer {
            label: label.to_string(),
            sink,
        }
    }
}

impl<I, O> Modifier<I, O> for Timer
where
    I: 'static,
    O: 'static,
{
    fn name(&self) -> &str {
        "timer"
    }

    fn wrap(&self, inner: Callable<I, O>) -> Callable<I, O> {
        let stage = self.label.clone();
        let elapsed_label = format!("{}.elapsed", self.label);
        let sink = Arc::clone(&self.sink);

        Arc::new(move |input: I| {
            let start = Instant::now();
            let result = inner(input);
            let elapsed = start.elapsed();

            let micros = u64::try_from(elapsed.as_micros()).unwrap_or(u64::MAX);
            tracing::debug!(stage = %stage, elapsed_us = micros, "stage timed");
            sink.record(LogEntry::new(elapsed_label.as_str(), json!({ "micros": micros })));

            result
        })
    }
}

// ============================================================================
// VALIDATOR
// ============================================================================

pub type Predicate<I> = Arc<dyn Fn(&I) -> bool + Send + Sync>;

/// Refuses to call the wrapped callable unless the predicate holds
pub struct Validator<I> {
    stage: String,
    rule: String,
    predicate: Predicate<I>,
}

impl<I> Validator<I> {
    pub fn new<P>(stage: &str, rule: &str, predicate: P) -> Self
    where
        P: Fn(&I) -> bool + Send + Sync + 'static,
    {
        Validator {
            stage: stage.to_string(),
            rule: rule.to_string(),
            predicate: Arc::new(predicate),
        }
    }

    pub fn rule(&self) -> &str {
        &self.rule
    }
}

impl<I, O> Modifier<I, O> for Validator<I>
where
    I: 'static,
    O: 'static,
{
    fn name(&self) -> &str {
        "validator"
    }

    fn wrap(&self, inner: Callable<I, O>) -> Callable<I, O> {
        let stage = self.stage.clone();
        let rule = self.rule.clone();
        let predicate = Arc::clone(&self.predicate);

        Arc::new(move |input: I| {
            if !predicate(&input) {
                tracing::warn!(stage = %stage, rule = %rule, "input rejected");
                return Err(ValidationError::new(&stage, &rule, "precondition failed").into());
            }
            inner(input)
        })
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PipelineError;
    use crate::sink::MemorySink;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn doubler() -> Callable<i64, i64> {
        Arc::new(|x: i64| Ok(x * 2))
    }

    fn memory_sink() -> (MemorySink, SharedSink) {
        let sink = MemorySink::new();
        let shared: SharedSink = Arc::new(sink.clone());
        (sink, shared)
    }

    #[test]
    fn test_logger_records_input_then_output() {
        let (sink, shared) = memory_sink();
        let logged = Modifier::<i64, i64>::wrap(&Logger::new("double", shared), doubler());

        assert_eq!(logged(21).unwrap(), 42);

        let entries = sink.entries();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].label, "double.input");
        assert_eq!(entries[0].value, json!(21));
        assert_eq!(entries[1].label, "double.output");
        assert_eq!(entries[1].value, json!(42));
    }

    #[test]
    fn test_logger_skips_output_on_failure() {
        let (sink, shared) = memory_sink();
        let failing: Callable<i64, i64> = Arc::new(|_: i64| -> PipelineResult<i64> {
            Err(ValidationError::new("inner", "always", "no").into())
        });
        let logged = Modifier::<i64, i64>::wrap(&Logger::new("fail", shared), failing);

        assert!(logged(1).is_err());
        assert_eq!(sink.labels(), vec!["fail.input"]);
    }

    #[test]
    fn test_logger_fields_only_detail() {
        let (sink, shared) = memory_sink();
        let identity: Callable<Value, Value> = Arc::new(|v: Value| -> PipelineResult<Value> { Ok(v) });
        let logger = Logger::new("obj", shared).with_detail(LogDetail::FieldsOnly);
        let logged = Modifier::<Value, Value>::wrap(&logger, identity);

        logged(json!({"secret": "s3cr3t"})).unwrap();

        let entries = sink.entries();
        assert_eq!(entries[0].value, json!({"fields": ["secret"]}));
        assert!(!entries[0].value.to_string().contains("s3cr3t"));
    }

    #[test]
    fn test_timer_records_elapsed() {
        let (sink, shared) = memory_sink();
        let timed = Modifier::<i64, i64>::wrap(&Timer::new("double", shared), doubler());

        assert_eq!(timed(5).unwrap(), 10);

        let entries = sink.entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].label, "double.elapsed");
        assert!(entries[0].value["micros"].is_u64());
    }

    #[test]
    fn test_validator_blocks_inner_call() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let inner: Callable<i64, i64> = Arc::new(move |x| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(x)
        });

        let validator = Validator::new("positive", "must_be_positive", |x: &i64| *x > 0);
        let guarded = Modifier::<i64, i64>::wrap(&validator, inner);

        let err = guarded(-1).unwrap_err();
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        match err {
            PipelineError::Validation(v) => {
                assert_eq!(v.stage, "positive");
                assert_eq!(v.rule, "must_be_positive");
            }
            other => panic!("unexpected error: {:?}", other),
        }

        assert_eq!(guarded(3).unwrap(), 3);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_modifier_names() {
        let (_, shared) = memory_sink();
        assert_eq!(Modifier::<i64, i64>::name(&Logger::new("a", shared.clone())), "logger");
        assert_eq!(Modifier::<i64, i64>::name(&Timer::new("a", shared)), "timer");
        let validator = Validator::new("a", "r", |_: &i64| true);
        assert_eq!(Modifier::<i64, i64>::name(&validator), "validator");
        assert_eq!(validator.rule(), "r");
    }
}
