// 📝 Log Sink - Where modifier side effects go
// Modifiers record `LogEntry` values; the pipeline never reads them back.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::{Arc, RwLock};

// ============================================================================
// LOG ENTRY
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    pub label: String,
    pub value: Value,
    pub recorded_at: DateTime<Utc>,
}

impl LogEntry {
    pub fn new(label: impl Into<String>, value: Value) -> Self {
        LogEntry {
            label: label.into(),
            value,
            recorded_at: Utc::now(),
        }
    }
}

// ============================================================================
// SINK TRAIT
// ============================================================================

pub trait LogSink: Send + Sync {
    fn record(&self, entry: LogEntry);
}

pub type SharedSink = Arc<dyn LogSink>;

// ============================================================================
// TRACING SINK
// ============================================================================

/// Forwards every entry to `tracing` as a structured event. Entries inherit
/// the enclosing `pipeline_run` span, which carries the run id.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl LogSink for TracingSink {
    fn record(&self, entry: LogEntry) {
        tracing::info!(label = %entry.label, value = %entry.value, "log entry");
    }
}

// ============================================================================
// MEMORY SINK
// ============================================================================

/// Keeps entries in recording order. Clones share the same buffer.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    entries: Arc<RwLock<Vec<LogEntry>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all entries recorded so far
    pub fn entries(&self) -> Vec<LogEntry> {
        self.entries
            .read()
            .map(|entries| entries.clone())
            .unwrap_or_default()
    }

    pub fn labels(&self) -> Vec<String> {
        self.entries().into_iter().map(|e| e.label).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.read().map(|entries| entries.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        if let Ok(mut entries) = self.entries.write() {
            entries.clear();
        }
    }
}

impl LogSink for MemorySink {
    fn record(&self, entry: LogEntry) {
        if let Ok(mut entries) = self.entries.write() {
            entries.push(entry);
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
