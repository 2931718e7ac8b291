// ⚙️ Pipeline Configuration - Lookup policy, fallbacks and resolver rules
// Loaded from JSON; every field has a default so partial files are fine.

use crate::lookup::{default_geo_rules, default_locale_rules, GeoRule, LocaleRule, StaticResolver};
use crate::modifier::LogDetail;
use anyhow::{Context as AnyhowContext, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Environment variable holding the tracing filter for the binaries
pub const LOG_ENV: &str = "EVENT_PIPELINE_LOG";

// ============================================================================
// LOOKUP POLICY
// ============================================================================

/// What the normalize stage does when a resolver returns an error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LookupPolicy {
    /// Abort the run with `PipelineError::Lookup`
    Strict,
    /// Substitute the configured fallback value and keep going
    #[default]
    Fallback,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FallbackContext {
    pub region: String,
    pub timezone: String,
    pub locale: String,
}

impl Default for FallbackContext {
    fn default() -> Self {
        FallbackContext {
            region: "US-WEST".to_string(),
            timezone: "America/Los_Angeles".to_string(),
            locale: "en-US".to_string(),
        }
    }
}

// ============================================================================
// PIPELINE CONFIG
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default)]
    pub lookup_policy: LookupPolicy,

    #[serde(default)]
    pub fallback: FallbackContext,

    #[serde(default = "default_geo_rules")]
    pub geo_rules: Vec<GeoRule>,

    #[serde(default = "default_locale_rules")]
    pub locale_rules: Vec<LocaleRule>,

    /// When false, Logger entries carry field names instead of full values
    #[serde(default = "default_log_values")]
    pub log_values: bool,
}

fn default_log_values() -> bool {
    true
}

impl Default for PipelineConfig {
    fn default() -> Self {
        PipelineConfig {
            lookup_policy: LookupPolicy::default(),
            fallback: FallbackContext::default(),
            geo_rules: default_geo_rules(),
            locale_rules: default_locale_rules(),
            log_values: default_log_values(),
        }
    }
}

impl PipelineConfig {
    /// Load configuration from a JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read pipeline config: {:?}", path.as_ref()))?;

        Self::from_json(&content)
    }

    pub fn from_json(content: &str) -> Result<Self> {
        let config: PipelineConfig =
            serde_json::from_str(content).context("Failed to parse pipeline config JSON")?;
        Ok(config)
    }

    pub fn strict() -> Self {
        PipelineConfig {
            lookup_policy: LookupPolicy::Strict,
            ..Self::default()
        }
    }

    /// Build the rule-based resolver described by this config
    pub fn resolver(&self) -> StaticResolver {
        StaticResolver::from_rules(self.geo_rules.clone(), self.locale_rules.clone())
    }

    pub fn log_detail(&self) -> LogDetail {
        if self.log_values {
            LogDetail::Full
        } else {
            LogDetail::FieldsOnly
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lookup::ContextResolver;

    #[test]
    fn test_default_config() {
        let config = PipelineConfig::default();

        assert_eq!(config.lookup_policy, LookupPolicy::Fallback);
        assert_eq!(config.fallback.region, "US-WEST");
        assert!(config.log_values);
        assert_eq!(config.log_detail(), LogDetail::Full);
        assert!(!config.geo_rules.is_empty());
    }

    #[test]
    fn test_empty_json_uses_defaults() {
        let config = PipelineConfig::from_json("{}").unwrap();

        assert_eq!(config.lookup_policy, LookupPolicy::Fallback);
        assert_eq!(config.geo_rules, default_geo_rules());
        assert_eq!(config.locale_rules, default_locale_rules());
    }

    #[test]
    fn test_partial_json() {
        let config = PipelineConfig::from_json(
            r#"{
                "lookup_policy": "strict",
                "log_values": false,
                "fallback": {"region": "EU", "timezone": "UTC", "locale": "de-DE"},
                "geo_rules": []
            }"#,
        )
        .unwrap();

        assert_eq!(config.lookup_policy, LookupPolicy::Strict);
        assert_eq!(config.log_detail(), LogDetail::FieldsOnly);
        assert_eq!(config.fallback.locale, "de-DE");
        assert!(config.geo_rules.is_empty());

        let resolver = config.resolver();
        assert!(resolver.region_of("203.0.113.42").is_err());
        assert_eq!(resolver.locale_of("macOS").unwrap(), "en-US");
    }

    #[test]
    fn test_invalid_policy_is_rejected() {
        let result = PipelineConfig::from_json(r#"{"lookup_policy": "retry"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_missing_file() {
        let result = PipelineConfig::from_file("/nonexistent/pipeline.json");
        assert!(result.is_err());
    }

    #[test]
    fn test_demo_config_parses() {
        let config = PipelineConfig::from_json(include_str!("../demos/strict_pipeline.json")).unwrap();

        assert_eq!(config.lookup_policy, LookupPolicy::Strict);
        assert_eq!(config.resolver().rule_count(), 4);
        assert_eq!(config.resolver().locale_of("Haiku").unwrap(), "en-GB");
    }

    #[test]
    fn test_strict_constructor() {
        assert_eq!(PipelineConfig::strict().lookup_policy, LookupPolicy::Strict);
    }
}
