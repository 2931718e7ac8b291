// 🌍 Context Lookups - Region, timezone and locale resolution
// Rules as data: prefix and pattern matching, highest priority wins

use crate::error::{LookupError, LookupKind};
use anyhow::{Context as AnyhowContext, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::net::IpAddr;
use std::path::Path;

// ============================================================================
// RESOLVER TRAIT
// ============================================================================

/// The three lookups the normalize stage depends on.
///
/// Implementations must be total: every call returns a value or a
/// `LookupError`, and has no side effects the pipeline can observe.
pub trait ContextResolver: Send + Sync {
    fn region_of(&self, ip_address: &str) -> Result<String, LookupError>;

    fn timezone_of(&self, ip_address: &str) -> Result<String, LookupError>;

    fn locale_of(&self, os: &str) -> Result<String, LookupError>;
}

// ============================================================================
// RULE DEFINITIONS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoRule {
    /// Rule ID for tracking
    pub id: String,

    /// Textual prefix of the address, e.g. "203.0.113." or "2001:db8:"
    pub ip_prefix: String,

    pub region: String,

    /// IANA timezone name
    pub timezone: String,

    /// Priority (higher = applied first)
    #[serde(default)]
    pub priority: i32,
}

impl GeoRule {
    pub fn matches(&self, ip: &IpAddr) -> bool {
        ip.to_string()
            .to_lowercase()
            .starts_with(&self.ip_prefix.to_lowercase())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocaleRule {
    pub id: String,

    /// Case-insensitive pattern, `*` matches any run of characters
    pub os_pattern: String,

    /// BCP 47 language tag
    pub locale: String,

    #[serde(default)]
    pub priority: i32,
}

impl LocaleRule {
    pub fn matches(&self, os: &str) -> bool {
        wildcard_match(&self.os_pattern.to_lowercase(), &os.to_lowercase())
    }
}

/// Anchored wildcard match; a pattern without `*` must match exactly
fn wildcard_match(pattern: &str, text: &str) -> bool {
    if !pattern.contains('*') {
        return pattern == text;
    }

    let parts: Vec<&str> = pattern.split('*').collect();
    let first = parts[0];
    let last = parts[parts.len() - 1];

    if !text.starts_with(first) || text.len() < first.len() + last.len() || !text.ends_with(last) {
        return false;
    }

    let mut pos = first.len();
    let end = text.len() - last.len();
    for part in &parts[1..parts.len() - 1] {
        if part.is_empty() {
            continue;
        }
        match text[pos..end].find(part) {
            Some(found) => pos += found + part.len(),
            None => return false,
        }
    }

    true
}

fn parse_ip(ip_address: &str) -> Result<IpAddr, LookupError> {
    ip_address
        .trim()
        .parse::<IpAddr>()
        .map_err(|_| LookupError::InvalidAddress {
            input: ip_address.to_string(),
        })
}

// ============================================================================
// STATIC RESOLVER
// ============================================================================

#[derive(Debug, Clone, Default)]
pub struct StaticResolver {
    geo_rules: Vec<GeoRule>,
    locale_rules: Vec<LocaleRule>,
}

/// Rule file layout accepted by `StaticResolver::from_file`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResolverRules {
    #[serde(default)]
    pub geo_rules: Vec<GeoRule>,
    #[serde(default)]
    pub locale_rules: Vec<LocaleRule>,
}

impl StaticResolver {
    /// Create a resolver with no rules; every lookup is unresolved
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_rules(mut geo_rules: Vec<GeoRule>, mut locale_rules: Vec<LocaleRule>) -> Self {
        // Sort by priority (higher first); stable, so file order breaks ties
        geo_rules.sort_by(|a, b| b.priority.cmp(&a.priority));
        locale_rules.sort_by(|a, b| b.priority.cmp(&a.priority));
        StaticResolver {
            geo_rules,
            locale_rules,
        }
    }

    /// Load rules from a JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read resolver rules: {:?}", path.as_ref()))?;

        let rules: ResolverRules =
            serde_json::from_str(&content).context("Failed to parse resolver rules JSON")?;

        Ok(StaticResolver::from_rules(rules.geo_rules, rules.locale_rules))
    }

    /// Rules covering the documentation address ranges and common OS names
    pub fn with_default_rules() -> Self {
        StaticResolver::from_rules(default_geo_rules(), default_locale_rules())
    }

    pub fn add_geo_rule(&mut self, rule: GeoRule) {
        self.geo_rules.push(rule);
        self.geo_rules.sort_by(|a, b| b.priority.cmp(&a.priority));
    }

    pub fn add_locale_rule(&mut self, rule: LocaleRule) {
        self.locale_rules.push(rule);
        self.locale_rules.sort_by(|a, b| b.priority.cmp(&a.priority));
    }

    pub fn rule_count(&self) -> usize {
        self.geo_rules.len() + self.locale_rules.len()
    }

    fn geo_rule_for(&self, ip_address: &str, kind: LookupKind) -> Result<&GeoRule, LookupError> {
        let ip = parse_ip(ip_address)?;
        self.geo_rules
            .iter()
            .find(|rule| rule.matches(&ip))
            .ok_or_else(|| LookupError::Unresolved {
                kind,
                input: ip_address.to_string(),
            })
    }
}

impl ContextResolver for StaticResolver {
    fn region_of(&self, ip_address: &str) -> Result<String, LookupError> {
        self.geo_rule_for(ip_address, LookupKind::Region)
            .map(|rule| rule.region.clone())
    }

    fn timezone_of(&self, ip_address: &str) -> Result<String, LookupError> {
        self.geo_rule_for(ip_address, LookupKind::Timezone)
            .map(|rule| rule.timezone.clone())
    }

    fn locale_of(&self, os: &str) -> Result<String, LookupError> {
        self.locale_rules
            .iter()
            .find(|rule| rule.matches(os))
            .map(|rule| rule.locale.clone())
            .ok_or_else(|| LookupError::Unresolved {
                kind: LookupKind::Locale,
                input: os.to_string(),
            })
    }
}

pub fn default_geo_rules() -> Vec<GeoRule> {
    vec![
        GeoRule {
            id: "test-net-3".to_string(),
            ip_prefix: "203.0.113.".to_string(),
            region: "US-WEST".to_string(),
            timezone: "America/Los_Angeles".to_string(),
            priority: 10,
        },
        GeoRule {
            id: "test-net-2".to_string(),
            ip_prefix: "198.51.100.".to_string(),
            region: "US-EAST".to_string(),
            timezone: "America/New_York".to_string(),
            priority: 10,
        },
        GeoRule {
            id: "test-net-1".to_string(),
            ip_prefix: "192.0.2.".to_string(),
            region: "EU-WEST".to_string(),
            timezone: "Europe/Dublin".to_string(),
            priority: 10,
        },
        GeoRule {
            id: "ipv6-doc".to_string(),
            ip_prefix: "2001:db8:".to_string(),
            region: "EU-CENTRAL".to_string(),
            timezone: "Europe/Berlin".to_string(),
            priority: 10,
        },
    ]
}

pub fn default_locale_rules() -> Vec<LocaleRule> {
    vec![
        LocaleRule {
            id: "macos".to_string(),
            os_pattern: "mac*".to_string(),
            locale: "en-US".to_string(),
            priority: 10,
        },
        LocaleRule {
            id: "ios".to_string(),
            os_pattern: "ios*".to_string(),
            locale: "en-US".to_string(),
            priority: 10,
        },
        LocaleRule {
            id: "windows".to_string(),
            os_pattern: "windows*".to_string(),
            locale: "en-US".to_string(),
            priority: 5,
        },
        LocaleRule {
            id: "linux".to_string(),
            os_pattern: "*linux*".to_string(),
            locale: "en-GB".to_string(),
            priority: 5,
        },
        LocaleRule {
            id: "android".to_string(),
            os_pattern: "android*".to_string(),
            locale: "en-GB".to_string(),
            priority: 5,
        },
    ]
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_rules_resolve_sample_address() {
        let resolver = StaticResolver::with_default_rules();

        assert_eq!(resolver.region_of("203.0.113.42").unwrap(), "US-WEST");
        assert_eq!(resolver.timezone_of("203.0.113.42").unwrap(), "America/Los_Angeles");
        assert_eq!(resolver.locale_of("macOS").unwrap(), "en-US");
    }

    #[test]
    fn test_invalid_address() {
        let resolver = StaticResolver::with_default_rules();

        let err = resolver.region_of("not-an-ip").unwrap_err();
        assert_eq!(
            err,
            LookupError::InvalidAddress {
                input: "not-an-ip".to_string()
            }
        );
    }

    #[test]
    fn test_unresolved_address_and_os() {
        let resolver = StaticResolver::with_default_rules();

        let err = resolver.timezone_of("10.0.0.1").unwrap_err();
        assert!(matches!(
            err,
            LookupError::Unresolved {
                kind: LookupKind::Timezone,
                ..
            }
        ));

        assert!(resolver.locale_of("Plan9").is_err());
    }

    #[test]
    fn test_empty_resolver_never_resolves() {
        let resolver = StaticResolver::new();

        assert_eq!(resolver.rule_count(), 0);
        assert!(resolver.region_of("203.0.113.42").is_err());
        assert!(resolver.locale_of("macOS").is_err());
    }

    #[test]
    fn test_geo_rule_priority() {
        let mut resolver = StaticResolver::with_default_rules();
        resolver.add_geo_rule(GeoRule {
            id: "office".to_string(),
            ip_prefix: "203.0.113.4".to_string(),
            region: "US-OFFICE".to_string(),
            timezone: "America/Denver".to_string(),
            priority: 100,
        });

        assert_eq!(resolver.region_of("203.0.113.42").unwrap(), "US-OFFICE");
        assert_eq!(resolver.region_of("203.0.113.99").unwrap(), "US-WEST");
    }

    #[test]
    fn test_ipv6_prefix_is_case_insensitive() {
        let resolver = StaticResolver::with_default_rules();

        assert_eq!(resolver.region_of("2001:DB8::1").unwrap(), "EU-CENTRAL");
    }

    #[test]
    fn test_locale_wildcards() {
        let rule = LocaleRule {
            id: "linux".to_string(),
            os_pattern: "*linux*".to_string(),
            locale: "en-GB".to_string(),
            priority: 0,
        };

        assert!(rule.matches("Ubuntu Linux"));
        assert!(rule.matches("linux"));
        assert!(!rule.matches("macOS"));
    }

    #[test]
    fn test_wildcard_match() {
        assert!(wildcard_match("mac*", "macos"));
        assert!(wildcard_match("a*b*c", "axxbyyc"));
        assert!(!wildcard_match("a*b*c", "axxcyyb"));
        assert!(!wildcard_match("ab*ba", "aba"));
        assert!(wildcard_match("exact", "exact"));
        assert!(!wildcard_match("exact", "exactly"));
    }

    #[test]
    fn test_rules_from_json() {
        let rules: ResolverRules = serde_json::from_str(
            r#"{
                "geo_rules": [
                    {"id": "lan", "ip_prefix": "10.", "region": "LAN", "timezone": "UTC"}
                ],
                "locale_rules": [
                    {"id": "any", "os_pattern": "*", "locale": "de-DE"}
                ]
            }"#,
        )
        .unwrap();

        let resolver = StaticResolver::from_rules(rules.geo_rules, rules.locale_rules);
        assert_eq!(resolver.region_of("10.1.2.3").unwrap(), "LAN");
        assert_eq!(resolver.locale_of("anything").unwrap(), "de-DE");
    }
}
