//! Filter predicate engine.
//!
//! A [`FilterSpec`] is a declarative bundle of optional predicates; all
//! present predicates AND-combine, absent ones impose nothing. Specs
//! compile into a [`CompiledFilter`] whose regex predicate runs on the
//! ripgrep matching engine. [`PresetStore`] keeps named specs around for
//! reuse, seeded with the usual severity shortcuts.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use grep_matcher::Matcher;
use grep_regex::{RegexMatcher, RegexMatcherBuilder};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::parser::model::{Level, LogRecord};
use crate::wire::StreamKind;

#[derive(Error, Debug)]
pub enum FilterError {
    #[error("Invalid regex pattern: {0}")]
    InvalidRegex(String),
}

/// Declarative record filter. Text predicates (substring, regex,
/// exclusions) test the cleaned message, not the raw line.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterSpec {
    pub sources: Option<HashSet<String>>,
    pub levels: Option<HashSet<Level>>,
    pub streams: Option<HashSet<StreamKind>>,
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
    /// Case-insensitive substring.
    pub substring: Option<String>,
    /// Regex over the message, case-sensitive.
    pub pattern: Option<String>,
    /// Case-insensitive substrings that reject a record when present.
    pub exclude: Vec<String>,
}

impl FilterSpec {
    pub fn with_sources(mut self, sources: HashSet<String>) -> Self {
        self.sources = Some(sources);
        self
    }

    pub fn with_levels(mut self, levels: HashSet<Level>) -> Self {
        self.levels = Some(levels);
        self
    }

    pub fn with_streams(mut self, streams: HashSet<StreamKind>) -> Self {
        self.streams = Some(streams);
        self
    }

    pub fn with_since(mut self, since: DateTime<Utc>) -> Self {
        self.since = Some(since);
        self
    }

    pub fn with_until(mut self, until: DateTime<Utc>) -> Self {
        self.until = Some(until);
        self
    }

    pub fn with_substring(mut self, needle: impl Into<String>) -> Self {
        self.substring = Some(needle.into());
        self
    }

    pub fn with_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.pattern = Some(pattern.into());
        self
    }

    pub fn with_exclude(mut self, needle: impl Into<String>) -> Self {
        self.exclude.push(needle.into());
        self
    }

    /// Check whether any predicate is set at all.
    pub fn is_empty(&self) -> bool {
        self.sources.is_none()
            && self.levels.is_none()
            && self.streams.is_none()
            && self.since.is_none()
            && self.until.is_none()
            && self.substring.is_none()
            && self.pattern.is_none()
            && self.exclude.is_empty()
    }

    pub fn compile(&self) -> Result<CompiledFilter, FilterError> {
        let matcher = match &self.pattern {
            Some(pattern) => Some(
                RegexMatcherBuilder::new()
                    .multi_line(false)
                    .build(pattern)
                    .map_err(|e| FilterError::InvalidRegex(e.to_string()))?,
            ),
            None => None,
        };

        Ok(CompiledFilter {
            sources: self.sources.clone(),
            levels: self.levels.clone(),
            streams: self.streams.clone(),
            since: self.since,
            until: self.until,
            substring_lower: self.substring.as_ref().map(|s| s.to_lowercase()),
            matcher,
            exclude_lower: self.exclude.iter().map(|s| s.to_lowercase()).collect(),
        })
    }
}

/// A spec with its regex built, ready to test records.
#[derive(Clone)]
pub struct CompiledFilter {
    sources: Option<HashSet<String>>,
    levels: Option<HashSet<Level>>,
    streams: Option<HashSet<StreamKind>>,
    since: Option<DateTime<Utc>>,
    until: Option<DateTime<Utc>>,
    substring_lower: Option<String>,
    matcher: Option<RegexMatcher>,
    exclude_lower: Vec<String>,
}

impl CompiledFilter {
    pub fn matches(&self, record: &LogRecord) -> bool {
        if let Some(sources) = &self.sources {
            if !sources.contains(&record.source_id) {
                return false;
            }
        }
        if let Some(levels) = &self.levels {
            if !levels.contains(&record.level) {
                return false;
            }
        }
        if let Some(streams) = &self.streams {
            if !streams.contains(&record.stream) {
                return false;
            }
        }
        if let Some(since) = self.since {
            if record.timestamp < since {
                return false;
            }
        }
        if let Some(until) = self.until {
            if record.timestamp > until {
                return false;
            }
        }

        if self.substring_lower.is_some() || !self.exclude_lower.is_empty() {
            let haystack = record.message.to_lowercase();
            if let Some(needle) = &self.substring_lower {
                if !haystack.contains(needle.as_str()) {
                    return false;
                }
            }
            if self.exclude_lower.iter().any(|n| haystack.contains(n.as_str())) {
                return false;
            }
        }

        if let Some(matcher) = &self.matcher {
            if !matcher.is_match(record.message.as_bytes()).unwrap_or(false) {
                return false;
            }
        }

        true
    }

    /// Narrow a record slice to the matching subset.
    pub fn apply(&self, records: &[LogRecord]) -> Vec<LogRecord> {
        records.iter().filter(|r| self.matches(r)).cloned().collect()
    }
}

impl std::fmt::Debug for CompiledFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompiledFilter")
            .field("sources", &self.sources)
            .field("levels", &self.levels)
            .field("streams", &self.streams)
            .field("since", &self.since)
            .field("until", &self.until)
            .field("substring", &self.substring_lower)
            .field("has_pattern", &self.matcher.is_some())
            .field("exclude", &self.exclude_lower)
            .finish()
    }
}

/// Named filter presets, shared across observers.
pub struct PresetStore {
    presets: DashMap<String, FilterSpec>,
}

impl PresetStore {
    /// Build a store pre-seeded with the severity shortcuts.
    pub fn new() -> Self {
        let store = Self { presets: DashMap::new() };
        store.register("errors-only", Self::errors_only());
        store.register("warnings-and-above", Self::warnings_and_above());
        store.register("info-and-above", Self::info_and_above());
        store
    }

    pub fn errors_only() -> FilterSpec {
        FilterSpec::default().with_levels(HashSet::from([Level::Error]))
    }

    pub fn warnings_and_above() -> FilterSpec {
        FilterSpec::default().with_levels(HashSet::from([Level::Error, Level::Warn]))
    }

    pub fn info_and_above() -> FilterSpec {
        FilterSpec::default().with_levels(HashSet::from([Level::Error, Level::Warn, Level::Info]))
    }

    pub fn register(&self, name: impl Into<String>, spec: FilterSpec) {
        self.presets.insert(name.into(), spec);
    }

    pub fn get(&self, name: &str) -> Option<FilterSpec> {
        self.presets.get(name).map(|entry| entry.value().clone())
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.presets.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }
}

impl Default for PresetStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn record(source: &str, level: Level, stream: StreamKind, message: &str) -> LogRecord {
        LogRecord {
            id: 0,
            source_id: source.to_string(),
            source_name: source.to_string(),
            timestamp: Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap(),
            message: message.to_string(),
            stream,
            level,
            raw: message.to_string(),
        }
    }

    #[test]
    fn test_empty_spec_matches_everything() {
        let filter = FilterSpec::default().compile().unwrap();
        let r = record("c1", Level::Unknown, StreamKind::Stdout, "anything");
        assert!(filter.matches(&r));
        assert!(FilterSpec::default().is_empty());
    }

    #[test]
    fn test_level_and_substring_compose() {
        let filter = FilterSpec::default()
            .with_levels(HashSet::from([Level::Error]))
            .with_substring("Timeout")
            .compile()
            .unwrap();

        let hit = record("c1", Level::Error, StreamKind::Stderr, "request timeout hit");
        let wrong_level = record("c1", Level::Info, StreamKind::Stderr, "request timeout hit");
        let wrong_text = record("c1", Level::Error, StreamKind::Stderr, "request refused");

        assert!(filter.matches(&hit));
        assert!(!filter.matches(&wrong_level));
        assert!(!filter.matches(&wrong_text));
    }

    #[test]
    fn test_substring_is_case_insensitive() {
        let filter = FilterSpec::default().with_substring("ERROR").compile().unwrap();
        let r = record("c1", Level::Unknown, StreamKind::Stdout, "an error occurred");
        assert!(filter.matches(&r));
    }

    #[test]
    fn test_regex_predicate() {
        let filter = FilterSpec::default()
            .with_pattern(r"user_id=\d+")
            .compile()
            .unwrap();
        let hit = record("c1", Level::Info, StreamKind::Stdout, "request user_id=42 done");
        let miss = record("c1", Level::Info, StreamKind::Stdout, "request user_id=abc done");
        assert!(filter.matches(&hit));
        assert!(!filter.matches(&miss));
    }

    #[test]
    fn test_invalid_regex_is_rejected() {
        let err = FilterSpec::default().with_pattern("[unclosed").compile();
        assert!(matches!(err, Err(FilterError::InvalidRegex(_))));
    }

    #[test]
    fn test_exclusions_reject() {
        let filter = FilterSpec::default().with_exclude("healthcheck").compile().unwrap();
        let noisy = record("c1", Level::Info, StreamKind::Stdout, "GET /Healthcheck 200");
        let useful = record("c1", Level::Info, StreamKind::Stdout, "GET /orders 200");
        assert!(!filter.matches(&noisy));
        assert!(filter.matches(&useful));
    }

    #[test]
    fn test_source_and_stream_sets() {
        let filter = FilterSpec::default()
            .with_sources(HashSet::from(["c1".to_string()]))
            .with_streams(HashSet::from([StreamKind::Stderr]))
            .compile()
            .unwrap();
        assert!(filter.matches(&record("c1", Level::Info, StreamKind::Stderr, "x")));
        assert!(!filter.matches(&record("c2", Level::Info, StreamKind::Stderr, "x")));
        assert!(!filter.matches(&record("c1", Level::Info, StreamKind::Stdout, "x")));
    }

    #[test]
    fn test_time_range_is_inclusive() {
        let at = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
        let filter = FilterSpec::default()
            .with_since(at)
            .with_until(at)
            .compile()
            .unwrap();
        assert!(filter.matches(&record("c1", Level::Info, StreamKind::Stdout, "x")));

        let later = FilterSpec::default()
            .with_since(at + chrono::Duration::seconds(1))
            .compile()
            .unwrap();
        assert!(!later.matches(&record("c1", Level::Info, StreamKind::Stdout, "x")));
    }

    #[test]
    fn test_apply_returns_matching_subset() {
        let filter = FilterSpec::default()
            .with_levels(HashSet::from([Level::Error]))
            .compile()
            .unwrap();
        let records = vec![
            record("c1", Level::Error, StreamKind::Stderr, "boom"),
            record("c1", Level::Info, StreamKind::Stdout, "fine"),
            record("c2", Level::Error, StreamKind::Stderr, "bang"),
        ];
        let out = filter.apply(&records);
        assert_eq!(out.len(), 2);
        assert!(out.iter().all(|r| r.level == Level::Error));
    }

    #[test]
    fn test_builtin_presets() {
        let presets = PresetStore::new();
        let spec = presets.get("warnings-and-above").expect("builtin preset");
        let filter = spec.compile().unwrap();
        assert!(filter.matches(&record("c1", Level::Warn, StreamKind::Stdout, "x")));
        assert!(filter.matches(&record("c1", Level::Error, StreamKind::Stdout, "x")));
        assert!(!filter.matches(&record("c1", Level::Info, StreamKind::Stdout, "x")));
    }

    #[test]
    fn test_register_and_list_presets() {
        let presets = PresetStore::new();
        presets.register("mine", FilterSpec::default().with_substring("x"));
        assert!(presets.get("mine").is_some());
        assert!(presets.get("missing").is_none());
        let names = presets.names();
        assert!(names.contains(&"errors-only".to_string()));
        assert!(names.contains(&"mine".to_string()));
    }
}
