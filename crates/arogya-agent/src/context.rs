//! Per-session conversational context.
//!
//! A session keeps a short rolling window of tool invocations plus the last
//! resolved specialist and location. The whole window is cleared at once
//! when it goes stale or overgrows; there is no per-entry eviction.

use chrono::Utc;
use serde_json::Value;
use tracing::debug;

use arogya_core::config::AgentConfig;
use arogya_core::Specialty;

use crate::router::ToolKind;

/// Geographic point used for hospital searches.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
}

/// One recorded tool invocation.
#[derive(Debug, Clone)]
pub struct ContextEntry {
    pub user_input: String,
    pub tool: ToolKind,
    pub specialist: Option<Specialty>,
    pub parameters: Option<Value>,
    /// Unix seconds.
    pub timestamp: i64,
}

impl ContextEntry {
    pub fn new(user_input: impl Into<String>, tool: ToolKind) -> Self {
        Self {
            user_input: user_input.into(),
            tool,
            specialist: None,
            parameters: None,
            timestamp: Utc::now().timestamp(),
        }
    }

    pub fn with_specialist(mut self, specialist: Specialty) -> Self {
        self.specialist = Some(specialist);
        self
    }

    pub fn with_parameters(mut self, parameters: Value) -> Self {
        self.parameters = Some(parameters);
        self
    }
}

/// Mutable state of one conversation.
#[derive(Debug)]
pub struct SessionState {
    pub entries: Vec<ContextEntry>,
    /// Unix seconds of the last full clear (or session start).
    pub last_reset: i64,
    pub last_specialist: Specialty,
    pub last_location: Location,
    max_context_length: usize,
    ttl_secs: i64,
}

impl SessionState {
    pub fn new(config: &AgentConfig) -> Self {
        Self {
            entries: Vec::new(),
            last_reset: Utc::now().timestamp(),
            last_specialist: Specialty::GENERAL_PHYSICIAN,
            last_location: Location {
                latitude: config.default_latitude,
                longitude: config.default_longitude,
            },
            max_context_length: config.max_context_length,
            ttl_secs: config.context_ttl_secs as i64,
        }
    }

    /// Clear the context when it is stale or overgrown. Returns whether a
    /// reset happened. Called once per turn, before routing.
    ///
    /// Stale: more than the TTL since the last reset. Overgrown: strictly
    /// more than twice the configured window length.
    pub fn maybe_reset(&mut self) -> bool {
        let now = Utc::now().timestamp();
        if now - self.last_reset > self.ttl_secs || self.entries.len() > self.max_context_length * 2
        {
            debug!(
                entries = self.entries.len(),
                age_secs = now - self.last_reset,
                "Clearing session context"
            );
            self.entries.clear();
            self.last_reset = now;
            return true;
        }
        false
    }

    /// Append an entry. The window is append-only between resets.
    pub fn record(&mut self, entry: ContextEntry) {
        self.entries.push(entry);
    }

    /// Newest-first scan for the first entry matching the predicate and
    /// recorded within `max_age_secs` of now.
    pub fn recent<P>(&self, predicate: P, max_age_secs: i64) -> Option<&ContextEntry>
    where
        P: Fn(&ContextEntry) -> bool,
    {
        let now = Utc::now().timestamp();
        self.entries
            .iter()
            .rev()
            .find(|entry| predicate(entry) && now - entry.timestamp < max_age_secs)
    }

    /// The most recent symptom-mapping entry, regardless of age.
    pub fn last_symptom_entry(&self) -> Option<&ContextEntry> {
        self.entries
            .iter()
            .rev()
            .find(|entry| entry.tool == ToolKind::MapSymptoms)
    }
}
