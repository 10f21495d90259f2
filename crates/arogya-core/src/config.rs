use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{ArogyaError, Result};

/// Top-level configuration for the Arogya agent.
///
/// Loaded from `~/.arogya/config.toml` by default. Each section corresponds
/// to a bounded context or cross-cutting concern.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ArogyaConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub endpoints: EndpointsConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub matcher: MatcherConfig,
    #[serde(default)]
    pub agent: AgentConfig,
}

impl ArogyaConfig {
    /// Load configuration from a TOML file.
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: ArogyaConfig = toml::from_str(&content)?;
        info!("Configuration loaded from {}", path.display());
        Ok(config)
    }

    /// Load configuration from a TOML file, falling back to defaults if the
    /// file does not exist or cannot be parsed.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                warn!(
                    "Failed to load config from {}: {}. Using defaults.",
                    path.display(),
                    e
                );
                Self::default()
            }
        }
    }

    /// Save the current configuration to a TOML file.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| ArogyaError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        info!("Configuration saved to {}", path.display());
        Ok(())
    }
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log level: trace, debug, info, warn, error.
    pub log_level: String,
    /// Greeting shown by the transport when a session starts.
    pub welcome_message: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            welcome_message: "Hello! I'm your health assistant. How can I help you today?"
                .to_string(),
        }
    }
}

/// One remote endpoint descriptor: URL, HTTP method, and request timeout.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EndpointConfig {
    pub url: String,
    pub method: String,
    pub timeout_secs: u64,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            method: "POST".to_string(),
            timeout_secs: 120,
        }
    }
}

/// The fixed set of remote endpoints the gateway may call.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EndpointsConfig {
    pub translate: EndpointConfig,
    pub map_symptoms: EndpointConfig,
    pub find_hospitals: EndpointConfig,
}

impl Default for EndpointsConfig {
    fn default() -> Self {
        Self {
            translate: EndpointConfig {
                url: "http://144.202.20.247:5000/translate".to_string(),
                method: "POST".to_string(),
                timeout_secs: 120,
            },
            map_symptoms: EndpointConfig {
                url: "http://35.184.95.96:8080/v1/chat/completions".to_string(),
                method: "POST".to_string(),
                timeout_secs: 60,
            },
            find_hospitals: EndpointConfig {
                url: "http://144.202.20.247:8082/api/hospitals/nearby".to_string(),
                method: "POST".to_string(),
                timeout_secs: 120,
            },
        }
    }
}

/// Retry and connection-pool policy for the remote call gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Attempts per call, including the first.
    pub max_attempts: u32,
    /// Base backoff delay in milliseconds; actual delay is
    /// `base_delay_ms * 2^attempt`.
    pub base_delay_ms: u64,
    /// Cap on idle pooled connections per host.
    pub pool_max_idle_per_host: usize,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 2,
            base_delay_ms: 2_000,
            pool_max_idle_per_host: 50,
        }
    }
}

/// Specialist matcher settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MatcherConfig {
    /// Minimum cosine similarity for a local reference-table match.
    pub similarity_threshold: f32,
    /// Attempts for the remote classification fallback.
    pub remote_attempts: u32,
    /// Fixed pause between remote fallback attempts, in milliseconds.
    pub remote_retry_pause_ms: u64,
    /// Model name sent in chat-completion payloads.
    pub model: String,
    /// Directory containing `model.onnx` and `tokenizer.json` for the local
    /// embedding model.
    pub model_dir: String,
    /// Path to the symptom/specialist reference dataset (JSON).
    pub reference_path: String,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: 0.6,
            remote_attempts: 3,
            remote_retry_pause_ms: 1_000,
            model: "openbiollm-llama3-8b".to_string(),
            model_dir: "~/.arogya/models/all-MiniLM-L6-v2".to_string(),
            reference_path: "~/.arogya/symp_spec.json".to_string(),
        }
    }
}

/// Session and orchestrator settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Context is cleared once it exceeds `2 * max_context_length` entries.
    pub max_context_length: usize,
    /// Context is cleared once it is older than this many seconds.
    pub context_ttl_secs: u64,
    /// Window for reusing a recent symptom-mapping result, in seconds.
    pub recent_specialist_window_secs: u64,
    /// Timeout for delivering a response to the transport, in seconds.
    pub delivery_timeout_secs: u64,
    /// Default session location used for hospital search.
    pub default_latitude: f64,
    pub default_longitude: f64,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_context_length: 3,
            context_ttl_secs: 1_800,
            recent_specialist_window_secs: 300,
            delivery_timeout_secs: 10,
            default_latitude: 17.459_825_9,
            default_longitude: 78.349_573_1,
        }
    }
}
