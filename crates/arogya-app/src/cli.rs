//! CLI argument definitions for the Arogya application.
//!
//! Uses `clap` with derive macros for ergonomic argument parsing.
//! Priority resolution: CLI args > env vars > config file > defaults.

use clap::Parser;
use std::path::PathBuf;

/// Arogya — a conversational health assistant that routes symptoms to
/// specialists, hospitals, and guidance.
#[derive(Parser, Debug)]
#[command(name = "arogya", version, about)]
pub struct CliArgs {
    /// Path to the configuration file.
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,

    /// Directory containing the embedding model (model.onnx + tokenizer.json).
    #[arg(short = 'm', long = "model-dir")]
    pub model_dir: Option<PathBuf>,

    /// Path to the symptom/specialist reference dataset (JSON).
    #[arg(short = 'r', long = "reference")]
    pub reference: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short = 'l', long = "log-level")]
    pub log_level: Option<String>,

    /// Use a deterministic mock embedder instead of the ONNX model.
    #[arg(long = "mock-embedding")]
    pub mock_embedding: bool,
}

impl CliArgs {
    /// Resolve the configuration file path.
    ///
    /// Priority: --config flag > AROGYA_CONFIG env var > ~/.arogya/config.toml.
    pub fn resolve_config_path(&self) -> PathBuf {
        if let Some(ref p) = self.config {
            return p.clone();
        }
        if let Ok(p) = std::env::var("AROGYA_CONFIG") {
            return PathBuf::from(p);
        }
        default_config_path()
    }

    /// Resolve the log level.
    ///
    /// Priority: --log-level flag > config file value.
    /// Returns `None` if not overridden.
    pub fn resolve_log_level(&self) -> Option<String> {
        self.log_level.clone()
    }

    /// Resolve the embedding model directory.
    ///
    /// Priority: --model-dir flag > config file value.
    pub fn resolve_model_dir(&self, config_value: &str) -> PathBuf {
        self.model_dir
            .clone()
            .unwrap_or_else(|| expand_home(config_value))
    }

    /// Resolve the reference dataset path.
    ///
    /// Priority: --reference flag > config file value.
    pub fn resolve_reference_path(&self, config_value: &str) -> PathBuf {
        self.reference
            .clone()
            .unwrap_or_else(|| expand_home(config_value))
    }
}

/// Expand ~ to the home directory in a path string.
pub fn expand_home(path: &str) -> PathBuf {
    if path.starts_with("~/") || path.starts_with("~\\") {
        #[cfg(target_os = "windows")]
        let home = std::env::var("USERPROFILE").unwrap_or_else(|_| ".".to_string());
        #[cfg(not(target_os = "windows"))]
        let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
        PathBuf::from(home).join(&path[2..])
    } else {
        PathBuf::from(path)
    }
}

/// Default config file path for the current platform.
fn default_config_path() -> PathBuf {
    #[cfg(target_os = "windows")]
    if let Ok(home) = std::env::var("USERPROFILE") {
        return PathBuf::from(home).join(".arogya").join("config.toml");
    }
    #[cfg(not(target_os = "windows"))]
    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home).join(".arogya").join("config.toml");
    }
    PathBuf::from("config.toml")
}
