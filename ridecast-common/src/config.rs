//! Configuration loading and config file resolution
//!
//! Bootstrap configuration is read from a TOML file. Every field has a
//! compiled default, so a missing file is never fatal: the service logs a
//! warning and starts with defaults.
//!
//! # Resolution priority
//! 1. Command-line argument (handled by the binary, overrides fields after load)
//! 2. Environment variable (handled by the binary via clap `env`)
//! 3. TOML config file
//! 4. Compiled defaults

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

/// Environment variable naming an explicit config file
pub const CONFIG_ENV_VAR: &str = "RIDECAST_CONFIG";

/// Bootstrap configuration loaded from TOML
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TomlConfig {
    /// HTTP server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Address the HTTP server binds to
    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// External collaborator endpoints
    #[serde(default)]
    pub endpoints: EndpointsConfig,

    /// Pipeline timing and throttling
    #[serde(default)]
    pub pipeline: PipelineConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log file path (optional, logs to stderr if not specified)
    #[serde(default)]
    pub file: Option<PathBuf>,
}

/// Endpoints of the external collaborators
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndpointsConfig {
    /// Text-generation endpoint (one prompt in, generated text out)
    #[serde(default = "default_text_generation_url")]
    pub text_generation_url: String,

    /// Synthesis worker submission endpoint
    #[serde(default = "default_synthesis_worker_url")]
    pub synthesis_worker_url: String,

    /// Public base URL of the artifact store bucket
    #[serde(default = "default_artifact_base_url")]
    pub artifact_base_url: String,

    /// Base URL of the analysis records collection
    #[serde(default = "default_analysis_source_url")]
    pub analysis_source_url: String,

    /// Optional bearer token sent to all collaborators
    #[serde(default)]
    pub api_token: Option<String>,
}

/// Pipeline timing and throttling
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Seconds between artifact existence probes
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,

    /// Seconds to wait for the artifact after polling starts
    #[serde(default = "default_poll_deadline_secs")]
    pub poll_deadline_secs: u64,

    /// Client-side request budget for the text-generation endpoint
    #[serde(default = "default_text_generation_rps")]
    pub text_generation_rps: u32,

    /// Per-request HTTP timeout
    #[serde(default = "default_http_timeout_secs")]
    pub http_timeout_secs: u64,

    /// Seconds a transient download handle stays valid after delivery
    #[serde(default = "default_download_release_secs")]
    pub download_release_secs: u64,

    /// Fixed artifact filename inside the per-analysis folder
    #[serde(default = "default_artifact_filename")]
    pub artifact_filename: String,
}

fn default_port() -> u16 {
    5790
}

fn default_bind_address() -> String {
    "127.0.0.1".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_text_generation_url() -> String {
    "http://127.0.0.1:8787/generate".to_string()
}

fn default_synthesis_worker_url() -> String {
    "http://127.0.0.1:8788/podcasts".to_string()
}

fn default_artifact_base_url() -> String {
    "http://127.0.0.1:8789/podcasts".to_string()
}

fn default_analysis_source_url() -> String {
    "http://127.0.0.1:8790/analyses".to_string()
}

fn default_poll_interval_secs() -> u64 {
    5
}

fn default_poll_deadline_secs() -> u64 {
    600
}

fn default_text_generation_rps() -> u32 {
    2
}

fn default_http_timeout_secs() -> u64 {
    120
}

fn default_download_release_secs() -> u64 {
    60
}

fn default_artifact_filename() -> String {
    "podcast.mp3".to_string()
}

impl Default for TomlConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            bind_address: default_bind_address(),
            logging: LoggingConfig::default(),
            endpoints: EndpointsConfig::default(),
            pipeline: PipelineConfig::default(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

impl Default for EndpointsConfig {
    fn default() -> Self {
        Self {
            text_generation_url: default_text_generation_url(),
            synthesis_worker_url: default_synthesis_worker_url(),
            artifact_base_url: default_artifact_base_url(),
            analysis_source_url: default_analysis_source_url(),
            api_token: None,
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval_secs(),
            poll_deadline_secs: default_poll_deadline_secs(),
            text_generation_rps: default_text_generation_rps(),
            http_timeout_secs: default_http_timeout_secs(),
            download_release_secs: default_download_release_secs(),
            artifact_filename: default_artifact_filename(),
        }
    }
}

impl PipelineConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn poll_deadline(&self) -> Duration {
        Duration::from_secs(self.poll_deadline_secs)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    pub fn download_release(&self) -> Duration {
        Duration::from_secs(self.download_release_secs)
    }
}

impl TomlConfig {
    /// Reject values the pipeline cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.pipeline.poll_interval_secs == 0 {
            return Err(Error::Config("pipeline.poll_interval_secs must be > 0".to_string()));
        }
        if self.pipeline.poll_deadline_secs < self.pipeline.poll_interval_secs {
            return Err(Error::Config(format!(
                "pipeline.poll_deadline_secs ({}) must be >= poll_interval_secs ({})",
                self.pipeline.poll_deadline_secs, self.pipeline.poll_interval_secs
            )));
        }
        if self.pipeline.text_generation_rps == 0 {
            return Err(Error::Config("pipeline.text_generation_rps must be > 0".to_string()));
        }
        if self.pipeline.artifact_filename.trim().is_empty()
            || self.pipeline.artifact_filename.contains('/')
        {
            return Err(Error::Config(format!(
                "pipeline.artifact_filename is not a plain file name: {:?}",
                self.pipeline.artifact_filename
            )));
        }
        for (name, url) in [
            ("text_generation_url", &self.endpoints.text_generation_url),
            ("synthesis_worker_url", &self.endpoints.synthesis_worker_url),
            ("artifact_base_url", &self.endpoints.artifact_base_url),
            ("analysis_source_url", &self.endpoints.analysis_source_url),
        ] {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(Error::Config(format!("endpoints.{} is not an http(s) URL: {}", name, url)));
            }
        }
        Ok(())
    }
}

/// Locates and loads the TOML config for one module
///
/// Search order: explicit path, `RIDECAST_CONFIG`, user config dir,
/// then `/etc/ridecast` on Linux.
pub struct ConfigResolver {
    module_name: String,
}

impl ConfigResolver {
    pub fn new(module_name: &str) -> Self {
        Self {
            module_name: module_name.to_string(),
        }
    }

    /// Candidate config file paths in priority order
    pub fn candidate_paths(&self, explicit: Option<&Path>) -> Vec<PathBuf> {
        let mut paths = Vec::new();
        if let Some(path) = explicit {
            paths.push(path.to_path_buf());
        }
        if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
            if !path.trim().is_empty() {
                paths.push(PathBuf::from(path));
            }
        }
        let file_name = format!("{}.toml", self.module_name);
        if let Some(dir) = dirs::config_dir() {
            paths.push(dir.join("ridecast").join(&file_name));
        }
        if cfg!(target_os = "linux") {
            paths.push(PathBuf::from("/etc/ridecast").join(&file_name));
        }
        paths
    }

    /// Load the first existing config file, or defaults if none exist
    ///
    /// An explicitly requested file that does not exist is an error; implicit
    /// locations are optional.
    pub fn load(&self, explicit: Option<&Path>) -> Result<TomlConfig> {
        if let Some(path) = explicit {
            if !path.exists() {
                return Err(Error::Config(format!(
                    "Config file not found: {}",
                    path.display()
                )));
            }
        }

        for path in self.candidate_paths(explicit) {
            if path.exists() {
                let config = load_toml_config(&path)?;
                info!("Loaded configuration from {}", path.display());
                return Ok(config);
            }
        }

        warn!(
            "No config file found for {}, using compiled defaults",
            self.module_name
        );
        Ok(TomlConfig::default())
    }
}

/// Parse one TOML config file
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path)?;
    let config: TomlConfig = toml::from_str(&content)?;
    Ok(config)
}
