use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use super::report::Language;

const ENV_CONFIG_PATH: &str = "SCOREFLASH_CONFIG_PATH";
const DEFAULT_CONFIG_PATH: &str = "config.yaml";

const ENV_MODE: &str = "MODE";
const ENV_API_KEY: &str = "OPENAI_API_KEY";
const ENV_MODEL: &str = "REPORT_MODEL";
const ENV_BASE_URL: &str = "OPENAI_BASE_URL";
const ENV_OUTPUT_DIR: &str = "SCOREFLASH_OUTPUT_DIR";
const ENV_BROWSER_ENDPOINT: &str = "BROWSER_ENDPOINT";
const ENV_BROWSER_TOKEN: &str = "BROWSER_TOKEN";

const DEFAULT_MODEL: &str = "gpt-4.1-mini";
const DEFAULT_OUTPUT_DIR: &str = "outputs";

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("Invalid MODE '{0}', expected 'dev' or 'prod'")]
    InvalidMode(String),

    #[error("Invalid CSS selector for slot '{slot}' ('{selector}'): {reason}")]
    InvalidSelector {
        slot: String,
        selector: String,
        reason: String,
    },
}

/// Operating mode, selects diagnostics verbosity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunMode {
    Dev,
    #[default]
    Prod,
}

impl RunMode {
    /// Read `MODE`, defaulting to prod when unset
    ///
    /// Kept separate from [`Config::from_env`] so logging can be set up
    /// before the config file is read.
    pub fn from_env() -> Result<Self, ConfigError> {
        match std::env::var(ENV_MODE) {
            Ok(value) => value.parse(),
            Err(_) => Ok(RunMode::default()),
        }
    }

    /// Default `tracing` filter directive when `RUST_LOG` is not set
    pub fn default_log_directive(&self) -> &'static str {
        match self {
            RunMode::Dev => "debug",
            RunMode::Prod => "info",
        }
    }
}

impl FromStr for RunMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "dev" => Ok(RunMode::Dev),
            "prod" => Ok(RunMode::Prod),
            other => Err(ConfigError::InvalidMode(other.to_string())),
        }
    }
}

/// Capped exponential backoff policy shared by the fetch and generation loops
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct RetryPolicy {
    /// Total number of attempts, including the first one
    pub max_attempts: u32,
    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
}

fn default_initial_delay_ms() -> u64 {
    500
}

fn default_max_delay_ms() -> u64 {
    8_000
}

impl RetryPolicy {
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            initial_delay_ms: default_initial_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
        }
    }

    /// Policy without any sleep between attempts
    #[cfg(test)]
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            initial_delay_ms: 0,
            max_delay_ms: 0,
        }
    }

    /// Delay before the attempt following `failed_attempt` (1-based)
    pub fn delay_after(&self, failed_attempt: u32) -> Duration {
        let exponent = failed_attempt.saturating_sub(1).min(16);
        let delay = self.initial_delay_ms.saturating_mul(1u64 << exponent);
        Duration::from_millis(delay.min(self.max_delay_ms))
    }
}

/// CSS selectors used to pull each semantic slot out of the match page
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SlotSelectors {
    pub home_team: String,
    pub away_team: String,
    pub score: String,
    pub competition: String,
    pub kickoff_time: String,
    pub events: String,
}

impl Default for SlotSelectors {
    fn default() -> Self {
        Self {
            home_team: ".duelParticipant__home .participant__participantName".to_string(),
            away_team: ".duelParticipant__away .participant__participantName".to_string(),
            score: ".detailScore__wrapper".to_string(),
            competition: ".tournamentHeader__country".to_string(),
            kickoff_time: ".duelParticipant__startTime".to_string(),
            events: ".smv__participantRow".to_string(),
        }
    }
}

/// Headless browser content service
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BrowserServiceConfig {
    /// Base URL of a browserless-compatible service, e.g. `http://localhost:3000`
    pub endpoint: Option<String>,
    #[serde(skip)]
    pub token: Option<String>,
}

/// Match page fetching configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FetcherConfig {
    /// Hosts (and their subdomains) serving the supported page family
    pub allowed_hosts: Vec<String>,
    /// Path fragments identifying a match detail page
    pub match_path_markers: Vec<String>,
    pub selectors: SlotSelectors,
    /// Element whose presence marks the dynamic content as rendered
    pub ready_selector: String,
    pub navigation_timeout_ms: u64,
    /// Also render the statistics sub-page and hand its text to the model
    pub fetch_stats_page: bool,
    pub stats_path: String,
    /// Character budget for page context passed to the model
    pub max_context_chars: usize,
    pub retry: RetryPolicy,
    pub browser: BrowserServiceConfig,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            allowed_hosts: vec![
                "livesport.cz".to_string(),
                "flashscore.com".to_string(),
                "flashscore.co.uk".to_string(),
                "flashscore.sk".to_string(),
            ],
            match_path_markers: vec!["/zapas/".to_string(), "/match/".to_string()],
            selectors: SlotSelectors::default(),
            ready_selector: ".duelParticipant".to_string(),
            navigation_timeout_ms: 30_000,
            fetch_stats_page: true,
            stats_path: "/prehled/stats/celkem/".to_string(),
            max_context_chars: 8_000,
            retry: RetryPolicy::new(2),
            browser: BrowserServiceConfig::default(),
        }
    }
}

impl FetcherConfig {
    pub fn navigation_timeout(&self) -> Duration {
        Duration::from_millis(self.navigation_timeout_ms)
    }
}

/// Report generation configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    #[serde(skip)]
    pub model: String,
    /// OpenAI-compatible endpoint, api.openai.com when unset
    pub base_url: Option<String>,
    pub temperature: f32,
    pub report_length_words: u32,
    pub model_timeout_ms: u64,
    pub retry: RetryPolicy,
    pub default_language: Language,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            base_url: None,
            temperature: 0.2,
            report_length_words: 300,
            model_timeout_ms: 60_000,
            retry: RetryPolicy::new(3),
            default_language: Language::default(),
        }
    }
}

impl AgentConfig {
    pub fn model_timeout(&self) -> Duration {
        Duration::from_millis(self.model_timeout_ms)
    }
}

/// YAML configuration file structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConfigFile {
    #[serde(default)]
    pub fetcher: FetcherConfig,
    #[serde(default)]
    pub agent: AgentConfig,
}

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub mode: RunMode,
    pub api_key: Option<String>,
    pub fetcher: FetcherConfig,
    pub agent: AgentConfig,
    pub output_dir: PathBuf,
    pub port: u16,
    pub host: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            mode: RunMode::default(),
            api_key: None,
            fetcher: FetcherConfig::default(),
            agent: AgentConfig::default(),
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            port: 8080,
            host: "127.0.0.1".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from environment and config file
    pub fn from_env() -> Result<Self, ConfigError> {
        let mode = RunMode::from_env()?;

        let port = std::env::var("PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(8080);

        let host = std::env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());

        let output_dir = std::env::var(ENV_OUTPUT_DIR)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_OUTPUT_DIR));

        let api_key = std::env::var(ENV_API_KEY)
            .ok()
            .filter(|key| !key.trim().is_empty());

        let config_path = std::env::var(ENV_CONFIG_PATH)
            .unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());

        let ConfigFile {
            mut fetcher,
            mut agent,
        } = Self::load_config_file(&config_path).unwrap_or_default();

        if let Ok(endpoint) = std::env::var(ENV_BROWSER_ENDPOINT) {
            fetcher.browser.endpoint = Some(endpoint);
        }
        fetcher.browser.token = std::env::var(ENV_BROWSER_TOKEN).ok();
        agent.model = std::env::var(ENV_MODEL).unwrap_or_else(|_| DEFAULT_MODEL.to_string());
        if let Ok(base_url) = std::env::var(ENV_BASE_URL)
            && !base_url.trim().is_empty()
        {
            agent.base_url = Some(base_url);
        }

        Ok(Self {
            mode,
            api_key,
            fetcher,
            agent,
            output_dir,
            port,
            host,
        })
    }

    /// Load configuration from YAML file
    fn load_config_file(path: &str) -> Option<ConfigFile> {
        let path = Path::new(path);

        if !path.exists() {
            tracing::debug!(path = %path.display(), "Config file not found, using defaults");
            return None;
        }

        match fs::read_to_string(path) {
            Ok(contents) => Self::parse_config_file(path, &contents),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Failed to read config file, using defaults");
                None
            }
        }
    }

    fn parse_config_file(path: &Path, contents: &str) -> Option<ConfigFile> {
        let contents = contents.trim();
        if contents.is_empty() {
            tracing::debug!(path = %path.display(), "Config file is empty, using defaults");
            return Some(ConfigFile::default());
        }

        match serde_yaml::from_str(contents) {
            Ok(config) => {
                tracing::info!(path = %path.display(), "Loaded configuration from file");
                Some(config)
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Failed to parse config file, using defaults");
                None
            }
        }
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
