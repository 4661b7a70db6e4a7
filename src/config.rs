use crate::log_debug;

use anyhow::{Result, anyhow};
use dirs::config_dir;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Project configuration filename, looked up at the repository root
pub const PROJECT_CONFIG_FILENAME: &str = ".ottoconfig";

/// Hard cap on the patch text embedded in AI prompts
pub const MAX_PATCH_CHARS: usize = 12_000;

/// Errors raised while normalizing configuration. All of these are fatal
/// before the pipeline runs.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Unknown commit mode: {0}. Supported: single, per-file")]
    UnknownCommitMode(String),
    #[error("Unknown push provider: {0}. Supported: github, gitlab, generic")]
    UnknownPushProvider(String),
    #[error("AI default provider '{0}' has no entry in [ai.providers]")]
    MissingDefaultProvider(String),
    #[error("Provider '{0}' has an empty base_url")]
    EmptyBaseUrl(String),
}

/// How changes are grouped into commits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CommitMode {
    /// One commit covering the whole filtered changeset
    #[default]
    Single,
    /// One commit per filtered file, in sorted path order
    PerFile,
}

impl FromStr for CommitMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "single" => Ok(Self::Single),
            "per-file" | "perfile" => Ok(Self::PerFile),
            _ => Err(ConfigError::UnknownCommitMode(s.to_string())),
        }
    }
}

impl fmt::Display for CommitMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Single => write!(f, "single"),
            Self::PerFile => write!(f, "per-file"),
        }
    }
}

/// Hosting provider the push remote is validated against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PushProvider {
    Github,
    Gitlab,
    /// Skips remote URL validation entirely
    #[default]
    Generic,
}

impl PushProvider {
    /// Substring the remote URL must contain, if any
    pub const fn url_marker(self) -> Option<&'static str> {
        match self {
            Self::Github => Some("github"),
            Self::Gitlab => Some("gitlab"),
            Self::Generic => None,
        }
    }
}

impl FromStr for PushProvider {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "github" => Ok(Self::Github),
            "gitlab" => Ok(Self::Gitlab),
            "generic" => Ok(Self::Generic),
            _ => Err(ConfigError::UnknownPushProvider(s.to_string())),
        }
    }
}

impl fmt::Display for PushProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Github => write!(f, "github"),
            Self::Gitlab => write!(f, "gitlab"),
            Self::Generic => write!(f, "generic"),
        }
    }
}

/// Wire protocol a provider speaks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProviderApi {
    /// `POST {base_url}/chat/completions` with Bearer auth
    OpenaiCompletions,
    /// `POST {base_url}/messages` with `x-api-key` auth
    AnthropicMessages,
}

/// Per-provider configuration for the message generation engine
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Which request/response protocol to speak
    pub api: ProviderApi,
    /// Base URL the protocol path is appended to
    pub base_url: String,
    /// Explicit API key; takes precedence over `api_key_env`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Environment variable to read the API key from
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key_env: Option<String>,
    /// Extra headers sent verbatim with every request
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub headers: HashMap<String, String>,
}

impl ProviderConfig {
    /// Resolve the credential for this provider: explicit key first, then the
    /// named environment variable.
    pub fn resolve_api_key(&self) -> Option<String> {
        if let Some(key) = &self.api_key
            && !key.is_empty()
        {
            return Some(key.clone());
        }
        self.api_key_env
            .as_ref()
            .and_then(|var| std::env::var(var).ok())
            .filter(|v| !v.is_empty())
    }

    /// Human-readable hint for a missing credential, naming the exact
    /// environment variable when one is configured.
    pub fn missing_key_hint(&self, provider: &str) -> String {
        match &self.api_key_env {
            Some(var) => format!("no API key for provider '{provider}' (set {var})"),
            None => format!("no API key configured for provider '{provider}'"),
        }
    }
}

/// AI message generation settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiConfig {
    /// Master switch for AI message generation
    #[serde(default)]
    pub enabled: bool,
    /// Per-request timeout in milliseconds
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// Model to use, optionally in `provider/model` form
    #[serde(default)]
    pub model: String,
    /// Provider used when `model` carries no `provider/` prefix
    #[serde(default)]
    pub default_provider: String,
    /// Provider name -> configuration
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            timeout_ms: default_timeout_ms(),
            model: String::new(),
            default_provider: String::new(),
            providers: HashMap::new(),
        }
    }
}

impl AiConfig {
    /// Split `model` into an effective (provider, model) pair. Text before the
    /// first `/` selects the provider; without a `/` the default provider is
    /// used and the whole string is the model.
    pub fn effective_provider_and_model(&self) -> (String, String) {
        match self.model.split_once('/') {
            Some((provider, model)) => (provider.to_string(), model.to_string()),
            None => (self.default_provider.clone(), self.model.clone()),
        }
    }
}

fn default_timeout_ms() -> u64 {
    15_000
}

/// Push settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PushConfig {
    /// Whether to push after a successful run
    #[serde(default)]
    pub enabled: bool,
    /// Remote to push to
    #[serde(default = "default_remote")]
    pub remote: String,
    /// Provider the remote URL is validated against
    #[serde(default)]
    pub provider: PushProvider,
}

impl Default for PushConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            remote: default_remote(),
            provider: PushProvider::default(),
        }
    }
}

fn default_remote() -> String {
    "origin".to_string()
}

/// Project-level overlay parsed from `.ottoconfig`. Every field is optional,
/// so a key the project file omits never clobbers a personal setting.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ProjectConfig {
    pub enabled: Option<bool>,
    pub mode: Option<CommitMode>,
    pub fallback_prefix: Option<String>,
    pub max_message_length: Option<usize>,
    pub include: Option<Vec<String>>,
    pub exclude: Option<Vec<String>>,
    pub ai: ProjectAiConfig,
    pub push: ProjectPushConfig,
}

/// Project-level `[ai]` overlay
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ProjectAiConfig {
    pub enabled: Option<bool>,
    pub timeout_ms: Option<u64>,
    pub model: Option<String>,
    pub default_provider: Option<String>,
    pub providers: HashMap<String, ProjectProviderConfig>,
}

/// Project-level provider overlay. Deliberately has no `api_key` field:
/// project files may point at an environment variable but can never carry a
/// secret themselves.
#[derive(Debug, Clone, Deserialize)]
pub struct ProjectProviderConfig {
    pub api: ProviderApi,
    #[serde(default)]
    pub base_url: String,
    #[serde(default)]
    pub api_key_env: Option<String>,
    #[serde(default)]
    pub headers: HashMap<String, String>,
}

/// Project-level `[push]` overlay
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ProjectPushConfig {
    pub enabled: Option<bool>,
    pub remote: Option<String>,
    pub provider: Option<PushProvider>,
}

/// Resolved configuration for one auto-commit run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Master switch; a disabled config skips the pipeline entirely
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Commit grouping mode
    #[serde(default)]
    pub mode: CommitMode,
    /// Prefix the deterministic fallback subject is derived from
    #[serde(default = "default_fallback_prefix")]
    pub fallback_prefix: String,
    /// Maximum commit subject length
    #[serde(default = "default_max_message_length")]
    pub max_message_length: usize,
    /// Include glob patterns; empty means everything
    #[serde(default)]
    pub include: Vec<String>,
    /// Exclude glob patterns
    #[serde(default)]
    pub exclude: Vec<String>,
    /// AI message generation settings
    #[serde(default)]
    pub ai: AiConfig,
    /// Push settings
    #[serde(default)]
    pub push: PushConfig,
}

fn default_enabled() -> bool {
    true
}

fn default_fallback_prefix() -> String {
    "chore".to_string()
}

fn default_max_message_length() -> usize {
    72
}

impl Default for Config {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            mode: CommitMode::default(),
            fallback_prefix: default_fallback_prefix(),
            max_message_length: default_max_message_length(),
            include: Vec::new(),
            exclude: Vec::new(),
            ai: AiConfig::default(),
            push: PushConfig::default(),
        }
    }
}

impl Config {
    /// Load the personal configuration and merge any project config over it.
    pub fn load(repo_root: &Path) -> Result<Self> {
        let mut config = Self::load_personal()?;

        if let Ok(project_config) = Self::load_project_config(repo_root) {
            config.merge_with_project_config(project_config);
        }

        log_debug!("Configuration loaded: {:?}", config);
        Ok(config)
    }

    /// Load only the personal configuration file, ignoring any project file.
    pub fn load_personal() -> Result<Self> {
        let config_path = Self::get_config_path()?;
        if config_path.exists() {
            let config_content = fs::read_to_string(&config_path)?;
            Ok(toml::from_str(&config_content)?)
        } else {
            Ok(Self::default())
        }
    }

    /// Load the project-level configuration file, if present.
    pub fn load_project_config(repo_root: &Path) -> Result<ProjectConfig> {
        let config_path = repo_root.join(PROJECT_CONFIG_FILENAME);
        if !config_path.exists() {
            return Err(anyhow!("Project configuration file not found"));
        }

        let config_str = fs::read_to_string(&config_path)
            .map_err(|e| anyhow!("Failed to read project config file: {e}"))?;

        toml::from_str(&config_str).map_err(|e| {
            anyhow!(
                "Invalid project configuration file format: {e}. Please check your {PROJECT_CONFIG_FILENAME} file for syntax errors."
            )
        })
    }

    /// Merge a project overlay over this config. Only keys the project file
    /// actually sets are applied; project files may change any behavior
    /// setting but never contribute API keys.
    pub fn merge_with_project_config(&mut self, project: ProjectConfig) {
        log_debug!("Merging with project configuration");

        if let Some(enabled) = project.enabled {
            self.enabled = enabled;
        }
        if let Some(mode) = project.mode {
            self.mode = mode;
        }
        if let Some(prefix) = project.fallback_prefix {
            self.fallback_prefix = prefix;
        }
        if let Some(max_length) = project.max_message_length {
            self.max_message_length = max_length;
        }
        if let Some(include) = project.include {
            self.include = include;
        }
        if let Some(exclude) = project.exclude {
            self.exclude = exclude;
        }

        if let Some(enabled) = project.ai.enabled {
            self.ai.enabled = enabled;
        }
        if let Some(timeout_ms) = project.ai.timeout_ms {
            self.ai.timeout_ms = timeout_ms;
        }
        if let Some(model) = project.ai.model {
            self.ai.model = model;
        }
        if let Some(default_provider) = project.ai.default_provider {
            self.ai.default_provider = default_provider;
        }
        for (name, proj_provider) in project.ai.providers {
            let entry = self
                .ai
                .providers
                .entry(name)
                .or_insert_with(|| ProviderConfig {
                    api: proj_provider.api,
                    base_url: String::new(),
                    api_key: None,
                    api_key_env: None,
                    headers: HashMap::new(),
                });
            entry.api = proj_provider.api;
            if !proj_provider.base_url.is_empty() {
                entry.base_url = proj_provider.base_url;
            }
            if proj_provider.api_key_env.is_some() {
                entry.api_key_env = proj_provider.api_key_env;
            }
            entry.headers.extend(proj_provider.headers);
        }

        if let Some(enabled) = project.push.enabled {
            self.push.enabled = enabled;
        }
        if let Some(remote) = project.push.remote {
            self.push.remote = remote;
        }
        if let Some(provider) = project.push.provider {
            self.push.provider = provider;
        }
    }

    /// Save the personal configuration file.
    pub fn save(&self) -> Result<()> {
        let config_path = Self::get_config_path()?;
        let config_content = toml::to_string(self)?;
        fs::write(config_path, config_content)?;
        log_debug!("Configuration saved");
        Ok(())
    }

    fn get_config_path() -> Result<PathBuf> {
        let mut path =
            config_dir().ok_or_else(|| anyhow!("Unable to determine config directory"))?;
        path.push("git-otto");
        std::fs::create_dir_all(&path)?;
        path.push("config.toml");
        Ok(path)
    }

    /// Validate invariants that serde cannot express. Fatal before the
    /// pipeline runs.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.ai.enabled {
            if !self.ai.default_provider.is_empty()
                && !self.ai.providers.contains_key(&self.ai.default_provider)
            {
                return Err(ConfigError::MissingDefaultProvider(
                    self.ai.default_provider.clone(),
                ));
            }
            for (name, provider) in &self.ai.providers {
                if provider.base_url.is_empty() {
                    return Err(ConfigError::EmptyBaseUrl(name.clone()));
                }
            }
        }
        Ok(())
    }
}
