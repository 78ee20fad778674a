use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::extract::{ExtractOptions, DEFAULT_CONTEXT_WINDOW, DEFAULT_MAX_SNIPPETS};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub db: DbConfig,
    #[serde(default)]
    pub extraction: ExtractionConfig,
    #[serde(default)]
    pub annotation: AnnotationConfig,
    #[serde(default)]
    pub history: HistoryConfig,
    #[serde(default)]
    pub library: LibraryConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ExtractionConfig {
    #[serde(default = "default_context_window")]
    pub context_window: usize,
    #[serde(default = "default_max_snippets")]
    pub max_snippets: usize,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            context_window: DEFAULT_CONTEXT_WINDOW,
            max_snippets: DEFAULT_MAX_SNIPPETS,
        }
    }
}

impl ExtractionConfig {
    pub fn options(&self) -> ExtractOptions {
        ExtractOptions {
            context_window: self.context_window,
            max_snippets: self.max_snippets,
        }
    }
}

fn default_context_window() -> usize {
    DEFAULT_CONTEXT_WINDOW
}
fn default_max_snippets() -> usize {
    DEFAULT_MAX_SNIPPETS
}

#[derive(Debug, Deserialize, Clone)]
pub struct AnnotationConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_target_language")]
    pub target_language: String,
    /// Environment variable holding the API key. Defaults per provider.
    #[serde(default)]
    pub api_key_env: Option<String>,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

impl Default for AnnotationConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_model(),
            target_language: default_target_language(),
            api_key_env: None,
            base_url: None,
            timeout_secs: 60,
            max_retries: 3,
        }
    }
}

fn default_provider() -> String {
    "gemini".to_string()
}
fn default_model() -> String {
    "gemini-2.5-flash".to_string()
}
fn default_target_language() -> String {
    "Chinese".to_string()
}
fn default_timeout_secs() -> u64 {
    60
}
fn default_max_retries() -> u32 {
    3
}

impl AnnotationConfig {
    pub fn is_enabled(&self) -> bool {
        self.provider != "disabled"
    }

    /// Name of the environment variable the API key is read from.
    pub fn api_key_var(&self) -> &str {
        if let Some(ref var) = self.api_key_env {
            return var;
        }
        match self.provider.as_str() {
            "openai" => "OPENAI_API_KEY",
            _ => "GEMINI_API_KEY",
        }
    }

    /// Whether the API key variable is set to a non-empty value.
    pub fn api_key_present(&self) -> bool {
        std::env::var(self.api_key_var())
            .map(|v| !v.trim().is_empty())
            .unwrap_or(false)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct HistoryConfig {
    #[serde(default = "default_max_entries")]
    pub max_entries: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            max_entries: default_max_entries(),
        }
    }
}

fn default_max_entries() -> usize {
    10
}

#[derive(Debug, Deserialize, Clone)]
pub struct LibraryConfig {
    #[serde(default = "default_include_globs")]
    pub include_globs: Vec<String>,
}

impl Default for LibraryConfig {
    fn default() -> Self {
        Self {
            include_globs: default_include_globs(),
        }
    }
}

fn default_include_globs() -> Vec<String> {
    vec![
        "**/*.md".to_string(),
        "**/*.markdown".to_string(),
        "**/*.txt".to_string(),
    ]
}

impl Config {
    /// All-defaults config with the database at `db_path`.
    pub fn minimal(db_path: impl Into<PathBuf>) -> Self {
        Self {
            db: DbConfig {
                path: db_path.into(),
            },
            extraction: ExtractionConfig::default(),
            annotation: AnnotationConfig::default(),
            history: HistoryConfig::default(),
            library: LibraryConfig::default(),
        }
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config = parse_config(&content)?;
    tracing::debug!(path = %path.display(), provider = %config.annotation.provider, "config loaded");
    Ok(config)
}

pub fn parse_config(content: &str) -> Result<Config> {
    let config: Config = toml::from_str(content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;
    Ok(config)
}

fn validate(config: &Config) -> Result<()> {
    if config.extraction.max_snippets == 0 {
        anyhow::bail!("extraction.max_snippets must be >= 1");
    }

    if config.history.max_entries == 0 {
        anyhow::bail!("history.max_entries must be >= 1");
    }

    match config.annotation.provider.as_str() {
        "disabled" | "gemini" | "openai" => {}
        other => anyhow::bail!(
            "Unknown annotation provider: '{}'. Must be disabled, gemini, or openai.",
            other
        ),
    }

    if config.annotation.is_enabled() && config.annotation.model.trim().is_empty() {
        anyhow::bail!(
            "annotation.model must be specified when provider is '{}'",
            config.annotation.provider
        );
    }

    Ok(())
}
