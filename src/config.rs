use serde::Deserialize;
use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::error::{DigestError, Result};
use crate::prompt::PromptTemplate;

pub const DEFAULT_CONFIG_FILE: &str = "feed-digest.toml";
pub const DEFAULT_MODEL: &str = "gpt-5-nano";
pub const MAX_ARTICLES: usize = 15;

pub const API_KEY_VAR: &str = "OPENAI_API_KEY";
pub const MODEL_VAR: &str = "OPENAI_MODEL";
pub const BASE_URL_VAR: &str = "OPENAI_BASE_URL";

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct Config {
    /// Optional KEY=VALUE settings file
    pub env_file: PathBuf,
    pub feeds_file: PathBuf,
    pub prompt_template_file: PathBuf,
    /// Directory the dated reports are written to
    pub output_dir: PathBuf,
    /// Cap on articles handed to the prompt, across all feeds
    pub max_articles: usize,
    pub model: String,
    pub api_base_url: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            env_file: PathBuf::from(".env.local"),
            feeds_file: PathBuf::from("rss_feeds.txt"),
            prompt_template_file: PathBuf::from("prompt_template.md"),
            output_dir: PathBuf::from("reports"),
            max_articles: MAX_ARTICLES,
            model: DEFAULT_MODEL.to_string(),
            api_base_url: "https://api.openai.com/v1".to_string(),
        }
    }
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = read_required(path, "Config file")?;
        toml::from_str(&content)
            .map_err(|e| DigestError::Config(format!("{}: {}", path.display(), e)))
    }

    /// Like [`Config::load`], but a missing file yields the defaults.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            debug!("No config file at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        Self::load(path)
    }

    /// Parse config from a TOML string (useful for testing)
    pub fn from_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| DigestError::Config(e.to_string()))
    }
}

/// Credentials and endpoint for the completion API, resolved once at startup.
#[derive(Clone)]
pub struct Settings {
    pub api_key: Option<String>,
    pub model: String,
    pub api_base_url: String,
}

impl std::fmt::Debug for Settings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Settings")
            .field("api_key", &self.api_key.as_deref().map(|_| "<redacted>"))
            .field("model", &self.model)
            .field("api_base_url", &self.api_base_url)
            .finish()
    }
}

impl Settings {
    /// Resolve settings with precedence: process environment (via `lookup`),
    /// then the settings file, then the config file.
    pub fn resolve<F>(config: &Config, file_vars: &HashMap<String, String>, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).or_else(|| file_vars.get(key).cloned());

        Self {
            api_key: get(API_KEY_VAR).filter(|k| !k.is_empty()),
            model: get(MODEL_VAR).unwrap_or_else(|| config.model.clone()),
            api_base_url: get(BASE_URL_VAR).unwrap_or_else(|| config.api_base_url.clone()),
        }
    }

    pub fn from_process_env(config: &Config, file_vars: &HashMap<String, String>) -> Self {
        Self::resolve(config, file_vars, |key| std::env::var(key).ok())
    }
}

/// Read KEY=VALUE pairs from a settings file. A missing file is not an error.
///
/// The pairs are returned rather than exported, so the process environment
/// is left untouched; [`Settings::resolve`] decides which source wins.
pub fn load_env_file<P: AsRef<Path>>(path: P) -> Result<HashMap<String, String>> {
    let path = path.as_ref();
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(HashMap::new()),
        Err(e) => return Err(DigestError::Io(e)),
    };

    let vars = parse_env_file(&content);
    debug!("Loaded {} settings from {}", vars.len(), path.display());
    Ok(vars)
}

/// Parse `KEY=VALUE` lines: split on the first `=`, trim both sides and strip
/// surrounding quotes. Values are taken literally, with no `$` expansion and no
/// trailing comments.
pub fn parse_env_file(content: &str) -> HashMap<String, String> {
    let mut vars = HashMap::new();

    for line in content.lines().map(str::trim) {
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let Some((key, value)) = line.split_once('=') else {
            warn!("Skipping settings line without '=': {}", line);
            continue;
        };

        let key = key.trim();
        if key.is_empty() {
            warn!("Skipping settings line with empty key");
            continue;
        }
        let value = value.trim().trim_matches('"').trim_matches('\'');

        // First definition in the file wins, like the environment does.
        vars.entry(key.to_string())
            .or_insert_with(|| value.to_string());
    }

    vars
}

/// Return the feed URLs listed one per line, skipping blanks and `#` comments.
pub fn load_feed_list<P: AsRef<Path>>(path: P) -> Result<Vec<String>> {
    let path = path.as_ref();
    let content = read_required(path, "RSS feeds file")?;
    let feeds = parse_feed_list(&content);

    if feeds.is_empty() {
        return Err(DigestError::Config(format!(
            "No feeds defined in {}",
            path.display()
        )));
    }

    Ok(feeds)
}

pub fn parse_feed_list(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(String::from)
        .collect()
}

/// Load the user prompt template (with `$today` and `$articles_block` placeholders).
pub fn load_prompt_template<P: AsRef<Path>>(path: P) -> Result<PromptTemplate> {
    let path = path.as_ref();
    let content = read_required(path, "Prompt template")?;
    Ok(PromptTemplate::new(content))
}

fn read_required(path: &Path, what: &str) -> Result<String> {
    std::fs::read_to_string(path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => {
            DigestError::Config(format!("{} not found: {}", what, path.display()))
        }
        _ => DigestError::Io(e),
    })
}
