//! Configuration loading with env-var overrides.
//!
//! Reads `config/default.toml` relative to the current working directory
//! (or an explicit `--config` path), then applies `NEXUS_API_URL` and
//! `NEXUS_LOG_LEVEL` env overrides, then command-line flags. The default
//! file is optional; an explicitly named file must exist. The resolved log
//! level is validated here, whichever layer it came from.

use std::{
    env, fs,
    path::{Path, PathBuf},
};

use serde::Deserialize;
use tracing::level_filters::LevelFilter;

use crate::error::AppError;

pub const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// Backend connection settings.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiConfig {
    /// Absolute base URL every REST path is appended to.
    pub base_url: String,
    /// Per-request timeout. `None` leaves requests unbounded.
    pub timeout_seconds: Option<u64>,
}

/// Fully-resolved console configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub log_level: String,
    pub api: ApiConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            api: ApiConfig { base_url: default_base_url(), timeout_seconds: None },
        }
    }
}

/// Raw TOML shape, the `serde` target before resolution.
#[derive(Deserialize, Default)]
struct RawConfig {
    #[serde(default)]
    console: RawConsole,
    #[serde(default)]
    api: RawApi,
}

#[derive(Deserialize)]
struct RawConsole {
    #[serde(default = "default_log_level")]
    log_level: String,
}

impl Default for RawConsole {
    fn default() -> Self {
        Self { log_level: default_log_level() }
    }
}

#[derive(Deserialize)]
struct RawApi {
    #[serde(default = "default_base_url")]
    base_url: String,
    #[serde(default)]
    timeout_seconds: Option<u64>,
}

impl Default for RawApi {
    fn default() -> Self {
        Self { base_url: default_base_url(), timeout_seconds: None }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_base_url() -> String {
    "http://127.0.0.1:8000/api".to_string()
}

/// Values that win over the file. Blank values count as absent.
#[derive(Debug, Clone, Copy, Default)]
pub struct Overrides<'a> {
    pub api_url: Option<&'a str>,
    pub log_level: Option<&'a str>,
}

impl<'a> Overrides<'a> {
    /// Per field, `self` if set, else `fallback`.
    fn or(self, fallback: Overrides<'a>) -> Overrides<'a> {
        Overrides {
            api_url: non_blank(self.api_url).or(non_blank(fallback.api_url)),
            log_level: non_blank(self.log_level).or(non_blank(fallback.log_level)),
        }
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

/// Load config: file, then `NEXUS_*` env vars, then `flags`.
///
/// `path` is the `--config` flag: when given the file must exist, otherwise
/// [`DEFAULT_CONFIG_PATH`] is used if present.
pub fn load(path: Option<&str>, flags: Overrides<'_>) -> Result<Config, AppError> {
    let api_url = env::var("NEXUS_API_URL").ok();
    let log_level = env::var("NEXUS_LOG_LEVEL").ok();
    let from_env = Overrides { api_url: api_url.as_deref(), log_level: log_level.as_deref() };
    let (path, required) = match path {
        Some(p) => (expand_home(p), true),
        None => (PathBuf::from(DEFAULT_CONFIG_PATH), false),
    };
    load_from(&path, required, flags.or(from_env))
}

/// Internal loader. Accepts an explicit path and already-merged overrides.
/// Tests pass overrides directly instead of mutating env vars.
pub fn load_from(path: &Path, required: bool, overrides: Overrides<'_>) -> Result<Config, AppError> {
    let parsed = match fs::read_to_string(path) {
        Ok(raw) => toml::from_str::<RawConfig>(&raw)
            .map_err(|e| AppError::Config(format!("parse error in {}: {e}", path.display())))?,
        Err(e) if required || e.kind() != std::io::ErrorKind::NotFound => {
            return Err(AppError::Config(format!("cannot read {}: {e}", path.display())));
        }
        Err(_) => RawConfig::default(),
    };

    let base_url = non_blank(overrides.api_url)
        .map(str::to_string)
        .unwrap_or(parsed.api.base_url);
    let log_level = non_blank(overrides.log_level)
        .map(|l| l.trim().to_string())
        .unwrap_or(parsed.console.log_level);

    if base_url.trim().is_empty() {
        return Err(AppError::Config("api.base_url must not be empty".into()));
    }
    parse_level(&log_level)?;

    Ok(Config {
        log_level,
        api: ApiConfig { base_url, timeout_seconds: parsed.api.timeout_seconds.filter(|t| *t > 0) },
    })
}

/// Parse a log level name (`error` … `trace`, `off`).
pub fn parse_level(level: &str) -> Result<LevelFilter, AppError> {
    if level.trim().is_empty() {
        return Err(AppError::Config("log level must not be empty".into()));
    }
    level
        .parse::<LevelFilter>()
        .map_err(|_| AppError::Config(format!("unrecognised log level: '{level}'")))
}

/// Expand a leading `~` to the user's home directory.
/// Absolute or relative paths without `~` are returned unchanged.
pub fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    if path == "~" {
        if let Some(home) = dirs::home_dir() {
            return home;
        }
    }
    PathBuf::from(path)
}
