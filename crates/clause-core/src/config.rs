//! Configuration loading and parsing for Clause
//!
//! Reads `clause.toml`, found by walking up from the analyzed path.

use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use crate::rules::Severity;
use crate::symbolic::engine::{DEFAULT_MAX_BLOCK_VISITS, DEFAULT_MAX_NODES, EngineConfig};

pub const CONFIG_FILENAME: &str = "clause.toml";

const KNOWN_TOP_LEVEL_KEYS: &[&str] = &["include", "exclude", "rules", "analysis"];
const KNOWN_RULES_KEYS: &[&str] = &["enabled", "disabled", "severity", "misra", "autosar", "cwe"];
const KNOWN_ANALYSIS_KEYS: &[&str] = &["max_block_visits", "max_nodes"];

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Invalid TOML in '{path}': {message}")]
    ParseError { path: PathBuf, message: String },
}

#[derive(Debug, Clone, Default)]
pub struct ConfigResult {
    pub config: Config,
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Path prefixes, relative to the analyzed directory. When non-empty,
    /// only dumps below one of them are checked.
    pub include: Vec<String>,
    /// Path prefixes or directory names skipped during discovery.
    pub exclude: Vec<String>,
    pub rules: RulesConfig,
    pub analysis: AnalysisConfig,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct RulesConfig {
    /// When non-empty, only these rules run.
    pub enabled: Vec<String>,
    pub disabled: Vec<String>,
    pub severity: HashMap<String, SeverityValue>,
    pub misra: Option<bool>,
    pub autosar: Option<bool>,
    pub cwe: Option<bool>,
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct AnalysisConfig {
    pub max_block_visits: u32,
    pub max_nodes: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            max_block_visits: DEFAULT_MAX_BLOCK_VISITS,
            max_nodes: DEFAULT_MAX_NODES,
        }
    }
}

impl From<AnalysisConfig> for EngineConfig {
    fn from(value: AnalysisConfig) -> Self {
        EngineConfig {
            max_block_visits: value.max_block_visits.max(1),
            max_nodes: value.max_nodes.max(1),
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SeverityValue {
    Error,
    Warning,
    Info,
}

impl From<SeverityValue> for Severity {
    fn from(value: SeverityValue) -> Self {
        match value {
            SeverityValue::Error => Severity::Error,
            SeverityValue::Warning => Severity::Warning,
            SeverityValue::Info => Severity::Info,
        }
    }
}

pub fn find_config_file(start_dir: &Path) -> Option<PathBuf> {
    let mut current = start_dir.to_path_buf();
    loop {
        let config_path = current.join(CONFIG_FILENAME);
        if config_path.exists() {
            return Some(config_path);
        }
        if !current.pop() {
            return None;
        }
    }
}

fn read_config(path: &Path) -> Result<(String, Config), ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
        path: path.to_path_buf(),
        source: e,
    })?;

    let config = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
        path: path.to_path_buf(),
        message: e.message().to_string(),
    })?;
    Ok((content, config))
}

pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    read_config(path).map(|(_, config)| config)
}

pub fn load_config_with_warnings(path: &Path) -> Result<ConfigResult, ConfigError> {
    let (content, config) = read_config(path)?;
    let warnings = detect_unknown_keys(&content);
    Ok(ConfigResult { config, warnings })
}

fn detect_unknown_keys(content: &str) -> Vec<String> {
    let mut warnings = Vec::new();

    let table: toml::Table = match content.parse() {
        Ok(t) => t,
        Err(_) => return warnings,
    };

    let known_top: HashSet<&str> = KNOWN_TOP_LEVEL_KEYS.iter().copied().collect();
    for key in table.keys() {
        if !known_top.contains(key.as_str()) {
            warnings.push(format!("Unknown config option: '{}'", key));
        }
    }

    for (section, known) in [("rules", KNOWN_RULES_KEYS), ("analysis", KNOWN_ANALYSIS_KEYS)] {
        if let Some(toml::Value::Table(entries)) = table.get(section) {
            for key in entries.keys() {
                if !known.contains(&key.as_str()) {
                    warnings.push(format!("Unknown config option in [{}]: '{}'", section, key));
                }
            }
        }
    }

    warnings
}

pub fn load_config_or_default(start_dir: &Path) -> Config {
    find_config_file(start_dir)
        .and_then(|path| load_config(&path).ok())
        .unwrap_or_default()
}

pub fn load_config_or_default_with_warnings(start_dir: &Path) -> ConfigResult {
    match find_config_file(start_dir) {
        Some(path) => load_config_with_warnings(&path).unwrap_or_else(|e| ConfigResult {
            config: Config::default(),
            warnings: vec![e.to_string()],
        }),
        None => ConfigResult::default(),
    }
}
