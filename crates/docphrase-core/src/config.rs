//! Layered scan configuration.
//!
//! Values come from four sources, lowest precedence first: built-in
//! defaults, the project file (`.docphrase.json`), environment variables and
//! CLI flags. Every resolved value remembers its [`ConfigSource`] so hosts can
//! report where a setting came from.
//!
//! Disabled-rule globs accumulate across sources; scalar settings take the
//! value from the highest-precedence source that sets them.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use globset::{Glob, GlobSet, GlobSetBuilder};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::rule::Severity;

/// Project configuration file name, looked up in the project root.
pub const PROJECT_CONFIG_FILE: &str = ".docphrase.json";

/// Default longest sentence, in words.
pub const DEFAULT_MAX_SENTENCE_WORDS: usize = 35;

/// Default number of fix passes per comment.
pub const DEFAULT_MAX_FIX_PASSES: usize = 10;

/// Environment variable with comma-separated disabled rule globs.
pub const ENV_DISABLE: &str = "DOCPHRASE_DISABLE";

/// Environment variable overriding the fix pass limit.
pub const ENV_MAX_FIX_PASSES: &str = "DOCPHRASE_MAX_FIX_PASSES";

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid rule glob '{pattern}': {source}")]
    InvalidGlob {
        pattern: String,
        #[source]
        source: globset::Error,
    },

    #[error("invalid value for {key}: '{value}'")]
    InvalidValue { key: String, value: String },
}

// ============================================================================
// Configuration Sources
// ============================================================================

/// Configuration value source (for precedence tracking).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfigSource {
    /// Built-in default value.
    Default = 0,
    /// From `.docphrase.json`.
    ProjectConfig = 1,
    /// From environment variable.
    EnvVar = 2,
    /// From CLI flag (highest precedence).
    CliFlag = 3,
}

/// A configuration value with its source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigValue<T> {
    pub value: T,
    pub source: ConfigSource,
}

impl<T> ConfigValue<T> {
    pub fn new(value: T, source: ConfigSource) -> Self {
        ConfigValue { value, source }
    }

    /// Merge with another value, preferring higher precedence.
    pub fn merge(self, other: Self) -> Self {
        if other.source >= self.source {
            other
        } else {
            self
        }
    }
}

// ============================================================================
// Sources
// ============================================================================

/// Contents of `.docphrase.json`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProjectConfig {
    /// Rule id globs to disable (`DP001*`).
    #[serde(default)]
    pub disable: Vec<String>,
    /// Severity per rule id.
    #[serde(default)]
    pub severity: BTreeMap<String, Severity>,
    #[serde(default)]
    pub max_sentence_words: Option<usize>,
    #[serde(default)]
    pub max_fix_passes: Option<usize>,
}

impl ProjectConfig {
    pub fn parse(json: &str, path: &Path) -> Result<Self, ConfigError> {
        serde_json::from_str(json).map_err(|source| ConfigError::Json {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load `root/.docphrase.json`; `Ok(None)` when the file does not exist.
    pub fn load(root: &Path) -> Result<Option<Self>, ConfigError> {
        let path = root.join(PROJECT_CONFIG_FILE);
        if !path.exists() {
            return Ok(None);
        }
        let json = std::fs::read_to_string(&path).map_err(|source| ConfigError::Io {
            path: path.clone(),
            source,
        })?;
        ProjectConfig::parse(&json, &path).map(Some)
    }
}

/// Settings taken from the environment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvOverrides {
    pub disable: Vec<String>,
    pub max_fix_passes: Option<usize>,
}

impl EnvOverrides {
    /// Read from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        EnvOverrides::from_vars(std::env::vars())
    }

    /// Read from explicit `(name, value)` pairs.
    pub fn from_vars(vars: impl IntoIterator<Item = (String, String)>) -> Result<Self, ConfigError> {
        let mut overrides = EnvOverrides::default();
        for (key, value) in vars {
            match key.as_str() {
                ENV_DISABLE => {
                    overrides.disable = value
                        .split(',')
                        .map(str::trim)
                        .filter(|s| !s.is_empty())
                        .map(String::from)
                        .collect();
                }
                ENV_MAX_FIX_PASSES => {
                    let passes = value
                        .trim()
                        .parse()
                        .map_err(|_| ConfigError::InvalidValue { key, value })?;
                    overrides.max_fix_passes = Some(passes);
                }
                _ => {}
            }
        }
        Ok(overrides)
    }
}

/// CLI configuration overrides.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CliOverrides {
    /// --disable flags.
    pub disable: Vec<String>,
    /// --max-sentence-words flag.
    pub max_sentence_words: Option<usize>,
    /// --max-fix-passes flag.
    pub max_fix_passes: Option<usize>,
}

// ============================================================================
// Resolution
// ============================================================================

/// Resolved configuration with precedence information.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub disabled: Vec<ConfigValue<String>>,
    pub severity: BTreeMap<String, ConfigValue<Severity>>,
    pub max_sentence_words: ConfigValue<usize>,
    pub max_fix_passes: ConfigValue<usize>,
    disabled_set: GlobSet,
}

impl Default for ResolvedConfig {
    fn default() -> Self {
        ResolvedConfig {
            disabled: Vec::new(),
            severity: BTreeMap::new(),
            max_sentence_words: ConfigValue::new(DEFAULT_MAX_SENTENCE_WORDS, ConfigSource::Default),
            max_fix_passes: ConfigValue::new(DEFAULT_MAX_FIX_PASSES, ConfigSource::Default),
            disabled_set: GlobSet::empty(),
        }
    }
}

impl ResolvedConfig {
    /// Resolve configuration from all sources.
    ///
    /// Precedence (highest to lowest):
    /// 1. CLI flags
    /// 2. Environment variables
    /// 3. Project config (`.docphrase.json`)
    /// 4. Defaults
    pub fn resolve(
        project: Option<&ProjectConfig>,
        env: &EnvOverrides,
        cli: &CliOverrides,
    ) -> Result<Self, ConfigError> {
        let mut config = ResolvedConfig::default();
        if let Some(project) = project {
            config.apply_project_config(project);
        }
        config.apply_env(env);
        config.apply_cli_overrides(cli);
        config.disabled_set = compile_globs(&config.disabled)?;
        Ok(config)
    }

    /// Resolve using the project file under `root` and the process environment.
    pub fn load(root: &Path, cli: &CliOverrides) -> Result<Self, ConfigError> {
        let project = ProjectConfig::load(root)?;
        let env = EnvOverrides::from_env()?;
        ResolvedConfig::resolve(project.as_ref(), &env, cli)
    }

    fn apply_project_config(&mut self, project: &ProjectConfig) {
        let source = ConfigSource::ProjectConfig;
        self.push_disabled(&project.disable, source);
        for (id, severity) in &project.severity {
            self.severity.insert(id.clone(), ConfigValue::new(*severity, source));
        }
        self.set_scalars(project.max_sentence_words, project.max_fix_passes, source);
    }

    fn apply_env(&mut self, env: &EnvOverrides) {
        self.push_disabled(&env.disable, ConfigSource::EnvVar);
        self.set_scalars(None, env.max_fix_passes, ConfigSource::EnvVar);
    }

    fn apply_cli_overrides(&mut self, cli: &CliOverrides) {
        self.push_disabled(&cli.disable, ConfigSource::CliFlag);
        self.set_scalars(cli.max_sentence_words, cli.max_fix_passes, ConfigSource::CliFlag);
    }

    fn push_disabled(&mut self, patterns: &[String], source: ConfigSource) {
        self.disabled
            .extend(patterns.iter().map(|p| ConfigValue::new(p.clone(), source)));
    }

    fn set_scalars(&mut self, words: Option<usize>, passes: Option<usize>, source: ConfigSource) {
        if let Some(words) = words {
            self.max_sentence_words = self.max_sentence_words.clone().merge(ConfigValue::new(words, source));
        }
        if let Some(passes) = passes {
            self.max_fix_passes = self.max_fix_passes.clone().merge(ConfigValue::new(passes, source));
        }
    }

    /// Whether any disabled glob matches `rule_id`.
    pub fn is_disabled(&self, rule_id: &str) -> bool {
        self.disabled_set.is_match(rule_id)
    }

    /// Configured severity for `rule_id`, if overridden.
    pub fn severity_for(&self, rule_id: &str) -> Option<Severity> {
        self.severity.get(rule_id).map(|v| v.value)
    }
}

fn compile_globs(patterns: &[ConfigValue<String>]) -> Result<GlobSet, ConfigError> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = Glob::new(&pattern.value).map_err(|source| ConfigError::InvalidGlob {
            pattern: pattern.value.clone(),
            source,
        })?;
        builder.add(glob);
    }
    builder.build().map_err(|source| ConfigError::InvalidGlob {
        pattern: patterns
            .iter()
            .map(|p| p.value.as_str())
            .collect::<Vec<_>>()
            .join(","),
        source,
    })
}

// ============================================================================
// Tests
// ============================================================================
