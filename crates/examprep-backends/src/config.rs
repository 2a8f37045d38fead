//! Backend configuration and factory.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

use examprep_core::config::ExamConfig;
use examprep_core::traits::{GradingService, QuestionProvider};

use crate::bank::{QuestionBank, DEFAULT_PASS_RATIO};
use crate::http::HttpBackend;

/// Name of the backend created from `EXAMPREP_API_BASE`.
pub const REMOTE_BACKEND: &str = "remote";

/// Configuration for a single backend.
///
/// Note: Custom Debug impl masks the API token to keep it out of logs.
#[derive(Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum BackendConfig {
    Http {
        base_url: String,
        #[serde(default)]
        timeout_secs: Option<u64>,
        #[serde(default)]
        api_token: Option<String>,
    },
    Bank {
        path: PathBuf,
        #[serde(default = "default_pass_ratio")]
        pass_ratio: f64,
        #[serde(default)]
        seed: Option<u64>,
    },
}

impl std::fmt::Debug for BackendConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendConfig::Http {
                base_url,
                timeout_secs,
                api_token,
            } => f
                .debug_struct("Http")
                .field("base_url", base_url)
                .field("timeout_secs", timeout_secs)
                .field("api_token", &api_token.as_ref().map(|_| "***"))
                .finish(),
            BackendConfig::Bank {
                path,
                pass_ratio,
                seed,
            } => f
                .debug_struct("Bank")
                .field("path", path)
                .field("pass_ratio", pass_ratio)
                .field("seed", seed)
                .finish(),
        }
    }
}

fn default_pass_ratio() -> f64 {
    DEFAULT_PASS_RATIO
}

/// Top-level examprep configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExamprepConfig {
    /// Backend configurations keyed by name.
    #[serde(default)]
    pub backends: HashMap<String, BackendConfig>,
    /// Backend used when none is named on the command line.
    #[serde(default = "default_backend")]
    pub default_backend: String,
    /// Exam length and countdown.
    #[serde(default)]
    pub exam: ExamConfig,
}

fn default_backend() -> String {
    REMOTE_BACKEND.to_string()
}

impl Default for ExamprepConfig {
    fn default() -> Self {
        Self {
            backends: HashMap::new(),
            default_backend: default_backend(),
            exam: ExamConfig::default(),
        }
    }
}

impl ExamprepConfig {
    /// Look up a backend by name, falling back to `default_backend`.
    pub fn backend(&self, name: Option<&str>) -> Result<(&str, &BackendConfig)> {
        let name = name.unwrap_or(&self.default_backend);
        match self.backends.get_key_value(name) {
            Some((k, v)) => Ok((k.as_str(), v)),
            None => {
                let mut known: Vec<_> = self.backends.keys().map(String::as_str).collect();
                known.sort_unstable();
                anyhow::bail!(
                    "backend '{name}' is not configured (known: {}). Run `examprep init` or set EXAMPREP_API_BASE",
                    if known.is_empty() {
                        "none".to_string()
                    } else {
                        known.join(", ")
                    }
                )
            }
        }
    }
}

/// Resolve environment variable references like `${VAR_NAME}` in a string.
///
/// Substituted values are not scanned again.
fn resolve_env_vars(s: &str) -> String {
    let mut result = s.to_string();
    let mut cursor = 0;
    while let Some(offset) = result[cursor..].find("${") {
        let start = cursor + offset;
        let Some(end) = result[start..].find('}') else {
            break;
        };
        let value = std::env::var(&result[start + 2..start + end]).unwrap_or_default();
        result.replace_range(start..start + end + 1, &value);
        cursor = start + value.len();
    }
    result
}

/// Resolve env vars, and make bank paths relative to the config file.
fn resolve_backend_config(config: &BackendConfig, base_dir: Option<&Path>) -> BackendConfig {
    match config {
        BackendConfig::Http {
            base_url,
            timeout_secs,
            api_token,
        } => BackendConfig::Http {
            base_url: resolve_env_vars(base_url),
            timeout_secs: *timeout_secs,
            api_token: api_token.as_deref().map(resolve_env_vars),
        },
        BackendConfig::Bank {
            path,
            pass_ratio,
            seed,
        } => {
            let path = PathBuf::from(resolve_env_vars(&path.to_string_lossy()));
            let path = match base_dir {
                Some(dir) if path.is_relative() => dir.join(path),
                _ => path,
            };
            BackendConfig::Bank {
                path,
                pass_ratio: *pass_ratio,
                seed: *seed,
            }
        }
    }
}

/// Load configuration from well-known paths.
///
/// Search order:
/// 1. `examprep.toml` in the current directory
/// 2. `~/.config/examprep/config.toml`
///
/// Environment variable overrides: `EXAMPREP_API_BASE`, `EXAMPREP_API_TOKEN`.
pub fn load_config() -> Result<ExamprepConfig> {
    load_config_from(None)
}

/// Load config from an explicit path, or search the default locations.
pub fn load_config_from(path: Option<&Path>) -> Result<ExamprepConfig> {
    let config_path = match path {
        Some(p) if p.exists() => Some(p.to_path_buf()),
        Some(p) => anyhow::bail!("config file not found: {}", p.display()),
        None => {
            let local = PathBuf::from("examprep.toml");
            if local.exists() {
                Some(local)
            } else {
                dirs_path()
                    .map(|dir| dir.join("config.toml"))
                    .filter(|global| global.exists())
            }
        }
    };

    let mut config = match &config_path {
        Some(path) => {
            debug!(path = %path.display(), "loading config");
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read config: {}", path.display()))?;
            toml::from_str::<ExamprepConfig>(&content)
                .with_context(|| format!("failed to parse config: {}", path.display()))?
        }
        None => ExamprepConfig::default(),
    };

    if let Ok(url) = std::env::var("EXAMPREP_API_BASE") {
        match config.backends.get_mut(REMOTE_BACKEND) {
            Some(BackendConfig::Http { base_url, .. }) => *base_url = url,
            _ => {
                config.backends.insert(
                    REMOTE_BACKEND.into(),
                    BackendConfig::Http {
                        base_url: url,
                        timeout_secs: None,
                        api_token: None,
                    },
                );
            }
        }
    }

    if let Ok(token) = std::env::var("EXAMPREP_API_TOKEN") {
        if let Some(BackendConfig::Http { api_token, .. }) =
            config.backends.get_mut(REMOTE_BACKEND)
        {
            *api_token = Some(token);
        }
    }

    let base_dir = config_path
        .as_deref()
        .and_then(Path::parent)
        .filter(|dir| !dir.as_os_str().is_empty());
    config.backends = config
        .backends
        .iter()
        .map(|(k, v)| (k.clone(), resolve_backend_config(v, base_dir)))
        .collect();

    config
        .exam
        .validate()
        .context("invalid [exam] section")?;

    Ok(config)
}

fn dirs_path() -> Option<PathBuf> {
    std::env::var("HOME")
        .ok()
        .map(|h| PathBuf::from(h).join(".config").join("examprep"))
}

/// A constructed backend: where questions come from and who grades them.
pub struct Backend {
    pub name: String,
    pub questions: Arc<dyn QuestionProvider>,
    pub grading: Arc<dyn GradingService>,
}

/// Create a backend instance from its configuration.
///
/// A bank backend samples `exam.question_count` questions per exam.
pub fn create_backend(name: &str, config: &BackendConfig, exam: &ExamConfig) -> Result<Backend> {
    match config {
        BackendConfig::Http {
            base_url,
            timeout_secs,
            api_token,
        } => {
            let backend = Arc::new(HttpBackend::new(
                base_url,
                api_token.clone(),
                *timeout_secs,
            )?);
            Ok(Backend {
                name: name.to_string(),
                questions: backend.clone(),
                grading: backend,
            })
        }
        BackendConfig::Bank {
            path,
            pass_ratio,
            seed,
        } => {
            let mut bank =
                QuestionBank::load(path, exam.question_count)?.with_pass_ratio(*pass_ratio)?;
            if let Some(seed) = seed {
                bank = bank.with_seed(*seed);
            }
            let bank = Arc::new(bank);
            Ok(Backend {
                name: name.to_string(),
                questions: bank.clone(),
                grading: bank,
            })
        }
    }
}
