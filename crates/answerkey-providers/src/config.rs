//! Configuration loading and the provider factory.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use answerkey_core::ai::AiGraderConfig;
use answerkey_core::traits::LlmProvider;

use crate::anthropic::AnthropicProvider;
use crate::openai::OpenAiProvider;

/// Configuration for a single hosted-model provider.
///
/// An empty `api_key` is allowed and means the AI tier is not configured.
/// Debug output masks the key.
#[derive(Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ProviderConfig {
    OpenAI {
        #[serde(default)]
        api_key: String,
        #[serde(default)]
        base_url: Option<String>,
        #[serde(default)]
        org_id: Option<String>,
    },
    Anthropic {
        #[serde(default)]
        api_key: String,
        #[serde(default)]
        base_url: Option<String>,
    },
}

fn masked(key: &str) -> &'static str {
    if key.is_empty() {
        "<unset>"
    } else {
        "***"
    }
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProviderConfig::OpenAI {
                api_key,
                base_url,
                org_id,
            } => f
                .debug_struct("OpenAI")
                .field("api_key", &masked(api_key))
                .field("base_url", base_url)
                .field("org_id", org_id)
                .finish(),
            ProviderConfig::Anthropic { api_key, base_url } => f
                .debug_struct("Anthropic")
                .field("api_key", &masked(api_key))
                .field("base_url", base_url)
                .finish(),
        }
    }
}

impl ProviderConfig {
    /// Whether a non-blank credential is present.
    pub fn has_credential(&self) -> bool {
        match self {
            ProviderConfig::OpenAI { api_key, .. } | ProviderConfig::Anthropic { api_key, .. } => {
                !api_key.trim().is_empty()
            }
        }
    }
}

/// Top-level answerkey configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnswerkeyConfig {
    /// Provider configurations keyed by name.
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,
    /// Provider used for AI grading.
    #[serde(default = "default_provider")]
    pub default_provider: String,
    /// Model used for AI grading.
    #[serde(default = "default_model")]
    pub default_model: String,
    /// Sampling temperature (0.0 for reproducible grading).
    #[serde(default)]
    pub temperature: f64,
    /// Max tokens for a grading reply.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// Max students graded concurrently.
    #[serde(default = "default_parallelism")]
    pub parallelism: usize,
    /// Output directory for reports.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
}

fn default_provider() -> String {
    "openai".to_string()
}
fn default_model() -> String {
    "gpt-4.1-mini".to_string()
}
fn default_max_tokens() -> u32 {
    2048
}
fn default_parallelism() -> usize {
    4
}
fn default_output_dir() -> PathBuf {
    PathBuf::from("./answerkey-results")
}

impl Default for AnswerkeyConfig {
    fn default() -> Self {
        Self {
            providers: HashMap::new(),
            default_provider: default_provider(),
            default_model: default_model(),
            temperature: 0.0,
            max_tokens: default_max_tokens(),
            parallelism: default_parallelism(),
            output_dir: default_output_dir(),
        }
    }
}

impl AnswerkeyConfig {
    /// Settings for the AI grading adapter.
    pub fn grader_config(&self) -> AiGraderConfig {
        AiGraderConfig {
            model: self.default_model.clone(),
            max_tokens: self.max_tokens,
            temperature: self.temperature,
            system_prompt_override: None,
        }
    }

    /// The configured default provider, if any.
    pub fn default_provider_config(&self) -> Option<&ProviderConfig> {
        self.providers.get(&self.default_provider)
    }
}

/// Resolve environment variable references like `${VAR_NAME}` in a string.
///
/// Unset variables expand to the empty string.
fn resolve_env_vars(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(start) = rest.find("${") {
        let Some(len) = rest[start..].find('}') else {
            break;
        };
        result.push_str(&rest[..start]);
        let var_name = &rest[start + 2..start + len];
        result.push_str(&std::env::var(var_name).unwrap_or_default());
        rest = &rest[start + len + 1..];
    }
    result.push_str(rest);
    result
}

fn resolve_provider_config(config: &ProviderConfig) -> ProviderConfig {
    let resolve_opt = |v: &Option<String>| v.as_deref().map(resolve_env_vars);
    match config {
        ProviderConfig::OpenAI {
            api_key,
            base_url,
            org_id,
        } => ProviderConfig::OpenAI {
            api_key: resolve_env_vars(api_key),
            base_url: resolve_opt(base_url),
            org_id: resolve_opt(org_id),
        },
        ProviderConfig::Anthropic { api_key, base_url } => ProviderConfig::Anthropic {
            api_key: resolve_env_vars(api_key),
            base_url: resolve_opt(base_url),
        },
    }
}

/// Load configuration from well-known paths.
///
/// Search order:
/// 1. `answerkey.toml` in the current directory
/// 2. `~/.config/answerkey/config.toml`
///
/// Environment variable overrides: `ANSWERKEY_OPENAI_KEY`, `ANSWERKEY_ANTHROPIC_KEY`.
pub fn load_config() -> Result<AnswerkeyConfig> {
    load_config_from(None)
}

/// Load config from an explicit path, or search the default locations.
pub fn load_config_from(path: Option<&Path>) -> Result<AnswerkeyConfig> {
    let config_path = match path {
        Some(p) if p.exists() => Some(p.to_path_buf()),
        Some(p) => anyhow::bail!("config file not found: {}", p.display()),
        None => {
            let local = PathBuf::from("answerkey.toml");
            if local.exists() {
                Some(local)
            } else {
                config_dir()
                    .map(|dir| dir.join("config.toml"))
                    .filter(|global| global.exists())
            }
        }
    };

    let mut config = match config_path {
        Some(path) => {
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read config: {}", path.display()))?;
            let config = parse_config_str(&content)
                .with_context(|| format!("failed to parse config: {}", path.display()))?;
            tracing::debug!(path = %path.display(), "loaded config");
            config
        }
        None => AnswerkeyConfig::default(),
    };

    apply_env_overrides(&mut config);
    Ok(config)
}

/// Parse a TOML configuration string and expand `${VAR}` references.
pub fn parse_config_str(content: &str) -> Result<AnswerkeyConfig> {
    let mut config: AnswerkeyConfig = toml::from_str(content)?;
    config.providers = config
        .providers
        .iter()
        .map(|(k, v)| (k.clone(), resolve_provider_config(v)))
        .collect();
    Ok(config)
}

fn apply_env_overrides(config: &mut AnswerkeyConfig) {
    if let Ok(key) = std::env::var("ANSWERKEY_OPENAI_KEY") {
        let entry = config
            .providers
            .entry("openai".into())
            .or_insert(ProviderConfig::OpenAI {
                api_key: String::new(),
                base_url: None,
                org_id: None,
            });
        if let ProviderConfig::OpenAI { api_key, .. } = entry {
            *api_key = key;
        }
    }

    if let Ok(key) = std::env::var("ANSWERKEY_ANTHROPIC_KEY") {
        let entry = config
            .providers
            .entry("anthropic".into())
            .or_insert(ProviderConfig::Anthropic {
                api_key: String::new(),
                base_url: None,
            });
        if let ProviderConfig::Anthropic { api_key, .. } = entry {
            *api_key = key;
        }
    }
}

fn config_dir() -> Option<PathBuf> {
    std::env::var("HOME")
        .ok()
        .map(|h| PathBuf::from(h).join(".config").join("answerkey"))
}

/// Create a provider instance from its configuration.
///
/// Succeeds even without a credential; the grading adapter checks
/// [`LlmProvider::is_configured`] before calling out.
pub fn create_provider(config: &ProviderConfig) -> Result<Arc<dyn LlmProvider>> {
    let provider: Arc<dyn LlmProvider> = match config {
        ProviderConfig::OpenAI {
            api_key,
            base_url,
            org_id,
        } => Arc::new(OpenAiProvider::new(
            api_key,
            base_url.clone(),
            org_id.clone(),
        )?),
        ProviderConfig::Anthropic { api_key, base_url } => {
            Arc::new(AnthropicProvider::new(api_key, base_url.clone())?)
        }
    };
    Ok(provider)
}
