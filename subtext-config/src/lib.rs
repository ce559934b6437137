//! Loader for Subtext configuration with YAML + environment overlays.
//!
//! Sources are merged in this order, later ones winning:
//!
//! 1. built-in defaults (every field has one),
//! 2. an optional `subtext.yaml` in the user config dir, then in the working dir,
//! 3. an explicit file (`--config`) or inline YAML,
//! 4. `SUBTEXT__`-prefixed environment variables (`SUBTEXT__LLM__MODEL=...`).
//!
//! String values may reference environment variables as `${VAR}` or `$VAR`;
//! expansion is recursive up to a fixed depth so cycles terminate.
use config::{Config, ConfigError, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::{Path, PathBuf};
use subtext_common::SchemaVersion;

const MAXIMUM_ENV_EXPANSION_DEPTH: usize = 8;

pub const ENV_PREFIX: &str = "SUBTEXT";
pub const DEFAULT_FILE_STEM: &str = "subtext";
pub const DEFAULT_MODEL: &str = "gpt-4.1-mini";
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_API_KEY_ENV: &str = "OPENAI_API_KEY";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SubtextConfig {
    pub llm: LlmConfig,
    pub acquisition: AcquisitionConfig,
    pub analysis: AnalysisConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LlmProvider {
    /// OpenAI or any gateway speaking its chat-completions API.
    #[default]
    Openai,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub provider: LlmProvider,
    pub model: String,
    /// Explicit key; when unset the key is read from `api_key_env`.
    pub api_key: Option<String>,
    pub api_key_env: String,
    pub base_url: String,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    /// Temperature for reply drafting; falls back to `temperature`.
    pub reply_temperature: Option<f32>,
    pub timeout_secs: u64,
    /// Automatic retries on 429/5xx. Zero means a failure is final.
    pub max_retries: usize,
    pub json_mode: bool,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: LlmProvider::Openai,
            model: DEFAULT_MODEL.into(),
            api_key: None,
            api_key_env: DEFAULT_API_KEY_ENV.into(),
            base_url: DEFAULT_BASE_URL.into(),
            temperature: Some(0.2),
            max_tokens: Some(1500),
            reply_temperature: Some(0.7),
            timeout_secs: 60,
            max_retries: 0,
            json_mode: true,
        }
    }
}

impl LlmConfig {
    /// The explicit key if it is set and fully expanded, otherwise the value
    /// of `api_key_env`. `None` when neither yields a non-empty key.
    pub fn resolve_api_key(&self) -> Option<String> {
        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty() && !k.contains("${"))
            .map(str::to_string)
            .or_else(|| {
                std::env::var(&self.api_key_env)
                    .ok()
                    .map(|k| k.trim().to_string())
                    .filter(|k| !k.is_empty())
            })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AcquisitionConfig {
    pub timeout_secs: u64,
    pub max_redirects: usize,
    pub min_words: usize,
    pub min_block_words: usize,
    pub max_chars: usize,
    /// Pages whose body exceeds this are refused before extraction.
    pub max_page_bytes: usize,
    /// Overrides the built-in browser user agent.
    pub user_agent: Option<String>,
}

impl Default for AcquisitionConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 15,
            max_redirects: 5,
            min_words: 50,
            min_block_words: 25,
            max_chars: 12_000,
            max_page_bytes: 5 * 1024 * 1024,
            user_agent: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub schema: SchemaVersion,
    /// How many reply drafts to ask for.
    pub reply_count: usize,
    pub reply_max_tokens: Option<u32>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            schema: SchemaVersion::V2,
            reply_count: 3,
            reply_max_tokens: Some(600),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `text` or `json`.
    pub format: String,
    /// EnvFilter directive used when `RUST_LOG` is unset.
    pub filter: String,
    /// Log directory; `SUBTEXT_LOG_DIR` and the data dir are the fallbacks.
    pub dir: Option<PathBuf>,
    /// Mirror logs to stderr (never in the TUI).
    pub stderr: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: "text".into(),
            filter: "info".into(),
            dir: None,
            stderr: false,
        }
    }
}

impl SubtextConfig {
    /// Reject values no run could work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let fail = |msg: String| Err(ConfigError::Message(msg));
        if self.llm.model.trim().is_empty() {
            return fail("llm.model must not be empty".into());
        }
        if url_scheme(&self.llm.base_url).is_none() {
            return fail(format!("llm.base_url '{}' is not an http(s) URL", self.llm.base_url));
        }
        for (name, t) in [
            ("llm.temperature", self.llm.temperature),
            ("llm.reply_temperature", self.llm.reply_temperature),
        ] {
            if let Some(t) = t {
                if !(0.0..=2.0).contains(&t) {
                    return fail(format!("{name} must be within 0.0..=2.0, got {t}"));
                }
            }
        }
        if self.llm.timeout_secs == 0 || self.acquisition.timeout_secs == 0 {
            return fail("timeouts must be at least one second".into());
        }
        if self.acquisition.min_words == 0 {
            return fail("acquisition.min_words must be greater than zero".into());
        }
        if self.acquisition.max_chars == 0 {
            return fail("acquisition.max_chars must be greater than zero".into());
        }
        if self.acquisition.max_page_bytes < 1024 {
            return fail("acquisition.max_page_bytes must be at least 1024".into());
        }
        if !(1..=5).contains(&self.analysis.reply_count) {
            return fail(format!(
                "analysis.reply_count must be within 1..=5, got {}",
                self.analysis.reply_count
            ));
        }
        if !matches!(self.logging.format.as_str(), "text" | "json") {
            return fail(format!(
                "logging.format must be 'text' or 'json', got '{}'",
                self.logging.format
            ));
        }
        Ok(())
    }
}

fn url_scheme(url: &str) -> Option<&str> {
    let (scheme, rest) = url.split_once("://")?;
    (matches!(scheme, "http" | "https") && !rest.is_empty()).then_some(scheme)
}

fn expand_env_in_value(v: &mut Value) {
    match v {
        Value::String(s) => {
            if s.contains('$') {
                let mut cur = std::mem::take(s);
                for _ in 0..MAXIMUM_ENV_EXPANSION_DEPTH {
                    let expanded = match shellexpand::env(&cur) {
                        Ok(cow) => cow.into_owned(),
                        Err(_) => cur.clone(),
                    };
                    if expanded == cur {
                        break;
                    }
                    cur = expanded;
                }
                *s = cur;
            }
        }
        Value::Array(arr) => arr.iter_mut().for_each(expand_env_in_value),
        Value::Object(obj) => obj.values_mut().for_each(expand_env_in_value),
        _ => {}
    }
}

/// Standard places an implicit `subtext.yaml` is looked up, lowest priority first.
pub fn default_search_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();
    if let Some(dir) = dirs::config_dir() {
        paths.push(dir.join("subtext").join(DEFAULT_FILE_STEM));
    }
    paths.push(PathBuf::from(DEFAULT_FILE_STEM));
    paths
}

/// Builder hides the `config` crate wiring (YAML + env overrides).
pub struct SubtextConfigLoader {
    builder: config::ConfigBuilder<config::builder::DefaultState>,
    env: bool,
}

impl Default for SubtextConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl SubtextConfigLoader {
    /// Defaults plus `SUBTEXT__` env overrides; no files.
    ///
    /// ```
    /// use subtext_config::SubtextConfigLoader;
    ///
    /// let cfg = SubtextConfigLoader::new()
    ///     .with_yaml_str("llm:\n  model: gpt-4o-mini\n")
    ///     .load()
    ///     .expect("valid config");
    ///
    /// assert_eq!(cfg.llm.model, "gpt-4o-mini");
    /// assert_eq!(cfg.acquisition.min_words, 50);
    /// ```
    pub fn new() -> Self {
        Self {
            builder: Config::builder(),
            env: true,
        }
    }

    /// Skip the environment overlay (tests, `--no-env` style callers).
    pub fn without_env(mut self) -> Self {
        self.env = false;
        self
    }

    /// Add the implicit `subtext.yaml` lookups; missing files are fine.
    pub fn with_default_files(mut self) -> Self {
        for stem in default_search_paths() {
            self.builder = self
                .builder
                .add_source(File::with_name(&stem.to_string_lossy()).required(false));
        }
        self
    }

    /// Attach an explicit file; the `config` crate infers the format by suffix.
    pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.builder = self
            .builder
            .add_source(File::from(path.as_ref()).required(true));
        self
    }

    /// Attach a file that may be absent.
    pub fn with_optional_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.builder = self
            .builder
            .add_source(File::from(path.as_ref()).required(false));
        self
    }

    /// Merge an inline YAML snippet.
    pub fn with_yaml_str(mut self, yaml: &str) -> Self {
        self.builder = self.builder.add_source(File::from_str(yaml, FileFormat::Yaml));
        self
    }

    /// Merge all sources, expand `${VAR}` placeholders, then deserialize and
    /// validate.
    pub fn load(self) -> Result<SubtextConfig, ConfigError> {
        let mut builder = self.builder;
        if self.env {
            builder = builder.add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            );
        }
        let cfg = builder.build()?;

        let mut v: Value = cfg.try_deserialize()?;
        expand_env_in_value(&mut v);

        let typed: SubtextConfig =
            serde_json::from_value(v).map_err(|e| ConfigError::Message(e.to_string()))?;
        typed.validate()?;
        Ok(typed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn expands_placeholders_inside_nested_values() {
        temp_env::with_vars(
            [("GATEWAY_HOST", Some("llm.internal")), ("GATEWAY_PORT", Some("8443"))],
            || {
                let mut v = json!({
                    "llm": { "base_url": "https://${GATEWAY_HOST}:${GATEWAY_PORT}/v1" },
                    "tags": ["$GATEWAY_HOST", 3, false]
                });
                expand_env_in_value(&mut v);
                assert_eq!(v["llm"]["base_url"], "https://llm.internal:8443/v1");
                assert_eq!(v["tags"], json!(["llm.internal", 3, false]));
            },
        );
    }

    #[test]
    fn expansion_follows_indirection() {
        temp_env::with_vars(
            [("KEY_SOURCE", Some("${REAL_KEY}")), ("REAL_KEY", Some("sk-live"))],
            || {
                let mut v = json!("${KEY_SOURCE}");
                expand_env_in_value(&mut v);
                assert_eq!(v, json!("sk-live"));
            },
        );
    }

    #[test]
    fn cyclic_references_terminate() {
        temp_env::with_vars([("PING", Some("${PONG}")), ("PONG", Some("${PING}"))], || {
            let mut v = json!("<${PING}>");
            expand_env_in_value(&mut v);
            let s = v.as_str().unwrap();
            assert!(s.starts_with('<') && s.ends_with('>'));
            assert!(s.contains("${"));
        });
    }

    #[test]
    fn unset_placeholder_is_kept_and_not_used_as_key() {
        temp_env::with_vars(
            [("SUBTEXT_TEST_MISSING", None::<&str>), ("SUBTEXT_TEST_KEY", Some("sk-env"))],
            || {
                let mut v = json!("${SUBTEXT_TEST_MISSING}");
                expand_env_in_value(&mut v);
                assert_eq!(v, json!("${SUBTEXT_TEST_MISSING}"));

                let llm = LlmConfig {
                    api_key: v.as_str().map(str::to_string),
                    api_key_env: "SUBTEXT_TEST_KEY".into(),
                    ..LlmConfig::default()
                };
                assert_eq!(llm.resolve_api_key().as_deref(), Some("sk-env"));
            },
        );
    }

    #[test]
    fn defaults_are_valid() {
        let cfg = SubtextConfig::default();
        cfg.validate().unwrap();
        assert_eq!(cfg.llm.max_retries, 0);
        assert_eq!(cfg.analysis.schema, SchemaVersion::V2);
        assert_eq!(cfg.acquisition.max_chars, 12_000);
    }

    #[test]
    fn zero_min_words_is_rejected() {
        let mut cfg = SubtextConfig::default();
        cfg.acquisition.min_words = 0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn tiny_page_cap_is_rejected() {
        let mut cfg = SubtextConfig::default();
        cfg.acquisition.max_page_bytes = 10;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn base_url_must_be_http() {
        let mut cfg = SubtextConfig::default();
        cfg.llm.base_url = "ftp://example.com".into();
        assert!(cfg.validate().is_err());
        cfg.llm.base_url = "http://localhost:8080/v1".into();
        assert!(cfg.validate().is_ok());
    }
}
