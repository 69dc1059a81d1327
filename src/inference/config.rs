//! Application configuration loading.
//!
//! Credentials and the default model come from the process environment
//! (after `.env` is loaded); the endpoint list and prompt settings come from
//! an optional `endpoints.yaml` found by walking upward from the working
//! directory.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use super::errors::InferenceError;
use super::prompts::DEFAULT_PROMPT_TEMPLATE;
use super::types::Credentials;

// ─── Constants ───────────────────────────────────────────────────────────────

pub const CONFIG_FILE_NAME: &str = "endpoints.yaml";
pub const DOTENV_FILE_NAME: &str = ".env";
pub const ENV_API_KEY: &str = "OPENPIPE_API_KEY";
pub const ENV_MODEL: &str = "OPENPIPE_MODEL";
pub const ENV_BASE_URL: &str = "OPENPIPE_BASE_URL";
pub const ENV_PROJECT_ROOT: &str = "ONCOLLAMA_PROJECT_ROOT";

const DEFAULT_PROMPTS_DIR: &str = "prompts";

// ─── Public Types ────────────────────────────────────────────────────────────

/// Raw values read from the environment. Blank values count as unset.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvVars {
    pub api_key: Option<String>,
    pub model: Option<String>,
    pub base_url: Option<String>,
}

impl EnvVars {
    /// Read the variables through `lookup` (usually `std::env::var`).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        Self {
            api_key: get(ENV_API_KEY),
            model: get(ENV_MODEL),
            base_url: get(ENV_BASE_URL),
        }
    }
}

/// Shape of `endpoints.yaml`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EndpointsFile {
    /// Selectable model identifiers, first one is the default.
    #[serde(default)]
    pub endpoints: Vec<String>,
    /// Directory holding prompt templates, relative to the config file.
    #[serde(default)]
    pub prompts_dir: Option<String>,
    /// Template used for inference.
    #[serde(default)]
    pub prompt_template: Option<String>,
    /// Top-level keys the validator requires in the extracted document.
    #[serde(default)]
    pub required_keys: Vec<String>,
}

/// Fully resolved configuration the controller starts from.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// `None` when no API key is configured; inference stays disabled.
    pub credentials: Option<Credentials>,
    /// Model requested through `OPENPIPE_MODEL` or the command line.
    pub default_model: Option<String>,
    pub endpoints: Vec<String>,
    pub prompts_dir: PathBuf,
    pub prompt_template: String,
    pub required_keys: Vec<String>,
    /// Where `endpoints.yaml` was found, if anywhere.
    pub source: Option<PathBuf>,
}

impl AppConfig {
    /// Build the config from environment values and an optional parsed file.
    ///
    /// `base_dir` anchors a relative `prompts_dir`.
    pub fn resolve(env: EnvVars, file: Option<(PathBuf, EndpointsFile)>, base_dir: &Path) -> Self {
        let (source, file) = match file {
            Some((path, file)) => (Some(path), file),
            None => (None, EndpointsFile::default()),
        };
        let anchor = source
            .as_deref()
            .and_then(Path::parent)
            .unwrap_or(base_dir)
            .to_path_buf();

        let mut endpoints: Vec<String> = Vec::new();
        for e in file.endpoints.iter().map(|e| e.trim()).filter(|e| !e.is_empty()) {
            if !endpoints.iter().any(|seen| seen == e) {
                endpoints.push(e.to_string());
            }
        }
        if endpoints.is_empty() {
            if let Some(model) = &env.model {
                endpoints.push(model.clone());
            }
        }

        let prompts_dir = anchor.join(file.prompts_dir.as_deref().unwrap_or(DEFAULT_PROMPTS_DIR));

        Self {
            credentials: env.api_key.map(|api_key| Credentials {
                api_key,
                base_url: env.base_url,
            }),
            default_model: env.model,
            endpoints,
            prompts_dir,
            prompt_template: file
                .prompt_template
                .unwrap_or_else(|| DEFAULT_PROMPT_TEMPLATE.to_string()),
            required_keys: file.required_keys,
            source,
        }
    }

    /// Model selected at startup: the requested default when it is one of the
    /// endpoints, otherwise the first endpoint.
    pub fn initial_model(&self) -> Option<&str> {
        match &self.default_model {
            Some(model) if self.endpoints.contains(model) => Some(model.as_str()),
            _ => self.endpoints.first().map(String::as_str),
        }
    }
}

// ─── Loading ─────────────────────────────────────────────────────────────────

/// Load the nearest `.env` at or above `start` into the process environment.
///
/// Runs before logging is initialised so `RUST_LOG` can come from the file.
/// Variables already set in the environment are left alone.
pub fn load_dotenv(start: &Path) -> Result<Option<PathBuf>, dotenv::Error> {
    let Some(path) = start
        .ancestors()
        .map(|dir| dir.join(DOTENV_FILE_NAME))
        .find(|candidate| candidate.is_file())
    else {
        return Ok(None);
    };
    dotenv::from_path(&path)?;
    Ok(Some(path))
}

/// Read the environment. `.env` must already be loaded.
pub fn load_env_vars() -> EnvVars {
    EnvVars::from_lookup(|key| std::env::var(key).ok())
}

/// Find `endpoints.yaml`.
///
/// Checks `ONCOLLAMA_PROJECT_ROOT` first, then walks upward from `start`.
/// Returns `None` when no file exists; that is not an error.
pub fn find_config_path(start: &Path) -> Option<PathBuf> {
    if let Ok(root) = std::env::var(ENV_PROJECT_ROOT) {
        let candidate = PathBuf::from(&root).join(CONFIG_FILE_NAME);
        if candidate.is_file() {
            return Some(candidate);
        }
    }

    let mut dir = start.to_path_buf();
    loop {
        let candidate = dir.join(CONFIG_FILE_NAME);
        if candidate.is_file() {
            return Some(candidate);
        }
        if !dir.pop() {
            return None;
        }
    }
}

/// Read and parse an endpoints file, interpolating `${VAR}` and
/// `${VAR:-default}` from the environment first.
pub fn load_endpoints_file(path: &Path) -> Result<EndpointsFile, InferenceError> {
    let raw = std::fs::read_to_string(path).map_err(|e| InferenceError::ConfigError {
        reason: format!("failed to read {}: {e}", path.display()),
    })?;

    let interpolated = interpolate_env_vars(&raw, |key| std::env::var(key).ok());

    // An empty file is an empty config, not a parse error.
    if interpolated.trim().is_empty() {
        return Ok(EndpointsFile::default());
    }

    serde_yaml::from_str(&interpolated).map_err(|e| InferenceError::ConfigError {
        reason: format!("failed to parse {}: {e}", path.display()),
    })
}

/// Load everything the app needs to start.
///
/// `explicit` is a config path given on the command line; it must exist.
pub fn load_app_config(start: &Path, explicit: Option<&Path>) -> Result<AppConfig, InferenceError> {
    let env = load_env_vars();

    let path = match explicit {
        Some(p) if !p.is_file() => {
            return Err(InferenceError::ConfigError {
                reason: format!("config file {} does not exist", p.display()),
            })
        }
        Some(p) => Some(p.to_path_buf()),
        None => find_config_path(start),
    };

    let file = match path {
        Some(path) => {
            let parsed = load_endpoints_file(&path)?;
            tracing::info!(
                path = %path.display(),
                endpoints = parsed.endpoints.len(),
                "loaded endpoint config"
            );
            Some((path, parsed))
        }
        None => {
            tracing::info!("no {CONFIG_FILE_NAME} found, using environment only");
            None
        }
    };

    Ok(AppConfig::resolve(env, file, start))
}

// ─── Env-var interpolation ───────────────────────────────────────────────────

/// Replace `${VAR}` and `${VAR:-default}` in a string.
fn interpolate_env_vars(input: &str, lookup: impl Fn(&str) -> Option<String>) -> String {
    let mut result = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && chars.peek() == Some(&'{') {
            chars.next();
            let mut var_expr = String::new();
            for c in chars.by_ref() {
                if c == '}' {
                    break;
                }
                var_expr.push(c);
            }
            result.push_str(&resolve_var_expr(&var_expr, &lookup));
        } else {
            result.push(ch);
        }
    }

    result
}

/// Resolve `VAR` or `VAR:-default`.
fn resolve_var_expr(expr: &str, lookup: &impl Fn(&str) -> Option<String>) -> String {
    match expr.split_once(":-") {
        Some((name, default)) => lookup(name).unwrap_or_else(|| expand_tilde(default)),
        None => lookup(expr).unwrap_or_default(),
    }
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &str) -> String {
    if let Some(rest) = path.strip_prefix('~') {
        if let Some(home) = dirs::home_dir() {
            return format!("{}{rest}", home.display());
        }
    }
    path.to_string()
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    fn env(api_key: Option<&str>, model: Option<&str>) -> EnvVars {
        EnvVars {
            api_key: api_key.map(String::from),
            model: model.map(String::from),
            base_url: None,
        }
    }

    #[test]
    fn test_load_dotenv_walks_up_from_start() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(DOTENV_FILE_NAME),
            "ONCOLLAMA_DOTENV_WALK_TEST=debug\n",
        )
        .unwrap();
        let nested = dir.path().join("reports").join("2024");
        std::fs::create_dir_all(&nested).unwrap();

        let loaded = load_dotenv(&nested).unwrap();

        assert_eq!(loaded, Some(dir.path().join(DOTENV_FILE_NAME)));
        assert_eq!(
            std::env::var("ONCOLLAMA_DOTENV_WALK_TEST").as_deref(),
            Ok("debug")
        );
    }

    #[test]
    fn test_env_vars_blank_values_are_unset() {
        let vars = EnvVars::from_lookup(lookup_from(&[
            (ENV_API_KEY, "  opk_123 "),
            (ENV_MODEL, ""),
            (ENV_BASE_URL, "https://proxy.local/v1"),
        ]));
        assert_eq!(vars.api_key.as_deref(), Some("opk_123"));
        assert!(vars.model.is_none());
        assert_eq!(vars.base_url.as_deref(), Some("https://proxy.local/v1"));
    }

    #[test]
    fn test_interpolate_with_default() {
        let lookup = lookup_from(&[]);
        assert_eq!(
            interpolate_env_vars("${__UNSET__:-openpipe:fallback}", lookup),
            "openpipe:fallback"
        );
    }

    #[test]
    fn test_interpolate_with_value() {
        let lookup = lookup_from(&[("MODEL_ID", "openpipe:onco-v3")]);
        assert_eq!(
            interpolate_env_vars("- ${MODEL_ID:-other}", lookup),
            "- openpipe:onco-v3"
        );
    }

    #[test]
    fn test_interpolate_no_vars() {
        let input = "endpoints: [a, b]";
        assert_eq!(interpolate_env_vars(input, lookup_from(&[])), input);
    }

    #[test]
    fn test_expand_tilde() {
        let result = expand_tilde("~/prompts");
        assert!(!result.starts_with('~'), "tilde should be expanded");
        assert!(result.ends_with("/prompts"));
    }

    #[test]
    fn test_endpoints_file_parse() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(
            &path,
            "endpoints:\n  - openpipe:onco-v3\n  - openpipe:onco-v2\nprompts_dir: templates\nrequired_keys: [diagnosis]\n",
        )
        .unwrap();

        let file = load_endpoints_file(&path).unwrap();
        assert_eq!(file.endpoints, vec!["openpipe:onco-v3", "openpipe:onco-v2"]);
        assert_eq!(file.prompts_dir.as_deref(), Some("templates"));
        assert!(file.prompt_template.is_none());
        assert_eq!(file.required_keys, vec!["diagnosis"]);
    }

    #[test]
    fn test_empty_endpoints_file_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&path, "\n").unwrap();
        assert!(load_endpoints_file(&path).unwrap().endpoints.is_empty());
    }

    #[test]
    fn test_malformed_endpoints_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&path, "endpoints: {unclosed").unwrap();
        let err = load_endpoints_file(&path).unwrap_err();
        assert!(matches!(err, InferenceError::ConfigError { .. }));
    }

    #[test]
    fn test_find_config_path_walks_upward() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE_NAME), "endpoints: []").unwrap();
        let nested = dir.path().join("a/b/c");
        std::fs::create_dir_all(&nested).unwrap();

        let found = find_config_path(&nested).unwrap();
        assert_eq!(found, dir.path().join(CONFIG_FILE_NAME));
    }

    #[test]
    fn test_resolve_without_file_uses_env_model() {
        let base = Path::new("/work");
        let config = AppConfig::resolve(env(Some("k"), Some("openpipe:env-model")), None, base);
        assert_eq!(config.endpoints, vec!["openpipe:env-model"]);
        assert_eq!(config.initial_model(), Some("openpipe:env-model"));
        assert_eq!(config.prompts_dir, base.join("prompts"));
        assert_eq!(config.prompt_template, DEFAULT_PROMPT_TEMPLATE);
        assert!(config.source.is_none());
    }

    #[test]
    fn test_resolve_without_key_has_no_credentials() {
        let config = AppConfig::resolve(env(None, Some("m")), None, Path::new("."));
        assert!(config.credentials.is_none());
    }

    #[test]
    fn test_resolve_with_file() {
        let file = EndpointsFile {
            endpoints: vec!["a".into(), " b ".into(), "a".into(), "".into()],
            prompts_dir: Some("templates".into()),
            prompt_template: Some("v2.txt".into()),
            required_keys: vec![],
        };
        let config = AppConfig::resolve(
            env(Some("k"), Some("b")),
            Some((PathBuf::from("/proj/endpoints.yaml"), file)),
            Path::new("/elsewhere"),
        );
        assert_eq!(config.endpoints, vec!["a", "b"]);
        assert_eq!(config.initial_model(), Some("b"));
        assert_eq!(config.prompts_dir, PathBuf::from("/proj/templates"));
        assert_eq!(config.prompt_template, "v2.txt");
    }

    #[test]
    fn test_initial_model_ignores_unknown_default() {
        let file = EndpointsFile {
            endpoints: vec!["first".into(), "second".into()],
            ..Default::default()
        };
        let config = AppConfig::resolve(
            env(Some("k"), Some("not-listed")),
            Some((PathBuf::from("/p/endpoints.yaml"), file)),
            Path::new("/p"),
        );
        assert_eq!(config.initial_model(), Some("first"));
    }

    #[test]
    fn test_resolve_no_endpoints_anywhere() {
        let config = AppConfig::resolve(env(Some("k"), None), None, Path::new("."));
        assert!(config.endpoints.is_empty());
        assert!(config.initial_model().is_none());
    }
}
