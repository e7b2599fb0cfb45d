use std::fmt;
use std::path::{Path, PathBuf};

pub const METADATA_EXT: &str = ".rd";

pub const ENV_BASE_URL: &str = "REDRAFT_BASE_URL";
pub const ENV_KEY: &str = "REDRAFT_KEY";
pub const ENV_MODEL: &str = "REDRAFT_MODEL";

/// Marker for "read this input from standard input".
pub const STDIN_INPUT: &str = "-";

/// Service tuning knobs. Every field is tagged optional: absent means "let
/// the service default apply," and is never conflated with an explicit zero.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ServiceConfig {
    pub base_url: Option<String>,
    pub api_key: Option<String>,
    pub model: Option<String>,

    pub seed: Option<i64>,
    pub temperature: Option<f64>,
    pub top_p: Option<f64>,
}

impl ServiceConfig {
    /// Reads the environment-variable fallbacks. The credential is removed
    /// from the process environment as soon as it has been read so it cannot
    /// leak into child processes.
    pub fn from_env() -> Self {
        let base_url = std::env::var(ENV_BASE_URL).ok();
        let model = std::env::var(ENV_MODEL).ok();

        let api_key = std::env::var(ENV_KEY).ok();
        if api_key.is_some() {
            // Safe here: the tool is single-threaded and this runs during
            // startup, before any other code inspects the environment.
            unsafe { std::env::remove_var(ENV_KEY) };
        }

        Self {
            base_url,
            api_key,
            model,
            seed: None,
            temperature: None,
            top_p: None,
        }
    }

    /// Field-wise overlay: any value present in `overrides` wins over `self`.
    /// Used to layer explicit flags on top of environment fallbacks.
    pub fn overridden_by(self, overrides: ServiceConfig) -> Self {
        Self {
            base_url: overrides.base_url.or(self.base_url),
            api_key: overrides.api_key.or(self.api_key),
            model: overrides.model.or(self.model),
            seed: overrides.seed.or(self.seed),
            temperature: overrides.temperature.or(self.temperature),
            top_p: overrides.top_p.or(self.top_p),
        }
    }
}

/// Immutable run configuration. Built once by the binary and passed by
/// reference into the transaction; there is no ambient global.
#[derive(Debug, Clone)]
pub struct Config {
    /// Input paths, sorted; `-` means stdin and may appear at most once.
    pub inputs: Vec<String>,
    pub output: PathBuf,
    pub metadata: PathBuf,
    pub prompt: String,

    /// Regenerate even when the recorded input matches the current one.
    pub force: bool,
    /// Only rewrite the metadata record from the existing output.
    pub meta_only: bool,
    /// Skip the interactive diff confirmation.
    pub auto_confirm: bool,

    pub service: ServiceConfig,
}

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.inputs.is_empty() {
            return Err(ConfigError::MissingInput);
        }

        let redirects = self.inputs.iter().filter(|i| *i == STDIN_INPUT).count();
        if redirects > 1 {
            return Err(ConfigError::MultipleStdinRedirects);
        }

        Ok(())
    }
}

pub fn default_metadata_path(output: &Path) -> PathBuf {
    let mut os = output.as_os_str().to_owned();
    os.push(METADATA_EXT);
    PathBuf::from(os)
}

#[derive(Debug, PartialEq, Eq)]
pub enum ConfigError {
    MissingInput,
    MultipleStdinRedirects,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::MissingInput => write!(f, "input file path is required"),
            ConfigError::MultipleStdinRedirects => {
                write!(f, "cannot use redirect to stdin for more than one input")
            }
        }
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config() -> Config {
        Config {
            inputs: vec!["notes.md".to_string()],
            output: PathBuf::from("doc.md"),
            metadata: default_metadata_path(Path::new("doc.md")),
            prompt: "summarize".to_string(),
            force: false,
            meta_only: false,
            auto_confirm: false,
            service: ServiceConfig::default(),
        }
    }

    #[test]
    fn metadata_path_appends_fixed_suffix() {
        assert_eq!(
            default_metadata_path(Path::new("out/doc.md")),
            PathBuf::from("out/doc.md.rd")
        );
    }

    #[test]
    fn validation_requires_an_input() {
        let mut cfg = base_config();
        cfg.inputs.clear();

        assert_eq!(cfg.validate(), Err(ConfigError::MissingInput));
    }

    #[test]
    fn validation_rejects_double_stdin() {
        let mut cfg = base_config();
        cfg.inputs = vec!["-".to_string(), "-".to_string()];

        assert_eq!(cfg.validate(), Err(ConfigError::MultipleStdinRedirects));
    }

    #[test]
    fn single_stdin_is_allowed() {
        let mut cfg = base_config();
        cfg.inputs = vec!["-".to_string(), "notes.md".to_string()];

        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn flag_overlay_wins_over_env_values() {
        let env = ServiceConfig {
            base_url: Some("https://env.example".to_string()),
            api_key: Some("env-key".to_string()),
            model: Some("env-model".to_string()),
            seed: None,
            temperature: None,
            top_p: None,
        };
        let flags = ServiceConfig {
            model: Some("flag-model".to_string()),
            temperature: Some(0.0),
            ..Default::default()
        };

        let merged = env.overridden_by(flags);

        assert_eq!(merged.base_url.as_deref(), Some("https://env.example"));
        assert_eq!(merged.api_key.as_deref(), Some("env-key"));
        assert_eq!(merged.model.as_deref(), Some("flag-model"));
        // An explicit zero stays an explicit zero.
        assert_eq!(merged.temperature, Some(0.0));
        assert_eq!(merged.seed, None);
    }
}
