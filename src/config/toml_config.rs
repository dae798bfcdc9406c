use crate::adapters::presenter::OutputFormat;
use crate::core::orchestrator::{MAX_WORKERS, MIN_WORKERS};
use crate::core::pipeline::{DEFAULT_DEVICE_OWNER, DEFAULT_MAX_WORKERS};
use crate::core::ConfigProvider;
use crate::utils::error::{Result, UnusedPortsError};
use crate::utils::validation::{
    validate_non_empty_string, validate_path, validate_positive_number, validate_range,
    validate_url, validate_uuid, Validate,
};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::OnceLock;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TomlConfig {
    pub inventory: InventoryConfig,
    #[serde(default)]
    pub classifier: ClassifierConfig,
    #[serde(default)]
    pub probe: ProbeConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InventoryConfig {
    /// File path or Neutron endpoint URL.
    pub source: String,
    pub auth_token: Option<String>,
    pub project_id: Option<String>,
    pub network_id: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClassifierConfig {
    pub device_owner: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProbeConfig {
    pub enabled: Option<bool>,
    pub max_workers: Option<usize>,
    pub timeout_seconds: Option<u64>,
    pub batch_deadline_seconds: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OutputConfig {
    pub format: Option<OutputFormat>,
    pub explain: Option<bool>,
}

fn env_var_regex() -> &'static Regex {
    static ENV_RE: OnceLock<Regex> = OnceLock::new();
    ENV_RE.get_or_init(|| Regex::new(r"\$\{([^}]+)\}").expect("env var pattern is a valid regex"))
}

fn is_unresolved(value: &str) -> bool {
    env_var_regex().is_match(value)
}

impl TomlConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(UnusedPortsError::IoError)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content);

        toml::from_str(&processed_content).map_err(|e| UnusedPortsError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// Replaces `${VAR}` with the variable's value; unknown variables are left untouched.
    fn substitute_env_vars(content: &str) -> String {
        env_var_regex()
            .replace_all(content, |caps: &regex::Captures| {
                let var_name = &caps[1];
                std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
            })
            .into_owned()
    }

    pub fn validate_config(&self) -> Result<()> {
        let source = &self.inventory.source;
        validate_non_empty_string("inventory.source", source)?;
        if source.starts_with("http://") || source.starts_with("https://") {
            validate_url("inventory.source", source)?;
        } else {
            validate_path("inventory.source", source)?;
        }

        if let Some(network_id) = &self.inventory.network_id {
            validate_uuid("inventory.network_id", network_id)?;
        }

        if let Some(max_workers) = self.probe.max_workers {
            validate_range("probe.max_workers", max_workers, MIN_WORKERS, MAX_WORKERS)?;
        }

        if let Some(timeout) = self.probe.timeout_seconds {
            validate_positive_number("probe.timeout_seconds", timeout, 1)?;
        }

        if let Some(deadline) = self.probe.batch_deadline_seconds {
            validate_positive_number("probe.batch_deadline_seconds", deadline, 1)?;
        }

        Ok(())
    }

    pub fn inventory_source(&self) -> &str {
        &self.inventory.source
    }

    /// `None` when the token is absent or still an unresolved `${VAR}`.
    pub fn auth_token(&self) -> Option<&str> {
        self.inventory
            .auth_token
            .as_deref()
            .filter(|token| !token.is_empty() && !is_unresolved(token))
    }

    pub fn output_format(&self) -> OutputFormat {
        self.output.format.unwrap_or_default()
    }

    pub fn explain(&self) -> bool {
        self.output.explain.unwrap_or(false)
    }
}

impl ConfigProvider for TomlConfig {
    fn expected_device_owner(&self) -> &str {
        self.classifier
            .device_owner
            .as_deref()
            .unwrap_or(DEFAULT_DEVICE_OWNER)
    }

    fn probe_enabled(&self) -> bool {
        self.probe.enabled.unwrap_or(false)
    }

    fn max_workers(&self) -> usize {
        self.probe.max_workers.unwrap_or(DEFAULT_MAX_WORKERS)
    }

    fn probe_timeout(&self) -> Duration {
        self.probe
            .timeout_seconds
            .map(Duration::from_secs)
            .unwrap_or(crate::core::probe::DEFAULT_PROBE_TIMEOUT)
    }

    fn batch_deadline(&self) -> Option<Duration> {
        self.probe.batch_deadline_seconds.map(Duration::from_secs)
    }

    fn network_id(&self) -> Option<&str> {
        self.inventory.network_id.as_deref()
    }

    fn project_id(&self) -> Option<&str> {
        self.inventory.project_id.as_deref()
    }
}

impl Validate for TomlConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}
