pub mod toml_config;

use crate::adapters::presenter::OutputFormat;
use crate::core::pipeline::EngineSettings;
use crate::core::{ConfigProvider, PortQuery};
use crate::utils::error::Result;
use crate::utils::validation::{
    validate_non_empty_string, validate_path, validate_positive_number, validate_url,
    validate_uuid, Validate,
};
use toml_config::TomlConfig;

#[cfg(feature = "cli")]
use crate::core::pipeline::{DEFAULT_DEVICE_OWNER, DEFAULT_MAX_WORKERS};
#[cfg(feature = "cli")]
use crate::core::probe::DEFAULT_PROBE_TIMEOUT;
#[cfg(feature = "cli")]
use crate::utils::validation::validate_required_field;
#[cfg(feature = "cli")]
use clap::Parser;
#[cfg(feature = "cli")]
use std::time::Duration;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
pub enum LogFormat {
    #[default]
    Compact,
    Json,
}

#[cfg(feature = "cli")]
#[derive(Clone, Default, Parser)]
#[command(name = "unused-ports")]
#[command(about = "Finds OpenStack ports that look unused and can be deleted")]
#[command(after_help = "Examples:
  unused-ports --inventory ports.json
  unused-ports --inventory https://neutron.example.com:9696 --network-id 17583b07-92c2-4a07-9fb9-5bc8705d58e2 --ping
  unused-ports --config unused-ports.toml --format json")]
pub struct CliConfig {
    /// Port inventory: a JSON file or a Neutron endpoint URL
    #[arg(long, env = "UNUSED_PORTS_INVENTORY")]
    pub inventory: Option<String>,

    /// Token sent as X-Auth-Token to the Neutron endpoint
    #[arg(long, env = "OS_AUTH_TOKEN", hide_env_values = true)]
    pub auth_token: Option<String>,

    /// Only consider ports of this project
    #[arg(long)]
    pub project_id: Option<String>,

    /// Only consider ports on this network
    #[arg(long)]
    pub network_id: Option<String>,

    /// Device owner to filter ports (default: compute:nova)
    #[arg(long)]
    pub device_owner: Option<String>,

    /// Also ping the port IP addresses to determine if they are active
    #[arg(long)]
    pub ping: bool,

    /// Maximum number of concurrent ping workers, 1-100 (default: 20)
    #[arg(long)]
    pub max_workers: Option<usize>,

    /// Seconds to wait for a single ping reply (default: 1)
    #[arg(long)]
    pub probe_timeout: Option<u64>,

    /// Stop waiting for ping results after this many seconds
    #[arg(long)]
    pub batch_deadline: Option<u64>,

    /// Output format
    #[arg(long, value_enum)]
    pub format: Option<OutputFormat>,

    /// Also list excluded ports and why they were excluded
    #[arg(long)]
    pub explain: bool,

    /// TOML configuration file; command-line options take precedence
    #[arg(short, long)]
    pub config: Option<String>,

    /// Enable verbose output
    #[arg(short, long, visible_alias = "debug")]
    pub verbose: bool,

    /// Log line format
    #[arg(long, value_enum, default_value = "compact")]
    pub log_format: LogFormat,
}

const REDACTED: &str = "<redacted>";

#[cfg(feature = "cli")]
impl std::fmt::Debug for CliConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CliConfig")
            .field("inventory", &self.inventory)
            .field("auth_token", &self.auth_token.as_ref().map(|_| REDACTED))
            .field("project_id", &self.project_id)
            .field("network_id", &self.network_id)
            .field("device_owner", &self.device_owner)
            .field("ping", &self.ping)
            .field("max_workers", &self.max_workers)
            .field("probe_timeout", &self.probe_timeout)
            .field("batch_deadline", &self.batch_deadline)
            .field("format", &self.format)
            .field("explain", &self.explain)
            .field("config", &self.config)
            .field("verbose", &self.verbose)
            .field("log_format", &self.log_format)
            .finish()
    }
}

#[cfg(feature = "cli")]
impl ConfigProvider for CliConfig {
    fn expected_device_owner(&self) -> &str {
        self.device_owner.as_deref().unwrap_or(DEFAULT_DEVICE_OWNER)
    }

    fn probe_enabled(&self) -> bool {
        self.ping
    }

    fn max_workers(&self) -> usize {
        self.max_workers.unwrap_or(DEFAULT_MAX_WORKERS)
    }

    fn probe_timeout(&self) -> Duration {
        self.probe_timeout
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_PROBE_TIMEOUT)
    }

    fn batch_deadline(&self) -> Option<Duration> {
        self.batch_deadline.map(Duration::from_secs)
    }

    fn network_id(&self) -> Option<&str> {
        self.network_id.as_deref()
    }

    fn project_id(&self) -> Option<&str> {
        self.project_id.as_deref()
    }
}

/// Fully resolved options for one run, whichever way they were supplied.
#[derive(Clone)]
pub struct RunOptions {
    pub settings: EngineSettings,
    pub query: PortQuery,
    pub inventory_source: String,
    pub auth_token: Option<String>,
    pub format: OutputFormat,
    pub explain: bool,
}

impl std::fmt::Debug for RunOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunOptions")
            .field("settings", &self.settings)
            .field("query", &self.query)
            .field("inventory_source", &self.inventory_source)
            .field("auth_token", &self.auth_token.as_ref().map(|_| REDACTED))
            .field("format", &self.format)
            .field("explain", &self.explain)
            .finish()
    }
}

impl RunOptions {
    pub fn from_toml(config: &TomlConfig) -> Self {
        Self {
            settings: EngineSettings::from_provider(config),
            query: query_for(config),
            inventory_source: config.inventory_source().to_string(),
            auth_token: config.auth_token().map(str::to_string),
            format: config.output_format(),
            explain: config.explain(),
        }
    }

    /// Loads `--config` if given and lays the command-line options over it.
    #[cfg(feature = "cli")]
    pub fn resolve(cli: &CliConfig) -> Result<Self> {
        let mut options = match &cli.config {
            Some(path) => {
                let file_config = TomlConfig::from_file(path)?;
                file_config.validate()?;
                Self::from_toml(&file_config)
            }
            None => Self {
                settings: EngineSettings::from_provider(cli),
                query: query_for(cli),
                inventory_source: validate_required_field("inventory", &cli.inventory)?.clone(),
                auth_token: None,
                format: OutputFormat::default(),
                explain: false,
            },
        };

        if let Some(source) = &cli.inventory {
            options.inventory_source = source.clone();
        }
        if let Some(token) = &cli.auth_token {
            options.auth_token = Some(token.clone());
        }
        if let Some(owner) = &cli.device_owner {
            options.settings.expected_device_owner = owner.clone();
            options.query.device_owner = Some(owner.clone());
        }
        if let Some(network_id) = &cli.network_id {
            options.query.network_id = Some(network_id.clone());
        }
        if let Some(project_id) = &cli.project_id {
            options.query.project_id = Some(project_id.clone());
        }
        if cli.ping {
            options.settings.probe_enabled = true;
        }
        if let Some(max_workers) = cli.max_workers {
            options.settings.max_workers = max_workers;
        }
        if let Some(timeout) = cli.probe_timeout {
            options.settings.probe_timeout = Duration::from_secs(timeout);
        }
        if let Some(deadline) = cli.batch_deadline {
            options.settings.batch_deadline = Some(Duration::from_secs(deadline));
        }
        if let Some(format) = cli.format {
            options.format = format;
        }
        options.explain |= cli.explain;

        options.validate()?;
        Ok(options)
    }
}

fn query_for(config: &dyn ConfigProvider) -> PortQuery {
    PortQuery {
        device_owner: Some(config.expected_device_owner().to_string()),
        status: Some("DOWN".to_string()),
        network_id: config.network_id().map(str::to_string),
        project_id: config.project_id().map(str::to_string),
    }
}

impl Validate for RunOptions {
    fn validate(&self) -> Result<()> {
        validate_non_empty_string("inventory", &self.inventory_source)?;
        if self.inventory_source.starts_with("http://") || self.inventory_source.starts_with("https://") {
            validate_url("inventory", &self.inventory_source)?;
        } else {
            validate_path("inventory", &self.inventory_source)?;
        }

        if let Some(network_id) = &self.query.network_id {
            validate_uuid("network_id", network_id)?;
        }
        if let Some(project_id) = &self.query.project_id {
            validate_non_empty_string("project_id", project_id)?;
        }

        validate_positive_number("probe_timeout", self.settings.probe_timeout.as_secs(), 1)?;
        self.settings.validate()
    }
}
