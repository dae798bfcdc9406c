pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use crate::config::CliConfig;

pub use crate::adapters::{presenter_for, FileInventory, HttpInventory, Inventory, OutputFormat};
pub use crate::config::{toml_config::TomlConfig, RunOptions};
pub use crate::core::{
    classifier::classify,
    engine::UnusedPortsEngine,
    orchestrator::{ProbeBatch, ProbeOrchestrator},
    pipeline::{EngineSettings, UnusedPortsPipeline},
    probe::{PingCheck, ReachabilityProbe},
};
pub use crate::utils::error::{ProbeError, Result, UnusedPortsError};
