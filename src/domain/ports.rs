use crate::domain::model::{PipelineReport, Port, PortQuery};
use crate::utils::error::{ProbeError, Result};
use async_trait::async_trait;
use std::io::Write;
use std::time::Duration;

/// Source of port records. Scoping happens here, not in the engine.
#[async_trait]
pub trait InventoryProvider: Send + Sync {
    async fn list_ports(&self, query: &PortQuery) -> Result<Vec<Port>>;
}

/// A single liveness check against one address.
#[async_trait]
pub trait ReachabilityCheck: Send + Sync {
    async fn check(&self, address: &str, timeout: Duration) -> std::result::Result<bool, ProbeError>;
}

/// Renders a finished run. Chosen once at startup.
pub trait Presenter: Send + Sync {
    fn present(&self, report: &PipelineReport, processed: usize, out: &mut dyn Write) -> Result<()>;

    fn present_empty(&self, out: &mut dyn Write) -> Result<()>;
}

pub trait ConfigProvider: Send + Sync {
    fn expected_device_owner(&self) -> &str;
    fn probe_enabled(&self) -> bool;
    fn max_workers(&self) -> usize;
    fn probe_timeout(&self) -> Duration;
    fn batch_deadline(&self) -> Option<Duration>;
    fn network_id(&self) -> Option<&str>;
    fn project_id(&self) -> Option<&str>;
}
