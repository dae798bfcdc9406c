use crate::core::pipeline::{EngineSettings, UnusedPortsPipeline};
use crate::core::{InventoryProvider, PortQuery, Presenter, RunSummary};
use crate::utils::error::Result;
use crate::utils::validation::Validate;
use std::io::Write;

/// Inventory in, report out.
pub struct UnusedPortsEngine<I: InventoryProvider> {
    inventory: I,
    pipeline: UnusedPortsPipeline,
    presenter: Box<dyn Presenter>,
}

impl<I: InventoryProvider> UnusedPortsEngine<I> {
    pub fn new(inventory: I, pipeline: UnusedPortsPipeline, presenter: Box<dyn Presenter>) -> Self {
        Self {
            inventory,
            pipeline,
            presenter,
        }
    }

    pub async fn run(
        &self,
        settings: &EngineSettings,
        query: &PortQuery,
        out: &mut dyn Write,
    ) -> Result<RunSummary> {
        settings.validate()?;

        tracing::debug!("Retrieving ports with query params: {:?}", query);
        let ports = self.inventory.list_ports(query).await?;
        if ports.is_empty() {
            tracing::debug!("No ports found using query parameter: {:?}", query);
            self.presenter.present_empty(out)?;
            return Ok(RunSummary::default());
        }
        tracing::info!("Retrieved {} ports", ports.len());

        let report = self.pipeline.run(&ports, settings).await?;
        self.presenter.present(&report, ports.len(), out)?;

        let summary = RunSummary {
            processed: ports.len(),
            eligible: report.eligible.len(),
        };
        tracing::info!(
            "Processed {} ports, {} eligible for deletion",
            summary.processed,
            summary.eligible
        );
        Ok(summary)
    }
}
