use crate::core::classifier::classify;
use crate::core::orchestrator::{ProbeOrchestrator, MAX_WORKERS, MIN_WORKERS};
use crate::core::probe::{ReachabilityProbe, DEFAULT_PROBE_TIMEOUT};
use crate::core::{
    ClassificationResult, ConfigProvider, FinalStatus, PipelineReport, Port, PortVerdict,
    ProbeRecord, ProbeStage,
};
use crate::utils::error::{Result, UnusedPortsError};
use crate::utils::validation::{validate_range, Validate};
use std::time::Duration;

pub const DEFAULT_DEVICE_OWNER: &str = "compute:nova";
pub const DEFAULT_MAX_WORKERS: usize = 20;

/// Everything the pipeline needs to know for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineSettings {
    pub expected_device_owner: String,
    pub probe_enabled: bool,
    pub max_workers: usize,
    pub probe_timeout: Duration,
    pub batch_deadline: Option<Duration>,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            expected_device_owner: DEFAULT_DEVICE_OWNER.to_string(),
            probe_enabled: false,
            max_workers: DEFAULT_MAX_WORKERS,
            probe_timeout: DEFAULT_PROBE_TIMEOUT,
            batch_deadline: None,
        }
    }
}

impl EngineSettings {
    pub fn from_provider(config: &dyn ConfigProvider) -> Self {
        Self {
            expected_device_owner: config.expected_device_owner().to_string(),
            probe_enabled: config.probe_enabled(),
            max_workers: config.max_workers(),
            probe_timeout: config.probe_timeout(),
            batch_deadline: config.batch_deadline(),
        }
    }
}

impl Validate for EngineSettings {
    fn validate(&self) -> Result<()> {
        validate_range("max_workers", self.max_workers, MIN_WORKERS, MAX_WORKERS)?;

        if self.probe_timeout.is_zero() {
            return Err(UnusedPortsError::InvalidConfigValueError {
                field: "probe_timeout".to_string(),
                value: format!("{:?}", self.probe_timeout),
                reason: "Timeout must be greater than zero".to_string(),
            });
        }

        if let Some(deadline) = self.batch_deadline {
            if deadline.is_zero() {
                return Err(UnusedPortsError::InvalidConfigValueError {
                    field: "batch_deadline".to_string(),
                    value: format!("{:?}", deadline),
                    reason: "Deadline must be greater than zero".to_string(),
                });
            }
        }

        Ok(())
    }
}

/// Classifier first, then (optionally) the probe batch.
pub struct UnusedPortsPipeline {
    probe: ReachabilityProbe,
}

impl Default for UnusedPortsPipeline {
    fn default() -> Self {
        Self::new(ReachabilityProbe::ping())
    }
}

impl UnusedPortsPipeline {
    pub fn new(probe: ReachabilityProbe) -> Self {
        Self { probe }
    }

    pub async fn run(&self, ports: &[Port], settings: &EngineSettings) -> Result<PipelineReport> {
        settings.validate()?;

        // Step 1: static classification
        let classifications: Vec<ClassificationResult> = ports
            .iter()
            .map(|port| classify(port, &settings.expected_device_owner))
            .collect();

        let candidate_indices: Vec<usize> = classifications
            .iter()
            .enumerate()
            .filter(|(_, result)| result.eligible)
            .map(|(index, _)| index)
            .collect();
        let candidates: Vec<Port> = candidate_indices
            .iter()
            .map(|&index| ports[index].clone())
            .collect();

        tracing::info!(
            "{} of {} ports passed the initial checks",
            candidates.len(),
            ports.len()
        );

        // Step 2: probe the survivors
        let mut probe_records: Vec<Option<ProbeRecord>> = vec![None; ports.len()];
        let (eligible, probe_stage) = if !settings.probe_enabled {
            (candidates, ProbeStage::Disabled)
        } else if candidates.is_empty() {
            tracing::debug!("No eligible ports to ping");
            (candidates, ProbeStage::NoCandidates)
        } else {
            let orchestrator =
                ProbeOrchestrator::new(self.probe.clone()).with_batch_deadline(settings.batch_deadline);
            let batch = orchestrator
                .probe_many(candidates, settings.max_workers, settings.probe_timeout)
                .await?;

            // Records come back in candidate order.
            for (&index, record) in candidate_indices.iter().zip(batch.records) {
                probe_records[index] = Some(record);
            }
            let stage = ProbeStage::Completed {
                workers: batch.workers,
                deadline_hit: batch.deadline_hit,
            };
            (batch.unreachable, stage)
        };

        let verdicts = classifications
            .into_iter()
            .zip(probe_records)
            .map(|(classification, probe)| {
                let status = if classification.eligible
                    && !probe.as_ref().is_some_and(ProbeRecord::is_reachable)
                {
                    FinalStatus::EligibleForDeletion
                } else {
                    FinalStatus::Excluded
                };
                PortVerdict {
                    port_id: classification.port_id.clone(),
                    classification,
                    probe,
                    status,
                }
            })
            .collect();

        Ok(PipelineReport {
            eligible,
            verdicts,
            probe_stage,
        })
    }
}
