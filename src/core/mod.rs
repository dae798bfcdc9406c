pub mod classifier;
pub mod engine;
pub mod orchestrator;
pub mod pipeline;
pub mod probe;

pub use crate::domain::model::{
    ClassificationResult, DnsAssignment, FinalStatus, FixedIp, PipelineReport, Port, PortQuery, PortVerdict,
    ProbeAttempt, ProbeOutcome, ProbeRecord, ProbeStage, Rule, RuleCheck, RunSummary, TaskFailure,
};
pub use crate::domain::ports::{ConfigProvider, InventoryProvider, Presenter, ReachabilityCheck};
pub use crate::utils::error::Result;
