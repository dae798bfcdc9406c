use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixedIp {
    pub ip_address: String,
    #[serde(default)]
    pub subnet_id: String,
}

/// One entry of a port's `dns_assignment`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DnsAssignment {
    pub hostname: String,
    pub ip_address: String,
    pub fqdn: String,
}

/// A Neutron port as returned by the inventory. Read-only to the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Port {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub status: String,
    #[serde(rename = "binding:host_id", alias = "binding_host_id", default)]
    pub binding_host_id: Option<String>,
    #[serde(rename = "binding:vif_details", alias = "binding_vif_details", default)]
    pub binding_vif_details: serde_json::Map<String, serde_json::Value>,
    #[serde(rename = "binding:vif_type", alias = "binding_vif_type", default)]
    pub binding_vif_type: String,
    #[serde(default)]
    pub device_owner: String,
    #[serde(default)]
    pub dns_assignment: Vec<DnsAssignment>,
    #[serde(default)]
    pub fixed_ips: Vec<FixedIp>,
    #[serde(default)]
    pub network_id: Option<String>,
    #[serde(default, alias = "tenant_id")]
    pub project_id: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

impl Port {
    /// Addresses in the order Neutron lists them.
    pub fn addresses(&self) -> Vec<String> {
        self.fixed_ips
            .iter()
            .map(|ip| ip.ip_address.clone())
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rule {
    StatusDown,
    NoBindingHost,
    NoVifDetails,
    VifTypeUnbound,
    DeviceOwnerMatches,
}

impl Rule {
    pub const ALL: [Rule; 5] = [
        Rule::StatusDown,
        Rule::NoBindingHost,
        Rule::NoVifDetails,
        Rule::VifTypeUnbound,
        Rule::DeviceOwnerMatches,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Rule::StatusDown => "status_down",
            Rule::NoBindingHost => "no_binding_host",
            Rule::NoVifDetails => "no_vif_details",
            Rule::VifTypeUnbound => "vif_type_unbound",
            Rule::DeviceOwnerMatches => "device_owner_matches",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Rule::StatusDown => "Port status is DOWN",
            Rule::NoBindingHost => "Port has no binding_host_id",
            Rule::NoVifDetails => "Port has no binding_vif_details",
            Rule::VifTypeUnbound => "Port binding_vif_type is 'unbound'",
            Rule::DeviceOwnerMatches => "Port device_owner matches expected",
        }
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RuleCheck {
    pub rule: Rule,
    pub passed: bool,
    pub observed: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClassificationResult {
    pub port_id: String,
    pub eligible: bool,
    pub rule_trace: Vec<RuleCheck>,
}

impl ClassificationResult {
    pub fn failed_rules(&self) -> impl Iterator<Item = &RuleCheck> {
        self.rule_trace.iter().filter(|check| !check.passed)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProbeAttempt {
    pub address: String,
    pub reachable: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProbeOutcome {
    pub port_id: String,
    pub reachable: bool,
    pub attempts: Vec<ProbeAttempt>,
}

/// A probe task that faulted before producing an outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskFailure {
    pub port_id: String,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ProbeRecord {
    Completed(ProbeOutcome),
    Failed(TaskFailure),
    /// No outcome arrived before the batch deadline.
    Unfinished { port_id: String },
}

impl ProbeRecord {
    pub fn port_id(&self) -> &str {
        match self {
            ProbeRecord::Completed(outcome) => &outcome.port_id,
            ProbeRecord::Failed(failure) => &failure.port_id,
            ProbeRecord::Unfinished { port_id } => port_id,
        }
    }

    /// Only a completed outcome can confirm reachability; anything else keeps the port eligible.
    pub fn is_reachable(&self) -> bool {
        matches!(self, ProbeRecord::Completed(outcome) if outcome.reachable)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FinalStatus {
    EligibleForDeletion,
    Excluded,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PortVerdict {
    pub port_id: String,
    pub classification: ClassificationResult,
    pub probe: Option<ProbeRecord>,
    pub status: FinalStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ProbeStage {
    Disabled,
    NoCandidates,
    Completed { workers: usize, deadline_hit: bool },
}

#[derive(Debug, Clone, Serialize)]
pub struct PipelineReport {
    pub eligible: Vec<Port>,
    pub verdicts: Vec<PortVerdict>,
    pub probe_stage: ProbeStage,
}

impl PipelineReport {
    pub fn verdict(&self, port_id: &str) -> Option<&PortVerdict> {
        self.verdicts.iter().find(|v| v.port_id == port_id)
    }

    pub fn excluded(&self) -> impl Iterator<Item = &PortVerdict> {
        self.verdicts
            .iter()
            .filter(|v| v.status == FinalStatus::Excluded)
    }
}

/// Scoping criteria handed to the inventory.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PortQuery {
    pub device_owner: Option<String>,
    pub status: Option<String>,
    pub network_id: Option<String>,
    pub project_id: Option<String>,
}

impl PortQuery {
    pub fn matches(&self, port: &Port) -> bool {
        let owner_ok = self
            .device_owner
            .as_deref()
            .map_or(true, |owner| port.device_owner == owner);
        let status_ok = self
            .status
            .as_deref()
            .map_or(true, |status| port.status.eq_ignore_ascii_case(status));
        let network_ok = self
            .network_id
            .as_deref()
            .map_or(true, |id| port.network_id.as_deref() == Some(id));
        let project_ok = self
            .project_id
            .as_deref()
            .map_or(true, |id| port.project_id.as_deref() == Some(id));

        owner_ok && status_ok && network_ok && project_ok
    }

    pub fn to_params(&self) -> Vec<(&'static str, String)> {
        let mut params = Vec::new();
        if let Some(owner) = &self.device_owner {
            params.push(("device_owner", owner.clone()));
        }
        if let Some(status) = &self.status {
            params.push(("status", status.clone()));
        }
        if let Some(network_id) = &self.network_id {
            params.push(("network_id", network_id.clone()));
        }
        if let Some(project_id) = &self.project_id {
            params.push(("project_id", project_id.clone()));
        }
        params
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub processed: usize,
    pub eligible: usize,
}
