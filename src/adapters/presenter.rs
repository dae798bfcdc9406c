use crate::core::{PipelineReport, Port, PortVerdict, Presenter, ProbeRecord, ProbeStage, RunSummary};
use crate::utils::error::{Result, UnusedPortsError};
use serde::{Deserialize, Serialize};
use std::io::Write;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

pub fn presenter_for(format: OutputFormat, explain: bool) -> Box<dyn Presenter> {
    match format {
        OutputFormat::Text => Box::new(TextPresenter::new(explain)),
        OutputFormat::Json => Box::new(JsonPresenter),
    }
}

fn write_err(e: std::io::Error) -> UnusedPortsError {
    UnusedPortsError::PresentationError {
        message: e.to_string(),
    }
}

/// Tree listing of the eligible ports followed by a summary block.
#[derive(Debug, Clone, Default)]
pub struct TextPresenter {
    explain: bool,
}

impl TextPresenter {
    pub fn new(explain: bool) -> Self {
        Self { explain }
    }

    fn port_attributes(port: &Port) -> Vec<(&'static str, String)> {
        let fixed_ips = port
            .fixed_ips
            .iter()
            .map(|ip| {
                if ip.subnet_id.is_empty() {
                    ip.ip_address.clone()
                } else {
                    format!("{} ({})", ip.ip_address, ip.subnet_id)
                }
            })
            .collect::<Vec<_>>()
            .join(", ");
        let dns_assignment = port
            .dns_assignment
            .iter()
            .map(|dns| format!("{} ({})", dns.fqdn, dns.ip_address))
            .collect::<Vec<_>>()
            .join(", ");

        vec![
            ("id", port.id.clone()),
            ("name", port.name.clone()),
            ("description", port.description.clone()),
            ("status", port.status.clone()),
            (
                "binding_host_id",
                port.binding_host_id.clone().unwrap_or_default(),
            ),
            (
                "binding_vif_details",
                serde_json::Value::Object(port.binding_vif_details.clone()).to_string(),
            ),
            ("binding_vif_type", port.binding_vif_type.clone()),
            ("device_owner", port.device_owner.clone()),
            ("dns_assignment", format!("[{}]", dns_assignment)),
            ("fixed_ips", format!("[{}]", fixed_ips)),
            ("updated_at", port.updated_at.clone().unwrap_or_default()),
        ]
    }

    fn exclusion_reason(verdict: &PortVerdict) -> String {
        let failed: Vec<String> = verdict
            .classification
            .failed_rules()
            .map(|check| format!("{} (value: '{}')", check.rule, check.observed))
            .collect();
        if !failed.is_empty() {
            return format!("failed checks: {}", failed.join(", "));
        }

        match &verdict.probe {
            Some(ProbeRecord::Completed(outcome)) => {
                let answered = outcome
                    .attempts
                    .iter()
                    .find(|a| a.reachable)
                    .map(|a| a.address.as_str())
                    .unwrap_or("?");
                format!("answered ping on {}", answered)
            }
            _ => "excluded".to_string(),
        }
    }

    fn write_report(&self, report: &PipelineReport, processed: usize, out: &mut dyn Write) -> std::io::Result<()> {
        if !report.eligible.is_empty() {
            writeln!(out, "Ports Eligible for Deletion")?;
            for port in &report.eligible {
                writeln!(out, "-- {}", port.id)?;
                for (attr, value) in Self::port_attributes(port) {
                    writeln!(out, "   |-- {}: {}", attr, value)?;
                }
            }
            writeln!(out)?;
        }

        if self.explain {
            let excluded: Vec<&PortVerdict> = report.excluded().collect();
            if !excluded.is_empty() {
                writeln!(out, "Excluded Ports")?;
                for verdict in excluded {
                    writeln!(out, "-- {}: {}", verdict.port_id, Self::exclusion_reason(verdict))?;
                }
                writeln!(out)?;
            }

            let fail_open = report
                .verdicts
                .iter()
                .filter(|v| matches!(v.probe, Some(ProbeRecord::Failed(_)) | Some(ProbeRecord::Unfinished { .. })))
                .count();
            if fail_open > 0 {
                writeln!(out, "Ports kept without a ping verdict: {}", fail_open)?;
                writeln!(out)?;
            }
        }

        writeln!(out, "Summary")?;
        writeln!(out, "-------")?;
        writeln!(out, "Total ports processed: {}", processed)?;
        writeln!(out, "Total ports eligible for deletion: {}", report.eligible.len())?;
        Ok(())
    }
}

impl Presenter for TextPresenter {
    fn present(&self, report: &PipelineReport, processed: usize, out: &mut dyn Write) -> Result<()> {
        self.write_report(report, processed, out).map_err(write_err)
    }

    fn present_empty(&self, out: &mut dyn Write) -> Result<()> {
        writeln!(out, "No ports found matching the specified criteria.").map_err(write_err)
    }
}

#[derive(Serialize)]
struct JsonReport<'a> {
    generated_at: String,
    summary: RunSummary,
    probe_stage: Option<ProbeStage>,
    eligible_ports: &'a [Port],
    verdicts: &'a [PortVerdict],
}

/// One JSON document per run, for scripts.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonPresenter;

impl JsonPresenter {
    fn write_document(&self, document: &JsonReport<'_>, out: &mut dyn Write) -> Result<()> {
        serde_json::to_writer_pretty(&mut *out, document).map_err(|e| {
            UnusedPortsError::PresentationError {
                message: e.to_string(),
            }
        })?;
        writeln!(out).map_err(write_err)
    }
}

impl Presenter for JsonPresenter {
    fn present(&self, report: &PipelineReport, processed: usize, out: &mut dyn Write) -> Result<()> {
        let document = JsonReport {
            generated_at: chrono::Utc::now().to_rfc3339(),
            summary: RunSummary {
                processed,
                eligible: report.eligible.len(),
            },
            probe_stage: Some(report.probe_stage),
            eligible_ports: &report.eligible,
            verdicts: &report.verdicts,
        };
        self.write_document(&document, out)
    }

    fn present_empty(&self, out: &mut dyn Write) -> Result<()> {
        let document = JsonReport {
            generated_at: chrono::Utc::now().to_rfc3339(),
            summary: RunSummary::default(),
            probe_stage: None,
            eligible_ports: &[],
            verdicts: &[],
        };
        self.write_document(&document, out)
    }
}
