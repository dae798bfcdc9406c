use crate::core::{ClassificationResult, Port, Rule, RuleCheck};

/// Runs the five static eligibility rules against one port.
///
/// Every rule is evaluated and recorded, so a failed classification can be
/// explained later without re-running anything.
pub fn classify(port: &Port, expected_device_owner: &str) -> ClassificationResult {
    let rule_trace: Vec<RuleCheck> = Rule::ALL
        .iter()
        .map(|&rule| evaluate(rule, port, expected_device_owner))
        .collect();

    tracing::debug!("Checking port: {} ({})", port.id, port.name);
    for check in &rule_trace {
        let verdict = if check.passed { "Passed" } else { "Failed" };
        tracing::debug!(
            "Check {}: {}. Value: '{}'",
            verdict,
            check.rule.description(),
            check.observed
        );
    }

    let eligible = rule_trace.iter().all(|check| check.passed);
    if eligible {
        tracing::debug!("Port {} eligible for deletion after initial checks", port.id);
    }

    ClassificationResult {
        port_id: port.id.clone(),
        eligible,
        rule_trace,
    }
}

fn evaluate(rule: Rule, port: &Port, expected_device_owner: &str) -> RuleCheck {
    let (passed, observed) = match rule {
        Rule::StatusDown => (port.status.eq_ignore_ascii_case("DOWN"), port.status.clone()),
        Rule::NoBindingHost => {
            let host = port.binding_host_id.as_deref().unwrap_or("");
            (host.is_empty(), host.to_string())
        }
        Rule::NoVifDetails => (
            port.binding_vif_details.is_empty(),
            serde_json::Value::Object(port.binding_vif_details.clone()).to_string(),
        ),
        Rule::VifTypeUnbound => (
            port.binding_vif_type == "unbound",
            port.binding_vif_type.clone(),
        ),
        Rule::DeviceOwnerMatches => (
            port.device_owner == expected_device_owner,
            port.device_owner.clone(),
        ),
    };

    RuleCheck {
        rule,
        passed,
        observed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::FixedIp;

    const OWNER: &str = "compute:nova";

    fn unused_port() -> Port {
        Port {
            id: "port-1".to_string(),
            name: "vm-nic".to_string(),
            description: String::new(),
            status: "DOWN".to_string(),
            binding_host_id: Some(String::new()),
            binding_vif_details: serde_json::Map::new(),
            binding_vif_type: "unbound".to_string(),
            device_owner: OWNER.to_string(),
            dns_assignment: Vec::new(),
            fixed_ips: vec![FixedIp {
                ip_address: "192.168.1.10".to_string(),
                subnet_id: "subnet-1".to_string(),
            }],
            network_id: None,
            project_id: None,
            updated_at: None,
        }
    }

    /// Builds a port where rule `i` passes iff bit `i` of `mask` is set.
    fn port_from_mask(mask: u8) -> Port {
        let mut port = unused_port();
        if mask & 0b00001 == 0 {
            port.status = "ACTIVE".to_string();
        }
        if mask & 0b00010 == 0 {
            port.binding_host_id = Some("compute-01".to_string());
        }
        if mask & 0b00100 == 0 {
            port.binding_vif_details
                .insert("port_filter".to_string(), serde_json::Value::Bool(true));
        }
        if mask & 0b01000 == 0 {
            port.binding_vif_type = "ovs".to_string();
        }
        if mask & 0b10000 == 0 {
            port.device_owner = "network:dhcp".to_string();
        }
        port
    }

    #[test]
    fn test_all_rule_combinations() {
        for mask in 0u8..32 {
            let result = classify(&port_from_mask(mask), OWNER);

            assert_eq!(result.rule_trace.len(), 5, "mask {:05b}", mask);
            assert_eq!(result.eligible, mask == 0b11111, "mask {:05b}", mask);
            for (i, check) in result.rule_trace.iter().enumerate() {
                assert_eq!(check.rule, Rule::ALL[i]);
                assert_eq!(check.passed, mask & (1 << i) != 0, "mask {:05b} rule {}", mask, check.rule);
            }
        }
    }

    #[test]
    fn test_status_is_case_insensitive() {
        let mut port = unused_port();
        port.status = "down".to_string();
        assert!(classify(&port, OWNER).eligible);
    }

    #[test]
    fn test_absent_binding_host_counts_as_unbound() {
        let mut port = unused_port();
        port.binding_host_id = None;
        assert!(classify(&port, OWNER).eligible);
    }

    #[test]
    fn test_device_owner_must_match_exactly() {
        let port = unused_port();
        let result = classify(&port, "compute:NOVA");

        assert!(!result.eligible);
        let failed: Vec<Rule> = result.failed_rules().map(|c| c.rule).collect();
        assert_eq!(failed, vec![Rule::DeviceOwnerMatches]);
    }

    #[test]
    fn test_empty_expected_owner_matches_ownerless_ports() {
        let mut port = unused_port();
        port.device_owner = String::new();
        assert!(classify(&port, "").eligible);
    }

    #[test]
    fn test_trace_records_observed_values() {
        let mut port = unused_port();
        port.binding_host_id = Some("compute-07".to_string());

        let result = classify(&port, OWNER);
        let host_check = &result.rule_trace[1];
        assert_eq!(host_check.rule, Rule::NoBindingHost);
        assert!(!host_check.passed);
        assert_eq!(host_check.observed, "compute-07");
    }
}
