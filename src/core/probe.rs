use crate::core::{Port, ProbeAttempt, ProbeOutcome, ReachabilityCheck};
use crate::utils::error::ProbeError;
use async_trait::async_trait;
use std::net::IpAddr;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tokio::process::Command;

pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(1);

// Headroom for process startup on top of ping's own deadline.
const PING_GRACE: Duration = Duration::from_millis(500);

/// Probes an address by running the system `ping` once.
#[derive(Debug, Clone)]
pub struct PingCheck {
    program: String,
}

impl Default for PingCheck {
    fn default() -> Self {
        Self {
            program: "ping".to_string(),
        }
    }
}

impl PingCheck {
    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// `ping -W` takes whole seconds.
    fn ping_args(ip: &IpAddr, timeout: Duration) -> Vec<String> {
        let wait_secs = (timeout.as_secs_f64().ceil() as u64).max(1);
        vec![
            "-c".to_string(),
            "1".to_string(),
            "-W".to_string(),
            wait_secs.to_string(),
            ip.to_string(),
        ]
    }
}

fn spawn_error(e: std::io::Error) -> ProbeError {
    match e.kind() {
        std::io::ErrorKind::NotFound => ProbeError::CapabilityUnavailable(e.to_string()),
        std::io::ErrorKind::PermissionDenied => ProbeError::PermissionDenied(e.to_string()),
        _ => ProbeError::Io(e),
    }
}

#[async_trait]
impl ReachabilityCheck for PingCheck {
    async fn check(&self, address: &str, timeout: Duration) -> Result<bool, ProbeError> {
        let ip: IpAddr = address
            .trim()
            .parse()
            .map_err(|_| ProbeError::InvalidAddress(address.to_string()))?;

        tracing::debug!("Trying to ping: {}", ip);

        let mut command = Command::new(&self.program);
        command
            .args(Self::ping_args(&ip, timeout))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true);

        let status = match tokio::time::timeout(timeout.saturating_add(PING_GRACE), command.status()).await {
            Ok(Ok(status)) => status,
            Ok(Err(e)) => return Err(spawn_error(e)),
            Err(_elapsed) => return Err(ProbeError::Timeout(timeout)),
        };

        Ok(status.success())
    }
}

/// Checks a port's addresses in order and stops at the first one that answers.
///
/// Attempt-level failures are logged and count as "not reachable"; nothing
/// escapes this type.
#[derive(Clone)]
pub struct ReachabilityProbe {
    check: Arc<dyn ReachabilityCheck>,
}

impl ReachabilityProbe {
    pub fn new(check: Arc<dyn ReachabilityCheck>) -> Self {
        Self { check }
    }

    pub fn ping() -> Self {
        Self::new(Arc::new(PingCheck::default()))
    }

    pub async fn probe(&self, port_id: &str, addresses: &[String], timeout: Duration) -> ProbeOutcome {
        let mut attempts = Vec::with_capacity(addresses.len());

        if addresses.is_empty() {
            tracing::debug!("No IP addresses found to ping for port {}; skipping ping check", port_id);
            return ProbeOutcome {
                port_id: port_id.to_string(),
                reachable: false,
                attempts,
            };
        }

        for address in addresses {
            let reachable = match self.check.check(address, timeout).await {
                Ok(reachable) => reachable,
                Err(ProbeError::InvalidAddress(addr)) => {
                    tracing::error!("Invalid IP address: {}", addr);
                    false
                }
                Err(e) => {
                    tracing::warn!("Ping attempt for {} on port {} failed: {}", address, port_id, e);
                    false
                }
            };

            attempts.push(ProbeAttempt {
                address: address.clone(),
                reachable,
            });

            if reachable {
                tracing::info!("Ping succeeded for IP address: {}", address);
                return ProbeOutcome {
                    port_id: port_id.to_string(),
                    reachable: true,
                    attempts,
                };
            }
            tracing::info!("Ping failed for IP address: {}", address);
        }

        ProbeOutcome {
            port_id: port_id.to_string(),
            reachable: false,
            attempts,
        }
    }

    pub async fn probe_port(&self, port: &Port, timeout: Duration) -> ProbeOutcome {
        self.probe(&port.id, &port.addresses(), timeout).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    enum Reply {
        Up,
        Down,
        Fail(fn(&str) -> ProbeError),
    }

    struct ScriptedCheck {
        replies: HashMap<String, Reply>,
        calls: Mutex<Vec<String>>,
    }

    impl ScriptedCheck {
        fn new(replies: Vec<(&str, Reply)>) -> Arc<Self> {
            Arc::new(Self {
                replies: replies
                    .into_iter()
                    .map(|(addr, reply)| (addr.to_string(), reply))
                    .collect(),
                calls: Mutex::new(Vec::new()),
            })
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ReachabilityCheck for ScriptedCheck {
        async fn check(&self, address: &str, _timeout: Duration) -> Result<bool, ProbeError> {
            self.calls.lock().unwrap().push(address.to_string());
            match self.replies.get(address) {
                Some(Reply::Up) => Ok(true),
                Some(Reply::Down) | None => Ok(false),
                Some(Reply::Fail(make)) => Err(make(address)),
            }
        }
    }

    fn addrs(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_no_addresses_means_unreachable_without_attempts() {
        let check = ScriptedCheck::new(vec![]);
        let probe = ReachabilityProbe::new(check.clone());

        let outcome = probe.probe("port-1", &[], DEFAULT_PROBE_TIMEOUT).await;

        assert!(!outcome.reachable);
        assert!(outcome.attempts.is_empty());
        assert!(check.calls().is_empty());
    }

    #[tokio::test]
    async fn test_first_reachable_address_short_circuits() {
        let check = ScriptedCheck::new(vec![
            ("10.0.0.1", Reply::Down),
            ("10.0.0.2", Reply::Up),
            ("10.0.0.3", Reply::Down),
        ]);
        let probe = ReachabilityProbe::new(check.clone());

        let outcome = probe
            .probe("port-1", &addrs(&["10.0.0.1", "10.0.0.2", "10.0.0.3"]), DEFAULT_PROBE_TIMEOUT)
            .await;

        assert!(outcome.reachable);
        assert_eq!(
            outcome.attempts,
            vec![
                ProbeAttempt { address: "10.0.0.1".to_string(), reachable: false },
                ProbeAttempt { address: "10.0.0.2".to_string(), reachable: true },
            ]
        );
        assert_eq!(check.calls(), addrs(&["10.0.0.1", "10.0.0.2"]));
    }

    #[tokio::test]
    async fn test_attempt_failures_are_not_reachable() {
        let check = ScriptedCheck::new(vec![
            ("bogus", Reply::Fail(|a| ProbeError::InvalidAddress(a.to_string()))),
            ("10.0.0.2", Reply::Fail(|_| ProbeError::Timeout(DEFAULT_PROBE_TIMEOUT))),
            ("10.0.0.3", Reply::Fail(|_| ProbeError::PermissionDenied("raw socket".to_string()))),
        ]);
        let probe = ReachabilityProbe::new(check.clone());

        let outcome = probe
            .probe("port-1", &addrs(&["bogus", "10.0.0.2", "10.0.0.3"]), DEFAULT_PROBE_TIMEOUT)
            .await;

        assert!(!outcome.reachable);
        assert_eq!(outcome.attempts.len(), 3);
        assert!(outcome.attempts.iter().all(|a| !a.reachable));
    }

    #[tokio::test]
    async fn test_ping_check_rejects_malformed_address() {
        let check = PingCheck::with_program("/nonexistent/ping");
        let result = check.check("invalid_ip", DEFAULT_PROBE_TIMEOUT).await;
        assert!(matches!(result, Err(ProbeError::InvalidAddress(_))));
    }

    #[tokio::test]
    async fn test_ping_check_reports_missing_binary() {
        let check = PingCheck::with_program("/nonexistent/ping");
        let result = check.check("192.168.1.1", DEFAULT_PROBE_TIMEOUT).await;
        assert!(matches!(result, Err(ProbeError::CapabilityUnavailable(_))));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_ping_check_uses_exit_status() {
        let up = PingCheck::with_program("true");
        let down = PingCheck::with_program("false");

        assert!(up.check("192.168.1.1", DEFAULT_PROBE_TIMEOUT).await.unwrap());
        assert!(!down.check("192.168.1.1", DEFAULT_PROBE_TIMEOUT).await.unwrap());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_ping_check_accepts_largest_timeout() {
        let up = PingCheck::with_program("true");
        assert!(up.check("192.168.1.1", Duration::MAX).await.unwrap());
    }

    #[test]
    fn test_ping_args_round_up_to_whole_seconds() {
        let ip: IpAddr = "192.168.1.1".parse().unwrap();
        assert_eq!(
            PingCheck::ping_args(&ip, Duration::from_secs(1)),
            addrs(&["-c", "1", "-W", "1", "192.168.1.1"])
        );
        assert_eq!(PingCheck::ping_args(&ip, Duration::from_millis(1500))[3], "2");
        assert_eq!(PingCheck::ping_args(&ip, Duration::from_millis(200))[3], "1");
    }
}
