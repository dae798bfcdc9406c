use crate::core::probe::ReachabilityProbe;
use crate::core::{Port, ProbeRecord, TaskFailure};
use crate::utils::error::Result;
use crate::utils::validation::validate_range;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;

pub const MIN_WORKERS: usize = 1;
pub const MAX_WORKERS: usize = 100;

/// What came back from a probing batch.
#[derive(Debug, Clone)]
pub struct ProbeBatch {
    /// Ports with a completed outcome showing at least one reachable address.
    pub reachable: Vec<Port>,
    /// Everything else: confirmed unreachable, faulted, or unfinished.
    pub unreachable: Vec<Port>,
    /// One record per candidate, in candidate order.
    pub records: Vec<ProbeRecord>,
    pub workers: usize,
    pub deadline_hit: bool,
}

impl ProbeBatch {
    fn empty() -> Self {
        Self {
            reachable: Vec::new(),
            unreachable: Vec::new(),
            records: Vec::new(),
            workers: 0,
            deadline_hit: false,
        }
    }
}

/// Runs the reachability probe over many ports on a fixed-size worker pool.
///
/// Each probe runs in its own spawned task, so a panic surfaces as a
/// `JoinError` to the worker and is recorded as a [`TaskFailure`]. Faulted
/// ports are treated as not reachable.
#[derive(Clone)]
pub struct ProbeOrchestrator {
    probe: ReachabilityProbe,
    batch_deadline: Option<Duration>,
}

impl ProbeOrchestrator {
    pub fn new(probe: ReachabilityProbe) -> Self {
        Self {
            probe,
            batch_deadline: None,
        }
    }

    /// Stop waiting for results after `deadline`. In-flight probes keep running.
    pub fn with_batch_deadline(mut self, deadline: Option<Duration>) -> Self {
        self.batch_deadline = deadline;
        self
    }

    pub fn parallelism(max_workers: usize, candidates: usize) -> usize {
        max_workers.min(candidates).max(1)
    }

    pub async fn probe_many(
        &self,
        candidates: Vec<Port>,
        max_workers: usize,
        timeout: Duration,
    ) -> Result<ProbeBatch> {
        validate_range("max_workers", max_workers, MIN_WORKERS, MAX_WORKERS)?;

        if candidates.is_empty() {
            tracing::debug!("No eligible ports to ping");
            return Ok(ProbeBatch::empty());
        }

        let workers = Self::parallelism(max_workers, candidates.len());
        tracing::debug!(
            "Starting concurrent ping checks on {} eligible ports using {} workers",
            candidates.len(),
            workers
        );

        let ports = Arc::new(candidates);
        let cursor = Arc::new(AtomicUsize::new(0));
        let (tx, mut rx) = mpsc::channel::<(usize, ProbeRecord)>(ports.len());

        for worker_id in 0..workers {
            let ports = ports.clone();
            let cursor = cursor.clone();
            let probe = self.probe.clone();
            let tx = tx.clone();

            tokio::spawn(async move {
                loop {
                    let index = cursor.fetch_add(1, Ordering::Relaxed);
                    let Some(port) = ports.get(index) else { break };

                    let task_probe = probe.clone();
                    let task_port = port.clone();
                    let joined = tokio::spawn(async move {
                        task_probe.probe_port(&task_port, timeout).await
                    })
                    .await;

                    let record = match joined {
                        Ok(outcome) => ProbeRecord::Completed(outcome),
                        Err(e) => {
                            tracing::error!(
                                "Error processing port {} on worker {}: {}",
                                port.id,
                                worker_id,
                                e
                            );
                            ProbeRecord::Failed(TaskFailure {
                                port_id: port.id.clone(),
                                reason: e.to_string(),
                            })
                        }
                    };

                    if tx.send((index, record)).await.is_err() {
                        // Collector gave up at the batch deadline.
                        break;
                    }
                }
            });
        }
        drop(tx);

        // A deadline too far out to represent is no deadline at all.
        let deadline = self
            .batch_deadline
            .and_then(|d| Instant::now().checked_add(d));
        let mut slots: Vec<Option<ProbeRecord>> = vec![None; ports.len()];
        let mut received = 0;
        let mut deadline_hit = false;

        loop {
            let next = match deadline {
                Some(at) => match tokio::time::timeout_at(at, rx.recv()).await {
                    Ok(next) => next,
                    Err(_elapsed) => {
                        tracing::warn!(
                            "Batch deadline reached with {} of {} ports probed",
                            received,
                            ports.len()
                        );
                        deadline_hit = true;
                        break;
                    }
                },
                None => rx.recv().await,
            };

            let Some((index, record)) = next else { break };
            slots[index] = Some(record);
            received += 1;
        }

        let mut batch = ProbeBatch {
            workers,
            deadline_hit,
            ..ProbeBatch::empty()
        };
        for (port, slot) in ports.iter().zip(slots) {
            let record = slot.unwrap_or_else(|| ProbeRecord::Unfinished {
                port_id: port.id.clone(),
            });
            if record.is_reachable() {
                batch.reachable.push(port.clone());
            } else {
                batch.unreachable.push(port.clone());
            }
            batch.records.push(record);
        }

        tracing::debug!(
            "Ping checks finished: {} reachable, {} not reachable",
            batch.reachable.len(),
            batch.unreachable.len()
        );

        Ok(batch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{FixedIp, ReachabilityCheck};
    use crate::utils::error::{ProbeError, UnusedPortsError};
    use async_trait::async_trait;
    use std::collections::HashSet;

    /// Reachable iff listed; panics on "10.0.0.66"; tracks peak concurrency.
    struct SlowCheck {
        up: HashSet<String>,
        delay: Duration,
        in_flight: AtomicUsize,
        peak: AtomicUsize,
    }

    impl SlowCheck {
        fn new(up: &[&str], delay: Duration) -> Arc<Self> {
            Arc::new(Self {
                up: up.iter().map(|s| s.to_string()).collect(),
                delay,
                in_flight: AtomicUsize::new(0),
                peak: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl ReachabilityCheck for SlowCheck {
        async fn check(&self, address: &str, _timeout: Duration) -> std::result::Result<bool, ProbeError> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            if address == "10.0.0.66" {
                panic!("probe backend crashed");
            }
            Ok(self.up.contains(address))
        }
    }

    fn port(id: &str, ips: &[&str]) -> Port {
        Port {
            id: id.to_string(),
            name: String::new(),
            description: String::new(),
            status: "DOWN".to_string(),
            binding_host_id: None,
            binding_vif_details: serde_json::Map::new(),
            binding_vif_type: "unbound".to_string(),
            device_owner: "compute:nova".to_string(),
            dns_assignment: Vec::new(),
            fixed_ips: ips
                .iter()
                .map(|ip| FixedIp {
                    ip_address: ip.to_string(),
                    subnet_id: "subnet-1".to_string(),
                })
                .collect(),
            network_id: None,
            project_id: None,
            updated_at: None,
        }
    }

    fn ids(ports: &[Port]) -> HashSet<String> {
        ports.iter().map(|p| p.id.clone()).collect()
    }

    #[test]
    fn test_parallelism_is_clamped() {
        assert_eq!(ProbeOrchestrator::parallelism(50, 3), 3);
        assert_eq!(ProbeOrchestrator::parallelism(2, 10), 2);
        assert_eq!(ProbeOrchestrator::parallelism(20, 1), 1);
    }

    #[tokio::test]
    async fn test_uses_one_worker_per_candidate_when_pool_is_larger() {
        let check = SlowCheck::new(&[], Duration::from_millis(50));
        let orchestrator = ProbeOrchestrator::new(ReachabilityProbe::new(check.clone()));
        let candidates = vec![
            port("port1", &["192.168.1.1"]),
            port("port2", &["192.168.1.2"]),
            port("port3", &["192.168.1.3"]),
        ];

        let batch = orchestrator
            .probe_many(candidates, 50, Duration::from_secs(1))
            .await
            .unwrap();

        assert_eq!(batch.workers, 3);
        assert_eq!(check.peak.load(Ordering::SeqCst), 3);
        assert_eq!(batch.unreachable.len(), 3);
    }

    #[tokio::test]
    async fn test_never_exceeds_max_workers() {
        let check = SlowCheck::new(&[], Duration::from_millis(20));
        let orchestrator = ProbeOrchestrator::new(ReachabilityProbe::new(check.clone()));
        let candidates: Vec<Port> = (0..8)
            .map(|i| port(&format!("port{}", i), &[&format!("10.0.1.{}", i)]))
            .collect();

        let batch = orchestrator
            .probe_many(candidates, 2, Duration::from_secs(1))
            .await
            .unwrap();

        assert_eq!(batch.workers, 2);
        assert!(check.peak.load(Ordering::SeqCst) <= 2);
        assert_eq!(batch.records.len(), 8);
    }

    #[tokio::test]
    async fn test_mixed_reachability() {
        let check = SlowCheck::new(&["192.168.1.2"], Duration::from_millis(1));
        let orchestrator = ProbeOrchestrator::new(ReachabilityProbe::new(check));
        let candidates = vec![
            port("port1", &["192.168.1.1"]),
            port("port2", &["192.168.1.2"]),
            port("port3", &["192.168.1.3"]),
        ];

        let batch = orchestrator
            .probe_many(candidates, 2, Duration::from_secs(1))
            .await
            .unwrap();

        assert_eq!(ids(&batch.reachable), ids(&[port("port2", &[])]));
        assert_eq!(
            ids(&batch.unreachable),
            ids(&[port("port1", &[]), port("port3", &[])])
        );
    }

    #[tokio::test]
    async fn test_panicking_probe_keeps_port_eligible() {
        let check = SlowCheck::new(&["192.168.1.1"], Duration::from_millis(1));
        let orchestrator = ProbeOrchestrator::new(ReachabilityProbe::new(check));
        let candidates = vec![
            port("port1", &["192.168.1.1"]),
            port("crashy", &["10.0.0.66"]),
            port("port3", &["192.168.1.3"]),
        ];

        let batch = orchestrator
            .probe_many(candidates, 3, Duration::from_secs(1))
            .await
            .unwrap();

        assert_eq!(batch.records.len(), 3);
        assert!(ids(&batch.unreachable).contains("crashy"));
        assert!(batch
            .records
            .iter()
            .any(|r| matches!(r, ProbeRecord::Failed(f) if f.port_id == "crashy")));
        assert_eq!(ids(&batch.reachable), ids(&[port("port1", &[])]));
    }

    #[tokio::test]
    async fn test_batch_deadline_returns_completed_outcomes() {
        let check = SlowCheck::new(&[], Duration::from_millis(300));
        let orchestrator = ProbeOrchestrator::new(ReachabilityProbe::new(check))
            .with_batch_deadline(Some(Duration::from_millis(100)));
        let candidates = vec![
            port("fast", &[]),
            port("slow", &["192.168.1.9"]),
        ];

        let batch = orchestrator
            .probe_many(candidates, 2, Duration::from_secs(1))
            .await
            .unwrap();

        assert!(batch.deadline_hit);
        assert_eq!(batch.unreachable.len(), 2);
        assert!(batch
            .records
            .iter()
            .any(|r| matches!(r, ProbeRecord::Completed(o) if o.port_id == "fast")));
        assert!(batch
            .records
            .iter()
            .any(|r| matches!(r, ProbeRecord::Unfinished { port_id } if port_id == "slow")));
    }

    #[tokio::test]
    async fn test_unrepresentable_batch_deadline_waits_for_every_port() {
        let check = SlowCheck::new(&["192.168.1.2"], Duration::from_millis(1));
        let orchestrator = ProbeOrchestrator::new(ReachabilityProbe::new(check))
            .with_batch_deadline(Some(Duration::from_secs(u64::MAX)));
        let candidates = vec![
            port("port1", &["192.168.1.1"]),
            port("port2", &["192.168.1.2"]),
        ];

        let batch = orchestrator
            .probe_many(candidates, 2, Duration::MAX)
            .await
            .unwrap();

        assert!(!batch.deadline_hit);
        assert_eq!(batch.records.len(), 2);
        assert!(batch
            .records
            .iter()
            .all(|r| matches!(r, ProbeRecord::Completed(_))));
        assert_eq!(ids(&batch.reachable), ids(&[port("port2", &[])]));
    }

    #[tokio::test]
    async fn test_records_follow_candidate_order_even_with_shared_ids() {
        let check = SlowCheck::new(&["192.168.1.2"], Duration::from_millis(1));
        let orchestrator = ProbeOrchestrator::new(ReachabilityProbe::new(check));
        let candidates = vec![
            port("dup", &["192.168.1.1"]),
            port("dup", &["192.168.1.2"]),
            port("other", &["192.168.1.3"]),
        ];

        let batch = orchestrator
            .probe_many(candidates, 3, Duration::from_secs(1))
            .await
            .unwrap();

        assert_eq!(batch.records.len(), 3);
        assert!(!batch.records[0].is_reachable());
        assert!(batch.records[1].is_reachable());
        assert_eq!(batch.records[2].port_id(), "other");
    }

    #[tokio::test]
    async fn test_empty_candidates() {
        let check = SlowCheck::new(&[], Duration::from_millis(1));
        let orchestrator = ProbeOrchestrator::new(ReachabilityProbe::new(check));

        let batch = orchestrator
            .probe_many(Vec::new(), 2, Duration::from_secs(1))
            .await
            .unwrap();

        assert!(batch.reachable.is_empty());
        assert!(batch.unreachable.is_empty());
        assert_eq!(batch.workers, 0);
    }

    #[tokio::test]
    async fn test_invalid_worker_count_is_rejected() {
        let check = SlowCheck::new(&[], Duration::from_millis(1));
        let orchestrator = ProbeOrchestrator::new(ReachabilityProbe::new(check));

        let result = orchestrator
            .probe_many(vec![port("port1", &[])], 0, Duration::from_secs(1))
            .await;

        assert!(matches!(
            result,
            Err(UnusedPortsError::InvalidConfigValueError { .. })
        ));
    }
}
