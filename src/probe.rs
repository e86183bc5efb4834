//! Best-effort TCP reachability probing.
//!
//! Each recorded `(host, port)` gets one bounded-timeout connect attempt on a
//! fixed-size rayon pool. An accepted connection only means something is
//! already listening there, so probe results are warnings and never affect
//! the verdict. Results come back in target order regardless of which worker
//! finished first.

use std::collections::BTreeSet;
use std::io;
use std::net::{SocketAddr, SocketAddrV4, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use rayon::prelude::*;
use serde::Serialize;

use crate::checks::{Findings, PortAllocations};
use crate::utils::ip_utils::parse_ipv4;

pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(1);
pub const DEFAULT_PROBE_WORKERS: usize = 8;

/// Shared cancellation flag. Clones observe the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeTarget {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// Connection accepted
    Open,
    /// Refused or timed out
    Closed,
    /// Any other failure, including an unprobeable host
    Failed(String),
    /// Not attempted because the run was cancelled
    Skipped,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeResult {
    pub target: ProbeTarget,
    pub outcome: ProbeOutcome,
}

/// Counts from one probe pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ProbeStats {
    pub probed: usize,
    pub open: usize,
    pub failed: usize,
    pub skipped: usize,
}

#[derive(Debug, Clone)]
pub struct ProbeOptions {
    pub timeout: Duration,
    pub workers: usize,
    /// Overall deadline for the pass; remaining probes are cancelled after it
    pub budget: Option<Duration>,
    /// Restrict probing to these hosts
    pub hosts: Option<BTreeSet<String>>,
}

impl Default for ProbeOptions {
    fn default() -> Self {
        ProbeOptions {
            timeout: DEFAULT_PROBE_TIMEOUT,
            workers: DEFAULT_PROBE_WORKERS,
            budget: None,
            hosts: None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ProbeRun {
    pub results: Vec<ProbeResult>,
    pub stats: ProbeStats,
}

impl ProbeRun {
    /// Probe warnings in target order
    pub fn findings(&self) -> Findings {
        let mut findings = Findings::new();
        for result in &self.results {
            let ProbeTarget { host, port } = &result.target;
            match &result.outcome {
                ProbeOutcome::Open => {
                    findings.warning(format!("Port {} appears to be in use on {}", port, host));
                }
                ProbeOutcome::Failed(reason) => {
                    findings.warning(format!("Could not check port {} on {}: {}", port, host, reason));
                }
                ProbeOutcome::Closed | ProbeOutcome::Skipped => {}
            }
        }
        findings
    }
}

pub struct Prober {
    options: ProbeOptions,
    cancel: CancelToken,
}

impl Prober {
    pub fn new(options: ProbeOptions) -> Self {
        Prober {
            options,
            cancel: CancelToken::new(),
        }
    }

    /// Use an externally owned token so the caller can abort the pass
    pub fn with_cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Targets in host then port order, filtered by the host list if any
    pub fn targets(&self, allocations: &PortAllocations) -> Vec<ProbeTarget> {
        allocations
            .iter()
            .filter(|(host, _)| {
                self.options
                    .hosts
                    .as_ref()
                    .map_or(true, |allowed| allowed.contains(host.as_str()))
            })
            .flat_map(|(host, ports)| {
                ports.iter().map(move |port| ProbeTarget {
                    host: host.clone(),
                    port: *port,
                })
            })
            .collect()
    }

    pub fn run(&self, allocations: &PortAllocations) -> ProbeRun {
        let targets = self.targets(allocations);
        if targets.is_empty() {
            log::info!("Reachability: nothing to probe");
            return ProbeRun::default();
        }

        let deadline = self.options.budget.map(|budget| Instant::now() + budget);
        let workers = self.options.workers.max(1);
        log::info!(
            "Reachability: probing {} ports with {} workers (timeout {:?})",
            targets.len(),
            workers,
            self.options.timeout
        );

        let results: Vec<ProbeResult> = match rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("probe-{}", i))
            .build()
        {
            Ok(pool) => pool.install(|| {
                targets
                    .par_iter()
                    .map(|target| self.probe_one(target, deadline))
                    .collect()
            }),
            Err(e) => {
                log::warn!("Could not start probe pool ({}); probing sequentially", e);
                targets.iter().map(|target| self.probe_one(target, deadline)).collect()
            }
        };

        let mut stats = ProbeStats::default();
        for result in &results {
            match result.outcome {
                ProbeOutcome::Open => {
                    stats.probed += 1;
                    stats.open += 1;
                }
                ProbeOutcome::Closed => stats.probed += 1,
                ProbeOutcome::Failed(_) => {
                    stats.probed += 1;
                    stats.failed += 1;
                }
                ProbeOutcome::Skipped => stats.skipped += 1,
            }
        }

        log::info!(
            "Reachability: {} probed, {} open, {} failed, {} skipped",
            stats.probed,
            stats.open,
            stats.failed,
            stats.skipped
        );

        ProbeRun { results, stats }
    }

    fn probe_one(&self, target: &ProbeTarget, deadline: Option<Instant>) -> ProbeResult {
        if let Some(deadline) = deadline {
            if Instant::now() >= deadline {
                self.cancel.cancel();
            }
        }

        let outcome = if self.cancel.is_cancelled() {
            ProbeOutcome::Skipped
        } else {
            match parse_ipv4(&target.host) {
                Ok(addr) => {
                    let socket = SocketAddr::V4(SocketAddrV4::new(addr, target.port));
                    classify_connect(TcpStream::connect_timeout(&socket, self.options.timeout))
                }
                Err(e) => ProbeOutcome::Failed(e.to_string()),
            }
        };

        log::debug!("Probe {}:{} -> {:?}", target.host, target.port, outcome);
        ProbeResult {
            target: target.clone(),
            outcome,
        }
    }
}

fn classify_connect(result: io::Result<TcpStream>) -> ProbeOutcome {
    match result {
        Ok(_) => ProbeOutcome::Open,
        Err(e) => match e.kind() {
            io::ErrorKind::ConnectionRefused | io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => {
                ProbeOutcome::Closed
            }
            _ => ProbeOutcome::Failed(e.to_string()),
        },
    }
}
