//! Runs every check against one model and assembles the report.
//!
//! Checks run in a fixed order so report ordering is deterministic:
//! port bindings, IP assignments, port-range policy, domain records,
//! reserved ports, overlay subnets, then the optional reachability pass.
//! A check's findings never stop a later check from running.

use std::collections::BTreeMap;
use std::net::Ipv4Addr;

use crate::checks::{
    check_domain_records, check_ip_assignments, check_port_bindings, check_port_ranges,
    check_reserved_ports, check_subnet_overlaps, ClassificationRules, Findings, PortAllocations,
};
use crate::config::{ConfigError, ValidationSettings, MAX_PROBE_WORKERS};
use crate::model::DeploymentModel;
use crate::probe::{CancelToken, ProbeOptions, Prober};
use crate::report::{summarize_allocations, HostSummary, ValidationReport};
use crate::utils::ip_utils::Ipv4Cidr;

#[derive(Debug, Clone)]
pub struct ValidationOptions {
    pub check_availability: bool,
    pub infrastructure_network: Ipv4Cidr,
    pub rules: ClassificationRules,
    pub probe: ProbeOptions,
}

impl ValidationOptions {
    /// Resolve options from the document's `validation:` block
    pub fn from_settings(settings: &ValidationSettings) -> Result<Self, ConfigError> {
        settings.validate()?;
        let mut options = ValidationOptions::default();

        if let Some(network) = settings.infrastructure_network {
            options.infrastructure_network = network;
        }
        if let Some(entries) = &settings.classification_rules {
            options.rules = ClassificationRules::from_entries(entries)?;
        }
        if let Some(timeout) = settings.probe_timeout {
            options.probe.timeout = timeout;
        }
        if let Some(workers) = settings.probe_workers {
            options.probe.workers = workers.clamp(1, MAX_PROBE_WORKERS);
        }
        options.probe.budget = settings.probe_budget;

        Ok(options)
    }
}

impl Default for ValidationOptions {
    fn default() -> Self {
        ValidationOptions {
            check_availability: false,
            infrastructure_network: default_infrastructure_network(),
            rules: ClassificationRules::default(),
            probe: ProbeOptions::default(),
        }
    }
}

/// 192.168.10.0/24, the infrastructure VLAN
fn default_infrastructure_network() -> Ipv4Cidr {
    Ipv4Cidr::masked(Ipv4Addr::new(192, 168, 10, 0), 24)
}

pub struct Validator {
    options: ValidationOptions,
    cancel: CancelToken,
}

impl Validator {
    pub fn new(options: ValidationOptions) -> Self {
        Validator {
            options,
            cancel: CancelToken::new(),
        }
    }

    /// Token that aborts outstanding reachability probes when cancelled.
    /// Findings gathered so far are still reported.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn options(&self) -> &ValidationOptions {
        &self.options
    }

    pub fn run(&self, model: &DeploymentModel) -> ValidationReport {
        log::info!("Running connectivity validation");
        let mut findings = Findings::new();

        let bindings = check_port_bindings(model);
        findings.extend(bindings.findings);

        let ips = check_ip_assignments(model, &self.options.infrastructure_network);
        findings.extend(ips.findings);

        findings.extend(check_port_ranges(model, &self.options.rules));
        findings.extend(check_domain_records(model));
        findings.extend(check_reserved_ports(model, &bindings.allocations));
        findings.extend(check_subnet_overlaps(model));

        let probe_stats = if self.options.check_availability {
            let prober = Prober::new(self.options.probe.clone()).with_cancel_token(self.cancel.clone());
            let run = prober.run(&bindings.allocations);
            findings.extend(run.findings());
            if run.stats.skipped > 0 {
                findings.warning(format!(
                    "Reachability check interrupted: {} ports not probed",
                    run.stats.skipped
                ));
            }
            Some(run.stats)
        } else {
            None
        };

        let report = ValidationReport::new(findings, bindings.allocations, &ips.host_names, probe_stats);
        log::info!(
            "Validation finished: {} errors, {} warnings",
            report.errors.len(),
            report.warnings.len()
        );
        report
    }

    /// Allocation summary only, without judging the configuration
    pub fn summarize(&self, model: &DeploymentModel) -> Vec<HostSummary> {
        let allocations: PortAllocations = check_port_bindings(model).allocations;
        let host_names: BTreeMap<String, String> =
            check_ip_assignments(model, &self.options.infrastructure_network).host_names;
        summarize_allocations(&allocations, &host_names)
    }
}
