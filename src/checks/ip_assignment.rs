//! Machine IP assignment validation.
//!
//! Malformed machine IPs are errors. Well-formed IPs outside the expected
//! infrastructure network are only warnings, since placement elsewhere may
//! be intentional. Two machines sharing one IP is an error.

use std::collections::BTreeMap;

use crate::model::DeploymentModel;
use crate::utils::ip_utils::{parse_ipv4, Ipv4Cidr};

use super::Findings;

#[derive(Debug, Clone, Default)]
pub struct IpAssignmentCheck {
    pub findings: Findings,
    /// IP -> machine name, for labelling the allocation summary
    pub host_names: BTreeMap<String, String>,
}

pub fn check_ip_assignments(model: &DeploymentModel, infrastructure: &Ipv4Cidr) -> IpAssignmentCheck {
    let mut check = IpAssignmentCheck::default();

    for machine in &model.machines {
        let Some(raw_ip) = machine.ip.as_deref() else {
            log::debug!("Machine {} has no IP; skipping", machine.name);
            continue;
        };

        let addr = match parse_ipv4(raw_ip) {
            Ok(addr) => addr,
            Err(_) => {
                check
                    .findings
                    .error(format!("Invalid IP address for {}: {}", machine.name, raw_ip));
                continue;
            }
        };

        if !infrastructure.contains(addr) {
            check.findings.warning(format!(
                "Machine {} IP {} not in infrastructure VLAN ({})",
                machine.name, addr, infrastructure
            ));
        }

        let key = addr.to_string();
        match check.host_names.get(&key) {
            Some(existing) => {
                check.findings.error(format!(
                    "Duplicate IP address {}: assigned to both {} and {}",
                    key, existing, machine.name
                ));
            }
            None => {
                check.host_names.insert(key, machine.name.clone());
            }
        }
    }

    log::info!(
        "IP assignments: {} machines, {} errors, {} warnings",
        model.machines.len(),
        check.findings.errors.len(),
        check.findings.warnings.len()
    );

    check
}
