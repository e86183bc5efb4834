//! Port binding conflicts.
//!
//! Every service is flattened into `(host_ip, port, service, role)`
//! bindings. Bindings sharing `(host_ip, port)` conflict. Every valid port is
//! recorded into the allocation map whether it conflicts or not, since the
//! reserved-port check, the prober and the summary all work from the full set.

use std::collections::BTreeMap;

use crate::model::{DeploymentModel, PortBinding};

use super::{Findings, PortAllocations};

#[derive(Debug, Clone, Default)]
pub struct BindingCheck {
    pub findings: Findings,
    pub allocations: PortAllocations,
}

pub fn check_port_bindings(model: &DeploymentModel) -> BindingCheck {
    let mut check = BindingCheck::default();

    for skipped in &model.skipped_services {
        check.findings.warning(format!(
            "Service {} in {} is not a valid service record; skipped",
            skipped.name, skipped.category
        ));
    }

    let mut slots: BTreeMap<(String, u16), Vec<PortBinding>> = BTreeMap::new();
    for binding in model.bindings() {
        let Some(port) = binding.valid_port() else {
            check.findings.error(format!(
                "Service {} {} {} is outside the valid port range 1-65535",
                binding.service, binding.role, binding.port
            ));
            continue;
        };

        check
            .allocations
            .entry(binding.host_ip.clone())
            .or_default()
            .insert(port);
        slots.entry((binding.host_ip.clone(), port)).or_default().push(binding);
    }

    for ((host_ip, port), members) in &slots {
        if members.len() > 1 {
            let holders: Vec<String> = members
                .iter()
                .map(|b| format!("{} ({})", b.service, b.role))
                .collect();
            check.findings.error(format!(
                "Port conflict on {}:{}: {}",
                host_ip,
                port,
                holders.join(", ")
            ));
        }
    }

    log::info!(
        "Port bindings: {} slots on {} hosts, {} errors",
        slots.len(),
        check.allocations.len(),
        check.findings.errors.len()
    );

    check
}
