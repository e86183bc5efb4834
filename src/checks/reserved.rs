//! Reserved system port collisions.

use crate::model::DeploymentModel;

use super::{Findings, PortAllocations};

/// One error per recorded `(host, port)` whose port is reserved
pub fn check_reserved_ports(model: &DeploymentModel, allocations: &PortAllocations) -> Findings {
    let mut findings = Findings::new();
    let Some(policy) = &model.port_policy else {
        return findings;
    };

    for (host_ip, ports) in allocations {
        for port in ports {
            if policy.reserved_system_ports.contains(&i64::from(*port)) {
                findings.error(format!(
                    "Service port {} on {} conflicts with reserved system port",
                    port, host_ip
                ));
            }
        }
    }

    log::info!("Reserved ports: {} collisions", findings.errors.len());
    findings
}
