//! Overlay network subnet overlap.

use crate::model::DeploymentModel;
use crate::utils::ip_utils::{parse_cidr, Ipv4Cidr};

use super::Findings;

/// Parse every overlay subnet, then compare each unordered pair once.
///
/// A subnet that fails to parse is an error scoped to that network and is
/// left out of the pairwise comparison.
pub fn check_subnet_overlaps(model: &DeploymentModel) -> Findings {
    let mut findings = Findings::new();
    let Some(subnets) = &model.subnets else {
        findings.warning("No Docker networking configuration found");
        return findings;
    };

    let mut parsed: Vec<(&str, Ipv4Cidr)> = Vec::new();
    for subnet in subnets {
        let Some(raw) = subnet.cidr.as_deref() else {
            continue;
        };
        match parse_cidr(raw) {
            Ok(cidr) => parsed.push((subnet.name.as_str(), cidr)),
            Err(e) => {
                log::debug!("{}", e);
                findings.error(format!("Invalid Docker network subnet {}: {}", subnet.name, raw));
            }
        }
    }

    for (i, (name_a, net_a)) in parsed.iter().enumerate() {
        for (name_b, net_b) in &parsed[i + 1..] {
            if net_a.overlaps(net_b) {
                findings.error(format!(
                    "Docker networks overlap: {} ({}) and {} ({})",
                    name_a, net_a, name_b, net_b
                ));
            }
        }
    }

    log::info!(
        "Overlay networks: {} parsed, {} errors",
        parsed.len(),
        findings.errors.len()
    );

    findings
}
