//! Validation report and allocation summary.
//!
//! The structured form (serialized with serde_json) is the contract for
//! automated callers; the text rendering is for people.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::checks::{Findings, PortAllocations};
use crate::probe::ProbeStats;
use crate::utils::ranges::{format_runs, merge_consecutive, PortRun};

/// Compressed port usage for one host
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HostSummary {
    pub host: String,
    /// Machine name, when the host IP belongs to a declared machine
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub ranges: Vec<PortRun>,
    /// `ranges` rendered as `"8001-8003, 8010"`
    pub ports: String,
    pub total: usize,
}

impl HostSummary {
    pub fn label(&self) -> String {
        match &self.name {
            Some(name) => format!("{} ({})", name, self.host),
            None => format!("{} ({})", self.host, self.host),
        }
    }
}

/// Merge each host's port set into consecutive runs
pub fn summarize_allocations(
    allocations: &PortAllocations,
    host_names: &BTreeMap<String, String>,
) -> Vec<HostSummary> {
    allocations
        .iter()
        .map(|(host, ports)| {
            let ranges = merge_consecutive(ports);
            HostSummary {
                host: host.clone(),
                name: host_names.get(host).cloned(),
                ports: format_runs(&ranges),
                total: ports.len(),
                ranges,
            }
        })
        .collect()
}

/// Result of one validation run. Read-only once built.
#[derive(Debug, Clone, Serialize)]
pub struct ValidationReport {
    pub passed: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub port_allocations: PortAllocations,
    pub summary: Vec<HostSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub probe: Option<ProbeStats>,
    pub generated_at: DateTime<Utc>,
}

impl ValidationReport {
    pub fn new(
        findings: Findings,
        port_allocations: PortAllocations,
        host_names: &BTreeMap<String, String>,
        probe: Option<ProbeStats>,
    ) -> Self {
        let summary = summarize_allocations(&port_allocations, host_names);
        ValidationReport {
            passed: findings.errors.is_empty(),
            errors: findings.errors,
            warnings: findings.warnings,
            port_allocations,
            summary,
            probe,
            generated_at: Utc::now(),
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Human-readable report: summary, counts, findings, verdict
    pub fn render_text(&self) -> String {
        let mut lines: Vec<String> = Vec::new();

        lines.push(render_summary(&self.summary));
        lines.push(String::new());
        lines.push("Validation Results:".to_string());
        lines.push(format!("   Errors: {}", self.errors.len()));
        lines.push(format!("   Warnings: {}", self.warnings.len()));

        if let Some(probe) = &self.probe {
            lines.push(format!(
                "   Probes: {} probed, {} open, {} failed, {} skipped",
                probe.probed, probe.open, probe.failed, probe.skipped
            ));
        }

        if !self.errors.is_empty() {
            lines.push(String::new());
            lines.push("Errors found:".to_string());
            lines.extend(self.errors.iter().map(|e| format!("   - {}", e)));
        }

        if !self.warnings.is_empty() {
            lines.push(String::new());
            lines.push("Warnings:".to_string());
            lines.extend(self.warnings.iter().map(|w| format!("   - {}", w)));
        }

        lines.push(String::new());
        if self.passed {
            lines.push("Connectivity validation passed".to_string());
            lines.push(format!(
                "   Ready for deployment with {} hosts configured",
                self.port_allocations.len()
            ));
        } else {
            lines.push("Validation failed - fix errors before deployment".to_string());
        }

        lines.join("\n")
    }
}

/// Text block for the per-host allocation summary
pub fn render_summary(summary: &[HostSummary]) -> String {
    let mut lines = vec!["Port Allocation Summary:".to_string(), "=".repeat(50)];

    if summary.is_empty() {
        lines.push("   (no ports allocated)".to_string());
    }

    for host in summary {
        lines.push(String::new());
        lines.push(format!("{}:", host.label()));
        lines.push(format!("   Ports: {}", host.ports));
        lines.push(format!("   Total: {} ports", host.total));
    }

    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    fn allocations(entries: &[(&str, &[u16])]) -> PortAllocations {
        entries
            .iter()
            .map(|(host, ports)| (host.to_string(), ports.iter().copied().collect::<BTreeSet<u16>>()))
            .collect()
    }

    #[test]
    fn test_summary_compresses_ports() {
        let mut names = BTreeMap::new();
        names.insert("192.168.10.10".to_string(), "cdtz".to_string());

        let summary = summarize_allocations(
            &allocations(&[("192.168.10.10", &[8001, 8002, 8003, 8010]), ("10.0.0.9", &[22])]),
            &names,
        );

        assert_eq!(summary.len(), 2);
        let cdtz = summary.iter().find(|h| h.host == "192.168.10.10").unwrap();
        assert_eq!(cdtz.ports, "8001-8003, 8010");
        assert_eq!(cdtz.total, 4);
        assert_eq!(cdtz.label(), "cdtz (192.168.10.10)");

        let other = summary.iter().find(|h| h.host == "10.0.0.9").unwrap();
        assert_eq!(other.label(), "10.0.0.9 (10.0.0.9)");
    }

    #[test]
    fn test_verdict_ignores_warnings() {
        let mut findings = Findings::new();
        findings.warning("advisory only");
        let report = ValidationReport::new(findings, PortAllocations::new(), &BTreeMap::new(), None);
        assert!(report.passed);

        let mut findings = Findings::new();
        findings.error("Port conflict");
        let report = ValidationReport::new(findings, PortAllocations::new(), &BTreeMap::new(), None);
        assert!(!report.passed);
        assert!(report.render_text().contains("Validation failed"));
    }

    #[test]
    fn test_json_shape() {
        let mut findings = Findings::new();
        findings.error("boom");
        let report = ValidationReport::new(
            findings,
            allocations(&[("10.0.0.1", &[80, 81])]),
            &BTreeMap::new(),
            None,
        );

        let value: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();
        assert_eq!(value["passed"], false);
        assert_eq!(value["errors"][0], "boom");
        assert_eq!(value["port_allocations"]["10.0.0.1"], serde_json::json!([80, 81]));
        assert_eq!(value["summary"][0]["ports"], "80-81");
        assert_eq!(value["summary"][0]["ranges"][0]["start"], 80);
        assert!(value.get("probe").is_none());
        assert!(value["generated_at"].is_string());
    }

    #[test]
    fn test_text_lists_findings() {
        let mut findings = Findings::new();
        findings.warning("Port 22 appears to be in use on 10.0.0.1");
        let report = ValidationReport::new(
            findings,
            allocations(&[("10.0.0.1", &[22])]),
            &BTreeMap::new(),
            Some(ProbeStats { probed: 1, open: 1, failed: 0, skipped: 0 }),
        );
        let text = report.render_text();
        assert!(text.contains("Warnings: 1"));
        assert!(text.contains("   - Port 22 appears to be in use on 10.0.0.1"));
        assert!(text.contains("Probes: 1 probed, 1 open"));
        assert!(text.contains("Connectivity validation passed"));
    }
}
