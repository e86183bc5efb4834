//! Port-range policy compliance.
//!
//! Policy is advisory: a service whose name classifies into a policy
//! category but whose `host_port` falls outside that category's interval is
//! a warning. Unclassified services are not checked at all.

use crate::model::{DeploymentModel, PortPolicy, PortRole};
use crate::utils::ranges::PortRange;

use super::{ClassificationRules, Findings};

/// A parsed policy interval
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortRangePolicy {
    pub name: String,
    pub range: PortRange,
}

/// Parse every declared interval. Malformed ones are skipped with a warning.
pub fn parse_policy_ranges(policy: &PortPolicy) -> (Vec<PortRangePolicy>, Findings) {
    let mut findings = Findings::new();
    let mut parsed = Vec::new();

    for (name, raw) in &policy.ranges {
        match PortRange::parse(raw) {
            Ok(range) => parsed.push(PortRangePolicy {
                name: name.clone(),
                range,
            }),
            Err(e) => {
                log::debug!("Skipping port range {}: {}", name, e);
                findings.warning(format!("Port range {} has malformed interval '{}'; skipped", name, raw));
            }
        }
    }

    (parsed, findings)
}

pub fn check_port_ranges(model: &DeploymentModel, rules: &ClassificationRules) -> Findings {
    let Some(policy) = &model.port_policy else {
        let mut findings = Findings::new();
        findings.warning("No port allocation ranges defined");
        return findings;
    };

    let (ranges, mut findings) = parse_policy_ranges(policy);
    let mut checked = 0usize;

    for service in model.services.iter().filter(|s| s.category.is_policy_checked()) {
        let Some(port) = service.port(&PortRole::Host) else {
            continue;
        };
        // Out-of-range ports are already reported by the binding check
        if !(1..=i64::from(u16::MAX)).contains(&port) {
            continue;
        }
        let Some(category) = rules.classify(&service.name) else {
            continue;
        };
        let Some(policy) = ranges.iter().find(|r| r.name == category) else {
            continue;
        };

        checked += 1;
        // Bounded above, so the conversion always succeeds
        let port = u32::try_from(port).unwrap_or(u32::MAX);
        if !policy.range.contains(port) {
            findings.warning(format!(
                "{} port {} outside expected range {} ({})",
                service.name, port, category, policy.range
            ));
        }
    }

    log::info!(
        "Port range policy: {} intervals, {} services checked, {} warnings",
        ranges.len(),
        checked,
        findings.warnings.len()
    );

    findings
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checks::ClassificationRule;
    use crate::config::Config;

    fn model(yaml: &str) -> DeploymentModel {
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        DeploymentModel::from_config(&config)
    }

    #[test]
    fn test_prometheus_outside_monitoring_range_warns() {
        let model = model(
            r#"
monitoring_stack:
  monitoring-prometheus:
    host_ip: 192.168.10.20
    host_port: 9000
port_allocation:
  port_ranges:
    monitoring: "9090-9099"
"#,
        );

        let findings = check_port_ranges(&model, &ClassificationRules::default());
        assert!(findings.errors.is_empty());
        assert_eq!(
            findings.warnings,
            vec!["monitoring-prometheus port 9000 outside expected range monitoring (9090-9099)"]
        );
    }

    #[test]
    fn test_compliant_and_unclassified_services_are_silent() {
        let model = model(
            r#"
foundation_services:
  mcp-filesystem: { host_port: 8001 }
  postgres: { host_port: 5432 }
application_services:
  api-gateway: { host_port: 3000 }
port_allocation:
  port_ranges:
    mcp_servers: "8000-8099"
    web_interfaces: "3000-3099"
"#,
        );
        assert!(check_port_ranges(&model, &ClassificationRules::default()).is_clean());
    }

    #[test]
    fn test_missing_policy_interval_for_category_is_skipped() {
        let model = model(
            "application_services:\n  api: { host_port: 1 }\nport_allocation:\n  port_ranges:\n    monitoring: \"9090-9099\"\n",
        );
        assert!(check_port_ranges(&model, &ClassificationRules::default()).is_clean());
    }

    #[test]
    fn test_development_environments_are_not_checked() {
        let model = model(
            "development_environments:\n  api-sandbox: { host_port: 1234 }\nport_allocation:\n  port_ranges:\n    web_interfaces: \"3000-3099\"\n",
        );
        assert!(check_port_ranges(&model, &ClassificationRules::default()).is_clean());
    }

    #[test]
    fn test_malformed_interval_warns_and_is_skipped() {
        let model = model(
            r#"
foundation_services:
  mcp-a: { host_port: 1 }
port_allocation:
  port_ranges:
    mcp_servers: "eight-thousand"
"#,
        );
        let findings = check_port_ranges(&model, &ClassificationRules::default());
        assert!(findings.errors.is_empty());
        assert_eq!(findings.warnings.len(), 1);
        assert!(findings.warnings[0].contains("malformed"));
    }

    #[test]
    fn test_missing_port_allocation_section() {
        let findings = check_port_ranges(&model("{}"), &ClassificationRules::default());
        assert_eq!(findings.warnings, vec!["No port allocation ranges defined"]);
    }

    #[test]
    fn test_custom_rules_are_used() {
        let model = model(
            "foundation_services:\n  redis-cache: { host_port: 7000 }\nport_allocation:\n  port_ranges:\n    databases: \"6000-6999\"\n",
        );
        let rules = ClassificationRules::new(vec![ClassificationRule::keywords("databases", &["redis"])]);
        assert_eq!(check_port_ranges(&model, &rules).warnings.len(), 1);
        assert!(check_port_ranges(&model, &ClassificationRules::default()).is_clean());
    }
}
