use std::collections::BTreeSet;
use std::io::Write;
use std::net::TcpListener;
use std::path::PathBuf;

use tempfile::NamedTempFile;

use deploycheck::config_loader::load_model;
use deploycheck::model::DeploymentModel;
use deploycheck::report::ValidationReport;
use deploycheck::utils::{merge_consecutive, parse_cidr};
use deploycheck::validator::{ValidationOptions, Validator};

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("fixtures").join(name)
}

fn load(yaml: &str) -> DeploymentModel {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(yaml.as_bytes()).unwrap();
    load_model(file.path()).unwrap()
}

fn validate(yaml: &str) -> ValidationReport {
    let model = load(yaml);
    let options = ValidationOptions::from_settings(&model.settings).unwrap();
    Validator::new(options).run(&model)
}

/// Sections that keep the "missing section" warnings out of focused scenarios
const QUIET_SECTIONS: &str = r#"
docker_networking:
  swarm_networks: {}
port_allocation:
  port_ranges: {}
domain_mapping: {}
"#;

#[test]
fn test_sample_fixture_passes() {
    let model = load_model(&fixture("connectivity-port-mapping.yml")).unwrap();
    let options = ValidationOptions::from_settings(&model.settings).unwrap();
    let report = Validator::new(options).run(&model);

    assert!(report.passed, "errors: {:?}", report.errors);
    assert!(report.warnings.is_empty(), "warnings: {:?}", report.warnings);
    assert_eq!(report.summary.len(), 3);

    let labels: Vec<String> = report.summary.iter().map(|h| h.label()).collect();
    assert_eq!(
        labels,
        vec![
            "cdtz (192.168.10.10)",
            "ccn (192.168.10.11)",
            "ccw (192.168.10.12)",
        ]
    );
    assert_eq!(report.summary[0].ports, "2201, 8001-8003");
    assert_eq!(report.summary[2].ports, "2222, 5901, 9090-9091");
}

#[test]
fn test_shared_port_is_one_error_naming_both() {
    let report = validate(&format!(
        "application_services:\n  web-a: {{ host_ip: 10.0.0.5, host_port: 8080 }}\n  web-b: {{ host_ip: 10.0.0.5, host_port: 8080 }}\n{}",
        QUIET_SECTIONS
    ));

    assert!(!report.passed);
    assert_eq!(report.errors.len(), 1);
    assert!(report.errors[0].contains("web-a"));
    assert!(report.errors[0].contains("web-b"));
}

#[test]
fn test_every_sharing_role_is_named() {
    let report = validate(&format!(
        r#"
foundation_services:
  alpha: {{ host_ip: 10.0.0.5, host_port: 2222 }}
  beta: {{ host_ip: 10.0.0.5, ssh_port: 2222 }}
  gamma: {{ host_ip: 10.0.0.5, vnc_port: 2222 }}
  delta: {{ host_ip: 10.0.0.6, host_port: 2222 }}
{}"#,
        QUIET_SECTIONS
    ));

    assert_eq!(report.errors.len(), 1, "{:?}", report.errors);
    for name in ["alpha", "beta", "gamma"] {
        assert!(report.errors[0].contains(name), "{} missing from {}", name, report.errors[0]);
    }
    assert!(!report.errors[0].contains("delta"));
}

#[test]
fn test_container_ports_are_not_host_claims() {
    let report = validate(
        r#"
application_services:
  web-a: { host_ip: 10.0.0.5, host_port: 8080, container_port: 80 }
  web-b: { host_ip: 10.0.0.5, host_port: 8081, container_port: 80 }
port_allocation:
  port_ranges: {}
  reserved_system_ports: [22, 80, 443]
docker_networking:
  swarm_networks: {}
domain_mapping: {}
"#,
    );

    assert!(report.passed, "errors: {:?}", report.errors);
    assert!(report.errors.is_empty());
    assert_eq!(report.summary[0].ports, "8080-8081");
}

#[test]
fn test_opted_in_port_role_binds_on_host() {
    let report = validate(
        r#"
application_services:
  web-a: { host_ip: 10.0.0.5, host_port: 8080, metrics_port: 9100 }
  web-b: { host_ip: 10.0.0.5, host_port: 8081, metrics_port: 9100 }
port_allocation:
  port_ranges: {}
docker_networking:
  swarm_networks: {}
domain_mapping: {}
validation:
  port_roles: [metrics_port]
"#,
    );

    assert_eq!(
        report.errors,
        vec!["Port conflict on 10.0.0.5:9100: web-a (metrics_port), web-b (metrics_port)"]
    );
}

#[test]
fn test_blank_machine_ip_is_not_an_error() {
    let report = validate(&format!(
        "network_architecture:\n  physical_infrastructure:\n    spare: {{ ip: \"\" }}\n{}",
        QUIET_SECTIONS
    ));
    assert!(report.errors.is_empty(), "{:?}", report.errors);
    assert!(report.warnings.is_empty(), "{:?}", report.warnings);
}

#[test]
fn test_contained_subnet_overlaps() {
    let report = validate(
        r#"
docker_networking:
  swarm_networks:
    net1: { subnet: 10.10.0.0/23 }
    net2: { subnet: 10.10.1.0/24 }
port_allocation:
  port_ranges: {}
domain_mapping: {}
"#,
    );

    assert_eq!(report.errors.len(), 1);
    assert!(report.errors[0].contains("net1"));
    assert!(report.errors[0].contains("net2"));
}

#[test]
fn test_summary_compresses_host_ports() {
    let report = validate(&format!(
        r#"
application_services:
  svc-1: {{ host_ip: 10.0.0.7, host_port: 8001 }}
  svc-2: {{ host_ip: 10.0.0.7, host_port: 8002 }}
  svc-3: {{ host_ip: 10.0.0.7, host_port: 8003 }}
  svc-4: {{ host_ip: 10.0.0.7, host_port: 8010 }}
{}"#,
        QUIET_SECTIONS
    ));

    assert_eq!(report.summary.len(), 1);
    assert_eq!(report.summary[0].ports, "8001-8003, 8010");
    assert_eq!(report.summary[0].total, 4);
    assert!(report.render_text().contains("   Ports: 8001-8003, 8010\n   Total: 4 ports"));
}

#[test]
fn test_policy_violation_only_warns() {
    let report = validate(
        r#"
monitoring_stack:
  monitoring-prometheus: { host_ip: 192.168.10.20, host_port: 9000 }
port_allocation:
  port_ranges:
    monitoring: "9090-9099"
docker_networking:
  swarm_networks: {}
domain_mapping: {}
"#,
    );

    assert!(report.passed);
    assert!(report.errors.is_empty());
    assert_eq!(
        report.warnings,
        vec!["monitoring-prometheus port 9000 outside expected range monitoring (9090-9099)"]
    );
}

#[test]
fn test_reserved_port_is_an_error() {
    let report = validate(
        r#"
application_services:
  bastion: { host_ip: 10.0.0.9, host_port: 22 }
port_allocation:
  reserved_system_ports: [22, 80]
docker_networking:
  swarm_networks: {}
domain_mapping: {}
"#,
    );

    assert_eq!(
        report.errors,
        vec!["Service port 22 on 10.0.0.9 conflicts with reserved system port"]
    );
}

#[test]
fn test_empty_document_warns_about_missing_sections() {
    let report = validate("{}\n");
    assert!(report.passed);
    assert!(report.summary.is_empty());
    assert_eq!(
        report.warnings,
        vec![
            "No port allocation ranges defined",
            "No domain mapping configuration found",
            "No Docker networking configuration found",
        ]
    );
}

#[test]
fn test_document_rules_replace_default_classification() {
    let report = validate(
        r#"
application_services:
  postgres-main: { host_ip: 10.0.0.3, host_port: 6000 }
  mcp-coordinator: { host_ip: 10.0.0.3, host_port: 1 }
port_allocation:
  port_ranges:
    databases: "5432-5439"
    mcp_servers: "8000-8099"
docker_networking:
  swarm_networks: {}
domain_mapping: {}
validation:
  classification_rules:
    - category: databases
      pattern: "^postgres"
"#,
    );

    assert_eq!(
        report.warnings,
        vec!["postgres-main port 6000 outside expected range databases (5432-5439)"]
    );
}

#[test]
fn test_availability_probe_reports_listening_port() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();

    let model = load(&format!(
        "application_services:\n  local: {{ host_ip: 127.0.0.1, host_port: {} }}\n{}",
        port, QUIET_SECTIONS
    ));
    let mut options = ValidationOptions::from_settings(&model.settings).unwrap();
    options.check_availability = true;
    options.probe.hosts = Some(BTreeSet::from(["127.0.0.1".to_string()]));

    let report = Validator::new(options).run(&model);
    assert!(report.passed);
    assert_eq!(report.probe.unwrap().open, 1);
    assert!(report
        .warnings
        .contains(&format!("Port {} appears to be in use on 127.0.0.1", port)));
}

#[test]
fn test_subnet_overlap_is_symmetric_and_reflexive() {
    let subnets = [
        "10.0.0.0/8",
        "10.10.0.0/23",
        "10.10.1.0/24",
        "10.10.2.0/24",
        "192.168.0.0/16",
        "192.168.10.7/32",
        "0.0.0.0/0",
    ];
    let parsed: Vec<_> = subnets.iter().map(|s| parse_cidr(s).unwrap()).collect();

    for a in &parsed {
        assert!(a.overlaps(a));
        for b in &parsed {
            assert_eq!(a.overlaps(b), b.overlaps(a), "{} vs {}", a, b);
        }
    }
}

#[test]
fn test_merge_consecutive_partitions_and_is_idempotent() {
    let ports: BTreeSet<u16> = [1, 2, 3, 7, 9, 10, 65534, 65535].into_iter().collect();
    let runs = merge_consecutive(&ports);
    assert_eq!(runs.len(), 4);

    let flattened: BTreeSet<u16> = runs.iter().flat_map(|r| r.start..=r.end).collect();
    assert_eq!(flattened, ports);
    assert_eq!(runs.iter().map(|r| r.len()).sum::<usize>(), ports.len());
    assert_eq!(merge_consecutive(&flattened), runs);
}
