//! Normalized, read-only view of a connectivity configuration.
//!
//! The checks never look at the raw document; they consume a
//! `DeploymentModel` built once by [`DeploymentModel::from_config`].

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::Serialize;

use crate::config::{Config, DomainGroup, ServiceEntry, ServiceSlot, ValidationSettings};

/// Host key used for services that declare no `host_ip`
pub const UNKNOWN_HOST: &str = "unknown";

/// Service grouping as it appears in the document
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceCategory {
    Foundation,
    Application,
    Monitoring,
    Development,
}

impl ServiceCategory {
    pub const ALL: [ServiceCategory; 4] = [
        ServiceCategory::Foundation,
        ServiceCategory::Application,
        ServiceCategory::Monitoring,
        ServiceCategory::Development,
    ];

    /// Top-level document key holding this category
    pub fn config_key(&self) -> &'static str {
        match self {
            ServiceCategory::Foundation => "foundation_services",
            ServiceCategory::Application => "application_services",
            ServiceCategory::Monitoring => "monitoring_stack",
            ServiceCategory::Development => "development_environments",
        }
    }

    /// Development environments are not held to port-range policy
    pub fn is_policy_checked(&self) -> bool {
        !matches!(self, ServiceCategory::Development)
    }
}

impl fmt::Display for ServiceCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.config_key())
    }
}

/// Named purpose of a port on a service
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PortRole {
    Host,
    Ssh,
    Vnc,
    /// A key opted in through `validation.port_roles`, stored as written
    Named(String),
}

impl PortRole {
    pub fn from_key(key: &str) -> PortRole {
        match key {
            "host_port" => PortRole::Host,
            "ssh_port" => PortRole::Ssh,
            "vnc_port" => PortRole::Vnc,
            other => PortRole::Named(other.to_string()),
        }
    }
}

impl fmt::Display for PortRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PortRole::Host => f.write_str("host_port"),
            PortRole::Ssh => f.write_str("ssh_port"),
            PortRole::Vnc => f.write_str("vnc_port"),
            PortRole::Named(key) => f.write_str(key),
        }
    }
}

/// A declared port. The value is kept as written so out-of-range numbers
/// can be reported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServicePort {
    pub role: PortRole,
    pub port: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Service {
    pub name: String,
    pub category: ServiceCategory,
    pub host_ip: String,
    pub ports: Vec<ServicePort>,
}

impl Service {
    /// Port declared for a role, if any
    pub fn port(&self, role: &PortRole) -> Option<i64> {
        self.ports.iter().find(|p| &p.role == role).map(|p| p.port)
    }

    /// Flatten this service into one binding per declared port role
    pub fn bindings(&self) -> impl Iterator<Item = PortBinding> + '_ {
        self.ports.iter().map(move |p| PortBinding {
            host_ip: self.host_ip.clone(),
            port: p.port,
            service: self.name.clone(),
            role: p.role.clone(),
        })
    }
}

/// `(host_ip, port, service, role)`; several bindings sharing
/// `(host_ip, port)` is a conflict
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortBinding {
    pub host_ip: String,
    pub port: i64,
    pub service: String,
    pub role: PortRole,
}

impl PortBinding {
    /// The port as a TCP port number, if it is one
    pub fn valid_port(&self) -> Option<u16> {
        u16::try_from(self.port).ok().filter(|p| *p != 0)
    }
}

/// A service key whose value was not a usable service record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedService {
    pub name: String,
    pub category: ServiceCategory,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Machine {
    pub name: String,
    pub ip: Option<String>,
}

/// Overlay network subnet as declared (unparsed)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subnet {
    pub name: String,
    pub cidr: Option<String>,
}

/// Port policy as declared: raw intervals plus reserved ports
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PortPolicy {
    pub ranges: BTreeMap<String, String>,
    pub reserved_system_ports: BTreeSet<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordType {
    A,
    Cname,
    Other(String),
}

impl RecordType {
    pub fn parse(s: &str) -> RecordType {
        match s.trim().to_ascii_uppercase().as_str() {
            "A" => RecordType::A,
            "CNAME" => RecordType::Cname,
            _ => RecordType::Other(s.to_string()),
        }
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordType::A => f.write_str("A"),
            RecordType::Cname => f.write_str("CNAME"),
            RecordType::Other(s) => f.write_str(s),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DomainScope {
    Internal,
    External,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomainRecord {
    pub scope: DomainScope,
    pub name: String,
    pub record_type: RecordType,
    pub value: Option<String>,
    pub proxied: bool,
}

/// Everything the checks need. Keyed groups come out in key order, domain
/// records in document order.
///
/// `None` on an optional group means the section is absent from the
/// document, which some checks report on.
#[derive(Debug, Clone, Default)]
pub struct DeploymentModel {
    pub services: Vec<Service>,
    pub skipped_services: Vec<SkippedService>,
    pub machines: Vec<Machine>,
    pub subnets: Option<Vec<Subnet>>,
    pub port_policy: Option<PortPolicy>,
    pub domain_records: Option<Vec<DomainRecord>>,
    pub settings: ValidationSettings,
}

impl DeploymentModel {
    pub fn from_config(config: &Config) -> DeploymentModel {
        let mut model = DeploymentModel {
            settings: config.validation.clone(),
            ..DeploymentModel::default()
        };

        let extra_roles: BTreeSet<&str> = config
            .validation
            .port_roles
            .iter()
            .flatten()
            .map(String::as_str)
            .collect();

        for category in ServiceCategory::ALL {
            let Some(group) = service_group(config, category) else {
                continue;
            };
            for (name, slot) in group {
                match slot {
                    ServiceSlot::Declared(entry) => {
                        model.services.push(service_from_entry(name, category, entry, &extra_roles));
                    }
                    ServiceSlot::Other(_) => {
                        log::warn!("Skipping {} entry '{}': not a service record", category, name);
                        model.skipped_services.push(SkippedService {
                            name: name.clone(),
                            category,
                        });
                    }
                }
            }
        }

        if let Some(arch) = &config.network_architecture {
            model.machines = arch
                .physical_infrastructure
                .iter()
                .map(|(name, entry)| Machine {
                    name: name.clone(),
                    ip: non_blank(entry.ip.as_deref()),
                })
                .collect();
        }

        model.subnets = config.docker_networking.as_ref().map(|docker| {
            docker
                .swarm_networks
                .iter()
                .map(|(name, entry)| Subnet {
                    name: name.clone(),
                    cidr: non_blank(entry.subnet.as_deref()),
                })
                .collect()
        });

        model.port_policy = config.port_allocation.as_ref().map(|alloc| PortPolicy {
            ranges: alloc
                .port_ranges
                .iter()
                .map(|(name, value)| (name.clone(), yaml_scalar_to_string(value)))
                .collect(),
            reserved_system_ports: alloc.reserved_system_ports.iter().copied().collect(),
        });

        model.domain_records = config.domain_mapping.as_ref().map(|mapping| {
            let mut records = Vec::new();
            push_records(&mut records, mapping.internal_domains.as_ref(), DomainScope::Internal);
            push_records(&mut records, mapping.external_domains.as_ref(), DomainScope::External);
            records
        });

        log::debug!(
            "Normalized model: {} services ({} skipped), {} machines",
            model.services.len(),
            model.skipped_services.len(),
            model.machines.len()
        );

        model
    }

    /// All port bindings, in service order
    pub fn bindings(&self) -> Vec<PortBinding> {
        self.services.iter().flat_map(Service::bindings).collect()
    }
}

fn service_group(config: &Config, category: ServiceCategory) -> Option<&BTreeMap<String, ServiceSlot>> {
    match category {
        ServiceCategory::Foundation => config.foundation_services.as_ref(),
        ServiceCategory::Application => config.application_services.as_ref(),
        ServiceCategory::Monitoring => config.monitoring_stack.as_ref(),
        ServiceCategory::Development => config.development_environments.as_ref(),
    }
}

fn service_from_entry(
    name: &str,
    category: ServiceCategory,
    entry: &ServiceEntry,
    extra_roles: &BTreeSet<&str>,
) -> Service {
    let mut ports = Vec::new();
    for (role, port) in [
        (PortRole::Host, entry.host_port),
        (PortRole::Ssh, entry.ssh_port),
        (PortRole::Vnc, entry.vnc_port),
    ] {
        if let Some(port) = port {
            ports.push(ServicePort { role, port });
        }
    }

    // Only opted-in keys bind on the host; container_port and the like do not
    for (key, value) in &entry.extra {
        if !extra_roles.contains(key.as_str()) {
            continue;
        }
        match value.as_i64() {
            Some(port) => ports.push(ServicePort {
                role: PortRole::from_key(key),
                port,
            }),
            None => log::debug!("Ignoring non-numeric {} on service '{}'", key, name),
        }
    }

    let host_ip = non_blank(entry.host_ip.as_deref()).unwrap_or_else(|| UNKNOWN_HOST.to_string());

    Service {
        name: name.to_string(),
        category,
        host_ip,
        ports,
    }
}

/// Trimmed value, or `None` when missing or blank
fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn push_records(records: &mut Vec<DomainRecord>, group: Option<&DomainGroup>, scope: DomainScope) {
    let Some(group) = group else {
        return;
    };
    records.extend(group.records.iter().map(|entry| DomainRecord {
        scope,
        name: entry.name.clone(),
        record_type: RecordType::parse(&entry.record_type),
        value: entry.value.clone(),
        proxied: entry.proxied,
    }));
}

fn yaml_scalar_to_string(value: &serde_yaml::Value) -> String {
    match value {
        serde_yaml::Value::String(s) => s.clone(),
        serde_yaml::Value::Number(n) => n.to_string(),
        serde_yaml::Value::Bool(b) => b.to_string(),
        serde_yaml::Value::Null => String::new(),
        other => format!("{:?}", other),
    }
}
