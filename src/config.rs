//! Serde model of the connectivity configuration document.
//!
//! Every key group is optional. Shapes are kept loose where the document is
//! hand-edited (service records, policy intervals) so that one bad entry is
//! reported by the checks instead of failing the whole load.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::utils::ip_utils::Ipv4Cidr;

/// Upper bound on prober worker threads
pub const MAX_PROBE_WORKERS: usize = 64;

/// Top-level connectivity configuration document
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub foundation_services: Option<BTreeMap<String, ServiceSlot>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub application_services: Option<BTreeMap<String, ServiceSlot>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub monitoring_stack: Option<BTreeMap<String, ServiceSlot>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub development_environments: Option<BTreeMap<String, ServiceSlot>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub network_architecture: Option<NetworkArchitecture>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub docker_networking: Option<DockerNetworking>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port_allocation: Option<PortAllocationConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain_mapping: Option<DomainMapping>,
    #[serde(default)]
    pub validation: ValidationSettings,
}

impl Config {
    /// Validate the settings block. The rest of the document is judged by
    /// the checks, not here.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validation.validate()
    }
}

/// A service record, or anything else that happens to sit under a service key
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ServiceSlot {
    Declared(ServiceEntry),
    Other(serde_yaml::Value),
}

/// Service record with its port roles
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServiceEntry {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host_ip: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host_port: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ssh_port: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vnc_port: Option<i64>,
    /// Remaining keys; those named in `validation.port_roles` become extra port roles
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_yaml::Value>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct NetworkArchitecture {
    #[serde(default)]
    pub physical_infrastructure: BTreeMap<String, MachineEntry>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct MachineEntry {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip: Option<String>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct DockerNetworking {
    #[serde(default)]
    pub swarm_networks: BTreeMap<String, OverlayNetworkEntry>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct OverlayNetworkEntry {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subnet: Option<String>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct PortAllocationConfig {
    /// Policy name -> `"start-end"`. Kept as raw YAML so a bad value is a
    /// warning rather than a load failure.
    #[serde(default)]
    pub port_ranges: BTreeMap<String, serde_yaml::Value>,
    #[serde(default)]
    pub reserved_system_ports: Vec<i64>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct DomainMapping {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub internal_domains: Option<DomainGroup>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_domains: Option<DomainGroup>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct DomainGroup {
    #[serde(default)]
    pub records: Vec<DomainRecordEntry>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct DomainRecordEntry {
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type", default)]
    pub record_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(default)]
    pub proxied: bool,
}

/// Optional `validation:` block tuning the checker itself
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ValidationSettings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub infrastructure_network: Option<Ipv4Cidr>,
    #[serde(default, with = "humantime_serde", skip_serializing_if = "Option::is_none")]
    pub probe_timeout: Option<Duration>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub probe_workers: Option<usize>,
    #[serde(default, with = "humantime_serde", skip_serializing_if = "Option::is_none")]
    pub probe_budget: Option<Duration>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub classification_rules: Option<Vec<RuleEntry>>,
    /// Service keys bound on the host in addition to `host_port`,
    /// `ssh_port` and `vnc_port`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port_roles: Option<Vec<String>>,
}

impl ValidationSettings {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(timeout) = self.probe_timeout {
            if timeout.is_zero() {
                return Err(ConfigError::InvalidSetting(
                    "probe_timeout must be greater than zero".to_string(),
                ));
            }
        }

        if let Some(workers) = self.probe_workers {
            if workers == 0 {
                return Err(ConfigError::InvalidSetting(
                    "probe_workers must be at least 1".to_string(),
                ));
            }
        }

        if let Some(roles) = &self.port_roles {
            if roles.iter().any(|role| role.trim().is_empty()) {
                return Err(ConfigError::InvalidSetting(
                    "port_roles entries cannot be empty".to_string(),
                ));
            }
        }

        if let Some(rules) = &self.classification_rules {
            for rule in rules {
                rule.validate()?;
            }
        }

        Ok(())
    }
}

/// One classification rule as written in the document: either a keyword list
/// or a regular expression, matched case-insensitively against service names
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RuleEntry {
    pub category: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub keywords: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
}

impl RuleEntry {
    fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |reason: &str| ConfigError::InvalidRule {
            category: self.category.clone(),
            reason: reason.to_string(),
        };

        if self.category.trim().is_empty() {
            return Err(invalid("category cannot be empty"));
        }
        match (&self.pattern, self.keywords.is_empty()) {
            (Some(_), false) => Err(invalid("use either keywords or pattern, not both")),
            (None, true) => Err(invalid("keywords or pattern is required")),
            _ => Ok(()),
        }
    }
}

/// Configuration validation errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid validation setting: {0}")]
    InvalidSetting(String),
    #[error("Invalid classification rule for '{category}': {reason}")]
    InvalidRule { category: String, reason: String },
}
