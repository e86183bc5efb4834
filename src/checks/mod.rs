//! Conflict detectors.
//!
//! Each check is a pure function over the [`DeploymentModel`] that returns
//! its own [`Findings`]. Checks never stop early on a violation; the
//! validator merges their findings in a fixed order.
//!
//! [`DeploymentModel`]: crate::model::DeploymentModel

pub mod bindings;
pub mod classify;
pub mod domains;
pub mod ip_assignment;
pub mod port_policy;
pub mod reserved;
pub mod subnets;

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

pub use bindings::{check_port_bindings, BindingCheck};
pub use classify::{ClassificationRule, ClassificationRules, NameMatcher};
pub use domains::check_domain_records;
pub use ip_assignment::{check_ip_assignments, IpAssignmentCheck};
pub use port_policy::{check_port_ranges, parse_policy_ranges, PortRangePolicy};
pub use reserved::check_reserved_ports;
pub use subnets::check_subnet_overlaps;

/// Host key -> every valid port recorded on that host
pub type PortAllocations = BTreeMap<String, BTreeSet<u16>>;

/// Errors and warnings produced by one check, in discovery order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Findings {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl Findings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn error(&mut self, message: impl Into<String>) {
        self.errors.push(message.into());
    }

    pub fn warning(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
    }

    /// Append another check's findings after this one's
    pub fn extend(&mut self, other: Findings) {
        self.errors.extend(other.errors);
        self.warnings.extend(other.warnings);
    }

    pub fn is_clean(&self) -> bool {
        self.errors.is_empty() && self.warnings.is_empty()
    }
}
