//! Domain record validation.
//!
//! Only internal A records are value-checked. CNAME targets and external
//! records are informational.

use crate::model::{DeploymentModel, DomainScope, RecordType};
use crate::utils::ip_utils::parse_ipv4;

use super::Findings;

pub fn check_domain_records(model: &DeploymentModel) -> Findings {
    let mut findings = Findings::new();
    let Some(records) = &model.domain_records else {
        findings.warning("No domain mapping configuration found");
        return findings;
    };

    for record in records {
        let value = record.value.as_deref().unwrap_or("");
        match (record.scope, &record.record_type) {
            (DomainScope::Internal, RecordType::A) => {
                if parse_ipv4(value).is_err() {
                    findings.error(format!("Invalid IP in A record: {} -> {}", record.name, value));
                } else {
                    log::debug!("Internal A record: {} -> {}", record.name, value);
                }
            }
            (DomainScope::Internal, record_type) => {
                log::debug!("Internal {} record: {} -> {}", record_type, record.name, value);
            }
            (DomainScope::External, record_type) => {
                log::debug!(
                    "External {} record: {} -> {} (proxied: {})",
                    record_type,
                    record.name,
                    value,
                    record.proxied
                );
            }
        }
    }

    log::info!(
        "Domain records: {} records, {} errors",
        records.len(),
        findings.errors.len()
    );

    findings
}
