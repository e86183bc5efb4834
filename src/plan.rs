//! Structural checks for deployment plan files.
//!
//! A plan is a hand-written YAML document describing who deploys what, in
//! which order, and how to roll back. It is inspected as a loose
//! `serde_yaml::Value` so that every problem becomes a finding instead of a
//! parse failure. All findings are collected; nothing stops at the first.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use chrono::{DateTime, NaiveDate, Utc};
use color_eyre::eyre::WrapErr;
use color_eyre::Result;
use regex::Regex;
use serde::Serialize;
use serde_yaml::Value;

use crate::checks::Findings;

/// Instances allowed to own a deployment step
pub const DEFAULT_ASSIGNEES: [&str; 3] = ["CDTZ", "CCN", "CCW"];

pub const REQUIRED_SECTIONS: [&str; 5] = [
    "metadata",
    "description",
    "environment",
    "deployment_steps",
    "rollback_plan",
];

const REQUIRED_METADATA: [&str; 4] = ["name", "version", "created_date", "status"];
const REQUIRED_STEP_FIELDS: [&str; 4] = ["name", "assigned_to", "description", "estimated_duration"];

/// Plans estimated above this many minutes get a warning
pub const MAX_TOTAL_MINUTES: u64 = 120;

/// Match: "30 minutes", "1 hour", "90 min", "2 hrs"
static DURATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*(\d+)\s*(minutes?|mins?|hours?|hrs?)\s*$").expect("Invalid duration regex")
});

/// Parse a step duration into minutes
pub fn parse_duration_minutes(s: &str) -> Option<u64> {
    let caps = DURATION.captures(s)?;
    let amount: u64 = caps[1].parse().ok()?;
    if caps[2].to_ascii_lowercase().starts_with('h') {
        amount.checked_mul(60)
    } else {
        Some(amount)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PlanStats {
    pub steps: usize,
    pub target_machines: usize,
    pub total_minutes: u64,
    pub external_integrations: Vec<String>,
    pub dependencies: usize,
}

/// Result of checking one plan document
#[derive(Debug, Clone, Default)]
pub struct PlanCheck {
    pub findings: Findings,
    pub stats: PlanStats,
}

#[derive(Debug, Clone, Serialize)]
pub struct PlanReport {
    pub plan: PathBuf,
    pub passed: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub stats: PlanStats,
    pub generated_at: DateTime<Utc>,
}

impl PlanReport {
    pub fn new(plan: &Path, check: PlanCheck) -> Self {
        PlanReport {
            plan: plan.to_path_buf(),
            passed: check.findings.errors.is_empty(),
            errors: check.findings.errors,
            warnings: check.findings.warnings,
            stats: check.stats,
            generated_at: Utc::now(),
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn render_text(&self) -> String {
        let mut lines = vec![format!("Deployment plan: {}", self.plan.display())];

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
        lines.push("Plan summary:".to_string());
        lines.push(format!("   {} deployment steps", self.stats.steps));
        lines.push(format!("   {} target machines", self.stats.target_machines));
        lines.push(format!("   {} minutes estimated duration", self.stats.total_minutes));
        lines.push(format!(
            "   {} external integrations",
            self.stats.external_integrations.len()
        ));
        if !self.stats.external_integrations.is_empty() {
            lines.push(format!(
                "   External integrations required: {}",
                self.stats.external_integrations.join(", ")
            ));
        }

        lines.push(String::new());
        if self.passed {
            lines.push("Deployment plan validation passed".to_string());
        } else {
            lines.push("Deployment plan validation failed".to_string());
        }

        lines.join("\n")
    }
}

pub struct PlanChecker {
    assignees: BTreeSet<String>,
}

impl Default for PlanChecker {
    fn default() -> Self {
        PlanChecker::new(DEFAULT_ASSIGNEES.iter().map(|a| a.to_string()))
    }
}

impl PlanChecker {
    pub fn new(assignees: impl IntoIterator<Item = String>) -> Self {
        PlanChecker {
            assignees: assignees.into_iter().collect(),
        }
    }

    /// Read, parse and check a plan file, including its dependencies
    ///
    /// # Arguments
    /// * `path` - Plan file; dependencies are looked up in `../completed`
    ///   relative to its directory
    ///
    /// # Returns
    /// The report, or an error if the file cannot be read or is not YAML
    pub fn check_file(&self, path: &Path) -> Result<PlanReport> {
        log::info!("Checking deployment plan: {:?}", path);

        let contents = fs::read_to_string(path)
            .wrap_err_with(|| format!("Plan file not found: {}", path.display()))?;
        let plan: Value = serde_yaml::from_str(&contents)
            .wrap_err_with(|| format!("Failed to parse YAML in {}", path.display()))?;

        let mut check = self.check(&plan);
        check.findings.extend(check_dependencies(&plan, path));

        Ok(PlanReport::new(path, check))
    }

    /// Structural checks over an already parsed plan
    pub fn check(&self, plan: &Value) -> PlanCheck {
        let mut check = PlanCheck::default();

        if !plan.is_mapping() {
            check.findings.error("Plan must be a YAML mapping");
            return check;
        }

        for section in REQUIRED_SECTIONS {
            if plan.get(section).is_none() {
                check.findings.error(format!("Missing required section: {}", section));
            }
        }

        if let Some(metadata) = plan.get("metadata") {
            self.check_metadata(metadata, &mut check.findings);
        }
        if let Some(steps) = plan.get("deployment_steps") {
            self.check_steps(steps, &mut check);
        }
        if let Some(rollback) = plan.get("rollback_plan") {
            if rollback.get("trigger_conditions").is_none() || rollback.get("rollback_steps").is_none() {
                check
                    .findings
                    .error("rollback_plan must include trigger_conditions and rollback_steps");
            }
        }
        if let Some(environment) = plan.get("environment") {
            self.check_environment(environment, &mut check);
        }

        if let Some(Value::Mapping(integrations)) = plan.get("external_integrations") {
            check.stats.external_integrations = integrations.keys().map(scalar_text).collect();
        }
        check.stats.dependencies = dependency_names(plan).len();

        if check.stats.total_minutes > MAX_TOTAL_MINUTES {
            check.findings.warning(format!(
                "Total estimated duration ({} minutes) is quite long - consider breaking into smaller deployments",
                check.stats.total_minutes
            ));
        }

        check
    }

    fn check_metadata(&self, metadata: &Value, findings: &mut Findings) {
        if !metadata.is_mapping() {
            findings.error("metadata must be a mapping");
            return;
        }

        let missing: Vec<&str> = REQUIRED_METADATA
            .iter()
            .copied()
            .filter(|field| metadata.get(*field).is_none())
            .collect();
        if !missing.is_empty() {
            findings.error(format!("Missing metadata fields: {}", missing.join(", ")));
        }

        if let Some(date) = metadata.get("created_date") {
            let text = scalar_text(date);
            if NaiveDate::parse_from_str(&text, "%Y-%m-%d").is_err() {
                findings.warning(format!("Metadata created_date '{}' is not a YYYY-MM-DD date", text));
            }
        }
    }

    fn check_steps(&self, steps: &Value, check: &mut PlanCheck) {
        let steps = match steps.as_sequence() {
            Some(steps) if !steps.is_empty() => steps,
            _ => {
                check.findings.error("deployment_steps must be a non-empty list");
                return;
            }
        };
        check.stats.steps = steps.len();

        let mut seen: BTreeSet<String> = BTreeSet::new();
        for (i, step) in steps.iter().enumerate() {
            let number = i + 1;
            if !step.is_mapping() {
                check.findings.error(format!("Step {} must be a mapping", number));
                continue;
            }

            let missing: Vec<&str> = REQUIRED_STEP_FIELDS
                .iter()
                .copied()
                .filter(|field| step.get(*field).is_none())
                .collect();
            if !missing.is_empty() {
                check
                    .findings
                    .error(format!("Step {} missing fields: {}", number, missing.join(", ")));
            }

            let name = step
                .get("name")
                .map(scalar_text)
                .unwrap_or_else(|| format!("#{}", number));
            if step.get("name").is_some() && !seen.insert(name.clone()) {
                check.findings.error(format!("Duplicate step name: {}", name));
            }

            if let Some(assigned) = step.get("assigned_to") {
                let assigned = scalar_text(assigned);
                if !self.assignees.contains(&assigned) {
                    check
                        .findings
                        .error(format!("Step '{}' assigned to invalid instance: {}", name, assigned));
                }
            }

            if let Some(duration) = step.get("estimated_duration") {
                let text = scalar_text(duration);
                match duration.as_str().and_then(parse_duration_minutes) {
                    Some(minutes) => check.stats.total_minutes += minutes,
                    None => check.findings.warning(format!(
                        "Step '{}' has non-standard duration format: {}",
                        name, text
                    )),
                }
            }
        }
    }

    fn check_environment(&self, environment: &Value, check: &mut PlanCheck) {
        let Some(machines) = environment.get("target_machines") else {
            check.findings.error("environment section must include target_machines");
            return;
        };

        let Some(machines) = machines.as_sequence() else {
            check.findings.error("environment.target_machines must be a list");
            return;
        };
        check.stats.target_machines = machines.len();

        for machine in machines {
            let Some(memory) = machine.get("resources_required").and_then(|r| r.get("memory")) else {
                continue;
            };
            let memory = scalar_text(memory);
            if !memory.ends_with("GB") && !memory.ends_with("MB") {
                check
                    .findings
                    .warning(format!("Memory specification '{}' should include GB or MB", memory));
            }
        }
    }
}

/// `prerequisites.dependencies[].deployment` names, in document order
fn dependency_names(plan: &Value) -> Vec<String> {
    plan.get("prerequisites")
        .and_then(|p| p.get("dependencies"))
        .and_then(Value::as_sequence)
        .map(|deps| {
            deps.iter()
                .filter_map(|dep| dep.get("deployment"))
                .map(scalar_text)
                .filter(|name| !name.is_empty())
                .collect()
        })
        .unwrap_or_default()
}

/// Look up each dependency among the `*.yml` files of the sibling
/// `completed` directory. Unsatisfied dependencies are warnings.
pub fn check_dependencies(plan: &Value, plan_path: &Path) -> Findings {
    let mut findings = Findings::new();
    let dependencies = dependency_names(plan);
    if dependencies.is_empty() {
        log::debug!("No dependencies specified");
        return findings;
    }

    let plan_dir = plan_path.parent().unwrap_or_else(|| Path::new("."));
    let completed_dir = plan_dir.join("..").join("completed");

    let completed: Vec<String> = match fs::read_dir(&completed_dir) {
        Ok(entries) => entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.file_name().to_string_lossy().into_owned())
            .filter(|name| name.ends_with(".yml"))
            .collect(),
        Err(e) => {
            log::debug!("Cannot read {:?}: {}", completed_dir, e);
            findings.warning(format!(
                "Completed deployments directory not found: {}",
                completed_dir.display()
            ));
            return findings;
        }
    };

    for dependency in dependencies {
        if completed.iter().any(|file| file.contains(&dependency)) {
            log::info!("Dependency '{}' found in completed deployments", dependency);
        } else {
            findings.warning(format!(
                "Dependency '{}' not found in completed deployments",
                dependency
            ));
        }
    }

    findings
}

fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
        other => serde_yaml::to_string(other)
            .map(|s| s.trim_end().to_string())
            .unwrap_or_default(),
    }
}
