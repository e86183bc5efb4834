//! Structural checker for deployment plan files.
//!
//! Exits non-zero when the plan has errors or cannot be read.

use std::path::PathBuf;

use clap::Parser;
use color_eyre::eyre::Result;

use deploycheck::plan::{PlanChecker, DEFAULT_ASSIGNEES};

#[derive(Parser)]
#[command(name = "plan-check")]
#[command(about = "Validate deployment plan structure and dependencies")]
#[command(version)]
struct Cli {
    /// Path to the deployment plan YAML file
    plan: PathBuf,

    /// Instance allowed to own a step (repeatable; replaces the default list)
    #[arg(long = "assignee")]
    assignees: Vec<String>,

    /// Print the report as JSON
    #[arg(long)]
    json: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "warn")]
    log_level: String,
}

fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(&cli.log_level))
        .init();

    let checker = if cli.assignees.is_empty() {
        log::debug!("Using default assignees: {}", DEFAULT_ASSIGNEES.join(", "));
        PlanChecker::default()
    } else {
        PlanChecker::new(cli.assignees.iter().cloned())
    };

    let report = checker.check_file(&cli.plan)?;
    if cli.json {
        println!("{}", report.to_json()?);
    } else {
        println!("{}", report.render_text());
    }

    if !report.passed {
        std::process::exit(1);
    }
    Ok(())
}
