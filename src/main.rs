use clap::Parser;
use color_eyre::eyre::WrapErr;
use color_eyre::Result;
use env_logger::Env;
use log::{info, warn};
use std::collections::BTreeSet;
use std::path::PathBuf;
use std::time::Duration;

use deploycheck::config_loader;
use deploycheck::model::DeploymentModel;
use deploycheck::probe::CancelToken;
use deploycheck::report::render_summary;
use deploycheck::validator::{ValidationOptions, Validator};

/// Validate service connectivity and port assignments before deployment
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the connectivity configuration YAML file
    #[arg(short, long, default_value = "planning/specifications/connectivity-port-mapping.yml")]
    config: PathBuf,

    /// Also probe every recorded port over TCP
    #[arg(short = 'a', long)]
    check_availability: bool,

    /// Only print the per-host port allocation summary
    #[arg(short, long)]
    summary_only: bool,

    /// Print the report as JSON
    #[arg(long)]
    json: bool,

    /// Restrict availability probing to these hosts (comma separated)
    #[arg(long, value_delimiter = ',')]
    hosts: Vec<String>,

    /// Per-probe connect timeout in milliseconds
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    timeout_ms: Option<u64>,

    /// Number of concurrent probe workers
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..=64))]
    workers: Option<u32>,

    /// Log filter used when RUST_LOG is not set
    #[arg(long, default_value = "warn")]
    log_level: String,
}

impl Args {
    /// Merge command-line overrides over the document's settings
    fn validation_options(&self, model: &DeploymentModel) -> Result<ValidationOptions> {
        let mut options = ValidationOptions::from_settings(&model.settings)
            .wrap_err_with(|| format!("Invalid validation settings in {}", self.config.display()))?;

        options.check_availability = self.check_availability;
        if let Some(ms) = self.timeout_ms {
            options.probe.timeout = Duration::from_millis(ms);
        }
        if let Some(workers) = self.workers {
            options.probe.workers = workers as usize;
        }
        if !self.hosts.is_empty() {
            options.probe.hosts = Some(self.hosts.iter().cloned().collect::<BTreeSet<String>>());
        }

        Ok(options)
    }
}

/// Ctrl-C handler: stop outstanding probes so the partial report still prints
fn interrupt_handler(token: CancelToken) -> impl FnMut() + Send + 'static {
    move || {
        warn!("Interrupted; skipping remaining reachability probes");
        token.cancel();
    }
}

fn main() -> Result<()> {
    color_eyre::install()?;

    let args = Args::parse();

    env_logger::Builder::from_env(Env::default().default_filter_or(args.log_level.as_str())).init();

    info!("Configuration file: {:?}", args.config);

    let model = config_loader::load_model(&args.config)?;
    let validator = Validator::new(args.validation_options(&model)?);

    if args.summary_only {
        let summary = validator.summarize(&model);
        if args.json {
            println!("{}", serde_json::to_string_pretty(&summary)?);
        } else {
            println!("{}", render_summary(&summary));
        }
        return Ok(());
    }

    if args.check_availability {
        ctrlc::set_handler(interrupt_handler(validator.cancel_token()))
            .wrap_err("Failed to install Ctrl-C handler")?;
    }

    let report = validator.run(&model);
    if args.json {
        println!("{}", report.to_json()?);
    } else {
        println!("{}", report.render_text());
    }

    if !report.passed {
        std::process::exit(1);
    }

    Ok(())
}
