//! # Deploycheck - Pre-deployment consistency checks for multi-host service layouts
//!
//! This library validates a declarative connectivity document (services, their
//! host addresses and ports, physical machines, overlay networks, port-range
//! policy and DNS records) before anything is deployed.
//!
//! ## Overview
//!
//! A configuration is loaded once into a read-only [`model::DeploymentModel`].
//! Independent checks then run over that model and each returns its own
//! findings. The validator merges them in a fixed order into a
//! [`report::ValidationReport`] whose verdict depends on errors only.
//!
//! ## Checks
//!
//! - **Port bindings**: the same `(host, port)` claimed by two services
//! - **IP assignments**: malformed, duplicated or out-of-VLAN machine addresses
//! - **Port-range policy**: service ports outside their category's interval
//! - **Domain records**: A records whose value is not an IPv4 address
//! - **Reserved ports**: services claiming reserved system ports
//! - **Overlay subnets**: Docker networks whose CIDRs overlap
//! - **Reachability** (optional): TCP probes of every recorded port
//!
//! ## Architecture
//!
//! - `config`: serde model of the YAML document and the `validation:` block
//! - `config_loader`: file loading with error context
//! - `model`: normalized deployment model
//! - `checks`: the conflict detectors and service classification rules
//! - `probe`: bounded, cancellable reachability probing
//! - `report`: report assembly, allocation summary and rendering
//! - `validator`: runs the checks and assembles the report
//! - `plan`: structural checker for deployment plan files
//! - `utils`: IPv4/CIDR parsing and port range helpers
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use deploycheck::config_loader;
//! use deploycheck::validator::{ValidationOptions, Validator};
//! use std::path::Path;
//!
//! let model = config_loader::load_model(Path::new("connectivity-port-mapping.yml"))?;
//! let options = ValidationOptions::from_settings(&model.settings)?;
//! let report = Validator::new(options).run(&model);
//!
//! println!("{}", report.render_text());
//! # Ok::<(), color_eyre::Report>(())
//! ```
//!
//! ## Error Handling
//!
//! Typed errors (`thiserror`) come from the parsing helpers and the settings
//! block. Loading uses `color_eyre` so a failure names the offending file.
//! Problems inside the document itself are never errors in the Rust sense:
//! they are findings in the report.

pub mod checks;
pub mod config;
pub mod config_loader;
pub mod model;
pub mod plan;
pub mod probe;
pub mod report;
pub mod utils;
pub mod validator;
