use crate::config::Config;
use crate::model::DeploymentModel;
use color_eyre::eyre::WrapErr;
use color_eyre::Result;
use log::{debug, info};
use std::fs::File;
use std::path::Path;

/// Load and parse a connectivity configuration from a YAML file
///
/// # Arguments
/// * `config_path` - Path to the connectivity document
///
/// # Returns
/// The parsed document with its `validation:` block checked. Fails if the
/// file cannot be opened, is not well-formed YAML, its top level is not a
/// mapping, or the settings block is invalid.
pub fn load_config(config_path: &Path) -> Result<Config> {
    info!("Loading configuration from: {:?}", config_path);

    let file = File::open(config_path)
        .wrap_err_with(|| format!("Configuration file not found: {}", config_path.display()))?;

    let config: Config = serde_yaml::from_reader(file)
        .wrap_err_with(|| format!("Failed to parse YAML in {}", config_path.display()))?;

    config
        .validate()
        .wrap_err_with(|| format!("Invalid validation settings in {}", config_path.display()))?;

    Ok(config)
}

/// Load a configuration and normalize it into a [`DeploymentModel`]
pub fn load_model(config_path: &Path) -> Result<DeploymentModel> {
    let config = load_config(config_path)?;
    let model = DeploymentModel::from_config(&config);
    debug!(
        "Loaded {} services, {} machines from {:?}",
        model.services.len(),
        model.machines.len(),
        config_path
    );
    Ok(model)
}
