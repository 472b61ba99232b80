//! Configuration loading

use anyhow::{bail, Context, Result};
use std::path::Path;

use crate::Config;

const DEFAULT_CONFIG_FILE: &str = "config.yaml";

/// Load and validate the configuration
///
/// The first existing file among the explicit `path`, `REELKIT_CONFIG_PATH`
/// and `./config.yaml` is read. Without one only `REELKIT_*` environment
/// variables apply on top of the defaults.
///
/// Logging is not set up yet when this runs, so progress goes to stderr.
pub fn load_config(path: Option<&str>) -> Result<Config> {
    let config = match config_file(path) {
        Some(file) => {
            eprintln!("Loading config from {file}");
            Config::from_file(&file).with_context(|| format!("Failed to load {file}"))?
        }
        None => Config::from_env().context("Failed to load config from environment")?,
    };

    if let Err(errors) = config.validate() {
        for error in &errors {
            eprintln!("Config validation error: {error}");
        }
        bail!(
            "Configuration validation failed with {} error(s): {}",
            errors.len(),
            errors.join("; ")
        );
    }

    Ok(config)
}

fn config_file(explicit: Option<&str>) -> Option<String> {
    explicit
        .map(ToString::to_string)
        .into_iter()
        .chain(std::env::var("REELKIT_CONFIG_PATH").ok())
        .chain(std::iter::once(DEFAULT_CONFIG_FILE.to_string()))
        .find(|p| Path::new(p).exists())
}
