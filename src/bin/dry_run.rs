//! Renders a single cycle into `output_dir` without touching a panel.

use anyhow::{Context, Result};
use chrono::Local;
use log::info;
use rustic_ink_display::{config::Config, dashboard::Modules, driver::registry};
use std::path::PathBuf;

fn main() -> Result<()> {
    env_logger::init();

    let config_path = match std::env::args().nth(1) {
        Some(path) => PathBuf::from(path),
        None => Config::default_path()?,
    };
    let config = Config::load(&config_path)?;

    let model = registry::panel_model(&config.panel_model)
        .with_context(|| format!("Unknown panel model {}", config.panel_model))?;

    let mut modules = Modules::from_config(&config, model.capability)?;
    modules.seed_from_dir(&config.output_dir, model.capability);

    let composition = modules.compose(Local::now().naive_local());
    composition
        .save(&config.output_dir)
        .context("Could not write the canvas")?;

    info!("Canvas written to {}", config.output_dir.display());
    Ok(())
}
