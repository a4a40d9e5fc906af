use std::{
    fs::File,
    io::BufReader,
    path::{Path, PathBuf},
};

use anyhow::Context;
use glp_optimizer::planner::planner_params::PlannerParams;
use tracing::info;

const CONFIG_ENV: &str = "GLP_CONFIG";

/// Reads planner parameters from `path`, or from the file named by
/// `GLP_CONFIG`. Missing fields keep their defaults.
pub fn load_params(path: Option<&Path>) -> Result<PlannerParams, anyhow::Error> {
    let path = match path {
        Some(path) => Some(path.to_path_buf()),
        None => std::env::var_os(CONFIG_ENV).map(PathBuf::from),
    };

    let Some(path) = path else {
        return Ok(PlannerParams::default());
    };

    let file = File::open(&path)
        .with_context(|| format!("Failed to open config {}", path.display()))?;
    let params = serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("Failed to parse config {}", path.display()))?;

    info!("Loaded planner parameters from {}", path.display());
    Ok(params)
}
