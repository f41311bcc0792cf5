use crate::infrastructure::config::{AppSettings, ensure_default_configs, load_app_settings};
use crate::infrastructure::error::InfraError;
use std::fs;
use std::path::{Path, PathBuf};

const HOME_ENV: &str = "STAYTRACKER_HOME";

#[derive(Debug)]
pub struct BootstrapResult {
    pub workspace_root: PathBuf,
    pub config_dir: PathBuf,
    pub logs_dir: PathBuf,
    pub settings: AppSettings,
}

pub fn resolve_workspace_root() -> Result<PathBuf, InfraError> {
    resolve_workspace_root_from_lookup(|key| std::env::var(key).ok())
}

fn resolve_workspace_root_from_lookup<F>(lookup: F) -> Result<PathBuf, InfraError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(HOME_ENV)
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
    {
        Some(path) => Ok(PathBuf::from(path)),
        None => Ok(std::env::current_dir()?),
    }
}

pub fn workspace_dirs(workspace_root: &Path) -> (PathBuf, PathBuf) {
    (workspace_root.join("config"), workspace_root.join("logs"))
}

pub fn bootstrap_workspace(workspace_root: &Path) -> Result<BootstrapResult, InfraError> {
    let (config_dir, logs_dir) = workspace_dirs(workspace_root);

    fs::create_dir_all(&config_dir)?;
    fs::create_dir_all(&logs_dir)?;

    ensure_default_configs(&config_dir)?;
    let settings = load_app_settings(&config_dir)?;

    Ok(BootstrapResult {
        workspace_root: workspace_root.to_path_buf(),
        config_dir,
        logs_dir,
        settings,
    })
}
