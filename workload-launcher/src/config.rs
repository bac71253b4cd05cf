use workload_config::load_config;
use workload_config::shared::LauncherConfig;

/// Loads the [`LauncherConfig`] and validates it.
pub fn load_launcher_config() -> anyhow::Result<LauncherConfig> {
    let config = load_config::<LauncherConfig>()?;
    config.validate()?;

    Ok(config)
}
