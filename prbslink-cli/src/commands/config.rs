use anyhow::{Context, Result};
use prbslink_core::MonitorConfig;
use std::fs;
use tracing::info;

/// Write the default monitor configuration as pretty JSON
pub fn execute(output: &str) -> Result<()> {
    let config = MonitorConfig::default();
    let json = serde_json::to_string_pretty(&config).context("Failed to serialize config")?;

    fs::write(output, json).with_context(|| format!("Failed to write config file: {}", output))?;

    info!("Default configuration written to: {}", output);
    Ok(())
}

/// Load and validate a configuration file, or fall back to the defaults
pub fn load(path: Option<&str>) -> Result<MonitorConfig> {
    let config = match path {
        Some(path) => {
            let content = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path))?;
            serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {}", path))?
        }
        None => MonitorConfig::default(),
    };

    config.validate().context("Invalid monitor configuration")?;
    Ok(config)
}
