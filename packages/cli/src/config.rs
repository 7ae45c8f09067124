use anyhow::Context;
use pagecraft_editor::{EngineConfig, Page};
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_NAME: &str = "pagecraft.config.json";

/// Load the engine config.
///
/// An explicit path must exist. Otherwise `pagecraft.config.json` in `cwd`
/// is used when present, falling back to the default config.
pub fn load_config(cwd: &str, explicit: Option<&Path>) -> anyhow::Result<EngineConfig> {
    let config_path = match explicit {
        Some(path) => path.to_path_buf(),
        None => {
            let path = PathBuf::from(cwd).join(DEFAULT_CONFIG_NAME);
            if !path.exists() {
                return Ok(EngineConfig::default());
            }
            path
        }
    };

    let content = std::fs::read_to_string(&config_path)
        .with_context(|| format!("Cannot read config {}", config_path.display()))?;
    parse_config(&content).with_context(|| format!("Invalid config {}", config_path.display()))
}

pub fn parse_config(content: &str) -> anyhow::Result<EngineConfig> {
    Ok(serde_json::from_str(content)?)
}

pub fn load_page(path: &Path) -> anyhow::Result<Page> {
    let content =
        std::fs::read_to_string(path).with_context(|| format!("Cannot read page {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("Invalid page {}", path.display()))
}
