//! Configuration persistence commands
//!
//! Save/load/list/delete configuration profiles as JSON files
//! in the user's config directory.

use std::path::{Path, PathBuf};

use crate::domain::{Configuration, RigError, RigResult};

/// `rigcorder/configs` under the platform config directory
/// (`$XDG_CONFIG_HOME` or `~/.config` on Linux).
pub fn default_config_dir() -> RigResult<PathBuf> {
    dirs::config_dir()
        .map(|d| d.join("rigcorder").join("configs"))
        .ok_or_else(|| RigError::Config("Could not determine the config directory".into()))
}

fn ensure_dir(dir: &Path) -> RigResult<()> {
    std::fs::create_dir_all(dir)
        .map_err(|e| RigError::Config(format!("Failed to create configs dir: {e}")))
}

/// Sanitize a configuration name to prevent path traversal.
/// Rejects path separators, "..", and empty strings.
fn sanitize_name(name: &str) -> RigResult<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(RigError::Config("Configuration name cannot be empty".into()));
    }
    if trimmed.contains("..") || trimmed.contains('/') || trimmed.contains('\\') {
        return Err(RigError::Config("Invalid configuration name".into()));
    }
    // Only allow alphanumeric, spaces, hyphens, underscores
    if !trimmed
        .chars()
        .all(|c| c.is_alphanumeric() || c == ' ' || c == '-' || c == '_')
    {
        return Err(RigError::Config(
            "Configuration name contains invalid characters".into(),
        ));
    }
    Ok(trimmed.to_string())
}

pub fn save_configuration(dir: &Path, config: &Configuration) -> RigResult<()> {
    let name = sanitize_name(&config.name)?;
    ensure_dir(dir)?;
    let path = dir.join(format!("{name}.json"));
    let json = serde_json::to_string_pretty(config)
        .map_err(|e| RigError::Config(format!("Serialization error: {e}")))?;
    std::fs::write(&path, json)
        .map_err(|e| RigError::Config(format!("Failed to write config: {e}")))?;
    log::info!("Saved configuration '{name}' to {}", path.display());
    Ok(())
}

pub fn load_configuration(dir: &Path, name: &str) -> RigResult<Configuration> {
    let name = sanitize_name(name)?;
    let path = dir.join(format!("{name}.json"));
    let json = std::fs::read_to_string(&path)
        .map_err(|e| RigError::Config(format!("Failed to read config '{name}': {e}")))?;
    serde_json::from_str(&json)
        .map_err(|e| RigError::Config(format!("Failed to parse config '{name}': {e}")))
}

pub fn list_configurations(dir: &Path) -> RigResult<Vec<String>> {
    if !dir.exists() {
        return Ok(Vec::new());
    }
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .map_err(|e| RigError::Config(format!("Failed to read configs dir: {e}")))?
        .filter_map(|entry| {
            let entry = entry.ok()?;
            let path = entry.path();
            if path.extension()?.to_str()? == "json" {
                path.file_stem()?.to_str().map(String::from)
            } else {
                None
            }
        })
        .collect();
    names.sort();
    Ok(names)
}

pub fn delete_configuration(dir: &Path, name: &str) -> RigResult<()> {
    let name = sanitize_name(name)?;
    if name == "Default" {
        return Err(RigError::Config(
            "Cannot delete the Default configuration".into(),
        ));
    }
    let path = dir.join(format!("{name}.json"));
    if !path.exists() {
        return Err(RigError::Config(format!("Configuration '{name}' not found")));
    }
    std::fs::remove_file(&path)
        .map_err(|e| RigError::Config(format!("Failed to delete config '{name}': {e}")))
}
