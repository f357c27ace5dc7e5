//! Centralized directory paths for the assistant.
//!
//! Uses the [`dirs`] crate for platform-appropriate resolution.
//!
//! | Purpose | macOS | Linux |
//! |---------|-------|-------|
//! | Config | `~/Library/Application Support/java-hud/` | `~/.config/java-hud/` |
//! | Data (logs) | `~/Library/Application Support/java-hud/` | `~/.local/share/java-hud/` |
//!
//! Override with `JAVA_HUD_CONFIG_DIR` / `JAVA_HUD_DATA_DIR`.

use std::path::PathBuf;

const APP_DIR: &str = "java-hud";

/// Application config directory.
///
/// Holds `config.toml` and `allowlist.json`.
#[must_use]
pub fn config_dir() -> PathBuf {
    if let Some(override_dir) = std::env::var_os("JAVA_HUD_CONFIG_DIR") {
        return PathBuf::from(override_dir);
    }
    dirs::config_dir()
        .map(|d| d.join(APP_DIR))
        .unwrap_or_else(|| PathBuf::from("/tmp/java-hud-config"))
}

/// Application data directory.
#[must_use]
pub fn data_dir() -> PathBuf {
    if let Some(override_dir) = std::env::var_os("JAVA_HUD_DATA_DIR") {
        return PathBuf::from(override_dir);
    }
    dirs::data_dir()
        .map(|d| d.join(APP_DIR))
        .unwrap_or_else(|| PathBuf::from("/tmp/java-hud-data"))
}

/// Log file directory (`data_dir()/logs/`).
#[must_use]
pub fn logs_dir() -> PathBuf {
    data_dir().join("logs")
}

/// Default config file (`config_dir()/config.toml`).
#[must_use]
pub fn config_file() -> PathBuf {
    config_dir().join("config.toml")
}

/// Default allowlist document (`config_dir()/allowlist.json`).
#[must_use]
pub fn allowlist_file() -> PathBuf {
    config_dir().join("allowlist.json")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allowlist_file_lives_in_config_dir() {
        let path = allowlist_file();
        assert!(path.starts_with(config_dir()));
        assert!(path.to_string_lossy().ends_with("allowlist.json"));
    }

    #[test]
    fn logs_dir_is_under_data_dir() {
        assert!(logs_dir().starts_with(data_dir()));
    }
}
