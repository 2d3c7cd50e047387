/// Platform-specific default locations for index data and configuration
///
/// Resolved through the `dirs` crate, which follows the XDG Base Directory
/// layout on Linux and the native conventions on macOS and Windows. Every
/// location falls back to the current directory when no home is available.
use std::path::PathBuf;

const APP_DIR: &str = "review-context";

pub struct PlatformPaths;

impl PlatformPaths {
    /// `$XDG_DATA_HOME`, `~/Library/Application Support` or `%LOCALAPPDATA%`
    pub fn data_dir() -> PathBuf {
        dirs::data_local_dir().unwrap_or_else(|| PathBuf::from("."))
    }

    /// `$XDG_CONFIG_HOME`, `~/Library/Application Support` or `%APPDATA%`
    pub fn config_dir() -> PathBuf {
        dirs::config_dir().unwrap_or_else(|| PathBuf::from("."))
    }

    pub fn app_data_dir() -> PathBuf {
        Self::data_dir().join(APP_DIR)
    }

    pub fn app_config_dir() -> PathBuf {
        Self::config_dir().join(APP_DIR)
    }

    /// Returns: {data_dir}/review-context/lancedb
    pub fn default_lancedb_path() -> PathBuf {
        Self::app_data_dir().join("lancedb")
    }

    /// Returns: {data_dir}/review-context/index_state.json
    pub fn default_state_path() -> PathBuf {
        Self::app_data_dir().join("index_state.json")
    }

    /// Returns: {config_dir}/review-context/config.toml
    pub fn default_config_path() -> PathBuf {
        Self::app_config_dir().join("config.toml")
    }
}
