use std::fs;
use std::path::Path;

use tracing::{error, info};

use crate::config::TransmitConfig;
use crate::error::{Result, TransmitError};

/// Environment variable overriding the configured upload endpoint.
const UPLOAD_FILE_URL_VAR: &str = "UPLOAD_FILE_URL";

/// Loads a static YAML config file and applies environment overrides.
/// The file holds the non-sensitive shape; `UPLOAD_FILE_URL` in the
/// environment wins over the file's upload endpoint when set.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<TransmitConfig> {
    let path_ref = path.as_ref();
    info!(config_path = ?path_ref, "Loading configuration from file");

    let config_content = match fs::read_to_string(path_ref) {
        Ok(content) => {
            info!(config_path = ?path_ref, "Config file read successfully");
            content
        }
        Err(e) => {
            error!(error = ?e, config_path = ?path_ref, "Failed to read config file");
            return Err(TransmitError::Config(format!(
                "failed to read config file {path_ref:?}: {e}"
            )));
        }
    };

    let mut config: TransmitConfig = match serde_yaml::from_str(&config_content) {
        Ok(config) => {
            info!(config_path = ?path_ref, "Parsed config YAML successfully");
            config
        }
        Err(e) => {
            error!(error = ?e, config_path = ?path_ref, "Failed to parse config YAML");
            return Err(TransmitError::Config(format!(
                "failed to parse config YAML: {e}"
            )));
        }
    };

    if let Ok(url) = std::env::var(UPLOAD_FILE_URL_VAR) {
        info!(%url, "Overriding upload endpoint from environment");
        config.app.upload_file_url = Some(url);
    }

    config.trace_loaded();
    Ok(config)
}
