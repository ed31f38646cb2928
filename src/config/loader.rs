// Configuration loader with environment variable substitution

use super::types::RecorderConfig;
use anyhow::{bail, Context, Result};
use regex::Regex;
use std::path::Path;

pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from file with environment variable substitution
    pub fn load<P: AsRef<Path>>(path: P) -> Result<RecorderConfig> {
        let content =
            std::fs::read_to_string(path.as_ref()).context("Failed to read config file")?;

        // Substitute environment variables
        let content = Self::substitute_env_vars(&content);

        // Parse YAML
        let config: RecorderConfig =
            serde_yaml::from_str(&content).context("Failed to parse YAML configuration")?;

        // Validate configuration
        Self::validate(&config)?;

        Ok(config)
    }

    /// Substitute ${VAR} and ${VAR:-default} patterns with environment variables
    ///
    /// Examples:
    /// - ${HOME} -> /home/user
    /// - ${RECORDING_DIR:-/data/recordings} -> /data/recordings (if unset)
    fn substitute_env_vars(content: &str) -> String {
        let re = Regex::new(r"\$\{([^}:]+)(?::-([^}]+))?\}").unwrap();

        re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            let default_value = caps.get(2).map(|m| m.as_str());

            match std::env::var(var_name) {
                Ok(value) => value,
                Err(_) => {
                    if let Some(default) = default_value {
                        default.to_string()
                    } else {
                        // Keep original if no default and var not found
                        format!("${{{}}}", var_name)
                    }
                }
            }
        })
        .to_string()
    }

    /// Validate configuration
    pub fn validate(config: &RecorderConfig) -> Result<()> {
        if config.storage.base_path.is_empty() {
            bail!("storage.base_path cannot be empty");
        }

        if config.capture.frame_interval == 0 {
            bail!("capture.frame_interval must be >= 1");
        }

        if config.capture.adaptive.enabled {
            if config.capture.adaptive.position_threshold_m <= 0.0 {
                bail!("capture.adaptive.position_threshold_m must be > 0");
            }
            let angle = config.capture.adaptive.angle_threshold_degrees;
            if angle <= 0.0 || angle >= 180.0 {
                bail!("capture.adaptive.angle_threshold_degrees must be in (0, 180)");
            }
        }

        Ok(())
    }
}
