use super::{default_global_config_path, ConfigError, Settings};
use std::path::Path;

/// Loads settings from `explicit` when given (the file must exist), otherwise from the
/// global config path, falling back to defaults when no global file has been written.
pub fn load_settings(explicit: Option<&Path>) -> Result<Settings, ConfigError> {
    let settings = match explicit {
        Some(path) => {
            if !path.is_file() {
                return Err(ConfigError::Missing {
                    path: path.display().to_string(),
                });
            }
            Settings::from_path(path)?
        }
        None => {
            let path = default_global_config_path()?;
            if path.is_file() {
                Settings::from_path(&path)?
            } else {
                Settings::default()
            }
        }
    };
    settings.validate()?;
    Ok(settings)
}
