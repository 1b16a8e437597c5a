//! User-wide configuration file.
//!
//! Location: `$XDG_CONFIG_HOME/repolink/repolink.toml`, falling back to the
//! platform config directory (`~/.config` on Linux) when `XDG_CONFIG_HOME` is
//! unset or empty.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use super::{BridgeSettings, CONFIG_DIR_NAME, CONFIG_FILE_NAME};

#[derive(Debug, Error)]
pub enum UserConfigError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

pub type UserConfigResult<T> = Result<T, UserConfigError>;

/// Path of the user config file, or `None` when no config directory is known.
pub fn user_config_path() -> Option<PathBuf> {
    let config_home = std::env::var_os("XDG_CONFIG_HOME")
        .filter(|value| !value.is_empty())
        .map(PathBuf::from)
        .or_else(dirs::config_dir)?;
    Some(config_home.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
}

/// Load the user config file.
///
/// A missing file is not an error and yields `Ok(None)`.
pub fn load_user_config() -> UserConfigResult<Option<BridgeSettings>> {
    match user_config_path() {
        Some(path) => load_config_file(&path),
        None => Ok(None),
    }
}

pub(crate) fn load_config_file(path: &Path) -> UserConfigResult<Option<BridgeSettings>> {
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(UserConfigError::Io {
                path: path.to_path_buf(),
                source,
            });
        }
    };

    toml::from_str(&contents)
        .map(Some)
        .map_err(|source| UserConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
}
