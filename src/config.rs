//! Configuration of the repolink server.
//!
//! Settings come from four layers, later ones overriding earlier ones per
//! field: programmed defaults, the user config file, the project config file
//! and the editor's initialization options. Layer loading with diagnostics
//! lives in `lsp::settings`; this module holds the types, the merge and the
//! user config file.

pub mod settings;
pub mod user;

pub use settings::{BridgeSettings, RemoteServerConfig, ResolvedSettings, merge_all, merge_settings};
pub use user::{UserConfigError, UserConfigResult, load_user_config, user_config_path};

/// Directory under the config home holding the user config file.
pub const CONFIG_DIR_NAME: &str = "repolink";

/// File name of both the user and the project config file.
pub const CONFIG_FILE_NAME: &str = "repolink.toml";
