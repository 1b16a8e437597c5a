use serde::{Deserialize, Serialize};

use crate::address::{DEFAULT_AUTHORITY, DEFAULT_SCHEME, RepoUriScheme};

/// Command line of the remote code-intelligence service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteServerConfig {
    pub cmd: Vec<String>,
}

/// One layer of settings, as written in a config file or initialization options.
///
/// Every field is optional so that a layer only overrides what it mentions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BridgeSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote_server: Option<RemoteServerConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scheme: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authority: Option<String>,
}

impl BridgeSettings {
    /// Programmed defaults, the lowest layer.
    pub fn defaults() -> Self {
        Self {
            remote_server: None,
            scheme: Some(DEFAULT_SCHEME.to_string()),
            authority: Some(DEFAULT_AUTHORITY.to_string()),
        }
    }
}

/// Settings after merging, with defaults filled in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSettings {
    pub remote_server: Option<RemoteServerConfig>,
    pub scheme: String,
    pub authority: String,
}

impl ResolvedSettings {
    /// The editor address grammar these settings describe.
    pub fn file_system(&self) -> RepoUriScheme {
        RepoUriScheme::new(&self.scheme, &self.authority)
    }
}

impl Default for ResolvedSettings {
    fn default() -> Self {
        BridgeSettings::defaults().into()
    }
}

impl From<BridgeSettings> for ResolvedSettings {
    fn from(settings: BridgeSettings) -> Self {
        let non_empty = |value: Option<String>| value.filter(|v| !v.is_empty());
        Self {
            remote_server: settings.remote_server.filter(|r| !r.cmd.is_empty()),
            scheme: non_empty(settings.scheme).unwrap_or_else(|| DEFAULT_SCHEME.to_string()),
            authority: non_empty(settings.authority)
                .unwrap_or_else(|| DEFAULT_AUTHORITY.to_string()),
        }
    }
}

/// Merge layers in order; later layers take precedence.
pub fn merge_all(layers: &[Option<BridgeSettings>]) -> Option<BridgeSettings> {
    layers.iter().cloned().reduce(merge_settings).flatten()
}

/// Merge two layers, preferring values from `primary` over `fallback`.
pub fn merge_settings(
    fallback: Option<BridgeSettings>,
    primary: Option<BridgeSettings>,
) -> Option<BridgeSettings> {
    match (fallback, primary) {
        (None, None) => None,
        (Some(settings), None) | (None, Some(settings)) => Some(settings),
        (Some(fallback), Some(primary)) => Some(BridgeSettings {
            // An empty command does not override a configured one.
            remote_server: primary
                .remote_server
                .filter(|r| !r.cmd.is_empty())
                .or(fallback.remote_server),
            scheme: primary.scheme.or(fallback.scheme),
            authority: primary.authority.or(fallback.authority),
        }),
    }
}
