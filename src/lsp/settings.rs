use crate::config::{
    BridgeSettings, CONFIG_FILE_NAME, ResolvedSettings, load_user_config, merge_all,
};
use serde_json::Value;
use std::fs;
use std::path::Path;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SettingsEventKind {
    Info,
    Warning,
}

/// Something worth telling the user about while settings were loaded.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SettingsEvent {
    pub kind: SettingsEventKind,
    pub message: String,
}

impl SettingsEvent {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            kind: SettingsEventKind::Info,
            message: message.into(),
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            kind: SettingsEventKind::Warning,
            message: message.into(),
        }
    }
}

#[derive(Debug, Default)]
pub struct SettingsLoadOutcome {
    pub settings: ResolvedSettings,
    pub events: Vec<SettingsEvent>,
}

/// Load and merge every settings layer.
///
/// Precedence, lowest first: programmed defaults, user config, project config
/// (`<root>/repolink.toml`), initialization options. A layer that fails to
/// load is skipped with a warning event; loading itself never fails.
pub fn load_settings(
    root_path: Option<&Path>,
    initialization_options: Option<Value>,
) -> SettingsLoadOutcome {
    let mut events = Vec::new();

    let defaults = Some(BridgeSettings::defaults());
    let user_config = load_user_config_with_events(&mut events);
    let project_config = load_project_config(root_path, &mut events);
    let editor_options = initialization_options
        .filter(|value| !value.is_null())
        .and_then(|value| parse_initialization_options(value, &mut events));

    let settings = merge_all(&[defaults, user_config, project_config, editor_options])
        .map(ResolvedSettings::from)
        .unwrap_or_default();

    if settings.remote_server.is_none() {
        events.push(SettingsEvent::warning(
            "No remoteServer.cmd configured; go-to-definition is unavailable",
        ));
    }

    SettingsLoadOutcome { settings, events }
}

fn load_user_config_with_events(events: &mut Vec<SettingsEvent>) -> Option<BridgeSettings> {
    match load_user_config() {
        Ok(Some(settings)) => {
            events.push(SettingsEvent::info("Loaded user config"));
            Some(settings)
        }
        Ok(None) => None,
        Err(err) => {
            events.push(SettingsEvent::warning(format!(
                "Failed to load user config: {}",
                err
            )));
            None
        }
    }
}

fn load_project_config(
    root_path: Option<&Path>,
    events: &mut Vec<SettingsEvent>,
) -> Option<BridgeSettings> {
    let config_path = root_path?.join(CONFIG_FILE_NAME);
    if !config_path.exists() {
        return None;
    }

    events.push(SettingsEvent::info(format!(
        "Found config file: {}",
        config_path.display()
    )));

    let contents = match fs::read_to_string(&config_path) {
        Ok(contents) => contents,
        Err(err) => {
            events.push(SettingsEvent::warning(format!(
                "Failed to read {}: {}",
                CONFIG_FILE_NAME, err
            )));
            return None;
        }
    };

    match toml::from_str::<BridgeSettings>(&contents) {
        Ok(settings) => Some(settings),
        Err(err) => {
            events.push(SettingsEvent::warning(format!(
                "Failed to parse {}: {}",
                CONFIG_FILE_NAME, err
            )));
            None
        }
    }
}

fn parse_initialization_options(
    value: Value,
    events: &mut Vec<SettingsEvent>,
) -> Option<BridgeSettings> {
    match serde_json::from_value::<BridgeSettings>(value) {
        Ok(settings) => Some(settings),
        Err(err) => {
            events.push(SettingsEvent::warning(format!(
                "Failed to parse initialization options: {}",
                err
            )));
            None
        }
    }
}
