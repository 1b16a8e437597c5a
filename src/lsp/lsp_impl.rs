use std::path::PathBuf;
use std::sync::Arc;

use arc_swap::{ArcSwap, ArcSwapOption};
use tokio_util::sync::CancellationToken;
use tower_lsp_server::jsonrpc::{Error, ErrorCode, Result};
use tower_lsp_server::ls_types::*;
use tower_lsp_server::{Client, LanguageServer};
use url::Url;

use super::settings::{SettingsEvent, SettingsEventKind, load_settings};
use crate::address::RepoUriScheme;
use crate::config::ResolvedSettings;
use crate::definition::DefinitionBridge;
use crate::error::BridgeError;
use crate::remote::RpcChannel;

type Bridge = DefinitionBridge<RpcChannel, RepoUriScheme>;

pub struct RepolinkServer {
    client: Client,
    settings: ArcSwap<ResolvedSettings>,
    /// Published once the remote service is connected.
    bridge: ArcSwapOption<Bridge>,
    /// Parent of every request's cancellation token.
    shutdown: CancellationToken,
}

impl std::fmt::Debug for RepolinkServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RepolinkServer")
            .field("client", &self.client)
            .field("settings", &self.settings.load())
            .field("connected", &self.bridge.load().is_some())
            .finish_non_exhaustive()
    }
}

impl RepolinkServer {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            settings: ArcSwap::from_pointee(ResolvedSettings::default()),
            bridge: ArcSwapOption::empty(),
            shutdown: CancellationToken::new(),
        }
    }

    async fn relay_events(&self, events: &[SettingsEvent]) {
        for event in events {
            let message_type = match event.kind {
                SettingsEventKind::Info => {
                    log::info!(target: "repolink::settings", "{}", event.message);
                    MessageType::INFO
                }
                SettingsEventKind::Warning => {
                    log::warn!(target: "repolink::settings", "{}", event.message);
                    MessageType::WARNING
                }
            };
            self.client
                .log_message(message_type, event.message.clone())
                .await;
        }
    }

    async fn connect_remote(&self) {
        let settings = self.settings.load_full();
        let Some(remote_server) = &settings.remote_server else {
            return;
        };

        match RpcChannel::spawn(remote_server) {
            Ok(channel) => {
                let bridge = DefinitionBridge::new(Arc::new(channel), settings.file_system());
                self.bridge.store(Some(Arc::new(bridge)));
                self.client
                    .log_message(
                        MessageType::INFO,
                        format!("Connected to remote service: {}", remote_server.cmd.join(" ")),
                    )
                    .await;
            }
            Err(e) => {
                log::error!(target: "repolink::lsp", "{}", e);
                self.client
                    .log_message(MessageType::ERROR, e.to_string())
                    .await;
            }
        }
    }
}

/// Workspace root from the first workspace folder, else the root URI.
fn workspace_root(params: &InitializeParams) -> Option<PathBuf> {
    #[allow(deprecated)]
    let root_uri = params
        .workspace_folders
        .as_ref()
        .and_then(|folders| folders.first())
        .map(|folder| &folder.uri)
        .or(params.root_uri.as_ref())?;

    Url::parse(root_uri.as_str()).ok()?.to_file_path().ok()
}

fn request_cancelled() -> Error {
    Error {
        code: ErrorCode::RequestCancelled,
        message: "request cancelled".into(),
        data: None,
    }
}

impl LanguageServer for RepolinkServer {
    async fn initialize(&self, params: InitializeParams) -> Result<InitializeResult> {
        let root_path = workspace_root(&params);
        if let Some(root) = &root_path {
            log::info!(
                target: "repolink::lsp",
                "Using workspace root {}",
                root.display()
            );
        }

        let outcome = load_settings(root_path.as_deref(), params.initialization_options);
        self.relay_events(&outcome.events).await;
        self.settings.store(Arc::new(outcome.settings));

        Ok(InitializeResult {
            server_info: Some(ServerInfo {
                name: env!("CARGO_PKG_NAME").to_string(),
                version: Some(env!("CARGO_PKG_VERSION").to_string()),
            }),
            capabilities: ServerCapabilities {
                definition_provider: Some(OneOf::Left(true)),
                ..ServerCapabilities::default()
            },
            ..InitializeResult::default()
        })
    }

    async fn initialized(&self, _: InitializedParams) {
        self.connect_remote().await;
    }

    async fn shutdown(&self) -> Result<()> {
        self.shutdown.cancel();
        self.bridge.store(None);
        Ok(())
    }

    async fn goto_definition(
        &self,
        params: GotoDefinitionParams,
    ) -> Result<Option<GotoDefinitionResponse>> {
        let Some(bridge) = self.bridge.load_full() else {
            return Ok(None);
        };
        let TextDocumentPositionParams {
            text_document,
            position,
        } = params.text_document_position_params;

        // Fires on shutdown, or when the client cancels and this future is dropped.
        let cancel = self.shutdown.child_token();
        let _cancel_on_drop = cancel.clone().drop_guard();

        match bridge
            .provide_definition(&text_document.uri, position, &cancel)
            .await
        {
            Ok(Some(locations)) => Ok(Some(GotoDefinitionResponse::Array(locations))),
            Ok(None) => Ok(None),
            Err(BridgeError::Cancelled) => Err(request_cancelled()),
            Err(e) => Err(Error::invalid_params(e.to_string())),
        }
    }
}
