//! LSP front end: serves `textDocument/definition` for repository documents.

mod lsp_impl;
pub mod settings;

pub use lsp_impl::RepolinkServer;
pub use settings::{SettingsEvent, SettingsEventKind, SettingsLoadOutcome, load_settings};
