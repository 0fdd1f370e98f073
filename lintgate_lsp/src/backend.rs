//! LSP backend: document lifecycle handlers and diagnostic publishing.

use std::path::PathBuf;
use std::sync::{Arc, OnceLock};

use tower_lsp::jsonrpc::Result;
use tower_lsp::lsp_types::*;
use tower_lsp::{Client, LanguageServer};

use lintgate::config::LintgateConfig;
use lintgate::coordinator::AnalysisCoordinator;
use lintgate::exec::ProcessEngineRunner;
use lintgate::notify::{Notice, Notifier};

use crate::diagnostics;

/// Lintgate LSP backend state.
pub struct Backend {
    /// LSP client for publishing diagnostics and showing messages.
    client: Client,
    /// Built in `initialize` once the client's options are known.
    coordinator: OnceLock<Arc<AnalysisCoordinator>>,
}

/// Surfaces coordinator notices as editor error messages.
struct ClientNotifier {
    client: Client,
}

impl Notifier for ClientNotifier {
    fn error(&self, notice: Notice) {
        let client = self.client.clone();
        tokio::spawn(async move {
            let mut message = format!("{}\n{}", notice.title, notice.detail);
            if let Some(url) = notice.remediation {
                message.push_str(&format!("\nInstall guide: {url}"));
            }
            client.show_message(MessageType::ERROR, message).await;
        });
    }
}

impl Backend {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            coordinator: OnceLock::new(),
        }
    }

    fn coordinator(&self) -> Option<&Arc<AnalysisCoordinator>> {
        self.coordinator.get()
    }

    /// Kick off an analysis cycle for a saved (or opened) file.
    ///
    /// Runs on its own task so a burst of save notifications coalesces in
    /// the coordinator no matter how the server schedules the handlers.
    fn schedule_analysis(&self, path: PathBuf) {
        let Some(coordinator) = self.coordinator().cloned() else {
            return;
        };
        let client = self.client.clone();

        tokio::spawn(async move {
            // None: a newer save supersedes this one; its cycle publishes.
            let Some(diagnostics) = coordinator.handle_trigger(Some(&path)).await else {
                return;
            };
            let project = coordinator.project_for(&path);

            let mut by_file = diagnostics::group_by_file(diagnostics);

            // Open project files get their fresh list, or an empty one to
            // clear stale diagnostics from the previous cycle.
            for open_path in coordinator.open_paths_in(&project) {
                let diags = by_file.remove(&open_path).unwrap_or_default();
                if let Ok(uri) = Url::from_file_path(&open_path) {
                    client.publish_diagnostics(uri, diags, None).await;
                }
            }

            // Whole-workspace mode may report unopened files as well.
            for (file, diags) in by_file {
                if let Ok(uri) = Url::from_file_path(&file) {
                    client.publish_diagnostics(uri, diags, None).await;
                }
            }
        });
    }
}

#[tower_lsp::async_trait]
impl LanguageServer for Backend {
    async fn initialize(&self, params: InitializeParams) -> Result<InitializeResult> {
        let config = params
            .initialization_options
            .and_then(|options| match serde_json::from_value::<LintgateConfig>(options) {
                Ok(config) => Some(config),
                Err(e) => {
                    tracing::warn!("invalid initialization options: {e}");
                    None
                }
            })
            .unwrap_or_default();
        tracing::info!(
            "engine: {}, scope: {:?}",
            config.engine_path.display(),
            config.scope
        );

        let coordinator = Arc::new(AnalysisCoordinator::new(
            config,
            Arc::new(ProcessEngineRunner::new()),
            Arc::new(ClientNotifier {
                client: self.client.clone(),
            }),
        ));
        let _ = self.coordinator.set(coordinator);

        Ok(InitializeResult {
            server_info: Some(ServerInfo {
                name: "lintgate-lsp".to_string(),
                version: Some(env!("CARGO_PKG_VERSION").to_string()),
            }),
            capabilities: ServerCapabilities {
                text_document_sync: Some(TextDocumentSyncCapability::Options(
                    TextDocumentSyncOptions {
                        open_close: Some(true),
                        change: Some(TextDocumentSyncKind::FULL),
                        save: Some(TextDocumentSyncSaveOptions::SaveOptions(SaveOptions {
                            include_text: Some(true),
                        })),
                        ..Default::default()
                    },
                )),
                ..Default::default()
            },
        })
    }

    async fn initialized(&self, _: InitializedParams) {
        tracing::info!("lintgate-lsp server initialized");
        self.client
            .log_message(MessageType::INFO, "lintgate-lsp ready")
            .await;
    }

    async fn shutdown(&self) -> Result<()> {
        tracing::info!("lintgate-lsp server shutting down");
        Ok(())
    }

    async fn did_open(&self, params: DidOpenTextDocumentParams) {
        let uri = params.text_document.uri;
        tracing::debug!("did_open: {}", uri);

        let Ok(path) = uri.to_file_path() else {
            // Untitled buffers have no path the engine could analyze.
            return;
        };
        if let Some(coordinator) = self.coordinator() {
            coordinator.open_file(&path, params.text_document.text);
        }
        self.schedule_analysis(path);
    }

    async fn did_change(&self, params: DidChangeTextDocumentParams) {
        let Ok(path) = params.text_document.uri.to_file_path() else {
            return;
        };

        // With FULL sync the entire content arrives in the first change.
        // Analysis waits for the save.
        if let Some(change) = params.content_changes.into_iter().next()
            && let Some(coordinator) = self.coordinator()
        {
            coordinator.update_file(&path, change.text);
        }
    }

    async fn did_save(&self, params: DidSaveTextDocumentParams) {
        let uri = params.text_document.uri;
        tracing::debug!("did_save: {}", uri);

        let Ok(path) = uri.to_file_path() else {
            return;
        };
        if let Some(text) = params.text
            && let Some(coordinator) = self.coordinator()
        {
            coordinator.update_file(&path, text);
        }
        self.schedule_analysis(path);
    }

    async fn did_close(&self, params: DidCloseTextDocumentParams) {
        let uri = params.text_document.uri;
        tracing::debug!("did_close: {}", uri);

        if let Ok(path) = uri.to_file_path()
            && let Some(coordinator) = self.coordinator()
        {
            coordinator.close_file(&path);
        }

        // Clear any diagnostics still shown for the closed file.
        self.client.publish_diagnostics(uri, vec![], None).await;
    }

    async fn did_rename_files(&self, params: RenameFilesParams) {
        let Some(coordinator) = self.coordinator() else {
            return;
        };
        for rename in params.files {
            let old = Url::parse(&rename.old_uri)
                .ok()
                .and_then(|uri| uri.to_file_path().ok());
            let new = Url::parse(&rename.new_uri)
                .ok()
                .and_then(|uri| uri.to_file_path().ok());
            if let (Some(old), Some(new)) = (old, new) {
                tracing::debug!("renamed: {} -> {}", old.display(), new.display());
                coordinator.rename_file(&old, &new);
            }
        }
    }
}
