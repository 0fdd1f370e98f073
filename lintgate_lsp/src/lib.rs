//! Lintgate Language Server Protocol implementation.
//!
//! Feeds editor document lifecycle events into the analysis coordinator
//! and publishes the resulting diagnostics.

use tower_lsp::{LspService, Server};

mod backend;
mod diagnostics;

pub use backend::Backend;

/// Run the LSP server over stdio.
pub async fn run_server() -> anyhow::Result<()> {
    let stdin = tokio::io::stdin();
    let stdout = tokio::io::stdout();

    let (service, socket) = LspService::new(Backend::new);
    Server::new(stdin, stdout, socket).serve(service).await;

    Ok(())
}
