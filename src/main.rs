//! VBScript/Classic ASP Language Server - Main Entry Point

use clap::Parser;
use tower_lsp::{LspService, Server};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use vbs_lsp::config::Cli;
use vbs_lsp::encoding::resolve_encoding;
use vbs_lsp::server::VbsLanguageServer;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    cli.validate()?;

    // Initialize logging - MUST write to stderr, not stdout!
    // LSP uses stdout for JSON-RPC communication.
    let default_filter = if cli.verbose { "vbs_lsp=debug" } else { "vbs_lsp=info" };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| default_filter.into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    tracing::info!("Starting VBScript/ASP Language Server...");

    let configured_encoding = cli.encoding.as_deref().map(resolve_encoding);

    let stdin = tokio::io::stdin();
    let stdout = tokio::io::stdout();

    // Canonicalize so later comparisons against file:// URIs (themselves
    // always absolute) and Url::from_file_path on scanned entries behave
    // consistently regardless of whether --workspace-root was passed as
    // a relative path.
    let workspace_root = cli
        .workspace_root
        .as_ref()
        .map(|root| std::fs::canonicalize(root).unwrap_or_else(|_| root.clone()));
    let (service, socket) =
        LspService::new(move |client| VbsLanguageServer::new(client, workspace_root, configured_encoding));

    Server::new(stdin, stdout, socket).serve(service).await;

    Ok(())
}
