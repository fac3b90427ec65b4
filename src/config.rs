//! Command-line configuration (§6).

use clap::Parser;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "vbs-lsp", about = "Language Server Protocol implementation for VBScript and Classic ASP")]
pub struct Cli {
    /// Root directory of the workspace to index at startup.
    #[arg(long)]
    pub workspace_root: Option<PathBuf>,

    /// Encoding to try first for files that aren't valid UTF-8 (e.g.
    /// "windows-1252", "shift_jis"). Unset means UTF-8 only, with lossy
    /// replacement as the fallback.
    #[arg(long)]
    pub encoding: Option<String>,

    /// Accepted for editor compatibility; this server only ever communicates over stdio.
    #[arg(long)]
    pub stdio: bool,

    /// Increase log verbosity (stderr only; stdout carries the LSP protocol stream).
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    /// Validate `workspace_root`, if given, actually names a directory.
    pub fn validate(&self) -> anyhow::Result<()> {
        if let Some(root) = &self.workspace_root {
            if !root.is_dir() {
                anyhow::bail!("workspace root {} is not a directory", root.display());
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_encoding_is_unset() {
        let cli = Cli::parse_from(["vbs-lsp", "--stdio"]);
        assert_eq!(cli.encoding, None);
        assert!(cli.stdio);
        assert!(cli.workspace_root.is_none());
    }

    #[test]
    fn test_explicit_encoding_is_some() {
        let cli = Cli::parse_from(["vbs-lsp", "--encoding", "shift_jis"]);
        assert_eq!(cli.encoding.as_deref(), Some("shift_jis"));
    }

    #[test]
    fn test_validate_rejects_missing_root() {
        let cli = Cli::parse_from(["vbs-lsp", "--workspace-root", "/nonexistent/path/xyz"]);
        assert!(cli.validate().is_err());
    }

    #[test]
    fn test_validate_accepts_existing_dir() {
        let cli = Cli::parse_from(["vbs-lsp", "--workspace-root", "."]);
        assert!(cli.validate().is_ok());
    }
}
