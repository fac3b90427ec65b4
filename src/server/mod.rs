//! The LSP server shell (§4.9).
//!
//! All shared state lives in one [`Workspace`], guarded by a single
//! `tokio::sync::Mutex`. The underlying `tower-lsp`/`tokio` runtime is
//! inherently multi-threaded, but nothing in this crate's design calls
//! for concurrent writers — serializing every handler on one lock gives
//! the same effective single-writer semantics as a hand-rolled dispatcher
//! thread, without fighting the framework.

mod document;

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;

use tokio::sync::Mutex;
use tower_lsp::jsonrpc::Result as LspResult;
use tower_lsp::lsp_types::*;
use tower_lsp::{Client, LanguageServer};

use crate::encoding;
use crate::graph::IncludeGraph;
use crate::include;
use crate::index::{IndexedSymbol, SymbolIndex};
use crate::parser::{self, ParsedSymbol};
use crate::refs::ReferenceTracker;
use crate::workspace as workspace_scan;

use document::word_at_position;

/// All mutable server state. One instance, one lock.
pub struct Workspace {
    root: Option<PathBuf>,
    configured_encoding: Option<&'static encoding_rs::Encoding>,
    index: SymbolIndex,
    tracker: ReferenceTracker,
    graph: IncludeGraph,
    /// URIs discovered by the initial `scan_workspace` pass. A document in
    /// this set stays indexed across `did_close` (§3: "scanned documents
    /// stay indexed for cross-file queries"); anything else is evicted.
    scanned: HashSet<Url>,
}

impl Workspace {
    pub fn new(root: Option<PathBuf>, configured_encoding: Option<&'static encoding_rs::Encoding>) -> Self {
        Self {
            root,
            configured_encoding,
            index: SymbolIndex::new(),
            tracker: ReferenceTracker::new(),
            graph: IncludeGraph::new(),
            scanned: HashSet::new(),
        }
    }

    /// Set the workspace root from the LSP `initialize` params, but only if
    /// `--workspace-root` wasn't already given on the command line (§6: the
    /// CLI flag is optional and defaults to the LSP `rootUri`).
    pub fn set_root_if_unset(&mut self, root: PathBuf) {
        if self.root.is_none() {
            self.root = Some(root);
        }
    }

    /// Parse `text` into its top-level symbols, splitting ASP pages into
    /// server-script fragments first (§4.1) and parsing plain `.vbs`/`.inc`
    /// files as one fragment.
    fn parse_document(uri: &Url, text: &str) -> Vec<ParsedSymbol> {
        if is_asp(uri) {
            crate::asp::extract_blocks(text)
                .into_iter()
                .filter(|b| b.kind != crate::asp::BlockKind::OutputExpression)
                .flat_map(|block| {
                    parser::parse_fragment(&block.content)
                        .into_iter()
                        .map(move |s| s.offset_by(block.start))
                })
                .collect()
        } else {
            parser::parse_fragment(text)
        }
    }

    /// Re-parse and re-index one document. Does not rescan other
    /// documents' references against this document's (possibly new)
    /// symbol names — that only happens during the initial workspace scan.
    pub fn reindex_document(&mut self, uri: Url, text: String) {
        let symbols = Self::parse_document(&uri, &text);
        self.index.update(uri.clone(), &symbols, text.clone());

        let names = self.index.all_names();
        self.tracker.update(uri.clone(), &text, &names, &self.index);

        if let Ok(source_path) = uri.to_file_path() {
            let directives = include::find_includes(&text, &source_path, self.root.as_deref());
            let targets: Vec<Url> = directives
                .iter()
                .filter_map(|d| d.resolved.as_ref())
                .filter_map(|p| Url::from_file_path(p).ok())
                .collect();
            self.graph.update(uri, targets.clone());

            for target in targets {
                self.ensure_loaded(&target);
            }
        }
    }

    /// Load and index `uri` on demand if it hasn't been read yet and lies
    /// inside the workspace root (§3 Lifecycle: "when an unopened target
    /// URI is referenced by an edge and lies inside the workspace root,
    /// the server reads and indexes it once"). A no-op for a document
    /// that's already indexed, which also makes it safe to call from
    /// within an include cycle: the second visit to any node sees its
    /// content already present and returns immediately.
    fn ensure_loaded(&mut self, uri: &Url) {
        if self.index.get_document_content(uri).is_some() {
            return;
        }
        let Some(root) = self.root.clone() else {
            return;
        };
        let Ok(path) = uri.to_file_path() else {
            return;
        };
        if !path.starts_with(&root) {
            return;
        }

        match encoding::read_file(&path, self.configured_encoding) {
            Ok(decoded) => {
                tracing::debug!("lazily loading include target {}", uri);
                // Treated the same as a scan-discovered document: it's
                // reachable via another file's include edge, so closing it
                // (if the editor happens to open it directly later) must
                // not drop it out from under that includer.
                self.scanned.insert(uri.clone());
                self.reindex_document(uri.clone(), decoded.text);
            }
            Err(err) => {
                tracing::warn!("failed to lazily load include target {}: {}", path.display(), err);
            }
        }
    }

    /// Remove a closed document from every index, unless it was discovered
    /// by the initial workspace scan (§3 Lifecycle).
    pub fn close_document(&mut self, uri: &Url) {
        if self.scanned.contains(uri) {
            return;
        }
        self.index.remove(uri);
        self.tracker.remove(uri);
        self.graph.remove(uri);
    }

    /// Synchronous startup scan: read and parse every source file under
    /// `root` before the dispatcher starts serving requests (§4.8, §5).
    pub fn scan_workspace(&mut self) {
        let Some(root) = self.root.clone() else {
            return;
        };

        let mut texts: HashMap<Url, String> = HashMap::new();
        for path in workspace_scan::scan(&root) {
            let uri = match Url::from_file_path(&path) {
                Ok(u) => u,
                Err(_) => continue,
            };
            match encoding::read_file(&path, self.configured_encoding) {
                Ok(decoded) => {
                    let symbols = Self::parse_document(&uri, &decoded.text);
                    self.index.update(uri.clone(), &symbols, decoded.text.clone());
                    self.scanned.insert(uri.clone());
                    texts.insert(uri, decoded.text);
                }
                Err(err) => {
                    tracing::warn!("failed to read {}: {}", path.display(), err);
                }
            }
        }

        let names = self.index.all_names();
        for (uri, text) in &texts {
            self.tracker.update(uri.clone(), text, &names, &self.index);

            if let Ok(source_path) = uri.to_file_path() {
                let directives = include::find_includes(text, &source_path, Some(root.as_path()));
                let targets: Vec<Url> = directives
                    .iter()
                    .filter_map(|d| d.resolved.as_ref())
                    .filter_map(|p| Url::from_file_path(p).ok())
                    .collect();
                self.graph.update(uri.clone(), targets);
            }
        }

        tracing::info!("workspace scan complete: {} documents indexed", texts.len());
    }

    /// Go-to-definition search order (§4.7): first the origin document,
    /// then `transitive_includes(origin)`; if neither has a match, the
    /// result is empty — there is no workspace-wide fallback.
    fn definitions_in_scope(&self, from_uri: &Url, name: &str) -> Vec<&IndexedSymbol> {
        let all = self.index.find_definitions(name);

        let in_origin: Vec<&IndexedSymbol> = all.iter().copied().filter(|s| &s.uri == from_uri).collect();
        if !in_origin.is_empty() {
            return in_origin;
        }

        let reachable: HashSet<Url> = self.graph.transitive_includes(from_uri).into_iter().collect();
        all.into_iter().filter(|s| reachable.contains(&s.uri)).collect()
    }
}

fn is_asp(uri: &Url) -> bool {
    uri.path().to_ascii_lowercase().ends_with(".asp")
}

fn lsp_range(r: crate::position::Range) -> Range {
    r.to_lsp()
}

#[allow(deprecated)]
fn to_document_symbol(sym: &IndexedSymbol, children: Vec<DocumentSymbol>) -> DocumentSymbol {
    DocumentSymbol {
        name: sym.name.clone(),
        detail: None,
        kind: sym.kind.to_lsp(),
        tags: None,
        deprecated: None,
        range: lsp_range(sym.range),
        selection_range: lsp_range(sym.selection_range),
        children: if children.is_empty() { None } else { Some(children) },
    }
}

/// Build a nested `DocumentSymbol` tree from the index's flat list for one
/// document. Nesting is exactly one level deep: a `Class`'s members are
/// attached as its children, everything else is top-level (§4.3, §4.5).
fn build_document_symbols(symbols: &[IndexedSymbol]) -> Vec<DocumentSymbol> {
    symbols
        .iter()
        .filter(|s| s.container_name.is_none())
        .map(|parent| {
            let children: Vec<DocumentSymbol> = symbols
                .iter()
                .filter(|s| s.container_name.as_deref() == Some(parent.name.as_str()))
                .map(|child| to_document_symbol(child, Vec::new()))
                .collect();
            to_document_symbol(parent, children)
        })
        .collect()
}

/// Run `f`, catching a panic so a bug in the analysis layer never takes
/// down the transport (§7 "Internal exception in a handler"). Logs ERROR
/// and yields `None` on panic; the caller maps that to the handler's
/// documented empty response.
fn guarded<T>(label: &str, f: impl FnOnce() -> T) -> Option<T> {
    match std::panic::catch_unwind(std::panic::AssertUnwindSafe(f)) {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::error!("internal error in {} handler; returning empty result", label);
            None
        }
    }
}

pub struct VbsLanguageServer {
    client: Client,
    workspace: Mutex<Workspace>,
}

impl VbsLanguageServer {
    pub fn new(client: Client, root: Option<PathBuf>, configured_encoding: Option<&'static encoding_rs::Encoding>) -> Self {
        Self {
            client,
            workspace: Mutex::new(Workspace::new(root, configured_encoding)),
        }
    }
}

#[tower_lsp::async_trait]
impl LanguageServer for VbsLanguageServer {
    #[allow(deprecated)]
    async fn initialize(&self, params: InitializeParams) -> LspResult<InitializeResult> {
        tracing::info!("initializing VBScript/ASP language server");

        // §6: "--workspace-root is optional; defaults to the LSP rootUri."
        // root_path is the deprecated pre-3.x fallback some older clients
        // still send instead of root_uri.
        let root_from_params = params
            .root_uri
            .as_ref()
            .and_then(|u| u.to_file_path().ok())
            .or_else(|| params.root_path.as_ref().map(PathBuf::from));

        {
            let mut ws = self.workspace.lock().await;
            if let Some(root) = root_from_params {
                ws.set_root_if_unset(root);
            }
            ws.scan_workspace();
        }

        Ok(InitializeResult {
            capabilities: ServerCapabilities {
                text_document_sync: Some(TextDocumentSyncCapability::Kind(TextDocumentSyncKind::FULL)),
                document_symbol_provider: Some(OneOf::Left(true)),
                definition_provider: Some(OneOf::Left(true)),
                references_provider: Some(OneOf::Left(true)),
                ..Default::default()
            },
            server_info: Some(ServerInfo {
                name: "vbs-lsp".to_string(),
                version: Some(env!("CARGO_PKG_VERSION").to_string()),
            }),
        })
    }

    async fn initialized(&self, _params: InitializedParams) {
        self.client
            .log_message(MessageType::INFO, "VBScript/ASP language server ready")
            .await;
    }

    async fn shutdown(&self) -> LspResult<()> {
        tracing::info!("shutting down");
        Ok(())
    }

    async fn did_open(&self, params: DidOpenTextDocumentParams) {
        let uri = params.text_document.uri;
        let text = params.text_document.text;
        let mut ws = self.workspace.lock().await;
        ws.reindex_document(uri, text);
    }

    async fn did_change(&self, params: DidChangeTextDocumentParams) {
        let uri = params.text_document.uri;
        // Full sync: the last content_changes entry carries the whole document.
        let Some(change) = params.content_changes.into_iter().last() else {
            return;
        };
        let mut ws = self.workspace.lock().await;
        ws.reindex_document(uri, change.text);
    }

    async fn did_close(&self, params: DidCloseTextDocumentParams) {
        let uri = params.text_document.uri;
        // A document the initial scan already found stays indexed: it's
        // still a file on disk, reachable by other files' include
        // directives. Anything else was only ever known because it was
        // open, and is evicted now that it's closed.
        tracing::debug!("document closed: {}", uri);
        let mut ws = self.workspace.lock().await;
        ws.close_document(&uri);
    }

    async fn document_symbol(
        &self,
        params: DocumentSymbolParams,
    ) -> LspResult<Option<DocumentSymbolResponse>> {
        let ws = self.workspace.lock().await;
        let result = guarded("document_symbol", || {
            let symbols = ws.index.get_symbols_in_document(&params.text_document.uri);
            if symbols.is_empty() {
                None
            } else {
                Some(DocumentSymbolResponse::Nested(build_document_symbols(symbols)))
            }
        });
        Ok(result.flatten())
    }

    async fn goto_definition(
        &self,
        params: GotoDefinitionParams,
    ) -> LspResult<Option<GotoDefinitionResponse>> {
        let uri = params.text_document_position_params.text_document.uri;
        let position = params.text_document_position_params.position;

        let ws = self.workspace.lock().await;
        let Some(text) = ws.index.get_document_content(&uri) else {
            return Ok(None);
        };
        let Some(word) = word_at_position(text, position) else {
            return Ok(None);
        };

        let locations = guarded("goto_definition", || {
            ws.definitions_in_scope(&uri, &word)
                .into_iter()
                .map(|s| Location {
                    uri: s.uri.clone(),
                    range: lsp_range(s.selection_range),
                })
                .collect::<Vec<_>>()
        })
        .unwrap_or_default();

        if locations.is_empty() {
            Ok(None)
        } else {
            Ok(Some(GotoDefinitionResponse::Array(locations)))
        }
    }

    async fn references(&self, params: ReferenceParams) -> LspResult<Option<Vec<Location>>> {
        let uri = params.text_document_position.text_document.uri;
        let position = params.text_document_position.position;
        let include_declaration = params.context.include_declaration;

        let ws = self.workspace.lock().await;
        let Some(text) = ws.index.get_document_content(&uri) else {
            return Ok(None);
        };
        let Some(word) = word_at_position(text, position) else {
            return Ok(None);
        };

        // An internal error here still answers with an empty array rather
        // than null, matching the list-response half of §7's taxonomy.
        let locations = guarded("references", || {
            ws.tracker
                .find_references(&word, include_declaration)
                .into_iter()
                .map(|r| Location { uri: r.uri, range: r.range.to_lsp() })
                .collect::<Vec<_>>()
        })
        .unwrap_or_default();

        Ok(Some(locations))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::SymbolKind;
    use crate::position::Position as CratePosition;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn test_reindex_document_populates_index() {
        let mut ws = Workspace::new(None, Some(encoding_rs::WINDOWS_1252));
        let text = "Function AddNumbers(a, b)\n  AddNumbers = a + b\nEnd Function\n".to_string();
        ws.reindex_document(url("file:///a.vbs"), text);

        let found = ws.index.find_definitions("addnumbers");
        assert_eq!(found.len(), 1);
    }

    #[test]
    fn test_definitions_in_scope_does_not_fall_back_workspace_wide() {
        let mut ws = Workspace::new(None, None);
        ws.reindex_document(
            url("file:///a.vbs"),
            "Function Helper()\nEnd Function\n".to_string(),
        );
        ws.reindex_document(url("file:///b.vbs"), "Helper()\n".to_string());

        // b.vbs never includes a.vbs, so a definition that only exists in
        // a.vbs must not be visible from b.vbs (§4.7: no workspace-wide
        // fallback).
        assert!(ws.definitions_in_scope(&url("file:///b.vbs"), "helper").is_empty());
    }

    #[test]
    fn test_definitions_in_scope_follows_transitive_includes() {
        let mut ws = Workspace::new(None, None);
        ws.reindex_document(
            url("file:///lib.inc"),
            "Function Helper()\nEnd Function\n".to_string(),
        );
        ws.graph.update(url("file:///a.asp"), vec![url("file:///lib.inc")]);

        let found = ws.definitions_in_scope(&url("file:///a.asp"), "helper");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].uri, url("file:///lib.inc"));
    }

    #[test]
    fn test_close_document_keeps_scanned_document_indexed() {
        let mut ws = Workspace::new(None, None);
        let uri = url("file:///scanned.vbs");
        ws.reindex_document(uri.clone(), "Function F()\nEnd Function\n".to_string());
        ws.scanned.insert(uri.clone());

        ws.close_document(&uri);
        assert!(!ws.index.find_definitions("f").is_empty());
    }

    #[test]
    fn test_close_document_evicts_unscanned_document() {
        let mut ws = Workspace::new(None, None);
        let uri = url("file:///standalone.vbs");
        ws.reindex_document(uri.clone(), "Function F()\nEnd Function\n".to_string());

        ws.close_document(&uri);
        assert!(ws.index.find_definitions("f").is_empty());
    }

    #[test]
    fn test_asp_fragment_offsets_into_file_coordinates() {
        let mut ws = Workspace::new(None, Some(encoding_rs::WINDOWS_1252));
        let text = "<html>\n<% Function Greet()\nEnd Function %>\n</html>".to_string();
        ws.reindex_document(url("file:///page.asp"), text);

        let found = ws.index.find_definitions("greet");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].range.start, CratePosition::new(1, 2));
    }

    #[test]
    fn test_build_document_symbols_nests_class_members() {
        let symbols = vec![
            IndexedSymbol {
                uri: url("file:///a.vbs"),
                name: "Calculator".to_string(),
                kind: SymbolKind::Class,
                range: crate::position::Range::default(),
                selection_range: crate::position::Range::default(),
                container_name: None,
            },
            IndexedSymbol {
                uri: url("file:///a.vbs"),
                name: "Add".to_string(),
                kind: SymbolKind::Function,
                range: crate::position::Range::default(),
                selection_range: crate::position::Range::default(),
                container_name: Some("Calculator".to_string()),
            },
        ];
        let tree = build_document_symbols(&symbols);
        assert_eq!(tree.len(), 1);
        assert_eq!(tree[0].children.as_ref().unwrap().len(), 1);
    }
}
