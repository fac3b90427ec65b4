//! Identifier reference scanning and workspace-wide reference tracking
//! (§4.4, §4.6).
//!
//! Reference scanning reuses [`crate::scanner::scan_line`] so that an
//! identifier mentioned inside a string or comment is never reported as a
//! reference — the same rule that keeps it out of the symbol parser.
//!
//! Find-references is deliberately workspace-wide rather than scoped by
//! the include graph (§7 rationale: VBScript has no module boundaries, so
//! restricting by include reachability would hide legitimate call sites in
//! files that happen not to be reached from the current include root).

use std::collections::HashMap;
use tower_lsp::lsp_types::Url;

use crate::casefold::casefold;
use crate::index::SymbolIndex;
use crate::position::{Position, Range};
use crate::scanner::scan_line;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    pub uri: Url,
    pub range: Range,
    /// Original-case identifier text as written at this occurrence.
    pub name: String,
    /// True when this occurrence is the symbol's own declaration site.
    pub is_definition: bool,
    /// Enclosing class name, carried over from the matching IndexedSymbol
    /// when this occurrence is a declaration site; null otherwise.
    pub container_name: Option<String>,
}

/// Scan `text` for every occurrence of any name in `names` that appears in
/// live code (not string/comment), case-insensitively.
pub fn scan_references(text: &str, uri: &Url, names: &[String]) -> Vec<Reference> {
    if names.is_empty() {
        return Vec::new();
    }
    let folded: Vec<String> = names.iter().map(|n| casefold(n)).collect();

    let mut out = Vec::new();
    for (line_idx, line) in text.lines().enumerate() {
        let tokens = scan_line(line);
        for tok in &tokens {
            let tok_folded = casefold(&tok.text);
            if folded.iter().any(|n| *n == tok_folded) {
                let line_no = line_idx as u32;
                out.push(Reference {
                    uri: uri.clone(),
                    range: Range::new(
                        Position::new(line_no, tok.start_col),
                        Position::new(line_no, tok.end_col),
                    ),
                    name: tok.text.clone(),
                    is_definition: false,
                    container_name: None,
                });
            }
        }
    }
    out
}

/// Workspace-wide reference store, keyed by document and by casefolded name.
#[derive(Debug, Default)]
pub struct ReferenceTracker {
    by_uri: HashMap<Url, Vec<Reference>>,
    by_name: HashMap<String, Vec<Url>>,
}

impl ReferenceTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace all references previously recorded for `uri`. `names` is
    /// the full set of known symbol names in the workspace at the time of
    /// the scan — a document only needs rescanning against the names that
    /// exist, not every identifier ever typed.
    pub fn update(&mut self, uri: Url, text: &str, names: &[String], index: &SymbolIndex) {
        self.remove(&uri);
        let mut refs = scan_references(text, &uri, names);

        for r in refs.iter_mut() {
            if let Some(sym) = index.symbol_at_selection(&uri, r.range) {
                r.is_definition = true;
                r.container_name = sym.container_name.clone();
            }
        }

        let mut touched_names = std::collections::HashSet::new();
        for r in &refs {
            touched_names.insert(casefold(&r.name));
        }
        for name in touched_names {
            self.by_name.entry(name).or_default().push(uri.clone());
        }

        self.by_uri.insert(uri, refs);
    }

    pub fn remove(&mut self, uri: &Url) {
        self.by_uri.remove(uri);
        for uris in self.by_name.values_mut() {
            uris.retain(|u| u != uri);
        }
    }

    /// All references to `name` across the workspace, optionally including
    /// the declaration site itself.
    pub fn find_references(&self, name: &str, include_declaration: bool) -> Vec<Reference> {
        let folded = casefold(name);
        let mut out = Vec::new();
        if let Some(uris) = self.by_name.get(&folded) {
            let mut seen = std::collections::HashSet::new();
            for uri in uris {
                if !seen.insert(uri.clone()) {
                    continue;
                }
                if let Some(refs) = self.by_uri.get(uri) {
                    for r in refs {
                        if casefold(&r.name) != folded {
                            continue;
                        }
                        if r.is_definition && !include_declaration {
                            continue;
                        }
                        out.push(r.clone());
                    }
                }
            }
        }
        out
    }
}
