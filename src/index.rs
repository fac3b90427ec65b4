//! Workspace symbol index (§4.5).
//!
//! Deliberately flat: `by_uri` and `by_name` both map straight to
//! `IndexedSymbol` records, with no lexically-scoped symbol table. A
//! `Class`'s members carry their `container_name` for display purposes
//! only — lookup and go-to-definition never need to walk a scope tree.

use std::collections::HashMap;
use tower_lsp::lsp_types::Url;

use crate::casefold::casefold;
use crate::parser::{ParsedSymbol, SymbolKind};
use crate::position::Range;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexedSymbol {
    pub uri: Url,
    pub name: String,
    pub kind: SymbolKind,
    pub range: Range,
    pub selection_range: Range,
    /// Name of the enclosing `Class`, if any.
    pub container_name: Option<String>,
}

#[derive(Debug, Default)]
pub struct SymbolIndex {
    by_uri: HashMap<Url, Vec<IndexedSymbol>>,
    by_name: HashMap<String, Vec<IndexedSymbol>>,
    content: HashMap<Url, String>,
}

impl SymbolIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace everything indexed for `uri` with symbols parsed from
    /// `parsed` (the top-level `ParsedSymbol`s for the whole document,
    /// already offset into file coordinates), and cache `text` so
    /// `document_symbol` requests don't need to re-read the file.
    pub fn update(&mut self, uri: Url, parsed: &[ParsedSymbol], text: String) {
        self.remove(&uri);

        let mut flat = Vec::new();
        for symbol in parsed {
            for (leaf, container) in symbol.flatten(None) {
                flat.push(IndexedSymbol {
                    uri: uri.clone(),
                    name: leaf.name.clone(),
                    kind: leaf.kind,
                    range: leaf.range,
                    selection_range: leaf.selection_range,
                    container_name: container,
                });
            }
        }

        for sym in &flat {
            self.by_name
                .entry(casefold(&sym.name))
                .or_default()
                .push(sym.clone());
        }

        self.by_uri.insert(uri.clone(), flat);
        self.content.insert(uri, text);
    }

    pub fn remove(&mut self, uri: &Url) {
        if let Some(removed) = self.by_uri.remove(uri) {
            for sym in removed {
                if let Some(list) = self.by_name.get_mut(&casefold(&sym.name)) {
                    list.retain(|s| &s.uri != uri);
                }
            }
        }
        self.content.remove(uri);
    }

    pub fn find_definitions(&self, name: &str) -> Vec<&IndexedSymbol> {
        self.by_name
            .get(&casefold(name))
            .map(|v| v.iter().collect())
            .unwrap_or_default()
    }

    pub fn get_symbols_in_document(&self, uri: &Url) -> &[IndexedSymbol] {
        self.by_uri.get(uri).map(|v| v.as_slice()).unwrap_or(&[])
    }

    pub fn get_document_content(&self, uri: &Url) -> Option<&str> {
        self.content.get(uri).map(|s| s.as_str())
    }

    /// Every distinct symbol name currently indexed, for seeding the
    /// reference scanner's target set.
    pub fn all_names(&self) -> Vec<String> {
        self.by_uri
            .values()
            .flatten()
            .map(|s| s.name.clone())
            .collect()
    }

    /// Whether `range` in `uri` exactly matches some symbol's selection
    /// range — used to flag an occurrence as the declaration site.
    pub fn is_definition_site(&self, uri: &Url, range: Range) -> bool {
        self.symbol_at_selection(uri, range).is_some()
    }

    /// The symbol, if any, whose selection_range exactly matches `range` in
    /// `uri` — used to carry a definition occurrence's container_name onto
    /// its `Reference` record.
    pub fn symbol_at_selection(&self, uri: &Url, range: Range) -> Option<&IndexedSymbol> {
        self.by_uri
            .get(uri)?
            .iter()
            .find(|s| s.selection_range == range)
    }
}
