//! Include graph (§4.7).
//!
//! Tracks `#include` edges between documents so go-to-definition can
//! widen its search to files reachable from the current one. Find-
//! references deliberately does NOT consult this graph (see `refs.rs`).

use std::collections::{HashMap, HashSet};
use tower_lsp::lsp_types::Url;

#[derive(Debug, Default)]
pub struct IncludeGraph {
    /// uri -> set of uris it includes.
    forward: HashMap<Url, HashSet<Url>>,
    /// uri -> set of uris that include it.
    reverse: HashMap<Url, HashSet<Url>>,
}

impl IncludeGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace `uri`'s outgoing edges with `includes` (resolved target
    /// URIs; unresolved directives never reach this graph).
    pub fn update(&mut self, uri: Url, includes: Vec<Url>) {
        self.remove(&uri);
        let mut set = HashSet::new();
        for target in includes {
            self.reverse.entry(target.clone()).or_default().insert(uri.clone());
            set.insert(target);
        }
        self.forward.insert(uri, set);
    }

    pub fn remove(&mut self, uri: &Url) {
        if let Some(targets) = self.forward.remove(uri) {
            for target in targets {
                if let Some(back) = self.reverse.get_mut(&target) {
                    back.remove(uri);
                }
            }
        }
        for back in self.reverse.values_mut() {
            back.remove(uri);
        }
    }

    pub fn direct_includes(&self, uri: &Url) -> Vec<Url> {
        self.forward
            .get(uri)
            .map(|s| s.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn includers(&self, uri: &Url) -> Vec<Url> {
        self.reverse
            .get(uri)
            .map(|s| s.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Every file transitively reachable from `uri` via `#include`,
    /// cycle-safe: a file already visited is never revisited or re-queued,
    /// and `uri` itself is never reported even if a cycle loops back to it.
    pub fn transitive_includes(&self, uri: &Url) -> Vec<Url> {
        let mut visited = HashSet::new();
        visited.insert(uri.clone());
        let mut stack = self.direct_includes(uri);
        let mut out = Vec::new();

        while let Some(next) = stack.pop() {
            if !visited.insert(next.clone()) {
                tracing::warn!("include cycle detected: {} is reachable more than once from {}", next, uri);
                continue;
            }
            out.push(next.clone());
            for child in self.direct_includes(&next) {
                if !visited.contains(&child) {
                    stack.push(child);
                }
            }
        }

        out
    }

    /// Whether the subgraph reachable from `uri` contains a cycle back to
    /// `uri` itself, via depth-first gray/black coloring.
    pub fn has_cycle(&self, uri: &Url) -> bool {
        let mut colors: HashMap<Url, ColorMarker> = HashMap::new();
        self.dfs_cycle(uri, &mut colors)
    }

    fn dfs_cycle(&self, node: &Url, colors: &mut HashMap<Url, ColorMarker>) -> bool {
        colors.insert(node.clone(), ColorMarker::Gray);
        for child in self.direct_includes(node) {
            match colors.get(&child) {
                Some(ColorMarker::Gray) => return true,
                Some(ColorMarker::Black) => continue,
                None => {
                    if self.dfs_cycle(&child, colors) {
                        return true;
                    }
                }
            }
        }
        colors.insert(node.clone(), ColorMarker::Black);
        false
    }
}

#[derive(PartialEq)]
enum ColorMarker {
    Gray,
    Black,
}
