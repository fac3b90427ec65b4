//! Tolerant VBScript symbol parser.
//!
//! Extracts hierarchical symbols (Function, Sub, Class, Property Get/Let/Set)
//! from VBScript source. Deliberately line-oriented and case-insensitive
//! (§4.3): a missing terminator never aborts the parse, it just leaves the
//! enclosing range open until EOF.
//!
//! The parser works in the *fragment's own* coordinate system — line 0 is
//! the fragment's first line. Callers (the ASP extractor, or the top-level
//! `parse_document` for a whole `.vbs`/`.inc` file) apply the fragment's
//! starting position afterwards via [`crate::position::Range::offset_by`],
//! so all offset arithmetic lives in one place (§9).

use crate::position::{Position, Range};
use crate::scanner::scan_line;

/// The closed set of symbol kinds this server produces. `Sub` has no
/// distinct LSP kind and is reported as `Function`; `Constant` and
/// `Variable` are reserved for a future phase and never produced here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SymbolKind {
    Function,
    Class,
    Property,
    File,
}

impl SymbolKind {
    pub fn to_lsp(self) -> tower_lsp::lsp_types::SymbolKind {
        use tower_lsp::lsp_types::SymbolKind as Lsp;
        match self {
            SymbolKind::Function => Lsp::FUNCTION,
            SymbolKind::Class => Lsp::CLASS,
            SymbolKind::Property => Lsp::PROPERTY,
            SymbolKind::File => Lsp::FILE,
        }
    }
}

/// A symbol extracted by the parser. Only `Class` carries children —
/// Function/Sub/Property are leaves for symbol purposes, their bodies are
/// skipped without deeper structure (§4.3 nesting rule).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedSymbol {
    /// Original-case name as written in source.
    pub name: String,
    pub kind: SymbolKind,
    /// Full declaration range, through its terminator (or EOF).
    pub range: Range,
    /// Range of just the name token.
    pub selection_range: Range,
    pub children: Vec<ParsedSymbol>,
}

impl ParsedSymbol {
    /// Apply a fragment's starting position to this symbol and all its
    /// descendants (§4.1: "every downstream symbol ... position ... is
    /// offset by the fragment's start").
    pub fn offset_by(&self, origin: Position) -> ParsedSymbol {
        ParsedSymbol {
            name: self.name.clone(),
            kind: self.kind,
            range: self.range.offset_by(origin),
            selection_range: self.selection_range.offset_by(origin),
            children: self.children.iter().map(|c| c.offset_by(origin)).collect(),
        }
    }

    /// Flatten this symbol and its descendants, pairing each with its
    /// enclosing class name (if any). Used by the index to build flat
    /// `IndexedSymbol` records from a parsed tree (§4.5).
    pub fn flatten(&self, container: Option<&str>) -> Vec<(ParsedSymbol, Option<String>)> {
        let mut out = vec![(self.clone_leaf(), container.map(|s| s.to_string()))];
        if self.kind == SymbolKind::Class {
            for child in &self.children {
                out.extend(child.flatten(Some(&self.name)));
            }
        }
        out
    }

    fn clone_leaf(&self) -> ParsedSymbol {
        ParsedSymbol {
            name: self.name.clone(),
            kind: self.kind,
            range: self.range,
            selection_range: self.selection_range,
            children: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Family {
    Function,
    Sub,
    Class,
    Property,
}

struct Frame {
    name: String,
    kind: SymbolKind,
    family: Family,
    start: Position,
    selection_range: Range,
    children: Vec<ParsedSymbol>,
}

/// Parse one fragment of VBScript text (fragment-local coordinates, line 0
/// = first line of the fragment) into its top-level `ParsedSymbol`s.
pub fn parse_fragment(text: &str) -> Vec<ParsedSymbol> {
    let mut root: Vec<ParsedSymbol> = Vec::new();
    let mut stack: Vec<Frame> = Vec::new();

    for (line_idx, raw_line) in text.lines().enumerate() {
        let line_no = line_idx as u32;
        let tokens = scan_line(raw_line);
        if tokens.is_empty() {
            continue;
        }

        if let Some((family, name_tok, kind)) = match_opener(&tokens) {
            let pos = Position::new(line_no, name_tok.start_col);
            let end_pos = Position::new(line_no, name_tok.end_col);
            stack.push(Frame {
                name: name_tok.text.clone(),
                kind,
                family,
                start: Position::new(line_no, 0),
                selection_range: Range::new(pos, end_pos),
                children: Vec::new(),
            });
            continue;
        }

        if let Some(family) = match_terminator(&tokens) {
            if let Some(idx) = stack.iter().rposition(|f| f.family == family) {
                let closing_end = Position::new(line_no, raw_line.chars().count() as u32);
                // Close every frame above (and including) idx, innermost first.
                while stack.len() > idx {
                    let frame = stack.pop().unwrap();
                    let symbol = ParsedSymbol {
                        name: frame.name,
                        kind: frame.kind,
                        range: Range::new(frame.start, closing_end),
                        selection_range: frame.selection_range,
                        children: frame.children,
                    };
                    attach(&mut stack, &mut root, symbol);
                }
            }
        }
    }

    // Unclosed openers extend to EOF, one line past the last line seen.
    let eof = Position::new(text.lines().count() as u32, 0);
    while let Some(frame) = stack.pop() {
        let symbol = ParsedSymbol {
            name: frame.name,
            kind: frame.kind,
            range: Range::new(frame.start, eof),
            selection_range: frame.selection_range,
            children: frame.children,
        };
        attach(&mut stack, &mut root, symbol);
    }

    root
}

/// Attach a just-closed symbol to its parent: only a `Class` frame acts as
/// a container (§4.3 nesting rule); anything else — including a Function,
/// Sub, or Property frame still open above it — means the symbol belongs
/// to the file, not that leaf.
fn attach(stack: &mut [Frame], root: &mut Vec<ParsedSymbol>, symbol: ParsedSymbol) {
    if let Some(parent) = stack.last_mut() {
        if parent.kind == SymbolKind::Class {
            parent.children.push(symbol);
            return;
        }
    }
    root.push(symbol);
}

fn is_kw(tok: &crate::scanner::Token, kw: &str) -> bool {
    tok.text.eq_ignore_ascii_case(kw)
}

fn match_opener(
    tokens: &[crate::scanner::Token],
) -> Option<(Family, &crate::scanner::Token, SymbolKind)> {
    let mut idx = 0usize;
    if tokens.get(idx).map_or(false, |t| is_kw(t, "Public") || is_kw(t, "Private")) {
        idx += 1;
    }

    let keyword = tokens.get(idx)?;
    if is_kw(keyword, "Function") {
        let name = tokens.get(idx + 1)?;
        Some((Family::Function, name, SymbolKind::Function))
    } else if is_kw(keyword, "Sub") {
        let name = tokens.get(idx + 1)?;
        Some((Family::Sub, name, SymbolKind::Function))
    } else if is_kw(keyword, "Class") {
        let name = tokens.get(idx + 1)?;
        Some((Family::Class, name, SymbolKind::Class))
    } else if is_kw(keyword, "Property") {
        let accessor = tokens.get(idx + 1)?;
        if is_kw(accessor, "Get") || is_kw(accessor, "Let") || is_kw(accessor, "Set") {
            let name = tokens.get(idx + 2)?;
            Some((Family::Property, name, SymbolKind::Property))
        } else {
            None
        }
    } else {
        None
    }
}

fn match_terminator(tokens: &[crate::scanner::Token]) -> Option<Family> {
    let first = tokens.first()?;
    if !is_kw(first, "End") {
        return None;
    }
    let second = tokens.get(1)?;
    if is_kw(second, "Function") {
        Some(Family::Function)
    } else if is_kw(second, "Sub") {
        Some(Family::Sub)
    } else if is_kw(second, "Class") {
        Some(Family::Class)
    } else if is_kw(second, "Property") {
        Some(Family::Property)
    } else {
        None
    }
}
