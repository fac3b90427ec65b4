//! Document text helpers.
//!
//! `textDocumentSync` is advertised as `Full` (§4.9): the server always
//! receives the complete document text on every change, so there's no
//! incremental rope to maintain — plain line-indexed string helpers are
//! enough.

use tower_lsp::lsp_types::Position;

/// The identifier under the cursor, if any, using the same
/// alphanumeric-or-underscore word definition as the scanner's tokens.
pub fn word_at_position(text: &str, position: Position) -> Option<String> {
    let line = text.lines().nth(position.line as usize)?;
    let chars: Vec<char> = line.chars().collect();
    let idx = (position.character as usize).min(chars.len());

    let is_word_char = |c: char| c.is_alphanumeric() || c == '_';

    // If the cursor sits just past a word (the common case when the
    // editor requests definition for the word it's over), look one
    // character back before giving up.
    let anchor = if idx < chars.len() && is_word_char(chars[idx]) {
        idx
    } else if idx > 0 && is_word_char(chars[idx - 1]) {
        idx - 1
    } else {
        return None;
    };

    let start = chars[..anchor]
        .iter()
        .rposition(|c| !is_word_char(*c))
        .map(|i| i + 1)
        .unwrap_or(0);
    let end = chars[anchor..]
        .iter()
        .position(|c| !is_word_char(*c))
        .map(|i| anchor + i)
        .unwrap_or(chars.len());

    if start < end {
        Some(chars[start..end].iter().collect())
    } else {
        None
    }
}
