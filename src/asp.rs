//! Classic ASP script-block extraction (§4.1).
//!
//! Classic ASP pages interleave VBScript with literal HTML. Before the
//! VBScript parser can run, the server-side script fragments need to be
//! lifted out: `<% ... %>`, `<%= ... %>` (an output expression, never
//! parsed as a symbol container), and `<script language="VBScript"
//! runat="server"> ... </script>` blocks.
//!
//! Every block records its start offset in the *original* file so a
//! caller can convert fragment-local positions back to file positions via
//! [`crate::position::Position::offset_by`] — this module only finds
//! fragments and their origins, it never parses VBScript itself.

use crate::position::{offset_to_position, Position};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockKind {
    /// `<% ... %>` — ordinary server code, parsed for symbols.
    Code,
    /// `<%= ... %>` — an output expression. VBScript doesn't allow symbol
    /// declarations here; the content is never passed to the parser.
    OutputExpression,
    /// `<script language="VBScript" runat="server"> ... </script>`.
    ServerScript,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptBlock {
    pub kind: BlockKind,
    /// Script text, fragment-local (does not include the delimiters).
    pub content: String,
    /// Where `content` begins in the original file.
    pub start: Position,
}

/// Extract every server-side script fragment from an ASP page's raw text.
/// Tolerant: an unterminated `<%` or `<script runat="server">` block runs
/// to end of file rather than being dropped (§4.1 edge case).
pub fn extract_blocks(text: &str) -> Vec<ScriptBlock> {
    let mut blocks = Vec::new();
    let mut pos = 0usize;

    while let Some(open_rel) = find_next_open(&text[pos..]) {
        let (open_abs, kind, delim_len) = open_rel;
        let open_abs = pos + open_abs;
        let content_start = open_abs + delim_len;

        let (content_end, next_pos) = match kind {
            BlockKind::Code | BlockKind::OutputExpression => {
                match text[content_start..].find("%>") {
                    Some(rel) => (content_start + rel, content_start + rel + 2),
                    None => (text.len(), text.len()),
                }
            }
            BlockKind::ServerScript => match find_case_insensitive(&text[content_start..], "</script>") {
                Some(rel) => (content_start + rel, content_start + rel + "</script>".len()),
                None => (text.len(), text.len()),
            },
        };

        let content = text[content_start..content_end].to_string();
        let start = offset_to_position(text, content_start);
        blocks.push(ScriptBlock { kind, content, start });

        pos = next_pos;
        if pos >= text.len() {
            break;
        }
    }

    blocks
}

/// Find the next opening delimiter in `text`, returning its offset
/// (relative to `text`), kind, and delimiter length. Picks whichever of
/// `<%`/`<%=` or a server-runat `<script>` tag occurs first.
fn find_next_open(text: &str) -> Option<(usize, BlockKind, usize)> {
    let percent = text.find("<%");
    let script = find_server_script_open(text);

    match (percent, script) {
        (Some(p), Some((s, s_len))) => {
            if p <= s {
                Some(percent_open(text, p))
            } else {
                Some((s, BlockKind::ServerScript, s_len))
            }
        }
        (Some(p), None) => Some(percent_open(text, p)),
        (None, Some((s, s_len))) => Some((s, BlockKind::ServerScript, s_len)),
        (None, None) => None,
    }
}

fn percent_open(text: &str, p: usize) -> (usize, BlockKind, usize) {
    if text[p..].starts_with("<%=") {
        (p, BlockKind::OutputExpression, 3)
    } else {
        (p, BlockKind::Code, 2)
    }
}

/// Find the earliest `<script ...>` tag whose attributes include
/// `runat="server"` (case-insensitive, quote-style tolerant), returning
/// its start offset and the length through the tag's closing `>`.
fn find_server_script_open(text: &str) -> Option<(usize, usize)> {
    let lower = text.to_ascii_lowercase();
    let mut search_from = 0usize;

    while let Some(rel) = lower[search_from..].find("<script") {
        let tag_start = search_from + rel;
        let tag_end = lower[tag_start..].find('>').map(|e| tag_start + e + 1)?;
        let tag_text = &lower[tag_start..tag_end];
        if tag_text.contains("runat=\"server\"") || tag_text.contains("runat='server'") || tag_text.contains("runat=server") {
            return Some((tag_start, tag_end - tag_start));
        }
        search_from = tag_end;
    }

    None
}

fn find_case_insensitive(haystack: &str, needle: &str) -> Option<usize> {
    let lower_hay = haystack.to_ascii_lowercase();
    let lower_needle = needle.to_ascii_lowercase();
    lower_hay.find(&lower_needle)
}
