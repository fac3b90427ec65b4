//! Shared comment/string-aware tokenizer.
//!
//! The VBScript parser, the identifier/reference scanner, and (indirectly)
//! the include-directive matcher all need to know whether a given span of
//! text is live code, inside a string literal, or inside a comment. Rather
//! than re-implement that state machine three times, it lives here once
//! (§9 design note: "A single, well-tested scanner state is worth
//! duplicating conceptually but implementing once").
//!
//! VBScript string literals and line comments never span a line, so the
//! state machine is reset at the start of every line — a line-oriented
//! parser can call [`scan_line`] independently for each line without
//! carrying state across the newline boundary.

/// A maximal identifier token found in CODE state on one line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub text: String,
    /// Start column (0-indexed, in chars) within the line.
    pub start_col: u32,
    /// End column (exclusive).
    pub end_col: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Code,
    InString,
    InComment,
}

/// Extract every maximal `[A-Za-z_][A-Za-z0-9_]*` run that appears in CODE
/// state on `line`, skipping anything inside a `"…"` string literal or
/// after a `'` line comment or a statement-leading `REM` token.
pub fn scan_line(line: &str) -> Vec<Token> {
    let chars: Vec<char> = line.chars().collect();
    let mut tokens = Vec::new();
    let mut state = State::Code;
    let mut statement_start = true;
    let mut i = 0usize;

    while i < chars.len() {
        match state {
            State::InComment => break,
            State::InString => {
                if chars[i] == '"' {
                    state = State::Code;
                }
                i += 1;
            }
            State::Code => {
                let c = chars[i];
                if c == '\'' {
                    state = State::InComment;
                    i += 1;
                } else if c == '"' {
                    state = State::InString;
                    i += 1;
                } else if c == ':' {
                    statement_start = true;
                    i += 1;
                } else if c == '_' || c.is_alphabetic() {
                    let start = i;
                    while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_') {
                        i += 1;
                    }
                    let text: String = chars[start..i].iter().collect();

                    if statement_start && text.eq_ignore_ascii_case("REM") {
                        state = State::InComment;
                    } else {
                        tokens.push(Token {
                            text,
                            start_col: start as u32,
                            end_col: i as u32,
                        });
                        statement_start = false;
                    }
                } else {
                    if !c.is_whitespace() {
                        statement_start = false;
                    }
                    i += 1;
                }
            }
        }
    }

    tokens
}

/// Whether the identifier token `name` occurs verbatim (case-insensitively)
/// as one of the tokens on `line`, and if so its column range.
pub fn find_token<'a>(tokens: &'a [Token], name: &str) -> Option<&'a Token> {
    tokens
        .iter()
        .find(|t| t.text.eq_ignore_ascii_case(name))
}
