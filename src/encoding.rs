//! File decoding with a configurable fallback encoding (§6).
//!
//! Classic ASP/VBScript source predates UTF-8 tooling: a workspace may be
//! authored entirely in a legacy codepage (Shift_JIS/CP932 for Japanese
//! deployments, Windows-1252 elsewhere). The server always tries UTF-8
//! first — detecting a BOM if present — and only falls back to the
//! configured encoding when the bytes aren't valid UTF-8. If even that
//! fails, the bytes are decoded lossily rather than rejected outright, so
//! a single bad file never takes down the workspace scan.

use encoding_rs::Encoding as EncodingRs;
use std::fs;
use std::io;
use std::path::Path;
use tracing::{debug, warn};

#[derive(Debug, Clone)]
pub struct DecodedFile {
    pub text: String,
    pub encoding_used: &'static str,
    pub had_errors: bool,
}

/// Read `path` from disk and decode it. `configured`, if given, is tried
/// first (an `encoding_rs` label such as `"windows-1252"` or `"shift_jis"`);
/// UTF-8 with lossy replacement is the fallback either way.
pub fn read_file(path: &Path, configured: Option<&'static EncodingRs>) -> io::Result<DecodedFile> {
    let bytes = fs::read(path)?;
    Ok(decode(&bytes, configured, path))
}

/// Decode raw bytes, given a path used only for log messages.
///
/// With no configured encoding, UTF-8 is tried first and lossy replacement
/// is the fallback on failure. With a configured encoding, that encoding is
/// tried first; UTF-8 with lossy replacement is the fallback if it produces
/// decoding errors (§6: "if provided, it is tried first and UTF-8 with
/// replacement is the fallback").
pub fn decode(bytes: &[u8], configured: Option<&'static EncodingRs>, path: &Path) -> DecodedFile {
    if let Some(stripped) = bytes.strip_prefix(&[0xEF, 0xBB, 0xBF]) {
        debug!("{} has a UTF-8 BOM", path.display());
        return match std::str::from_utf8(stripped) {
            Ok(text) => DecodedFile { text: text.to_string(), encoding_used: "UTF-8", had_errors: false },
            Err(_) => {
                warn!("{} has a UTF-8 BOM but invalid UTF-8 content; replacing invalid sequences", path.display());
                DecodedFile {
                    text: String::from_utf8_lossy(stripped).into_owned(),
                    encoding_used: "UTF-8",
                    had_errors: true,
                }
            }
        };
    }

    match configured {
        Some(encoding) => {
            let (decoded, _, had_errors) = encoding.decode(bytes);
            if had_errors {
                warn!(
                    "{} had decoding errors under configured encoding {}; falling back to UTF-8 with replacement",
                    path.display(),
                    encoding.name()
                );
                DecodedFile {
                    text: String::from_utf8_lossy(bytes).into_owned(),
                    encoding_used: "UTF-8",
                    had_errors: true,
                }
            } else {
                DecodedFile {
                    text: decoded.into_owned(),
                    encoding_used: encoding.name(),
                    had_errors: false,
                }
            }
        }
        None => match std::str::from_utf8(bytes) {
            Ok(text) => DecodedFile {
                text: text.to_string(),
                encoding_used: "UTF-8",
                had_errors: false,
            },
            Err(_) => {
                warn!("{} is not valid UTF-8; replacing invalid sequences", path.display());
                DecodedFile {
                    text: String::from_utf8_lossy(bytes).into_owned(),
                    encoding_used: "UTF-8",
                    had_errors: true,
                }
            }
        },
    }
}

/// Resolve a user-facing encoding name (as passed on `--encoding`) to an
/// `encoding_rs` label. Falls back to Windows-1252 for an unrecognized
/// name, matching the CLI's documented default.
pub fn resolve_encoding(name: &str) -> &'static EncodingRs {
    EncodingRs::for_label(name.as_bytes()).unwrap_or(encoding_rs::WINDOWS_1252)
}
