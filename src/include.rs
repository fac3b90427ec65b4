//! Classic ASP `#include` directive parsing and path resolution (§4.2).
//!
//! `<!--#include file="..."-->` resolves relative to the including file's
//! own directory; `<!--#include virtual="..."-->` resolves relative to
//! the workspace root. Directives are found with a regex rather than the
//! shared scanner — SSI comments have no VBScript string/comment meaning,
//! they're plain HTML-level syntax.

use once_cell::sync::Lazy;
use regex::Regex;
use std::path::{Path, PathBuf};

use crate::position::{offset_to_position, Position};

static INCLUDE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)<!--\s*#include\s+(file|virtual)\s*=\s*(?:"([^"]*)"|'([^']*)')\s*-->"#).unwrap()
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IncludeMode {
    /// `file="..."` — resolved relative to the including file's directory.
    File,
    /// `virtual="..."` — resolved relative to the workspace root.
    Virtual,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncludeDirective {
    pub mode: IncludeMode,
    /// The raw path text as written in the directive.
    pub raw_path: String,
    /// Position of the directive itself, for diagnostics and go-to-definition.
    pub position: Position,
    /// The resolved absolute path, if resolution was possible.
    pub resolved: Option<PathBuf>,
}

impl IncludeDirective {
    pub fn is_valid(&self) -> bool {
        self.resolved.is_some()
    }

    pub fn error_message(&self) -> Option<String> {
        if self.resolved.is_some() {
            return None;
        }
        match self.mode {
            IncludeMode::Virtual => Some(format!(
                "cannot resolve virtual include \"{}\": no workspace root configured",
                self.raw_path
            )),
            IncludeMode::File => Some(format!(
                "cannot resolve file include \"{}\"",
                self.raw_path
            )),
        }
    }
}

/// Scan `text` (the full contents of one source file) for `#include`
/// directives, resolving each against `source_path`'s directory (for
/// `file=`) or `workspace_root` (for `virtual=`).
pub fn find_includes(
    text: &str,
    source_path: &Path,
    workspace_root: Option<&Path>,
) -> Vec<IncludeDirective> {
    let source_dir = source_path.parent();

    INCLUDE_RE
        .captures_iter(text)
        .map(|caps| {
            let whole = caps.get(0).unwrap();
            let mode = if caps[1].eq_ignore_ascii_case("file") {
                IncludeMode::File
            } else {
                IncludeMode::Virtual
            };
            let raw_path = caps
                .get(2)
                .or_else(|| caps.get(3))
                .map(|m| m.as_str())
                .unwrap_or("")
                .to_string();
            let position = offset_to_position(text, whole.start());

            let resolved = resolve(mode, &raw_path, source_dir, workspace_root);

            IncludeDirective {
                mode,
                raw_path,
                position,
                resolved,
            }
        })
        .collect()
}

fn resolve(
    mode: IncludeMode,
    raw_path: &str,
    source_dir: Option<&Path>,
    workspace_root: Option<&Path>,
) -> Option<PathBuf> {
    let normalized = raw_path.replace('\\', "/");
    match mode {
        IncludeMode::File => {
            let dir = source_dir?;
            Some(normalize(&dir.join(normalized)))
        }
        IncludeMode::Virtual => {
            let root = workspace_root?;
            let trimmed = normalized.trim_start_matches('/');
            Some(normalize(&root.join(trimmed)))
        }
    }
}

/// Collapse `.`/`..` components lexically, without touching the
/// filesystem (the target file may not exist yet during editing).
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        use std::path::Component;
        match component {
            Component::ParentDir => {
                out.pop();
            }
            Component::CurDir => {}
            other => out.push(other.as_os_str()),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_include_resolves_relative_to_source_dir() {
        let text = r#"<!--#include file="lib.inc"-->"#;
        let source = Path::new("/ws/pages/index.asp");
        let includes = find_includes(text, source, None);
        assert_eq!(includes.len(), 1);
        assert_eq!(includes[0].mode, IncludeMode::File);
        assert_eq!(
            includes[0].resolved,
            Some(PathBuf::from("/ws/pages/lib.inc"))
        );
        assert!(includes[0].is_valid());
    }

    #[test]
    fn test_virtual_include_resolves_relative_to_workspace_root() {
        let text = r#"<!--#include virtual="/shared/lib.inc"-->"#;
        let source = Path::new("/ws/pages/index.asp");
        let includes = find_includes(text, source, Some(Path::new("/ws")));
        assert_eq!(includes[0].mode, IncludeMode::Virtual);
        assert_eq!(
            includes[0].resolved,
            Some(PathBuf::from("/ws/shared/lib.inc"))
        );
    }

    #[test]
    fn test_virtual_include_without_workspace_root_is_invalid() {
        let text = r#"<!--#include virtual="/shared/lib.inc"-->"#;
        let source = Path::new("/ws/pages/index.asp");
        let includes = find_includes(text, source, None);
        assert!(!includes[0].is_valid());
        assert!(includes[0].error_message().is_some());
    }

    #[test]
    fn test_case_insensitive_directive() {
        let text = r#"<!--#INCLUDE FILE="lib.inc"-->"#;
        let source = Path::new("/ws/index.asp");
        let includes = find_includes(text, source, None);
        assert_eq!(includes.len(), 1);
    }

    #[test]
    fn test_multiple_directives() {
        let text = "<!--#include file=\"a.inc\"-->\n<!--#include file=\"b.inc\"-->";
        let source = Path::new("/ws/index.asp");
        let includes = find_includes(text, source, None);
        assert_eq!(includes.len(), 2);
        assert_eq!(includes[1].position.line, 1);
    }

    #[test]
    fn test_single_quoted_directive() {
        let text = "<!--#include file='lib.inc'-->";
        let source = Path::new("/ws/index.asp");
        let includes = find_includes(text, source, None);
        assert_eq!(includes.len(), 1);
        assert_eq!(includes[0].raw_path, "lib.inc");
        assert_eq!(includes[0].resolved, Some(PathBuf::from("/ws/lib.inc")));
    }

    #[test]
    fn test_parent_dir_traversal_normalized() {
        let text = r#"<!--#include file="../shared/lib.inc"-->"#;
        let source = Path::new("/ws/pages/sub/index.asp");
        let includes = find_includes(text, source, None);
        assert_eq!(
            includes[0].resolved,
            Some(PathBuf::from("/ws/pages/shared/lib.inc"))
        );
    }
}
