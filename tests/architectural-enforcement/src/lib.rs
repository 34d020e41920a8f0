//! Architectural Enforcement Integration Tests
//!
//! Source scanners shared by the tests in `tests/`. They walk the
//! production sources of the workspace crates and report lines that break
//! the async rules:
//! - No blocking sleeps; waiting happens on timers or I/O
//! - No blocking HTTP client and no nested runtimes
//! - No blocking file, network, or stdout I/O inside async functions
//!
//! Test code (`#[cfg(test)]` modules and test-only files) is skipped.

use std::fs;
use std::path::{Path, PathBuf};

/// Crate source trees checked by the enforcement tests, relative to the
/// workspace root
pub const PRODUCTION_DIRS: &[&str] = &["analysis/core/src", "analysis/cli/src"];

/// Files that are compiled only for tests
const TEST_ONLY_FILES: &[&str] = &["test_utils.rs"];

/// Workspace root, derived from this crate's manifest directory
#[must_use]
pub fn workspace_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("../..")
}

/// One line of production code
#[derive(Clone, Debug)]
pub struct CodeLine {
    /// 1-based line number
    pub number: usize,
    /// Line text with any `//` comment removed
    pub code: String,
    /// Whether the line sits inside an `async fn`
    pub in_async_fn: bool,
}

/// A scanned source file
#[derive(Clone, Debug)]
pub struct SourceFile {
    /// Path on disk
    pub path: PathBuf,
    /// Production lines, test modules removed
    pub lines: Vec<CodeLine>,
}

impl SourceFile {
    /// Parse `content` read from `path`
    #[must_use]
    pub fn parse(path: PathBuf, content: &str) -> Self {
        Self {
            path,
            lines: production_lines(content),
        }
    }

    /// File name, for policies scoped to one module
    #[must_use]
    pub fn file_name(&self) -> &str {
        self.path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default()
    }
}

/// A rule violation
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Violation {
    /// File
    pub path: PathBuf,
    /// 1-based line number
    pub line: usize,
    /// What was found
    pub reason: String,
}

impl std::fmt::Display for Violation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{} - {}", self.path.display(), self.line, self.reason)
    }
}

/// Load every production `.rs` file under `dir`
#[must_use]
pub fn load_sources(dir: &Path) -> Vec<SourceFile> {
    walkdir::WalkDir::new(dir)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.path().extension().and_then(|s| s.to_str()) == Some("rs"))
        .filter(|e| {
            let name = e.file_name().to_string_lossy();
            !TEST_ONLY_FILES.contains(&name.as_ref())
        })
        .filter_map(|e| {
            let content = fs::read_to_string(e.path()).ok()?;
            Some(SourceFile::parse(e.path().to_path_buf(), &content))
        })
        .collect()
}

/// Load production sources of every crate in [`PRODUCTION_DIRS`]
///
/// # Panics
///
/// If a listed directory is missing, so a moved crate cannot silently
/// escape the checks.
#[must_use]
pub fn workspace_sources() -> Vec<SourceFile> {
    let root = workspace_root();
    PRODUCTION_DIRS
        .iter()
        .flat_map(|dir| {
            let path = root.join(dir);
            assert!(path.is_dir(), "missing source directory {}", path.display());
            load_sources(&path)
        })
        .collect()
}

/// Every line of `files` whose code matches `pattern`
pub fn find<F>(files: &[SourceFile], reason: &str, mut matches: F) -> Vec<Violation>
where
    F: FnMut(&SourceFile, &CodeLine) -> bool,
{
    files
        .iter()
        .flat_map(|file| {
            file.lines
                .iter()
                .filter(|line| matches(file, line))
                .map(|line| Violation {
                    path: file.path.clone(),
                    line: line.number,
                    reason: format!("{reason}: {}", line.code.trim()),
                })
                .collect::<Vec<_>>()
        })
        .collect()
}

/// Strip comments and `#[cfg(test)]` items, tracking async context
fn production_lines(content: &str) -> Vec<CodeLine> {
    let mut lines = Vec::new();
    let mut pending_test_item = false;
    let mut test_depth: Option<i64> = None;
    let mut in_async_fn = false;

    for (idx, raw) in content.lines().enumerate() {
        let code = raw.split("//").next().unwrap_or(raw);
        let trimmed = code.trim();

        if let Some(depth) = test_depth.as_mut() {
            *depth += brace_delta(code);
            if *depth <= 0 {
                test_depth = None;
            }
            continue;
        }

        if trimmed.starts_with("#[cfg(test)]") {
            pending_test_item = true;
            continue;
        }

        if pending_test_item {
            if trimmed.starts_with("#[") || trimmed.is_empty() {
                continue;
            }
            pending_test_item = false;
            if code.contains('{') {
                let depth = brace_delta(code);
                if depth > 0 {
                    test_depth = Some(depth);
                }
            }
            // `mod x;` or a single-line item
            continue;
        }

        if is_fn_signature(trimmed) {
            in_async_fn = trimmed.contains("async fn ");
        }

        lines.push(CodeLine {
            number: idx + 1,
            code: code.to_string(),
            in_async_fn,
        });
    }

    lines
}

fn is_fn_signature(trimmed: &str) -> bool {
    trimmed.starts_with("fn ")
        || trimmed.contains(" fn ")
        || trimmed.starts_with("async fn ")
}

fn brace_delta(code: &str) -> i64 {
    code.chars().fold(0, |acc, c| match c {
        '{' => acc + 1,
        '}' => acc - 1,
        _ => acc,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(content: &str) -> SourceFile {
        SourceFile::parse(PathBuf::from("sample.rs"), content)
    }

    #[test]
    fn test_cfg_test_module_is_skipped() {
        let file = parse(
            "fn a() {}\n\
             #[cfg(test)]\n\
             mod tests {\n\
                 fn b() { std::thread::sleep(d); }\n\
             }\n\
             fn c() {}\n",
        );
        let numbers: Vec<usize> = file.lines.iter().map(|l| l.number).collect();
        assert_eq!(numbers, [1, 6]);
    }

    #[test]
    fn test_cfg_test_declaration_is_skipped() {
        let file = parse("#[cfg(test)]\npub mod test_utils;\npub mod session;\n");
        assert_eq!(file.lines.len(), 1);
        assert_eq!(file.lines[0].code, "pub mod session;");
    }

    #[test]
    fn test_comments_are_stripped() {
        let file = parse("let x = 1; // reqwest::blocking is forbidden\n/// std::thread::sleep\n");
        assert_eq!(file.lines[0].code, "let x = 1; ");
        assert_eq!(file.lines[1].code, "");
    }

    #[test]
    fn test_async_context_tracking() {
        let file = parse(
            "pub async fn run() {\n\
                 work();\n\
             }\n\
             fn load() {\n\
                 read();\n\
             }\n",
        );
        let flags: Vec<bool> = file.lines.iter().map(|l| l.in_async_fn).collect();
        assert_eq!(flags, [true, true, true, false, false, false]);
    }

    #[test]
    fn test_find_reports_location() {
        let files = vec![parse("fn a() {\n    std::thread::sleep(d);\n}\n")];
        let found = find(&files, "Blocking sleep", |_, line| {
            line.code.contains("std::thread::sleep")
        });
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].line, 2);
        assert!(found[0].to_string().starts_with("sample.rs:2 - Blocking sleep"));
    }
}
