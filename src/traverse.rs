//! Schema file discovery.
//!
//! Walks the include graph rooted at an entry file: every schema file may
//! link further files through `@sdl(files: ["path", ...])` directives.
//! Discovery is a pure text scan rather than an AST parse — included
//! fragments need not be independently valid top-level documents, and a
//! broken file must never abort discovery of its siblings.

use std::collections::HashSet;
use std::path::{Component, Path, PathBuf};

use tracing::{debug, warn};

use crate::store::FileStore;

/// Discover every schema file reachable from `entry` via include directives.
///
/// Returns absolute paths in depth-first preorder, entry file first, each
/// exactly once. A visited set keyed by normalized path guarantees
/// termination under include cycles. Never fails: a missing entry file
/// yields an empty list, and any unreadable file is logged and contributes
/// no includes.
pub fn discover(store: &dyn FileStore, entry: &Path) -> Vec<PathBuf> {
    let mut out = Vec::new();
    let entry = normalize(entry);
    if !store.exists(&entry) {
        warn!(path = %entry.display(), "entry schema file not found");
        return out;
    }

    let mut visited: HashSet<PathBuf> = HashSet::new();
    let mut stack = vec![entry];

    while let Some(path) = stack.pop() {
        if !visited.insert(path.clone()) {
            continue;
        }
        out.push(path.clone());

        let text = match store.read_text(&path) {
            Ok(text) => text,
            Err(err) => {
                warn!(path = %path.display(), error = %err, "failed to read schema file");
                continue;
            }
        };

        let dir = path.parent().unwrap_or_else(|| Path::new("."));
        let mut found = Vec::new();
        for rel in include_paths(&text) {
            let resolved = resolve_include(dir, &rel);
            if visited.contains(&resolved) || found.contains(&resolved) {
                continue;
            }
            if store.exists(&resolved) {
                debug!(from = %path.display(), to = %resolved.display(), "include");
                found.push(resolved);
            } else {
                warn!(
                    from = %path.display(),
                    to = %resolved.display(),
                    "included schema file not found"
                );
            }
        }
        // Reverse so the first include in the file is popped first.
        for include in found.into_iter().rev() {
            stack.push(include);
        }
    }

    out
}

/// Resolve an include path against the directory of the including file.
fn resolve_include(dir: &Path, include: &str) -> PathBuf {
    let include = Path::new(include);
    if include.is_absolute() {
        normalize(include)
    } else {
        normalize(&dir.join(include))
    }
}

/// Lexically normalize a path: drop `.` components, fold `..` into the
/// parent where possible. Keeps dedup stable across spellings like
/// `./a.graphql` and `a.graphql`.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Extract every quoted path literal inside `files: [...]` lists of
/// `@sdl(...)` directives, in document order.
///
/// Tolerates arbitrary junk around the directives: anything that does not
/// match the shape is skipped, never an error. Both single and double
/// quoted literals are accepted, with backslash escapes honored.
pub fn include_paths(text: &str) -> Vec<String> {
    let bytes = text.as_bytes();
    let mut out = Vec::new();
    let mut i = 0;

    while let Some(found) = text[i..].find("@sdl") {
        let mut pos = i + found + "@sdl".len();
        pos = skip_ws(bytes, pos);
        if bytes.get(pos) != Some(&b'(') {
            i = i + found + "@sdl".len();
            continue;
        }
        pos += 1;

        // Scan the argument list, tracking paren depth and skipping
        // unrelated string literals, until the matching ')'.
        let mut depth = 1usize;
        while pos < bytes.len() && depth > 0 {
            match bytes[pos] {
                b'(' => {
                    depth += 1;
                    pos += 1;
                }
                b')' => {
                    depth -= 1;
                    pos += 1;
                }
                b'"' | b'\'' => {
                    let (_, next) = read_string(text, pos);
                    pos = next;
                }
                b'f' if ident_at(bytes, pos, b"files") => {
                    pos += b"files".len();
                    pos = skip_ws(bytes, pos);
                    if bytes.get(pos) != Some(&b':') {
                        continue;
                    }
                    pos = skip_ws(bytes, pos + 1);
                    if bytes.get(pos) != Some(&b'[') {
                        continue;
                    }
                    pos += 1;
                    // Collect every string literal up to the closing bracket.
                    while pos < bytes.len() && bytes[pos] != b']' {
                        match bytes[pos] {
                            b'"' | b'\'' => {
                                let (literal, next) = read_string(text, pos);
                                if let Some(literal) = literal {
                                    out.push(literal);
                                }
                                pos = next;
                            }
                            _ => pos += 1,
                        }
                    }
                }
                _ => pos += 1,
            }
        }

        i = pos;
    }

    out
}

/// Read a quoted string starting at `start` (which must sit on the opening
/// quote). Returns the unescaped contents, or `None` if the string never
/// closes, plus the byte position after the closing quote.
fn read_string(text: &str, start: usize) -> (Option<String>, usize) {
    let bytes = text.as_bytes();
    let quote = bytes[start];
    let mut value = String::new();
    let mut pos = start + 1;

    while pos < bytes.len() {
        match bytes[pos] {
            b'\\' if pos + 1 < bytes.len() => {
                let escaped = text[pos + 1..].chars().next().unwrap_or('\u{fffd}');
                match escaped {
                    '"' | '\'' | '\\' => value.push(escaped),
                    _ => {
                        value.push('\\');
                        value.push(escaped);
                    }
                }
                pos += 1 + escaped.len_utf8();
            }
            b if b == quote => return (Some(value), pos + 1),
            _ => {
                // Copy a full UTF-8 character, not a single byte.
                let ch = text[pos..].chars().next().unwrap_or('\u{fffd}');
                value.push(ch);
                pos += ch.len_utf8();
            }
        }
    }

    (None, pos)
}

/// True if `word` sits at `pos` as a standalone identifier.
fn ident_at(bytes: &[u8], pos: usize, word: &[u8]) -> bool {
    if pos + word.len() > bytes.len() || &bytes[pos..pos + word.len()] != word {
        return false;
    }
    let before_ok = pos == 0 || !is_ident_byte(bytes[pos - 1]);
    let after_ok = pos + word.len() == bytes.len() || !is_ident_byte(bytes[pos + word.len()]);
    before_ok && after_ok
}

fn is_ident_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

fn skip_ws(bytes: &[u8], mut pos: usize) -> usize {
    while pos < bytes.len() && bytes[pos].is_ascii_whitespace() {
        pos += 1;
    }
    pos
}
