//! Discovery of the files a compilation reads.
//!
//! A cache key has to change whenever any file the engine would read
//! changes, not only the files named in the input. Import targets are
//! searched the way the engine searches them: relative to the importing
//! file (the working directory for inline source and loaded files), then
//! each include path, then the directory of each loaded file. Every file
//! found is hashed and scanned for further `@import`, `@use`, and
//! `@forward` rules.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use kiln_common::ContentHash;
use kiln_input::{CompilerOptions, FileKind, Fragment, SassInput};

use crate::error::CacheError;

/// Name used in errors for imports written in inline source.
const INLINE_SOURCE: &str = "<input>";

const RULES: [&str; 3] = ["@import", "@use", "@forward"];

/// Extensions tried for an import without one, in search order.
const EXTENSIONS: [&str; 3] = ["scss", "sass", "css"];

/// A file read during compilation, with the hash of its content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dependency {
    /// The resolved path.
    pub path: PathBuf,
    /// Hash of the file content.
    pub hash: ContentHash,
}

/// Returns every file `input` reads, in discovery order, each listed once.
///
/// Fails with [`CacheError::UnresolvedImport`] when a target cannot be
/// found; such an input must not be cached, since the missing file may
/// appear later.
pub fn dependencies(
    input: &SassInput,
    options: &CompilerOptions,
) -> Result<Vec<Dependency>, CacheError> {
    let mut roots = options.include_paths().to_vec();
    roots.extend(input.load_paths());
    let mut walker = Walker {
        roots,
        seen: HashSet::new(),
        found: Vec::new(),
    };

    let cwd = Path::new(".");
    let inline = Path::new(INLINE_SOURCE);
    for fragment in input.fragments() {
        match fragment {
            Fragment::Text(text) => walker.scan(text, cwd, inline)?,
            Fragment::Variables(_) => {}
            Fragment::File(file) => match file.kind {
                FileKind::Import => {
                    let target = file.path.to_string_lossy();
                    if is_dependency("@import", &target) {
                        walker.follow(&target, cwd, inline)?;
                    }
                }
                // Loaded text is inlined, so its imports resolve like inline source.
                FileKind::Load => walker.visit(&file.path, cwd)?,
            },
            Fragment::Layer(layer) => {
                walker.scan(&layer.declarations, cwd, inline)?;
                walker.scan(&layer.rules, cwd, inline)?;
            }
        }
    }
    Ok(walker.found)
}

struct Walker {
    roots: Vec<PathBuf>,
    seen: HashSet<PathBuf>,
    found: Vec<Dependency>,
}

impl Walker {
    fn scan(&mut self, text: &str, base: &Path, from: &Path) -> Result<(), CacheError> {
        for target in import_targets(text) {
            self.follow(&target, base, from)?;
        }
        Ok(())
    }

    fn follow(&mut self, target: &str, base: &Path, from: &Path) -> Result<(), CacheError> {
        match resolve(target, base, &self.roots) {
            Some(path) => {
                let dir = parent_dir(&path);
                self.visit(&path, &dir)
            }
            None => Err(CacheError::UnresolvedImport {
                target: target.to_string(),
                from: from.to_path_buf(),
            }),
        }
    }

    /// Hashes `path` and follows its imports relative to `base`.
    fn visit(&mut self, path: &Path, base: &Path) -> Result<(), CacheError> {
        let io = |source: std::io::Error| CacheError::Io {
            path: path.to_path_buf(),
            source,
        };
        let canonical = std::fs::canonicalize(path).map_err(io)?;
        if !self.seen.insert(canonical) {
            return Ok(());
        }
        let bytes = std::fs::read(path).map_err(io)?;
        self.found.push(Dependency {
            path: path.to_path_buf(),
            hash: ContentHash::from_bytes(&bytes),
        });
        self.scan(&String::from_utf8_lossy(&bytes), base, path)
    }
}

fn parent_dir(path: &Path) -> PathBuf {
    path.parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Finds the file an import target names, searching `base` first.
fn resolve(target: &str, base: &Path, roots: &[PathBuf]) -> Option<PathBuf> {
    std::iter::once(base)
        .chain(roots.iter().map(PathBuf::as_path))
        .flat_map(|dir| candidates(&dir.join(target)))
        .find(|path| path.is_file())
}

/// Files that may satisfy an import of `path`: the file itself or its
/// partial when it has a Sass extension, otherwise each extension, then an
/// index file inside a directory of that name.
fn candidates(path: &Path) -> Vec<PathBuf> {
    let Some(name) = path.file_name().map(|n| n.to_string_lossy().into_owned()) else {
        return Vec::new();
    };
    let has_extension = path
        .extension()
        .is_some_and(|ext| EXTENSIONS.iter().any(|e| ext == *e));
    if has_extension {
        return vec![path.to_path_buf(), path.with_file_name(format!("_{name}"))];
    }

    let mut out = Vec::with_capacity(EXTENSIONS.len() * 4);
    for ext in EXTENSIONS {
        out.push(path.with_file_name(format!("{name}.{ext}")));
        out.push(path.with_file_name(format!("_{name}.{ext}")));
    }
    for ext in EXTENSIONS {
        out.push(path.join(format!("index.{ext}")));
        out.push(path.join(format!("_index.{ext}")));
    }
    out
}

/// Whether a target names a file the engine reads, as opposed to a
/// built-in module or a plain CSS import left in the output.
fn is_dependency(rule: &str, target: &str) -> bool {
    if target.is_empty() || target.starts_with("sass:") {
        return false;
    }
    let remote = ["http://", "https://", "//"]
        .iter()
        .any(|scheme| target.starts_with(scheme));
    !remote && !(rule == "@import" && target.ends_with(".css"))
}

/// Extracts the targets of the import rules in `text`, skipping comments
/// and string literals.
fn import_targets(text: &str) -> Vec<String> {
    let bytes = text.as_bytes();
    let mut targets = Vec::new();
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'/' if bytes.get(i + 1) == Some(&b'/') => i = skip_past(text, i, "\n"),
            b'/' if bytes.get(i + 1) == Some(&b'*') => i = skip_past(text, i + 2, "*/"),
            b'"' | b'\'' => i = quoted(text, i).1,
            b'@' => {
                let rest = &text[i..];
                let rule = RULES.iter().find(|rule| {
                    rest.starts_with(**rule)
                        && rest[rule.len()..]
                            .starts_with(|c: char| c.is_whitespace() || c == '"' || c == '\'')
                });
                i = match rule {
                    Some(rule) => read_targets(text, i + rule.len(), rule, &mut targets),
                    None => i + 1,
                };
            }
            _ => i += 1,
        }
    }
    targets
}

/// Reads the comma-separated targets of one rule starting at `pos`.
/// Returns the position after the last target.
fn read_targets(text: &str, pos: usize, rule: &str, targets: &mut Vec<String>) -> usize {
    let bytes = text.as_bytes();
    let mut i = pos;
    loop {
        i = skip_space(bytes, i);
        let Some(&c) = bytes.get(i) else {
            break;
        };
        let (target, next) = if c == b'"' || c == b'\'' {
            quoted(text, i)
        } else if rule == "@import"
            && (c.is_ascii_alphanumeric() || matches!(c, b'_' | b'-' | b'.' | b'/'))
            && !text[i..].starts_with("url(")
        {
            // The indented syntax allows unquoted import targets.
            let end = text[i..]
                .find(|c: char| c.is_whitespace() || c == ',' || c == ';')
                .map_or(text.len(), |n| i + n);
            (&text[i..end], end)
        } else {
            break;
        };
        if is_dependency(rule, target) {
            targets.push(target.to_string());
        }
        i = skip_space(bytes, next);
        if bytes.get(i) != Some(&b',') {
            break;
        }
        i += 1;
    }
    i
}

/// Returns the body of the string literal opening at `start` and the
/// position after its closing quote. Unterminated strings end at the line.
fn quoted(text: &str, start: usize) -> (&str, usize) {
    let bytes = text.as_bytes();
    let quote = bytes[start];
    let mut i = start + 1;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b'\n' => break,
            b if b == quote => return (&text[start + 1..i], i + 1),
            _ => i += 1,
        }
    }
    let end = i.min(bytes.len());
    (&text[start + 1..end], end)
}

fn skip_past(text: &str, from: usize, pattern: &str) -> usize {
    text[from..]
        .find(pattern)
        .map_or(text.len(), |n| from + n + pattern.len())
}

fn skip_space(bytes: &[u8], mut i: usize) -> usize {
    while bytes.get(i).is_some_and(u8::is_ascii_whitespace) {
        i += 1;
    }
    i
}
