//! Rendering a [`SassInput`] into the source text handed to the engine.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use crate::error::InputError;
use crate::fragment::{Attachment, FileKind, FileRef, Fragment, SassInput, VariableMap};

/// The assembled source: one Sass document plus what the engine needs to
/// resolve it and what the output needs beside it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceTree {
    /// The concatenated Sass source.
    pub text: String,
    /// Extra directories to search for imports (parents of loaded files).
    pub load_paths: Vec<PathBuf>,
    /// Files that must be copied next to a file output.
    pub attachments: Vec<Attachment>,
}

impl SassInput {
    /// Renders every fragment in order into a single [`SourceTree`].
    ///
    /// Files referenced with [`FileKind::Load`] are read here; imports are
    /// left to the engine.
    pub fn assemble(&self) -> Result<SourceTree, InputError> {
        let mut tree = SourceTree::default();
        for fragment in self.fragments() {
            match fragment {
                Fragment::Text(text) => push_block(&mut tree.text, text),
                Fragment::Variables(vars) => {
                    push_block(&mut tree.text, &render_variables(vars, false))
                }
                Fragment::File(file) => render_file(&mut tree, file)?,
                Fragment::Layer(layer) => {
                    push_block(&mut tree.text, &render_variables(&layer.defaults, true));
                    push_block(&mut tree.text, &layer.declarations);
                    push_block(&mut tree.text, &layer.rules);
                    tree.attachments.extend(layer.attachments.iter().cloned());
                }
            }
        }
        Ok(tree)
    }

    /// Directories of [`FileKind::Load`] files, in first-seen order.
    ///
    /// These are the extra import roots [`SassInput::assemble`] hands to the
    /// engine.
    pub fn load_paths(&self) -> Vec<PathBuf> {
        let mut dirs = Vec::new();
        for fragment in self.fragments() {
            if let Fragment::File(file) = fragment {
                if file.kind == FileKind::Load {
                    let dir = load_dir(&file.path);
                    if !dirs.contains(&dir) {
                        dirs.push(dir);
                    }
                }
            }
        }
        dirs
    }
}

fn push_block(out: &mut String, block: &str) {
    if block.is_empty() {
        return;
    }
    out.push_str(block);
    if !block.ends_with('\n') {
        out.push('\n');
    }
}

fn render_variables(vars: &VariableMap, as_default: bool) -> String {
    let suffix = if as_default { " !default" } else { "" };
    let mut out = String::new();
    for (name, value) in vars.iter() {
        // Writing to a String cannot fail.
        let _ = writeln!(out, "${name}: {value}{suffix};");
    }
    out
}

fn render_file(tree: &mut SourceTree, file: &FileRef) -> Result<(), InputError> {
    match file.kind {
        FileKind::Import => {
            push_block(&mut tree.text, &format!("@import \"{}\";", import_path(&file.path)));
        }
        FileKind::Load => {
            let text = std::fs::read_to_string(&file.path).map_err(|e| InputError::Read {
                path: file.path.clone(),
                source: e,
            })?;
            push_block(&mut tree.text, &text);
            let parent = load_dir(&file.path);
            if !tree.load_paths.contains(&parent) {
                tree.load_paths.push(parent);
            }
        }
    }
    Ok(())
}

fn load_dir(path: &Path) -> PathBuf {
    path.parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Formats a path for an `@import` string: forward slashes, escaped quotes.
fn import_path(path: &Path) -> String {
    path.to_string_lossy()
        .replace('\\', "/")
        .replace('"', "\\\"")
}
