//! Cache key derivation.
//!
//! Serializes a compilation input, its options, and the engine version into
//! a stable byte sequence and hashes it with XXH3-128. Each fragment is
//! encoded as a tagged variant so text can never collide with a file path of
//! the same spelling, and variable maps are sorted by name so their
//! insertion order does not matter. Every file the input reads, directly or
//! through nested imports, contributes its path and content hash.

use std::path::Path;

use kiln_common::ContentHash;
use kiln_input::{CompilerOptions, FileKind, Fragment, SassInput};
use serde::Serialize;

use crate::error::CacheError;
use crate::imports;
use crate::key::CacheKey;

/// Version of the encoding below. Bump when the record layout or the way
/// inputs are rendered changes, so keys from older builds stop matching.
const FINGERPRINT_FORMAT_VERSION: u32 = 2;

#[derive(Serialize)]
struct KeyRecord<'a> {
    format_version: u32,
    compiler_version: &'a str,
    extra: Option<&'a str>,
    options: &'a CompilerOptions,
    fragments: Vec<FragmentRecord<'a>>,
    dependencies: Vec<(String, ContentHash)>,
}

#[derive(Serialize)]
enum FragmentRecord<'a> {
    Text(&'a str),
    Variables(Vec<(&'a str, &'a str)>),
    File {
        kind: FileKindRecord,
        path: String,
    },
    Layer {
        defaults: Vec<(&'a str, &'a str)>,
        declarations: &'a str,
        rules: &'a str,
        attachments: Vec<(String, String)>,
    },
}

#[derive(Serialize)]
enum FileKindRecord {
    Import,
    Load,
}

/// Derives cache keys for one engine version.
///
/// Optional extra key material lets callers separate entries that the
/// input and options alone would not distinguish.
#[derive(Debug, Clone, Copy)]
pub struct Fingerprinter<'a> {
    compiler_version: &'a str,
    extra: Option<&'a str>,
}

impl<'a> Fingerprinter<'a> {
    /// Creates a fingerprinter for the given engine version identifier.
    pub fn new(compiler_version: &'a str) -> Self {
        Self {
            compiler_version,
            extra: None,
        }
    }

    /// Mixes caller-supplied material into every key.
    pub fn with_extra(mut self, extra: Option<&'a str>) -> Self {
        self.extra = extra;
        self
    }

    /// Returns the exact bytes that are hashed into the key.
    ///
    /// Referenced files and everything they import are read so that editing
    /// any of them changes the key. An import that cannot be resolved is an
    /// error: the input has no stable key until the file exists.
    pub fn encode(
        &self,
        input: &'a SassInput,
        options: &'a CompilerOptions,
    ) -> Result<Vec<u8>, CacheError> {
        let dependencies = imports::dependencies(input, options)?
            .into_iter()
            .map(|dep| (path_string(&dep.path), dep.hash))
            .collect();
        let record = KeyRecord {
            format_version: FINGERPRINT_FORMAT_VERSION,
            compiler_version: self.compiler_version,
            extra: self.extra,
            options,
            fragments: input.fragments().iter().map(fragment_record).collect(),
            dependencies,
        };
        bincode::serde::encode_to_vec(&record, bincode::config::standard()).map_err(|e| {
            CacheError::Serialization {
                reason: e.to_string(),
            }
        })
    }

    /// Computes the cache key for an input and its options.
    pub fn key(
        &self,
        input: &'a SassInput,
        options: &'a CompilerOptions,
    ) -> Result<CacheKey, CacheError> {
        let bytes = self.encode(input, options)?;
        Ok(CacheKey::from_hash(ContentHash::from_bytes(&bytes)))
    }
}

/// Computes the cache key for `(input, options, compiler_version)`.
pub fn fingerprint(
    input: &SassInput,
    options: &CompilerOptions,
    compiler_version: &str,
) -> Result<CacheKey, CacheError> {
    Fingerprinter::new(compiler_version).key(input, options)
}

fn fragment_record(fragment: &Fragment) -> FragmentRecord<'_> {
    match fragment {
        Fragment::Text(text) => FragmentRecord::Text(text),
        Fragment::Variables(vars) => FragmentRecord::Variables(vars.sorted()),
        Fragment::File(file) => FragmentRecord::File {
            kind: match file.kind {
                FileKind::Import => FileKindRecord::Import,
                FileKind::Load => FileKindRecord::Load,
            },
            path: path_string(&file.path),
        },
        Fragment::Layer(layer) => FragmentRecord::Layer {
            defaults: layer.defaults.sorted(),
            declarations: &layer.declarations,
            rules: &layer.rules,
            attachments: layer
                .attachments
                .iter()
                .map(|a| (path_string(&a.dest), path_string(&a.source)))
                .collect(),
        },
    }
}

fn path_string(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use kiln_input::{FileRef, Layer, OutputStyle, VariableMap};

    fn example_input() -> SassInput {
        SassInput::new()
            .with(VariableMap::from_pairs([("width", "122px")]).unwrap())
            .with("foo { margin: $width * .3; }")
    }

    fn key_of(input: &SassInput, options: &CompilerOptions) -> CacheKey {
        fingerprint(input, options, "test-engine/1").unwrap()
    }

    #[test]
    fn deterministic() {
        let input = example_input();
        let options = CompilerOptions::default();
        assert_eq!(key_of(&input, &options), key_of(&input, &options));
        assert_eq!(key_of(&input, &options), key_of(&example_input(), &options.clone()));
    }

    #[test]
    fn every_option_field_changes_key() {
        let input = example_input();
        let base = key_of(&input, &CompilerOptions::default());
        let variants = [
            CompilerOptions::default().with_output_style(OutputStyle::Compressed),
            CompilerOptions::default().with_precision(8),
            CompilerOptions::default().with_indented_syntax(true),
            CompilerOptions::default().with_include_path("scss"),
            CompilerOptions::default().with_source_comments(true),
            CompilerOptions::default().with_indent_type(kiln_input::IndentType::Tab),
            CompilerOptions::default().with_indent_width(4),
            CompilerOptions::default().with_linefeed(kiln_input::Linefeed::Crlf),
            CompilerOptions::default().with_source_map(kiln_input::SourceMapMode::Embed),
        ];
        for options in &variants {
            assert_ne!(key_of(&input, options), base, "{options:?} did not change the key");
        }
    }

    #[test]
    fn compiler_version_changes_key() {
        let input = example_input();
        let options = CompilerOptions::default();
        let a = fingerprint(&input, &options, "grass/0.1.0").unwrap();
        let b = fingerprint(&input, &options, "grass/0.2.0").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn extra_material_changes_key() {
        let input = example_input();
        let options = CompilerOptions::default();
        let plain = Fingerprinter::new("v").key(&input, &options).unwrap();
        let extra = Fingerprinter::new("v")
            .with_extra(Some("theme=dark"))
            .key(&input, &options)
            .unwrap();
        assert_ne!(plain, extra);
    }

    #[test]
    fn fragment_content_and_order_change_key() {
        let options = CompilerOptions::default();
        let vars = VariableMap::from_pairs([("width", "122px")]).unwrap();
        let a = SassInput::new().with(vars.clone()).with("a { b: c; }");
        let b = SassInput::new().with("a { b: c; }").with(vars.clone());
        let c = SassInput::new().with(vars).with("a { b: d; }");
        assert_ne!(key_of(&a, &options), key_of(&b, &options));
        assert_ne!(key_of(&a, &options), key_of(&c, &options));
    }

    #[test]
    fn intra_map_order_does_not_change_key() {
        let options = CompilerOptions::default();
        let a = SassInput::new().with(VariableMap::from_pairs([("x", "1"), ("y", "2")]).unwrap());
        let b = SassInput::new().with(VariableMap::from_pairs([("y", "2"), ("x", "1")]).unwrap());
        assert_eq!(key_of(&a, &options), key_of(&b, &options));
    }

    #[test]
    fn text_and_path_with_same_spelling_differ() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("theme.scss");
        std::fs::write(&path, "").unwrap();
        let options = CompilerOptions::default();
        let text = SassInput::new().with(path.to_string_lossy().into_owned());
        let file = SassInput::new().with(FileRef::import(&path));
        assert_ne!(key_of(&text, &options), key_of(&file, &options));
    }

    #[test]
    fn import_and_load_of_same_path_differ() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("theme.scss");
        std::fs::write(&path, "$x: 1px;").unwrap();
        let options = CompilerOptions::default();
        let import = SassInput::new().with(FileRef::import(&path));
        let load = SassInput::new().with(FileRef::load(&path));
        assert_ne!(key_of(&import, &options), key_of(&load, &options));
    }

    #[test]
    fn referenced_file_content_changes_key() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("_vars.scss");
        std::fs::write(&path, "$x: 1px;").unwrap();
        let input = SassInput::new().with(FileRef::import(&path));
        let options = CompilerOptions::default();

        let before = key_of(&input, &options);
        std::fs::write(&path, "$x: 2px;").unwrap();
        let after = key_of(&input, &options);
        assert_ne!(before, after);
    }

    #[test]
    fn layer_attachments_change_key() {
        let options = CompilerOptions::default();
        let plain = SassInput::new().with(Layer::new().with_rules("a { b: c; }"));
        let attached = SassInput::new().with(
            Layer::new()
                .with_rules("a { b: c; }")
                .with_attachment("fonts", "assets/fonts")
                .unwrap(),
        );
        assert_ne!(key_of(&plain, &options), key_of(&attached, &options));
    }

    #[test]
    fn partial_found_through_include_path_changes_key() {
        let dir = tempfile::tempdir().unwrap();
        let partial = dir.path().join("_theme.scss");
        std::fs::write(&partial, "$fg: red;").unwrap();
        let input = SassInput::new().with(FileRef::import("theme"));
        let options = CompilerOptions::default().with_include_path(dir.path());

        let before = key_of(&input, &options);
        std::fs::write(&partial, "$fg: blue;").unwrap();
        assert_ne!(before, key_of(&input, &options));
    }

    #[test]
    fn nested_import_changes_key() {
        let dir = tempfile::tempdir().unwrap();
        let main = dir.path().join("main.scss");
        let part = dir.path().join("_part.scss");
        std::fs::write(&main, "@import \"part\";").unwrap();
        std::fs::write(&part, "$fg: red;").unwrap();
        let input = SassInput::new().with(FileRef::load(&main));
        let options = CompilerOptions::default();

        let before = key_of(&input, &options);
        std::fs::write(&part, "$fg: blue;").unwrap();
        assert_ne!(before, key_of(&input, &options));
    }

    #[test]
    fn unresolved_import_has_no_key() {
        let input = SassInput::new().with(FileRef::import("/nonexistent/kiln/theme"));
        let err = fingerprint(&input, &CompilerOptions::default(), "v").unwrap_err();
        assert!(matches!(err, CacheError::UnresolvedImport { .. }));
    }
}
