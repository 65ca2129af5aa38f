//! Input fragments: raw text, variable maps, file references, and layers.

use std::path::{Component, Path, PathBuf};

use crate::error::InputError;

/// One element of a [`SassInput`].
///
/// Fragments render in sequence order, so a variable map placed before some
/// text is visible to that text, and a later map overrides an earlier one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fragment {
    /// Raw Sass source text.
    Text(String),
    /// Variable assignments rendered as `$name: value;` statements.
    Variables(VariableMap),
    /// A reference to an external file.
    File(FileRef),
    /// A bundle of defaults, declarations, rules, and file attachments.
    Layer(Layer),
}

impl From<&str> for Fragment {
    fn from(text: &str) -> Self {
        Fragment::Text(text.to_string())
    }
}

impl From<String> for Fragment {
    fn from(text: String) -> Self {
        Fragment::Text(text)
    }
}

impl From<VariableMap> for Fragment {
    fn from(vars: VariableMap) -> Self {
        Fragment::Variables(vars)
    }
}

impl From<FileRef> for Fragment {
    fn from(file: FileRef) -> Self {
        Fragment::File(file)
    }
}

impl From<Layer> for Fragment {
    fn from(layer: Layer) -> Self {
        Fragment::Layer(layer)
    }
}

/// An ordered map of Sass variable names to values.
///
/// Names are stored without the leading `$`. Values are Sass expressions
/// written verbatim into the source. Inserting a name that is already
/// present replaces its value and keeps its original position.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VariableMap {
    entries: Vec<(String, String)>,
}

impl VariableMap {
    /// Creates an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a map from `(name, value)` pairs, validating every name.
    pub fn from_pairs<I, K, V>(pairs: I) -> Result<Self, InputError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut map = Self::new();
        for (name, value) in pairs {
            map.insert(name, value)?;
        }
        Ok(map)
    }

    /// Inserts or replaces a variable.
    ///
    /// A leading `$` on the name is accepted and stripped.
    pub fn insert(
        &mut self,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> Result<(), InputError> {
        let name = name.into();
        let name = name.strip_prefix('$').unwrap_or(&name).to_string();
        if !is_valid_identifier(&name) {
            return Err(InputError::InvalidVariableName(name));
        }
        let value = value.into();
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((name, value)),
        }
        Ok(())
    }

    /// Returns the value bound to `name`, if any.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// Iterates over entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    /// Returns the entries sorted by name.
    pub fn sorted(&self) -> Vec<(&str, &str)> {
        let mut pairs: Vec<_> = self.iter().collect();
        pairs.sort_unstable();
        pairs
    }

    /// Returns the number of variables.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the map holds no variables.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Sass identifiers: letters, digits, `-`, `_`, and non-ASCII characters,
/// not starting with a digit.
fn is_valid_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        None => false,
        Some(c) if c.is_ascii_digit() => false,
        Some(c) if !is_ident_char(c) => false,
        Some(_) => chars.all(is_ident_char),
    }
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '-' || c == '_' || !c.is_ascii()
}

/// How a referenced file enters the source tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileKind {
    /// Rendered as an `@import` statement; the engine resolves the path.
    Import,
    /// The file's text is read and inlined; its directory becomes a load path.
    Load,
}

/// A reference to an external Sass file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRef {
    /// Path to the file.
    pub path: PathBuf,
    /// Whether the file is imported or inlined.
    pub kind: FileKind,
}

impl FileRef {
    /// References a file to be rendered as an `@import`.
    pub fn import(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            kind: FileKind::Import,
        }
    }

    /// References a file whose contents are inlined.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            kind: FileKind::Load,
        }
    }
}

/// A file or directory that must sit next to the CSS output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    /// Destination, relative to the output directory.
    pub dest: PathBuf,
    /// Source file or directory.
    pub source: PathBuf,
}

/// A reusable bundle of Sass code plus the files it depends on at runtime.
///
/// Renders as `defaults` (each as `$name: value !default;`), then
/// `declarations` (functions and mixins), then `rules`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Layer {
    /// Variables assigned with `!default`.
    pub defaults: VariableMap,
    /// Function and mixin definitions.
    pub declarations: String,
    /// Style rules.
    pub rules: String,
    /// Files copied next to a file output.
    pub attachments: Vec<Attachment>,
}

impl Layer {
    /// Creates an empty layer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the layer's default variables.
    pub fn with_defaults(mut self, defaults: VariableMap) -> Self {
        self.defaults = defaults;
        self
    }

    /// Sets the layer's function and mixin declarations.
    pub fn with_declarations(mut self, text: impl Into<String>) -> Self {
        self.declarations = text.into();
        self
    }

    /// Sets the layer's style rules.
    pub fn with_rules(mut self, text: impl Into<String>) -> Self {
        self.rules = text.into();
        self
    }

    /// Adds an attachment copied from `source` to `<output dir>/<dest>`.
    ///
    /// `dest` must be relative and must not contain `..`.
    pub fn with_attachment(
        mut self,
        dest: impl Into<PathBuf>,
        source: impl Into<PathBuf>,
    ) -> Result<Self, InputError> {
        let dest = dest.into();
        if !is_contained_relative(&dest) {
            return Err(InputError::InvalidAttachmentDest { dest });
        }
        self.attachments.push(Attachment {
            dest,
            source: source.into(),
        });
        Ok(self)
    }
}

fn is_contained_relative(path: &Path) -> bool {
    let mut saw_normal = false;
    for component in path.components() {
        match component {
            Component::Normal(_) => saw_normal = true,
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => return false,
        }
    }
    saw_normal
}

/// An ordered sequence of fragments forming one compilation input.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SassInput {
    fragments: Vec<Fragment>,
}

impl SassInput {
    /// Creates an empty input.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a fragment.
    pub fn push(&mut self, fragment: impl Into<Fragment>) {
        self.fragments.push(fragment.into());
    }

    /// Appends a fragment, builder style.
    pub fn with(mut self, fragment: impl Into<Fragment>) -> Self {
        self.push(fragment);
        self
    }

    /// Returns the fragments in order.
    pub fn fragments(&self) -> &[Fragment] {
        &self.fragments
    }

    /// Returns `true` if the input has no fragments.
    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }

    /// Collects the attachments of every layer, in fragment order.
    ///
    /// Does not touch the file system.
    pub fn attachments(&self) -> Vec<Attachment> {
        self.fragments
            .iter()
            .filter_map(|f| match f {
                Fragment::Layer(layer) => Some(layer.attachments.iter().cloned()),
                _ => None,
            })
            .flatten()
            .collect()
    }
}

impl From<Vec<Fragment>> for SassInput {
    fn from(fragments: Vec<Fragment>) -> Self {
        Self { fragments }
    }
}

impl FromIterator<Fragment> for SassInput {
    fn from_iter<I: IntoIterator<Item = Fragment>>(iter: I) -> Self {
        Self {
            fragments: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn variable_insert_replaces_in_place() {
        let mut vars = VariableMap::new();
        vars.insert("a", "1px").unwrap();
        vars.insert("b", "2px").unwrap();
        vars.insert("a", "3px").unwrap();
        let entries: Vec<_> = vars.iter().collect();
        assert_eq!(entries, vec![("a", "3px"), ("b", "2px")]);
    }

    #[test]
    fn variable_dollar_prefix_stripped() {
        let vars = VariableMap::from_pairs([("$primary", "blue")]).unwrap();
        assert_eq!(vars.get("primary"), Some("blue"));
    }

    #[test]
    fn variable_names_validated() {
        assert!(VariableMap::from_pairs([("1st", "x")]).is_err());
        assert!(VariableMap::from_pairs([("has space", "x")]).is_err());
        assert!(VariableMap::from_pairs([("", "x")]).is_err());
        assert!(VariableMap::from_pairs([("font-size_base", "x")]).is_ok());
    }

    #[test]
    fn sorted_ignores_insertion_order() {
        let a = VariableMap::from_pairs([("x", "1"), ("y", "2")]).unwrap();
        let b = VariableMap::from_pairs([("y", "2"), ("x", "1")]).unwrap();
        assert_eq!(a.sorted(), b.sorted());
        assert_ne!(a, b);
    }

    #[test]
    fn attachment_dest_must_be_contained() {
        assert!(Layer::new().with_attachment("fonts/a.woff", "a.woff").is_ok());
        assert!(Layer::new().with_attachment("../a.woff", "a.woff").is_err());
        assert!(Layer::new().with_attachment("/abs/a.woff", "a.woff").is_err());
        assert!(Layer::new().with_attachment("", "a.woff").is_err());
    }

    #[test]
    fn attachments_collected_in_order() {
        let first = Layer::new().with_attachment("one.txt", "src/one.txt").unwrap();
        let second = Layer::new().with_attachment("two.txt", "src/two.txt").unwrap();
        let input = SassInput::new()
            .with(first)
            .with("a { b: c; }")
            .with(second);
        let dests: Vec<_> = input.attachments().into_iter().map(|a| a.dest).collect();
        assert_eq!(dests, vec![PathBuf::from("one.txt"), PathBuf::from("two.txt")]);
    }

    #[test]
    fn input_without_layers_has_no_attachments() {
        let input = SassInput::new().with("a { b: c; }").with(FileRef::import("x.scss"));
        assert!(input.attachments().is_empty());
    }
}
