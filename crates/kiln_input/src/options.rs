//! Immutable compiler options.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Default number of fractional digits for numeric output.
pub const DEFAULT_PRECISION: u8 = 5;

/// Largest accepted precision.
pub const MAX_PRECISION: u8 = 16;

/// Default indentation width, in `indent_type` characters.
pub const DEFAULT_INDENT_WIDTH: u8 = 2;

/// Largest accepted indentation width.
pub const MAX_INDENT_WIDTH: u8 = 10;

/// CSS output formatting style.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputStyle {
    /// Nested indentation mirroring the Sass source.
    Nested,
    /// One declaration per line (default).
    #[default]
    Expanded,
    /// One rule per line.
    Compact,
    /// Minimal whitespace.
    Compressed,
}

/// Indentation character.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndentType {
    /// Spaces (default).
    #[default]
    Space,
    /// Tabs.
    Tab,
}

/// Line terminator written between output lines.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Linefeed {
    /// `\n` (default).
    #[default]
    Lf,
    /// `\r\n`.
    Crlf,
    /// `\r`.
    Cr,
    /// `\n\r`.
    Lfcr,
}

impl Linefeed {
    /// Returns the terminator as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Linefeed::Lf => "\n",
            Linefeed::Crlf => "\r\n",
            Linefeed::Cr => "\r",
            Linefeed::Lfcr => "\n\r",
        }
    }
}

/// Source map generation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceMapMode {
    /// No source map (default).
    #[default]
    None,
    /// Embed a source map referencing the original files.
    Embed,
    /// Embed a source map that also carries the original sources.
    EmbedWithContents,
}

/// The option record passed to the compiler engine.
///
/// Values are immutable once built; construct through the `with_*` methods.
/// Two records with equal fields serialize identically, which the cache key
/// relies on.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CompilerOptions {
    output_style: OutputStyle,
    precision: u8,
    indented_syntax: bool,
    include_paths: Vec<PathBuf>,
    source_comments: bool,
    indent_type: IndentType,
    indent_width: u8,
    linefeed: Linefeed,
    source_map: SourceMapMode,
}

impl Default for CompilerOptions {
    fn default() -> Self {
        Self {
            output_style: OutputStyle::default(),
            precision: DEFAULT_PRECISION,
            indented_syntax: false,
            include_paths: Vec::new(),
            source_comments: false,
            indent_type: IndentType::default(),
            indent_width: DEFAULT_INDENT_WIDTH,
            linefeed: Linefeed::default(),
            source_map: SourceMapMode::default(),
        }
    }
}

impl CompilerOptions {
    /// Sets the output style.
    pub fn with_output_style(mut self, style: OutputStyle) -> Self {
        self.output_style = style;
        self
    }

    /// Sets the numeric precision.
    pub fn with_precision(mut self, precision: u8) -> Self {
        self.precision = precision;
        self
    }

    /// Treats the source as indented (`.sass`) syntax.
    pub fn with_indented_syntax(mut self, indented: bool) -> Self {
        self.indented_syntax = indented;
        self
    }

    /// Appends a directory searched by `@import`.
    pub fn with_include_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.include_paths.push(path.into());
        self
    }

    /// Emits comments pointing at source line numbers.
    pub fn with_source_comments(mut self, enabled: bool) -> Self {
        self.source_comments = enabled;
        self
    }

    /// Sets the indentation character.
    pub fn with_indent_type(mut self, indent_type: IndentType) -> Self {
        self.indent_type = indent_type;
        self
    }

    /// Sets the indentation width.
    pub fn with_indent_width(mut self, width: u8) -> Self {
        self.indent_width = width;
        self
    }

    /// Sets the line terminator.
    pub fn with_linefeed(mut self, linefeed: Linefeed) -> Self {
        self.linefeed = linefeed;
        self
    }

    /// Sets source map generation.
    pub fn with_source_map(mut self, mode: SourceMapMode) -> Self {
        self.source_map = mode;
        self
    }

    /// The output style.
    pub fn output_style(&self) -> OutputStyle {
        self.output_style
    }

    /// The numeric precision.
    pub fn precision(&self) -> u8 {
        self.precision
    }

    /// Whether the source uses indented syntax.
    pub fn indented_syntax(&self) -> bool {
        self.indented_syntax
    }

    /// Directories searched by `@import`, in order.
    pub fn include_paths(&self) -> &[PathBuf] {
        &self.include_paths
    }

    /// Whether source comments are emitted.
    pub fn source_comments(&self) -> bool {
        self.source_comments
    }

    /// The indentation character.
    pub fn indent_type(&self) -> IndentType {
        self.indent_type
    }

    /// The indentation width.
    pub fn indent_width(&self) -> u8 {
        self.indent_width
    }

    /// The line terminator.
    pub fn linefeed(&self) -> Linefeed {
        self.linefeed
    }

    /// Source map generation.
    pub fn source_map(&self) -> SourceMapMode {
        self.source_map
    }

    /// Checks value ranges, returning a message describing the first violation.
    pub fn validate(&self) -> Result<(), String> {
        if self.precision > MAX_PRECISION {
            return Err(format!(
                "precision must be between 0 and {MAX_PRECISION}, got {}",
                self.precision
            ));
        }
        if self.indent_width > MAX_INDENT_WIDTH {
            return Err(format!(
                "indent width must be between 0 and {MAX_INDENT_WIDTH}, got {}",
                self.indent_width
            ));
        }
        if let Some(path) = self.include_paths.iter().find(|p| is_blank(p)) {
            return Err(format!("include path '{}' is empty", path.display()));
        }
        Ok(())
    }
}

fn is_blank(path: &Path) -> bool {
    path.as_os_str().is_empty()
}

impl FromStr for OutputStyle {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "nested" => Ok(OutputStyle::Nested),
            "expanded" => Ok(OutputStyle::Expanded),
            "compact" => Ok(OutputStyle::Compact),
            "compressed" => Ok(OutputStyle::Compressed),
            other => Err(format!(
                "unknown output style '{other}' (expected nested, expanded, compact, or compressed)"
            )),
        }
    }
}

/// Whether attachments are copied next to a file output.
///
/// Not part of the cache key: it only affects what happens after the CSS
/// is produced.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WriteAttachments {
    /// Copy every attachment into the output directory.
    Always,
    /// Never copy attachments.
    Never,
    /// Copy nothing, but warn when attachments exist (default).
    #[default]
    #[serde(rename = "warn", alias = "warn_only")]
    WarnOnly,
}

impl FromStr for WriteAttachments {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "always" => Ok(WriteAttachments::Always),
            "never" => Ok(WriteAttachments::Never),
            "warn" | "warn_only" | "warn-only" => Ok(WriteAttachments::WarnOnly),
            other => Err(format!(
                "unknown attachment mode '{other}' (expected always, never, or warn)"
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let opts = CompilerOptions::default();
        assert_eq!(opts.output_style(), OutputStyle::Expanded);
        assert_eq!(opts.precision(), 5);
        assert_eq!(opts.indent_width(), 2);
        assert_eq!(opts.linefeed(), Linefeed::Lf);
        assert_eq!(opts.source_map(), SourceMapMode::None);
        assert!(opts.include_paths().is_empty());
        assert!(opts.validate().is_ok());
    }

    #[test]
    fn builder_produces_equal_values() {
        let a = CompilerOptions::default()
            .with_output_style(OutputStyle::Compressed)
            .with_include_path("scss");
        let b = CompilerOptions::default()
            .with_include_path("scss")
            .with_output_style(OutputStyle::Compressed);
        assert_eq!(a, b);
    }

    #[test]
    fn validate_rejects_out_of_range() {
        assert!(CompilerOptions::default().with_precision(17).validate().is_err());
        assert!(CompilerOptions::default().with_indent_width(11).validate().is_err());
        assert!(CompilerOptions::default().with_include_path("").validate().is_err());
        assert!(CompilerOptions::default().with_precision(10).validate().is_ok());
    }

    #[test]
    fn linefeed_strings() {
        assert_eq!(Linefeed::Crlf.as_str(), "\r\n");
        assert_eq!(Linefeed::Lfcr.as_str(), "\n\r");
    }

    #[test]
    fn parse_output_style() {
        assert_eq!("Compressed".parse::<OutputStyle>(), Ok(OutputStyle::Compressed));
        assert!("pretty".parse::<OutputStyle>().is_err());
    }

    #[test]
    fn parse_write_attachments() {
        assert_eq!("always".parse::<WriteAttachments>(), Ok(WriteAttachments::Always));
        assert_eq!("warn".parse::<WriteAttachments>(), Ok(WriteAttachments::WarnOnly));
        assert_eq!(WriteAttachments::default(), WriteAttachments::WarnOnly);
        assert!("sometimes".parse::<WriteAttachments>().is_err());
    }
}
