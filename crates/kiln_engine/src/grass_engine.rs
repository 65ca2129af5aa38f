//! [`Engine`] adapter over the `grass` Sass compiler.

use kiln_input::{
    CompilerOptions, IndentType, Linefeed, OutputStyle, SourceMapMode, SourceTree,
    DEFAULT_INDENT_WIDTH, DEFAULT_PRECISION,
};
use tracing::debug;

use crate::error::{EngineError, SourceLocation};
use crate::format;
use crate::Engine;

/// The `grass` release this crate is built against. Kept in step with the
/// exact pin in the workspace manifest.
pub const GRASS_VERSION: &str = "0.13.4";

/// Compiles with `grass`, in process.
///
/// `grass` has two output styles: nested and expanded requests produce
/// expanded output, compact and compressed produce compressed output.
/// Precision, source comments, and source maps are not supported and are
/// ignored.
#[derive(Debug, Clone, Copy, Default)]
pub struct GrassEngine;

impl GrassEngine {
    /// Creates the adapter.
    pub fn new() -> Self {
        Self
    }
}

impl Engine for GrassEngine {
    fn identifier(&self) -> String {
        format!("grass/{GRASS_VERSION}")
    }

    fn compile(&self, tree: &SourceTree, options: &CompilerOptions) -> Result<String, EngineError> {
        log_ignored(options);

        let compressed = matches!(
            options.output_style(),
            OutputStyle::Compact | OutputStyle::Compressed
        );
        let style = if compressed {
            grass::OutputStyle::Compressed
        } else {
            grass::OutputStyle::Expanded
        };
        let mut grass_options = grass::Options::default().style(style);
        if options.indented_syntax() {
            grass_options = grass_options.input_syntax(grass::InputSyntax::Sass);
        }
        for path in options.include_paths().iter().chain(&tree.load_paths) {
            grass_options = grass_options.load_path(path);
        }

        let css = grass::from_string(tree.text.clone(), &grass_options)
            .map_err(|e| parse_error(&e.to_string()))?;

        if compressed {
            return Ok(format::relinefeed(&css, options.linefeed()));
        }
        let css = format::reindent(&css, options.indent_type(), options.indent_width());
        Ok(format::relinefeed(&css, options.linefeed()))
    }
}

fn log_ignored(options: &CompilerOptions) {
    if options.precision() != DEFAULT_PRECISION {
        debug!(precision = options.precision(), "grass ignores precision");
    }
    if options.source_comments() {
        debug!("grass ignores source comments");
    }
    if options.source_map() != SourceMapMode::None {
        debug!(mode = ?options.source_map(), "grass does not emit source maps");
    }
    if matches!(options.output_style(), OutputStyle::Nested | OutputStyle::Compact) {
        debug!(style = ?options.output_style(), "output style approximated");
    }
    if options.indent_type() != IndentType::Space || options.indent_width() != DEFAULT_INDENT_WIDTH {
        debug!("reindenting engine output");
    }
    if options.linefeed() != Linefeed::Lf {
        debug!(linefeed = ?options.linefeed(), "rewriting line terminators");
    }
}

/// Splits a rendered `grass` error into its message and location.
///
/// The rendering starts with `Error: <message>` and ends with a trace line
/// such as `  input.scss 2:14  root stylesheet`.
fn parse_error(rendered: &str) -> EngineError {
    let mut lines = rendered.lines();
    let first = lines.next().unwrap_or_default();
    let message = first.strip_prefix("Error: ").unwrap_or(first).trim().to_string();
    let error = EngineError::new(message);

    let Some(trace) = rendered.lines().rev().find(|l| !l.trim().is_empty()) else {
        return error;
    };
    let tokens: Vec<&str> = trace.split_whitespace().collect();
    for (i, token) in tokens.iter().enumerate() {
        let Some((line, column)) = token.split_once(':') else {
            continue;
        };
        if let (Ok(line), Ok(column)) = (line.parse(), column.parse()) {
            let file = i.checked_sub(1).map(|j| tokens[j].to_string());
            return error.with_location(SourceLocation { file, line, column });
        }
    }
    error
}
