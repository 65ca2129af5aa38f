//! Post-processing of engine output: indentation and line terminators.
//!
//! `grass` always indents with two spaces per nesting level and ends lines
//! with `\n`. These helpers rewrite its output to the requested layout.
//!
//! Only structural indentation is rewritten: lines that open a rule, a
//! declaration, or a comment. Continuation lines inside a multi-line comment
//! or a declaration value spanning several lines are copied verbatim. A
//! value broken after a comma looks like a selector list and is still
//! reindented.

use kiln_input::{IndentType, Linefeed};

/// Indentation `grass` emits per nesting level.
pub const ENGINE_INDENT: usize = 2;

/// Rewrites leading indentation from two spaces per level to `width`
/// characters of `indent_type` per level.
///
/// A leftover odd space is kept as is.
pub fn reindent(css: &str, indent_type: IndentType, width: u8) -> String {
    if indent_type == IndentType::Space && usize::from(width) == ENGINE_INDENT {
        return css.to_string();
    }
    let unit = match indent_type {
        IndentType::Space => " ",
        IndentType::Tab => "\t",
    }
    .repeat(usize::from(width));

    let mut out = String::with_capacity(css.len());
    let mut in_comment = false;
    let mut structural = true;
    for line in css.split_inclusive('\n') {
        if in_comment || !structural {
            out.push_str(line);
        } else {
            let body = line.trim_start_matches(' ');
            let spaces = line.len() - body.len();
            out.push_str(&unit.repeat(spaces / ENGINE_INDENT));
            out.push_str(&" ".repeat(spaces % ENGINE_INDENT));
            out.push_str(body);
        }
        in_comment = ends_inside_comment(line, in_comment);
        let trimmed = line.trim_end();
        structural = trimmed.is_empty()
            || trimmed.ends_with("*/")
            || trimmed.ends_with(['{', '}', ';', ',']);
    }
    out
}

/// Whether a `/* */` comment is still open at the end of `line`.
fn ends_inside_comment(line: &str, mut open: bool) -> bool {
    let mut rest = line;
    loop {
        let marker = if open { "*/" } else { "/*" };
        match rest.find(marker) {
            Some(at) => {
                open = !open;
                rest = &rest[at + marker.len()..];
            }
            None => return open,
        }
    }
}

/// Replaces every `\n` with the requested terminator.
pub fn relinefeed(css: &str, linefeed: Linefeed) -> String {
    match linefeed {
        Linefeed::Lf => css.to_string(),
        other => css.replace('\n', other.as_str()),
    }
}
