//! `kiln compile`: compile files and inline text to CSS.

use std::io::{Read, Write};
use std::path::PathBuf;

use kiln_build::{CompileRequest, Compiler, Output};
use kiln_cache::{CacheLimits, CssCache};
use kiln_config::stdin_is_interactive;
use kiln_engine::GrassEngine;
use kiln_input::{CompilerOptions, FileRef, Layer, SassInput, VariableMap};
use tracing::{debug, warn};

use crate::{CompileArgs, GlobalArgs};

/// Runs the `kiln compile` command.
///
/// Returns exit code 0 on success. Compilation and configuration errors are
/// returned as errors and reported by `main`.
pub fn run(args: &CompileArgs, global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let interactive = stdin_is_interactive();
    let stdin_text = if args.files.is_empty() && args.text.is_none() {
        if interactive {
            return Err("nothing to compile: pass files, --text, or pipe source on stdin".into());
        }
        let mut text = String::new();
        std::io::stdin().read_to_string(&mut text)?;
        Some(text)
    } else {
        None
    };

    let input = build_input(args, stdin_text)?;
    let options = build_options(args, global);
    let caching = if args.cache {
        true
    } else if args.no_cache {
        false
    } else {
        global.config.cache_enabled(interactive)
    };

    let cache = if caching { open_cache(args, global) } else { None };

    let engine = GrassEngine::new();
    let compiler = Compiler::new(&engine).with_cache(cache.as_ref());
    let mut request = CompileRequest::new(input)
        .with_options(options)
        .with_caching(caching)
        .with_write_attachments(
            args.write_attachments
                .unwrap_or(global.config.compile.write_attachments),
        );
    if let Some(path) = &args.output {
        request = request.with_output(path);
    }
    if let Some(extra) = &args.cache_key_extra {
        request = request.with_cache_key_extra(extra);
    }

    let compiled = compiler.run(&request)?;
    debug!(cache = ?compiled.report.cache, "compiled");

    if !global.quiet {
        for notice in &compiled.report.notices {
            eprintln!("warning: {notice}");
        }
    }

    match compiled.output {
        Output::Css(text) => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(text.css.as_bytes())?;
            stdout.flush()?;
        }
        Output::Written(path) => {
            if !global.quiet {
                eprintln!("   Wrote {}", path.display());
            }
        }
    }

    if let Some(cache) = cache {
        let session = cache.close();
        if global.verbose {
            eprintln!(
                "   Cache {} hit(s), {} miss(es), {} store(s)",
                session.hits, session.misses, session.stores
            );
        }
    }
    Ok(0)
}

/// Assembles the input: variables, then files, then text, then attachments.
pub fn build_input(
    args: &CompileArgs,
    stdin_text: Option<String>,
) -> Result<SassInput, Box<dyn std::error::Error>> {
    let mut input = SassInput::new();
    if !args.vars.is_empty() {
        input.push(VariableMap::from_pairs(
            args.vars.iter().map(|(k, v)| (k.as_str(), v.as_str())),
        )?);
    }
    for file in &args.files {
        input.push(FileRef::import(file));
    }
    if let Some(text) = &args.text {
        input.push(text.as_str());
    }
    if let Some(text) = stdin_text {
        input.push(text);
    }
    if !args.attachments.is_empty() {
        let mut layer = Layer::new();
        for (dest, source) in &args.attachments {
            layer = layer.with_attachment(dest, PathBuf::from(source))?;
        }
        input.push(layer);
    }
    Ok(input)
}

/// Starts from the `[compile]` section and applies command-line overrides.
pub fn build_options(args: &CompileArgs, global: &GlobalArgs) -> CompilerOptions {
    let mut options = global.config.compiler_options();
    if let Some(style) = args.style {
        options = options.with_output_style(style);
    }
    if let Some(precision) = args.precision {
        options = options.with_precision(precision);
    }
    if args.indented {
        options = options.with_indented_syntax(true);
    }
    for path in &args.include_paths {
        options = options.with_include_path(path);
    }
    options
}

/// Opens the cache, or returns `None` (after a warning) when it is unusable.
fn open_cache(args: &CompileArgs, global: &GlobalArgs) -> Option<CssCache> {
    let dir = match &args.cache_dir {
        Some(dir) => dir.clone(),
        None => match global.config.cache_dir() {
            Ok(dir) => dir,
            Err(e) => {
                warn!(error = %e, "caching disabled");
                return None;
            }
        },
    };
    let limits = CacheLimits {
        max_size: global.config.cache.max_size,
        max_entries: global.config.cache.max_entries,
    };
    match CssCache::open(&dir, limits) {
        Ok(cache) => Some(cache),
        Err(e) => {
            warn!(error = %e, "caching disabled");
            None
        }
    }
}
