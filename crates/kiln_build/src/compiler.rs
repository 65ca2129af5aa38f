//! The compilation orchestrator.
//!
//! Per request:
//!
//! 1. validate options and the output location
//! 2. derive the cache key from the input and every file it imports, unless
//!    caching is off or an import cannot be resolved
//! 3. look the key up (to memory, or straight to the output file)
//! 4. on a miss, assemble the input, compile, and store the result
//! 5. write the output and apply the attachment policy

use std::path::{Path, PathBuf};

use kiln_cache::{CacheKey, CssCache, Fingerprinter};
use kiln_engine::Engine;
use kiln_input::{Attachment, CompilerOptions, SassInput, WriteAttachments};
use tracing::{debug, warn};

use crate::attach;
use crate::error::BuildError;
use crate::notice::Notice;

/// One compilation request.
#[derive(Debug, Clone)]
pub struct CompileRequest {
    /// What to compile.
    pub input: SassInput,
    /// How to compile it.
    pub options: CompilerOptions,
    /// File to write the CSS to. `None` returns the CSS in memory.
    pub output: Option<PathBuf>,
    /// Whether to consult and fill the cache.
    pub caching: bool,
    /// Attachment handling for file outputs.
    pub write_attachments: WriteAttachments,
    /// Extra material mixed into the cache key.
    pub cache_key_extra: Option<String>,
}

impl CompileRequest {
    /// Creates a request with default options, no output file, and caching off.
    pub fn new(input: SassInput) -> Self {
        Self {
            input,
            options: CompilerOptions::default(),
            output: None,
            caching: false,
            write_attachments: WriteAttachments::default(),
            cache_key_extra: None,
        }
    }

    /// Sets the compiler options.
    pub fn with_options(mut self, options: CompilerOptions) -> Self {
        self.options = options;
        self
    }

    /// Writes the CSS to `path` instead of returning it.
    pub fn with_output(mut self, path: impl Into<PathBuf>) -> Self {
        self.output = Some(path.into());
        self
    }

    /// Turns caching on or off.
    pub fn with_caching(mut self, caching: bool) -> Self {
        self.caching = caching;
        self
    }

    /// Sets the attachment policy.
    pub fn with_write_attachments(mut self, mode: WriteAttachments) -> Self {
        self.write_attachments = mode;
        self
    }

    /// Mixes `extra` into the cache key.
    pub fn with_cache_key_extra(mut self, extra: impl Into<String>) -> Self {
        self.cache_key_extra = Some(extra.into());
        self
    }
}

/// Compiled CSS returned in memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CssText {
    /// The CSS.
    pub css: String,
    /// Files the CSS expects to find next to it.
    pub attachments: Vec<Attachment>,
}

/// Where the result went.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Output {
    /// Returned in memory.
    Css(CssText),
    /// Written to the requested file.
    Written(PathBuf),
}

/// How the cache took part in a request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CacheStatus {
    /// Caching was not requested.
    #[default]
    Disabled,
    /// Caching was requested but could not be used.
    Bypassed,
    /// A cached result was used.
    Hit,
    /// Nothing usable was cached; the engine ran.
    Miss,
}

/// Side information about a request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    /// Cache participation.
    pub cache: CacheStatus,
    /// Non-fatal events, in the order they happened.
    pub notices: Vec<Notice>,
}

impl RunReport {
    fn notice(&mut self, notice: Notice) {
        self.notices.push(notice);
    }
}

/// A successful request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Compiled {
    /// The result.
    pub output: Output,
    /// What happened along the way.
    pub report: RunReport,
}

/// Runs compilation requests against an engine and an optional cache.
///
/// Holds only shared references, so one compiler can serve several threads.
#[derive(Clone, Copy)]
pub struct Compiler<'a> {
    engine: &'a dyn Engine,
    cache: Option<&'a CssCache>,
}

impl<'a> Compiler<'a> {
    /// Creates a compiler without a cache.
    pub fn new(engine: &'a dyn Engine) -> Self {
        Self {
            engine,
            cache: None,
        }
    }

    /// Uses `cache` for requests that ask for caching.
    pub fn with_cache(mut self, cache: Option<&'a CssCache>) -> Self {
        self.cache = cache;
        self
    }

    /// Runs one request.
    pub fn run(&self, request: &CompileRequest) -> Result<Compiled, BuildError> {
        request
            .options
            .validate()
            .map_err(BuildError::InvalidOptions)?;
        let output_dir = match &request.output {
            Some(path) => {
                let dir = output_dir(path);
                if !dir.is_dir() {
                    return Err(BuildError::MissingOutputDir(dir.to_path_buf()));
                }
                Some(dir)
            }
            None => None,
        };
        if request.write_attachments == WriteAttachments::Always && output_dir.is_none() {
            return Err(BuildError::AttachmentsWithoutOutput);
        }

        let mut report = RunReport::default();
        let cached = self.resolve_cache(request, &mut report);

        if let Some((cache, key)) = &cached {
            match (&request.output, output_dir) {
                (Some(path), Some(dir)) => {
                    if cache.get_to_file(key, path) {
                        report.cache = CacheStatus::Hit;
                        self.finish_attachments(request, dir, &mut report)?;
                        return Ok(Compiled {
                            output: Output::Written(path.clone()),
                            report,
                        });
                    }
                }
                _ => {
                    if let Some(css) = cache.get_content(key).and_then(utf8) {
                        report.cache = CacheStatus::Hit;
                        return Ok(Compiled {
                            output: Output::Css(CssText {
                                css,
                                attachments: request.input.attachments(),
                            }),
                            report,
                        });
                    }
                }
            }
            report.cache = CacheStatus::Miss;
        }

        let tree = request.input.assemble()?;
        let css = normalize(
            self.engine.compile(&tree, &request.options)?,
            &request.options,
        );

        if let Some((cache, key)) = &cached {
            store(cache, key, &css, &mut report);
        }

        match (&request.output, output_dir) {
            (Some(path), Some(dir)) => {
                std::fs::write(path, css.as_bytes()).map_err(|source| BuildError::Io {
                    path: path.clone(),
                    source,
                })?;
                self.finish_attachments(request, dir, &mut report)?;
                Ok(Compiled {
                    output: Output::Written(path.clone()),
                    report,
                })
            }
            _ => Ok(Compiled {
                output: Output::Css(CssText {
                    css,
                    attachments: request.input.attachments(),
                }),
                report,
            }),
        }
    }

    /// Returns the cache and key to use, or `None` to bypass the cache.
    fn resolve_cache(
        &self,
        request: &CompileRequest,
        report: &mut RunReport,
    ) -> Option<(&'a CssCache, CacheKey)> {
        if !request.caching {
            return None;
        }
        let Some(cache) = self.cache else {
            report.cache = CacheStatus::Bypassed;
            report.notice(Notice::CacheUnavailable {
                reason: "no cache directory is open".to_string(),
            });
            return None;
        };

        let version = self.engine.identifier();
        let key = Fingerprinter::new(&version)
            .with_extra(request.cache_key_extra.as_deref())
            .key(&request.input, &request.options);
        match key {
            Ok(key) => {
                debug!(%key, "cache key");
                Some((cache, key))
            }
            Err(e) => {
                warn!(error = %e, "cannot derive cache key");
                report.cache = CacheStatus::Bypassed;
                report.notice(Notice::CacheUnavailable {
                    reason: e.to_string(),
                });
                None
            }
        }
    }

    fn finish_attachments(
        &self,
        request: &CompileRequest,
        dir: &Path,
        report: &mut RunReport,
    ) -> Result<(), BuildError> {
        let attachments = request.input.attachments();
        if let Some(notice) = attach::apply(&attachments, dir, request.write_attachments)? {
            report.notice(notice);
        }
        Ok(())
    }
}

/// Stores a fresh result; failures only produce notices.
fn store(cache: &CssCache, key: &CacheKey, css: &str, report: &mut RunReport) {
    if let Err(e) = cache.set_content(key, css.as_bytes()) {
        report.notice(Notice::CacheWriteFailed {
            reason: e.to_string(),
        });
        return;
    }
    match cache.over_limit() {
        Ok(Some(violation)) => {
            warn!(%violation, "cache over limit");
            report.notice(Notice::CacheOverLimit(violation));
        }
        Ok(None) => {}
        Err(e) => debug!(error = %e, "cannot check cache limits"),
    }
}

fn utf8(bytes: Vec<u8>) -> Option<String> {
    match String::from_utf8(bytes) {
        Ok(css) => Some(css),
        Err(e) => {
            debug!(error = %e, "cached entry is not UTF-8");
            None
        }
    }
}

/// Makes non-empty CSS end in exactly one line terminator.
fn normalize(css: String, options: &CompilerOptions) -> String {
    let body = css.trim_end_matches(['\n', '\r']);
    if body.is_empty() {
        return String::new();
    }
    let mut out = String::with_capacity(body.len() + 2);
    out.push_str(body);
    out.push_str(options.linefeed().as_str());
    out
}

fn output_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    }
}
