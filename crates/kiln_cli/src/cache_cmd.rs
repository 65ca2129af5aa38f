//! `kiln cache`: inspect and reset the compilation cache.

use std::path::PathBuf;

use kiln_cache::{CacheLimits, CacheStats, CssCache, LimitViolation};
use kiln_common::ByteSize;

use crate::{CacheAction, CacheArgs, GlobalArgs, ReportFormat};

/// Runs the `kiln cache` command.
pub fn run(args: &CacheArgs, global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let dir = match &args.cache_dir {
        Some(dir) => dir.clone(),
        None => global.config.cache_dir()?,
    };

    if args.action == CacheAction::Path {
        println!("{}", dir.display());
        return Ok(0);
    }

    let limits = CacheLimits {
        max_size: global.config.cache.max_size,
        max_entries: global.config.cache.max_entries,
    };
    let cache = CssCache::open(&dir, limits)?;

    match args.action {
        CacheAction::Info { format } => {
            let stats = cache.stats()?;
            let violation = cache.over_limit()?;
            let report = render_info(&dir, &stats, limits, violation, format)?;
            println!("{report}");
        }
        CacheAction::Clear => {
            let removed = cache.clear()?;
            if !global.quiet {
                eprintln!("   Removed {removed} file(s) from {}", dir.display());
            }
        }
        CacheAction::Path => {}
    }
    Ok(0)
}

/// Formats the `kiln cache info` report.
fn render_info(
    dir: &std::path::Path,
    stats: &CacheStats,
    limits: CacheLimits,
    violation: Option<LimitViolation>,
    format: ReportFormat,
) -> Result<String, serde_json::Error> {
    match format {
        ReportFormat::Json => {
            let value = serde_json::json!({
                "dir": PathBuf::from(dir),
                "stats": stats,
                "limits": {
                    "max_size": limits.max_size.map(|s| s.bytes()),
                    "max_entries": limits.max_entries,
                },
                "over_limit": violation.map(|v| v.to_string()),
            });
            serde_json::to_string_pretty(&value)
        }
        ReportFormat::Text => {
            let limit = |v: Option<String>| v.unwrap_or_else(|| "none".to_string());
            let mut out = format!(
                "directory:   {}\nentries:     {}\nsize:        {}\ntemp files:  {}\nmax size:    {}\nmax entries: {}",
                dir.display(),
                stats.entries,
                ByteSize::new(stats.total_bytes),
                stats.temp_files,
                limit(limits.max_size.map(|s| s.to_string())),
                limit(limits.max_entries.map(|n| n.to_string())),
            );
            if let Some(violation) = violation {
                out.push_str(&format!("\nwarning:     {violation}"));
            }
            Ok(out)
        }
    }
}
