//! Log initialization.
//!
//! Library crates only emit `tracing` events; the binary decides where they
//! go. Everything is written to stderr so stdout stays clean for CSS.

use tracing_subscriber::EnvFilter;

/// Level used when neither flags nor configuration choose one.
const DEFAULT_DIRECTIVE: &str = "warn";

/// Picks the filter directive. Flags win over `KILN_LOG` and `[log] level`.
pub fn directive(quiet: bool, verbose: bool, configured: Option<&str>) -> String {
    if quiet {
        "error".to_string()
    } else if verbose {
        "debug".to_string()
    } else {
        configured.unwrap_or(DEFAULT_DIRECTIVE).to_string()
    }
}

/// Installs the global subscriber.
///
/// An unparsable directive falls back to the default level.
pub fn init(quiet: bool, verbose: bool, configured: Option<&str>) {
    let directive = directive(quiet, verbose, configured);
    let filter = EnvFilter::try_new(&directive).unwrap_or_else(|e| {
        eprintln!("warning: ignoring log filter '{directive}': {e}");
        EnvFilter::new(DEFAULT_DIRECTIVE)
    });
    if let Err(e) = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(verbose)
        .without_time()
        .try_init()
    {
        eprintln!("warning: logging unavailable: {e}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_override_configuration() {
        assert_eq!(directive(true, false, Some("debug")), "error");
        assert_eq!(directive(false, true, Some("error")), "debug");
        assert_eq!(directive(false, false, Some("kiln_cache=debug")), "kiln_cache=debug");
        assert_eq!(directive(false, false, None), "warn");
    }

    #[test]
    fn repeated_init_does_not_panic() {
        init(true, false, None);
        init(false, true, Some("not a [valid directive"));
    }
}
