//! Logging setup shared by `tabsynth-generate` and `tabsynth`.
//!
//! The `-v`/`-q` flags set the level of the tabsynth crates only; every other
//! target stays at `warn` (or `error` when quiet). Setting [`LOG_ENV`]
//! replaces the whole filter with `EnvFilter` directives, for example
//! `TABSYNTH_LOG=warn,tabsynth_core::injector=trace`.

use tracing::Level;
use tracing_subscriber::EnvFilter;

use crate::error::{Result, TabSynthError};

/// Environment variable whose directives override the verbosity flags.
pub const LOG_ENV: &str = "TABSYNTH_LOG";

/// Crate targets that follow the verbosity flags.
const CRATE_TARGETS: [&str; 3] = ["tabsynth_core", "tabsynth_generate", "tabsynth"];

/// Maps CLI verbosity flags to the level of the tabsynth crates.
///
/// `quiet` wins over any verbosity: only errors are shown.
pub fn level_for(verbose: u8, quiet: bool) -> Level {
    match (quiet, verbose) {
        (true, _) => Level::ERROR,
        (false, 0) => Level::INFO,
        (false, 1) => Level::DEBUG,
        (false, _) => Level::TRACE,
    }
}

/// Filter directives for the verbosity flags.
pub fn filter_directives(verbose: u8, quiet: bool) -> String {
    let level = level_for(verbose, quiet).as_str().to_ascii_lowercase();
    let fallback = if quiet { "error" } else { "warn" };
    std::iter::once(fallback.to_string())
        .chain(CRATE_TARGETS.iter().map(|target| format!("{}={}", target, level)))
        .collect::<Vec<_>>()
        .join(",")
}

/// Builds the filter from the flags, or from `env` when it is set and not
/// blank.
///
/// # Errors
/// Returns a configuration error when the directives do not parse.
pub fn build_filter(verbose: u8, quiet: bool, env: Option<&str>) -> Result<EnvFilter> {
    match env.map(str::trim).filter(|directives| !directives.is_empty()) {
        Some(directives) => EnvFilter::try_new(directives).map_err(|e| {
            TabSynthError::configuration(format!(
                "invalid {} value '{}': {}",
                LOG_ENV, directives, e
            ))
        }),
        None => {
            let directives = filter_directives(verbose, quiet);
            EnvFilter::try_new(&directives).map_err(|e| {
                TabSynthError::configuration(format!(
                    "invalid log filter '{}': {}",
                    directives, e
                ))
            })
        }
    }
}

/// Installs the global subscriber, writing to stderr so stdout stays free
/// for reports.
///
/// # Example
/// ```rust,no_run
/// use tabsynth_core::logging::init_logging;
///
/// // tabsynth crates at DEBUG, everything else at WARN
/// init_logging(1, false).expect("Failed to initialize logging");
/// ```
pub fn init_logging(verbose: u8, quiet: bool) -> Result<()> {
    let env = std::env::var(LOG_ENV).ok();
    let filter = build_filter(verbose, quiet, env.as_deref())?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(verbose > 1)
        .without_time()
        .try_init()
        .map_err(|e| {
            TabSynthError::configuration(format!("Failed to initialize logging: {}", e))
        })
}
