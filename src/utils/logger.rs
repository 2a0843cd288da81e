use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Compact,
    /// One JSON object per line.
    Json,
}

/// Directive used when `RUST_LOG` is unset. HTTP internals stay at `warn`
/// unless verbose, then request-level detail from this crate shows up.
pub fn default_directive(verbose: bool) -> &'static str {
    if verbose {
        "boardgame_vote=debug,reqwest=info,warn"
    } else {
        "boardgame_vote=info,warn"
    }
}

/// Logs go to stderr; stdout carries leaderboard tables, CSV and JSON.
///
/// Safe to call more than once; later calls are ignored.
pub fn init_logger(format: LogFormat, verbose: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbose)));

    let layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(verbose)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false);

    let layer = match format {
        LogFormat::Compact => layer.compact().boxed(),
        LogFormat::Json => layer.json().boxed(),
    };

    if tracing_subscriber::registry()
        .with(layer.with_filter(filter))
        .try_init()
        .is_err()
    {
        tracing::debug!("Logger already initialised");
    }
}
