//! Log setup for `luigi-node`.
//!
//! Ledger operations log through `tracing` in all three crates. This module
//! installs the one subscriber that renders them, on stderr, leaving stdout
//! to the `deploy`, `status` and `interact` output.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Directives applied when `RUST_LOG` is unset: the three ledger crates and
/// the HTTP trace layer at `info`.
pub const DEFAULT_FILTER: &str =
    "luigi_node=info,luigi_contracts=info,luigi_protocol=info,tower_http=info";

/// Rendering selected by `--log-format` / `LUIGI_LOG_FORMAT`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// One colored line per event with file and line.
    Pretty,
    /// One JSON object per event.
    Json,
}

impl LogFormat {
    /// `"json"` in any case selects [`LogFormat::Json`]; anything else is
    /// [`LogFormat::Pretty`].
    pub fn from_str_lossy(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "json" => LogFormat::Json,
            _ => LogFormat::Pretty,
        }
    }
}

/// Installs the global subscriber. `main` calls it once, before any
/// subcommand runs; a second call panics inside `tracing_subscriber`.
///
/// `RUST_LOG` replaces `directives` when set. Per-operation detail (every
/// committed mint, transfer, deposit) is at `debug`:
///
/// ```text
/// RUST_LOG=luigi_contracts=debug,luigi_node=debug
/// ```
pub fn init_logging(directives: &str, format: LogFormat) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directives));

    match format {
        LogFormat::Pretty => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(
                    fmt::layer()
                        .with_writer(std::io::stderr)
                        .with_target(true)
                        .with_thread_ids(false)
                        .with_file(true)
                        .with_line_number(true),
                )
                .init();
        }
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().json().with_writer(std::io::stderr).with_target(true))
                .init();
        }
    }

    tracing::debug!(?format, "log subscriber installed");
}
