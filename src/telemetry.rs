use std::env;
use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::OnceLock;

use tracing::Level;
use tracing_subscriber::fmt::time::UtcTime;

use crate::config::AppConfig;
use crate::log_debug;

static TRACING_INIT: OnceLock<()> = OnceLock::new();

/// JSONL trace destination; override with `CYBERCOMPANION_TRACE_LOG`.
pub fn tracing_log_path() -> PathBuf {
    env::var("CYBERCOMPANION_TRACE_LOG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| env::temp_dir().join("cybercompanion_trace.jsonl"))
}

fn trace_level(config: &AppConfig) -> Level {
    if config.log_timings {
        Level::TRACE
    } else {
        Level::DEBUG
    }
}

/// Route orchestration events (transitions, speech decisions, timers) to a JSONL
/// file. Installed at most once; a no-op while logging is off.
pub fn init_tracing(config: &AppConfig) {
    if !config.logging_enabled() {
        return;
    }
    let level = trace_level(config);

    TRACING_INIT.get_or_init(|| {
        let path = tracing_log_path();
        let file = match OpenOptions::new().create(true).append(true).open(&path) {
            Ok(file) => file,
            Err(err) => {
                log_debug(&format!("trace log {} unavailable: {err}", path.display()));
                return;
            }
        };
        let subscriber = tracing_subscriber::fmt()
            .json()
            .with_max_level(level)
            .with_timer(UtcTime::rfc_3339())
            .with_writer(file)
            .with_thread_names(true)
            .with_current_span(false)
            .with_span_list(false)
            .finish();
        if tracing::subscriber::set_global_default(subscriber).is_err() {
            log_debug("another tracing subscriber is already installed");
        }
    });
}
