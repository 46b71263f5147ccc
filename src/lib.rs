pub mod audio;
pub mod backend;
pub mod config;
pub mod content;
pub mod director;
pub mod entropy;
pub mod error;
pub mod fsm;
pub mod idle;
mod lock;
pub mod mood;
pub mod presence;
pub mod resources;
pub mod runtime;
pub mod script;
pub mod snapshot;
mod telemetry;
pub mod text_chunker;

mod app;

pub(crate) use lock::lock_or_recover;
pub use app::{
    crash_log_path, init_logging, install_panic_hook, log_debug, log_debug_content,
    log_file_path, log_panic,
};
pub use error::CompanionError;
pub use telemetry::{init_tracing, tracing_log_path};
