//! Process-level plumbing: the debug file logger and crash hook.

mod logging;
mod panic_hook;

pub use logging::{
    crash_log_path, init_logging, log_debug, log_debug_content, log_file_path, log_panic,
};
pub use panic_hook::install_panic_hook;
