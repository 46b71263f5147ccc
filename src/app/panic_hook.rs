use std::panic;
use std::sync::OnceLock;

static PANIC_HOOK_INSTALLED: OnceLock<()> = OnceLock::new();

/// Chain a crash-log writer in front of the existing panic hook. Safe to call repeatedly.
pub fn install_panic_hook() {
    PANIC_HOOK_INSTALLED.get_or_init(|| {
        let previous = panic::take_hook();
        panic::set_hook(Box::new(move |info| {
            crate::log_panic(info);
            let thread = std::thread::current();
            let location = info
                .location()
                .map(|loc| format!("{}:{}", loc.file(), loc.line()))
                .unwrap_or_else(|| "unknown".to_string());
            crate::log_debug(&format!(
                "panic in thread {} at {location}",
                thread.name().unwrap_or("unnamed")
            ));
            crate::log_debug_content(&format!("panic: {info}"));
            previous(info);
        }));
    });
}
