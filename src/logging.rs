//! `log` backend for the browser console.
//!
//! Native builds leave logger installation to the host (or to nothing at all).

#[cfg(target_arch = "wasm32")]
mod console {
    use log::{Level, LevelFilter, Log, Metadata, Record};
    use wasm_bindgen::JsValue;

    pub struct ConsoleLogger;

    pub static LOGGER: ConsoleLogger = ConsoleLogger;

    impl Log for ConsoleLogger {
        fn enabled(&self, metadata: &Metadata) -> bool {
            metadata.level() <= log::max_level()
        }

        fn log(&self, record: &Record) {
            if !self.enabled(record.metadata()) {
                return;
            }
            let line = JsValue::from_str(&format!("[{}] {}", record.target(), record.args()));
            match record.level() {
                Level::Error => web_sys::console::error_1(&line),
                Level::Warn => web_sys::console::warn_1(&line),
                Level::Info => web_sys::console::log_1(&line),
                Level::Debug | Level::Trace => web_sys::console::debug_1(&line),
            }
        }

        fn flush(&self) {}
    }

    pub fn max_level() -> LevelFilter {
        if cfg!(feature = "debug") {
            LevelFilter::Debug
        } else {
            LevelFilter::Info
        }
    }
}

/// Install the console logger. Safe to call more than once.
#[cfg(target_arch = "wasm32")]
pub fn init() {
    if log::set_logger(&console::LOGGER).is_ok() {
        log::set_max_level(console::max_level());
    }
}

#[cfg(not(target_arch = "wasm32"))]
pub fn init() {}
