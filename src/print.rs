//! Logger for the demo binary, printing every record to stderr.

use log::{Level, LevelFilter, Metadata, Record};
use std::env;

/// Name of the environment variable that overrides the log level.
const LEVEL_VAR: &str = "BUDDY_LOG";

struct Logger {
    level: LevelFilter,
}

impl log::Log for Logger {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record<'_>) {
        if self.enabled(record.metadata()) {
            let mod_path = record
                .module_path_static()
                .or_else(|| record.module_path())
                .unwrap_or("<n/a>");

            eprintln!("[ {:>5} ] [{}] {}", record.level(), mod_path, record.args());
        }
    }

    fn flush(&self) {}
}

/// Everything is logged in debug builds or with the `logging` feature,
/// otherwise only `info` and above.
fn default_level() -> LevelFilter {
    if cfg!(any(debug_assertions, feature = "logging")) {
        LevelFilter::Trace
    } else {
        Level::Info.to_level_filter()
    }
}

pub fn init_logging() {
    let level = env::var(LEVEL_VAR)
        .ok()
        .and_then(|level| level.parse().ok())
        .unwrap_or_else(default_level);

    let logger = Box::leak(Box::new(Logger { level }));
    log::set_logger(logger).expect("failed to init logging");
    log::set_max_level(level);
}
