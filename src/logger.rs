use std::io::Write;

use log::{LevelFilter, Metadata, Record};

/// Environment variable that selects the log level when `--debug` is absent.
pub const LOG_ENV: &str = "SMALLSH_LOG";

struct StderrLogger;

static LOGGER: StderrLogger = StderrLogger;

impl log::Log for StderrLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let _ = writeln!(
                std::io::stderr().lock(),
                "[{}] {}: {}",
                record.level(),
                record.target(),
                record.args()
            );
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

/// Installs the stderr logger. A second call keeps the first logger.
pub fn init(level: LevelFilter) {
    if log::set_logger(&LOGGER).is_ok() {
        log::set_max_level(level);
    }
}

/// `--debug` wins; otherwise `SMALLSH_LOG`; otherwise off.
pub fn level(debug: bool, env_value: Option<&str>) -> LevelFilter {
    if debug {
        return LevelFilter::Debug;
    }
    env_value
        .and_then(|value| value.trim().parse().ok())
        .unwrap_or(LevelFilter::Off)
}
