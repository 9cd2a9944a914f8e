use chrono::{DateTime, Local};
use hotcmd::config::Config;
use log::{LevelFilter, Log, Metadata, Record, SetLoggerError};

/// Crate name, used both as target filter and stripped from module paths.
const TARGET: &str = "hotcmd";

pub fn init(config: &Config) -> Result<(), SetLoggerError> {
    log::set_boxed_logger(Box::new(Logger::new(config.loglevel)))?;
    log::set_max_level(config.loglevel);
    Ok(())
}

/// Writes log lines to stderr so stdout only carries command output.
pub struct Logger {
    level: LevelFilter,
}

impl Logger {
    pub fn new(level: LevelFilter) -> Self {
        Self { level }
    }
}

impl Log for Logger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level && metadata.target().starts_with(TARGET)
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            eprintln!("{}", format_line(Local::now(), record));
        }
    }

    fn flush(&self) {}
}

/// Formats a record as `[time] [LEVEL] module: message`. The module is the
/// record target relative to the crate root, `main` for the crate itself.
fn format_line(now: DateTime<Local>, record: &Record) -> String {
    let module = match record.target().strip_prefix(TARGET) {
        Some("") => "main",
        Some(rest) => rest.trim_start_matches("::"),
        None => record.target(),
    };

    format!(
        "[{}] [{:<5}] {}: {}",
        now.format("%Y-%m-%d %H:%M:%S"),
        record.level(),
        module,
        record.args()
    )
}

#[cfg(test)]
mod tests {
    use super::{format_line, Logger};

    use chrono::{Local, TimeZone};
    use log::{Level, LevelFilter, Log, Metadata, Record};

    #[test]
    fn test_format_line() {
        let now = Local.with_ymd_and_hms(2022, 3, 14, 9, 26, 53).unwrap();

        let line = format_line(
            now,
            &Record::builder()
                .level(Level::Info)
                .target("hotcmd::reload")
                .args(format_args!("[RELOAD] Reloaded `ping`"))
                .build(),
        );
        assert_eq!(
            line,
            "[2022-03-14 09:26:53] [INFO ] reload: [RELOAD] Reloaded `ping`"
        );

        let line = format_line(
            now,
            &Record::builder()
                .level(Level::Error)
                .target("hotcmd")
                .args(format_args!("fatal"))
                .build(),
        );
        assert_eq!(line, "[2022-03-14 09:26:53] [ERROR] main: fatal");
    }

    fn metadata(level: Level, target: &str) -> Metadata<'_> {
        Metadata::builder().level(level).target(target).build()
    }

    #[test]
    fn test_enabled() {
        let logger = Logger::new(LevelFilter::Info);

        assert!(logger.enabled(&metadata(Level::Warn, "hotcmd::registry")));
        assert!(!logger.enabled(&metadata(Level::Debug, "hotcmd::registry")));
        assert!(!logger.enabled(&metadata(Level::Error, "tokio::runtime")));
    }
}
