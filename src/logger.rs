use chrono::{DateTime, Utc};
use std::str::FromStr;

/// Environment variable holding the maximum log level (`error` ... `trace`).
pub const LOG_LEVEL_ENV: &str = "CAPSULE_LOG";

pub struct Logger;
impl Logger {
    /// Install the logger. Level comes from [`LOG_LEVEL_ENV`], `info` otherwise.
    ///
    /// Calling this more than once is harmless, only the first call installs.
    pub fn init() {
        let level = parse_level(std::env::var(LOG_LEVEL_ENV).ok().as_deref());
        Self::init_with_level(level);
    }

    pub fn init_with_level(level: log::LevelFilter) {
        if log::set_logger(&LOGGER).is_ok() {
            log::set_max_level(level);
        }
    }
}
impl log::Log for Logger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &log::Record) {
        if self.enabled(record.metadata()) {
            println!("{}", format_record(record, Utc::now()));
        }
    }

    fn flush(&self) {}
}

static LOGGER: Logger = Logger;

fn parse_level(level: Option<&str>) -> log::LevelFilter {
    level
        .and_then(|level| log::LevelFilter::from_str(level.trim()).ok())
        .unwrap_or(log::LevelFilter::Info)
}

/// `HH:MM:SS.mmm LEVEL file:line message`
fn format_record(record: &log::Record, at: DateTime<Utc>) -> String {
    format!(
        "{} {:<5} {}:{} {}",
        at.format("%H:%M:%S%.3f"),
        record.level(),
        record.file().unwrap_or("?"),
        record.line().unwrap_or(0),
        record.args()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_parse_level() {
        assert_eq!(parse_level(Some("debug")), log::LevelFilter::Debug);
        assert_eq!(parse_level(Some(" TRACE ")), log::LevelFilter::Trace);
        assert_eq!(parse_level(Some("off")), log::LevelFilter::Off);
        assert_eq!(parse_level(Some("loud")), log::LevelFilter::Info);
        assert_eq!(parse_level(None), log::LevelFilter::Info);
    }

    #[test]
    fn test_format_record() {
        let at = Utc.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap();
        let line = format_record(
            &log::Record::builder()
                .args(format_args!("Arena cleared"))
                .level(log::Level::Info)
                .file(Some("src/arena/mod.rs"))
                .line(Some(146))
                .build(),
            at,
        );

        assert_eq!(line, "14:05:07.000 INFO  src/arena/mod.rs:146 Arena cleared");
    }
}
