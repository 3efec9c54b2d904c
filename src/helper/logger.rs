use crate::config::ENV;
#[cfg(feature = "colored-term")]
use colored::{Color, ColoredString, Colorize};
use log::{Level, LevelFilter, Metadata, Record, SetLoggerError};
use std::{env, str::FromStr};

static LOGGER: ConsoleLogger = ConsoleLogger;

/// A simple [`log`] implementation printing `[level] module > message` lines to stdout
pub struct ConsoleLogger;

impl ConsoleLogger {
    /// Installs the logger. The level filter is read from [`ENV::LOG_LEVEL`] if set, otherwise
    /// `default_level` is used.
    pub fn init(default_level: LevelFilter) -> Result<LevelFilter, SetLoggerError> {
        let level = level_from_env(default_level);
        log::set_logger(&LOGGER)?;
        log::set_max_level(level);
        Ok(level)
    }
}

impl log::Log for ConsoleLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    #[cfg(feature = "colored-term")]
    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let color = match record.level() {
                Level::Error => Color::BrightRed,
                Level::Warn => Color::Yellow,
                Level::Info => Color::Cyan,
                Level::Debug => Color::Magenta,
                Level::Trace => Color::Blue,
            };
            let args = format!("{}", record.args());
            let args = if record.level() == Level::Error {
                // only color error message to make them stand out
                args.color(Color::Red)
            } else {
                ColoredString::from(args.as_str())
            };
            println!(
                "{} {} {} {}",
                level_str(record.level()).color(color),
                record
                    .module_path()
                    .unwrap_or("(unknown module)")
                    .color(color),
                ">".color(color),
                args,
            );
        }
    }

    #[cfg(not(feature = "colored-term"))]
    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            println!(
                "{} {} > {}",
                level_str(record.level()),
                record.module_path().unwrap_or("(unknown module)"),
                record.args(),
            );
        }
    }

    fn flush(&self) {}
}

fn level_from_env(default_level: LevelFilter) -> LevelFilter {
    match env::var(ENV::LOG_LEVEL) {
        Ok(value) => parse_level(&value).unwrap_or_else(|| {
            eprintln!(
                "ignoring invalid {} value '{}', using {}",
                ENV::LOG_LEVEL,
                value,
                default_level
            );
            default_level
        }),
        Err(_) => default_level,
    }
}

fn parse_level(value: &str) -> Option<LevelFilter> {
    LevelFilter::from_str(value.trim()).ok()
}

fn level_str(level: Level) -> &'static str {
    match level {
        Level::Error => "[E]",
        Level::Warn => "[W]",
        Level::Info => "[I]",
        Level::Debug => "[D]",
        Level::Trace => "[T]",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_names_parse_case_insensitively() {
        assert_eq!(parse_level("warn"), Some(LevelFilter::Warn));
        assert_eq!(parse_level(" TRACE "), Some(LevelFilter::Trace));
        assert_eq!(parse_level("off"), Some(LevelFilter::Off));
        assert_eq!(parse_level("loud"), None);
    }
}
