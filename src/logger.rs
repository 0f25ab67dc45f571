use std::io::{IsTerminal, Write};
use std::time::Instant;

use anstyle::{AnsiColor, Style};
use log::{Level, LevelFilter, Log, Metadata, Record};
use parking_lot::Mutex;

struct RunLogger {
    file: Option<Mutex<std::fs::File>>,
    filter: LevelFilter,
    color: bool,
    start: Instant,
}

impl Log for RunLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.filter
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        let style = if self.color {
            level_style(record.level())
        } else {
            Style::new()
        };
        eprintln!(
            "{}{:<5}{} {}",
            style.render(),
            record.level(),
            style.render_reset(),
            record.args()
        );

        if let Some(ref file) = self.file {
            let elapsed = self.start.elapsed().as_secs_f64();
            let _ = writeln!(
                file.lock(),
                "[{elapsed:.3}s] [{}] {} - {}",
                record.level(),
                record.target(),
                record.args()
            );
        }
    }

    fn flush(&self) {
        if let Some(ref file) = self.file {
            let _ = file.lock().flush();
        }
    }
}

/// Parse a `RUST_LOG`-style level, falling back to `default`.
#[must_use]
pub fn parse_filter(value: Option<&str>, default: LevelFilter) -> LevelFilter {
    value.and_then(|s| s.trim().parse().ok()).unwrap_or(default)
}

/// Initialize the global logger. Must be called once before any logging.
///
/// Records go to stderr and, when given, to `log_file` as well. The level comes from
/// `RUST_LOG` and defaults to warnings.
///
/// # Errors
///
/// Returns an error if a logger has already been installed.
pub fn init(log_file: Option<std::fs::File>) -> Result<(), log::SetLoggerError> {
    let filter = parse_filter(std::env::var("RUST_LOG").ok().as_deref(), LevelFilter::Warn);

    let logger = RunLogger {
        file: log_file.map(Mutex::new),
        filter,
        color: std::io::stderr().is_terminal(),
        start: Instant::now(),
    };

    log::set_boxed_logger(Box::new(logger))?;
    log::set_max_level(filter);
    Ok(())
}

/// Map a log level to the style its label is printed with.
#[must_use]
pub fn level_style(level: Level) -> Style {
    let color = match level {
        Level::Error => AnsiColor::Red,
        Level::Warn => AnsiColor::Yellow,
        Level::Info => AnsiColor::Blue,
        Level::Debug | Level::Trace => AnsiColor::BrightBlack,
    };
    Style::new().fg_color(Some(anstyle::Color::Ansi(color)))
}
