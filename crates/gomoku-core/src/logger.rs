//! Process-wide logging.
//!
//! The vision loop and the arm worker log from different threads, so every
//! line carries the thread name next to the uptime and level:
//!
//! ```text
//! [   1.204s  INFO arm-worker arm::worker] move #0: placed at (3, 4)
//! ```
//!
//! With the `tracing` feature, [`init_tracing`] installs a `tracing-subscriber`
//! instead.

use std::fmt::Write as _;
use std::io::Write as _;
use std::sync::OnceLock;
use std::time::Instant;

use log::{LevelFilter, Log, Metadata, Record};

#[cfg(feature = "tracing")]
use tracing_subscriber::{fmt, fmt::format::FmtSpan, util::SubscriberInitExt, EnvFilter};

struct StderrLogger {
    level: LevelFilter,
    started: Instant,
}

impl StderrLogger {
    fn line(&self, record: &Record) -> String {
        let mut line = String::with_capacity(96);
        let _ = write!(
            line,
            "[{:8.3}s {:>5} {} {}] {}",
            self.started.elapsed().as_secs_f64(),
            record.level(),
            std::thread::current().name().unwrap_or("-"),
            short_target(record.target()),
            record.args()
        );
        line
    }
}

impl Log for StderrLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let line = self.line(record);
            let _ = writeln!(std::io::stderr().lock(), "{line}");
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

/// `gomoku_arm::worker` is shown as `arm::worker`.
fn short_target(target: &str) -> &str {
    target.strip_prefix("gomoku_").unwrap_or(target)
}

/// Install the stderr logger at `level`. Later calls keep the first logger.
pub fn init_with_level(level: LevelFilter) -> Result<(), log::SetLoggerError> {
    static LOGGER: OnceLock<StderrLogger> = OnceLock::new();

    let mut installed_now = false;
    let logger = LOGGER.get_or_init(|| {
        installed_now = true;
        StderrLogger {
            level,
            started: Instant::now(),
        }
    });
    if installed_now {
        log::set_logger(logger)?;
        log::set_max_level(level);
    }
    Ok(())
}

/// Install a `tracing` subscriber on stderr, filtered by `RUST_LOG`
/// (default `info`). Spans are reported when they close.
#[cfg(feature = "tracing")]
pub fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = fmt()
        .with_env_filter(filter)
        .with_span_events(FmtSpan::CLOSE)
        .with_thread_names(true)
        .with_writer(std::io::stderr);
    let _ = if json {
        builder.json().flatten_event(true).finish().try_init()
    } else {
        builder
            .with_timer(fmt::time::Uptime::default())
            .finish()
            .try_init()
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_has_thread_and_short_target() {
        let logger = StderrLogger {
            level: LevelFilter::Info,
            started: Instant::now(),
        };
        let line = std::thread::Builder::new()
            .name("vision".into())
            .spawn(move || {
                logger.line(
                    &Record::builder()
                        .level(log::Level::Warn)
                        .target("gomoku_vision::runner")
                        .args(format_args!("no board"))
                        .build(),
                )
            })
            .expect("spawn")
            .join()
            .expect("join");
        assert!(line.ends_with(" WARN vision vision::runner] no board"), "{line}");
    }

    #[test]
    fn level_filter_applies() {
        let logger = StderrLogger {
            level: LevelFilter::Warn,
            started: Instant::now(),
        };
        let info = Metadata::builder().level(log::Level::Info).build();
        let error = Metadata::builder().level(log::Level::Error).build();
        assert!(!logger.enabled(&info));
        assert!(logger.enabled(&error));
    }
}
