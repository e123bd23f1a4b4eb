//! This module provides logging setup and the structured metric hook for the
//! decode pipeline.
//!
//! stdout carries the rendered art, so every log record goes to stderr. The
//! `log_metric!` macro emits `key=value` records at debug level under the
//! `spritefetch::metric` target; they cost nothing unless that level is enabled.

use std::sync::Once;

use log::LevelFilter;

static INIT_LOGGER: Once = Once::new();

/// Level used when neither `RUST_LOG` nor the config names one.
pub const DEFAULT_LOG_LEVEL: LevelFilter = LevelFilter::Warn;

/// Logs a structured key-value metric line at debug level.
///
/// # Example
/// ```
/// use spritefetch::log_metric;
/// let width = 16;
/// log_metric!("event" = "sprite_selected", "width" = &width);
/// ```
#[macro_export]
macro_rules! log_metric {
    ($($key:literal = $value:expr),+ $(,)?) => {
        if log::log_enabled!(target: "spritefetch::metric", log::Level::Debug) {
            let mut parts = Vec::new();
            $(
                parts.push(format!("{}={}", $key, $value));
            )+
            log::debug!(target: "spritefetch::metric", "METRIC {}", parts.join(" "));
        }
    };
}

/// Parses a level name such as `"info"`; unknown names yield `None`.
pub fn parse_level(name: &str) -> Option<LevelFilter> {
    name.trim().parse::<LevelFilter>().ok()
}

/// Installs the stderr logger once per process.
///
/// `RUST_LOG` wins when set; otherwise `level` (from the config) applies,
/// falling back to `DEFAULT_LOG_LEVEL`.
pub fn init_logging(level: Option<&str>) {
    INIT_LOGGER.call_once(|| {
        let mut builder = env_logger::Builder::new();

        builder.is_test(false);
        builder.filter_level(level.and_then(parse_level).unwrap_or(DEFAULT_LOG_LEVEL));
        if let Ok(filters) = std::env::var("RUST_LOG") {
            builder.parse_filters(&filters);
        }

        // Custom formatter: just print the level and message
        builder.format(|buf, record| {
            use std::io::Write;
            writeln!(buf, "[{}] {}", record.level(), record.args())?;
            buf.flush()?;
            Ok(())
        });
        builder.target(env_logger::Target::Stderr);

        let _ = builder.try_init();
    });
}
