//! Terminal size discovery.
//!
//! The size of the terminal attached to stdout wins. When stdout is not a
//! terminal (piped, redirected) the `COLUMNS`/`LINES` environment variables
//! are used, and failing those a classic 80x24.

use terminal_size::{terminal_size, Height, Width};

use crate::catalog::selection::TerminalBounds;

pub const FALLBACK_BOUNDS: TerminalBounds = TerminalBounds {
    columns: 80,
    rows: 24,
};

pub fn query_bounds() -> TerminalBounds {
    if let Some((Width(columns), Height(rows))) = terminal_size() {
        return TerminalBounds::new(columns, rows);
    }
    let bounds = bounds_from_env(|key| std::env::var(key).ok());
    log::debug!(
        "stdout is not a terminal; using {}x{}",
        bounds.columns,
        bounds.rows
    );
    bounds
}

/// Reads `COLUMNS` and `LINES` through `lookup`, each falling back separately.
pub fn bounds_from_env<F>(lookup: F) -> TerminalBounds
where
    F: Fn(&str) -> Option<String>,
{
    let read = |key: &str, fallback: u16| {
        lookup(key)
            .and_then(|value| value.trim().parse::<u16>().ok())
            .filter(|&value| value > 0)
            .unwrap_or(fallback)
    };
    TerminalBounds::new(
        read("COLUMNS", FALLBACK_BOUNDS.columns),
        read("LINES", FALLBACK_BOUNDS.rows),
    )
}
