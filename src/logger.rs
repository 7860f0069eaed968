//! Logging utilities with colored output.
//!
//! This module provides:
//! - `log!` macro for formatted terminal output with colored prefixes
//! - `debug!` macro, only printed with `--verbose`
//! - `status_success` / `status_error` for the rebuild outcome block
//!
//! # Example
//!
//! ```ignore
//! log!("task"; "running {}", name);
//! debug!("watch"; "event on {}", path.display());
//! logger::status_success("rebuilt scripts");
//! ```

use crossterm::{
    cursor, execute,
    terminal::{Clear, ClearType},
};
use owo_colors::OwoColorize;
use parking_lot::Mutex;
use std::{
    io::{Write, stdout},
    sync::LazyLock,
    sync::atomic::{AtomicBool, Ordering},
    time::SystemTime,
};

/// Global verbose flag (set by --verbose CLI argument)
static VERBOSE: AtomicBool = AtomicBool::new(false);

/// Set verbose mode globally
pub fn set_verbose(v: bool) {
    VERBOSE.store(v, Ordering::SeqCst);
}

/// Check if verbose mode is enabled
pub fn is_verbose() -> bool {
    VERBOSE.load(Ordering::SeqCst)
}

// ============================================================================
// Log Macro
// ============================================================================

/// Log a message with a colored module prefix
///
/// # Usage
/// ```ignore
/// log!("module"; "message with {} formatting", args);
/// ```
#[macro_export]
macro_rules! log {
    ($module:expr; $($arg:tt)*) => {{
        $crate::logger::log($module, &format!($($arg)*))
    }};
}

/// Log a debug message (only shown when --verbose is enabled)
#[macro_export]
macro_rules! debug {
    ($module:expr; $($arg:tt)*) => {{
        if $crate::logger::is_verbose() {
            $crate::logger::log($module, &format!($($arg)*))
        }
    }};
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Log a message with a colored module prefix
pub fn log(module: &str, message: &str) {
    let prefix = colorize_prefix(&module.to_ascii_lowercase(), module);

    let mut stdout = stdout().lock();
    execute!(stdout, Clear(ClearType::UntilNewLine)).ok();
    writeln!(stdout, "{prefix} {message}").ok();
    stdout.flush().ok();
    STATUS_ON_SCREEN.store(false, Ordering::SeqCst);
}

fn colorize_prefix(module_lower: &str, module: &str) -> String {
    let prefix = format!("[{module}]");
    match module_lower {
        "task" => prefix.bright_blue().bold().to_string(),
        "watch" | "reload" => prefix.bright_green().bold().to_string(),
        "server" | "mock" => prefix.bright_magenta().bold().to_string(),
        "error" | "lint" => prefix.bright_red().bold().to_string(),
        _ => prefix.bright_yellow().bold().to_string(),
    }
}

// ============================================================================
// Rebuild status
// ============================================================================

/// Cleared by every `log!` line: a status block is only overwritten while
/// it is still the last thing on screen.
static STATUS_ON_SCREEN: AtomicBool = AtomicBool::new(false);

static STATUS: LazyLock<Mutex<Status>> = LazyLock::new(|| Mutex::new(Status::default()));

/// Outcome of the latest rebuild. A fixed error disappears as soon as the
/// next rebuild succeeds.
#[derive(Default)]
struct Status {
    lines: usize,
}

impl Status {
    fn show(&mut self, symbol: String, message: &str) {
        let mut stdout = stdout().lock();

        if self.lines > 0 && STATUS_ON_SCREEN.load(Ordering::SeqCst) {
            let lines = u16::try_from(self.lines).unwrap_or(u16::MAX);
            execute!(stdout, cursor::MoveUp(lines), Clear(ClearType::FromCursorDown)).ok();
        }

        let timestamp = format!("[{}]", clock()).dimmed().to_string();
        writeln!(stdout, "{timestamp} {symbol} {message}").ok();
        stdout.flush().ok();

        self.lines = line_count(message);
        STATUS_ON_SCREEN.store(true, Ordering::SeqCst);
    }
}

fn line_count(message: &str) -> usize {
    message.matches('\n').count() + 1
}

/// Wall clock as HH:MM:SS (UTC).
fn clock() -> String {
    let secs = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    format!("{:02}:{:02}:{:02}", (secs / 3600) % 24, (secs / 60) % 60, secs % 60)
}

pub fn status_success(message: &str) {
    STATUS.lock().show("✓".green().to_string(), message);
}

/// `detail` (lint findings, tool output) goes under the summary line.
pub fn status_error(summary: &str, detail: &str) {
    let message = if detail.is_empty() {
        summary.to_string()
    } else {
        format!("{summary}\n{detail}")
    };
    STATUS.lock().show("✗".red().to_string(), &message);
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_count_error_with_detail() {
        let message = "rebuild failed: scripts\napp/foo.js:3 'bar' is not defined\napp/foo.js:9 unexpected token";
        assert_eq!(line_count(message), 3);
    }

    #[test]
    fn test_prefix_contains_module() {
        assert!(colorize_prefix("mock", "mock").contains("[mock]"));
    }

    #[test]
    fn test_clock_format() {
        let time = clock();
        assert_eq!(time.len(), 8);
        assert_eq!(time.matches(':').count(), 2);
    }
}
