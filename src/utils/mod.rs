//! Utilities: logging setup (dynamic level, stderr only) and ANSI stripping
//! for captured CLI output.
//!
//! Key items:
//!   init_logging / derive_level
//!   strip_ansi

use std::borrow::Cow;

/// Logging helpers.
pub mod logging {
    use tracing::Level;
    use tracing_subscriber::EnvFilter;

    /// Map `-v` / `-q` counts to a level. Quiet wins.
    pub fn derive_level(verbose: u8, quiet: bool) -> Level {
        if quiet {
            return Level::ERROR;
        }
        match verbose {
            0 => Level::INFO,
            1 => Level::DEBUG,
            _ => Level::TRACE,
        }
    }

    /// Install the global subscriber. Output goes to stderr: stdout carries
    /// the MCP stream. `RUST_LOG` overrides the derived level.
    pub fn init_logging(level: Level) {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(level.as_str().to_ascii_lowercase()));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_ansi(std::env::var_os("NO_COLOR").is_none())
            .with_target(false)
            .try_init();
    }
}

pub use logging::{derive_level, init_logging};

/// Remove ANSI CSI sequences (`ESC [ … <letter>`) and lone ESC characters.
pub fn strip_ansi(s: &str) -> Cow<'_, str> {
    if !s.contains('\x1b') {
        return Cow::Borrowed(s);
    }
    let mut buf = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '\x1b' {
            buf.push(c);
            continue;
        }
        if chars.peek() == Some(&'[') {
            chars.next();
            // parameters / intermediates until the final byte
            for next in chars.by_ref() {
                if next.is_ascii_alphabetic() {
                    break;
                }
            }
        }
    }
    Cow::Owned(buf)
}
