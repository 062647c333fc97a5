//! Application-wide error types.
//!
//! Library modules use specific error types via `thiserror`, while
//! `main` uses `anyhow` for convenient error propagation at the top
//! level.
//!
//! # Design
//!
//! - [`Error`]: top-level application error enum, one variant per §7
//!   error kind.
//! - [`ResultExt`]: adds `.with_context()` to any `Result`-like type so
//!   call sites can attach a human-readable breadcrumb without losing the
//!   original error.

use std::path::PathBuf;

/// Application-wide result type.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level application error.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Bad CLI argument or config file content. Fatal at start-up.
    #[error("configuration error: {0}")]
    Config(String),

    /// FIFO path does not exist.
    #[error("missing fifo: {0}")]
    MissingFifo(PathBuf),

    /// Path exists but is not a FIFO.
    #[error("not a fifo: {0}")]
    NotAFifo(PathBuf),

    /// Generic I/O failure (audio pipe reads, tmpfile writes, ...).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// A command-pipe record failed to parse. Never fatal: the record is
    /// logged and discarded.
    #[error("parse error: {0}")]
    Parse(String),

    /// Artwork fetch failed.
    #[error("http error: {0}")]
    Http(String),

    /// Failed to read the system clock.
    #[error("clock error: {0}")]
    Clock(String),

    /// Command-pipe read buffer exceeded its cap and was drained.
    #[error("command buffer overflow, {0} bytes discarded")]
    BufferOverflow(usize),

    /// A `nix` syscall failed.
    #[error("system call failed: {0}")]
    Errno(#[from] nix::Error),

    /// Generic error with context.
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse(message.into())
    }

    pub fn http(message: impl Into<String>) -> Self {
        Self::Http(message.into())
    }

    pub fn clock(message: impl Into<String>) -> Self {
        Self::Clock(message.into())
    }

    pub fn context(self, ctx: impl Into<String>) -> Self {
        Self::WithContext {
            context: ctx.into(),
            source: Box::new(self),
        }
    }
}

/// Extension trait for adding context to Results.
pub trait ResultExt<T> {
    fn with_context(self, ctx: impl Into<String>) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn with_context(self, ctx: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.context(ctx))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, std::io::Error> {
    fn with_context(self, ctx: impl Into<String>) -> Result<T> {
        self.map_err(|e| Error::Io(e).context(ctx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::MissingFifo("/tmp/a".into());
        assert!(err.to_string().contains("/tmp/a"));
    }

    #[test]
    fn test_error_with_context() {
        let err = Error::parse("bad record").context("while parsing command pipe");
        let msg = err.to_string();
        assert!(msg.contains("while parsing command pipe"));
    }

    #[test]
    fn test_result_ext() {
        let result: Result<()> = Err(Error::http("404"));
        let with_ctx = result.with_context("fetching artwork");
        assert!(with_ctx.unwrap_err().to_string().contains("fetching artwork"));
    }
}
