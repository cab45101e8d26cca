//! Unified error type for the mediadex pipeline.
//!
//! All crates funnel their failures into [`Error`], which carries enough
//! context for the CLI to derive a process exit code via
//! [`Error::exit_code`]. Per-file failures are recovered inside the scanner
//! and never reach the top level; only systemic errors do.

/// Unified error type covering all failure modes in mediadex.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// An I/O operation failed.
    #[error("IO error: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// An external tool (ffmpeg, ffprobe) is missing or returned an error.
    #[error("Tool error [{tool}]: {message}")]
    Tool {
        /// Name of the tool that failed.
        tool: String,
        /// Human-readable error description.
        message: String,
    },

    /// Media probing produced output we could not interpret.
    #[error("Probe error: {0}")]
    Probe(String),

    /// Derived-asset generation failed for a source file.
    #[error("Asset error: {0}")]
    Asset(String),

    /// Configuration or input data failed validation.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Writing or assembling the index document failed.
    #[error("Index error: {0}")]
    Index(String),

    /// The scan was cancelled before completion.
    #[error("scan cancelled")]
    Cancelled,

    /// Catch-all for unexpected internal errors.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Map this error to a process exit code, following BSD `sysexits`
    /// where a close match exists.
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::Io { .. } => 74,         // EX_IOERR
            Error::Tool { .. } => 69,       // EX_UNAVAILABLE
            Error::Probe(_) => 65,          // EX_DATAERR
            Error::Asset(_) => 65,          // EX_DATAERR
            Error::Validation(_) => 64,     // EX_USAGE
            Error::Index(_) => 74,          // EX_IOERR
            Error::Cancelled => 130,        // interrupted
            Error::Internal(_) => 70,       // EX_SOFTWARE
        }
    }

    /// Convenience constructor for [`Error::Tool`].
    pub fn tool(tool: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Tool {
            tool: tool.into(),
            message: message.into(),
        }
    }

    /// Convenience constructor for [`Error::Asset`].
    pub fn asset(message: impl Into<String>) -> Self {
        Error::Asset(message.into())
    }

    /// Convenience constructor for [`Error::Index`].
    pub fn index(message: impl Into<String>) -> Self {
        Error::Index(message.into())
    }
}

/// Result alias using the crate-level [`Error`].
pub type Result<T> = std::result::Result<T, Error>;
