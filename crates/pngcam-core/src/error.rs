//! Error handling for pngcam.
//!
//! All error types use `thiserror` for ergonomic error handling. Numerical
//! edge cases inside the toolpath pipeline are deliberately absorbed with
//! sentinel values (infinities and NaN) rather than surfaced as errors; the
//! variants here cover the boundaries of the program: argument validation,
//! input files, and output files.

use thiserror::Error;

/// Main error type for pngcam.
#[derive(Error, Debug)]
pub enum Error {
    /// An input file could not be opened.
    #[error("open {path}: {source}")]
    InputOpen {
        /// Path of the file that could not be opened.
        path: String,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// An input file was opened but could not be decoded.
    #[error("decode {path}: {reason}")]
    InputDecode {
        /// Path of the file that could not be decoded.
        path: String,
        /// A description of the decode failure.
        reason: String,
    },

    /// A command-line argument was invalid.
    #[error("{reason}")]
    BadArgument {
        /// A description of the invalid argument.
        reason: String,
    },

    /// An output file could not be written.
    #[error("write {path}: {reason}")]
    OutputWrite {
        /// Path of the file that could not be written.
        path: String,
        /// A description of the write failure.
        reason: String,
    },
}

impl Error {
    /// Create a `BadArgument` error from a message.
    pub fn bad_argument(reason: impl Into<String>) -> Self {
        Error::BadArgument {
            reason: reason.into(),
        }
    }
}

/// Result type using [`Error`].
pub type Result<T> = std::result::Result<T, Error>;
