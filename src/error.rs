/// Error handling module for Server Warden.
///
/// This module defines the error types returned by every supervisor operation.
/// Each variant corresponds to one error kind that the HTTP layer maps to a
/// status code, so callers can pattern-match instead of inspecting messages.
///
/// # Example
///
/// ```
/// use server_warden::error::{Error, Result};
///
/// fn handle_error(result: Result<()>) {
///     match result {
///         Ok(_) => println!("Operation succeeded"),
///         Err(Error::NotFound(what)) => println!("Missing: {}", what),
///         Err(Error::Conflict(msg)) => println!("Conflict: {}", msg),
///         Err(Error::NotRunning(id)) => println!("Server '{}' is not running", id),
///         Err(e) => println!("Other error: {}", e),
///     }
/// }
/// ```
use thiserror::Error;

/// Errors that can occur in the server-warden library.
#[derive(Error, Debug)]
pub enum Error {
    /// A directory, file, template or executable does not exist.
    ///
    /// This error occurs when:
    /// - The instance directory is missing on start, delete or config update
    /// - The executable is missing from the instance directory
    /// - The requested template archive does not exist
    /// - The console log has never been created
    #[error("Not found: {0}")]
    NotFound(String),

    /// The operation collides with existing state.
    ///
    /// This error occurs when:
    /// - Starting a server that is already running
    /// - Creating a server whose directory already exists
    /// - Another create, delete or start currently holds the id
    #[error("Conflict: {0}")]
    Conflict(String),

    /// The caller supplied a malformed value.
    ///
    /// This error occurs when:
    /// - A template name or server id contains `..` or a path separator
    /// - A configuration payload is not a JSON object
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A filesystem or process operation failed.
    ///
    /// This error occurs when:
    /// - Template extraction fails part way through
    /// - A configuration file cannot be written
    /// - The server executable cannot be spawned
    #[error("I/O failure: {0}")]
    IoFailure(String),

    /// The server has no live process.
    #[error("Server '{0}' is not running")]
    NotRunning(String),

    /// The process survived both the graceful and the forced termination windows.
    #[error("Timeout: {0}")]
    Timeout(String),

    /// The daemon configuration could not be loaded or failed validation.
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Coarse category of an [`Error`], useful when only the kind matters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Conflict,
    InvalidInput,
    IoFailure,
    NotRunning,
    Timeout,
    Config,
}

impl Error {
    /// Returns the category of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::NotFound(_) => ErrorKind::NotFound,
            Error::Conflict(_) => ErrorKind::Conflict,
            Error::InvalidInput(_) => ErrorKind::InvalidInput,
            Error::IoFailure(_) => ErrorKind::IoFailure,
            Error::NotRunning(_) => ErrorKind::NotRunning,
            Error::Timeout(_) => ErrorKind::Timeout,
            Error::Config(_) => ErrorKind::Config,
        }
    }

    pub(crate) fn io(context: impl std::fmt::Display, err: std::io::Error) -> Self {
        Error::IoFailure(format!("{}: {}", context, err))
    }
}

/// Result type for server-warden operations.
///
/// This is a convenience type alias for `std::result::Result` with the `Error` type
/// from this module.
pub type Result<T> = std::result::Result<T, Error>;
