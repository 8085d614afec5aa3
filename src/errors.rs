//! Centralized error handling for deepmip_check
//!
//! Per-unit failures (`MissingFile`, `ExternalTool`, `Data`) are turned into
//! table cells by the orchestrator. `Configuration` is the only kind that
//! stops a run before any work is submitted.

use std::fmt;
use std::path::PathBuf;

/// Main error type for deepmip_check operations
#[derive(Debug)]
pub enum DeepMipError {
    /// Resolved source file does not exist
    MissingFile(PathBuf),

    /// The external regridding tool failed, timed out, or produced no output
    ExternalTool { tool: String, message: String },

    /// A regridded file could not be parsed or lacks required fields
    Data { path: PathBuf, message: String },

    /// Dictionary lookup or option validation failed while enumerating work
    Configuration(String),

    /// NetCDF library errors
    NetCDFError(netcdf::Error),

    /// I/O operation errors
    IoError(std::io::Error),

    /// JSON (de)serialization errors
    JsonError(serde_json::Error),

    /// Thread pool configuration error
    ThreadPoolError(String),

    /// Array shape or dimension error
    ArrayError(ndarray::ShapeError),

    /// A worker or blocking task panicked or was cancelled
    TaskError(String),
}

impl DeepMipError {
    /// Shorthand for a [`DeepMipError::Data`] error on `path`
    pub fn data(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        DeepMipError::Data {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Shorthand for a [`DeepMipError::ExternalTool`] error
    pub fn tool(tool: impl Into<String>, message: impl Into<String>) -> Self {
        DeepMipError::ExternalTool {
            tool: tool.into(),
            message: message.into(),
        }
    }

    /// True for the one error kind that aborts a whole run
    pub fn is_fatal(&self) -> bool {
        matches!(self, DeepMipError::Configuration(_))
    }
}

impl fmt::Display for DeepMipError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeepMipError::MissingFile(path) => write!(f, "File not found: {}", path.display()),
            DeepMipError::ExternalTool { tool, message } => {
                write!(f, "{} failed: {}", tool, message)
            }
            DeepMipError::Data { path, message } => {
                write!(f, "Invalid data in {}: {}", path.display(), message)
            }
            DeepMipError::Configuration(msg) => write!(f, "Configuration error: {}", msg),
            DeepMipError::NetCDFError(e) => write!(f, "NetCDF error: {}", e),
            DeepMipError::IoError(e) => write!(f, "I/O error: {}", e),
            DeepMipError::JsonError(e) => write!(f, "JSON error: {}", e),
            DeepMipError::ThreadPoolError(msg) => write!(f, "Thread pool error: {}", msg),
            DeepMipError::ArrayError(e) => write!(f, "Array error: {}", e),
            DeepMipError::TaskError(msg) => write!(f, "Task error: {}", msg),
        }
    }
}

impl std::error::Error for DeepMipError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DeepMipError::NetCDFError(e) => Some(e),
            DeepMipError::IoError(e) => Some(e),
            DeepMipError::JsonError(e) => Some(e),
            DeepMipError::ArrayError(e) => Some(e),
            _ => None,
        }
    }
}

impl From<netcdf::Error> for DeepMipError {
    fn from(error: netcdf::Error) -> Self {
        DeepMipError::NetCDFError(error)
    }
}

impl From<std::io::Error> for DeepMipError {
    fn from(error: std::io::Error) -> Self {
        DeepMipError::IoError(error)
    }
}

impl From<serde_json::Error> for DeepMipError {
    fn from(error: serde_json::Error) -> Self {
        DeepMipError::JsonError(error)
    }
}

impl From<ndarray::ShapeError> for DeepMipError {
    fn from(error: ndarray::ShapeError) -> Self {
        DeepMipError::ArrayError(error)
    }
}

impl From<tokio::task::JoinError> for DeepMipError {
    fn from(error: tokio::task::JoinError) -> Self {
        DeepMipError::TaskError(error.to_string())
    }
}

/// Result type alias for deepmip_check operations
pub type Result<T> = std::result::Result<T, DeepMipError>;
