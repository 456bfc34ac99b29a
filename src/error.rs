use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using the library's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for the promptpack library.
#[derive(Error, Debug, Clone)]
#[non_exhaustive]
pub enum Error {
    /// The input root could not be traversed at all.
    #[error("Cannot traverse input directory '{path}': {message}")]
    Traversal {
        /// Root directory that failed
        path: PathBuf,
        /// Error message
        message: String,
    },

    /// IO error with context about the file path.
    #[error("IO error accessing '{path}': {message}")]
    Io {
        /// Path where the error occurred
        path: PathBuf,
        /// Error message
        message: String,
    },

    /// Prompt template rendering error.
    #[error("Failed to render template '{template}': {message}")]
    Template {
        /// Template name
        template: String,
        /// Error message
        message: String,
    },

    /// Configuration validation error.
    #[error("Invalid configuration: {message}")]
    Config {
        /// Detailed error message
        message: String,
    },

    /// JSON serialization error.
    #[error("Serialization error: {message}")]
    Serialization {
        /// Error message
        message: String,
    },

    /// The producer thread panicked.
    #[error("Producer thread panicked: {message}")]
    ProducerPanic {
        /// Panic payload rendered as text
        message: String,
    },

    /// The consumer stopped receiving before the producer finished.
    #[error("Record stream was cancelled by the consumer")]
    Cancelled,
}

impl Error {
    /// Creates a traversal error for the given root.
    #[must_use]
    pub fn traversal(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Traversal {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Creates an IO error with path context.
    #[must_use]
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            message: source.to_string(),
        }
    }

    /// Creates a configuration error.
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates a template error.
    #[must_use]
    pub fn template(template: impl Into<String>, source: tera::Error) -> Self {
        // tera keeps the useful part of the message in the source chain
        let mut message = source.to_string();
        let mut cause = std::error::Error::source(&source);
        while let Some(inner) = cause {
            message.push_str(": ");
            message.push_str(&inner.to_string());
            cause = inner.source();
        }

        Self::Template {
            template: template.into(),
            message,
        }
    }

    /// Creates a producer panic error from a `catch_unwind` payload.
    #[must_use]
    pub fn producer_panic(payload: &(dyn std::any::Any + Send)) -> Self {
        let message = payload
            .downcast_ref::<&str>()
            .map(|s| (*s).to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown panic payload".to_string());

        Self::ProducerPanic { message }
    }

    /// Returns true if this is an IO error.
    #[must_use]
    pub const fn is_io(&self) -> bool {
        matches!(self, Self::Io { .. })
    }

    /// Returns true if this is a configuration error.
    #[must_use]
    pub const fn is_config(&self) -> bool {
        matches!(self, Self::Config { .. })
    }

    /// Returns true if the input root could not be traversed.
    #[must_use]
    pub const fn is_traversal(&self) -> bool {
        matches!(self, Self::Traversal { .. })
    }

    /// Returns true if the error came from the record stream being dropped.
    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

impl From<tera::Error> for Error {
    fn from(e: tera::Error) -> Self {
        Self::template("unknown", e)
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization {
            message: e.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = Error::config("test message");
        assert!(err.is_config());
        assert!(err.to_string().contains("test message"));
    }

    #[test]
    fn test_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err = Error::io("/tmp/out/a.json", io_err);
        assert!(err.is_io());
        assert!(err.to_string().contains("/tmp/out/a.json"));
    }

    #[test]
    fn test_traversal_error() {
        let err = Error::traversal("./IN", "No such file or directory");
        assert!(err.is_traversal());
        assert!(err.to_string().contains("./IN"));
    }

    #[test]
    fn test_producer_panic_payloads() {
        let from_str: Box<dyn std::any::Any + Send> = Box::new("boom");
        let err = Error::producer_panic(from_str.as_ref());
        assert!(err.to_string().contains("boom"));

        let from_string: Box<dyn std::any::Any + Send> = Box::new(String::from("bang"));
        let err = Error::producer_panic(from_string.as_ref());
        assert!(err.to_string().contains("bang"));

        let opaque: Box<dyn std::any::Any + Send> = Box::new(42_u32);
        let err = Error::producer_panic(opaque.as_ref());
        assert!(err.to_string().contains("unknown panic payload"));
    }

    #[test]
    fn test_error_clone() {
        let err = Error::Cancelled;
        let cloned = err.clone();
        assert!(cloned.is_cancelled());
        assert_eq!(err.to_string(), cloned.to_string());
    }

    #[test]
    fn test_serialization_error() {
        let json_err = serde_json::from_str::<serde_json::Value>("invalid json").unwrap_err();
        let err: Error = json_err.into();
        assert!(err.to_string().contains("Serialization error"));
    }
}
