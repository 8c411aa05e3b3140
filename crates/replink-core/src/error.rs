//! Error handling for Replink
//!
//! Provides error types for the layers of the dashboard core:
//! - Transport errors (HTTP/network related)
//! - Validation errors (user input rejected before any network call)
//!
//! All error types use `thiserror` for ergonomic error handling.

use thiserror::Error;

/// Transport error type
///
/// Represents failures of a single HTTP exchange with the machine. These
/// are terminal for the operation that produced them; nothing retries.
#[derive(Error, Debug, Clone)]
pub enum TransportError {
    /// The request never produced an HTTP response
    #[error("Network error: {reason}")]
    Network {
        /// A short description of the network failure.
        reason: String,
    },

    /// The machine answered with a non-success HTTP status
    #[error("{status}")]
    HttpStatus {
        /// The status line, e.g. `500 Internal Server Error`.
        status: String,
    },

    /// The response body could not be decoded as the expected payload
    #[error("Invalid response payload: {reason}")]
    InvalidPayload {
        /// The reason decoding failed.
        reason: String,
    },

    /// The configured base URL is not usable
    #[error("Invalid base URL: {url}")]
    InvalidUrl {
        /// The offending URL.
        url: String,
    },
}

/// Validation error type
///
/// Raised when user input fails local parsing. No command is sent and the
/// field's edit state is left intact so the user can correct it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// The move speed is missing, unparseable, or zero
    #[error("Bad speed")]
    BadSpeed,

    /// A per-field numeric target did not parse
    #[error("Target value for {group} {name} is incorrect")]
    BadTarget {
        /// The field group, e.g. `axis` or `heater`.
        group: String,
        /// The field identifier within the group.
        name: String,
    },

    /// The speed-ratio value did not parse
    #[error("Speed ratio value is incorrect")]
    BadSpeedRatio,

    /// A boolean option's stored value was not `0` or `1`
    #[error("Not 0 or 1")]
    NotZeroOrOne,

    /// A boolean option's entered value was not `false` or `true`
    #[error("Not false or true")]
    NotFalseOrTrue,

    /// A double option's value was not numeric
    #[error("Not a numeric string")]
    NotNumeric,

    /// An IP/MAC address had the wrong number of components
    #[error("Invalid number of address components")]
    AddressComponentCount,

    /// An IP/MAC address component was out of range or malformed
    #[error("Invalid address component")]
    AddressComponent,

    /// An upload destination path was not absolute or named a directory
    #[error("Invalid destination path")]
    BadDestinationPath,
}

/// Main error type for Replink
///
/// A unified error type that can represent any error from all layers.
/// This is the primary error type used in public APIs.
#[derive(Error, Debug)]
pub enum Error {
    /// Transport error
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Validation error
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Standard I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create an error from a string message
    pub fn other(msg: impl Into<String>) -> Self {
        Error::Other(msg.into())
    }

    /// Check if this is a transport error
    pub fn is_transport_error(&self) -> bool {
        matches!(self, Error::Transport(_))
    }

    /// Check if this is a validation error
    pub fn is_validation_error(&self) -> bool {
        matches!(self, Error::Validation(_))
    }
}

/// Result type using Error
pub type Result<T> = std::result::Result<T, Error>;
