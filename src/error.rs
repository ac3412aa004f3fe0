//! Error types for the lease server.
//!
//! All fallible operations in this crate return [`Result<T>`], which uses
//! the [`Error`] enum for error variants.
//!
//! Protocol-level conditions (malformed messages, address mismatches,
//! requests from unknown clients) are not errors: the request handler
//! answers them with `DHCPNAK` and the server keeps running. Only setup
//! failures and transport problems surface here.

/// Errors that can occur during lease server operation.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// File system or network I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error (config file).
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The address pool is exhausted.
    ///
    /// The pool cursor has reached the end of the generated sequence.
    /// Addresses are never reclaimed, so this condition is permanent until
    /// the process restarts. Handlers translate it into a `DHCPNAK`.
    #[error("No available addresses in pool")]
    PoolExhausted,

    /// Invalid server configuration.
    ///
    /// Returned by [`Config::validate`](crate::Config::validate) when the
    /// configuration contains invalid values (e.g., an empty pool).
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Socket creation or configuration error.
    ///
    /// Typically occurs when binding to port 67 without administrator
    /// privileges. This is the only fatal startup failure.
    #[error("Socket error: {0}")]
    Socket(String),
}

/// A specialized Result type for lease server operations.
pub type Result<T> = std::result::Result<T, Error>;
