//! Error types for the lookup client.
//!
//! # Design
//! Only `ClientError` ever reaches the caller as an `Err`: it is returned when
//! a client cannot be built. Everything that goes wrong during a lookup is a
//! `LookupFailure`, which degrades the affected URLs to `Verdict::Error` and is
//! recorded as diagnostics instead of being propagated.

use thiserror::Error;

/// Errors returned while building a `LookupClient` or loading its config.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The API key was empty.
    #[error("missing API key")]
    MissingApiKey,

    /// The configured endpoint is not an absolute URL.
    #[error("invalid endpoint {endpoint:?}: {source}")]
    InvalidEndpoint {
        endpoint: String,
        #[source]
        source: url::ParseError,
    },

    /// The config file could not be read.
    #[error("failed to read config file: {0}")]
    ConfigFile(#[from] std::io::Error),

    /// The config document is not valid TOML or is missing required keys.
    #[error("failed to parse config: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// An environment variable held a value of the wrong type.
    #[error("invalid value for {name}: {value:?}")]
    ConfigEnv { name: String, value: String },
}

/// Why a chunk (or a single URL within it) resolved to `Verdict::Error`.
///
/// The `Display` output is the diagnostic message stored in the client's
/// last-error slot.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LookupFailure {
    /// HTTP 400: the service rejected the batch.
    #[error("invalid request")]
    InvalidRequest,

    /// HTTP 401 or 403. The service answers 403 in places where 401 is meant,
    /// so both land here.
    #[error("invalid API key")]
    InvalidApiKey,

    /// HTTP 503: the service is overloaded or the daily quota is exhausted.
    #[error("server error, too many requests")]
    ServiceUnavailable,

    /// The response body did not contain one line per submitted URL.
    #[error("URL/line count mismatch: sent {sent} URLs, received {received} lines")]
    LineCountMismatch { sent: usize, received: usize },

    /// A response line was not one of the known verdict tokens.
    #[error("unrecognized verdict {0:?}")]
    UnrecognizedVerdict(String),

    /// The service answered with a status this client has no rule for.
    #[error("unexpected server response (HTTP {0})")]
    UnexpectedStatus(u16),

    /// The request never produced a response.
    #[error("unexpected server response: {0}")]
    Transport(String),
}

/// Misuse of a `LookupSession` by the host driving it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("chunk {index} out of range, lookup has {chunks} chunks")]
    UnknownChunk { index: usize, chunks: usize },
}

impl From<crate::http::TransportError> for LookupFailure {
    fn from(err: crate::http::TransportError) -> Self {
        LookupFailure::Transport(err.to_string())
    }
}
