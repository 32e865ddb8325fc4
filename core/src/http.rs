//! HTTP transport types for the host-does-IO pattern.
//!
//! # Design
//! Requests and responses are plain data. The core builds `HttpRequest`
//! values and classifies `HttpResponse` values without touching the network;
//! whoever implements `Transport` (the bundled `UreqTransport`, a test double,
//! or a C host through the FFI crate) performs the round-trip.
//!
//! A transport returns every HTTP status as data. `Err(TransportError)` is
//! reserved for requests that never produced a status line, so the classifier
//! can dispatch on a `StatusClass` instead of inspecting error types.

use std::fmt;

use thiserror::Error;

/// A lookup request described as plain data. Lookup requests are always sent
/// as `POST` with a plain-text body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

/// An HTTP response described as plain data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn class(&self) -> StatusClass {
        StatusClass::from_status(self.status)
    }
}

/// What a status code means to the lookup protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusClass {
    /// 2xx other than 204: the body carries one verdict per line.
    Matched,
    /// 204: none of the URLs are listed.
    NoMatch,
    /// 400
    BadRequest,
    /// 401, or 403 where the service means 401.
    BadCredentials,
    /// 503
    Overloaded,
    Unexpected(u16),
}

impl StatusClass {
    pub fn from_status(status: u16) -> Self {
        match status {
            204 => StatusClass::NoMatch,
            200..=299 => StatusClass::Matched,
            400 => StatusClass::BadRequest,
            401 | 403 => StatusClass::BadCredentials,
            503 => StatusClass::Overloaded,
            other => StatusClass::Unexpected(other),
        }
    }
}

/// Coarse category of a failed round-trip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportErrorKind {
    Timeout,
    Connect,
    Io,
    Other,
}

impl fmt::Display for TransportErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TransportErrorKind::Timeout => "timeout",
            TransportErrorKind::Connect => "connection failed",
            TransportErrorKind::Io => "i/o error",
            TransportErrorKind::Other => "transport error",
        };
        f.write_str(s)
    }
}

/// A request that did not produce an HTTP response at all.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {detail}")]
pub struct TransportError {
    pub kind: TransportErrorKind,
    pub detail: String,
}

impl TransportError {
    pub fn new(kind: TransportErrorKind, detail: impl Into<String>) -> Self {
        Self {
            kind,
            detail: detail.into(),
        }
    }
}

/// Executes one lookup request. Implementations must return non-2xx statuses
/// as `Ok(HttpResponse)`.
pub trait Transport {
    fn send(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError>;
}

impl<F> Transport for F
where
    F: Fn(&HttpRequest) -> Result<HttpResponse, TransportError>,
{
    fn send(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        self(request)
    }
}
