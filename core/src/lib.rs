//! Synchronous client core for the Safe Browsing Lookup API.
//!
//! # Overview
//! Checks URLs against the service's malware and phishing lists. Input of any
//! length is split into chunks of at most 500 URLs, each chunk becomes one
//! request, and every HTTP outcome is mapped back onto a verdict per URL.
//!
//! # Design
//! - `LookupClient` holds the validated identity, the endpoint and a
//!   last-error slot; nothing else survives between lookups.
//! - Request building and response classification never touch the network.
//!   `Transport` executes the round-trip: `UreqTransport` (feature `ureq`),
//!   a test double, or a foreign host driving a `LookupSession`.
//! - Lookups never fail as a whole. Failures become `Verdict::Error` entries
//!   plus a `LookupFailure` in the `LookupReport`.
//!
//! ```no_run
//! use sblookup_core::{ClientConfig, LookupClient, UreqTransport};
//!
//! let config = ClientConfig::from_env()?;
//! let transport = UreqTransport::from_config(&config);
//! let mut client = LookupClient::new(config)?;
//! let results = client.lookup(&transport, &["http://www.gumblar.cn/"]);
//! # Ok::<(), sblookup_core::ClientError>(())
//! ```

pub mod batch;
pub mod client;
pub mod config;
pub mod error;
pub mod http;
#[cfg(feature = "ureq")]
pub mod transport;
pub mod types;

pub use batch::{normalize_url, Chunk, MAX_BATCH_SIZE};
pub use client::{LookupClient, LookupSession};
pub use config::{ClientConfig, ClientIdentity};
pub use error::{ClientError, LookupFailure, SessionError};
pub use http::{HttpRequest, HttpResponse, StatusClass, Transport, TransportError, TransportErrorKind};
#[cfg(feature = "ureq")]
pub use transport::UreqTransport;
pub use types::{ChunkReport, ChunkResult, LookupReport, ResultMap, Verdict};
