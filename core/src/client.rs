//! Lookup client: request building, response classification and the
//! chunk-by-chunk lookup loop.
//!
//! # Design
//! `LookupClient` keeps the same build/parse split as a host-does-IO client:
//! `build_request` turns a chunk into an `HttpRequest`, `classify` turns the
//! outcome of that request into one verdict per URL. `lookup` drives both
//! through a `Transport`; hosts that do their own I/O (the FFI crate) drive a
//! `LookupSession` directly.
//!
//! Nothing that happens during a lookup is returned as an error. A failed
//! chunk resolves every one of its URLs to `Verdict::Error`, records a
//! `LookupFailure` in the per-call report and overwrites the client's
//! last-error slot.

use log::{debug, warn};
use url::Url;

use crate::batch::{self, Chunk};
use crate::config::{ClientConfig, ClientIdentity};
use crate::error::{ClientError, LookupFailure, SessionError};
use crate::http::{HttpRequest, HttpResponse, StatusClass, Transport, TransportError};
use crate::types::{ChunkResult, LookupReport, ResultMap, Verdict};

/// Message stored for transport failures when `debug` is off.
const UNEXPECTED_RESPONSE: &str = "unexpected server response";

/// Synchronous client for the lookup API.
///
/// Not meant to be shared between concurrent lookups: every lookup takes
/// `&mut self` because it writes the last-error slot.
#[derive(Debug, Clone)]
pub struct LookupClient {
    identity: ClientIdentity,
    endpoint: Url,
    debug: bool,
    report_errors: bool,
    last_error: Option<String>,
}

impl LookupClient {
    pub fn new(config: ClientConfig) -> Result<Self, ClientError> {
        let identity = ClientIdentity::from_config(&config)?;
        let endpoint =
            Url::parse(&config.endpoint).map_err(|source| ClientError::InvalidEndpoint {
                endpoint: config.endpoint.clone(),
                source,
            })?;
        Ok(Self {
            identity,
            endpoint,
            debug: config.debug,
            report_errors: config.report_errors,
            last_error: None,
        })
    }

    pub fn identity(&self) -> &ClientIdentity {
        &self.identity
    }

    /// Diagnostic message of the most recent failure, across all lookups made
    /// with this client.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Look up `urls`, one request per chunk of at most 500 URLs.
    ///
    /// The map is keyed by the URLs exactly as given. When a URL appears more
    /// than once, the verdict of its last occurrence wins.
    pub fn lookup<T, S>(&mut self, transport: &T, urls: &[S]) -> ResultMap
    where
        T: Transport + ?Sized,
        S: AsRef<str>,
    {
        self.lookup_report(transport, urls).results
    }

    /// Like `lookup`, but also returns what went wrong with each chunk.
    pub fn lookup_report<T, S>(&mut self, transport: &T, urls: &[S]) -> LookupReport
    where
        T: Transport + ?Sized,
        S: AsRef<str>,
    {
        let mut session = self.begin(urls);
        let mut outcomes = Vec::with_capacity(session.chunk_count());
        for chunk in batch::chunks(&session.urls) {
            let outcome = transport.send(&self.build_request(&chunk));
            outcomes.push(Some(self.classify(&chunk, outcome)));
        }
        session.outcomes = outcomes;
        session.finish()
    }

    /// Start a lookup whose requests are executed by the caller.
    pub fn begin<S: AsRef<str>>(&self, urls: &[S]) -> LookupSession {
        let session = LookupSession::new(urls.iter().map(|u| u.as_ref().to_string()).collect());
        if self.debug {
            debug!(
                "lookup of {} URLs in {} chunks",
                session.urls.len(),
                session.chunk_count()
            );
        }
        session
    }

    pub fn build_request(&self, chunk: &Chunk<'_>) -> HttpRequest {
        let mut url = self.endpoint.clone();
        url.query_pairs_mut()
            .extend_pairs(self.identity.query_pairs());
        let body = chunk.body();

        if self.debug {
            debug!("BODY:\n{body}\n");
            debug!("URL: {url}");
        }

        HttpRequest {
            url: url.into(),
            headers: vec![("content-type".to_string(), "text/plain".to_string())],
            body,
        }
    }

    /// Classify the outcome of chunk `index` and store it in the session.
    pub fn record(
        &mut self,
        session: &mut LookupSession,
        index: usize,
        outcome: Result<HttpResponse, TransportError>,
    ) -> Result<(), SessionError> {
        let chunks = session.chunk_count();
        let chunk = session
            .chunk(index)
            .ok_or(SessionError::UnknownChunk { index, chunks })?;
        let result = self.classify(&chunk, outcome);
        session.outcomes[index] = Some(result);
        Ok(())
    }

    /// Map the outcome of one request onto a verdict for every URL in `chunk`.
    pub fn classify(
        &mut self,
        chunk: &Chunk<'_>,
        outcome: Result<HttpResponse, TransportError>,
    ) -> ChunkResult {
        let result = match outcome {
            Ok(response) => match response.class() {
                StatusClass::Matched => self.parse_lines(chunk, &response.body),
                StatusClass::NoMatch => {
                    if self.debug {
                        debug!("no match in chunk {}", chunk.index);
                    }
                    uniform(chunk, Verdict::Clean, None)
                }
                StatusClass::BadRequest => {
                    uniform(chunk, Verdict::Error, Some(LookupFailure::InvalidRequest))
                }
                StatusClass::BadCredentials => {
                    uniform(chunk, Verdict::Error, Some(LookupFailure::InvalidApiKey))
                }
                StatusClass::Overloaded => uniform(
                    chunk,
                    Verdict::Error,
                    Some(LookupFailure::ServiceUnavailable),
                ),
                StatusClass::Unexpected(status) => uniform(
                    chunk,
                    Verdict::Error,
                    Some(LookupFailure::UnexpectedStatus(status)),
                ),
            },
            Err(err) => {
                if self.debug {
                    debug!("chunk {} failed: {err}", chunk.index);
                }
                uniform(chunk, Verdict::Error, Some(err.into()))
            }
        };

        if let Some(failure) = &result.failure {
            self.report(failure);
        }
        result
    }

    fn parse_lines(&self, chunk: &Chunk<'_>, body: &str) -> ChunkResult {
        if self.debug {
            debug!("at least one match in chunk {}", chunk.index);
        }
        let lines: Vec<&str> = body.trim().lines().collect();
        if lines.len() != chunk.len() {
            if self.debug {
                debug!("{} / {}\n{body}", chunk.len(), lines.len());
            }
            let failure = LookupFailure::LineCountMismatch {
                sent: chunk.len(),
                received: lines.len(),
            };
            return uniform(chunk, Verdict::Error, Some(failure));
        }

        let mut failure = None;
        let verdicts = chunk
            .urls
            .iter()
            .zip(lines)
            .map(|(url, line)| {
                let verdict = Verdict::from_token(line).unwrap_or_else(|| {
                    failure.get_or_insert_with(|| {
                        LookupFailure::UnrecognizedVerdict(line.trim().to_string())
                    });
                    Verdict::Error
                });
                (url.clone(), verdict)
            })
            .collect();
        ChunkResult { verdicts, failure }
    }

    fn report(&mut self, failure: &LookupFailure) {
        let message = match failure {
            LookupFailure::Transport(_) if !self.debug => UNEXPECTED_RESPONSE.to_string(),
            other => other.to_string(),
        };
        if self.debug || self.report_errors {
            warn!("{message}");
        }
        self.last_error = Some(message);
    }
}

fn uniform(chunk: &Chunk<'_>, verdict: Verdict, failure: Option<LookupFailure>) -> ChunkResult {
    ChunkResult {
        verdicts: chunk.urls.iter().map(|u| (u.clone(), verdict)).collect(),
        failure,
    }
}

/// A lookup whose HTTP round-trips are performed by the caller.
///
/// Outcomes may be recorded in any order; `finish` merges them in chunk
/// order so duplicate URLs resolve the same way as in `LookupClient::lookup`.
#[derive(Debug, Clone)]
pub struct LookupSession {
    urls: Vec<String>,
    outcomes: Vec<Option<ChunkResult>>,
}

impl LookupSession {
    pub fn new(urls: Vec<String>) -> Self {
        let outcomes = vec![None; batch::chunk_count(urls.len())];
        Self { urls, outcomes }
    }

    pub fn chunk_count(&self) -> usize {
        self.outcomes.len()
    }

    pub fn chunk(&self, index: usize) -> Option<Chunk<'_>> {
        batch::chunks(&self.urls).nth(index)
    }

    pub fn is_recorded(&self, index: usize) -> bool {
        matches!(self.outcomes.get(index), Some(Some(_)))
    }

    /// Chunks with no recorded outcome resolve to `Verdict::Error`.
    pub fn finish(self) -> LookupReport {
        let mut report = LookupReport::default();
        for (chunk, outcome) in batch::chunks(&self.urls).zip(self.outcomes) {
            let result = outcome.unwrap_or_else(|| {
                uniform(
                    &chunk,
                    Verdict::Error,
                    Some(LookupFailure::Transport("no response recorded".to_string())),
                )
            });
            report.merge(chunk.index, result);
        }
        report
    }
}
