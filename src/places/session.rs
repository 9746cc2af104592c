//! Request lifecycle for Places searches.
//!
//! A [`SearchSession`] owns everything the search flow mutates: the single
//! in-flight request and the last successful result set. All mutation goes
//! through `&mut self`, so one writer at a time is a compile-time fact.
//!
//! ```text
//!            start_search                 handle_completion
//!   Idle ─────────────────▶ Pending(id) ─────────────────────▶ Idle
//!                             │   ▲
//!              start_search   │   │  (previous id aborted + released)
//!                             └───┘
//! ```
//!
//! Every transfer is tagged with its [`RequestId`]. A completion that no
//! longer matches the pending request is stale and is dropped without
//! touching the cached results.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll, Waker};

use serde::Serialize;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::request::SearchQuery;
use super::response::{PlaceResult, parse_search_response, remote_error_message};
use super::transport::{HttpOutcome, HttpTransport, PlacesTransport};
use crate::config::PlacesConfig;
use crate::error::{ConfigError, SearchError, SessionError, TransportError};
use crate::scene::{Scene, resolve_origin};

/// Identity of one dispatched request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct RequestId(pub u64);

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "req-{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Pending(RequestId),
}

/// Lifetime counters, mostly for status output and tests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SessionStats {
    pub dispatched: u64,
    /// Pending requests aborted by a newer search or an explicit cancel.
    pub cancelled: u64,
    /// Pending slots cleared, by completion or cancellation.
    pub released: u64,
    pub succeeded: u64,
    pub failed: u64,
    pub stale_discarded: u64,
}

type TransferResult = Result<HttpOutcome, TransportError>;

struct PendingRequest {
    id: RequestId,
    query: SearchQuery,
    /// `None` once the transfer result has been handed out.
    handle: Option<JoinHandle<TransferResult>>,
}

/// A finished transfer, still bound to the request that produced it.
#[derive(Debug)]
pub struct Completion {
    pub id: RequestId,
    pub outcome: TransferResult,
}

/// What [`SearchSession::handle_completion`] did with a completion.
#[derive(Debug)]
pub enum CompletionOutcome {
    Succeeded { id: RequestId, count: usize },
    Failed { id: RequestId, error: SearchError },
    Stale { id: RequestId },
}

impl CompletionOutcome {
    pub fn id(&self) -> RequestId {
        match self {
            Self::Succeeded { id, .. } | Self::Failed { id, .. } | Self::Stale { id } => *id,
        }
    }
}

pub struct SearchSession<T: PlacesTransport = HttpTransport> {
    config: PlacesConfig,
    transport: Arc<T>,
    pending: Option<PendingRequest>,
    last_results: Option<Vec<PlaceResult>>,
    next_id: u64,
    stats: SessionStats,
}

impl SearchSession<HttpTransport> {
    /// Session over a real HTTP client built from `config`.
    pub fn connect(config: PlacesConfig) -> anyhow::Result<Self> {
        let transport = HttpTransport::new(config.request_timeout)?;
        Ok(Self::new(config, transport)?)
    }
}

impl<T: PlacesTransport> SearchSession<T> {
    /// Validates `config` up front so a missing key never reaches the wire.
    pub fn new(config: PlacesConfig, transport: T) -> Result<Self, ConfigError> {
        Self::with_shared_transport(config, Arc::new(transport))
    }

    pub fn with_shared_transport(
        config: PlacesConfig,
        transport: Arc<T>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            transport,
            pending: None,
            last_results: None,
            next_id: 1,
            stats: SessionStats::default(),
        })
    }

    pub fn config(&self) -> &PlacesConfig {
        &self.config
    }

    pub fn state(&self) -> SessionState {
        match &self.pending {
            Some(pending) => SessionState::Pending(pending.id),
            None => SessionState::Idle,
        }
    }

    pub fn stats(&self) -> SessionStats {
        self.stats
    }

    /// Query of the in-flight request, if any.
    pub fn pending_query(&self) -> Option<&SearchQuery> {
        self.pending.as_ref().map(|p| &p.query)
    }

    /// Results of the last successful search. `None` until one succeeds.
    pub fn last_results(&self) -> Option<&[PlaceResult]> {
        self.last_results.as_deref()
    }

    /// Start a search with the configured query text.
    pub fn start_search<S: Scene + ?Sized>(&mut self, scene: &S) -> Result<RequestId, SessionError> {
        self.start_search_with(scene, None)
    }

    /// Start a search biased around the scene's origin.
    ///
    /// Any pending request is aborted and released first. Must run inside a
    /// Tokio runtime; the transfer is spawned onto it.
    pub fn start_search_with<S: Scene + ?Sized>(
        &mut self,
        scene: &S,
        query_text: Option<&str>,
    ) -> Result<RequestId, SessionError> {
        let origin = resolve_origin(scene).inspect_err(|e| {
            error!("cannot start places search: {e}");
        })?;
        let runtime = tokio::runtime::Handle::try_current().map_err(|_| SessionError::NoRuntime)?;

        self.cancel();

        let id = RequestId(self.next_id);
        self.next_id += 1;

        let text = query_text.unwrap_or(self.config.query_text.as_str());
        let query = SearchQuery::new(text, origin.latitude, origin.longitude);
        let request = query.to_request(&self.config.endpoint, &self.config.api_key);

        let transport = Arc::clone(&self.transport);
        let handle = runtime.spawn(async move { transport.send(request).await });

        info!(
            request_id = %id,
            query = %query.text_query,
            latitude = query.bias_latitude,
            longitude = query.bias_longitude,
            "dispatched places search"
        );

        self.stats.dispatched += 1;
        self.pending = Some(PendingRequest {
            id,
            query,
            handle: Some(handle),
        });
        Ok(id)
    }

    /// Abort and release the pending request. Its outcome is discarded.
    pub fn cancel(&mut self) -> Option<RequestId> {
        let pending = self.pending.take()?;
        if let Some(handle) = pending.handle {
            handle.abort();
        }
        self.stats.cancelled += 1;
        self.stats.released += 1;
        info!(request_id = %pending.id, "cancelled in-flight places request");
        Some(pending.id)
    }

    /// Suspend until the pending transfer finishes.
    ///
    /// Returns `None` when idle or when this request's completion was already
    /// handed out. Cancel-safe: dropping the future leaves the request pending.
    pub async fn next_completion(&mut self) -> Option<Completion> {
        let pending = self.pending.as_mut()?;
        let handle = pending.handle.as_mut()?;
        let outcome = match handle.await {
            Ok(outcome) => outcome,
            Err(join_err) => Err(TransportError::Task(join_err.to_string())),
        };
        pending.handle = None;
        Some(Completion {
            id: pending.id,
            outcome,
        })
    }

    /// Apply the pending request's outcome if its transfer already finished.
    ///
    /// Never suspends; `None` means idle or still in flight.
    pub fn poll_completion(&mut self) -> Option<CompletionOutcome> {
        let pending = self.pending.as_mut()?;
        let handle = pending.handle.as_mut()?;
        if !handle.is_finished() {
            return None;
        }
        let mut cx = Context::from_waker(Waker::noop());
        let outcome = match Pin::new(handle).poll(&mut cx) {
            Poll::Ready(Ok(outcome)) => outcome,
            Poll::Ready(Err(join_err)) => Err(TransportError::Task(join_err.to_string())),
            Poll::Pending => return None,
        };
        pending.handle = None;
        let completion = Completion {
            id: pending.id,
            outcome,
        };
        Some(self.handle_completion(completion))
    }

    /// Apply a completion: update cached results and release the request.
    pub fn handle_completion(&mut self, completion: Completion) -> CompletionOutcome {
        let Completion { id, outcome } = completion;

        if self.pending.as_ref().map(|p| p.id) != Some(id) {
            self.stats.stale_discarded += 1;
            debug!(request_id = %id, "discarding stale places completion");
            return CompletionOutcome::Stale { id };
        }

        self.pending = None;
        self.stats.released += 1;

        match evaluate(outcome) {
            Ok(places) => {
                info!(
                    request_id = %id,
                    count = places.len(),
                    "Request complete, {} results found:",
                    places.len()
                );
                for place in &places {
                    info!(request_id = %id, "{place}");
                }
                let count = places.len();
                self.last_results = Some(places);
                self.stats.succeeded += 1;
                CompletionOutcome::Succeeded { id, count }
            }
            Err(err) => {
                match err.status() {
                    Some(status) => error!(request_id = %id, status, "places search failed: {err}"),
                    None => error!(request_id = %id, "places search failed: {err}"),
                }
                self.stats.failed += 1;
                CompletionOutcome::Failed { id, error: err }
            }
        }
    }

    /// Wait for the pending request and apply its outcome.
    pub async fn wait_for_completion(&mut self) -> Option<CompletionOutcome> {
        let completion = self.next_completion().await?;
        Some(self.handle_completion(completion))
    }
}

impl<T: PlacesTransport> Drop for SearchSession<T> {
    fn drop(&mut self) {
        if let Some(handle) = self.pending.as_mut().and_then(|p| p.handle.take()) {
            handle.abort();
        }
    }
}

fn evaluate(outcome: TransferResult) -> Result<Vec<PlaceResult>, SearchError> {
    let outcome = outcome?;
    if !outcome.is_success() {
        return Err(SearchError::Remote {
            status: outcome.status,
            message: remote_error_message(&outcome.body),
        });
    }
    let parsed = parse_search_response(&outcome.body)?;
    if let Some(status) = parsed.status.as_deref() {
        debug!(status, "places response status");
    }
    if parsed.places.is_empty() {
        warn!("places search matched nothing");
    }
    Ok(parsed.places)
}
