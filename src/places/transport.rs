//! HTTP transport for Places requests.
//!
//! [`PlacesTransport`] is the seam between the session and the network so
//! the lifecycle can be driven without a live endpoint.

use std::future::Future;
use std::time::Duration;

use reqwest::Client;
use tracing::debug;

use super::request::PlacesRequest;
use crate::error::TransportError;

/// Status line and body of a finished transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpOutcome {
    pub status: u16,
    pub body: String,
}

impl HttpOutcome {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Sends one request and reports what came back.
///
/// A non-2xx status is still `Ok`; `Err` means the transfer itself failed.
pub trait PlacesTransport: Send + Sync + 'static {
    fn send(
        &self,
        request: PlacesRequest,
    ) -> impl Future<Output = Result<HttpOutcome, TransportError>> + Send;
}

/// `reqwest`-backed transport.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    /// Build a client; `timeout` of `None` leaves transfers unbounded.
    pub fn new(timeout: Option<Duration>) -> Result<Self, TransportError> {
        let mut builder =
            Client::builder().user_agent(concat!("places-anchors/", env!("CARGO_PKG_VERSION")));
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| TransportError::Client(e.to_string()))?;
        Ok(Self::from_client(client))
    }

    /// Wrap a preconfigured client (proxies, TLS roots, ...).
    pub fn from_client(client: Client) -> Self {
        Self { client }
    }
}

impl PlacesTransport for HttpTransport {
    fn send(
        &self,
        request: PlacesRequest,
    ) -> impl Future<Output = Result<HttpOutcome, TransportError>> + Send {
        let client = self.client.clone();
        async move {
            let mut builder = client.post(&request.url);
            for (name, value) in request.headers() {
                builder = builder.header(name, value);
            }

            let response = builder
                .body(request.body)
                .send()
                .await
                .map_err(|e| TransportError::Request(e.to_string()))?;

            let status = response.status().as_u16();
            let body = response
                .text()
                .await
                .map_err(|e| TransportError::Body(e.to_string()))?;
            debug!(status, bytes = body.len(), "places transfer finished");

            Ok(HttpOutcome { status, body })
        }
    }
}
