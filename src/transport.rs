//! Single-attempt HTTP transport.
//!
//! [`Transport`] performs exactly one request/response round-trip. The body of
//! a successful attempt is handed back unread as a [`ResponseBody`]; it is
//! released when dropped, so whoever owns it releases it on every exit path.

use crate::{request::PreparedRequest, Error, Result};
use bytes::{Bytes, BytesMut};
use http::{HeaderMap, StatusCode};
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;

/// Performs one HTTP round-trip.
pub trait Transport: Send + Sync {
    /// The body stream of a response.
    type Body: ResponseBody;

    /// Sends `request` once.
    ///
    /// Implementations apply `request.connect_timeout` to connection setup
    /// and `request.total_timeout` to the remainder of the exchange, reading
    /// the body included. Time spent connecting never shortens the transfer
    /// budget.
    fn attempt(
        &self,
        request: &PreparedRequest,
    ) -> impl Future<Output = Result<LiveResponse<Self::Body>>> + Send;
}

/// A response body that has not been consumed yet.
pub trait ResponseBody: Send {
    /// Returns the next chunk, or `None` once the body is exhausted.
    fn chunk(&mut self) -> impl Future<Output = Result<Option<Bytes>>> + Send;
}

/// Reads `body` to the end and releases it.
pub async fn read_to_end<B: ResponseBody>(mut body: B) -> Result<Bytes> {
    let mut buf = BytesMut::new();
    while let Some(chunk) = body.chunk().await? {
        buf.extend_from_slice(&chunk);
    }
    Ok(buf.freeze())
}

/// A response whose body is still open.
#[derive(Debug)]
pub struct LiveResponse<B> {
    /// The HTTP status code.
    pub status: StatusCode,
    /// The response headers.
    pub headers: HeaderMap,
    /// The unread body.
    pub body: B,
}

/// [`Transport`] backed by `reqwest`.
///
/// A client is built for every attempt so that each attempt opens its own
/// connection with the attempt's connect timeout.
#[derive(Debug, Clone, Default)]
pub struct HttpTransport {
    _private: (),
}

impl HttpTransport {
    /// Creates a new transport.
    pub fn new() -> Self {
        Self::default()
    }

    fn client(&self, request: &PreparedRequest) -> Result<reqwest::Client> {
        reqwest::Client::builder()
            .connect_timeout(request.connect_timeout)
            .build()
            .map_err(|e| Error::ConfigurationError(format!("Failed to build HTTP client: {}", e)))
    }
}

impl Transport for HttpTransport {
    type Body = HttpBody;

    async fn attempt(&self, request: &PreparedRequest) -> Result<LiveResponse<HttpBody>> {
        let client = self.client(request)?;
        let deadline = attempt_deadline(Instant::now(), request);

        tracing::debug!(
            method = %request.method,
            url = %request.url,
            connect_timeout_ms = request.connect_timeout.as_millis(),
            total_timeout_ms = request.total_timeout.as_millis(),
            "Executing HTTP request"
        );

        let mut builder = client
            .request(request.method.clone(), request.url.clone())
            .headers(request.headers.clone());

        // Sent whatever the method, GET included.
        if let Some(body) = request.body() {
            builder = builder.body(body);
        }

        let response = tokio::time::timeout_at(deadline, builder.send())
            .await
            .map_err(|_| Error::TransferTimeout {
                timeout: request.total_timeout,
            })?
            .map_err(|e| classify(e, request.connect_timeout, request.total_timeout))?;

        Ok(LiveResponse {
            status: response.status(),
            headers: response.headers().clone(),
            body: HttpBody {
                response,
                deadline,
                connect_timeout: request.connect_timeout,
                total_timeout: request.total_timeout,
            },
        })
    }
}

/// Body of a `reqwest` response, bounded by the attempt's deadline.
#[derive(Debug)]
pub struct HttpBody {
    response: reqwest::Response,
    deadline: Instant,
    connect_timeout: Duration,
    total_timeout: Duration,
}

impl ResponseBody for HttpBody {
    async fn chunk(&mut self) -> Result<Option<Bytes>> {
        tokio::time::timeout_at(self.deadline, self.response.chunk())
            .await
            .map_err(|_| Error::TransferTimeout {
                timeout: self.total_timeout,
            })?
            .map_err(|e| classify(e, self.connect_timeout, self.total_timeout))
    }
}

/// The absolute deadline of an attempt dispatched at `dispatched`.
///
/// reqwest does not report when the connection is established, so the connect
/// window is added on top of the total timeout: connecting is bounded by
/// `connect_timeout` alone and never shortens the transfer budget.
pub fn attempt_deadline(dispatched: Instant, request: &PreparedRequest) -> Instant {
    dispatched + request.connect_timeout + request.total_timeout
}

fn classify(error: reqwest::Error, connect_timeout: Duration, total_timeout: Duration) -> Error {
    if error.is_connect() && error.is_timeout() {
        Error::ConnectTimeout {
            timeout: connect_timeout,
        }
    } else if error.is_timeout() {
        Error::TransferTimeout {
            timeout: total_timeout,
        }
    } else {
        Error::from(error)
    }
}
