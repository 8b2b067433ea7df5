//! Response wrapper that pairs decoded data with details of the fetch.
//!
//! The [`Response`] type wraps the decoded document or JSON value together with
//! the status, headers, total latency and retry counts of the fetch that
//! produced it.

use http::{HeaderMap, StatusCode};
use std::time::Duration;

/// A successfully decoded response.
///
/// # Type Parameters
///
/// * `T` - The type of the decoded data
///
/// # Examples
///
/// ```no_run
/// use resilient_fetch::{Fetcher, RequestSpec};
///
/// # async fn example() -> Result<(), resilient_fetch::Error> {
/// let fetcher = Fetcher::builder().build()?;
/// let spec = RequestSpec::new("https://api.example.com/status");
///
/// let response = fetcher.fetch_json::<serde_json::Value>(&spec).await?;
///
/// println!("Payload: {}", response.data);
/// println!("Status: {}", response.status);
/// println!("Took {:?} over {} fetch cycles", response.latency, response.fetches);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct Response<T> {
    /// The decoded data.
    pub data: T,

    /// The HTTP status code of the response.
    ///
    /// Any status is accepted; a 404 page is still a document.
    pub status: StatusCode,

    /// The response headers.
    pub headers: HeaderMap,

    /// Time from the first attempt until the data was decoded, delays
    /// included.
    pub latency: Duration,

    /// The transport attempts the successful fetch took.
    pub attempts: usize,

    /// The fetch cycles needed. Always `1` for documents; for JSON, each
    /// invalid payload adds a cycle.
    pub fetches: usize,
}

impl<T> Response<T> {
    /// Creates a new `Response`.
    pub fn new(
        data: T,
        status: StatusCode,
        headers: HeaderMap,
        latency: Duration,
        attempts: usize,
        fetches: usize,
    ) -> Self {
        Self {
            data,
            status,
            headers,
            latency,
            attempts,
            fetches,
        }
    }

    /// Maps the response data to a different type using the provided function.
    ///
    /// # Examples
    ///
    /// ```
    /// # use resilient_fetch::Response;
    /// # use http::{HeaderMap, StatusCode};
    /// # use std::time::Duration;
    /// let response = Response::new(
    ///     42,
    ///     StatusCode::OK,
    ///     HeaderMap::new(),
    ///     Duration::from_millis(100),
    ///     1,
    ///     1,
    /// );
    ///
    /// let string_response = response.map(|n| n.to_string());
    /// assert_eq!(string_response.data, "42");
    /// ```
    pub fn map<U, F>(self, f: F) -> Response<U>
    where
        F: FnOnce(T) -> U,
    {
        Response {
            data: f(self.data),
            status: self.status,
            headers: self.headers,
            latency: self.latency,
            attempts: self.attempts,
            fetches: self.fetches,
        }
    }

    /// Returns `true` if anything had to be repeated.
    ///
    /// # Examples
    ///
    /// ```
    /// # use resilient_fetch::Response;
    /// # use http::{HeaderMap, StatusCode};
    /// # use std::time::Duration;
    /// let response = Response::new((), StatusCode::OK, HeaderMap::new(), Duration::ZERO, 1, 2);
    ///
    /// assert!(response.was_retried());
    /// ```
    pub fn was_retried(&self) -> bool {
        self.attempts > 1 || self.fetches > 1
    }

    /// Returns a reference to a header value by name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)?.to_str().ok()
    }
}

impl<T> AsRef<T> for Response<T> {
    fn as_ref(&self) -> &T {
        &self.data
    }
}

impl<T> std::ops::Deref for Response<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.data
    }
}
