//! The fetch entry points.
//!
//! [`Fetcher`] owns a [`Transport`], the defaults applied to unset request
//! settings and the observer that receives progress events. Use
//! [`FetcherBuilder`] to configure and create one.

use crate::{
    document::{self, Document},
    events::{FetchObserver, TracingObserver},
    json,
    request::{FetchDefaults, RequestSpec},
    retry::{self, Fetched},
    transport::{HttpTransport, LiveResponse, Transport},
    Response, Result,
};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// Fetches HTML documents and JSON values with retries.
///
/// Cloning is cheap; clones share the transport, defaults and observer.
///
/// # Examples
///
/// ```no_run
/// use resilient_fetch::{Fetcher, RequestSpec};
/// use scraper::Selector;
/// use std::time::Duration;
///
/// # async fn example() -> Result<(), resilient_fetch::Error> {
/// let fetcher = Fetcher::builder()
///     .retry_delay(Duration::from_secs(1))
///     .build()?;
///
/// let spec = RequestSpec::new("https://example.com/").with_target_encoding("gbk");
/// let page = fetcher.fetch_document(&spec).await?;
///
/// let title = Selector::parse("title").unwrap();
/// for element in page.html.select(&title) {
///     println!("Title: {}", element.text().collect::<String>());
/// }
/// # Ok(())
/// # }
/// ```
pub struct Fetcher<T = HttpTransport> {
    inner: Arc<FetcherInner<T>>,
}

struct FetcherInner<T> {
    transport: T,
    defaults: FetchDefaults,
    observer: Box<dyn FetchObserver>,
}

impl<T> Clone for Fetcher<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl Fetcher<HttpTransport> {
    /// Creates a new `FetcherBuilder` using [`HttpTransport`].
    pub fn builder() -> FetcherBuilder<HttpTransport> {
        FetcherBuilder::new()
    }
}

impl<T: Transport> Fetcher<T> {
    /// The defaults applied to unset request settings.
    pub fn defaults(&self) -> &FetchDefaults {
        &self.inner.defaults
    }

    /// Opens `spec`, retrying failed attempts, and returns the live response.
    ///
    /// The body is left unread; dropping the returned value releases it.
    ///
    /// # Errors
    ///
    /// Returns `FetchExhausted` once every attempt failed, or a configuration
    /// error if `spec` is invalid.
    pub async fn fetch_with_retry(&self, spec: &RequestSpec) -> Result<Fetched<T::Body>> {
        let request = spec.prepare(&self.inner.defaults)?;
        retry::fetch_with_retry(&self.inner.transport, &request, &*self.inner.observer).await
    }

    /// Fetches `spec` and parses the body as an HTML document.
    ///
    /// When `spec.target_encoding` is non-empty the body is transcoded from
    /// that encoding first. Decode failures are not retried.
    ///
    /// # Errors
    ///
    /// Returns `FetchExhausted` if the page could not be opened,
    /// `MalformedDocument` if reading the body failed, or
    /// `TransferTimeout` if reading the body ran past the deadline.
    pub async fn fetch_document(&self, spec: &RequestSpec) -> Result<Response<Document>> {
        let request = spec.prepare(&self.inner.defaults)?;
        let start = Instant::now();

        let Fetched { response, attempts } =
            retry::fetch_with_retry(&self.inner.transport, &request, &*self.inner.observer)
                .await?;
        let LiveResponse {
            status,
            headers,
            body,
        } = response;

        let document = document::decode(body, request.target_encoding).await?;
        let latency = start.elapsed();

        tracing::info!(
            url = %request.url,
            status = status.as_u16(),
            latency_ms = latency.as_millis(),
            attempts = attempts,
            "Received HTML document"
        );

        Ok(Response::new(document, status, headers, latency, attempts, 1))
    }

    /// Fetches `spec` and parses the body as JSON.
    ///
    /// An invalid payload re-issues the whole fetch, up to the request's
    /// retry count. Use `serde_json::Value` for untyped data.
    ///
    /// # Errors
    ///
    /// Returns `FetchExhausted` as soon as one fetch cycle cannot open the URL,
    /// or `MalformedJson` describing the last payload if every cycle returned
    /// invalid data.
    pub async fn fetch_json<R>(&self, spec: &RequestSpec) -> Result<Response<R>>
    where
        R: DeserializeOwned,
    {
        let request = spec.prepare(&self.inner.defaults)?;
        json::fetch_json(&self.inner.transport, &request, &*self.inner.observer).await
    }
}

/// Builder for configuring and creating a [`Fetcher`].
///
/// # Examples
///
/// ```
/// use resilient_fetch::FetcherBuilder;
/// use std::time::Duration;
///
/// let fetcher = FetcherBuilder::new()
///     .connect_timeout(Duration::from_secs(2))
///     .total_timeout(Duration::from_secs(20))
///     .retry_count(5)
///     .retry_delay(Duration::from_millis(500))
///     .build()?;
///
/// assert_eq!(fetcher.defaults().retry_count, 5);
/// # Ok::<(), resilient_fetch::Error>(())
/// ```
pub struct FetcherBuilder<T = HttpTransport> {
    transport: T,
    defaults: FetchDefaults,
    observer: Option<Box<dyn FetchObserver>>,
}

impl FetcherBuilder<HttpTransport> {
    /// Creates a new `FetcherBuilder` with the default settings.
    pub fn new() -> Self {
        Self {
            transport: HttpTransport::new(),
            defaults: FetchDefaults::default(),
            observer: None,
        }
    }
}

impl<T: Transport> FetcherBuilder<T> {
    /// Replaces the transport.
    pub fn transport<U: Transport>(self, transport: U) -> FetcherBuilder<U> {
        FetcherBuilder {
            transport,
            defaults: self.defaults,
            observer: self.observer,
        }
    }

    /// Replaces every default at once.
    pub fn defaults(mut self, defaults: FetchDefaults) -> Self {
        self.defaults = defaults;
        self
    }

    /// Sets the connect timeout used when a request leaves it unset.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.defaults.connect_timeout = timeout;
        self
    }

    /// Sets the total timeout used when a request leaves it unset.
    pub fn total_timeout(mut self, timeout: Duration) -> Self {
        self.defaults.total_timeout = timeout;
        self
    }

    /// Sets the retry count used when a request leaves it unset.
    pub fn retry_count(mut self, count: usize) -> Self {
        self.defaults.retry_count = count;
        self
    }

    /// Sets the retry delay used when a request leaves it unset.
    pub fn retry_delay(mut self, delay: Duration) -> Self {
        self.defaults.retry_delay = delay;
        self
    }

    /// Sets the observer that receives progress events.
    ///
    /// By default events are logged with [`TracingObserver`].
    pub fn observer(mut self, observer: impl FetchObserver + 'static) -> Self {
        self.observer = Some(Box::new(observer));
        self
    }

    /// Builds the configured `Fetcher`.
    ///
    /// # Errors
    ///
    /// Returns an error if any default is zero.
    pub fn build(self) -> Result<Fetcher<T>> {
        self.defaults.validate()?;

        let observer = self
            .observer
            .unwrap_or_else(|| Box::new(TracingObserver));

        Ok(Fetcher {
            inner: Arc::new(FetcherInner {
                transport: self.transport,
                defaults: self.defaults,
                observer,
            }),
        })
    }
}

impl Default for FetcherBuilder<HttpTransport> {
    fn default() -> Self {
        Self::new()
    }
}
