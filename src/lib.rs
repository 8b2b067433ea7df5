//! # resilient-fetch - HTTP fetching that survives flaky networks
//!
//! resilient-fetch issues one HTTP request at a time with connect and transfer
//! deadlines, retries failed attempts after a fixed delay, and decodes the body
//! either as an HTML document (optionally transcoded from a legacy charset) or
//! as JSON. A JSON payload that fails to parse is treated as a transient
//! upstream glitch and the whole fetch is issued again.
//!
//! ## Quick Start
//!
//! ```no_run
//! use resilient_fetch::{Fetcher, RequestSpec};
//! use serde::Deserialize;
//! use std::time::Duration;
//!
//! #[derive(Deserialize)]
//! struct Quote {
//!     symbol: String,
//!     price: f64,
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), resilient_fetch::Error> {
//!     let fetcher = Fetcher::builder().build()?;
//!
//!     // An HTML page served in GBK
//!     let spec = RequestSpec::new("https://example.com/news")
//!         .with_target_encoding("gbk")
//!         .with_retry_count(5);
//!     let page = fetcher.fetch_document(&spec).await?;
//!     println!("Fetched page in {:?}", page.latency);
//!
//!     // A form POST answered with JSON
//!     let spec = RequestSpec::new("https://example.com/api/quote")
//!         .with_method("POST")
//!         .with_form_field("symbol", "RUST")
//!         .with_total_timeout(Duration::from_secs(30));
//!     let quote = fetcher.fetch_json::<Quote>(&spec).await?;
//!     println!("{} is at {}", quote.data.symbol, quote.data.price);
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Retries
//!
//! Every request carries a retry count and a delay. A failed attempt (connect
//! timeout, transfer timeout or any other network error) is reported to the
//! configured [`FetchObserver`] and followed by the delay, the final attempt
//! included. When all attempts fail the fetch returns
//! [`Error::FetchExhausted`].
//!
//! JSON fetches add a second, outer loop: an unparsable payload re-issues the
//! whole fetch, with fresh transport retries, up to the same retry count.
//!
//! ## Defaults
//!
//! Zero values in a [`RequestSpec`] mean "use the default": 5 s to connect,
//! 10 s for the exchange, 3 attempts and 3 s between attempts. The defaults
//! can be changed per [`Fetcher`] through its builder.
//!
//! ## Quirks
//!
//! - Form fields are sent as the request body whatever the method, GET
//!   included.
//! - Any non-empty target encoding runs the body through the transcoder,
//!   even `"utf-8"`.
//! - Any HTTP status is accepted; only network failures are retried.

mod client;
pub mod document;
mod error;
pub mod events;
mod json;
pub mod request;
mod response;
pub mod retry;
pub mod transport;

#[cfg(test)]
mod testing;

pub use client::{Fetcher, FetcherBuilder};
pub use document::Document;
pub use error::{BoxError, Error, Result};
pub use events::{FetchEvent, FetchObserver, TracingObserver};
pub use request::{FetchDefaults, PreparedRequest, RequestSpec};
pub use response::Response;
pub use retry::{Fetched, RetryPolicy, RetryState};
pub use transport::{HttpTransport, LiveResponse, ResponseBody, Transport};
