//! JSON fetching with re-fetch on invalid payloads.
//!
//! An invalid payload is treated as a transient upstream glitch: the whole
//! fetch is issued again, with a fresh set of transport retries, up to the
//! request's retry count. A fetch that exhausts its transport retries is
//! terminal and is not repeated here.

use crate::{
    events::{FetchEvent, FetchObserver},
    request::{count_or, PreparedRequest, DEFAULT_RETRY_COUNT},
    retry::{self, Fetched},
    transport::{read_to_end, LiveResponse, Transport},
    Error, Response, Result,
};
use http::StatusCode;
use serde::de::DeserializeOwned;
use tokio::time::Instant;

pub(crate) async fn fetch_json<T, R>(
    transport: &T,
    request: &PreparedRequest,
    observer: &dyn FetchObserver,
) -> Result<Response<R>>
where
    T: Transport,
    R: DeserializeOwned,
{
    let start = Instant::now();
    let fetches = count_or(request.retry_count, DEFAULT_RETRY_COUNT);
    let mut last_error = None;

    for fetch in 1..=fetches {
        let Fetched { response, attempts } =
            retry::fetch_with_retry(transport, request, observer).await?;
        let LiveResponse {
            status,
            headers,
            body,
        } = response;

        // The body is consumed, and so released, before the next fetch.
        let decoded = match read_to_end(body).await {
            Ok(bytes) => parse::<R>(&bytes, status, fetch),
            Err(e) => Err(e),
        };

        match decoded {
            Ok(data) => {
                let latency = start.elapsed();
                tracing::info!(
                    url = %request.url,
                    status = status.as_u16(),
                    latency_ms = latency.as_millis(),
                    attempts = attempts,
                    fetches = fetch,
                    "Received JSON response"
                );
                return Ok(Response::new(data, status, headers, latency, attempts, fetch));
            }
            Err(e) => {
                observer.on_event(&FetchEvent::InvalidPayload {
                    url: &request.url,
                    fetch,
                    max_fetches: fetches,
                    error: &e,
                });
                last_error = Some(e);
            }
        }
    }

    Err(last_error.unwrap_or_else(|| {
        Error::ConfigurationError("JSON fetch made no attempts".to_string())
    }))
}

fn parse<R: DeserializeOwned>(bytes: &[u8], status: StatusCode, fetch: usize) -> Result<R> {
    serde_json::from_slice(bytes).map_err(|e| {
        let raw_response = String::from_utf8_lossy(bytes).into_owned();
        tracing::error!(
            error = %e,
            raw_response = %raw_response,
            fetch = fetch,
            "Failed to parse JSON payload"
        );
        Error::MalformedJson {
            raw_response,
            serde_error: e.to_string(),
            status,
            fetches: fetch,
        }
    })
}
