//! Progress reporting.
//!
//! Failed attempts and invalid payloads are reported to a [`FetchObserver`]
//! instead of being written anywhere directly. [`TracingObserver`] is the
//! default and logs through `tracing`; tests install their own observer and
//! assert on the events.

use crate::Error;
use url::Url;

/// Something worth reporting while a fetch is in progress.
#[derive(Debug)]
pub enum FetchEvent<'a> {
    /// A transport attempt failed; the fetch sleeps before going on.
    AttemptFailed {
        /// The URL being fetched
        url: &'a Url,
        /// The attempt that failed (1-indexed)
        attempt: usize,
        /// The number of attempts allowed
        max_attempts: usize,
        /// Why it failed
        error: &'a Error,
    },

    /// Every attempt failed.
    Exhausted {
        /// The URL being fetched
        url: &'a Url,
        /// The number of attempts made
        attempts: usize,
    },

    /// A fetched JSON payload was invalid and the whole fetch is re-issued.
    InvalidPayload {
        /// The URL being fetched
        url: &'a Url,
        /// The fetch cycle that produced the payload (1-indexed)
        fetch: usize,
        /// The number of fetch cycles allowed
        max_fetches: usize,
        /// Why the payload was rejected
        error: &'a Error,
    },
}

/// Receives [`FetchEvent`]s.
///
/// Closures taking `&FetchEvent` implement this trait.
///
/// # Examples
///
/// ```
/// use resilient_fetch::{FetchEvent, FetchObserver};
///
/// struct PrintFailures;
///
/// impl FetchObserver for PrintFailures {
///     fn on_event(&self, event: &FetchEvent<'_>) {
///         if let FetchEvent::AttemptFailed { attempt, .. } = event {
///             eprintln!("attempt {} failed, retrying", attempt);
///         }
///     }
/// }
/// ```
pub trait FetchObserver: Send + Sync {
    /// Called synchronously from within the fetch.
    fn on_event(&self, event: &FetchEvent<'_>);
}

impl<F> FetchObserver for F
where
    F: Fn(&FetchEvent<'_>) + Send + Sync,
{
    fn on_event(&self, event: &FetchEvent<'_>) {
        self(event)
    }
}

/// Logs every event through `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl FetchObserver for TracingObserver {
    fn on_event(&self, event: &FetchEvent<'_>) {
        match event {
            FetchEvent::AttemptFailed {
                url,
                attempt,
                max_attempts,
                error,
            } => {
                tracing::warn!(
                    url = %url,
                    attempt = attempt,
                    max_attempts = max_attempts,
                    error = %error,
                    "Request failed, retrying"
                );
            }
            FetchEvent::Exhausted { url, attempts } => {
                tracing::error!(url = %url, attempts = attempts, "Giving up on request");
            }
            FetchEvent::InvalidPayload {
                url,
                fetch,
                max_fetches,
                error,
            } => {
                tracing::warn!(
                    url = %url,
                    fetch = fetch,
                    max_fetches = max_fetches,
                    error = %error,
                    "Invalid data, refetching"
                );
            }
        }
    }
}
