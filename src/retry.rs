//! Bounded retry around a [`Transport`].
//!
//! A fetch is a small state machine: it is `Attempting(i)` until an attempt
//! succeeds (`Success`) or the last allowed attempt fails (`Exhausted`). Every
//! failed attempt is followed by the configured delay, the last one included,
//! so an exhausted fetch always takes at least `times * delay`.

use crate::{
    events::{FetchEvent, FetchObserver},
    request::{count_or, duration_or, PreparedRequest, DEFAULT_RETRY_COUNT, DEFAULT_RETRY_DELAY},
    transport::{LiveResponse, Transport},
    Error, Result,
};
use std::time::Duration;

/// State of a retrying fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryState<T> {
    /// About to perform the given attempt (1-indexed).
    Attempting(usize),
    /// An attempt succeeded.
    Success {
        /// What the attempt produced
        value: T,
        /// The attempt that succeeded
        attempts: usize,
    },
    /// Every allowed attempt failed.
    Exhausted {
        /// The number of attempts made
        attempts: usize,
    },
}

/// How many attempts a fetch gets and how long it waits after each failure.
///
/// # Examples
///
/// ```
/// use resilient_fetch::retry::{RetryPolicy, RetryState};
/// use std::time::Duration;
///
/// let policy = RetryPolicy::new(2, Duration::from_secs(1));
///
/// let state: RetryState<()> = policy.start();
/// assert_eq!(state, RetryState::Attempting(1));
/// assert_eq!(policy.after_failure::<()>(1), RetryState::Attempting(2));
/// assert_eq!(policy.after_failure::<()>(2), RetryState::Exhausted { attempts: 2 });
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    times: usize,
    delay: Duration,
}

impl RetryPolicy {
    /// Creates a policy. Zero values fall back to 3 attempts and 3 seconds.
    pub fn new(times: usize, delay: Duration) -> Self {
        Self {
            times: count_or(times, DEFAULT_RETRY_COUNT),
            delay: duration_or(delay, DEFAULT_RETRY_DELAY),
        }
    }

    /// The policy of a prepared request.
    pub fn for_request(request: &PreparedRequest) -> Self {
        Self::new(request.retry_count, request.retry_delay)
    }

    /// The number of attempts allowed.
    pub fn times(&self) -> usize {
        self.times
    }

    /// The delay after each failed attempt.
    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// The initial state.
    pub fn start<T>(&self) -> RetryState<T> {
        RetryState::Attempting(1)
    }

    /// The state after `attempt` failed.
    pub fn after_failure<T>(&self, attempt: usize) -> RetryState<T> {
        if attempt < self.times {
            RetryState::Attempting(attempt + 1)
        } else {
            RetryState::Exhausted { attempts: attempt }
        }
    }
}

/// A successful fetch with its body still open.
#[derive(Debug)]
pub struct Fetched<B> {
    /// The response of the successful attempt.
    pub response: LiveResponse<B>,
    /// The attempt that succeeded (1-indexed).
    pub attempts: usize,
}

/// Attempts `request` until one attempt succeeds or the policy is exhausted.
///
/// Errors that are not retryable are returned as soon as they occur.
pub(crate) async fn fetch_with_retry<T>(
    transport: &T,
    request: &PreparedRequest,
    observer: &dyn FetchObserver,
) -> Result<Fetched<T::Body>>
where
    T: Transport,
{
    let policy = RetryPolicy::for_request(request);
    let mut state = policy.start();
    let mut last_error = None;

    loop {
        state = match state {
            RetryState::Attempting(attempt) => {
                tracing::debug!(
                    method = %request.method,
                    url = %request.url,
                    attempt = attempt,
                    "Starting attempt"
                );

                match transport.attempt(request).await {
                    Ok(response) => RetryState::Success {
                        value: response,
                        attempts: attempt,
                    },
                    Err(e) if !e.is_retryable() => return Err(e),
                    Err(e) => {
                        observer.on_event(&FetchEvent::AttemptFailed {
                            url: &request.url,
                            attempt,
                            max_attempts: policy.times(),
                            error: &e,
                        });
                        // Also after the final attempt.
                        tokio::time::sleep(policy.delay()).await;
                        last_error = Some(e);
                        policy.after_failure(attempt)
                    }
                }
            }
            RetryState::Success { value, attempts } => {
                return Ok(Fetched {
                    response: value,
                    attempts,
                });
            }
            RetryState::Exhausted { attempts } => {
                observer.on_event(&FetchEvent::Exhausted {
                    url: &request.url,
                    attempts,
                });
                let last_error =
                    last_error.unwrap_or_else(|| Error::Transport("failed to open".into()));
                return Err(Error::FetchExhausted {
                    url: request.url.to_string(),
                    attempts,
                    last_error: Box::new(last_error),
                });
            }
        };
    }
}
