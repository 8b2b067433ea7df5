//! Error types for fetches.
//!
//! Every failure a fetch can produce is a variant of [`Error`]. Transport-level
//! variants are retryable; decode-level variants are not retried locally but a
//! malformed JSON payload does trigger a full re-fetch.

use http::StatusCode;
use std::time::Duration;

/// Boxed cause carried by [`Error::Transport`].
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// The main error type for fetches.
///
/// # Examples
///
/// ```no_run
/// use resilient_fetch::{Error, Fetcher, RequestSpec};
///
/// # async fn example() -> Result<(), Error> {
/// let fetcher = Fetcher::builder().build()?;
/// let spec = RequestSpec::new("https://api.example.com/items");
///
/// match fetcher.fetch_json::<serde_json::Value>(&spec).await {
///     Ok(response) => println!("Items: {}", response.data),
///     Err(Error::FetchExhausted { attempts, last_error, .. }) => {
///         eprintln!("Gave up after {} attempts: {}", attempts, last_error);
///     }
///     Err(Error::MalformedJson { raw_response, .. }) => {
///         eprintln!("Server kept sending garbage: {}", raw_response);
///     }
///     Err(e) => eprintln!("Other error: {}", e),
/// }
/// # Ok(())
/// # }
/// ```
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// The connection was not established within the connect timeout.
    #[error("Connection not established within {timeout:?}")]
    ConnectTimeout {
        /// The effective connect timeout of the attempt
        timeout: Duration,
    },

    /// The request/response exchange did not finish within the total timeout.
    ///
    /// The deadline covers sending the body, reading the headers and reading
    /// every chunk of the response body.
    #[error("Transfer not completed within {timeout:?}")]
    TransferTimeout {
        /// The effective total timeout of the attempt
        timeout: Duration,
    },

    /// Any other network-level failure (DNS, refused connection, reset, ...).
    #[error("Transport error: {0}")]
    Transport(#[source] BoxError),

    /// Every transport attempt of a fetch failed.
    ///
    /// # Fields
    ///
    /// * `url` - The URL that could not be opened
    /// * `attempts` - The number of attempts made
    /// * `last_error` - The error of the final attempt
    #[error("Failed to open {url} after {attempts} attempts: {last_error}")]
    FetchExhausted {
        /// The URL that could not be opened
        url: String,
        /// The number of attempts made
        attempts: usize,
        /// The last error encountered
        last_error: Box<Error>,
    },

    /// The response body could not be turned into an HTML document.
    #[error("Malformed document: {0}")]
    MalformedDocument(String),

    /// The response body was not valid JSON for the requested type.
    ///
    /// When returned from a fetch, every outer fetch cycle produced invalid
    /// data and this describes the last one.
    #[error("Invalid JSON payload after {fetches} fetches (status {status}): {serde_error}")]
    MalformedJson {
        /// The raw response body, lossily decoded as UTF-8
        raw_response: String,
        /// The serde error message
        serde_error: String,
        /// The HTTP status code
        status: StatusCode,
        /// The fetch cycle that produced this payload
        fetches: usize,
    },

    /// The target encoding label is not known.
    #[error("Unsupported encoding: {0}")]
    UnsupportedEncoding(String),

    /// Invalid configuration was provided.
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    /// An invalid URL was provided.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

impl Error {
    /// Returns `true` if retrying the attempt may succeed.
    ///
    /// Timeouts and other transport failures are retryable; everything else
    /// is not.
    ///
    /// ```
    /// use resilient_fetch::Error;
    /// use std::time::Duration;
    ///
    /// let err = Error::ConnectTimeout { timeout: Duration::from_secs(5) };
    /// assert!(err.is_retryable());
    ///
    /// let err = Error::ConfigurationError("bad header".to_string());
    /// assert!(!err.is_retryable());
    /// ```
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::ConnectTimeout { .. } => true,
            Error::TransferTimeout { .. } => true,
            Error::Transport(_) => true,
            Error::FetchExhausted { .. } => false,
            Error::MalformedDocument(_) => false,
            Error::MalformedJson { .. } => false,
            Error::UnsupportedEncoding(_) => false,
            Error::ConfigurationError(_) => false,
            Error::InvalidUrl(_) => false,
        }
    }

    /// Returns `true` for either timeout kind.
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            Error::ConnectTimeout { .. } | Error::TransferTimeout { .. }
        )
    }

    /// Returns the HTTP status code if this error has one.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Error::MalformedJson { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Returns the raw response body if this error has one.
    pub fn raw_response(&self) -> Option<&str> {
        match self {
            Error::MalformedJson { raw_response, .. } => Some(raw_response),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(error: reqwest::Error) -> Self {
        Error::Transport(Box::new(error))
    }
}

/// A specialized `Result` type for fetches.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exhausted_message_names_url_and_cause() {
        let err = Error::FetchExhausted {
            url: "http://example.test/".to_string(),
            attempts: 3,
            last_error: Box::new(Error::TransferTimeout {
                timeout: Duration::from_secs(10),
            }),
        };

        let message = err.to_string();
        assert!(message.contains("http://example.test/"));
        assert!(message.contains("3 attempts"));
        assert!(message.contains("Transfer not completed"));
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_malformed_json_accessors() {
        let err = Error::MalformedJson {
            raw_response: "{not json".to_string(),
            serde_error: "key must be a string".to_string(),
            status: StatusCode::OK,
            fetches: 2,
        };

        assert_eq!(err.status(), Some(StatusCode::OK));
        assert_eq!(err.raw_response(), Some("{not json"));
        assert!(!err.is_timeout());
    }
}
