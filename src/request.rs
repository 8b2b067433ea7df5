//! Request descriptions and default resolution.
//!
//! A [`RequestSpec`] is what callers fill in. Before any network activity it is
//! resolved against [`FetchDefaults`] into a [`PreparedRequest`], which holds
//! the effective value of every setting. Zero durations and a zero retry count
//! mean "use the default", never "zero".

use crate::{Error, Result};
use bytes::Bytes;
use encoding_rs::Encoding;
use http::{HeaderMap, HeaderName, HeaderValue, Method};
use std::collections::BTreeMap;
use std::time::Duration;
use url::Url;

/// Default time allowed to establish a connection.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Default time allowed for the exchange once dispatched.
pub const DEFAULT_TOTAL_TIMEOUT: Duration = Duration::from_secs(10);

/// Default number of attempts (and of JSON fetch cycles).
pub const DEFAULT_RETRY_COUNT: usize = 3;

/// Default delay after a failed attempt.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(3);

/// Values substituted for unset (zero) fields of a [`RequestSpec`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchDefaults {
    /// Used when `RequestSpec::connect_timeout` is zero.
    pub connect_timeout: Duration,
    /// Used when `RequestSpec::total_timeout` is zero.
    pub total_timeout: Duration,
    /// Used when `RequestSpec::retry_count` is zero.
    pub retry_count: usize,
    /// Used when `RequestSpec::retry_delay` is zero.
    pub retry_delay: Duration,
}

impl FetchDefaults {
    /// Checks that no default is itself zero.
    pub fn validate(&self) -> Result<()> {
        if self.connect_timeout.is_zero() || self.total_timeout.is_zero() {
            return Err(Error::ConfigurationError(
                "Default timeouts must be non-zero".to_string(),
            ));
        }
        if self.retry_count == 0 {
            return Err(Error::ConfigurationError(
                "Default retry count must be at least 1".to_string(),
            ));
        }
        if self.retry_delay.is_zero() {
            return Err(Error::ConfigurationError(
                "Default retry delay must be non-zero".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for FetchDefaults {
    fn default() -> Self {
        Self {
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            total_timeout: DEFAULT_TOTAL_TIMEOUT,
            retry_count: DEFAULT_RETRY_COUNT,
            retry_delay: DEFAULT_RETRY_DELAY,
        }
    }
}

/// Returns `value`, or `default` when `value` is zero.
pub fn duration_or(value: Duration, default: Duration) -> Duration {
    if value.is_zero() {
        default
    } else {
        value
    }
}

/// Returns `value`, or `default` when `value` is zero.
pub fn count_or(value: usize, default: usize) -> usize {
    if value == 0 {
        default
    } else {
        value
    }
}

/// Description of one fetch.
///
/// # Examples
///
/// ```
/// use resilient_fetch::RequestSpec;
/// use std::time::Duration;
///
/// let spec = RequestSpec::new("https://example.com/search")
///     .with_method("POST")
///     .with_header("user-agent", "resilient-fetch")?
///     .with_form_field("q", "rust")
///     .with_retry_count(5)
///     .with_retry_delay(Duration::from_millis(500))
///     .with_target_encoding("gbk");
///
/// assert_eq!(spec.form_fields.get("q").map(String::as_str), Some("rust"));
/// # Ok::<(), resilient_fetch::Error>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct RequestSpec {
    /// The HTTP method. Empty means GET.
    pub method: String,

    /// The absolute URL to fetch.
    pub url: String,

    /// Headers sent verbatim with every attempt.
    pub headers: HeaderMap,

    /// Fields URL-encoded into the request body, whatever the method.
    pub form_fields: BTreeMap<String, String>,

    /// Time allowed to establish a connection. Zero means the default.
    pub connect_timeout: Duration,

    /// Time allowed for the exchange once dispatched. Zero means the default.
    pub total_timeout: Duration,

    /// Number of attempts. Zero means the default.
    pub retry_count: usize,

    /// Delay after each failed attempt. Zero means the default.
    pub retry_delay: Duration,

    /// Label of the encoding HTML bodies are transcoded from. Empty means the
    /// body is used as UTF-8 directly.
    pub target_encoding: String,
}

impl RequestSpec {
    /// Creates a GET request for `url` with every other setting defaulted.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    /// Sets the HTTP method.
    pub fn with_method(mut self, method: impl Into<String>) -> Self {
        self.method = method.into();
        self
    }

    /// Appends a header value. Repeated names keep every value in order.
    ///
    /// # Errors
    ///
    /// Returns an error if the header name or value is invalid.
    pub fn with_header(mut self, name: impl AsRef<str>, value: impl AsRef<str>) -> Result<Self> {
        let name = HeaderName::try_from(name.as_ref())
            .map_err(|e| Error::ConfigurationError(format!("Invalid header name: {}", e)))?;
        let value = HeaderValue::try_from(value.as_ref())
            .map_err(|e| Error::ConfigurationError(format!("Invalid header value: {}", e)))?;
        self.headers.append(name, value);
        Ok(self)
    }

    /// Adds a form field to the request body.
    pub fn with_form_field(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.form_fields.insert(key.into(), value.into());
        self
    }

    /// Adds multiple form fields to the request body.
    pub fn with_form_fields(mut self, fields: impl IntoIterator<Item = (String, String)>) -> Self {
        self.form_fields.extend(fields);
        self
    }

    /// Sets the connect timeout.
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Sets the total timeout.
    pub fn with_total_timeout(mut self, timeout: Duration) -> Self {
        self.total_timeout = timeout;
        self
    }

    /// Sets the number of attempts.
    pub fn with_retry_count(mut self, count: usize) -> Self {
        self.retry_count = count;
        self
    }

    /// Sets the delay after a failed attempt.
    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    /// Sets the encoding label HTML bodies are transcoded from.
    pub fn with_target_encoding(mut self, label: impl Into<String>) -> Self {
        self.target_encoding = label.into();
        self
    }

    /// Resolves every setting to its effective value.
    ///
    /// This is a pure function of `self` and `defaults`; resolving an already
    /// resolved value yields the same value.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is empty or invalid, the method is invalid,
    /// or the target encoding label is unknown.
    pub fn prepare(&self, defaults: &FetchDefaults) -> Result<PreparedRequest> {
        if self.url.trim().is_empty() {
            return Err(Error::ConfigurationError("URL is required".to_string()));
        }
        let url = Url::parse(&self.url)?;

        let method = if self.method.is_empty() {
            Method::GET
        } else {
            Method::from_bytes(self.method.as_bytes())
                .map_err(|e| Error::ConfigurationError(format!("Invalid method: {}", e)))?
        };

        let form_body = if self.form_fields.is_empty() {
            None
        } else {
            let encoded = url::form_urlencoded::Serializer::new(String::new())
                .extend_pairs(&self.form_fields)
                .finish();
            Some(Bytes::from(encoded))
        };

        // Transcoding is requested by any non-empty label, "utf-8" included.
        let target_encoding = if self.target_encoding.is_empty() {
            None
        } else {
            let encoding = Encoding::for_label(self.target_encoding.trim().as_bytes())
                .ok_or_else(|| Error::UnsupportedEncoding(self.target_encoding.clone()))?;
            Some(encoding)
        };

        Ok(PreparedRequest {
            method,
            url,
            headers: self.headers.clone(),
            form_body,
            connect_timeout: duration_or(self.connect_timeout, defaults.connect_timeout),
            total_timeout: duration_or(self.total_timeout, defaults.total_timeout),
            retry_count: count_or(self.retry_count, defaults.retry_count),
            retry_delay: duration_or(self.retry_delay, defaults.retry_delay),
            target_encoding,
        })
    }
}

/// A [`RequestSpec`] with every setting resolved.
#[derive(Debug, Clone)]
pub struct PreparedRequest {
    /// The effective method.
    pub method: Method,
    /// The parsed URL.
    pub url: Url,
    /// Headers sent verbatim.
    pub headers: HeaderMap,
    /// The URL-encoded form, if any fields were given.
    pub form_body: Option<Bytes>,
    /// The effective connect timeout.
    pub connect_timeout: Duration,
    /// The effective total timeout.
    pub total_timeout: Duration,
    /// The effective number of attempts, at least 1.
    pub retry_count: usize,
    /// The effective delay after a failed attempt.
    pub retry_delay: Duration,
    /// The encoding HTML bodies are transcoded from, if any.
    pub target_encoding: Option<&'static Encoding>,
}

impl PreparedRequest {
    /// Returns a fresh copy of the form body for one attempt.
    pub fn body(&self) -> Option<Bytes> {
        self.form_body.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_values_resolve_to_defaults() {
        let prepared = RequestSpec::new("http://example.test/")
            .prepare(&FetchDefaults::default())
            .unwrap();

        assert_eq!(prepared.method, Method::GET);
        assert_eq!(prepared.connect_timeout, Duration::from_secs(5));
        assert_eq!(prepared.total_timeout, Duration::from_secs(10));
        assert_eq!(prepared.retry_count, 3);
        assert_eq!(prepared.retry_delay, Duration::from_secs(3));
        assert!(prepared.form_body.is_none());
        assert!(prepared.target_encoding.is_none());
    }

    #[test]
    fn test_explicit_values_are_kept() {
        let prepared = RequestSpec::new("http://example.test/")
            .with_method("PUT")
            .with_connect_timeout(Duration::from_millis(250))
            .with_total_timeout(Duration::from_secs(1))
            .with_retry_count(7)
            .with_retry_delay(Duration::from_millis(20))
            .prepare(&FetchDefaults::default())
            .unwrap();

        assert_eq!(prepared.method, Method::PUT);
        assert_eq!(prepared.connect_timeout, Duration::from_millis(250));
        assert_eq!(prepared.total_timeout, Duration::from_secs(1));
        assert_eq!(prepared.retry_count, 7);
        assert_eq!(prepared.retry_delay, Duration::from_millis(20));
    }

    #[test]
    fn test_resolution_is_idempotent() {
        let defaults = FetchDefaults::default();
        let once = count_or(0, defaults.retry_count);
        assert_eq!(count_or(once, defaults.retry_count), once);

        let timeout = duration_or(Duration::ZERO, defaults.total_timeout);
        assert_eq!(duration_or(timeout, defaults.total_timeout), timeout);
    }

    #[test]
    fn test_custom_defaults_apply() {
        let defaults = FetchDefaults {
            connect_timeout: Duration::from_secs(1),
            total_timeout: Duration::from_secs(2),
            retry_count: 9,
            retry_delay: Duration::from_millis(5),
        };
        let prepared = RequestSpec::new("http://example.test/")
            .prepare(&defaults)
            .unwrap();

        assert_eq!(prepared.connect_timeout, Duration::from_secs(1));
        assert_eq!(prepared.retry_count, 9);
    }

    #[test]
    fn test_form_fields_are_url_encoded_in_key_order() {
        let prepared = RequestSpec::new("http://example.test/")
            .with_form_field("q", "two words")
            .with_form_field("a", "1&2")
            .prepare(&FetchDefaults::default())
            .unwrap();

        assert_eq!(
            prepared.body().as_deref(),
            Some(&b"a=1%262&q=two+words"[..])
        );
    }

    #[test]
    fn test_any_non_empty_encoding_is_resolved() {
        let prepared = RequestSpec::new("http://example.test/")
            .with_target_encoding("utf-8")
            .prepare(&FetchDefaults::default())
            .unwrap();
        assert_eq!(prepared.target_encoding, Some(encoding_rs::UTF_8));

        let prepared = RequestSpec::new("http://example.test/")
            .with_target_encoding("GBK")
            .prepare(&FetchDefaults::default())
            .unwrap();
        assert_eq!(prepared.target_encoding, Some(encoding_rs::GBK));
    }

    #[test]
    fn test_rejects_invalid_requests() {
        let defaults = FetchDefaults::default();

        assert!(matches!(
            RequestSpec::new("").prepare(&defaults),
            Err(Error::ConfigurationError(_))
        ));
        assert!(matches!(
            RequestSpec::new("not a url").prepare(&defaults),
            Err(Error::InvalidUrl(_))
        ));
        assert!(matches!(
            RequestSpec::new("http://example.test/")
                .with_method("GE T")
                .prepare(&defaults),
            Err(Error::ConfigurationError(_))
        ));
        assert!(matches!(
            RequestSpec::new("http://example.test/")
                .with_target_encoding("klingon")
                .prepare(&defaults),
            Err(Error::UnsupportedEncoding(label)) if label == "klingon"
        ));
    }

    #[test]
    fn test_repeated_headers_keep_all_values() {
        let spec = RequestSpec::new("http://example.test/")
            .with_header("accept", "text/html")
            .unwrap()
            .with_header("accept", "application/json")
            .unwrap();

        let values: Vec<_> = spec.headers.get_all("accept").iter().collect();
        assert_eq!(values, ["text/html", "application/json"]);
        assert!(spec.clone().with_header("bad header", "x").is_err());
    }

    #[test]
    fn test_zero_defaults_are_invalid() {
        let defaults = FetchDefaults {
            retry_count: 0,
            ..FetchDefaults::default()
        };
        assert!(defaults.validate().is_err());
        assert!(FetchDefaults::default().validate().is_ok());
    }
}
