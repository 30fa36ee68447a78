//! Plain-data HTTP types and the transport seam.
//!
//! # Design
//! The client builds an `HttpRequest` and hands it to a `Transport`, which
//! performs the blocking round-trip and returns an `HttpResponse`. Any HTTP
//! library can sit behind the trait; `UreqTransport` is the bundled default.
//!
//! The response body is a reader rather than a buffer so that a failure while
//! reading it can be told apart from a failure to connect.

use std::fmt;
use std::io::{Cursor, Read};

/// Boxed error type carried by transport failures.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// HTTP method for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Patch,
    Delete,
}

impl HttpMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An HTTP request described as plain data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

impl HttpRequest {
    /// First value of the header `name`, compared case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// An HTTP response returned by a `Transport`.
///
/// The body has not been read yet; the client drains it exactly once.
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Box<dyn Read>,
}

impl HttpResponse {
    pub fn new(status: u16, headers: Vec<(String, String)>, body: impl Read + 'static) -> Self {
        Self {
            status,
            headers,
            body: Box::new(body),
        }
    }

    /// Response whose body is already fully buffered.
    pub fn from_bytes(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self::new(status, Vec::new(), Cursor::new(body.into()))
    }
}

impl fmt::Debug for HttpResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpResponse")
            .field("status", &self.status)
            .field("headers", &self.headers)
            .finish_non_exhaustive()
    }
}

/// Failure reported by a `Transport` before any response was received.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The method, URL or headers could not form a valid request.
    #[error("invalid request: {0}")]
    InvalidRequest(#[source] BoxError),

    /// The request was valid but the exchange failed (refused, timed out,
    /// DNS failure, ...).
    #[error("connection failed: {0}")]
    Connection(#[source] BoxError),
}

/// Blocking request/response exchange.
///
/// Implementations must return every status code as a response, not as an
/// error; status interpretation belongs to the client.
pub trait Transport {
    fn send(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError>;
}

impl<T: Transport + ?Sized> Transport for &T {
    fn send(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        (**self).send(request)
    }
}

#[cfg(feature = "ureq")]
pub use self::ureq_transport::UreqTransport;

#[cfg(feature = "ureq")]
mod ureq_transport {
    use super::{HttpRequest, HttpResponse, Transport, TransportError};

    /// `Transport` backed by a blocking `ureq::Agent`.
    ///
    /// The agent is built with `http_status_as_error(false)` so 4xx/5xx
    /// responses come back as data.
    #[derive(Clone)]
    pub struct UreqTransport {
        agent: ureq::Agent,
    }

    impl UreqTransport {
        pub fn new() -> Self {
            let agent = ureq::Agent::config_builder()
                .http_status_as_error(false)
                .build()
                .new_agent();
            Self { agent }
        }

        /// Wrap an existing agent. It must not be configured to turn status
        /// codes into errors.
        pub fn from_agent(agent: ureq::Agent) -> Self {
            Self { agent }
        }
    }

    impl Default for UreqTransport {
        fn default() -> Self {
            Self::new()
        }
    }

    impl Transport for UreqTransport {
        fn send(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
            let mut builder = ureq::http::Request::builder()
                .method(request.method.as_str())
                .uri(request.url.as_str());
            for (name, value) in &request.headers {
                builder = builder.header(name.as_str(), value.as_str());
            }

            let result = match &request.body {
                Some(body) => {
                    let req = builder
                        .body(body.clone())
                        .map_err(|e| TransportError::InvalidRequest(Box::new(e)))?;
                    self.agent.run(req)
                }
                None => {
                    let req = builder
                        .body(())
                        .map_err(|e| TransportError::InvalidRequest(Box::new(e)))?;
                    self.agent.run(req)
                }
            };

            let response = result.map_err(|e| match e {
                ureq::Error::BadUri(_) | ureq::Error::Http(_) => {
                    TransportError::InvalidRequest(Box::new(e))
                }
                other => TransportError::Connection(Box::new(other)),
            })?;

            let status = response.status().as_u16();
            let headers = response
                .headers()
                .iter()
                .map(|(name, value)| {
                    (
                        name.as_str().to_string(),
                        String::from_utf8_lossy(value.as_bytes()).into_owned(),
                    )
                })
                .collect();
            let body = response.into_body().into_reader();

            Ok(HttpResponse::new(status, headers, body))
        }
    }
}
