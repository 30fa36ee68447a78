//! Error types for the REST client.
//!
//! # Design
//! Local failures (a record the encoder cannot represent) are separated from
//! failures of the exchange itself. A non-2xx response is not a transport
//! failure: it arrives as `Error::Http` carrying the request URL, the status
//! code and the raw body, which is what callers match on to detect e.g.
//! "not found".

use std::fmt;

use crate::http::{BoxError, HttpMethod};

/// Errors returned by `Client` operations and the field encoder.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The record is a null reference or not a flat struct.
    #[error("invalid record: {0}")]
    InvalidRecord(String),

    /// A field's type has no url-encoded representation.
    #[error("cannot url-encode field `{field}` of type {type_name}")]
    UnsupportedFieldType { field: String, type_name: String },

    /// The record's `Serialize` impl reported a failure of its own.
    #[error("encoding failed: {0}")]
    Encode(String),

    /// The record could not be marshalled as JSON.
    #[error("json encoding failed: {0}")]
    Serialize(#[source] serde_json::Error),

    /// The method or URL could not form a request.
    #[error("could not build {method} request to {url}: {source}")]
    RequestBuild {
        method: HttpMethod,
        url: String,
        #[source]
        source: BoxError,
    },

    /// The request could not be delivered or no response arrived.
    #[error("{method} request to {url} failed: {source}")]
    Transport {
        method: HttpMethod,
        url: String,
        #[source]
        source: BoxError,
    },

    /// The server answered with a status outside 200..=299.
    #[error(transparent)]
    Http(#[from] HttpError),

    /// The response body could not be read.
    #[error("could not read response from {url}: {source}")]
    ResponseRead {
        url: String,
        #[source]
        source: std::io::Error,
    },

    /// The response body was not the expected JSON.
    #[error("could not decode response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },
}

impl Error {
    /// The HTTP failure, if this error is one.
    pub fn as_http(&self) -> Option<&HttpError> {
        match self {
            Error::Http(err) => Some(err),
            _ => None,
        }
    }
}

impl serde::ser::Error for Error {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        Error::Encode(msg.to_string())
    }
}

/// A completed exchange whose status code was not 2xx.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("http request to {url} returned status code {status_code}")]
pub struct HttpError {
    /// The URL the request was sent to.
    pub url: String,
    /// The raw response body.
    pub body: Vec<u8>,
    pub status_code: u16,
}

impl HttpError {
    pub fn is_not_found(&self) -> bool {
        self.status_code == 404
    }

    /// The body as text, with invalid UTF-8 replaced.
    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_error_message_names_url_and_status() {
        let err = Error::from(HttpError {
            url: "http://localhost:3000/todos/9999".to_string(),
            body: br#"{"error":"not found"}"#.to_vec(),
            status_code: 404,
        });
        assert_eq!(
            err.to_string(),
            "http request to http://localhost:3000/todos/9999 returned status code 404"
        );
        let http = err.as_http().unwrap();
        assert!(http.is_not_found());
        assert_eq!(http.body_text(), r#"{"error":"not found"}"#);
    }

    #[test]
    fn unsupported_field_message_names_field() {
        let err = Error::UnsupportedFieldType {
            field: "Score".to_string(),
            type_name: "f64".to_string(),
        };
        assert_eq!(err.to_string(), "cannot url-encode field `Score` of type f64");
        assert!(err.as_http().is_none());
    }
}
