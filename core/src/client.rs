//! CRUD operations against a REST resource.
//!
//! # Design
//! `Client` holds only its configuration (the request body format) and a
//! `Transport`. Each operation builds one `HttpRequest`, sends it, checks the
//! status and decodes the JSON answer straight into the caller's record, so
//! calls on a shared `&Client` are independent of one another.
//!
//! | Operation  | Method | URL                     |
//! |------------|--------|-------------------------|
//! | `create`   | POST   | `root_url()`            |
//! | `read`     | GET    | `root_url()/{id}`       |
//! | `read_all` | GET    | `root_url()`            |
//! | `update`   | PATCH  | `root_url()/{id()}`     |
//! | `delete`   | DELETE | `root_url()/{id()}`     |

use std::fmt;
use std::io::Read;

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use crate::encode::{encode, ContentType};
use crate::error::{Error, HttpError};
use crate::http::{HttpMethod, HttpRequest, Transport, TransportError};
use crate::record::Record;

#[cfg(feature = "ureq")]
use crate::http::UreqTransport;

/// Blocking REST client.
///
/// Configure it by changing `content_type` directly or through
/// `with_content_type`; the value is read once per request.
#[derive(Clone)]
pub struct Client<T> {
    /// Format of request bodies. Responses are always expected as JSON.
    pub content_type: ContentType,
    transport: T,
}

#[cfg(feature = "ureq")]
impl Client<UreqTransport> {
    /// Client sending url-encoded bodies over a fresh `ureq` agent.
    pub fn new() -> Self {
        Self::with_transport(UreqTransport::new())
    }
}

#[cfg(feature = "ureq")]
impl Default for Client<UreqTransport> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for Client<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("content_type", &self.content_type)
            .finish_non_exhaustive()
    }
}

impl<T: Transport> Client<T> {
    pub fn with_transport(transport: T) -> Self {
        Self {
            content_type: ContentType::default(),
            transport,
        }
    }

    pub fn with_content_type(mut self, content_type: ContentType) -> Self {
        self.content_type = content_type;
        self
    }

    pub fn set_content_type(&mut self, content_type: ContentType) {
        self.content_type = content_type;
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// POST the record's fields to `root_url()` and overwrite the record with
    /// the created object from the response.
    pub fn create<R: Record>(&self, record: &mut R) -> Result<(), Error> {
        let url = record.root_url();
        let body = encode(&*record, self.content_type)?;
        let (url, bytes) = self.send(HttpMethod::Post, url, Some(body))?;
        overwrite(record, &url, &bytes)
    }

    /// GET `root_url()/{id}` and overwrite the record with the response.
    pub fn read<R: Record>(&self, id: &str, record: &mut R) -> Result<(), Error> {
        let url = member_url(&record.root_url(), id);
        let (url, bytes) = self.send(HttpMethod::Get, url, None)?;
        overwrite(record, &url, &bytes)
    }

    /// GET every record of type `R`.
    ///
    /// The URL comes from `R::default()`, so an empty vector works. On
    /// success `records` holds exactly the elements of the response array.
    pub fn read_all<R: Record + Default>(&self, records: &mut Vec<R>) -> Result<(), Error> {
        let sample = R::default();
        self.read_all_from(records, &sample)
    }

    /// Like `read_all`, with the resource URL taken from `sample`.
    pub fn read_all_from<R: Record>(&self, records: &mut Vec<R>, sample: &R) -> Result<(), Error> {
        let (url, bytes) = self.send(HttpMethod::Get, sample.root_url(), None)?;
        *records = decode(&url, &bytes)?;
        Ok(())
    }

    /// PATCH the record's fields to `root_url()/{id()}` and overwrite the
    /// record with the response.
    pub fn update<R: Record>(&self, record: &mut R) -> Result<(), Error> {
        let url = member_url(&record.root_url(), &record.id());
        let body = encode(&*record, self.content_type)?;
        let (url, bytes) = self.send(HttpMethod::Patch, url, Some(body))?;
        overwrite(record, &url, &bytes)
    }

    /// DELETE `root_url()/{id()}`. The response body is ignored and the
    /// record is left untouched.
    pub fn delete<R: Record>(&self, record: &R) -> Result<(), Error> {
        let url = member_url(&record.root_url(), &record.id());
        self.send(HttpMethod::Delete, url, None)?;
        Ok(())
    }

    /// Send one request and return the request URL with the body of a 2xx
    /// response.
    fn send(
        &self,
        method: HttpMethod,
        url: String,
        body: Option<String>,
    ) -> Result<(String, Vec<u8>), Error> {
        let body = body.filter(|b| !b.is_empty());
        let mut headers = Vec::with_capacity(2);
        if body.is_some() {
            headers.push((
                "content-type".to_string(),
                self.content_type.as_str().to_string(),
            ));
        }
        headers.push(("accept".to_string(), "application/json".to_string()));

        let request = HttpRequest {
            method,
            url,
            headers,
            body,
        };
        debug!(method = %request.method, url = %request.url, "sending request");

        let response = match self.transport.send(&request) {
            Ok(response) => response,
            Err(TransportError::InvalidRequest(source)) => {
                return Err(Error::RequestBuild {
                    method: request.method,
                    url: request.url,
                    source,
                })
            }
            Err(TransportError::Connection(source)) => {
                return Err(Error::Transport {
                    method: request.method,
                    url: request.url,
                    source,
                })
            }
        };

        let status = response.status;
        debug!(method = %request.method, url = %request.url, status, "received response");

        let mut bytes = Vec::new();
        let mut reader = response.body;
        if let Err(source) = reader.read_to_end(&mut bytes) {
            return Err(Error::ResponseRead {
                url: request.url,
                source,
            });
        }

        if status / 100 != 2 {
            return Err(HttpError {
                url: request.url,
                body: bytes,
                status_code: status,
            }
            .into());
        }
        Ok((request.url, bytes))
    }
}

fn member_url(root: &str, id: &str) -> String {
    format!("{root}/{id}")
}

fn decode<D: DeserializeOwned>(url: &str, bytes: &[u8]) -> Result<D, Error> {
    serde_json::from_slice(bytes).map_err(|source| Error::Decode {
        url: url.to_string(),
        source,
    })
}

/// Lay the response object over the record: keys present in the response
/// replace the record's serialized fields, absent keys leave them as they
/// were. A `null` is decoded like any other value, so it clears an `Option`
/// field and is a `Decode` error for a field that cannot hold it. Fields the
/// record does not serialize are restored only through `Record::keep_local`.
fn overwrite<R: Record>(record: &mut R, url: &str, bytes: &[u8]) -> Result<(), Error> {
    let incoming: Value = decode(url, bytes)?;
    let merged = match (serde_json::to_value(&*record), incoming) {
        (Ok(Value::Object(mut current)), Value::Object(fields)) => {
            current.extend(fields);
            Value::Object(current)
        }
        (_, incoming) => incoming,
    };
    let updated: R = serde_json::from_value(merged).map_err(|source| Error::Decode {
        url: url.to_string(),
        source,
    })?;
    let previous = std::mem::replace(record, updated);
    record.keep_local(previous);
    Ok(())
}
