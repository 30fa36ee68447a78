//! Blocking REST client for CRUD operations on serde records.
//!
//! # Overview
//! A type implementing `Record` names its resource URL and identifier; the
//! `Client` then creates, reads, lists, updates and deletes it with one HTTP
//! request per call. Request bodies are url-encoded (default) or JSON,
//! responses are JSON and are decoded back into the caller's value.
//!
//! # Design
//! - `encode` turns a flat record into `name=value&...` through a dedicated
//!   serde `Serializer`; no runtime reflection is involved.
//! - `Client` is generic over a `Transport`, so the HTTP library is a
//!   replaceable collaborator. `UreqTransport` is provided behind the default
//!   `ureq` feature.
//! - Failures are returned, never retried or logged; a non-2xx status comes
//!   back as `Error::Http` with the URL, status code and raw body.

pub mod client;
pub mod encode;
pub mod error;
pub mod http;
pub mod record;

pub use client::Client;
pub use encode::{encode, to_form_string, ContentType};
pub use error::{Error, HttpError};
pub use http::{BoxError, HttpMethod, HttpRequest, HttpResponse, Transport, TransportError};
#[cfg(feature = "ureq")]
pub use http::UreqTransport;
pub use record::{DefaultId, Record};
