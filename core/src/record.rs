//! The capability a type needs to take part in CRUD operations.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// A domain object addressable on a REST server.
///
/// The `Serialize` impl doubles as the record's field enumeration: fields are
/// visited in declaration order under their serialized names, and `Option`
/// fields that are `None` are left out of url-encoded bodies.
///
/// ```
/// use rest_core::Record;
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Default, Serialize, Deserialize)]
/// #[serde(rename_all = "PascalCase")]
/// struct Todo {
///     id: i64,
///     title: String,
///     is_completed: bool,
/// }
///
/// impl Record for Todo {
///     fn id(&self) -> String {
///         self.id.to_string()
///     }
///
///     fn root_url(&self) -> String {
///         "http://localhost:3000/todos".to_string()
///     }
/// }
/// ```
pub trait Record: Serialize + DeserializeOwned {
    /// Identifier appended to `root_url()` for single-record requests.
    fn id(&self) -> String;

    /// URL of the resource collection, without a trailing slash. Either
    /// absolute (`http://example.com/todos`) or whatever the transport
    /// accepts.
    fn root_url(&self) -> String;

    /// Called after a response replaced the record, with the value it had
    /// before. Fields the record does not serialize (`#[serde(skip)]`,
    /// `skip_serializing`) come back from the response or as `Default`;
    /// copy the ones that should survive from `previous` here.
    fn keep_local(&mut self, previous: Self) {
        let _ = previous;
    }
}

impl<R: Record> Record for Box<R> {
    fn id(&self) -> String {
        (**self).id()
    }

    fn root_url(&self) -> String {
        (**self).root_url()
    }

    fn keep_local(&mut self, previous: Self) {
        (**self).keep_local(*previous)
    }
}

/// A string `Id` field that records can flatten into themselves.
///
/// ```
/// use rest_core::{DefaultId, Record};
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Default, Serialize, Deserialize)]
/// struct Note {
///     #[serde(flatten)]
///     key: DefaultId,
///     #[serde(rename = "Body")]
///     body: String,
/// }
///
/// impl Record for Note {
///     fn id(&self) -> String {
///         self.key.id()
///     }
///
///     fn root_url(&self) -> String {
///         "/notes".to_string()
///     }
/// }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DefaultId {
    #[serde(rename = "Id")]
    pub id: String,
}

impl DefaultId {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }

    pub fn id(&self) -> String {
        self.id.clone()
    }
}
