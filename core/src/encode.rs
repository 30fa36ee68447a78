//! Request body encoding.
//!
//! # Design
//! JSON bodies are produced by `serde_json` directly. URL-encoded bodies go
//! through a small `serde::Serializer` that only understands a flat record:
//! the top level must be a struct (or a string-keyed map, which is what
//! `#[serde(flatten)]` produces), and each field must be a scalar. Every
//! field is emitted as `name=value` in the order the record serializes it,
//! joined with `&`. `None` fields are skipped rather than sent empty.

use std::fmt;

use percent_encoding::{percent_encode, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::ser::{self, Impossible, Serialize};

use crate::error::Error;

/// Characters left untouched by query escaping.
const QUERY: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Wire format for request bodies.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ContentType {
    /// `application/x-www-form-urlencoded`
    #[default]
    UrlEncoded,
    /// `application/json`
    Json,
}

impl ContentType {
    /// Value for the `Content-Type` header.
    pub fn as_str(self) -> &'static str {
        match self {
            ContentType::UrlEncoded => "application/x-www-form-urlencoded",
            ContentType::Json => "application/json",
        }
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Encode `record` as a request body in the given format.
pub fn encode<T: Serialize + ?Sized>(record: &T, content_type: ContentType) -> Result<String, Error> {
    match content_type {
        ContentType::UrlEncoded => to_form_string(record),
        ContentType::Json => serde_json::to_string(record).map_err(Error::Serialize),
    }
}

/// Encode the fields of a flat record as `name=value&...`.
pub fn to_form_string<T: Serialize + ?Sized>(record: &T) -> Result<String, Error> {
    record.serialize(RecordSerializer)
}

fn escape(value: &str) -> String {
    utf8_percent_encode(value, QUERY).to_string()
}

fn escape_bytes(value: &[u8]) -> String {
    percent_encode(value, QUERY).to_string()
}

fn not_a_record(found: &str) -> Error {
    Error::InvalidRecord(format!("record must be a struct, found {found}"))
}

/// Top level: resolves wrappers down to the record's fields.
struct RecordSerializer;

impl ser::Serializer for RecordSerializer {
    type Ok = String;
    type Error = Error;

    type SerializeSeq = Impossible<String, Error>;
    type SerializeTuple = Impossible<String, Error>;
    type SerializeTupleStruct = Impossible<String, Error>;
    type SerializeTupleVariant = Impossible<String, Error>;
    type SerializeMap = FieldsSerializer;
    type SerializeStruct = FieldsSerializer;
    type SerializeStructVariant = Impossible<String, Error>;

    fn serialize_bool(self, _: bool) -> Result<String, Error> {
        Err(not_a_record("bool"))
    }

    fn serialize_i8(self, _: i8) -> Result<String, Error> {
        Err(not_a_record("i8"))
    }

    fn serialize_i16(self, _: i16) -> Result<String, Error> {
        Err(not_a_record("i16"))
    }

    fn serialize_i32(self, _: i32) -> Result<String, Error> {
        Err(not_a_record("i32"))
    }

    fn serialize_i64(self, _: i64) -> Result<String, Error> {
        Err(not_a_record("i64"))
    }

    fn serialize_i128(self, _: i128) -> Result<String, Error> {
        Err(not_a_record("i128"))
    }

    fn serialize_u8(self, _: u8) -> Result<String, Error> {
        Err(not_a_record("u8"))
    }

    fn serialize_u16(self, _: u16) -> Result<String, Error> {
        Err(not_a_record("u16"))
    }

    fn serialize_u32(self, _: u32) -> Result<String, Error> {
        Err(not_a_record("u32"))
    }

    fn serialize_u64(self, _: u64) -> Result<String, Error> {
        Err(not_a_record("u64"))
    }

    fn serialize_u128(self, _: u128) -> Result<String, Error> {
        Err(not_a_record("u128"))
    }

    fn serialize_f32(self, _: f32) -> Result<String, Error> {
        Err(not_a_record("f32"))
    }

    fn serialize_f64(self, _: f64) -> Result<String, Error> {
        Err(not_a_record("f64"))
    }

    fn serialize_char(self, _: char) -> Result<String, Error> {
        Err(not_a_record("char"))
    }

    fn serialize_str(self, _: &str) -> Result<String, Error> {
        Err(not_a_record("string"))
    }

    fn serialize_bytes(self, _: &[u8]) -> Result<String, Error> {
        Err(not_a_record("bytes"))
    }

    fn serialize_none(self) -> Result<String, Error> {
        Err(Error::InvalidRecord("record is a null reference".to_string()))
    }

    fn serialize_some<T: Serialize + ?Sized>(self, value: &T) -> Result<String, Error> {
        value.serialize(self)
    }

    fn serialize_unit(self) -> Result<String, Error> {
        Err(not_a_record("()"))
    }

    fn serialize_unit_struct(self, _: &'static str) -> Result<String, Error> {
        Ok(String::new())
    }

    fn serialize_unit_variant(
        self,
        name: &'static str,
        _: u32,
        _: &'static str,
    ) -> Result<String, Error> {
        Err(not_a_record(name))
    }

    fn serialize_newtype_struct<T: Serialize + ?Sized>(
        self,
        _: &'static str,
        value: &T,
    ) -> Result<String, Error> {
        value.serialize(self)
    }

    fn serialize_newtype_variant<T: Serialize + ?Sized>(
        self,
        name: &'static str,
        _: u32,
        _: &'static str,
        _: &T,
    ) -> Result<String, Error> {
        Err(not_a_record(name))
    }

    fn serialize_seq(self, _: Option<usize>) -> Result<Self::SerializeSeq, Error> {
        Err(not_a_record("sequence"))
    }

    fn serialize_tuple(self, _: usize) -> Result<Self::SerializeTuple, Error> {
        Err(not_a_record("tuple"))
    }

    fn serialize_tuple_struct(
        self,
        name: &'static str,
        _: usize,
    ) -> Result<Self::SerializeTupleStruct, Error> {
        Err(not_a_record(name))
    }

    fn serialize_tuple_variant(
        self,
        name: &'static str,
        _: u32,
        _: &'static str,
        _: usize,
    ) -> Result<Self::SerializeTupleVariant, Error> {
        Err(not_a_record(name))
    }

    fn serialize_map(self, _: Option<usize>) -> Result<FieldsSerializer, Error> {
        Ok(FieldsSerializer::default())
    }

    fn serialize_struct(self, _: &'static str, _: usize) -> Result<FieldsSerializer, Error> {
        Ok(FieldsSerializer::default())
    }

    fn serialize_struct_variant(
        self,
        name: &'static str,
        _: u32,
        _: &'static str,
        _: usize,
    ) -> Result<Self::SerializeStructVariant, Error> {
        Err(not_a_record(name))
    }
}

/// Collects `name=value` pairs for one record.
#[derive(Default)]
struct FieldsSerializer {
    pairs: Vec<String>,
    pending_key: Option<String>,
}

impl FieldsSerializer {
    fn push<T: Serialize + ?Sized>(&mut self, name: &str, value: &T) -> Result<(), Error> {
        if let Some(encoded) = value.serialize(FieldSerializer { field: name })? {
            self.pairs.push(format!("{name}={encoded}"));
        }
        Ok(())
    }

    fn finish(self) -> String {
        self.pairs.join("&")
    }
}

impl ser::SerializeStruct for FieldsSerializer {
    type Ok = String;
    type Error = Error;

    fn serialize_field<T: Serialize + ?Sized>(
        &mut self,
        key: &'static str,
        value: &T,
    ) -> Result<(), Error> {
        self.push(key, value)
    }

    fn end(self) -> Result<String, Error> {
        Ok(self.finish())
    }
}

impl ser::SerializeMap for FieldsSerializer {
    type Ok = String;
    type Error = Error;

    fn serialize_key<T: Serialize + ?Sized>(&mut self, key: &T) -> Result<(), Error> {
        match serde_json::to_value(key) {
            Ok(serde_json::Value::String(name)) => {
                self.pending_key = Some(name);
                Ok(())
            }
            _ => Err(Error::InvalidRecord("record keys must be strings".to_string())),
        }
    }

    fn serialize_value<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), Error> {
        let name = self
            .pending_key
            .take()
            .ok_or_else(|| Error::Encode("map value serialized before its key".to_string()))?;
        self.push(&name, value)
    }

    fn end(self) -> Result<String, Error> {
        Ok(self.finish())
    }
}

/// Renders one field value. `Ok(None)` means the field is absent.
struct FieldSerializer<'a> {
    field: &'a str,
}

impl FieldSerializer<'_> {
    fn unsupported(&self, type_name: &str) -> Error {
        Error::UnsupportedFieldType {
            field: self.field.to_string(),
            type_name: type_name.to_string(),
        }
    }
}

type Field = Option<String>;

impl ser::Serializer for FieldSerializer<'_> {
    type Ok = Field;
    type Error = Error;

    type SerializeSeq = Impossible<Field, Error>;
    type SerializeTuple = Impossible<Field, Error>;
    type SerializeTupleStruct = Impossible<Field, Error>;
    type SerializeTupleVariant = Impossible<Field, Error>;
    type SerializeMap = Impossible<Field, Error>;
    type SerializeStruct = Impossible<Field, Error>;
    type SerializeStructVariant = Impossible<Field, Error>;

    fn serialize_bool(self, v: bool) -> Result<Field, Error> {
        Ok(Some(v.to_string()))
    }

    fn serialize_i8(self, v: i8) -> Result<Field, Error> {
        Ok(Some(v.to_string()))
    }

    fn serialize_i16(self, v: i16) -> Result<Field, Error> {
        Ok(Some(v.to_string()))
    }

    fn serialize_i32(self, v: i32) -> Result<Field, Error> {
        Ok(Some(v.to_string()))
    }

    fn serialize_i64(self, v: i64) -> Result<Field, Error> {
        Ok(Some(v.to_string()))
    }

    fn serialize_i128(self, v: i128) -> Result<Field, Error> {
        Ok(Some(v.to_string()))
    }

    fn serialize_u8(self, v: u8) -> Result<Field, Error> {
        Ok(Some(v.to_string()))
    }

    fn serialize_u16(self, v: u16) -> Result<Field, Error> {
        Ok(Some(v.to_string()))
    }

    fn serialize_u32(self, v: u32) -> Result<Field, Error> {
        Ok(Some(v.to_string()))
    }

    fn serialize_u64(self, v: u64) -> Result<Field, Error> {
        Ok(Some(v.to_string()))
    }

    fn serialize_u128(self, v: u128) -> Result<Field, Error> {
        Ok(Some(v.to_string()))
    }

    fn serialize_f32(self, _: f32) -> Result<Field, Error> {
        Err(self.unsupported("f32"))
    }

    fn serialize_f64(self, _: f64) -> Result<Field, Error> {
        Err(self.unsupported("f64"))
    }

    fn serialize_char(self, v: char) -> Result<Field, Error> {
        Ok(Some(escape(v.encode_utf8(&mut [0; 4]))))
    }

    fn serialize_str(self, v: &str) -> Result<Field, Error> {
        Ok(Some(escape(v)))
    }

    fn serialize_bytes(self, v: &[u8]) -> Result<Field, Error> {
        Ok(Some(escape_bytes(v)))
    }

    fn serialize_none(self) -> Result<Field, Error> {
        Ok(None)
    }

    fn serialize_some<T: Serialize + ?Sized>(self, value: &T) -> Result<Field, Error> {
        value.serialize(self)
    }

    fn serialize_unit(self) -> Result<Field, Error> {
        Err(self.unsupported("()"))
    }

    fn serialize_unit_struct(self, name: &'static str) -> Result<Field, Error> {
        Err(self.unsupported(name))
    }

    fn serialize_unit_variant(
        self,
        name: &'static str,
        _: u32,
        _: &'static str,
    ) -> Result<Field, Error> {
        Err(self.unsupported(name))
    }

    fn serialize_newtype_struct<T: Serialize + ?Sized>(
        self,
        _: &'static str,
        value: &T,
    ) -> Result<Field, Error> {
        value.serialize(self)
    }

    fn serialize_newtype_variant<T: Serialize + ?Sized>(
        self,
        name: &'static str,
        _: u32,
        _: &'static str,
        _: &T,
    ) -> Result<Field, Error> {
        Err(self.unsupported(name))
    }

    fn serialize_seq(self, _: Option<usize>) -> Result<Self::SerializeSeq, Error> {
        Err(self.unsupported("sequence"))
    }

    fn serialize_tuple(self, _: usize) -> Result<Self::SerializeTuple, Error> {
        Err(self.unsupported("tuple"))
    }

    fn serialize_tuple_struct(
        self,
        name: &'static str,
        _: usize,
    ) -> Result<Self::SerializeTupleStruct, Error> {
        Err(self.unsupported(name))
    }

    fn serialize_tuple_variant(
        self,
        name: &'static str,
        _: u32,
        _: &'static str,
        _: usize,
    ) -> Result<Self::SerializeTupleVariant, Error> {
        Err(self.unsupported(name))
    }

    fn serialize_map(self, _: Option<usize>) -> Result<Self::SerializeMap, Error> {
        Err(self.unsupported("map"))
    }

    fn serialize_struct(self, name: &'static str, _: usize) -> Result<Self::SerializeStruct, Error> {
        Err(self.unsupported(name))
    }

    fn serialize_struct_variant(
        self,
        name: &'static str,
        _: u32,
        _: &'static str,
        _: usize,
    ) -> Result<Self::SerializeStructVariant, Error> {
        Err(self.unsupported(name))
    }
}

#[cfg(test)]
mod tests {
    use serde::Serialize;

    use super::*;
    use crate::record::DefaultId;

    #[derive(Serialize)]
    struct Todo {
        #[serde(rename = "Title")]
        title: String,
        #[serde(rename = "IsCompleted")]
        is_completed: bool,
    }

    #[derive(Serialize)]
    #[serde(rename_all = "PascalCase")]
    struct Patch {
        title: Option<String>,
        is_completed: Option<bool>,
    }

    #[derive(Serialize)]
    struct Scalars {
        a: i8,
        b: i16,
        c: i32,
        d: i64,
        e: u8,
        f: u16,
        g: u32,
        h: u64,
        i: bool,
        j: usize,
    }

    #[test]
    fn title_is_query_escaped() {
        let todo = Patch {
            title: Some("Discover the meaning of life".to_string()),
            is_completed: None,
        };
        assert_eq!(
            to_form_string(&todo).unwrap(),
            "Title=Discover%20the%20meaning%20of%20life"
        );
    }

    #[test]
    fn fields_keep_declaration_order_and_names() {
        let todo = Todo {
            title: "Walk dog".to_string(),
            is_completed: true,
        };
        assert_eq!(to_form_string(&todo).unwrap(), "Title=Walk%20dog&IsCompleted=true");
    }

    #[test]
    fn none_fields_are_omitted() {
        let patch = Patch {
            title: None,
            is_completed: Some(true),
        };
        assert_eq!(to_form_string(&patch).unwrap(), "IsCompleted=true");

        let empty = Patch {
            title: None,
            is_completed: None,
        };
        assert_eq!(to_form_string(&empty).unwrap(), "");
    }

    #[test]
    fn integer_and_bool_variants_render_canonically() {
        let s = Scalars {
            a: -8,
            b: -16,
            c: -32,
            d: i64::MIN,
            e: 8,
            f: 16,
            g: 32,
            h: u64::MAX,
            i: false,
            j: 7,
        };
        assert_eq!(
            to_form_string(&s).unwrap(),
            "a=-8&b=-16&c=-32&d=-9223372036854775808&e=8&f=16&g=32&h=18446744073709551615&i=false&j=7"
        );
    }

    #[test]
    fn reserved_characters_are_escaped() {
        #[derive(Serialize)]
        struct Query {
            q: &'static str,
        }
        let q = Query {
            q: "a&b=c/d?e+f~g.h_i-j ü",
        };
        assert_eq!(
            to_form_string(&q).unwrap(),
            "q=a%26b%3Dc%2Fd%3Fe%2Bf~g.h_i-j%20%C3%BC"
        );
    }

    #[test]
    fn bytes_are_escaped_like_strings() {
        #[derive(Serialize)]
        struct Blob {
            #[serde(with = "serde_bytes")]
            data: Vec<u8>,
            #[serde(with = "serde_bytes")]
            raw: Vec<u8>,
        }
        let blob = Blob {
            data: b"hello world".to_vec(),
            raw: vec![0x00, 0xff],
        };
        assert_eq!(to_form_string(&blob).unwrap(), "data=hello%20world&raw=%00%FF");
    }

    #[test]
    fn boxed_and_nested_options_are_followed() {
        #[derive(Serialize)]
        struct Wrapped {
            count: Box<u32>,
            label: Option<Box<String>>,
            missing: Option<Option<i32>>,
        }
        let w = Wrapped {
            count: Box::new(3),
            label: Some(Box::new("x y".to_string())),
            missing: Some(None),
        };
        assert_eq!(to_form_string(&w).unwrap(), "count=3&label=x%20y");
        assert_eq!(to_form_string(&Box::new(w)).unwrap(), "count=3&label=x%20y");
    }

    #[test]
    fn newtype_fields_are_transparent() {
        #[derive(Serialize)]
        struct UserId(u32);
        #[derive(Serialize)]
        struct Owner {
            user: UserId,
        }
        assert_eq!(to_form_string(&Owner { user: UserId(12) }).unwrap(), "user=12");
    }

    #[test]
    fn null_record_is_invalid() {
        let record: Option<Todo> = None;
        let err = to_form_string(&record).unwrap_err();
        assert!(matches!(err, Error::InvalidRecord(_)), "{err:?}");

        let nested: Option<Box<Option<Todo>>> = Some(Box::new(None));
        assert!(matches!(to_form_string(&nested), Err(Error::InvalidRecord(_))));
    }

    #[test]
    fn non_struct_record_is_invalid() {
        assert!(matches!(to_form_string(&42u32), Err(Error::InvalidRecord(_))));
        assert!(matches!(to_form_string("text"), Err(Error::InvalidRecord(_))));
        assert!(matches!(to_form_string(&vec![1, 2]), Err(Error::InvalidRecord(_))));
        assert!(matches!(to_form_string(&7i128), Err(Error::InvalidRecord(_))));
        assert!(matches!(to_form_string(&7u128), Err(Error::InvalidRecord(_))));
    }

    #[test]
    fn float_field_is_unsupported() {
        #[derive(Serialize)]
        struct Scored {
            #[serde(rename = "Name")]
            name: String,
            #[serde(rename = "Score")]
            score: f64,
        }
        let err = to_form_string(&Scored {
            name: "a".to_string(),
            score: 1.5,
        })
        .unwrap_err();
        match err {
            Error::UnsupportedFieldType { field, type_name } => {
                assert_eq!(field, "Score");
                assert_eq!(type_name, "f64");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn nested_struct_field_is_unsupported() {
        #[derive(Serialize)]
        struct Inner {
            x: i32,
        }
        #[derive(Serialize)]
        struct Outer {
            inner: Inner,
        }
        let err = to_form_string(&Outer { inner: Inner { x: 1 } }).unwrap_err();
        match err {
            Error::UnsupportedFieldType { field, type_name } => {
                assert_eq!(field, "inner");
                assert_eq!(type_name, "Inner");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn sequence_field_is_unsupported() {
        #[derive(Serialize)]
        struct Tagged {
            tags: Vec<String>,
        }
        let err = to_form_string(&Tagged { tags: Vec::new() }).unwrap_err();
        assert!(
            matches!(err, Error::UnsupportedFieldType { ref field, .. } if field == "tags"),
            "{err:?}"
        );
    }

    #[test]
    fn flattened_default_id_is_encoded() {
        #[derive(Serialize)]
        struct Note {
            #[serde(flatten)]
            key: DefaultId,
            #[serde(rename = "Body")]
            body: Option<String>,
        }
        let note = Note {
            key: DefaultId::new("n1"),
            body: Some("hi there".to_string()),
        };
        assert_eq!(to_form_string(&note).unwrap(), "Id=n1&Body=hi%20there");

        let bare = Note {
            key: DefaultId::new("n2"),
            body: None,
        };
        assert_eq!(to_form_string(&bare).unwrap(), "Id=n2");
    }

    #[test]
    fn json_strategy_delegates_to_serde_json() {
        let todo = Todo {
            title: "Walk dog".to_string(),
            is_completed: false,
        };
        assert_eq!(
            encode(&todo, ContentType::Json).unwrap(),
            r#"{"Title":"Walk dog","IsCompleted":false}"#
        );
        assert_eq!(
            encode(&todo, ContentType::UrlEncoded).unwrap(),
            "Title=Walk%20dog&IsCompleted=false"
        );
    }

    #[test]
    fn content_type_header_values() {
        assert_eq!(ContentType::default(), ContentType::UrlEncoded);
        assert_eq!(ContentType::UrlEncoded.as_str(), "application/x-www-form-urlencoded");
        assert_eq!(ContentType::Json.to_string(), "application/json");
    }
}
