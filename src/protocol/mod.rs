pub mod encode;
pub mod parse;

pub use parse::parse;

use std::borrow::Cow;

use bytes::BytesMut;

pub const POSITIVE_MAJOR: u8 = 0b000;
pub const NEGATIVE_MAJOR: u8 = 0b001;
pub const BYTES_MAJOR: u8 = 0b010;
pub const STRING_MAJOR: u8 = 0b011;
pub const ARRAY_MAJOR: u8 = 0b100;
pub const ERROR_MAJOR: u8 = 0b101;
pub const MAP_MAJOR: u8 = 0b110;
pub const SIMPLE_MAJOR: u8 = 0b111;

pub const INDEFINITE_LENGTH: u8 = 31;
pub const BREAK: u8 = 0xFF;

pub const SIMPLE_FALSE: u8 = 20;
pub const SIMPLE_TRUE: u8 = 21;
pub const SIMPLE_NIL: u8 = 22;
pub const SIMPLE_DOUBLE: u8 = 27;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Major {
    Positive = 0b000,
    Negative = 0b001,
    Bytes = 0b010,
    String = 0b011,
    Array = 0b100,
    Error = 0b101,
    Map = 0b110,
    Simple = 0b111,
}

impl From<u8> for Major {
    fn from(value: u8) -> Self {
        match value & 0b111 {
            0b000 => Major::Positive,
            0b001 => Major::Negative,
            0b010 => Major::Bytes,
            0b011 => Major::String,
            0b100 => Major::Array,
            0b101 => Major::Error,
            0b110 => Major::Map,
            _ => Major::Simple,
        }
    }
}

/// Raw reply (and request) value as it travels over the wire.
///
/// [CBOR](https://www.rfc-editor.org/rfc/rfc8949.html)-like binary format.
///
/// In general, type representation in this format consists of the first byte and (possibly) data
/// in proceeding bytes.
///
/// First byte is divided into 2 parts:
/// - major type (the high-order 3 bits)
/// - additional information (the low-order 5 bits)
///
/// Values below 24 are stored inline in the additional information, larger ones follow the first
/// byte as `additional - 23` big-endian bytes. Arrays and maps may use [`INDEFINITE_LENGTH`] and
/// are then closed with [`BREAK`]. Nil, booleans and doubles live under the simple major.
///
/// By default no allocation required for parsing, to get owned value use
/// [`Value::into_owned`] or [`Value::clone`]
#[derive(Clone, PartialEq)]
pub enum Value<'input> {
    Positive(u64),
    Negative(i64),
    Bytes(Cow<'input, [u8]>),
    /// Simple status line, e.g. `OK`.
    String(Cow<'input, str>),
    Array(Vec<Value<'input>>),
    /// Ordered key/value pairs, wire order is preserved.
    Map(Vec<(Value<'input>, Value<'input>)>),
    Error(Cow<'input, str>),
    Nil,
    Boolean(bool),
    Double(f64),
}

impl<'input> Value<'input> {
    pub fn into_owned(self) -> Value<'static> {
        match self {
            Value::Positive(p) => Value::Positive(p),
            Value::Negative(n) => Value::Negative(n),
            Value::Bytes(b) => Value::Bytes(Cow::Owned(b.into_owned())),
            Value::String(s) => Value::String(Cow::Owned(s.into_owned())),
            Value::Array(array) => Value::Array(
                array
                    .into_iter()
                    .map(Value::into_owned)
                    .collect::<Vec<Value<'static>>>(),
            ),
            Value::Map(map) => Value::Map(
                map.into_iter()
                    .map(|(k, v)| (k.into_owned(), v.into_owned()))
                    .collect::<Vec<(Value<'static>, Value<'static>)>>(),
            ),
            Value::Error(e) => Value::Error(Cow::Owned(e.into_owned())),
            Value::Nil => Value::Nil,
            Value::Boolean(b) => Value::Boolean(b),
            Value::Double(d) => Value::Double(d),
        }
    }

    pub fn bulk(bytes: impl Into<Vec<u8>>) -> Self {
        Value::Bytes(Cow::Owned(bytes.into()))
    }

    pub fn status(status: impl Into<String>) -> Self {
        Value::String(Cow::Owned(status.into()))
    }

    pub fn integer(n: i64) -> Self {
        if n < 0 {
            Value::Negative(n)
        } else {
            Value::Positive(n as u64)
        }
    }

    /// Short name of the variant, used in decode errors.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Positive(_) | Value::Negative(_) => "integer",
            Value::Bytes(_) => "bulk",
            Value::String(_) => "status",
            Value::Array(_) => "array",
            Value::Map(_) => "map",
            Value::Error(_) => "error",
            Value::Nil => "nil",
            Value::Boolean(_) => "boolean",
            Value::Double(_) => "double",
        }
    }

    /// Rough payload size, used to pre-size encode buffers.
    pub fn len(&self) -> usize {
        match self {
            Value::Positive(_) | Value::Negative(_) | Value::Double(_) => 8,
            Value::Bytes(b) => b.len(),
            Value::String(s) | Value::Error(s) => s.len(),
            Value::Array(array) => array.iter().map(|i| i.len() + 1).sum(),
            Value::Map(map) => map.iter().map(|(k, v)| k.len() + v.len() + 2).sum(),
            Value::Nil | Value::Boolean(_) => 0,
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_nil(&self) -> bool {
        matches!(self, Value::Nil)
    }

    pub fn encode(&self) -> BytesMut {
        let mut buf = BytesMut::with_capacity(self.len() + 1);
        self.encode_into(&mut buf);
        buf
    }

    pub fn encode_into(&self, buf: &mut BytesMut) {
        match self {
            Value::Positive(n) => encode::encode_positive(*n, buf),
            Value::Negative(n) => encode::encode_negative(*n, buf),
            Value::Bytes(b) => encode::encode_bytes(b, buf),
            Value::String(s) => encode::encode_string(s, buf),
            Value::Array(array) => encode::encode_array(array, buf),
            Value::Map(map) => encode::encode_map(map, buf),
            Value::Error(err) => encode::encode_error(err, buf),
            Value::Nil => encode::encode_simple(SIMPLE_NIL, buf),
            Value::Boolean(b) => {
                encode::encode_simple(if *b { SIMPLE_TRUE } else { SIMPLE_FALSE }, buf)
            }
            Value::Double(d) => encode::encode_double(*d, buf),
        }
    }
}

impl std::fmt::Debug for Value<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Positive(n) => {
                write!(f, "p:{:?}", n)
            }
            Value::Negative(n) => {
                write!(f, "n:{:?}", n)
            }
            Value::Bytes(b) => match std::str::from_utf8(b) {
                Ok(text) => write!(f, "b:{:?}", text),
                Err(_) => write!(f, "b:{:?}", b),
            },
            Value::String(s) => {
                write!(f, "s:{:?}", s)
            }
            Value::Array(array) => f.debug_list().entries(array.iter()).finish(),
            Value::Map(map) => f
                .debug_map()
                .entries(map.iter().map(|(k, v)| (k, v)))
                .finish(),
            Value::Error(error) => {
                write!(f, "e:{:?}", error)
            }
            Value::Nil => f.write_str("nil"),
            Value::Boolean(b) => write!(f, "bool:{:?}", b),
            Value::Double(d) => write!(f, "d:{:?}", d),
        }
    }
}

impl<'input> From<Vec<u8>> for Value<'input> {
    fn from(value: Vec<u8>) -> Self {
        Value::Bytes(Cow::Owned(value))
    }
}

impl<'input> From<&'input [u8]> for Value<'input> {
    fn from(value: &'input [u8]) -> Self {
        Value::Bytes(Cow::Borrowed(value))
    }
}

impl<'input> From<String> for Value<'input> {
    fn from(value: String) -> Self {
        Value::String(Cow::Owned(value))
    }
}

impl<'input> From<i64> for Value<'input> {
    fn from(value: i64) -> Self {
        Value::integer(value)
    }
}

impl<'input> From<f64> for Value<'input> {
    fn from(value: f64) -> Self {
        Value::Double(value)
    }
}

impl<'input> From<bool> for Value<'input> {
    fn from(value: bool) -> Self {
        Value::Boolean(value)
    }
}

impl<'input, T: Into<Value<'input>>> From<Option<T>> for Value<'input> {
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::Nil, Into::into)
    }
}
