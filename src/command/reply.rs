//! Typed views of raw replies.
//!
//! Text results decode as [`String`] (UTF-8), binary-safe results as [`Bytes`]. Picking one or the
//! other is what distinguishes the text twin of an operation from its binary twin.

use std::collections::{HashMap, HashSet};
use std::hash::Hash;

use bytes::Bytes;

use crate::error::{Error, Result};
use crate::protocol::Value;

pub trait FromReply: Sized {
    fn from_reply(reply: Value<'static>) -> Result<Self>;
}

impl FromReply for Value<'static> {
    fn from_reply(reply: Value<'static>) -> Result<Self> {
        Ok(reply)
    }
}

impl FromReply for i64 {
    fn from_reply(reply: Value<'static>) -> Result<Self> {
        match reply {
            Value::Positive(n) => i64::try_from(n).map_err(|_| Error::decode("integer", n)),
            Value::Negative(n) => Ok(n),
            other => Err(Error::decode("integer", other)),
        }
    }
}

/// Integer `1`, `true`, or an `OK` status are true; `0`, `false` and nil are false. Any other
/// integer is a decode error.
impl FromReply for bool {
    fn from_reply(reply: Value<'static>) -> Result<Self> {
        match reply {
            Value::Positive(0) => Ok(false),
            Value::Positive(1) => Ok(true),
            Value::Boolean(b) => Ok(b),
            Value::String(ref s) if s == "OK" => Ok(true),
            Value::Nil => Ok(false),
            other => Err(Error::decode("boolean", other)),
        }
    }
}

impl FromReply for f64 {
    fn from_reply(reply: Value<'static>) -> Result<Self> {
        match reply {
            Value::Double(d) => Ok(d),
            Value::Positive(n) => Ok(n as f64),
            Value::Negative(n) => Ok(n as f64),
            Value::Bytes(ref b) => std::str::from_utf8(b)
                .ok()
                .and_then(|s| s.parse::<f64>().ok())
                .ok_or_else(|| Error::decode("double", &reply)),
            Value::String(ref s) => s.parse::<f64>().map_err(|_| Error::decode("double", &reply)),
            other => Err(Error::decode("double", other)),
        }
    }
}

impl FromReply for String {
    fn from_reply(reply: Value<'static>) -> Result<Self> {
        match reply {
            Value::Bytes(b) => String::from_utf8(b.into_owned())
                .map_err(|e| Error::decode("utf-8 text", e.as_bytes())),
            Value::String(s) => Ok(s.into_owned()),
            other => Err(Error::decode("text", other)),
        }
    }
}

impl FromReply for Bytes {
    fn from_reply(reply: Value<'static>) -> Result<Self> {
        match reply {
            Value::Bytes(b) => Ok(Bytes::from(b.into_owned())),
            Value::String(s) => Ok(Bytes::from(s.into_owned())),
            other => Err(Error::decode("bulk", other)),
        }
    }
}

impl<T: FromReply> FromReply for Option<T> {
    fn from_reply(reply: Value<'static>) -> Result<Self> {
        match reply {
            Value::Nil => Ok(None),
            other => T::from_reply(other).map(Some),
        }
    }
}

impl<T: FromReply> FromReply for Vec<T> {
    fn from_reply(reply: Value<'static>) -> Result<Self> {
        match reply {
            Value::Array(items) => items.into_iter().map(T::from_reply).collect(),
            Value::Nil => Ok(Vec::new()),
            other => Err(Error::decode("array", other)),
        }
    }
}

impl<T: FromReply + Eq + Hash> FromReply for HashSet<T> {
    fn from_reply(reply: Value<'static>) -> Result<Self> {
        Vec::<T>::from_reply(reply).map(|items| items.into_iter().collect())
    }
}

impl<A: FromReply, B: FromReply> FromReply for (A, B) {
    fn from_reply(reply: Value<'static>) -> Result<Self> {
        match reply {
            Value::Array(items) => match <[Value<'static>; 2]>::try_from(items) {
                Ok([a, b]) => Ok((A::from_reply(a)?, B::from_reply(b)?)),
                Err(items) => Err(Error::decode("two-element array", items)),
            },
            other => Err(Error::decode("two-element array", other)),
        }
    }
}

impl<K: FromReply + Eq + Hash, V: FromReply> FromReply for HashMap<K, V> {
    fn from_reply(reply: Value<'static>) -> Result<Self> {
        pairs(reply).map(|pairs| pairs.into_iter().collect())
    }
}

/// Ordered key/value pairs from a map reply, a flat `[k1, v1, k2, v2]` array, or an array of
/// two-element arrays. Input order is preserved.
pub fn pairs<K: FromReply, V: FromReply>(reply: Value<'static>) -> Result<Vec<(K, V)>> {
    match reply {
        Value::Map(entries) => entries
            .into_iter()
            .map(|(k, v)| Ok((K::from_reply(k)?, V::from_reply(v)?)))
            .collect(),
        Value::Array(items) if matches!(items.first(), Some(Value::Array(_))) => {
            items.into_iter().map(<(K, V)>::from_reply).collect()
        }
        Value::Array(items) => {
            if items.len() % 2 != 0 {
                return Err(Error::decode(
                    "even number of elements",
                    format!("{} elements", items.len()),
                ));
            }
            let mut out = Vec::with_capacity(items.len() / 2);
            let mut items = items.into_iter();
            while let (Some(k), Some(v)) = (items.next(), items.next()) {
                out.push((K::from_reply(k)?, V::from_reply(v)?));
            }
            Ok(out)
        }
        Value::Nil => Ok(Vec::new()),
        other => Err(Error::decode("key/value pairs", other)),
    }
}

/// A sorted set member with its score.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredMember<M> {
    pub member: M,
    pub score: f64,
}

impl<M> ScoredMember<M> {
    pub fn new(member: M, score: f64) -> Self {
        Self { member, score }
    }
}

impl<M: FromReply> FromReply for ScoredMember<M> {
    fn from_reply(reply: Value<'static>) -> Result<Self> {
        <(M, f64)>::from_reply(reply).map(|(member, score)| Self { member, score })
    }
}

/// Member/score pairs in reply order, flat or nested.
pub fn scored_members<M: FromReply>(reply: Value<'static>) -> Result<Vec<ScoredMember<M>>> {
    pairs::<M, f64>(reply).map(|pairs| {
        pairs
            .into_iter()
            .map(|(member, score)| ScoredMember { member, score })
            .collect()
    })
}
