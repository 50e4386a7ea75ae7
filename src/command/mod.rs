//! Wire-level command building blocks.
//!
//! A command is an ordered list of binary-safe tokens: the keyword first, then parameters in the
//! order the protocol mandates. Text is encoded as UTF-8 before it becomes a token, which is what
//! makes the text and binary forms of every operation produce identical bytes.

pub mod descriptor;
pub mod params;
pub mod reply;

pub use descriptor::{CommandDescriptor, ReplyDecoder, ReplyPolicy, Routing};
pub use reply::{FromReply, ScoredMember};

use std::borrow::Cow;

use bytes::{Bytes, BytesMut};

use crate::error::{Error, Result};
use crate::protocol::Value;

/// Anything that can become a single wire token.
pub trait ToArg {
    fn to_arg(&self) -> Bytes;
}

impl ToArg for str {
    fn to_arg(&self) -> Bytes {
        Bytes::copy_from_slice(self.as_bytes())
    }
}

impl ToArg for String {
    fn to_arg(&self) -> Bytes {
        Bytes::copy_from_slice(self.as_bytes())
    }
}

impl ToArg for [u8] {
    fn to_arg(&self) -> Bytes {
        Bytes::copy_from_slice(self)
    }
}

impl<const N: usize> ToArg for [u8; N] {
    fn to_arg(&self) -> Bytes {
        Bytes::copy_from_slice(&self[..])
    }
}

impl ToArg for Vec<u8> {
    fn to_arg(&self) -> Bytes {
        Bytes::copy_from_slice(self)
    }
}

impl ToArg for Bytes {
    fn to_arg(&self) -> Bytes {
        self.clone()
    }
}

impl ToArg for BytesMut {
    fn to_arg(&self) -> Bytes {
        Bytes::copy_from_slice(self)
    }
}

impl ToArg for Cow<'_, str> {
    fn to_arg(&self) -> Bytes {
        self.as_ref().to_arg()
    }
}

impl<T: ToArg + ?Sized> ToArg for &T {
    fn to_arg(&self) -> Bytes {
        (**self).to_arg()
    }
}

macro_rules! integer_args {
    ($($ty:ty),*) => {
        $(
            impl ToArg for $ty {
                fn to_arg(&self) -> Bytes {
                    Bytes::from(self.to_string())
                }
            }
        )*
    };
}

integer_args!(i32, i64, u32, u64, usize);

impl ToArg for f64 {
    fn to_arg(&self) -> Bytes {
        if self.is_infinite() {
            Bytes::from_static(if self.is_sign_positive() {
                b"+inf"
            } else {
                b"-inf"
            })
        } else {
            Bytes::from(self.to_string())
        }
    }
}

/// Tokens of one wire command, built front to back.
///
/// Key tokens are remembered separately so the first one can serve as routing key. A configured
/// key prefix is applied to key tokens only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandArguments {
    args: Vec<Bytes>,
    keys: Vec<Bytes>,
    key_prefix: Option<Bytes>,
}

impl CommandArguments {
    pub fn new(command: impl ToArg) -> Self {
        Self {
            args: vec![command.to_arg()],
            keys: Vec::new(),
            key_prefix: None,
        }
    }

    pub fn with_key_prefix(mut self, prefix: Option<Bytes>) -> Self {
        self.key_prefix = prefix.filter(|p| !p.is_empty());
        self
    }

    pub fn add(mut self, arg: impl ToArg) -> Self {
        self.args.push(arg.to_arg());
        self
    }

    /// Appends `arg` only when it is present.
    pub fn add_opt(self, arg: Option<impl ToArg>) -> Self {
        match arg {
            Some(arg) => self.add(arg),
            None => self,
        }
    }

    /// Appends `keyword` followed by `value` when `value` is present.
    pub fn add_pair(self, keyword: &'static str, value: Option<impl ToArg>) -> Self {
        match value {
            Some(value) => self.add(keyword).add(value),
            None => self,
        }
    }

    pub fn add_all<I>(mut self, args: I) -> Self
    where
        I: IntoIterator,
        I::Item: ToArg,
    {
        self.args.extend(args.into_iter().map(|a| a.to_arg()));
        self
    }

    pub fn key(mut self, key: impl ToArg) -> Self {
        let key = match &self.key_prefix {
            Some(prefix) => {
                let key = key.to_arg();
                let mut prefixed = BytesMut::with_capacity(prefix.len() + key.len());
                prefixed.extend_from_slice(prefix);
                prefixed.extend_from_slice(&key);
                prefixed.freeze()
            }
            None => key.to_arg(),
        };
        self.keys.push(key.clone());
        self.args.push(key);
        self
    }

    /// Appends every key in caller order, rejecting an empty list.
    pub fn keys<I>(mut self, keys: I) -> Result<Self>
    where
        I: IntoIterator,
        I::Item: ToArg,
    {
        let before = self.keys.len();
        for key in keys {
            self = self.key(key);
        }
        if self.keys.len() == before {
            return Err(Error::encoding(format!(
                "{} requires at least one key",
                self.command_name()
            )));
        }
        Ok(self)
    }

    pub fn command(&self) -> &[u8] {
        &self.args[0]
    }

    /// Keyword as text, for logs and error messages.
    pub fn command_name(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(self.command())
    }

    /// The first key, used for single-target affinity.
    pub fn routing_key(&self) -> Option<&Bytes> {
        self.keys.first()
    }

    pub fn key_tokens(&self) -> &[Bytes] {
        &self.keys
    }

    pub fn is_keyless(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn as_slice(&self) -> &[Bytes] {
        &self.args
    }

    pub fn get(&self, index: usize) -> Option<&Bytes> {
        self.args.get(index)
    }

    pub fn len(&self) -> usize {
        self.args.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.args.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Bytes> {
        self.args.iter()
    }

    /// Request frame: an array of bulk tokens.
    pub fn to_value(&self) -> Value<'_> {
        Value::Array(
            self.args
                .iter()
                .map(|arg| Value::Bytes(Cow::Borrowed(&arg[..])))
                .collect(),
        )
    }
}

impl<'a> IntoIterator for &'a CommandArguments {
    type Item = &'a Bytes;
    type IntoIter = std::slice::Iter<'a, Bytes>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
