//! Option builders appended after an operation's positional parameters.
//!
//! Builders only record choices. Conflicting choices are reported when the command is built, so
//! a bad combination never reaches a connection.

use bytes::Bytes;

use crate::command::{CommandArguments, ToArg};
use crate::error::{Error, Result};

macro_rules! keyword_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $keyword:literal),* $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        pub enum $name {
            $($variant),*
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $keyword),*
                }
            }
        }

        impl ToArg for $name {
            fn to_arg(&self) -> Bytes {
                Bytes::from_static(self.as_str().as_bytes())
            }
        }
    };
}

keyword_enum!(
    /// Condition for `EXPIRE` and friends.
    ExpiryOption { Nx => "NX", Xx => "XX", Gt => "GT", Lt => "LT" }
);

keyword_enum!(
    FlushMode { Async => "ASYNC", Sync => "SYNC" }
);

keyword_enum!(
    /// Unit of the `BITCOUNT` range.
    BitCountOption { Byte => "BYTE", Bit => "BIT" }
);

keyword_enum!(
    Condition { Nx => "NX", Xx => "XX" }
);

keyword_enum!(
    Comparison { Gt => "GT", Lt => "LT" }
);

/// `MATCH`, `COUNT` and `TYPE` for the scan family. The count is a page-size hint only.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanParams {
    pattern: Option<Bytes>,
    count: Option<u64>,
    kind: Option<Bytes>,
}

impl ScanParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn match_pattern(mut self, pattern: impl ToArg) -> Self {
        self.pattern = Some(pattern.to_arg());
        self
    }

    pub fn count(mut self, count: u64) -> Self {
        self.count = Some(count);
        self
    }

    /// Restricts a keyspace scan to one value type. Only `SCAN` accepts it.
    pub fn of_type(mut self, kind: impl ToArg) -> Self {
        self.kind = Some(kind.to_arg());
        self
    }

    pub(crate) fn append(&self, args: CommandArguments) -> CommandArguments {
        args.add_pair("MATCH", self.pattern.as_ref())
            .add_pair("COUNT", self.count)
            .add_pair("TYPE", self.kind.as_ref())
    }

    /// Same as [`ScanParams::append`] for scans over one key, which take no type filter.
    pub(crate) fn append_keyed(&self, args: CommandArguments) -> Result<CommandArguments> {
        if self.kind.is_some() {
            return Err(Error::encoding(format!(
                "{} does not accept a TYPE filter",
                args.command_name()
            )));
        }
        Ok(self.append(args))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expiry {
    Ex(u64),
    Px(u64),
    ExAt(u64),
    PxAt(u64),
    KeepTtl,
}

/// Options of `SET`, written as `[NX|XX] [GET] [EX|PX|EXAT|PXAT|KEEPTTL]`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SetParams {
    condition: Option<Condition>,
    get: bool,
    expiry: Option<Expiry>,
    conflict: Option<&'static str>,
}

impl SetParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn nx(self) -> Self {
        self.condition(Condition::Nx)
    }

    pub fn xx(self) -> Self {
        self.condition(Condition::Xx)
    }

    pub fn get(mut self) -> Self {
        self.get = true;
        self
    }

    pub fn ex(self, seconds: u64) -> Self {
        self.expiry(Expiry::Ex(seconds))
    }

    pub fn px(self, millis: u64) -> Self {
        self.expiry(Expiry::Px(millis))
    }

    pub fn exat(self, unix_seconds: u64) -> Self {
        self.expiry(Expiry::ExAt(unix_seconds))
    }

    pub fn pxat(self, unix_millis: u64) -> Self {
        self.expiry(Expiry::PxAt(unix_millis))
    }

    pub fn keep_ttl(self) -> Self {
        self.expiry(Expiry::KeepTtl)
    }

    fn condition(mut self, condition: Condition) -> Self {
        if self.condition.is_some_and(|c| c != condition) {
            self.conflict.get_or_insert("NX and XX are mutually exclusive");
        }
        self.condition = Some(condition);
        self
    }

    fn expiry(mut self, expiry: Expiry) -> Self {
        if self.expiry.is_some_and(|e| e != expiry) {
            self.conflict.get_or_insert("only one expiry option may be set");
        }
        self.expiry = Some(expiry);
        self
    }

    pub(crate) fn append(&self, args: CommandArguments) -> Result<CommandArguments> {
        if let Some(conflict) = self.conflict {
            return Err(Error::encoding(format!("SET: {conflict}")));
        }
        let args = args.add_opt(self.condition);
        let args = if self.get { args.add("GET") } else { args };
        Ok(match self.expiry {
            Some(Expiry::Ex(n)) => args.add("EX").add(n),
            Some(Expiry::Px(n)) => args.add("PX").add(n),
            Some(Expiry::ExAt(n)) => args.add("EXAT").add(n),
            Some(Expiry::PxAt(n)) => args.add("PXAT").add(n),
            Some(Expiry::KeepTtl) => args.add("KEEPTTL"),
            None => args,
        })
    }
}

/// Options of `ZADD`, written as `[NX|XX] [GT|LT] [CH]`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ZAddParams {
    condition: Option<Condition>,
    comparison: Option<Comparison>,
    changed: bool,
    conflict: Option<&'static str>,
}

impl ZAddParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn nx(self) -> Self {
        self.condition(Condition::Nx)
    }

    pub fn xx(self) -> Self {
        self.condition(Condition::Xx)
    }

    pub fn gt(self) -> Self {
        self.comparison(Comparison::Gt)
    }

    pub fn lt(self) -> Self {
        self.comparison(Comparison::Lt)
    }

    pub fn ch(mut self) -> Self {
        self.changed = true;
        self
    }

    fn condition(mut self, condition: Condition) -> Self {
        if self.condition.is_some_and(|c| c != condition) {
            self.conflict.get_or_insert("NX and XX are mutually exclusive");
        }
        self.condition = Some(condition);
        self
    }

    fn comparison(mut self, comparison: Comparison) -> Self {
        if self.comparison.is_some_and(|c| c != comparison) {
            self.conflict.get_or_insert("GT and LT are mutually exclusive");
        }
        self.comparison = Some(comparison);
        self
    }

    pub(crate) fn append(&self, args: CommandArguments) -> Result<CommandArguments> {
        if let Some(conflict) = self.conflict {
            return Err(Error::encoding(format!("ZADD: {conflict}")));
        }
        if self.condition == Some(Condition::Nx) && self.comparison.is_some() {
            return Err(Error::encoding("ZADD: NX cannot be combined with GT or LT"));
        }
        let args = args.add_opt(self.condition).add_opt(self.comparison);
        Ok(if self.changed { args.add("CH") } else { args })
    }
}
