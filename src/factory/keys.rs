use crate::command::params::{ExpiryOption, ScanParams};
use crate::command::{CommandDescriptor, FromReply, ToArg};
use crate::cursor::{Cursor, ScanResult};
use crate::error::Result;
use crate::factory::CommandFactory;

key_commands! {
    exists => "EXISTS" -> bool;
    /// Remaining time to live in seconds, `-1` without expiry, `-2` for a missing key.
    ttl => "TTL" -> i64;
    /// True when an expiry was removed.
    persist => "PERSIST" -> bool;
    /// Type name of the value, `none` for a missing key.
    key_type => "TYPE" -> String;
}

impl CommandFactory {
    /// How many of `keys` exist. A key listed twice counts twice.
    pub fn exists_many<I>(&self, keys: I) -> Result<CommandDescriptor<i64>>
    where
        I: IntoIterator,
        I::Item: ToArg,
    {
        Ok(CommandDescriptor::new(self.command("EXISTS").keys(keys)?))
    }

    pub fn del<I>(&self, keys: I) -> Result<CommandDescriptor<i64>>
    where
        I: IntoIterator,
        I::Item: ToArg,
    {
        Ok(CommandDescriptor::new(self.command("DEL").keys(keys)?))
    }

    /// True when the timeout was set.
    pub fn expire(
        &self,
        key: impl ToArg,
        seconds: i64,
        option: Option<ExpiryOption>,
    ) -> CommandDescriptor<bool> {
        CommandDescriptor::new(self.command("EXPIRE").key(key).add(seconds).add_opt(option))
    }

    /// Keys matching a glob. Blocks the node while it walks the keyspace; prefer [`Self::scan`].
    pub fn keys<V: FromReply + 'static>(&self, pattern: impl ToArg) -> CommandDescriptor<Vec<V>> {
        CommandDescriptor::new(self.command("KEYS").add(pattern))
    }

    pub fn scan<V: FromReply + 'static>(
        &self,
        cursor: &Cursor,
        params: &ScanParams,
    ) -> CommandDescriptor<ScanResult<V>> {
        CommandDescriptor::new(params.append(self.command("SCAN").add(cursor)))
    }
}
