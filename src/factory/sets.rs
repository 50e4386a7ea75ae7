use std::collections::HashSet;
use std::hash::Hash;

use crate::command::params::ScanParams;
use crate::command::{CommandDescriptor, FromReply, ToArg};
use crate::cursor::{Cursor, ScanResult};
use crate::error::{Error, Result};
use crate::factory::CommandFactory;

key_commands! {
    scard => "SCARD" -> i64;
}

impl CommandFactory {
    /// Number of members that were not already present.
    pub fn sadd(
        &self,
        key: impl ToArg,
        members: impl IntoIterator<Item = impl ToArg>,
    ) -> Result<CommandDescriptor<i64>> {
        let args = self.command("SADD").key(key);
        let before = args.len();
        let args = args.add_all(members);
        if args.len() == before {
            return Err(Error::encoding("SADD requires at least one member"));
        }
        Ok(CommandDescriptor::new(args))
    }

    pub fn smembers<V>(&self, key: impl ToArg) -> CommandDescriptor<HashSet<V>>
    where
        V: FromReply + Eq + Hash + 'static,
    {
        CommandDescriptor::new(self.command("SMEMBERS").key(key))
    }

    pub fn sismember(&self, key: impl ToArg, member: impl ToArg) -> CommandDescriptor<bool> {
        CommandDescriptor::new(self.command("SISMEMBER").key(key).add(member))
    }

    pub fn sscan<V: FromReply + 'static>(
        &self,
        key: impl ToArg,
        cursor: &Cursor,
        params: &ScanParams,
    ) -> Result<CommandDescriptor<ScanResult<V>>> {
        let args = params.append_keyed(self.command("SSCAN").key(key).add(cursor))?;
        Ok(CommandDescriptor::new(args))
    }
}
