use std::collections::HashMap;
use std::hash::Hash;

use crate::command::params::ScanParams;
use crate::command::reply::pairs;
use crate::command::{CommandDescriptor, FromReply, ToArg};
use crate::cursor::{Cursor, ScanResult};
use crate::error::{Error, Result};
use crate::factory::CommandFactory;

key_commands! {
    hlen => "HLEN" -> i64;
}

impl CommandFactory {
    /// Number of fields that were added rather than updated.
    pub fn hset(
        &self,
        key: impl ToArg,
        field: impl ToArg,
        value: impl ToArg,
    ) -> CommandDescriptor<i64> {
        CommandDescriptor::new(self.command("HSET").key(key).add(field).add(value))
    }

    pub fn hset_many<F, V>(
        &self,
        key: impl ToArg,
        entries: impl IntoIterator<Item = (F, V)>,
    ) -> Result<CommandDescriptor<i64>>
    where
        F: ToArg,
        V: ToArg,
    {
        let mut args = self.command("HSET").key(key);
        let before = args.len();
        for (field, value) in entries {
            args = args.add(field).add(value);
        }
        if args.len() == before {
            return Err(Error::encoding("HSET requires at least one field"));
        }
        Ok(CommandDescriptor::new(args))
    }

    pub fn hget<V: FromReply + 'static>(
        &self,
        key: impl ToArg,
        field: impl ToArg,
    ) -> CommandDescriptor<Option<V>> {
        CommandDescriptor::new(self.command("HGET").key(key).add(field))
    }

    pub fn hgetall<F, V>(&self, key: impl ToArg) -> CommandDescriptor<HashMap<F, V>>
    where
        F: FromReply + Eq + Hash + 'static,
        V: FromReply + 'static,
    {
        CommandDescriptor::new(self.command("HGETALL").key(key))
    }

    /// Number of fields removed.
    pub fn hdel(
        &self,
        key: impl ToArg,
        fields: impl IntoIterator<Item = impl ToArg>,
    ) -> Result<CommandDescriptor<i64>> {
        let args = self.command("HDEL").key(key);
        let before = args.len();
        let args = args.add_all(fields);
        if args.len() == before {
            return Err(Error::encoding("HDEL requires at least one field"));
        }
        Ok(CommandDescriptor::new(args))
    }

    pub fn hincr_by(
        &self,
        key: impl ToArg,
        field: impl ToArg,
        increment: i64,
    ) -> CommandDescriptor<i64> {
        CommandDescriptor::new(self.command("HINCRBY").key(key).add(field).add(increment))
    }

    /// A page of field/value pairs in reply order.
    pub fn hscan<F, V>(
        &self,
        key: impl ToArg,
        cursor: &Cursor,
        params: &ScanParams,
    ) -> Result<CommandDescriptor<ScanResult<(F, V)>>>
    where
        F: FromReply + 'static,
        V: FromReply + 'static,
    {
        let args = params.append_keyed(self.command("HSCAN").key(key).add(cursor))?;
        Ok(CommandDescriptor::with_decoder(args, |reply| {
            ScanResult::decode_with(reply, pairs::<F, V>)
        }))
    }

    /// A page of field names only.
    pub fn hscan_no_values<F: FromReply + 'static>(
        &self,
        key: impl ToArg,
        cursor: &Cursor,
        params: &ScanParams,
    ) -> Result<CommandDescriptor<ScanResult<F>>> {
        let args = params.append_keyed(self.command("HSCAN").key(key).add(cursor))?;
        Ok(CommandDescriptor::new(args.add("NOVALUES")))
    }
}
