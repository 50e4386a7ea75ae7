//! Connection checks, configuration, scripts and functions.
//!
//! Script, function and configuration state is node-local, so those builders carry a broadcast
//! policy and reach every node when executed.

use crate::command::params::FlushMode;
use crate::command::reply::pairs;
use crate::command::{CommandDescriptor, FromReply, ReplyPolicy, ToArg};
use crate::error::{Error, Result};
use crate::factory::CommandFactory;

impl CommandFactory {
    pub fn ping(&self) -> CommandDescriptor<String> {
        CommandDescriptor::new(self.command("PING"))
    }

    pub fn echo<V: FromReply + 'static>(&self, message: impl ToArg) -> CommandDescriptor<V> {
        CommandDescriptor::new(self.command("ECHO").add(message))
    }

    pub fn flush_all(&self, mode: Option<FlushMode>) -> CommandDescriptor<String> {
        CommandDescriptor::new(self.command("FLUSHALL").add_opt(mode))
            .broadcast(ReplyPolicy::AnyReply)
    }

    pub fn flush_db(&self) -> CommandDescriptor<String> {
        CommandDescriptor::new(self.command("FLUSHDB")).broadcast(ReplyPolicy::AnyReply)
    }

    pub fn config_set(&self, parameter: impl ToArg, value: impl ToArg) -> CommandDescriptor<String> {
        CommandDescriptor::new(self.command("CONFIG").add("SET").add(parameter).add(value))
            .broadcast(ReplyPolicy::AllAgree)
    }

    /// Matching parameters with their values, in reply order.
    pub fn config_get(&self, pattern: impl ToArg) -> CommandDescriptor<Vec<(String, String)>> {
        CommandDescriptor::with_decoder(
            self.command("CONFIG").add("GET").add(pattern),
            pairs::<String, String>,
        )
    }

    /// Key count summed over every node.
    pub fn dbsize(&self) -> CommandDescriptor<i64> {
        CommandDescriptor::new(self.command("DBSIZE"))
            .broadcast(ReplyPolicy::Aggregate(|a: i64, b: i64| a + b))
    }

    /// Loads a script on every node. Every node must report the same SHA1.
    pub fn script_load(&self, script: impl ToArg) -> CommandDescriptor<String> {
        CommandDescriptor::new(self.command("SCRIPT").add("LOAD").add(script))
            .broadcast(ReplyPolicy::AllAgree)
    }

    /// One flag per digest, in caller order. Every node must answer with the same flags, so a
    /// script missing on some nodes surfaces as a divergence.
    pub fn script_exists<I>(&self, sha1s: I) -> Result<CommandDescriptor<Vec<bool>>>
    where
        I: IntoIterator,
        I::Item: ToArg,
    {
        let args = self.command("SCRIPT").add("EXISTS");
        let before = args.len();
        let args = args.add_all(sha1s);
        if args.len() == before {
            return Err(Error::encoding("SCRIPT EXISTS requires at least one digest"));
        }
        Ok(CommandDescriptor::new(args).broadcast(ReplyPolicy::AllAgree))
    }

    pub fn script_flush(&self, mode: Option<FlushMode>) -> CommandDescriptor<String> {
        CommandDescriptor::new(self.command("SCRIPT").add("FLUSH").add_opt(mode))
            .broadcast(ReplyPolicy::AnyReply)
    }

    /// Loads a function library, replying with the library name.
    pub fn function_load(&self, code: impl ToArg) -> CommandDescriptor<String> {
        CommandDescriptor::new(self.command("FUNCTION").add("LOAD").add(code))
            .broadcast(ReplyPolicy::AllAgree)
    }

    pub fn function_load_replace(&self, code: impl ToArg) -> CommandDescriptor<String> {
        CommandDescriptor::new(self.command("FUNCTION").add("LOAD").add("REPLACE").add(code))
            .broadcast(ReplyPolicy::AllAgree)
    }

    pub fn function_delete(&self, library: impl ToArg) -> CommandDescriptor<String> {
        CommandDescriptor::new(self.command("FUNCTION").add("DELETE").add(library))
            .broadcast(ReplyPolicy::AnyReply)
    }

    pub fn function_flush(&self, mode: Option<FlushMode>) -> CommandDescriptor<String> {
        CommandDescriptor::new(self.command("FUNCTION").add("FLUSH").add_opt(mode))
            .broadcast(ReplyPolicy::AnyReply)
    }
}
