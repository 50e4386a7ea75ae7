use crate::command::{CommandArguments, CommandDescriptor, FromReply, ToArg};
use crate::error::{Error, Result};
use crate::factory::CommandFactory;

key_commands! {
    llen => "LLEN" -> i64;
}

impl CommandFactory {
    /// Pushes `values` onto the head one at a time, so the last value ends up first. Replies with
    /// the new length.
    pub fn lpush(
        &self,
        key: impl ToArg,
        values: impl IntoIterator<Item = impl ToArg>,
    ) -> Result<CommandDescriptor<i64>> {
        push(self.command("LPUSH").key(key), values)
    }

    pub fn rpush(
        &self,
        key: impl ToArg,
        values: impl IntoIterator<Item = impl ToArg>,
    ) -> Result<CommandDescriptor<i64>> {
        push(self.command("RPUSH").key(key), values)
    }

    /// Elements between two inclusive indexes; negative indexes count from the tail.
    pub fn lrange<V: FromReply + 'static>(
        &self,
        key: impl ToArg,
        start: i64,
        stop: i64,
    ) -> CommandDescriptor<Vec<V>> {
        CommandDescriptor::new(self.command("LRANGE").key(key).add(start).add(stop))
    }
}

fn push(
    args: CommandArguments,
    values: impl IntoIterator<Item = impl ToArg>,
) -> Result<CommandDescriptor<i64>> {
    let before = args.len();
    let args = args.add_all(values);
    if args.len() == before {
        return Err(Error::encoding(format!(
            "{} requires at least one value",
            args.command_name()
        )));
    }
    Ok(CommandDescriptor::new(args))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::Value;

    #[test]
    fn push_keeps_caller_order() {
        let factory = CommandFactory::new();
        let command = factory.rpush("l", ["a", "b", "a"]).unwrap();
        let tokens: Vec<&[u8]> = command.arguments().iter().map(|t| &t[..]).collect();
        assert_eq!(tokens, vec![&b"RPUSH"[..], b"l", b"a", b"b", b"a"]);
        assert!(factory.lpush("l", Vec::<&str>::new()).is_err());
    }

    #[test]
    fn lrange_decodes_in_order() {
        let command = CommandFactory::new().lrange::<String>("l", 0, -1);
        let reply = Value::Array(vec![Value::bulk("z"), Value::bulk("a")]);
        assert_eq!(command.decode(reply).unwrap(), vec!["z", "a"]);
        assert_eq!(
            CommandFactory::new().llen("l").decode(Value::Positive(2)).unwrap(),
            2
        );
    }
}
