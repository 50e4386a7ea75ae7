use crate::command::params::{BitCountOption, SetParams};
use crate::command::{CommandDescriptor, FromReply, ToArg};
use crate::error::Result;
use crate::factory::CommandFactory;

key_commands! {
    /// Length of the value in bytes, `0` for a missing key.
    strlen => "STRLEN" -> i64;
    incr => "INCR" -> i64;
    decr => "DECR" -> i64;
    /// Number of set bits in the whole value.
    bitcount => "BITCOUNT" -> i64;
}

impl CommandFactory {
    /// Plain `SET`, replying `OK`.
    pub fn set(&self, key: impl ToArg, value: impl ToArg) -> CommandDescriptor<String> {
        CommandDescriptor::new(self.command("SET").key(key).add(value))
    }

    /// `SET` with options. Replies `None` when an NX/XX condition stopped the write; with
    /// [`SetParams::get`] the reply is the previous value instead of `OK`.
    pub fn set_with<V: FromReply + 'static>(
        &self,
        key: impl ToArg,
        value: impl ToArg,
        params: &SetParams,
    ) -> Result<CommandDescriptor<Option<V>>> {
        let args = params.append(self.command("SET").key(key).add(value))?;
        Ok(CommandDescriptor::new(args))
    }

    /// Stores `value` and replies with the previous value, if any.
    pub fn set_get<V: FromReply + 'static>(
        &self,
        key: impl ToArg,
        value: impl ToArg,
    ) -> CommandDescriptor<Option<V>> {
        CommandDescriptor::new(self.command("SET").key(key).add(value).add("GET"))
    }

    pub fn get<V: FromReply + 'static>(&self, key: impl ToArg) -> CommandDescriptor<Option<V>> {
        CommandDescriptor::new(self.command("GET").key(key))
    }

    /// True when the key was created.
    pub fn setnx(&self, key: impl ToArg, value: impl ToArg) -> CommandDescriptor<bool> {
        CommandDescriptor::new(self.command("SETNX").key(key).add(value))
    }

    /// Substring by inclusive byte offsets; negative offsets count from the end.
    pub fn getrange<V: FromReply + 'static>(
        &self,
        key: impl ToArg,
        start: i64,
        end: i64,
    ) -> CommandDescriptor<V> {
        CommandDescriptor::new(self.command("GETRANGE").key(key).add(start).add(end))
    }

    /// One slot per requested key, `None` where the key is missing.
    pub fn mget<V: FromReply + 'static>(
        &self,
        keys: impl IntoIterator<Item = impl ToArg>,
    ) -> Result<CommandDescriptor<Vec<Option<V>>>> {
        Ok(CommandDescriptor::new(self.command("MGET").keys(keys)?))
    }

    /// Length of the value after the append.
    pub fn append(&self, key: impl ToArg, value: impl ToArg) -> CommandDescriptor<i64> {
        CommandDescriptor::new(self.command("APPEND").key(key).add(value))
    }

    pub fn incr_by(&self, key: impl ToArg, increment: i64) -> CommandDescriptor<i64> {
        CommandDescriptor::new(self.command("INCRBY").key(key).add(increment))
    }

    pub fn incr_by_float(&self, key: impl ToArg, increment: f64) -> CommandDescriptor<f64> {
        CommandDescriptor::new(self.command("INCRBYFLOAT").key(key).add(increment))
    }

    pub fn decr_by(&self, key: impl ToArg, decrement: i64) -> CommandDescriptor<i64> {
        CommandDescriptor::new(self.command("DECRBY").key(key).add(decrement))
    }

    /// Set bits between `start` and `end`, counted in bytes unless `unit` says otherwise.
    pub fn bitcount_range(
        &self,
        key: impl ToArg,
        start: i64,
        end: i64,
        unit: Option<BitCountOption>,
    ) -> CommandDescriptor<i64> {
        CommandDescriptor::new(
            self.command("BITCOUNT")
                .key(key)
                .add(start)
                .add(end)
                .add_opt(unit),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::Value;
    use bytes::Bytes;
    use test_case::test_case;

    fn text<T>(command: &CommandDescriptor<T>) -> Vec<String> {
        command
            .arguments()
            .iter()
            .map(|t| String::from_utf8_lossy(t).into_owned())
            .collect()
    }

    #[test]
    fn counters() {
        let factory = CommandFactory::new();
        assert_eq!(text(&factory.incr("n")), ["INCR", "n"]);
        assert_eq!(text(&factory.incr_by("n", -5)), ["INCRBY", "n", "-5"]);
        assert_eq!(text(&factory.decr_by("n", 3)), ["DECRBY", "n", "3"]);
        assert_eq!(text(&factory.incr_by_float("n", 0.5)), ["INCRBYFLOAT", "n", "0.5"]);
        assert_eq!(factory.incr("n").decode(Value::Positive(4)).unwrap(), 4);
        assert_eq!(
            factory.incr_by_float("n", 0.5).decode(Value::bulk("10.5")).unwrap(),
            10.5
        );
    }

    #[test]
    fn get_twins_differ_only_in_decoding() {
        let factory = CommandFactory::new();
        let text_get = factory.get::<String>("k");
        let binary_get = factory.get::<Bytes>(&b"k"[..]);
        assert_eq!(text_get.arguments(), binary_get.arguments());
        assert_eq!(text_get.decode(Value::Nil).unwrap(), None);
        assert_eq!(
            binary_get.decode(Value::bulk(vec![0x00, 0xff])).unwrap(),
            Some(Bytes::from_static(&[0x00, 0xff]))
        );
    }

    #[test]
    fn set_variants() {
        let factory = CommandFactory::new();
        assert_eq!(text(&factory.set("k", "v")), ["SET", "k", "v"]);
        assert_eq!(text(&factory.set_get::<String>("k", "v")), ["SET", "k", "v", "GET"]);

        let command = factory
            .set_with::<String>("k", "v", &SetParams::new().xx().px(1500))
            .unwrap();
        assert_eq!(text(&command), ["SET", "k", "v", "XX", "PX", "1500"]);
        assert_eq!(command.decode(Value::Nil).unwrap(), None);
        assert_eq!(
            command.decode(Value::status("OK")).unwrap().as_deref(),
            Some("OK")
        );

        assert!(factory
            .set_with::<String>("k", "v", &SetParams::new().ex(1).px(1))
            .is_err());
    }

    #[test]
    fn mget_keeps_missing_slots() {
        let command = CommandFactory::new().mget::<String>(["a", "b", "c"]).unwrap();
        assert_eq!(text(&command), ["MGET", "a", "b", "c"]);
        let reply = Value::Array(vec![Value::bulk("1"), Value::Nil, Value::bulk("3")]);
        assert_eq!(
            command.decode(reply).unwrap(),
            vec![Some("1".to_owned()), None, Some("3".to_owned())]
        );
        assert!(CommandFactory::new().mget::<String>(Vec::<&str>::new()).is_err());
    }

    #[test_case(None, &["BITCOUNT", "k", "0", "-1"]; "bytes by default")]
    #[test_case(Some(BitCountOption::Bit), &["BITCOUNT", "k", "0", "-1", "BIT"]; "bit range")]
    fn bitcount_range_tokens(unit: Option<BitCountOption>, expected: &[&str]) {
        assert_eq!(
            text(&CommandFactory::new().bitcount_range("k", 0, -1, unit)),
            expected
        );
    }

    #[test]
    fn getrange_and_setnx() {
        let factory = CommandFactory::new();
        assert_eq!(
            text(&factory.getrange::<String>("k", 0, -1)),
            ["GETRANGE", "k", "0", "-1"]
        );
        assert!(factory.setnx("k", "v").decode(Value::Positive(1)).unwrap());
        assert_eq!(factory.append("k", "xy").decode(Value::Positive(7)).unwrap(), 7);
    }
}
