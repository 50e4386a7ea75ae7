use crate::command::params::{ScanParams, ZAddParams};
use crate::command::reply::scored_members;
use crate::command::{CommandArguments, CommandDescriptor, FromReply, ScoredMember, ToArg};
use crate::cursor::{Cursor, ScanResult};
use crate::error::{Error, Result};
use crate::factory::CommandFactory;

key_commands! {
    zcard => "ZCARD" -> i64;
}

impl CommandFactory {
    /// Adds or updates one member. Replies with the number of members added, or changed when
    /// `CH` is set.
    pub fn zadd(
        &self,
        key: impl ToArg,
        score: f64,
        member: impl ToArg,
        params: Option<&ZAddParams>,
    ) -> Result<CommandDescriptor<i64>> {
        let args = self.zadd_head(key, params)?.add(score).add(member);
        Ok(CommandDescriptor::new(args))
    }

    /// Adds or updates several members in one command, in caller order.
    pub fn zadd_many<M: ToArg>(
        &self,
        key: impl ToArg,
        members: impl IntoIterator<Item = (f64, M)>,
        params: Option<&ZAddParams>,
    ) -> Result<CommandDescriptor<i64>> {
        let mut args = self.zadd_head(key, params)?;
        let before = args.len();
        for (score, member) in members {
            args = args.add(score).add(member);
        }
        if args.len() == before {
            return Err(Error::encoding("ZADD requires at least one member"));
        }
        Ok(CommandDescriptor::new(args))
    }

    /// `ZADD ... INCR`: replies with the new score, or `None` when a condition blocked the update.
    pub fn zadd_incr(
        &self,
        key: impl ToArg,
        increment: f64,
        member: impl ToArg,
        params: Option<&ZAddParams>,
    ) -> Result<CommandDescriptor<Option<f64>>> {
        let args = self
            .zadd_head(key, params)?
            .add("INCR")
            .add(increment)
            .add(member);
        Ok(CommandDescriptor::new(args))
    }

    pub fn zscore(&self, key: impl ToArg, member: impl ToArg) -> CommandDescriptor<Option<f64>> {
        CommandDescriptor::new(self.command("ZSCORE").key(key).add(member))
    }

    /// Members by rank with their scores, lowest score first.
    pub fn zrange_with_scores<M: FromReply + 'static>(
        &self,
        key: impl ToArg,
        start: i64,
        stop: i64,
    ) -> CommandDescriptor<Vec<ScoredMember<M>>> {
        CommandDescriptor::with_decoder(
            self.command("ZRANGE")
                .key(key)
                .add(start)
                .add(stop)
                .add("WITHSCORES"),
            scored_members::<M>,
        )
    }

    pub fn zscan<M: FromReply + 'static>(
        &self,
        key: impl ToArg,
        cursor: &Cursor,
        params: &ScanParams,
    ) -> Result<CommandDescriptor<ScanResult<ScoredMember<M>>>> {
        let args = params.append_keyed(self.command("ZSCAN").key(key).add(cursor))?;
        Ok(CommandDescriptor::with_decoder(args, |reply| {
            ScanResult::decode_with(reply, scored_members::<M>)
        }))
    }

    fn zadd_head(&self, key: impl ToArg, params: Option<&ZAddParams>) -> Result<CommandArguments> {
        let args = self.command("ZADD").key(key);
        match params {
            Some(params) => params.append(args),
            None => Ok(args),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::Value;

    fn text<T>(command: &CommandDescriptor<T>) -> Vec<String> {
        command
            .arguments()
            .iter()
            .map(|t| String::from_utf8_lossy(t).into_owned())
            .collect()
    }

    #[test]
    fn zadd_options_precede_score_member_pairs() {
        let factory = CommandFactory::new();
        let params = ZAddParams::new().xx().ch();
        assert_eq!(
            text(&factory.zadd("z", 2.5, "m", Some(&params)).unwrap()),
            ["ZADD", "z", "XX", "CH", "2.5", "m"]
        );
        assert_eq!(
            text(&factory.zadd_many("z", [(1.0, "a"), (f64::INFINITY, "b")], None).unwrap()),
            ["ZADD", "z", "1", "a", "+inf", "b"]
        );
        assert!(factory
            .zadd_many("z", Vec::<(f64, &str)>::new(), None)
            .is_err());
        assert!(factory
            .zadd("z", 1.0, "m", Some(&ZAddParams::new().nx().gt()))
            .is_err());
    }

    #[test]
    fn zadd_incr_may_be_blocked() {
        let command = CommandFactory::new()
            .zadd_incr("z", 3.0, "m", Some(&ZAddParams::new().nx()))
            .unwrap();
        assert_eq!(text(&command), ["ZADD", "z", "NX", "INCR", "3", "m"]);
        assert_eq!(command.decode(Value::Nil).unwrap(), None);
        assert_eq!(command.decode(Value::bulk("4.5")).unwrap(), Some(4.5));
    }

    #[test]
    fn zrange_with_scores_preserves_order() {
        let command = CommandFactory::new().zrange_with_scores::<String>("z", 0, -1);
        assert_eq!(text(&command), ["ZRANGE", "z", "0", "-1", "WITHSCORES"]);
        let reply = Value::Array(vec![
            Value::bulk("low"),
            Value::bulk("1"),
            Value::bulk("high"),
            Value::bulk("9.5"),
        ]);
        assert_eq!(
            command.decode(reply).unwrap(),
            vec![
                ScoredMember::new("low".to_owned(), 1.0),
                ScoredMember::new("high".to_owned(), 9.5),
            ]
        );
    }

    #[test]
    fn zscan_pages_scored_members() {
        let command = CommandFactory::new()
            .zscan::<String>("z", &Cursor::start(), &ScanParams::new().count(10))
            .unwrap();
        let page = command
            .decode(Value::Array(vec![
                Value::bulk("0"),
                Value::Array(vec![Value::bulk("m"), Value::bulk("2")]),
            ]))
            .unwrap();
        assert!(page.is_complete());
        assert_eq!(page.items, vec![ScoredMember::new("m".to_owned(), 2.0)]);
    }

    #[test]
    fn zscore_of_missing_member() {
        let factory = CommandFactory::new();
        assert_eq!(factory.zscore("z", "m").decode(Value::Nil).unwrap(), None);
        assert_eq!(factory.zcard("z").decode(Value::Positive(1)).unwrap(), 1);
    }
}
