//! Runs command descriptors against connections.
//!
//! The executor owns no connections. It asks its [`ConnectionProvider`] for one per command, or
//! for the full node set when a command has to reach every node, and reads that set fresh on
//! every fan-out.

#[cfg(test)]
pub(crate) mod mock;
mod provider;

pub use provider::{Connection, ConnectionProvider, NodeId, NodeMap, Shared};

use tracing::{debug, trace, warn};

use crate::command::{CommandDescriptor, ReplyPolicy, Routing};
use crate::cursor::{Cursor, CursorIterator, ScanResult};
use crate::error::{Error, Result};
use crate::protocol::Value;

pub struct Executor<P> {
    provider: P,
}

/// One node's answer to a broadcast: the raw reply, kept for agreement checks, and its decoding.
struct NodeReply<T> {
    node: NodeId,
    raw: Value<'static>,
    value: T,
}

impl<P: ConnectionProvider> Executor<P> {
    pub fn new(provider: P) -> Self {
        Self { provider }
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Runs `command` the way the operation requires: on one connection, or on every node for
    /// operations that change node-local state.
    pub fn execute<T>(&self, command: CommandDescriptor<T>) -> Result<T> {
        match command.routing() {
            Routing::Single => self.execute_single(&command),
            Routing::Broadcast(policy) => self.fan_out(&command, policy),
        }
    }

    /// Sends `command` to every node currently known, resolving replies with the command's
    /// policy.
    pub fn broadcast<T>(&self, command: CommandDescriptor<T>) -> Result<T> {
        let policy = command.reply_policy();
        self.fan_out(&command, policy)
    }

    /// Runs `command` on a connection the caller already holds.
    pub fn execute_on<C, T>(&self, connection: &mut C, command: &CommandDescriptor<T>) -> Result<T>
    where
        C: Connection + ?Sized,
    {
        let reply = send(connection, command)?;
        command.decode(reply)
    }

    /// Pages through a scan. `build` turns each cursor into the page command.
    pub fn scan_iter<'e, T, F>(&'e self, build: F) -> CursorIterator<'e, P, T>
    where
        F: FnMut(&Cursor) -> Result<CommandDescriptor<ScanResult<T>>> + 'e,
    {
        CursorIterator::new(self, build)
    }

    fn execute_single<T>(&self, command: &CommandDescriptor<T>) -> Result<T> {
        let mut connection = self
            .provider
            .connection(command.routing_key().map(|k| &k[..]))?;
        self.execute_on(&mut connection, command)
    }

    fn fan_out<T>(&self, command: &CommandDescriptor<T>, policy: ReplyPolicy<T>) -> Result<T> {
        let nodes = self.provider.current_nodes()?;
        if nodes.is_empty() {
            return Err(Error::NoNodes);
        }
        let name = command.arguments().command_name();
        debug!(command = %name, nodes = nodes.len(), ?policy, "broadcasting command");

        let mut replies = Vec::with_capacity(nodes.len());
        let mut failures = Vec::new();
        for (node, mut connection) in nodes {
            let reply = send(&mut connection, command)
                .and_then(|raw| Ok((command.decode(raw.clone())?, raw)));
            match reply {
                Ok((value, raw)) => replies.push(NodeReply { node, raw, value }),
                Err(error) => {
                    warn!(command = %name, %node, %error, "broadcast node failed");
                    failures.push((node, error));
                }
            }
        }
        resolve(policy, replies, failures)
    }
}

/// Writes one command and reads its reply, turning an error reply into [`Error::Server`].
fn send<C, T>(connection: &mut C, command: &CommandDescriptor<T>) -> Result<Value<'static>>
where
    C: Connection + ?Sized,
{
    trace!(command = %command.arguments().command_name(), "sending command");
    match connection.send(command.arguments())? {
        Value::Error(message) => Err(Error::Server {
            message: message.into_owned(),
        }),
        reply => Ok(reply),
    }
}

fn resolve<T>(
    policy: ReplyPolicy<T>,
    replies: Vec<NodeReply<T>>,
    failures: Vec<(NodeId, Error)>,
) -> Result<T> {
    if let ReplyPolicy::FirstSuccess = policy {
        return match replies.into_iter().next() {
            Some(reply) => Ok(reply.value),
            None => Err(Error::Broadcast { failures }),
        };
    }
    if !failures.is_empty() {
        return Err(Error::Broadcast { failures });
    }
    if let ReplyPolicy::AllAgree = policy {
        return agree(replies);
    }

    let mut values = replies.into_iter().map(|reply| reply.value);
    let first = values.next().ok_or(Error::NoNodes)?;
    match policy {
        ReplyPolicy::Aggregate(fold) => Ok(values.fold(first, fold)),
        _ => Ok(first),
    }
}

/// Every raw reply must be equal. On divergence the largest group of equal replies is the
/// agreeing side, ties going to the group seen first, and every node outside it is reported.
fn agree<T>(mut replies: Vec<NodeReply<T>>) -> Result<T> {
    let diverged = match replies.split_first() {
        Some((first, rest)) => rest.iter().any(|reply| reply.raw != first.raw),
        None => return Err(Error::NoNodes),
    };
    if !diverged {
        return Ok(replies.swap_remove(0).value);
    }

    let mut groups: Vec<Vec<usize>> = Vec::new();
    for (i, reply) in replies.iter().enumerate() {
        match groups.iter_mut().find(|group| replies[group[0]].raw == reply.raw) {
            Some(group) => group.push(i),
            None => groups.push(vec![i]),
        }
    }
    let mut largest = 0;
    for (i, group) in groups.iter().enumerate() {
        if group.len() > groups[largest].len() {
            largest = i;
        }
    }

    let mut agreeing = Vec::new();
    let mut diverging = Vec::new();
    for (i, reply) in replies.iter().enumerate() {
        if groups[largest].contains(&i) {
            agreeing.push(reply.node.clone());
        } else {
            diverging.push(reply.node.clone());
        }
    }
    warn!(?agreeing, ?diverging, "broadcast replies diverged");
    Err(Error::BroadcastDivergence {
        agreeing,
        diverging,
        replies: replies
            .into_iter()
            .map(|reply| (reply.node, format!("{:?}", reply.raw)))
            .collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    use crate::command::{CommandArguments, FromReply};
    use crate::executor::mock::ScriptedConnection;
    use crate::factory::CommandFactory;

    fn cluster(connections: &[(&str, ScriptedConnection)]) -> Executor<NodeMap<ScriptedConnection>> {
        let nodes = NodeMap::new();
        for (id, connection) in connections {
            nodes.insert(*id, connection.clone());
        }
        Executor::new(nodes)
    }

    fn ok() -> ScriptedConnection {
        ScriptedConnection::new().reply(Value::status("OK"))
    }

    #[test]
    fn single_target_uses_one_connection() {
        let a = ScriptedConnection::new().reply(Value::bulk("v"));
        let executor = cluster(&[("a:1", a.clone())]);
        let value = executor.execute(CommandFactory::new().get::<String>("k")).unwrap();
        assert_eq!(value.as_deref(), Some("v"));
        assert_eq!(a.sent(), vec![vec![Bytes::from_static(b"GET"), Bytes::from_static(b"k")]]);
    }

    #[test]
    fn server_error_reply_is_surfaced() {
        let a = ScriptedConnection::new().reply(Value::Error("WRONGTYPE bad".into()));
        let executor = cluster(&[("a:1", a)]);
        let error = executor.execute(CommandFactory::new().incr("k")).unwrap_err();
        assert!(matches!(error, Error::Server { ref message } if message == "WRONGTYPE bad"));
    }

    #[test]
    fn broadcast_reaches_every_node() {
        let nodes = [("a:1", ok()), ("b:2", ok()), ("c:3", ok())];
        let executor = cluster(&nodes);
        let reply = executor
            .execute(CommandFactory::new().config_set("maxmemory", "100mb"))
            .unwrap();
        assert_eq!(reply, "OK");
        let expected: Vec<Bytes> = ["CONFIG", "SET", "maxmemory", "100mb"]
            .into_iter()
            .map(|t| Bytes::from_static(t.as_bytes()))
            .collect();
        for (_, connection) in &nodes {
            assert_eq!(connection.sent(), vec![expected.clone()]);
        }
    }

    #[test]
    fn divergence_names_the_minority() {
        let odd = ScriptedConnection::new().reply(Value::status("ERR"));
        let executor = cluster(&[("a:1", ok()), ("b:2", odd), ("c:3", ok())]);
        let error = executor
            .execute(CommandFactory::new().config_set("maxmemory", "100mb"))
            .unwrap_err();
        match &error {
            Error::BroadcastDivergence {
                agreeing,
                diverging,
                replies,
            } => {
                assert_eq!(agreeing, &vec![NodeId::from("a:1"), NodeId::from("c:3")]);
                assert_eq!(diverging, &vec![NodeId::from("b:2")]);
                assert_eq!(replies.len(), 3);
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(error.failed_nodes(), vec![&NodeId::from("b:2")]);
    }

    #[test]
    fn node_failure_fails_the_broadcast() {
        let down = ScriptedConnection::new().fail(Error::ZeroRead);
        let executor = cluster(&[("a:1", ok()), ("b:2", down), ("c:3", ok())]);
        let error = executor.execute(CommandFactory::new().flush_db()).unwrap_err();
        assert_eq!(error.failed_nodes(), vec![&NodeId::from("b:2")]);
    }

    #[test]
    fn first_success_tolerates_failures() {
        let command = || {
            CommandDescriptor::<Vec<bool>>::new(CommandArguments::new("SCRIPT").add("EXISTS").add("abc"))
                .broadcast(ReplyPolicy::FirstSuccess)
        };
        let down = ScriptedConnection::new().fail(Error::ZeroRead);
        let up = ScriptedConnection::new().reply(Value::Array(vec![Value::Positive(1)]));
        let executor = cluster(&[("a:1", down), ("b:2", up)]);
        assert_eq!(executor.execute(command()).unwrap(), vec![true]);

        let all_down = cluster(&[("a:1", ScriptedConnection::new())]);
        assert!(matches!(
            all_down.execute(command()),
            Err(Error::Broadcast { .. })
        ));
    }

    #[test]
    fn script_exists_requires_every_node_to_agree() {
        let executor = cluster(&[
            ("a:1", ScriptedConnection::new().reply(Value::Array(vec![Value::Positive(1)]))),
            ("b:2", ScriptedConnection::new().reply(Value::Array(vec![Value::Positive(0)]))),
        ]);
        let error = executor
            .execute(CommandFactory::new().script_exists(["sha"]).unwrap())
            .unwrap_err();
        assert!(matches!(error, Error::BroadcastDivergence { .. }));
        assert_eq!(error.failed_nodes(), vec![&NodeId::from("b:2")]);

        let down = ScriptedConnection::new().fail(Error::ZeroRead);
        let up = ScriptedConnection::new().reply(Value::Array(vec![Value::Positive(1)]));
        let executor = cluster(&[("a:1", up), ("b:2", down)]);
        let error = executor
            .execute(CommandFactory::new().script_exists(["sha"]).unwrap())
            .unwrap_err();
        assert_eq!(error.failed_nodes(), vec![&NodeId::from("b:2")]);
    }

    #[test]
    fn mapped_broadcast_still_reaches_every_node() {
        let nodes = [("a:1", ok()), ("b:2", ok())];
        let executor = cluster(&nodes);
        let command = CommandFactory::new()
            .flush_all(None)
            .map(|status| status == "OK")
            .unwrap();
        assert!(executor.execute(command).unwrap());
        assert!(nodes.iter().all(|(_, c)| c.sent_count() == 1));
    }

    #[test]
    fn reply_types_need_no_equality() {
        struct Opaque(i64);
        impl FromReply for Opaque {
            fn from_reply(reply: Value<'static>) -> Result<Self> {
                i64::from_reply(reply).map(Opaque)
            }
        }

        let nodes = [
            (
                "a:1",
                ScriptedConnection::new()
                    .reply(Value::Positive(5))
                    .reply(Value::Positive(5)),
            ),
            ("b:2", ScriptedConnection::new().reply(Value::Positive(5))),
        ];
        let executor = cluster(&nodes);
        let single = CommandDescriptor::<Opaque>::new(CommandArguments::new("DBSIZE"));
        assert_eq!(executor.execute(single).unwrap().0, 5);
        let everywhere = CommandDescriptor::<Opaque>::new(CommandArguments::new("DBSIZE"));
        assert_eq!(executor.broadcast(everywhere).unwrap().0, 5);
    }

    #[test]
    fn aggregate_sums_node_counts() {
        let executor = cluster(&[
            ("a:1", ScriptedConnection::new().reply(Value::Positive(3))),
            ("b:2", ScriptedConnection::new().reply(Value::Positive(4))),
        ]);
        assert_eq!(executor.execute(CommandFactory::new().dbsize()).unwrap(), 7);
    }

    #[test]
    fn broadcast_without_nodes() {
        let executor = cluster(&[]);
        assert!(matches!(
            executor.execute(CommandFactory::new().flush_all(None)),
            Err(Error::NoNodes)
        ));
    }

    #[test]
    fn forced_broadcast_of_single_target_command() {
        let nodes = [
            ("a:1", ScriptedConnection::new().reply(Value::status("PONG"))),
            ("b:2", ScriptedConnection::new().reply(Value::status("PONG"))),
        ];
        let executor = cluster(&nodes);
        assert_eq!(executor.broadcast(CommandFactory::new().ping()).unwrap(), "PONG");
        assert!(nodes.iter().all(|(_, c)| c.sent_count() == 1));
    }

    #[test]
    fn membership_change_is_seen_by_next_broadcast() {
        let first = ScriptedConnection::new()
            .reply(Value::status("OK"))
            .reply(Value::status("OK"));
        let executor = cluster(&[("a:1", first.clone())]);
        executor.execute(CommandFactory::new().flush_db()).unwrap();

        let late = ok();
        executor.provider().insert("b:2", late.clone());
        executor.execute(CommandFactory::new().flush_db()).unwrap();
        assert_eq!(first.sent_count(), 2);
        assert_eq!(late.sent_count(), 1);
    }

    #[test]
    fn failed_build_touches_no_connection() {
        let a = ScriptedConnection::new();
        let executor = cluster(&[("a:1", a.clone())]);
        let built = CommandFactory::new().del(Vec::<&str>::new());
        assert!(matches!(built, Err(Error::Encoding { .. })));
        let result = built.and_then(|command| executor.execute(command));
        assert!(result.is_err());
        assert_eq!(a.sent_count(), 0);
    }

    #[test]
    fn execute_on_held_connection() {
        let mut held = ScriptedConnection::new().reply(Value::Positive(2));
        let executor = cluster(&[]);
        let command = CommandDescriptor::<i64>::new(CommandArguments::new("DBSIZE"));
        assert_eq!(executor.execute_on(&mut held, &command).unwrap(), 2);
    }
}
