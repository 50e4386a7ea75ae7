use std::fmt;

use bytes::Bytes;

use crate::command::{CommandArguments, FromReply};
use crate::error::{Error, Result};
use crate::protocol::Value;

/// Turns one raw reply into the operation's typed result. Pure, no I/O.
pub type ReplyDecoder<T> = Box<dyn Fn(Value<'static>) -> Result<T> + Send + Sync>;

/// How replies from several nodes resolve into one result.
pub enum ReplyPolicy<T> {
    /// Every node must answer and every answer must be equal.
    AllAgree,
    /// Every node must answer, the first answer stands for all of them.
    AnyReply,
    /// At least one node must answer, failures of the others are tolerated.
    FirstSuccess,
    /// Every node must answer, answers are folded in node order.
    Aggregate(fn(T, T) -> T),
}

impl<T> ReplyPolicy<T> {
    /// The same policy for another reply type. `Aggregate` folds values of `T` and has no
    /// counterpart.
    fn cast<U>(self) -> Option<ReplyPolicy<U>> {
        match self {
            ReplyPolicy::AllAgree => Some(ReplyPolicy::AllAgree),
            ReplyPolicy::AnyReply => Some(ReplyPolicy::AnyReply),
            ReplyPolicy::FirstSuccess => Some(ReplyPolicy::FirstSuccess),
            ReplyPolicy::Aggregate(_) => None,
        }
    }
}

impl<T> Clone for ReplyPolicy<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for ReplyPolicy<T> {}

impl<T> fmt::Debug for ReplyPolicy<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReplyPolicy::AllAgree => f.write_str("AllAgree"),
            ReplyPolicy::AnyReply => f.write_str("AnyReply"),
            ReplyPolicy::FirstSuccess => f.write_str("FirstSuccess"),
            ReplyPolicy::Aggregate(_) => f.write_str("Aggregate"),
        }
    }
}

impl<T> PartialEq for ReplyPolicy<T> {
    fn eq(&self, other: &Self) -> bool {
        matches!(
            (self, other),
            (ReplyPolicy::AllAgree, ReplyPolicy::AllAgree)
                | (ReplyPolicy::AnyReply, ReplyPolicy::AnyReply)
                | (ReplyPolicy::FirstSuccess, ReplyPolicy::FirstSuccess)
                | (ReplyPolicy::Aggregate(_), ReplyPolicy::Aggregate(_))
        )
    }
}

/// Where a command is delivered, fixed by the operation rather than by the caller.
pub enum Routing<T> {
    /// One connection, picked by routing key when there is one.
    Single,
    /// Every known node, replies resolved by the policy.
    Broadcast(ReplyPolicy<T>),
}

impl<T> Clone for Routing<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Routing<T> {}

impl<T> fmt::Debug for Routing<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Routing::Single => f.write_str("Single"),
            Routing::Broadcast(policy) => f.debug_tuple("Broadcast").field(policy).finish(),
        }
    }
}

impl<T> PartialEq for Routing<T> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Routing::Single, Routing::Single) => true,
            (Routing::Broadcast(a), Routing::Broadcast(b)) => a == b,
            _ => false,
        }
    }
}

/// One operation invocation: wire arguments plus the decoder for its reply.
///
/// Built by [`crate::CommandFactory`], consumed by [`crate::Executor`].
pub struct CommandDescriptor<T> {
    arguments: CommandArguments,
    decoder: ReplyDecoder<T>,
    routing: Routing<T>,
    routing_key: Option<Bytes>,
}

impl<T: FromReply + 'static> CommandDescriptor<T> {
    pub fn new(arguments: CommandArguments) -> Self {
        Self::with_decoder(arguments, T::from_reply)
    }
}

impl<T> CommandDescriptor<T> {
    pub fn with_decoder<F>(arguments: CommandArguments, decoder: F) -> Self
    where
        F: Fn(Value<'static>) -> Result<T> + Send + Sync + 'static,
    {
        let routing_key = arguments.routing_key().cloned();
        Self {
            arguments,
            decoder: Box::new(decoder),
            routing: Routing::Single,
            routing_key,
        }
    }

    /// Marks the operation as one that must reach every node.
    pub fn broadcast(mut self, policy: ReplyPolicy<T>) -> Self {
        self.routing = Routing::Broadcast(policy);
        self
    }

    pub fn arguments(&self) -> &CommandArguments {
        &self.arguments
    }

    pub fn routing(&self) -> Routing<T> {
        self.routing
    }

    /// Policy used when the command is fanned out, [`ReplyPolicy::AllAgree`] unless the operation
    /// names another.
    pub fn reply_policy(&self) -> ReplyPolicy<T> {
        match self.routing {
            Routing::Broadcast(policy) => policy,
            Routing::Single => ReplyPolicy::AllAgree,
        }
    }

    pub fn routing_key(&self) -> Option<&Bytes> {
        self.routing_key.as_ref()
    }

    pub fn decode(&self, reply: Value<'static>) -> Result<T> {
        (self.decoder)(reply)
    }

    /// Maps the decoded result, keeping arguments, routing and routing key.
    ///
    /// Fails for an aggregated broadcast, whose fold only applies to the unmapped result type.
    pub fn map<U, F>(self, f: F) -> Result<CommandDescriptor<U>>
    where
        T: 'static,
        F: Fn(T) -> U + Send + Sync + 'static,
    {
        let routing = match self.routing {
            Routing::Single => Routing::Single,
            Routing::Broadcast(policy) => match policy.cast() {
                Some(policy) => Routing::Broadcast(policy),
                None => {
                    return Err(Error::encoding(format!(
                        "{}: an aggregated broadcast reply cannot be mapped",
                        self.arguments.command_name()
                    )))
                }
            },
        };
        let decoder = self.decoder;
        Ok(CommandDescriptor {
            arguments: self.arguments,
            decoder: Box::new(move |reply| decoder(reply).map(&f)),
            routing,
            routing_key: self.routing_key,
        })
    }
}

impl<T> fmt::Debug for CommandDescriptor<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandDescriptor")
            .field("arguments", &self.arguments)
            .field("routing", &self.routing)
            .field("routing_key", &self.routing_key)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decoder_runs_without_touching_arguments() {
        let descriptor = CommandDescriptor::<i64>::new(CommandArguments::new("INCR").key("n"));
        assert_eq!(descriptor.decode(Value::Positive(4)).unwrap(), 4);
        assert!(matches!(
            descriptor.decode(Value::status("OK")),
            Err(Error::Decode { .. })
        ));
        assert_eq!(descriptor.routing(), Routing::Single);
        assert_eq!(descriptor.routing_key().unwrap(), &Bytes::from_static(b"n"));
    }

    #[test]
    fn broadcast_keeps_policy() {
        let descriptor = CommandDescriptor::<String>::new(CommandArguments::new("FLUSHALL"))
            .broadcast(ReplyPolicy::AnyReply);
        assert_eq!(descriptor.routing(), Routing::Broadcast(ReplyPolicy::AnyReply));
        assert_eq!(descriptor.reply_policy(), ReplyPolicy::AnyReply);
        assert!(descriptor.routing_key().is_none());
    }

    #[test]
    fn map_wraps_decoder() {
        let descriptor = CommandDescriptor::<i64>::new(CommandArguments::new("STRLEN").key("k"))
            .map(|n| n * 2)
            .unwrap();
        assert_eq!(descriptor.decode(Value::Positive(3)).unwrap(), 6);
        assert_eq!(descriptor.routing(), Routing::Single);
        assert_eq!(descriptor.routing_key().unwrap(), &Bytes::from_static(b"k"));
    }

    #[test]
    fn map_keeps_broadcast_policy() {
        let descriptor = CommandDescriptor::<String>::new(CommandArguments::new("FLUSHALL"))
            .broadcast(ReplyPolicy::AnyReply)
            .map(|status| status == "OK")
            .unwrap();
        assert_eq!(descriptor.routing(), Routing::Broadcast(ReplyPolicy::AnyReply));
        assert!(descriptor.decode(Value::status("OK")).unwrap());
    }

    #[test]
    fn aggregated_broadcast_cannot_be_mapped() {
        let mapped = CommandDescriptor::<i64>::new(CommandArguments::new("DBSIZE"))
            .broadcast(ReplyPolicy::Aggregate(|a: i64, b: i64| a + b))
            .map(|n| n.to_string());
        assert!(matches!(mapped, Err(Error::Encoding { .. })));
    }
}
