//! Scripted connections for tests.

use std::collections::{BTreeMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use parking_lot::Mutex;

use crate::command::CommandArguments;
use crate::error::{Error, Result};
use crate::executor::{Connection, ConnectionProvider, NodeId};
use crate::protocol::Value;

#[derive(Default)]
struct Script {
    replies: VecDeque<Result<Value<'static>>>,
    sent: Vec<Vec<Bytes>>,
}

/// Replays queued replies in order and records every command it is handed. Clones share the
/// script. Once the queue is drained every send fails with [`Error::ZeroRead`].
#[derive(Clone, Default)]
pub struct ScriptedConnection {
    script: Arc<Mutex<Script>>,
}

impl ScriptedConnection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(self, reply: Value<'static>) -> Self {
        self.script.lock().replies.push_back(Ok(reply));
        self
    }

    pub fn fail(self, error: Error) -> Self {
        self.script.lock().replies.push_back(Err(error));
        self
    }

    pub fn sent(&self) -> Vec<Vec<Bytes>> {
        self.script.lock().sent.clone()
    }

    pub fn sent_count(&self) -> usize {
        self.script.lock().sent.len()
    }
}

impl Connection for ScriptedConnection {
    fn send(&mut self, args: &CommandArguments) -> Result<Value<'static>> {
        let mut script = self.script.lock();
        script.sent.push(args.as_slice().to_vec());
        script.replies.pop_front().unwrap_or(Err(Error::ZeroRead))
    }
}

/// Counts how often a wrapped provider hands out a single-target connection.
pub struct CountingProvider<P> {
    inner: P,
    handed_out: AtomicUsize,
}

impl<P> CountingProvider<P> {
    pub fn new(inner: P) -> Self {
        Self {
            inner,
            handed_out: AtomicUsize::new(0),
        }
    }

    pub fn connections_handed_out(&self) -> usize {
        self.handed_out.load(Ordering::SeqCst)
    }
}

impl<P: ConnectionProvider> ConnectionProvider for CountingProvider<P> {
    type Connection = P::Connection;

    fn connection(&self, routing_key: Option<&[u8]>) -> Result<Self::Connection> {
        self.handed_out.fetch_add(1, Ordering::SeqCst);
        self.inner.connection(routing_key)
    }

    fn current_nodes(&self) -> Result<BTreeMap<NodeId, Self::Connection>> {
        self.inner.current_nodes()
    }
}
