use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use crate::command::CommandArguments;
use crate::error::{Error, Result};
use crate::protocol::Value;

/// Identity of one node of the deployment, usually its `host:port`.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(Arc<str>);

impl NodeId {
    pub fn new(id: impl AsRef<str>) -> Self {
        NodeId(Arc::from(id.as_ref()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for NodeId {
    fn from(id: &str) -> Self {
        NodeId::new(id)
    }
}

impl From<String> for NodeId {
    fn from(id: String) -> Self {
        NodeId(Arc::from(id))
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", &*self.0)
    }
}

/// A live connection able to carry one command and hand back its reply.
///
/// Server error replies come back as [`Value::Error`], not as `Err`. `Err` is for transport
/// failures.
pub trait Connection {
    fn send(&mut self, args: &CommandArguments) -> Result<Value<'static>>;
}

impl<C: Connection + ?Sized> Connection for &mut C {
    fn send(&mut self, args: &CommandArguments) -> Result<Value<'static>> {
        (**self).send(args)
    }
}

impl<C: Connection + ?Sized> Connection for Box<C> {
    fn send(&mut self, args: &CommandArguments) -> Result<Value<'static>> {
        (**self).send(args)
    }
}

/// Hands out connections. Node membership may change between calls, so callers read it fresh
/// every time they need it.
pub trait ConnectionProvider {
    type Connection: Connection;

    /// Connection for a single-target command, chosen by `routing_key` when there is one.
    fn connection(&self, routing_key: Option<&[u8]>) -> Result<Self::Connection>;

    /// One connection per node known right now, in node order.
    fn current_nodes(&self) -> Result<BTreeMap<NodeId, Self::Connection>>;
}

impl<P: ConnectionProvider + ?Sized> ConnectionProvider for &P {
    type Connection = P::Connection;

    fn connection(&self, routing_key: Option<&[u8]>) -> Result<Self::Connection> {
        (**self).connection(routing_key)
    }

    fn current_nodes(&self) -> Result<BTreeMap<NodeId, Self::Connection>> {
        (**self).current_nodes()
    }
}

impl<P: ConnectionProvider + ?Sized> ConnectionProvider for Arc<P> {
    type Connection = P::Connection;

    fn connection(&self, routing_key: Option<&[u8]>) -> Result<Self::Connection> {
        (**self).connection(routing_key)
    }

    fn current_nodes(&self) -> Result<BTreeMap<NodeId, Self::Connection>> {
        (**self).current_nodes()
    }
}

/// A connection shared by clones of the handle, one command at a time.
pub struct Shared<C>(Arc<Mutex<C>>);

impl<C> Shared<C> {
    pub fn new(connection: C) -> Self {
        Shared(Arc::new(Mutex::new(connection)))
    }
}

impl<C> Clone for Shared<C> {
    fn clone(&self) -> Self {
        Shared(Arc::clone(&self.0))
    }
}

impl<C: Connection> Connection for Shared<C> {
    fn send(&mut self, args: &CommandArguments) -> Result<Value<'static>> {
        self.0.lock().send(args)
    }
}

/// Static node table that can be edited while in use.
///
/// Keyless commands go to the first node. Keyed commands go to the node picked by a hash of the
/// routing key, so one key always lands on the same node while membership is unchanged.
pub struct NodeMap<C> {
    nodes: RwLock<BTreeMap<NodeId, C>>,
}

impl<C: Clone> NodeMap<C> {
    pub fn new() -> Self {
        Self {
            nodes: RwLock::new(BTreeMap::new()),
        }
    }

    pub fn insert(&self, id: impl Into<NodeId>, connection: C) -> Option<C> {
        self.nodes.write().insert(id.into(), connection)
    }

    pub fn remove(&self, id: &NodeId) -> Option<C> {
        self.nodes.write().remove(id)
    }

    pub fn node_ids(&self) -> Vec<NodeId> {
        self.nodes.read().keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.nodes.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.read().is_empty()
    }
}

impl<C: Clone> Default for NodeMap<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Connection + Clone> ConnectionProvider for NodeMap<C> {
    type Connection = C;

    fn connection(&self, routing_key: Option<&[u8]>) -> Result<C> {
        let nodes = self.nodes.read();
        if nodes.is_empty() {
            return Err(Error::NoNodes);
        }
        let index = routing_key.map_or(0, |key| (fnv1a(key) % nodes.len() as u64) as usize);
        nodes.values().nth(index).cloned().ok_or(Error::NoNodes)
    }

    fn current_nodes(&self) -> Result<BTreeMap<NodeId, C>> {
        Ok(self.nodes.read().clone())
    }
}

fn fnv1a(bytes: &[u8]) -> u64 {
    bytes.iter().fold(0xcbf2_9ce4_8422_2325, |hash, b| {
        (hash ^ u64::from(*b)).wrapping_mul(0x0100_0000_01b3)
    })
}
