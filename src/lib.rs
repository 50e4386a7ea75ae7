//! Client-side command layer for a key-value store.
//!
//! [`CommandFactory`] turns typed operations into [`CommandDescriptor`]s, the [`Executor`] routes
//! them to one node or to every node, and [`CursorIterator`] pages through scans.
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use kvs_client::codec::StreamConnection;
//! use kvs_client::{CommandFactory, Executor, NodeMap, Shared};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let runtime = Arc::new(tokio::runtime::Runtime::new()?);
//! let stream = runtime.block_on(tokio::net::TcpStream::connect("127.0.0.1:7878"))?;
//!
//! let nodes = NodeMap::new();
//! nodes.insert("127.0.0.1:7878", Shared::new(StreamConnection::new(runtime, stream)));
//! let executor = Executor::new(nodes);
//!
//! let factory = CommandFactory::new();
//! executor.execute(factory.set("greeting", "hello"))?;
//! let greeting: Option<String> = executor.execute(factory.get("greeting"))?;
//! # Ok(())
//! # }
//! ```

pub mod codec;
pub mod command;
pub mod config;
pub mod cursor;
pub mod error;
pub mod executor;
pub mod factory;
pub mod protocol;

pub use command::params::{
    BitCountOption, ExpiryOption, FlushMode, ScanParams, SetParams, ZAddParams,
};
pub use command::{
    CommandArguments, CommandDescriptor, FromReply, ReplyPolicy, Routing, ScoredMember, ToArg,
};
pub use config::{FactoryConfig, SearchMode};
pub use cursor::{Cursor, CursorIterator, ScanResult};
pub use error::{Error, Result};
pub use executor::{Connection, ConnectionProvider, Executor, NodeId, NodeMap, Shared};
pub use factory::CommandFactory;
pub use protocol::Value;
