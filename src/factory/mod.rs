//! One builder method per operation.
//!
//! Every method is pure: it encodes the caller's parameters into a [`CommandDescriptor`](crate::command::CommandDescriptor) and
//! never touches a connection. Keys and values take any [`ToArg`](crate::command::ToArg), so `"k"` and `b"k"` build the
//! same tokens. The result element type picks the text (`String`) or binary (`Bytes`) reading of
//! the reply.

use bytes::Bytes;

use crate::command::CommandArguments;
use crate::config::FactoryConfig;

/// Generates builders for operations shaped `KEYWORD key` with a plain reply.
macro_rules! key_commands {
    ($($(#[$doc:meta])* $name:ident => $keyword:literal -> $out:ty;)*) => {
        impl CommandFactory {
            $(
                $(#[$doc])*
                pub fn $name(&self, key: impl ToArg) -> CommandDescriptor<$out> {
                    CommandDescriptor::new(self.command($keyword).key(key))
                }
            )*
        }
    };
}

mod hashes;
mod keys;
mod lists;
pub mod search;
mod server;
mod sets;
mod sorted_sets;
mod strings;

#[derive(Debug, Clone, Default)]
pub struct CommandFactory {
    config: FactoryConfig,
    key_prefix: Option<Bytes>,
}

impl CommandFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: FactoryConfig) -> Self {
        let key_prefix = config.key_prefix_bytes();
        Self { config, key_prefix }
    }

    pub fn config(&self) -> &FactoryConfig {
        &self.config
    }

    pub(crate) fn command(&self, keyword: &'static str) -> CommandArguments {
        CommandArguments::new(keyword).with_key_prefix(self.key_prefix.clone())
    }
}
