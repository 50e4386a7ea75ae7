//! Paged scanning over the `SCAN` family.
//!
//! A scan starts from the `0` cursor and ends when the store hands `0` back. Pages are not a
//! snapshot: keys written between pages may or may not show up, and a key may appear twice.

use std::fmt;

use bytes::Bytes;
use tracing::{debug, trace};

use crate::command::{CommandDescriptor, FromReply, ToArg};
use crate::error::{Error, Result};
use crate::executor::{ConnectionProvider, Executor};
use crate::protocol::Value;

/// Opaque continuation token of a scan.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Cursor(Bytes);

impl Cursor {
    pub const START: &'static [u8] = b"0";

    pub fn start() -> Self {
        Cursor(Bytes::from_static(Self::START))
    }

    pub fn new(token: impl ToArg) -> Self {
        Cursor(token.to_arg())
    }

    /// True for the sentinel that both begins and ends a scan.
    pub fn is_start(&self) -> bool {
        self.0 == Self::START
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn as_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.0).ok()
    }
}

impl Default for Cursor {
    fn default() -> Self {
        Self::start()
    }
}

impl ToArg for Cursor {
    fn to_arg(&self) -> Bytes {
        self.0.clone()
    }
}

impl fmt::Display for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&String::from_utf8_lossy(&self.0))
    }
}

impl FromReply for Cursor {
    fn from_reply(reply: Value<'static>) -> Result<Self> {
        match reply {
            Value::Bytes(b) => Ok(Cursor(Bytes::from(b.into_owned()))),
            Value::String(s) => Ok(Cursor(Bytes::from(s.into_owned()))),
            Value::Positive(n) => Ok(Cursor(Bytes::from(n.to_string()))),
            other => Err(Error::decode("cursor", other)),
        }
    }
}

/// One page of a scan: the cursor to continue from and the items of this page.
#[derive(Debug, Clone, PartialEq)]
pub struct ScanResult<T> {
    pub cursor: Cursor,
    pub items: Vec<T>,
}

impl<T> ScanResult<T> {
    pub fn new(cursor: Cursor, items: Vec<T>) -> Self {
        Self { cursor, items }
    }

    /// True when this was the last page.
    pub fn is_complete(&self) -> bool {
        self.cursor.is_start()
    }

    /// Decodes `[cursor, items]`, handing the raw items to `items`.
    pub fn decode_with<F>(reply: Value<'static>, items: F) -> Result<Self>
    where
        F: FnOnce(Value<'static>) -> Result<Vec<T>>,
    {
        match reply {
            Value::Array(parts) => match <[Value<'static>; 2]>::try_from(parts) {
                Ok([cursor, page]) => Ok(Self {
                    cursor: Cursor::from_reply(cursor)?,
                    items: items(page)?,
                }),
                Err(parts) => Err(Error::decode("[cursor, items]", parts)),
            },
            other => Err(Error::decode("[cursor, items]", other)),
        }
    }
}

impl<T: FromReply> FromReply for ScanResult<T> {
    fn from_reply(reply: Value<'static>) -> Result<Self> {
        Self::decode_with(reply, Vec::<T>::from_reply)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanState {
    Start,
    Paging,
    Done,
}

type PageBuilder<'e, T> = Box<dyn FnMut(&Cursor) -> Result<CommandDescriptor<ScanResult<T>>> + 'e>;

/// Drives a scan page by page.
///
/// The connection is chosen on the first page and kept for the rest of the iteration, so every
/// cursor is handed back to the node that issued it. Not meant to be shared between threads.
pub struct CursorIterator<'e, P: ConnectionProvider, T> {
    executor: &'e Executor<P>,
    build: PageBuilder<'e, T>,
    connection: Option<P::Connection>,
    cursor: Cursor,
    state: ScanState,
    pages: usize,
    fused: bool,
}

impl<'e, P: ConnectionProvider, T> CursorIterator<'e, P, T> {
    /// `build` turns the current cursor into the page command, e.g.
    /// `|cursor| Ok(factory.scan(cursor, &params))`.
    pub fn new<F>(executor: &'e Executor<P>, build: F) -> Self
    where
        F: FnMut(&Cursor) -> Result<CommandDescriptor<ScanResult<T>>> + 'e,
    {
        Self {
            executor,
            build: Box::new(build),
            connection: None,
            cursor: Cursor::start(),
            state: ScanState::Start,
            pages: 0,
            fused: false,
        }
    }

    pub fn cursor(&self) -> &Cursor {
        &self.cursor
    }

    pub fn state(&self) -> ScanState {
        self.state
    }

    pub fn is_done(&self) -> bool {
        self.state == ScanState::Done
    }

    /// Pages fetched from the store so far.
    pub fn pages_fetched(&self) -> usize {
        self.pages
    }

    /// Fetches the next page. Once the scan is done this returns an empty page without touching
    /// the network. A failed page leaves the cursor untouched, so calling again retries it.
    pub fn next_batch(&mut self) -> Result<ScanResult<T>> {
        if self.state == ScanState::Done {
            return Ok(ScanResult::new(self.cursor.clone(), Vec::new()));
        }

        let command = (self.build)(&self.cursor)?;
        let connection = match self.connection.take() {
            Some(connection) => connection,
            None => self
                .executor
                .provider()
                .connection(command.routing_key().map(|k| &k[..]))?,
        };
        let connection = self.connection.insert(connection);

        trace!(
            command = %command.arguments().command_name(),
            cursor = %self.cursor,
            page = self.pages + 1,
            "fetching scan page"
        );
        let page = self.executor.execute_on(connection, &command)?;
        self.pages += 1;
        self.cursor = page.cursor.clone();
        if page.is_complete() {
            debug!(
                command = %command.arguments().command_name(),
                pages = self.pages,
                "scan complete"
            );
            self.state = ScanState::Done;
        } else {
            self.state = ScanState::Paging;
        }
        Ok(page)
    }

    /// Drains every remaining page into one list, in page order.
    pub fn collect_all(&mut self) -> Result<Vec<T>> {
        let mut items = Vec::new();
        while !self.is_done() {
            items.extend(self.next_batch()?.items);
        }
        Ok(items)
    }
}

/// Yields pages until the scan is done. An error is yielded once and ends the iteration.
impl<P: ConnectionProvider, T> Iterator for CursorIterator<'_, P, T> {
    type Item = Result<ScanResult<T>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.fused || self.is_done() {
            return None;
        }
        let page = self.next_batch();
        if page.is_err() {
            self.fused = true;
        }
        Some(page)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::params::ScanParams;
    use crate::executor::mock::{CountingProvider, ScriptedConnection};
    use crate::executor::NodeMap;
    use crate::factory::CommandFactory;

    fn page(cursor: &str, items: &[&str]) -> Value<'static> {
        Value::Array(vec![
            Value::bulk(cursor),
            Value::Array(items.iter().map(|i| Value::bulk(*i)).collect()),
        ])
    }

    fn single_node(connection: &ScriptedConnection) -> Executor<CountingProvider<NodeMap<ScriptedConnection>>> {
        let nodes = NodeMap::new();
        nodes.insert("n1", connection.clone());
        Executor::new(CountingProvider::new(nodes))
    }

    #[test]
    fn cursor_sentinel() {
        assert!(Cursor::start().is_start());
        assert!(Cursor::new("0").is_start());
        assert!(Cursor::new(&b"0"[..]).is_start());
        assert!(!Cursor::new("17").is_start());
        assert_eq!(Cursor::new("17").as_str(), Some("17"));
    }

    #[test]
    fn decodes_page() {
        let result = ScanResult::<String>::from_reply(page("5", &["a", "b"])).unwrap();
        assert_eq!(result.cursor, Cursor::new("5"));
        assert_eq!(result.items, vec!["a", "b"]);
        assert!(!result.is_complete());
        assert!(ScanResult::<String>::from_reply(Value::Array(vec![Value::bulk("0")])).is_err());
    }

    #[test]
    fn terminates_when_cursor_returns_to_start() {
        let connection = ScriptedConnection::new()
            .reply(page("5", &["a", "b"]))
            .reply(page("9", &["c"]))
            .reply(page("0", &[]));
        let executor = single_node(&connection);
        let factory = CommandFactory::new();
        let params = ScanParams::new().match_pattern("*").count(2);

        let mut scan = CursorIterator::new(&executor, |cursor| {
            Ok(factory.scan::<String>(cursor, &params))
        });
        assert_eq!(scan.state(), ScanState::Start);
        assert_eq!(connection.sent_count(), 0);

        let mut seen = Vec::new();
        seen.extend(scan.next_batch().unwrap().items);
        assert_eq!(scan.state(), ScanState::Paging);
        seen.extend(scan.next_batch().unwrap().items);
        seen.extend(scan.next_batch().unwrap().items);
        assert_eq!(seen, vec!["a", "b", "c"]);
        assert!(scan.is_done());
        assert_eq!(connection.sent_count(), 3);

        let after = scan.next_batch().unwrap();
        assert!(after.items.is_empty());
        assert!(after.is_complete());
        assert_eq!(connection.sent_count(), 3);
        assert_eq!(scan.pages_fetched(), 3);

        let sent = connection.sent();
        let cursors: Vec<&[u8]> = sent.iter().map(|args| &args[1][..]).collect();
        assert_eq!(cursors, vec![&b"0"[..], b"5", b"9"]);
        assert_eq!(
            sent[1].iter().map(|t| &t[..]).collect::<Vec<_>>(),
            vec![&b"SCAN"[..], b"5", b"MATCH", b"*", b"COUNT", b"2"]
        );
    }

    #[test]
    fn connection_is_selected_once() {
        let connection = ScriptedConnection::new()
            .reply(page("3", &["x"]))
            .reply(page("0", &["y"]));
        let executor = single_node(&connection);
        let factory = CommandFactory::new();
        let params = ScanParams::new();

        let items = CursorIterator::new(&executor, |cursor| {
            factory.sscan::<String>("set", cursor, &params)
        })
        .collect_all()
        .unwrap();
        assert_eq!(items, vec!["x", "y"]);
        assert_eq!(executor.provider().connections_handed_out(), 1);
    }

    #[test]
    fn iterator_yields_pages_until_done() {
        let connection = ScriptedConnection::new()
            .reply(page("4", &["a"]))
            .reply(page("0", &["b"]));
        let executor = single_node(&connection);
        let factory = CommandFactory::new();
        let params = ScanParams::new();

        let pages: Vec<ScanResult<String>> = CursorIterator::new(&executor, |cursor| {
            Ok(factory.scan::<String>(cursor, &params))
        })
        .collect::<Result<_>>()
        .unwrap();
        assert_eq!(pages.len(), 2);
        assert!(pages[1].is_complete());
    }

    #[test]
    fn failed_page_keeps_cursor_for_retry() {
        let connection = ScriptedConnection::new()
            .reply(page("8", &["a"]))
            .fail(Error::ZeroRead)
            .reply(page("0", &["b"]));
        let executor = single_node(&connection);
        let factory = CommandFactory::new();
        let params = ScanParams::new();

        let mut scan = CursorIterator::new(&executor, |cursor| {
            Ok(factory.scan::<String>(cursor, &params))
        });
        scan.next_batch().unwrap();
        assert!(scan.next_batch().unwrap_err().is_transport());
        assert_eq!(scan.cursor(), &Cursor::new("8"));
        assert_eq!(scan.next_batch().unwrap().items, vec!["b"]);
        assert!(scan.is_done());
    }

    #[test]
    fn build_error_sends_nothing() {
        let connection = ScriptedConnection::new();
        let executor = single_node(&connection);
        let factory = CommandFactory::new();
        let params = ScanParams::new().of_type("string");

        let mut scan = CursorIterator::new(&executor, |cursor| {
            factory.hscan::<String, String>("h", cursor, &params)
        });
        assert!(matches!(scan.next_batch(), Err(Error::Encoding { .. })));
        assert_eq!(connection.sent_count(), 0);
        assert_eq!(executor.provider().connections_handed_out(), 0);
    }
}
