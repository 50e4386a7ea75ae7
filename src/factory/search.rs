//! Secondary index commands (`FT.*`).
//!
//! With [`SearchMode::Broadcast`] index definitions and search configuration live on each node,
//! so `FT.CREATE`, `FT.DROPINDEX` and `FT.CONFIG SET` are broadcast while queries run
//! single-target. With [`SearchMode::Light`] every `FT.*` command runs on one node and the index
//! name is routed like a key, key prefix included.
//!
//! Aggregations with `WITHCURSOR` page through [`crate::CursorIterator`]: the first page is
//! `FT.AGGREGATE`, later pages are `FT.CURSOR READ`, and cursor id `0` ends the iteration.

use bytes::Bytes;

use crate::command::reply::pairs;
use crate::command::{CommandArguments, CommandDescriptor, FromReply, ReplyPolicy, ToArg};
use crate::config::SearchMode;
use crate::cursor::{Cursor, ScanResult};
use crate::error::{Error, Result};
use crate::factory::CommandFactory;
use crate::protocol::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexDataType {
    Hash,
    Json,
}

impl ToArg for IndexDataType {
    fn to_arg(&self) -> Bytes {
        Bytes::from_static(match self {
            IndexDataType::Hash => b"HASH",
            IndexDataType::Json => b"JSON",
        })
    }
}

/// Index definition: `[ON HASH|JSON] [PREFIX n p...] [FILTER f] [STOPWORDS n w...]`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexOptions {
    on: Option<IndexDataType>,
    prefixes: Vec<Bytes>,
    filter: Option<Bytes>,
    stopwords: Option<Vec<Bytes>>,
}

impl IndexOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on(mut self, data_type: IndexDataType) -> Self {
        self.on = Some(data_type);
        self
    }

    /// Indexes only keys starting with one of `prefixes`.
    pub fn prefixes(mut self, prefixes: impl IntoIterator<Item = impl ToArg>) -> Self {
        self.prefixes = prefixes.into_iter().map(|p| p.to_arg()).collect();
        self
    }

    pub fn filter(mut self, expression: impl ToArg) -> Self {
        self.filter = Some(expression.to_arg());
        self
    }

    /// Replaces the default stopword list. An empty list disables stopwords.
    pub fn stopwords(mut self, words: impl IntoIterator<Item = impl ToArg>) -> Self {
        self.stopwords = Some(words.into_iter().map(|w| w.to_arg()).collect());
        self
    }

    fn append(&self, args: CommandArguments) -> CommandArguments {
        let mut args = args.add_pair("ON", self.on);
        if !self.prefixes.is_empty() {
            args = args
                .add("PREFIX")
                .add(self.prefixes.len())
                .add_all(&self.prefixes);
        }
        args = args.add_pair("FILTER", self.filter.as_ref());
        if let Some(words) = &self.stopwords {
            args = args.add("STOPWORDS").add(words.len()).add_all(words);
        }
        args
    }
}

#[derive(Debug, Clone, PartialEq)]
enum FieldKind {
    Text { weight: Option<f64> },
    Numeric,
    Tag { separator: Option<char> },
}

/// One attribute of an index schema.
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaField {
    name: Bytes,
    alias: Option<Bytes>,
    kind: FieldKind,
    sortable: bool,
}

impl SchemaField {
    fn with_kind(name: impl ToArg, kind: FieldKind) -> Self {
        Self {
            name: name.to_arg(),
            alias: None,
            kind,
            sortable: false,
        }
    }

    pub fn text(name: impl ToArg) -> Self {
        Self::with_kind(name, FieldKind::Text { weight: None })
    }

    pub fn numeric(name: impl ToArg) -> Self {
        Self::with_kind(name, FieldKind::Numeric)
    }

    pub fn tag(name: impl ToArg) -> Self {
        Self::with_kind(name, FieldKind::Tag { separator: None })
    }

    pub fn alias(mut self, alias: impl ToArg) -> Self {
        self.alias = Some(alias.to_arg());
        self
    }

    /// Only meaningful for text fields.
    pub fn weight(mut self, weight: f64) -> Self {
        if let FieldKind::Text { weight: w } = &mut self.kind {
            *w = Some(weight);
        }
        self
    }

    /// Only meaningful for tag fields.
    pub fn separator(mut self, separator: char) -> Self {
        if let FieldKind::Tag { separator: s } = &mut self.kind {
            *s = Some(separator);
        }
        self
    }

    pub fn sortable(mut self) -> Self {
        self.sortable = true;
        self
    }

    fn append(&self, args: CommandArguments) -> CommandArguments {
        let args = args.add(&self.name).add_pair("AS", self.alias.as_ref());
        let args = match self.kind {
            FieldKind::Text { weight } => args.add("TEXT").add_pair("WEIGHT", weight),
            FieldKind::Numeric => args.add("NUMERIC"),
            FieldKind::Tag { separator } => args
                .add("TAG")
                .add_pair("SEPARATOR", separator.map(|c| c.to_string())),
        };
        if self.sortable {
            args.add("SORTABLE")
        } else {
            args
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

impl ToArg for SortOrder {
    fn to_arg(&self) -> Bytes {
        Bytes::from_static(match self {
            SortOrder::Asc => b"ASC",
            SortOrder::Desc => b"DESC",
        })
    }
}

/// `FT.SEARCH` options, written in the order the command documents.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchOptions {
    no_content: bool,
    return_fields: Vec<Bytes>,
    sort_by: Option<(Bytes, Option<SortOrder>)>,
    limit: Option<(u64, u64)>,
    params: Vec<(Bytes, Bytes)>,
    dialect: Option<u32>,
}

impl SearchOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ids only, no document fields.
    pub fn no_content(mut self) -> Self {
        self.no_content = true;
        self
    }

    pub fn return_fields(mut self, fields: impl IntoIterator<Item = impl ToArg>) -> Self {
        self.return_fields = fields.into_iter().map(|f| f.to_arg()).collect();
        self
    }

    pub fn sort_by(mut self, field: impl ToArg, order: Option<SortOrder>) -> Self {
        self.sort_by = Some((field.to_arg(), order));
        self
    }

    /// Page window: skip `offset` results, return at most `count`.
    pub fn limit(mut self, offset: u64, count: u64) -> Self {
        self.limit = Some((offset, count));
        self
    }

    /// Binds `$name` in the query to `value`.
    pub fn param(mut self, name: impl ToArg, value: impl ToArg) -> Self {
        self.params.push((name.to_arg(), value.to_arg()));
        self
    }

    pub fn dialect(mut self, dialect: u32) -> Self {
        self.dialect = Some(dialect);
        self
    }

    fn append(&self, args: CommandArguments, default_dialect: Option<u32>) -> Result<CommandArguments> {
        if self.dialect == Some(0) {
            return Err(Error::encoding("FT.SEARCH: dialect must be at least 1"));
        }
        let mut args = if self.no_content { args.add("NOCONTENT") } else { args };
        if !self.return_fields.is_empty() {
            args = args
                .add("RETURN")
                .add(self.return_fields.len())
                .add_all(&self.return_fields);
        }
        if let Some((field, order)) = &self.sort_by {
            args = args.add("SORTBY").add(field).add_opt(*order);
        }
        if let Some((offset, count)) = self.limit {
            args = args.add("LIMIT").add(offset).add(count);
        }
        if !self.params.is_empty() {
            args = args.add("PARAMS").add(self.params.len() * 2);
            for (name, value) in &self.params {
                args = args.add(name).add(value);
            }
        }
        Ok(args.add_pair("DIALECT", self.dialect.or(default_dialect)))
    }
}

/// Per-group reduction of an aggregation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reducer {
    /// `REDUCE COUNT 0 AS alias`
    Count { alias: Bytes },
    /// `REDUCE SUM 1 property AS alias`
    Sum { property: Bytes, alias: Bytes },
}

impl Reducer {
    pub fn count(alias: impl ToArg) -> Self {
        Reducer::Count {
            alias: alias.to_arg(),
        }
    }

    pub fn sum(property: impl ToArg, alias: impl ToArg) -> Self {
        Reducer::Sum {
            property: property.to_arg(),
            alias: alias.to_arg(),
        }
    }

    fn append(&self, args: CommandArguments) -> CommandArguments {
        match self {
            Reducer::Count { alias } => args.add("REDUCE").add("COUNT").add(0u64).add("AS").add(alias),
            Reducer::Sum { property, alias } => args
                .add("REDUCE")
                .add("SUM")
                .add(1u64)
                .add(property)
                .add("AS")
                .add(alias),
        }
    }
}

/// `FT.AGGREGATE` pipeline: `[LOAD] [GROUPBY .. REDUCE ..]* [SORTBY] [LIMIT]`, then the cursor
/// settings and the dialect.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AggregateOptions {
    load: Vec<Bytes>,
    groups: Vec<(Vec<Bytes>, Vec<Reducer>)>,
    sort_by: Vec<(Bytes, SortOrder)>,
    limit: Option<(u64, u64)>,
    cursor_count: Option<u64>,
    max_idle: Option<u64>,
    dialect: Option<u32>,
}

impl AggregateOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load(mut self, fields: impl IntoIterator<Item = impl ToArg>) -> Self {
        self.load = fields.into_iter().map(|f| f.to_arg()).collect();
        self
    }

    /// Adds a `GROUPBY` step. Steps run in the order they were added.
    pub fn group_by(
        mut self,
        properties: impl IntoIterator<Item = impl ToArg>,
        reducers: impl IntoIterator<Item = Reducer>,
    ) -> Self {
        self.groups.push((
            properties.into_iter().map(|p| p.to_arg()).collect(),
            reducers.into_iter().collect(),
        ));
        self
    }

    pub fn sort_by(mut self, property: impl ToArg, order: SortOrder) -> Self {
        self.sort_by.push((property.to_arg(), order));
        self
    }

    pub fn limit(mut self, offset: u64, count: u64) -> Self {
        self.limit = Some((offset, count));
        self
    }

    /// Rows per cursor page.
    pub fn cursor_count(mut self, count: u64) -> Self {
        self.cursor_count = Some(count);
        self
    }

    /// Milliseconds an idle cursor survives on the server.
    pub fn max_idle(mut self, millis: u64) -> Self {
        self.max_idle = Some(millis);
        self
    }

    pub fn dialect(mut self, dialect: u32) -> Self {
        self.dialect = Some(dialect);
        self
    }

    fn append(
        &self,
        mut args: CommandArguments,
        default_dialect: Option<u32>,
        with_cursor: bool,
    ) -> Result<CommandArguments> {
        if self.dialect == Some(0) {
            return Err(Error::encoding("FT.AGGREGATE: dialect must be at least 1"));
        }
        if !self.load.is_empty() {
            args = args.add("LOAD").add(self.load.len()).add_all(&self.load);
        }
        for (properties, reducers) in &self.groups {
            if properties.is_empty() {
                return Err(Error::encoding("FT.AGGREGATE: GROUPBY needs at least one property"));
            }
            args = args.add("GROUPBY").add(properties.len()).add_all(properties);
            args = reducers.iter().fold(args, |args, reducer| reducer.append(args));
        }
        if !self.sort_by.is_empty() {
            args = args.add("SORTBY").add(self.sort_by.len() * 2);
            for (property, order) in &self.sort_by {
                args = args.add(property).add(*order);
            }
        }
        if let Some((offset, count)) = self.limit {
            args = args.add("LIMIT").add(offset).add(count);
        }
        if with_cursor {
            args = args
                .add("WITHCURSOR")
                .add_pair("COUNT", self.cursor_count)
                .add_pair("MAXIDLE", self.max_idle);
        }
        Ok(args.add_pair("DIALECT", self.dialect.or(default_dialect)))
    }
}

fn find_field<'a>(fields: &'a [(String, Bytes)], name: &str) -> Option<&'a Bytes> {
    fields
        .iter()
        .find(|(field, _)| field == name)
        .map(|(_, value)| value)
}

/// One output row of an aggregation, fields in reply order.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateRow {
    pub fields: Vec<(String, Bytes)>,
}

impl AggregateRow {
    pub fn get(&self, name: &str) -> Option<&Bytes> {
        find_field(&self.fields, name)
    }

    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(|v| std::str::from_utf8(v).ok())
    }

    fn from_result(entry: Value<'static>) -> Result<Self> {
        match entry {
            Value::Map(entries) => {
                let mut fields = Vec::new();
                for (name, value) in entries {
                    if String::from_reply(name)? == "extra_attributes" {
                        fields = pairs::<String, Bytes>(value)?;
                    }
                }
                Ok(AggregateRow { fields })
            }
            flat => Ok(AggregateRow {
                fields: pairs::<String, Bytes>(flat)?,
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AggregateReply {
    pub total: i64,
    pub rows: Vec<AggregateRow>,
}

impl AggregateReply {
    /// Reads `[total, row, row, ...]` or the map form with `total_results` and `results`.
    fn decode(reply: Value<'static>) -> Result<Self> {
        match reply {
            Value::Array(items) => {
                let mut items = items.into_iter();
                let total = match items.next() {
                    Some(total) => i64::from_reply(total)?,
                    None => return Err(Error::decode("aggregate reply", "empty array")),
                };
                let rows = items.map(AggregateRow::from_result).collect::<Result<_>>()?;
                Ok(AggregateReply { total, rows })
            }
            Value::Map(entries) => {
                let mut reply = AggregateReply {
                    total: 0,
                    rows: Vec::new(),
                };
                for (name, value) in entries {
                    match String::from_reply(name)?.as_str() {
                        "total_results" => reply.total = i64::from_reply(value)?,
                        "results" => {
                            reply.rows = Vec::<Value<'static>>::from_reply(value)?
                                .into_iter()
                                .map(AggregateRow::from_result)
                                .collect::<Result<_>>()?
                        }
                        _ => {}
                    }
                }
                Ok(reply)
            }
            other => Err(Error::decode("aggregate reply", other)),
        }
    }

    /// Reads a cursor page, `[rows, cursor id]`.
    fn decode_page(reply: Value<'static>) -> Result<ScanResult<AggregateRow>> {
        match reply {
            Value::Array(parts) => match <[Value<'static>; 2]>::try_from(parts) {
                Ok([rows, cursor]) => Ok(ScanResult::new(
                    Cursor::from_reply(cursor)?,
                    AggregateReply::decode(rows)?.rows,
                )),
                Err(parts) => Err(Error::decode("[rows, cursor]", parts)),
            },
            other => Err(Error::decode("[rows, cursor]", other)),
        }
    }
}

/// One hit of a search.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: String,
    pub fields: Vec<(String, Bytes)>,
}

impl Document {
    pub fn get(&self, name: &str) -> Option<&Bytes> {
        find_field(&self.fields, name)
    }

    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(|v| std::str::from_utf8(v).ok())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SearchReply {
    /// Matches in the whole index, not just this page.
    pub total: i64,
    pub documents: Vec<Document>,
}

impl SearchReply {
    /// Reads `[total, id, [field, value, ...], id, ...]`, or `[total, id, ...]` without content,
    /// as well as the map form with `total_results` and `results`.
    fn decode(reply: Value<'static>, no_content: bool) -> Result<Self> {
        match reply {
            Value::Array(items) => {
                let mut items = items.into_iter();
                let total = match items.next() {
                    Some(total) => i64::from_reply(total)?,
                    None => return Err(Error::decode("search reply", "empty array")),
                };
                let mut documents = Vec::new();
                while let Some(id) = items.next() {
                    let id = String::from_reply(id)?;
                    let fields = if no_content {
                        Vec::new()
                    } else {
                        match items.next() {
                            Some(fields) => pairs::<String, Bytes>(fields)?,
                            None => return Err(Error::decode("document fields", id)),
                        }
                    };
                    documents.push(Document { id, fields });
                }
                Ok(SearchReply { total, documents })
            }
            Value::Map(entries) => {
                let mut reply = SearchReply {
                    total: 0,
                    documents: Vec::new(),
                };
                for (name, value) in entries {
                    match String::from_reply(name)?.as_str() {
                        "total_results" => reply.total = i64::from_reply(value)?,
                        "results" => {
                            reply.documents = Vec::<Value<'static>>::from_reply(value)?
                                .into_iter()
                                .map(Document::from_result_map)
                                .collect::<Result<_>>()?
                        }
                        _ => {}
                    }
                }
                Ok(reply)
            }
            other => Err(Error::decode("search reply", other)),
        }
    }
}

impl Document {
    fn from_result_map(entry: Value<'static>) -> Result<Self> {
        let mut id = None;
        let mut fields = Vec::new();
        for (name, value) in pairs::<String, Value<'static>>(entry)? {
            match name.as_str() {
                "id" => id = Some(String::from_reply(value)?),
                "extra_attributes" => fields = pairs::<String, Bytes>(value)?,
                _ => {}
            }
        }
        match id {
            Some(id) => Ok(Document { id, fields }),
            None => Err(Error::decode("document id", "result without id")),
        }
    }
}

impl CommandFactory {
    /// Creates an index, on every node unless the search mode is light.
    pub fn ft_create(
        &self,
        index: impl ToArg,
        options: &IndexOptions,
        schema: &[SchemaField],
    ) -> Result<CommandDescriptor<String>> {
        if schema.is_empty() {
            return Err(Error::encoding("FT.CREATE requires at least one schema field"));
        }
        let args = options
            .append(self.with_index(self.command("FT.CREATE"), index))
            .add("SCHEMA");
        let args = schema.iter().fold(args, |args, field| field.append(args));
        Ok(self.node_local(CommandDescriptor::new(args), ReplyPolicy::AllAgree))
    }

    /// Drops the index, with its documents when `delete_documents` is set.
    pub fn ft_drop_index(
        &self,
        index: impl ToArg,
        delete_documents: bool,
    ) -> CommandDescriptor<String> {
        let args = self.with_index(self.command("FT.DROPINDEX"), index);
        let args = if delete_documents { args.add("DD") } else { args };
        self.node_local(CommandDescriptor::new(args), ReplyPolicy::AnyReply)
    }

    pub fn ft_config_set(&self, option: impl ToArg, value: impl ToArg) -> CommandDescriptor<String> {
        self.node_local(
            CommandDescriptor::new(self.command("FT.CONFIG").add("SET").add(option).add(value)),
            ReplyPolicy::AllAgree,
        )
    }

    /// Runs a query. The configured search dialect applies unless `options` names one.
    pub fn ft_search(
        &self,
        index: impl ToArg,
        query: impl ToArg,
        options: &SearchOptions,
    ) -> Result<CommandDescriptor<SearchReply>> {
        let args = options.append(
            self.with_index(self.command("FT.SEARCH"), index).add(query),
            self.config().search_dialect,
        )?;
        let no_content = options.no_content;
        Ok(CommandDescriptor::with_decoder(args, move |reply| {
            SearchReply::decode(reply, no_content)
        }))
    }

    /// Runs an aggregation and returns every row at once.
    pub fn ft_aggregate(
        &self,
        index: impl ToArg,
        query: impl ToArg,
        options: &AggregateOptions,
    ) -> Result<CommandDescriptor<AggregateReply>> {
        let args = options.append(
            self.with_index(self.command("FT.AGGREGATE"), index).add(query),
            self.config().search_dialect,
            false,
        )?;
        Ok(CommandDescriptor::with_decoder(args, AggregateReply::decode))
    }

    /// First page of a cursor-backed aggregation.
    pub fn ft_aggregate_with_cursor(
        &self,
        index: impl ToArg,
        query: impl ToArg,
        options: &AggregateOptions,
    ) -> Result<CommandDescriptor<ScanResult<AggregateRow>>> {
        let args = options.append(
            self.with_index(self.command("FT.AGGREGATE"), index).add(query),
            self.config().search_dialect,
            true,
        )?;
        Ok(CommandDescriptor::with_decoder(args, AggregateReply::decode_page))
    }

    /// Next page of an aggregation cursor. It must reach the node that opened the cursor.
    pub fn ft_cursor_read(
        &self,
        index: impl ToArg,
        cursor: &Cursor,
        count: Option<u64>,
    ) -> CommandDescriptor<ScanResult<AggregateRow>> {
        let args = self
            .with_index(self.command("FT.CURSOR").add("READ"), index)
            .add(cursor)
            .add_pair("COUNT", count);
        CommandDescriptor::with_decoder(args, AggregateReply::decode_page)
    }

    /// Releases an aggregation cursor before it is exhausted.
    pub fn ft_cursor_del(&self, index: impl ToArg, cursor: &Cursor) -> CommandDescriptor<String> {
        CommandDescriptor::new(
            self.with_index(self.command("FT.CURSOR").add("DEL"), index)
                .add(cursor),
        )
    }

    /// Page builder for [`crate::Executor::scan_iter`]: `FT.AGGREGATE` on the start cursor,
    /// `FT.CURSOR READ` with the configured page size after that.
    pub fn ft_aggregate_page(
        &self,
        index: impl ToArg,
        query: impl ToArg,
        options: &AggregateOptions,
        cursor: &Cursor,
    ) -> Result<CommandDescriptor<ScanResult<AggregateRow>>> {
        if cursor.is_start() {
            self.ft_aggregate_with_cursor(index, query, options)
        } else {
            Ok(self.ft_cursor_read(index, cursor, options.cursor_count))
        }
    }

    fn with_index(&self, args: CommandArguments, index: impl ToArg) -> CommandArguments {
        match self.config().search_mode {
            SearchMode::Broadcast => args.add(index),
            SearchMode::Light => args.key(index),
        }
    }

    fn node_local<T>(
        &self,
        command: CommandDescriptor<T>,
        policy: ReplyPolicy<T>,
    ) -> CommandDescriptor<T> {
        match self.config().search_mode {
            SearchMode::Broadcast => command.broadcast(policy),
            SearchMode::Light => command,
        }
    }
}
