use std::fmt;

use thiserror::Error;

use crate::executor::NodeId;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// Rejected while building a command, nothing was sent.
    #[error("cannot encode command: {reason}")]
    Encoding { reason: String },
    #[error("transport failure: {0}")]
    Io(#[from] tokio::io::Error),
    #[error("connection closed before a full reply was read")]
    ZeroRead,
    #[error("malformed reply frame")]
    Parse(#[from] nom::Err<ParseError>),
    /// Transport was fine but the reply does not have the shape the command documents.
    #[error("unexpected reply: expected {expected}, got {actual}")]
    Decode {
        expected: &'static str,
        actual: String,
    },
    #[error("server replied with error: {message}")]
    Server { message: String },
    #[error("broadcast replies diverged: {diverging:?} disagree with {agreeing:?}")]
    BroadcastDivergence {
        agreeing: Vec<NodeId>,
        diverging: Vec<NodeId>,
        replies: Vec<(NodeId, String)>,
    },
    #[error("broadcast failed on {}", NodeFailures(.failures))]
    Broadcast { failures: Vec<(NodeId, Error)> },
    #[error("no node available")]
    NoNodes,
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl Error {
    pub fn encoding(reason: impl Into<String>) -> Self {
        Error::Encoding {
            reason: reason.into(),
        }
    }

    pub fn decode(expected: &'static str, actual: impl fmt::Debug) -> Self {
        Error::Decode {
            expected,
            actual: format!("{actual:?}"),
        }
    }

    /// Connection-level failures, as opposed to failures of the command itself.
    pub fn is_transport(&self) -> bool {
        matches!(self, Error::Io(_) | Error::ZeroRead | Error::Parse(_))
    }

    /// Nodes named by a broadcast error, empty for every other variant.
    pub fn failed_nodes(&self) -> Vec<&NodeId> {
        match self {
            Error::BroadcastDivergence { diverging, .. } => diverging.iter().collect(),
            Error::Broadcast { failures } => failures.iter().map(|(node, _)| node).collect(),
            _ => Vec::new(),
        }
    }
}

struct NodeFailures<'a>(&'a [(NodeId, Error)]);

impl fmt::Display for NodeFailures<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (node, error)) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{node} ({error})")?;
        }
        Ok(())
    }
}

#[derive(Debug, Error)]
#[error("malformed frame")]
pub struct ParseError;

impl nom::error::ParseError<&[u8]> for ParseError {
    fn from_error_kind(_: &[u8], _: nom::error::ErrorKind) -> Self {
        Self
    }

    fn append(_: &[u8], _: nom::error::ErrorKind, _: Self) -> Self {
        Self
    }
}

impl nom::error::FromExternalError<&[u8], std::str::Utf8Error> for ParseError {
    fn from_external_error(_: &[u8], _: nom::error::ErrorKind, _: std::str::Utf8Error) -> Self {
        Self
    }
}

pub type IResult<I, O> = std::result::Result<(I, O), nom::Err<ParseError>>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_errors_are_told_apart_from_decode_errors() {
        let io = Error::from(std::io::Error::new(std::io::ErrorKind::TimedOut, "timed out"));
        assert!(io.is_transport());
        assert!(Error::ZeroRead.is_transport());
        assert!(!Error::decode("integer", "OK").is_transport());
        assert!(!Error::encoding("no keys").is_transport());
    }

    #[test]
    fn broadcast_failure_names_nodes() {
        let error = Error::Broadcast {
            failures: vec![
                (NodeId::from("a:1"), Error::ZeroRead),
                (
                    NodeId::from("c:3"),
                    Error::Server {
                        message: "ERR busy".into(),
                    },
                ),
            ],
        };
        let rendered = error.to_string();
        assert!(rendered.contains("a:1"));
        assert!(rendered.contains("c:3 (server replied with error: ERR busy)"));
        assert_eq!(
            error.failed_nodes(),
            vec![&NodeId::from("a:1"), &NodeId::from("c:3")]
        );
    }
}
