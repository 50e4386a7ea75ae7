use std::sync::Arc;

use bytes::{Buf, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufWriter};
use tokio::runtime::Runtime;
use tracing::trace;

use crate::command::CommandArguments;
use crate::error::{Error, Result};
use crate::executor::Connection;
use crate::protocol::{parse, Value};

/// Reads and writes whole frames on an async byte stream.
pub struct Framed<S> {
    stream: BufWriter<S>,
    buf: BytesMut,
}

impl<S> Framed<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub fn new(stream: S) -> Self {
        Self {
            stream: BufWriter::new(stream),
            buf: BytesMut::with_capacity(4 * 1024),
        }
    }

    /// Waits for one complete frame. Bytes past the frame stay buffered for the next read.
    pub async fn read_frame(&mut self) -> Result<Value<'static>> {
        loop {
            if !self.buf.is_empty() {
                let parsed = match parse(&self.buf[..]) {
                    Ok((rest, value)) => Some((self.buf.len() - rest.len(), value.into_owned())),
                    Err(nom::Err::Incomplete(_)) => None,
                    Err(e) => return Err(e.into()),
                };
                if let Some((consumed, value)) = parsed {
                    self.buf.advance(consumed);
                    return Ok(value);
                }
            }
            if self.stream.read_buf(&mut self.buf).await? == 0 {
                return Err(Error::ZeroRead);
            }
        }
    }

    pub async fn write_frame(&mut self, frame: &Value<'_>) -> Result<()> {
        self.stream.write_all(&frame.encode()[..]).await?;
        self.flush_writer().await?;
        Ok(())
    }

    pub async fn flush_writer(&mut self) -> std::io::Result<()> {
        self.stream.flush().await
    }
}

/// Blocking [`Connection`] over an async stream, driven on a shared runtime.
///
/// `send` blocks on the runtime, so it must not be called from inside an async context of that
/// runtime.
pub struct StreamConnection<S> {
    runtime: Arc<Runtime>,
    framed: Framed<S>,
}

impl<S> StreamConnection<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub fn new(runtime: Arc<Runtime>, stream: S) -> Self {
        Self {
            runtime,
            framed: Framed::new(stream),
        }
    }
}

impl<S> Connection for StreamConnection<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    fn send(&mut self, args: &CommandArguments) -> Result<Value<'static>> {
        trace!(command = %args.command_name(), tokens = args.len(), "writing request frame");
        let framed = &mut self.framed;
        self.runtime.block_on(async move {
            framed.write_frame(&args.to_value()).await?;
            framed.read_frame().await
        })
    }
}
