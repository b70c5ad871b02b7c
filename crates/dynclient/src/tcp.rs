//! Thrift framed transport over TCP.
//!
//! Every message travels as a 4-byte big-endian length followed by that many bytes.

use std::future::Future;
use std::time::Duration;

use tokio::io::AsyncReadExt;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;

use crate::config::ClientConfig;
use crate::transport::Error;
use crate::transport::Result;
use crate::transport::Transport;

/// A connection that fails mid-frame is dropped; the stream is never reused out of step.
pub struct FramedTcpTransport {
    addr: String,
    stream: Option<TcpStream>,
    /// Why the stream was dropped, reported by the next `read`.
    failure: Option<Error>,
    request: Vec<u8>,
    max_frame: usize,
    timeout: Option<Duration>,
}

/// Runs an I/O step under the optional timeout.
async fn within<T>(
    timeout: Option<Duration>,
    step: impl Future<Output = std::io::Result<T>>,
) -> Result<T> {
    match timeout {
        Some(limit) => match tokio::time::timeout(limit, step).await {
            Ok(result) => result.map_err(Error::from),
            Err(_) => Err(Error::Timeout),
        },
        None => step.await.map_err(Error::from),
    }
}

impl FramedTcpTransport {
    /// `addr` is `host:port`.
    pub fn new(addr: impl Into<String>, config: &ClientConfig) -> Self {
        Self {
            addr: addr.into(),
            stream: None,
            failure: None,
            request: Vec::new(),
            max_frame: config.max_message_size.min(u32::MAX as usize),
            timeout: config.timeout,
        }
    }

    pub fn addr(&self) -> &str {
        &self.addr
    }

    fn check_frame(&self, size: usize) -> Result<()> {
        if size > self.max_frame {
            return Err(Error::FrameTooLarge { size, limit: self.max_frame });
        }
        Ok(())
    }

    /// Drops the stream after a failed frame exchange.
    fn fail<T>(&mut self, result: Result<T>) -> Result<T> {
        if let Err(e) = &result {
            if self.stream.take().is_some() {
                tracing::debug!(addr = %self.addr, error = %e, "dropping connection");
            }
            self.failure = Some(e.clone());
        }
        result
    }

    async fn send_frame(&mut self, frame: Vec<u8>) -> Result<()> {
        self.check_frame(frame.len())?;
        let timeout = self.timeout;
        let stream = self.stream.as_mut().ok_or(Error::NotOpen)?;

        let mut out = Vec::with_capacity(4 + frame.len());
        out.extend_from_slice(&(frame.len() as u32).to_be_bytes());
        out.extend_from_slice(&frame);
        tracing::trace!(bytes = frame.len(), "sending frame");

        within(timeout, async {
            stream.write_all(&out).await?;
            stream.flush().await
        })
        .await
    }

    async fn recv_frame(&mut self) -> Result<Vec<u8>> {
        let timeout = self.timeout;
        let max_frame = self.max_frame;
        let stream = self.stream.as_mut().ok_or(Error::NotOpen)?;

        let size = within(timeout, stream.read_u32()).await? as usize;
        if size > max_frame {
            return Err(Error::FrameTooLarge { size, limit: max_frame });
        }
        let mut frame = vec![0u8; size];
        within(timeout, stream.read_exact(&mut frame)).await?;
        tracing::trace!(bytes = size, "received frame");
        Ok(frame)
    }
}

#[async_trait::async_trait]
impl Transport for FramedTcpTransport {
    fn is_open(&self) -> bool {
        self.stream.is_some()
    }

    async fn open(&mut self) -> Result<()> {
        if self.stream.is_some() {
            return Ok(());
        }
        let stream = within(self.timeout, TcpStream::connect(self.addr.as_str())).await?;
        stream.set_nodelay(true)?;
        tracing::debug!(addr = %self.addr, "connected");
        self.stream = Some(stream);
        self.failure = None;
        Ok(())
    }

    async fn write(&mut self, buf: &[u8]) -> Result<()> {
        if self.stream.is_none() {
            return Err(Error::NotOpen);
        }
        self.request.extend_from_slice(buf);
        Ok(())
    }

    async fn flush(&mut self) -> Result<()> {
        let frame = std::mem::take(&mut self.request);
        let result = self.send_frame(frame).await;
        self.fail(result)
    }

    async fn read(&mut self) -> Result<Vec<u8>> {
        if self.stream.is_none() {
            return Err(self.failure.take().unwrap_or(Error::NotOpen));
        }
        let result = self.recv_frame().await;
        self.fail(result)
    }

    async fn close(&mut self) -> Result<()> {
        self.request.clear();
        self.failure = None;
        if let Some(mut stream) = self.stream.take() {
            stream.shutdown().await?;
            tracing::debug!(addr = %self.addr, "disconnected");
        }
        Ok(())
    }
}
