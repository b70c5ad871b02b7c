//! # Transport Abstraction
//!
//! A minimal, async interface for moving request and reply bytes.
//!
//! ## Philosophy
//!
//! - **Byte-Oriented**: The Transport knows nothing about envelopes, records or
//!   values. It moves opaque buffers.
//! - **Buffer then Send**: `write` only buffers; `flush` hands the whole request to
//!   the peer; `read` yields the next complete reply.

use std::fmt;

use reqwest::Url;

use crate::config::ClientConfig;
use crate::http::HttpTransport;
use crate::tcp::FramedTcpTransport;

/// Errors that occur at the network/transport layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The transport was used before `open` or after `close`.
    NotOpen,
    /// The peer is unreachable or the connection was dropped.
    ConnectionLost(String),
    /// The operation did not finish within the configured timeout.
    Timeout,
    /// A frame exceeded the configured maximum message size.
    FrameTooLarge { size: usize, limit: usize },
    /// The HTTP endpoint answered with a non-success status.
    Status(u16),
    /// `read` was called with no reply pending.
    NoReply,
    /// Generic I/O error or internal transport failure.
    Io(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotOpen => write!(f, "Transport is not open"),
            Self::ConnectionLost(msg) => write!(f, "Connection lost: {}", msg),
            Self::Timeout => write!(f, "Operation timed out"),
            Self::FrameTooLarge { size, limit } => {
                write!(f, "Frame of {} bytes exceeds limit of {}", size, limit)
            }
            Self::Status(code) => write!(f, "HTTP status {}", code),
            Self::NoReply => write!(f, "No reply pending"),
            Self::Io(msg) => write!(f, "I/O error: {}", msg),
        }
    }
}

impl std::error::Error for Error {}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        match e.kind() {
            std::io::ErrorKind::UnexpectedEof
            | std::io::ErrorKind::ConnectionReset
            | std::io::ErrorKind::ConnectionAborted
            | std::io::ErrorKind::BrokenPipe => Self::ConnectionLost(e.to_string()),
            std::io::ErrorKind::TimedOut => Self::Timeout,
            _ => Self::Io(e.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// A byte pipe to one remote endpoint.
///
/// This trait is object-safe (`Box<dyn Transport>`).
///
/// # Invariants
/// - `open` is idempotent.
/// - `write` never sends; `flush` sends everything written since the last flush.
/// - `read` returns exactly one complete reply.
#[async_trait::async_trait]
pub trait Transport: Send {
    fn is_open(&self) -> bool;

    async fn open(&mut self) -> Result<()>;

    async fn write(&mut self, buf: &[u8]) -> Result<()>;

    async fn flush(&mut self) -> Result<()>;

    async fn read(&mut self) -> Result<Vec<u8>>;

    async fn close(&mut self) -> Result<()>;
}

/// Chooses a transport by URL scheme: `http`/`https` or `tcp`.
pub fn connect(url: &str, config: &ClientConfig) -> crate::Result<Box<dyn Transport>> {
    let parsed = Url::parse(url).map_err(|e| crate::Error::InvalidUrl(format!("{url}: {e}")))?;
    match parsed.scheme() {
        "http" | "https" => Ok(Box::new(HttpTransport::new(parsed, config)?)),
        "tcp" => {
            let host = parsed
                .host_str()
                .ok_or_else(|| crate::Error::InvalidUrl(format!("{url}: missing host")))?;
            let port = parsed
                .port()
                .ok_or_else(|| crate::Error::InvalidUrl(format!("{url}: missing port")))?;
            Ok(Box::new(FramedTcpTransport::new(format!("{host}:{port}"), config)))
        }
        other => Err(crate::Error::InvalidUrl(format!("{url}: unsupported scheme {other}"))),
    }
}
