//! # Client Errors

use std::fmt;

use crate::transport;

#[derive(Debug)]
pub enum Error {
    /// Opening, writing, flushing or reading the transport failed.
    Transport(transport::Error),
    /// Encoding the request, decoding the reply, a remote fault, or coercion.
    Rpc(dynrpc::Error),
    /// The request bytes could not be finalized.
    Protocol(dynpack::Error),
    /// The endpoint URL is malformed or names an unsupported scheme.
    InvalidUrl(String),
}

impl Error {
    /// The remote fault, if the server answered with an exception envelope.
    pub fn remote(&self) -> Option<&dynrpc::ApplicationException> {
        match self {
            Self::Rpc(dynrpc::Error::Remote(fault)) => Some(fault),
            _ => None,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transport(e) => write!(f, "Transport error: {}", e),
            Self::Rpc(e) => write!(f, "RPC error: {}", e),
            Self::Protocol(e) => write!(f, "Protocol error: {}", e),
            Self::InvalidUrl(msg) => write!(f, "Invalid URL: {}", msg),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Transport(e) => Some(e),
            Self::Rpc(e) => Some(e),
            Self::Protocol(e) => Some(e),
            Self::InvalidUrl(_) => None,
        }
    }
}

impl From<transport::Error> for Error {
    fn from(e: transport::Error) -> Self {
        Self::Transport(e)
    }
}

impl From<dynrpc::Error> for Error {
    fn from(e: dynrpc::Error) -> Self {
        Self::Rpc(e)
    }
}

impl From<dynpack::Error> for Error {
    fn from(e: dynpack::Error) -> Self {
        Self::Protocol(e)
    }
}

pub type Result<T> = std::result::Result<T, Error>;
