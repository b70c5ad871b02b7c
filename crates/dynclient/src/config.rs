//! # Client Configuration
//!
//! `ClientConfig` holds every knob of a client; `ClientBuilder` sets them fluently and
//! picks a transport from the URL scheme.

use std::time::Duration;

use dynpack::ProtocolConfig;

use crate::client::Client;
use crate::error::Result;
use crate::transport;
use crate::transport::Transport;

/// What a call does when flushing the request fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FlushFailurePolicy {
    /// Log at `warn` and read the reply anyway. Some transports report a failed
    /// write after the request was already delivered.
    #[default]
    LogAndRead,
    /// Fail the call with the transport error.
    Propagate,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Endpoint: `http://`, `https://` or `tcp://host:port`.
    pub url: String,
    /// Reject reply headers without a version word.
    pub strict_read: bool,
    /// Write versioned request headers.
    pub strict_write: bool,
    /// Upper bound for string lengths, collection counts and transport frames.
    pub max_message_size: usize,
    pub recursion_limit: usize,
    pub flush_failure: FlushFailurePolicy,
    /// Applied by the transport to connecting, sending and receiving.
    pub timeout: Option<Duration>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        let protocol = ProtocolConfig::default();
        Self {
            url: String::new(),
            strict_read: protocol.strict_read,
            strict_write: protocol.strict_write,
            max_message_size: protocol.max_length,
            recursion_limit: protocol.recursion_limit,
            flush_failure: FlushFailurePolicy::default(),
            timeout: None,
        }
    }
}

impl ClientConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into(), ..Self::default() }
    }

    /// The settings the binary protocol enforces.
    pub fn protocol(&self) -> ProtocolConfig {
        ProtocolConfig {
            strict_read: self.strict_read,
            strict_write: self.strict_write,
            max_length: self.max_message_size,
            recursion_limit: self.recursion_limit,
        }
    }
}

/// Fluent builder for `Client`.
#[derive(Debug, Clone)]
pub struct ClientBuilder {
    config: ClientConfig,
}

impl ClientBuilder {
    pub fn new(url: impl Into<String>) -> Self {
        Self { config: ClientConfig::new(url) }
    }

    pub fn strict_read(mut self, strict: bool) -> Self {
        self.config.strict_read = strict;
        self
    }

    pub fn strict_write(mut self, strict: bool) -> Self {
        self.config.strict_write = strict;
        self
    }

    pub fn max_message_size(mut self, size: usize) -> Self {
        self.config.max_message_size = size;
        self
    }

    pub fn recursion_limit(mut self, limit: usize) -> Self {
        self.config.recursion_limit = limit;
        self
    }

    pub fn flush_failure(mut self, policy: FlushFailurePolicy) -> Self {
        self.config.flush_failure = policy;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = Some(timeout);
        self
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Builds a client over the transport the URL scheme selects.
    ///
    /// Nothing is connected until the first call or `Client::open`.
    pub fn build(self) -> Result<Client> {
        let transport = transport::connect(&self.config.url, &self.config)?;
        Ok(Client::new(transport, self.config))
    }

    /// Builds a client over a caller-supplied transport; the URL is not used.
    pub fn build_with(self, transport: Box<dyn Transport>) -> Client {
        Client::new(transport, self.config)
    }
}
