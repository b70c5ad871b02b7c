//! # The Call Orchestrator
//!
//! A `Client` turns `call("GetUser2", (2, "Jaina"))` into a call envelope, pushes it
//! through its transport, and coerces the `field_0` slot of the reply into the
//! caller's type.
//!
//! ## Lifecycle of a call
//!
//! ```text
//! Idle -> ConnectionOpen -> RequestWritten -> Flushed -> ResponseRead -> Coerced -> Done
//!   \___________________________ any step may end in Failed ___________________/
//! ```
//!
//! A call that fails after the connection is open but before a whole reply was read
//! closes the transport; the next call reconnects.

use dynpack::Decoder;
use dynpack::Encoder;
use dynrpc::Args;
use dynrpc::Record;
use dynrpc::Value;
use serde::de::DeserializeOwned;

use crate::config::ClientBuilder;
use crate::config::ClientConfig;
use crate::config::FlushFailurePolicy;
use crate::error::Result;
use crate::transport::Transport;

/// The reply field holding the return value.
const RESULT_FIELD: i16 = 0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallState {
    Idle,
    ConnectionOpen,
    RequestWritten,
    Flushed,
    ResponseRead,
    Coerced,
    Done,
    Failed,
}

/// The in-flight call.
struct Call<'a> {
    method: &'a str,
    state: CallState,
}

impl<'a> Call<'a> {
    fn start(method: &'a str) -> Self {
        tracing::debug!(method, "call started");
        Self { method, state: CallState::Idle }
    }

    fn advance(&mut self, next: CallState) {
        tracing::trace!(method = self.method, from = ?self.state, to = ?next, "call state");
        self.state = next;
    }

    /// Bytes may have moved without a complete reply being read.
    fn in_exchange(&self) -> bool {
        matches!(
            self.state,
            CallState::ConnectionOpen | CallState::RequestWritten | CallState::Flushed
        )
    }

    fn finish<T>(mut self, result: &Result<T>) {
        match result {
            Ok(_) => {
                self.advance(CallState::Done);
                tracing::debug!(method = self.method, "call finished");
            }
            Err(e) => {
                tracing::debug!(method = self.method, state = ?self.state, error = %e, "call failed");
                self.advance(CallState::Failed);
            }
        }
    }
}

/// A connection to one service endpoint.
///
/// Calls take `&mut self`: one call is in flight per client at a time.
pub struct Client {
    transport: Box<dyn Transport>,
    config: ClientConfig,
}

impl Client {
    pub fn new(transport: Box<dyn Transport>, config: ClientConfig) -> Self {
        Self { transport, config }
    }

    pub fn builder(url: impl Into<String>) -> ClientBuilder {
        ClientBuilder::new(url)
    }

    /// A client with default settings over the transport the URL selects.
    pub fn connect(url: impl Into<String>) -> Result<Self> {
        ClientBuilder::new(url).build()
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn is_open(&self) -> bool {
        self.transport.is_open()
    }

    /// Opens the transport. Calls open it on demand; this is idempotent.
    pub async fn open(&mut self) -> Result<()> {
        if !self.transport.is_open() {
            self.transport.open().await?;
        }
        Ok(())
    }

    pub async fn close(&mut self) -> Result<()> {
        self.transport.close().await?;
        Ok(())
    }

    /// Calls `method` and coerces the return value into `T`.
    ///
    /// A reply without a return value (void methods, or a service-declared exception in
    /// another field) yields `T::default()`.
    ///
    /// # Errors
    /// - `Error::Rpc(dynrpc::Error::Remote(_))` when the server answers with an exception.
    /// - `Error::Rpc(dynrpc::Error::Coercion { path, .. })` when the reply does not fit
    ///   `T`; `path` starts at `field_0`.
    /// - `Error::Transport` for I/O failures.
    pub async fn call<A: Args, T: DeserializeOwned + Default>(&mut self, method: &str, args: A) -> Result<T> {
        let mut call = Call::start(method);
        let result = self.call_typed(&mut call, args).await;
        self.settle(call, result).await
    }

    /// Calls `method` and returns the whole reply record.
    ///
    /// Useful for services that report declared exceptions in fields `field_1..`.
    pub async fn call_value<A: Args>(&mut self, method: &str, args: A) -> Result<Value> {
        let mut call = Call::start(method);
        let result = self.call_raw(&mut call, args).await.map(Value::Record);
        self.settle(call, result).await
    }

    /// Ends a call. A call that failed mid-exchange drops the connection, so a late
    /// reply can never be read as the answer to the next call.
    async fn settle<T>(&mut self, call: Call<'_>, result: Result<T>) -> Result<T> {
        if result.is_err() && call.in_exchange() {
            match self.transport.close().await {
                Ok(()) => tracing::debug!(method = call.method, "connection dropped after failed exchange"),
                Err(e) => tracing::warn!(method = call.method, error = %e, "closing after failed exchange"),
            }
        }
        call.finish(&result);
        result
    }

    async fn call_typed<A: Args, T: DeserializeOwned + Default>(
        &mut self,
        call: &mut Call<'_>,
        args: A,
    ) -> Result<T> {
        let mut reply = self.call_raw(call, args).await?;
        let value = match reply.remove(RESULT_FIELD) {
            Some(value) => {
                dynrpc::from_value(value).map_err(|e| e.at(dynrpc::field_key(RESULT_FIELD)))?
            }
            None => T::default(),
        };
        call.advance(CallState::Coerced);
        Ok(value)
    }

    async fn call_raw<A: Args>(&mut self, call: &mut Call<'_>, args: A) -> Result<Record> {
        let args = args.into_values()?;
        let protocol = self.config.protocol();

        self.open().await?;
        call.advance(CallState::ConnectionOpen);

        let mut enc = Encoder::with_config(protocol);
        dynrpc::encode_call(&mut enc, call.method, args)?;
        let request = enc.into_bytes()?;
        self.transport.write(&request).await?;
        call.advance(CallState::RequestWritten);

        if let Err(e) = self.transport.flush().await {
            match self.config.flush_failure {
                FlushFailurePolicy::LogAndRead => {
                    tracing::warn!(method = call.method, error = %e, "flush failed, reading reply anyway");
                }
                FlushFailurePolicy::Propagate => return Err(e.into()),
            }
        }
        call.advance(CallState::Flushed);

        let bytes = self.transport.read().await?;
        call.advance(CallState::ResponseRead);

        let mut dec = Decoder::with_config(&bytes, protocol);
        let (header, reply) = dynrpc::decode_reply(&mut dec)?;
        if header.name != call.method {
            tracing::warn!(method = call.method, reply = %header.name, "reply names a different method");
        }
        Ok(reply)
    }
}
