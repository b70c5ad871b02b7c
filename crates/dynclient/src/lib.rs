//! # DynClient
//!
//! Call Thrift services by method name with native Rust values, no generated code.
//!
//! ```no_run
//! # async fn demo() -> dynclient::Result<()> {
//! #[derive(Debug, Default, serde::Deserialize)]
//! struct User {
//!     #[serde(rename = "field_1")]
//!     id: i32,
//!     #[serde(rename = "field_2")]
//!     name: String,
//! }
//!
//! let mut client = dynclient::Client::connect("http://localhost:9090/users")?;
//! let user: User = client.call("GetUser2", (2i32, "Jaina")).await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Layers
//!
//! - `dynpack` reads and writes the binary protocol.
//! - `dynrpc` maps native values onto wire values and back.
//! - This crate owns the transports and the call lifecycle.

pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod memory;
pub mod tcp;
pub mod transport;


pub use crate::client::CallState;
pub use crate::client::Client;
pub use crate::config::ClientBuilder;
pub use crate::config::ClientConfig;
pub use crate::config::FlushFailurePolicy;
pub use crate::error::Error;
pub use crate::error::Result;
pub use crate::http::HttpTransport;
pub use crate::memory::MemoryTransport;
pub use crate::tcp::FramedTcpTransport;
pub use crate::transport::Transport;

pub use dynrpc::ApplicationException;
pub use dynrpc::ApplicationExceptionKind;
pub use dynrpc::Record;
pub use dynrpc::Set;
pub use dynrpc::Value;
pub use dynrpc::as_set;
