//! Calls `GetUser2` on a running user service and prints the result.
//!
//! ```text
//! RUST_LOG=dynclient=trace cargo run -p dynclient --example get_user -- tcp://127.0.0.1:9090
//! ```

use serde::Deserialize;
use tracing_subscriber::EnvFilter;

use dynclient::Client;

#[derive(Debug, Default, Deserialize)]
#[allow(dead_code)]
struct Faction {
    #[serde(rename = "field_1")]
    id: i32,
    #[serde(rename = "field_2")]
    name: String,
    #[serde(rename = "field_3")]
    rank: String,
}

#[derive(Debug, Default, Deserialize)]
#[allow(dead_code)]
struct User {
    #[serde(rename = "field_1")]
    id: i32,
    #[serde(rename = "field_2")]
    name: String,
    #[serde(rename = "field_3")]
    faction: Faction,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(true)
        .init();

    let url = std::env::args().nth(1).unwrap_or_else(|| "http://127.0.0.1:9090/thrift".into());
    let mut client = Client::builder(url).build()?;

    let user: User = client.call("GetUser2", (2i32, "Jaina")).await?;
    println!("{user:#?}");

    client.close().await?;
    Ok(())
}
