//! Connect to the first reachable discord-ipc channel, send the handshake,
//! and print the peer's first reply.
//!
//! Run with:
//!   DISCIPC_CLIENT_ID=<id> cargo run --example handshake
//!
//! Set DISCIPC_PIPE_DIR to talk to the `fake-peer` example instead of a
//! running desktop client.

use discipc::client::{Client, ClientConfig};
use discipc::transport::{ChannelManager, ConnectConfig, SystemConnector};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let client_id = std::env::var("DISCIPC_CLIENT_ID")?;

    let connector = match std::env::var_os("DISCIPC_PIPE_DIR") {
        Some(dir) => SystemConnector::with_pipe_dir(dir),
        None => SystemConnector::new(),
    };
    let manager = ChannelManager::with_connector(connector, ConnectConfig::default());
    let mut client = Client::with_manager(manager, ClientConfig::default());

    let channel = client.connect(None)?;
    eprintln!("Connected on channel {channel}");

    client.handshake(&client_id)?;
    let reply = client.try_read_frame()?;
    println!(
        "opcode={} payload={}",
        reply.opcode(),
        String::from_utf8_lossy(reply.data())
    );

    client.dispose();
    Ok(())
}
