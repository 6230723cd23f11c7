use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Subcommand};
use discipc_client::{Client, ClientConfig};
use discipc_frame::{Opcode, HANDSHAKE_VERSION};
use discipc_transport::{ChannelId, ChannelManager, ConnectConfig, SystemConnector};
use tracing::Dispatch;

use crate::exit::{CliError, CliResult, USAGE};
use crate::output::OutputFormat;

pub mod handshake;
pub mod probe;
pub mod send;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Check which discord-ipc channels accept a connection.
    Probe(ProbeArgs),
    /// Connect and send the handshake frame.
    Handshake(HandshakeArgs),
    /// Connect, optionally handshake, and send a single frame.
    Send(SendArgs),
    /// Show version information.
    Version(VersionArgs),
}

/// Connection settings shared by every subcommand.
#[derive(Debug, Clone)]
pub struct Session {
    pub pipe_dir: Option<PathBuf>,
    pub timeout: Duration,
    pub logger: Dispatch,
}

impl Session {
    pub fn manager(&self) -> ChannelManager {
        let connector = match &self.pipe_dir {
            Some(dir) => SystemConnector::with_pipe_dir(dir),
            None => SystemConnector::new(),
        };
        let config = ConnectConfig {
            connect_timeout: self.timeout,
            ..ConnectConfig::default()
        };
        ChannelManager::with_connector(connector, config).with_logger(self.logger.clone())
    }

    pub fn client(&self, handshake_version: u32) -> Client {
        let config = ClientConfig {
            handshake_version,
            ..ClientConfig::default()
        };
        Client::with_manager(self.manager(), config)
    }
}

pub fn run(command: Command, session: &Session, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Probe(args) => probe::run(args, session, format),
        Command::Handshake(args) => handshake::run(args, session, format),
        Command::Send(args) => send::run(args, session, format),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug)]
pub struct ProbeArgs {
    /// Probe only this channel id (0-9).
    #[arg(long, short = 'c', value_parser = parse_channel, conflicts_with = "first")]
    pub channel: Option<ChannelId>,
    /// Stop at the first reachable channel, scanning in ascending order.
    #[arg(long)]
    pub first: bool,
}

#[derive(Args, Debug)]
pub struct HandshakeArgs {
    /// Application client id sent in the handshake.
    #[arg(long, env = "DISCIPC_CLIENT_ID")]
    pub client_id: String,
    /// Connect to this channel id only. Default: first reachable.
    #[arg(long, short = 'c', value_parser = parse_channel)]
    pub channel: Option<ChannelId>,
    /// Handshake protocol version.
    #[arg(long, default_value_t = HANDSHAKE_VERSION)]
    pub protocol_version: u32,
    /// Wait for the peer's first frame and print it.
    #[arg(long)]
    pub wait: bool,
}

#[derive(Args, Debug)]
pub struct SendArgs {
    /// Send the handshake for this client id before the frame.
    #[arg(long, env = "DISCIPC_CLIENT_ID")]
    pub client_id: Option<String>,
    /// Connect to this channel id only. Default: first reachable.
    #[arg(long, short = 'c', value_parser = parse_channel)]
    pub channel: Option<ChannelId>,
    /// Frame opcode.
    #[arg(long, default_value_t = u32::from(Opcode::Frame))]
    pub opcode: u32,
    /// JSON payload.
    #[arg(long, conflicts_with_all = ["data", "file"])]
    pub json: Option<String>,
    /// Raw string payload.
    #[arg(long, conflicts_with_all = ["json", "file"])]
    pub data: Option<String>,
    /// Read payload from file.
    #[arg(long, conflicts_with_all = ["json", "data"])]
    pub file: Option<PathBuf>,
    /// Wait for response frames and print them.
    #[arg(long)]
    pub wait: bool,
    /// Number of response frames to print when --wait is set.
    #[arg(long, default_value_t = 1, requires = "wait")]
    pub count: usize,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

/// Parse a channel id in `0..10`.
pub fn parse_channel(input: &str) -> CliResult<ChannelId> {
    let value: u32 = input
        .trim()
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid channel id: {input}")))?;
    ChannelId::new(value).map_err(|err| CliError::new(USAGE, err.to_string()))
}

/// Parse durations like `5s`, `250ms`, or bare seconds.
pub fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, millis) = if let Some(num) = input.strip_suffix("ms") {
        (num, true)
    } else if let Some(num) = input.strip_suffix('s') {
        (num, false)
    } else {
        (input, false)
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration value: {input}")))?;

    if value == 0 {
        return Err(CliError::new(USAGE, "duration must be greater than zero"));
    }

    Ok(if millis {
        Duration::from_millis(value)
    } else {
        Duration::from_secs(value)
    })
}
