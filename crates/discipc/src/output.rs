use std::io::{IsTerminal, Write};
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use discipc_frame::{Frame, Opcode};
use discipc_transport::{ChannelId, TransportError};
use serde::Serialize;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
    Raw,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

#[derive(Serialize)]
struct FrameOutput<'a> {
    channel: u8,
    opcode: u32,
    opcode_name: &'a str,
    payload_size: usize,
    payload: String,
    timestamp: String,
}

/// Outcome of probing one channel id.
#[derive(Debug, Serialize)]
pub struct ProbeResult {
    pub channel: u8,
    pub pipe: String,
    pub reachable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ProbeResult {
    pub fn reachable(channel: ChannelId, pipe: PathBuf) -> Self {
        Self {
            channel: channel.get(),
            pipe: pipe.display().to_string(),
            reachable: true,
            error: None,
        }
    }

    pub fn unreachable(channel: ChannelId, pipe: PathBuf, err: &TransportError) -> Self {
        Self {
            channel: channel.get(),
            pipe: pipe.display().to_string(),
            reachable: false,
            error: Some(err.to_string()),
        }
    }
}

#[derive(Serialize)]
struct StatusOutput {
    channel: u8,
    connected: bool,
    handshake_sent: bool,
}

pub fn print_frame(frame: &Frame, channel: ChannelId, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let out = FrameOutput {
                channel: channel.get(),
                opcode: frame.opcode(),
                opcode_name: opcode_name(frame),
                payload_size: frame.len(),
                payload: payload_preview(frame.data()),
                timestamp: now_unix_seconds(),
            };
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["CHANNEL", "OPCODE", "SIZE", "PAYLOAD"])
                .add_row(vec![
                    channel.to_string(),
                    opcode_name(frame).to_string(),
                    frame.len().to_string(),
                    payload_preview(frame.data()),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!(
                "channel={} opcode={} ({}) size={} payload={}",
                channel,
                frame.opcode(),
                opcode_name(frame),
                frame.len(),
                payload_preview(frame.data())
            );
        }
        OutputFormat::Raw => {
            print_raw(frame.data());
        }
    }
}

pub fn print_probe(results: &[ProbeResult], format: OutputFormat) {
    match format {
        OutputFormat::Json | OutputFormat::Raw => {
            println!(
                "{}",
                serde_json::to_string(results).unwrap_or_else(|_| "[]".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["CHANNEL", "PIPE", "REACHABLE", "ERROR"]);
            for result in results {
                table.add_row(vec![
                    result.channel.to_string(),
                    result.pipe.clone(),
                    result.reachable.to_string(),
                    result.error.clone().unwrap_or_default(),
                ]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty => {
            for result in results {
                match &result.error {
                    Some(err) => println!(
                        "channel={} pipe={} error={}",
                        result.channel, result.pipe, err
                    ),
                    None => println!("channel={} pipe={} reachable", result.channel, result.pipe),
                }
            }
        }
    }
}

pub fn print_status(channel: ChannelId, handshake_sent: bool, format: OutputFormat) {
    let out = StatusOutput {
        channel: channel.get(),
        connected: true,
        handshake_sent,
    };
    match format {
        OutputFormat::Json | OutputFormat::Raw => {
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_header(vec!["CHANNEL", "CONNECTED", "HANDSHAKE"])
                .add_row(vec![
                    out.channel.to_string(),
                    out.connected.to_string(),
                    out.handshake_sent.to_string(),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!(
                "channel={} connected={} handshake_sent={}",
                out.channel, out.connected, out.handshake_sent
            );
        }
    }
}

pub fn print_raw(data: &[u8]) {
    let mut out = std::io::stdout();
    let _ = out.write_all(data);
    let _ = out.flush();
}

fn opcode_name(frame: &Frame) -> &'static str {
    frame.kind().map(Opcode::name).unwrap_or("UNKNOWN")
}

fn payload_preview(payload: &[u8]) -> String {
    match std::str::from_utf8(payload) {
        Ok(text) => text.to_string(),
        Err(_) => format!("<binary {} bytes>", payload.len()),
    }
}

fn now_unix_seconds() -> String {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs().to_string())
        .unwrap_or_else(|_| "0".to_string())
}
