use discipc_frame::{Frame, FrameConfig, FrameError, FrameReader, FrameWriter, HANDSHAKE_VERSION};
use discipc_transport::{ChannelId, ChannelManager, Connector, SystemConnector};
use tracing::{info, warn};

use crate::error::{ClientError, Result};

/// Client-side settings layered over the channel manager.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Frame size limits for both directions.
    pub frame: FrameConfig,
    /// Version sent in the handshake payload.
    pub handshake_version: u32,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            frame: FrameConfig::default(),
            handshake_version: HANDSHAKE_VERSION,
        }
    }
}

/// A framed connection to a discord-ipc peer.
///
/// The caller sends the handshake first; the client records whether it did
/// but does not refuse other frames before it.
///
/// Any failed frame read, and any write that stops after part of a frame
/// went out, closes the channel. Until [`Client::connect`] or
/// [`Client::reconnect`] succeeds, reads and writes return
/// [`ClientError::Desynchronized`].
pub struct Client<C: Connector = SystemConnector> {
    writer: FrameWriter<ChannelManager<C>>,
    config: ClientConfig,
    handshake_sent: bool,
    desynchronized: bool,
}

impl Client<SystemConnector> {
    /// Client over the host's pipes with default settings.
    pub fn new() -> Self {
        Self::with_manager(ChannelManager::new(), ClientConfig::default())
    }
}

impl Default for Client<SystemConnector> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Connector> Client<C> {
    pub fn with_manager(manager: ChannelManager<C>, config: ClientConfig) -> Self {
        Self {
            writer: FrameWriter::with_config(manager, config.frame.clone()),
            config,
            handshake_sent: false,
            desynchronized: false,
        }
    }

    /// Connect to `target`, or the first reachable channel when `None`.
    pub fn connect(&mut self, target: Option<ChannelId>) -> Result<ChannelId> {
        let id = self.manager_mut().connect(target)?;
        self.reset_session();
        Ok(id)
    }

    /// Reopen the last channel (or scan) after a close or desync.
    pub fn reconnect(&mut self) -> Result<ChannelId> {
        let id = self.manager_mut().reconnect()?;
        self.reset_session();
        Ok(id)
    }

    /// Send the Handshake frame for `client_id`.
    pub fn handshake(&mut self, client_id: &str) -> Result<()> {
        self.ensure_usable()?;
        let version = self.config.handshake_version;
        self.scoped(|this| -> Result<()> {
            let written = this.writer.write_handshake(version, client_id);
            this.settle_write(written)?;
            this.handshake_sent = true;
            info!(version, "handshake sent");
            Ok(())
        })
    }

    /// Send one frame with `opcode` and `payload`.
    pub fn send(&mut self, opcode: u32, payload: &[u8]) -> Result<()> {
        self.ensure_usable()?;
        self.scoped(|this| -> Result<()> {
            let written = this.writer.send(opcode, payload);
            this.settle_write(written)
        })
    }

    /// Send a prebuilt frame.
    pub fn write_frame(&mut self, frame: &Frame) -> Result<()> {
        self.send(frame.opcode(), frame.data())
    }

    /// Read the next frame (blocking).
    ///
    /// On failure no frame is returned and the channel is closed.
    pub fn try_read_frame(&mut self) -> Result<Frame> {
        self.ensure_usable()?;
        let frame_config = self.config.frame.clone();
        self.scoped(|this| -> Result<Frame> {
            let result =
                FrameReader::with_config(this.writer.get_mut(), frame_config).try_read_frame();
            match result {
                Ok(frame) => Ok(frame),
                Err(err) => {
                    if err.breaks_framing() {
                        warn!(
                            channel = ?this.channel(),
                            error = %err,
                            "frame read failed; closing channel"
                        );
                        this.writer.get_mut().close();
                        this.desynchronized = true;
                    }
                    Err(err.into())
                }
            }
        })
    }

    /// Close the channel, keeping its id for [`Client::reconnect`].
    pub fn close(&mut self) {
        self.manager_mut().close();
        self.handshake_sent = false;
    }

    /// Tear down the channel and forget it. Safe to call repeatedly.
    pub fn dispose(&mut self) {
        self.manager_mut().dispose();
        self.handshake_sent = false;
        self.desynchronized = false;
    }

    pub fn is_connected(&self) -> bool {
        self.manager().is_connected()
    }

    pub fn channel(&self) -> Option<ChannelId> {
        self.manager().connected_channel()
    }

    /// Whether the handshake was sent on the current connection.
    pub fn handshake_sent(&self) -> bool {
        self.handshake_sent
    }

    /// Whether a failed read closed the channel.
    pub fn is_desynchronized(&self) -> bool {
        self.desynchronized
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn manager(&self) -> &ChannelManager<C> {
        self.writer.get_ref()
    }

    pub fn manager_mut(&mut self) -> &mut ChannelManager<C> {
        self.writer.get_mut()
    }

    fn ensure_usable(&self) -> Result<()> {
        if self.desynchronized {
            return Err(ClientError::Desynchronized {
                channel: self.channel(),
            });
        }
        if !self.is_connected() {
            return Err(ClientError::NotConnected);
        }
        Ok(())
    }

    fn settle_write(&mut self, result: std::result::Result<(), FrameError>) -> Result<()> {
        if let Err(err) = &result {
            if err.is_partial_write() {
                warn!(
                    channel = ?self.channel(),
                    error = %err,
                    "frame write cut short; closing channel"
                );
                self.writer.get_mut().close();
                self.desynchronized = true;
            }
        }
        Ok(result?)
    }

    fn reset_session(&mut self) {
        self.handshake_sent = false;
        self.desynchronized = false;
    }

    fn scoped<T>(&mut self, f: impl FnOnce(&mut Self) -> T) -> T {
        let logger = self.manager().logger().clone();
        tracing::dispatcher::with_default(&logger, || f(self))
    }
}

impl<C: Connector> std::fmt::Debug for Client<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("channel", &self.channel())
            .field("connected", &self.is_connected())
            .field("handshake_sent", &self.handshake_sent)
            .field("desynchronized", &self.desynchronized)
            .finish()
    }
}


#[cfg(all(test, unix))]
mod tests {
    use std::io::{Read, Write};
    use std::os::unix::net::{UnixListener, UnixStream};
    use std::path::{Path, PathBuf};
    use std::thread;

    use discipc_frame::{encode_header, FrameError, Handshake, Opcode, HEADER_SIZE};
    use discipc_transport::{ConnectConfig, TransportError};

    use super::*;

    fn unique_temp_dir(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "discipc-client-{tag}-{}-{}",
            std::process::id(),
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .expect("time should be after epoch")
                .as_nanos()
        ));
        std::fs::create_dir_all(&dir).expect("temp dir should be creatable");
        dir
    }

    fn client_for(dir: &Path) -> Client {
        let manager = ChannelManager::with_connector(
            SystemConnector::with_pipe_dir(dir),
            ConnectConfig::default(),
        );
        Client::with_manager(manager, ClientConfig::default())
    }

    fn read_frame_from(stream: &mut UnixStream) -> Frame {
        FrameReader::new(stream)
            .try_read_frame()
            .expect("peer should read a frame")
    }

    fn channel(id: u32) -> ChannelId {
        ChannelId::new(id).expect("channel id should be valid")
    }

    #[test]
    fn handshake_then_request_response() {
        let dir = unique_temp_dir("roundtrip");
        let listener = UnixListener::bind(dir.join("discord-ipc-0")).expect("bind");

        let peer = thread::spawn(move || {
            let (mut stream, _) = listener.accept().expect("accept");
            let handshake = read_frame_from(&mut stream);
            assert_eq!(handshake.kind(), Some(Opcode::Handshake));
            let payload = Handshake::from_payload(handshake.data()).expect("handshake json");
            assert_eq!(payload.client_id, "1234");

            let command = read_frame_from(&mut stream);
            FrameWriter::new(&mut stream)
                .send(Opcode::Frame.into(), command.data())
                .expect("echo");
        });

        let mut client = client_for(&dir);
        assert_eq!(client.connect(None).expect("connect"), channel(0));
        client.handshake("1234").expect("handshake");
        assert!(client.handshake_sent());

        client
            .send(Opcode::Frame.into(), br#"{"cmd":"DISPATCH"}"#)
            .expect("send");
        let response = client.try_read_frame().expect("response");
        assert_eq!(response.kind(), Some(Opcode::Frame));
        assert_eq!(response.data().as_ref(), br#"{"cmd":"DISPATCH"}"#);

        peer.join().expect("peer thread");
        client.dispose();
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn short_payload_closes_channel_until_reconnect() {
        let dir = unique_temp_dir("desync");
        let listener = UnixListener::bind(dir.join("discord-ipc-2")).expect("bind");

        let peer = thread::spawn(move || {
            let (mut stream, _) = listener.accept().expect("accept");
            let mut bytes = encode_header(1, 10).to_vec();
            bytes.extend_from_slice(b"123456789");
            stream.write_all(&bytes).expect("write truncated frame");
            drop(stream);

            let (mut stream, _) = listener.accept().expect("accept again");
            let frame = read_frame_from(&mut stream);
            assert_eq!(frame.kind(), Some(Opcode::Ping));
        });

        let mut client = client_for(&dir);
        client.connect(Some(channel(2))).expect("connect");

        let err = client.try_read_frame().unwrap_err();
        assert!(matches!(
            err,
            ClientError::Frame(FrameError::BadData {
                expected: 10,
                read: 9
            })
        ));
        assert!(client.is_desynchronized());
        assert!(!client.is_connected());
        assert_eq!(client.channel(), Some(channel(2)));

        let err = client.send(Opcode::Ping.into(), b"").unwrap_err();
        assert!(matches!(err, ClientError::Desynchronized { .. }));

        assert_eq!(client.reconnect().expect("reconnect"), channel(2));
        assert!(!client.is_desynchronized());
        client.send(Opcode::Ping.into(), b"").expect("send after reconnect");

        peer.join().expect("peer thread");
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn operations_before_connect_fail_cleanly() {
        let dir = unique_temp_dir("idle");
        let mut client = client_for(&dir);

        assert!(matches!(
            client.handshake("1"),
            Err(ClientError::NotConnected)
        ));
        assert!(matches!(
            client.try_read_frame(),
            Err(ClientError::NotConnected)
        ));
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn connect_failure_is_transport_error() {
        let dir = unique_temp_dir("none");
        let mut client = client_for(&dir);

        let err = client.connect(Some(channel(7))).unwrap_err();
        assert!(matches!(
            err,
            ClientError::Transport(TransportError::Connect { .. })
        ));
        assert!(!client.is_connected());
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn dispose_after_connect_stops_io() {
        let dir = unique_temp_dir("dispose");
        let listener = UnixListener::bind(dir.join("discord-ipc-1")).expect("bind");

        let mut client = client_for(&dir);
        client.connect(None).expect("connect");
        let (mut server, _) = listener.accept().expect("accept");

        client.dispose();
        client.dispose();
        assert!(!client.is_connected());
        assert_eq!(client.channel(), None);
        assert!(matches!(
            client.send(1, b"x"),
            Err(ClientError::NotConnected)
        ));

        let mut buf = [0u8; HEADER_SIZE];
        assert_eq!(server.read(&mut buf).expect("eof after dispose"), 0);
        let _ = std::fs::remove_dir_all(&dir);
    }
}
