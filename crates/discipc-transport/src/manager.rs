use std::io::{ErrorKind, Read, Write};
use std::time::{Duration, Instant};

use tracing::{debug, error, info, Dispatch};

use crate::channel::{ChannelId, CHANNEL_COUNT};
use crate::connector::{Connector, SystemConnector};
use crate::error::{Result, TransportError};
use crate::stream::PipeStream;

/// Default bounded wait for the OS-level connect and the connected poll.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_millis(1000);

/// Default interval between "is connected" polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Connection establishment settings.
#[derive(Debug, Clone)]
pub struct ConnectConfig {
    /// Upper bound for opening a channel and for it to report connected.
    pub connect_timeout: Duration,
    /// Sleep between connected-status polls.
    pub poll_interval: Duration,
    /// How many channel ids a full scan probes, starting at 0.
    pub channel_count: u8,
}

impl Default for ConnectConfig {
    fn default() -> Self {
        Self {
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            poll_interval: DEFAULT_POLL_INTERVAL,
            channel_count: CHANNEL_COUNT,
        }
    }
}

/// Owns the duplex channel to the peer.
///
/// The manager is either fully connected (handle present, channel id known)
/// or holds no handle at all. All calls block the calling thread; exclusive
/// `&mut self` access keeps reads and writes single-owner.
///
/// Log events go to the injected [`Dispatch`] only. The default is
/// [`Dispatch::none`], so a manager stays silent unless a logger is given.
pub struct ChannelManager<C: Connector = SystemConnector> {
    connector: C,
    config: ConnectConfig,
    stream: Option<C::Stream>,
    connected: bool,
    channel: Option<ChannelId>,
    logger: Dispatch,
}

impl ChannelManager<SystemConnector> {
    /// Manager over the host's pipes with default settings.
    pub fn new() -> Self {
        Self::with_connector(SystemConnector::new(), ConnectConfig::default())
    }
}

impl Default for ChannelManager<SystemConnector> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Connector> ChannelManager<C> {
    pub fn with_connector(connector: C, config: ConnectConfig) -> Self {
        Self {
            connector,
            config,
            stream: None,
            connected: false,
            channel: None,
            logger: Dispatch::none(),
        }
    }

    /// Route this manager's log events to `logger`.
    pub fn with_logger(mut self, logger: Dispatch) -> Self {
        self.logger = logger;
        self
    }

    /// Connect to `target`, or scan all channel ids when `None`.
    ///
    /// Returns `false` on any failure; see [`ChannelManager::connect`] for the
    /// failure kind.
    pub fn attempt_connect(&mut self, target: Option<ChannelId>) -> bool {
        self.connect(target).is_ok()
    }

    /// Connect to `target`, or scan ids `0..channel_count` in ascending order
    /// and keep the first that connects.
    ///
    /// An explicit target is tried exactly once. Any handle held from an
    /// earlier connection is dropped first.
    pub fn connect(&mut self, target: Option<ChannelId>) -> Result<ChannelId> {
        self.scoped(|this| {
            if this.stream.is_some() {
                debug!(channel = ?this.channel, "dropping previous channel before connect");
                this.teardown();
            }

            if let Some(id) = target {
                return this.create_connection(id).map(|()| id);
            }

            for id in ChannelId::first(this.config.channel_count) {
                match this.create_connection(id) {
                    Ok(()) => return Ok(id),
                    Err(err) => debug!(channel = %id, error = %err, "channel unavailable"),
                }
            }

            let attempted = this.config.channel_count.min(CHANNEL_COUNT);
            error!(attempted, "no channel available");
            Err(TransportError::NoChannelAvailable { attempted })
        })
    }

    /// Reconnect to the last connected channel, or scan if none is known.
    pub fn reconnect(&mut self) -> Result<ChannelId> {
        self.connect(self.channel)
    }

    fn create_connection(&mut self, id: ChannelId) -> Result<()> {
        let path = self.connector.pipe_path(id);
        info!(channel = %id, ?path, "attempting connection");

        let started = Instant::now();
        let stream = match self.connector.open(id, self.config.connect_timeout) {
            Ok(stream) => stream,
            Err(err) => {
                info!(channel = %id, error = %err, "connection attempt failed");
                return Err(err);
            }
        };

        while !stream.is_connected() {
            if started.elapsed() >= self.config.connect_timeout {
                info!(channel = %id, "channel never reported connected");
                return Err(TransportError::Timeout {
                    channel: id,
                    waited: self.config.connect_timeout,
                });
            }
            std::thread::sleep(self.config.poll_interval);
        }

        self.stream = Some(stream);
        self.channel = Some(id);
        self.connected = true;
        info!(channel = %id, "connected");
        Ok(())
    }

    /// Read up to `buf.len()` bytes; may return fewer.
    pub fn raw_read(&mut self, buf: &mut [u8]) -> Result<usize> {
        let stream = self.stream.as_mut().ok_or(TransportError::NotConnected)?;
        Ok(stream.read(buf)?)
    }

    /// Write the whole buffer and flush.
    ///
    /// A fault after some bytes went out is reported as
    /// [`TransportError::PartialWrite`]: the peer has seen a truncated buffer.
    pub fn raw_write(&mut self, buf: &[u8]) -> Result<()> {
        let stream = self.stream.as_mut().ok_or(TransportError::NotConnected)?;

        let mut written = 0usize;
        while written < buf.len() {
            let fault = match stream.write(&buf[written..]) {
                Ok(0) => std::io::Error::from(ErrorKind::WriteZero),
                Ok(n) => {
                    written += n;
                    continue;
                }
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => err,
            };
            return Err(if written == 0 {
                TransportError::Io(fault)
            } else {
                TransportError::PartialWrite {
                    written,
                    expected: buf.len(),
                    source: fault,
                }
            });
        }

        loop {
            match stream.flush() {
                Ok(()) => return Ok(()),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(err.into()),
            }
        }
    }

    /// Drop the active handle. The last channel id is kept for [`reconnect`](Self::reconnect).
    pub fn close(&mut self) {
        self.scoped(|this| {
            if this.teardown() {
                info!(channel = ?this.channel, "channel closed");
            }
        });
    }

    /// Drop the handle and clear the connection state. Safe to call repeatedly.
    pub fn dispose(&mut self) {
        self.scoped(|this| {
            if this.teardown() {
                info!(channel = ?this.channel, "channel disposed");
            }
            this.channel = None;
        });
    }

    /// Whether a usable channel handle is held.
    pub fn is_connected(&self) -> bool {
        self.connected && self.stream.is_some()
    }

    /// The channel id of the current, or last closed, connection.
    pub fn connected_channel(&self) -> Option<ChannelId> {
        self.channel
    }

    pub fn config(&self) -> &ConnectConfig {
        &self.config
    }

    pub fn connector(&self) -> &C {
        &self.connector
    }

    /// The dispatcher this manager logs to.
    pub fn logger(&self) -> &Dispatch {
        &self.logger
    }

    fn teardown(&mut self) -> bool {
        self.connected = false;
        self.stream.take().is_some()
    }

    fn scoped<T>(&mut self, f: impl FnOnce(&mut Self) -> T) -> T {
        let logger = self.logger.clone();
        tracing::dispatcher::with_default(&logger, || f(self))
    }
}

impl<C: Connector> Read for ChannelManager<C> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.raw_read(buf).map_err(Into::into)
    }
}

impl<C: Connector> Write for ChannelManager<C> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let stream = self.stream.as_mut().ok_or(TransportError::NotConnected)?;
        stream.write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        let stream = self.stream.as_mut().ok_or(TransportError::NotConnected)?;
        stream.flush()
    }

    fn write_all(&mut self, buf: &[u8]) -> std::io::Result<()> {
        self.raw_write(buf).map_err(Into::into)
    }
}

impl<C: Connector> Drop for ChannelManager<C> {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl<C: Connector> std::fmt::Debug for ChannelManager<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChannelManager")
            .field("connected", &self.is_connected())
            .field("channel", &self.channel)
            .field("config", &self.config)
            .finish()
    }
}
