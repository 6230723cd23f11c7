use std::path::PathBuf;
use std::time::Duration;

use tracing::debug;

use crate::channel::ChannelId;
use crate::error::{Result, TransportError};
use crate::stream::{IpcStream, PipeStream};

/// Opens the pipe behind a channel id.
pub trait Connector {
    type Stream: PipeStream;

    /// Full platform path of the pipe for `id`.
    fn pipe_path(&self, id: ChannelId) -> PathBuf;

    /// Open the pipe for `id`, waiting at most `timeout` for the OS-level connect.
    fn open(&self, id: ChannelId, timeout: Duration) -> Result<Self::Stream>;
}

/// Connector for the host's real pipes.
///
/// On Unix the pipe lives in the first of `XDG_RUNTIME_DIR`, `TMPDIR`, `TMP`,
/// `TEMP` that is set, falling back to `/tmp`. On Windows it is
/// `\\.\pipe\discord-ipc-{n}`.
#[derive(Debug, Clone, Default)]
pub struct SystemConnector {
    pipe_dir: Option<PathBuf>,
}

impl SystemConnector {
    /// Environment variables consulted for the Unix pipe directory, in order.
    pub const PIPE_DIR_ENV: [&'static str; 4] = ["XDG_RUNTIME_DIR", "TMPDIR", "TMP", "TEMP"];

    pub fn new() -> Self {
        Self::default()
    }

    /// Look for pipes in `dir` instead of the environment-derived directory.
    ///
    /// Ignored on Windows, where named pipes live in a fixed namespace.
    pub fn with_pipe_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            pipe_dir: Some(dir.into()),
        }
    }

    /// Directory that holds the pipes on Unix.
    pub fn pipe_dir(&self) -> PathBuf {
        if let Some(dir) = &self.pipe_dir {
            return dir.clone();
        }
        Self::PIPE_DIR_ENV
            .iter()
            .filter_map(|key| std::env::var_os(key))
            .find(|value| !value.is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("/tmp"))
    }
}

#[cfg(unix)]
impl Connector for SystemConnector {
    type Stream = IpcStream;

    fn pipe_path(&self, id: ChannelId) -> PathBuf {
        self.pipe_dir().join(id.pipe_name())
    }

    fn open(&self, id: ChannelId, timeout: Duration) -> Result<IpcStream> {
        let path = self.pipe_path(id);
        match crate::uds::connect(&path, timeout) {
            Ok(stream) => {
                debug!(channel = %id, ?path, "opened unix domain socket");
                Ok(IpcStream::from_unix(stream))
            }
            Err(err) if err.kind() == std::io::ErrorKind::TimedOut => {
                Err(TransportError::Timeout {
                    channel: id,
                    waited: timeout,
                })
            }
            Err(source) => Err(TransportError::Connect {
                channel: id,
                path,
                source,
            }),
        }
    }
}

#[cfg(windows)]
impl Connector for SystemConnector {
    type Stream = IpcStream;

    fn pipe_path(&self, id: ChannelId) -> PathBuf {
        PathBuf::from(format!(r"\\.\pipe\{}", id.pipe_name()))
    }

    fn open(&self, id: ChannelId, timeout: Duration) -> Result<IpcStream> {
        use std::os::windows::ffi::OsStrExt;

        let path = self.pipe_path(id);
        let wide: Vec<u16> = path
            .as_os_str()
            .encode_wide()
            .chain(std::iter::once(0))
            .collect();
        let timeout_ms = u32::try_from(timeout.as_millis()).unwrap_or(u32::MAX);

        // SAFETY: `wide` is a NUL-terminated UTF-16 buffer that outlives the call.
        let ready =
            unsafe { windows_sys::Win32::System::Pipes::WaitNamedPipeW(wide.as_ptr(), timeout_ms) };
        if ready == 0 {
            let source = std::io::Error::last_os_error();
            let timed_out = windows_sys::Win32::Foundation::ERROR_SEM_TIMEOUT as i32;
            if source.raw_os_error() == Some(timed_out) {
                return Err(TransportError::Timeout {
                    channel: id,
                    waited: timeout,
                });
            }
            return Err(TransportError::Connect {
                channel: id,
                path,
                source,
            });
        }

        let file = std::fs::OpenOptions::new()
            .read(true)
            .write(true)
            .open(&path)
            .map_err(|source| TransportError::Connect {
                channel: id,
                path: path.clone(),
                source,
            })?;
        debug!(channel = %id, ?path, "opened named pipe");
        Ok(IpcStream::from_pipe(file))
    }
}
