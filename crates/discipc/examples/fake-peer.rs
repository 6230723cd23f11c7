//! Stand-in peer that accepts one client, checks its handshake, and echoes
//! every frame back until the client hangs up.
//!
//! Run with:
//!   cargo run --example fake-peer
//!
//! In another terminal, point the CLI at the printed directory:
//!   cargo run --features cli -- --pipe-dir <dir> send --client-id 1 \
//!     --json '{"cmd":"PING"}' --wait

#[cfg(unix)]
fn main() -> Result<(), Box<dyn std::error::Error>> {
    use std::fs;
    use std::os::unix::net::UnixListener;

    use discipc::frame::{FrameError, FrameReader, FrameWriter, Handshake, Opcode};
    use discipc::transport::ChannelId;

    let dir = std::env::temp_dir().join(format!("discipc-fake-peer-{}", std::process::id()));
    fs::create_dir_all(&dir)?;
    let path = dir.join(ChannelId::new(0)?.pipe_name());
    let _ = fs::remove_file(&path);

    let listener = UnixListener::bind(&path)?;
    eprintln!("Listening on {}", path.display());
    eprintln!("Pipe dir: {}", dir.display());

    let (stream, _) = listener.accept()?;
    let mut reader = FrameReader::new(stream.try_clone()?);
    let mut writer = FrameWriter::new(stream);

    let first = reader.try_read_frame()?;
    if first.kind() != Some(Opcode::Handshake) {
        eprintln!("Expected handshake, got opcode {}", first.opcode());
        return Ok(());
    }
    let handshake = Handshake::from_payload(first.data())?;
    eprintln!(
        "Handshake v{} from client {}",
        handshake.version, handshake.client_id
    );

    loop {
        match reader.try_read_frame() {
            Ok(frame) if frame.kind() == Some(Opcode::Ping) => {
                writer.send(Opcode::Pong.into(), frame.data())?;
            }
            Ok(frame) => {
                eprintln!("Echoing {} bytes (opcode {})", frame.len(), frame.opcode());
                writer.write_frame(&frame)?;
            }
            Err(FrameError::BadOpcode { read: 0 }) => {
                eprintln!("Client hung up");
                break;
            }
            Err(err) => {
                eprintln!("Read failed: {err}");
                break;
            }
        }
    }

    let _ = fs::remove_dir_all(&dir);
    Ok(())
}

#[cfg(not(unix))]
fn main() {
    eprintln!("fake-peer needs Unix domain sockets");
}
