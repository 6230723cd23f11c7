use std::fs;

use discipc_client::{Client, ClientError};
use discipc_frame::{Frame, Opcode};
use discipc_transport::Connector;

use crate::cmd::{SendArgs, Session};
use crate::exit::{client_error, CliError, CliResult, SUCCESS, USAGE};
use crate::output::{print_frame, OutputFormat};

pub fn run(args: SendArgs, session: &Session, format: OutputFormat) -> CliResult<i32> {
    let payload = resolve_payload(&args)?;

    let mut client = session.client(discipc_frame::HANDSHAKE_VERSION);
    let channel = client
        .connect(args.channel)
        .map_err(|err| client_error("connect failed", err))?;

    if let Some(client_id) = &args.client_id {
        client
            .handshake(client_id)
            .map_err(|err| client_error("handshake failed", err))?;
    }

    client
        .send(args.opcode, &payload)
        .map_err(|err| client_error("send failed", err))?;

    if args.wait {
        let frames = collect_responses(&mut client, args.count)
            .map_err(|err| client_error("receive failed", err))?;
        for frame in &frames {
            print_frame(frame, channel, format);
        }
    }

    client.dispose();
    Ok(SUCCESS)
}

fn resolve_payload(args: &SendArgs) -> CliResult<Vec<u8>> {
    if let Some(json) = &args.json {
        serde_json::from_str::<serde_json::Value>(json)
            .map_err(|err| CliError::new(USAGE, format!("--json is not valid JSON: {err}")))?;
        return Ok(json.as_bytes().to_vec());
    }
    if let Some(data) = &args.data {
        return Ok(data.as_bytes().to_vec());
    }
    if let Some(path) = &args.file {
        return fs::read(path).map_err(|err| {
            crate::exit::io_error(&format!("failed reading {}", path.display()), err)
        });
    }
    Ok(Vec::new())
}

trait FrameSource {
    fn next_frame(&mut self) -> Result<Frame, ClientError>;
}

impl<C: Connector> FrameSource for Client<C> {
    fn next_frame(&mut self) -> Result<Frame, ClientError> {
        self.try_read_frame()
    }
}

/// Read up to `count` frames. A Close frame from the peer ends the wait early.
fn collect_responses<S: FrameSource>(
    source: &mut S,
    count: usize,
) -> Result<Vec<Frame>, ClientError> {
    let mut frames = Vec::with_capacity(count);
    while frames.len() < count {
        let frame = source.next_frame()?;
        let closing = frame.kind() == Some(Opcode::Close);
        frames.push(frame);
        if closing {
            break;
        }
    }
    Ok(frames)
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;

    use discipc_frame::FrameError;

    use super::*;

    struct MockSource {
        frames: VecDeque<Frame>,
        calls: usize,
    }

    impl MockSource {
        fn new(frames: Vec<Frame>) -> Self {
            Self {
                frames: frames.into(),
                calls: 0,
            }
        }
    }

    impl FrameSource for MockSource {
        fn next_frame(&mut self) -> Result<Frame, ClientError> {
            self.calls += 1;
            self.frames
                .pop_front()
                .ok_or(ClientError::Frame(FrameError::BadOpcode { read: 0 }))
        }
    }

    #[test]
    fn collects_requested_count() {
        let mut source = MockSource::new(vec![
            Frame::new(Opcode::Frame, "ready"),
            Frame::new(Opcode::Frame, "reply"),
            Frame::new(Opcode::Frame, "extra"),
        ]);
        let frames = collect_responses(&mut source, 2).expect("two frames");
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[1].data().as_ref(), b"reply");
        assert_eq!(source.calls, 2);
    }

    #[test]
    fn close_frame_ends_wait() {
        let mut source = MockSource::new(vec![
            Frame::new(Opcode::Close, r#"{"code":4000}"#),
            Frame::new(Opcode::Frame, "never read"),
        ]);
        let frames = collect_responses(&mut source, 5).expect("close frame");
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].kind(), Some(Opcode::Close));
        assert_eq!(source.calls, 1);
    }

    #[test]
    fn read_failure_propagates() {
        let mut source = MockSource::new(Vec::new());
        let err = collect_responses(&mut source, 1).unwrap_err();
        assert!(matches!(
            err,
            ClientError::Frame(FrameError::BadOpcode { read: 0 })
        ));
    }

    #[test]
    fn payload_from_json_is_validated() {
        let args = SendArgs {
            client_id: None,
            channel: None,
            opcode: 1,
            json: Some("{not json".to_string()),
            data: None,
            file: None,
            wait: false,
            count: 1,
        };
        assert_eq!(resolve_payload(&args).unwrap_err().code, USAGE);
    }

    #[test]
    fn payload_defaults_to_empty() {
        let args = SendArgs {
            client_id: None,
            channel: None,
            opcode: 3,
            json: None,
            data: None,
            file: None,
            wait: false,
            count: 1,
        };
        assert!(resolve_payload(&args).unwrap().is_empty());
    }
}
