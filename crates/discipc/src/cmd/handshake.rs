use crate::cmd::{HandshakeArgs, Session};
use crate::exit::{client_error, CliResult, SUCCESS};
use crate::output::{print_frame, print_status, OutputFormat};

pub fn run(args: HandshakeArgs, session: &Session, format: OutputFormat) -> CliResult<i32> {
    let mut client = session.client(args.protocol_version);
    let channel = client
        .connect(args.channel)
        .map_err(|err| client_error("connect failed", err))?;

    client
        .handshake(&args.client_id)
        .map_err(|err| client_error("handshake failed", err))?;

    if args.wait {
        let frame = client
            .try_read_frame()
            .map_err(|err| client_error("receive failed", err))?;
        print_frame(&frame, channel, format);
    } else {
        print_status(channel, client.handshake_sent(), format);
    }

    client.dispose();
    Ok(SUCCESS)
}
