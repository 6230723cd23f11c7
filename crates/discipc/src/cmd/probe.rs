use discipc_transport::{ChannelId, Connector};

use crate::cmd::{ProbeArgs, Session};
use crate::exit::{transport_error, CliResult, SUCCESS, TRANSPORT_ERROR};
use crate::output::{print_probe, OutputFormat, ProbeResult};

pub fn run(args: ProbeArgs, session: &Session, format: OutputFormat) -> CliResult<i32> {
    let mut manager = session.manager();

    if args.first {
        let channel = manager
            .connect(None)
            .map_err(|err| transport_error("probe failed", err))?;
        let result = ProbeResult::reachable(channel, manager.connector().pipe_path(channel));
        manager.dispose();
        print_probe(&[result], format);
        return Ok(SUCCESS);
    }

    let ids: Vec<ChannelId> = match args.channel {
        Some(id) => vec![id],
        None => ChannelId::all().collect(),
    };

    let results: Vec<ProbeResult> = ids
        .into_iter()
        .map(|id| {
            let pipe = manager.connector().pipe_path(id);
            match manager.connect(Some(id)) {
                Ok(_) => {
                    manager.dispose();
                    ProbeResult::reachable(id, pipe)
                }
                Err(err) => ProbeResult::unreachable(id, pipe, &err),
            }
        })
        .collect();

    print_probe(&results, format);

    if results.iter().any(|result| result.reachable) {
        Ok(SUCCESS)
    } else {
        Ok(TRANSPORT_ERROR)
    }
}
