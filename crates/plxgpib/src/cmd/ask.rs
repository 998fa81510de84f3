use plxgpib_session::SessionConfig;

use crate::cmd::{parse_duration, AskArgs};
use crate::exit::{session_error, CliResult, SUCCESS};
use crate::output::{print_reply, OutputFormat, ReplyOutput};

pub fn run(args: AskArgs, format: OutputFormat) -> CliResult<i32> {
    let config = SessionConfig {
        ask_delay: parse_duration(&args.ask_delay, true)?,
        ..args.target.session_config()?
    };
    let session = args.target.open_with(config)?;
    let reply = session
        .ask(&args.query)
        .map_err(|err| session_error("ask failed", err))?;

    let out = ReplyOutput {
        endpoint: args.target.link.endpoint.to_string(),
        address: session.address(),
        query: &args.query,
        reply: &reply,
    };
    print_reply(&out, format);
    Ok(SUCCESS)
}
