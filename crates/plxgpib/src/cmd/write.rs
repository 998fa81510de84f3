use tracing::info;

use crate::cmd::WriteArgs;
use crate::exit::{session_error, CliResult, SUCCESS};

pub fn run(args: WriteArgs) -> CliResult<i32> {
    let session = args.target.open()?;
    session
        .write(&args.command)
        .map_err(|err| session_error("write failed", err))?;
    info!(
        endpoint = %args.target.link.endpoint,
        addr = session.address(),
        command = %args.command,
        "sent"
    );
    Ok(SUCCESS)
}
