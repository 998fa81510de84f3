use std::time::Duration;

use plxgpib_session::{SessionConfig, DEFAULT_SRQ_TIMEOUT};
use serde::Serialize;

use crate::cmd::{parse_duration, SrqArgs};
use crate::exit::{session_error, CliError, CliResult, SUCCESS, TIMEOUT};
use crate::output::{print_json, OutputFormat};

#[derive(Serialize)]
struct SrqOutput {
    endpoint: String,
    address: u8,
    service_request: bool,
    waited_ms: u128,
}

pub fn run(args: SrqArgs, format: OutputFormat) -> CliResult<i32> {
    let timeout = wait_window(args.timeout.as_deref())?;
    let config = SessionConfig {
        status_query: args.status_query.clone(),
        ..args.target.session_config()?
    };
    let session = args.target.open_with(config)?;

    let started = std::time::Instant::now();
    let requested = session
        .wait_for_srq(timeout)
        .map_err(|err| session_error("srq failed", err))?;
    if !requested {
        return Err(CliError::new(
            TIMEOUT,
            format!("no service request within {timeout:?}"),
        ));
    }

    let out = SrqOutput {
        endpoint: args.target.link.endpoint.to_string(),
        address: session.address(),
        service_request: true,
        waited_ms: started.elapsed().as_millis(),
    };
    match format {
        OutputFormat::Json => print_json(&out),
        OutputFormat::Table | OutputFormat::Pretty => {
            println!(
                "Service request from {}@{} after {}ms",
                out.endpoint, out.address, out.waited_ms
            );
        }
        OutputFormat::Raw => println!("{}", out.address),
    }
    Ok(SUCCESS)
}

fn wait_window(arg: Option<&str>) -> CliResult<Duration> {
    match arg {
        Some(text) => parse_duration(text, true),
        None => Ok(DEFAULT_SRQ_TIMEOUT),
    }
}
