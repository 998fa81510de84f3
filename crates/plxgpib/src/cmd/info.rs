use std::sync::PoisonError;

use plxgpib_transport::{ControllerRegistry, TransportError};
use serde::Serialize;

use crate::cmd::InfoArgs;
use crate::exit::{transport_error, CliResult, SUCCESS};
use crate::output::{print_json, OutputFormat};

#[derive(Serialize)]
struct InfoOutput {
    endpoint: String,
    transport: &'static str,
    version: String,
    address: u8,
    auto: bool,
    save_config: Option<bool>,
}

pub fn run(args: InfoArgs, format: OutputFormat) -> CliResult<i32> {
    let endpoint = &args.link.endpoint;
    let registry = ControllerRegistry::new();
    let shared = registry
        .get_or_open(endpoint, &args.link.link_config()?)
        .map_err(|err| transport_error("connect failed", err))?;
    let mut controller = shared.lock().unwrap_or_else(PoisonError::into_inner);

    let query = |err: TransportError| transport_error("adapter query failed", err);
    let version = controller.version().map_err(query)?;
    let auto = controller.refresh_auto().map_err(query)?;
    let address = controller.refresh_address().map_err(query)?;
    let save_config = if endpoint.is_serial() {
        Some(controller.refresh_save_config().map_err(query)?)
    } else {
        None
    };

    let out = InfoOutput {
        endpoint: endpoint.to_string(),
        transport: endpoint.transport_name(),
        version,
        address,
        auto,
        save_config,
    };
    print_info(&out, format);
    Ok(SUCCESS)
}

fn print_info(out: &InfoOutput, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(out),
        OutputFormat::Table | OutputFormat::Pretty => {
            println!("Adapter Info:");
            println!("  Endpoint:  {} ({})", out.endpoint, out.transport);
            println!("  Version:   {}", out.version);
            println!("  Address:   {}", out.address);
            println!("  Auto:      {}", if out.auto { "on" } else { "off" });
            match out.save_config {
                Some(save) => println!("  Save cfg:  {}", if save { "on" } else { "off" }),
                None => println!("  Save cfg:  n/a"),
            }
        }
        OutputFormat::Raw => {
            println!("{}", out.version);
        }
    }
}
