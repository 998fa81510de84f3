use bytes::Bytes;
use plxgpib_frame::{ByteOrder, Precision, ValueFormat};
use plxgpib_session::SessionConfig;
use tracing::debug;

use crate::cmd::ValuesArgs;
use crate::exit::{session_error, CliResult, SUCCESS};
use crate::output::{print_values, OutputFormat, ValuesOutput};

pub fn run(args: ValuesArgs, format: OutputFormat) -> CliResult<i32> {
    let value_format = args.value_format();
    let config = SessionConfig {
        format: value_format,
        header: Bytes::from(args.header.clone().into_bytes()),
        ..args.target.session_config()?
    };
    let session = args.target.open_with(config)?;
    let values = session
        .ask_for_values(&args.query)
        .map_err(|err| session_error("values failed", err))?;
    debug!(count = values.len(), bits = value_format.bits(), "decoded reply");

    let label = format_label(&value_format);
    let out = ValuesOutput {
        endpoint: args.target.link.endpoint.to_string(),
        address: session.address(),
        query: &args.query,
        value_format: &label,
        count: values.len(),
        values: &values,
    };
    print_values(&out, format);
    Ok(SUCCESS)
}

fn format_label(format: &ValueFormat) -> String {
    if format.is_ascii() {
        return "ascii".to_string();
    }
    let precision = match format.precision {
        Precision::Single => "single",
        Precision::Double => "double",
    };
    if format.byte_order == ByteOrder::Big {
        format!("{precision},big-endian")
    } else {
        precision.to_string()
    }
}
