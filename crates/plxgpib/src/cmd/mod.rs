use std::time::Duration;

use clap::{Args, Subcommand, ValueEnum};
use plxgpib_frame::ValueFormat;
use plxgpib_session::{open_session, Session, SessionConfig, MAX_GPIB_ADDRESS, MIN_GPIB_ADDRESS};
use plxgpib_transport::{ControllerRegistry, Endpoint, LinkConfig};

use crate::exit::{session_error, CliError, CliResult, USAGE};
use crate::output::OutputFormat;

pub mod ask;
pub mod info;
pub mod srq;
pub mod values;
pub mod version;
pub mod write;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Query the adapter's version and current address / auto settings.
    Info(InfoArgs),
    /// Send a command to an instrument.
    Write(WriteArgs),
    /// Send a query and print the text reply.
    Ask(AskArgs),
    /// Send a query and print the decoded numeric reply.
    Values(ValuesArgs),
    /// Wait for an instrument to request service.
    Srq(SrqArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Info(args) => info::run(args, format),
        Command::Write(args) => write::run(args),
        Command::Ask(args) => ask::run(args, format),
        Command::Values(args) => values::run(args, format),
        Command::Srq(args) => srq::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

/// Adapter link options shared by every command that opens one.
#[derive(Args, Debug)]
pub struct LinkArgs {
    /// Adapter endpoint: host[:port], tcp://host[:port], serial://path or a device path.
    pub endpoint: Endpoint,
    /// Send / receive timeout on the link (e.g. 5s, 500ms).
    #[arg(long, default_value = "5s")]
    pub io_timeout: String,
    /// Serial adapters: disable RTS/CTS flow control.
    #[arg(long)]
    pub no_flow_control: bool,
}

impl LinkArgs {
    pub fn link_config(&self) -> CliResult<LinkConfig> {
        Ok(LinkConfig {
            timeout: parse_duration(&self.io_timeout, false)?,
            hardware_flow_control: !self.no_flow_control,
            ..LinkConfig::default()
        })
    }
}

/// An instrument behind an adapter.
#[derive(Args, Debug)]
pub struct TargetArgs {
    #[command(flatten)]
    pub link: LinkArgs,
    /// GPIB address of the instrument.
    #[arg(long, value_parser = clap::value_parser!(u8).range(i64::from(MIN_GPIB_ADDRESS)..=i64::from(MAX_GPIB_ADDRESS)))]
    pub addr: u8,
    /// Pause after each write (e.g. 100ms, 0).
    #[arg(long, default_value = "100ms")]
    pub delay: String,
    /// Address the instrument to talk with `++read eoi` instead of read-after-write.
    #[arg(long)]
    pub no_auto: bool,
}

impl TargetArgs {
    pub fn session_config(&self) -> CliResult<SessionConfig> {
        Ok(SessionConfig {
            auto: !self.no_auto,
            delay: parse_duration(&self.delay, true)?,
            ..SessionConfig::new(self.addr)
        })
    }

    pub fn open(&self) -> CliResult<Session> {
        self.open_with(self.session_config()?)
    }

    pub fn open_with(&self, config: SessionConfig) -> CliResult<Session> {
        let registry = ControllerRegistry::new();
        open_session(
            &registry,
            &self.link.endpoint,
            &self.link.link_config()?,
            config,
        )
        .map_err(|err| session_error("connect failed", err))
    }
}

#[derive(Args, Debug)]
pub struct InfoArgs {
    #[command(flatten)]
    pub link: LinkArgs,
}

#[derive(Args, Debug)]
pub struct WriteArgs {
    #[command(flatten)]
    pub target: TargetArgs,
    /// Command to send.
    pub command: String,
}

#[derive(Args, Debug)]
pub struct AskArgs {
    #[command(flatten)]
    pub target: TargetArgs,
    /// Query to send.
    pub query: String,
    /// Extra pause between the query and the read (e.g. 500ms).
    #[arg(long, default_value = "0")]
    pub ask_delay: String,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
pub enum ValueEncoding {
    Ascii,
    Single,
    Double,
}

#[derive(Args, Debug)]
pub struct ValuesArgs {
    #[command(flatten)]
    pub target: TargetArgs,
    /// Query to send.
    pub query: String,
    /// How the instrument encodes the reply.
    #[arg(long, default_value = "ascii")]
    pub value_format: ValueEncoding,
    /// Binary values are big-endian.
    #[arg(long)]
    pub big_endian: bool,
    /// Marker preceding a binary block.
    #[arg(long, default_value = "#A")]
    pub header: String,
}

impl ValuesArgs {
    pub fn value_format(&self) -> ValueFormat {
        let format = match self.value_format {
            ValueEncoding::Ascii => return ValueFormat::ascii(),
            ValueEncoding::Single => ValueFormat::single(),
            ValueEncoding::Double => ValueFormat::double(),
        };
        if self.big_endian {
            format.big_endian()
        } else {
            format
        }
    }
}

#[derive(Args, Debug)]
pub struct SrqArgs {
    #[command(flatten)]
    pub target: TargetArgs,
    /// How long to wait for the service request (e.g. 10s, 0 for one poll).
    /// Defaults to 25s.
    #[arg(long)]
    pub timeout: Option<String>,
    /// Query returning the status byte.
    #[arg(long, default_value = "STB?")]
    pub status_query: String,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

/// Parse `5s`, `500ms` or a bare number of seconds.
pub fn parse_duration(input: &str, allow_zero: bool) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, millis) = if let Some(num) = input.strip_suffix("ms") {
        (num, true)
    } else if let Some(num) = input.strip_suffix('s') {
        (num, false)
    } else {
        (input, false)
    };

    let value: u64 = number
        .trim()
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration value: {input}")))?;

    if value == 0 && !allow_zero {
        return Err(CliError::new(USAGE, "duration must be greater than zero"));
    }

    Ok(if millis {
        Duration::from_millis(value)
    } else {
        Duration::from_secs(value)
    })
}
