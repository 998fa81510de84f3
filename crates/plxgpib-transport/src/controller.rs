use std::io::{ErrorKind, Read, Write};
use std::time::Duration;

use bytes::Bytes;
use tracing::{debug, trace};

use crate::config::{LinkConfig, Terminator};
use crate::endpoint::Endpoint;
use crate::error::{ConfigError, Result, TransportError};
use crate::traits::{ByteLink, LinkStream};

const UNRECOGNIZED_COMMAND: &str = "Unrecognized command";

/// A Prologix controller reachable over one physical link.
///
/// The adapter talks to exactly one GPIB address at a time and has one
/// read-after-write setting. Both are mirrored here so callers can skip
/// redundant `++addr` / `++auto` traffic. The mirror is updated *before* the
/// command is sent: while a change is in flight it holds the intended value,
/// not a confirmed one.
pub struct Controller<L = LinkStream> {
    link: L,
    terminator: Terminator,
    write_delay: Duration,
    read_chunk: usize,
    address: Option<u8>,
    auto: Option<bool>,
}

impl Controller<LinkStream> {
    /// Open the adapter at `endpoint` and put it into a known state.
    ///
    /// GPIB-Ethernet adapters are switched to controller mode. GPIB-USB
    /// adapters get `++savecfg 0` so address changes do not wear the EEPROM.
    pub fn open(endpoint: &Endpoint, config: &LinkConfig) -> Result<Self> {
        let link = LinkStream::open(endpoint, config)?;
        let mut controller = Self::with_link(link, config.terminator_for(endpoint), config)?;
        if endpoint.is_serial() {
            controller.set_save_config(false)?;
        } else {
            controller.set_controller_mode()?;
        }
        debug!(%endpoint, transport = endpoint.transport_name(), "controller ready");
        Ok(controller)
    }
}

impl<L: ByteLink> Controller<L> {
    /// Wrap an already-open link.
    ///
    /// Nothing is sent; the address and auto mirrors start out unknown.
    pub fn with_link(link: L, terminator: Terminator, config: &LinkConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            link,
            terminator,
            write_delay: config.write_delay,
            read_chunk: config.read_chunk,
            address: None,
            auto: None,
        })
    }

    /// Send a command followed by the line terminator, then pause for the
    /// default write delay.
    pub fn write(&mut self, command: &str) -> Result<()> {
        self.write_with_delay(command, self.write_delay)
    }

    /// Send a command, then pause for `delay`.
    pub fn write_with_delay(&mut self, command: &str, delay: Duration) -> Result<()> {
        let mut line = Vec::with_capacity(command.len() + self.terminator.as_bytes().len());
        line.extend_from_slice(command.as_bytes());
        line.extend_from_slice(self.terminator.as_bytes());

        trace!(command, "write");
        self.link.write_all(&line)?;
        self.link.flush()?;

        if !delay.is_zero() {
            std::thread::sleep(delay);
        }
        Ok(())
    }

    /// One bounded read of up to `max` bytes, returned untouched.
    ///
    /// Does not loop: whatever a single receive yields is the reply.
    pub fn read_raw(&mut self, max: usize) -> Result<Bytes> {
        if max == 0 {
            return Err(ConfigError::InvalidChunkSize.into());
        }
        let mut buf = vec![0u8; max];
        let read = loop {
            match self.link.read(&mut buf) {
                Ok(n) => break n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(TransportError::Io(err)),
            }
        };
        if read == 0 {
            return Err(TransportError::Closed);
        }
        buf.truncate(read);
        trace!(bytes = read, "read");
        Ok(Bytes::from(buf))
    }

    /// One bounded read with trailing CR / LF removed.
    pub fn read_all(&mut self, max: usize) -> Result<Bytes> {
        let mut reply = self.read_raw(max)?;
        let kept = reply
            .iter()
            .rposition(|b| !matches!(b, b'\r' | b'\n'))
            .map_or(0, |pos| pos + 1);
        reply.truncate(kept);
        Ok(reply)
    }

    /// Drop stale input on links that buffer it (the serial adapter).
    pub fn discard_stale_input(&mut self) -> Result<()> {
        if self.link.discards_before_query() {
            self.link.discard_input()?;
        }
        Ok(())
    }

    /// Write `query`, then read one reply of up to the default chunk size.
    pub fn ask(&mut self, query: &str) -> Result<String> {
        self.discard_stale_input()?;
        self.write(query)?;
        let reply = self.read_all(self.read_chunk)?;
        Ok(String::from_utf8_lossy(&reply).into_owned())
    }

    /// Last known GPIB address, without touching the adapter.
    pub fn address(&self) -> Option<u8> {
        self.address
    }

    /// Last known read-after-write setting, without touching the adapter.
    pub fn auto_mode(&self) -> Option<bool> {
        self.auto
    }

    /// Address the instrument at `addr`.
    pub fn set_address(&mut self, addr: u8) -> Result<()> {
        self.address = Some(addr);
        debug!(addr, "re-addressing adapter");
        self.write(&format!("++addr {addr}"))
    }

    /// Enable or disable read-after-write.
    pub fn set_auto(&mut self, auto: bool) -> Result<()> {
        self.auto = Some(auto);
        debug!(auto, "changing read-after-write");
        self.write(&format!("++auto {}", u8::from(auto)))
    }

    /// Query the adapter for its current GPIB address and update the mirror.
    pub fn refresh_address(&mut self) -> Result<u8> {
        let addr = self.ask_number("++addr")?;
        let addr = u8::try_from(addr).map_err(|_| TransportError::UnexpectedReply {
            command: "++addr".into(),
            reply: addr.to_string(),
        })?;
        self.address = Some(addr);
        Ok(addr)
    }

    /// Query the adapter for its read-after-write setting and update the mirror.
    pub fn refresh_auto(&mut self) -> Result<bool> {
        let auto = self.ask_number("++auto")? != 0;
        self.auto = Some(auto);
        Ok(auto)
    }

    /// Adapter firmware version string.
    pub fn version(&mut self) -> Result<String> {
        self.ask("++ver")
    }

    /// Whether the adapter persists settings to EEPROM.
    pub fn refresh_save_config(&mut self) -> Result<bool> {
        Ok(self.ask_number("++savecfg")? != 0)
    }

    /// Enable or disable persisting settings to EEPROM.
    pub fn set_save_config(&mut self, save: bool) -> Result<()> {
        self.write(&format!("++savecfg {}", u8::from(save)))
    }

    /// Enable or disable EOI assertion with the last byte of each write.
    pub fn set_eoi(&mut self, eoi: bool) -> Result<()> {
        self.write(&format!("++eoi {}", u8::from(eoi)))
    }

    /// Put the adapter into CONTROLLER mode.
    pub fn set_controller_mode(&mut self) -> Result<()> {
        self.write("++mode 1")
    }

    /// Address the current instrument to talk until it asserts EOI.
    pub fn read_eoi(&mut self, delay: Duration) -> Result<()> {
        self.write_with_delay("++read eoi", delay)
    }

    /// Borrow the underlying link.
    pub fn get_ref(&self) -> &L {
        &self.link
    }

    fn ask_number(&mut self, command: &str) -> Result<u32> {
        let reply = self.ask(command)?;
        let reply = reply.trim();
        if reply == UNRECOGNIZED_COMMAND {
            return Err(TransportError::Unsupported {
                command: command.to_string(),
            });
        }
        reply
            .parse()
            .map_err(|_| TransportError::UnexpectedReply {
                command: command.to_string(),
                reply: reply.to_string(),
            })
    }
}

impl<L> std::fmt::Debug for Controller<L> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Controller")
            .field("terminator", &self.terminator)
            .field("write_delay", &self.write_delay)
            .field("read_chunk", &self.read_chunk)
            .field("address", &self.address)
            .field("auto", &self.auto)
            .finish_non_exhaustive()
    }
}
