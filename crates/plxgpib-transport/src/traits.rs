use std::io::{self, Read, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

use serialport::{ClearBuffer, FlowControl, SerialPort};
use tracing::debug;

use crate::config::LinkConfig;
use crate::endpoint::Endpoint;
use crate::error::{Result, TransportError};

/// Raw byte channel to an adapter.
///
/// Everything above this trait is adapter protocol; everything below it is
/// the operating system.
pub trait ByteLink: Read + Write + Send {
    /// Drop bytes already buffered for reading.
    fn discard_input(&mut self) -> io::Result<()> {
        Ok(())
    }

    /// Whether stale input should be discarded before each query.
    fn discards_before_query(&self) -> bool {
        false
    }
}

/// A connected adapter link: a TCP stream or a serial port.
pub struct LinkStream {
    inner: LinkStreamInner,
}

enum LinkStreamInner {
    Tcp(TcpStream),
    Serial(Box<dyn SerialPort>),
}

impl LinkStream {
    /// Open the link described by `endpoint`.
    pub fn open(endpoint: &Endpoint, config: &LinkConfig) -> Result<Self> {
        config.validate()?;
        match endpoint {
            Endpoint::Tcp { host, port } => Self::connect_tcp(host, *port, config.timeout),
            Endpoint::Serial { path } => Self::open_serial(
                path,
                config.baud_rate,
                config.hardware_flow_control,
                config.timeout,
            ),
        }
    }

    /// Connect to a GPIB-Ethernet adapter (blocking).
    pub fn connect_tcp(host: &str, port: u16, timeout: Duration) -> Result<Self> {
        let endpoint = Endpoint::Tcp {
            host: host.to_string(),
            port,
        }
        .to_string();
        let connect_err = |source| TransportError::Connect {
            endpoint: endpoint.clone(),
            source,
        };

        let addrs = (host, port).to_socket_addrs().map_err(connect_err)?;
        let mut last_err =
            io::Error::new(io::ErrorKind::NotFound, "host resolved to no addresses");
        for addr in addrs {
            match TcpStream::connect_timeout(&addr, timeout) {
                Ok(stream) => {
                    stream.set_read_timeout(Some(timeout))?;
                    stream.set_write_timeout(Some(timeout))?;
                    stream.set_nodelay(true)?;
                    debug!(%addr, "connected to gpib-ethernet adapter");
                    return Ok(Self {
                        inner: LinkStreamInner::Tcp(stream),
                    });
                }
                Err(err) => last_err = err,
            }
        }
        Err(connect_err(last_err))
    }

    /// Open a GPIB-USB adapter's virtual serial port (blocking).
    ///
    /// Bytes left in the input buffer from a previous session are dropped.
    pub fn open_serial(
        path: &str,
        baud_rate: u32,
        hardware_flow_control: bool,
        timeout: Duration,
    ) -> Result<Self> {
        let flow = if hardware_flow_control {
            FlowControl::Hardware
        } else {
            FlowControl::None
        };
        let port = serialport::new(path, baud_rate)
            .flow_control(flow)
            .timeout(timeout)
            .open()
            .map_err(|source| TransportError::OpenSerial {
                path: path.to_string(),
                source,
            })?;
        port.clear(ClearBuffer::Input)
            .map_err(|source| TransportError::OpenSerial {
                path: path.to_string(),
                source,
            })?;
        debug!(path, baud_rate, "opened gpib-usb adapter");
        Ok(Self {
            inner: LinkStreamInner::Serial(port),
        })
    }

    pub fn is_serial(&self) -> bool {
        matches!(self.inner, LinkStreamInner::Serial(_))
    }
}

impl Read for LinkStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match &mut self.inner {
            LinkStreamInner::Tcp(stream) => stream.read(buf),
            LinkStreamInner::Serial(port) => port.read(buf),
        }
    }
}

impl Write for LinkStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match &mut self.inner {
            LinkStreamInner::Tcp(stream) => stream.write(buf),
            LinkStreamInner::Serial(port) => port.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match &mut self.inner {
            LinkStreamInner::Tcp(stream) => stream.flush(),
            LinkStreamInner::Serial(port) => port.flush(),
        }
    }
}

impl ByteLink for LinkStream {
    fn discard_input(&mut self) -> io::Result<()> {
        match &mut self.inner {
            LinkStreamInner::Tcp(_) => Ok(()),
            LinkStreamInner::Serial(port) => port.clear(ClearBuffer::Input).map_err(Into::into),
        }
    }

    fn discards_before_query(&self) -> bool {
        self.is_serial()
    }
}

impl std::fmt::Debug for LinkStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.inner {
            LinkStreamInner::Tcp(stream) => f
                .debug_struct("LinkStream")
                .field("type", &"tcp")
                .field("peer", &stream.peer_addr().ok())
                .finish(),
            LinkStreamInner::Serial(port) => f
                .debug_struct("LinkStream")
                .field("type", &"serial")
                .field("port", &port.name())
                .finish(),
        }
    }
}
