use std::fmt;
use std::str::FromStr;

use crate::error::ConfigError;

/// TCP port the Prologix GPIB-Ethernet adapter listens on.
pub const DEFAULT_TCP_PORT: u16 = 1234;

/// Physical location of an adapter.
///
/// The `Display` form is the endpoint identity used by the registry:
/// `host:port` for TCP adapters and the device path for serial adapters.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Endpoint {
    Tcp { host: String, port: u16 },
    Serial { path: String },
}

impl Endpoint {
    /// A GPIB-Ethernet adapter on the default port.
    pub fn tcp(host: impl Into<String>) -> Self {
        Self::Tcp {
            host: host.into(),
            port: DEFAULT_TCP_PORT,
        }
    }

    /// A GPIB-USB adapter on a virtual serial port (`/dev/ttyUSB0`, `COM3`).
    pub fn serial(path: impl Into<String>) -> Self {
        Self::Serial { path: path.into() }
    }

    pub fn is_serial(&self) -> bool {
        matches!(self, Endpoint::Serial { .. })
    }

    /// Registry key for this endpoint.
    pub fn identity(&self) -> String {
        self.to_string()
    }

    /// Transport name for diagnostics.
    pub fn transport_name(&self) -> &'static str {
        match self {
            Endpoint::Tcp { .. } => "prologix-ethernet",
            Endpoint::Serial { .. } => "prologix-usb",
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Endpoint::Tcp { host, port } if host.contains(':') => write!(f, "[{host}]:{port}"),
            Endpoint::Tcp { host, port } => write!(f, "{host}:{port}"),
            Endpoint::Serial { path } => f.write_str(path),
        }
    }
}

impl FromStr for Endpoint {
    type Err = ConfigError;

    /// Accepts `tcp://host[:port]`, `serial://path`, bare device paths
    /// (`/dev/...`, `COMn`) and bare `host[:port]`.
    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let input = input.trim();
        if input.is_empty() {
            return Err(ConfigError::InvalidEndpoint("endpoint must not be empty".into()));
        }

        if let Some(path) = input.strip_prefix("serial://") {
            if path.is_empty() {
                return Err(ConfigError::InvalidEndpoint(input.to_string()));
            }
            return Ok(Self::serial(path));
        }
        if let Some(rest) = input.strip_prefix("tcp://") {
            return parse_host_port(rest).ok_or_else(|| ConfigError::InvalidEndpoint(input.into()));
        }
        if looks_like_device_path(input) {
            return Ok(Self::serial(input));
        }
        parse_host_port(input).ok_or_else(|| ConfigError::InvalidEndpoint(input.into()))
    }
}

fn looks_like_device_path(input: &str) -> bool {
    if input.starts_with('/') {
        return true;
    }
    let upper = input.to_ascii_uppercase();
    upper
        .strip_prefix("COM")
        .is_some_and(|n| !n.is_empty() && n.chars().all(|c| c.is_ascii_digit()))
}

fn parse_host_port(input: &str) -> Option<Endpoint> {
    let (host, port) = if let Some(rest) = input.strip_prefix('[') {
        let (host, tail) = rest.split_once(']')?;
        match tail {
            "" => (host, None),
            _ => (host, Some(tail.strip_prefix(':')?)),
        }
    } else {
        match input.split_once(':') {
            Some((host, port)) => (host, Some(port)),
            None => (input, None),
        }
    };

    if host.is_empty() || host.contains('/') {
        return None;
    }
    let port = match port {
        Some(port) => port.parse().ok()?,
        None => DEFAULT_TCP_PORT,
    };
    Some(Endpoint::Tcp {
        host: host.to_string(),
        port,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_host_uses_default_port() {
        let ep: Endpoint = "137.138.62.172".parse().unwrap();
        assert_eq!(ep, Endpoint::tcp("137.138.62.172"));
        assert_eq!(ep.identity(), "137.138.62.172:1234");
    }

    #[test]
    fn host_with_port_and_scheme() {
        let ep: Endpoint = "tcp://gpib-lab:4000".parse().unwrap();
        assert_eq!(
            ep,
            Endpoint::Tcp {
                host: "gpib-lab".into(),
                port: 4000
            }
        );
    }

    #[test]
    fn ipv6_host() {
        let ep: Endpoint = "[::1]:1234".parse().unwrap();
        assert_eq!(ep.identity(), "[::1]:1234");
        assert_eq!(ep.to_string().parse::<Endpoint>().unwrap(), ep);
    }

    #[test]
    fn device_paths_are_serial() {
        assert_eq!(
            "/dev/ttyUSBgpib".parse::<Endpoint>().unwrap(),
            Endpoint::serial("/dev/ttyUSBgpib")
        );
        assert!("COM3".parse::<Endpoint>().unwrap().is_serial());
        assert!("serial://ttyACM0".parse::<Endpoint>().unwrap().is_serial());
        assert!(!"commander:1234".parse::<Endpoint>().unwrap().is_serial());
    }

    #[test]
    fn rejects_malformed_endpoints() {
        assert!("".parse::<Endpoint>().is_err());
        assert!("host:notaport".parse::<Endpoint>().is_err());
        assert!("host:99999".parse::<Endpoint>().is_err());
        assert!("serial://".parse::<Endpoint>().is_err());
        assert!(":1234".parse::<Endpoint>().is_err());
    }
}
