use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use bytes::Bytes;
use plxgpib_frame::{ascii_values, decode_reply, ValueFormat};
use plxgpib_transport::{check_timeout, ByteLink, Controller, LinkStream};
use tracing::{debug, warn};

use crate::config::{SessionConfig, RQS_BIT};
use crate::error::{Result, SessionError};

/// One instrument on a shared controller.
///
/// Every operation locks the controller for its whole duration, re-latches
/// the adapter's address and read-after-write setting when they differ from
/// this session's, then performs the I/O. Nothing is retried.
pub struct Session<L = LinkStream> {
    controller: Arc<Mutex<Controller<L>>>,
    config: SessionConfig,
}

impl<L: ByteLink> Session<L> {
    /// Bind a session to `controller`.
    ///
    /// The configuration is validated here; nothing is sent until the first
    /// operation.
    pub fn new(controller: Arc<Mutex<Controller<L>>>, config: SessionConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { controller, config })
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// GPIB address of this instrument.
    pub fn address(&self) -> u8 {
        self.config.address
    }

    /// Change the default value format.
    pub fn set_format(&mut self, format: ValueFormat) {
        self.config.format = format;
    }

    /// Change the pause after each write.
    pub fn set_delay(&mut self, delay: Duration) {
        self.config.delay = delay;
    }

    /// Change read-after-write. Takes effect on the next operation.
    pub fn set_auto(&mut self, auto: bool) {
        self.config.auto = auto;
    }

    /// The shared controller.
    pub fn controller(&self) -> &Arc<Mutex<Controller<L>>> {
        &self.controller
    }

    /// Send a command to the instrument.
    pub fn write(&self, command: &str) -> Result<()> {
        self.with_controller(|controller| {
            controller.write_with_delay(command, self.config.delay)?;
            Ok(())
        })
    }

    /// Read one text reply with trailing CR / LF removed.
    pub fn read(&self) -> Result<String> {
        self.with_controller(|controller| self.read_text(controller))
    }

    /// Read one reply untouched.
    pub fn read_raw(&self) -> Result<Bytes> {
        self.with_controller(|controller| self.read_bytes(controller))
    }

    /// Read one reply and decode it with the session's format.
    pub fn read_values(&self) -> Result<Vec<f64>> {
        self.read_values_as(self.config.format)
    }

    /// Read one reply and decode it with `format`.
    pub fn read_values_as(&self, format: ValueFormat) -> Result<Vec<f64>> {
        let raw = self.read_raw()?;
        Ok(decode_reply(&raw, &format, &self.config.header)?)
    }

    /// Write `command`, then read the text reply.
    pub fn ask(&self, command: &str) -> Result<String> {
        self.with_controller(|controller| {
            self.write_query(controller, command)?;
            self.read_text(controller)
        })
    }

    /// Write `command`, then decode the reply with the session's format.
    pub fn ask_for_values(&self, command: &str) -> Result<Vec<f64>> {
        self.ask_for_values_as(command, self.config.format)
    }

    /// Write `command`, then decode the reply with `format`.
    pub fn ask_for_values_as(&self, command: &str, format: ValueFormat) -> Result<Vec<f64>> {
        let raw = self.with_controller(|controller| {
            self.write_query(controller, command)?;
            self.read_bytes(controller)
        })?;
        let values = decode_reply(&raw, &format, &self.config.header)?;
        debug!(
            addr = self.config.address,
            command,
            values = values.len(),
            "decoded values"
        );
        Ok(values)
    }

    /// Read the instrument's status byte with the configured status query.
    pub fn status_byte(&self) -> Result<u8> {
        let reply = self.ask(&self.config.status_query)?;
        let first = ascii_values(&reply).next();
        match first {
            Some(v) if v.fract() == 0.0 && (0.0..=255.0).contains(&v) => Ok(v as u8),
            _ => Err(SessionError::InvalidStatus(reply)),
        }
    }

    /// Poll the status byte until the instrument requests service.
    ///
    /// Returns `Ok(true)` once the RQS bit is seen and `Ok(false)` when
    /// `timeout` expires first. The status byte is read at least once.
    pub fn wait_for_srq(&self, timeout: Duration) -> Result<bool> {
        check_timeout(timeout, true)?;
        let started = Instant::now();
        loop {
            let status = self.status_byte()?;
            if status & RQS_BIT != 0 {
                debug!(addr = self.config.address, status, "service request");
                return Ok(true);
            }
            if started.elapsed() >= timeout {
                warn!(
                    addr = self.config.address,
                    ?timeout,
                    "no service request before timeout"
                );
                return Ok(false);
            }
        }
    }

    fn with_controller<T>(&self, op: impl FnOnce(&mut Controller<L>) -> Result<T>) -> Result<T> {
        let mut controller = self
            .controller
            .lock()
            .map_err(|_| SessionError::ControllerPoisoned)?;
        self.arbitrate(&mut controller)?;
        op(&mut controller)
    }

    fn arbitrate(&self, controller: &mut Controller<L>) -> Result<()> {
        if controller.auto_mode() != Some(self.config.auto) {
            controller.set_auto(self.config.auto)?;
        }
        if controller.address() != Some(self.config.address) {
            controller.set_address(self.config.address)?;
        }
        Ok(())
    }

    fn write_query(&self, controller: &mut Controller<L>, command: &str) -> Result<()> {
        controller.discard_stale_input()?;
        controller.write_with_delay(command, self.config.delay)?;
        if !self.config.ask_delay.is_zero() {
            std::thread::sleep(self.config.ask_delay);
        }
        Ok(())
    }

    fn talk(&self, controller: &mut Controller<L>) -> Result<()> {
        if !self.config.auto {
            controller.read_eoi(self.config.delay)?;
        }
        Ok(())
    }

    fn read_bytes(&self, controller: &mut Controller<L>) -> Result<Bytes> {
        self.talk(controller)?;
        Ok(controller.read_raw(self.config.chunk_size)?)
    }

    fn read_text(&self, controller: &mut Controller<L>) -> Result<String> {
        self.talk(controller)?;
        let reply = controller.read_all(self.config.chunk_size)?;
        Ok(String::from_utf8_lossy(&reply).into_owned())
    }
}

impl<L> Clone for Session<L> {
    fn clone(&self) -> Self {
        Self {
            controller: Arc::clone(&self.controller),
            config: self.config.clone(),
        }
    }
}

impl<L> std::fmt::Debug for Session<L> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::io::{self, ErrorKind, Read, Write};

    use bytes::BytesMut;
    use plxgpib_frame::{encode_block, FrameError, DEFAULT_HEADER};
    use plxgpib_transport::{ConfigError, LinkConfig, Terminator, TransportError};

    use super::*;

    #[derive(Default)]
    struct FakeAdapter {
        written: Vec<u8>,
        replies: VecDeque<Vec<u8>>,
    }

    impl FakeAdapter {
        fn lines(&self) -> Vec<String> {
            String::from_utf8_lossy(&self.written)
                .split_terminator('\n')
                .map(str::to_string)
                .collect()
        }
    }

    impl Read for FakeAdapter {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            let Some(reply) = self.replies.pop_front() else {
                return Err(io::Error::from(ErrorKind::TimedOut));
            };
            let n = reply.len().min(buf.len());
            buf[..n].copy_from_slice(&reply[..n]);
            Ok(n)
        }
    }

    impl Write for FakeAdapter {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.written.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl ByteLink for FakeAdapter {}

    fn shared(replies: Vec<Vec<u8>>) -> Arc<Mutex<Controller<FakeAdapter>>> {
        let link = FakeAdapter {
            written: Vec::new(),
            replies: replies.into(),
        };
        let config = LinkConfig {
            write_delay: Duration::ZERO,
            ..LinkConfig::default()
        };
        Arc::new(Mutex::new(
            Controller::with_link(link, Terminator::LF, &config).unwrap(),
        ))
    }

    fn session_config(address: u8) -> SessionConfig {
        SessionConfig {
            delay: Duration::ZERO,
            ..SessionConfig::new(address)
        }
    }

    fn lines(controller: &Arc<Mutex<Controller<FakeAdapter>>>) -> Vec<String> {
        controller.lock().unwrap().get_ref().lines()
    }

    fn trace_block(values: &[f64], format: ValueFormat) -> Vec<u8> {
        let mut buf = BytesMut::new();
        encode_block(values, &format, DEFAULT_HEADER, &mut buf).unwrap();
        buf.extend_from_slice(b"\r\n");
        buf.to_vec()
    }

    #[test]
    fn first_operation_latches_address_and_auto() {
        let plx = shared(vec![]);
        let inst = Session::new(Arc::clone(&plx), session_config(17)).unwrap();

        inst.write("RST").unwrap();
        assert_eq!(lines(&plx), vec!["++auto 1", "++addr 17", "RST"]);
    }

    #[test]
    fn repeated_operations_do_not_re_address() {
        let plx = shared(vec![]);
        let inst = Session::new(Arc::clone(&plx), session_config(17)).unwrap();

        inst.write("FNC3").unwrap();
        inst.write("SWM2").unwrap();

        let sent = lines(&plx);
        assert_eq!(sent.iter().filter(|l| l.starts_with("++addr")).count(), 1);
        assert_eq!(sent.iter().filter(|l| l.starts_with("++auto")).count(), 1);
        assert_eq!(sent.len(), 4);
    }

    #[test]
    fn sessions_sharing_a_controller_re_latch_on_switch() {
        let plx = shared(vec![]);
        let analyzer = Session::new(Arc::clone(&plx), session_config(17)).unwrap();
        let source = Session::new(
            Arc::clone(&plx),
            SessionConfig {
                auto: false,
                ..session_config(5)
            },
        )
        .unwrap();

        analyzer.write("SWTRG").unwrap();
        source.write("OUTP ON").unwrap();
        analyzer.write("SWTRG").unwrap();

        assert_eq!(
            lines(&plx),
            vec![
                "++auto 1",
                "++addr 17",
                "SWTRG",
                "++auto 0",
                "++addr 5",
                "OUTP ON",
                "++auto 1",
                "++addr 17",
                "SWTRG",
            ]
        );
    }

    #[test]
    fn manual_talk_sends_read_eoi() {
        let plx = shared(vec![b"HP4195A\r\n".to_vec()]);
        let inst = Session::new(
            Arc::clone(&plx),
            SessionConfig {
                auto: false,
                ..session_config(17)
            },
        )
        .unwrap();

        assert_eq!(inst.ask("ID?").unwrap(), "HP4195A");
        assert_eq!(
            lines(&plx),
            vec!["++auto 0", "++addr 17", "ID?", "++read eoi"]
        );
    }

    #[test]
    fn auto_mode_skips_read_eoi() {
        let plx = shared(vec![b"1.0E+03\r\n".to_vec()]);
        let inst = Session::new(Arc::clone(&plx), session_config(17)).unwrap();

        assert_eq!(inst.ask("FMT1;START?").unwrap(), "1.0E+03");
        assert!(!lines(&plx).iter().any(|l| l == "++read eoi"));
    }

    #[test]
    fn binary_trace_register() {
        let format = ValueFormat::single().big_endian();
        let expected = vec![-3.5, -12.25, -40.0];
        let plx = shared(vec![trace_block(&expected, format)]);
        let inst = Session::new(
            Arc::clone(&plx),
            SessionConfig {
                format,
                auto: false,
                ..session_config(17)
            },
        )
        .unwrap();

        assert_eq!(inst.ask_for_values("FMT3;A?").unwrap(), expected);
    }

    #[test]
    fn binary_reply_with_leading_noise() {
        let format = ValueFormat::double();
        let mut reply = b"\x00\x13junk".to_vec();
        reply.extend(trace_block(&[1.0e6, 2.0e6], format));
        let plx = shared(vec![reply]);
        let inst = Session::new(plx, session_config(17)).unwrap();

        assert_eq!(
            inst.ask_for_values_as("FMT3;B?", format).unwrap(),
            vec![1.0e6, 2.0e6]
        );
    }

    #[test]
    fn ascii_reply_values() {
        let plx = shared(vec![b"START=1.0E+03 HZ\r\n".to_vec()]);
        let inst = Session::new(plx, session_config(17)).unwrap();
        assert_eq!(inst.ask_for_values("FMT1;START?").unwrap(), vec![1000.0]);
    }

    #[test]
    fn read_values_after_separate_write() {
        let plx = shared(vec![b"1,2,3\n".to_vec()]);
        let inst = Session::new(Arc::clone(&plx), session_config(9)).unwrap();
        inst.write("MEAS?").unwrap();
        assert_eq!(inst.read_values().unwrap(), vec![1.0, 2.0, 3.0]);
        assert_eq!(lines(&plx), vec!["++auto 1", "++addr 9", "MEAS?"]);
    }

    #[test]
    fn truncated_block_is_a_frame_error() {
        let mut reply = DEFAULT_HEADER.to_vec();
        reply.extend_from_slice(&[0x00, 0x10, 0x01, 0x02]);
        let plx = shared(vec![reply]);
        let inst = Session::new(
            plx,
            SessionConfig {
                format: ValueFormat::single(),
                ..session_config(17)
            },
        )
        .unwrap();

        let err = inst.ask_for_values("FMT3;A?").unwrap_err();
        assert!(matches!(
            err,
            SessionError::Frame(FrameError::Truncated { .. })
        ));
    }

    #[test]
    fn transport_errors_are_not_retried() {
        let plx = shared(vec![]);
        let inst = Session::new(Arc::clone(&plx), session_config(17)).unwrap();

        let err = inst.ask("ID?").unwrap_err();
        assert!(matches!(
            err,
            SessionError::Transport(TransportError::Io(ref e)) if e.kind() == ErrorKind::TimedOut
        ));
        assert_eq!(lines(&plx).iter().filter(|l| *l == "ID?").count(), 1);
    }

    #[test]
    fn invalid_config_fails_before_io() {
        let plx = shared(vec![]);
        let err = Session::new(Arc::clone(&plx), session_config(31)).unwrap_err();
        assert!(matches!(
            err,
            SessionError::Config(ConfigError::InvalidAddress(31))
        ));
        assert!(lines(&plx).is_empty());
    }

    #[test]
    fn status_byte_parses_reply() {
        let plx = shared(vec![b"  65\r\n".to_vec(), b"ERR\r\n".to_vec()]);
        let inst = Session::new(Arc::clone(&plx), session_config(17)).unwrap();

        assert_eq!(inst.status_byte().unwrap(), 65);
        assert!(matches!(
            inst.status_byte(),
            Err(SessionError::InvalidStatus(_))
        ));
    }

    #[test]
    fn wait_for_srq_returns_when_rqs_set() {
        let plx = shared(vec![b"0\r\n".to_vec(), b"0\r\n".to_vec(), b"64\r\n".to_vec()]);
        let inst = Session::new(Arc::clone(&plx), session_config(17)).unwrap();

        assert!(inst.wait_for_srq(Duration::from_secs(5)).unwrap());
        assert_eq!(lines(&plx).iter().filter(|l| *l == "STB?").count(), 3);
    }

    #[test]
    fn wait_for_srq_gives_up_after_timeout() {
        let plx = shared(vec![b"0\r\n".to_vec()]);
        let inst = Session::new(Arc::clone(&plx), session_config(17)).unwrap();

        assert!(!inst.wait_for_srq(Duration::ZERO).unwrap());
        assert_eq!(lines(&plx).iter().filter(|l| *l == "STB?").count(), 1);
    }

    #[test]
    fn wait_for_srq_validates_timeout_first() {
        let plx = shared(vec![]);
        let inst = Session::new(Arc::clone(&plx), session_config(17)).unwrap();

        let err = inst
            .wait_for_srq(Duration::from_secs(4_294_968))
            .unwrap_err();
        assert!(matches!(
            err,
            SessionError::Config(ConfigError::InvalidTimeout(_))
        ));
        assert!(lines(&plx).is_empty());
    }

    #[test]
    fn poisoned_controller_is_reported() {
        let plx = shared(vec![]);
        let inst = Session::new(Arc::clone(&plx), session_config(17)).unwrap();

        let poisoner = Arc::clone(&plx);
        let _ = std::thread::spawn(move || {
            let _guard = poisoner.lock().unwrap();
            panic!("poison the controller");
        })
        .join();

        assert!(matches!(
            inst.write("RST"),
            Err(SessionError::ControllerPoisoned)
        ));
    }

    #[test]
    fn clones_share_the_controller() {
        let plx = shared(vec![]);
        let inst = Session::new(Arc::clone(&plx), session_config(17)).unwrap();
        let copy = inst.clone();
        assert!(Arc::ptr_eq(inst.controller(), copy.controller()));
        assert_eq!(copy.address(), 17);
    }

    #[test]
    fn set_auto_is_latched_on_next_operation() {
        let plx = shared(vec![b"HP4195A\r\n".to_vec()]);
        let mut inst = Session::new(Arc::clone(&plx), session_config(17)).unwrap();

        inst.write("RST").unwrap();
        inst.set_auto(false);
        inst.write("SWTRG").unwrap();
        assert_eq!(inst.ask("ID?").unwrap(), "HP4195A");

        assert_eq!(
            lines(&plx),
            vec![
                "++auto 1",
                "++addr 17",
                "RST",
                "++auto 0",
                "SWTRG",
                "ID?",
                "++read eoi",
            ]
        );
    }

    #[test]
    fn set_format_switches_decoding() {
        let format = ValueFormat::single().big_endian();
        let plx = shared(vec![
            b"START=1.0E+03 HZ\r\n".to_vec(),
            trace_block(&[-3.5, 2.0], format),
        ]);
        let mut inst = Session::new(plx, session_config(17)).unwrap();

        assert_eq!(inst.ask_for_values("FMT1;START?").unwrap(), vec![1000.0]);
        inst.set_format(format);
        assert_eq!(inst.ask_for_values("FMT3;A?").unwrap(), vec![-3.5, 2.0]);
    }

    #[test]
    fn set_delay_paces_writes() {
        let plx = shared(vec![]);
        let mut inst = Session::new(plx, session_config(17)).unwrap();
        inst.set_delay(Duration::from_millis(30));
        assert_eq!(inst.config().delay, Duration::from_millis(30));

        let started = Instant::now();
        inst.write("RST").unwrap();
        // ++auto / ++addr use the link's zero delay.
        assert!(started.elapsed() >= Duration::from_millis(30));
    }
}
