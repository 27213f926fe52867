//! The UDP side of the tracker: a socket and the thread that drains it.

use crate::config::{ConfigError, TrackerConfig};
use crate::position::{LatestPosition, Position};
use crate::tracking_message_decoder::parse_frame;

use log::{debug, error, info, warn};
use std::{
    fmt,
    io::{self, ErrorKind},
    net::{SocketAddr, UdpSocket},
    str::{self, Utf8Error},
    sync::{
        atomic::{AtomicU64, Ordering},
        mpsc::{self, TryRecvError},
        Arc,
    },
    thread,
    time::Duration,
};

/// Largest payload a UDP datagram can carry.
const MAX_DATAGRAM: usize = 65_507;

#[derive(Debug)]
enum Signal {
    Stop,
}

/// Why a receiver could not be started.
#[derive(Debug)]
pub enum ReceiverError {
    /// The configuration is unusable.
    Config(ConfigError),
    /// The socket could not be bound.
    Bind {
        /// The address we tried to bind
        addr: SocketAddr,
        /// What the OS said
        source: io::Error,
    },
    /// The socket was bound but could not be set up.
    Socket(io::Error),
    /// The receive thread could not be spawned.
    Spawn(io::Error),
}

impl fmt::Display for ReceiverError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(error) => write!(f, "invalid configuration: {}", error),
            Self::Bind { addr, source } => write!(f, "could not bind {}: {}", addr, source),
            Self::Socket(error) => write!(f, "socket setup failed: {}", error),
            Self::Spawn(error) => write!(f, "could not spawn receive thread: {}", error),
        }
    }
}

impl std::error::Error for ReceiverError {}

impl From<ConfigError> for ReceiverError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

#[derive(Debug, Default)]
struct Counters {
    datagrams: AtomicU64,
    rejected: AtomicU64,
    updates: AtomicU64,
}

/// A snapshot of what a receiver has seen so far.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ReceiverCounters {
    /// Datagrams fully handled, whatever they contained
    pub datagrams: u64,
    /// Datagrams thrown away because they were not UTF-8
    pub rejected: u64,
    /// Datagrams that moved the tracked position
    pub updates: u64,
}

/// Decodes one datagram and returns the position it reports for `wire_id`,
/// if any.
pub fn position_from_datagram(bytes: &[u8], wire_id: u32) -> Result<Option<Position>, Utf8Error> {
    let text = str::from_utf8(bytes)?;
    let frame = parse_frame(text);
    Ok(frame
        .latest_for(wire_id)
        .map(|body| Position::from_tracker_mm(body.translation)))
}

/// Listens for tracking datagrams on a background thread and publishes the
/// configured body's position into a [`LatestPosition`].
///
/// The thread runs until [`UdpReceiver::stop`] is called or the receiver is
/// dropped.
#[derive(Debug)]
pub struct UdpReceiver {
    handle: Option<thread::JoinHandle<()>>,
    tx: mpsc::Sender<Signal>,
    local_addr: SocketAddr,
    counters: Arc<Counters>,
}

impl UdpReceiver {
    /// Binds the configured port and starts receiving into `position`.
    pub fn start(config: &TrackerConfig, position: LatestPosition) -> Result<Self, ReceiverError> {
        let config = config.clone().validate()?;
        let addr = config.socket_addr();

        let socket = UdpSocket::bind(addr).map_err(|source| ReceiverError::Bind { addr, source })?;
        // A blocked receive has to come back now and then to notice `stop`.
        socket
            .set_read_timeout(Some(config.poll_interval()))
            .map_err(ReceiverError::Socket)?;
        let local_addr = socket.local_addr().map_err(ReceiverError::Socket)?;

        let (tx, rx) = mpsc::channel::<Signal>();
        let counters = Arc::new(Counters::default());
        let th_counters = Arc::clone(&counters);
        let wire_id = config.wire_id();
        let poll_interval = config.poll_interval();

        let handle = thread::Builder::new()
            .name("arttrack-rx".to_owned())
            .spawn(move || receive_loop(socket, wire_id, poll_interval, position, th_counters, rx))
            .map_err(ReceiverError::Spawn)?;

        info!("Tracking body {} on {}", config.body_id, local_addr);

        Ok(UdpReceiver {
            handle: Some(handle),
            tx,
            local_addr,
            counters,
        })
    }

    /// Stops the receive thread and closes the socket. Returns once the port
    /// is free again. Calling it more than once is fine.
    pub fn stop(&mut self) {
        let Some(handle) = self.handle.take() else {
            return;
        };

        // Fails only if the thread is already gone, which is what we want.
        let _ = self.tx.send(Signal::Stop);
        if handle.join().is_err() {
            error!("Receive thread on {} panicked", self.local_addr);
        }
        info!("Stopped listening on {}", self.local_addr);
    }

    /// Whether the receive thread is still supposed to be running.
    pub fn is_running(&self) -> bool {
        self.handle.is_some()
    }

    /// The address the socket is actually bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    #[allow(missing_docs)]
    pub fn counters(&self) -> ReceiverCounters {
        ReceiverCounters {
            datagrams: self.counters.datagrams.load(Ordering::SeqCst),
            rejected: self.counters.rejected.load(Ordering::SeqCst),
            updates: self.counters.updates.load(Ordering::SeqCst),
        }
    }
}

impl Drop for UdpReceiver {
    fn drop(&mut self) {
        self.stop();
    }
}

/// How long to wait before the next receive after `error`. Timeouts are
/// the normal idle case and need no wait.
fn backoff(error: &io::Error, poll_interval: Duration) -> Option<Duration> {
    match error.kind() {
        ErrorKind::WouldBlock | ErrorKind::TimedOut | ErrorKind::Interrupted => None,
        _ => Some(poll_interval),
    }
}

fn receive_loop(
    socket: UdpSocket,
    wire_id: u32,
    poll_interval: Duration,
    position: LatestPosition,
    counters: Arc<Counters>,
    rx: mpsc::Receiver<Signal>,
) {
    let mut buffer = vec![0u8; MAX_DATAGRAM];

    loop {
        match socket.recv_from(&mut buffer) {
            // Anyone may send to us, the sender is only logged.
            // `datagrams` goes last, so a reader that sees it also sees
            // the rest of what the datagram did.
            Ok((len, sender)) => {
                match position_from_datagram(&buffer[..len], wire_id) {
                    Ok(Some(p)) => {
                        debug!("Received {} from {}", p, sender);
                        position.publish(p);
                        counters.updates.fetch_add(1, Ordering::SeqCst);
                    }
                    Ok(None) => {
                        debug!("No body {} in {} bytes from {}", wire_id, len, sender);
                    }
                    Err(e) => {
                        warn!("Failed to decode utf-8 from {}: {:?}", sender, e);
                        counters.rejected.fetch_add(1, Ordering::SeqCst);
                    }
                }
                counters.datagrams.fetch_add(1, Ordering::SeqCst);
            }
            Err(e) => {
                if let Some(wait) = backoff(&e, poll_interval) {
                    warn!("Receive failed: {}", e);
                    thread::sleep(wait);
                }
            }
        }

        match rx.try_recv() {
            Ok(Signal::Stop) | Err(TryRecvError::Disconnected) => break,
            Err(TryRecvError::Empty) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{
        net::{IpAddr, Ipv4Addr},
        thread::sleep,
        time::{Duration, Instant},
    };

    const MATRIX: &str = "[0.000 0.000 0.000 0.000 0.000 0.000 0.000 0.000 0.000]";

    fn loopback_config(body_id: u32) -> TrackerConfig {
        TrackerConfig {
            body_id,
            port: 0,
            bind_address: IpAddr::V4(Ipv4Addr::LOCALHOST),
            poll_interval_ms: 10,
        }
    }

    fn body(id: u32, t: [f64; 3]) -> String {
        format!(
            "[{id} 0.900][{:.3} {:.3} {:.3} 0.100 0.100 0.100]{MATRIX}",
            t[0], t[1], t[2]
        )
    }

    fn send(to: SocketAddr, payload: &[u8]) {
        let socket = UdpSocket::bind("127.0.0.1:0").unwrap();
        socket.send_to(payload, to).unwrap();
    }

    fn wait_until(mut cond: impl FnMut() -> bool) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while !cond() {
            assert!(Instant::now() < deadline, "timed out");
            sleep(Duration::from_millis(1));
        }
    }

    #[test]
    fn decode_picks_configured_body() {
        let s = format!("6d 2 {}{}", body(0, [1.0, 2.0, 3.0]), body(1, [4.0, 5.0, 6.0]));

        assert_eq!(
            position_from_datagram(s.as_bytes(), 1),
            Ok(Some(Position::from_tracker_mm([4.0, 5.0, 6.0])))
        );
        assert_eq!(
            position_from_datagram(s.as_bytes(), 0),
            Ok(Some(Position::from_tracker_mm([1.0, 2.0, 3.0])))
        );
        assert_eq!(position_from_datagram(s.as_bytes(), 7), Ok(None));
    }

    #[test]
    fn decode_rejects_bad_utf8() {
        assert!(position_from_datagram(&[b'6', b'd', b' ', 0xff, 0xfe], 0).is_err());
    }

    #[test]
    fn only_the_configured_body_moves_the_position() {
        let position = LatestPosition::new();
        let mut receiver = UdpReceiver::start(&loopback_config(2), position.clone()).unwrap();

        let s = format!("6d 2 {}{}", body(0, [1.0, 2.0, 3.0]), body(1, [4.0, 5.0, 6.0]));
        send(receiver.local_addr(), s.as_bytes());
        wait_until(|| receiver.counters().datagrams == 1);

        assert_eq!(position.get(), Position::from_tracker_mm([4.0, 5.0, 6.0]));

        let s = format!("6d 1 {}", body(0, [9.0, 9.0, 9.0]));
        send(receiver.local_addr(), s.as_bytes());
        wait_until(|| receiver.counters().datagrams == 2);

        assert_eq!(position.get(), Position::from_tracker_mm([4.0, 5.0, 6.0]));
        assert_eq!(receiver.counters().updates, 1);
        receiver.stop();
    }

    #[test]
    fn latest_datagram_wins() {
        let position = LatestPosition::new();
        let receiver = UdpReceiver::start(&loopback_config(1), position.clone()).unwrap();

        let first = format!("6d 1 {}", body(0, [100.0, -200.0, 300.0]));
        let second = format!("6d 1 {}", body(0, [-400.0, 500.0, -600.0]));
        send(receiver.local_addr(), first.as_bytes());
        send(receiver.local_addr(), second.as_bytes());
        wait_until(|| receiver.counters().datagrams == 2);

        assert_eq!(
            position.get(),
            Position::from_tracker_mm([-400.0, 500.0, -600.0])
        );
    }

    #[test]
    fn survives_garbage() {
        let position = LatestPosition::new();
        let receiver = UdpReceiver::start(&loopback_config(1), position.clone()).unwrap();
        let addr = receiver.local_addr();

        send(addr, &[0xff, 0xfe, b'6', b'd', b' ', b'1']);
        wait_until(|| receiver.counters().datagrams == 1);
        assert_eq!(receiver.counters().rejected, 1);
        assert_eq!(position.get(), Position::ZERO);

        let s = format!("6d 0 {}", body(0, [1.0, 2.0, 3.0]));
        send(addr, s.as_bytes());
        wait_until(|| receiver.counters().datagrams == 2);
        assert_eq!(position.get(), Position::ZERO);
        assert_eq!(position.last_update(), None);

        send(addr, b"");
        send(addr, b"6d 1 [0 1.000][1.0 2.0]\n\n\n[[[[");
        let s = format!("fr 1\n6d 1 {}\n", body(0, [1.0, 2.0, 3.0]));
        send(addr, s.as_bytes());
        wait_until(|| receiver.counters().datagrams == 5);

        assert_eq!(position.get(), Position::from_tracker_mm([1.0, 2.0, 3.0]));
        assert_eq!(
            receiver.counters(),
            ReceiverCounters {
                datagrams: 5,
                rejected: 1,
                updates: 1,
            }
        );
    }

    #[test]
    fn counters_are_settled_once_datagrams_moves() {
        let position = LatestPosition::new();
        let receiver = UdpReceiver::start(&loopback_config(1), position.clone()).unwrap();
        let s = format!("6d 1 {}", body(0, [1.0, 2.0, 3.0]));

        for n in 1..=20 {
            send(receiver.local_addr(), s.as_bytes());
            wait_until(|| receiver.counters().datagrams == n);
            assert_eq!(receiver.counters().updates, n);
            assert!(position.last_update().is_some());
        }
    }

    #[test]
    fn hard_errors_back_off() {
        let poll = Duration::from_millis(10);

        assert_eq!(backoff(&io::Error::from(ErrorKind::WouldBlock), poll), None);
        assert_eq!(backoff(&io::Error::from(ErrorKind::TimedOut), poll), None);
        assert_eq!(
            backoff(&io::Error::from(ErrorKind::ConnectionReset), poll),
            Some(poll)
        );
        assert_eq!(
            backoff(&io::Error::new(ErrorKind::Other, "socket gone"), poll),
            Some(poll)
        );
    }

    #[test]
    fn nothing_changes_after_stop() {
        let position = LatestPosition::new();
        let mut receiver = UdpReceiver::start(&loopback_config(1), position.clone()).unwrap();
        let addr = receiver.local_addr();

        let s = format!("6d 1 {}", body(0, [1.0, 2.0, 3.0]));
        send(addr, s.as_bytes());
        wait_until(|| receiver.counters().updates == 1);

        receiver.stop();
        assert!(!receiver.is_running());

        let s = format!("6d 1 {}", body(0, [7.0, 8.0, 9.0]));
        send(addr, s.as_bytes());
        sleep(Duration::from_millis(50));
        assert_eq!(position.get(), Position::from_tracker_mm([1.0, 2.0, 3.0]));

        // The port is free again
        UdpSocket::bind(addr).unwrap();

        receiver.stop();
    }

    #[test]
    fn bind_failure_is_reported() {
        let taken = UdpSocket::bind("127.0.0.1:0").unwrap();
        let config = TrackerConfig {
            port: taken.local_addr().unwrap().port(),
            ..loopback_config(1)
        };

        assert!(matches!(
            UdpReceiver::start(&config, LatestPosition::new()),
            Err(ReceiverError::Bind { .. })
        ));
    }

    #[test]
    fn body_zero_is_refused() {
        assert!(matches!(
            UdpReceiver::start(&loopback_config(0), LatestPosition::new()),
            Err(ReceiverError::Config(ConfigError::InvalidBodyId))
        ));
    }
}
