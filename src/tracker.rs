//! The component a render loop holds on to.
//!
//! A [`BodyTracker`] owns one [`LatestPosition`] for its whole life and
//! starts a [`UdpReceiver`] filling it while active. The render loop calls
//! [`BodyTracker::tick`] once per frame to get a copy of the position.

use crate::config::TrackerConfig;
use crate::position::{LatestPosition, Position, PositionSource};
use crate::receiver::{ReceiverCounters, ReceiverError, UdpReceiver};

use std::{net::SocketAddr, time::Instant};

/// Whether a receiver is currently feeding the tracker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackerState {
    #[allow(missing_docs)]
    Inactive,
    #[allow(missing_docs)]
    Active,
}

/// Follows one body of the rig and hands its position to whoever ticks it.
#[derive(Debug)]
pub struct BodyTracker {
    config: TrackerConfig,
    position: LatestPosition,
    receiver: Option<UdpReceiver>,
}

impl BodyTracker {
    /// An inactive tracker for the configured body. Nothing is bound yet.
    pub fn new(config: TrackerConfig) -> Self {
        Self {
            config,
            position: LatestPosition::new(),
            receiver: None,
        }
    }

    /// Binds the socket and starts receiving. Does nothing if already active.
    pub fn activate(&mut self) -> Result<(), ReceiverError> {
        if self.receiver.is_none() {
            self.receiver = Some(UdpReceiver::start(&self.config, self.position.clone())?);
        }
        Ok(())
    }

    /// Stops receiving and frees the port. Does nothing if already inactive.
    ///
    /// The last position is kept, a later [`BodyTracker::activate`] continues
    /// from it.
    pub fn deactivate(&mut self) {
        if let Some(mut receiver) = self.receiver.take() {
            receiver.stop();
        }
    }

    #[allow(missing_docs)]
    pub fn state(&self) -> TrackerState {
        match self.receiver {
            Some(_) => TrackerState::Active,
            None => TrackerState::Inactive,
        }
    }

    /// The current position, by value. Never blocks on the network.
    pub fn tick(&self) -> Position {
        self.position.get()
    }

    /// When the position last changed, `None` if no data ever arrived.
    pub fn last_update(&self) -> Option<Instant> {
        self.position.last_update()
    }

    /// Where the receiver is listening, while active.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.receiver.as_ref().map(UdpReceiver::local_addr)
    }

    /// What the current receiver has seen, while active.
    pub fn counters(&self) -> Option<ReceiverCounters> {
        self.receiver.as_ref().map(UdpReceiver::counters)
    }

    #[allow(missing_docs)]
    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }
}

impl PositionSource for BodyTracker {
    fn latest(&self) -> Position {
        self.tick()
    }
}

impl Drop for BodyTracker {
    fn drop(&mut self) {
        self.deactivate();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{
        net::{IpAddr, Ipv4Addr, UdpSocket},
        thread::sleep,
        time::Duration,
    };

    fn loopback() -> TrackerConfig {
        TrackerConfig {
            body_id: 1,
            port: 0,
            bind_address: IpAddr::V4(Ipv4Addr::LOCALHOST),
            poll_interval_ms: 10,
        }
    }

    fn send_position(to: SocketAddr, t: [f64; 3]) {
        let payload = format!(
            "6d 1 [0 1.000][{:.3} {:.3} {:.3} 0.000 0.000 0.000][0.000 0.000 0.000 0.000 0.000 0.000 0.000 0.000 0.000]",
            t[0], t[1], t[2]
        );
        let socket = UdpSocket::bind("127.0.0.1:0").unwrap();
        socket.send_to(payload.as_bytes(), to).unwrap();
    }

    fn wait_for_updates(tracker: &BodyTracker, updates: u64) {
        for _ in 0..5000 {
            if tracker.counters().map(|c| c.updates) == Some(updates) {
                return;
            }
            sleep(Duration::from_millis(1));
        }
        panic!("no update arrived");
    }

    #[test]
    fn starts_inactive_at_zero() {
        let tracker = BodyTracker::new(loopback());
        assert_eq!(tracker.state(), TrackerState::Inactive);
        assert_eq!(tracker.tick(), Position::ZERO);
        assert_eq!(tracker.local_addr(), None);
        assert_eq!(tracker.counters(), None);
    }

    #[test]
    fn activate_and_deactivate_are_idempotent() {
        let mut tracker = BodyTracker::new(loopback());

        tracker.activate().unwrap();
        let addr = tracker.local_addr().unwrap();
        tracker.activate().unwrap();
        assert_eq!(tracker.local_addr(), Some(addr));
        assert_eq!(tracker.state(), TrackerState::Active);

        tracker.deactivate();
        tracker.deactivate();
        assert_eq!(tracker.state(), TrackerState::Inactive);
        UdpSocket::bind(addr).unwrap();
    }

    #[test]
    fn tick_follows_the_stream() {
        let mut tracker = BodyTracker::new(loopback());
        tracker.activate().unwrap();
        let addr = tracker.local_addr().unwrap();

        send_position(addr, [1500.0, -250.0, 1700.0]);
        wait_for_updates(&tracker, 1);

        assert_eq!(
            tracker.latest(),
            Position::from_tracker_mm([1500.0, -250.0, 1700.0])
        );
        assert!(tracker.last_update().is_some());
    }

    #[test]
    fn position_survives_reactivation() {
        let mut tracker = BodyTracker::new(loopback());
        tracker.activate().unwrap();
        send_position(tracker.local_addr().unwrap(), [10.0, 20.0, 30.0]);
        wait_for_updates(&tracker, 1);
        tracker.deactivate();

        tracker.activate().unwrap();

        assert_eq!(tracker.tick(), Position::from_tracker_mm([10.0, 20.0, 30.0]));
        assert_eq!(tracker.counters().map(|c| c.updates), Some(0));
    }

    #[test]
    fn activation_failure_leaves_tracker_inactive() {
        let taken = UdpSocket::bind("127.0.0.1:0").unwrap();
        let mut tracker = BodyTracker::new(TrackerConfig {
            port: taken.local_addr().unwrap().port(),
            ..loopback()
        });

        assert!(tracker.activate().is_err());
        assert_eq!(tracker.state(), TrackerState::Inactive);
    }
}
