//! A stand-in for the tracking rig. It sends the same kind of ASCII frames
//! the real thing does, for bodies walking in a circle around the origin.

use crate::position::Position;
use crate::tracking_message_decoder::BodyRecord;

use log::{info, warn};
use rand::prelude::*;
use std::{
    f64::consts::PI,
    fmt::Write,
    io,
    net::{Ipv4Addr, Ipv6Addr, SocketAddr, UdpSocket},
    sync::{mpsc, Arc, Mutex, PoisonError},
    thread,
    time::{Duration, Instant},
};

enum Signal {
    Stop,
}

/// Sends synthetic frames to a target address from a background thread.
pub struct DummyTracker {
    handle: Option<thread::JoinHandle<()>>,
    tx: mpsc::Sender<Signal>,
    sent: Arc<Mutex<Vec<Position>>>,
}

/// Settings for a [`DummyTracker`]. Distances are in millimeters, the way
/// the rig reports them.
#[derive(Debug, Clone)]
pub struct DummyTrackerBuilder {
    target: SocketAddr,
    num_bodies: usize,
    radius: f64,
    height: f64,
    noise: f64,
    interval: Duration,
    revolution: Duration,
}

impl DummyTracker {
    /// Starts describing a tracker that sends to `target`.
    pub fn builder(target: SocketAddr) -> DummyTrackerBuilder {
        DummyTrackerBuilder {
            target,
            num_bodies: 1,
            radius: 1500.0,
            height: 1700.0,
            noise: 0.0,
            interval: Duration::from_millis(16),
            revolution: Duration::from_secs(10),
        }
    }

    /// Where the bodies of the last sent frame were, already converted the
    /// way a receiver converts them. Index `i` is body `i + 1`.
    pub fn get_debug_positions(&self) -> Vec<Position> {
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Stops sending. Calling it more than once is fine.
    pub fn stop(&mut self) {
        let _ = self.tx.send(Signal::Stop);
        if let Some(thread) = self.handle.take() {
            if thread.join().is_err() {
                warn!("Dummy tracker thread panicked");
            }
        }
    }
}

impl Drop for DummyTracker {
    fn drop(&mut self) {
        self.stop();
    }
}

impl DummyTrackerBuilder {
    #[allow(missing_docs)]
    pub fn num_bodies(mut self, num_bodies: usize) -> Self {
        self.num_bodies = num_bodies;
        self
    }

    /// Radius of the circle the bodies walk on.
    pub fn radius(mut self, radius: f64) -> Self {
        self.radius = radius;
        self
    }

    /// Height of the bodies above the floor.
    pub fn height(mut self, height: f64) -> Self {
        self.height = height;
        self
    }

    /// Uniform jitter added to every translation component.
    pub fn noise(mut self, noise: f64) -> Self {
        self.noise = noise;
        self
    }

    /// Time between two frames.
    pub fn interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Time the bodies take to go around the circle once.
    pub fn revolution(mut self, revolution: Duration) -> Self {
        self.revolution = revolution;
        self
    }

    /// Opens a socket and starts sending. Fails if the noise is negative or
    /// not finite.
    pub fn build(self) -> io::Result<DummyTracker> {
        if !(self.noise.is_finite() && self.noise >= 0.0) {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("noise must be a finite, non-negative number, got {}", self.noise),
            ));
        }

        let socket = match self.target {
            SocketAddr::V4(_) => UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0))?,
            SocketAddr::V6(_) => UdpSocket::bind((Ipv6Addr::UNSPECIFIED, 0))?,
        };

        let (tx, rx) = mpsc::channel::<Signal>();
        let sent = Arc::new(Mutex::new(Vec::new()));
        let th_sent = Arc::clone(&sent);

        let handle = thread::Builder::new()
            .name("dummy-tracker".to_owned())
            .spawn(move || self.run(socket, rx, th_sent))?;

        Ok(DummyTracker {
            handle: Some(handle),
            tx,
            sent,
        })
    }

    fn run(self, socket: UdpSocket, rx: mpsc::Receiver<Signal>, sent: Arc<Mutex<Vec<Position>>>) {
        let mut rng = thread_rng();
        let started = Instant::now();
        let mut frame_number = 0;

        info!("Sending dummy frames to {}", self.target);
        loop {
            match rx.try_recv() {
                Ok(Signal::Stop) | Err(mpsc::TryRecvError::Disconnected) => break,
                Err(mpsc::TryRecvError::Empty) => {}
            }

            let phase =
                2.0 * PI * started.elapsed().as_secs_f64() / self.revolution.as_secs_f64().max(f64::EPSILON);
            let mut bodies = generate_circular_bodies(self.num_bodies, self.radius, self.height, phase);
            let noise = self.noise;
            if noise > 0.0 {
                for b in bodies.iter_mut() {
                    for t in b.translation.iter_mut() {
                        *t += rng.gen_range(-noise..noise);
                    }
                }
            }

            if let Err(e) = socket.send_to(format_frame(frame_number, &bodies).as_bytes(), self.target) {
                warn!("Failed to send dummy frame: {}", e);
            }
            *sent.lock().unwrap_or_else(PoisonError::into_inner) = bodies
                .iter()
                .map(|b| Position::from_tracker_mm(b.translation))
                .collect();

            frame_number += 1;
            spin_sleep::sleep(self.interval);
        }
        info!("Dummy tracker sent {} frames", frame_number);
    }
}

/// Places `num_bodies` evenly on a circle in the rig's floor plane, rotated
/// by `phase` radians, each facing along the circle.
pub fn generate_circular_bodies(num_bodies: usize, radius: f64, height: f64, phase: f64) -> Vec<BodyRecord> {
    (0..num_bodies)
        .map(|i| phase + (i as f64 / num_bodies as f64) * 2.0 * PI)
        .zip(0..)
        .map(|(angle, id)| BodyRecord {
            id,
            quality: 1.0,
            translation: [angle.cos() * radius, angle.sin() * radius, height],
            rotation: [0.0, 0.0, (angle + PI / 2.0).to_degrees()],
        })
        .collect()
}

/// Writes the frame the rig would send for `bodies`.
pub fn format_frame(frame_number: u64, bodies: &[BodyRecord]) -> String {
    let mut s = format!("fr {}\n6d {}", frame_number, bodies.len());
    for b in bodies {
        let [tx, ty, tz] = b.translation;
        let [rx, ry, rz] = b.rotation;
        // Only yaw is ever set, so the matrix is a rotation about Z
        let (sin, cos) = rz.to_radians().sin_cos();
        let _ = write!(
            s,
            " [{} {:.3}][{:.3} {:.3} {:.3} {:.4} {:.4} {:.4}][{:.6} {:.6} {:.6} {:.6} {:.6} {:.6} {:.6} {:.6} {:.6}]",
            b.id, b.quality, tx, ty, tz, rx, ry, rz, cos, sin, 0.0, -sin, cos, 0.0, 0.0, 0.0, 1.0
        );
    }
    s.push('\n');
    s
}
