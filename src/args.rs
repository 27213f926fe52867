//! Commandline argument parsers using clap for the arttrack binaries

use crate::config::{ConfigError, TrackerConfig};

use clap::{Args, Parser, Subcommand};
use std::{
    net::{IpAddr, Ipv4Addr, SocketAddr},
    path::PathBuf,
    time::Duration,
};

/// Arguments of the `arttrack` binary
#[derive(Debug, Parser, Clone)]
#[clap(version, about)]
#[allow(missing_docs)]
pub struct TrackArgs {
    #[command(subcommand)]
    /// What to do with the tracking stream
    pub command: CommandTask,

    /// ron file holding the receiver configuration, flags below override it
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,

    /// The body to follow, counting from 1
    #[arg(short = 'b', long = "body")]
    pub body_id: Option<u32>,

    /// UDP port the rig sends to
    #[arg(short = 'p', long = "port")]
    pub port: Option<u16>,

    /// Local address to listen on
    #[arg(long = "bind")]
    pub bind_address: Option<IpAddr>,
}

#[allow(missing_docs)]
#[derive(Debug, Subcommand, Clone)]
pub enum CommandTask {
    /// Show the tracked position live, until a key is pressed
    Watch,

    /// Print the tracked position at a fixed tick rate
    Poll(PollCommand),

    /// Send dummy tracking frames, for trying out a receiver
    Simulate(SimulateCommand),
}

#[allow(missing_docs)]
#[derive(Debug, Args, Clone)]
pub struct PollCommand {
    /// Ticks per second
    #[arg(short = 'r', long = "rate", default_value_t = 60.0)]
    pub rate: f64,

    /// Stop after this many ticks instead of running forever
    #[arg(short = 'n', long = "ticks")]
    pub ticks: Option<u64>,
}

#[allow(missing_docs)]
#[derive(Debug, Args, Clone)]
pub struct SimulateCommand {
    /// Where to send frames, defaults to the configured port on localhost
    #[arg(short = 't', long = "target")]
    pub target: Option<SocketAddr>,

    /// Number of bodies in each frame
    #[arg(short = 'n', long = "bodies", default_value_t = 1)]
    pub num_bodies: usize,

    /// Radius of the circle in millimeters
    #[arg(long = "radius", default_value_t = 1500.0)]
    pub radius: f64,

    /// Jitter in millimeters
    #[arg(long = "noise", default_value_t = 0.0)]
    pub noise: f64,

    /// Frames per second
    #[arg(short = 'r', long = "rate", default_value_t = 60.0)]
    pub rate: f64,

    /// Seconds the bodies take to go around the circle once
    #[arg(long = "revolution", default_value_t = 10.0)]
    pub revolution: f64,

    /// Stop after this many seconds instead of waiting for a key
    #[arg(short = 'd', long = "duration")]
    pub duration: Option<f64>,
}

impl TrackArgs {
    /// Loads the config file, if any, and applies the flags on top.
    pub fn tracker_config(&self) -> Result<TrackerConfig, ConfigError> {
        let mut config = match &self.config {
            Some(path) => TrackerConfig::from_path(path)?,
            None => TrackerConfig::default(),
        };

        if let Some(body_id) = self.body_id {
            config.body_id = body_id;
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(bind_address) = self.bind_address {
            config.bind_address = bind_address;
        }

        config.validate()
    }
}

impl SimulateCommand {
    /// The address frames go to.
    pub fn target(&self, config: &TrackerConfig) -> SocketAddr {
        self.target
            .unwrap_or(SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), config.port))
    }
}

/// Time between two ticks at `rate` ticks per second.
pub fn tick_interval(rate: f64) -> Result<Duration, String> {
    let invalid = || format!("rate must be a positive number, got {}", rate);
    if !(rate.is_finite() && rate > 0.0) {
        return Err(invalid());
    }
    Duration::try_from_secs_f64(1.0 / rate).map_err(|_| invalid())
}

/// Runs a dummy rig and a receiver side by side and charts both
#[derive(Debug, Parser, Clone)]
#[clap(version)]
#[allow(missing_docs)]
pub struct MonitorArgs {
    /// Number of bodies the dummy rig sends
    #[arg(short = 'n', long = "bodies", default_value_t = 4)]
    pub num_bodies: usize,

    /// The body the receiver follows, counting from 1
    #[arg(short = 'b', long = "body", default_value_t = 1)]
    pub body_id: u32,

    /// Radius of the circle in millimeters
    #[arg(long = "radius", default_value_t = 1500.0)]
    pub radius: f64,

    /// Jitter in millimeters
    #[arg(long = "noise", default_value_t = 20.0)]
    pub noise: f64,
}
