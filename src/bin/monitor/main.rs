mod gui;

use std::{
    error::Error,
    net::{IpAddr, Ipv4Addr},
};

use arttrack::{
    args::MonitorArgs,
    config::TrackerConfig,
    dummy_tracker::DummyTracker,
    position::PositionSource,
    tracker::BodyTracker,
};
use clap::Parser;
use gui::engage_gui;

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();
    let args = MonitorArgs::parse();

    let mut tracker = BodyTracker::new(TrackerConfig {
        body_id: args.body_id,
        port: 0,
        bind_address: IpAddr::V4(Ipv4Addr::LOCALHOST),
        ..TrackerConfig::default()
    });
    tracker.activate()?;
    let target = tracker.local_addr().ok_or("tracker did not start")?;

    let mut dummy = DummyTracker::builder(target)
        .num_bodies(args.num_bodies)
        .radius(args.radius)
        .noise(args.noise)
        .build()?;

    let range = args.radius / 1000.0 * 1.5;
    engage_gui(
        range,
        || dummy.get_debug_positions(),
        || vec![tracker.latest()],
    )?;

    dummy.stop();
    tracker.deactivate();
    Ok(())
}
