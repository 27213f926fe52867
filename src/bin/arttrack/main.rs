//! Follows one body of the rig from the terminal, or pretends to be the rig.

use arttrack::{
    args::{tick_interval, CommandTask, PollCommand, SimulateCommand, TrackArgs},
    config::TrackerConfig,
    dummy_tracker::DummyTracker,
    gui::{watch_until_keypress, GuiError},
    tracker::BodyTracker,
};

use clap::Parser;
use log::info;
use ratatui::text::Line;
use spin_sleep::SpinSleeper;
use std::{error::Error, time::Duration};

// Example:
// RUST_LOG=info cargo run --bin arttrack -- --body 2 --port 5000 watch
//
// and, in another terminal:
//
// cargo run --bin arttrack -- --port 5000 simulate --bodies 3 --noise 5

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();
    let args = TrackArgs::parse();
    let config = args.tracker_config()?;

    match args.command {
        CommandTask::Watch => watch(config)?,
        CommandTask::Poll(cmd) => poll(config, cmd)?,
        CommandTask::Simulate(cmd) => simulate(config, cmd)?,
    }

    Ok(())
}

/// Every redraw of the terminal is one tick of the tracker.
fn watch(config: TrackerConfig) -> Result<(), GuiError> {
    let mut tracker = BodyTracker::new(config);
    tracker.activate()?;

    let title = format!(
        " Body {} on {} ",
        tracker.config().body_id,
        tracker.config().socket_addr()
    );
    watch_until_keypress(&title, || {
        let position = tracker.tick();
        let age = match tracker.last_update() {
            Some(t) => format!("{:.1} s ago", t.elapsed().as_secs_f32()),
            None => "never".to_owned(),
        };
        let counters = tracker.counters().unwrap_or_default();
        vec![
            Line::from(format!(" Position (m)   {}", position)),
            Line::from(format!(" Last update    {}", age)),
            Line::from(format!(
                " Datagrams      {} received, {} rejected, {} updates",
                counters.datagrams, counters.rejected, counters.updates
            )),
        ]
    })?;

    tracker.deactivate();
    Ok(())
}

/// A stand-in for a render loop: read the position at a fixed rate.
fn poll(config: TrackerConfig, cmd: PollCommand) -> Result<(), Box<dyn Error>> {
    let interval = tick_interval(cmd.rate)?;
    let sleeper = SpinSleeper::default();

    let mut tracker = BodyTracker::new(config);
    tracker.activate()?;

    let mut tick: u64 = 0;
    while cmd.ticks.map_or(true, |n| tick < n) {
        println!("{}\t{}", tick, tracker.tick());
        sleeper.sleep(interval);
        tick += 1;
    }

    tracker.deactivate();
    Ok(())
}

fn simulate(config: TrackerConfig, cmd: SimulateCommand) -> Result<(), Box<dyn Error>> {
    let interval = tick_interval(cmd.rate)?;
    let target = cmd.target(&config);
    let revolution = Duration::try_from_secs_f64(cmd.revolution)?;

    let mut dummy = DummyTracker::builder(target)
        .num_bodies(cmd.num_bodies)
        .radius(cmd.radius)
        .noise(cmd.noise)
        .interval(interval)
        .revolution(revolution)
        .build()?;

    match cmd.duration {
        Some(seconds) => {
            info!("Simulating for {} s", seconds);
            spin_sleep::sleep(Duration::try_from_secs_f64(seconds)?);
        }
        None => watch_until_keypress(&format!(" Sending to {} ", target), || {
            dummy
                .get_debug_positions()
                .iter()
                .enumerate()
                .map(|(i, p)| Line::from(format!(" Body {}   {}", i + 1, p)))
                .collect()
        })?,
    }

    dummy.stop();
    Ok(())
}
