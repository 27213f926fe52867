//! arttrack follows a single rigid body tracked by an optical motion capture
//! rig. The rig streams its measurements as ASCII text over UDP; a
//! background thread receives and decodes them and keeps only the newest
//! position of the body we care about, which a render loop picks up once
//! per frame.
//!
//! - [`tracking_message_decoder`] turns one datagram's text into bodies.
//! - [`receiver`] owns the socket and the thread draining it.
//! - [`position`] holds the handoff slot between that thread and the render
//!   loop.
//! - [`tracker`] is what a render loop holds: it starts and stops the
//!   receiver and hands out the position on every tick.
//! - [`dummy_tracker`] pretends to be the rig, for tests and the monitor.

#![warn(missing_docs)]
pub mod args;
pub mod config;
pub mod dummy_tracker;
pub mod gui;
pub mod position;
pub mod receiver;
pub mod tracker;
pub mod tracking_message_decoder;
