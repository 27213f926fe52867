//! The tracked position and the slot it is handed over through.

use std::{
    fmt::Display,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Instant,
};

/// Millimeters per meter, the tracker reports millimeters.
const MM_PER_M: f64 = 1000.0;

/// A position in the consumer's coordinate space, in meters.
///
/// The tracker's floor is its XY plane with Z pointing up. The consumer is
/// Y-up, so the tracker's Z becomes our Y, and X and the remaining axis
/// are mirrored.
#[derive(Debug, Default, PartialEq, Clone, Copy)]
pub struct Position {
    /// Right, the tracker's X mirrored
    pub x: f32,
    /// Up, the tracker's Z
    pub y: f32,
    /// Toward the viewer, the tracker's Y mirrored
    pub z: f32,
}

impl Position {
    /// The origin, which is also what a receiver holds before any data.
    pub const ZERO: Self = Position {
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };

    /// Converts a tracker translation `[tx, ty, tz]` in millimeters.
    pub fn from_tracker_mm(translation: [f64; 3]) -> Self {
        let [tx, ty, tz] = translation;
        Position {
            x: (-tx / MM_PER_M) as f32,
            y: (tz / MM_PER_M) as f32,
            z: (-ty / MM_PER_M) as f32,
        }
    }

    #[allow(missing_docs)]
    pub fn dist(&self, other: &Self) -> f32 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2) + (self.z - other.z).powi(2))
            .sqrt()
    }
}

impl Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({:.3}, {:.3}, {:.3})", self.x, self.y, self.z)
    }
}

/// Anything a render tick can pull the current position from.
pub trait PositionSource {
    /// The best known position right now, by value.
    fn latest(&self) -> Position;
}

#[derive(Debug, Default, Clone, Copy)]
struct Sample {
    position: Position,
    updated_at: Option<Instant>,
}

/// Single slot, last-write-wins handoff between the receive thread and the
/// render loop. Clones share the same slot.
///
/// The whole vector is written and read under one lock, so a reader never
/// sees half of an update.
#[derive(Debug, Default, Clone)]
pub struct LatestPosition {
    sample: Arc<Mutex<Sample>>,
}

impl LatestPosition {
    /// A fresh slot holding [`Position::ZERO`].
    pub fn new() -> Self {
        Self::default()
    }

    // The slot only holds `Copy` data, a panic mid-write cannot leave it
    // half updated, so a poisoned lock is still usable.
    fn lock(&self) -> MutexGuard<'_, Sample> {
        self.sample.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Replaces the stored position.
    pub fn publish(&self, position: Position) {
        *self.lock() = Sample {
            position,
            updated_at: Some(Instant::now()),
        };
    }

    /// The last published position, or [`Position::ZERO`].
    pub fn get(&self) -> Position {
        self.lock().position
    }

    /// When [`LatestPosition::publish`] was last called, `None` if never.
    pub fn last_update(&self) -> Option<Instant> {
        self.lock().updated_at
    }
}

impl PositionSource for LatestPosition {
    fn latest(&self) -> Position {
        self.get()
    }
}
