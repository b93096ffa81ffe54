//! Carpet Runner - A flying carpet endless runner
//!
//! Core modules:
//! - `sim`: Deterministic simulation (carpet motion, spawning, collisions, outcome)
//! - `input`: Polled pointer/touch/joystick input state
//! - `config`: Data-driven tuning with LocalStorage overrides
//! - `session`: Play session owner and collaborator traits (scene, environment, HUD)
//! - `headless`: Collaborators for native runs and tests

pub mod config;
pub mod headless;
pub mod input;
pub mod session;
pub mod sim;

pub use config::{Config, ConfigError};
pub use input::{InputState, OffsetSource};
pub use session::GameSession;

use glam::Vec2;

/// Game configuration constants
pub mod consts {
    /// Upper bound on a single frame step, avoids large jumps after a stall
    pub const MAX_FRAME_DT: f32 = 0.1;
    /// Step used by the headless runner (60 Hz)
    pub const HEADLESS_DT: f32 = 1.0 / 60.0;
    /// Depth of the player's plane; entities approach it from negative z
    pub const PLAYER_DEPTH: f32 = 0.0;
}

/// Planar (x, y) distance between two points
#[inline]
pub fn planar_distance(a: Vec2, b: Vec2) -> f32 {
    (a - b).length()
}

/// Clamp a frame delta into `[0, max]`; non-finite deltas become 0
#[inline]
pub fn sanitize_dt(dt: f32, max: f32) -> f32 {
    if dt.is_finite() { dt.clamp(0.0, max) } else { 0.0 }
}
