//! Deterministic simulation module
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - Seeded RNG only
//! - Stable iteration order (spawn order)
//! - No rendering, DOM or platform dependencies

pub mod collision;
pub mod spawn;
pub mod state;
pub mod tick;

pub use collision::{door_passage, obstacle_hit, out_of_bounds};
pub use spawn::{DoorTrigger, SpawnTimer, run_spawners};
pub use state::{
    Carpet, Entity, EntityKind, FailureCause, GameEvent, GameState, ObstacleKind, Outcome,
    Shape,
};
pub use tick::{TickInput, tick};
