//! Collision, passage and boundary tests against the carpet
//!
//! All tests run in the player's depth plane: an entity only interacts with
//! the carpet while its z is close to `PLAYER_DEPTH`.

use glam::{Vec2, Vec3};

use super::state::ObstacleKind;
use crate::config::{Bounds, CollisionConfig, DoorConfig};
use crate::consts::PLAYER_DEPTH;
use crate::planar_distance;

/// Does a solid obstacle at `pos` overlap the carpet?
///
/// Passable kinds never hit. Solid kinds hit when level with the carpet
/// (within `depth_threshold`) and closer in (x, y) than their radius.
pub fn obstacle_hit(kind: ObstacleKind, pos: Vec3, carpet: Vec2, config: &CollisionConfig) -> bool {
    let Some(radius) = config.radii.radius(kind) else {
        return false;
    };
    if (pos.z - PLAYER_DEPTH).abs() >= config.depth_threshold {
        return false;
    }
    planar_distance(pos.truncate(), carpet) < radius
}

/// Is the carpet inside the door's frame while the door crosses the player plane?
pub fn door_passage(pos: Vec3, carpet: Vec2, config: &DoorConfig) -> bool {
    let depth = pos.z - PLAYER_DEPTH;
    if depth < config.window_near || depth >= config.window_far {
        return false;
    }
    (pos.x - carpet.x).abs() < config.tolerance_x && (pos.y - carpet.y).abs() < config.tolerance_y
}

/// Has the carpet left the playable area? Flying above the top is allowed.
pub fn out_of_bounds(carpet: Vec2, bounds: &Bounds) -> bool {
    carpet.x < -bounds.x || carpet.x > bounds.x || carpet.y < bounds.y_bottom
}
