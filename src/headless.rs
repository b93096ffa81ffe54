//! Headless collaborators
//!
//! Stand-ins for the scene, environment and HUD used by the native runner
//! and tests. They record what the session asked of them.

use std::collections::BTreeMap;

use glam::{Vec2, Vec3};

use crate::input::OffsetSource;
use crate::session::{AssetError, Environment, Presenter, SceneBackend};
use crate::sim::{Entity, EntityKind, GameState};

/// Handle for a headless visual
#[derive(Debug)]
pub struct SceneNode {
    id: u32,
}

/// Scene that tracks positions instead of drawing
#[derive(Debug, Default)]
pub struct HeadlessScene {
    /// Last position of every live visual
    pub positions: BTreeMap<u32, Vec3>,
    pub carpet: Vec2,
    /// Entity ids in disposal order
    pub disposed: Vec<u32>,
    /// Image URLs that fail to "load"
    pub failing_urls: Vec<String>,
}

impl SceneBackend for HeadlessScene {
    type Handle = SceneNode;

    fn create(&mut self, entity: &Entity) -> Result<SceneNode, AssetError> {
        if let EntityKind::Image { url } = &entity.kind {
            if self.failing_urls.contains(url) {
                return Err(AssetError {
                    url: url.clone(),
                    reason: "not found".to_string(),
                });
            }
        }
        self.positions.insert(entity.id, entity.pos);
        Ok(SceneNode { id: entity.id })
    }

    fn set_position(&mut self, handle: &mut SceneNode, pos: Vec3) {
        self.positions.insert(handle.id, pos);
    }

    fn dispose(&mut self, handle: SceneNode) {
        self.positions.remove(&handle.id);
        self.disposed.push(handle.id);
    }

    fn move_carpet(&mut self, pos: Vec2) {
        self.carpet = pos;
    }
}

/// Static sky; only tracks how far it would have scrolled
#[derive(Debug, Default)]
pub struct StillEnvironment {
    pub scrolled: f32,
    pub updates: u64,
}

impl Environment for StillEnvironment {
    fn update(&mut self, dt: f32, forward_speed: f32) {
        self.scrolled += dt * forward_speed;
        self.updates += 1;
    }
}

/// Presenter that logs and remembers what it was told
#[derive(Debug, Default)]
pub struct HudLog {
    pub distance: f32,
    pub failures: Vec<f32>,
    pub successes: Vec<(f32, String)>,
}

impl Presenter for HudLog {
    fn on_distance(&mut self, distance: f32) {
        if (distance / 100.0).floor() > (self.distance / 100.0).floor() {
            log::info!("Distance {:.0}", distance);
        }
        self.distance = distance;
    }

    fn on_failure(&mut self, final_distance: f32) {
        log::info!("Crashed! Final distance: {:.0}", final_distance);
        self.failures.push(final_distance);
    }

    fn on_success(&mut self, final_distance: f32, destination: &str) {
        log::info!(
            "Success! Final distance: {:.0}, continue to {}",
            final_distance,
            destination
        );
        self.successes.push((final_distance, destination.to_string()));
    }
}

/// Largest per-frame offset the autopilot asks for
const MAX_STEP: f32 = 3.0;
/// Extra clearance around obstacle radii
const CLEARANCE: f32 = 2.0;
/// How far ahead the autopilot looks
const LOOKAHEAD: f32 = 45.0;

/// Demo pilot: dodges the nearest threat, lines up with the door
#[derive(Debug, Clone)]
pub struct Autopilot {
    offset: Vec2,
    /// Height to drift back to when nothing is ahead
    pub cruise_height: f32,
}

impl Default for Autopilot {
    fn default() -> Self {
        Self {
            offset: Vec2::ZERO,
            cruise_height: 4.0,
        }
    }
}

impl Autopilot {
    /// Decide this frame's offset from the current state
    pub fn steer(&mut self, state: &GameState) {
        let carpet = state.carpet.position();
        let config = &state.config;

        let door = state.entities.iter().find(|e| {
            matches!(e.kind, EntityKind::Door { passed: false })
                && e.pos.z > -LOOKAHEAD
                && e.pos.z < config.door.window_far
        });
        if let Some(door) = door {
            self.offset = ((door.pos.truncate() - carpet) * 0.5).clamp_length_max(MAX_STEP);
            return;
        }

        // Closest solid obstacle that is ahead and on a collision course
        let threat = state
            .entities
            .iter()
            .filter(|e| e.pos.z > -LOOKAHEAD && e.pos.z < config.collision.depth_threshold)
            .filter_map(|e| {
                let radius = e
                    .kind
                    .obstacle_kind()
                    .and_then(|k| config.collision.radii.radius(k))?;
                let delta = e.pos.truncate() - carpet;
                (delta.length() < radius + CLEARANCE).then_some((e.pos.z, delta))
            })
            .max_by(|a, b| a.0.total_cmp(&b.0));

        self.offset = match threat {
            Some((_, delta)) => {
                // Head away from it, toward the middle when head-on
                let away = if delta.length() > 1e-3 {
                    -delta.normalize()
                } else if carpet.x > 0.0 {
                    -Vec2::X
                } else {
                    Vec2::X
                };
                away * MAX_STEP
            }
            None => (Vec2::new(-carpet.x, self.cruise_height - carpet.y) * 0.2)
                .clamp_length_max(MAX_STEP),
        };
    }
}

impl OffsetSource for Autopilot {
    fn offset(&self) -> Vec2 {
        self.offset
    }
}
