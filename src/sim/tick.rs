//! Per-frame simulation step
//!
//! Order within a frame: distance, carpet motion, spawning, entity advance,
//! contacts, retirement, bounds. Contacts always see this frame's final
//! geometry.

use glam::Vec2;

use super::collision::out_of_bounds;
use super::spawn::run_spawners;
use super::state::{FailureCause, GameEvent, GameState, Outcome};
use crate::sanitize_dt;

/// Input commands for a single frame
#[derive(Debug, Clone, Copy, Default)]
pub struct TickInput {
    /// Offset added to the carpet's current position to form its new target
    pub offset: Vec2,
}

/// Advance the game state by one frame.
///
/// Returns the step actually simulated, or `None` when the frame was a
/// no-op (terminal state, or a zero/invalid delta).
pub fn tick(state: &mut GameState, input: &TickInput, dt: f32) -> Option<f32> {
    let dt = sanitize_dt(dt, state.config.max_frame_dt);
    if dt <= 0.0 || state.outcome.is_terminal() {
        return None;
    }

    state.frames += 1;
    state.distance += state.config.forward_speed * dt;

    // Carpet motion
    let target = state.carpet.position() + input.offset;
    state.carpet.set_target(target.x, target.y, &state.config);
    state.carpet.update(dt, &state.config);
    let carpet = state.carpet.position();

    run_spawners(state, dt);

    let speed = state.config.forward_speed;
    for entity in &mut state.entities {
        entity.advance(dt, speed);
    }

    resolve_contacts(state, carpet);
    retire_entities(state);

    if state.is_running() && out_of_bounds(carpet, &state.config.bounds) {
        state.finish(Outcome::Failed(FailureCause::OutOfBounds));
    }

    Some(dt)
}

/// First solid hit in spawn order fails the run; otherwise test door passage
fn resolve_contacts(state: &mut GameState, carpet: Vec2) {
    let hit = state.entities.iter().find_map(|e| {
        let kind = e.kind.obstacle_kind()?;
        e.collides_with(carpet, &state.config)
            .then_some(FailureCause::Collision { id: e.id, kind })
    });
    if let Some(cause) = hit {
        state.finish(Outcome::Failed(cause));
        return;
    }

    let config = &state.config;
    let passed = state
        .entities
        .iter_mut()
        .any(|e| e.try_pass(carpet, config));
    if passed {
        state.finish(Outcome::Succeeded);
    }
}

/// Drop entities that scrolled past the camera
fn retire_entities(state: &mut GameState) {
    let despawn = state.config.spawn.despawn_depth;
    let events = &mut state.events;
    state.entities.retain(|e| {
        if e.is_retired(despawn) {
            log::debug!("retire #{}", e.id);
            events.push(GameEvent::EntityRetired { id: e.id });
            false
        } else {
            true
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Config, Interval};
    use crate::sim::state::{EntityKind, ObstacleKind, Shape};
    use glam::Vec3;
    use proptest::prelude::*;

    const DT: f32 = 1.0 / 60.0;

    /// Config with spawning pushed far out so tests control the world
    fn quiet_config() -> Config {
        let mut config = Config::default();
        config.spawn.image_urls.clear();
        config.spawn.obstacle_interval = Interval::new(1e6, 1e6);
        config.door.spawn_distance = 1e9;
        config
    }

    fn quiet_state() -> GameState {
        let mut state = GameState::new(7, quiet_config());
        // Lapse the first-frame obstacle spawn without keeping it
        tick(&mut state, &TickInput::default(), DT);
        state.entities.clear();
        state.drain_events();
        state
    }

    #[test]
    fn test_distance_and_dt_clamp() {
        let mut state = GameState::new(1, quiet_config());
        assert_eq!(tick(&mut state, &TickInput::default(), 1.0), Some(0.1));
        assert!((state.distance - 4.0).abs() < 1e-5);
        assert_eq!(state.frames, 1);
    }

    #[test]
    fn test_invalid_dt_is_noop() {
        let mut state = GameState::new(1, Config::default());
        for dt in [0.0, -1.0, f32::NAN, f32::INFINITY] {
            assert_eq!(tick(&mut state, &TickInput::default(), dt), None);
        }
        assert_eq!(state.frames, 0);
        assert!(state.entities.is_empty());
    }

    #[test]
    fn test_first_frame_spawns_both_streams() {
        let mut state = GameState::new(5, Config::default());
        tick(&mut state, &TickInput::default(), DT);
        assert_eq!(state.entities.len(), 2);
        assert!(matches!(state.entities[1].kind, EntityKind::Image { .. }));
        let spawned = state
            .drain_events()
            .into_iter()
            .filter(|e| matches!(e, GameEvent::EntitySpawned { .. }))
            .count();
        assert_eq!(spawned, 2);
    }

    #[test]
    fn test_collision_fails_run() {
        let mut state = quiet_state();
        let id = state.push_entity(
            EntityKind::Obstacle(Shape::Pillar),
            Vec3::new(0.5, 0.0, -0.5),
        );
        tick(&mut state, &TickInput::default(), DT);
        assert_eq!(
            state.outcome,
            Outcome::Failed(FailureCause::Collision {
                id,
                kind: ObstacleKind::Pillar
            })
        );
        let failures = state
            .drain_events()
            .into_iter()
            .filter(|e| matches!(e, GameEvent::Failed { .. }))
            .count();
        assert_eq!(failures, 1);
    }

    #[test]
    fn test_ring_is_flown_through() {
        let mut state = quiet_state();
        state.push_entity(EntityKind::Obstacle(Shape::Ring), Vec3::new(0.0, 0.0, -0.5));
        for _ in 0..10 {
            tick(&mut state, &TickInput::default(), DT);
        }
        assert_eq!(state.outcome, Outcome::Running);
    }

    #[test]
    fn test_door_passage_succeeds_once() {
        let mut state = quiet_state();
        let id = state.push_entity(EntityKind::Door { passed: false }, Vec3::new(0.0, 6.0, -0.2));
        tick(&mut state, &TickInput::default(), 0.01);
        assert_eq!(state.outcome, Outcome::Succeeded);
        assert_eq!(
            state.entity(id).map(|e| e.kind.clone()),
            Some(EntityKind::Door { passed: true })
        );

        // Same depth again: the latch holds
        let carpet = state.carpet.position();
        let config = state.config.clone();
        let door = state.entities.iter_mut().find(|e| e.id == id).unwrap();
        assert!(!door.try_pass(carpet, &config));

        assert_eq!(tick(&mut state, &TickInput::default(), 0.01), None);
        let successes = state
            .drain_events()
            .into_iter()
            .filter(|e| matches!(e, GameEvent::Succeeded { .. }))
            .count();
        assert_eq!(successes, 1);
    }

    #[test]
    fn test_collision_beats_passage_in_same_frame() {
        let mut state = quiet_state();
        state.push_entity(EntityKind::Door { passed: false }, Vec3::new(0.0, 6.0, -0.2));
        state.push_entity(EntityKind::Obstacle(Shape::Rocks), Vec3::new(0.0, 0.0, -0.2));
        tick(&mut state, &TickInput::default(), 0.01);
        assert!(matches!(state.outcome, Outcome::Failed(FailureCause::Collision { .. })));
    }

    #[test]
    fn test_retired_entities_leave_collection() {
        let mut state = quiet_state();
        let id = state.push_entity(
            EntityKind::Obstacle(Shape::Wall),
            Vec3::new(0.0, 0.0, 19.9),
        );
        tick(&mut state, &TickInput::default(), DT);
        assert!(state.entity(id).is_none());
        assert!(state.drain_events().contains(&GameEvent::EntityRetired { id }));
        assert_eq!(state.outcome, Outcome::Running);
    }

    #[test]
    fn test_clamped_motion_never_leaves_bounds() {
        let mut state = quiet_state();
        let input = TickInput {
            offset: Vec2::new(state.config.bounds.x + 1.0, -100.0),
        };
        for _ in 0..1000 {
            tick(&mut state, &input, DT);
            state.entities.clear();
        }
        assert_eq!(state.outcome, Outcome::Running);
        assert!(state.carpet.current.x <= state.config.bounds.x);
    }

    #[test]
    fn test_out_of_bounds_fails_run() {
        let mut config = quiet_config();
        config.carpet.max_offset = 30.0;
        config.carpet.smoothing = 1.0;
        let mut state = GameState::new(3, config);
        let input = TickInput {
            offset: Vec2::new(100.0, 0.0),
        };
        tick(&mut state, &input, DT);
        state.entities.clear();
        assert_eq!(state.outcome, Outcome::Failed(FailureCause::OutOfBounds));
    }

    #[test]
    fn test_determinism() {
        // Two states with same seed should produce identical results
        let mut state1 = GameState::new(99999, Config::default());
        let mut state2 = GameState::new(99999, Config::default());
        let input = TickInput {
            offset: Vec2::new(0.3, -0.1),
        };
        for _ in 0..600 {
            tick(&mut state1, &input, DT);
            tick(&mut state2, &input, DT);
        }
        assert_eq!(state1.entities, state2.entities);
        assert_eq!(state1.outcome, state2.outcome);
        assert_eq!(state1.carpet, state2.carpet);
    }

    proptest! {
        #[test]
        fn prop_distance_monotonic(seed in any::<u64>(), dts in prop::collection::vec(0.0f32..0.5, 1..300)) {
            let mut state = GameState::new(seed, Config::default());
            let mut last = state.distance;
            for dt in dts {
                tick(&mut state, &TickInput::default(), dt);
                prop_assert!(state.distance >= last);
                last = state.distance;
            }
        }

        #[test]
        fn prop_terminal_state_is_frozen(
            seed in any::<u64>(),
            succeed in any::<bool>(),
            dts in prop::collection::vec(0.0f32..0.5, 1..50),
            ox in -50.0f32..50.0,
        ) {
            let mut state = GameState::new(seed, Config::default());
            for _ in 0..30 {
                tick(&mut state, &TickInput::default(), DT);
            }
            state.finish(if succeed {
                Outcome::Succeeded
            } else {
                Outcome::Failed(FailureCause::OutOfBounds)
            });
            state.drain_events();

            let snapshot = (state.distance, state.frames, state.carpet, state.entities.clone(), state.outcome.clone());
            let input = TickInput { offset: Vec2::new(ox, 1.0) };
            for dt in dts {
                prop_assert_eq!(tick(&mut state, &input, dt), None);
            }
            prop_assert_eq!(snapshot, (state.distance, state.frames, state.carpet, state.entities.clone(), state.outcome.clone()));
            prop_assert!(state.events.is_empty());
        }
    }
}
