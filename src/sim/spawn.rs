//! Spawn streams
//!
//! Obstacles and image obstacles each run on their own randomized countdown.
//! The door fires on a distance threshold, and only while no door is live.

use glam::Vec3;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::state::{EntityKind, GameState, Shape};
use crate::config::Interval;

/// Countdown that re-arms with a random interval each time it lapses
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SpawnTimer {
    /// Seconds until the next spawn; starts at 0 so the first frame spawns
    remaining: f32,
    /// Interval drawn at the last lapse
    last_interval: Option<f32>,
}

impl SpawnTimer {
    pub fn remaining(&self) -> f32 {
        self.remaining
    }

    pub fn last_interval(&self) -> Option<f32> {
        self.last_interval
    }

    /// Count down by `dt`; returns true when the timer lapsed and re-armed
    pub fn tick<R: Rng>(&mut self, dt: f32, interval: &Interval, rng: &mut R) -> bool {
        self.remaining -= dt;
        if self.remaining > 0.0 {
            return false;
        }
        let next = interval.sample(rng);
        self.remaining = next;
        self.last_interval = Some(next);
        true
    }
}

/// Distance threshold for the door
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DoorTrigger {
    /// `None` once a one-shot trigger has fired
    next_distance: Option<f32>,
}

impl DoorTrigger {
    pub fn new(spawn_distance: f32) -> Self {
        Self {
            next_distance: Some(spawn_distance),
        }
    }

    pub fn next_distance(&self) -> Option<f32> {
        self.next_distance
    }

    pub fn ready(&self, distance: f32, door_live: bool) -> bool {
        !door_live && self.next_distance.is_some_and(|d| distance >= d)
    }

    /// Re-arm past `distance`, or disarm for good
    pub fn fired(&mut self, distance: f32, respawn_spacing: Option<f32>) {
        self.next_distance = respawn_spacing.map(|spacing| distance + spacing);
    }
}

fn uniform<R: Rng>(rng: &mut R, low: f32, high: f32) -> f32 {
    if low.is_finite() && high.is_finite() && high > low {
        rng.random_range(low..=high)
    } else {
        low
    }
}

/// Spawn a random obstacle from the standard pool
pub fn spawn_obstacle(state: &mut GameState) -> u32 {
    let bounds = &state.config.bounds;
    let pool = &Shape::ALL;
    let shape = pool[state.rng.random_range(0..pool.len())];
    let x = uniform(&mut state.rng, -bounds.x, bounds.x);
    let y = uniform(&mut state.rng, 0.0, bounds.y_top);
    let z = state.config.spawn.spawn_depth;
    state.push_entity(EntityKind::Obstacle(shape), Vec3::new(x, y, z))
}

/// Spawn an image obstacle; `None` when the URL pool is empty
pub fn spawn_image_obstacle(state: &mut GameState) -> Option<u32> {
    let urls = &state.config.spawn.image_urls;
    if urls.is_empty() {
        return None;
    }
    let url = urls[state.rng.random_range(0..urls.len())].clone();
    let bounds = &state.config.bounds;
    let x = uniform(&mut state.rng, -bounds.x, bounds.x);
    let y = uniform(&mut state.rng, bounds.y_bottom, bounds.y_top);
    let z = state.config.spawn.spawn_depth;
    Some(state.push_entity(EntityKind::Image { url }, Vec3::new(x, y, z)))
}

/// Spawn the door at its fixed position
pub fn spawn_door(state: &mut GameState) -> u32 {
    let door = &state.config.door;
    let pos = Vec3::new(door.x, door.y, state.config.spawn.spawn_depth);
    log::info!("Door spawned at distance {:.0}", state.distance);
    state.push_entity(EntityKind::Door { passed: false }, pos)
}

/// Run all spawn streams for one frame
pub fn run_spawners(state: &mut GameState, dt: f32) {
    let interval = state.config.spawn.obstacle_interval;
    if state.obstacle_timer.tick(dt, &interval, &mut state.rng) {
        spawn_obstacle(state);
    }

    if !state.config.spawn.image_urls.is_empty() {
        let interval = state.config.spawn.image_interval;
        if state.image_timer.tick(dt, &interval, &mut state.rng) {
            spawn_image_obstacle(state);
        }
    }

    if state.door_trigger.ready(state.distance, state.door_live()) {
        spawn_door(state);
        let spacing = state.config.door.respawn_spacing;
        state.door_trigger.fired(state.distance, spacing);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    #[test]
    fn test_timer_fires_on_first_tick() {
        let mut rng = Pcg32::seed_from_u64(3);
        let mut timer = SpawnTimer::default();
        let interval = Interval::new(1.5, 3.0);
        assert!(timer.tick(0.016, &interval, &mut rng));
        assert!(interval.contains(timer.remaining()));
        assert!(!timer.tick(0.016, &interval, &mut rng));
    }

    #[test]
    fn test_door_trigger_one_shot() {
        let mut trigger = DoorTrigger::new(200.0);
        assert!(!trigger.ready(199.0, false));
        assert!(trigger.ready(200.0, false));
        assert!(!trigger.ready(250.0, true));
        trigger.fired(200.0, None);
        assert!(!trigger.ready(10_000.0, false));
        assert_eq!(trigger.next_distance(), None);
    }

    #[test]
    fn test_door_trigger_respawn_spacing() {
        let mut trigger = DoorTrigger::new(200.0);
        trigger.fired(201.0, Some(150.0));
        assert_eq!(trigger.next_distance(), Some(351.0));
        assert!(!trigger.ready(300.0, false));
        assert!(trigger.ready(351.0, false));
    }

    #[test]
    fn test_obstacles_spawn_in_bounds_at_depth() {
        let mut state = GameState::new(42, Config::default());
        for _ in 0..200 {
            let id = spawn_obstacle(&mut state);
            let e = state.entity(id).unwrap();
            assert!(matches!(e.kind, EntityKind::Obstacle(_)));
            assert!(e.pos.x.abs() <= 25.0);
            assert!((0.0..=20.0).contains(&e.pos.y));
            assert_eq!(e.pos.z, -150.0);
        }
    }

    #[test]
    fn test_image_obstacle_uses_pool() {
        let mut state = GameState::new(42, Config::default());
        let id = spawn_image_obstacle(&mut state).unwrap();
        let e = state.entity(id).unwrap();
        match &e.kind {
            EntityKind::Image { url } => assert!(state.config.spawn.image_urls.contains(url)),
            other => panic!("expected image, got {:?}", other),
        }
        assert!(e.pos.y >= -5.0 && e.pos.y <= 20.0);
    }

    #[test]
    fn test_empty_pool_disables_image_stream() {
        let mut config = Config::default();
        config.spawn.image_urls.clear();
        let mut state = GameState::new(42, config);
        assert_eq!(spawn_image_obstacle(&mut state), None);
        for _ in 0..600 {
            run_spawners(&mut state, 0.05);
        }
        assert!(state
            .entities
            .iter()
            .all(|e| !matches!(e.kind, EntityKind::Image { .. })));
    }

    #[test]
    fn test_only_one_door_live() {
        let mut config = Config::default();
        // Re-armed immediately, so only the live door holds back a second one
        config.door.respawn_spacing = Some(0.0);
        let mut state = GameState::new(9, config);
        state.distance = 500.0;
        for _ in 0..10 {
            run_spawners(&mut state, 0.016);
        }
        let doors = state.entities.iter().filter(|e| e.kind.is_door()).count();
        assert_eq!(doors, 1);
        assert_eq!(state.door_trigger.next_distance(), Some(500.0));

        // Once the door is gone the next one spawns
        state.entities.retain(|e| !e.kind.is_door());
        run_spawners(&mut state, 0.016);
        assert_eq!(state.entities.iter().filter(|e| e.kind.is_door()).count(), 1);
    }

    #[test]
    fn test_uniform_ignores_infinite_range() {
        let mut rng = Pcg32::seed_from_u64(1);
        assert_eq!(uniform(&mut rng, 0.0, f32::INFINITY), 0.0);
    }

    proptest! {
        #[test]
        fn prop_spawn_gap_within_interval(seed in any::<u64>(), dt in 0.001f32..0.1) {
            let mut rng = Pcg32::seed_from_u64(seed);
            let interval = Interval::new(1.5, 3.0);
            let mut timer = SpawnTimer::default();
            let mut elapsed = 0.0f64;
            let mut last_fire: Option<f64> = None;
            for _ in 0..2000 {
                elapsed += dt as f64;
                if timer.tick(dt, &interval, &mut rng) {
                    prop_assert!(interval.contains(timer.last_interval().unwrap()));
                    if let Some(prev) = last_fire {
                        let gap = elapsed - prev;
                        prop_assert!(gap >= interval.min as f64 - 1e-3);
                        prop_assert!(gap <= (interval.max + dt) as f64 + 1e-3);
                    }
                    last_fire = Some(elapsed);
                }
            }
        }
    }
}
