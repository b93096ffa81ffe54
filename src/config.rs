//! Game tuning
//!
//! Defaults are the shipped balance. A JSON override can be stored in
//! LocalStorage; missing fields fall back to their defaults.

use std::fmt;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::consts::MAX_FRAME_DT;
use crate::sim::ObstacleKind;

/// How the carpet smoothing factor is applied per update
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub enum SmoothingMode {
    /// Flat factor per update call (feel depends on frame rate)
    #[default]
    PerFrame,
    /// Factor rescaled by dt so motion matches `PerFrame` at `reference_hz`
    TimeScaled { reference_hz: f32 },
}

impl SmoothingMode {
    /// Fraction of the remaining gap to close this update, in [0, 1]
    pub fn factor(&self, smoothing: f32, dt: f32) -> f32 {
        let f = match *self {
            SmoothingMode::PerFrame => smoothing,
            SmoothingMode::TimeScaled { reference_hz } => {
                1.0 - (1.0 - smoothing).powf(dt.max(0.0) * reference_hz)
            }
        };
        if f.is_finite() { f.clamp(0.0, 1.0) } else { 0.0 }
    }
}

/// Carpet motion tuning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CarpetConfig {
    /// Lateral clamp for the carpet target
    pub max_offset: f32,
    /// Exponential smoothing factor (0 = frozen, 1 = snap)
    pub smoothing: f32,
    pub smoothing_mode: SmoothingMode,
}

impl Default for CarpetConfig {
    fn default() -> Self {
        Self {
            max_offset: 15.0,
            smoothing: 0.15,
            smoothing_mode: SmoothingMode::PerFrame,
        }
    }
}

/// World bounds; leaving them ends the run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Bounds {
    pub x: f32,
    pub y_top: f32,
    pub y_bottom: f32,
}

impl Default for Bounds {
    fn default() -> Self {
        Self {
            x: 25.0,
            y_top: 20.0,
            y_bottom: -5.0,
        }
    }
}

/// Closed range of seconds between spawns
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Interval {
    pub min: f32,
    pub max: f32,
}

impl Interval {
    pub const fn new(min: f32, max: f32) -> Self {
        Self { min, max }
    }

    /// Draw a uniform value in `[min, max]`
    pub fn sample<R: Rng>(&self, rng: &mut R) -> f32 {
        if self.min.is_finite() && self.max.is_finite() && self.max > self.min {
            rng.random_range(self.min..=self.max)
        } else {
            self.min
        }
    }

    pub fn contains(&self, value: f32) -> bool {
        value >= self.min && value <= self.max
    }
}

/// Spawn/despawn depths and spawn streams
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpawnConfig {
    /// Depth new entities appear at (far, negative)
    pub spawn_depth: f32,
    /// Entities past this depth are retired
    pub despawn_depth: f32,
    pub obstacle_interval: Interval,
    pub image_interval: Interval,
    /// Pool for image obstacles; empty disables the stream
    pub image_urls: Vec<String>,
}

impl Default for SpawnConfig {
    fn default() -> Self {
        Self {
            spawn_depth: -150.0,
            despawn_depth: 20.0,
            obstacle_interval: Interval::new(1.5, 3.0),
            image_interval: Interval::new(4.0, 8.0),
            image_urls: vec![
                "assets/obstacles/lantern.png".to_string(),
                "assets/obstacles/vase.png".to_string(),
                "assets/obstacles/minaret.png".to_string(),
            ],
        }
    }
}

/// The exit door
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DoorConfig {
    /// Distance traveled before the door appears
    pub spawn_distance: f32,
    /// Re-arm the trigger this far past each door spawn (None = one door per run)
    pub respawn_spacing: Option<f32>,
    pub x: f32,
    pub y: f32,
    /// Depth window `[near, far)` in which passage is tested
    pub window_near: f32,
    pub window_far: f32,
    pub tolerance_x: f32,
    pub tolerance_y: f32,
    /// Where "Continue" leads after passing the door
    pub success_url: String,
}

impl Default for DoorConfig {
    fn default() -> Self {
        Self {
            spawn_distance: 200.0,
            respawn_spacing: None,
            x: 0.0,
            y: 6.0,
            window_near: 0.0,
            window_far: 5.0,
            tolerance_x: 5.0,
            tolerance_y: 7.0,
            success_url: "next.html".to_string(),
        }
    }
}

/// Per-type collision radii. Rings have no entry: they are flown through.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CollisionRadii {
    pub pillar: f32,
    pub wall: f32,
    pub rocks: f32,
    pub image: f32,
}

impl Default for CollisionRadii {
    fn default() -> Self {
        Self {
            pillar: 2.5,
            wall: 3.5,
            rocks: 3.0,
            image: 2.5,
        }
    }
}

impl CollisionRadii {
    /// Radius for a solid kind, `None` for passable kinds
    pub fn radius(&self, kind: ObstacleKind) -> Option<f32> {
        match kind {
            ObstacleKind::Pillar => Some(self.pillar),
            ObstacleKind::Wall => Some(self.wall),
            ObstacleKind::Rocks => Some(self.rocks),
            ObstacleKind::Image => Some(self.image),
            ObstacleKind::Ring => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CollisionConfig {
    /// Max |z| for an obstacle to count as level with the carpet
    pub depth_threshold: f32,
    pub radii: CollisionRadii,
}

impl Default for CollisionConfig {
    fn default() -> Self {
        Self {
            depth_threshold: 3.0,
            radii: CollisionRadii::default(),
        }
    }
}

/// Virtual joystick tuning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InputConfig {
    pub joystick_radius_px: f32,
    pub joystick_dead_zone_px: f32,
    /// World offset per frame at full deflection
    pub joystick_gain: f32,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            joystick_radius_px: 40.0,
            joystick_dead_zone_px: 10.0,
            joystick_gain: 6.0,
        }
    }
}

/// Complete game tuning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// World scroll rate (units/s)
    pub forward_speed: f32,
    /// Largest frame step simulated at once
    pub max_frame_dt: f32,
    pub carpet: CarpetConfig,
    pub bounds: Bounds,
    pub spawn: SpawnConfig,
    pub door: DoorConfig,
    pub collision: CollisionConfig,
    pub input: InputConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            forward_speed: 40.0,
            max_frame_dt: MAX_FRAME_DT,
            carpet: CarpetConfig::default(),
            bounds: Bounds::default(),
            spawn: SpawnConfig::default(),
            door: DoorConfig::default(),
            collision: CollisionConfig::default(),
            input: InputConfig::default(),
        }
    }
}

/// Failure to obtain a config override
#[derive(Debug)]
pub enum ConfigError {
    /// Override JSON did not parse
    Parse(serde_json::Error),
    /// Browser storage could not be read or written
    Storage(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Parse(e) => write!(f, "invalid config JSON: {}", e),
            ConfigError::Storage(msg) => write!(f, "config storage unavailable: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Parse(e) => Some(e),
            ConfigError::Storage(_) => None,
        }
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(e: serde_json::Error) -> Self {
        ConfigError::Parse(e)
    }
}

/// Replace a non-finite value with its default
fn finite(name: &str, value: &mut f32, default: f32) {
    if !value.is_finite() {
        log::warn!("config: {} = {} is not finite, using {}", name, value, default);
        *value = default;
    }
}

fn non_negative(name: &str, value: &mut f32, default: f32) {
    finite(name, value, default);
    if *value < 0.0 {
        log::warn!("config: {} = {} raised to 0", name, value);
        *value = 0.0;
    }
}

fn ordered(name: &str, interval: &mut Interval, default: Interval) {
    non_negative(name, &mut interval.min, default.min);
    non_negative(name, &mut interval.max, default.max);
    if interval.min > interval.max {
        log::warn!(
            "config: {} [{}, {}] is inverted, swapping",
            name,
            interval.min,
            interval.max
        );
        std::mem::swap(&mut interval.min, &mut interval.max);
    }
}

impl Config {
    /// LocalStorage key (used only in wasm32)
    #[allow(dead_code)]
    const STORAGE_KEY: &'static str = "carpet_runner_config";

    /// Parse a JSON override and sanitize it
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Config = serde_json::from_str(json)?;
        Ok(config.sanitized())
    }

    /// Clamp out-of-range values instead of rejecting them
    pub fn sanitized(mut self) -> Self {
        if !(self.carpet.smoothing >= 0.0 && self.carpet.smoothing <= 1.0) {
            let clamped = if self.carpet.smoothing.is_nan() {
                CarpetConfig::default().smoothing
            } else {
                self.carpet.smoothing.clamp(0.0, 1.0)
            };
            log::warn!(
                "config: carpet.smoothing = {} clamped to {}",
                self.carpet.smoothing,
                clamped
            );
            self.carpet.smoothing = clamped;
        }
        if let SmoothingMode::TimeScaled { reference_hz } = &mut self.carpet.smoothing_mode {
            if !(reference_hz.is_finite() && *reference_hz > 0.0) {
                log::warn!("config: reference_hz = {} replaced with 60", reference_hz);
                *reference_hz = 60.0;
            }
        }

        let defaults = Config::default();

        non_negative("forward_speed", &mut self.forward_speed, defaults.forward_speed);
        // Zero would clamp every frame step away
        if !(self.max_frame_dt.is_finite() && self.max_frame_dt > 0.0) {
            log::warn!(
                "config: max_frame_dt = {} replaced with {}",
                self.max_frame_dt,
                MAX_FRAME_DT
            );
            self.max_frame_dt = MAX_FRAME_DT;
        }
        non_negative(
            "carpet.max_offset",
            &mut self.carpet.max_offset,
            defaults.carpet.max_offset,
        );

        let bounds = &mut self.bounds;
        non_negative("bounds.x", &mut bounds.x, defaults.bounds.x);
        finite("bounds.y_top", &mut bounds.y_top, defaults.bounds.y_top);
        finite("bounds.y_bottom", &mut bounds.y_bottom, defaults.bounds.y_bottom);
        if bounds.y_bottom > bounds.y_top {
            log::warn!("config: bounds.y_bottom above y_top, swapping");
            std::mem::swap(&mut bounds.y_bottom, &mut bounds.y_top);
        }

        let spawn = &mut self.spawn;
        finite("spawn.spawn_depth", &mut spawn.spawn_depth, defaults.spawn.spawn_depth);
        finite(
            "spawn.despawn_depth",
            &mut spawn.despawn_depth,
            defaults.spawn.despawn_depth,
        );
        ordered(
            "spawn.obstacle_interval",
            &mut spawn.obstacle_interval,
            defaults.spawn.obstacle_interval,
        );
        ordered(
            "spawn.image_interval",
            &mut spawn.image_interval,
            defaults.spawn.image_interval,
        );

        let door = &mut self.door;
        let door_defaults = &defaults.door;
        non_negative(
            "door.spawn_distance",
            &mut door.spawn_distance,
            door_defaults.spawn_distance,
        );
        if let Some(spacing) = &mut door.respawn_spacing {
            non_negative("door.respawn_spacing", spacing, 0.0);
        }
        finite("door.x", &mut door.x, door_defaults.x);
        finite("door.y", &mut door.y, door_defaults.y);
        finite("door.window_near", &mut door.window_near, door_defaults.window_near);
        finite("door.window_far", &mut door.window_far, door_defaults.window_far);
        if door.window_near > door.window_far {
            log::warn!("config: door window inverted, swapping");
            std::mem::swap(&mut door.window_near, &mut door.window_far);
        }
        non_negative("door.tolerance_x", &mut door.tolerance_x, door_defaults.tolerance_x);
        non_negative("door.tolerance_y", &mut door.tolerance_y, door_defaults.tolerance_y);

        non_negative(
            "collision.depth_threshold",
            &mut self.collision.depth_threshold,
            defaults.collision.depth_threshold,
        );
        let radii = &mut self.collision.radii;
        let radii_defaults = &defaults.collision.radii;
        non_negative("collision.radii.pillar", &mut radii.pillar, radii_defaults.pillar);
        non_negative("collision.radii.wall", &mut radii.wall, radii_defaults.wall);
        non_negative("collision.radii.rocks", &mut radii.rocks, radii_defaults.rocks);
        non_negative("collision.radii.image", &mut radii.image, radii_defaults.image);

        let input = &mut self.input;
        non_negative(
            "input.joystick_radius_px",
            &mut input.joystick_radius_px,
            defaults.input.joystick_radius_px,
        );
        non_negative(
            "input.joystick_dead_zone_px",
            &mut input.joystick_dead_zone_px,
            defaults.input.joystick_dead_zone_px,
        );
        finite(
            "input.joystick_gain",
            &mut input.joystick_gain,
            defaults.input.joystick_gain,
        );

        self
    }

    /// Load the override from LocalStorage (WASM only)
    #[cfg(target_arch = "wasm32")]
    pub fn load() -> Self {
        match Self::read_storage() {
            Ok(Some(config)) => {
                log::info!("Loaded config override from LocalStorage");
                config
            }
            Ok(None) => {
                log::info!("Using default config");
                Self::default()
            }
            Err(e) => {
                log::warn!("{}, using default config", e);
                Self::default()
            }
        }
    }

    #[cfg(target_arch = "wasm32")]
    fn read_storage() -> Result<Option<Self>, ConfigError> {
        let storage = web_sys::window()
            .and_then(|w| w.local_storage().ok())
            .flatten()
            .ok_or_else(|| ConfigError::Storage("no LocalStorage".to_string()))?;
        let json = storage
            .get_item(Self::STORAGE_KEY)
            .map_err(|_| ConfigError::Storage("read failed".to_string()))?;
        json.map(|j| Self::from_json(&j)).transpose()
    }

    /// Save this config as the LocalStorage override (WASM only)
    #[cfg(target_arch = "wasm32")]
    pub fn save(&self) -> Result<(), ConfigError> {
        let storage = web_sys::window()
            .and_then(|w| w.local_storage().ok())
            .flatten()
            .ok_or_else(|| ConfigError::Storage("no LocalStorage".to_string()))?;
        let json = serde_json::to_string(self)?;
        storage
            .set_item(Self::STORAGE_KEY, &json)
            .map_err(|_| ConfigError::Storage("write failed".to_string()))?;
        log::info!("Config saved");
        Ok(())
    }

    /// Native stubs
    #[cfg(not(target_arch = "wasm32"))]
    pub fn load() -> Self {
        Self::default()
    }

    #[cfg(not(target_arch = "wasm32"))]
    pub fn save(&self) -> Result<(), ConfigError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::{GameState, TickInput, tick};
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    #[test]
    fn test_defaults_match_shipped_balance() {
        let c = Config::default();
        assert_eq!(c.forward_speed, 40.0);
        assert_eq!(c.carpet.max_offset, 15.0);
        assert_eq!(c.carpet.smoothing, 0.15);
        assert_eq!(c.bounds, Bounds { x: 25.0, y_top: 20.0, y_bottom: -5.0 });
        assert_eq!(c.spawn.spawn_depth, -150.0);
        assert_eq!(c.spawn.despawn_depth, 20.0);
        assert_eq!(c.spawn.obstacle_interval, Interval::new(1.5, 3.0));
        assert_eq!(c.door.spawn_distance, 200.0);
        assert_eq!(c.max_frame_dt, 0.1);
    }

    #[test]
    fn test_partial_override_keeps_defaults() {
        let c = Config::from_json(r#"{ "forward_speed": 55.0, "door": { "y": 4.0 } }"#).unwrap();
        assert_eq!(c.forward_speed, 55.0);
        assert_eq!(c.door.y, 4.0);
        assert_eq!(c.door.tolerance_y, 7.0);
        assert_eq!(c.carpet, CarpetConfig::default());
    }

    #[test]
    fn test_bad_json_is_an_error() {
        let err = Config::from_json("{ forward_speed: ").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
        assert!(err.to_string().starts_with("invalid config JSON"));
    }

    #[test]
    fn test_sanitize_clamps_instead_of_rejecting() {
        let json = r#"{
            "carpet": { "smoothing": 3.0 },
            "spawn": { "obstacle_interval": { "min": 4.0, "max": 2.0 } },
            "door": { "window_near": 5.0, "window_far": -1.0 },
            "forward_speed": -10.0
        }"#;
        let c = Config::from_json(json).unwrap();
        assert_eq!(c.carpet.smoothing, 1.0);
        assert_eq!(c.spawn.obstacle_interval, Interval::new(2.0, 4.0));
        assert_eq!((c.door.window_near, c.door.window_far), (-1.0, 5.0));
        assert_eq!(c.forward_speed, 0.0);
    }

    #[test]
    fn test_smoothing_mode_variant_round_trips() {
        let json = r#"{ "carpet": { "smoothing_mode": { "TimeScaled": { "reference_hz": 60.0 } } } }"#;
        let c = Config::from_json(json).unwrap();
        assert_eq!(
            c.carpet.smoothing_mode,
            SmoothingMode::TimeScaled { reference_hz: 60.0 }
        );
    }

    #[test]
    fn test_time_scaled_matches_per_frame_at_reference_rate() {
        let scaled = SmoothingMode::TimeScaled { reference_hz: 60.0 };
        let f = scaled.factor(0.15, 1.0 / 60.0);
        assert!((f - 0.15).abs() < 1e-5);

        // Two half-steps close the same gap as one full step
        let half = scaled.factor(0.15, 1.0 / 120.0);
        let remaining = (1.0 - half) * (1.0 - half);
        assert!((remaining - 0.85).abs() < 1e-5);

        assert_eq!(SmoothingMode::PerFrame.factor(0.15, 0.5), 0.15);
    }

    #[test]
    fn test_ring_has_no_radius() {
        let radii = CollisionRadii::default();
        assert_eq!(radii.radius(ObstacleKind::Ring), None);
        assert_eq!(radii.radius(ObstacleKind::Wall), Some(3.5));
    }

    #[test]
    fn test_interval_sample_in_range() {
        let mut rng = Pcg32::seed_from_u64(7);
        let interval = Interval::new(1.5, 3.0);
        for _ in 0..1000 {
            assert!(interval.contains(interval.sample(&mut rng)));
        }
        assert_eq!(Interval::new(2.0, 2.0).sample(&mut rng), 2.0);
    }

    #[test]
    fn test_infinite_sample_bounds_fall_back_to_min() {
        let mut rng = Pcg32::seed_from_u64(7);
        assert_eq!(Interval::new(1.5, f32::INFINITY).sample(&mut rng), 1.5);
    }

    fn run_frames(config: Config, frames: u32) -> GameState {
        let mut state = GameState::new(5, config);
        for _ in 0..frames {
            tick(&mut state, &TickInput::default(), 1.0 / 60.0);
        }
        state
    }

    #[test]
    fn test_overflowing_bounds_reset_to_default() {
        // 1e39 overflows f32 and parses as infinity
        let c = Config::from_json(r#"{ "bounds": { "y_top": 1e39 } }"#).unwrap();
        assert_eq!(c.bounds.y_top, Bounds::default().y_top);

        let state = run_frames(c, 10);
        assert_eq!(state.frames, 10);
        assert!(!state.entities.is_empty());
    }

    #[test]
    fn test_overflowing_interval_reset_to_default() {
        let json = r#"{ "spawn": { "obstacle_interval": { "min": 1.5, "max": 1e39 } } }"#;
        let c = Config::from_json(json).unwrap();
        assert_eq!(c.spawn.obstacle_interval, Interval::new(1.5, 3.0));

        let state = run_frames(c, 10);
        assert_eq!(state.frames, 10);
    }

    #[test]
    fn test_non_positive_max_frame_dt_restored() {
        for json in [r#"{ "max_frame_dt": -1.0 }"#, r#"{ "max_frame_dt": 0.0 }"#] {
            let c = Config::from_json(json).unwrap();
            assert_eq!(c.max_frame_dt, MAX_FRAME_DT);

            let state = run_frames(c, 100);
            assert_eq!(state.frames, 100);
            assert!(state.distance > 0.0);
        }
    }
}
