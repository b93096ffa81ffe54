//! Game state and core simulation types
//!
//! Everything the frame loop mutates lives here, owned by one `GameState`.

use glam::{Vec2, Vec3};
use rand::SeedableRng;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::collision;
use super::spawn::{DoorTrigger, SpawnTimer};
use crate::config::Config;

/// Primitive obstacle shapes the regular stream spawns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Shape {
    Pillar,
    /// Floating ring, flown through rather than avoided
    Ring,
    Wall,
    Rocks,
}

impl Shape {
    /// Pool the regular obstacle stream draws from
    pub const ALL: [Shape; 4] = [Shape::Pillar, Shape::Ring, Shape::Wall, Shape::Rocks];
}

/// Collision class of anything that is not a door. Image obstacles get
/// their own class; the URL lives on `EntityKind::Image`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ObstacleKind {
    Pillar,
    Ring,
    Wall,
    Rocks,
    Image,
}

impl ObstacleKind {
    pub fn is_passable(self) -> bool {
        self == ObstacleKind::Ring
    }
}

impl From<Shape> for ObstacleKind {
    fn from(shape: Shape) -> Self {
        match shape {
            Shape::Pillar => ObstacleKind::Pillar,
            Shape::Ring => ObstacleKind::Ring,
            Shape::Wall => ObstacleKind::Wall,
            Shape::Rocks => ObstacleKind::Rocks,
        }
    }
}

/// What an entity is
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EntityKind {
    Obstacle(Shape),
    /// Image obstacle with its texture URL
    Image { url: String },
    /// The exit; `passed` latches on first passage
    Door { passed: bool },
}

impl EntityKind {
    /// Collision class, `None` for doors
    pub fn obstacle_kind(&self) -> Option<ObstacleKind> {
        match self {
            EntityKind::Obstacle(shape) => Some((*shape).into()),
            EntityKind::Image { .. } => Some(ObstacleKind::Image),
            EntityKind::Door { .. } => None,
        }
    }

    pub fn is_door(&self) -> bool {
        matches!(self, EntityKind::Door { .. })
    }
}

/// A world object scrolling toward the player
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub id: u32,
    pub kind: EntityKind,
    /// z grows toward (and past) the player plane at 0
    pub pos: Vec3,
}

impl Entity {
    /// Scroll toward the camera
    pub fn advance(&mut self, dt: f32, forward_speed: f32) {
        self.pos.z += forward_speed * dt;
    }

    /// Rings and doors never end the run on contact
    pub fn passable(&self) -> bool {
        match &self.kind {
            EntityKind::Door { .. } => true,
            kind => kind.obstacle_kind().is_some_and(ObstacleKind::is_passable),
        }
    }

    /// Has scrolled past the camera
    pub fn is_retired(&self, despawn_depth: f32) -> bool {
        self.pos.z > despawn_depth
    }

    /// Solid obstacle overlapping the carpet this frame
    pub fn collides_with(&self, carpet: Vec2, config: &Config) -> bool {
        match self.kind.obstacle_kind() {
            Some(kind) => collision::obstacle_hit(kind, self.pos, carpet, &config.collision),
            None => false,
        }
    }

    /// Mark a door passed if the carpet is inside its window; true only the first time
    pub fn try_pass(&mut self, carpet: Vec2, config: &Config) -> bool {
        let pos = self.pos;
        match &mut self.kind {
            EntityKind::Door { passed } if !*passed => {
                if collision::door_passage(pos, carpet, &config.door) {
                    *passed = true;
                    true
                } else {
                    false
                }
            }
            _ => false,
        }
    }
}

/// The player's carpet
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Carpet {
    /// Desired position, always within bounds
    pub target: Vec2,
    /// Smoothed actual position
    pub current: Vec2,
}

impl Carpet {
    /// Clamp and store the desired position
    pub fn set_target(&mut self, x: f32, y: f32, config: &Config) {
        let max = config.carpet.max_offset;
        let (bottom, top) = (config.bounds.y_bottom, config.bounds.y_top);
        if x.is_finite() {
            self.target.x = x.clamp(-max, max);
        }
        if y.is_finite() {
            self.target.y = y.clamp(bottom, top);
        }
    }

    /// Move toward the target by exponential smoothing
    pub fn update(&mut self, dt: f32, config: &Config) {
        let carpet = &config.carpet;
        let f = carpet.smoothing_mode.factor(carpet.smoothing, dt);
        self.current += (self.target - self.current) * f;

        // Guard against float rounding past the clamped target
        let max = carpet.max_offset;
        self.current.x = self.current.x.clamp(-max, max);
        self.current.y = self
            .current
            .y
            .clamp(config.bounds.y_bottom, config.bounds.y_top);
    }

    pub fn position(&self) -> Vec2 {
        self.current
    }
}

/// Why a run failed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FailureCause {
    Collision { id: u32, kind: ObstacleKind },
    OutOfBounds,
}

/// Session outcome; both terminal variants are absorbing
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub enum Outcome {
    #[default]
    Running,
    Failed(FailureCause),
    Succeeded,
}

impl Outcome {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Outcome::Running)
    }
}

/// Lifecycle notifications, drained by the session each frame
#[derive(Debug, Clone, PartialEq)]
pub enum GameEvent {
    EntitySpawned { id: u32 },
    EntityRetired { id: u32 },
    Failed { distance: f32, cause: FailureCause },
    Succeeded { distance: f32 },
}

/// Complete simulation state for one run
#[derive(Debug, Clone)]
pub struct GameState {
    /// Run seed for reproducibility
    pub seed: u64,
    pub(crate) rng: Pcg32,
    pub config: Config,
    /// Total distance flown
    pub distance: f32,
    /// Simulated frame counter
    pub frames: u64,
    pub outcome: Outcome,
    pub carpet: Carpet,
    /// Active obstacles and doors, in spawn order
    pub entities: Vec<Entity>,
    pub obstacle_timer: SpawnTimer,
    pub image_timer: SpawnTimer,
    pub door_trigger: DoorTrigger,
    /// Events produced since the last drain
    pub events: Vec<GameEvent>,
    next_id: u32,
}

impl GameState {
    pub fn new(seed: u64, config: Config) -> Self {
        let door_trigger = DoorTrigger::new(config.door.spawn_distance);
        Self {
            seed,
            rng: Pcg32::seed_from_u64(seed),
            config,
            distance: 0.0,
            frames: 0,
            outcome: Outcome::Running,
            carpet: Carpet::default(),
            entities: Vec::new(),
            obstacle_timer: SpawnTimer::default(),
            image_timer: SpawnTimer::default(),
            door_trigger,
            events: Vec::new(),
            next_id: 1,
        }
    }

    /// Allocate a new entity ID
    pub fn next_entity_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Insert an entity and announce it
    pub fn push_entity(&mut self, kind: EntityKind, pos: Vec3) -> u32 {
        let id = self.next_entity_id();
        log::debug!("spawn #{} {:?} at {:?}", id, kind, pos);
        self.entities.push(Entity { id, kind, pos });
        self.events.push(GameEvent::EntitySpawned { id });
        id
    }

    pub fn entity(&self, id: u32) -> Option<&Entity> {
        self.entities.iter().find(|e| e.id == id)
    }

    pub fn door_live(&self) -> bool {
        self.entities.iter().any(|e| e.kind.is_door())
    }

    pub fn is_running(&self) -> bool {
        !self.outcome.is_terminal()
    }

    /// Enter a terminal state; ignored once terminal
    pub fn finish(&mut self, outcome: Outcome) {
        if self.outcome.is_terminal() {
            return;
        }
        let event = match &outcome {
            Outcome::Running => return,
            Outcome::Failed(cause) => {
                log::info!("Run failed at {:.0} ({:?})", self.distance, cause);
                GameEvent::Failed {
                    distance: self.distance,
                    cause: cause.clone(),
                }
            }
            Outcome::Succeeded => {
                log::info!("Door passed at {:.0}", self.distance);
                GameEvent::Succeeded {
                    distance: self.distance,
                }
            }
        };
        self.outcome = outcome;
        self.events.push(event);
    }

    /// Take the pending events
    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }
}
