//! Play session
//!
//! `GameSession` owns one run: the simulation state plus the collaborators
//! that present it. The simulation only emits events; the session turns
//! them into render-handle creation/disposal and HUD callbacks.

use std::collections::BTreeMap;
use std::fmt;

use glam::{Vec2, Vec3};

use crate::config::Config;
use crate::input::OffsetSource;
use crate::sim::{Entity, GameEvent, GameState, TickInput, tick};

/// A decorative asset (texture, model) that failed to load
#[derive(Debug, Clone, PartialEq)]
pub struct AssetError {
    pub url: String,
    pub reason: String,
}

impl fmt::Display for AssetError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "failed to load asset {}: {}", self.url, self.reason)
    }
}

impl std::error::Error for AssetError {}

/// Visual side of entities and the carpet. Handles are opaque to the core.
pub trait SceneBackend {
    type Handle;

    /// Build the visual for a freshly spawned entity
    fn create(&mut self, entity: &Entity) -> Result<Self::Handle, AssetError>;
    fn set_position(&mut self, handle: &mut Self::Handle, pos: Vec3);
    /// Release everything the handle holds
    fn dispose(&mut self, handle: Self::Handle);
    fn move_carpet(&mut self, pos: Vec2);
}

/// Ambient dressing (sky, stars, clouds)
pub trait Environment {
    fn update(&mut self, dt: f32, forward_speed: f32);
}

/// HUD and end-of-run screens
pub trait Presenter {
    /// Called after every simulated frame
    fn on_distance(&mut self, _distance: f32) {}
    fn on_failure(&mut self, final_distance: f32);
    /// `destination` is where "Continue" should lead
    fn on_success(&mut self, final_distance: f32, destination: &str);
}

/// One play session; restart resets it in place
pub struct GameSession<S: SceneBackend, E, P> {
    state: GameState,
    scene: S,
    environment: E,
    presenter: P,
    /// Live render handles by entity id
    handles: BTreeMap<u32, S::Handle>,
}

impl<S, E, P> GameSession<S, E, P>
where
    S: SceneBackend,
    E: Environment,
    P: Presenter,
{
    pub fn new(config: Config, seed: u64, scene: S, environment: E, presenter: P) -> Self {
        if config.spawn.image_urls.is_empty() {
            log::info!("No image URLs configured, image obstacles disabled");
        }
        log::info!("Session started with seed {}", seed);
        Self {
            state: GameState::new(seed, config),
            scene,
            environment,
            presenter,
            handles: BTreeMap::new(),
        }
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn config(&self) -> &Config {
        &self.state.config
    }

    pub fn scene(&self) -> &S {
        &self.scene
    }

    pub fn environment(&self) -> &E {
        &self.environment
    }

    pub fn presenter(&self) -> &P {
        &self.presenter
    }

    pub fn presenter_mut(&mut self) -> &mut P {
        &mut self.presenter
    }

    /// Number of entities that currently have a visual
    pub fn handle_count(&self) -> usize {
        self.handles.len()
    }

    /// Run one display frame. Returns the simulated step, `None` if nothing moved.
    pub fn frame<I: OffsetSource + ?Sized>(&mut self, dt: f32, input: &I) -> Option<f32> {
        let tick_input = TickInput {
            offset: input.offset(),
        };
        let stepped = tick(&mut self.state, &tick_input, dt);
        if let Some(dt) = stepped {
            self.environment.update(dt, self.state.config.forward_speed);
        }

        let mut terminal = Vec::new();
        for event in self.state.drain_events() {
            match event {
                GameEvent::EntitySpawned { id } => self.attach(id),
                GameEvent::EntityRetired { id } => self.detach(id),
                other => terminal.push(other),
            }
        }

        if stepped.is_some() {
            self.sync_visuals();
            self.presenter.on_distance(self.state.distance);
        }

        for event in terminal {
            match event {
                GameEvent::Failed { distance, .. } => self.presenter.on_failure(distance),
                GameEvent::Succeeded { distance } => {
                    let destination = self.state.config.door.success_url.clone();
                    self.presenter.on_success(distance, &destination);
                }
                _ => {}
            }
        }

        stepped
    }

    /// Throw away the run and start a fresh one
    pub fn restart(&mut self, seed: u64) {
        for (_, handle) in std::mem::take(&mut self.handles) {
            self.scene.dispose(handle);
        }
        let config = self.state.config.clone();
        self.state = GameState::new(seed, config);
        self.scene.move_carpet(self.state.carpet.position());
        log::info!("Session restarted with seed {}", seed);
    }

    fn attach(&mut self, id: u32) {
        let Some(entity) = self.state.entity(id) else {
            return;
        };
        match self.scene.create(entity) {
            Ok(mut handle) => {
                self.scene.set_position(&mut handle, entity.pos);
                self.handles.insert(id, handle);
            }
            // The entity still takes part in collisions without a visual
            Err(e) => log::warn!("{} (entity #{} kept without visual)", e, id),
        }
    }

    fn detach(&mut self, id: u32) {
        if let Some(handle) = self.handles.remove(&id) {
            self.scene.dispose(handle);
        }
    }

    fn sync_visuals(&mut self) {
        for entity in &self.state.entities {
            if let Some(handle) = self.handles.get_mut(&entity.id) {
                self.scene.set_position(handle, entity.pos);
            }
        }
        self.scene.move_carpet(self.state.carpet.position());
    }
}
