//! Polled input state
//!
//! Browser events write into these devices; the frame loop reads one offset
//! per frame. The offset is relative: it is added to the carpet's current
//! position, so holding a drag keeps the carpet moving.

use glam::Vec2;

use crate::config::Config;

/// Anything that yields a per-frame carpet offset
pub trait OffsetSource {
    fn offset(&self) -> Vec2;
}

/// Drag/touch gesture measured from where it started
#[derive(Debug, Clone, Default)]
pub struct DragInput {
    dragging: bool,
    start: Vec2,
    offset: Vec2,
    /// World offset for a full-viewport drag on each axis
    range: Vec2,
}

impl DragInput {
    pub fn new(config: &Config) -> Self {
        Self {
            range: Vec2::new(config.carpet.max_offset * 2.0, config.bounds.y_top * 2.0),
            ..Default::default()
        }
    }

    pub fn is_dragging(&self) -> bool {
        self.dragging
    }

    pub fn pointer_down(&mut self, x: f32, y: f32) {
        if !(x.is_finite() && y.is_finite()) {
            return;
        }
        self.dragging = true;
        self.start = Vec2::new(x, y);
    }

    /// Update the gesture; `viewport` is the canvas size in CSS pixels
    pub fn pointer_move(&mut self, x: f32, y: f32, viewport: Vec2) {
        if !self.dragging || !(x.is_finite() && y.is_finite()) {
            return;
        }
        if !(viewport.x > 0.0 && viewport.y > 0.0) || !viewport.is_finite() {
            return;
        }
        let delta = Vec2::new(x, y) - self.start;
        // Screen y grows downward
        self.offset = Vec2::new(
            delta.x / viewport.x * self.range.x,
            -delta.y / viewport.y * self.range.y,
        );
    }

    pub fn pointer_up(&mut self) {
        self.dragging = false;
        self.offset = Vec2::ZERO;
    }
}

impl OffsetSource for DragInput {
    fn offset(&self) -> Vec2 {
        self.offset
    }
}

/// On-screen stick for touch devices
#[derive(Debug, Clone, Default)]
pub struct VirtualJoystick {
    active: bool,
    center: Vec2,
    /// Normalized deflection in [-1, 1], screen orientation
    deflection: Vec2,
    radius: f32,
    dead_zone: f32,
    gain: f32,
}

impl VirtualJoystick {
    pub fn new(config: &Config) -> Self {
        Self {
            radius: config.input.joystick_radius_px,
            dead_zone: config.input.joystick_dead_zone_px,
            gain: config.input.joystick_gain,
            ..Default::default()
        }
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Knob grabbed; `center` is the stick's center on screen
    pub fn press(&mut self, center: Vec2) {
        if !center.is_finite() {
            return;
        }
        self.active = true;
        self.center = center;
        self.deflection = Vec2::ZERO;
    }

    /// Knob dragged to `point`; returns the clamped knob displacement in pixels
    pub fn drag(&mut self, point: Vec2) -> Vec2 {
        if !self.active || !point.is_finite() || self.radius <= 0.0 {
            return Vec2::ZERO;
        }
        let (radius, dead_zone) = (self.radius, self.dead_zone);
        let knob = (point - self.center).clamp_length_max(radius);
        let axis = |d: f32| if d.abs() <= dead_zone { 0.0 } else { d / radius };
        self.deflection = Vec2::new(axis(knob.x), axis(knob.y));
        knob
    }

    pub fn release(&mut self) {
        self.active = false;
        self.deflection = Vec2::ZERO;
    }
}

impl OffsetSource for VirtualJoystick {
    fn offset(&self) -> Vec2 {
        Vec2::new(self.deflection.x, -self.deflection.y) * self.gain
    }
}

/// Every device the frame loop reads from
#[derive(Debug, Clone, Default)]
pub struct InputState {
    pub drag: DragInput,
    pub joystick: VirtualJoystick,
}

impl InputState {
    pub fn new(config: &Config) -> Self {
        Self {
            drag: DragInput::new(config),
            joystick: VirtualJoystick::new(config),
        }
    }

    /// Drop any gesture in progress (restart, focus loss)
    pub fn reset(&mut self) {
        self.drag.pointer_up();
        self.joystick.release();
    }
}

impl OffsetSource for InputState {
    fn offset(&self) -> Vec2 {
        self.drag.offset() + self.joystick.offset()
    }
}
