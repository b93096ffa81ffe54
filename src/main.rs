//! Carpet Runner entry point
//!
//! Handles platform-specific initialization and runs the game loop.

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

#[cfg(target_arch = "wasm32")]
mod wasm_game {
    use std::cell::RefCell;
    use std::rc::Rc;

    use glam::Vec2;
    use wasm_bindgen::prelude::*;
    use web_sys::{Element, HtmlCanvasElement, HtmlElement, MouseEvent, TouchEvent};

    use carpet_runner::config::Config;
    use carpet_runner::headless::{HeadlessScene, StillEnvironment};
    use carpet_runner::input::InputState;
    use carpet_runner::session::{GameSession, Presenter};

    /// How long the instructions stay up (ms)
    const INSTRUCTIONS_MS: i32 = 5000;

    /// DOM HUD and end-of-run overlay
    struct DomHud {
        distance: Option<Element>,
        overlay: Option<Element>,
        final_distance: Option<Element>,
        title: Option<Element>,
        button: Option<Element>,
        /// Set after passing the door; the button then redirects
        destination: Option<String>,
        shown_distance: u32,
    }

    impl DomHud {
        fn new() -> Self {
            let document = web_sys::window().and_then(|w| w.document());
            let get = |id: &str| document.as_ref().and_then(|d| d.get_element_by_id(id));
            Self {
                distance: get("distance"),
                overlay: get("gameOver"),
                final_distance: get("finalDistance"),
                title: document
                    .as_ref()
                    .and_then(|d| d.query_selector("#gameOver h1").ok().flatten()),
                button: get("gameOverButton"),
                destination: None,
                shown_distance: 0,
            }
        }

        fn show_overlay(&self, final_distance: f32) {
            if let Some(el) = &self.final_distance {
                el.set_text_content(Some(&(final_distance as u32).to_string()));
            }
            if let Some(el) = &self.overlay {
                let _ = el.set_attribute("style", "display: block");
            }
        }

        /// Back to the in-play look after a restart
        fn reset(&mut self) {
            self.destination = None;
            self.shown_distance = 0;
            if let Some(el) = &self.overlay {
                let _ = el.set_attribute("style", "display: none");
            }
            if let Some(el) = &self.title {
                el.set_text_content(Some("Game Over"));
                let _ = el.remove_attribute("style");
            }
            if let Some(el) = &self.button {
                el.set_text_content(Some("Play Again"));
            }
            if let Some(el) = &self.distance {
                el.set_text_content(Some("0"));
            }
        }
    }

    impl Presenter for DomHud {
        fn on_distance(&mut self, distance: f32) {
            let whole = distance as u32;
            if whole != self.shown_distance {
                self.shown_distance = whole;
                if let Some(el) = &self.distance {
                    el.set_text_content(Some(&whole.to_string()));
                }
            }
        }

        fn on_failure(&mut self, final_distance: f32) {
            self.show_overlay(final_distance);
        }

        fn on_success(&mut self, final_distance: f32, destination: &str) {
            if let Some(el) = &self.title {
                el.set_text_content(Some("Success!"));
                let _ = el.set_attribute("style", "color: #00ff00");
            }
            if let Some(el) = &self.button {
                el.set_text_content(Some("Continue"));
            }
            self.destination = Some(destination.to_string());
            self.show_overlay(final_distance);
        }
    }

    /// Game instance holding all state
    struct Game {
        session: GameSession<HeadlessScene, StillEnvironment, DomHud>,
        input: InputState,
        last_time: f64,
    }

    impl Game {
        fn new(seed: u64) -> Self {
            let config = Config::load();
            let input = InputState::new(&config);
            Self {
                session: GameSession::new(
                    config,
                    seed,
                    HeadlessScene::default(),
                    StillEnvironment::default(),
                    DomHud::new(),
                ),
                input,
                last_time: 0.0,
            }
        }

        fn update(&mut self, time: f64) {
            let dt = if self.last_time > 0.0 {
                ((time - self.last_time) / 1000.0) as f32
            } else {
                0.0
            };
            self.last_time = time;
            self.session.frame(dt, &self.input);
        }

        /// Reset state for restart
        fn restart(&mut self, seed: u64) {
            self.session.restart(seed);
            self.session.presenter_mut().reset();
            self.input.reset();
        }
    }

    fn viewport() -> Vec2 {
        let Some(window) = web_sys::window() else {
            return Vec2::ZERO;
        };
        let w = window.inner_width().ok().and_then(|v| v.as_f64()).unwrap_or(0.0);
        let h = window.inner_height().ok().and_then(|v| v.as_f64()).unwrap_or(0.0);
        Vec2::new(w as f32, h as f32)
    }

    pub fn run() {
        console_error_panic_hook::set_once();
        if console_log::init_with_level(log::Level::Info).is_err() {
            web_sys::console::warn_1(&"logger already initialized".into());
        }
        log::info!("Carpet Runner starting...");

        let Some(window) = web_sys::window() else {
            return;
        };
        let Some(document) = window.document() else {
            return;
        };
        // Input surface only; the HUD is the visible output
        let Some(canvas) = document
            .get_element_by_id("canvas")
            .and_then(|el| el.dyn_into::<HtmlCanvasElement>().ok())
        else {
            log::error!("no #canvas element");
            return;
        };

        let seed = js_sys::Date::now() as u64;
        let game = Rc::new(RefCell::new(Game::new(seed)));

        setup_pointer_handlers(&canvas, game.clone());
        setup_joystick(game.clone());
        setup_end_button(game.clone());
        hide_instructions_later();

        request_animation_frame(game);
        log::info!("Carpet Runner running!");
    }

    fn setup_pointer_handlers(canvas: &HtmlCanvasElement, game: Rc<RefCell<Game>>) {
        // Mouse down - start drag
        {
            let game = game.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |event: MouseEvent| {
                game.borrow_mut()
                    .input
                    .drag
                    .pointer_down(event.client_x() as f32, event.client_y() as f32);
            });
            let _ = canvas
                .add_event_listener_with_callback("mousedown", closure.as_ref().unchecked_ref());
            closure.forget();
        }

        // Mouse move
        {
            let game = game.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |event: MouseEvent| {
                game.borrow_mut().input.drag.pointer_move(
                    event.client_x() as f32,
                    event.client_y() as f32,
                    viewport(),
                );
            });
            let _ = canvas
                .add_event_listener_with_callback("mousemove", closure.as_ref().unchecked_ref());
            closure.forget();
        }

        // Mouse up / leave - end drag
        for name in ["mouseup", "mouseleave"] {
            let game = game.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |_event: MouseEvent| {
                game.borrow_mut().input.drag.pointer_up();
            });
            let _ = canvas.add_event_listener_with_callback(name, closure.as_ref().unchecked_ref());
            closure.forget();
        }

        // Touch start / move
        for name in ["touchstart", "touchmove"] {
            let game = game.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |event: TouchEvent| {
                event.prevent_default();
                let Some(touch) = event.touches().get(0) else {
                    return;
                };
                let (x, y) = (touch.client_x() as f32, touch.client_y() as f32);
                let mut g = game.borrow_mut();
                if event.type_() == "touchstart" {
                    g.input.drag.pointer_down(x, y);
                } else {
                    g.input.drag.pointer_move(x, y, viewport());
                }
            });
            let _ = canvas.add_event_listener_with_callback(name, closure.as_ref().unchecked_ref());
            closure.forget();
        }

        // Touch end
        {
            let closure = Closure::<dyn FnMut(_)>::new(move |event: TouchEvent| {
                event.prevent_default();
                game.borrow_mut().input.drag.pointer_up();
            });
            let _ = canvas
                .add_event_listener_with_callback("touchend", closure.as_ref().unchecked_ref());
            closure.forget();
        }
    }

    /// Virtual joystick, if the page provides one
    fn setup_joystick(game: Rc<RefCell<Game>>) {
        let Some(document) = web_sys::window().and_then(|w| w.document()) else {
            return;
        };
        let Some(stick) = document.get_element_by_id("virtual-joystick") else {
            return;
        };
        let knob = document
            .get_element_by_id("virtual-joystick-knob")
            .and_then(|el| el.dyn_into::<HtmlElement>().ok());

        // Grab
        {
            let game = game.clone();
            let stick_clone = stick.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |event: TouchEvent| {
                event.prevent_default();
                let rect = stick_clone.get_bounding_client_rect();
                let center = Vec2::new(
                    (rect.left() + rect.width() / 2.0) as f32,
                    (rect.top() + rect.height() / 2.0) as f32,
                );
                game.borrow_mut().input.joystick.press(center);
            });
            let _ = stick
                .add_event_listener_with_callback("touchstart", closure.as_ref().unchecked_ref());
            closure.forget();
        }

        // Drag
        {
            let game = game.clone();
            let knob = knob.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |event: TouchEvent| {
                event.prevent_default();
                let Some(touch) = event.touches().get(0) else {
                    return;
                };
                let point = Vec2::new(touch.client_x() as f32, touch.client_y() as f32);
                let moved = game.borrow_mut().input.joystick.drag(point);
                if let Some(knob) = &knob {
                    let transform = format!(
                        "translate(calc(-50% + {}px), calc(-50% + {}px))",
                        moved.x, moved.y
                    );
                    let _ = knob.style().set_property("transform", &transform);
                }
            });
            let _ = stick
                .add_event_listener_with_callback("touchmove", closure.as_ref().unchecked_ref());
            closure.forget();
        }

        // Release
        {
            let closure = Closure::<dyn FnMut(_)>::new(move |_event: TouchEvent| {
                game.borrow_mut().input.joystick.release();
                if let Some(knob) = &knob {
                    let _ = knob.style().set_property("transform", "translate(-50%, -50%)");
                }
            });
            let _ = stick
                .add_event_listener_with_callback("touchend", closure.as_ref().unchecked_ref());
            closure.forget();
        }
    }

    /// Restart after a crash, continue after the door
    fn setup_end_button(game: Rc<RefCell<Game>>) {
        let Some(document) = web_sys::window().and_then(|w| w.document()) else {
            return;
        };
        let Some(btn) = document.get_element_by_id("gameOverButton") else {
            return;
        };
        let closure = Closure::<dyn FnMut(_)>::new(move |_event: MouseEvent| {
            let mut g = game.borrow_mut();
            if let Some(url) = g.session.presenter().destination.clone() {
                if let Some(window) = web_sys::window() {
                    let _ = window.location().set_href(&url);
                }
                return;
            }
            let seed = js_sys::Date::now() as u64;
            g.restart(seed);
        });
        let _ = btn.add_event_listener_with_callback("click", closure.as_ref().unchecked_ref());
        closure.forget();
    }

    fn hide_instructions_later() {
        let Some(window) = web_sys::window() else {
            return;
        };
        let closure = Closure::once(move || {
            if let Some(el) = web_sys::window()
                .and_then(|w| w.document())
                .and_then(|d| d.get_element_by_id("instructions"))
            {
                let _ = el.set_attribute("style", "display: none");
            }
        });
        let _ = window.set_timeout_with_callback_and_timeout_and_arguments_0(
            closure.as_ref().unchecked_ref(),
            INSTRUCTIONS_MS,
        );
        closure.forget();
    }

    fn request_animation_frame(game: Rc<RefCell<Game>>) {
        let Some(window) = web_sys::window() else {
            return;
        };
        let closure = Closure::once(move |time: f64| {
            game_loop(game, time);
        });
        let _ = window.request_animation_frame(closure.as_ref().unchecked_ref());
        closure.forget();
    }

    fn game_loop(game: Rc<RefCell<Game>>, time: f64) {
        game.borrow_mut().update(time);
        request_animation_frame(game);
    }
}

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub fn wasm_main() {
    wasm_game::run();
}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    use std::time::{SystemTime, UNIX_EPOCH};

    use carpet_runner::config::Config;
    use carpet_runner::consts::HEADLESS_DT;
    use carpet_runner::headless::{Autopilot, HeadlessScene, HudLog, StillEnvironment};
    use carpet_runner::session::GameSession;
    use carpet_runner::sim::Outcome;

    /// Simulated seconds before the headless run gives up
    const MAX_SECONDS: f32 = 120.0;

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    log::info!("Carpet Runner (native, headless autopilot) starting...");

    // Usage: carpet-runner [seed] [config.json]
    let mut args = std::env::args().skip(1);
    let seed = args
        .next()
        .and_then(|s| s.parse::<u64>().ok())
        .unwrap_or_else(|| {
            SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_millis() as u64)
                .unwrap_or(0)
        });
    let config = match args.next() {
        Some(path) => match std::fs::read_to_string(&path) {
            Ok(json) => Config::from_json(&json).unwrap_or_else(|e| {
                log::warn!("{}: {}, using defaults", path, e);
                Config::default()
            }),
            Err(e) => {
                log::warn!("cannot read {}: {}, using defaults", path, e);
                Config::default()
            }
        },
        None => Config::load(),
    };

    let mut session = GameSession::new(
        config,
        seed,
        HeadlessScene::default(),
        StillEnvironment::default(),
        HudLog::default(),
    );
    let mut pilot = Autopilot::default();

    let max_frames = (MAX_SECONDS / HEADLESS_DT) as u32;
    for _ in 0..max_frames {
        pilot.steer(session.state());
        if session.frame(HEADLESS_DT, &pilot).is_none() {
            break;
        }
    }

    let state = session.state();
    let verdict = match &state.outcome {
        Outcome::Running => "still flying".to_string(),
        Outcome::Failed(cause) => format!("failed ({:?})", cause),
        Outcome::Succeeded => "passed the door".to_string(),
    };
    println!(
        "seed {}: {} after {:.0} units, {} frames, {} visuals disposed",
        seed,
        verdict,
        state.distance,
        state.frames,
        session.scene().disposed.len()
    );
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // WASM entry point is wasm_main, this is just to satisfy the compiler
}
