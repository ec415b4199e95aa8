use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::sync::Arc;

use winit::{
    application::ApplicationHandler,
    event::{DeviceEvent, DeviceId, ElementState, KeyEvent, MouseButton as WinitButton, WindowEvent},
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    keyboard::{Key, NamedKey},
    window::{CursorGrabMode, Window, WindowId},
};

// Import from the library crate
use slopefall::{
    arena, logging, ui, ArenaConfig, ArenaError,
    controller::{FrameDriver, InputEvent, InputState, MouseButton, PhysicsSystem, SimulationCoordinator},
    model::{clock::InstantTime, SimulationClock, TimeSource},
    ui::HudState,
    view::{GpuContext, GpuRenderer},
};

/// Browser-style key name for a winit logical key.
fn key_name(key: &Key) -> Option<String> {
    match key {
        Key::Character(s) => Some(s.to_string()),
        Key::Named(NamedKey::Escape) => Some("Escape".to_string()),
        Key::Named(NamedKey::Space) => Some(" ".to_string()),
        Key::Named(named) => Some(format!("{named:?}")),
        _ => None,
    }
}

fn mouse_button(button: WinitButton) -> MouseButton {
    match button {
        WinitButton::Left => MouseButton::Left,
        WinitButton::Right => MouseButton::Right,
        _ => MouseButton::Middle,
    }
}

struct Game {
    window: Arc<Window>,
    driver: FrameDriver<PhysicsSystem, GpuRenderer>,
    input: Rc<RefCell<InputState>>,
    hud: Rc<RefCell<HudState>>,
    game_over: Rc<Cell<bool>>,
    egui_ctx: egui::Context,
    egui_state: egui_winit::State,
    wall_clock: InstantTime,
    cursor_grabbed: bool,
    stopped: bool,
}

impl Game {
    async fn new(event_loop: &ActiveEventLoop, config: &ArenaConfig) -> Result<Self, ArenaError> {
        let window_attributes = Window::default_attributes()
            .with_title("slopefall")
            .with_inner_size(winit::dpi::LogicalSize::new(1280, 720));
        let window = event_loop
            .create_window(window_attributes)
            .map_err(|e| ArenaError::Platform { message: format!("failed to create window: {e}") })?;
        let window = Arc::new(window);
        let size = window.inner_size();

        let instance = slopefall::view::gpu_init::create_instance();
        let surface = instance
            .create_surface(window.clone())
            .map_err(GpuContext::surface_error)?;
        let gpu = GpuContext::new_native(&instance, surface, size.width, size.height).await?;
        let renderer = GpuRenderer::new(gpu, &config.lighting);

        let clock = SimulationClock::new(Box::new(InstantTime::new()), config.max_frame_delta);
        let mut coordinator =
            SimulationCoordinator::new(PhysicsSystem::new(&config.physics), renderer, clock, config);
        coordinator.set_camera(arena::camera(config, size.width, size.height));

        let input = Rc::new(RefCell::new(InputState::new()));
        let hud = Rc::new(RefCell::new(HudState::default()));
        let game_over = Rc::new(Cell::new(false));
        let on_terminate = {
            let game_over = game_over.clone();
            move || game_over.set(true)
        };
        let driver = FrameDriver::new(coordinator, config, input.clone(), hud.clone(), on_terminate)?;

        let egui_ctx = egui::Context::default();
        let egui_state = egui_winit::State::new(
            egui_ctx.clone(),
            egui::ViewportId::ROOT,
            &window,
            Some(window.scale_factor() as f32),
            None,
            None,
        );

        Ok(Self {
            window,
            driver,
            input,
            hud,
            game_over,
            egui_ctx,
            egui_state,
            wall_clock: InstantTime::new(),
            cursor_grabbed: false,
            stopped: false,
        })
    }

    fn push(&self, event: InputEvent) {
        self.input.borrow_mut().process_event(&event);
    }

    /// Locked where supported, confined otherwise. Neither is a lock error.
    fn grab_cursor(&mut self) {
        let grabbed = self
            .window
            .set_cursor_grab(CursorGrabMode::Locked)
            .or_else(|_| self.window.set_cursor_grab(CursorGrabMode::Confined));
        match grabbed {
            Ok(()) => {
                self.window.set_cursor_visible(false);
                self.cursor_grabbed = true;
                self.push(InputEvent::PointerLockChanged { locked: true });
            }
            Err(e) => {
                tracing::warn!(error = %e, "cursor grab failed");
                self.push(InputEvent::PointerLockError);
            }
        }
    }

    fn release_cursor(&mut self) {
        if !self.cursor_grabbed {
            return;
        }
        if let Err(e) = self.window.set_cursor_grab(CursorGrabMode::None) {
            tracing::warn!(error = %e, "cursor release failed");
        }
        self.window.set_cursor_visible(true);
        self.cursor_grabbed = false;
        self.push(InputEvent::PointerLockChanged { locked: false });
    }

    fn keyboard(&mut self, event: &KeyEvent) {
        let Some(key) = key_name(&event.logical_key) else {
            return;
        };
        match event.state {
            ElementState::Pressed => {
                if key == "Escape" {
                    self.release_cursor();
                }
                self.push(InputEvent::KeyDown(key));
            }
            ElementState::Released => self.push(InputEvent::KeyUp(key)),
        }
    }

    fn mouse(&mut self, state: ElementState, button: WinitButton) {
        let is_down = state == ElementState::Pressed;
        if is_down && !self.cursor_grabbed && !self.game_over.get() {
            self.grab_cursor();
        }
        self.push(InputEvent::MouseButton { button: mouse_button(button), is_down });
    }

    fn redraw(&mut self) -> Result<(), ArenaError> {
        if self.stopped {
            return Ok(());
        }
        let raw_input = self.egui_state.take_egui_input(&self.window);
        let pixels_per_point = egui_winit::pixels_per_point(&self.egui_ctx, &self.window);
        let (ui_frame, platform_output) =
            ui::prepare_frame(&self.egui_ctx, raw_input, &self.hud.borrow(), pixels_per_point);
        self.egui_state.handle_platform_output(&self.window, platform_output);
        self.driver.coordinator.renderer_mut().set_ui(ui_frame);

        let outcome = self.driver.tick(self.wall_clock.now_ms())?;
        if outcome.terminated {
            self.release_cursor();
            self.driver.coordinator.renderer_mut().redraw_frozen();
        }
        Ok(())
    }
}

struct App {
    config: ArenaConfig,
    game: Option<Game>,
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.game.is_some() {
            return;
        }
        match pollster::block_on(Game::new(event_loop, &self.config)) {
            Ok(game) => self.game = Some(game),
            Err(e) => {
                tracing::error!(error = %e, "startup failed");
                event_loop.exit();
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, window_id: WindowId, event: WindowEvent) {
        let Some(game) = self.game.as_mut() else {
            return;
        };
        if window_id != game.window.id() {
            return;
        }
        let _ = game.egui_state.on_window_event(&game.window, &event);

        match event {
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::Resized(size) => {
                game.driver.coordinator.renderer_mut().resize(size.width, size.height);
                game.driver.resize(size.width, size.height);
            }
            WindowEvent::Focused(false) => {
                game.push(InputEvent::FocusLost);
                game.release_cursor();
            }
            WindowEvent::KeyboardInput { event, .. } => game.keyboard(&event),
            WindowEvent::MouseInput { state, button, .. } => game.mouse(state, button),
            WindowEvent::RedrawRequested => {
                if let Err(e) = game.redraw() {
                    tracing::error!(error = %e, "frame failed, stopping the loop");
                    game.stopped = true;
                }
            }
            _ => {}
        }
    }

    fn device_event(&mut self, _event_loop: &ActiveEventLoop, _device_id: DeviceId, event: DeviceEvent) {
        let Some(game) = self.game.as_mut() else {
            return;
        };
        if let DeviceEvent::MouseMotion { delta: (dx, dy) } = event {
            let look = game.cursor_grabbed || game.input.borrow().lock_unavailable;
            if look {
                game.push(InputEvent::MouseMove { dx: dx as f32, dy: dy as f32 });
            }
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(game) = self.game.as_ref() {
            if !game.stopped {
                game.window.request_redraw();
            }
        }
    }
}

fn main() {
    logging::init();

    let config = match ArenaConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "invalid configuration");
            std::process::exit(1);
        }
    };

    let event_loop = match EventLoop::new() {
        Ok(event_loop) => event_loop,
        Err(e) => {
            tracing::error!(error = %e, "failed to create event loop");
            std::process::exit(1);
        }
    };
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = App { config, game: None };
    if let Err(e) = event_loop.run_app(&mut app) {
        tracing::error!(error = %e, "event loop terminated with an error");
    }
}
