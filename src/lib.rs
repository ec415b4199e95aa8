// Re-export all public modules so they can be used from main.rs
pub mod arena;
pub mod config;
pub mod error;
pub mod logging;
pub mod ui;
pub mod utils;

// MVC Architecture
pub mod controller;
pub mod model;
pub mod view;

#[cfg(test)]
pub(crate) mod testing;

pub use config::ArenaConfig;
pub use error::ArenaError;

#[cfg(target_arch = "wasm32")]
use std::{cell::Cell, cell::RefCell, rc::Rc};
#[cfg(target_arch = "wasm32")]
use wasm_bindgen::{closure::Closure, prelude::wasm_bindgen, JsCast, JsValue};
#[cfg(target_arch = "wasm32")]
use web_sys::{Document, Event, HtmlCanvasElement, KeyboardEvent, MouseEvent, Window};

#[cfg(target_arch = "wasm32")]
use controller::{input::wasm as web_input, FrameDriver, InputEvent, InputState, PhysicsSystem, SimulationCoordinator};
#[cfg(target_arch = "wasm32")]
use model::{clock::PerformanceTime, SimulationClock};
#[cfg(target_arch = "wasm32")]
use ui::HudState;
#[cfg(target_arch = "wasm32")]
use view::{GpuContext, GpuRenderer};

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub async fn start() -> Result<(), JsValue> {
    logging::init();
    let (window, document, canvas) = init_canvas()?;
    setup_app(window, document, canvas).await
}

/// Main application setup for WASM
#[cfg(target_arch = "wasm32")]
async fn setup_app(window: Window, document: Document, canvas: HtmlCanvasElement) -> Result<(), JsValue> {
    let config = ArenaConfig::default();
    let (width, height) = (canvas.width(), canvas.height());

    let gpu = GpuContext::new(&canvas, width, height).await?;
    let renderer = GpuRenderer::new(gpu, &config.lighting);
    let clock = SimulationClock::new(Box::new(PerformanceTime::new()), config.max_frame_delta);
    let mut coordinator =
        SimulationCoordinator::new(PhysicsSystem::new(&config.physics), renderer, clock, &config);
    coordinator.set_camera(arena::camera(&config, width, height));

    let input = Rc::new(RefCell::new(InputState::new()));
    let hud = Rc::new(RefCell::new(HudState::default()));
    let game_over = Rc::new(Cell::new(false));

    let on_terminate = {
        let document = document.clone();
        let game_over = game_over.clone();
        move || {
            game_over.set(true);
            document.exit_pointer_lock();
        }
    };
    let mut driver = FrameDriver::new(coordinator, &config, input.clone(), hud.clone(), on_terminate)?;

    setup_input_listeners(&document, &window, &canvas, input, game_over)?;

    let egui_ctx = egui::Context::default();
    let performance = window
        .performance()
        .ok_or_else(|| js_error("performance timer unavailable"))?;

    let frame_window = window.clone();
    RcCellCallback::new(window, move || {
        let now = performance.now();

        let (width, height) = viewport_size(&frame_window);
        if (width, height) != driver.coordinator.renderer().size() {
            canvas.set_width(width);
            canvas.set_height(height);
            driver.coordinator.renderer_mut().resize(width, height);
            driver.resize(width, height);
        }

        let dpr = frame_window.device_pixel_ratio() as f32;
        egui_ctx.set_pixels_per_point(dpr);
        let raw_input = egui::RawInput {
            time: Some(now / 1000.0),
            screen_rect: Some(egui::Rect::from_min_size(
                egui::Pos2::ZERO,
                egui::vec2(width as f32 / dpr, height as f32 / dpr),
            )),
            ..Default::default()
        };
        let (ui_frame, _) = ui::prepare_frame(&egui_ctx, raw_input, &hud.borrow(), dpr);
        driver.coordinator.renderer_mut().set_ui(ui_frame);

        match driver.tick(now) {
            Ok(outcome) => {
                if outcome.terminated {
                    driver.coordinator.renderer_mut().redraw_frozen();
                }
                true
            }
            Err(e) => {
                tracing::error!(error = %e, "frame failed, stopping the loop");
                false
            }
        }
    })
    .start()
}

/// Listeners only write `InputState`; the frame callback reads it.
#[cfg(target_arch = "wasm32")]
fn setup_input_listeners(
    document: &Document,
    window: &Window,
    canvas: &HtmlCanvasElement,
    input_state: Rc<RefCell<InputState>>,
    game_over: Rc<Cell<bool>>,
) -> Result<(), JsValue> {
    // Keyboard down
    {
        let input_state = input_state.clone();
        let keydown = Closure::wrap(Box::new(move |e: KeyboardEvent| {
            if matches!(e.key().as_str(), "a" | "d" | "A" | "D" | " ") {
                e.prevent_default();
            }
            input_state
                .borrow_mut()
                .process_event(&web_input::keyboard_event_to_input(&e, true));
        }) as Box<dyn FnMut(KeyboardEvent)>);
        document.add_event_listener_with_callback("keydown", keydown.as_ref().unchecked_ref())?;
        keydown.forget();
    }

    // Keyboard up
    {
        let input_state = input_state.clone();
        let keyup = Closure::wrap(Box::new(move |e: KeyboardEvent| {
            input_state
                .borrow_mut()
                .process_event(&web_input::keyboard_event_to_input(&e, false));
        }) as Box<dyn FnMut(KeyboardEvent)>);
        document.add_event_listener_with_callback("keyup", keyup.as_ref().unchecked_ref())?;
        keyup.forget();
    }

    // Focus loss - release everything
    {
        let input_state = input_state.clone();
        let blur = Closure::wrap(Box::new(move |_e: Event| {
            input_state.borrow_mut().process_event(&InputEvent::FocusLost);
        }) as Box<dyn FnMut(Event)>);
        window.add_event_listener_with_callback("blur", blur.as_ref().unchecked_ref())?;
        blur.forget();
    }

    // Visibility change - release everything
    {
        let input_state = input_state.clone();
        let visibility = Closure::wrap(Box::new(move |_e: Event| {
            input_state.borrow_mut().process_event(&InputEvent::FocusLost);
        }) as Box<dyn FnMut(Event)>);
        document.add_event_listener_with_callback("visibilitychange", visibility.as_ref().unchecked_ref())?;
        visibility.forget();
    }

    // Pointer lock change
    {
        let input_state = input_state.clone();
        let doc_pl = document.clone();
        let plc = Closure::wrap(Box::new(move |_e: Event| {
            let locked = doc_pl.pointer_lock_element().is_some();
            input_state
                .borrow_mut()
                .process_event(&InputEvent::PointerLockChanged { locked });
        }) as Box<dyn FnMut(Event)>);
        document.add_event_listener_with_callback("pointerlockchange", plc.as_ref().unchecked_ref())?;
        plc.forget();
    }

    // Pointer lock error
    {
        let input_state = input_state.clone();
        let ple = Closure::wrap(Box::new(move |_e: Event| {
            input_state.borrow_mut().process_event(&InputEvent::PointerLockError);
        }) as Box<dyn FnMut(Event)>);
        document.add_event_listener_with_callback("pointerlockerror", ple.as_ref().unchecked_ref())?;
        ple.forget();
    }

    // Mouse move
    {
        let input_state = input_state.clone();
        let mm = Closure::wrap(Box::new(move |e: MouseEvent| {
            let mut input = input_state.borrow_mut();
            if input.pointer_locked || input.lock_unavailable {
                input.process_event(&web_input::mouse_move_to_input(&e));
            }
        }) as Box<dyn FnMut(MouseEvent)>);
        document.add_event_listener_with_callback("mousemove", mm.as_ref().unchecked_ref())?;
        mm.forget();
    }

    // Mouse down: grab the pointer on the blocker, otherwise hold the trigger
    {
        let input_state = input_state.clone();
        let canvas_lock = canvas.clone();
        let mousedown = Closure::wrap(Box::new(move |e: MouseEvent| {
            let locked = input_state.borrow().pointer_locked;
            if !locked && !game_over.get() {
                canvas_lock.request_pointer_lock();
            }
            input_state
                .borrow_mut()
                .process_event(&web_input::mouse_button_to_input(&e, true));
            e.prevent_default();
        }) as Box<dyn FnMut(MouseEvent)>);
        canvas.add_event_listener_with_callback("mousedown", mousedown.as_ref().unchecked_ref())?;
        mousedown.forget();
    }

    // Mouse up
    {
        let mouseup = Closure::wrap(Box::new(move |e: MouseEvent| {
            input_state
                .borrow_mut()
                .process_event(&web_input::mouse_button_to_input(&e, false));
        }) as Box<dyn FnMut(MouseEvent)>);
        document.add_event_listener_with_callback("mouseup", mouseup.as_ref().unchecked_ref())?;
        mouseup.forget();
    }

    // Context menu prevention
    {
        let contextmenu = Closure::wrap(Box::new(move |e: MouseEvent| {
            e.prevent_default();
        }) as Box<dyn FnMut(MouseEvent)>);
        canvas.add_event_listener_with_callback("contextmenu", contextmenu.as_ref().unchecked_ref())?;
        contextmenu.forget();
    }

    Ok(())
}

#[cfg(target_arch = "wasm32")]
fn viewport_size(window: &Window) -> (u32, u32) {
    let dimension = |v: Result<JsValue, JsValue>, fallback: f64| v.ok().and_then(|v| v.as_f64()).unwrap_or(fallback);
    let dpr = window.device_pixel_ratio();
    let width = dimension(window.inner_width(), 800.0) * dpr;
    let height = dimension(window.inner_height(), 600.0) * dpr;
    (width.max(1.0) as u32, height.max(1.0) as u32)
}

#[cfg(target_arch = "wasm32")]
fn init_canvas() -> Result<(Window, Document, HtmlCanvasElement), JsValue> {
    let window = web_sys::window().ok_or_else(|| js_error("no global `window`"))?;
    let document = window.document().ok_or_else(|| js_error("no document on window"))?;
    let body = document.body().ok_or_else(|| js_error("no body on document"))?;
    let canvas_el = document
        .create_element("canvas")?
        .dyn_into::<HtmlCanvasElement>()
        .map_err(|_| js_error("failed to create canvas"))?;
    let (width, height) = viewport_size(&window);
    canvas_el.set_width(width);
    canvas_el.set_height(height);
    canvas_el.set_attribute("style", "display:block;width:100vw;height:100vh")?;
    body.set_attribute("style", "margin:0;overflow:hidden")?;
    body.append_child(&canvas_el)?;
    Ok((window, document, canvas_el))
}

#[cfg(target_arch = "wasm32")]
fn js_error<E: Into<String>>(msg: E) -> JsValue {
    JsValue::from(ArenaError::Platform { message: msg.into() })
}

/// requestAnimationFrame loop. The callback returns `false` to stop.
#[cfg(target_arch = "wasm32")]
struct RcCellCallback {
    inner: Rc<RefCell<Box<dyn FnMut() -> bool>>>,
    window: Window,
}

#[cfg(target_arch = "wasm32")]
impl RcCellCallback {
    fn new(window: Window, f: impl FnMut() -> bool + 'static) -> Self {
        Self {
            inner: Rc::new(RefCell::new(Box::new(f))),
            window,
        }
    }

    fn start(self) -> Result<(), JsValue> {
        let inner = self.inner.clone();
        let window = self.window.clone();

        let callback = Rc::new(RefCell::new(None::<Closure<dyn FnMut()>>));
        let callback_clone = callback.clone();

        *callback.borrow_mut() = Some(Closure::wrap(Box::new(move || {
            if !inner.borrow_mut().as_mut()() {
                return;
            }

            let cb_ref = callback_clone.borrow();
            if let Some(cb) = cb_ref.as_ref() {
                if let Err(e) = window.request_animation_frame(cb.as_ref().unchecked_ref()) {
                    tracing::error!(error = ?e, "requestAnimationFrame failed");
                }
            }
        }) as Box<dyn FnMut()>));

        if let Some(cb) = callback.borrow().as_ref() {
            self.window.request_animation_frame(cb.as_ref().unchecked_ref())?;
        }

        // Leak the closure to keep it alive
        std::mem::forget(callback);
        Ok(())
    }
}
