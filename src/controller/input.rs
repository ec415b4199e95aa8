/// Platform-agnostic input handling
use std::collections::HashSet;

use crate::config::LocomotionConfig;

/// Platform-independent input events
#[derive(Debug, Clone, PartialEq)]
pub enum InputEvent {
    KeyDown(String),
    KeyUp(String),
    MouseMove { dx: f32, dy: f32 },
    MouseButton { button: MouseButton, is_down: bool },
    FocusLost,
    PointerLockChanged { locked: bool },
    /// The platform refused or does not support pointer lock
    PointerLockError,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseButton {
    Left,
    Right,
    Middle,
}

impl MouseButton {
    pub fn from_web_button(button: i16) -> Self {
        match button {
            1 => MouseButton::Middle,
            2 => MouseButton::Right,
            _ => MouseButton::Left,
        }
    }
}

/// Everything event listeners write. The frame callback is the only reader.
#[derive(Debug, Default)]
pub struct InputState {
    pub pressed_keys: HashSet<String>,
    pub look_delta: (f32, f32),
    pub trigger_held: bool,
    pub pointer_locked: bool,
    /// Set on a lock error, cleared when the frame callback consumes it
    pub lock_error_pending: bool,
    /// Set once any lock error was seen; Escape then pauses instead of unlock
    pub lock_unavailable: bool,
    pub pause_pending: bool,
    /// Keys that went down since the last frame, in order
    pub key_presses: Vec<String>,
    pub key_releases: Vec<String>,
}

impl InputState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Process an input event and update state
    pub fn process_event(&mut self, event: &InputEvent) {
        match event {
            InputEvent::KeyDown(key) => {
                if key == "Escape" && self.lock_unavailable {
                    self.pause_pending = true;
                }
                if self.pressed_keys.insert(key.clone()) {
                    self.key_presses.push(key.clone());
                }
            }
            InputEvent::KeyUp(key) => {
                if self.pressed_keys.remove(key.as_str()) {
                    self.key_releases.push(key.clone());
                }
            }
            InputEvent::MouseMove { dx, dy } => {
                self.look_delta.0 += dx;
                self.look_delta.1 += dy;
            }
            InputEvent::MouseButton { button: MouseButton::Left, is_down } => {
                self.trigger_held = *is_down;
            }
            InputEvent::MouseButton { .. } => {}
            InputEvent::FocusLost => {
                self.clear_keys();
                self.trigger_held = false;
            }
            InputEvent::PointerLockChanged { locked } => {
                self.pointer_locked = *locked;
            }
            InputEvent::PointerLockError => {
                self.lock_error_pending = true;
                self.lock_unavailable = true;
            }
        }
    }

    /// Releases every held key, queuing the releases for the controllers.
    pub fn clear_keys(&mut self) {
        self.key_releases.extend(self.pressed_keys.drain());
    }

    pub fn consume_look(&mut self) -> (f32, f32) {
        std::mem::take(&mut self.look_delta)
    }

    pub fn consume_lock_error(&mut self) -> bool {
        std::mem::take(&mut self.lock_error_pending)
    }

    pub fn consume_pause(&mut self) -> bool {
        std::mem::take(&mut self.pause_pending)
    }

    /// Drains key transitions as `(key, pressed)` pairs, releases last.
    pub fn drain_key_transitions(&mut self) -> Vec<(String, bool)> {
        let mut transitions: Vec<_> = self.key_presses.drain(..).map(|k| (k, true)).collect();
        transitions.extend(self.key_releases.drain(..).map(|k| (k, false)));
        transitions
    }
}

/// Key mapping configuration
#[derive(Debug, Clone, PartialEq)]
pub struct KeyBindings {
    pub strafe_left: String,
    pub strafe_right: String,
}

impl Default for KeyBindings {
    fn default() -> Self {
        Self::from_config(&LocomotionConfig::default())
    }
}

impl KeyBindings {
    pub fn from_config(config: &LocomotionConfig) -> Self {
        Self {
            strafe_left: config.strafe_left_key.clone(),
            strafe_right: config.strafe_right_key.clone(),
        }
    }

    pub fn is_strafe_left(&self, key: &str) -> bool {
        key.eq_ignore_ascii_case(&self.strafe_left)
    }

    pub fn is_strafe_right(&self, key: &str) -> bool {
        key.eq_ignore_ascii_case(&self.strafe_right)
    }
}

#[cfg(target_arch = "wasm32")]
pub mod wasm {
    use super::*;
    use web_sys::{KeyboardEvent, MouseEvent};

    pub fn keyboard_event_to_input(e: &KeyboardEvent, is_down: bool) -> InputEvent {
        let key = e.key();
        if is_down {
            InputEvent::KeyDown(key)
        } else {
            InputEvent::KeyUp(key)
        }
    }

    pub fn mouse_move_to_input(e: &MouseEvent) -> InputEvent {
        InputEvent::MouseMove {
            dx: e.movement_x() as f32,
            dy: e.movement_y() as f32,
        }
    }

    pub fn mouse_button_to_input(e: &MouseEvent, is_down: bool) -> InputEvent {
        InputEvent::MouseButton {
            button: MouseButton::from_web_button(e.button()),
            is_down,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_transitions_are_queued_once() {
        let mut input = InputState::new();
        input.process_event(&InputEvent::KeyDown("a".into()));
        // Auto-repeat
        input.process_event(&InputEvent::KeyDown("a".into()));
        input.process_event(&InputEvent::KeyUp("a".into()));

        assert_eq!(
            input.drain_key_transitions(),
            vec![("a".to_string(), true), ("a".to_string(), false)]
        );
        assert!(input.drain_key_transitions().is_empty());
    }

    #[test]
    fn test_look_accumulates_until_consumed() {
        let mut input = InputState::new();
        input.process_event(&InputEvent::MouseMove { dx: 3.0, dy: -1.0 });
        input.process_event(&InputEvent::MouseMove { dx: 2.0, dy: 4.0 });
        assert_eq!(input.consume_look(), (5.0, 3.0));
        assert_eq!(input.consume_look(), (0.0, 0.0));
    }

    #[test]
    fn test_focus_loss_releases_everything() {
        let mut input = InputState::new();
        input.process_event(&InputEvent::KeyDown("d".into()));
        input.process_event(&InputEvent::MouseButton { button: MouseButton::Left, is_down: true });
        input.drain_key_transitions();

        input.process_event(&InputEvent::FocusLost);
        assert!(!input.trigger_held);
        assert!(input.pressed_keys.is_empty());
        assert_eq!(input.drain_key_transitions(), vec![("d".to_string(), false)]);
    }

    #[test]
    fn test_escape_pauses_only_without_pointer_lock() {
        let mut input = InputState::new();
        input.process_event(&InputEvent::KeyDown("Escape".into()));
        assert!(!input.consume_pause());

        input.process_event(&InputEvent::PointerLockError);
        assert!(input.consume_lock_error());
        assert!(!input.consume_lock_error());

        input.process_event(&InputEvent::KeyUp("Escape".into()));
        input.process_event(&InputEvent::KeyDown("Escape".into()));
        assert!(input.consume_pause());
    }

    #[test]
    fn test_bindings_are_case_insensitive() {
        let bindings = KeyBindings::default();
        assert!(bindings.is_strafe_left("A"));
        assert!(bindings.is_strafe_right("d"));
        assert!(!bindings.is_strafe_left("d"));
    }
}
