use crate::action::Action;
use crate::bindings::KeyBindings;
use crate::pointer::PointerTracker;
use glam::{DVec2, Vec2};
use std::collections::BTreeMap;
use winit::keyboard::KeyCode;

/// Per-session input state, owned by the application and passed by reference to
/// event handling and to the frame loop.
///
/// Device events write; the frame loop reads once per frame and then calls
/// [`InputState::checkpoint`].
#[derive(Debug, Clone, Default)]
pub struct InputState {
    bindings: KeyBindings,
    actions: BTreeMap<Action, bool>,
    sprint: bool,
    mode_toggle_pending: bool,
    pointer: PointerTracker,
}

impl InputState {
    pub fn new(bindings: KeyBindings) -> Self {
        Self {
            bindings,
            ..Self::default()
        }
    }

    pub fn bindings(&self) -> &KeyBindings {
        &self.bindings
    }

    pub fn bindings_mut(&mut self) -> &mut KeyBindings {
        &mut self.bindings
    }

    /// Apply a key event. Unmapped keys are ignored. Returns the mapped action, if any.
    pub fn handle_key(&mut self, key: KeyCode, pressed: bool, repeat: bool) -> Option<Action> {
        let action = self.bindings.action_for(key)?;
        self.handle_action(action, pressed, repeat);
        Some(action)
    }

    /// Apply a press or release of an action directly.
    pub fn handle_action(&mut self, action: Action, pressed: bool, repeat: bool) {
        self.actions.insert(action, pressed);
        if !pressed || repeat {
            return;
        }
        match action {
            Action::ToggleSprint => {
                self.sprint = !self.sprint;
                tracing::debug!(sprint = self.sprint, "sprint toggled");
            }
            Action::ToggleCameraMode => self.mode_toggle_pending = true,
            _ => {}
        }
    }

    pub fn is_active(&self, action: Action) -> bool {
        self.actions.get(&action).copied().unwrap_or(false)
    }

    pub fn sprint_enabled(&self) -> bool {
        self.sprint
    }

    pub fn quit_requested(&self) -> bool {
        self.is_active(Action::Quit)
    }

    /// Consume a pending camera-mode switch request.
    pub fn take_mode_toggle(&mut self) -> bool {
        std::mem::take(&mut self.mode_toggle_pending)
    }

    /// Release every held action, e.g. when the window loses focus.
    /// Toggled state such as sprint is kept.
    pub fn release_all(&mut self) {
        self.actions.clear();
    }

    pub fn on_cursor_moved(&mut self, x: f64, y: f64) {
        self.pointer.on_moved(DVec2::new(x, y));
    }

    pub fn on_pointer_motion(&mut self, dx: f64, dy: f64) {
        self.pointer.on_motion(DVec2::new(dx, dy));
    }

    /// Start a fresh pointer session; the next sample sets a new baseline.
    pub fn reacquire_pointer(&mut self) {
        self.pointer.reset();
    }

    pub fn checkpoint(&mut self) {
        self.pointer.checkpoint();
    }

    /// Pointer movement captured by the last checkpoint, in pixels.
    pub fn pointer_delta(&self) -> Vec2 {
        self.pointer.delta().as_vec2()
    }

    pub fn pointer(&self) -> &PointerTracker {
        &self.pointer
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_down_and_up_set_action_state() {
        let mut input = InputState::default();
        assert_eq!(
            input.handle_key(KeyCode::KeyW, true, false),
            Some(Action::MoveForward)
        );
        assert!(input.is_active(Action::MoveForward));
        input.handle_key(KeyCode::KeyW, false, false);
        assert!(!input.is_active(Action::MoveForward));
    }

    #[test]
    fn state_persists_across_frames() {
        let mut input = InputState::default();
        input.handle_key(KeyCode::KeyD, true, false);
        input.checkpoint();
        input.checkpoint();
        assert!(input.is_active(Action::MoveRight));
    }

    #[test]
    fn unmapped_key_is_ignored() {
        let mut input = InputState::default();
        assert_eq!(input.handle_key(KeyCode::KeyQ, true, false), None);
        for action in Action::ALL {
            assert!(!input.is_active(action));
        }
    }

    #[test]
    fn sprint_is_a_toggle_not_a_hold() {
        let mut input = InputState::default();
        input.handle_key(KeyCode::ShiftLeft, true, false);
        assert!(input.sprint_enabled());
        // Key repeat while held does not flip it back.
        input.handle_key(KeyCode::ShiftLeft, true, true);
        assert!(input.sprint_enabled());
        // Releasing keeps it on.
        input.handle_key(KeyCode::ShiftLeft, false, false);
        assert!(input.sprint_enabled());
        // Second press turns it off.
        input.handle_key(KeyCode::ShiftLeft, true, false);
        assert!(!input.sprint_enabled());
    }

    #[test]
    fn mode_toggle_is_consumed_once() {
        let mut input = InputState::default();
        input.handle_key(KeyCode::Tab, true, false);
        assert!(input.take_mode_toggle());
        assert!(!input.take_mode_toggle());
    }

    #[test]
    fn quit_follows_escape() {
        let mut input = InputState::default();
        assert!(!input.quit_requested());
        input.handle_key(KeyCode::Escape, true, false);
        assert!(input.quit_requested());
    }

    #[test]
    fn release_all_keeps_sprint() {
        let mut input = InputState::default();
        input.handle_key(KeyCode::KeyW, true, false);
        input.handle_key(KeyCode::ShiftLeft, true, false);
        input.release_all();
        assert!(!input.is_active(Action::MoveForward));
        assert!(input.sprint_enabled());
    }

    #[test]
    fn pointer_flow_through_state() {
        let mut input = InputState::default();
        input.on_cursor_moved(640.0, 360.0);
        input.checkpoint();
        assert_eq!(input.pointer_delta(), Vec2::ZERO);

        input.on_cursor_moved(650.0, 355.0);
        input.checkpoint();
        assert_eq!(input.pointer_delta(), Vec2::new(10.0, -5.0));

        input.reacquire_pointer();
        input.on_cursor_moved(0.0, 0.0);
        input.checkpoint();
        assert_eq!(input.pointer_delta(), Vec2::ZERO);
    }
}
