use crate::action::Action;
use std::collections::HashMap;
use winit::keyboard::KeyCode;

/// Physical key to action mapping.
#[derive(Debug, Clone)]
pub struct KeyBindings {
    map: HashMap<KeyCode, Action>,
}

impl Default for KeyBindings {
    fn default() -> Self {
        let mut bindings = Self::empty();
        bindings.bind(KeyCode::KeyW, Action::MoveForward);
        bindings.bind(KeyCode::KeyS, Action::MoveBackward);
        bindings.bind(KeyCode::KeyA, Action::MoveLeft);
        bindings.bind(KeyCode::KeyD, Action::MoveRight);
        bindings.bind(KeyCode::Space, Action::Ascend);
        bindings.bind(KeyCode::KeyC, Action::Descend);
        bindings.bind(KeyCode::ShiftLeft, Action::ToggleSprint);
        bindings.bind(KeyCode::Tab, Action::ToggleCameraMode);
        bindings.bind(KeyCode::Escape, Action::Quit);
        bindings
    }
}

impl KeyBindings {
    pub fn empty() -> Self {
        Self {
            map: HashMap::new(),
        }
    }

    /// Bind `key` to `action`, replacing any previous binding of that key.
    pub fn bind(&mut self, key: KeyCode, action: Action) -> Option<Action> {
        self.map.insert(key, action)
    }

    pub fn unbind(&mut self, key: KeyCode) -> Option<Action> {
        self.map.remove(&key)
    }

    pub fn action_for(&self, key: KeyCode) -> Option<Action> {
        self.map.get(&key).copied()
    }

    /// Keys bound to `action`, in no particular order.
    pub fn keys_for(&self, action: Action) -> impl Iterator<Item = KeyCode> + '_ {
        self.map
            .iter()
            .filter(move |(_, a)| **a == action)
            .map(|(k, _)| *k)
    }
}
