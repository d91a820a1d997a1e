/// A discrete action produced from keyboard input.
///
/// The frame loop consumes actions, never raw key codes, so bindings can change
/// without touching movement or camera code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Action {
    MoveForward,
    MoveBackward,
    MoveLeft,
    MoveRight,
    /// Move along the camera's up vector (free-fly only).
    Ascend,
    /// Move against the camera's up vector (free-fly only).
    Descend,
    /// Flip the sprint multiplier on or off. A toggle, not a hold.
    ToggleSprint,
    /// Switch between free-fly and walk movement.
    ToggleCameraMode,
    Quit,
}

impl Action {
    pub const ALL: [Action; 9] = [
        Action::MoveForward,
        Action::MoveBackward,
        Action::MoveLeft,
        Action::MoveRight,
        Action::Ascend,
        Action::Descend,
        Action::ToggleSprint,
        Action::ToggleCameraMode,
        Action::Quit,
    ];

    /// Toggle actions react to the key-down edge only.
    pub fn is_toggle(self) -> bool {
        matches!(self, Action::ToggleSprint | Action::ToggleCameraMode)
    }
}
