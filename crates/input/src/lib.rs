//! Input: keyboard keys mapped to camera actions, pointer movement buffered per frame.
//!
//! # Invariants
//! - Action state persists across frames until the matching key-up.
//! - Each pointer delta is reported by exactly one checkpoint.
//! - The first pointer sample after (re)acquisition reports no movement.

pub mod action;
pub mod bindings;
pub mod pointer;
pub mod state;

pub use action::Action;
pub use bindings::KeyBindings;
pub use pointer::PointerTracker;
pub use state::InputState;

pub fn crate_info() -> &'static str {
    "meshview-input v0.1.0"
}
