use std::collections::HashSet;

use super::types::{InputEvent, Key, KeyState, Modifiers, PointerButtonEvent, PointerMoveEvent};

/// Window-level input state the translator needs between events.
///
/// winit reports button presses without a position and wheel ticks without
/// modifiers, so both are tracked here and stamped onto translated events.
#[derive(Debug, Default)]
pub struct InputState {
    pub modifiers: Modifiers,

    /// Pointer position in logical pixels.
    pub pointer_pos: Option<(f32, f32)>,

    pub keys_down: HashSet<Key>,
}

impl InputState {
    /// Folds `ev` into the state. Returns the key if `ev` is a fresh press
    /// (not a repeat, not already held).
    pub fn apply_event(&mut self, ev: &InputEvent) -> Option<Key> {
        match ev {
            InputEvent::ModifiersChanged(m) => self.modifiers = *m,

            // Releases are not delivered while unfocused.
            InputEvent::Focused(false) => self.keys_down.clear(),

            InputEvent::PointerMoved(PointerMoveEvent { x, y })
            | InputEvent::PointerButton(PointerButtonEvent { x, y, .. }) => {
                self.pointer_pos = Some((*x, *y));
            }

            InputEvent::PointerLeft => self.pointer_pos = None,

            InputEvent::Key { key, state, repeat } => match state {
                KeyState::Pressed => {
                    if self.keys_down.insert(*key) && !*repeat {
                        return Some(*key);
                    }
                }
                KeyState::Released => {
                    self.keys_down.remove(key);
                }
            },

            _ => {}
        }
        None
    }

    pub fn key_down(&self, key: Key) -> bool {
        self.keys_down.contains(&key)
    }
}
