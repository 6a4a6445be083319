use winit::keyboard::{KeyCode, PhysicalKey};

/// Discrete action triggered by a key press, as opposed to the held movement
/// flags. Fires on key-down only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    None,
    CycleSpinAxis,
    SpinSpeedUp,
    SpinSpeedDown,
}

/// Latest input state, mutated by event handlers and read once per tick.
#[derive(Default, Debug, Clone, Copy, PartialEq)]
pub struct InputState {
    pub move_forward: bool,
    pub move_backward: bool,
    pub move_left: bool,
    pub move_right: bool,
    pub move_up: bool,
    pub move_down: bool,
    pub mouse_down: bool,
    pub last_pointer: Option<(f32, f32)>,
}

impl InputState {
    /// Update movement flags for a key event. Unrecognized keys are ignored.
    pub fn handle_key(&mut self, key: PhysicalKey, pressed: bool) -> KeyAction {
        match key {
            PhysicalKey::Code(KeyCode::KeyW) => self.move_forward = pressed,
            PhysicalKey::Code(KeyCode::KeyS) => self.move_backward = pressed,
            PhysicalKey::Code(KeyCode::KeyA) => self.move_left = pressed,
            PhysicalKey::Code(KeyCode::KeyD) => self.move_right = pressed,
            PhysicalKey::Code(KeyCode::Space) => self.move_up = pressed,
            PhysicalKey::Code(KeyCode::ShiftLeft) | PhysicalKey::Code(KeyCode::ShiftRight) => {
                self.move_down = pressed
            }
            PhysicalKey::Code(KeyCode::KeyF) if pressed => return KeyAction::CycleSpinAxis,
            PhysicalKey::Code(KeyCode::BracketRight) if pressed => return KeyAction::SpinSpeedUp,
            PhysicalKey::Code(KeyCode::BracketLeft) if pressed => return KeyAction::SpinSpeedDown,
            _ => {}
        }
        KeyAction::None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode) -> PhysicalKey {
        PhysicalKey::Code(code)
    }

    #[test]
    fn movement_flag_tracks_most_recent_edge() {
        let mut input = InputState::default();
        assert!(!input.move_forward);
        input.handle_key(key(KeyCode::KeyW), true);
        assert!(input.move_forward);
        // Repeated down events keep it held.
        input.handle_key(key(KeyCode::KeyW), true);
        assert!(input.move_forward);
        input.handle_key(key(KeyCode::KeyW), false);
        assert!(!input.move_forward);
        input.handle_key(key(KeyCode::KeyW), true);
        assert!(input.move_forward);
    }

    #[test]
    fn either_shift_maps_to_move_down() {
        let mut input = InputState::default();
        input.handle_key(key(KeyCode::ShiftLeft), true);
        assert!(input.move_down);
        input.handle_key(key(KeyCode::ShiftLeft), false);
        input.handle_key(key(KeyCode::ShiftRight), true);
        assert!(input.move_down);
    }

    #[test]
    fn discrete_actions_fire_on_press_only() {
        let mut input = InputState::default();
        assert_eq!(
            input.handle_key(key(KeyCode::KeyF), true),
            KeyAction::CycleSpinAxis
        );
        assert_eq!(input.handle_key(key(KeyCode::KeyF), false), KeyAction::None);
        assert_eq!(
            input.handle_key(key(KeyCode::BracketRight), true),
            KeyAction::SpinSpeedUp
        );
        assert_eq!(
            input.handle_key(key(KeyCode::BracketLeft), true),
            KeyAction::SpinSpeedDown
        );
        assert_eq!(
            input.handle_key(key(KeyCode::BracketLeft), false),
            KeyAction::None
        );
    }

    #[test]
    fn unknown_keys_are_ignored() {
        let mut input = InputState::default();
        assert_eq!(input.handle_key(key(KeyCode::KeyQ), true), KeyAction::None);
        assert_eq!(input, InputState::default());
    }
}
