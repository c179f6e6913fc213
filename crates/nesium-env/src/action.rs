use nesium_core::controller::Buttons;
use serde::{Deserialize, Serialize};

/// Discrete agent actions. Codes `0..=14` form the legal action set; `Start`
/// only appears in game-profile reset sequences.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[repr(u8)]
pub enum Action {
    #[default]
    Noop = 0,
    A = 1,
    B = 2,
    Up = 3,
    Right = 4,
    Left = 5,
    Down = 6,
    AUp = 7,
    ARight = 8,
    ALeft = 9,
    ADown = 10,
    BUp = 11,
    BRight = 12,
    BLeft = 13,
    BDown = 14,
    Start = 18,
}

impl Action {
    /// Actions an agent may pass to [`Session::act`](crate::Session::act).
    pub const LEGAL: [Action; 15] = [
        Action::Noop,
        Action::A,
        Action::B,
        Action::Up,
        Action::Right,
        Action::Left,
        Action::Down,
        Action::AUp,
        Action::ARight,
        Action::ALeft,
        Action::ADown,
        Action::BUp,
        Action::BRight,
        Action::BLeft,
        Action::BDown,
    ];

    /// Every legal action matters on this platform.
    pub const MINIMAL: [Action; 15] = Self::LEGAL;

    /// Resolves a legal agent action. Internal codes are rejected.
    pub fn from_code(code: i32) -> Option<Action> {
        usize::try_from(code)
            .ok()
            .and_then(|index| Self::LEGAL.get(index))
            .copied()
    }

    pub fn code(self) -> i32 {
        self as i32
    }

    pub fn is_legal(self) -> bool {
        (self as u8) < Self::LEGAL.len() as u8
    }

    /// Pad state held while this action is applied.
    pub fn buttons(self) -> Buttons {
        match self {
            Action::Noop => Buttons::empty(),
            Action::A => Buttons::A,
            Action::B => Buttons::B,
            Action::Up => Buttons::UP,
            Action::Right => Buttons::RIGHT,
            Action::Left => Buttons::LEFT,
            Action::Down => Buttons::DOWN,
            Action::AUp => Buttons::A | Buttons::UP,
            Action::ARight => Buttons::A | Buttons::RIGHT,
            Action::ALeft => Buttons::A | Buttons::LEFT,
            Action::ADown => Buttons::A | Buttons::DOWN,
            Action::BUp => Buttons::B | Buttons::UP,
            Action::BRight => Buttons::B | Buttons::RIGHT,
            Action::BLeft => Buttons::B | Buttons::LEFT,
            Action::BDown => Buttons::B | Buttons::DOWN,
            Action::Start => Buttons::START,
        }
    }
}

impl From<Action> for i32 {
    fn from(action: Action) -> Self {
        action.code()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn legal_codes_are_dense() {
        for (code, action) in Action::LEGAL.iter().enumerate() {
            assert_eq!(action.code(), code as i32);
            assert_eq!(Action::from_code(code as i32), Some(*action));
            assert!(action.is_legal());
        }
    }

    #[test]
    fn internal_and_out_of_range_codes_are_not_legal() {
        for code in [-1, 15, 17, 18, 19, 255, i32::MAX] {
            assert_eq!(Action::from_code(code), None, "code {code}");
        }
        assert!(!Action::Start.is_legal());
    }

    #[test]
    fn button_masks_match_pad_bits() {
        assert_eq!(Action::ARight.buttons().bits(), 129);
        assert_eq!(Action::BDown.buttons().bits(), 34);
        assert_eq!(Action::ALeft.buttons().bits(), 65);
        assert_eq!(Action::Start.buttons().bits(), 8);
        assert_eq!(Action::Noop.buttons().bits(), 0);
    }
}
