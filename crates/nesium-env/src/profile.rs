//! Per-title reward, lives and game-over rules read from work RAM.

use serde::{Deserialize, Serialize};

use crate::action::Action;

mod smb {
    pub const LIVES: u16 = 0x075A;
    pub const GAME_STATE: u16 = 0x0770;
    pub const GAME_STATE_PLAYING: u8 = 1;
    /// Six BCD-ish digits, most significant first; the ones digit is not stored.
    pub const SCORE_DIGITS: u16 = 0x07DD;
    pub const SCORE_WEIGHTS: [i64; 6] = [1_000_000, 100_000, 10_000, 1_000, 100, 10];
    pub const PLAYER_X: u16 = 0x0086;
    pub const X_REWARD_SCALE: i32 = 5;
    /// Scaled x deltas above this are level transitions, not movement.
    pub const MAX_X_CHANGE: i32 = 100;
    pub const MAX_SCORE: i64 = 9_999_990;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum GameProfile {
    /// No game knowledge: zero reward, never game over, no lives.
    #[default]
    Generic,
    SuperMarioBros,
}

/// Bookkeeping a profile carries between frames. Part of every snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ProfileState {
    pub score: i64,
    pub x: i32,
}

impl GameProfile {
    /// Frames to play after a power-on reset before the episode starts.
    pub fn reset_sequence(self) -> &'static [(Action, u32)] {
        match self {
            GameProfile::Generic => &[],
            GameProfile::SuperMarioBros => &[(Action::Noop, 60), (Action::Start, 10)],
        }
    }

    /// Reward earned by the frame that produced `ram`.
    pub fn reward(self, ram: &[u8], state: &mut ProfileState) -> i32 {
        match self {
            GameProfile::Generic => 0,
            GameProfile::SuperMarioBros => {
                let new_x = read(ram, smb::PLAYER_X) as i32;
                let mut delta_x = (new_x - state.x) * smb::X_REWARD_SCALE;
                if delta_x.abs() > smb::MAX_X_CHANGE {
                    delta_x = 0;
                    state.x = 0;
                } else {
                    state.x = new_x;
                }

                let new_score = smb_score(ram);
                let score_reward = (new_score - state.score).max(0);
                state.score = new_score;
                score_reward as i32 + delta_x
            }
        }
    }

    /// Checks the game-over condition. A finished game clears the bookkeeping.
    pub fn game_over(self, ram: &[u8], state: &mut ProfileState) -> bool {
        match self {
            GameProfile::Generic => false,
            GameProfile::SuperMarioBros => {
                if read(ram, smb::GAME_STATE) == smb::GAME_STATE_PLAYING {
                    return false;
                }
                *state = ProfileState::default();
                true
            }
        }
    }

    pub fn lives(self, ram: &[u8]) -> u32 {
        match self {
            GameProfile::Generic => 0,
            GameProfile::SuperMarioBros => read(ram, smb::LIVES) as u32,
        }
    }

    /// `(min, max)` instantaneous reward.
    pub fn reward_range(self) -> (i32, i32) {
        match self {
            GameProfile::Generic => (0, 0),
            GameProfile::SuperMarioBros => (
                -smb::MAX_X_CHANGE,
                smb::MAX_SCORE as i32 + smb::MAX_X_CHANGE,
            ),
        }
    }
}

fn smb_score(ram: &[u8]) -> i64 {
    smb::SCORE_WEIGHTS
        .iter()
        .enumerate()
        .map(|(i, weight)| read(ram, smb::SCORE_DIGITS + i as u16) as i64 * weight)
        .sum()
}

fn read(ram: &[u8], addr: u16) -> u8 {
    ram.get(addr as usize).copied().unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ram() -> Vec<u8> {
        let mut ram = vec![0u8; 2048];
        ram[smb::GAME_STATE as usize] = smb::GAME_STATE_PLAYING;
        ram
    }

    #[test]
    fn generic_profile_is_inert() {
        let mut state = ProfileState::default();
        let ram = vec![0xFF; 2048];
        assert_eq!(GameProfile::Generic.reward(&ram, &mut state), 0);
        assert!(!GameProfile::Generic.game_over(&ram, &mut state));
        assert_eq!(GameProfile::Generic.lives(&ram), 0);
        assert!(GameProfile::Generic.reset_sequence().is_empty());
    }

    #[test]
    fn smb_rewards_score_and_forward_motion() {
        let profile = GameProfile::SuperMarioBros;
        let mut state = ProfileState::default();
        let mut ram = ram();

        ram[smb::PLAYER_X as usize] = 10;
        assert_eq!(profile.reward(&ram, &mut state), 50);

        ram[smb::PLAYER_X as usize] = 12;
        ram[smb::SCORE_DIGITS as usize + 3] = 2; // 2000 points
        assert_eq!(profile.reward(&ram, &mut state), 2_000 + 10);
        assert_eq!(state.score, 2_000);
    }

    #[test]
    fn smb_ignores_large_jumps_and_score_drops() {
        let profile = GameProfile::SuperMarioBros;
        let mut state = ProfileState { score: 5_000, x: 200 };
        let mut ram = ram();
        ram[smb::PLAYER_X as usize] = 3;

        assert_eq!(profile.reward(&ram, &mut state), 0);
        assert_eq!(state.x, 0);
        assert_eq!(state.score, 0);
    }

    #[test]
    fn smb_game_over_clears_bookkeeping() {
        let profile = GameProfile::SuperMarioBros;
        let mut state = ProfileState { score: 100, x: 40 };
        let mut ram = ram();
        assert!(!profile.game_over(&ram, &mut state));
        assert_eq!(state.x, 40);

        ram[smb::GAME_STATE as usize] = 0;
        ram[smb::LIVES as usize] = 2;
        assert!(profile.game_over(&ram, &mut state));
        assert_eq!(state, ProfileState::default());
        assert_eq!(profile.lives(&ram), 2);
    }
}
