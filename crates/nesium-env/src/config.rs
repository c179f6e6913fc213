use nesium_core::ppu::palette::PaletteKind;

use crate::{
    error::{Error, Result},
    profile::GameProfile,
};

/// What [`Session::act`](crate::Session::act) does with a code outside the
/// legal action set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InvalidActionPolicy {
    /// Fail with [`Error::InvalidAction`]; the session is left untouched.
    #[default]
    Reject,
    /// Log a warning and step the frame with no buttons held.
    Noop,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SessionConfig {
    /// Episode length cap in frames; `0` means unlimited.
    pub max_num_frames_per_episode: u64,
    /// Probability in `[0, 1]` that the previous action is repeated instead
    /// of the requested one.
    pub repeat_action_probability: f64,
    /// Seed for the session RNG.
    pub seed: u64,
    pub invalid_action: InvalidActionPolicy,
    pub profile: GameProfile,
    /// Palette used by the RGB and grayscale conversions.
    pub palette: PaletteKind,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_num_frames_per_episode: 0,
            repeat_action_probability: 0.0,
            seed: 0,
            invalid_action: InvalidActionPolicy::default(),
            profile: GameProfile::default(),
            palette: PaletteKind::default(),
        }
    }
}

impl SessionConfig {
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_sticky_actions(mut self, probability: f64) -> Self {
        self.repeat_action_probability = probability;
        self
    }

    pub fn with_max_frames(mut self, frames: u64) -> Self {
        self.max_num_frames_per_episode = frames;
        self
    }

    pub fn with_profile(mut self, profile: GameProfile) -> Self {
        self.profile = profile;
        self
    }

    pub fn with_palette(mut self, palette: PaletteKind) -> Self {
        self.palette = palette;
        self
    }

    pub fn with_invalid_action(mut self, policy: InvalidActionPolicy) -> Self {
        self.invalid_action = policy;
        self
    }

    pub fn validate(&self) -> Result<()> {
        let p = self.repeat_action_probability;
        if !(0.0..=1.0).contains(&p) {
            return Err(Error::InvalidConfig(format!(
                "repeat_action_probability must be within [0, 1], got {p}"
            )));
        }
        Ok(())
    }
}
