use std::{
    fmt,
    path::Path,
    sync::atomic::{AtomicU64, Ordering},
};

use nesium_core::{Nes, controller::Buttons, rng::SplitMix64};
use serde::{Deserialize, Serialize};
use sha1::{Digest, Sha1};
use tracing::{debug, warn};

use crate::{
    action::Action,
    config::{InvalidActionPolicy, SessionConfig},
    context::EngineContext,
    engine::Engine,
    error::{Error, Result},
    profile::{GameProfile, ProfileState},
    snapshot::{SnapshotArena, StoredState},
};

/// Per-step reward signal.
pub type Reward = i32;

static NEXT_SESSION_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique session identity, stamped into every snapshot handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct SessionId(pub(crate) u64);

impl SessionId {
    fn next() -> Self {
        Self(NEXT_SESSION_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// Where the session is in its episode lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Phase {
    /// ROM loaded, no action taken yet.
    #[default]
    Loaded,
    Playing,
    GameOver,
}

/// Episode bookkeeping. Captured by both snapshot kinds.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub(crate) struct EpisodeState {
    pub(crate) episode_frame_number: u64,
    pub(crate) terminal: bool,
    pub(crate) phase: Phase,
    pub(crate) last_action: Action,
    pub(crate) episode_score: i64,
    pub(crate) profile: ProfileState,
}

/// One loaded cartridge driven as an environment.
///
/// All mutating calls take `&mut self`; distinct sessions share nothing and
/// may live on different threads.
pub struct Session<E: Engine = Nes> {
    pub(crate) id: SessionId,
    pub(crate) engine: E,
    config: SessionConfig,
    pub(crate) rom_digest: [u8; 20],
    width: usize,
    height: usize,
    ram_size: usize,
    /// Frames emulated since load. Never rewound.
    frame_number: u64,
    pub(crate) episode: EpisodeState,
    pub(crate) rng: SplitMix64,
    pub(crate) snapshots: SnapshotArena<StoredState<E::State>>,
}

impl Session<Nes> {
    /// Loads a ROM file with the default context and configuration.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        EngineContext::<Nes>::default().create_session(path, SessionConfig::default())
    }

    pub fn from_rom_bytes(rom: &[u8]) -> Result<Self> {
        EngineContext::<Nes>::default().create_session_from_bytes(rom, SessionConfig::default())
    }
}

impl<E: Engine> Session<E> {
    pub(crate) fn load(rom: &[u8], options: &E::Options, config: SessionConfig) -> Result<Self> {
        config.validate()?;
        let mut engine = E::load(rom, options).map_err(|e| Error::Load(Box::new(e)))?;
        engine.set_palette(config.palette);

        let mut rom_digest = [0u8; 20];
        rom_digest.copy_from_slice(&Sha1::digest(rom));
        let (width, height) = engine.screen_dims();
        let ram_size = engine.ram().len();
        let id = SessionId::next();

        debug!(
            session = id.0,
            width,
            height,
            ram_size,
            profile = ?config.profile,
            "session created"
        );

        Ok(Self {
            id,
            engine,
            rng: SplitMix64::new(config.seed),
            config,
            rom_digest,
            width,
            height,
            ram_size,
            frame_number: 0,
            episode: EpisodeState::default(),
            snapshots: SnapshotArena::new(),
        })
    }

    /// Tears the session down. Equivalent to dropping it.
    pub fn destroy(self) {}

    /// Power-cycles the cartridge and plays the profile's reset sequence.
    ///
    /// The sequence advances [`Session::frame_number`] but not the episode
    /// counter; afterwards the episode starts from frame 0.
    pub fn reset(&mut self) {
        self.engine.power_on();
        let mut warmup = 0u64;
        for &(action, frames) in self.config.profile.reset_sequence() {
            self.engine.set_input(action.buttons());
            for _ in 0..frames {
                self.engine.run_frame();
                warmup += 1;
            }
        }
        self.engine.set_input(Buttons::empty());
        self.frame_number += warmup;
        self.episode = EpisodeState {
            phase: Phase::Playing,
            ..EpisodeState::default()
        };
        debug!(session = self.id.0, warmup, "session reset");
    }

    /// Advances exactly one frame with `action` and returns its reward.
    ///
    /// Codes outside [`Action::LEGAL`] follow the configured
    /// [`InvalidActionPolicy`]. With sticky actions enabled the previous
    /// action may be applied instead of the requested one.
    pub fn act<A: Into<i32>>(&mut self, action: A) -> Result<Reward> {
        let code = action.into();
        let requested = match Action::from_code(code) {
            Some(action) => action,
            None => match self.config.invalid_action {
                InvalidActionPolicy::Reject => return Err(Error::InvalidAction { code }),
                InvalidActionPolicy::Noop => {
                    warn!(session = self.id.0, code, "illegal action code, stepping with NOOP");
                    Action::Noop
                }
            },
        };

        let p = self.config.repeat_action_probability;
        let applied = if p > 0.0 && self.rng.chance(p) {
            self.episode.last_action
        } else {
            requested
        };
        Ok(self.step_frame(applied))
    }

    fn step_frame(&mut self, action: Action) -> Reward {
        self.engine.set_input(action.buttons());
        self.engine.run_frame();
        self.frame_number += 1;

        let profile = self.config.profile;
        let episode = &mut self.episode;
        episode.episode_frame_number += 1;
        episode.last_action = action;

        let ram = self.engine.ram();
        let reward = profile.reward(ram, &mut episode.profile);
        episode.episode_score += reward as i64;

        let game_over = profile.game_over(ram, &mut episode.profile);
        let max = self.config.max_num_frames_per_episode;
        let out_of_frames = max > 0 && episode.episode_frame_number >= max;
        if game_over || out_of_frames {
            if !episode.terminal {
                debug!(
                    session = self.id.0,
                    frame = episode.episode_frame_number,
                    score = episode.episode_score,
                    game_over,
                    "episode ended"
                );
            }
            episode.terminal = true;
            episode.phase = Phase::GameOver;
        } else if !episode.terminal {
            episode.phase = Phase::Playing;
        }
        reward
    }

    pub fn is_terminal(&self) -> bool {
        self.episode.terminal
    }

    pub fn phase(&self) -> Phase {
        self.episode.phase
    }

    pub fn frame_number(&self) -> u64 {
        self.frame_number
    }

    pub fn episode_frame_number(&self) -> u64 {
        self.episode.episode_frame_number
    }

    pub fn legal_action_set(&self) -> &'static [Action] {
        &Action::LEGAL
    }

    pub fn minimal_action_set(&self) -> &'static [Action] {
        &Action::MINIMAL
    }

    pub fn num_legal_actions(&self) -> usize {
        Action::LEGAL.len()
    }

    pub fn lives(&self) -> u32 {
        self.config.profile.lives(self.engine.ram())
    }

    /// Caps future episodes (and the current one) at `frames`; `0` removes
    /// the cap.
    pub fn set_max_num_frames(&mut self, frames: u64) {
        self.config.max_num_frames_per_episode = frames;
    }

    pub fn min_reward(&self) -> Reward {
        self.config.profile.reward_range().0
    }

    pub fn max_reward(&self) -> Reward {
        self.config.profile.reward_range().1
    }

    /// In-game score as tracked by the profile.
    pub fn current_score(&self) -> i64 {
        self.episode.profile.score
    }

    /// Sum of rewards since the last reset.
    pub fn episode_score(&self) -> i64 {
        self.episode.episode_score
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn ram_size(&self) -> usize {
        self.ram_size
    }

    /// SHA-1 of the loaded ROM image.
    pub fn rom_digest(&self) -> &[u8; 20] {
        &self.rom_digest
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn profile(&self) -> GameProfile {
        self.config.profile
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }
}

impl<E: Engine> fmt::Debug for Session<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("config", &self.config)
            .field("frame_number", &self.frame_number)
            .field("episode", &self.episode)
            .field("snapshots", &self.snapshots.len())
            .finish_non_exhaustive()
    }
}

impl<E: Engine> Drop for Session<E> {
    fn drop(&mut self) {
        debug!(
            session = self.id.0,
            frames = self.frame_number,
            snapshots = self.snapshots.len(),
            "session destroyed"
        );
    }
}
