use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::Context;
use clap::{Parser, ValueEnum};
use nesium_env::{Action, DecodedState, EngineContext, GameProfile, Session, SessionConfig};
use rand::{Rng, SeedableRng, rngs::StdRng};
use tracing::{Level, info};
use tracing_subscriber::FmtSubscriber;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Agent {
    /// Uniformly random legal actions.
    Random,
    /// Always NOOP.
    Noop,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Profile {
    Generic,
    Smb,
}

impl From<Profile> for GameProfile {
    fn from(profile: Profile) -> Self {
        match profile {
            Profile::Generic => GameProfile::Generic,
            Profile::Smb => GameProfile::SuperMarioBros,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "nesium-env-cli")]
#[command(about = "Drive a NES ROM as a reinforcement-learning environment", long_about = None)]
struct Args {
    /// iNES / NES 2.0 ROM image
    rom: PathBuf,

    /// Number of agent steps (frames) to run
    #[arg(long, default_value_t = 600)]
    steps: u64,

    #[arg(long, value_enum, default_value_t = Agent::Random)]
    agent: Agent,

    /// Seed for both the agent and the session RNG
    #[arg(long, default_value_t = 0)]
    seed: u64,

    /// Sticky-action probability in [0, 1]
    #[arg(long, default_value_t = 0.0)]
    sticky: f64,

    /// Episode frame limit (0 = unlimited)
    #[arg(long, default_value_t = 0)]
    max_frames: u64,

    #[arg(long, value_enum, default_value_t = Profile::Generic)]
    profile: Profile,

    /// Restore an encoded environment/system state before running
    #[arg(long)]
    load_state: Option<PathBuf>,

    /// Write an encoded system state after running
    #[arg(long)]
    save_state: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: Level,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(args.log_level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = SessionConfig::default()
        .with_seed(args.seed)
        .with_sticky_actions(args.sticky)
        .with_max_frames(args.max_frames)
        .with_profile(args.profile.into());
    let context: EngineContext = EngineContext::default();
    let mut session = context
        .create_session(&args.rom, config)
        .with_context(|| format!("loading {}", args.rom.display()))?;
    info!(
        rom = %args.rom.display(),
        sha1 = %hex::encode(session.rom_digest()),
        "ROM loaded"
    );

    session.reset();
    if let Some(path) = &args.load_state {
        load_state(&mut session, path)?;
    }

    let mut rng = StdRng::seed_from_u64(args.seed);
    let mut episodes = 0u32;
    let mut total_reward = 0i64;
    for _ in 0..args.steps {
        let action = match args.agent {
            Agent::Random => Action::LEGAL[rng.random_range(0..Action::LEGAL.len())],
            Agent::Noop => Action::Noop,
        };
        total_reward += session.act(action)? as i64;
        if session.is_terminal() {
            episodes += 1;
            info!(
                episode = episodes,
                frames = session.episode_frame_number(),
                score = session.episode_score(),
                "episode finished"
            );
            session.reset();
        }
    }

    info!(
        frames = session.frame_number(),
        episodes,
        total_reward,
        lives = session.lives(),
        "run complete"
    );

    if let Some(path) = &args.save_state {
        let state = session.clone_system()?;
        let bytes = session.encode_to_vec(&state)?;
        session.release(state)?;
        fs::write(path, &bytes).with_context(|| format!("writing {}", path.display()))?;
        info!(path = %path.display(), len = bytes.len(), "state saved");
    }
    Ok(())
}

fn load_state(session: &mut Session, path: &Path) -> anyhow::Result<()> {
    let bytes = fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    match session.decode(&bytes).context("decoding saved state")? {
        DecodedState::Environment(state) => {
            session.restore_environment(&state)?;
            session.release(state)?;
        }
        DecodedState::System(state) => {
            session.restore_system(&state)?;
            session.release(state)?;
        }
    }
    info!(path = %path.display(), "state restored");
    Ok(())
}
