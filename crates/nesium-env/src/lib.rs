//! Drive the Nesium NES core as a reinforcement-learning environment.
//!
//! A [`Session`] owns one loaded cartridge. It steps the console one frame per
//! [`Session::act`], exposes the picture and work RAM as byte buffers, and
//! checkpoints the simulation through move-only snapshot handles:
//!
//! - [`EnvironmentState`] captures the console and episode bookkeeping but not
//!   the session RNG, so sibling restores never perturb future random draws.
//! - [`SystemState`] additionally captures the RNG, so restoring it replays
//!   sticky-action decisions exactly.
//!
//! Snapshots can be serialized with [`Session::encode`] and brought back with
//! [`Session::decode`].

pub mod action;
pub mod codec;
pub mod config;
pub mod context;
pub mod engine;
pub mod error;
pub mod extract;
pub mod palette;
pub mod profile;
pub mod session;
pub mod snapshot;

pub use action::Action;
pub use codec::DecodedState;
pub use config::{InvalidActionPolicy, SessionConfig};
pub use context::EngineContext;
pub use engine::Engine;
pub use error::{Error, Result};
pub use profile::GameProfile;
pub use session::{Phase, Reward, Session};
pub use snapshot::{EnvironmentState, SnapshotMeta, StateKind, SystemState};

pub use nesium_core::ppu::palette::PaletteKind;
