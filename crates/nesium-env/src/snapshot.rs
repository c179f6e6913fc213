//! Snapshot handles and the per-session arena that owns snapshot bodies.
//!
//! A handle is an arena slot plus a generation and the id of the session that
//! minted it. Handles are move-only and [`Session::release`] consumes them, so
//! double release and use-after-release do not compile. Dropping a handle
//! queues its slot for reclamation on the owning session. Handles that are
//! foreign or stale are rejected at runtime with
//! [`Error::InvalidHandle`](crate::Error::InvalidHandle).

use std::{
    fmt,
    marker::PhantomData,
    sync::{Arc, Weak},
};

use nesium_core::rng::SplitMix64;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    engine::Engine,
    error::{Error, Result},
    session::{EpisodeState, Session, SessionId},
};

/// Which parts of the session a snapshot covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum StateKind {
    /// Console and episode state, without the RNG.
    Environment = 0,
    /// Everything in `Environment` plus the RNG.
    System = 1,
}

impl StateKind {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(StateKind::Environment),
            1 => Some(StateKind::System),
            _ => None,
        }
    }
}

mod sealed {
    pub trait Sealed {}
}

/// Type-level snapshot kind carried by [`StateHandle`].
pub trait SnapshotKind: sealed::Sealed {
    const KIND: StateKind;
}

/// Marker for [`EnvironmentState`].
#[derive(Debug)]
pub enum Environment {}

/// Marker for [`SystemState`].
#[derive(Debug)]
pub enum System {}

impl sealed::Sealed for Environment {}
impl sealed::Sealed for System {}

impl SnapshotKind for Environment {
    const KIND: StateKind = StateKind::Environment;
}

impl SnapshotKind for System {
    const KIND: StateKind = StateKind::System;
}

/// `(slot, generation)` pairs of handles dropped without `release`.
type DropQueue = Mutex<Vec<(u32, u32)>>;

/// Owned reference to a snapshot stored in a session.
#[must_use = "dropping a handle frees its snapshot"]
pub struct StateHandle<K: SnapshotKind> {
    slot: u32,
    generation: u32,
    owner: SessionId,
    dropped: Weak<DropQueue>,
    _kind: PhantomData<fn() -> K>,
}

pub type EnvironmentState = StateHandle<Environment>;
pub type SystemState = StateHandle<System>;

impl<K: SnapshotKind> StateHandle<K> {
    pub fn kind(&self) -> StateKind {
        K::KIND
    }
}

impl<K: SnapshotKind> Drop for StateHandle<K> {
    fn drop(&mut self) {
        if let Some(queue) = self.dropped.upgrade() {
            queue.lock().push((self.slot, self.generation));
        }
    }
}

impl<K: SnapshotKind> fmt::Debug for StateHandle<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateHandle")
            .field("kind", &K::KIND)
            .field("slot", &self.slot)
            .field("generation", &self.generation)
            .finish()
    }
}

/// Compatibility data stored with every snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotMeta {
    /// [`Engine::STATE_VERSION`] of the engine that produced the body.
    pub engine_version: u32,
    pub kind: StateKind,
    /// SHA-1 of the ROM the snapshot was taken from.
    pub rom_digest: [u8; 20],
    /// Session frame number at capture.
    pub tick: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct SnapshotBody<S> {
    pub(crate) engine: S,
    pub(crate) episode: EpisodeState,
    /// Present only for [`StateKind::System`].
    pub(crate) rng: Option<SplitMix64>,
}

/// Arena entry; also the serialized payload of the state codec.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct StoredState<S> {
    pub(crate) meta: SnapshotMeta,
    pub(crate) body: SnapshotBody<S>,
}

impl<S> StoredState<S> {
    /// Body and metadata agree on the kind.
    pub(crate) fn is_consistent(&self) -> bool {
        (self.meta.kind == StateKind::System) == self.body.rng.is_some()
    }
}

#[derive(Debug)]
struct Slot<T> {
    generation: u32,
    entry: Option<T>,
}

/// Slot storage with generation counters; freed slots are reused.
#[derive(Debug)]
pub(crate) struct SnapshotArena<T> {
    slots: Vec<Slot<T>>,
    free: Vec<u32>,
    live: usize,
    dropped: Arc<DropQueue>,
}

impl<T> SnapshotArena<T> {
    pub(crate) fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            live: 0,
            dropped: Arc::default(),
        }
    }

    fn drop_queue(&self) -> Weak<DropQueue> {
        Arc::downgrade(&self.dropped)
    }

    /// Frees the slots of dropped handles. Returns how many were freed.
    pub(crate) fn reclaim(&mut self) -> usize {
        let pending = std::mem::take(&mut *self.dropped.lock());
        pending
            .into_iter()
            .filter(|&(index, generation)| self.remove(index, generation).is_some())
            .count()
    }

    /// Returns `(slot, generation)`.
    pub(crate) fn insert(&mut self, entry: T) -> (u32, u32) {
        self.live += 1;
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.entry = Some(entry);
            return (index, slot.generation);
        }
        let index = self.slots.len() as u32;
        self.slots.push(Slot {
            generation: 0,
            entry: Some(entry),
        });
        (index, 0)
    }

    pub(crate) fn get(&self, index: u32, generation: u32) -> Option<&T> {
        self.slots
            .get(index as usize)
            .filter(|slot| slot.generation == generation)
            .and_then(|slot| slot.entry.as_ref())
    }

    pub(crate) fn remove(&mut self, index: u32, generation: u32) -> Option<T> {
        let slot = self.slots.get_mut(index as usize)?;
        if slot.generation != generation {
            return None;
        }
        let entry = slot.entry.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(index);
        self.live -= 1;
        Some(entry)
    }

    /// Live entries, not counting those whose handles were dropped.
    pub(crate) fn len(&self) -> usize {
        self.live.saturating_sub(self.dropped.lock().len())
    }
}

impl<E: Engine> Session<E> {
    /// Captures console and episode state, leaving the RNG out.
    pub fn clone_environment(&mut self) -> Result<EnvironmentState> {
        self.capture()
    }

    /// Captures console, episode and RNG state.
    pub fn clone_system(&mut self) -> Result<SystemState> {
        self.capture()
    }

    /// Restores console and episode state. The RNG keeps advancing from where
    /// it is, so sibling restores draw fresh randomness.
    pub fn restore_environment(&mut self, state: &EnvironmentState) -> Result<()> {
        self.restore(state)
    }

    /// Restores console, episode and RNG state.
    pub fn restore_system(&mut self, state: &SystemState) -> Result<()> {
        self.restore(state)
    }

    /// Frees the snapshot behind `state`.
    ///
    /// Never fails for a handle this session minted. A handle from another
    /// session is refused with `InvalidHandle` and dropped, which hands its
    /// snapshot back to the owner for reclamation.
    pub fn release<K: SnapshotKind>(&mut self, mut state: StateHandle<K>) -> Result<()> {
        self.check_owner(&state)?;
        state.dropped = Weak::new();
        self.snapshots
            .remove(state.slot, state.generation)
            .map(drop)
            .ok_or_else(|| Error::invalid_handle("snapshot already released"))
    }

    /// Metadata of a live snapshot.
    pub fn snapshot_meta<K: SnapshotKind>(&self, state: &StateHandle<K>) -> Result<&SnapshotMeta> {
        self.stored(state).map(|stored| &stored.meta)
    }

    /// Snapshots currently held by this session.
    pub fn live_snapshots(&self) -> usize {
        self.snapshots.len()
    }

    fn capture<K: SnapshotKind>(&mut self) -> Result<StateHandle<K>> {
        let engine = self
            .engine
            .save_state()
            .map_err(|e| Error::Engine(Box::new(e)))?;
        let stored = StoredState {
            meta: SnapshotMeta {
                engine_version: E::STATE_VERSION,
                kind: K::KIND,
                rom_digest: self.rom_digest,
                tick: self.frame_number(),
            },
            body: SnapshotBody {
                engine,
                episode: self.episode.clone(),
                rng: (K::KIND == StateKind::System).then_some(self.rng),
            },
        };
        debug!(kind = ?K::KIND, tick = stored.meta.tick, "snapshot captured");
        Ok(self.register(stored))
    }

    /// Stores a snapshot and mints a handle owned by this session.
    pub(crate) fn register<K: SnapshotKind>(
        &mut self,
        stored: StoredState<E::State>,
    ) -> StateHandle<K> {
        let reclaimed = self.snapshots.reclaim();
        if reclaimed > 0 {
            debug!(session = self.id.0, reclaimed, "dropped snapshots reclaimed");
        }
        let (slot, generation) = self.snapshots.insert(stored);
        StateHandle {
            slot,
            generation,
            owner: self.id,
            dropped: self.snapshots.drop_queue(),
            _kind: PhantomData,
        }
    }

    fn restore<K: SnapshotKind>(&mut self, state: &StateHandle<K>) -> Result<()> {
        self.check_owner(state)?;
        let stored = self
            .snapshots
            .get(state.slot, state.generation)
            .ok_or_else(|| Error::invalid_handle("snapshot already released"))?;
        check_compatible::<E>(&stored.meta, K::KIND, &self.rom_digest)?;

        self.engine
            .load_state(&stored.body.engine)
            .map_err(|e| Error::Engine(Box::new(e)))?;
        self.episode = stored.body.episode.clone();
        if let Some(rng) = stored.body.rng {
            self.rng = rng;
        }
        debug!(kind = ?K::KIND, tick = stored.meta.tick, "snapshot restored");
        Ok(())
    }

    pub(crate) fn stored<K: SnapshotKind>(
        &self,
        state: &StateHandle<K>,
    ) -> Result<&StoredState<E::State>> {
        self.check_owner(state)?;
        self.snapshots
            .get(state.slot, state.generation)
            .ok_or_else(|| Error::invalid_handle("snapshot already released"))
    }

    fn check_owner<K: SnapshotKind>(&self, state: &StateHandle<K>) -> Result<()> {
        if state.owner != self.id {
            return Err(Error::invalid_handle("handle belongs to another session"));
        }
        Ok(())
    }
}

fn check_compatible<E: Engine>(
    meta: &SnapshotMeta,
    kind: StateKind,
    rom_digest: &[u8; 20],
) -> Result<()> {
    if meta.kind != kind {
        return Err(Error::invalid_handle("snapshot kind does not match handle"));
    }
    if meta.engine_version != E::STATE_VERSION {
        return Err(Error::invalid_handle("snapshot was taken by another engine version"));
    }
    if &meta.rom_digest != rom_digest {
        return Err(Error::invalid_handle("snapshot was taken from another ROM"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arena_reuses_slots_with_new_generation() {
        let mut arena = SnapshotArena::new();
        let (a, gen_a) = arena.insert("a");
        assert_eq!(arena.remove(a, gen_a), Some("a"));
        let (b, gen_b) = arena.insert("b");
        assert_eq!(a, b);
        assert_ne!(gen_a, gen_b);
        assert_eq!(arena.get(a, gen_a), None);
        assert_eq!(arena.get(b, gen_b), Some(&"b"));
        assert_eq!(arena.len(), 1);
    }

    #[test]
    fn arena_remove_is_exactly_once() {
        let mut arena = SnapshotArena::new();
        let (slot, generation) = arena.insert(7u8);
        assert_eq!(arena.remove(slot, generation), Some(7));
        assert_eq!(arena.remove(slot, generation), None);
        assert_eq!(arena.len(), 0);
    }

    #[test]
    fn reclaim_frees_queued_slots_once() {
        let mut arena = SnapshotArena::new();
        let (a, gen_a) = arena.insert('a');
        let (b, gen_b) = arena.insert('b');
        arena.dropped.lock().push((a, gen_a));
        assert_eq!(arena.len(), 1);

        assert_eq!(arena.reclaim(), 1);
        assert_eq!(arena.get(a, gen_a), None);
        assert_eq!(arena.get(b, gen_b), Some(&'b'));

        // A pair whose slot was already freed is ignored.
        arena.dropped.lock().push((a, gen_a));
        assert_eq!(arena.reclaim(), 0);
        assert_eq!(arena.len(), 1);
    }

    #[test]
    fn kind_byte_roundtrip() {
        for kind in [StateKind::Environment, StateKind::System] {
            assert_eq!(StateKind::from_u8(kind as u8), Some(kind));
        }
        assert_eq!(StateKind::from_u8(2), None);
    }
}
