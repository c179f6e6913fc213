//! Save states.
//!
//! The console exposes its state as plain data structs behind the
//! `savestate-serde` feature; callers pick the wire format.

pub mod nes;
