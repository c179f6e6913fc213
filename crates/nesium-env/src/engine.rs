//! The emulator boundary. A [`Session`](crate::Session) only talks to the
//! console through [`Engine`], so the facade never reaches into CPU or PPU
//! internals.

use std::fmt::Debug;

use nesium_core::{
    Nes,
    cartridge,
    controller::Buttons,
    ppu::{
        SCREEN_HEIGHT, SCREEN_WIDTH,
        palette::{Palette, PaletteKind},
    },
    state::nes::{NesSaveStateError, NesState},
};
use serde::{Serialize, de::DeserializeOwned};

/// A console that can be stepped frame by frame and checkpointed.
pub trait Engine: Sized + Send {
    /// Construction options chosen when a session is created.
    type Options: Debug + Clone + Default + Send;
    /// Serializable body of a console snapshot.
    type State: Serialize + DeserializeOwned + Debug + Clone + Send;
    type LoadError: std::error::Error + Send + Sync + 'static;
    type StateError: std::error::Error + Send + Sync + 'static;

    /// Layout version of [`Engine::State`]; snapshots from another version
    /// are refused.
    const STATE_VERSION: u32;

    fn load(rom: &[u8], options: &Self::Options) -> Result<Self, Self::LoadError>;

    /// Returns the console to its power-on state with the same cartridge.
    fn power_on(&mut self);

    /// Buttons held on player one's pad for the next frame.
    fn set_input(&mut self, buttons: Buttons);

    fn run_frame(&mut self);

    /// `(width, height)` of [`Engine::screen`]; constant for an instance.
    fn screen_dims(&self) -> (usize, usize);

    /// The last picture as one palette index per pixel, row-major.
    fn screen(&self) -> &[u8];

    fn ram(&self) -> &[u8];

    fn palette(&self) -> &Palette;

    fn set_palette(&mut self, kind: PaletteKind);

    fn save_state(&self) -> Result<Self::State, Self::StateError>;

    fn load_state(&mut self, state: &Self::State) -> Result<(), Self::StateError>;
}

impl Engine for Nes {
    type Options = ();
    type State = NesState;
    type LoadError = nesium_core::error::Error;
    type StateError = NesSaveStateError;

    const STATE_VERSION: u32 = NesState::FORMAT_VERSION;

    fn load(rom: &[u8], _options: &Self::Options) -> Result<Self, Self::LoadError> {
        let cartridge = cartridge::load_cartridge(rom)?;
        let mut nes = Nes::new();
        nes.insert_cartridge(cartridge);
        Ok(nes)
    }

    fn power_on(&mut self) {
        self.power_on_reset();
    }

    fn set_input(&mut self, buttons: Buttons) {
        self.set_buttons(0, buttons);
    }

    fn run_frame(&mut self) {
        Nes::run_frame(self);
    }

    fn screen_dims(&self) -> (usize, usize) {
        (SCREEN_WIDTH, SCREEN_HEIGHT)
    }

    fn screen(&self) -> &[u8] {
        self.render_buffer()
    }

    fn ram(&self) -> &[u8] {
        Nes::ram(self)
    }

    fn palette(&self) -> &Palette {
        Nes::palette(self)
    }

    fn set_palette(&mut self, kind: PaletteKind) {
        Nes::set_palette(self, Palette::new(kind));
    }

    fn save_state(&self) -> Result<Self::State, Self::StateError> {
        Nes::save_state(self)
    }

    fn load_state(&mut self, state: &Self::State) -> Result<(), Self::StateError> {
        Nes::load_state(self, state)
    }
}
