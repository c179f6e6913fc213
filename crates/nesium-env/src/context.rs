use std::{fmt, fs, path::Path};

use nesium_core::Nes;
use tracing::debug;

use crate::{
    config::SessionConfig,
    engine::Engine,
    error::{Error, Result},
    session::Session,
};

/// Engine initialisation context. Holds the engine options and creates
/// sessions; there is no process-global emulator state.
pub struct EngineContext<E: Engine = Nes> {
    options: E::Options,
}

impl<E: Engine> EngineContext<E> {
    pub fn new(options: E::Options) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &E::Options {
        &self.options
    }

    /// Reads a ROM file and creates a session for it.
    pub fn create_session<P: AsRef<Path>>(
        &self,
        path: P,
        config: SessionConfig,
    ) -> Result<Session<E>> {
        let path = path.as_ref();
        let rom = fs::read(path).map_err(|e| Error::Load(Box::new(e)))?;
        debug!(path = %path.display(), len = rom.len(), "read ROM image");
        self.create_session_from_bytes(&rom, config)
    }

    pub fn create_session_from_bytes(
        &self,
        rom: &[u8],
        config: SessionConfig,
    ) -> Result<Session<E>> {
        Session::load(rom, &self.options, config)
    }
}

impl<E: Engine> Default for EngineContext<E> {
    fn default() -> Self {
        Self::new(E::Options::default())
    }
}

impl<E: Engine> Clone for EngineContext<E> {
    fn clone(&self) -> Self {
        Self::new(self.options.clone())
    }
}

impl<E: Engine> fmt::Debug for EngineContext<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineContext")
            .field("options", &self.options)
            .finish()
    }
}
