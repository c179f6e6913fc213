//! Screen and RAM extraction. Every call is a pure read of the current
//! engine state.

use crate::{
    engine::Engine,
    error::{Error, Result},
    session::Session,
};

fn copy_exact(src: &[u8], dst: &mut [u8]) -> Result<()> {
    if src.len() != dst.len() {
        return Err(Error::size_mismatch(src.len(), dst.len()));
    }
    dst.copy_from_slice(src);
    Ok(())
}

impl<E: Engine> Session<E> {
    /// `(width, height)` of the picture.
    pub fn screen_dims(&self) -> (usize, usize) {
        (self.width(), self.height())
    }

    /// The current picture as `width * height` palette indices.
    pub fn screen(&self) -> Vec<u8> {
        self.engine.screen().to_vec()
    }

    /// Copies the current picture into `buf`, which must be exactly
    /// `width * height` bytes.
    pub fn fill_screen(&self, buf: &mut [u8]) -> Result<()> {
        copy_exact(self.engine.screen(), buf)
    }

    /// The work RAM, [`Session::ram_size`] bytes.
    pub fn ram(&self) -> Vec<u8> {
        self.engine.ram().to_vec()
    }

    pub fn fill_ram(&self, buf: &mut [u8]) -> Result<()> {
        copy_exact(self.engine.ram(), buf)
    }

    /// Current picture converted to `height * width * 3` RGB bytes.
    pub fn screen_rgb(&self) -> Result<Vec<u8>> {
        self.to_rgb(self.engine.screen())
    }

    pub fn fill_screen_rgb(&self, out: &mut [u8]) -> Result<()> {
        self.fill_rgb(self.engine.screen(), out)
    }

    /// Current picture converted to `height * width` luma bytes.
    pub fn screen_grayscale(&self) -> Result<Vec<u8>> {
        self.to_grayscale(self.engine.screen())
    }

    pub fn fill_screen_grayscale(&self, out: &mut [u8]) -> Result<()> {
        self.fill_grayscale(self.engine.screen(), out)
    }
}
