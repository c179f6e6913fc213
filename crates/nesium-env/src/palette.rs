//! Indexed-pixel to RGB and grayscale conversion through the engine palette.

use nesium_core::ppu::palette::Palette;

use crate::{
    engine::Engine,
    error::{Error, Result},
    session::Session,
};

/// Writes one RGB triple per index. Lengths must already be validated.
fn rgb_into(palette: &Palette, indexed: &[u8], out: &mut [u8]) {
    for (&index, px) in indexed.iter().zip(out.chunks_exact_mut(3)) {
        px.copy_from_slice(&palette.rgb(index));
    }
}

fn grayscale_into(palette: &Palette, indexed: &[u8], out: &mut [u8]) {
    for (&index, px) in indexed.iter().zip(out.iter_mut()) {
        *px = palette.luma(index);
    }
}

fn check_len(expected: usize, actual: usize) -> Result<()> {
    if expected == actual {
        Ok(())
    } else {
        Err(Error::size_mismatch(expected, actual))
    }
}

impl<E: Engine> Session<E> {
    /// Length of an indexed frame, `width * height`.
    pub fn screen_size(&self) -> usize {
        self.width() * self.height()
    }

    /// Converts an indexed frame into `height * width * 3` RGB bytes.
    pub fn to_rgb(&self, indexed: &[u8]) -> Result<Vec<u8>> {
        check_len(self.screen_size(), indexed.len())?;
        let mut out = vec![0u8; indexed.len() * 3];
        rgb_into(self.engine.palette(), indexed, &mut out);
        Ok(out)
    }

    /// Converts an indexed frame into `height * width` luma bytes.
    pub fn to_grayscale(&self, indexed: &[u8]) -> Result<Vec<u8>> {
        check_len(self.screen_size(), indexed.len())?;
        let mut out = vec![0u8; indexed.len()];
        grayscale_into(self.engine.palette(), indexed, &mut out);
        Ok(out)
    }

    /// Like [`Session::to_rgb`] into a caller buffer. Both lengths are
    /// checked before anything is written.
    pub fn fill_rgb(&self, indexed: &[u8], out: &mut [u8]) -> Result<()> {
        let pixels = self.screen_size();
        check_len(pixels, indexed.len())?;
        check_len(pixels * 3, out.len())?;
        rgb_into(self.engine.palette(), indexed, out);
        Ok(())
    }

    pub fn fill_grayscale(&self, indexed: &[u8], out: &mut [u8]) -> Result<()> {
        let pixels = self.screen_size();
        check_len(pixels, indexed.len())?;
        check_len(pixels, out.len())?;
        grayscale_into(self.engine.palette(), indexed, out);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nesium_core::ppu::palette::PaletteKind;

    #[test]
    fn rgb_follows_palette_table() {
        let palette = Palette::new(PaletteKind::Ntsc2C02);
        let indexed = [0x00, 0x21, 0x3F];
        let mut out = [0u8; 9];
        rgb_into(&palette, &indexed, &mut out);
        for (i, &index) in indexed.iter().enumerate() {
            assert_eq!(&out[i * 3..i * 3 + 3], &palette.rgb(index));
        }
    }

    #[test]
    fn grayscale_uses_luma_table() {
        let palette = Palette::new(PaletteKind::Ntsc2C02);
        let mut out = [0u8; 2];
        grayscale_into(&palette, &[0x20, 0x0F], &mut out);
        assert_eq!(out, [palette.luma(0x20), palette.luma(0x0F)]);
    }

    #[test]
    fn length_check_reports_both_sides() {
        match check_len(4, 3) {
            Err(Error::SizeMismatch { expected, actual }) => assert_eq!((expected, actual), (4, 3)),
            other => panic!("unexpected {other:?}"),
        }
    }
}
