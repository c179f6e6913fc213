//! Master palette: maps the PPU's 6-bit color indices to RGB and luma.
//!
//! The PPU itself only ever emits indices (`0x00..=0x3F`). Turning them into
//! pixels is a lookup, so frontends and observation pipelines can pick the
//! table without touching the renderer.

/// Number of entries in the NES master palette.
pub const PALETTE_SIZE: usize = 64;

pub type Rgb = [u8; 3];

/// Built-in palette tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PaletteKind {
    /// The common 2C02 NTSC reference palette.
    #[default]
    Ntsc2C02,
    /// Every entry replaced by its own BT.601 luma.
    Monochrome,
}

#[rustfmt::skip]
const NTSC_2C02: [Rgb; PALETTE_SIZE] = [
    [ 84,  84,  84], [  0,  30, 116], [  8,  16, 144], [ 48,   0, 136],
    [ 68,   0, 100], [ 92,   0,  48], [ 84,   4,   0], [ 60,  24,   0],
    [ 32,  42,   0], [  8,  58,   0], [  0,  64,   0], [  0,  60,   0],
    [  0,  50,  60], [  0,   0,   0], [  0,   0,   0], [  0,   0,   0],

    [152, 150, 152], [  8,  76, 196], [ 48,  50, 236], [ 92,  30, 228],
    [136,  20, 176], [160,  20, 100], [152,  34,  32], [120,  60,   0],
    [ 84,  90,   0], [ 40, 114,   0], [  8, 124,   0], [  0, 118,  40],
    [  0, 102, 120], [  0,   0,   0], [  0,   0,   0], [  0,   0,   0],

    [236, 238, 236], [ 76, 154, 236], [120, 124, 236], [176,  98, 236],
    [228,  84, 236], [236,  88, 180], [236, 106, 100], [212, 136,  32],
    [160, 170,   0], [116, 196,   0], [ 76, 208,  32], [ 56, 204, 108],
    [ 56, 180, 204], [ 60,  60,  60], [  0,   0,   0], [  0,   0,   0],

    [236, 238, 236], [168, 204, 236], [188, 188, 236], [212, 178, 236],
    [236, 174, 236], [236, 174, 212], [236, 180, 176], [228, 196, 144],
    [204, 210, 120], [180, 222, 120], [168, 226, 144], [152, 226, 180],
    [160, 214, 228], [160, 162, 160], [  0,   0,   0], [  0,   0,   0],
];

/// RGB plus precomputed luma for all 64 indices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Palette {
    colors: [Rgb; PALETTE_SIZE],
    luma: [u8; PALETTE_SIZE],
}

impl Palette {
    pub fn new(kind: PaletteKind) -> Self {
        let palette = Self::from_rgb(NTSC_2C02);
        match kind {
            PaletteKind::Ntsc2C02 => palette,
            PaletteKind::Monochrome => {
                let mut colors = [[0; 3]; PALETTE_SIZE];
                for (dst, &y) in colors.iter_mut().zip(palette.luma.iter()) {
                    *dst = [y, y, y];
                }
                Self::from_rgb(colors)
            }
        }
    }

    /// Builds a palette from a caller-supplied table.
    pub fn from_rgb(colors: [Rgb; PALETTE_SIZE]) -> Self {
        let mut luma = [0u8; PALETTE_SIZE];
        for (y, rgb) in luma.iter_mut().zip(colors.iter()) {
            *y = bt601_luma(*rgb);
        }
        Self { colors, luma }
    }

    /// Color for a 6-bit index. Upper bits are ignored.
    #[inline]
    pub fn rgb(&self, index: u8) -> Rgb {
        self.colors[(index & 0x3F) as usize]
    }

    /// Grayscale intensity for a 6-bit index.
    #[inline]
    pub fn luma(&self, index: u8) -> u8 {
        self.luma[(index & 0x3F) as usize]
    }

    pub fn colors(&self) -> &[Rgb; PALETTE_SIZE] {
        &self.colors
    }
}

impl Default for Palette {
    fn default() -> Self {
        Self::new(PaletteKind::default())
    }
}

/// ITU-R BT.601 weighting, rounded to nearest.
fn bt601_luma([r, g, b]: Rgb) -> u8 {
    ((299 * r as u32 + 587 * g as u32 + 114 * b as u32 + 500) / 1000) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn black_and_white_luma() {
        let palette = Palette::default();
        assert_eq!(palette.luma(0x0F), 0);
        assert_eq!(palette.rgb(0x30), [236, 238, 236]);
        assert_eq!(palette.luma(0x30), 237);
    }

    #[test]
    fn index_is_masked_to_six_bits() {
        let palette = Palette::default();
        assert_eq!(palette.rgb(0x41), palette.rgb(0x01));
    }

    #[test]
    fn monochrome_entries_are_gray() {
        let mono = Palette::new(PaletteKind::Monochrome);
        let color = Palette::default();
        for index in 0..PALETTE_SIZE as u8 {
            let [r, g, b] = mono.rgb(index);
            assert_eq!((r, r), (g, b));
            assert_eq!(r, color.luma(index));
        }
    }
}
