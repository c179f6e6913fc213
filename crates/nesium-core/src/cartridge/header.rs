//! iNES / NES 2.0 header parsing.
//!
//! The first 16 bytes of every `.nes` image describe how much PRG/CHR data
//! follows, which mapper the board uses and how nametables are mirrored. Only
//! the fields the core needs to build a cartridge are kept.

use bitflags::bitflags;

use crate::error::Error;

const NES_MAGIC: &[u8; 4] = b"NES\x1A";

/// Size of the fixed iNES header in bytes.
pub const NES_HEADER_LEN: usize = 16;

const PRG_UNIT: usize = 16 * 1024;
const CHR_UNIT: usize = 8 * 1024;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Flags6: u8 {
        const MIRRORING        = 0b0000_0001;
        const BATTERY          = 0b0000_0010;
        const TRAINER          = 0b0000_0100;
        const FOUR_SCREEN      = 0b0000_1000;
        const MAPPER_LOW_MASK  = 0b1111_0000;
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Flags7: u8 {
        const VS_UNISYSTEM     = 0b0000_0001;
        const PLAYCHOICE_10    = 0b0000_0010;
        const NES2_DETECTION   = 0b0000_1100;
        const MAPPER_HIGH_MASK = 0b1111_0000;
    }
}

/// Nametable layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mirroring {
    Horizontal,
    Vertical,
    /// The board supplies extra nametable RAM. Only the console's 2 KiB is
    /// modelled, so the upper pair aliases the lower pair.
    FourScreen,
    SingleScreenLower,
    SingleScreenUpper,
}

impl Mirroring {
    /// Maps a nametable address (`$2000-$2FFF` and mirrors) onto CIRAM.
    pub fn ciram_index(self, addr: u16) -> usize {
        let offset = (addr & 0x0FFF) as usize;
        let table = offset / 0x400;
        let page = match self {
            Self::Horizontal => table >> 1,
            Self::Vertical | Self::FourScreen => table & 1,
            Self::SingleScreenLower => 0,
            Self::SingleScreenUpper => 1,
        };
        page * 0x400 + (offset & 0x3FF)
    }
}

/// Identifies the header flavour encountered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RomFormat {
    /// The original iNES 1.0 specification.
    INes,
    /// NES 2.0 with extended sizing and metadata fields.
    Nes20,
    /// Rare prototypes that pre-date the iNES standard.
    Archaic,
}

impl RomFormat {
    fn from_flags7(flags7: Flags7) -> Self {
        match (flags7.bits() >> 2) & 0b11 {
            0b10 => Self::Nes20,
            0b00 => Self::INes,
            _ => Self::Archaic,
        }
    }
}

/// Parsed cartridge header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Header {
    pub format: RomFormat,
    /// Mapper ID (0 == NROM, 2 == UxROM, ...).
    pub mapper: u16,
    /// NES 2.0 submapper value. Always 0 for legacy iNES files.
    pub submapper: u8,
    pub mirroring: Mirroring,
    pub battery_backed_ram: bool,
    /// Whether a 512 byte trainer sits between the header and PRG data.
    pub trainer_present: bool,
    /// Amount of PRG ROM in bytes.
    pub prg_rom_size: usize,
    /// Amount of CHR ROM in bytes. Zero means the board carries CHR RAM.
    pub chr_rom_size: usize,
}

impl Header {
    /// Parse a header from the first [`NES_HEADER_LEN`] bytes of `bytes`.
    pub fn parse(bytes: &[u8]) -> Result<Self, Error> {
        if bytes.len() < NES_HEADER_LEN {
            return Err(Error::TooShort {
                actual: bytes.len(),
            });
        }

        if &bytes[0..4] != NES_MAGIC {
            return Err(Error::InvalidMagic);
        }

        let flags6 = Flags6::from_bits_truncate(bytes[6]);
        let flags7 = Flags7::from_bits_truncate(bytes[7]);

        let format = RomFormat::from_flags7(flags7);
        let (mapper, submapper, prg_rom_size, chr_rom_size) = match format {
            RomFormat::INes => (
                combine_mapper(flags6, flags7, 0),
                0,
                bytes[4] as usize * PRG_UNIT,
                bytes[5] as usize * CHR_UNIT,
            ),
            RomFormat::Nes20 => {
                let prg_msb = bytes[9] & 0x0F;
                let chr_msb = bytes[9] >> 4;
                // Exponent-multiplier sizing is only used by a handful of
                // oversized homebrew images.
                if prg_msb == 0x0F || chr_msb == 0x0F {
                    return Err(Error::UnsupportedFormat(format));
                }
                (
                    combine_mapper(flags6, flags7, bytes[8] & 0x0F),
                    bytes[8] >> 4,
                    (((prg_msb as usize) << 8) | bytes[4] as usize) * PRG_UNIT,
                    (((chr_msb as usize) << 8) | bytes[5] as usize) * CHR_UNIT,
                )
            }
            RomFormat::Archaic => return Err(Error::UnsupportedFormat(format)),
        };

        if prg_rom_size == 0 {
            return Err(Error::EmptyPrgRom);
        }

        Ok(Self {
            format,
            mapper,
            submapper,
            mirroring: resolve_mirroring(flags6),
            battery_backed_ram: flags6.contains(Flags6::BATTERY),
            trainer_present: flags6.contains(Flags6::TRAINER),
            prg_rom_size,
            chr_rom_size,
        })
    }
}

fn resolve_mirroring(flags6: Flags6) -> Mirroring {
    if flags6.contains(Flags6::FOUR_SCREEN) {
        Mirroring::FourScreen
    } else if flags6.contains(Flags6::MIRRORING) {
        Mirroring::Vertical
    } else {
        Mirroring::Horizontal
    }
}

fn combine_mapper(flags6: Flags6, flags7: Flags7, upper: u8) -> u16 {
    let lower = (flags6.bits() >> 4) as u16;
    let middle = (flags7.bits() & Flags7::MAPPER_HIGH_MASK.bits()) as u16;
    ((upper as u16) << 8) | middle | lower
}
