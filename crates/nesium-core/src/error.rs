use std::fmt;

use crate::cartridge::header::{NES_HEADER_LEN, RomFormat};

/// Reasons a byte image could not be turned into a [`crate::cartridge::Cartridge`].
#[derive(Debug)]
pub enum Error {
    /// Provided buffer is shorter than the 16-byte header.
    TooShort { actual: usize },
    /// Magic number ("NES<EOF>") is missing.
    InvalidMagic,
    /// Header advertises a format we do not implement.
    UnsupportedFormat(RomFormat),
    /// Header declares no PRG ROM at all.
    EmptyPrgRom,
    /// A ROM section (trainer/PRG/CHR) is shorter than advertised.
    SectionTooShort {
        section: &'static str,
        expected: usize,
        actual: usize,
    },
    /// The board is recognised but its mapper is not emulated.
    UnsupportedMapper { mapper: u16 },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TooShort { actual } => {
                write!(f, "header expected {NES_HEADER_LEN} bytes, got {actual}")
            }
            Self::InvalidMagic => write!(f, "missing NES magic bytes"),
            Self::UnsupportedFormat(format) => {
                write!(f, "unsupported cartridge header format: {format:?}")
            }
            Self::EmptyPrgRom => write!(f, "cartridge declares no PRG ROM"),
            Self::SectionTooShort {
                section,
                expected,
                actual,
            } => write!(
                f,
                "{section} section expected {expected} bytes, got {actual}"
            ),
            Self::UnsupportedMapper { mapper } => write!(f, "mapper {mapper} is not supported"),
        }
    }
}

impl std::error::Error for Error {}
