use tracing::debug;

use crate::{
    cartridge::header::{Header, Mirroring, NES_HEADER_LEN},
    error::Error,
};

use self::mapper::{Mapper0, Mapper2, Mapper3, Mapper7};

pub const TRAINER_SIZE: usize = 512;

pub mod header;
pub mod mapper;
pub use mapper::Mapper;

/// Mapper numbers [`load_cartridge`] can build a board for.
pub const SUPPORTED_MAPPERS: &[u16] = &[0, 2, 3, 7];

#[derive(Debug, Clone)]
pub struct Cartridge {
    header: Header,
    mapper: Box<dyn Mapper>,
}

impl Cartridge {
    pub fn new(header: Header, mapper: Box<dyn Mapper>) -> Self {
        Self { header, mapper }
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    pub fn mapper(&self) -> &dyn Mapper {
        self.mapper.as_ref()
    }

    pub fn mapper_mut(&mut self) -> &mut dyn Mapper {
        self.mapper.as_mut()
    }

    pub fn cpu_read(&self, addr: u16) -> Option<u8> {
        self.mapper.cpu_read(addr)
    }

    pub fn cpu_write(&mut self, addr: u16, data: u8) {
        self.mapper.cpu_write(addr, data);
    }

    pub fn ppu_read(&self, addr: u16) -> u8 {
        self.mapper.ppu_read(addr)
    }

    pub fn ppu_write(&mut self, addr: u16, data: u8) {
        self.mapper.ppu_write(addr, data);
    }

    pub fn mirroring(&self) -> Mirroring {
        self.mapper.mirroring()
    }
}

/// Load a cartridge from an in-memory byte slice.
pub fn load_cartridge(bytes: &[u8]) -> Result<Cartridge, Error> {
    let header_bytes = bytes.get(..NES_HEADER_LEN).ok_or(Error::TooShort {
        actual: bytes.len(),
    })?;
    let header = Header::parse(header_bytes)?;
    if !SUPPORTED_MAPPERS.contains(&header.mapper) {
        return Err(Error::UnsupportedMapper {
            mapper: header.mapper,
        });
    }

    let (trainer, prg_rom, chr_rom) = slice_sections(bytes, &header)?;
    let trainer = trainer.as_ref();

    let mapper: Box<dyn Mapper> = match header.mapper {
        0 => Box::new(Mapper0::new(&header, prg_rom, chr_rom, trainer)),
        2 => Box::new(Mapper2::new(&header, prg_rom, chr_rom, trainer)),
        3 => Box::new(Mapper3::new(&header, prg_rom, chr_rom, trainer)),
        7 => Box::new(Mapper7::new(&header, prg_rom, chr_rom, trainer)),
        mapper => return Err(Error::UnsupportedMapper { mapper }),
    };

    debug!(
        mapper = header.mapper,
        prg = header.prg_rom_size,
        chr = header.chr_rom_size,
        mirroring = ?header.mirroring,
        "cartridge loaded"
    );
    Ok(Cartridge::new(header, mapper))
}

type Sections = (Option<[u8; TRAINER_SIZE]>, Box<[u8]>, Box<[u8]>);

fn slice_sections(bytes: &[u8], header: &Header) -> Result<Sections, Error> {
    let mut cursor = NES_HEADER_LEN;
    let trainer = if header.trainer_present {
        let slice = section(bytes, &mut cursor, TRAINER_SIZE, "trainer")?;
        let mut trainer = [0u8; TRAINER_SIZE];
        trainer.copy_from_slice(slice);
        Some(trainer)
    } else {
        None
    };

    let prg_rom = section(bytes, &mut cursor, header.prg_rom_size, "PRG ROM")?;
    let chr_rom = section(bytes, &mut cursor, header.chr_rom_size, "CHR ROM")?;

    Ok((trainer, prg_rom.into(), chr_rom.into()))
}

fn section<'a>(
    bytes: &'a [u8],
    cursor: &mut usize,
    len: usize,
    name: &'static str,
) -> Result<&'a [u8], Error> {
    let too_short = || Error::SectionTooShort {
        section: name,
        expected: len,
        actual: bytes.len().saturating_sub(*cursor),
    };
    let end = cursor.checked_add(len).ok_or_else(too_short)?;
    let slice = bytes.get(*cursor..end).ok_or_else(too_short)?;
    *cursor = end;
    Ok(slice)
}
