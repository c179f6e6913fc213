//! CHR storage shared by the discrete-logic boards.
//!
//! A board exposes either CHR ROM from the image or 8 KiB of CHR RAM when the
//! header declares no CHR ROM. Mappers that bank CHR pass an absolute index.

const CHR_RAM_SIZE: usize = 8 * 1024;

#[derive(Debug, Clone)]
pub enum ChrStorage {
    Rom(Box<[u8]>),
    Ram(Box<[u8]>),
}

impl ChrStorage {
    /// Picks CHR RAM when the image carries no CHR ROM.
    pub fn select(chr_rom: Box<[u8]>) -> Self {
        if chr_rom.is_empty() {
            Self::Ram(vec![0u8; CHR_RAM_SIZE].into_boxed_slice())
        } else {
            Self::Rom(chr_rom)
        }
    }

    fn bytes(&self) -> &[u8] {
        match self {
            Self::Rom(bytes) | Self::Ram(bytes) => bytes,
        }
    }

    /// Reads a pattern byte, applying 8 KiB mirroring.
    pub fn read(&self, addr: u16) -> u8 {
        self.read_indexed((addr & 0x1FFF) as usize)
    }

    /// Reads an absolute CHR index, wrapped to the storage length.
    pub fn read_indexed(&self, index: usize) -> u8 {
        let bytes = self.bytes();
        bytes[index % bytes.len()]
    }

    /// Writes land only when the board carries CHR RAM.
    pub fn write(&mut self, addr: u16, data: u8) {
        if let Self::Ram(ram) = self {
            let len = ram.len();
            ram[(addr as usize & 0x1FFF) % len] = data;
        }
    }

    pub fn len(&self) -> usize {
        self.bytes().len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes().is_empty()
    }

    pub fn as_ram(&self) -> Option<&[u8]> {
        match self {
            Self::Ram(ram) => Some(ram),
            Self::Rom(_) => None,
        }
    }

    pub fn as_ram_mut(&mut self) -> Option<&mut [u8]> {
        match self {
            Self::Ram(ram) => Some(ram),
            Self::Rom(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_rom_selects_ram() {
        let mut chr = ChrStorage::select(Box::new([]));
        assert_eq!(chr.len(), CHR_RAM_SIZE);
        chr.write(0x0123, 0x5A);
        assert_eq!(chr.read(0x0123), 0x5A);
        assert_eq!(chr.read(0x2123), 0x5A);
    }

    #[test]
    fn rom_ignores_writes() {
        let mut chr = ChrStorage::select(vec![0x11; CHR_RAM_SIZE].into_boxed_slice());
        chr.write(0x0000, 0xFF);
        assert_eq!(chr.read(0x0000), 0x11);
        assert!(chr.as_ram().is_none());
    }
}
