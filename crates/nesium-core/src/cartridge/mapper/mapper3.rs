use crate::{
    cartridge::{
        TRAINER_SIZE,
        header::{Header, Mirroring},
        mapper::{
            ChrStorage, Mapper, allocate_prg_ram_with_trainer, read_prg_ram, write_prg_ram,
        },
    },
    memory::cpu as cpu_mem,
    state::nes::{MapperState, NesSaveStateError},
};

// Mapper 3 – CNROM: fixed PRG, 8 KiB CHR ROM banks selected by writes to
// `$8000-$FFFF`.

const CHR_BANK_SIZE: usize = 8 * 1024;

#[derive(Debug, Clone)]
pub struct Mapper3 {
    prg_rom: Box<[u8]>,
    prg_ram: Box<[u8]>,
    chr: ChrStorage,
    mirroring: Mirroring,
    chr_bank: u8,
}

impl Mapper3 {
    pub fn new(
        header: &Header,
        prg_rom: Box<[u8]>,
        chr_rom: Box<[u8]>,
        trainer: Option<&[u8; TRAINER_SIZE]>,
    ) -> Self {
        Self {
            prg_rom,
            prg_ram: allocate_prg_ram_with_trainer(trainer),
            chr: ChrStorage::select(chr_rom),
            mirroring: header.mirroring,
            chr_bank: 0,
        }
    }
}

impl Mapper for Mapper3 {
    fn cpu_read(&self, addr: u16) -> Option<u8> {
        match addr {
            cpu_mem::PRG_RAM_START..=cpu_mem::PRG_RAM_END => Some(read_prg_ram(&self.prg_ram, addr)),
            cpu_mem::PRG_ROM_START..=cpu_mem::CPU_ADDR_END => {
                let offset = (addr - cpu_mem::PRG_ROM_START) as usize;
                Some(self.prg_rom[offset % self.prg_rom.len()])
            }
            _ => None,
        }
    }

    fn cpu_write(&mut self, addr: u16, data: u8) {
        match addr {
            cpu_mem::PRG_RAM_START..=cpu_mem::PRG_RAM_END => {
                write_prg_ram(&mut self.prg_ram, addr, data)
            }
            cpu_mem::PRG_ROM_START..=cpu_mem::CPU_ADDR_END => self.chr_bank = data,
            _ => {}
        }
    }

    fn ppu_read(&self, addr: u16) -> u8 {
        let banks = (self.chr.len() / CHR_BANK_SIZE).max(1);
        let bank = self.chr_bank as usize % banks;
        self.chr
            .read_indexed(bank * CHR_BANK_SIZE + (addr as usize & 0x1FFF))
    }

    fn ppu_write(&mut self, addr: u16, data: u8) {
        self.chr.write(addr, data);
    }

    fn mirroring(&self) -> Mirroring {
        self.mirroring
    }

    fn mapper_id(&self) -> u16 {
        3
    }

    fn prg_ram(&self) -> &[u8] {
        &self.prg_ram
    }

    fn prg_ram_mut(&mut self) -> &mut [u8] {
        &mut self.prg_ram
    }

    fn chr(&self) -> &ChrStorage {
        &self.chr
    }

    fn chr_mut(&mut self) -> &mut ChrStorage {
        &mut self.chr
    }

    fn save_state(&self) -> MapperState {
        MapperState::Cnrom {
            chr_bank: self.chr_bank,
        }
    }

    fn load_state(&mut self, state: &MapperState) -> Result<(), NesSaveStateError> {
        match state {
            MapperState::Cnrom { chr_bank } => {
                self.chr_bank = *chr_bank;
                Ok(())
            }
            _ => Err(NesSaveStateError::CorruptState("mapper state kind mismatch")),
        }
    }
}
