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

// Mapper 0 – NROM.
//
// | Area | Address range | Behaviour                               |
// |------|---------------|-----------------------------------------|
// | CPU  | `$6000-$7FFF` | 8 KiB PRG RAM                           |
// | CPU  | `$8000-$FFFF` | 16 KiB (mirrored) or 32 KiB PRG ROM     |
// | PPU  | `$0000-$1FFF` | Fixed 8 KiB CHR ROM/RAM                 |

#[derive(Debug, Clone)]
pub struct Mapper0 {
    prg_rom: Box<[u8]>,
    prg_ram: Box<[u8]>,
    chr: ChrStorage,
    mirroring: Mirroring,
}

impl Mapper0 {
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
        }
    }
}

impl Mapper for Mapper0 {
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
        if (cpu_mem::PRG_RAM_START..=cpu_mem::PRG_RAM_END).contains(&addr) {
            write_prg_ram(&mut self.prg_ram, addr, data);
        }
    }

    fn ppu_read(&self, addr: u16) -> u8 {
        self.chr.read(addr)
    }

    fn ppu_write(&mut self, addr: u16, data: u8) {
        self.chr.write(addr, data);
    }

    fn mirroring(&self) -> Mirroring {
        self.mirroring
    }

    fn mapper_id(&self) -> u16 {
        0
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
        MapperState::Nrom
    }

    fn load_state(&mut self, state: &MapperState) -> Result<(), NesSaveStateError> {
        match state {
            MapperState::Nrom => Ok(()),
            _ => Err(NesSaveStateError::CorruptState("mapper state kind mismatch")),
        }
    }
}
