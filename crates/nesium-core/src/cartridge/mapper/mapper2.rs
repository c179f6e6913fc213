use crate::{
    cartridge::{
        TRAINER_SIZE,
        header::{Header, Mirroring},
        mapper::{
            ChrStorage, Mapper, allocate_prg_ram_with_trainer, read_banked, read_prg_ram,
            write_prg_ram,
        },
    },
    memory::cpu as cpu_mem,
    state::nes::{MapperState, NesSaveStateError},
};

// Mapper 2 – UxROM.
//
// | Area | Address range | Behaviour                                  |
// |------|---------------|--------------------------------------------|
// | CPU  | `$8000-$BFFF` | 16 KiB switchable PRG ROM bank             |
// | CPU  | `$C000-$FFFF` | 16 KiB PRG ROM fixed to the last bank      |
// | CPU  | `$8000-$FFFF` | Writes select the switchable bank          |
// | PPU  | `$0000-$1FFF` | 8 KiB CHR RAM (CHR ROM on a few dumps)     |

const PRG_BANK_SIZE: usize = 16 * 1024;
const FIXED_WINDOW_START: u16 = 0xC000;

#[derive(Debug, Clone)]
pub struct Mapper2 {
    prg_rom: Box<[u8]>,
    prg_ram: Box<[u8]>,
    chr: ChrStorage,
    mirroring: Mirroring,
    bank_select: u8,
}

impl Mapper2 {
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
            bank_select: 0,
        }
    }

    fn last_bank(&self) -> usize {
        (self.prg_rom.len() / PRG_BANK_SIZE).saturating_sub(1)
    }
}

impl Mapper for Mapper2 {
    fn cpu_read(&self, addr: u16) -> Option<u8> {
        match addr {
            cpu_mem::PRG_RAM_START..=cpu_mem::PRG_RAM_END => Some(read_prg_ram(&self.prg_ram, addr)),
            cpu_mem::PRG_ROM_START..FIXED_WINDOW_START => Some(read_banked(
                &self.prg_rom,
                PRG_BANK_SIZE,
                self.bank_select as usize,
                (addr - cpu_mem::PRG_ROM_START) as usize,
            )),
            FIXED_WINDOW_START..=cpu_mem::CPU_ADDR_END => Some(read_banked(
                &self.prg_rom,
                PRG_BANK_SIZE,
                self.last_bank(),
                (addr - FIXED_WINDOW_START) as usize,
            )),
            _ => None,
        }
    }

    fn cpu_write(&mut self, addr: u16, data: u8) {
        match addr {
            cpu_mem::PRG_RAM_START..=cpu_mem::PRG_RAM_END => {
                write_prg_ram(&mut self.prg_ram, addr, data)
            }
            cpu_mem::PRG_ROM_START..=cpu_mem::CPU_ADDR_END => self.bank_select = data & 0x0F,
            _ => {}
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
        2
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
        MapperState::Uxrom {
            bank_select: self.bank_select,
        }
    }

    fn load_state(&mut self, state: &MapperState) -> Result<(), NesSaveStateError> {
        match state {
            MapperState::Uxrom { bank_select } => {
                self.bank_select = *bank_select;
                Ok(())
            }
            _ => Err(NesSaveStateError::CorruptState("mapper state kind mismatch")),
        }
    }
}
