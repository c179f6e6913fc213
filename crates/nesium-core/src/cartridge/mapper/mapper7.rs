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

// Mapper 7 – AxROM.
//
// | Area | Address range | Behaviour                                      |
// |------|---------------|------------------------------------------------|
// | CPU  | `$8000-$FFFF` | 32 KiB switchable PRG ROM bank                 |
// | PPU  | `$0000-$1FFF` | 8 KiB CHR RAM                                  |
// | PPU  | `$2000-$3EFF` | Single-screen mirroring, page picked by bit 4  |

const PRG_BANK_SIZE: usize = 32 * 1024;

#[derive(Debug, Clone)]
pub struct Mapper7 {
    prg_rom: Box<[u8]>,
    prg_ram: Box<[u8]>,
    chr: ChrStorage,
    bank: u8,
    upper_nametable: bool,
}

impl Mapper7 {
    pub fn new(
        _header: &Header,
        prg_rom: Box<[u8]>,
        chr_rom: Box<[u8]>,
        trainer: Option<&[u8; TRAINER_SIZE]>,
    ) -> Self {
        Self {
            prg_rom,
            prg_ram: allocate_prg_ram_with_trainer(trainer),
            chr: ChrStorage::select(chr_rom),
            bank: 0,
            upper_nametable: false,
        }
    }
}

impl Mapper for Mapper7 {
    fn cpu_read(&self, addr: u16) -> Option<u8> {
        match addr {
            cpu_mem::PRG_RAM_START..=cpu_mem::PRG_RAM_END => Some(read_prg_ram(&self.prg_ram, addr)),
            cpu_mem::PRG_ROM_START..=cpu_mem::CPU_ADDR_END => Some(read_banked(
                &self.prg_rom,
                PRG_BANK_SIZE,
                self.bank as usize,
                (addr - cpu_mem::PRG_ROM_START) as usize,
            )),
            _ => None,
        }
    }

    fn cpu_write(&mut self, addr: u16, data: u8) {
        match addr {
            cpu_mem::PRG_RAM_START..=cpu_mem::PRG_RAM_END => {
                write_prg_ram(&mut self.prg_ram, addr, data)
            }
            cpu_mem::PRG_ROM_START..=cpu_mem::CPU_ADDR_END => {
                self.bank = data & 0x07;
                self.upper_nametable = data & 0x10 != 0;
            }
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
        if self.upper_nametable {
            Mirroring::SingleScreenUpper
        } else {
            Mirroring::SingleScreenLower
        }
    }

    fn mapper_id(&self) -> u16 {
        7
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
        MapperState::Axrom {
            bank: self.bank,
            upper_nametable: self.upper_nametable,
        }
    }

    fn load_state(&mut self, state: &MapperState) -> Result<(), NesSaveStateError> {
        match state {
            MapperState::Axrom {
                bank,
                upper_nametable,
            } => {
                self.bank = *bank;
                self.upper_nametable = *upper_nametable;
                Ok(())
            }
            _ => Err(NesSaveStateError::CorruptState("mapper state kind mismatch")),
        }
    }
}
