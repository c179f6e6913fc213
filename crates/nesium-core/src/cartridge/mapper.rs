//! Board logic sitting between the console buses and the cartridge ROM/RAM.
//!
//! Each supported board implements [`Mapper`]; the cartridge stores it as a
//! `Box<dyn Mapper>` so save states and clones can work without knowing the
//! concrete type.

use std::fmt::Debug;

use dyn_clone::DynClone;

use crate::{
    cartridge::{TRAINER_SIZE, header::Mirroring},
    memory::cpu as cpu_mem,
    state::nes::{MapperState, NesSaveStateError},
};

pub mod chr_storage;
pub mod mapper0;
pub mod mapper2;
pub mod mapper3;
pub mod mapper7;

pub use chr_storage::ChrStorage;
pub use mapper0::Mapper0;
pub use mapper2::Mapper2;
pub use mapper3::Mapper3;
pub use mapper7::Mapper7;

/// Size of the PRG RAM window every supported board exposes at `$6000`.
pub const PRG_RAM_SIZE: usize = 8 * 1024;

pub trait Mapper: DynClone + Debug + Send {
    /// CPU read in `$4020-$FFFF`. `None` leaves the data bus floating.
    fn cpu_read(&self, addr: u16) -> Option<u8>;

    fn cpu_write(&mut self, addr: u16, data: u8);

    /// PPU pattern-table read in `$0000-$1FFF`.
    fn ppu_read(&self, addr: u16) -> u8;

    fn ppu_write(&mut self, addr: u16, data: u8);

    fn mirroring(&self) -> Mirroring;

    fn mapper_id(&self) -> u16;

    fn prg_ram(&self) -> &[u8];

    fn prg_ram_mut(&mut self) -> &mut [u8];

    fn chr(&self) -> &ChrStorage;

    fn chr_mut(&mut self) -> &mut ChrStorage;

    /// Bank registers and other board-specific latches.
    fn save_state(&self) -> MapperState;

    fn load_state(&mut self, state: &MapperState) -> Result<(), NesSaveStateError>;
}

dyn_clone::clone_trait_object!(Mapper);

/// Allocates the `$6000-$7FFF` window and copies a trainer to `$7000`.
pub(crate) fn allocate_prg_ram_with_trainer(trainer: Option<&[u8; TRAINER_SIZE]>) -> Box<[u8]> {
    let mut ram = vec![0u8; PRG_RAM_SIZE].into_boxed_slice();
    if let Some(trainer) = trainer {
        let start = (cpu_mem::TRAINER_START - cpu_mem::PRG_RAM_START) as usize;
        ram[start..start + TRAINER_SIZE].copy_from_slice(trainer);
    }
    ram
}

pub(crate) fn read_prg_ram(ram: &[u8], addr: u16) -> u8 {
    ram[(addr - cpu_mem::PRG_RAM_START) as usize % ram.len()]
}

pub(crate) fn write_prg_ram(ram: &mut [u8], addr: u16, data: u8) {
    let len = ram.len();
    ram[(addr - cpu_mem::PRG_RAM_START) as usize % len] = data;
}

/// Reads from a PRG image split into `bank_size` banks, wrapping out-of-range
/// bank numbers the way undersized boards mirror their ROM.
pub(crate) fn read_banked(rom: &[u8], bank_size: usize, bank: usize, offset: usize) -> u8 {
    let banks = (rom.len() / bank_size).max(1);
    let index = (bank % banks) * bank_size + offset % bank_size;
    rom[index % rom.len()]
}
