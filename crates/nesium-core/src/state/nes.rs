use std::fmt::Display;

use crate::{
    Nes,
    cartridge::Cartridge,
    controller::Controller,
    cpu::{Cpu, Status as CpuStatus},
    memory::{cpu as cpu_mem, ppu as ppu_mem},
    ppu::{Ppu, SCREEN_HEIGHT, SCREEN_WIDTH},
};

#[cfg(feature = "savestate-serde")]
use serde::{Deserialize, Serialize};

/// Errors raised when capturing/restoring a full NES save state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NesSaveStateError {
    NoCartridge,
    CorruptState(&'static str),
}

impl Display for NesSaveStateError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NesSaveStateError::NoCartridge => write!(f, "no cartridge loaded"),
            NesSaveStateError::CorruptState(msg) => write!(f, "corrupt state: {}", msg),
        }
    }
}

impl std::error::Error for NesSaveStateError {}

/// Serializable snapshot of the CPU core.
#[cfg_attr(feature = "savestate-serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CpuState {
    pub a: u8,
    pub x: u8,
    pub y: u8,
    pub s: u8,
    /// Raw status register bits (NV-BDIZC).
    pub p: u8,
    pub pc: u16,
    pub cycles: u64,
    pub jammed: bool,
}

/// Serializable snapshot of the PPU, including the last rendered frame so a
/// restored console shows the same picture.
#[cfg_attr(feature = "savestate-serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PpuState {
    pub control: u8,
    pub mask: u8,
    pub status: u8,
    pub oam_addr: u8,
    pub oam: Vec<u8>,
    pub ciram: Vec<u8>,
    pub palette_ram: Vec<u8>,
    pub vram_v: u16,
    pub vram_t: u16,
    pub vram_x: u8,
    pub vram_w: bool,
    pub read_buffer: u8,
    pub open_bus: u8,
    pub cycle: u16,
    pub scanline: i16,
    pub frame: u64,
    pub odd_frame: bool,
    pub nmi_pending: bool,
    pub frame_buffer: Vec<u8>,
}

/// Save-state snapshot of the cartridge and mapper (ROM data not included).
#[cfg_attr(feature = "savestate-serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartridgeState {
    pub mapper_id: u16,
    pub prg_ram: Vec<u8>,
    pub chr_ram: Option<Vec<u8>>,
    pub mapper: MapperState,
}

/// Board registers per supported mapper.
#[cfg_attr(feature = "savestate-serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MapperState {
    Nrom,
    Uxrom { bank_select: u8 },
    Cnrom { chr_bank: u8 },
    Axrom { bank: u8, upper_nametable: bool },
}

/// Full deterministic console snapshot.
///
/// The ROM image is not included; callers must restore onto a console with
/// the same cartridge inserted.
#[cfg_attr(feature = "savestate-serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NesState {
    pub cpu: CpuState,
    pub ppu: PpuState,
    pub ram: Vec<u8>,
    pub cartridge: CartridgeState,
    pub controllers: [Controller; 2],
    pub oam_dma_request: Option<u8>,
    pub open_bus: u8,
}

impl NesState {
    /// Bumped whenever the layout of this struct changes.
    pub const FORMAT_VERSION: u32 = 1;
}

impl Nes {
    /// Captures the console state.
    pub fn save_state(&self) -> Result<NesState, NesSaveStateError> {
        let cart = self.cartridge.as_ref().ok_or(NesSaveStateError::NoCartridge)?;
        Ok(NesState {
            cpu: cpu_to_state(&self.cpu),
            ppu: ppu_to_state(&self.ppu),
            ram: self.ram.to_vec(),
            cartridge: cartridge_to_state(cart),
            controllers: self.controllers,
            oam_dma_request: self.oam_dma_request,
            open_bus: self.open_bus,
        })
    }

    /// Restores a state captured by [`Nes::save_state`]. Everything is
    /// validated before the console is touched, so a rejected state leaves
    /// the console unchanged.
    pub fn load_state(&mut self, state: &NesState) -> Result<(), NesSaveStateError> {
        let cart = self.cartridge.as_mut().ok_or(NesSaveStateError::NoCartridge)?;
        validate(state, cart)?;

        let mut restored = cart.clone();
        apply_cartridge_state(&mut restored, &state.cartridge)?;
        *cart = restored;

        state_to_cpu(&mut self.cpu, &state.cpu);
        state_to_ppu(&mut self.ppu, &state.ppu);
        self.ram.copy_from_slice(&state.ram);
        self.controllers = state.controllers;
        self.oam_dma_request = state.oam_dma_request;
        self.open_bus = state.open_bus;
        Ok(())
    }
}

fn validate(state: &NesState, cart: &Cartridge) -> Result<(), NesSaveStateError> {
    if state.ram.len() != cpu_mem::INTERNAL_RAM_SIZE {
        return Err(NesSaveStateError::CorruptState("ram size mismatch"));
    }
    let ppu = &state.ppu;
    if ppu.oam.len() != ppu_mem::OAM_RAM_SIZE
        || ppu.ciram.len() != ppu_mem::CIRAM_SIZE
        || ppu.palette_ram.len() != ppu_mem::PALETTE_RAM_SIZE
    {
        return Err(NesSaveStateError::CorruptState("ppu memory size mismatch"));
    }
    if ppu.frame_buffer.len() != SCREEN_WIDTH * SCREEN_HEIGHT {
        return Err(NesSaveStateError::CorruptState("frame buffer size mismatch"));
    }
    if ppu.cycle > 340 || !(0..=261).contains(&ppu.scanline) {
        return Err(NesSaveStateError::CorruptState("ppu position out of range"));
    }
    if state.cartridge.mapper_id != cart.mapper().mapper_id() {
        return Err(NesSaveStateError::CorruptState("mapper mismatch"));
    }
    Ok(())
}

fn cpu_to_state(cpu: &Cpu) -> CpuState {
    CpuState {
        a: cpu.a,
        x: cpu.x,
        y: cpu.y,
        s: cpu.s,
        p: cpu.p.bits(),
        pc: cpu.pc,
        cycles: cpu.cycles,
        jammed: cpu.jammed,
    }
}

fn state_to_cpu(cpu: &mut Cpu, state: &CpuState) {
    cpu.a = state.a;
    cpu.x = state.x;
    cpu.y = state.y;
    cpu.s = state.s;
    cpu.p = CpuStatus::from_bits_retain(state.p);
    cpu.pc = state.pc;
    cpu.cycles = state.cycles;
    cpu.jammed = state.jammed;
}

fn ppu_to_state(ppu: &Ppu) -> PpuState {
    PpuState {
        control: ppu.control.bits(),
        mask: ppu.mask.bits(),
        status: ppu.status.bits(),
        oam_addr: ppu.oam_addr,
        oam: ppu.oam.to_vec(),
        ciram: ppu.ciram.to_vec(),
        palette_ram: ppu.palette_ram.to_vec(),
        vram_v: ppu.vram.v,
        vram_t: ppu.vram.t,
        vram_x: ppu.vram.x,
        vram_w: ppu.vram.w,
        read_buffer: ppu.read_buffer,
        open_bus: ppu.open_bus,
        cycle: ppu.cycle,
        scanline: ppu.scanline,
        frame: ppu.frame,
        odd_frame: ppu.odd_frame,
        nmi_pending: ppu.nmi_pending,
        frame_buffer: ppu.frame_buffer.to_vec(),
    }
}

/// Lengths are checked by [`validate`] beforehand.
fn state_to_ppu(ppu: &mut Ppu, state: &PpuState) {
    ppu.control = crate::ppu::Control::from_bits_retain(state.control);
    ppu.mask = crate::ppu::Mask::from_bits_retain(state.mask);
    ppu.status = crate::ppu::Status::from_bits_retain(state.status);
    ppu.oam_addr = state.oam_addr;
    ppu.oam.copy_from_slice(&state.oam);
    ppu.ciram.copy_from_slice(&state.ciram);
    ppu.palette_ram.copy_from_slice(&state.palette_ram);
    ppu.vram.v = state.vram_v;
    ppu.vram.t = state.vram_t;
    ppu.vram.x = state.vram_x;
    ppu.vram.w = state.vram_w;
    ppu.read_buffer = state.read_buffer;
    ppu.open_bus = state.open_bus;
    ppu.cycle = state.cycle;
    ppu.scanline = state.scanline;
    ppu.frame = state.frame;
    ppu.odd_frame = state.odd_frame;
    ppu.nmi_pending = state.nmi_pending;
    ppu.frame_buffer.copy_from_slice(&state.frame_buffer);
}

fn cartridge_to_state(cart: &Cartridge) -> CartridgeState {
    let mapper = cart.mapper();
    CartridgeState {
        mapper_id: mapper.mapper_id(),
        prg_ram: mapper.prg_ram().to_vec(),
        chr_ram: mapper.chr().as_ram().map(<[u8]>::to_vec),
        mapper: mapper.save_state(),
    }
}

fn apply_cartridge_state(
    cart: &mut Cartridge,
    state: &CartridgeState,
) -> Result<(), NesSaveStateError> {
    let mapper = cart.mapper_mut();
    if mapper.prg_ram().len() != state.prg_ram.len() {
        return Err(NesSaveStateError::CorruptState("prg ram size mismatch"));
    }
    mapper.prg_ram_mut().copy_from_slice(&state.prg_ram);

    match (mapper.chr_mut().as_ram_mut(), state.chr_ram.as_deref()) {
        (Some(dst), Some(src)) if dst.len() == src.len() => dst.copy_from_slice(src),
        (None, None) => {}
        _ => return Err(NesSaveStateError::CorruptState("chr ram layout mismatch")),
    }

    mapper.load_state(&state.mapper)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{cartridge, controller::Buttons};

    fn dummy_nrom_rom() -> Vec<u8> {
        // iNES header + 16 KiB PRG + 8 KiB CHR RAM. PRG is a `JMP $8000` loop.
        let mut rom = Vec::with_capacity(16 + 16 * 1024);
        rom.extend_from_slice(b"NES\x1A");
        rom.push(1);
        rom.push(0);
        rom.push(0);
        rom.push(0);
        rom.extend_from_slice(&[0; 8]);
        let mut prg = vec![0xEAu8; 16 * 1024];
        prg[..3].copy_from_slice(&[0x4C, 0x00, 0x80]);
        prg[0x3FFC] = 0x00;
        prg[0x3FFD] = 0x80;
        rom.extend_from_slice(&prg);
        rom
    }

    fn console() -> Nes {
        let cart = cartridge::load_cartridge(&dummy_nrom_rom()).expect("load dummy cartridge");
        let mut nes = Nes::new();
        nes.insert_cartridge(cart);
        nes
    }

    #[test]
    fn restore_rewinds_ram_and_frame() {
        let mut nes = console();
        nes.run_frame();
        let saved = nes.save_state().expect("save");

        nes.ram[0x10] = 0x77;
        nes.run_frame();
        nes.run_frame();
        assert_eq!(nes.frame_count(), 3);

        nes.load_state(&saved).expect("load");
        assert_eq!(nes.frame_count(), 1);
        assert_eq!(nes.ram()[0x10], 0);
        assert_eq!(nes.save_state().expect("save again"), saved);
    }

    #[test]
    fn rejects_truncated_ram_without_touching_console() {
        let mut nes = console();
        nes.run_frame();
        let before = nes.save_state().expect("save");
        let mut broken = before.clone();
        broken.ram.truncate(16);
        broken.cpu.pc = 0x1234;

        let err = nes.load_state(&broken).expect_err("must reject");
        assert_eq!(err, NesSaveStateError::CorruptState("ram size mismatch"));
        assert_eq!(nes.save_state().expect("save"), before);
    }

    #[test]
    fn no_cartridge_cannot_save() {
        let nes = Nes::new();
        assert_eq!(nes.save_state().expect_err("no cart"), NesSaveStateError::NoCartridge);
    }

    #[test]
    fn restores_onto_a_second_console_with_the_same_board() {
        let mut nes = console();
        nes.set_buttons(0, Buttons::A);
        nes.run_frame();
        nes.run_frame();
        let saved = nes.save_state().expect("save");

        let mut other = console();
        other.load_state(&saved).expect("same board");
        assert_eq!(other.save_state().expect("save again"), saved);
        assert_eq!(other.render_buffer(), nes.render_buffer());
    }

    #[test]
    fn rejects_state_from_another_board() {
        let mut nes = console();
        let mut state = nes.save_state().expect("save");
        state.cartridge.mapper_id = 2;
        state.cartridge.mapper = MapperState::Uxrom { bank_select: 1 };
        assert!(matches!(
            nes.load_state(&state),
            Err(NesSaveStateError::CorruptState(_))
        ));
    }
}
