//! A compact NES core: cartridge loading, a 6502 interpreter, a scanline PPU,
//! the standard controllers and deterministic save states.
//!
//! Audio is not emulated; `$4000-$401F` reads return open bus.

use tracing::debug;

use crate::{
    bus::{Bus, cpu::CpuBus},
    cartridge::Cartridge,
    controller::{Buttons, Controller},
    cpu::Cpu,
    error::Error,
    memory::{cpu as cpu_mem, ppu as ppu_mem},
    ppu::{
        Ppu,
        palette::{Palette, PaletteKind},
    },
};

pub mod bus;
pub mod cartridge;
pub mod controller;
pub mod cpu;
pub mod error;
pub mod memory;
pub mod ppu;
pub mod rng;
pub mod state;

/// Number of controller ports on the console.
pub const CONTROLLER_PORTS: usize = 2;

/// CPU cycles an OAM DMA transfer stalls for, before the odd-cycle alignment.
const OAM_DMA_CYCLES: u32 = 513;

#[derive(Debug, Clone)]
pub struct Nes {
    pub cpu: Cpu,
    pub ppu: Ppu,
    ram: [u8; cpu_mem::INTERNAL_RAM_SIZE],
    cartridge: Option<Cartridge>,
    /// Pristine copy of the inserted board, restored on power cycle.
    cartridge_image: Option<Cartridge>,
    controllers: [Controller; CONTROLLER_PORTS],
    /// Pending OAM DMA page written via `$4014`.
    oam_dma_request: Option<u8>,
    open_bus: u8,
    palette: Palette,
}

impl Default for Nes {
    fn default() -> Self {
        Self::new()
    }
}

impl Nes {
    /// Constructs a console with cleared RAM, no cartridge and the NTSC palette.
    pub fn new() -> Self {
        Self::with_palette(PaletteKind::default())
    }

    pub fn with_palette(kind: PaletteKind) -> Self {
        Self {
            cpu: Cpu::new(),
            ppu: Ppu::new(),
            ram: [0; cpu_mem::INTERNAL_RAM_SIZE],
            cartridge: None,
            cartridge_image: None,
            controllers: [Controller::new(); CONTROLLER_PORTS],
            oam_dma_request: None,
            open_bus: 0,
            palette: Palette::new(kind),
        }
    }

    pub fn palette(&self) -> &Palette {
        &self.palette
    }

    pub fn set_palette(&mut self, palette: Palette) {
        self.palette = palette;
    }

    /// Inserts a cartridge and power-cycles the console.
    pub fn insert_cartridge(&mut self, cartridge: Cartridge) {
        self.cartridge_image = Some(cartridge.clone());
        self.cartridge = Some(cartridge);
        self.power_on_reset();
    }

    pub fn load_cartridge_bytes(&mut self, bytes: &[u8]) -> Result<(), Error> {
        let cartridge = cartridge::load_cartridge(bytes)?;
        self.insert_cartridge(cartridge);
        Ok(())
    }

    pub fn cartridge(&self) -> Option<&Cartridge> {
        self.cartridge.as_ref()
    }

    /// Power cycle: every component returns to its power-on state and the
    /// board's RAM and bank registers are restored from the inserted image.
    pub fn power_on_reset(&mut self) {
        self.cpu = Cpu::new();
        self.ppu = Ppu::new();
        self.ram = [0; cpu_mem::INTERNAL_RAM_SIZE];
        self.controllers = [Controller::new(); CONTROLLER_PORTS];
        self.oam_dma_request = None;
        self.open_bus = 0;
        self.cartridge = self.cartridge_image.clone();
        self.cpu_reset();
        debug!(pc = self.cpu.pc(), "power-on reset");
    }

    fn cpu_reset(&mut self) {
        let mut bus = CpuBus::new(
            &mut self.ram,
            &mut self.ppu,
            self.cartridge.as_mut(),
            &mut self.controllers,
            &mut self.oam_dma_request,
            &mut self.open_bus,
        );
        self.cpu.reset(&mut bus);
    }

    /// Latches the pressed buttons for a controller port. Out-of-range ports
    /// are ignored.
    pub fn set_buttons(&mut self, port: usize, buttons: Buttons) {
        if let Some(pad) = self.controllers.get_mut(port) {
            pad.set_buttons(buttons);
        }
    }

    pub fn buttons(&self, port: usize) -> Buttons {
        self.controllers
            .get(port)
            .map(Controller::buttons)
            .unwrap_or_default()
    }

    /// Executes one instruction (or services a pending NMI), then advances the
    /// PPU three dots per CPU cycle. Returns the CPU cycles consumed.
    pub fn step_instruction(&mut self) -> u32 {
        let nmi = self.ppu.take_nmi();
        let mut cycles = {
            let mut bus = CpuBus::new(
                &mut self.ram,
                &mut self.ppu,
                self.cartridge.as_mut(),
                &mut self.controllers,
                &mut self.oam_dma_request,
                &mut self.open_bus,
            );
            if nmi {
                self.cpu.nmi(&mut bus)
            } else {
                self.cpu.step(&mut bus)
            }
        };

        if let Some(page) = self.oam_dma_request.take() {
            cycles += self.oam_dma(page);
        }

        for _ in 0..cycles * 3 {
            self.ppu.clock(self.cartridge.as_ref());
        }
        cycles
    }

    fn oam_dma(&mut self, page: u8) -> u32 {
        let base = (page as u16) << 8;
        let mut data = [0u8; ppu_mem::OAM_RAM_SIZE];
        {
            let mut bus = CpuBus::new(
                &mut self.ram,
                &mut self.ppu,
                self.cartridge.as_mut(),
                &mut self.controllers,
                &mut self.oam_dma_request,
                &mut self.open_bus,
            );
            for (offset, byte) in data.iter_mut().enumerate() {
                *byte = bus.read(base | offset as u16);
            }
        }
        for byte in data {
            self.ppu.write_oam(byte);
        }
        let stall = OAM_DMA_CYCLES + (self.cpu.cycles() & 1) as u32;
        self.cpu.cycles += stall as u64;
        stall
    }

    /// Runs until the PPU completes the current frame.
    pub fn run_frame(&mut self) {
        let target = self.ppu.frame() + 1;
        while self.ppu.frame() < target {
            self.step_instruction();
        }
    }

    /// Completed frames since the last power cycle.
    pub fn frame_count(&self) -> u64 {
        self.ppu.frame()
    }

    /// Palette indices of the last completed picture, row-major.
    pub fn render_buffer(&self) -> &[u8] {
        self.ppu.frame_buffer()
    }

    /// CPU work RAM (`$0000-$07FF`).
    pub fn ram(&self) -> &[u8] {
        &self.ram
    }

    /// Side-effect-free CPU read: work RAM and cartridge space only.
    pub fn peek(&self, addr: u16) -> u8 {
        match addr {
            0..=cpu_mem::INTERNAL_RAM_MIRROR_END => {
                self.ram[(addr & cpu_mem::INTERNAL_RAM_MASK) as usize]
            }
            cpu_mem::CARTRIDGE_SPACE_BASE..=cpu_mem::CPU_ADDR_END => self
                .cartridge
                .as_ref()
                .and_then(|cart| cart.cpu_read(addr))
                .unwrap_or(self.open_bus),
            _ => self.open_bus,
        }
    }
}
