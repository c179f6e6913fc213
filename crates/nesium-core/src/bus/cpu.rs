use crate::{
    bus::Bus,
    cartridge::Cartridge,
    controller::Controller,
    memory::{cpu as cpu_mem, ppu::Register as PpuRegister},
    ppu::Ppu,
};

/// CPU-visible bus bridging the core to RAM, the PPU, the controller ports
/// and the cartridge. It borrows the hardware from the owning [`crate::Nes`].
#[derive(Debug)]
pub struct CpuBus<'a> {
    ram: &'a mut [u8; cpu_mem::INTERNAL_RAM_SIZE],
    ppu: &'a mut Ppu,
    cartridge: Option<&'a mut Cartridge>,
    controllers: &'a mut [Controller; 2],
    oam_dma_request: &'a mut Option<u8>,
    open_bus: &'a mut u8,
}

impl<'a> CpuBus<'a> {
    pub(crate) fn new(
        ram: &'a mut [u8; cpu_mem::INTERNAL_RAM_SIZE],
        ppu: &'a mut Ppu,
        cartridge: Option<&'a mut Cartridge>,
        controllers: &'a mut [Controller; 2],
        oam_dma_request: &'a mut Option<u8>,
        open_bus: &'a mut u8,
    ) -> Self {
        Self {
            ram,
            ppu,
            cartridge,
            controllers,
            oam_dma_request,
            open_bus,
        }
    }
}

impl Bus for CpuBus<'_> {
    fn read(&mut self, addr: u16) -> u8 {
        let value = match addr {
            0..=cpu_mem::INTERNAL_RAM_MIRROR_END => {
                self.ram[(addr & cpu_mem::INTERNAL_RAM_MASK) as usize]
            }
            cpu_mem::PPU_REGISTER_BASE..=cpu_mem::PPU_REGISTER_END => self
                .ppu
                .cpu_read(PpuRegister::from_cpu_addr(addr), self.cartridge.as_deref()),
            cpu_mem::CONTROLLER_PORT_1 => self.controllers[0].read(),
            cpu_mem::CONTROLLER_PORT_2 => self.controllers[1].read(),
            // APU and test-mode registers are not modelled.
            0x4000..cpu_mem::CARTRIDGE_SPACE_BASE => *self.open_bus,
            _ => self
                .cartridge
                .as_deref()
                .and_then(|cart| cart.cpu_read(addr))
                .unwrap_or(*self.open_bus),
        };
        *self.open_bus = value;
        value
    }

    fn write(&mut self, addr: u16, data: u8) {
        *self.open_bus = data;
        match addr {
            0..=cpu_mem::INTERNAL_RAM_MIRROR_END => {
                self.ram[(addr & cpu_mem::INTERNAL_RAM_MASK) as usize] = data;
            }
            cpu_mem::PPU_REGISTER_BASE..=cpu_mem::PPU_REGISTER_END => self.ppu.cpu_write(
                PpuRegister::from_cpu_addr(addr),
                data,
                self.cartridge.as_deref_mut(),
            ),
            cpu_mem::OAM_DMA => *self.oam_dma_request = Some(data),
            cpu_mem::CONTROLLER_PORT_1 => {
                for pad in self.controllers.iter_mut() {
                    pad.write_strobe(data);
                }
            }
            0x4000..cpu_mem::CARTRIDGE_SPACE_BASE => {}
            _ => {
                if let Some(cart) = self.cartridge.as_deref_mut() {
                    cart.cpu_write(addr, data);
                }
            }
        }
    }
}
