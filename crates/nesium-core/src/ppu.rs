//! Picture Processing Unit.
//!
//! Timing is tracked per dot (341 dots x 262 scanlines) so vblank, NMI and
//! the scroll-register copies land on the right dots. Pixels are produced a
//! whole scanline at a time at dot 256 of each visible line, which is enough
//! for games that change scroll or pattern banks between lines but not for
//! mid-line raster effects.
//!
//! The frame buffer stores 6-bit master palette indices; converting them to
//! RGB is left to [`palette::Palette`].

pub mod palette;

mod registers;

use crate::{
    cartridge::Cartridge,
    memory::ppu::{self as ppu_mem, Register as PpuRegister},
};
pub(crate) use registers::{Control, Mask, Status, VramRegisters};

/// Visible width in pixels.
pub const SCREEN_WIDTH: usize = 256;
/// Visible height in pixels.
pub const SCREEN_HEIGHT: usize = 240;

const DOTS_PER_SCANLINE: u16 = 341;
const VISIBLE_SCANLINES: i16 = 240;
const VBLANK_SCANLINE: i16 = 241;
const PRE_RENDER_SCANLINE: i16 = 261;
const MAX_SPRITES_PER_LINE: usize = 8;

#[derive(Debug, Clone)]
pub struct Ppu {
    pub(crate) control: Control,
    pub(crate) mask: Mask,
    pub(crate) status: Status,
    pub(crate) oam_addr: u8,
    pub(crate) oam: [u8; ppu_mem::OAM_RAM_SIZE],
    pub(crate) ciram: [u8; ppu_mem::CIRAM_SIZE],
    pub(crate) palette_ram: [u8; ppu_mem::PALETTE_RAM_SIZE],
    pub(crate) vram: VramRegisters,
    /// Delayed `$2007` read buffer.
    pub(crate) read_buffer: u8,
    /// Last value written to any PPU register.
    pub(crate) open_bus: u8,
    /// Current dot (0..=340) within the active scanline.
    pub(crate) cycle: u16,
    /// Current scanline: 0..=239 visible, 241 vblank start, 261 pre-render.
    pub(crate) scanline: i16,
    /// Completed frames since power-on.
    pub(crate) frame: u64,
    pub(crate) odd_frame: bool,
    pub(crate) nmi_pending: bool,
    pub(crate) frame_buffer: Box<[u8]>,
}

impl Default for Ppu {
    fn default() -> Self {
        Self::new()
    }
}

impl Ppu {
    pub fn new() -> Self {
        Self {
            control: Control::empty(),
            mask: Mask::empty(),
            status: Status::empty(),
            oam_addr: 0,
            oam: [0; ppu_mem::OAM_RAM_SIZE],
            ciram: [0; ppu_mem::CIRAM_SIZE],
            palette_ram: [0; ppu_mem::PALETTE_RAM_SIZE],
            vram: VramRegisters::default(),
            read_buffer: 0,
            open_bus: 0,
            cycle: 0,
            scanline: 0,
            frame: 0,
            odd_frame: false,
            nmi_pending: false,
            frame_buffer: vec![0; SCREEN_WIDTH * SCREEN_HEIGHT].into_boxed_slice(),
        }
    }

    /// Completed frames since power-on.
    pub fn frame(&self) -> u64 {
        self.frame
    }

    /// The last rendered picture as `SCREEN_WIDTH * SCREEN_HEIGHT` palette indices.
    pub fn frame_buffer(&self) -> &[u8] {
        &self.frame_buffer
    }

    /// Returns and clears a pending NMI.
    pub(crate) fn take_nmi(&mut self) -> bool {
        std::mem::take(&mut self.nmi_pending)
    }

    pub(crate) fn cpu_read(&mut self, register: PpuRegister, cart: Option<&Cartridge>) -> u8 {
        let value = match register {
            PpuRegister::Status => {
                let value = self.status.bits() | (self.open_bus & 0x1F);
                self.status.remove(Status::VERTICAL_BLANK);
                self.vram.w = false;
                value
            }
            PpuRegister::OamData => self.oam[self.oam_addr as usize],
            PpuRegister::Data => {
                let addr = self.vram.v & ppu_mem::VRAM_MIRROR_MASK;
                let value = if addr >= ppu_mem::PALETTE_BASE {
                    // Palette reads bypass the buffer, which picks up the
                    // nametable byte underneath instead.
                    self.read_buffer = self.vram_read(addr - 0x1000, cart);
                    (self.palette_ram[palette_index(addr)] & 0x3F) | (self.open_bus & 0xC0)
                } else {
                    let buffered = self.read_buffer;
                    self.read_buffer = self.vram_read(addr, cart);
                    buffered
                };
                self.vram.v = self.vram.v.wrapping_add(self.control.vram_increment());
                value
            }
            _ => self.open_bus,
        };
        self.open_bus = value;
        value
    }

    pub(crate) fn cpu_write(
        &mut self,
        register: PpuRegister,
        data: u8,
        cart: Option<&mut Cartridge>,
    ) {
        self.open_bus = data;
        match register {
            PpuRegister::Control => {
                let was_enabled = self.control.contains(Control::GENERATE_NMI);
                self.control = Control::from_bits_retain(data);
                self.vram.write_control(data);
                // Enabling NMI during vblank fires immediately.
                if !was_enabled
                    && self.control.contains(Control::GENERATE_NMI)
                    && self.status.contains(Status::VERTICAL_BLANK)
                {
                    self.nmi_pending = true;
                }
            }
            PpuRegister::Mask => self.mask = Mask::from_bits_retain(data),
            PpuRegister::Status => {}
            PpuRegister::OamAddr => self.oam_addr = data,
            PpuRegister::OamData => self.write_oam(data),
            PpuRegister::Scroll => self.vram.write_scroll(data),
            PpuRegister::Addr => self.vram.write_addr(data),
            PpuRegister::Data => {
                let addr = self.vram.v & ppu_mem::VRAM_MIRROR_MASK;
                self.vram_write(addr, data, cart);
                self.vram.v = self.vram.v.wrapping_add(self.control.vram_increment());
            }
        }
    }

    /// One byte of a `$4014` transfer.
    pub(crate) fn write_oam(&mut self, data: u8) {
        self.oam[self.oam_addr as usize] = data;
        self.oam_addr = self.oam_addr.wrapping_add(1);
    }

    fn vram_read(&self, addr: u16, cart: Option<&Cartridge>) -> u8 {
        let addr = addr & ppu_mem::VRAM_MIRROR_MASK;
        match addr {
            0..=ppu_mem::PATTERN_TABLE_END => cart.map_or(0, |c| c.ppu_read(addr)),
            ppu_mem::NAMETABLE_BASE..ppu_mem::PALETTE_BASE => {
                self.ciram[nametable_index(addr, cart)]
            }
            _ => self.palette_ram[palette_index(addr)],
        }
    }

    fn vram_write(&mut self, addr: u16, data: u8, cart: Option<&mut Cartridge>) {
        match addr {
            0..=ppu_mem::PATTERN_TABLE_END => {
                if let Some(cart) = cart {
                    cart.ppu_write(addr, data);
                }
            }
            ppu_mem::NAMETABLE_BASE..ppu_mem::PALETTE_BASE => {
                let index = nametable_index(addr, cart.as_deref());
                self.ciram[index] = data;
            }
            _ => self.palette_ram[palette_index(addr)] = data & 0x3F,
        }
    }

    /// Advances one dot.
    pub(crate) fn clock(&mut self, cart: Option<&Cartridge>) {
        let rendering = self.mask.rendering_enabled();

        if self.scanline < VISIBLE_SCANLINES {
            if self.cycle == 256 {
                if rendering {
                    self.render_scanline(cart);
                    self.vram.increment_y();
                } else {
                    self.render_backdrop_line();
                }
            } else if self.cycle == 257 && rendering {
                self.vram.copy_horizontal();
            }
        } else if self.scanline == VBLANK_SCANLINE && self.cycle == 1 {
            self.status.insert(Status::VERTICAL_BLANK);
            if self.control.contains(Control::GENERATE_NMI) {
                self.nmi_pending = true;
            }
        } else if self.scanline == PRE_RENDER_SCANLINE {
            match self.cycle {
                1 => self.status = Status::empty(),
                257 if rendering => self.vram.copy_horizontal(),
                280..=304 if rendering => self.vram.copy_vertical(),
                // Odd frames drop the last pre-render dot while rendering.
                339 if rendering && self.odd_frame => self.cycle = 340,
                _ => {}
            }
        }

        self.cycle += 1;
        if self.cycle == DOTS_PER_SCANLINE {
            self.cycle = 0;
            self.scanline += 1;
            if self.scanline > PRE_RENDER_SCANLINE {
                self.scanline = 0;
                self.frame += 1;
                self.odd_frame = !self.odd_frame;
            }
        }
    }

    fn render_backdrop_line(&mut self) {
        let row = self.scanline as usize * SCREEN_WIDTH;
        let backdrop = self.palette_ram[0] & self.color_mask();
        self.frame_buffer[row..row + SCREEN_WIDTH].fill(backdrop);
    }

    fn color_mask(&self) -> u8 {
        if self.mask.contains(Mask::GRAYSCALE) {
            0x30
        } else {
            0x3F
        }
    }

    /// Draws the current scanline from `v`, OAM and palette RAM.
    fn render_scanline(&mut self, cart: Option<&Cartridge>) {
        let line = self.scanline;
        let background = self.background_line(cart);
        let sprites = self.sprite_line(line, cart);

        let show_bg = self.mask.contains(Mask::SHOW_BACKGROUND);
        let show_sprites = self.mask.contains(Mask::SHOW_SPRITES);
        let clip_bg = !self.mask.contains(Mask::SHOW_BACKGROUND_LEFT);
        let clip_sprites = !self.mask.contains(Mask::SHOW_SPRITES_LEFT);
        let color_mask = self.color_mask();
        let row = line as usize * SCREEN_WIDTH;

        for x in 0..SCREEN_WIDTH {
            let left_edge = x < 8;
            let bg = if show_bg && !(left_edge && clip_bg) {
                background[x]
            } else {
                0
            };
            let sprite = if show_sprites && !(left_edge && clip_sprites) {
                sprites[x]
            } else {
                SpritePixel::default()
            };

            let bg_opaque = bg & 0x03 != 0;
            let sprite_opaque = sprite.color & 0x03 != 0;

            if sprite.zero && bg_opaque && sprite_opaque && x != 255 {
                self.status.insert(Status::SPRITE_ZERO_HIT);
            }

            let palette_addr = match (bg_opaque, sprite_opaque) {
                (false, false) => 0,
                (false, true) => 0x10 | sprite.color,
                (true, false) => bg,
                (true, true) if sprite.behind => bg,
                (true, true) => 0x10 | sprite.color,
            };
            let color = self.palette_ram[palette_index(palette_addr as u16)];
            self.frame_buffer[row + x] = color & color_mask;
        }
    }

    /// Background pixels for the line as `palette << 2 | pattern` (0..16).
    fn background_line(&mut self, cart: Option<&Cartridge>) -> [u8; SCREEN_WIDTH] {
        let mut line = [0u8; SCREEN_WIDTH];
        let fine_x = self.vram.x as usize;
        let fine_y = self.vram.fine_y();
        let table = self.control.background_table();

        // 33 tiles cover the line plus the fine-X overhang.
        for tile in 0..33usize {
            let v = self.vram.v;
            let tile_addr = ppu_mem::NAMETABLE_BASE | (v & 0x0FFF);
            let attr_addr = ppu_mem::NAMETABLE_BASE
                | ppu_mem::ATTRIBUTE_OFFSET
                | (v & 0x0C00)
                | ((v >> 4) & 0x38)
                | ((v >> 2) & 0x07);

            let tile_index = self.vram_read(tile_addr, cart) as u16;
            let attr = self.vram_read(attr_addr, cart);
            let shift = ((v >> 4) & 0x04) | (v & 0x02);
            let palette = (attr >> shift) & 0x03;

            let pattern_addr = table + tile_index * 16 + fine_y;
            let lo = self.vram_read(pattern_addr, cart);
            let hi = self.vram_read(pattern_addr + 8, cart);

            for bit in 0..8usize {
                let px = tile * 8 + bit;
                if px < fine_x || px - fine_x >= SCREEN_WIDTH {
                    continue;
                }
                let shift = 7 - bit;
                let pattern = ((lo >> shift) & 1) | (((hi >> shift) & 1) << 1);
                line[px - fine_x] = if pattern == 0 { 0 } else { (palette << 2) | pattern };
            }
            self.vram.increment_coarse_x();
        }
        line
    }

    /// Sprite pixels for `line`, first-in-OAM wins.
    fn sprite_line(
        &mut self,
        line: i16,
        cart: Option<&Cartridge>,
    ) -> [SpritePixel; SCREEN_WIDTH] {
        let mut pixels = [SpritePixel::default(); SCREEN_WIDTH];
        let height = self.control.sprite_height();
        let mut found = 0usize;

        for sprite in 0..64usize {
            let base = sprite * 4;
            let y = self.oam[base] as i16;
            let row = line - y - 1;
            if !(0..height).contains(&row) {
                continue;
            }
            if found == MAX_SPRITES_PER_LINE {
                self.status.insert(Status::SPRITE_OVERFLOW);
                break;
            }
            found += 1;

            let tile = self.oam[base + 1] as u16;
            let attr = self.oam[base + 2];
            let x = self.oam[base + 3] as usize;
            let flip_v = attr & 0x80 != 0;
            let flip_h = attr & 0x40 != 0;

            let mut row = (if flip_v { height - 1 - row } else { row }) as u16;
            let pattern_addr = if height == 16 {
                let table = (tile & 1) * ppu_mem::PATTERN_TABLE_1;
                let mut tile = tile & 0xFE;
                if row >= 8 {
                    tile += 1;
                    row -= 8;
                }
                table + tile * 16 + row
            } else {
                self.control.sprite_table() + tile * 16 + row
            };
            let lo = self.vram_read(pattern_addr, cart);
            let hi = self.vram_read(pattern_addr + 8, cart);

            for bit in 0..8usize {
                let px = x + bit;
                if px >= SCREEN_WIDTH {
                    break;
                }
                let shift = if flip_h { bit } else { 7 - bit };
                let pattern = ((lo >> shift) & 1) | (((hi >> shift) & 1) << 1);
                if pattern == 0 || pixels[px].color & 0x03 != 0 {
                    continue;
                }
                pixels[px] = SpritePixel {
                    color: ((attr & 0x03) << 2) | pattern,
                    behind: attr & 0x20 != 0,
                    zero: sprite == 0,
                };
            }
        }
        pixels
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct SpritePixel {
    /// `palette << 2 | pattern`; zero means transparent.
    color: u8,
    behind: bool,
    zero: bool,
}

fn nametable_index(addr: u16, cart: Option<&Cartridge>) -> usize {
    cart.map(Cartridge::mirroring)
        .unwrap_or(crate::cartridge::header::Mirroring::Horizontal)
        .ciram_index(addr)
}

/// Palette RAM index with the `$3F10/$3F14/$3F18/$3F1C` backdrop mirrors.
fn palette_index(addr: u16) -> usize {
    let index = (addr as usize) & 0x1F;
    if index >= 0x10 && index & 0x03 == 0 {
        index - 0x10
    } else {
        index
    }
}
