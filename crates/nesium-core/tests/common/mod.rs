#![allow(dead_code)]

//! In-memory test cartridges. Programs are assembled by hand with
//! [`Program`], which only knows enough to resolve branch offsets.

pub const PRG_BANK: usize = 16 * 1024;
pub const CHR_BANK: usize = 8 * 1024;

/// PRG RAM byte the echo ROM increments once per NMI.
pub const NMI_COUNTER: u16 = 0x6000;
/// PRG RAM byte holding the last controller byte the echo ROM read.
pub const INPUT_ECHO: u16 = 0x6001;

#[derive(Debug, Clone)]
pub struct Program {
    origin: u16,
    bytes: Vec<u8>,
}

impl Program {
    pub fn new(origin: u16) -> Self {
        Self {
            origin,
            bytes: Vec::new(),
        }
    }

    pub fn pc(&self) -> u16 {
        self.origin + self.bytes.len() as u16
    }

    pub fn op(&mut self, bytes: &[u8]) -> &mut Self {
        self.bytes.extend_from_slice(bytes);
        self
    }

    pub fn abs(&mut self, opcode: u8, addr: u16) -> &mut Self {
        let [lo, hi] = addr.to_le_bytes();
        self.op(&[opcode, lo, hi])
    }

    pub fn branch(&mut self, opcode: u8, target: u16) -> &mut Self {
        let next = self.pc().wrapping_add(2);
        let offset = target.wrapping_sub(next) as i16;
        assert!((-128..=127).contains(&offset), "branch out of range");
        self.op(&[opcode, offset as i8 as u8])
    }

    /// `BIT $2002; BPL *-3`
    pub fn wait_vblank(&mut self) -> &mut Self {
        let top = self.pc();
        self.abs(0x2C, 0x2002).branch(0x10, top)
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }
}

/// Builds an iNES image for mapper 0 with one PRG bank and CHR RAM.
/// `reset` and `nmi` are placed at `$8000` and right after it.
pub fn nrom(reset: &Program, nmi: &Program) -> Vec<u8> {
    let mut rom = vec![b'N', b'E', b'S', 0x1A, 1, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0];
    let mut prg = vec![0xEA; PRG_BANK];
    let reset_at = (reset.origin - 0x8000) as usize;
    let nmi_at = (nmi.origin - 0x8000) as usize;
    prg[reset_at..reset_at + reset.bytes.len()].copy_from_slice(&reset.bytes);
    prg[nmi_at..nmi_at + nmi.bytes.len()].copy_from_slice(&nmi.bytes);

    let vectors = [nmi.origin, reset.origin, nmi.origin];
    for (slot, vector) in vectors.iter().enumerate() {
        let at = PRG_BANK - 6 + slot * 2;
        prg[at..at + 2].copy_from_slice(&vector.to_le_bytes());
    }
    rom.extend_from_slice(&prg);
    rom
}

/// A cartridge that reads controller 1 every NMI, stores the byte at
/// [`INPUT_ECHO`], bumps [`NMI_COUNTER`] and paints the backdrop with
/// `buttons & $3F`. Rendering stays disabled so each picture is one colour.
pub fn input_echo_rom() -> Vec<u8> {
    let mut reset = Program::new(0x8000);
    reset.op(&[0x78, 0xD8, 0xA2, 0xFF, 0x9A]); // SEI; CLD; LDX #$FF; TXS
    reset.wait_vblank().wait_vblank();
    reset.op(&[0xA9, 0x80]).abs(0x8D, 0x2000); // enable NMI
    let idle = reset.pc();
    reset.abs(0x4C, idle);

    let mut nmi = Program::new(0x8100);
    nmi.op(&[0xA9, 0x01]).abs(0x8D, 0x4016); // strobe
    nmi.op(&[0xA9, 0x00]).abs(0x8D, 0x4016);
    nmi.op(&[0xA2, 0x08]); // LDX #8
    let read = nmi.pc();
    nmi.abs(0xAD, 0x4016).op(&[0x4A, 0x66, 0x00, 0xCA]); // LDA; LSR A; ROR $00; DEX
    nmi.branch(0xD0, read);
    nmi.abs(0xEE, NMI_COUNTER);
    nmi.op(&[0xA5, 0x00]).abs(0x8D, INPUT_ECHO);
    nmi.op(&[0xA9, 0x3F]).abs(0x8D, 0x2006);
    nmi.op(&[0xA9, 0x00]).abs(0x8D, 0x2006);
    nmi.op(&[0xA5, 0x00, 0x29, 0x3F]).abs(0x8D, 0x2007); // LDA $00; AND #$3F
    nmi.op(&[0x40]); // RTI

    nrom(&reset, &nmi)
}
