//! Instruction-stepped 6502 (2A03) core.
//!
//! Each call to [`Cpu::step`] executes one whole instruction against a
//! [`Bus`] and reports how many CPU cycles it took, so the caller can keep
//! the PPU in lockstep (three dots per CPU cycle).

mod addressing;
mod instruction;
mod lookup;
mod status;

use crate::{bus::Bus, memory::cpu as cpu_mem};

use addressing::Addressing;
use instruction::Mnemonic;
use lookup::LOOKUP_TABLE;
pub(crate) use status::Status;

/// Cycles consumed by the NMI/IRQ/reset entry sequence.
const INTERRUPT_CYCLES: u32 = 7;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cpu {
    pub(crate) a: u8,
    pub(crate) x: u8,
    pub(crate) y: u8,
    pub(crate) s: u8,
    pub(crate) p: Status,
    pub(crate) pc: u16,
    /// Total CPU cycles since power-on.
    pub(crate) cycles: u64,
    /// Set after executing a JAM opcode; only a reset clears it.
    pub(crate) jammed: bool,
}

impl Default for Cpu {
    fn default() -> Self {
        Self::new()
    }
}

impl Cpu {
    pub fn new() -> Self {
        Self {
            a: 0,
            x: 0,
            y: 0,
            s: 0,
            p: Status::power_on(),
            pc: 0,
            cycles: 0,
            jammed: false,
        }
    }

    pub fn pc(&self) -> u16 {
        self.pc
    }

    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    pub fn is_jammed(&self) -> bool {
        self.jammed
    }

    /// Runs the reset sequence: S drops by three, IRQs are masked and PC is
    /// loaded from `$FFFC`.
    pub fn reset<B: Bus>(&mut self, bus: &mut B) {
        self.s = self.s.wrapping_sub(3);
        self.p.insert(Status::INTERRUPT);
        self.pc = read_word(bus, cpu_mem::RESET_VECTOR_LO);
        self.jammed = false;
        self.cycles += INTERRUPT_CYCLES as u64;
    }

    /// Services a non-maskable interrupt.
    pub fn nmi<B: Bus>(&mut self, bus: &mut B) -> u32 {
        self.push_word(bus, self.pc);
        self.push(bus, self.p.pushed(false));
        self.p.insert(Status::INTERRUPT);
        self.pc = read_word(bus, cpu_mem::NMI_VECTOR_LO);
        self.cycles += INTERRUPT_CYCLES as u64;
        INTERRUPT_CYCLES
    }

    /// Executes one instruction and returns the cycles it consumed.
    pub fn step<B: Bus>(&mut self, bus: &mut B) -> u32 {
        if self.jammed {
            self.cycles += 2;
            return 2;
        }

        let opcode = self.fetch(bus);
        let instr = LOOKUP_TABLE[opcode as usize];
        let (addr, crossed) = self.operand_address(bus, instr.addressing);

        let mut cycles = instr.cycles as u32;
        if crossed && instr.page_penalty {
            cycles += 1;
        }
        cycles += self.execute(bus, instr.mnemonic, instr.addressing, addr);
        self.cycles += cycles as u64;
        cycles
    }

    fn fetch<B: Bus>(&mut self, bus: &mut B) -> u8 {
        let byte = bus.read(self.pc);
        self.pc = self.pc.wrapping_add(1);
        byte
    }

    fn fetch_word<B: Bus>(&mut self, bus: &mut B) -> u16 {
        let lo = self.fetch(bus) as u16;
        let hi = self.fetch(bus) as u16;
        (hi << 8) | lo
    }

    /// Resolves the effective address and whether indexing crossed a page.
    fn operand_address<B: Bus>(&mut self, bus: &mut B, mode: Addressing) -> (u16, bool) {
        match mode {
            Addressing::Implied | Addressing::Accumulator => (0, false),
            Addressing::Immediate => {
                let addr = self.pc;
                self.pc = self.pc.wrapping_add(1);
                (addr, false)
            }
            Addressing::ZeroPage => (self.fetch(bus) as u16, false),
            Addressing::ZeroPageX => (self.fetch(bus).wrapping_add(self.x) as u16, false),
            Addressing::ZeroPageY => (self.fetch(bus).wrapping_add(self.y) as u16, false),
            Addressing::Absolute => (self.fetch_word(bus), false),
            Addressing::AbsoluteX => {
                let base = self.fetch_word(bus);
                indexed(base, self.x)
            }
            Addressing::AbsoluteY => {
                let base = self.fetch_word(bus);
                indexed(base, self.y)
            }
            Addressing::Indirect => {
                let ptr = self.fetch_word(bus);
                // The high byte is fetched without carrying into the page.
                let lo = bus.read(ptr) as u16;
                let hi = bus.read((ptr & 0xFF00) | (ptr.wrapping_add(1) & 0x00FF)) as u16;
                ((hi << 8) | lo, false)
            }
            Addressing::IndirectX => {
                let zp = self.fetch(bus).wrapping_add(self.x);
                (read_zp_word(bus, zp), false)
            }
            Addressing::IndirectY => {
                let zp = self.fetch(bus);
                let base = read_zp_word(bus, zp);
                indexed(base, self.y)
            }
            Addressing::Relative => {
                let offset = self.fetch(bus) as i8;
                (self.pc.wrapping_add(offset as i16 as u16), false)
            }
        }
    }

    fn execute<B: Bus>(
        &mut self,
        bus: &mut B,
        mnemonic: Mnemonic,
        mode: Addressing,
        addr: u16,
    ) -> u32 {
        match mnemonic {
            Mnemonic::LDA => {
                self.a = bus.read(addr);
                self.p.set_zn(self.a);
            }
            Mnemonic::LDX => {
                self.x = bus.read(addr);
                self.p.set_zn(self.x);
            }
            Mnemonic::LDY => {
                self.y = bus.read(addr);
                self.p.set_zn(self.y);
            }
            Mnemonic::LAX => {
                let value = bus.read(addr);
                self.a = value;
                self.x = value;
                self.p.set_zn(value);
            }
            Mnemonic::LAS => {
                let value = bus.read(addr) & self.s;
                self.a = value;
                self.x = value;
                self.s = value;
                self.p.set_zn(value);
            }
            Mnemonic::STA => bus.write(addr, self.a),
            Mnemonic::STX => bus.write(addr, self.x),
            Mnemonic::STY => bus.write(addr, self.y),
            Mnemonic::SAX => bus.write(addr, self.a & self.x),
            Mnemonic::SHA => bus.write(addr, self.a & self.x & high_plus_one(addr)),
            Mnemonic::SHX => bus.write(addr, self.x & high_plus_one(addr)),
            Mnemonic::SHY => bus.write(addr, self.y & high_plus_one(addr)),
            Mnemonic::SHS => {
                self.s = self.a & self.x;
                bus.write(addr, self.s & high_plus_one(addr));
            }

            Mnemonic::TAX => {
                self.x = self.a;
                self.p.set_zn(self.x);
            }
            Mnemonic::TAY => {
                self.y = self.a;
                self.p.set_zn(self.y);
            }
            Mnemonic::TSX => {
                self.x = self.s;
                self.p.set_zn(self.x);
            }
            Mnemonic::TXA => {
                self.a = self.x;
                self.p.set_zn(self.a);
            }
            Mnemonic::TXS => self.s = self.x,
            Mnemonic::TYA => {
                self.a = self.y;
                self.p.set_zn(self.a);
            }

            Mnemonic::PHA => self.push(bus, self.a),
            Mnemonic::PHP => self.push(bus, self.p.pushed(true)),
            Mnemonic::PLA => {
                self.a = self.pop(bus);
                self.p.set_zn(self.a);
            }
            Mnemonic::PLP => self.p = Status::pulled(self.pop(bus)),

            Mnemonic::ASL => {
                self.modify(bus, mode, addr, Self::asl);
            }
            Mnemonic::LSR => {
                self.modify(bus, mode, addr, Self::lsr);
            }
            Mnemonic::ROL => {
                self.modify(bus, mode, addr, Self::rol);
            }
            Mnemonic::ROR => {
                self.modify(bus, mode, addr, Self::ror);
            }

            Mnemonic::AND => {
                self.a &= bus.read(addr);
                self.p.set_zn(self.a);
            }
            Mnemonic::ORA => {
                self.a |= bus.read(addr);
                self.p.set_zn(self.a);
            }
            Mnemonic::EOR => {
                self.a ^= bus.read(addr);
                self.p.set_zn(self.a);
            }
            Mnemonic::BIT => {
                let value = bus.read(addr);
                self.p.set(Status::ZERO, self.a & value == 0);
                self.p.set(Status::OVERFLOW, value & 0x40 != 0);
                self.p.set(Status::NEGATIVE, value & 0x80 != 0);
            }

            Mnemonic::ADC => {
                let value = bus.read(addr);
                self.add_with_carry(value);
            }
            Mnemonic::SBC => {
                let value = bus.read(addr);
                self.add_with_carry(!value);
            }
            Mnemonic::CMP => {
                let value = bus.read(addr);
                self.compare(self.a, value);
            }
            Mnemonic::CPX => {
                let value = bus.read(addr);
                self.compare(self.x, value);
            }
            Mnemonic::CPY => {
                let value = bus.read(addr);
                self.compare(self.y, value);
            }
            Mnemonic::ANC => {
                self.a &= bus.read(addr);
                self.p.set_zn(self.a);
                self.p.set(Status::CARRY, self.a & 0x80 != 0);
            }
            Mnemonic::ALR => {
                let value = self.a & bus.read(addr);
                self.a = self.lsr(value);
            }
            Mnemonic::ARR => {
                let value = self.a & bus.read(addr);
                self.a = (value >> 1) | ((self.p.contains(Status::CARRY) as u8) << 7);
                self.p.set_zn(self.a);
                self.p.set(Status::CARRY, self.a & 0x40 != 0);
                self.p
                    .set(Status::OVERFLOW, ((self.a >> 6) ^ (self.a >> 5)) & 1 != 0);
            }
            Mnemonic::XAA => {
                self.a = self.x & bus.read(addr);
                self.p.set_zn(self.a);
            }
            Mnemonic::SBX => {
                let value = bus.read(addr);
                let masked = self.a & self.x;
                self.p.set(Status::CARRY, masked >= value);
                self.x = masked.wrapping_sub(value);
                self.p.set_zn(self.x);
            }

            Mnemonic::INC => {
                self.modify(bus, mode, addr, |cpu, v| {
                    let r = v.wrapping_add(1);
                    cpu.p.set_zn(r);
                    r
                });
            }
            Mnemonic::DEC => {
                self.modify(bus, mode, addr, |cpu, v| {
                    let r = v.wrapping_sub(1);
                    cpu.p.set_zn(r);
                    r
                });
            }
            Mnemonic::INX => {
                self.x = self.x.wrapping_add(1);
                self.p.set_zn(self.x);
            }
            Mnemonic::INY => {
                self.y = self.y.wrapping_add(1);
                self.p.set_zn(self.y);
            }
            Mnemonic::DEX => {
                self.x = self.x.wrapping_sub(1);
                self.p.set_zn(self.x);
            }
            Mnemonic::DEY => {
                self.y = self.y.wrapping_sub(1);
                self.p.set_zn(self.y);
            }

            Mnemonic::DCP => {
                let value = self.modify(bus, mode, addr, |_, v| v.wrapping_sub(1));
                self.compare(self.a, value);
            }
            Mnemonic::ISC => {
                let value = self.modify(bus, mode, addr, |_, v| v.wrapping_add(1));
                self.add_with_carry(!value);
            }
            Mnemonic::SLO => {
                let value = self.modify(bus, mode, addr, Self::asl);
                self.a |= value;
                self.p.set_zn(self.a);
            }
            Mnemonic::RLA => {
                let value = self.modify(bus, mode, addr, Self::rol);
                self.a &= value;
                self.p.set_zn(self.a);
            }
            Mnemonic::SRE => {
                let value = self.modify(bus, mode, addr, Self::lsr);
                self.a ^= value;
                self.p.set_zn(self.a);
            }
            Mnemonic::RRA => {
                let value = self.modify(bus, mode, addr, Self::ror);
                self.add_with_carry(value);
            }

            Mnemonic::BRK => {
                // BRK skips a padding byte.
                self.pc = self.pc.wrapping_add(1);
                self.push_word(bus, self.pc);
                self.push(bus, self.p.pushed(true));
                self.p.insert(Status::INTERRUPT);
                self.pc = read_word(bus, cpu_mem::IRQ_VECTOR_LO);
            }
            Mnemonic::JMP => self.pc = addr,
            Mnemonic::JSR => {
                self.push_word(bus, self.pc.wrapping_sub(1));
                self.pc = addr;
            }
            Mnemonic::RTI => {
                self.p = Status::pulled(self.pop(bus));
                self.pc = self.pop_word(bus);
            }
            Mnemonic::RTS => self.pc = self.pop_word(bus).wrapping_add(1),

            Mnemonic::BCC => return self.branch(!self.p.contains(Status::CARRY), addr),
            Mnemonic::BCS => return self.branch(self.p.contains(Status::CARRY), addr),
            Mnemonic::BEQ => return self.branch(self.p.contains(Status::ZERO), addr),
            Mnemonic::BNE => return self.branch(!self.p.contains(Status::ZERO), addr),
            Mnemonic::BMI => return self.branch(self.p.contains(Status::NEGATIVE), addr),
            Mnemonic::BPL => return self.branch(!self.p.contains(Status::NEGATIVE), addr),
            Mnemonic::BVS => return self.branch(self.p.contains(Status::OVERFLOW), addr),
            Mnemonic::BVC => return self.branch(!self.p.contains(Status::OVERFLOW), addr),

            Mnemonic::CLC => self.p.remove(Status::CARRY),
            Mnemonic::CLD => self.p.remove(Status::DECIMAL),
            Mnemonic::CLI => self.p.remove(Status::INTERRUPT),
            Mnemonic::CLV => self.p.remove(Status::OVERFLOW),
            Mnemonic::SEC => self.p.insert(Status::CARRY),
            Mnemonic::SED => self.p.insert(Status::DECIMAL),
            Mnemonic::SEI => self.p.insert(Status::INTERRUPT),

            Mnemonic::NOP => {
                // Multi-byte NOPs still perform their read.
                if !matches!(mode, Addressing::Implied) {
                    bus.read(addr);
                }
            }
            Mnemonic::JAM => {
                tracing::warn!(pc = self.pc.wrapping_sub(1), "cpu jammed");
                self.jammed = true;
            }
        }
        0
    }

    /// Read-modify-write on A or memory; returns the stored value.
    fn modify<B, F>(&mut self, bus: &mut B, mode: Addressing, addr: u16, op: F) -> u8
    where
        B: Bus,
        F: FnOnce(&mut Self, u8) -> u8,
    {
        if mode == Addressing::Accumulator {
            let a = self.a;
            let result = op(self, a);
            self.a = result;
            result
        } else {
            let value = bus.read(addr);
            let result = op(self, value);
            bus.write(addr, result);
            result
        }
    }

    fn asl(&mut self, value: u8) -> u8 {
        self.p.set(Status::CARRY, value & 0x80 != 0);
        let result = value << 1;
        self.p.set_zn(result);
        result
    }

    fn lsr(&mut self, value: u8) -> u8 {
        self.p.set(Status::CARRY, value & 0x01 != 0);
        let result = value >> 1;
        self.p.set_zn(result);
        result
    }

    fn rol(&mut self, value: u8) -> u8 {
        let carry_in = self.p.contains(Status::CARRY) as u8;
        self.p.set(Status::CARRY, value & 0x80 != 0);
        let result = (value << 1) | carry_in;
        self.p.set_zn(result);
        result
    }

    fn ror(&mut self, value: u8) -> u8 {
        let carry_in = (self.p.contains(Status::CARRY) as u8) << 7;
        self.p.set(Status::CARRY, value & 0x01 != 0);
        let result = (value >> 1) | carry_in;
        self.p.set_zn(result);
        result
    }

    fn add_with_carry(&mut self, value: u8) {
        let sum = self.a as u16 + value as u16 + self.p.contains(Status::CARRY) as u16;
        let result = sum as u8;
        self.p.set(Status::CARRY, sum > 0xFF);
        self.p.set(
            Status::OVERFLOW,
            (!(self.a ^ value) & (self.a ^ result) & 0x80) != 0,
        );
        self.a = result;
        self.p.set_zn(result);
    }

    fn compare(&mut self, register: u8, value: u8) {
        self.p.set(Status::CARRY, register >= value);
        self.p.set_zn(register.wrapping_sub(value));
    }

    fn branch(&mut self, taken: bool, target: u16) -> u32 {
        if !taken {
            return 0;
        }
        let extra = if (self.pc & 0xFF00) != (target & 0xFF00) {
            2
        } else {
            1
        };
        self.pc = target;
        extra
    }

    fn push<B: Bus>(&mut self, bus: &mut B, value: u8) {
        bus.write(cpu_mem::STACK_PAGE_START | self.s as u16, value);
        self.s = self.s.wrapping_sub(1);
    }

    fn push_word<B: Bus>(&mut self, bus: &mut B, value: u16) {
        self.push(bus, (value >> 8) as u8);
        self.push(bus, value as u8);
    }

    fn pop<B: Bus>(&mut self, bus: &mut B) -> u8 {
        self.s = self.s.wrapping_add(1);
        bus.read(cpu_mem::STACK_PAGE_START | self.s as u16)
    }

    fn pop_word<B: Bus>(&mut self, bus: &mut B) -> u16 {
        let lo = self.pop(bus) as u16;
        let hi = self.pop(bus) as u16;
        (hi << 8) | lo
    }
}

fn indexed(base: u16, index: u8) -> (u16, bool) {
    let addr = base.wrapping_add(index as u16);
    (addr, (base & 0xFF00) != (addr & 0xFF00))
}

fn high_plus_one(addr: u16) -> u8 {
    ((addr >> 8) as u8).wrapping_add(1)
}

fn read_word<B: Bus>(bus: &mut B, addr: u16) -> u16 {
    let lo = bus.read(addr) as u16;
    let hi = bus.read(addr.wrapping_add(1)) as u16;
    (hi << 8) | lo
}

fn read_zp_word<B: Bus>(bus: &mut B, zp: u8) -> u16 {
    let lo = bus.read(zp as u16) as u16;
    let hi = bus.read(zp.wrapping_add(1) as u16) as u16;
    (hi << 8) | lo
}
