use crate::cpu::addressing::Addressing as A;
use crate::cpu::instruction::{Instruction as I, Mnemonic as M};

// Short aliases for addressing modes (to keep the 16x16 table readable)
const IMP: A = A::Implied;
const ACC: A = A::Accumulator;
const IMM: A = A::Immediate;
const REL: A = A::Relative;
const ZP: A = A::ZeroPage;
const ZPX: A = A::ZeroPageX;
const ZPY: A = A::ZeroPageY;
const ABS: A = A::Absolute;
const ABX: A = A::AbsoluteX;
const ABY: A = A::AbsoluteY;
const IND: A = A::Indirect;
const INX: A = A::IndirectX;
const INY: A = A::IndirectY;

/// Fixed cost.
macro_rules! op {
    ($ins:ident, $addr:ident, $cycles:literal) => {
        I::new(M::$ins, $addr, $cycles, false)
    };
}

/// Cost plus one when the indexed access crosses a page.
macro_rules! pg {
    ($ins:ident, $addr:ident, $cycles:literal) => {
        I::new(M::$ins, $addr, $cycles, true)
    };
}

#[rustfmt::skip]
pub(crate) static LOOKUP_TABLE: [I; 256] = [
    // 0x00
    op!(BRK, IMP, 7), op!(ORA, INX, 6), op!(JAM, IMP, 2), op!(SLO, INX, 8), op!(NOP, ZP, 3),  op!(ORA, ZP, 3),  op!(ASL, ZP, 5),  op!(SLO, ZP, 5),
    op!(PHP, IMP, 3), op!(ORA, IMM, 2), op!(ASL, ACC, 2), op!(ANC, IMM, 2), op!(NOP, ABS, 4), op!(ORA, ABS, 4), op!(ASL, ABS, 6), op!(SLO, ABS, 6),

    // 0x10
    op!(BPL, REL, 2), pg!(ORA, INY, 5), op!(JAM, IMP, 2), op!(SLO, INY, 8), op!(NOP, ZPX, 4), op!(ORA, ZPX, 4), op!(ASL, ZPX, 6), op!(SLO, ZPX, 6),
    op!(CLC, IMP, 2), pg!(ORA, ABY, 4), op!(NOP, IMP, 2), op!(SLO, ABY, 7), pg!(NOP, ABX, 4), pg!(ORA, ABX, 4), op!(ASL, ABX, 7), op!(SLO, ABX, 7),

    // 0x20
    op!(JSR, ABS, 6), op!(AND, INX, 6), op!(JAM, IMP, 2), op!(RLA, INX, 8), op!(BIT, ZP, 3),  op!(AND, ZP, 3),  op!(ROL, ZP, 5),  op!(RLA, ZP, 5),
    op!(PLP, IMP, 4), op!(AND, IMM, 2), op!(ROL, ACC, 2), op!(ANC, IMM, 2), op!(BIT, ABS, 4), op!(AND, ABS, 4), op!(ROL, ABS, 6), op!(RLA, ABS, 6),

    // 0x30
    op!(BMI, REL, 2), pg!(AND, INY, 5), op!(JAM, IMP, 2), op!(RLA, INY, 8), op!(NOP, ZPX, 4), op!(AND, ZPX, 4), op!(ROL, ZPX, 6), op!(RLA, ZPX, 6),
    op!(SEC, IMP, 2), pg!(AND, ABY, 4), op!(NOP, IMP, 2), op!(RLA, ABY, 7), pg!(NOP, ABX, 4), pg!(AND, ABX, 4), op!(ROL, ABX, 7), op!(RLA, ABX, 7),

    // 0x40
    op!(RTI, IMP, 6), op!(EOR, INX, 6), op!(JAM, IMP, 2), op!(SRE, INX, 8), op!(NOP, ZP, 3),  op!(EOR, ZP, 3),  op!(LSR, ZP, 5),  op!(SRE, ZP, 5),
    op!(PHA, IMP, 3), op!(EOR, IMM, 2), op!(LSR, ACC, 2), op!(ALR, IMM, 2), op!(JMP, ABS, 3), op!(EOR, ABS, 4), op!(LSR, ABS, 6), op!(SRE, ABS, 6),

    // 0x50
    op!(BVC, REL, 2), pg!(EOR, INY, 5), op!(JAM, IMP, 2), op!(SRE, INY, 8), op!(NOP, ZPX, 4), op!(EOR, ZPX, 4), op!(LSR, ZPX, 6), op!(SRE, ZPX, 6),
    op!(CLI, IMP, 2), pg!(EOR, ABY, 4), op!(NOP, IMP, 2), op!(SRE, ABY, 7), pg!(NOP, ABX, 4), pg!(EOR, ABX, 4), op!(LSR, ABX, 7), op!(SRE, ABX, 7),

    // 0x60
    op!(RTS, IMP, 6), op!(ADC, INX, 6), op!(JAM, IMP, 2), op!(RRA, INX, 8), op!(NOP, ZP, 3),  op!(ADC, ZP, 3),  op!(ROR, ZP, 5),  op!(RRA, ZP, 5),
    op!(PLA, IMP, 4), op!(ADC, IMM, 2), op!(ROR, ACC, 2), op!(ARR, IMM, 2), op!(JMP, IND, 5), op!(ADC, ABS, 4), op!(ROR, ABS, 6), op!(RRA, ABS, 6),

    // 0x70
    op!(BVS, REL, 2), pg!(ADC, INY, 5), op!(JAM, IMP, 2), op!(RRA, INY, 8), op!(NOP, ZPX, 4), op!(ADC, ZPX, 4), op!(ROR, ZPX, 6), op!(RRA, ZPX, 6),
    op!(SEI, IMP, 2), pg!(ADC, ABY, 4), op!(NOP, IMP, 2), op!(RRA, ABY, 7), pg!(NOP, ABX, 4), pg!(ADC, ABX, 4), op!(ROR, ABX, 7), op!(RRA, ABX, 7),

    // 0x80
    op!(NOP, IMM, 2), op!(STA, INX, 6), op!(NOP, IMM, 2), op!(SAX, INX, 6), op!(STY, ZP, 3),  op!(STA, ZP, 3),  op!(STX, ZP, 3),  op!(SAX, ZP, 3),
    op!(DEY, IMP, 2), op!(NOP, IMM, 2), op!(TXA, IMP, 2), op!(XAA, IMM, 2), op!(STY, ABS, 4), op!(STA, ABS, 4), op!(STX, ABS, 4), op!(SAX, ABS, 4),

    // 0x90
    op!(BCC, REL, 2), op!(STA, INY, 6), op!(JAM, IMP, 2), op!(SHA, INY, 6), op!(STY, ZPX, 4), op!(STA, ZPX, 4), op!(STX, ZPY, 4), op!(SAX, ZPY, 4),
    op!(TYA, IMP, 2), op!(STA, ABY, 5), op!(TXS, IMP, 2), op!(SHS, ABY, 5), op!(SHY, ABX, 5), op!(STA, ABX, 5), op!(SHX, ABY, 5), op!(SHA, ABY, 5),

    // 0xA0
    op!(LDY, IMM, 2), op!(LDA, INX, 6), op!(LDX, IMM, 2), op!(LAX, INX, 6), op!(LDY, ZP, 3),  op!(LDA, ZP, 3),  op!(LDX, ZP, 3),  op!(LAX, ZP, 3),
    op!(TAY, IMP, 2), op!(LDA, IMM, 2), op!(TAX, IMP, 2), op!(LAX, IMM, 2), op!(LDY, ABS, 4), op!(LDA, ABS, 4), op!(LDX, ABS, 4), op!(LAX, ABS, 4),

    // 0xB0
    op!(BCS, REL, 2), pg!(LDA, INY, 5), op!(JAM, IMP, 2), pg!(LAX, INY, 5), op!(LDY, ZPX, 4), op!(LDA, ZPX, 4), op!(LDX, ZPY, 4), op!(LAX, ZPY, 4),
    op!(CLV, IMP, 2), pg!(LDA, ABY, 4), op!(TSX, IMP, 2), pg!(LAS, ABY, 4), pg!(LDY, ABX, 4), pg!(LDA, ABX, 4), pg!(LDX, ABY, 4), pg!(LAX, ABY, 4),

    // 0xC0
    op!(CPY, IMM, 2), op!(CMP, INX, 6), op!(NOP, IMM, 2), op!(DCP, INX, 8), op!(CPY, ZP, 3),  op!(CMP, ZP, 3),  op!(DEC, ZP, 5),  op!(DCP, ZP, 5),
    op!(INY, IMP, 2), op!(CMP, IMM, 2), op!(DEX, IMP, 2), op!(SBX, IMM, 2), op!(CPY, ABS, 4), op!(CMP, ABS, 4), op!(DEC, ABS, 6), op!(DCP, ABS, 6),

    // 0xD0
    op!(BNE, REL, 2), pg!(CMP, INY, 5), op!(JAM, IMP, 2), op!(DCP, INY, 8), op!(NOP, ZPX, 4), op!(CMP, ZPX, 4), op!(DEC, ZPX, 6), op!(DCP, ZPX, 6),
    op!(CLD, IMP, 2), pg!(CMP, ABY, 4), op!(NOP, IMP, 2), op!(DCP, ABY, 7), pg!(NOP, ABX, 4), pg!(CMP, ABX, 4), op!(DEC, ABX, 7), op!(DCP, ABX, 7),

    // 0xE0
    op!(CPX, IMM, 2), op!(SBC, INX, 6), op!(NOP, IMM, 2), op!(ISC, INX, 8), op!(CPX, ZP, 3),  op!(SBC, ZP, 3),  op!(INC, ZP, 5),  op!(ISC, ZP, 5),
    op!(INX, IMP, 2), op!(SBC, IMM, 2), op!(NOP, IMP, 2), op!(SBC, IMM, 2), op!(CPX, ABS, 4), op!(SBC, ABS, 4), op!(INC, ABS, 6), op!(ISC, ABS, 6),

    // 0xF0
    op!(BEQ, REL, 2), pg!(SBC, INY, 5), op!(JAM, IMP, 2), op!(ISC, INY, 8), op!(NOP, ZPX, 4), op!(SBC, ZPX, 4), op!(INC, ZPX, 6), op!(ISC, ZPX, 6),
    op!(SED, IMP, 2), pg!(SBC, ABY, 4), op!(NOP, IMP, 2), op!(ISC, ABY, 7), pg!(NOP, ABX, 4), pg!(SBC, ABX, 4), op!(INC, ABX, 7), op!(ISC, ABX, 7),
];
