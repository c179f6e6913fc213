use crate::cpu::addressing::Addressing;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum Mnemonic {
    // Load/store
    LDA,
    LDX,
    LDY,
    STA,
    STX,
    STY,
    LAX,
    SAX,
    LAS,
    SHA,
    SHX,
    SHY,
    SHS,
    // Transfer
    TAX,
    TAY,
    TSX,
    TXA,
    TXS,
    TYA,
    // Stack
    PHA,
    PHP,
    PLA,
    PLP,
    // Shift / rotate
    ASL,
    LSR,
    ROL,
    ROR,
    // Logic
    AND,
    BIT,
    EOR,
    ORA,
    // Arithmetic
    ADC,
    SBC,
    CMP,
    CPX,
    CPY,
    ANC,
    ALR,
    ARR,
    XAA,
    SBX,
    // Increment / decrement
    DEC,
    DEX,
    DEY,
    INC,
    INX,
    INY,
    // Combined read-modify-write
    DCP,
    ISC,
    RLA,
    RRA,
    SLO,
    SRE,
    // Control flow
    BRK,
    JMP,
    JSR,
    RTI,
    RTS,
    // Branches
    BCC,
    BCS,
    BEQ,
    BMI,
    BNE,
    BPL,
    BVC,
    BVS,
    // Flags
    CLC,
    CLD,
    CLI,
    CLV,
    SEC,
    SED,
    SEI,
    NOP,
    /// Halts the CPU until reset.
    JAM,
}

/// Decoded opcode: what to do, where the operand lives and the base cost.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Instruction {
    pub(crate) mnemonic: Mnemonic,
    pub(crate) addressing: Addressing,
    pub(crate) cycles: u8,
    /// Adds a cycle when indexing crosses a page boundary.
    pub(crate) page_penalty: bool,
}

impl Instruction {
    pub(crate) const fn new(
        mnemonic: Mnemonic,
        addressing: Addressing,
        cycles: u8,
        page_penalty: bool,
    ) -> Self {
        Self {
            mnemonic,
            addressing,
            cycles,
            page_penalty,
        }
    }
}
