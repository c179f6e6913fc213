/// 6502 addressing modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum Addressing {
    Implied,
    /// Operates on A (`ASL A`, `ROR A`, ...).
    Accumulator,
    Immediate,
    ZeroPage,
    /// Zero page plus X, wrapping inside page zero.
    ZeroPageX,
    ZeroPageY,
    Absolute,
    /// Absolute plus X; crossing a page may cost a cycle.
    AbsoluteX,
    AbsoluteY,
    /// `JMP ($nnnn)`, including the page-wrap bug of the pointer fetch.
    Indirect,
    /// `($nn,X)`
    IndirectX,
    /// `($nn),Y`
    IndirectY,
    /// Signed 8-bit branch offset.
    Relative,
}
