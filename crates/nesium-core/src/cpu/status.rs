use bitflags::bitflags;

bitflags! {
    /// 6502 processor status register (P).
    ///
    /// ```text
    /// 7 6 5 4 3 2 1 0
    /// N V _ B D I Z C
    /// ```
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub(crate) struct Status: u8 {
        const CARRY     = 0b0000_0001;
        const ZERO      = 0b0000_0010;
        /// Masks IRQs while set.
        const INTERRUPT = 0b0000_0100;
        /// Stored but ignored: the 2A03 has no decimal mode.
        const DECIMAL   = 0b0000_1000;
        /// Only exists in the copy pushed by BRK/PHP.
        const BREAK     = 0b0001_0000;
        const UNUSED    = 0b0010_0000;
        const OVERFLOW  = 0b0100_0000;
        const NEGATIVE  = 0b1000_0000;
    }
}

impl Status {
    /// Power-up value: interrupts masked, unused bit high.
    pub(crate) fn power_on() -> Self {
        Self::INTERRUPT | Self::UNUSED
    }

    /// Updates Z and N from `value`.
    pub(crate) fn set_zn(&mut self, value: u8) {
        self.set(Self::ZERO, value == 0);
        self.set(Self::NEGATIVE, value & 0x80 != 0);
    }

    /// Byte pushed to the stack. `brk` distinguishes BRK/PHP from hardware
    /// interrupts.
    pub(crate) fn pushed(self, brk: bool) -> u8 {
        let mut bits = self | Self::UNUSED;
        bits.set(Self::BREAK, brk);
        bits.bits()
    }

    /// Value restored by PLP/RTI; B does not exist in the register itself.
    pub(crate) fn pulled(byte: u8) -> Self {
        (Self::from_bits_retain(byte) - Self::BREAK) | Self::UNUSED
    }
}
