//! Standard NES joypad readable through `$4016/$4017`.

use bitflags::bitflags;

#[cfg(feature = "savestate-serde")]
use serde::{Deserialize, Serialize};

bitflags! {
    /// Pressed-button mask in shift-register order: bit 0 (A) is the first
    /// bit the game reads after strobing.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Buttons: u8 {
        const A      = 0b0000_0001;
        const B      = 0b0000_0010;
        const SELECT = 0b0000_0100;
        const START  = 0b0000_1000;
        const UP     = 0b0001_0000;
        const DOWN   = 0b0010_0000;
        const LEFT   = 0b0100_0000;
        const RIGHT  = 0b1000_0000;
    }
}

/// Serially-readable controller state with latch/strobe behavior.
#[cfg_attr(feature = "savestate-serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Controller {
    strobe: bool,
    latched: u8,
    state: u8,
}

impl Controller {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the whole pressed-button mask.
    pub fn set_buttons(&mut self, buttons: Buttons) {
        self.state = buttons.bits();
        if self.strobe {
            self.latched = self.state;
        }
    }

    pub fn buttons(&self) -> Buttons {
        Buttons::from_bits_retain(self.state)
    }

    /// Writes to the `$4016` strobe bit (shared by both ports).
    pub fn write_strobe(&mut self, data: u8) {
        self.strobe = data & 0x01 != 0;
        if self.strobe {
            self.latched = self.state;
        }
    }

    /// Reads the next bit from the latched shift register.
    pub fn read(&mut self) -> u8 {
        let bit = self.latched & 0x01;
        if !self.strobe {
            // Hardware returns 1s once all eight buttons were shifted out.
            self.latched = (self.latched >> 1) | 0x80;
        }
        bit | 0x40
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shifts_buttons_out_in_order_then_ones() {
        let mut pad = Controller::new();
        pad.set_buttons(Buttons::A | Buttons::START | Buttons::RIGHT);
        pad.write_strobe(1);
        pad.write_strobe(0);

        let bits: Vec<u8> = (0..10).map(|_| pad.read() & 1).collect();
        assert_eq!(bits, [1, 0, 0, 1, 0, 0, 0, 1, 1, 1]);
    }

    #[test]
    fn strobe_high_keeps_reporting_a() {
        let mut pad = Controller::new();
        pad.write_strobe(1);
        pad.set_buttons(Buttons::A);
        assert_eq!(pad.read() & 1, 1);
        assert_eq!(pad.read() & 1, 1);
    }
}
