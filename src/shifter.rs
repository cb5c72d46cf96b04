//! TX shift engine
//!
//! Presents successive bits of the loaded 16-bit word on the data-out line,
//! most-significant bit first. Bit `15 - j` must be observable at the `j`-th
//! active serial-clock edge, so the word is loaded before shifting begins
//! (MOSI already carries bit 15) and the engine advances on falling edges,
//! keeping each bit stable across the rising edge that samples it.

/// Number of bits in a transfer word
pub const WORD_BITS: u32 = 16;

/// MSB-first 16-bit transmit shifter.
#[derive(Debug, Clone)]
pub struct TxShifter {
    /// Word being shifted out, immutable during the transfer
    word: u16,
    /// Active edges already consumed (0..=16)
    bits_sent: u32,
}

impl TxShifter {
    /// Create an empty shifter
    pub fn new() -> Self {
        Self {
            word: 0,
            bits_sent: 0,
        }
    }

    /// Clear the shifter to its reset state
    pub fn reset(&mut self) {
        self.word = 0;
        self.bits_sent = 0;
    }

    /// Load a word and rewind to bit 15. Called once per transfer, when the
    /// start pulse is accepted.
    pub fn load(&mut self, word: u16) {
        self.word = word;
        self.bits_sent = 0;
    }

    /// Level currently driven on the data-out line
    pub fn mosi(&self) -> bool {
        let idx = (WORD_BITS - 1).saturating_sub(self.bits_sent.min(WORD_BITS - 1));
        (self.word >> idx) & 1 != 0
    }

    /// Move to the next bit. Called on each falling serial-clock edge.
    pub fn advance(&mut self) {
        if self.bits_sent < WORD_BITS {
            self.bits_sent += 1;
        }
    }

    /// Active edges consumed so far
    pub fn bits_sent(&self) -> u32 {
        self.bits_sent
    }
}

impl Default for TxShifter {
    fn default() -> Self {
        Self::new()
    }
}
