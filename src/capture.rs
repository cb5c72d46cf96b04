//! RX capture engine
//!
//! Assembles the data-in samples into 16-bit receive registers, MSB-first:
//! the `j`-th sample on a channel lands in bit `15 - j`. The controller
//! decides when samples are taken (on the active edge in single mode, one
//! main-clock cycle after each edge in dual mode) and which channel each
//! sample feeds; this engine only owns the registers.
//!
//! Captured words stay stable through the hold and idle phases and are
//! cleared only when the next transfer's shift phase begins, so a consumer
//! that has seen a done pulse can read them at leisure.

use crate::shifter::WORD_BITS;

/// Dual-channel 16-bit receive register bank.
///
/// Single-capture configurations use channel A only.
#[derive(Debug, Clone)]
pub struct RxCapture {
    word_a: u16,
    word_b: u16,
    bits_a: u32,
    bits_b: u32,
}

impl RxCapture {
    /// Create a capture bank with both registers cleared
    pub fn new() -> Self {
        Self {
            word_a: 0,
            word_b: 0,
            bits_a: 0,
            bits_b: 0,
        }
    }

    /// Reset-state clear (also clears the words, unlike [`begin`])
    ///
    /// [`begin`]: RxCapture::begin
    pub fn reset(&mut self) {
        self.word_a = 0;
        self.word_b = 0;
        self.bits_a = 0;
        self.bits_b = 0;
    }

    /// Start a new capture window. Called when the shift phase begins.
    pub fn begin(&mut self) {
        self.reset();
    }

    /// Record the next channel-A sample
    pub fn sample_a(&mut self, bit: bool) {
        if self.bits_a < WORD_BITS {
            if bit {
                self.word_a |= 1 << (WORD_BITS - 1 - self.bits_a);
            }
            self.bits_a += 1;
        }
    }

    /// Record the next channel-B sample
    pub fn sample_b(&mut self, bit: bool) {
        if self.bits_b < WORD_BITS {
            if bit {
                self.word_b |= 1 << (WORD_BITS - 1 - self.bits_b);
            }
            self.bits_b += 1;
        }
    }

    /// Assembled channel-A word (the receive word in single mode)
    pub fn word_a(&self) -> u16 {
        self.word_a
    }

    /// Assembled channel-B word (dual mode only)
    pub fn word_b(&self) -> u16 {
        self.word_b
    }

    /// Channel-A samples recorded so far
    pub fn bits_a(&self) -> u32 {
        self.bits_a
    }

    /// Channel-B samples recorded so far
    pub fn bits_b(&self) -> u32 {
        self.bits_b
    }
}

impl Default for RxCapture {
    fn default() -> Self {
        Self::new()
    }
}
