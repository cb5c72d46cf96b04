//! Serial-clock divider
//!
//! The serial clock is not a second oscillator: it is a boolean level
//! recomputed every main-clock step from a cycle counter. The half-period is
//! `clk_div + 1` main-clock cycles, so `clk_div = 0` toggles the output on
//! every main-clock cycle.
//!
//! The controller gates the divider: it only calls [`ClockDivider::tick`]
//! during the shifting phase and resets the divider when a transfer is
//! armed, so the first rising edge lands `clk_div + 1` cycles into shifting
//! regardless of what the previous transfer did.

/// A serial-clock toggle, as seen by the shifting logic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SclkEdge {
    /// Output toggled low-to-high (the active edge)
    Rising,
    /// Output toggled high-to-low
    Falling,
}

/// Counter-driven serial-clock generator.
#[derive(Debug, Clone)]
pub struct ClockDivider {
    /// Main-clock cycles since the last toggle
    count: u32,
    /// Current output level
    level: bool,
}

impl ClockDivider {
    /// Create a divider in the idle (output low) state
    pub fn new() -> Self {
        Self {
            count: 0,
            level: false,
        }
    }

    /// Force the idle state: output low, phase counter cleared
    pub fn reset(&mut self) {
        self.count = 0;
        self.level = false;
    }

    /// Current serial-clock output level
    pub fn level(&self) -> bool {
        self.level
    }

    /// Advance one main-clock cycle. Returns the edge produced this cycle,
    /// if any. `clk_div` is the latched divisor for the active transfer.
    pub fn tick(&mut self, clk_div: u32) -> Option<SclkEdge> {
        self.count += 1;
        if self.count < clk_div + 1 {
            return None;
        }
        self.count = 0;
        self.level = !self.level;
        Some(if self.level {
            SclkEdge::Rising
        } else {
            SclkEdge::Falling
        })
    }
}

impl Default for ClockDivider {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_idle_low_after_reset() {
        let mut div = ClockDivider::new();
        assert!(!div.level());
        div.tick(3);
        div.reset();
        assert!(!div.level());
    }

    #[test]
    fn test_fastest_rate_toggles_every_cycle() {
        let mut div = ClockDivider::new();
        assert_eq!(div.tick(0), Some(SclkEdge::Rising));
        assert!(div.level());
        assert_eq!(div.tick(0), Some(SclkEdge::Falling));
        assert!(!div.level());
    }

    #[test]
    fn test_half_period_is_div_plus_one() {
        for d in [0u32, 1, 3, 7, 15] {
            let mut div = ClockDivider::new();

            // First rising edge after exactly d + 1 cycles
            for _ in 0..d {
                assert_eq!(div.tick(d), None, "early toggle at div {}", d);
            }
            assert_eq!(div.tick(d), Some(SclkEdge::Rising));

            // Level holds for d cycles, then falls on cycle d + 1
            for _ in 0..d {
                assert_eq!(div.tick(d), None);
                assert!(div.level());
            }
            assert_eq!(div.tick(d), Some(SclkEdge::Falling));
            assert!(!div.level());
        }
    }

    #[test]
    fn test_phase_restarts_after_reset() {
        let mut div = ClockDivider::new();
        // Leave the divider mid-phase, then reset
        div.tick(4);
        div.tick(4);
        div.reset();

        for _ in 0..4 {
            assert_eq!(div.tick(4), None);
        }
        assert_eq!(div.tick(4), Some(SclkEdge::Rising));
    }
}
