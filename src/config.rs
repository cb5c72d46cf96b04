//! Controller configuration
//!
//! All timing parameters are explicit fields handed to the controller at
//! construction time. The controller latches a private copy of the timing
//! fields when it accepts a start pulse, so writes between transfers take
//! effect on the next transfer and writes mid-transfer are harmless.

/// Serial-clock edge selector.
///
/// In dual-capture mode this picks which edge's settling window feeds
/// channel A; the other edge feeds channel B.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleEdge {
    /// The active (low-to-high) serial-clock edge
    Rising,
    /// The inactive (high-to-low) serial-clock edge
    Falling,
}

/// Receive capture mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureMode {
    /// One sample per serial-clock period, taken on the active edge.
    Single,
    /// Two samples per serial-clock period (double-rate), one after each
    /// edge's settling window, into two independent 16-bit registers.
    Dual {
        /// Edge whose settling-window sample lands in channel A
        first_sample: SampleEdge,
    },
}

/// Controller configuration.
#[derive(Debug, Clone, Copy)]
pub struct Config {
    /// Serial-clock divisor: half-period = `clk_div + 1` main-clock cycles.
    /// 0 selects the fastest rate (toggle every main-clock cycle).
    pub clk_div: u32,
    /// Main-clock cycles chip-select stays asserted after the transfer
    /// completes, before the controller returns to idle.
    pub wait_after_done: u32,
    /// Receive capture mode
    pub capture: CaptureMode,
}

impl Config {
    /// Dual-capture configuration with channel A on the rising edge,
    /// the ordering the RHD2164 front end uses.
    pub fn dual(clk_div: u32, wait_after_done: u32) -> Self {
        Self {
            clk_div,
            wait_after_done,
            capture: CaptureMode::Dual {
                first_sample: SampleEdge::Rising,
            },
        }
    }

    /// Single-capture configuration.
    pub fn single(clk_div: u32, wait_after_done: u32) -> Self {
        Self {
            clk_div,
            wait_after_done,
            capture: CaptureMode::Single,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::single(0, 0)
    }
}
