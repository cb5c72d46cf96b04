//! Transfer state machine
//!
//! The controller advances exactly one step per main-clock rising edge.
//! Each step is a pure function of the current state and the input lines;
//! there are no other clock domains (the serial clock is the gated divider
//! output) and no error path, only transition guards.
//!
//! Transfer timing, with `S` the step a start pulse is accepted and
//! `d` the latched divisor:
//!
//! | Event | Step |
//! |---|---|
//! | chip-select asserts | `S` |
//! | shifting begins (setup delay) | `S + 2` |
//! | first serial-clock rising edge | `S + 2 + (d + 1)` |
//! | 16th falling edge (32nd toggle) | `S + 2 + 32 * (d + 1)` |
//! | `done` / `rx_done` pulse | `S + 2 + 32 * (d + 1) + 1` |
//! | chip-select deasserts | `wait_after_done + 1` steps after `done` |
//!
//! The extra cycle before `done` is the settling window of the final
//! dual-capture sample; it is kept in single mode too so the completion
//! time does not depend on the capture mode.

use crate::capture::RxCapture;
use crate::config::{CaptureMode, Config, SampleEdge};
use crate::divider::{ClockDivider, SclkEdge};
use crate::shifter::{TxShifter, WORD_BITS};

/// Main-clock cycles spent in `Assert` between chip-select going active
/// and the divider starting to toggle.
pub const SETUP_CYCLES: u32 = 2;

/// Controller state, one tag per transfer phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    /// No transfer in flight; chip-select inactive, serial clock low
    Idle,
    /// Chip-select active, waiting out the setup delay
    Assert,
    /// Serial clock running; 16 bits shifted out and sampled in
    Shift,
    /// Transfer complete, chip-select held for the configured wait
    Hold,
}

/// Input lines, sampled at the start of each step.
#[derive(Debug, Clone, Copy, Default)]
pub struct Inputs {
    /// Start pulse; examined only in `Idle`
    pub start: bool,
    /// Transmit word, loaded when a start is accepted
    pub din: u16,
    /// Data-in line
    pub miso: bool,
}

/// Output lines, valid after the step that produced them.
#[derive(Debug, Clone, Copy)]
pub struct Outputs {
    /// Serial-clock level
    pub sclk: bool,
    /// Data-out level
    pub mosi: bool,
    /// Chip-select level (active-low: `true` means inactive)
    pub cs: bool,
    /// Transfer-complete pulse, high for exactly one step
    pub done: bool,
    /// Receive-data-valid pulse, high for exactly one step
    pub rx_done: bool,
}

/// SPI master protocol controller.
#[derive(Debug, Clone)]
pub struct SpiMaster {
    config: Config,
    state: State,
    divider: ClockDivider,
    tx: TxShifter,
    rx: RxCapture,
    /// Divisor latched at start-accept
    active_clk_div: u32,
    /// Hold count latched at start-accept
    active_wait: u32,
    /// Capture mode latched at start-accept
    active_capture: CaptureMode,
    /// Cycles spent in `Assert`
    setup_count: u32,
    /// Rising edges produced this transfer
    edges_done: u32,
    /// All 32 toggles done; one settling cycle left before `done`
    finishing: bool,
    /// Dual-mode sample due this step from the last rising toggle
    pend_rising: bool,
    /// Dual-mode sample due this step from the last falling toggle
    pend_falling: bool,
    /// Cycles spent in `Hold`
    hold_count: u32,
}

impl SpiMaster {
    /// Create a controller in the idle state
    pub fn new(config: Config) -> Self {
        Self {
            config,
            state: State::Idle,
            divider: ClockDivider::new(),
            tx: TxShifter::new(),
            rx: RxCapture::new(),
            active_clk_div: 0,
            active_wait: 0,
            active_capture: config.capture,
            setup_count: 0,
            edges_done: 0,
            finishing: false,
            pend_rising: false,
            pend_falling: false,
            hold_count: 0,
        }
    }

    /// Reset: abort any in-flight transfer and return to idle with all
    /// counters cleared. No completion pulse is produced.
    pub fn reset(&mut self) {
        self.state = State::Idle;
        self.divider.reset();
        self.tx.reset();
        self.rx.reset();
        self.setup_count = 0;
        self.edges_done = 0;
        self.finishing = false;
        self.pend_rising = false;
        self.pend_falling = false;
        self.hold_count = 0;
    }

    /// Current state
    pub fn state(&self) -> State {
        self.state
    }

    /// True while a transfer is in flight (chip-select active)
    pub fn is_busy(&self) -> bool {
        self.state != State::Idle
    }

    /// Current configuration
    pub fn config(&self) -> Config {
        self.config
    }

    /// Replace the configuration. Takes effect at the next accepted start;
    /// the in-flight transfer keeps its latched timing and capture mode.
    pub fn set_config(&mut self, config: Config) {
        self.config = config;
    }

    /// Receive word (channel A). Valid once a `rx_done` pulse has been
    /// observed since reset; stable until the next transfer starts shifting.
    pub fn rx_word(&self) -> u16 {
        self.rx.word_a()
    }

    /// Dual-capture channel-A word
    pub fn rx_word_a(&self) -> u16 {
        self.rx.word_a()
    }

    /// Dual-capture channel-B word
    pub fn rx_word_b(&self) -> u16 {
        self.rx.word_b()
    }

    /// Route a settling-window sample to its capture channel
    fn capture_sample(&mut self, edge: SampleEdge, bit: bool) {
        match self.active_capture {
            CaptureMode::Single => self.rx.sample_a(bit),
            CaptureMode::Dual { first_sample } => {
                if edge == first_sample {
                    self.rx.sample_a(bit);
                } else {
                    self.rx.sample_b(bit);
                }
            }
        }
    }

    /// Advance one main-clock cycle.
    pub fn step(&mut self, input: Inputs) -> Outputs {
        let mut done = false;
        let mut rx_done = false;

        // Dual-mode samples land here, one cycle after the toggle that
        // scheduled them, once the line has settled.
        if self.pend_rising {
            self.pend_rising = false;
            self.capture_sample(SampleEdge::Rising, input.miso);
        }
        if self.pend_falling {
            self.pend_falling = false;
            self.capture_sample(SampleEdge::Falling, input.miso);
        }

        match self.state {
            State::Idle => {
                if input.start {
                    self.active_clk_div = self.config.clk_div;
                    self.active_wait = self.config.wait_after_done;
                    self.active_capture = self.config.capture;
                    self.tx.load(input.din);
                    self.divider.reset();
                    self.setup_count = 0;
                    self.state = State::Assert;
                    log::trace!(
                        "transfer armed: tx=0x{:04X} clk_div={} wait={}",
                        input.din,
                        self.active_clk_div,
                        self.active_wait
                    );
                }
            }
            State::Assert => {
                self.setup_count += 1;
                if self.setup_count == SETUP_CYCLES {
                    self.rx.begin();
                    self.edges_done = 0;
                    self.finishing = false;
                    self.state = State::Shift;
                }
            }
            State::Shift => {
                if self.finishing {
                    done = true;
                    rx_done = true;
                    self.hold_count = 0;
                    self.state = State::Hold;
                    log::trace!(
                        "transfer done: rx_a=0x{:04X} rx_b=0x{:04X}",
                        self.rx.word_a(),
                        self.rx.word_b()
                    );
                } else {
                    match self.divider.tick(self.active_clk_div) {
                        Some(SclkEdge::Rising) => {
                            self.edges_done += 1;
                            match self.active_capture {
                                // Single mode samples on the edge itself
                                CaptureMode::Single => self.rx.sample_a(input.miso),
                                CaptureMode::Dual { .. } => self.pend_rising = true,
                            }
                        }
                        Some(SclkEdge::Falling) => {
                            self.tx.advance();
                            if let CaptureMode::Dual { .. } = self.active_capture {
                                self.pend_falling = true;
                            }
                            if self.edges_done == WORD_BITS {
                                self.finishing = true;
                            }
                        }
                        None => {}
                    }
                }
            }
            State::Hold => {
                if self.hold_count == self.active_wait {
                    self.state = State::Idle;
                } else {
                    self.hold_count += 1;
                }
            }
        }

        Outputs {
            sclk: self.divider.level(),
            mosi: self.tx.mosi(),
            cs: self.state == State::Idle,
            done,
            rx_done,
        }
    }
}
