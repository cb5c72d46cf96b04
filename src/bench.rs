//! Simulation harness
//!
//! Owns a [`SpiMaster`] together with its input lines and a main-clock
//! cycle counter, and plays the role of the external driving environment:
//! pulsing start, driving the data-in line at the agreed cadence, and
//! waiting on output edges with a bounded cycle budget. A transfer that
//! fails to complete inside the budget is a [`BenchError::Timeout`], the
//! stuck-controller signal the verification environment watches for.

use std::fmt;

use crate::config::Config;
use crate::controller::{Inputs, Outputs, SpiMaster, SETUP_CYCLES};
use crate::divider::SclkEdge;
use crate::shifter::WORD_BITS;

/// Harness failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BenchError {
    /// An awaited output event did not occur within the cycle budget
    Timeout {
        /// What the harness was waiting for
        waiting_for: &'static str,
        /// Cycles spent waiting
        cycles: u64,
    },
}

impl fmt::Display for BenchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BenchError::Timeout {
                waiting_for,
                cycles,
            } => {
                write!(f, "timed out after {} cycles waiting for {}", cycles, waiting_for)
            }
        }
    }
}

impl std::error::Error for BenchError {}

/// Result of a single-capture transfer driven end to end by the harness.
#[derive(Debug, Clone, Copy)]
pub struct TransferOutcome {
    /// Word reconstructed MSB-first from MOSI at each rising edge
    pub mosi: u16,
    /// Receive register after completion
    pub rx: u16,
}

/// Result of a dual-capture transfer driven end to end by the harness.
#[derive(Debug, Clone, Copy)]
pub struct DualTransferOutcome {
    /// Word reconstructed MSB-first from MOSI at each rising edge
    pub mosi: u16,
    /// Channel-A receive register after completion
    pub rx_a: u16,
    /// Channel-B receive register after completion
    pub rx_b: u16,
}

/// Test bench around one controller instance.
#[derive(Debug, Clone)]
pub struct Bench {
    master: SpiMaster,
    cycle: u64,
    start: bool,
    din: u16,
    miso: bool,
    last: Outputs,
}

impl Bench {
    /// Create a bench with the controller freshly reset
    pub fn new(config: Config) -> Self {
        Self {
            master: SpiMaster::new(config),
            cycle: 0,
            start: false,
            din: 0,
            miso: false,
            last: Outputs {
                sclk: false,
                mosi: false,
                cs: true,
                done: false,
                rx_done: false,
            },
        }
    }

    /// The controller under test
    pub fn master(&self) -> &SpiMaster {
        &self.master
    }

    /// Mutable access, e.g. for mid-run reset or reconfiguration
    pub fn master_mut(&mut self) -> &mut SpiMaster {
        &mut self.master
    }

    /// Main-clock cycles elapsed
    pub fn cycle(&self) -> u64 {
        self.cycle
    }

    /// Outputs produced by the most recent cycle
    pub fn outputs(&self) -> Outputs {
        self.last
    }

    /// Drive the data-in line; the new level is seen by the next cycle
    pub fn set_miso(&mut self, level: bool) {
        self.miso = level;
    }

    /// Arm a transfer: the start line goes high for exactly one cycle
    pub fn start_transfer(&mut self, word: u16) {
        self.din = word;
        self.start = true;
    }

    /// Advance one main-clock cycle
    pub fn tick(&mut self) -> Outputs {
        let out = self.master.step(Inputs {
            start: self.start,
            din: self.din,
            miso: self.miso,
        });
        // Start is a one-cycle pulse; it reads back low afterwards
        self.start = false;
        self.cycle += 1;
        self.last = out;
        out
    }

    /// Advance `n` cycles
    pub fn run(&mut self, n: u64) {
        for _ in 0..n {
            self.tick();
        }
    }

    /// Cycle budget generous enough for one transfer at the current
    /// configuration, with margin for the setup delay and hold.
    pub fn transfer_budget(&self) -> u64 {
        let cfg = self.master.config();
        let shift = 2 * u64::from(WORD_BITS) * u64::from(cfg.clk_div + 1);
        u64::from(SETUP_CYCLES) + shift + u64::from(cfg.wait_after_done) + 16
    }

    /// Tick until the done pulse, or fail after `budget` cycles
    pub fn wait_done(&mut self, budget: u64) -> Result<u64, BenchError> {
        for waited in 1..=budget {
            if self.tick().done {
                return Ok(waited);
            }
        }
        log::warn!("no done pulse within {} cycles", budget);
        Err(BenchError::Timeout {
            waiting_for: "done pulse",
            cycles: budget,
        })
    }

    /// Tick until the serial clock produces the given edge
    pub fn wait_sclk_edge(&mut self, edge: SclkEdge, budget: u64) -> Result<u64, BenchError> {
        let mut prev = self.last.sclk;
        for waited in 1..=budget {
            let out = self.tick();
            let hit = match edge {
                SclkEdge::Rising => out.sclk && !prev,
                SclkEdge::Falling => !out.sclk && prev,
            };
            if hit {
                return Ok(waited);
            }
            prev = out.sclk;
        }
        log::warn!("no serial-clock {:?} edge within {} cycles", edge, budget);
        Err(BenchError::Timeout {
            waiting_for: "serial-clock edge",
            cycles: budget,
        })
    }

    /// Tick out the hold phase until chip-select deasserts, so the next
    /// transfer can be armed immediately
    fn drain_to_idle(&mut self, budget: u64) -> Result<(), BenchError> {
        for _ in 0..budget {
            if self.last.cs {
                return Ok(());
            }
            self.tick();
        }
        log::warn!("chip-select still active after {} cycles", budget);
        Err(BenchError::Timeout {
            waiting_for: "chip-select release",
            cycles: budget,
        })
    }

    /// Run a whole single-capture transfer: shift out `tx` while driving
    /// the data-in line with `miso_word` at the active-edge cadence.
    /// Returns once the controller is back in idle, so calls can be issued
    /// back to back.
    pub fn transfer(&mut self, tx: u16, miso_word: u16) -> Result<TransferOutcome, BenchError> {
        let budget = self.transfer_budget();
        self.start_transfer(tx);

        // Bit 15 must already be on the line when the first rising edge
        // samples it.
        let mut j: u32 = 0;
        self.set_miso(word_bit(miso_word, 0));

        let mut sent = 0u16;
        let mut prev_sclk = self.last.sclk;
        for _ in 0..budget {
            let out = self.tick();
            if out.sclk && !prev_sclk {
                if j < WORD_BITS {
                    sent |= (out.mosi as u16) << (WORD_BITS - 1 - j);
                }
                // Present the next bit for the following rising edge
                j += 1;
                if j < WORD_BITS {
                    self.set_miso(word_bit(miso_word, j));
                }
            }
            prev_sclk = out.sclk;
            if out.done {
                let outcome = TransferOutcome {
                    mosi: sent,
                    rx: self.master.rx_word(),
                };
                self.drain_to_idle(budget)?;
                return Ok(outcome);
            }
        }
        Err(BenchError::Timeout {
            waiting_for: "done pulse",
            cycles: budget,
        })
    }

    /// Run a whole dual-capture transfer: after each rising edge the line
    /// carries the next bit of `a`, after each falling edge the next bit
    /// of `b`, matching the double-rate peripheral contract. Returns once
    /// the controller is back in idle, so calls can be issued back to back.
    pub fn transfer_dual(
        &mut self,
        tx: u16,
        a: u16,
        b: u16,
    ) -> Result<DualTransferOutcome, BenchError> {
        let budget = self.transfer_budget();
        self.start_transfer(tx);

        let mut ja: u32 = 0;
        let mut jb: u32 = 0;
        let mut sent = 0u16;
        let mut prev_sclk = self.last.sclk;
        for _ in 0..budget {
            let out = self.tick();
            if out.sclk && !prev_sclk {
                if ja < WORD_BITS {
                    sent |= (out.mosi as u16) << (WORD_BITS - 1 - ja);
                    self.set_miso(word_bit(a, ja));
                    ja += 1;
                }
            } else if !out.sclk && prev_sclk && jb < WORD_BITS {
                self.set_miso(word_bit(b, jb));
                jb += 1;
            }
            prev_sclk = out.sclk;
            if out.done {
                let outcome = DualTransferOutcome {
                    mosi: sent,
                    rx_a: self.master.rx_word_a(),
                    rx_b: self.master.rx_word_b(),
                };
                self.drain_to_idle(budget)?;
                return Ok(outcome);
            }
        }
        Err(BenchError::Timeout {
            waiting_for: "done pulse",
            cycles: budget,
        })
    }
}

/// Bit `15 - j` of `word`, the bit belonging to sample point `j`
fn word_bit(word: u16, j: u32) -> bool {
    (word >> (WORD_BITS - 1 - j)) & 1 != 0
}
