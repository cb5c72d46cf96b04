//! SPI Master Controller Simulation Core
//!
//! This crate provides a cycle-accurate simulation of an SPI master
//! protocol controller: a clocked state machine that frames a 16-bit word
//! transfer with chip-select, generates a divided serial clock, shifts the
//! word out MSB-first, and captures one (or, in double-rate mode, two) 16-bit
//! receive words. The whole core is a single synchronous domain: one
//! `step()` call per main-clock rising edge, no threads, no callbacks.
//!
//! # Architecture
//!
//! - `divider`: counter-driven serial-clock generator
//! - `shifter`: MSB-first TX shift engine
//! - `capture`: single/dual-channel RX registers
//! - `controller`: the IDLE/ASSERT/SHIFT/HOLD transfer state machine
//! - `bench`: simulation harness driving the controller like a testbench
//! - `rhd`: RHD2164 host driver riding on any word transport
//!
//! # Signal-level boundary
//!
//! | Signal | Direction | Width | Meaning |
//! |---------------|-----|----|--------------------------------------------|
//! | main clock    | in  | 1  | one `step()` call per rising edge          |
//! | reset         | in  | 1  | `reset()` forces idle, aborting transfers  |
//! | clock divisor | in  | N  | serial-clock half-period − 1, in cycles    |
//! | post-done wait| in  | N  | cycles chip-select holds after completion  |
//! | start         | in  | 1  | pulse, accepted only in idle               |
//! | transmit word | in  | 16 | loaded when start is accepted              |
//! | data-in       | in  | 1  | sampled once (or twice) per serial period  |
//! | data-out      | out | 1  | transmit word, MSB-first                   |
//! | serial clock  | out | 1  | idle-low, toggles only while shifting      |
//! | chip-select   | out | 1  | active-low across the whole transfer frame |
//! | transfer-done | out | 1  | one-cycle pulse per completed transfer     |
//! | receive-done  | out | 1  | one-cycle pulse once receive data is valid |
//! | receive words | out | 16/16+16 | captured channel A (and B in dual mode) |

pub mod bench;
pub mod capture;
pub mod config;
pub mod controller;
pub mod divider;
pub mod rhd;
pub mod shifter;

#[cfg(test)]
mod transfer_integration_test;


pub use bench::{Bench, BenchError, DualTransferOutcome, TransferOutcome};
pub use config::{CaptureMode, Config, SampleEdge};
pub use controller::{Inputs, Outputs, SpiMaster, State, SETUP_CYCLES};
pub use divider::{ClockDivider, SclkEdge};
pub use rhd::{RhdDevice, RhdError, SpiTransfer};
