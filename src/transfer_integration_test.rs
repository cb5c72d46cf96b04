//! Integration tests for the full transfer pipeline
//!
//! Drives the controller through the bench harness the way the external
//! verification environment does: pulse start, drive MISO at the agreed
//! cadence, and assert the observable timing of SCLK, CS, MOSI and the
//! completion pulses.

#[cfg(test)]
mod tests {
    use rand::Rng;

    use crate::bench::Bench;
    use crate::config::{CaptureMode, Config, SampleEdge};
    use crate::controller::SETUP_CYCLES;
    use crate::divider::SclkEdge;

    /// Reference configuration from the verification environment:
    /// divisor 10 (half-period 11 cycles), 4-cycle hold
    fn reference_config() -> Config {
        Config::single(10, 4)
    }

    #[test]
    fn test_idle_invariant_before_start() {
        let mut bench = Bench::new(reference_config());
        bench.run(10);
        let out = bench.outputs();
        assert!(out.cs, "chip-select must be inactive before any start");
        assert!(!out.sclk, "serial clock must idle low");
        assert!(!out.done);
    }

    #[test]
    fn test_start_drives_cs_active() {
        let mut bench = Bench::new(reference_config());
        bench.run(2);
        assert!(bench.outputs().cs);

        bench.start_transfer(0x0000);
        bench.run(10);
        assert!(!bench.outputs().cs, "chip-select active after start");
    }

    #[test]
    fn test_sclk_half_period_scaling() {
        for d in [0u32, 1, 3, 7, 15] {
            let mut bench = Bench::new(Config::single(d, 4));
            bench.start_transfer(0x0000);

            let budget = bench.transfer_budget();
            bench.wait_sclk_edge(SclkEdge::Rising, budget).unwrap();
            let half_period = bench.wait_sclk_edge(SclkEdge::Falling, budget).unwrap();
            assert_eq!(half_period, u64::from(d) + 1, "divisor {}", d);

            // And the next half-period matches too
            let half_period = bench.wait_sclk_edge(SclkEdge::Rising, budget).unwrap();
            assert_eq!(half_period, u64::from(d) + 1, "divisor {}", d);
        }
    }

    #[test]
    fn test_done_arrives_within_bound() {
        let mut bench = Bench::new(reference_config());
        bench.start_transfer(0x0000);

        // 16 bits, two half-periods of 11 cycles each, plus the setup
        // delay, the completion settling cycle and the start-accept cycle
        let bound = u64::from(SETUP_CYCLES) + 16 * 2 * 11 + 2;
        let waited = bench.wait_done(bound).unwrap();
        assert_eq!(waited, bound);
    }

    #[test]
    fn test_mosi_bit_sequence_0xdead() {
        let mut bench = Bench::new(reference_config());
        bench.start_transfer(0xDEAD);

        let budget = bench.transfer_budget();
        let mut bits = Vec::new();
        for _ in 0..16 {
            bench.wait_sclk_edge(SclkEdge::Rising, budget).unwrap();
            bits.push(bench.outputs().mosi as u8);
        }
        assert_eq!(bits, [1, 1, 0, 1, 1, 1, 1, 0, 1, 0, 1, 0, 1, 1, 0, 1]);
    }

    #[test]
    fn test_write_spi_random_words() {
        let mut bench = Bench::new(reference_config());
        let mut rng = rand::thread_rng();

        for i in 0..10 {
            let val: u16 = rng.gen();
            let outcome = bench.transfer(val, 0x0000).unwrap();
            assert_eq!(outcome.mosi, val, "iteration {}", i);
        }
    }

    #[test]
    fn test_read_spi_single_random_words() {
        let mut bench = Bench::new(reference_config());
        let mut rng = rand::thread_rng();

        for i in 0..10 {
            let val: u16 = rng.gen();
            let outcome = bench.transfer(0x0000, val).unwrap();
            assert_eq!(outcome.rx, val, "iteration {}", i);
        }
    }

    #[test]
    fn test_read_spi_dual_random_words() {
        let mut bench = Bench::new(Config::dual(10, 4));
        let mut rng = rand::thread_rng();

        for i in 0..10 {
            let a: u16 = rng.gen();
            let b: u16 = rng.gen();
            let outcome = bench.transfer_dual(0x0000, a, b).unwrap();
            assert_eq!(outcome.rx_a, a, "iteration {} channel a", i);
            assert_eq!(outcome.rx_b, b, "iteration {} channel b", i);
        }
    }

    #[test]
    fn test_read_spi_dual_fastest_divisor() {
        // Divisor 0 toggles the serial clock every cycle, so the dual
        // settling window coincides with the next toggle's cycle
        let mut bench = Bench::new(Config::dual(0, 1));
        let mut rng = rand::thread_rng();

        for i in 0..10 {
            let a: u16 = rng.gen();
            let b: u16 = rng.gen();
            let outcome = bench.transfer_dual(0xA5A5, a, b).unwrap();
            assert_eq!(outcome.mosi, 0xA5A5, "iteration {}", i);
            assert_eq!(outcome.rx_a, a, "iteration {} channel a", i);
            assert_eq!(outcome.rx_b, b, "iteration {} channel b", i);
        }
    }

    #[test]
    fn test_dual_first_sample_falling_swaps_channels() {
        let config = Config {
            clk_div: 3,
            wait_after_done: 2,
            capture: CaptureMode::Dual {
                first_sample: SampleEdge::Falling,
            },
        };
        let mut bench = Bench::new(config);

        // The stimulus still presents `a` after rising edges and `b`
        // after falling edges; with falling-first capture the channels
        // land swapped.
        let outcome = bench.transfer_dual(0x0000, 0x1234, 0xABCD).unwrap();
        assert_eq!(outcome.rx_a, 0xABCD);
        assert_eq!(outcome.rx_b, 0x1234);
    }

    #[test]
    fn test_cs_frames_the_whole_transfer() {
        let wait = 4u64;
        let mut bench = Bench::new(Config::single(2, wait as u32));
        bench.start_transfer(0xFFFF);
        bench.tick();
        assert!(!bench.outputs().cs, "cs active from start-accept");

        // Chip-select goes active strictly before the first rising edge
        let budget = bench.transfer_budget();
        bench.wait_sclk_edge(SclkEdge::Rising, budget).unwrap();
        assert!(!bench.outputs().cs);

        // Remaining 15 active edges all inside the frame
        for _ in 0..15 {
            bench.wait_sclk_edge(SclkEdge::Rising, budget).unwrap();
            assert!(!bench.outputs().cs);
        }

        bench.wait_done(budget).unwrap();
        assert!(!bench.outputs().cs, "cs still active on the done cycle");

        // Hold: cs stays active for the configured wait, then releases
        for k in 1..=wait {
            bench.tick();
            assert!(!bench.outputs().cs, "cs released early, hold cycle {}", k);
        }
        bench.tick();
        assert!(bench.outputs().cs, "cs must release after the hold");
        assert!(!bench.outputs().sclk);
    }

    #[test]
    fn test_rx_word_stable_through_hold_and_idle() {
        let mut bench = Bench::new(reference_config());
        let outcome = bench.transfer(0x0000, 0xCAFE).unwrap();
        assert_eq!(outcome.rx, 0xCAFE);

        bench.run(50);
        assert_eq!(bench.master().rx_word(), 0xCAFE);
    }

    #[test]
    fn test_consecutive_transfers_are_independent() {
        let mut bench = Bench::new(Config::single(1, 2));
        let mut rng = rand::thread_rng();

        for i in 0..10 {
            let tx: u16 = rng.gen();
            let rx: u16 = rng.gen();
            let outcome = bench.transfer(tx, rx).unwrap();
            assert_eq!(outcome.mosi, tx, "iteration {}", i);
            assert_eq!(outcome.rx, rx, "iteration {}", i);
            // Return to idle between transfers
            bench.run(5);
            assert!(bench.outputs().cs);
        }
    }

    #[test]
    fn test_back_to_back_transfers() {
        // No idle cycles between calls: each transfer must leave the
        // controller ready to accept the very next start pulse
        let mut bench = Bench::new(Config::single(1, 3));
        let first = bench.transfer(0x1111, 0x2222).unwrap();
        let second = bench.transfer(0x3333, 0x4444).unwrap();
        assert_eq!(first.mosi, 0x1111);
        assert_eq!(first.rx, 0x2222);
        assert_eq!(second.mosi, 0x3333);
        assert_eq!(second.rx, 0x4444);

        let mut bench = Bench::new(Config::dual(2, 2));
        bench.transfer_dual(0x0000, 0x0F0F, 0xF0F0).unwrap();
        let outcome = bench.transfer_dual(0xFFFF, 0xCAFE, 0xBABE).unwrap();
        assert_eq!(outcome.mosi, 0xFFFF);
        assert_eq!(outcome.rx_a, 0xCAFE);
        assert_eq!(outcome.rx_b, 0xBABE);
    }

    #[test]
    fn test_divisor_change_between_transfers() {
        let mut bench = Bench::new(Config::single(0, 0));

        for d in [0u32, 7, 1, 15] {
            bench.master_mut().set_config(Config::single(d, 0));
            bench.run(3);

            bench.start_transfer(0x0000);
            let waited = bench.wait_done(bench.transfer_budget()).unwrap();
            // Start-accept cycle + setup + 32 half-periods + settling cycle
            let expected = 1 + u64::from(SETUP_CYCLES) + 32 * u64::from(d + 1) + 1;
            assert_eq!(waited, expected, "divisor {}", d);
        }
    }

    #[test]
    fn test_sclk_idle_outside_transfers() {
        let mut bench = Bench::new(Config::single(0, 1));
        bench.transfer(0xFFFF, 0xFFFF).unwrap();

        for _ in 0..30 {
            bench.tick();
            if bench.outputs().cs {
                assert!(!bench.outputs().sclk, "sclk must be low while idle");
            }
        }
    }

    #[test]
    fn test_rx_done_coincides_with_done() {
        let mut bench = Bench::new(reference_config());
        bench.start_transfer(0x0000);

        let budget = bench.transfer_budget();
        for _ in 0..budget {
            let out = bench.tick();
            assert_eq!(out.done, out.rx_done);
            if out.done {
                return;
            }
        }
        panic!("no done pulse within {} cycles", budget);
    }
}
