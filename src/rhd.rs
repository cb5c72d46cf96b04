//! RHD2164 host driver
//!
//! Command-level driver for the Intan RHD2164 biopotential front end, the
//! peripheral this SPI master was built to talk to. The driver bridges to
//! the hardware through the [`SpiTransfer`] seam: anything that can move
//! 16-bit words full-duplex can carry it, including the simulated
//! controller via [`crate::bench::Bench`].
//!
//! Command format (16 bits, MSB-first on the wire):
//!
//! | Bits 15..14 | Command | Remaining bits |
//! |---|---|---|
//! | `00` | CONVERT | channel in bits 13..8 |
//! | `01` | CALIBRATE / CLEAR | magic pattern in bits 13..8 |
//! | `10` | WRITE | register in bits 13..8, value in bits 7..0 |
//! | `11` | READ | register in bits 13..8 |
//!
//! The chip pipelines responses: the word received during command `n` is
//! the result of command `n - 2`.
//!
//! In `double_bits` mode every command bit is doubled (the chip is clocked
//! at half the serial-clock rate) and responses come back with the two
//! MISO streams bit-interleaved; [`unsplit_u16`] separates them.

use std::fmt;

/// RHD2164 register map.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Reg {
    AdcCfg = 0,
    SupplySensAdcBufBias = 1,
    MuxBiasCurr = 2,
    MuxLoadTempSensAuxDigOut = 3,
    AdcOutFmtDspOffRmvl = 4,
    ImpChkCtrl = 5,
    ImpChkDac = 6,
    ImpChkAmpSel = 7,
    AmpBwSel0 = 8,
    AmpBwSel1 = 9,
    AmpBwSel2 = 10,
    AmpBwSel3 = 11,
    AmpBwSel4 = 12,
    AmpBwSel5 = 13,
    IndAmpPwr0 = 14,
    IndAmpPwr1 = 15,
    IndAmpPwr2 = 16,
    IndAmpPwr3 = 17,
    IndAmpPwr4 = 18,
    IndAmpPwr5 = 19,
    IndAmpPwr6 = 20,
    IndAmpPwr7 = 21,
    Intan0 = 40,
    Intan1 = 41,
    Intan2 = 42,
    Intan3 = 43,
    Intan4 = 44,
    MisoAB = 59,
    DieRev = 60,
    UniBiplrAmps = 61,
    NbAmp = 62,
    ChipId = 63,
}

/// Number of amplifier channels reachable per MISO stream
pub const NUM_CHANNELS: usize = 32;

/// CONVERT command words, one per channel, plain encoding
pub const ADC_CH_CMD: [u16; NUM_CHANNELS] = {
    let mut cmds = [0u16; NUM_CHANNELS];
    let mut ch = 0;
    while ch < NUM_CHANNELS {
        cmds[ch] = (ch as u16) << 8;
        ch += 1;
    }
    cmds
};

/// CONVERT command words, one per channel, bit-doubled encoding
pub const ADC_CH_CMD_DOUBLE: [u16; NUM_CHANNELS] = [
    0x000, 0x003, 0x00C, 0x00F, 0x030, 0x033, 0x03C, 0x03F, 0x0C0, 0x0C3, 0x0CC, 0x0CF, 0x0F0,
    0x0F3, 0x0FC, 0x0FF, 0x300, 0x303, 0x30C, 0x30F, 0x330, 0x333, 0x33C, 0x33F, 0x3C0, 0x3C3,
    0x3CC, 0x3CF, 0x3F0, 0x3F3, 0x3FC, 0x3FF,
];

/// CALIBRATE command magic (bits 13..8)
const CALIB_PATTERN: u16 = 0b01010101;
/// CLEAR-calibration command magic (bits 13..8)
const CLEAR_CALIB_PATTERN: u16 = 0b01101010;

/// Register default values written by [`RhdDevice::setup`], registers 0..=21.
/// 1.225 V reference, two's-complement ADC output, 300 Hz upper and 20 Hz
/// lower amplifier bandwidth, all amplifiers powered.
const SETUP_VALUES: [u8; 22] = [
    0b11011110, 0b00100000, 0b00101000, 0b00000010, 0b11000111, 0, 0, 0, 6, 9, 2, 11, 54, 0, 0xFF,
    0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF,
];

/// Duplicate each bit of an 8-bit value into a 16-bit value,
/// e.g. `0b01010011` becomes `0b0011001100001111`.
pub fn duplicate_bits(val: u8) -> u16 {
    let mut out = 0u16;
    for i in 0..8 {
        let bit = u16::from((val >> i) & 1);
        out |= (bit << 1 | bit) << (2 * i);
    }
    out
}

/// Separate DDR-interleaved data `0bxyxy_xyxy_xyxy_xyxy` into
/// `(0bxxxx_xxxx, 0byyyy_yyyy)`.
pub fn unsplit_u16(data: u16) -> (u8, u8) {
    let mut a = 0u8;
    let mut b = 0u8;
    for i in 0..8 {
        a |= (((data >> (2 * i + 1)) & 1) as u8) << i;
        b |= (((data >> (2 * i)) & 1) as u8) << i;
    }
    (a, b)
}

/// Interleave two bytes into `0bxyxy_xyxy_xyxy_xyxy`; inverse of
/// [`unsplit_u16`]. `duplicate_bits(v)` equals `split_u16(v, v)`.
pub fn split_u16(a: u8, b: u8) -> u16 {
    let mut data = 0u16;
    for i in 0..8 {
        data |= u16::from((a >> i) & 1) << (2 * i + 1);
        data |= u16::from((b >> i) & 1) << (2 * i);
    }
    data
}

/// Full-duplex 16-bit word transport, the seam between the driver and
/// whatever carries the SPI transfer.
pub trait SpiTransfer {
    /// Transport failure type
    type Error;

    /// Send `tx` while receiving into `rx`; both slices have equal length
    /// (1 word per command, or 2 in bit-doubled mode).
    fn transfer(&mut self, tx: &[u16], rx: &mut [u16]) -> Result<(), Self::Error>;
}

/// Driver error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RhdError<E> {
    /// The underlying transport failed
    Transport(E),
    /// A setup register write did not read back the value written
    RegisterMismatch {
        /// Register index
        reg: u8,
        /// Value written
        wrote: u8,
        /// Value read back through the command pipeline
        read: u8,
    },
}

impl<E: fmt::Display> fmt::Display for RhdError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RhdError::Transport(e) => write!(f, "SPI transport error: {}", e),
            RhdError::RegisterMismatch { reg, wrote, read } => write!(
                f,
                "register {} readback mismatch: wrote 0x{:02X}, read 0x{:02X}",
                reg, wrote, read
            ),
        }
    }
}

impl<E: fmt::Debug + fmt::Display> std::error::Error for RhdError<E> {}

/// RHD2164 device handle.
///
/// `sample_buf` mirrors the chip's 64 channels as big-endian byte pairs:
/// bytes `2ch..2ch+2` hold channel `ch` (MISO A), bytes `2(ch+32)..` hold
/// channel `ch + 32` (MISO B, bit-doubled mode only).
#[derive(Debug, Clone)]
pub struct RhdDevice<T: SpiTransfer> {
    transport: T,
    /// Bit-doubled (DDR flip-flop) wire strategy
    double_bits: bool,
    tx_buf: [u16; 2],
    rx_buf: [u16; 2],
    sample_buf: [u8; 128],
}

impl<T: SpiTransfer> RhdDevice<T> {
    /// Create a driver over `transport`. `double_bits` selects the DDR
    /// flip-flop wire strategy.
    pub fn new(transport: T, double_bits: bool) -> Self {
        Self {
            transport,
            double_bits,
            tx_buf: [0; 2],
            rx_buf: [0; 2],
            sample_buf: [0; 128],
        }
    }

    /// The transport, e.g. to inspect a simulated controller
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Mutable transport access
    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Raw word received for the most recent command
    pub fn rx_buf(&self) -> [u16; 2] {
        self.rx_buf
    }

    /// Decoded sample buffer, see the type-level docs for layout
    pub fn sample_buf(&self) -> &[u8; 128] {
        &self.sample_buf
    }

    /// Channel sample as assembled in the buffer (MISO A side)
    pub fn sample(&self, ch: usize) -> u16 {
        u16::from(self.sample_buf[2 * ch]) << 8 | u16::from(self.sample_buf[2 * ch + 1])
    }

    fn run_transfer(&mut self) -> Result<(), RhdError<T::Error>> {
        let len = if self.double_bits { 2 } else { 1 };
        let (tx, rx) = (&self.tx_buf[..len], &mut self.rx_buf[..len]);
        self.transport.transfer(tx, rx).map_err(RhdError::Transport)
    }

    /// Send a pre-encoded word. Unlike [`send`], no bit doubling is applied;
    /// in bit-doubled mode `val` must already be doubled and the value word
    /// sent alongside it is zero.
    ///
    /// [`send`]: RhdDevice::send
    pub fn send_raw(&mut self, val: u16) -> Result<(), RhdError<T::Error>> {
        self.tx_buf[0] = val;
        if self.double_bits {
            self.tx_buf[1] = 0;
        }
        self.run_transfer()
    }

    /// Send a command byte pair, doubling bits when the wire strategy
    /// calls for it. `reg` carries the command/register byte, `val` the
    /// value byte.
    pub fn send(&mut self, reg: u16, val: u16) -> Result<(), RhdError<T::Error>> {
        if self.double_bits {
            self.tx_buf[0] = duplicate_bits(reg as u8);
            self.tx_buf[1] = duplicate_bits(val as u8);
        } else {
            self.tx_buf[0] = (reg << 8) | (val & 0xFF);
        }
        self.run_transfer()
    }

    /// Issue a READ command for a register
    pub fn read_reg(&mut self, reg: u8) -> Result<(), RhdError<T::Error>> {
        self.send(u16::from(reg & 0x3F) | 0xC0, 0)
    }

    /// Issue a WRITE command for a register
    pub fn write_reg(&mut self, reg: u8, val: u8) -> Result<(), RhdError<T::Error>> {
        self.send(u16::from(reg & 0x3F) | 0x80, u16::from(val))
    }

    /// Write registers 0..=21 with the driver defaults, verifying each
    /// write through the two-command response pipeline. Returns the first
    /// mismatch, after finishing the whole sequence.
    pub fn setup(&mut self) -> Result<(), RhdError<T::Error>> {
        // Two dummy commands prime the response pipeline
        self.read_reg(Reg::ChipId as u8)?;
        self.read_reg(Reg::ChipId as u8)?;

        let mut first_mismatch = None;
        for (i, &val) in SETUP_VALUES.iter().enumerate() {
            self.write_reg(i as u8, val)?;
            if i < 2 {
                continue;
            }
            // This response belongs to the write issued two commands ago
            let reg = (i - 2) as u8;
            let wrote = SETUP_VALUES[i - 2];
            let read = self.val_from_rx();
            log::debug!("setup reg {}: wrote 0x{:02X}, read 0x{:02X}", reg, wrote, read);
            if read != wrote && first_mismatch.is_none() {
                first_mismatch = Some(RhdError::RegisterMismatch { reg, wrote, read });
            }
        }

        match first_mismatch {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Start the on-chip ADC calibration, then flush its 9-command
    /// settling time with dummy reads
    pub fn calib(&mut self) -> Result<(), RhdError<T::Error>> {
        self.send(CALIB_PATTERN, 0)?;
        for _ in 0..9 {
            self.read_reg(Reg::ChipId as u8)?;
        }
        Ok(())
    }

    /// Cancel a calibration in progress
    pub fn clear_calib(&mut self) -> Result<(), RhdError<T::Error>> {
        self.send(CLEAR_CALIB_PATTERN, 0)
    }

    /// Convert a single channel and decode the response into the sample
    /// buffer. Note the pipelined response: the decoded value belongs to
    /// the conversion started two commands earlier.
    pub fn sample_channel(&mut self, ch: u8) -> Result<(), RhdError<T::Error>> {
        self.send(ADC_CH_CMD[ch as usize] >> 8, 0)?;
        self.samples_from_rx(ch as usize);
        Ok(())
    }

    /// Sequentially convert all 32 channels into the sample buffer,
    /// riding the two-command response pipeline: while channel `n`'s
    /// conversion is in flight, channel `n - 2`'s result is received.
    /// Channel 0's LSB is cleared as a frame-alignment marker; all other
    /// samples carry LSB = 1.
    pub fn sample_all(&mut self) -> Result<(), RhdError<T::Error>> {
        let base: &[u16; NUM_CHANNELS] = if self.double_bits {
            &ADC_CH_CMD_DOUBLE
        } else {
            &ADC_CH_CMD
        };

        // Channel 0 converts from the previous sweep's last command;
        // ask for channel 1 first.
        self.send_raw(base[1])?;

        let mut ch = 0;
        for i in 2..34 {
            let cmd = if i < NUM_CHANNELS { base[i] } else { base[0] };
            self.send_raw(cmd)?;
            // The word just received is channel (i - 2)'s sample
            self.samples_from_rx(ch);
            ch += 1;
        }

        // Alignment marker
        self.sample_buf[1] &= 0xFE;
        Ok(())
    }

    /// Register-value byte carried by the most recent response
    pub fn val_from_rx(&self) -> u8 {
        if self.double_bits {
            let (val, _) = unsplit_u16(self.rx_buf[1]);
            val
        } else {
            (self.rx_buf[0] & 0xFF) as u8
        }
    }

    /// Decode the most recent response as channel `ch`'s sample (and, in
    /// bit-doubled mode, channel `ch + 32`'s from the B stream)
    pub fn samples_from_rx(&mut self, ch: usize) {
        let ch_l = ch * 2;
        let ch_h = (ch + 32) * 2;

        if self.double_bits {
            let (a_hi, b_hi) = unsplit_u16(self.rx_buf[0]);
            let (a_lo, b_lo) = unsplit_u16(self.rx_buf[1]);
            self.sample_buf[ch_l] = a_hi;
            self.sample_buf[ch_l + 1] = a_lo | 1;
            self.sample_buf[ch_h] = b_hi;
            self.sample_buf[ch_h + 1] = b_lo | 1;
        } else {
            self.sample_buf[ch_l] = (self.rx_buf[0] >> 8) as u8;
            self.sample_buf[ch_l + 1] = (self.rx_buf[0] & 0xFF) as u8 | 1;
            self.sample_buf[ch_h] = (self.rx_buf[1] >> 8) as u8;
            self.sample_buf[ch_h + 1] = (self.rx_buf[1] & 0xFF) as u8 | 1;
        }
    }
}
