//! Register map, command-frame layout and register-word decode for the ADE9178.
//!
//! Only the registers the service itself touches are listed; the full table lives in
//! the ADE9178 datasheet. The metrology output block is read as one burst starting at
//! [`REG_AVRMS`], so output registers are addressed positionally as
//! `address - REG_AVRMS` when extracting groups.

/// Base of the metrology output block: filtered RMS, channel 0 (phase A voltage).
pub const REG_AVRMS: u16 = 0x0480;
/// Total active power, phase A. Power registers interleave WATT/VA per phase.
pub const REG_AWATT: u16 = REG_AVRMS + 84;
/// Total apparent power, phase A.
pub const REG_AVA: u16 = REG_AVRMS + 85;
/// Total active power, phase B.
pub const REG_BWATT: u16 = REG_AVRMS + 86;
/// Total apparent power, phase B.
pub const REG_BVA: u16 = REG_AVRMS + 87;
/// Total active power, phase C.
pub const REG_CWATT: u16 = REG_AVRMS + 88;
/// Total apparent power, phase C.
pub const REG_CVA: u16 = REG_AVRMS + 89;
/// Power factor, phase A. B and C follow.
pub const REG_APF: u16 = REG_AVRMS + 90;
/// First energy accumulator register (positive total active energy, phase A, low
/// half). Eight half-word registers per phase.
pub const REG_APOS_WATTHR_LO: u16 = REG_AVRMS + 93;
/// First angle register (phase A voltage to phase B voltage). Nine angle pairs.
pub const REG_ANGL_AV_BV: u16 = REG_AVRMS + 117;
/// Line period, phase A.
pub const REG_APERIOD: u16 = REG_AVRMS + 126;
/// Line period, phase B.
pub const REG_BPERIOD: u16 = REG_AVRMS + 127;
/// Line period, phase C.
pub const REG_CPERIOD: u16 = REG_AVRMS + 128;
/// Combined line period, last register of the output block.
pub const REG_COM_PERIOD: u16 = REG_AVRMS + 129;
/// Configuration CRC result, last register reachable in a single burst.
pub const REG_CRC_RSLT: u16 = REG_AVRMS + 130;

/// Interrupt status register 0. RSTDONE lives here.
pub const REG_STATUS0: u16 = 0x0600;
/// Interrupt status register 1. The summary ERROR bit lives here.
pub const REG_STATUS1: u16 = 0x0601;
/// Interrupt status register 2.
pub const REG_STATUS2: u16 = 0x0602;
/// Interrupt status register 3.
pub const REG_STATUS3: u16 = 0x0603;
/// Error source register, retained across a reported startup error.
pub const REG_ERROR_STATUS: u16 = 0x0604;
/// Interrupt enable mask for STATUS0.
pub const REG_MASK0: u16 = 0x0605;

/// ADC start/stop control.
pub const REG_ADC_CONTROL: u16 = 0x0001;
/// Waveform stream configuration, decoded by [`WfsConfig`].
pub const REG_WFS_CONFIG: u16 = 0x0013;

/// STATUS0 bit set once the post-reset initialization completes.
pub const BITM_STATUS0_RSTDONE: i32 = 1 << 0;
/// STATUS1 summary bit set while ERROR_STATUS holds a pending error source.
pub const BITM_STATUS1_ERROR: i32 = 1 << 16;
/// ADC_CONTROL bit requesting ADC initialization.
pub const BITM_ADC_CONTROL_ADC_INIT: i32 = 1 << 1;
/// ADC_CONTROL bit starting conversions.
pub const BITM_ADC_CONTROL_ADC_RUN: i32 = 1 << 0;
/// WFS_CONFIG bits selecting streamed channels.
pub const BITM_WFS_CONFIG_CHANNEL_EN: u32 = 0x0007_FF80;

/// Channels the IC can measure and stream, channel ids 0 through 11.
pub const MAX_NUM_CHANNELS: usize = 12;
/// Registers readable in a single burst, bounded by the response buffer.
pub const MAX_BURST_REGISTERS: usize = (REG_CRC_RSLT - REG_AVRMS + 1) as usize;
/// Length of the metrology output block read for extraction and conversion.
pub const OUTPUT_BLOCK_REGISTERS: usize = (REG_COM_PERIOD - REG_AVRMS + 1) as usize;
/// Length of the status block read alongside the output block.
pub const STATUS_BLOCK_REGISTERS: usize = (REG_ERROR_STATUS - REG_STATUS0 + 1) as usize;

/// Size of the CRC trailer on command and response frames.
pub const CRC_BYTES: usize = 2;
/// Size of an encoded command frame, CRC included.
pub const CMD_FRAME_BYTES: usize = 10;

/// One command frame, prior to CRC stamping.
///
/// Wire layout, little-endian:
///
/// | field                 | offset | size |
/// |-----------------------|--------|------|
/// | read flag + device id | 0      | 1 (bit 0 = read, bits 1..7 = device) |
/// | register count        | 1      | 1    |
/// | register address      | 2      | 2    |
/// | write data            | 4      | 4    |
/// | CRC                   | 8      | 2    |
#[derive(Default, Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Command {
    /// `true` for a read transaction.
    pub read: bool,
    /// Device selector, 7 bits on the wire.
    pub device: u8,
    /// Number of registers to transfer. Always 1 for writes.
    pub num_registers: u8,
    /// Register address.
    pub addr: u16,
    /// Value to write; ignored by the device on reads.
    pub data: i32,
}

impl Command {
    /// Encodes the frame with a zeroed CRC field. The CRC is computed over the first
    /// [`CMD_FRAME_BYTES`]` - `[`CRC_BYTES`] bytes and stamped into the trailer before
    /// transmission, never recomputed afterwards.
    pub fn encode(&self) -> [u8; CMD_FRAME_BYTES] {
        let mut bytes = [0; CMD_FRAME_BYTES];
        bytes[0] = (self.read as u8) | (self.device & 0x7F) << 1;
        bytes[1] = self.num_registers;
        bytes[2..4].copy_from_slice(&self.addr.to_le_bytes());
        bytes[4..8].copy_from_slice(&self.data.to_le_bytes());
        bytes
    }

    /// Decodes an encoded frame back into the command and its CRC trailer.
    pub fn decode(bytes: &[u8; CMD_FRAME_BYTES]) -> (Self, u16) {
        let cmd = Self {
            read: bytes[0] & 0x01 != 0,
            device: bytes[0] >> 1,
            num_registers: bytes[1],
            addr: u16::from_le_bytes(bytes[2..4].try_into().unwrap()),
            data: i32::from_le_bytes(bytes[4..8].try_into().unwrap()),
        };
        (cmd, u16::from_le_bytes(bytes[8..10].try_into().unwrap()))
    }
}

/// Waveform stream configuration, the decoded form of the WFS_CONFIG register word.
#[derive(Default, Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct WfsConfig {
    /// Enables waveform streaming on the UART link.
    pub enable: bool,
    /// UART baud rate selection.
    pub baud_rate: WfsBaudRate,
    /// Streamed output type selection.
    pub output_type: u8,
    /// Channel enable mask, one bit per channel id, 12 channels.
    pub channel_select: u16,
    /// Sampling rate selection.
    pub sampling_rate: u8,
}

impl From<u32> for WfsConfig {
    fn from(x: u32) -> Self {
        Self {
            enable: (x & 0x01) != 0,
            baud_rate: WfsBaudRate::from(((x >> 1) & 0x0F) as u8),
            output_type: ((x >> 5) & 0x03) as u8,
            channel_select: ((x >> 7) & 0x0FFF) as u16,
            sampling_rate: ((x >> 19) & 0x07) as u8,
        }
    }
}

impl From<WfsConfig> for u32 {
    fn from(x: WfsConfig) -> Self {
        (x.sampling_rate as u32) << 19
            | (x.channel_select as u32) << 7
            | (x.output_type as u32) << 5
            | (x.baud_rate as u32) << 1
            | (x.enable as u32)
    }
}

/// Represents the possible waveform UART baud rates.
#[repr(u8)]
#[derive(Default, Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum WfsBaudRate {
    #[default]
    Bps256000 = 0x00,
    Bps512000 = 0x01,
    Bps1024000 = 0x02,
    Bps1536000 = 0x03,
    Bps2048000 = 0x04,
    Bps3072000 = 0x05,
}

impl WfsBaudRate {
    /// Returns the baud rate in bits per second.
    pub fn bps(&self) -> u32 {
        match self {
            WfsBaudRate::Bps256000 => 256_000,
            WfsBaudRate::Bps512000 => 512_000,
            WfsBaudRate::Bps1024000 => 1_024_000,
            WfsBaudRate::Bps1536000 => 1_536_000,
            WfsBaudRate::Bps2048000 => 2_048_000,
            WfsBaudRate::Bps3072000 => 3_072_000,
        }
    }
}

impl From<u8> for WfsBaudRate {
    fn from(x: u8) -> Self {
        match x & 0x0F {
            0x00 => WfsBaudRate::Bps256000,
            0x01 => WfsBaudRate::Bps512000,
            0x02 => WfsBaudRate::Bps1024000,
            0x03 => WfsBaudRate::Bps1536000,
            0x04 => WfsBaudRate::Bps2048000,
            _ => WfsBaudRate::Bps3072000,
        }
    }
}
