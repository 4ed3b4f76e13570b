//! # Rust ADE9178 Multiphase Energy Metering IC Driver
//!
//! This is a platform-agnostic Rust driver for the ADE9178 multiphase metrology front
//! end. The ADE9178 is driven through a framed SPI command/response protocol with
//! out-of-band `HOST_RDY`/`HOST_ERR` handshake lines, and can stream raw waveform
//! samples over a secondary UART link.
//!
//! This driver allows you to:
//!
//! - Execute framed, CRC-protected register read/write transactions against the ADE9178
//!   and its up to four downstream ADCs.
//! - Monitor the power-up handshake and classify startup faults.
//! - Convert fixed-point register outputs (RMS, power, power factor, energy, period,
//!   phase angle) into engineering units.
//! - Receive waveform-stream sample blocks and locate the first sample of a given
//!   channel inside the interleaved stream.
//!
//! ## The device
//!
//! The ADE9178 pairs with isolated sigma-delta ADCs of the ADE791x family to form a
//! polyphase energy meter. The host talks to it over SPI using 10-byte command frames;
//! the IC answers once it raises its `HOST_RDY` line, or raises `HOST_ERR` and returns
//! an internal error code instead of register data. A dedicated `IRQ0` line reports
//! reset completion after power-up.
//!
//! ## Usage
//!
//! The board layer supplies the driver with two things: a [`Transport`] implementation
//! wrapping its SPI/UART/CRC primitives, and a reference to a [`Sideband`] instance
//! whose methods are invoked from the `HOST_RDY`, `HOST_ERR`, `IRQ0` and UART-complete
//! interrupt service routines.
//!
//! ```ignore
//! use ade9178::*;
//!
//! static SIDEBAND: Sideband = Sideband::new();
//!
//! // Initialization
//! let mut ade = Ade9178::new(transport, &SIDEBAND);
//! ade.wait_startup(&mut delay, 5)?;
//! ade.start_adc()?;
//!
//! // Burst-read the output block and convert it
//! let mut block = [0i32; OUTPUT_BLOCK_REGISTERS];
//! ade.read_registers(Device::Ade9178, REG_AVRMS, &mut block)?;
//! let (fix, out) = convert::extract_outputs(&block);
//!
//! // Waveform streaming
//! ade.configure_wfs(wfs_config_word)?;
//! ade.start_wfs_receive(&mut samples)?;
//! while !ade.wfs_rx_complete() {}
//! let offset = ade.find_channel_offset(&samples, 2)?;
//! ```
//!
//! In the ISRs, forward the pin events to the shared [`Sideband`]:
//!
//! ```ignore
//! // HOST_RDY edge ISR
//! SIDEBAND.on_host_rdy(pin.is_high());
//! // HOST_ERR edge ISR
//! SIDEBAND.on_host_err(pin.is_high());
//! // IRQ0 ISR
//! SIDEBAND.on_irq0();
//! // Waveform UART receive-complete ISR
//! SIDEBAND.on_wfs_rx_complete();
//! ```
//!

#![no_std]

pub use ade9178::{Ade9178, Sideband};
pub use register::*;
pub use rendezvous::Rendezvous;
pub use transport::{crc16, Transport};

pub mod convert;

mod ade9178;
mod register;
mod rendezvous;
mod transport;
mod wfs;

/// Addressable devices behind the ADE9178 command interface. The ADE9178 forwards
/// commands addressed to a downstream ADC over its own isolated bus.
#[repr(u8)]
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Device {
    /// The metrology IC itself.
    Ade9178 = 0,
    /// First downstream ADC.
    Adc0 = 1,
    /// Second downstream ADC.
    Adc1 = 2,
    /// Third downstream ADC.
    Adc2 = 3,
    /// Fourth downstream ADC.
    Adc3 = 4,
    /// Broadcast to all downstream ADCs.
    AllAdcs = 5,
}

/// Direction of a register transaction. The ADE9178 only supports single-register
/// writes; burst transfers exist for reads only.
#[repr(u8)]
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Opcode {
    Write = 0,
    Read = 1,
}

/// Represents the possible errors.
#[derive(Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error<E> {
    /// The transport failed to start a command transmit or response receive.
    Comm(E),
    /// The device did not signal within the transport's rendezvous timeout.
    NoResponse,
    /// The CRC of the received response frame does not match.
    FrameCrc,
    /// `HOST_RDY` and `HOST_ERR` were asserted simultaneously at startup, which
    /// indicates a wiring or power fault rather than a protocol condition.
    Integrity,
    /// The device raised `HOST_ERR` during the transaction. The payload is the
    /// device's internal error code, not the requested register value.
    DeviceError(i32),
    /// More registers requested than the response buffer can hold.
    InvalidRegisterCount,
    /// The device reported an error during power-up. The payload is the retained
    /// ERROR_STATUS register value, also available later via
    /// [`Ade9178::last_error_status()`].
    StartupError(i32),
    /// Reset is not complete yet; poll again.
    StartupPending,
    /// No `IRQ0` edge has been observed since reset; poll again or reset the IC.
    Irq0NotReceived,
    /// The expected channel rotation never stabilized within the sample buffer.
    NoValidSamples,
    /// A previous waveform receive is still in progress.
    WfsBusy,
    /// Waveform streaming is disabled in the configured WFS register word.
    WfsDisabled,
    /// The transport failed to apply the waveform UART baud rate.
    WfsBaudRate(E),
    /// The transport failed to start the waveform receive.
    WfsComm(E),
}
