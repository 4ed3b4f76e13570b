//! Transport capability trait bridging the driver to the board's SPI, UART and CRC
//! primitives.
//!
//! All data-moving methods are asynchronous-start: they kick off the transfer and
//! return, and completion reaches the driver through the [`Sideband`](crate::Sideband)
//! callbacks invoked from the corresponding ISRs. A blocking implementation that
//! finishes the transfer before returning satisfies the same contract, as long as the
//! matching sideband event has fired by the time [`Transport::suspend`] is entered.

use crc::{Crc, CRC_16_IBM_3740};

use crate::Rendezvous;

const CRC16: Crc<u16> = Crc::<u16>::new(&CRC_16_IBM_3740);

/// Computes the CRC-16/CCITT-FALSE of a frame body, the checksum the ADE9178 applies
/// to command and response frames. Offered to [`Transport`] implementations that have
/// no hardware CRC unit.
pub fn crc16(bytes: &[u8]) -> u16 {
    CRC16.checksum(bytes)
}

/// Board-supplied primitives consumed by the driver. The driver depends only on this
/// trait, never on concrete hardware interfaces.
pub trait Transport {
    /// The error type returned by the underlying peripherals.
    type Error: core::fmt::Debug;

    /// Starts transmitting a command frame on the SPI link.
    fn transmit(&mut self, bytes: &[u8]) -> Result<(), Self::Error>;

    /// Starts receiving a response frame on the SPI link. The buffer must stay valid
    /// until the response-complete sideband event fires.
    fn receive(&mut self, buf: &mut [u8]) -> Result<(), Self::Error>;

    /// Applies a baud rate to the waveform-stream UART.
    fn set_baud_rate(&mut self, rate: u32) -> Result<(), Self::Error>;

    /// Starts receiving waveform-stream bytes on the UART. The buffer must stay valid
    /// until [`Sideband::on_wfs_rx_complete`](crate::Sideband::on_wfs_rx_complete)
    /// fires.
    fn wfs_receive(&mut self, buf: &mut [u8]) -> Result<(), Self::Error>;

    /// Returns the CRC of a frame body, to be appended to the outgoing frame.
    /// [`crc16`] matches the checksum the device computes.
    fn add_crc(&mut self, bytes: &[u8]) -> u16;

    /// Verifies a received frame, `frame` being the payload followed by its 2-byte
    /// little-endian CRC trailer. The driver always verifies responses; there is no
    /// way to opt out at runtime.
    fn verify_crc(&mut self, frame: &[u8]) -> bool;

    /// Blocks the calling context until `slot` resolves or an implementation-defined
    /// timeout elapses, returning `Err` on timeout. A no-OS build typically spins on
    /// [`Rendezvous::is_pending`] with a bounded iteration count; an RTOS build pends
    /// on a semaphore given from the same ISRs that resolve the slot. On return the
    /// slot must be left armed again for the next wait:
    ///
    /// ```ignore
    /// fn suspend(&mut self, slot: &Rendezvous) -> Result<(), Self::Error> {
    ///     let mut waited = 0;
    ///     while slot.is_pending() && waited < TIMEOUT_COUNT {
    ///         waited += 1;
    ///     }
    ///     let timed_out = waited == TIMEOUT_COUNT;
    ///     slot.arm();
    ///     if timed_out { Err(Timeout) } else { Ok(()) }
    /// }
    /// ```
    fn suspend(&mut self, slot: &Rendezvous) -> Result<(), Self::Error>;

    /// Teardown hook, called once from [`Ade9178::close`](crate::Ade9178::close).
    fn close(&mut self) {}
}
