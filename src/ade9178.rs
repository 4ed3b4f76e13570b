use core::sync::atomic::{AtomicBool, Ordering};

use embedded_hal::blocking::delay::DelayMs;

use super::*;
use crate::wfs::WfsState;

/// Milliseconds between startup polls in [`Ade9178::wait_startup`], sized to the
/// physical power-up time of the IC.
const STARTUP_POLL_MS: u32 = 100;

/// Sideband signal state shared between the driver and the board's interrupt service
/// routines. The board creates one instance per ADE9178 (typically as a `static`),
/// hands a reference to [`Ade9178::new`], and forwards the `HOST_RDY`, `HOST_ERR`,
/// `IRQ0` and waveform-UART-complete interrupts to the `on_*` methods. All methods
/// take `&self` and only touch atomics, so they are safe to call from ISRs while a
/// transaction is suspended in the foreground.
pub struct Sideband {
    host_rdy: AtomicBool,
    host_err: AtomicBool,
    irq0: AtomicBool,
    wfs_rx_done: AtomicBool,
    rendezvous: Rendezvous,
}

impl Sideband {
    pub const fn new() -> Self {
        Self {
            host_rdy: AtomicBool::new(false),
            host_err: AtomicBool::new(false),
            irq0: AtomicBool::new(false),
            // No receive outstanding until one is started.
            wfs_rx_done: AtomicBool::new(true),
            rendezvous: Rendezvous::new(),
        }
    }

    /// Call from the `HOST_RDY` edge ISR. An asserted pin latches the ready flag; a
    /// deasserted pin means the response transfer completed. Either edge resolves a
    /// suspended transaction.
    pub fn on_host_rdy(&self, pin_high: bool) {
        self.rendezvous.resolve();
        if pin_high {
            self.host_rdy.store(true, Ordering::Release);
        }
    }

    /// Call from the `HOST_ERR` edge ISR. Same edge semantics as
    /// [`Self::on_host_rdy`], latching the error flag instead.
    pub fn on_host_err(&self, pin_high: bool) {
        self.rendezvous.resolve();
        if pin_high {
            self.host_err.store(true, Ordering::Release);
        }
    }

    /// Call from the `IRQ0` ISR. Latches the reset-done notification consumed by
    /// [`Ade9178::check_startup_status`].
    pub fn on_irq0(&self) {
        self.irq0.store(true, Ordering::Release);
    }

    /// Call from the waveform UART receive-complete ISR.
    pub fn on_wfs_rx_complete(&self) {
        self.wfs_rx_done.store(true, Ordering::Release);
    }

    pub(crate) fn clear_command_flags(&self) {
        self.host_rdy.store(false, Ordering::Release);
        self.host_err.store(false, Ordering::Release);
    }

    pub(crate) fn host_rdy(&self) -> bool {
        self.host_rdy.load(Ordering::Acquire)
    }

    pub(crate) fn host_err(&self) -> bool {
        self.host_err.load(Ordering::Acquire)
    }

    pub(crate) fn take_irq0(&self) -> bool {
        self.irq0.swap(false, Ordering::AcqRel)
    }

    pub(crate) fn wfs_rx_done(&self) -> bool {
        self.wfs_rx_done.load(Ordering::Acquire)
    }

    pub(crate) fn start_wfs_rx(&self) {
        self.wfs_rx_done.store(false, Ordering::Release);
    }

    pub(crate) fn rendezvous(&self) -> &Rendezvous {
        &self.rendezvous
    }
}

impl Default for Sideband {
    fn default() -> Self {
        Self::new()
    }
}

/// Represents one ADE9178 connection. Owns the transport and the transaction buffers;
/// `&mut self` on every transaction keeps a single command in flight per device.
pub struct Ade9178<'a, T> {
    transport: T,
    sideband: &'a Sideband,
    cmd: Command,
    response: [u8; MAX_BURST_REGISTERS * 4 + CRC_BYTES],
    pub(crate) wfs: WfsState,
    startup_done: bool,
    error_status: i32,
}

impl<'a, T: Transport> Ade9178<'a, T> {
    /// Creates a new [`Ade9178`] instance, given the board transport and the shared
    /// [`Sideband`] wired to the ISRs. The instance is ready for register access once
    /// startup completes, see [`Self::check_startup_status`].
    /// # Arguments
    /// * `transport` - The board primitives implementing the [`Transport`] trait.
    /// * `sideband` - The signal state the board's ISRs report into.
    pub fn new(transport: T, sideband: &'a Sideband) -> Self {
        Self {
            transport,
            sideband,
            cmd: Command::default(),
            response: [0; MAX_BURST_REGISTERS * 4 + CRC_BYTES],
            wfs: WfsState::default(),
            startup_done: false,
            error_status: 0,
        }
    }

    /// Executes one framed command/response transaction and returns the number of
    /// payload words received. The sequence is fixed: clear the sideband flags, send
    /// the CRC-stamped frame, wait for the first sideband edge, start the response
    /// receive, wait for the response-complete edge, verify the response CRC, then
    /// report a device-raised error if `HOST_ERR` fired at any point.
    ///
    /// Failures are never retried here; retry policy belongs to the caller.
    /// # Arguments
    /// * `device` - The addressed [`Device`].
    /// * `addr` - The register address.
    /// * `opcode` - Read or write. Writes always transact exactly one register.
    /// * `num_registers` - Number of registers to read; ignored for writes.
    /// * `data` - The value to write; ignored for reads.
    pub fn send_command(
        &mut self,
        device: Device,
        addr: u16,
        opcode: Opcode,
        num_registers: u8,
        data: i32,
    ) -> Result<usize, Error<T::Error>> {
        let sideband = self.sideband;
        sideband.rendezvous().arm();
        self.send_frame(device, addr, opcode, num_registers, data)?;
        self.transport
            .suspend(sideband.rendezvous())
            .map_err(|_| Error::NoResponse)?;

        // A write, or any transaction the device flagged as failed, answers with a
        // single word.
        let words = if opcode == Opcode::Write || sideband.host_err() {
            1
        } else {
            num_registers as usize
        };
        let num_bytes = words * 4 + CRC_BYTES;
        self.transport
            .receive(&mut self.response[..num_bytes])
            .map_err(Error::Comm)?;
        self.transport
            .suspend(sideband.rendezvous())
            .map_err(|_| Error::NoResponse)?;

        if !self.transport.verify_crc(&self.response[..num_bytes]) {
            return Err(Error::FrameCrc);
        }
        if sideband.host_err() {
            return Err(Error::DeviceError(self.response_word(0)));
        }
        Ok(words)
    }

    /// Reads `values.len()` consecutive registers starting at `addr` in a single
    /// burst.
    /// # Arguments
    /// * `device` - The addressed [`Device`].
    /// * `addr` - The first register address.
    /// * `values` - Receives the register values; at most [`MAX_BURST_REGISTERS`].
    pub fn read_registers(
        &mut self,
        device: Device,
        addr: u16,
        values: &mut [i32],
    ) -> Result<(), Error<T::Error>> {
        if values.len() > MAX_BURST_REGISTERS {
            return Err(Error::InvalidRegisterCount);
        }
        let words = self.send_command(device, addr, Opcode::Read, values.len() as u8, 0)?;
        for (i, value) in values.iter_mut().take(words).enumerate() {
            *value = self.response_word(i);
        }
        Ok(())
    }

    /// Writes a single register and returns the device's acknowledge word. The device
    /// protocol does not support multi-register writes.
    /// # Arguments
    /// * `device` - The addressed [`Device`].
    /// * `addr` - The register address.
    /// * `value` - The value to write.
    pub fn write_register(
        &mut self,
        device: Device,
        addr: u16,
        value: i32,
    ) -> Result<i32, Error<T::Error>> {
        self.send_command(device, addr, Opcode::Write, 1, value)?;
        Ok(self.response_word(0))
    }

    /// Performs one startup poll after a hardware reset pulse, classifying the
    /// sideband state left by power-up:
    ///
    /// - `HOST_RDY` and `HOST_ERR` both latched is a wiring/power fault,
    ///   [`Error::Integrity`].
    /// - `HOST_ERR` alone means the IC reported a boot fault: STATUS1 is read and, if
    ///   its ERROR bit is set, the ERROR_STATUS value is retained (not cleared, so it
    ///   stays inspectable on the device) and returned as [`Error::StartupError`].
    /// - Once `IRQ0` has fired and STATUS0 confirms RSTDONE, the bit is acknowledged
    ///   by writing it back and the startup is latched complete.
    /// - Otherwise the caller should poll again after a short delay,
    ///   [`Error::StartupPending`] / [`Error::Irq0NotReceived`].
    pub fn check_startup_status(&mut self) -> Result<(), Error<T::Error>> {
        let rdy = self.sideband.host_rdy();
        let err = self.sideband.host_err();
        if rdy && err {
            return Err(Error::Integrity);
        }
        if !rdy && err {
            let status1 = self.read_one(Device::Ade9178, REG_STATUS1)?;
            if status1 & BITM_STATUS1_ERROR != 0 {
                let code = self.read_one(Device::Ade9178, REG_ERROR_STATUS)?;
                self.error_status = code;
                return Err(Error::StartupError(code));
            }
        }
        if !self.sideband.take_irq0() {
            return Err(Error::Irq0NotReceived);
        }
        let status0 = self.read_one(Device::Ade9178, REG_STATUS0)?;
        if status0 & BITM_STATUS0_RSTDONE == 0 {
            return Err(Error::StartupPending);
        }
        self.write_register(Device::Ade9178, REG_STATUS0, BITM_STATUS0_RSTDONE)?;
        self.startup_done = true;
        Ok(())
    }

    /// Polls [`Self::check_startup_status`] until it stops reporting a pending state,
    /// waiting 100 ms between attempts. Returns the last poll result once a decisive
    /// state is reached or the attempts are exhausted.
    /// # Arguments
    /// * `delay` - The delay source implementing the [`DelayMs`] trait.
    /// * `attempts` - Maximum number of polls.
    pub fn wait_startup(
        &mut self,
        delay: &mut dyn DelayMs<u32>,
        attempts: u32,
    ) -> Result<(), Error<T::Error>> {
        let mut status = Err(Error::Irq0NotReceived);
        for _ in 0..attempts {
            status = self.check_startup_status();
            match status {
                Err(Error::StartupPending) | Err(Error::Irq0NotReceived) => {
                    delay.delay_ms(STARTUP_POLL_MS)
                }
                _ => break,
            }
        }
        status
    }

    /// Starts the downstream ADCs by setting the INIT and RUN bits of ADC_CONTROL,
    /// running the startup check first if it has not completed yet. Recommended right
    /// after resetting the board.
    pub fn start_adc(&mut self) -> Result<(), Error<T::Error>> {
        if !self.startup_done {
            self.check_startup_status()?;
        }
        self.write_register(
            Device::Ade9178,
            REG_ADC_CONTROL,
            BITM_ADC_CONTROL_ADC_INIT | BITM_ADC_CONTROL_ADC_RUN,
        )?;
        Ok(())
    }

    /// Returns `true` once the startup handshake has completed.
    pub fn startup_done(&self) -> bool {
        self.startup_done
    }

    /// Returns the ERROR_STATUS value retained by the last reported startup error.
    pub fn last_error_status(&self) -> i32 {
        self.error_status
    }

    /// Returns the last command frame handed to the transport, for application-level
    /// diagnostics.
    pub fn last_command(&self) -> &Command {
        &self.cmd
    }

    /// Consumes the driver, invoking the transport's teardown hook.
    pub fn close(mut self) {
        self.transport.close();
    }

    /// Builds, CRC-stamps and transmits the command frame. The sideband flags are
    /// cleared first so the transaction starts from a known pre-state.
    fn send_frame(
        &mut self,
        device: Device,
        addr: u16,
        opcode: Opcode,
        num_registers: u8,
        data: i32,
    ) -> Result<(), Error<T::Error>> {
        self.sideband.clear_command_flags();
        self.cmd = Command {
            read: opcode == Opcode::Read,
            device: device as u8,
            num_registers,
            addr,
            data,
        };
        let mut frame = self.cmd.encode();
        let crc = self.transport.add_crc(&frame[..CMD_FRAME_BYTES - CRC_BYTES]);
        frame[CMD_FRAME_BYTES - CRC_BYTES..].copy_from_slice(&crc.to_le_bytes());
        self.transport.transmit(&frame).map_err(Error::Comm)
    }

    fn read_one(&mut self, device: Device, addr: u16) -> Result<i32, Error<T::Error>> {
        let mut value = [0];
        self.read_registers(device, addr, &mut value)?;
        Ok(value[0])
    }

    pub(crate) fn response_word(&self, index: usize) -> i32 {
        let offset = index * 4;
        i32::from_le_bytes(self.response[offset..offset + 4].try_into().unwrap())
    }

    pub(crate) fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub(crate) fn sideband(&self) -> &Sideband {
        self.sideband
    }
}
