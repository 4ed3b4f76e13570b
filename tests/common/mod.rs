#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use ade9178::{crc16, Rendezvous, Sideband, Transport};

/// What the scripted ISR layer does while the engine is suspended.
pub enum SuspendAction {
    /// `HOST_RDY` rises: command accepted, response ready.
    HostRdy,
    /// `HOST_ERR` rises: the device reports a failure.
    HostErr,
    /// The active line falls back: response transfer complete.
    RespComplete,
    /// Nothing happens within the timeout.
    Timeout,
}

/// Shared scripting and capture state, kept behind an `Rc` so tests can inspect
/// traffic after the driver has taken ownership of the transport.
#[derive(Default)]
pub struct MockState {
    pub suspend_script: VecDeque<SuspendAction>,
    pub responses: VecDeque<Vec<u8>>,
    pub sent: Vec<Vec<u8>>,
    pub baud_rates: Vec<u32>,
    pub wfs_receives: Vec<usize>,
    pub corrupt_crc: bool,
    pub fail_transmit: bool,
    pub fail_receive: bool,
}

impl MockState {
    /// Scripts one successful read transaction answering with `words`.
    pub fn expect_read(&mut self, words: &[i32]) {
        self.suspend_script.push_back(SuspendAction::HostRdy);
        self.suspend_script.push_back(SuspendAction::RespComplete);
        self.responses.push_back(to_bytes(words));
    }

    /// Scripts one successful write transaction answering with `ack`.
    pub fn expect_write(&mut self, ack: i32) {
        self.expect_read(&[ack]);
    }

    /// Scripts one transaction the device fails with `error_code`.
    pub fn expect_device_error(&mut self, error_code: i32) {
        self.suspend_script.push_back(SuspendAction::HostErr);
        self.suspend_script.push_back(SuspendAction::RespComplete);
        self.responses.push_back(to_bytes(&[error_code]));
    }
}

fn to_bytes(words: &[i32]) -> Vec<u8> {
    words.iter().flat_map(|w| w.to_le_bytes()).collect()
}

/// Scripted transport. Suspend actions are consumed one per rendezvous wait and
/// replayed into the shared [`Sideband`], the way the board ISRs would; response
/// payloads are consumed one per receive and returned with a valid (or deliberately
/// corrupted) CRC trailer.
pub struct MockTransport<'a> {
    pub sideband: &'a Sideband,
    pub state: Rc<RefCell<MockState>>,
}

impl<'a> MockTransport<'a> {
    pub fn new(sideband: &'a Sideband) -> (Self, Rc<RefCell<MockState>>) {
        let state = Rc::new(RefCell::new(MockState::default()));
        (
            Self {
                sideband,
                state: Rc::clone(&state),
            },
            state,
        )
    }
}

impl Transport for MockTransport<'_> {
    type Error = u8;

    fn transmit(&mut self, bytes: &[u8]) -> Result<(), u8> {
        let mut state = self.state.borrow_mut();
        if state.fail_transmit {
            return Err(1);
        }
        state.sent.push(bytes.to_vec());
        Ok(())
    }

    fn receive(&mut self, buf: &mut [u8]) -> Result<(), u8> {
        let mut state = self.state.borrow_mut();
        if state.fail_receive {
            return Err(2);
        }
        let payload = state
            .responses
            .pop_front()
            .expect("unexpected response receive");
        assert_eq!(
            buf.len(),
            payload.len() + 2,
            "engine requested an unexpected response size"
        );
        buf[..payload.len()].copy_from_slice(&payload);
        let mut crc = crc16(&payload);
        if state.corrupt_crc {
            crc = !crc;
        }
        buf[payload.len()..].copy_from_slice(&crc.to_le_bytes());
        Ok(())
    }

    fn set_baud_rate(&mut self, rate: u32) -> Result<(), u8> {
        self.state.borrow_mut().baud_rates.push(rate);
        Ok(())
    }

    fn wfs_receive(&mut self, buf: &mut [u8]) -> Result<(), u8> {
        self.state.borrow_mut().wfs_receives.push(buf.len());
        Ok(())
    }

    fn add_crc(&mut self, bytes: &[u8]) -> u16 {
        crc16(bytes)
    }

    fn verify_crc(&mut self, frame: &[u8]) -> bool {
        let (payload, trailer) = frame.split_at(frame.len() - 2);
        trailer == crc16(payload).to_le_bytes()
    }

    fn suspend(&mut self, slot: &Rendezvous) -> Result<(), u8> {
        let action = self
            .state
            .borrow_mut()
            .suspend_script
            .pop_front()
            .expect("unexpected suspend");
        match action {
            SuspendAction::HostRdy => self.sideband.on_host_rdy(true),
            SuspendAction::HostErr => self.sideband.on_host_err(true),
            SuspendAction::RespComplete => self.sideband.on_host_rdy(false),
            SuspendAction::Timeout => {
                slot.arm();
                return Err(3);
            }
        }
        assert!(
            !slot.is_pending(),
            "scripted event did not resolve the rendezvous"
        );
        slot.arm();
        Ok(())
    }
}
