mod common;

use ade9178::*;
use common::MockTransport;
use embedded_hal_mock::delay::MockNoop;

fn sent_frame(bytes: &[u8]) -> Command {
    let frame: [u8; CMD_FRAME_BYTES] = bytes.try_into().unwrap();
    Command::decode(&frame).0
}

#[test]
fn simultaneous_rdy_and_err_is_integrity_error() {
    let sideband = Sideband::new();
    let (mock, state) = MockTransport::new(&sideband);
    sideband.on_host_rdy(true);
    sideband.on_host_err(true);
    let mut ade = Ade9178::new(mock, &sideband);
    assert_eq!(ade.check_startup_status(), Err(Error::Integrity));
    // Classified from the pins alone, without touching the bus.
    assert!(state.borrow().sent.is_empty());
}

#[test]
fn reported_startup_error_is_retained() {
    let sideband = Sideband::new();
    let (mock, state) = MockTransport::new(&sideband);
    sideband.on_host_err(true);
    {
        let mut state = state.borrow_mut();
        state.expect_read(&[BITM_STATUS1_ERROR]);
        state.expect_read(&[0x30]);
    }
    let mut ade = Ade9178::new(mock, &sideband);
    assert_eq!(ade.check_startup_status(), Err(Error::StartupError(0x30)));
    assert_eq!(ade.last_error_status(), 0x30);

    let state = state.borrow();
    assert_eq!(state.sent.len(), 2);
    let status1 = sent_frame(&state.sent[0]);
    assert!(status1.read);
    assert_eq!(status1.addr, REG_STATUS1);
    let error_status = sent_frame(&state.sent[1]);
    assert!(error_status.read);
    assert_eq!(error_status.addr, REG_ERROR_STATUS);
    // The error source is retained on the device: reads only, no clearing write.
    assert!(state.sent.iter().all(|f| sent_frame(f).read));
}

#[test]
fn err_pin_without_status_error_bit_is_not_fatal() {
    let sideband = Sideband::new();
    let (mock, state) = MockTransport::new(&sideband);
    sideband.on_host_err(true);
    state.borrow_mut().expect_read(&[0]);
    let mut ade = Ade9178::new(mock, &sideband);
    // STATUS1 carries no error; with IRQ0 still missing the caller just re-polls.
    assert_eq!(ade.check_startup_status(), Err(Error::Irq0NotReceived));
}

#[test]
fn missing_irq0_reports_not_received() {
    let sideband = Sideband::new();
    let (mock, state) = MockTransport::new(&sideband);
    let mut ade = Ade9178::new(mock, &sideband);
    assert_eq!(ade.check_startup_status(), Err(Error::Irq0NotReceived));
    assert!(state.borrow().sent.is_empty());
}

#[test]
fn irq0_without_rstdone_is_pending() {
    let sideband = Sideband::new();
    let (mock, state) = MockTransport::new(&sideband);
    sideband.on_irq0();
    state.borrow_mut().expect_read(&[0]);
    let mut ade = Ade9178::new(mock, &sideband);
    assert_eq!(ade.check_startup_status(), Err(Error::StartupPending));
    // The IRQ0 notification is consumed by the poll.
    assert_eq!(ade.check_startup_status(), Err(Error::Irq0NotReceived));
}

#[test]
fn rstdone_completes_startup_with_one_clearing_write() {
    let sideband = Sideband::new();
    let (mock, state) = MockTransport::new(&sideband);
    sideband.on_irq0();
    {
        let mut state = state.borrow_mut();
        state.expect_read(&[BITM_STATUS0_RSTDONE]);
        state.expect_write(0);
    }
    let mut ade = Ade9178::new(mock, &sideband);
    ade.check_startup_status().unwrap();
    assert!(ade.startup_done());

    let state = state.borrow();
    let writes: Vec<Command> = state
        .sent
        .iter()
        .map(|f| sent_frame(f))
        .filter(|c| !c.read)
        .collect();
    assert_eq!(writes.len(), 1);
    assert_eq!(writes[0].addr, REG_STATUS0);
    assert_eq!(writes[0].data, BITM_STATUS0_RSTDONE);
}

#[test]
fn wait_startup_polls_until_decisive() {
    let sideband = Sideband::new();
    let (mock, state) = MockTransport::new(&sideband);
    sideband.on_irq0();
    state.borrow_mut().expect_read(&[0]);
    let mut ade = Ade9178::new(mock, &sideband);
    let mut delay = MockNoop::new();
    // One pending poll, then IRQ0 never returns: the last poll result comes back.
    assert_eq!(
        ade.wait_startup(&mut delay, 3),
        Err(Error::Irq0NotReceived)
    );
}

#[test]
fn wait_startup_succeeds_once_rstdone_seen() {
    let sideband = Sideband::new();
    let (mock, state) = MockTransport::new(&sideband);
    sideband.on_irq0();
    {
        let mut state = state.borrow_mut();
        state.expect_read(&[BITM_STATUS0_RSTDONE]);
        state.expect_write(0);
    }
    let mut ade = Ade9178::new(mock, &sideband);
    let mut delay = MockNoop::new();
    ade.wait_startup(&mut delay, 5).unwrap();
    assert!(ade.startup_done());
}

#[test]
fn start_adc_runs_startup_check_first() {
    let sideband = Sideband::new();
    let (mock, state) = MockTransport::new(&sideband);
    sideband.on_irq0();
    {
        let mut state = state.borrow_mut();
        state.expect_read(&[BITM_STATUS0_RSTDONE]);
        state.expect_write(0);
        state.expect_write(0);
    }
    let mut ade = Ade9178::new(mock, &sideband);
    ade.start_adc().unwrap();

    let state = state.borrow();
    let control = sent_frame(state.sent.last().unwrap());
    assert!(!control.read);
    assert_eq!(control.addr, REG_ADC_CONTROL);
    assert_eq!(
        control.data,
        BITM_ADC_CONTROL_ADC_INIT | BITM_ADC_CONTROL_ADC_RUN
    );
}

#[test]
fn start_adc_reports_integrity_fault() {
    let sideband = Sideband::new();
    let (mock, _state) = MockTransport::new(&sideband);
    sideband.on_host_rdy(true);
    sideband.on_host_err(true);
    let mut ade = Ade9178::new(mock, &sideband);
    assert_eq!(ade.start_adc(), Err(Error::Integrity));
}
