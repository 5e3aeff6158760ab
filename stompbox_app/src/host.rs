/// UART transport for the host protocol plus the single-flight response
/// slot the UART interrupt completes while `send_and_wait` spins.
use core::cell::RefCell;

use cortex_m::interrupt::{self, Mutex};
use embedded_hal::serial::Write;
use stompbox_hmi::{Host, HostError};

/// How long `send_and_wait` spins before giving up on the host.
pub const HOST_WAIT_TIMEOUT_MS: u32 = 2_000;

struct WaitState {
    armed: bool,
    value: Option<i32>,
}

/// One in-flight response wait at a time. The sending task arms the slot,
/// the UART interrupt completes it, the sender takes the value.
pub struct ResponseSlot {
    state: Mutex<RefCell<WaitState>>,
}

impl ResponseSlot {
    pub const fn new() -> ResponseSlot {
        ResponseSlot {
            state: Mutex::new(RefCell::new(WaitState {
                armed: false,
                value: None,
            })),
        }
    }

    pub fn arm(&self) {
        interrupt::free(|cs| {
            let mut state = self.state.borrow(cs).borrow_mut();
            state.armed = true;
            state.value = None;
        });
    }

    pub fn disarm(&self) {
        interrupt::free(|cs| {
            let mut state = self.state.borrow(cs).borrow_mut();
            state.armed = false;
            state.value = None;
        });
    }

    pub fn is_armed(&self) -> bool {
        interrupt::free(|cs| self.state.borrow(cs).borrow().armed)
    }

    /// Called from the UART interrupt when a `resp` line arrives while a
    /// wait is armed.
    pub fn complete(&self, value: i32) {
        interrupt::free(|cs| {
            let mut state = self.state.borrow(cs).borrow_mut();
            if state.armed {
                state.value = Some(value);
            }
        });
    }

    pub fn try_take(&self) -> Option<i32> {
        interrupt::free(|cs| {
            let mut state = self.state.borrow(cs).borrow_mut();
            let value = state.value.take();
            if value.is_some() {
                state.armed = false;
            }
            value
        })
    }
}

/// Host transport over a UART writer. Lines go out NUL-terminated; replies
/// come back through the shared [`ResponseSlot`] so the interrupt handler
/// never touches the writer.
pub struct UartHost<W> {
    writer: W,
    slot: &'static ResponseSlot,
    now_ms: fn() -> u32,
}

impl<W: Write<u8>> UartHost<W> {
    pub fn new(writer: W, slot: &'static ResponseSlot, now_ms: fn() -> u32) -> UartHost<W> {
        UartHost {
            writer,
            slot,
            now_ms,
        }
    }

    fn write_line(&mut self, line: &str) {
        for byte in line.as_bytes() {
            let _ = nb::block!(self.writer.write(*byte));
        }
        let _ = nb::block!(self.writer.write(0));
        let _ = nb::block!(self.writer.flush());
    }
}

impl<W: Write<u8>> Host for UartHost<W> {
    fn send(&mut self, line: &str) {
        defmt::trace!("[host] send: {}", line);
        self.write_line(line);
    }

    fn send_and_wait(&mut self, line: &str) -> Result<i32, HostError> {
        defmt::trace!("[host] send_and_wait: {}", line);
        self.slot.arm();
        self.write_line(line);
        let deadline = (self.now_ms)().wrapping_add(HOST_WAIT_TIMEOUT_MS);
        loop {
            if let Some(status) = self.slot.try_take() {
                defmt::trace!("[host] response: {}", status);
                return Ok(status);
            }
            if (deadline.wrapping_sub((self.now_ms)()) as i32) < 0 {
                self.slot.disarm();
                defmt::warn!("[host] response timeout");
                return Err(HostError::Timeout);
            }
        }
    }

    fn clear(&mut self) {
        self.slot.disarm();
    }
}
