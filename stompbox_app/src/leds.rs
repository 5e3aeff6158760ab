/// RGB LEDs behind daisy-chained 74HC595 shift registers on SPI.
use embedded_hal::blocking::spi::Write;
use embedded_hal::digital::v2::OutputPin;
use rp2040_hal::gpio::DynPin;

use crate::peripherals::LedSpi;
use stompbox_hmi::{LedColor, LedMode, LedState, Leds};

pub const LED_COUNT: usize = 7;

/// One blink's bookkeeping: when it started and whether a finite count
/// already ran out.
#[derive(Clone, Copy)]
struct Channel {
    state: LedState,
    started_ms: u32,
    exhausted: bool,
}

impl Channel {
    const fn new() -> Channel {
        Channel {
            state: LedState {
                color: LedColor::White,
                mode: LedMode::Off,
            },
            started_ms: 0,
            exhausted: false,
        }
    }
}

pub struct LedDriver {
    spi: LedSpi,
    latch: DynPin,
    channels: [Channel; LED_COUNT],
    now_ms: u32,
    dirty: bool,
    last_frame: [u8; 3],
}

impl LedDriver {
    pub fn new(spi: LedSpi, latch: DynPin) -> LedDriver {
        LedDriver {
            spi,
            latch,
            channels: [Channel::new(); LED_COUNT],
            now_ms: 0,
            dirty: true,
            last_frame: [0; 3],
        }
    }

    /// Recomputes blink phases and shifts a frame out when it changed.
    pub fn refresh(&mut self, now_ms: u32) {
        self.now_ms = now_ms;
        let mut frame = [0u8; 3];
        for (led, channel) in self.channels.iter_mut().enumerate() {
            if channel_lit(channel, now_ms) {
                let (r, g, b) = color_bits(channel.state.color);
                let bit = led * 3;
                if r {
                    set_bit(&mut frame, bit);
                }
                if g {
                    set_bit(&mut frame, bit + 1);
                }
                if b {
                    set_bit(&mut frame, bit + 2);
                }
            }
        }
        if frame != self.last_frame && !self.dirty {
            self.dirty = true;
        }
        if self.dirty {
            self.last_frame = frame;
            self.shift_out();
            self.dirty = false;
        }
    }

    fn shift_out(&mut self) {
        let _ = self.latch.set_low();
        if self.spi.write(&self.last_frame).is_err() {
            defmt::error!("[leds] spi write failed");
        }
        let _ = self.latch.set_high();
    }
}

impl Leds for LedDriver {
    fn set(&mut self, led: u8, state: LedState) {
        let channel = match self.channels.get_mut(led as usize) {
            Some(channel) => channel,
            None => return,
        };
        channel.state = state;
        channel.started_ms = self.now_ms;
        channel.exhausted = false;
        self.dirty = true;
    }
}

fn channel_lit(channel: &mut Channel, now_ms: u32) -> bool {
    match channel.state.mode {
        LedMode::Off => false,
        LedMode::Solid => true,
        LedMode::Blink {
            time_on_ms,
            time_off_ms,
            count,
        } => {
            if channel.exhausted {
                return false;
            }
            let period = time_on_ms as u32 + time_off_ms as u32;
            if period == 0 {
                return true;
            }
            let elapsed = now_ms.wrapping_sub(channel.started_ms);
            if count >= 0 && elapsed / period >= count as u32 {
                channel.exhausted = true;
                return false;
            }
            elapsed % period < time_on_ms as u32
        }
    }
}

fn color_bits(color: LedColor) -> (bool, bool, bool) {
    match color {
        LedColor::White => (true, true, true),
        LedColor::Red => (true, false, false),
        LedColor::Green => (false, true, false),
        LedColor::Blue => (false, false, true),
        LedColor::Yellow => (true, true, false),
        LedColor::Cyan => (false, true, true),
        LedColor::Magenta => (true, false, true),
        // no dedicated channel mix for amber, reuse yellow
        LedColor::Amber => (true, true, false),
    }
}

fn set_bit(frame: &mut [u8; 3], bit: usize) {
    frame[bit / 8] |= 1 << (bit % 8);
}
