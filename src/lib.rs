#![cfg_attr(not(test), no_std)]

//! Core logic for the stompbox HMI controller: debounced actuator input,
//! the host command protocol, and the control/navigation/tools/popup mode
//! state machines. Everything in this crate is hardware-free and runs on
//! the host for testing; the firmware crate provides the `Screen`, `Leds`,
//! `Host` and `Eeprom` implementations.

pub mod actuator;
pub mod control;
pub mod event_queue;
pub mod mode_control;
pub mod mode_navigation;
pub mod mode_popup;
pub mod mode_tools;
pub mod naveg;
pub mod protocol;
pub mod settings;

use control::{Control, Properties};
use mode_navigation::NameList;
use mode_popup::PopupView;
use mode_tools::{MenuPage, SyncState, TunerState};

pub const ENCODERS_COUNT: usize = 3;
pub const FOOTSWITCHES_COUNT: usize = 3;
pub const ENCODER_BUTTONS_COUNT: usize = 3;
pub const MAX_FOOT_ASSIGNMENTS: usize = FOOTSWITCHES_COUNT;
pub const TOTAL_CONTROL_ACTUATORS: usize = ENCODERS_COUNT + MAX_FOOT_ASSIGNMENTS;
pub const FOOTSWITCH_PAGES_COUNT: usize = 8;
pub const ENCODER_PAGES_COUNT: usize = 3;

/// Actuator ids on the button chain: footswitches 0..2, encoder buttons
/// 3..5, shift button 6.
pub const FOOTSWITCH_IDS: core::ops::Range<u8> = 0..3;
pub const ENCODER_BUTTON_IDS: core::ops::Range<u8> = 3..6;
pub const SHIFT_BUTTON_ID: u8 = 6;

pub const LED_BLINK_INFINITE: i8 = -1;

/// Time the tap tempo LED stays lit within one blink period, in ms.
pub const TAP_TEMPO_TIME_ON: u16 = 100;
pub const TAP_TEMPO_DEFAULT_TIMEOUT_MS: u32 = 3000;
pub const TAP_TEMPO_HYSTERESIS_MS: f32 = 100.0;
pub const TAP_TEMPO_MAX_OVERFLOW_MS: u32 = 50;

pub const ENCODER_LIST_TIMEOUT_MS: u16 = 1200;
pub const FOOT_CONTROLS_TIMEOUT_MS: u16 = 600;

pub const TOGGLED_ON_FOOTER_TEXT: &str = "ON";
pub const TOGGLED_OFF_FOOTER_TEXT: &str = "OFF";
pub const BYPASS_ON_FOOTER_TEXT: &str = "ON";
pub const BYPASS_OFF_FOOTER_TEXT: &str = "OFF";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LedColor {
    White,
    Red,
    Green,
    Blue,
    Yellow,
    Cyan,
    Magenta,
    Amber,
}

pub const TOGGLED_COLOR: LedColor = LedColor::Green;
pub const TRIGGER_COLOR: LedColor = LedColor::Green;
pub const TRIGGER_PRESSED_COLOR: LedColor = LedColor::White;
pub const TAP_TEMPO_COLOR: LedColor = LedColor::Green;
pub const BYPASS_COLOR: LedColor = LedColor::Red;
pub const ENUMERATED_COLOR: LedColor = LedColor::Cyan;
pub const ENUMERATED_PRESSED_COLOR: LedColor = LedColor::White;
pub const ENCODER_PAGE_COLOR: LedColor = LedColor::Blue;

/// Color cycle used for enumerated controls with alternating LED colors.
pub const LED_LIST_COLORS: [LedColor; 7] = [
    LedColor::Red,
    LedColor::Green,
    LedColor::Blue,
    LedColor::Yellow,
    LedColor::Cyan,
    LedColor::Magenta,
    LedColor::Amber,
];

/// Per-footswitch-page indicator colors (page LED).
pub const FS_PAGE_COLORS: [LedColor; FOOTSWITCH_PAGES_COUNT] = [
    LedColor::Red,
    LedColor::Green,
    LedColor::Blue,
    LedColor::Yellow,
    LedColor::Cyan,
    LedColor::Magenta,
    LedColor::White,
    LedColor::Amber,
];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LedMode {
    Off,
    Solid,
    Blink {
        time_on_ms: u16,
        time_off_ms: u16,
        count: i8,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LedState {
    pub color: LedColor,
    pub mode: LedMode,
}

impl LedState {
    pub fn off() -> LedState {
        LedState {
            color: LedColor::White,
            mode: LedMode::Off,
        }
    }

    pub fn solid(color: LedColor) -> LedState {
        LedState {
            color,
            mode: LedMode::Solid,
        }
    }

    pub fn blink(color: LedColor, time_on_ms: u16, time_off_ms: u16, count: i8) -> LedState {
        LedState {
            color,
            mode: LedMode::Blink {
                time_on_ms,
                time_off_ms,
                count,
            },
        }
    }
}

/// Which screen a timed overlay falls back to when it expires.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OverlayTarget {
    Controls,
    Tools,
}

/// Display regions the state machines draw into. Calls are fire-and-forget;
/// the firmware renders them on its own schedule.
pub trait Screen {
    fn clear(&mut self);
    fn encoder(&mut self, slot: u8, control: Option<&Control>);
    fn footer(&mut self, slot: u8, name: &str, value: &str, properties: Properties);
    fn page_index(&mut self, current: u8, available: u8);
    fn encoder_container(&mut self, page: u8);
    fn control_overlay(&mut self, control: &Control);
    fn menu_page(&mut self, page: &MenuPage);
    fn name_list(&mut self, list: &NameList);
    fn popup(&mut self, view: &PopupView);
    fn tuner(&mut self, tuner: &TunerState);
    fn sync(&mut self, sync: &SyncState);
    fn attention_overlay(&mut self, message: &str);
    /// Arms the overlay countdown. When it expires the firmware redraws
    /// the given target screen from a low-priority context.
    fn set_overlay_timeout(&mut self, ms: u16, target: OverlayTarget);
    /// Stops a running overlay early. `run_callback` controls whether the
    /// pending redraw still happens.
    fn force_overlay_off(&mut self, run_callback: bool);
}

pub trait Leds {
    fn set(&mut self, led: u8, state: LedState);
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HostError {
    /// The host did not acknowledge within the transport's bounded wait.
    Timeout,
}

/// Outbound channel to the web GUI host. `send_and_wait` is the
/// single-flight RPC path: at most one wait may be outstanding system-wide,
/// and the returned status code comes from the host's `resp` line.
pub trait Host {
    fn send(&mut self, line: &str);
    fn send_and_wait(&mut self, line: &str) -> Result<i32, HostError>;
    /// Discards any buffered unread responses.
    fn clear(&mut self);
}

pub trait Eeprom {
    fn read(&mut self, address: u16, buffer: &mut [u8]);
    fn write(&mut self, address: u16, data: &[u8]);
}
