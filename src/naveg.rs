//! Top-level UI state: owns the mode arbiter and the per-mode state
//! machines, and routes every dequeued actuator event to exactly one
//! handler. An active popup intercepts encoder enter/up/down and the
//! footswitches before the underlying mode sees them.
//!
//! All collaborators (display, LEDs, host link, EEPROM) are injected as
//! trait implementations so the whole UI runs on the host during tests.

use crate::actuator::{ActuatorKind, EventMask, InputEvent};
use crate::mode_control::ControlMode;
use crate::mode_navigation::NavigationMode;
use crate::mode_popup::PopupMode;
use crate::mode_tools::{Tool, ToolsMode};
use crate::settings::Settings;
use crate::{
    Eeprom, Host, Leds, OverlayTarget, Screen, ENCODER_BUTTON_IDS, FOOTSWITCH_IDS, SHIFT_BUTTON_ID,
};

/// The currently-active input owner. Builder and Selftest are
/// host-driven service screens; while one of them is active local
/// actuators are ignored apart from the shift button.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mode {
    Control,
    Navigation,
    ToolMenu,
    ToolFoot,
    Builder,
    Shift,
    Selftest,
}

pub struct Hmi<S, L, H, E> {
    pub screen: S,
    pub leds: L,
    pub host: H,
    pub settings: Settings<E>,

    pub controls: ControlMode,
    pub navigation: NavigationMode,
    pub tools: ToolsMode,
    pub popup: PopupMode,

    pub mode: Mode,
    previous_mode: Mode,

    pub connected: bool,
    pub booted: bool,
    /// Advisory outbound-send gate. Actuator events arriving while a
    /// send is in flight are dropped, not deferred.
    pub busy: bool,

    pub now_ms: u32,
    last_host_status: Option<i32>,
}

impl<S: Screen, L: Leds, H: Host, E: Eeprom> Hmi<S, L, H, E> {
    pub fn new(screen: S, leds: L, host: H, eeprom: E) -> Hmi<S, L, H, E> {
        Hmi {
            screen,
            leds,
            host,
            settings: Settings::load(eeprom),
            controls: ControlMode::new(),
            navigation: NavigationMode::new(),
            tools: ToolsMode::new(),
            popup: PopupMode::new(),
            mode: Mode::Control,
            previous_mode: Mode::Control,
            connected: false,
            booted: false,
            busy: false,
            now_ms: 0,
            last_host_status: None,
        }
    }

    /// Routes one dequeued actuator event. Events are dropped while the
    /// protocol link is busy or before the boot handshake completed.
    pub fn handle_input(&mut self, event: InputEvent, now_ms: u32) {
        self.now_ms = now_ms;
        if self.busy || !self.booted {
            return;
        }

        match event.kind {
            ActuatorKind::Encoder => {
                if event.status.contains(EventMask::PRESSED) && self.mode == Mode::ToolMenu {
                    self.tool_menu_encoder_pressed(event.id);
                }
                if event.status.contains(EventMask::CLICKED) {
                    self.encoder_enter(event.id);
                }
                if event.status.contains(EventMask::RELEASED) {
                    self.encoder_released(event.id);
                }
                if event.status.contains(EventMask::HELD) {
                    self.encoder_hold(event.id);
                }
                if event.status.contains(EventMask::TURNED_CW) {
                    self.encoder_down(event.id);
                }
                if event.status.contains(EventMask::TURNED_ACW) {
                    self.encoder_up(event.id);
                }
            }
            ActuatorKind::Button => {
                if FOOTSWITCH_IDS.contains(&event.id) {
                    if event.status.contains(EventMask::HELD) {
                        self.foot_hold(event.id);
                    } else if event.status.contains(EventMask::PRESSED_DOUBLE) {
                        self.foot_double_press(event.id);
                    } else if event.status.contains(EventMask::PRESSED) {
                        self.foot_change(event.id, true);
                    } else if event.status.contains(EventMask::RELEASED) {
                        self.foot_change(event.id, false);
                    }
                } else if ENCODER_BUTTON_IDS.contains(&event.id) {
                    let slot = event.id - ENCODER_BUTTON_IDS.start;
                    if event.status.contains(EventMask::PRESSED) {
                        self.button_pressed(slot);
                    }
                    if event.status.contains(EventMask::RELEASED) {
                        self.button_released(slot);
                    }
                } else if event.id == SHIFT_BUTTON_ID {
                    if event.status.contains(EventMask::PRESSED) {
                        self.shift_pressed();
                    }
                    if event.status.contains(EventMask::RELEASED) {
                        self.shift_released();
                    }
                }
            }
        }
    }

    /// Switches modes, resetting the entered mode's transient cursor
    /// state. Control slot assignments persist across switches.
    pub fn enter_mode(&mut self, mode: Mode) {
        if self.mode == mode {
            return;
        }
        self.previous_mode = self.mode;
        self.mode = mode;
        // a pending overlay redraw would repaint the screen we just left
        self.screen.force_overlay_off(false);
        match mode {
            Mode::Control => self.print_control_screen(),
            Mode::Navigation => self.enter_navigation(),
            Mode::ToolMenu => self.enter_tool_menu(),
            Mode::ToolFoot => self.enter_tool_screen(),
            Mode::Shift => self.enter_shift_overlay(),
            Mode::Builder | Mode::Selftest => self.screen.clear(),
        }
    }

    fn leave_shift(&mut self) {
        let back = match self.previous_mode {
            Mode::Shift => Mode::Control,
            mode => mode,
        };
        self.mode = back;
        match back {
            Mode::Control => self.print_control_screen(),
            Mode::Navigation => self.redraw_navigation(),
            Mode::ToolMenu => self.redraw_tool_menu(),
            Mode::ToolFoot => self.redraw_tool_screen(),
            _ => self.screen.clear(),
        }
    }

    /*
     * per-actuator entry points, popup first, then the active mode
     */

    fn encoder_enter(&mut self, id: u8) {
        if self.popup.active() {
            self.popup_encoder_enter();
            return;
        }
        match self.mode {
            Mode::Control => self.control_encoder_enter(id),
            Mode::Navigation => self.navigation_enter(),
            Mode::ToolMenu => self.tool_menu_enter(),
            Mode::ToolFoot => self.tool_screen_enter(id),
            Mode::Shift => self.shift_item_selected(id),
            Mode::Builder | Mode::Selftest => {}
        }
    }

    fn encoder_hold(&mut self, id: u8) {
        if self.popup.active() {
            return;
        }
        match self.mode {
            Mode::ToolMenu | Mode::ToolFoot => self.enter_mode(Mode::Control),
            Mode::Control if id == 0 => self.enter_mode(Mode::ToolMenu),
            Mode::Navigation => self.launch_save_popup(),
            _ => {}
        }
    }

    fn encoder_released(&mut self, id: u8) {
        if self.popup.active() {
            return;
        }
        if self.mode == Mode::ToolMenu {
            self.tool_menu_encoder_released(id);
        }
    }

    fn encoder_up(&mut self, id: u8) {
        if self.popup.active() {
            self.popup_encoder_up();
            return;
        }
        match self.mode {
            Mode::Control => self.dec_control(id),
            Mode::Navigation => self.navigation_up(),
            Mode::ToolMenu => self.tool_menu_up(id),
            Mode::ToolFoot => self.tool_screen_up(id),
            Mode::Shift | Mode::Builder | Mode::Selftest => {}
        }
    }

    fn encoder_down(&mut self, id: u8) {
        if self.popup.active() {
            self.popup_encoder_down();
            return;
        }
        match self.mode {
            Mode::Control => self.inc_control(id),
            Mode::Navigation => self.navigation_down(),
            Mode::ToolMenu => self.tool_menu_down(id),
            Mode::ToolFoot => self.tool_screen_down(id),
            Mode::Shift | Mode::Builder | Mode::Selftest => {}
        }
    }

    fn foot_change(&mut self, id: u8, pressed: bool) {
        if self.popup.active() {
            if pressed {
                self.popup_foot(id);
            }
            return;
        }
        match self.mode {
            Mode::Control => self.foot_control_change(id, pressed),
            Mode::Navigation => {
                if pressed {
                    self.navigation_foot(id);
                }
            }
            Mode::ToolMenu => {
                if pressed {
                    self.tool_menu_foot(id);
                }
            }
            Mode::ToolFoot => self.tool_screen_foot(id, pressed),
            Mode::Shift => {
                if pressed {
                    self.shift_foot(id);
                }
            }
            Mode::Builder | Mode::Selftest => {}
        }
    }

    fn foot_hold(&mut self, id: u8) {
        if self.popup.active() {
            return;
        }
        if self.mode == Mode::Control && id == 0 {
            // hold on the first footswitch pages through assignments
            self.load_next_foot_page();
        }
    }

    fn foot_double_press(&mut self, _id: u8) {
        if self.popup.active() || self.mode != Mode::Control {
            return;
        }
        self.load_next_foot_page();
    }

    fn button_pressed(&mut self, slot: u8) {
        if self.popup.active() {
            return;
        }
        match self.mode {
            Mode::Control => self.select_encoder_page(slot),
            Mode::ToolMenu => self.tool_menu_sibling(slot),
            Mode::Navigation => self.toggle_navigation_target(),
            _ => {}
        }
    }

    fn button_released(&mut self, _slot: u8) {}

    fn shift_pressed(&mut self) {
        if self.popup.active() {
            return;
        }
        if self.mode != Mode::Shift {
            self.enter_mode(Mode::Shift);
        }
    }

    fn shift_released(&mut self) {
        if self.mode == Mode::Shift {
            self.leave_shift();
        }
    }

    /*
     * shift overlay: three configurable quick actions on the footswitches
     */

    fn enter_shift_overlay(&mut self) {
        self.screen.attention_overlay("shift");
    }

    fn shift_item_selected(&mut self, slot: u8) {
        self.shift_foot(slot);
    }

    fn shift_foot(&mut self, slot: u8) {
        let item = self
            .settings
            .shift_items
            .get(slot as usize)
            .copied()
            .unwrap_or(0);
        match item {
            0 => {
                self.previous_mode = Mode::Control;
                self.mode = Mode::Navigation;
                self.enter_navigation();
            }
            1 => {
                self.previous_mode = Mode::Control;
                self.mode = Mode::ToolFoot;
                self.launch_tool(Tool::Tuner);
            }
            2 => {
                self.previous_mode = Mode::Control;
                self.mode = Mode::ToolFoot;
                self.launch_tool(Tool::Sync);
            }
            _ => {}
        }
    }

    /*
     * host-driven lifecycle
     */

    /// Boot handshake from the host. Until this runs all actuator input
    /// is ignored.
    pub fn boot(&mut self, tuner_mute: bool, profile: u8) {
        self.tools.tuner.mute = tuner_mute;
        self.navigation.profile = profile;
        self.booted = true;
        self.print_control_screen();
    }

    pub fn ui_connection(&mut self, connected: bool) {
        self.connected = connected;
        if connected {
            self.screen.clear();
            self.screen.attention_overlay("web interface connected");
        } else if self.mode == Mode::Control {
            self.print_control_screen();
        }
    }

    /// Host asked for a full redraw after it restarted.
    pub fn restore(&mut self) {
        self.popup.close();
        self.busy = false;
        self.screen.force_overlay_off(false);
        self.screen.clear();
        self.mode = Mode::Control;
        self.previous_mode = Mode::Control;
        self.print_control_screen();
    }

    /// Runs the redraw a timed overlay deferred. Skipped when the user
    /// already navigated away from the target screen.
    pub fn overlay_expired(&mut self, target: OverlayTarget) {
        match target {
            OverlayTarget::Controls => {
                if self.mode == Mode::Control {
                    self.print_control_screen();
                }
            }
            OverlayTarget::Tools => {
                if self.mode == Mode::ToolMenu || self.mode == Mode::ToolFoot {
                    self.redraw_tool_screen();
                }
            }
        }
    }

    pub fn host_response(&mut self, status: i32) {
        self.last_host_status = Some(status);
    }

    pub fn take_host_response(&mut self) -> Option<i32> {
        self.last_host_status.take()
    }
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use crate::control::{Control, Properties};
    use crate::mode_navigation::NameList;
    use crate::mode_popup::PopupView;
    use crate::mode_tools::{MenuPage, SyncState, TunerState};
    use crate::{HostError, LedState, OverlayTarget};
    use std::string::{String, ToString};
    use std::vec::Vec;

    #[derive(Default)]
    pub struct FakeScreen {
        pub cleared: usize,
        pub encoder_labels: [Option<String>; 3],
        pub footers: [(String, String); 3],
        pub overlay_values: Vec<String>,
        pub attention: Vec<String>,
        pub popups_shown: Vec<u8>,
        pub menu_pages: usize,
        pub name_lists: usize,
        pub tuner_draws: usize,
        pub sync_draws: usize,
        pub overlay_timeouts: Vec<(u16, OverlayTarget)>,
        pub forced_off: usize,
    }

    impl Screen for FakeScreen {
        fn clear(&mut self) {
            self.cleared += 1;
        }

        fn encoder(&mut self, slot: u8, control: Option<&Control>) {
            self.encoder_labels[slot as usize] = control.map(|c| c.label.as_str().to_string());
        }

        fn footer(&mut self, slot: u8, name: &str, value: &str, _properties: Properties) {
            self.footers[slot as usize] = (name.to_string(), value.to_string());
        }

        fn page_index(&mut self, _current: u8, _available: u8) {}

        fn encoder_container(&mut self, _page: u8) {}

        fn control_overlay(&mut self, control: &Control) {
            self.overlay_values.push(control.label.as_str().to_string());
        }

        fn menu_page(&mut self, _page: &MenuPage) {
            self.menu_pages += 1;
        }

        fn name_list(&mut self, _list: &NameList) {
            self.name_lists += 1;
        }

        fn popup(&mut self, view: &PopupView) {
            self.popups_shown.push(view.id);
        }

        fn tuner(&mut self, _tuner: &TunerState) {
            self.tuner_draws += 1;
        }

        fn sync(&mut self, _sync: &SyncState) {
            self.sync_draws += 1;
        }

        fn attention_overlay(&mut self, message: &str) {
            self.attention.push(message.to_string());
        }

        fn set_overlay_timeout(&mut self, ms: u16, target: OverlayTarget) {
            self.overlay_timeouts.push((ms, target));
        }

        fn force_overlay_off(&mut self, _run_callback: bool) {
            self.forced_off += 1;
        }
    }

    #[derive(Default)]
    pub struct FakeLeds {
        pub history: Vec<(u8, LedState)>,
    }

    impl FakeLeds {
        pub fn last(&self, led: u8) -> Option<&LedState> {
            self.history
                .iter()
                .rev()
                .find(|(id, _)| *id == led)
                .map(|(_, state)| state)
        }
    }

    impl Leds for FakeLeds {
        fn set(&mut self, led: u8, state: LedState) {
            self.history.push((led, state));
        }
    }

    pub struct FakeHost {
        pub sent: Vec<String>,
        pub reply: Result<i32, HostError>,
        pub cleared: usize,
    }

    impl Default for FakeHost {
        fn default() -> FakeHost {
            FakeHost {
                sent: Vec::new(),
                reply: Ok(0),
                cleared: 0,
            }
        }
    }

    impl Host for FakeHost {
        fn send(&mut self, line: &str) {
            self.sent.push(line.to_string());
        }

        fn send_and_wait(&mut self, line: &str) -> Result<i32, HostError> {
            self.sent.push(line.to_string());
            self.reply
        }

        fn clear(&mut self) {
            self.cleared += 1;
        }
    }

    pub struct FakeEeprom {
        pub bytes: [u8; 64],
    }

    impl Default for FakeEeprom {
        fn default() -> FakeEeprom {
            FakeEeprom { bytes: [0xff; 64] }
        }
    }

    impl Eeprom for FakeEeprom {
        fn read(&mut self, address: u16, buffer: &mut [u8]) {
            let start = address as usize;
            buffer.copy_from_slice(&self.bytes[start..start + buffer.len()]);
        }

        fn write(&mut self, address: u16, data: &[u8]) {
            let start = address as usize;
            self.bytes[start..start + data.len()].copy_from_slice(data);
        }
    }

    pub type TestHmi = Hmi<FakeScreen, FakeLeds, FakeHost, FakeEeprom>;

    /// A booted, connected instance backed by recording fakes.
    pub fn test_hmi() -> TestHmi {
        let mut hmi = Hmi::new(
            FakeScreen::default(),
            FakeLeds::default(),
            FakeHost::default(),
            FakeEeprom::default(),
        );
        hmi.booted = true;
        hmi.connected = true;
        hmi
    }

    fn encoder_event(id: u8, mask: EventMask) -> InputEvent {
        InputEvent {
            kind: ActuatorKind::Encoder,
            id,
            status: mask,
        }
    }

    fn button_event(id: u8, mask: EventMask) -> InputEvent {
        InputEvent {
            kind: ActuatorKind::Button,
            id,
            status: mask,
        }
    }

    fn linear_control(hw_id: u8) -> Control {
        let mut control = Control {
            hw_id,
            label: heapless::String::from("Gain"),
            properties: Properties::NONE,
            unit: heapless::String::from("dB"),
            value: 5.0,
            minimum: 0.0,
            maximum: 10.0,
            step: 0,
            steps: 10,
            scale_points: heapless::Vec::new(),
            scale_point_index: 0,
            scale_points_flags: crate::control::ScalePointFlags(0),
            scroll_dir: 0,
        };
        control.update_step_from_value();
        control
    }

    #[test]
    fn events_before_boot_should_be_ignored() {
        let mut hmi = test_hmi();
        hmi.booted = false;
        hmi.add_control(linear_control(0), true);
        hmi.host.sent.clear();

        hmi.handle_input(encoder_event(0, EventMask::TURNED | EventMask::TURNED_CW), 10);
        assert!(hmi.host.sent.is_empty());
    }

    #[test]
    fn events_while_busy_should_be_dropped() {
        let mut hmi = test_hmi();
        hmi.add_control(linear_control(0), true);
        hmi.host.sent.clear();
        hmi.busy = true;

        hmi.handle_input(encoder_event(0, EventMask::TURNED | EventMask::TURNED_CW), 10);
        assert!(hmi.host.sent.is_empty());
    }

    #[test]
    fn encoder_turn_in_control_mode_should_send_a_control_set() {
        let mut hmi = test_hmi();
        hmi.add_control(linear_control(0), true);
        hmi.host.sent.clear();

        hmi.handle_input(encoder_event(0, EventMask::TURNED | EventMask::TURNED_ACW), 10);
        assert_eq!(1, hmi.host.sent.len());
        assert!(hmi.host.sent[0].starts_with("control_set 0 "));
    }

    #[test]
    fn mode_switch_should_keep_control_assignments() {
        let mut hmi = test_hmi();
        hmi.add_control(linear_control(0), true);

        hmi.enter_mode(Mode::ToolMenu);
        hmi.enter_mode(Mode::Control);
        assert!(hmi.control(0).is_some());
    }

    #[test]
    fn shift_release_should_restore_the_previous_mode() {
        let mut hmi = test_hmi();
        hmi.handle_input(button_event(SHIFT_BUTTON_ID, EventMask::PRESSED), 5);
        assert_eq!(Mode::Shift, hmi.mode);

        hmi.handle_input(button_event(SHIFT_BUTTON_ID, EventMask::RELEASED), 6);
        assert_eq!(Mode::Control, hmi.mode);
    }

    #[test]
    fn active_popup_should_intercept_encoder_enter() {
        let mut hmi = test_hmi();
        hmi.add_control(linear_control(0), true);
        hmi.host.sent.clear();
        hmi.launch_popup_by_id(crate::mode_popup::POPUP_SAVE_SNAPSHOT);

        // enter toggles the keyboard instead of reaching control mode
        hmi.handle_input(encoder_event(0, EventMask::CLICKED), 10);
        assert!(hmi.popup.active());
        assert!(hmi.host.sent.is_empty());
    }

    #[test]
    fn restore_should_reset_modes_but_not_slots() {
        let mut hmi = test_hmi();
        hmi.add_control(linear_control(0), true);
        hmi.enter_mode(Mode::ToolMenu);

        hmi.restore();
        assert_eq!(Mode::Control, hmi.mode);
        assert!(hmi.control(0).is_some());
    }
}
