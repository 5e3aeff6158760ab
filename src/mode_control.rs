//! Control binding layer: owns the per-actuator assignment slots the
//! host populates through `control_add`, converts encoder turns and
//! footswitch presses into value changes, and mirrors every local
//! change back to the host as a `control_set` line.
//!
//! Slots are owned values; installing a new assignment replaces the
//! occupant atomically and the displaced control is simply dropped.

use core::fmt::Write;

use heapless::String;

use crate::control::{convert_from_ms, convert_to_ms, Control, Properties, ScalePointFlags};
use crate::naveg::Hmi;
use crate::protocol::{cmd, PAGINATION_PAGE_UP, PAGINATION_WRAP_AROUND};
use crate::{
    Eeprom, Host, LedState, Leds, OverlayTarget, Screen, BYPASS_COLOR, BYPASS_OFF_FOOTER_TEXT,
    BYPASS_ON_FOOTER_TEXT, ENCODERS_COUNT, ENCODER_LIST_TIMEOUT_MS, ENCODER_PAGES_COUNT,
    ENCODER_PAGE_COLOR, ENUMERATED_COLOR, ENUMERATED_PRESSED_COLOR, FOOTSWITCH_PAGES_COUNT,
    FOOT_CONTROLS_TIMEOUT_MS, LED_BLINK_INFINITE, LED_LIST_COLORS, MAX_FOOT_ASSIGNMENTS,
    TAP_TEMPO_COLOR, TAP_TEMPO_DEFAULT_TIMEOUT_MS, TAP_TEMPO_HYSTERESIS_MS,
    TAP_TEMPO_MAX_OVERFLOW_MS, TAP_TEMPO_TIME_ON, TOGGLED_COLOR, TOGGLED_OFF_FOOTER_TEXT,
    TOGGLED_ON_FOOTER_TEXT, TRIGGER_COLOR, TRIGGER_PRESSED_COLOR,
};

/// Encoders answer to hw_ids 0..3, footswitches to 3..6.
const FOOT_HW_ID_OFFSET: u8 = ENCODERS_COUNT as u8;

/// Paginated lists ask the host for the next window a few steps before
/// the edge so scrolling does not stall at the boundary.
const PAGINATION_TOP_MARGIN: u16 = 3;
const PAGINATION_BOTTOM_MARGIN: u16 = 2;

const FOOTER_VALUE_SIZE: usize = 24;

#[derive(Clone, Copy, Default)]
pub struct TapTempo {
    pub last_ms: u32,
    pub max_ms: u32,
    pub counting: bool,
}

pub struct ControlMode {
    pub encoders: [Option<Control>; ENCODERS_COUNT],
    pub foots: [Option<Control>; MAX_FOOT_ASSIGNMENTS],
    pub tap_tempo: [TapTempo; MAX_FOOT_ASSIGNMENTS],
    pub current_foot_page: u8,
    pub current_encoder_page: u8,
    pub pages_available: [bool; FOOTSWITCH_PAGES_COUNT],
}

impl ControlMode {
    pub fn new() -> ControlMode {
        ControlMode {
            encoders: [None, None, None],
            foots: [None, None, None],
            tap_tempo: [TapTempo::default(); MAX_FOOT_ASSIGNMENTS],
            current_foot_page: 0,
            current_encoder_page: 0,
            pages_available: [true, false, false, false, false, false, false, false],
        }
    }
}

impl Default for ControlMode {
    fn default() -> Self {
        ControlMode::new()
    }
}

fn encoder_slot(hw_id: u8) -> Option<usize> {
    (hw_id < FOOT_HW_ID_OFFSET).then(|| hw_id as usize)
}

fn foot_slot(hw_id: u8) -> Option<usize> {
    let slot = hw_id.checked_sub(FOOT_HW_ID_OFFSET)? as usize;
    (slot < MAX_FOOT_ASSIGNMENTS).then_some(slot)
}

/// LED ids: footswitch LEDs first, then the encoder page button LEDs.
fn foot_led(slot: usize) -> u8 {
    slot as u8
}

fn page_button_led(slot: usize) -> u8 {
    (MAX_FOOT_ASSIGNMENTS + slot) as u8
}

fn footer_value(control: &Control) -> String<FOOTER_VALUE_SIZE> {
    let mut out = String::new();
    if control.is(Properties::TRIGGER) {
        let _ = out.push_str(BYPASS_ON_FOOTER_TEXT);
    } else if control.is(Properties::BYPASS) {
        // bypass is wired inverted, zero means the effect is audible
        let _ = out.push_str(if control.value <= 0.0 {
            BYPASS_ON_FOOTER_TEXT
        } else {
            BYPASS_OFF_FOOTER_TEXT
        });
    } else if control.is(Properties::TOGGLED) || control.is(Properties::MOMENTARY) {
        let _ = out.push_str(if control.value > 0.0 {
            TOGGLED_ON_FOOTER_TEXT
        } else {
            TOGGLED_OFF_FOOTER_TEXT
        });
    } else if control.is(Properties::TAP_TEMPO) {
        // ms and bpm read naturally without decimals
        if control.unit.eq_ignore_ascii_case("ms") || control.unit.eq_ignore_ascii_case("bpm") {
            let _ = write!(out, "{:.0} {}", control.value, control.unit);
        } else {
            let _ = write!(out, "{:.2} {}", control.value, control.unit);
        }
    } else if let Some(point) = control.current_scale_point() {
        let _ = out.push_str(&point.label);
    } else {
        let _ = write!(out, "{:.2} {}", control.value, control.unit);
    }
    out
}

fn foot_led_state(control: &Control, pressed: bool) -> LedState {
    if control.is(Properties::TRIGGER) || control.is(Properties::MOMENTARY) {
        LedState::solid(if pressed {
            TRIGGER_PRESSED_COLOR
        } else {
            TRIGGER_COLOR
        })
    } else if control.is(Properties::BYPASS) {
        if control.value <= 0.0 {
            LedState::solid(BYPASS_COLOR)
        } else {
            LedState::off()
        }
    } else if control.is(Properties::TOGGLED) {
        if control.value > 0.0 {
            LedState::solid(TOGGLED_COLOR)
        } else {
            LedState::off()
        }
    } else if control.is(Properties::TAP_TEMPO) {
        let time_ms = convert_to_ms(&control.unit, control.value) as u16;
        let time_on = if time_ms > 2 * TAP_TEMPO_TIME_ON {
            TAP_TEMPO_TIME_ON
        } else {
            time_ms / 2
        };
        LedState::blink(
            TAP_TEMPO_COLOR,
            time_on,
            time_ms.saturating_sub(time_on),
            LED_BLINK_INFINITE,
        )
    } else if control.is_enumerated() {
        if pressed {
            LedState::solid(ENUMERATED_PRESSED_COLOR)
        } else if control
            .scale_points_flags
            .intersects(ScalePointFlags::ALT_LED_COLOR)
        {
            LedState::solid(LED_LIST_COLORS[control.scale_point_index as usize % LED_LIST_COLORS.len()])
        } else {
            LedState::solid(ENUMERATED_COLOR)
        }
    } else {
        LedState::off()
    }
}

impl<S: Screen, L: Leds, H: Host, E: Eeprom> Hmi<S, L, H, E> {
    /// Installs a host-supplied assignment into its slot, replacing any
    /// previous occupant.
    pub fn add_control(&mut self, mut control: Control, from_protocol: bool) {
        control.update_step_from_value();

        if let Some(slot) = encoder_slot(control.hw_id) {
            self.screen.encoder(slot as u8, Some(&control));
            self.controls.encoders[slot] = Some(control);
        } else if let Some(slot) = foot_slot(control.hw_id) {
            if control.is(Properties::TAP_TEMPO) {
                let max_ms = match control.unit.as_str() {
                    unit if unit.eq_ignore_ascii_case("ms") || unit.eq_ignore_ascii_case("s") => {
                        convert_to_ms(unit, control.maximum)
                    }
                    unit => convert_to_ms(unit, control.minimum),
                };
                let max_ms = (max_ms as u32).min(TAP_TEMPO_DEFAULT_TIMEOUT_MS);
                self.controls.tap_tempo[slot] = TapTempo {
                    last_ms: 0,
                    max_ms,
                    counting: false,
                };
            }
            self.draw_foot(slot, &control, false);
            self.controls.foots[slot] = Some(control);
        } else if !from_protocol {
            self.screen.attention_overlay("unknown actuator");
        }
    }

    pub fn remove_control(&mut self, hw_id: u8) {
        if let Some(slot) = encoder_slot(hw_id) {
            if self.controls.encoders[slot].take().is_some() {
                self.screen.encoder(slot as u8, None);
            }
        } else if let Some(slot) = foot_slot(hw_id) {
            if self.controls.foots[slot].take().is_some() {
                self.leds.set(foot_led(slot), LedState::off());
                self.screen
                    .footer(slot as u8, "", "", Properties::NONE);
            }
        }
    }

    pub fn control(&self, hw_id: u8) -> Option<&Control> {
        if let Some(slot) = encoder_slot(hw_id) {
            self.controls.encoders[slot].as_ref()
        } else if let Some(slot) = foot_slot(hw_id) {
            self.controls.foots[slot].as_ref()
        } else {
            None
        }
    }

    pub fn control_value(&self, hw_id: u8) -> f32 {
        self.control(hw_id).map(|c| c.value).unwrap_or(0.0)
    }

    pub fn rename_control(&mut self, hw_id: u8, name: &str) -> bool {
        let Some(slot_control) = self.take_by_hw_id(hw_id) else {
            return false;
        };
        let (slot_is_encoder, slot, mut control) = slot_control;
        control.label.clear();
        for c in name.chars() {
            if control.label.push(c).is_err() {
                break;
            }
        }
        self.redraw_slot(slot_is_encoder, slot, &control);
        self.put_back(slot_is_encoder, slot, control);
        true
    }

    pub fn set_control_unit(&mut self, hw_id: u8, unit: &str) -> bool {
        let Some(slot_control) = self.take_by_hw_id(hw_id) else {
            return false;
        };
        let (slot_is_encoder, slot, mut control) = slot_control;
        control.unit.clear();
        for c in unit.chars() {
            if control.unit.push(c).is_err() {
                break;
            }
        }
        self.redraw_slot(slot_is_encoder, slot, &control);
        self.put_back(slot_is_encoder, slot, control);
        true
    }

    /// Host-initiated value change. Updates the slot and the display but
    /// never echoes a `control_set` back.
    pub fn set_control_value(&mut self, hw_id: u8, value: f32) {
        let Some((slot_is_encoder, slot, mut control)) = self.take_by_hw_id(hw_id) else {
            return;
        };
        control.value = value.clamp(control.minimum, control.maximum);
        control.update_step_from_value();
        self.redraw_slot(slot_is_encoder, slot, &control);
        self.put_back(slot_is_encoder, slot, control);
    }

    fn take_by_hw_id(&mut self, hw_id: u8) -> Option<(bool, usize, Control)> {
        if let Some(slot) = encoder_slot(hw_id) {
            self.controls.encoders[slot].take().map(|c| (true, slot, c))
        } else if let Some(slot) = foot_slot(hw_id) {
            self.controls.foots[slot].take().map(|c| (false, slot, c))
        } else {
            None
        }
    }

    fn put_back(&mut self, slot_is_encoder: bool, slot: usize, control: Control) {
        if slot_is_encoder {
            self.controls.encoders[slot] = Some(control);
        } else {
            self.controls.foots[slot] = Some(control);
        }
    }

    fn redraw_slot(&mut self, slot_is_encoder: bool, slot: usize, control: &Control) {
        if slot_is_encoder {
            self.screen.encoder(slot as u8, Some(control));
        } else {
            self.draw_foot(slot, control, false);
        }
    }

    fn draw_foot(&mut self, slot: usize, control: &Control, pressed: bool) {
        self.leds
            .set(foot_led(slot), foot_led_state(control, pressed));
        let value = footer_value(control);
        self.screen
            .footer(slot as u8, &control.label, &value, control.properties);
    }

    /*
     * encoder turns
     */

    pub fn inc_control(&mut self, encoder: u8) {
        let slot = encoder as usize;
        if slot >= ENCODERS_COUNT {
            return;
        }
        let Some(mut control) = self.controls.encoders[slot].take() else {
            return;
        };

        if control.is_enumerated()
            && control
                .scale_points_flags
                .intersects(ScalePointFlags::PAGINATED)
        {
            let near_edge = control.step + PAGINATION_TOP_MARGIN >= control.steps;
            let end_page = control
                .scale_points_flags
                .intersects(ScalePointFlags::END_PAGE);
            let wrap = control
                .scale_points_flags
                .intersects(ScalePointFlags::WRAP_AROUND);
            if near_edge && !end_page {
                let hw_id = control.hw_id;
                self.controls.encoders[slot] = Some(control);
                self.request_control_page(hw_id, true, false);
                return;
            }
            if end_page && wrap && control.step + 1 >= control.steps {
                let hw_id = control.hw_id;
                self.controls.encoders[slot] = Some(control);
                self.request_control_page(hw_id, true, true);
                return;
            }
        }

        if control.step + 1 >= control.steps && control.is_enumerated() {
            self.controls.encoders[slot] = Some(control);
            return;
        }
        if !control.is_enumerated() && control.step >= control.steps {
            self.controls.encoders[slot] = Some(control);
            return;
        }

        control.step += 1;
        control.update_value_from_step();
        self.apply_encoder_change(slot, control);
    }

    pub fn dec_control(&mut self, encoder: u8) {
        let slot = encoder as usize;
        if slot >= ENCODERS_COUNT {
            return;
        }
        let Some(mut control) = self.controls.encoders[slot].take() else {
            return;
        };

        if control.is_enumerated()
            && control
                .scale_points_flags
                .intersects(ScalePointFlags::PAGINATED)
            && control.step <= PAGINATION_BOTTOM_MARGIN
            && control.scale_point_index > control.step
        {
            let hw_id = control.hw_id;
            self.controls.encoders[slot] = Some(control);
            self.request_control_page(hw_id, false, false);
            return;
        }

        if control.step == 0 {
            self.controls.encoders[slot] = Some(control);
            return;
        }

        control.step -= 1;
        control.update_value_from_step();
        self.apply_encoder_change(slot, control);
    }

    fn apply_encoder_change(&mut self, slot: usize, control: Control) {
        self.send_control_set(control.hw_id, control.value);
        self.screen.encoder(slot as u8, Some(&control));
        if control.is_enumerated() {
            self.screen.control_overlay(&control);
            self.screen
                .set_overlay_timeout(ENCODER_LIST_TIMEOUT_MS, OverlayTarget::Controls);
        }
        self.controls.encoders[slot] = Some(control);
    }

    /// Encoder click: enumerated assignments get their list overlay, the
    /// rest have no click action.
    pub fn control_encoder_enter(&mut self, encoder: u8) {
        let slot = encoder as usize;
        if slot >= ENCODERS_COUNT {
            return;
        }
        let Some(control) = self.controls.encoders[slot].as_ref() else {
            return;
        };
        if control.is_enumerated() {
            let control = self.controls.encoders[slot].take();
            if let Some(control) = control {
                self.screen.control_overlay(&control);
                self.screen
                    .set_overlay_timeout(ENCODER_LIST_TIMEOUT_MS, OverlayTarget::Controls);
                self.controls.encoders[slot] = Some(control);
            }
        }
    }

    /*
     * footswitch presses
     */

    pub fn foot_control_change(&mut self, foot: u8, pressed: bool) {
        let slot = foot as usize;
        if slot >= MAX_FOOT_ASSIGNMENTS {
            return;
        }
        let Some(mut control) = self.controls.foots[slot].take() else {
            return;
        };

        if !pressed {
            // release only restores the LED, except momentary which also
            // reports its released state
            if control.is(Properties::MOMENTARY) {
                control.value = if control.value > 0.0 { 0.0 } else { 1.0 };
                self.send_control_set(control.hw_id, control.value);
            }
            self.draw_foot(slot, &control, false);
            self.controls.foots[slot] = Some(control);
            return;
        }

        if control.is(Properties::TRIGGER) {
            control.value = control.maximum;
            self.send_control_set(control.hw_id, control.value);
            self.draw_foot(slot, &control, true);
        } else if control.is(Properties::MOMENTARY) {
            control.value = if control.value > 0.0 { 0.0 } else { 1.0 };
            self.send_control_set(control.hw_id, control.value);
            self.draw_foot(slot, &control, true);
        } else if control.is(Properties::TAP_TEMPO) {
            self.tap_tempo_press(slot, &mut control);
        } else if control.is(Properties::TOGGLED) || control.is(Properties::BYPASS) {
            control.value = if control.value > 0.0 {
                control.minimum
            } else {
                control.maximum
            };
            control.update_step_from_value();
            self.send_control_set(control.hw_id, control.value);
            self.draw_foot(slot, &control, false);
        } else if control.is_enumerated() {
            if self.advance_scale_point(slot, &mut control) {
                control.update_step_from_value();
                self.send_control_set(control.hw_id, control.value);
                self.draw_foot(slot, &control, true);
            }
        }

        self.screen
            .set_overlay_timeout(FOOT_CONTROLS_TIMEOUT_MS, OverlayTarget::Controls);
        self.controls.foots[slot] = Some(control);
    }

    /// Moves an enumerated foot assignment to its next scale point,
    /// honoring wrap-around and pagination. Returns false when the only
    /// action taken was a page request (or nothing).
    fn advance_scale_point(&mut self, _slot: usize, control: &mut Control) -> bool {
        let last = control.scale_points.len().saturating_sub(1);
        let at_end = control.scale_point_index as usize >= last;
        let paginated = control
            .scale_points_flags
            .intersects(ScalePointFlags::PAGINATED);
        let end_page = control
            .scale_points_flags
            .intersects(ScalePointFlags::END_PAGE);
        let wrap = control
            .scale_points_flags
            .intersects(ScalePointFlags::WRAP_AROUND);

        if at_end {
            if paginated && !end_page {
                self.request_control_page(control.hw_id, true, false);
                return false;
            }
            if paginated && end_page && wrap {
                self.request_control_page(control.hw_id, true, true);
                return false;
            }
            if wrap && !paginated {
                control.scale_point_index = 0;
            } else {
                return false;
            }
        } else {
            control.scale_point_index += 1;
        }
        if let Some(point) = control
            .scale_points
            .get(control.scale_point_index as usize)
        {
            control.value = point.value;
        }
        true
    }

    fn tap_tempo_press(&mut self, slot: usize, control: &mut Control) {
        let now = self.now_ms;
        let tap = &mut self.controls.tap_tempo[slot];
        if !tap.counting {
            tap.counting = true;
            tap.last_ms = now;
            return;
        }

        let mut delta = now.wrapping_sub(tap.last_ms);
        tap.last_ms = now;
        // a touch over the measurable maximum still counts as maximum
        if delta > tap.max_ms && delta < tap.max_ms + TAP_TEMPO_MAX_OVERFLOW_MS {
            delta = tap.max_ms;
        }
        if delta > tap.max_ms {
            return;
        }

        let displayed_ms = convert_to_ms(&control.unit, control.value);
        let measured = convert_from_ms(&control.unit, delta as f32);
        if (displayed_ms - delta as f32).abs() < TAP_TEMPO_HYSTERESIS_MS {
            // close taps refine the running value instead of replacing it
            control.value = (2.0 * control.value + measured) / 3.0;
        } else {
            control.value = measured;
        }
        control.value = control.value.clamp(control.minimum, control.maximum);
        control.update_step_from_value();
        self.send_control_set(control.hw_id, control.value);
        self.draw_foot(slot, control, false);
    }

    /*
     * pages
     */

    pub fn request_control_page(&mut self, hw_id: u8, up: bool, wrap: bool) {
        let mut mask = 0u8;
        if up {
            mask |= PAGINATION_PAGE_UP;
        }
        if wrap {
            mask |= PAGINATION_WRAP_AROUND;
        }
        let mut line: String<32> = String::new();
        let _ = write!(line, "{} {} {}", cmd::word(cmd::CONTROL_PAGE), hw_id, mask);
        self.send_line(&line);
    }

    pub fn set_pages_available(&mut self, pages: [bool; FOOTSWITCH_PAGES_COUNT]) {
        self.controls.pages_available = pages;
        let available = pages.iter().filter(|p| **p).count() as u8;
        self.screen
            .page_index(self.controls.current_foot_page, available);
    }

    /// Circularly advances to the next available footswitch page and asks
    /// the host for its assignments. Current foot slots are cleared, the
    /// host re-adds them for the new page.
    pub fn load_next_foot_page(&mut self) {
        let current = self.controls.current_foot_page as usize;
        let next = (1..=FOOTSWITCH_PAGES_COUNT)
            .map(|offset| (current + offset) % FOOTSWITCH_PAGES_COUNT)
            .find(|page| self.controls.pages_available[*page]);
        let Some(next) = next else {
            return;
        };
        if next == current {
            return;
        }

        for slot in 0..MAX_FOOT_ASSIGNMENTS {
            if self.controls.foots[slot].take().is_some() {
                self.leds.set(foot_led(slot), LedState::off());
                self.screen.footer(slot as u8, "", "", Properties::NONE);
            }
        }
        self.controls.current_foot_page = next as u8;
        let available = self
            .controls
            .pages_available
            .iter()
            .filter(|p| **p)
            .count() as u8;
        self.screen.page_index(next as u8, available);

        let mut line: String<32> = String::new();
        let _ = write!(line, "{} {}", cmd::NEXT_PAGE, next);
        self.send_line(&line);
    }

    /// Direct encoder page select from the three page buttons.
    pub fn select_encoder_page(&mut self, slot: u8) {
        if slot as usize >= ENCODER_PAGES_COUNT {
            return;
        }
        if slot == self.controls.current_encoder_page {
            return;
        }
        self.controls.current_encoder_page = slot;
        for encoder in 0..ENCODERS_COUNT {
            self.controls.encoders[encoder] = None;
            self.screen.encoder(encoder as u8, None);
        }
        self.draw_page_button_leds();
        self.screen.encoder_container(slot);

        let mut line: String<32> = String::new();
        let _ = write!(line, "{} {}", cmd::ENCODER_PAGE, slot);
        self.send_line(&line);
    }

    fn draw_page_button_leds(&mut self) {
        for page in 0..ENCODER_PAGES_COUNT {
            let state = if page as u8 == self.controls.current_encoder_page {
                LedState::solid(ENCODER_PAGE_COLOR)
            } else {
                LedState::off()
            };
            self.leds.set(page_button_led(page), state);
        }
    }

    /// Host cleared the pedalboard: drop every assignment and reset page
    /// tracking.
    pub fn pedalboard_clear(&mut self) {
        for slot in 0..ENCODERS_COUNT {
            self.controls.encoders[slot] = None;
        }
        for slot in 0..MAX_FOOT_ASSIGNMENTS {
            self.controls.foots[slot] = None;
            self.controls.tap_tempo[slot] = TapTempo::default();
            self.leds.set(foot_led(slot), LedState::off());
        }
        self.controls.current_foot_page = 0;
        self.controls.current_encoder_page = 0;
        if self.mode == crate::naveg::Mode::Control {
            self.print_control_screen();
        }
    }

    pub fn print_control_screen(&mut self) {
        self.screen.clear();
        self.screen
            .encoder_container(self.controls.current_encoder_page);
        for slot in 0..ENCODERS_COUNT {
            let control = self.controls.encoders[slot].take();
            self.screen.encoder(slot as u8, control.as_ref());
            self.controls.encoders[slot] = control;
        }
        for slot in 0..MAX_FOOT_ASSIGNMENTS {
            if let Some(control) = self.controls.foots[slot].take() {
                self.draw_foot(slot, &control, false);
                self.controls.foots[slot] = Some(control);
            } else {
                self.screen.footer(slot as u8, "", "", Properties::NONE);
            }
        }
        let available = self
            .controls
            .pages_available
            .iter()
            .filter(|p| **p)
            .count() as u8;
        self.screen
            .page_index(self.controls.current_foot_page, available);
        self.draw_page_button_leds();
    }

    /*
     * outbound sends
     */

    fn send_control_set(&mut self, hw_id: u8, value: f32) {
        let mut line: String<32> = String::new();
        let _ = write!(line, "{} {} {:.3}", cmd::word(cmd::CONTROL_SET), hw_id, value);
        self.send_line(&line);
    }

    /// All outbound control traffic funnels through here so the busy
    /// gate and the connected/offline distinction live in one place.
    fn send_line(&mut self, line: &str) {
        self.busy = true;
        if self.connected {
            // a lost reply surfaces as a timeout and is treated as a nack
            let _ = self.host.send_and_wait(line);
        } else {
            self.host.send(line);
        }
        self.busy = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control::ScalePoint;
    use crate::naveg::tests::test_hmi;
    use crate::LedColor;
    use heapless::Vec;

    fn enumerated(hw_id: u8, flags: ScalePointFlags, index: u16) -> Control {
        let mut points: Vec<ScalePoint, 12> = Vec::new();
        for (label, value) in [("Off", 0.0), ("Low", 1.0), ("High", 2.0)] {
            let _ = points.push(ScalePoint {
                label: heapless::String::from(label),
                value,
            });
        }
        Control {
            hw_id,
            label: heapless::String::from("Mode"),
            properties: Properties::ENUMERATION,
            unit: heapless::String::new(),
            value: points[index as usize].value,
            minimum: 0.0,
            maximum: 2.0,
            step: 0,
            steps: 0,
            scale_points: points,
            scale_point_index: index,
            scale_points_flags: flags,
            scroll_dir: 0,
        }
    }

    fn tap(hmi: &mut crate::naveg::tests::TestHmi, foot: u8, now_ms: u32) {
        hmi.now_ms = now_ms;
        hmi.foot_control_change(foot, true);
    }

    fn foot(hw_id: u8, properties: Properties, value: f32, unit: &str) -> Control {
        Control {
            hw_id,
            label: heapless::String::from("Foot"),
            properties,
            unit: heapless::String::from(unit),
            value,
            minimum: 0.0,
            maximum: 1000.0,
            step: 0,
            steps: 1,
            scale_points: Vec::new(),
            scale_point_index: 0,
            scale_points_flags: ScalePointFlags(0),
            scroll_dir: 0,
        }
    }

    #[test]
    fn enumerated_encoder_step_should_advance_and_report_once() {
        let mut hmi = test_hmi();
        hmi.add_control(enumerated(0, ScalePointFlags(0), 1), true);
        hmi.host.sent.clear();

        hmi.inc_control(0);

        let control = hmi.control(0).unwrap();
        assert_eq!(2, control.step);
        assert_eq!("High", control.current_scale_point().unwrap().label.as_str());
        assert_eq!(1, hmi.host.sent.len());
        assert_eq!("control_set 0 2.000", hmi.host.sent[0].as_str());
    }

    #[test]
    fn paginated_list_at_edge_should_only_request_a_page() {
        let mut hmi = test_hmi();
        let mut control = enumerated(0, ScalePointFlags::PAGINATED, 2);
        control.step = 2;
        control.steps = 3;
        hmi.controls.encoders[0] = Some(control);
        hmi.host.sent.clear();

        hmi.inc_control(0);

        assert_eq!(1, hmi.host.sent.len());
        assert!(hmi.host.sent[0].starts_with("control_page 0 "));
        assert_eq!(2, hmi.control(0).unwrap().step);
    }

    #[test]
    fn enumerated_foot_press_should_cycle_and_show_the_label() {
        let mut hmi = test_hmi();
        hmi.add_control(enumerated(3, ScalePointFlags(0), 1), true);
        hmi.host.sent.clear();

        hmi.foot_control_change(0, true);

        let control = hmi.control(3).unwrap();
        assert_eq!(2, control.scale_point_index);
        assert_eq!("High", hmi.screen.footers[0].1.as_str());
        assert_eq!(1, hmi.host.sent.len());
        assert_eq!("control_set 3 2.000", hmi.host.sent[0].as_str());
    }

    #[test]
    fn enumerated_foot_without_wrap_should_stop_at_the_end() {
        let mut hmi = test_hmi();
        hmi.add_control(enumerated(3, ScalePointFlags(0), 2), true);
        hmi.host.sent.clear();

        hmi.foot_control_change(0, true);

        assert_eq!(2, hmi.control(3).unwrap().scale_point_index);
        assert!(hmi.host.sent.is_empty());
    }

    #[test]
    fn enumerated_foot_with_wrap_should_return_to_the_first_point() {
        let mut hmi = test_hmi();
        hmi.add_control(enumerated(3, ScalePointFlags::WRAP_AROUND, 2), true);
        hmi.host.sent.clear();

        hmi.foot_control_change(0, true);

        assert_eq!(0, hmi.control(3).unwrap().scale_point_index);
        assert_eq!("control_set 3 0.000", hmi.host.sent[0].as_str());
    }

    #[test]
    fn alternate_led_palette_should_follow_the_scale_point_index() {
        let mut hmi = test_hmi();
        hmi.add_control(enumerated(3, ScalePointFlags::ALT_LED_COLOR, 1), true);

        let state = hmi.leds.last(0).unwrap();
        match state.mode {
            crate::LedMode::Solid => assert_eq!(LED_LIST_COLORS[1], state.color),
            _ => panic!("expected a solid led"),
        }
    }

    #[test]
    fn bypass_led_should_be_lit_when_the_value_is_zero() {
        let mut hmi = test_hmi();
        let mut control = foot(3, Properties::BYPASS, 0.0, "");
        control.maximum = 1.0;
        hmi.add_control(control, true);

        let state = hmi.leds.last(0).unwrap();
        assert!(matches!(state.mode, crate::LedMode::Solid));
        assert_eq!(LedColor::Red, state.color);
        assert_eq!("ON", hmi.screen.footers[0].1.as_str());
    }

    #[test]
    fn toggled_foot_press_should_flip_between_min_and_max() {
        let mut hmi = test_hmi();
        let mut control = foot(3, Properties::TOGGLED, 0.0, "");
        control.maximum = 1.0;
        hmi.add_control(control, true);
        hmi.host.sent.clear();

        hmi.foot_control_change(0, true);
        assert_eq!(1.0, hmi.control(3).unwrap().value);

        hmi.foot_control_change(0, false);
        hmi.foot_control_change(0, true);
        assert_eq!(0.0, hmi.control(3).unwrap().value);
    }

    #[test]
    fn momentary_foot_should_report_both_edges() {
        let mut hmi = test_hmi();
        let mut control = foot(3, Properties::MOMENTARY, 0.0, "");
        control.maximum = 1.0;
        hmi.add_control(control, true);
        hmi.host.sent.clear();

        hmi.foot_control_change(0, true);
        hmi.foot_control_change(0, false);

        assert_eq!(2, hmi.host.sent.len());
        assert_eq!("control_set 3 1.000", hmi.host.sent[0].as_str());
        assert_eq!("control_set 3 0.000", hmi.host.sent[1].as_str());
    }

    #[test]
    fn close_taps_should_blend_with_the_displayed_value() {
        let mut hmi = test_hmi();
        hmi.add_control(foot(3, Properties::TAP_TEMPO, 500.0, "ms"), true);
        hmi.host.sent.clear();

        tap(&mut hmi, 0, 1000);
        tap(&mut hmi, 0, 1450);

        let expected = (2.0 * 500.0 + 450.0) / 3.0;
        assert!((hmi.control(3).unwrap().value - expected).abs() < 0.001);
        assert_eq!(1, hmi.host.sent.len());
    }

    #[test]
    fn distant_taps_should_replace_the_displayed_value() {
        let mut hmi = test_hmi();
        hmi.add_control(foot(3, Properties::TAP_TEMPO, 500.0, "ms"), true);
        hmi.host.sent.clear();

        tap(&mut hmi, 0, 1000);
        tap(&mut hmi, 0, 1900);

        assert_eq!(900.0, hmi.control(3).unwrap().value);
    }

    #[test]
    fn interval_beyond_the_maximum_should_restart_counting() {
        let mut hmi = test_hmi();
        hmi.add_control(foot(3, Properties::TAP_TEMPO, 500.0, "ms"), true);
        hmi.host.sent.clear();

        tap(&mut hmi, 0, 1000);
        tap(&mut hmi, 0, 4000);

        assert_eq!(500.0, hmi.control(3).unwrap().value);
        assert!(hmi.host.sent.is_empty());
    }

    #[test]
    fn host_set_should_update_the_slot_without_echoing() {
        let mut hmi = test_hmi();
        let mut control = foot(3, Properties::TOGGLED, 0.0, "");
        control.maximum = 1.0;
        hmi.add_control(control, true);
        hmi.host.sent.clear();

        hmi.set_control_value(3, 1.0);

        assert_eq!(1.0, hmi.control(3).unwrap().value);
        assert!(hmi.host.sent.is_empty());
    }

    #[test]
    fn removing_a_control_should_clear_slot_and_led() {
        let mut hmi = test_hmi();
        let mut control = foot(3, Properties::TOGGLED, 1.0, "");
        control.maximum = 1.0;
        hmi.add_control(control, true);

        hmi.remove_control(3);

        assert!(hmi.control(3).is_none());
        assert!(matches!(
            hmi.leds.last(0).unwrap().mode,
            crate::LedMode::Off
        ));
    }

    #[test]
    fn next_foot_page_should_skip_unavailable_pages() {
        let mut hmi = test_hmi();
        hmi.set_pages_available([true, false, true, false, false, false, false, false]);
        hmi.host.sent.clear();

        hmi.load_next_foot_page();

        assert_eq!(2, hmi.controls.current_foot_page);
        assert_eq!("next_page 2", hmi.host.sent[0].as_str());
    }

    #[test]
    fn foot_page_change_should_clear_foot_assignments() {
        let mut hmi = test_hmi();
        hmi.set_pages_available([true, true, false, false, false, false, false, false]);
        let mut control = foot(3, Properties::TOGGLED, 0.0, "");
        control.maximum = 1.0;
        hmi.add_control(control, true);

        hmi.load_next_foot_page();

        assert!(hmi.control(3).is_none());
        assert_eq!("", hmi.screen.footers[0].0.as_str());
    }

    #[test]
    fn encoder_page_select_should_clear_encoders_and_notify() {
        let mut hmi = test_hmi();
        hmi.add_control(enumerated(0, ScalePointFlags(0), 0), true);
        hmi.host.sent.clear();

        hmi.select_encoder_page(1);

        assert!(hmi.control(0).is_none());
        assert_eq!("encoder_page 1", hmi.host.sent[0].as_str());
        assert_eq!(1, hmi.controls.current_encoder_page);
    }
}
