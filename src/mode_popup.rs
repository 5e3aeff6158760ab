//! Modal popups: save/overwrite/delete confirmations and the character
//! picker used to name pedalboards and snapshots. While a popup is up it
//! owns the encoder and the footswitches; the arbiter routes those
//! events here before the underlying mode sees them.

use core::fmt::Write as _;

use heapless::String;

use crate::mode_navigation::NavigationTarget;
use crate::naveg::{Hmi, Mode};
use crate::protocol::cmd;
use crate::{Eeprom, Host, Leds, Screen};

pub const POPUP_SAVE_SNAPSHOT: u8 = 1;
pub const POPUP_SAVE_PEDALBOARD: u8 = 2;
pub const POPUP_OVERWRITE_SNAPSHOT: u8 = 3;
pub const POPUP_OVERWRITE_PEDALBOARD: u8 = 4;
pub const POPUP_DELETE_SNAPSHOT: u8 = 5;
pub const POPUP_DELETE_PEDALBOARD: u8 = 6;
pub const POPUP_EMPTY_NAME: u8 = 7;
pub const POPUP_NEW_BANK: u8 = 8;
pub const POPUP_DELETE_BANK: u8 = 9;

pub const NAME_SIZE: usize = 18;

/// Character picker alphabet; up/down cycle it with wraparound and the
/// footswitches jump in bigger strides.
const ALPHABET: &[u8] =
    b" ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789-";
const KEYBOARD_JUMP: usize = 15;

/// Host status meaning "that name already exists".
const STATUS_NAME_EXISTS: i32 = -2;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PopupState {
    Closed,
    Showing(u8),
    Keyboard(u8),
}

/// Snapshot of the popup for the display.
pub struct PopupView {
    pub id: u8,
    pub title: &'static str,
    pub name: String<NAME_SIZE>,
    pub cursor: u8,
    pub keyboard_active: bool,
    pub has_name: bool,
}

pub struct PopupMode {
    pub state: PopupState,
    name: [u8; NAME_SIZE],
    cursor: usize,
    alphabet_index: usize,
    /// Naming popup to fall back to from the empty-name notice.
    return_to: Option<u8>,
}

impl PopupMode {
    pub fn new() -> PopupMode {
        PopupMode {
            state: PopupState::Closed,
            name: [b' '; NAME_SIZE],
            cursor: 0,
            alphabet_index: 0,
            return_to: None,
        }
    }

    pub fn active(&self) -> bool {
        self.state != PopupState::Closed
    }

    pub fn close(&mut self) {
        self.state = PopupState::Closed;
        self.return_to = None;
    }

    pub fn current_id(&self) -> Option<u8> {
        match self.state {
            PopupState::Closed => None,
            PopupState::Showing(id) | PopupState::Keyboard(id) => Some(id),
        }
    }

    fn trimmed_name(&self) -> &str {
        // buffer only ever holds alphabet bytes, always valid ASCII
        core::str::from_utf8(&self.name)
            .unwrap_or("")
            .trim_end()
    }

    fn reset_name(&mut self) {
        self.name = [b' '; NAME_SIZE];
        self.cursor = 0;
        self.alphabet_index = 0;
    }
}

impl Default for PopupMode {
    fn default() -> Self {
        PopupMode::new()
    }
}

fn popup_title(id: u8) -> &'static str {
    match id {
        POPUP_SAVE_SNAPSHOT => "SAVE SNAPSHOT",
        POPUP_SAVE_PEDALBOARD => "SAVE PEDALBOARD",
        POPUP_OVERWRITE_SNAPSHOT | POPUP_OVERWRITE_PEDALBOARD => "NAME EXISTS, OVERWRITE?",
        POPUP_DELETE_SNAPSHOT => "DELETE SNAPSHOT?",
        POPUP_DELETE_PEDALBOARD => "DELETE PEDALBOARD?",
        POPUP_EMPTY_NAME => "NAME CANNOT BE EMPTY",
        POPUP_NEW_BANK => "NEW BANK",
        POPUP_DELETE_BANK => "DELETE BANK?",
        _ => "",
    }
}

fn is_naming(id: u8) -> bool {
    matches!(id, POPUP_SAVE_SNAPSHOT | POPUP_SAVE_PEDALBOARD | POPUP_NEW_BANK)
}

impl<S: Screen, L: Leds, H: Host, E: Eeprom> Hmi<S, L, H, E> {
    pub fn launch_popup_by_id(&mut self, id: u8) {
        if popup_title(id).is_empty() {
            return;
        }
        if is_naming(id) {
            self.popup.reset_name();
        }
        self.popup.state = PopupState::Showing(id);
        self.draw_popup();
    }

    /// Opens the save popup matching the current navigation target.
    pub(crate) fn launch_save_popup(&mut self) {
        let id = match self.navigation.target {
            NavigationTarget::Snapshots => POPUP_SAVE_SNAPSHOT,
            NavigationTarget::Pedalboards => POPUP_SAVE_PEDALBOARD,
            NavigationTarget::Banks => POPUP_NEW_BANK,
        };
        self.launch_popup_by_id(id);
    }

    fn draw_popup(&mut self) {
        let Some(id) = self.popup.current_id() else {
            return;
        };
        let mut name: String<NAME_SIZE> = String::new();
        for byte in self.popup.name {
            let _ = name.push(byte as char);
        }
        let view = PopupView {
            id,
            title: popup_title(id),
            name,
            cursor: self.popup.cursor as u8,
            keyboard_active: matches!(self.popup.state, PopupState::Keyboard(_)),
            has_name: is_naming(id),
        };
        self.screen.popup(&view);
    }

    fn close_popup_and_redraw(&mut self) {
        self.popup.close();
        match self.mode {
            Mode::Control => self.print_control_screen(),
            Mode::Navigation => self.redraw_navigation(),
            Mode::ToolMenu => self.redraw_tool_menu(),
            Mode::ToolFoot => self.redraw_tool_screen(),
            _ => self.screen.clear(),
        }
    }

    /*
     * intercepted actuator events
     */

    pub(crate) fn popup_encoder_enter(&mut self) {
        match self.popup.state {
            PopupState::Showing(id) if is_naming(id) => {
                // pick up the character already under the cursor
                let current = self.popup.name[self.popup.cursor];
                self.popup.alphabet_index = ALPHABET
                    .iter()
                    .position(|c| *c == current)
                    .unwrap_or(0);
                self.popup.state = PopupState::Keyboard(id);
                self.draw_popup();
            }
            PopupState::Keyboard(id) => {
                self.popup.state = PopupState::Showing(id);
                self.draw_popup();
            }
            _ => {}
        }
    }

    pub(crate) fn popup_encoder_up(&mut self) {
        match self.popup.state {
            PopupState::Showing(id) if is_naming(id) => {
                if self.popup.cursor > 0 {
                    self.popup.cursor -= 1;
                    self.draw_popup();
                }
            }
            PopupState::Keyboard(_) => self.cycle_keyboard(ALPHABET.len() - 1),
            _ => {}
        }
    }

    pub(crate) fn popup_encoder_down(&mut self) {
        match self.popup.state {
            PopupState::Showing(id) if is_naming(id) => {
                if self.popup.cursor + 1 < NAME_SIZE {
                    self.popup.cursor += 1;
                    self.draw_popup();
                }
            }
            PopupState::Keyboard(_) => self.cycle_keyboard(1),
            _ => {}
        }
    }

    /// Advances the alphabet index and writes the character into the
    /// name buffer immediately, live preview rather than commit-on-ok.
    fn cycle_keyboard(&mut self, stride: usize) {
        self.popup.alphabet_index = (self.popup.alphabet_index + stride) % ALPHABET.len();
        self.popup.name[self.popup.cursor] = ALPHABET[self.popup.alphabet_index];
        self.draw_popup();
    }

    pub(crate) fn popup_foot(&mut self, foot: u8) {
        if let PopupState::Keyboard(_) = self.popup.state {
            match foot {
                0 => self.cycle_keyboard(ALPHABET.len() - KEYBOARD_JUMP),
                1 => self.cycle_keyboard(KEYBOARD_JUMP),
                _ => self.popup_encoder_enter(),
            }
            return;
        }
        let Some(id) = self.popup.current_id() else {
            return;
        };
        match (id, foot) {
            (POPUP_SAVE_SNAPSHOT, 0) | (POPUP_SAVE_PEDALBOARD, 0) | (POPUP_NEW_BANK, 0) => {
                self.popup_save(id)
            }
            (POPUP_SAVE_SNAPSHOT, 1) | (POPUP_SAVE_PEDALBOARD, 1) | (POPUP_NEW_BANK, 1) => {
                self.popup.reset_name();
                self.draw_popup();
            }
            (POPUP_OVERWRITE_SNAPSHOT, 0) => {
                self.popup_send(id, cmd::SNAPSHOT_SAVE);
            }
            (POPUP_OVERWRITE_PEDALBOARD, 0) => {
                self.popup_send(id, cmd::PEDALBOARD_SAVE);
            }
            (POPUP_DELETE_SNAPSHOT, 0) => self.popup_delete(id),
            (POPUP_DELETE_PEDALBOARD, 0) => self.popup_delete(id),
            (POPUP_DELETE_BANK, 0) => self.popup_delete_bank(),
            (POPUP_EMPTY_NAME, _) => {
                let back = self.popup.return_to.take();
                if let Some(back) = back {
                    self.popup.state = PopupState::Showing(back);
                    self.draw_popup();
                } else {
                    self.close_popup_and_redraw();
                }
            }
            (_, 2) => self.close_popup_and_redraw(),
            _ => {}
        }
    }

    /*
     * host round trips
     */

    fn popup_save(&mut self, id: u8) {
        let trimmed_is_empty = self.popup.trimmed_name().is_empty();
        if trimmed_is_empty {
            // nothing goes to the host for a blank name
            self.popup.return_to = Some(id);
            self.popup.state = PopupState::Showing(POPUP_EMPTY_NAME);
            self.draw_popup();
            return;
        }

        let command = match id {
            POPUP_SAVE_SNAPSHOT => cmd::SNAPSHOT_SAVE_AS,
            POPUP_NEW_BANK => cmd::BANK_NEW,
            _ => cmd::PEDALBOARD_SAVE_AS,
        };
        let mut line: String<48> = String::new();
        let _ = write!(line, "{} {}", command, self.popup.trimmed_name());
        self.popup_send(id, &line);
    }

    fn popup_delete(&mut self, id: u8) {
        let selected = match id {
            POPUP_DELETE_SNAPSHOT => self.navigation.snapshots.selected,
            _ => self.navigation.pedalboards.selected,
        };
        let Some(index) = selected else {
            self.close_popup_and_redraw();
            return;
        };
        let command = match id {
            POPUP_DELETE_SNAPSHOT => cmd::SNAPSHOT_DELETE,
            _ => cmd::PEDALBOARD_DELETE,
        };
        let mut line: String<48> = String::new();
        let _ = write!(line, "{} {}", command, index);
        self.popup_send(id, &line);
    }

    /// Deleting a bank targets the hovered entry, and the host renumbers
    /// everything past it, so the committed selection shifts to match.
    fn popup_delete_bank(&mut self) {
        if self.navigation.banks.hovered().is_none() {
            self.close_popup_and_redraw();
            return;
        }
        let index = self.navigation.banks.hover;
        let mut line: String<48> = String::new();
        let _ = write!(line, "{} {}", cmd::BANK_DELETE, index);
        if !self.popup_send(POPUP_DELETE_BANK, &line) {
            return;
        }
        let banks = &mut self.navigation.banks;
        match banks.selected {
            Some(selected) if index < selected => banks.selected = Some(selected - 1),
            Some(selected) if index == selected => banks.selected = None,
            _ => {}
        }
        banks.names.clear();
        banks.hover = 0;
        self.request_list(NavigationTarget::Banks, 0);
        if self.mode == Mode::Navigation {
            self.redraw_navigation();
        }
    }

    /// Sends, then branches on the host's verdict: success closes the
    /// popup, a name clash chains into the overwrite confirmation, and
    /// anything else becomes a timed error overlay. Returns whether the
    /// host accepted.
    fn popup_send(&mut self, id: u8, line: &str) -> bool {
        self.busy = true;
        let status = self.host.send_and_wait(line);
        self.busy = false;

        match status {
            Ok(status) if status >= 0 => {
                self.close_popup_and_redraw();
                true
            }
            Ok(STATUS_NAME_EXISTS)
                if matches!(id, POPUP_SAVE_SNAPSHOT | POPUP_SAVE_PEDALBOARD) =>
            {
                let chained = match id {
                    POPUP_SAVE_SNAPSHOT => POPUP_OVERWRITE_SNAPSHOT,
                    _ => POPUP_OVERWRITE_PEDALBOARD,
                };
                self.popup.state = PopupState::Showing(chained);
                self.draw_popup();
                false
            }
            _ => {
                self.close_popup_and_redraw();
                self.screen.attention_overlay("command failed");
                self.screen
                    .set_overlay_timeout(crate::FOOT_CONTROLS_TIMEOUT_MS, crate::OverlayTarget::Controls);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::naveg::tests::test_hmi;

    #[test]
    fn blank_name_save_should_show_the_empty_name_notice_without_sending() {
        let mut hmi = test_hmi();
        hmi.launch_popup_by_id(POPUP_SAVE_SNAPSHOT);
        hmi.host.sent.clear();

        hmi.popup_foot(0);

        assert_eq!(PopupState::Showing(POPUP_EMPTY_NAME), hmi.popup.state);
        assert!(hmi.host.sent.is_empty());
    }

    #[test]
    fn empty_name_notice_should_return_to_the_naming_popup() {
        let mut hmi = test_hmi();
        hmi.launch_popup_by_id(POPUP_SAVE_SNAPSHOT);
        hmi.popup_foot(0);

        hmi.popup_foot(0);
        assert_eq!(PopupState::Showing(POPUP_SAVE_SNAPSHOT), hmi.popup.state);
    }

    #[test]
    fn typed_name_should_be_sent_trimmed() {
        let mut hmi = test_hmi();
        hmi.launch_popup_by_id(POPUP_SAVE_SNAPSHOT);
        hmi.popup.name[..4].copy_from_slice(b"Lead");
        hmi.host.sent.clear();

        hmi.popup_foot(0);

        assert_eq!("snapshot_save_as Lead", hmi.host.sent[0].as_str());
        assert_eq!(PopupState::Closed, hmi.popup.state);
    }

    #[test]
    fn name_clash_should_chain_into_the_overwrite_popup() {
        let mut hmi = test_hmi();
        hmi.host.reply = Ok(-2);
        hmi.launch_popup_by_id(POPUP_SAVE_SNAPSHOT);
        hmi.popup.name[..4].copy_from_slice(b"Lead");

        hmi.popup_foot(0);
        assert_eq!(
            PopupState::Showing(POPUP_OVERWRITE_SNAPSHOT),
            hmi.popup.state
        );

        hmi.host.reply = Ok(0);
        hmi.host.sent.clear();
        hmi.popup_foot(0);
        assert_eq!("snapshot_save", hmi.host.sent[0].as_str());
        assert_eq!(PopupState::Closed, hmi.popup.state);
    }

    #[test]
    fn other_failures_should_show_a_timed_error_overlay() {
        let mut hmi = test_hmi();
        hmi.host.reply = Ok(-9);
        hmi.launch_popup_by_id(POPUP_SAVE_SNAPSHOT);
        hmi.popup.name[..4].copy_from_slice(b"Lead");

        hmi.popup_foot(0);

        assert_eq!(PopupState::Closed, hmi.popup.state);
        assert!(hmi.screen.attention.iter().any(|m| m == "command failed"));
        assert!(!hmi.screen.overlay_timeouts.is_empty());
    }

    #[test]
    fn keyboard_should_cycle_with_wraparound_and_preview_live() {
        let mut hmi = test_hmi();
        hmi.launch_popup_by_id(POPUP_SAVE_SNAPSHOT);

        hmi.popup_encoder_enter();
        assert_eq!(PopupState::Keyboard(POPUP_SAVE_SNAPSHOT), hmi.popup.state);

        // one step back from the space wraps to the alphabet's last symbol
        hmi.popup_encoder_up();
        assert_eq!(b'-', hmi.popup.name[0]);

        hmi.popup_encoder_down();
        assert_eq!(b' ', hmi.popup.name[0]);

        hmi.popup_encoder_down();
        assert_eq!(b'A', hmi.popup.name[0]);
    }

    #[test]
    fn keyboard_foot_should_jump_fifteen_symbols() {
        let mut hmi = test_hmi();
        hmi.launch_popup_by_id(POPUP_SAVE_SNAPSHOT);
        hmi.popup_encoder_enter();

        hmi.popup_foot(1);
        assert_eq!(ALPHABET[15], hmi.popup.name[0]);
    }

    #[test]
    fn cancel_should_close_and_redraw_the_underlying_mode() {
        let mut hmi = test_hmi();
        hmi.launch_popup_by_id(POPUP_SAVE_SNAPSHOT);
        let cleared_before = hmi.screen.cleared;

        hmi.popup_foot(2);

        assert_eq!(PopupState::Closed, hmi.popup.state);
        assert!(hmi.screen.cleared > cleared_before);
    }

    #[test]
    fn new_bank_name_should_be_sent_trimmed() {
        let mut hmi = test_hmi();
        hmi.navigation.target = NavigationTarget::Banks;
        hmi.launch_save_popup();
        assert_eq!(PopupState::Showing(POPUP_NEW_BANK), hmi.popup.state);
        hmi.popup.name[..4].copy_from_slice(b"Road");
        hmi.host.sent.clear();

        hmi.popup_foot(0);

        assert_eq!("bank_new Road", hmi.host.sent[0].as_str());
        assert_eq!(PopupState::Closed, hmi.popup.state);
    }

    #[test]
    fn blank_bank_name_should_show_the_empty_name_notice() {
        let mut hmi = test_hmi();
        hmi.launch_popup_by_id(POPUP_NEW_BANK);
        hmi.host.sent.clear();

        hmi.popup_foot(0);

        assert_eq!(PopupState::Showing(POPUP_EMPTY_NAME), hmi.popup.state);
        assert!(hmi.host.sent.is_empty());
    }

    #[test]
    fn deleting_a_bank_should_shift_the_selection_and_refetch() {
        let mut hmi = test_hmi();
        for (index, name) in ["Factory", "Road", "Studio"].iter().enumerate() {
            hmi.set_bank_name(index as u16, name);
        }
        hmi.navigation.banks.selected = Some(2);
        hmi.navigation.banks.hover = 1;
        hmi.launch_popup_by_id(POPUP_DELETE_BANK);
        hmi.host.sent.clear();

        hmi.popup_foot(0);

        assert_eq!("bank_delete 1", hmi.host.sent[0].as_str());
        assert_eq!("banks 0", hmi.host.sent[1].as_str());
        assert_eq!(Some(1), hmi.navigation.banks.selected);
        assert_eq!(0, hmi.navigation.banks.hover);
        assert!(hmi.navigation.banks.names.is_empty());
    }

    #[test]
    fn delete_should_target_the_selected_snapshot() {
        let mut hmi = test_hmi();
        hmi.set_snapshot_name(1, "Lead");
        hmi.launch_popup_by_id(POPUP_DELETE_SNAPSHOT);
        hmi.host.sent.clear();

        hmi.popup_foot(0);
        assert_eq!("snapshot_delete 1", hmi.host.sent[0].as_str());
    }
}
