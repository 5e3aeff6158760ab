//! Navigation mode: scrolling name lists for banks, pedalboards and
//! snapshots. The host owns the data; names arrive through `*_name_set`
//! pushes and the `initial_state` handshake, loads go out as `*_load`
//! commands. Lists longer than one window are fetched page by page: the
//! device holds a single window of names and asks the host for the next
//! one when the hover cursor runs off the loaded edge.

use core::fmt::Write;

use heapless::{String, Vec};

use crate::naveg::{Hmi, Mode};
use crate::protocol::{cmd, Tokens};
use crate::{Eeprom, Host, Leds, Screen};

pub const NAME_LIST_CAPACITY: usize = 16;
pub const LIST_NAME_SIZE: usize = 24;

/// First index of the window-aligned page holding `index`.
pub fn window_base(index: u16) -> u16 {
    index - index % NAME_LIST_CAPACITY as u16
}

/// Outcome of moving the hover cursor by one step.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HoverStep {
    Moved,
    /// Cursor stays put, nothing more to show in that direction.
    Pinned,
    /// The neighbouring entry is not loaded; the host must be asked for
    /// the page starting at the carried index.
    PageNeeded(u16),
}

/// A host-fed list with a moving hover cursor and an optional committed
/// selection. `names` holds one loaded window; `hover` and `selected`
/// are indices into the full host-side list.
pub struct NameList {
    pub names: Vec<String<LIST_NAME_SIZE>, NAME_LIST_CAPACITY>,
    /// Host-side index of `names[0]`.
    pub window_start: u16,
    pub hover: u16,
    pub selected: Option<u16>,
}

impl NameList {
    pub fn new() -> NameList {
        NameList {
            names: Vec::new(),
            window_start: 0,
            hover: 0,
            selected: None,
        }
    }

    /// Stores a name at the host-side `index`, padding with blanks when
    /// the host sends entries out of order. Pushes outside the loaded
    /// window are stale and dropped.
    pub fn set_name(&mut self, index: u16, name: &str) {
        let Some(slot) = (index as usize).checked_sub(self.window_start as usize) else {
            return;
        };
        if slot >= NAME_LIST_CAPACITY {
            return;
        }
        while self.names.len() <= slot {
            if self.names.push(String::new()).is_err() {
                return;
            }
        }
        let entry = &mut self.names[slot];
        entry.clear();
        for c in name.chars() {
            if entry.push(c).is_err() {
                break;
            }
        }
    }

    /// Keeps the old names on screen until the new page streams in, so
    /// re-requesting the current window is a no-op.
    pub fn rewindow(&mut self, start: u16) {
        if start == self.window_start {
            return;
        }
        self.window_start = start;
        self.names.clear();
    }

    /// One past the last loaded host-side index.
    pub fn window_end(&self) -> u16 {
        self.window_start + self.names.len() as u16
    }

    pub fn hover_up(&mut self) -> HoverStep {
        if self.hover == 0 {
            return HoverStep::Pinned;
        }
        let previous = self.hover - 1;
        if previous >= self.window_start {
            self.hover = previous;
            return HoverStep::Moved;
        }
        HoverStep::PageNeeded(window_base(previous))
    }

    pub fn hover_down(&mut self) -> HoverStep {
        let next = self.hover + 1;
        if next < self.window_end() {
            self.hover = next;
            return HoverStep::Moved;
        }
        if self.names.len() == NAME_LIST_CAPACITY {
            // a full window means the host may hold more entries past it
            return HoverStep::PageNeeded(self.window_end());
        }
        HoverStep::Pinned
    }

    pub fn hovered(&self) -> Option<&str> {
        let slot = (self.hover as usize).checked_sub(self.window_start as usize)?;
        self.names.get(slot).map(|n| n.as_str())
    }

    pub fn clear(&mut self) {
        self.names.clear();
        self.window_start = 0;
        self.hover = 0;
        self.selected = None;
    }
}

impl Default for NameList {
    fn default() -> Self {
        NameList::new()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NavigationTarget {
    Banks,
    Pedalboards,
    Snapshots,
}

pub struct NavigationMode {
    pub target: NavigationTarget,
    pub banks: NameList,
    pub pedalboards: NameList,
    pub snapshots: NameList,
    pub pedalboard_name: String<LIST_NAME_SIZE>,
    pub profile: u8,
}

impl NavigationMode {
    pub fn new() -> NavigationMode {
        NavigationMode {
            target: NavigationTarget::Snapshots,
            banks: NameList::new(),
            pedalboards: NameList::new(),
            snapshots: NameList::new(),
            pedalboard_name: String::new(),
            profile: 1,
        }
    }

    fn list_for(&self, target: NavigationTarget) -> &NameList {
        match target {
            NavigationTarget::Banks => &self.banks,
            NavigationTarget::Pedalboards => &self.pedalboards,
            NavigationTarget::Snapshots => &self.snapshots,
        }
    }

    fn list_for_mut(&mut self, target: NavigationTarget) -> &mut NameList {
        match target {
            NavigationTarget::Banks => &mut self.banks,
            NavigationTarget::Pedalboards => &mut self.pedalboards,
            NavigationTarget::Snapshots => &mut self.snapshots,
        }
    }

    fn list(&self) -> &NameList {
        self.list_for(self.target)
    }

    fn list_mut(&mut self) -> &mut NameList {
        self.list_for_mut(self.target)
    }
}

impl Default for NavigationMode {
    fn default() -> Self {
        NavigationMode::new()
    }
}

impl<S: Screen, L: Leds, H: Host, E: Eeprom> Hmi<S, L, H, E> {
    /// Entering navigation parks the hover cursors on the committed
    /// selections and asks the host to re-push the pages holding them.
    pub(crate) fn enter_navigation(&mut self) {
        for target in [
            NavigationTarget::Banks,
            NavigationTarget::Pedalboards,
            NavigationTarget::Snapshots,
        ] {
            let list = self.navigation.list_for_mut(target);
            list.hover = list.selected.unwrap_or(0);
            let start = window_base(list.hover);
            self.request_list(target, start);
        }
        self.redraw_navigation();
    }

    /// Asks the host for one window of a list, starting at a host-side
    /// index. A pedalboard request names the bank it browses.
    pub(crate) fn request_list(&mut self, target: NavigationTarget, start: u16) {
        let mut line: String<32> = String::new();
        let _ = match target {
            NavigationTarget::Banks => write!(line, "{} {}", cmd::BANKS, start),
            NavigationTarget::Pedalboards => {
                let bank = self.navigation.banks.selected.unwrap_or(0);
                write!(line, "{} {} {}", cmd::PEDALBOARDS, bank, start)
            }
            NavigationTarget::Snapshots => write!(line, "{} {}", cmd::SNAPSHOTS, start),
        };
        self.navigation.list_for_mut(target).rewindow(start);
        self.host.send(&line);
    }

    pub(crate) fn redraw_navigation(&mut self) {
        self.screen.clear();
        self.screen.name_list(self.navigation.list());
    }

    pub(crate) fn navigation_up(&mut self) {
        match self.navigation.list_mut().hover_up() {
            HoverStep::Moved => self.screen.name_list(self.navigation.list()),
            HoverStep::PageNeeded(start) => {
                let target = self.navigation.target;
                self.request_list(target, start);
            }
            HoverStep::Pinned => {}
        }
    }

    pub(crate) fn navigation_down(&mut self) {
        match self.navigation.list_mut().hover_down() {
            HoverStep::Moved => self.screen.name_list(self.navigation.list()),
            HoverStep::PageNeeded(start) => {
                let target = self.navigation.target;
                self.request_list(target, start);
            }
            HoverStep::Pinned => {}
        }
    }

    /// Encoder click loads the hovered entry.
    pub(crate) fn navigation_enter(&mut self) {
        self.load_hovered();
    }

    pub(crate) fn navigation_foot(&mut self, foot: u8) {
        match foot {
            0 => self.navigation_up(),
            1 => self.navigation_down(),
            2 => self.load_hovered(),
            _ => {}
        }
    }

    fn load_hovered(&mut self) {
        if self.navigation.list().hovered().is_none() {
            return;
        }
        let index = self.navigation.list().hover;
        let command = match self.navigation.target {
            NavigationTarget::Banks => {
                self.enter_bank(index);
                return;
            }
            NavigationTarget::Pedalboards => cmd::PEDALBOARD_LOAD,
            NavigationTarget::Snapshots => cmd::SNAPSHOT_LOAD,
        };
        let mut line: String<32> = String::new();
        let _ = write!(line, "{} {}", command, index);
        self.busy = true;
        let accepted = if self.connected {
            self.host.send_and_wait(&line).is_ok()
        } else {
            self.host.send(&line);
            true
        };
        self.busy = false;
        if accepted {
            self.navigation.list_mut().selected = Some(index);
            self.screen.name_list(self.navigation.list());
        }
    }

    /// Committing a bank switches browsing over to its pedalboards. The
    /// active pedalboard does not change until one is loaded from the
    /// fresh list.
    fn enter_bank(&mut self, index: u16) {
        self.navigation.banks.selected = Some(index);
        self.navigation.target = NavigationTarget::Pedalboards;
        self.navigation.pedalboards.clear();
        self.request_list(NavigationTarget::Pedalboards, 0);
        self.redraw_navigation();
    }

    pub fn toggle_navigation_target(&mut self) {
        self.navigation.target = match self.navigation.target {
            NavigationTarget::Snapshots => NavigationTarget::Pedalboards,
            NavigationTarget::Pedalboards => NavigationTarget::Banks,
            NavigationTarget::Banks => NavigationTarget::Snapshots,
        };
        if self.mode == Mode::Navigation {
            self.redraw_navigation();
        }
    }

    /*
     * host pushes
     */

    /// Boot-time handshake: `initial_state <bank> <pb-index> <ss-index>
    /// <pb-name> <ss-count> <ss-name...>`.
    pub fn initial_state(&mut self, tokens: &Tokens<'_>) {
        if let Ok(bank) = tokens.int(1) {
            self.navigation.banks.selected = Some(bank as u16);
            self.navigation.banks.hover = bank as u16;
        }
        if let Ok(index) = tokens.int(2) {
            self.navigation.pedalboards.selected = Some(index as u16);
            self.navigation.pedalboards.hover = index as u16;
        }
        let snapshot_index = tokens.int(3).unwrap_or(0) as u16;
        if let Ok(name) = tokens.str_arg(4) {
            self.navigation.pedalboard_name.clear();
            let _ = self.navigation.pedalboard_name.push_str(name);
        }
        let joined: String<LIST_NAME_SIZE> = tokens.join_tail(6);
        if !joined.is_empty() {
            self.navigation.snapshots.set_name(snapshot_index, &joined);
        }
        self.navigation.snapshots.selected = Some(snapshot_index);
        self.navigation.snapshots.hover = snapshot_index;
    }

    pub fn set_pedalboard_name(&mut self, name: &str) {
        self.navigation.pedalboard_name.clear();
        for c in name.chars() {
            if self.navigation.pedalboard_name.push(c).is_err() {
                break;
            }
        }
        if let Some(index) = self.navigation.pedalboards.selected {
            self.navigation.pedalboards.set_name(index, name);
        }
        if self.mode == Mode::Navigation {
            self.redraw_navigation();
        }
    }

    pub fn set_snapshot_name(&mut self, index: u16, name: &str) {
        self.navigation.snapshots.set_name(index, name);
        self.navigation.snapshots.selected = Some(index);
        if self.mode == Mode::Navigation {
            self.redraw_navigation();
        }
    }

    pub fn set_bank_name(&mut self, index: u16, name: &str) {
        self.navigation.banks.set_name(index, name);
        if self.mode == Mode::Navigation {
            self.redraw_navigation();
        }
    }

    pub fn pedalboard_changed(&mut self, index: u16) {
        self.navigation.pedalboards.selected = Some(index);
        self.navigation.pedalboards.hover = index;
        if self.mode == Mode::Navigation {
            self.redraw_navigation();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::naveg::tests::test_hmi;

    #[test]
    fn names_arriving_out_of_order_should_pad_the_list() {
        let mut list = NameList::new();
        list.set_name(2, "Third");
        assert_eq!(3, list.names.len());
        assert_eq!("", list.names[0].as_str());
        assert_eq!("Third", list.names[2].as_str());
    }

    #[test]
    fn hover_should_pin_at_the_ends_of_a_short_list() {
        let mut list = NameList::new();
        list.set_name(0, "A");
        list.set_name(1, "B");

        assert_eq!(HoverStep::Pinned, list.hover_up());
        assert_eq!(HoverStep::Moved, list.hover_down());
        // a partial window is the whole list, no page past it
        assert_eq!(HoverStep::Pinned, list.hover_down());
        assert_eq!(Some("B"), list.hovered());
    }

    #[test]
    fn pushes_outside_the_loaded_window_should_be_dropped() {
        let mut list = NameList::new();
        list.rewindow(NAME_LIST_CAPACITY as u16);
        list.set_name(3, "stale");
        assert!(list.names.is_empty());

        list.set_name(NAME_LIST_CAPACITY as u16 + 1, "fresh");
        assert_eq!("fresh", list.names[1].as_str());
        assert_eq!(NAME_LIST_CAPACITY as u16 + 2, list.window_end());
    }

    #[test]
    fn entering_navigation_should_request_every_list() {
        let mut hmi = test_hmi();
        hmi.enter_mode(Mode::Navigation);

        assert!(hmi.host.sent.iter().any(|l| l == "banks 0"));
        assert!(hmi.host.sent.iter().any(|l| l == "pedalboards 0 0"));
        assert!(hmi.host.sent.iter().any(|l| l == "snapshots 0"));
    }

    #[test]
    fn scrolling_past_a_full_window_should_request_the_next_page() {
        let mut hmi = test_hmi();
        for index in 0..NAME_LIST_CAPACITY as u16 {
            let mut name: String<LIST_NAME_SIZE> = String::new();
            let _ = write!(name, "Snap {}", index);
            hmi.navigation.snapshots.set_name(index, &name);
        }
        hmi.enter_mode(Mode::Navigation);
        hmi.navigation.snapshots.hover = NAME_LIST_CAPACITY as u16 - 1;
        hmi.host.sent.clear();

        hmi.navigation_down();

        assert_eq!("snapshots 16", hmi.host.sent[0].as_str());
        assert_eq!(16, hmi.navigation.snapshots.window_start);
        assert!(hmi.navigation.snapshots.names.is_empty());
        // the cursor only moves once the new page has streamed in
        assert_eq!(15, hmi.navigation.snapshots.hover);

        hmi.set_snapshot_name(16, "Snap 16");
        hmi.navigation_down();
        assert_eq!(Some("Snap 16"), hmi.navigation.snapshots.hovered());
    }

    #[test]
    fn scrolling_above_the_window_should_request_the_previous_page() {
        let mut hmi = test_hmi();
        hmi.enter_mode(Mode::Navigation);
        hmi.navigation.snapshots.rewindow(16);
        hmi.navigation.snapshots.set_name(16, "Snap 16");
        hmi.navigation.snapshots.hover = 16;
        hmi.host.sent.clear();

        hmi.navigation_up();

        assert_eq!("snapshots 0", hmi.host.sent[0].as_str());
        assert_eq!(0, hmi.navigation.snapshots.window_start);
    }

    #[test]
    fn loading_the_hovered_snapshot_should_send_and_select() {
        let mut hmi = test_hmi();
        hmi.set_snapshot_name(0, "Clean");
        hmi.set_snapshot_name(1, "Lead");
        hmi.enter_mode(Mode::Navigation);
        hmi.navigation.snapshots.hover = 1;
        hmi.host.sent.clear();

        hmi.navigation_enter();

        assert_eq!("snapshot_load 1", hmi.host.sent[0].as_str());
        assert_eq!(Some(1), hmi.navigation.snapshots.selected);
    }

    #[test]
    fn empty_list_should_not_send_a_load() {
        let mut hmi = test_hmi();
        hmi.enter_mode(Mode::Navigation);
        hmi.host.sent.clear();

        hmi.navigation_enter();
        assert!(hmi.host.sent.is_empty());
    }

    #[test]
    fn committing_a_bank_should_browse_its_pedalboards() {
        let mut hmi = test_hmi();
        hmi.set_bank_name(0, "Factory");
        hmi.set_bank_name(1, "Road");
        hmi.enter_mode(Mode::Navigation);
        hmi.navigation.target = NavigationTarget::Banks;
        hmi.navigation.banks.hover = 1;
        hmi.host.sent.clear();

        hmi.navigation_enter();

        assert_eq!(Some(1), hmi.navigation.banks.selected);
        assert_eq!(NavigationTarget::Pedalboards, hmi.navigation.target);
        assert_eq!("pedalboards 1 0", hmi.host.sent[0].as_str());
    }

    #[test]
    fn target_toggle_should_cycle_through_all_three_lists() {
        let mut hmi = test_hmi();
        assert_eq!(NavigationTarget::Snapshots, hmi.navigation.target);
        hmi.toggle_navigation_target();
        assert_eq!(NavigationTarget::Pedalboards, hmi.navigation.target);
        hmi.toggle_navigation_target();
        assert_eq!(NavigationTarget::Banks, hmi.navigation.target);
        hmi.toggle_navigation_target();
        assert_eq!(NavigationTarget::Snapshots, hmi.navigation.target);
    }

    #[test]
    fn initial_state_should_seed_every_selection() {
        let mut hmi = test_hmi();
        let tokens = Tokens::from_line("initial_state 2 5 1 BigRig 3 Clean Tone");

        hmi.initial_state(&tokens);

        assert_eq!(Some(2), hmi.navigation.banks.selected);
        assert_eq!(2, hmi.navigation.banks.hover);
        assert_eq!(Some(5), hmi.navigation.pedalboards.selected);
        assert_eq!(Some(1), hmi.navigation.snapshots.selected);
        assert_eq!("Clean Tone", hmi.navigation.snapshots.names[1].as_str());
    }

    #[test]
    fn snapshot_rename_from_host_should_update_the_list() {
        let mut hmi = test_hmi();
        hmi.set_snapshot_name(0, "Clean");
        hmi.set_snapshot_name(0, "Crunch");
        assert_eq!("Crunch", hmi.navigation.snapshots.names[0].as_str());
    }

    #[test]
    fn pedalboard_change_should_move_selection_and_hover() {
        let mut hmi = test_hmi();
        hmi.navigation.pedalboards.set_name(0, "One");
        hmi.navigation.pedalboards.set_name(1, "Two");

        hmi.pedalboard_changed(1);

        assert_eq!(Some(1), hmi.navigation.pedalboards.selected);
        assert_eq!(1, hmi.navigation.pedalboards.hover);
    }
}
