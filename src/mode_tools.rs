//! Tools: the settings menu tree and the dedicated tuner / tempo-sync
//! screens. The menu is a static table of typed nodes linked by parent
//! id; child lookups scan the table, which stays cheap at this size.
//!
//! Root nodes show a scrolling list of their children. Main nodes bind
//! their first three children to the three encoders as a fixed page.
//! Confirm nodes toggle a small self-contained yes/no modal instead of
//! going through the popup component.

use core::fmt::Write as _;

use heapless::{String, Vec};

use crate::naveg::{Hmi, Mode};
use crate::protocol::cmd;
use crate::{Eeprom, Host, Leds, Screen, ENCODERS_COUNT};

const MENU_MAX_ITEMS: usize = 8;
const MENU_VALUE_SLOTS: usize = 8;

/// Value multiplier applied while the adjusting encoder is held down.
const HELD_STEP_MULTIPLIER: i32 = 10;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NodeKind {
    Root,
    Main,
    Tool,
    Confirm,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MenuAction {
    None,
    SetContrast,
    SetBrightness,
    SetLedBrightness,
    SetClickList,
    SetDefaultTool,
    LaunchTuner,
    LaunchSync,
    FactoryReset,
    /// Firmware-update placeholder; sibling navigation refuses to move
    /// onto it.
    UpdateSentinel,
}

pub struct MenuNode {
    pub id: u16,
    pub parent: u16,
    pub kind: NodeKind,
    pub label: &'static str,
    pub action: MenuAction,
    pub needs_update: bool,
}

const ROOT_ID: u16 = 0;

static MENU_TABLE: &[MenuNode] = &[
    MenuNode {
        id: ROOT_ID,
        parent: ROOT_ID,
        kind: NodeKind::Root,
        label: "SETTINGS",
        action: MenuAction::None,
        needs_update: false,
    },
    MenuNode {
        id: 1,
        parent: ROOT_ID,
        kind: NodeKind::Main,
        label: "DISPLAY",
        action: MenuAction::None,
        needs_update: false,
    },
    MenuNode {
        id: 2,
        parent: ROOT_ID,
        kind: NodeKind::Main,
        label: "HARDWARE",
        action: MenuAction::None,
        needs_update: false,
    },
    MenuNode {
        id: 3,
        parent: ROOT_ID,
        kind: NodeKind::Tool,
        label: "TUNER",
        action: MenuAction::LaunchTuner,
        needs_update: false,
    },
    MenuNode {
        id: 4,
        parent: ROOT_ID,
        kind: NodeKind::Tool,
        label: "TEMPO",
        action: MenuAction::LaunchSync,
        needs_update: false,
    },
    MenuNode {
        id: 5,
        parent: ROOT_ID,
        kind: NodeKind::Confirm,
        label: "FACTORY RESET",
        action: MenuAction::FactoryReset,
        needs_update: false,
    },
    MenuNode {
        id: 9,
        parent: ROOT_ID,
        kind: NodeKind::Main,
        label: "UPDATE",
        action: MenuAction::UpdateSentinel,
        needs_update: false,
    },
    MenuNode {
        id: 11,
        parent: 1,
        kind: NodeKind::Tool,
        label: "CONTRAST",
        action: MenuAction::SetContrast,
        needs_update: true,
    },
    MenuNode {
        id: 12,
        parent: 1,
        kind: NodeKind::Tool,
        label: "BRIGHTNESS",
        action: MenuAction::SetBrightness,
        needs_update: true,
    },
    MenuNode {
        id: 21,
        parent: 2,
        kind: NodeKind::Tool,
        label: "LED BRIGHTNESS",
        action: MenuAction::SetLedBrightness,
        needs_update: true,
    },
    MenuNode {
        id: 22,
        parent: 2,
        kind: NodeKind::Tool,
        label: "CLICK LIST",
        action: MenuAction::SetClickList,
        needs_update: true,
    },
    MenuNode {
        id: 23,
        parent: 2,
        kind: NodeKind::Tool,
        label: "DEFAULT TOOL",
        action: MenuAction::SetDefaultTool,
        needs_update: true,
    },
];

fn node_by_id(id: u16) -> Option<&'static MenuNode> {
    MENU_TABLE.iter().find(|node| node.id == id)
}

fn children_of(id: u16) -> impl Iterator<Item = &'static MenuNode> {
    MENU_TABLE
        .iter()
        .filter(move |node| node.parent == id && node.id != id)
}

#[derive(Clone, Copy)]
pub struct MenuItem {
    pub label: &'static str,
    pub value: i32,
    pub has_value: bool,
}

/// What the display draws for the menu: either a scrolling list (Root)
/// or a fixed three-slot encoder page (Main).
pub struct MenuPage {
    pub title: &'static str,
    pub items: Vec<MenuItem, MENU_MAX_ITEMS>,
    pub hover: u8,
    pub fixed_slots: bool,
    pub confirm_active: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Tool {
    Tuner,
    Sync,
}

pub struct TunerState {
    pub freq: f32,
    pub note: String<4>,
    pub cents: i32,
    pub mute: bool,
    pub input: u8,
    pub ref_freq: u16,
}

#[derive(Clone, Copy)]
pub struct SyncState {
    pub bpm: f32,
    pub beats_per_bar: u8,
    pub playing: bool,
}

pub struct ToolsMode {
    pub tuner: TunerState,
    pub sync: SyncState,
    pub current_tool: Tool,
    pub node: u16,
    pub hover: u8,
    pub confirm_active: bool,
    pub encoder_pressed: [bool; ENCODERS_COUNT],
    /// Host-owned menu values keyed by item id.
    pub host_values: Vec<(u16, i32), MENU_VALUE_SLOTS>,
    sync_tap_last_ms: Option<u32>,
}

impl ToolsMode {
    pub fn new() -> ToolsMode {
        ToolsMode {
            tuner: TunerState {
                freq: 0.0,
                note: String::new(),
                cents: 0,
                mute: false,
                input: 0,
                ref_freq: 440,
            },
            sync: SyncState {
                bpm: 120.0,
                beats_per_bar: 4,
                playing: false,
            },
            current_tool: Tool::Tuner,
            node: ROOT_ID,
            hover: 0,
            confirm_active: false,
            encoder_pressed: [false; ENCODERS_COUNT],
            host_values: Vec::new(),
            sync_tap_last_ms: None,
        }
    }
}

impl Default for ToolsMode {
    fn default() -> Self {
        ToolsMode::new()
    }
}

impl<S: Screen, L: Leds, H: Host, E: Eeprom> Hmi<S, L, H, E> {
    pub(crate) fn enter_tool_menu(&mut self) {
        self.tools.node = ROOT_ID;
        self.tools.hover = 0;
        self.tools.confirm_active = false;
        self.tools.encoder_pressed = [false; ENCODERS_COUNT];
        self.redraw_tool_menu();
    }

    pub(crate) fn redraw_tool_menu(&mut self) {
        let page = self.build_menu_page();
        self.screen.clear();
        self.screen.menu_page(&page);
    }

    fn build_menu_page(&self) -> MenuPage {
        let node = node_by_id(self.tools.node).unwrap_or(&MENU_TABLE[0]);
        let mut items = Vec::new();
        match node.kind {
            NodeKind::Main => {
                for child in children_of(node.id).take(ENCODERS_COUNT) {
                    let _ = items.push(MenuItem {
                        label: child.label,
                        value: self.menu_value(child),
                        has_value: true,
                    });
                }
            }
            _ => {
                for child in children_of(node.id) {
                    let _ = items.push(MenuItem {
                        label: child.label,
                        value: 0,
                        has_value: false,
                    });
                }
            }
        }
        MenuPage {
            title: node.label,
            items,
            hover: self.tools.hover,
            fixed_slots: node.kind == NodeKind::Main,
            confirm_active: self.tools.confirm_active,
        }
    }

    fn menu_value(&self, node: &MenuNode) -> i32 {
        if let Some((_, value)) = self
            .tools
            .host_values
            .iter()
            .find(|(id, _)| *id == node.id)
        {
            return *value;
        }
        match node.action {
            MenuAction::SetContrast => self.settings.display_contrast as i32,
            MenuAction::SetBrightness => self.settings.display_brightness as i32,
            MenuAction::SetLedBrightness => self.settings.led_brightness as i32,
            MenuAction::SetClickList => self.settings.click_list_behavior as i32,
            MenuAction::SetDefaultTool => self.settings.default_tool as i32,
            _ => 0,
        }
    }

    fn adjust_menu_value(&mut self, action: MenuAction, delta: i32) {
        match action {
            MenuAction::SetContrast => {
                let value = (self.settings.display_contrast as i32 + delta).clamp(0, 255);
                self.settings.set_display_contrast(value as u8);
            }
            MenuAction::SetBrightness => {
                let value = (self.settings.display_brightness as i32 + delta).clamp(0, 4);
                self.settings.set_display_brightness(value as u8);
            }
            MenuAction::SetLedBrightness => {
                let value = (self.settings.led_brightness as i32 + delta).clamp(0, 100);
                self.settings.set_led_brightness(value as u8);
            }
            MenuAction::SetClickList => {
                let value = (self.settings.click_list_behavior as i32 + delta).clamp(0, 1);
                self.settings.set_click_list_behavior(value as u8);
            }
            MenuAction::SetDefaultTool => {
                let value = (self.settings.default_tool as i32 + delta).clamp(0, 1);
                self.settings.set_default_tool(value as u8);
            }
            _ => {}
        }
    }

    pub(crate) fn tool_menu_enter(&mut self) {
        let node = self.tools.node;
        if self.tools.confirm_active {
            self.tools.confirm_active = false;
            if let Some(current) = node_by_id(node) {
                self.run_confirm_action(current.action);
            }
            self.tools.node = ROOT_ID;
            self.redraw_tool_menu();
            return;
        }

        let Some(current) = node_by_id(node) else {
            return;
        };
        if current.kind != NodeKind::Root {
            return;
        }
        let Some(child) = children_of(node).nth(self.tools.hover as usize) else {
            return;
        };
        match child.kind {
            NodeKind::Main => {
                if child.action == MenuAction::UpdateSentinel {
                    return;
                }
                self.tools.node = child.id;
                self.tools.hover = 0;
                self.redraw_tool_menu();
            }
            NodeKind::Tool => match child.action {
                MenuAction::LaunchTuner => {
                    self.mode = Mode::ToolFoot;
                    self.launch_tool(Tool::Tuner);
                }
                MenuAction::LaunchSync => {
                    self.mode = Mode::ToolFoot;
                    self.launch_tool(Tool::Sync);
                }
                _ => {}
            },
            NodeKind::Confirm => {
                self.tools.node = child.id;
                self.tools.confirm_active = true;
                self.redraw_tool_menu();
            }
            NodeKind::Root => {}
        }
    }

    fn run_confirm_action(&mut self, action: MenuAction) {
        if action == MenuAction::FactoryReset {
            self.settings.set_display_contrast(127);
            self.settings.set_display_brightness(2);
            self.settings.set_led_brightness(50);
            self.settings.set_click_list_behavior(0);
            self.settings.set_default_tool(0);
        }
    }

    pub(crate) fn tool_menu_up(&mut self, encoder: u8) {
        self.tool_menu_scroll(encoder, -1);
    }

    pub(crate) fn tool_menu_down(&mut self, encoder: u8) {
        self.tool_menu_scroll(encoder, 1);
    }

    fn tool_menu_scroll(&mut self, encoder: u8, direction: i32) {
        if self.tools.confirm_active {
            return;
        }
        let Some(node) = node_by_id(self.tools.node) else {
            return;
        };
        match node.kind {
            NodeKind::Root => {
                let count = children_of(node.id).count() as i32;
                let hover = (self.tools.hover as i32 + direction).clamp(0, count.max(1) - 1);
                self.tools.hover = hover as u8;
                self.redraw_tool_menu();
            }
            NodeKind::Main => {
                let Some(child) = children_of(node.id).nth(encoder as usize) else {
                    return;
                };
                let delta = if self.tools.encoder_pressed[encoder as usize] {
                    direction * HELD_STEP_MULTIPLIER
                } else {
                    direction
                };
                self.adjust_menu_value(child.action, delta);
                self.redraw_tool_menu();
            }
            _ => {}
        }
    }

    pub(crate) fn tool_menu_encoder_pressed(&mut self, encoder: u8) {
        if let Some(pressed) = self.tools.encoder_pressed.get_mut(encoder as usize) {
            *pressed = true;
        }
    }

    pub(crate) fn tool_menu_encoder_released(&mut self, encoder: u8) {
        if let Some(pressed) = self.tools.encoder_pressed.get_mut(encoder as usize) {
            *pressed = false;
        }
    }

    /// Prev/next between Main pages under the same parent. The update
    /// sentinel blocks further movement in its direction.
    pub(crate) fn tool_menu_sibling(&mut self, slot: u8) {
        match slot {
            2 => {
                self.tools.node = ROOT_ID;
                self.tools.hover = 0;
                self.tools.confirm_active = false;
                self.redraw_tool_menu();
                return;
            }
            0 | 1 => {}
            _ => return,
        }
        let Some(current) = node_by_id(self.tools.node) else {
            return;
        };
        if current.kind != NodeKind::Main {
            return;
        }
        let siblings: Vec<&'static MenuNode, MENU_MAX_ITEMS> = children_of(current.parent)
            .filter(|node| node.kind == NodeKind::Main)
            .collect();
        let Some(position) = siblings.iter().position(|node| node.id == current.id) else {
            return;
        };
        let target = if slot == 1 {
            position + 1
        } else if position > 0 {
            position - 1
        } else {
            return;
        };
        let Some(target) = siblings.get(target) else {
            return;
        };
        if target.action == MenuAction::UpdateSentinel {
            return;
        }
        self.tools.node = target.id;
        self.tools.hover = 0;
        self.redraw_tool_menu();
    }

    pub(crate) fn tool_menu_foot(&mut self, foot: u8) {
        match foot {
            0 | 1 => self.tool_menu_sibling(foot),
            2 => self.enter_mode(Mode::Control),
            _ => {}
        }
    }

    /// Host pushed a new value for a host-owned menu item.
    pub fn update_menu_value(&mut self, id: u16, value: i32) {
        if let Some(entry) = self
            .tools
            .host_values
            .iter_mut()
            .find(|(item, _)| *item == id)
        {
            entry.1 = value;
        } else {
            let _ = self.tools.host_values.push((id, value));
        }
        if self.mode == Mode::ToolMenu {
            self.redraw_tool_menu();
        }
    }

    /*
     * dedicated tool screens
     */

    pub(crate) fn launch_tool(&mut self, tool: Tool) {
        self.tools.current_tool = tool;
        if tool == Tool::Tuner {
            self.host.send(cmd::TUNER_ON);
        }
        self.redraw_tool_screen();
    }

    pub(crate) fn enter_tool_screen(&mut self) {
        self.redraw_tool_screen();
    }

    pub(crate) fn redraw_tool_screen(&mut self) {
        self.screen.clear();
        match self.tools.current_tool {
            Tool::Tuner => self.screen.tuner(&self.tools.tuner),
            Tool::Sync => self.screen.sync(&self.tools.sync),
        }
    }

    pub(crate) fn tool_screen_enter(&mut self, _encoder: u8) {
        match self.tools.current_tool {
            Tool::Tuner => self.toggle_tuner_input(),
            Tool::Sync => self.toggle_sync_playing(),
        }
    }

    pub(crate) fn tool_screen_up(&mut self, _encoder: u8) {
        match self.tools.current_tool {
            Tool::Tuner => self.nudge_tuner_ref_freq(-1),
            Tool::Sync => self.nudge_sync_bpm(-1.0),
        }
    }

    pub(crate) fn tool_screen_down(&mut self, _encoder: u8) {
        match self.tools.current_tool {
            Tool::Tuner => self.nudge_tuner_ref_freq(1),
            Tool::Sync => self.nudge_sync_bpm(1.0),
        }
    }

    pub(crate) fn tool_screen_foot(&mut self, foot: u8, pressed: bool) {
        if !pressed {
            return;
        }
        match (self.tools.current_tool, foot) {
            (Tool::Tuner, 0) => self.toggle_tuner_mute(),
            (Tool::Tuner, 1) => self.toggle_tuner_input(),
            (Tool::Sync, 0) => self.toggle_sync_playing(),
            (Tool::Sync, 1) => self.sync_tap(),
            (_, 2) => {
                if self.tools.current_tool == Tool::Tuner {
                    self.host.send(cmd::TUNER_OFF);
                }
                self.enter_mode(Mode::Control);
            }
            _ => {}
        }
    }

    fn toggle_tuner_mute(&mut self) {
        self.tools.tuner.mute = !self.tools.tuner.mute;
        let mut line: String<24> = String::new();
        let _ = write!(line, "{} {}", cmd::TUNER_MUTE, self.tools.tuner.mute as u8);
        self.host.send(&line);
        self.redraw_tool_screen();
    }

    fn toggle_tuner_input(&mut self) {
        self.tools.tuner.input = 1 - self.tools.tuner.input;
        let mut line: String<24> = String::new();
        let _ = write!(
            line,
            "{} {}",
            cmd::TUNER_INPUT_SET,
            self.tools.tuner.input + 1
        );
        self.host.send(&line);
        self.redraw_tool_screen();
    }

    fn nudge_tuner_ref_freq(&mut self, delta: i32) {
        let freq = (self.tools.tuner.ref_freq as i32 + delta).clamp(420, 460);
        self.tools.tuner.ref_freq = freq as u16;
        self.redraw_tool_screen();
    }

    fn toggle_sync_playing(&mut self) {
        self.tools.sync.playing = !self.tools.sync.playing;
        self.redraw_tool_screen();
    }

    /// Tap on the sync screen derives the bpm from the press interval.
    fn sync_tap(&mut self) {
        let now = self.now_ms;
        if let Some(last) = self.tools.sync_tap_last_ms {
            let delta = now.wrapping_sub(last);
            if delta > 0 && delta <= 3000 {
                self.tools.sync.bpm = (60_000.0 / delta as f32).clamp(20.0, 280.0);
                self.redraw_tool_screen();
            }
        }
        self.tools.sync_tap_last_ms = Some(now);
    }

    fn nudge_sync_bpm(&mut self, delta: f32) {
        self.tools.sync.bpm = (self.tools.sync.bpm + delta).clamp(20.0, 280.0);
        self.redraw_tool_screen();
    }

    /*
     * host pushes
     */

    pub fn tuner_update(&mut self, freq: f32, note: &str, cents: i32) {
        self.tools.tuner.freq = freq;
        self.tools.tuner.cents = cents;
        self.tools.tuner.note.clear();
        for c in note.chars() {
            if self.tools.tuner.note.push(c).is_err() {
                break;
            }
        }
        if self.mode == Mode::ToolFoot && self.tools.current_tool == Tool::Tuner {
            self.screen.tuner(&self.tools.tuner);
        }
    }

    pub fn tuner_set_input(&mut self, input: u8) {
        self.tools.tuner.input = input.min(1);
        if self.mode == Mode::ToolFoot && self.tools.current_tool == Tool::Tuner {
            self.redraw_tool_screen();
        }
    }

    pub fn tuner_set_ref_freq(&mut self, freq: u16) {
        self.tools.tuner.ref_freq = freq;
        if self.mode == Mode::ToolFoot && self.tools.current_tool == Tool::Tuner {
            self.redraw_tool_screen();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::naveg::tests::test_hmi;

    #[test]
    fn entering_the_menu_should_list_the_root_children() {
        let mut hmi = test_hmi();
        hmi.enter_mode(Mode::ToolMenu);

        let page = hmi.build_menu_page();
        assert!(!page.fixed_slots);
        assert_eq!("DISPLAY", page.items[0].label);
        assert_eq!("HARDWARE", page.items[1].label);
    }

    #[test]
    fn entering_a_main_node_should_show_a_fixed_value_page() {
        let mut hmi = test_hmi();
        hmi.enter_mode(Mode::ToolMenu);
        hmi.tool_menu_enter();

        let page = hmi.build_menu_page();
        assert!(page.fixed_slots);
        assert_eq!("CONTRAST", page.items[0].label);
        assert!(page.items[0].has_value);
        assert_eq!(127, page.items[0].value);
    }

    #[test]
    fn turning_an_encoder_on_a_value_page_should_write_through() {
        let mut hmi = test_hmi();
        hmi.enter_mode(Mode::ToolMenu);
        hmi.tool_menu_enter();

        hmi.tool_menu_down(0);
        assert_eq!(128, hmi.settings.display_contrast);
    }

    #[test]
    fn held_encoder_should_step_ten_at_a_time() {
        let mut hmi = test_hmi();
        hmi.enter_mode(Mode::ToolMenu);
        hmi.tool_menu_enter();

        hmi.tool_menu_encoder_pressed(0);
        hmi.tool_menu_down(0);
        assert_eq!(137, hmi.settings.display_contrast);

        hmi.tool_menu_encoder_released(0);
        hmi.tool_menu_down(0);
        assert_eq!(138, hmi.settings.display_contrast);
    }

    #[test]
    fn sibling_navigation_should_refuse_the_update_sentinel() {
        let mut hmi = test_hmi();
        hmi.enter_mode(Mode::ToolMenu);
        hmi.tool_menu_enter();
        assert_eq!(1, hmi.tools.node);

        hmi.tool_menu_sibling(1);
        assert_eq!(2, hmi.tools.node);

        // next sibling is the update sentinel, movement stops here
        hmi.tool_menu_sibling(1);
        assert_eq!(2, hmi.tools.node);
    }

    #[test]
    fn confirm_node_should_toggle_its_own_modal() {
        let mut hmi = test_hmi();
        hmi.settings.set_display_contrast(200);
        hmi.enter_mode(Mode::ToolMenu);
        hmi.tools.hover = 4;

        hmi.tool_menu_enter();
        assert!(hmi.tools.confirm_active);

        hmi.tool_menu_enter();
        assert!(!hmi.tools.confirm_active);
        assert_eq!(127, hmi.settings.display_contrast);
    }

    #[test]
    fn host_pushed_menu_values_should_shadow_local_ones() {
        let mut hmi = test_hmi();
        hmi.update_menu_value(11, 42);
        hmi.enter_mode(Mode::ToolMenu);
        hmi.tool_menu_enter();

        let page = hmi.build_menu_page();
        assert_eq!(42, page.items[0].value);
    }

    #[test]
    fn launching_the_tuner_should_notify_the_host() {
        let mut hmi = test_hmi();
        hmi.mode = Mode::ToolFoot;
        hmi.launch_tool(Tool::Tuner);
        assert!(hmi.host.sent.iter().any(|l| l == "tuner_on"));
    }

    #[test]
    fn tuner_mute_foot_should_toggle_and_report() {
        let mut hmi = test_hmi();
        hmi.mode = Mode::ToolFoot;
        hmi.launch_tool(Tool::Tuner);
        hmi.host.sent.clear();

        hmi.tool_screen_foot(0, true);
        assert!(hmi.tools.tuner.mute);
        assert_eq!("tuner_mute 1", hmi.host.sent[0].as_str());
    }

    #[test]
    fn leaving_the_tuner_should_turn_it_off() {
        let mut hmi = test_hmi();
        hmi.mode = Mode::ToolFoot;
        hmi.launch_tool(Tool::Sync);
        hmi.tools.current_tool = Tool::Tuner;
        hmi.host.sent.clear();

        hmi.tool_screen_foot(2, true);
        assert!(hmi.host.sent.iter().any(|l| l == "tuner_off"));
        assert_eq!(Mode::Control, hmi.mode);
    }

    #[test]
    fn tuner_telemetry_should_update_state() {
        let mut hmi = test_hmi();
        hmi.tuner_update(440.2, "A", 3);
        assert_eq!("A", hmi.tools.tuner.note.as_str());
        assert_eq!(3, hmi.tools.tuner.cents);
    }
}
