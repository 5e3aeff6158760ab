//! Line-based text command router shared by both serial hosts. Commands
//! are registered once at startup; matching is a linear first-partial-match
//! scan in registration order, with `%`-prefixed template tokens acting as
//! wildcards and a trailing `...` accepting a variadic tail. The match rule
//! is deliberately partial-credit rather than exact: an earlier template
//! that shares a first token can shadow a later, fuller match, and host
//! command sets rely on that ordering.

use core::fmt::Write;

use heapless::{String, Vec};

use crate::control::{Control, LABEL_SIZE};
use crate::mode_navigation::LIST_NAME_SIZE;
use crate::naveg::Hmi;
use crate::{Eeprom, Host, Leds, Screen};

pub const RESPONSE_SIZE: usize = 32;
pub const MAX_TOKENS: usize = 40;
const MAX_TEMPLATE_TOKENS: usize = 16;
const MAX_COMMANDS: usize = 32;

/// Bounded response buffer; over-long replies truncate, documented
/// behavior of the wire contract.
pub type Response = String<RESPONSE_SIZE>;

/// Command names and argument templates. The same name constant is used
/// for matching inbound lines and composing outbound ones.
pub mod cmd {
    pub const PING: &str = "ping";
    pub const GUI_CONNECTED: &str = "ui_con";
    pub const GUI_DISCONNECTED: &str = "ui_dis";
    pub const CONTROL_ADD: &str = "control_add %i %s %i %s %f %f %f %i %i %i %i ...";
    pub const CONTROL_REMOVE: &str = "control_rm %i ...";
    pub const CONTROL_SET: &str = "control_set %i %f";
    pub const CONTROL_GET: &str = "control_get %i";
    pub const CONTROL_PAGE: &str = "control_page %i %i";
    pub const INITIAL_STATE: &str = "initial_state %i %i %i %s %i %s ...";
    pub const TUNER: &str = "tuner %f %s %i";
    pub const TUNER_INPUT: &str = "tuner_input %i";
    pub const TUNER_REF_FREQ: &str = "tuner_ref_freq %i";
    pub const RESPONSE: &str = "resp %i ...";
    pub const RESTORE: &str = "restore";
    pub const BOOT: &str = "boot %i %i %s";
    pub const MENU_ITEM_CHANGE: &str = "menu_item_change %i %i ...";
    pub const PEDALBOARD_CLEAR: &str = "pedalboard_clear";
    pub const PEDALBOARD_NAME_SET: &str = "pedalboard_name_set ...";
    pub const PEDALBOARD_CHANGE: &str = "pedalboard_change %i";
    pub const SNAPSHOT_NAME_SET: &str = "snapshot_name_set %i ...";
    pub const BANK_NAME_SET: &str = "bank_name_set %i ...";
    pub const PAGES_AVAILABLE: &str = "pages_available %i %i %i %i %i %i %i %i";
    pub const SYS_CHANGE_NAME: &str = "sys_change_name %i %s ...";
    pub const SYS_CHANGE_UNIT: &str = "sys_change_unit %i %s";
    pub const SYS_CHANGE_VALUE: &str = "sys_change_value %i %f";
    pub const SYS_LAUNCH_POPUP: &str = "sys_launch_popup %i";

    // outbound-only commands
    pub const NEXT_PAGE: &str = "next_page";
    pub const ENCODER_PAGE: &str = "encoder_page";
    pub const SNAPSHOT_SAVE: &str = "snapshot_save";
    pub const SNAPSHOT_SAVE_AS: &str = "snapshot_save_as";
    pub const SNAPSHOT_DELETE: &str = "snapshot_delete";
    pub const PEDALBOARD_SAVE: &str = "pedalboard_save";
    pub const PEDALBOARD_SAVE_AS: &str = "pedalboard_save_as";
    pub const PEDALBOARD_DELETE: &str = "pedalboard_delete";
    pub const BANK_NEW: &str = "bank_new";
    pub const BANK_DELETE: &str = "bank_delete";
    // list requests carry the window start, pedalboards also the bank:
    // `banks <start>` / `snapshots <start>` / `pedalboards <bank> <start>`
    pub const BANKS: &str = "banks";
    pub const PEDALBOARDS: &str = "pedalboards";
    pub const SNAPSHOTS: &str = "snapshots";
    pub const PEDALBOARD_LOAD: &str = "pedalboard_load";
    pub const SNAPSHOT_LOAD: &str = "snapshot_load";
    pub const TUNER_ON: &str = "tuner_on";
    pub const TUNER_OFF: &str = "tuner_off";
    pub const TUNER_MUTE: &str = "tuner_mute";
    pub const TUNER_INPUT_SET: &str = "tuner_input_set";

    /// First token of a template: the bare command word.
    pub fn word(template: &str) -> &str {
        template.split(' ').next().unwrap_or(template)
    }
}

/// Page-request bitmask bits.
pub const PAGINATION_PAGE_UP: u8 = 0x01;
pub const PAGINATION_WRAP_AROUND: u8 = 0x02;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Sender {
    WebGui,
    System,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProtocolError {
    CommandNotFound,
    ManyArguments,
    FewArguments,
    InvalidArgument,
}

impl ProtocolError {
    /// The four fixed error strings of the wire contract.
    pub fn as_wire(self) -> &'static str {
        match self {
            ProtocolError::CommandNotFound => "resp -1",
            ProtocolError::ManyArguments => "resp -2",
            ProtocolError::FewArguments => "resp -3",
            ProtocolError::InvalidArgument => "resp -4",
        }
    }
}

/// Tokenized view of one received line. Index 0 is the command word.
pub struct Tokens<'a> {
    list: Vec<&'a str, MAX_TOKENS>,
}

impl<'a> Tokens<'a> {
    pub fn from_line(line: &'a str) -> Tokens<'a> {
        let mut list = Vec::new();
        for token in line.split_ascii_whitespace() {
            if list.push(token).is_err() {
                break;
            }
        }
        Tokens { list }
    }

    pub fn len(&self) -> usize {
        self.list.len()
    }

    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&'a str> {
        self.list.get(index).copied()
    }

    pub fn int(&self, index: usize) -> Result<i32, ProtocolError> {
        self.get(index)
            .and_then(|t| t.parse().ok())
            .ok_or(ProtocolError::InvalidArgument)
    }

    pub fn float(&self, index: usize) -> Result<f32, ProtocolError> {
        self.get(index)
            .and_then(|t| t.parse().ok())
            .ok_or(ProtocolError::InvalidArgument)
    }

    pub fn str_arg(&self, index: usize) -> Result<&'a str, ProtocolError> {
        self.get(index).ok_or(ProtocolError::InvalidArgument)
    }

    /// All tokens from `start` onwards.
    pub fn tail(&self, start: usize) -> &[&'a str] {
        self.list.get(start..).unwrap_or(&[])
    }

    /// Tail tokens re-joined with single spaces, for name payloads.
    pub fn join_tail<const N: usize>(&self, start: usize) -> String<N> {
        let mut out = String::new();
        for (i, token) in self.tail(start).iter().enumerate() {
            if i > 0 && out.push(' ').is_err() {
                break;
            }
            if out.push_str(token).is_err() {
                break;
            }
        }
        out
    }
}

pub fn respond(response: &mut Response, status: i32) {
    response.clear();
    let _ = write!(response, "resp {}", status);
}

type Handler<S, L, H, E> = fn(&mut Hmi<S, L, H, E>, Sender, &Tokens<'_>, &mut Response);

struct CommandEntry<S, L, H, E> {
    tokens: Vec<&'static str, MAX_TEMPLATE_TOKENS>,
    handler: Handler<S, L, H, E>,
}

pub struct CommandRouter<S, L, H, E> {
    commands: Vec<CommandEntry<S, L, H, E>, MAX_COMMANDS>,
}

impl<S: Screen, L: Leds, H: Host, E: Eeprom> CommandRouter<S, L, H, E> {
    pub fn new() -> CommandRouter<S, L, H, E> {
        CommandRouter {
            commands: Vec::new(),
        }
    }

    /// Registers every command the firmware understands, in priority
    /// order.
    pub fn with_default_commands() -> CommandRouter<S, L, H, E> {
        let mut router = CommandRouter::new();
        router.add_command(cmd::PING, cb_ping);
        router.add_command(cmd::GUI_CONNECTED, cb_gui_connection);
        router.add_command(cmd::GUI_DISCONNECTED, cb_gui_connection);
        router.add_command(cmd::CONTROL_ADD, cb_control_add);
        router.add_command(cmd::CONTROL_REMOVE, cb_control_rm);
        router.add_command(cmd::CONTROL_SET, cb_control_set);
        router.add_command(cmd::CONTROL_GET, cb_control_get);
        router.add_command(cmd::INITIAL_STATE, cb_initial_state);
        router.add_command(cmd::TUNER, cb_tuner);
        router.add_command(cmd::TUNER_INPUT, cb_tuner_input);
        router.add_command(cmd::TUNER_REF_FREQ, cb_tuner_ref_freq);
        router.add_command(cmd::RESPONSE, cb_resp);
        router.add_command(cmd::RESTORE, cb_restore);
        router.add_command(cmd::BOOT, cb_boot);
        router.add_command(cmd::MENU_ITEM_CHANGE, cb_menu_item_changed);
        router.add_command(cmd::PEDALBOARD_CLEAR, cb_pedalboard_clear);
        router.add_command(cmd::PEDALBOARD_NAME_SET, cb_pedalboard_name);
        router.add_command(cmd::PEDALBOARD_CHANGE, cb_pedalboard_change);
        router.add_command(cmd::SNAPSHOT_NAME_SET, cb_snapshot_name);
        router.add_command(cmd::BANK_NAME_SET, cb_bank_name);
        router.add_command(cmd::PAGES_AVAILABLE, cb_pages_available);
        router.add_command(cmd::SYS_CHANGE_NAME, cb_change_assignment_name);
        router.add_command(cmd::SYS_CHANGE_UNIT, cb_change_assignment_unit);
        router.add_command(cmd::SYS_CHANGE_VALUE, cb_change_assignment_value);
        router.add_command(cmd::SYS_LAUNCH_POPUP, cb_launch_popup);
        router
    }

    /// Registry overflow only happens from the fixed boot-time list, so it
    /// is a programming error and halts immediately.
    pub fn add_command(&mut self, template: &'static str, handler: Handler<S, L, H, E>) {
        let mut tokens = Vec::new();
        for token in template.split(' ') {
            if tokens.push(token).is_err() {
                panic!("command template too long");
            }
        }
        if self.commands.push(CommandEntry { tokens, handler }).is_err() {
            panic!("command registry full");
        }
    }

    /// Matches and dispatches one line. Returns the reply to hand back to
    /// the sender, if any.
    pub fn parse(
        &self,
        hmi: &mut Hmi<S, L, H, E>,
        sender: Sender,
        line: &str,
    ) -> Option<Response> {
        let tokens = Tokens::from_line(line);
        if tokens.is_empty() {
            return None;
        }

        let mut selected = None;
        for entry in &self.commands {
            let mut matches = 0usize;
            let mut variadic = false;
            let mut consumed = 0usize;

            for (i, template_token) in entry.tokens.iter().enumerate() {
                if i >= tokens.len() {
                    break;
                }
                consumed = i + 1;
                if *template_token == tokens.get(i).unwrap_or("") {
                    matches += 1;
                } else if matches > 0 {
                    if template_token.contains('%') {
                        matches += 1;
                    } else if *template_token == "..." {
                        matches += 1;
                        variadic = true;
                    }
                }
            }

            if matches == 0 {
                continue;
            }

            // an unconsumed trailing "..." still makes the entry variadic
            if consumed < entry.tokens.len() && entry.tokens[consumed] == "..." {
                variadic = true;
            }

            let required = entry.tokens.len() - variadic as usize;
            let error = if tokens.len() < required {
                Some(ProtocolError::FewArguments)
            } else if tokens.len() > entry.tokens.len() && !variadic {
                Some(ProtocolError::ManyArguments)
            } else if matches == tokens.len() || variadic {
                None
            } else {
                Some(ProtocolError::CommandNotFound)
            };

            // first partial match wins, no further scanning
            selected = Some((entry, error));
            break;
        }

        let Some((entry, error)) = selected else {
            let mut response = Response::new();
            let _ = response.push_str(ProtocolError::CommandNotFound.as_wire());
            return Some(response);
        };

        if let Some(error) = error {
            let mut response = Response::new();
            let _ = response.push_str(error.as_wire());
            return Some(response);
        }

        let mut response = Response::new();
        (entry.handler)(hmi, sender, &tokens, &mut response);
        if response.is_empty() {
            None
        } else {
            Some(response)
        }
    }
}

impl<S: Screen, L: Leds, H: Host, E: Eeprom> Default for CommandRouter<S, L, H, E> {
    fn default() -> Self {
        CommandRouter::with_default_commands()
    }
}

/*
 * command callbacks, thin shims into the mode state machines
 */

fn cb_ping<S: Screen, L: Leds, H: Host, E: Eeprom>(
    _hmi: &mut Hmi<S, L, H, E>,
    _sender: Sender,
    _tokens: &Tokens<'_>,
    response: &mut Response,
) {
    respond(response, 0);
}

fn cb_gui_connection<S: Screen, L: Leds, H: Host, E: Eeprom>(
    hmi: &mut Hmi<S, L, H, E>,
    _sender: Sender,
    tokens: &Tokens<'_>,
    response: &mut Response,
) {
    hmi.host.clear();
    hmi.ui_connection(tokens.get(0) == Some(cmd::GUI_CONNECTED));
    respond(response, 0);
}

fn cb_control_add<S: Screen, L: Leds, H: Host, E: Eeprom>(
    hmi: &mut Hmi<S, L, H, E>,
    _sender: Sender,
    tokens: &Tokens<'_>,
    response: &mut Response,
) {
    match Control::from_tokens(tokens.tail(1)) {
        Ok(control) => {
            hmi.add_control(control, true);
            respond(response, 0);
        }
        Err(_) => {
            let _ = response.push_str(ProtocolError::InvalidArgument.as_wire());
        }
    }
}

fn cb_control_rm<S: Screen, L: Leds, H: Host, E: Eeprom>(
    hmi: &mut Hmi<S, L, H, E>,
    _sender: Sender,
    tokens: &Tokens<'_>,
    response: &mut Response,
) {
    for token in tokens.tail(1) {
        if let Ok(hw_id) = token.parse::<u8>() {
            hmi.remove_control(hw_id);
        }
    }
    respond(response, 0);
}

fn cb_control_set<S: Screen, L: Leds, H: Host, E: Eeprom>(
    hmi: &mut Hmi<S, L, H, E>,
    _sender: Sender,
    tokens: &Tokens<'_>,
    response: &mut Response,
) {
    match (tokens.int(1), tokens.float(2)) {
        (Ok(hw_id), Ok(value)) => {
            hmi.set_control_value(hw_id as u8, value);
            respond(response, 0);
        }
        _ => {
            let _ = response.push_str(ProtocolError::InvalidArgument.as_wire());
        }
    }
}

fn cb_control_get<S: Screen, L: Leds, H: Host, E: Eeprom>(
    hmi: &mut Hmi<S, L, H, E>,
    _sender: Sender,
    tokens: &Tokens<'_>,
    response: &mut Response,
) {
    match tokens.int(1) {
        Ok(hw_id) => {
            let value = hmi.control_value(hw_id as u8);
            let _ = write!(response, "resp 0 {:.3}", value);
        }
        Err(error) => {
            let _ = response.push_str(error.as_wire());
        }
    }
}

fn cb_initial_state<S: Screen, L: Leds, H: Host, E: Eeprom>(
    hmi: &mut Hmi<S, L, H, E>,
    _sender: Sender,
    tokens: &Tokens<'_>,
    response: &mut Response,
) {
    hmi.initial_state(tokens);
    respond(response, 0);
}

fn cb_tuner<S: Screen, L: Leds, H: Host, E: Eeprom>(
    hmi: &mut Hmi<S, L, H, E>,
    _sender: Sender,
    tokens: &Tokens<'_>,
    response: &mut Response,
) {
    match (tokens.float(1), tokens.str_arg(2), tokens.int(3)) {
        (Ok(freq), Ok(note), Ok(cents)) => {
            hmi.tuner_update(freq, note, cents);
            respond(response, 0);
        }
        _ => {
            let _ = response.push_str(ProtocolError::InvalidArgument.as_wire());
        }
    }
}

fn cb_tuner_input<S: Screen, L: Leds, H: Host, E: Eeprom>(
    hmi: &mut Hmi<S, L, H, E>,
    _sender: Sender,
    tokens: &Tokens<'_>,
    response: &mut Response,
) {
    match tokens.int(1) {
        Ok(input @ 1..=2) => {
            hmi.tuner_set_input(input as u8 - 1);
            respond(response, 0);
        }
        _ => {
            let _ = response.push_str(ProtocolError::InvalidArgument.as_wire());
        }
    }
}

fn cb_tuner_ref_freq<S: Screen, L: Leds, H: Host, E: Eeprom>(
    hmi: &mut Hmi<S, L, H, E>,
    _sender: Sender,
    tokens: &Tokens<'_>,
    response: &mut Response,
) {
    match tokens.int(1) {
        Ok(freq) => {
            hmi.tuner_set_ref_freq(freq as u16);
            respond(response, 0);
        }
        Err(error) => {
            let _ = response.push_str(error.as_wire());
        }
    }
}

fn cb_resp<S: Screen, L: Leds, H: Host, E: Eeprom>(
    hmi: &mut Hmi<S, L, H, E>,
    _sender: Sender,
    tokens: &Tokens<'_>,
    _response: &mut Response,
) {
    if let Ok(status) = tokens.int(1) {
        hmi.host_response(status);
    }
}

fn cb_restore<S: Screen, L: Leds, H: Host, E: Eeprom>(
    hmi: &mut Hmi<S, L, H, E>,
    _sender: Sender,
    _tokens: &Tokens<'_>,
    response: &mut Response,
) {
    hmi.restore();
    respond(response, 0);
}

fn cb_boot<S: Screen, L: Leds, H: Host, E: Eeprom>(
    hmi: &mut Hmi<S, L, H, E>,
    _sender: Sender,
    tokens: &Tokens<'_>,
    response: &mut Response,
) {
    let tuner_mute = tokens.int(1).unwrap_or(0) != 0;
    let profile = tokens.int(2).unwrap_or(1) as u8;
    respond(response, 0);
    hmi.boot(tuner_mute, profile);
}

fn cb_menu_item_changed<S: Screen, L: Leds, H: Host, E: Eeprom>(
    hmi: &mut Hmi<S, L, H, E>,
    _sender: Sender,
    tokens: &Tokens<'_>,
    response: &mut Response,
) {
    let mut index = 1;
    while let (Ok(id), Ok(value)) = (tokens.int(index), tokens.int(index + 1)) {
        if id == 0 {
            break;
        }
        hmi.update_menu_value(id as u16, value);
        index += 2;
    }
    respond(response, 0);
}

fn cb_pedalboard_clear<S: Screen, L: Leds, H: Host, E: Eeprom>(
    hmi: &mut Hmi<S, L, H, E>,
    _sender: Sender,
    _tokens: &Tokens<'_>,
    response: &mut Response,
) {
    hmi.pedalboard_clear();
    respond(response, 0);
}

fn cb_pedalboard_name<S: Screen, L: Leds, H: Host, E: Eeprom>(
    hmi: &mut Hmi<S, L, H, E>,
    _sender: Sender,
    tokens: &Tokens<'_>,
    response: &mut Response,
) {
    let name: String<LIST_NAME_SIZE> = tokens.join_tail(1);
    hmi.set_pedalboard_name(&name);
    respond(response, 0);
}

fn cb_pedalboard_change<S: Screen, L: Leds, H: Host, E: Eeprom>(
    hmi: &mut Hmi<S, L, H, E>,
    _sender: Sender,
    tokens: &Tokens<'_>,
    response: &mut Response,
) {
    respond(response, 0);
    if let Ok(index) = tokens.int(1) {
        hmi.pedalboard_changed(index as u16);
    }
}

fn cb_snapshot_name<S: Screen, L: Leds, H: Host, E: Eeprom>(
    hmi: &mut Hmi<S, L, H, E>,
    _sender: Sender,
    tokens: &Tokens<'_>,
    response: &mut Response,
) {
    match tokens.int(1) {
        Ok(index) => {
            let name: String<LIST_NAME_SIZE> = tokens.join_tail(2);
            hmi.set_snapshot_name(index as u16, &name);
            respond(response, 0);
        }
        Err(error) => {
            let _ = response.push_str(error.as_wire());
        }
    }
}

fn cb_bank_name<S: Screen, L: Leds, H: Host, E: Eeprom>(
    hmi: &mut Hmi<S, L, H, E>,
    _sender: Sender,
    tokens: &Tokens<'_>,
    response: &mut Response,
) {
    match tokens.int(1) {
        Ok(index) => {
            let name: String<LIST_NAME_SIZE> = tokens.join_tail(2);
            hmi.set_bank_name(index as u16, &name);
            respond(response, 0);
        }
        Err(error) => {
            let _ = response.push_str(error.as_wire());
        }
    }
}

fn cb_pages_available<S: Screen, L: Leds, H: Host, E: Eeprom>(
    hmi: &mut Hmi<S, L, H, E>,
    _sender: Sender,
    tokens: &Tokens<'_>,
    response: &mut Response,
) {
    let mut pages = [false; crate::FOOTSWITCH_PAGES_COUNT];
    for (page, toggle) in pages.iter_mut().enumerate() {
        *toggle = tokens.int(1 + page).unwrap_or(0) != 0;
    }
    respond(response, 0);
    hmi.set_pages_available(pages);
}

fn cb_change_assignment_name<S: Screen, L: Leds, H: Host, E: Eeprom>(
    hmi: &mut Hmi<S, L, H, E>,
    sender: Sender,
    tokens: &Tokens<'_>,
    response: &mut Response,
) {
    if sender != Sender::System {
        return;
    }
    match tokens.int(1) {
        Ok(hw_id) => {
            let label: String<LABEL_SIZE> = tokens.join_tail(2);
            if hmi.rename_control(hw_id as u8, &label) {
                respond(response, 0);
            } else {
                let _ = response.push_str(ProtocolError::InvalidArgument.as_wire());
            }
        }
        Err(error) => {
            let _ = response.push_str(error.as_wire());
        }
    }
}

fn cb_change_assignment_unit<S: Screen, L: Leds, H: Host, E: Eeprom>(
    hmi: &mut Hmi<S, L, H, E>,
    sender: Sender,
    tokens: &Tokens<'_>,
    response: &mut Response,
) {
    if sender != Sender::System {
        return;
    }
    match (tokens.int(1), tokens.str_arg(2)) {
        (Ok(hw_id), Ok(unit)) => {
            if hmi.set_control_unit(hw_id as u8, unit) {
                respond(response, 0);
            } else {
                let _ = response.push_str(ProtocolError::InvalidArgument.as_wire());
            }
        }
        _ => {
            let _ = response.push_str(ProtocolError::InvalidArgument.as_wire());
        }
    }
}

fn cb_change_assignment_value<S: Screen, L: Leds, H: Host, E: Eeprom>(
    hmi: &mut Hmi<S, L, H, E>,
    sender: Sender,
    tokens: &Tokens<'_>,
    response: &mut Response,
) {
    if sender != Sender::System {
        return;
    }
    match (tokens.int(1), tokens.float(2)) {
        (Ok(hw_id), Ok(value)) => {
            if hmi.control(hw_id as u8).is_some() {
                hmi.set_control_value(hw_id as u8, value);
                respond(response, 0);
            } else {
                let _ = response.push_str(ProtocolError::InvalidArgument.as_wire());
            }
        }
        _ => {
            let _ = response.push_str(ProtocolError::InvalidArgument.as_wire());
        }
    }
}

fn cb_launch_popup<S: Screen, L: Leds, H: Host, E: Eeprom>(
    hmi: &mut Hmi<S, L, H, E>,
    sender: Sender,
    tokens: &Tokens<'_>,
    response: &mut Response,
) {
    if sender != Sender::System {
        return;
    }
    match tokens.int(1) {
        Ok(id) => {
            hmi.launch_popup_by_id(id as u8);
            respond(response, 0);
        }
        Err(error) => {
            let _ = response.push_str(error.as_wire());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::naveg::tests::test_hmi;

    fn noop<S: Screen, L: Leds, H: Host, E: Eeprom>(
        _hmi: &mut Hmi<S, L, H, E>,
        _sender: Sender,
        _tokens: &Tokens<'_>,
        _response: &mut Response,
    ) {
    }

    fn pong<S: Screen, L: Leds, H: Host, E: Eeprom>(
        _hmi: &mut Hmi<S, L, H, E>,
        _sender: Sender,
        _tokens: &Tokens<'_>,
        response: &mut Response,
    ) {
        respond(response, 0);
    }

    #[test]
    fn wildcard_template_should_dispatch() {
        let mut hmi = test_hmi();
        let mut router = CommandRouter::new();
        router.add_command("ping", pong);
        router.add_command("control_set %i %f", pong);

        let reply = router.parse(&mut hmi, Sender::WebGui, "control_set 3 0.5");
        assert_eq!(Some("resp 0"), reply.as_deref());
    }

    #[test]
    fn missing_arguments_should_report_few_arguments() {
        let mut hmi = test_hmi();
        let mut router = CommandRouter::new();
        router.add_command("control_set %i %f", noop);

        let reply = router.parse(&mut hmi, Sender::WebGui, "control_set 3");
        assert_eq!(Some("resp -3"), reply.as_deref());
    }

    #[test]
    fn extra_arguments_should_report_many_arguments() {
        let mut hmi = test_hmi();
        let mut router = CommandRouter::new();
        router.add_command("control_set %i %f", noop);

        let reply = router.parse(&mut hmi, Sender::WebGui, "control_set 3 0.5 9");
        assert_eq!(Some("resp -2"), reply.as_deref());
    }

    #[test]
    fn unknown_command_should_report_not_found() {
        let mut hmi = test_hmi();
        let mut router = CommandRouter::new();
        router.add_command("ping", pong);

        let reply = router.parse(&mut hmi, Sender::WebGui, "bogus");
        assert_eq!(Some("resp -1"), reply.as_deref());
    }

    #[test]
    fn variadic_template_should_accept_any_tail() {
        let mut hmi = test_hmi();
        let mut router = CommandRouter::new();
        router.add_command("names ...", pong);

        assert_eq!(
            Some("resp 0"),
            router
                .parse(&mut hmi, Sender::WebGui, "names a b c d e f")
                .as_deref()
        );
        assert_eq!(
            Some("resp 0"),
            router.parse(&mut hmi, Sender::WebGui, "names").as_deref()
        );
    }

    #[test]
    fn registration_order_should_shadow_later_matches() {
        // first-partial-match-wins: a degenerate early template shadows a
        // fuller one registered later
        let mut hmi = test_hmi();
        let mut router = CommandRouter::new();
        router.add_command("control_set", pong);
        router.add_command("control_set %i %f", noop);

        let reply = router.parse(&mut hmi, Sender::WebGui, "control_set 3 0.5");
        assert_eq!(Some("resp -2"), reply.as_deref());
    }

    #[test]
    fn ping_should_respond_ok_through_default_registry() {
        let mut hmi = test_hmi();
        let router = CommandRouter::with_default_commands();
        let reply = router.parse(&mut hmi, Sender::WebGui, "ping");
        assert_eq!(Some("resp 0"), reply.as_deref());
    }

    #[test]
    fn control_add_line_should_install_a_control() {
        let mut hmi = test_hmi();
        let router = CommandRouter::with_default_commands();
        let reply = router.parse(
            &mut hmi,
            Sender::WebGui,
            "control_add 0 Gain 0 dB 5.0 10.0 0.0 10 0 0 0",
        );
        assert_eq!(Some("resp 0"), reply.as_deref());
        assert!(hmi.control(0).is_some());
    }

    #[test]
    fn name_push_lines_should_land_in_the_navigation_lists() {
        let mut hmi = test_hmi();
        let router = CommandRouter::with_default_commands();

        let reply = router.parse(&mut hmi, Sender::WebGui, "pedalboard_name_set Big Rig");
        assert_eq!(Some("resp 0"), reply.as_deref());
        assert_eq!("Big Rig", hmi.navigation.pedalboard_name.as_str());

        let reply = router.parse(&mut hmi, Sender::WebGui, "snapshot_name_set 1 Clean Tone");
        assert_eq!(Some("resp 0"), reply.as_deref());
        assert_eq!("Clean Tone", hmi.navigation.snapshots.names[1].as_str());

        let reply = router.parse(&mut hmi, Sender::WebGui, "bank_name_set 0 Factory");
        assert_eq!(Some("resp 0"), reply.as_deref());
        assert_eq!("Factory", hmi.navigation.banks.names[0].as_str());
    }
}
