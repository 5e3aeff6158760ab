//! Debounced input engine for the buttons, footswitches and rotary
//! encoders. `ActuatorBank::clock` runs once per hardware timer tick from
//! the highest-priority context, so everything here is O(1) per actuator
//! and allocation-free. Debounce is the count-down flavor from Ganssle's
//! "A Guide to Debouncing"; the quadrature decoder follows the
//! PaulStoffregen transition-table approach.

use heapless::Vec;

pub const MAX_BUTTONS: usize = 8;
pub const MAX_ENCODERS: usize = 4;
pub const MAX_EVENTS_PER_TICK: usize = MAX_BUTTONS + MAX_ENCODERS;

pub const BUTTON_PRESS_DEBOUNCE_TICKS: u8 = 15;
pub const BUTTON_RELEASE_DEBOUNCE_TICKS: u8 = 30;
pub const ENCODER_PRESS_DEBOUNCE_TICKS: u8 = 5;
pub const ENCODER_RELEASE_DEBOUNCE_TICKS: u8 = 10;

/// Edge-triggered event bits. `PRESSED`/`RELEASED`/`PRESSED_DOUBLE` are
/// maintained by the button state machine itself; the rest are trigger
/// bits cleared as soon as they have been delivered once.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct EventMask(pub u16);

impl EventMask {
    pub const NONE: EventMask = EventMask(0);
    pub const PRESSED: EventMask = EventMask(1 << 0);
    pub const RELEASED: EventMask = EventMask(1 << 1);
    pub const CLICKED: EventMask = EventMask(1 << 2);
    pub const HELD: EventMask = EventMask(1 << 3);
    pub const PRESSED_DOUBLE: EventMask = EventMask(1 << 4);
    pub const TURNED: EventMask = EventMask(1 << 5);
    pub const TURNED_CW: EventMask = EventMask(1 << 6);
    pub const TURNED_ACW: EventMask = EventMask(1 << 7);

    pub const ALL_BUTTON: EventMask = EventMask(
        Self::PRESSED.0
            | Self::RELEASED.0
            | Self::CLICKED.0
            | Self::HELD.0
            | Self::PRESSED_DOUBLE.0,
    );
    pub const ALL_ENCODER: EventMask = EventMask(
        Self::PRESSED.0
            | Self::RELEASED.0
            | Self::CLICKED.0
            | Self::HELD.0
            | Self::TURNED.0
            | Self::TURNED_CW.0
            | Self::TURNED_ACW.0,
    );
    /// Bits cleared after a single delivery.
    const TRIGGER: EventMask = EventMask(
        Self::CLICKED.0 | Self::HELD.0 | Self::TURNED.0 | Self::TURNED_CW.0 | Self::TURNED_ACW.0,
    );

    pub fn contains(self, other: EventMask) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn intersects(self, other: EventMask) -> bool {
        self.0 & other.0 != 0
    }

    pub fn union(self, other: EventMask) -> EventMask {
        EventMask(self.0 | other.0)
    }

    fn insert(&mut self, other: EventMask) {
        self.0 |= other.0;
    }

    fn remove(&mut self, other: EventMask) {
        self.0 &= !other.0;
    }
}

impl core::ops::BitOr for EventMask {
    type Output = EventMask;

    fn bitor(self, other: EventMask) -> EventMask {
        self.union(other)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ActuatorKind {
    Button,
    Encoder,
}

/// One delivered event: the actuator's status snapshot masked down to the
/// bits it is subscribed to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct InputEvent {
    pub kind: ActuatorKind,
    pub id: u8,
    pub status: EventMask,
}

/// Double-press linking role. One button of a linked pair is the primary
/// and carries the partner index; the partner cycles Linked <-> Locked as
/// the primary goes down and up.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Link {
    None,
    Primary(usize),
    Linked,
    Locked,
}

#[derive(Debug)]
struct ButtonState {
    id: u8,
    enabled: EventMask,
    status: EventMask,
    pressed: bool,
    click_cancel: bool,
    debounce: u8,
    hold_time_ticks: u16,
    hold_counter: u16,
    double_press_ticks: u16,
    // > 0 counting, 0 idle, -1 consumed by a double press
    last_pressed_counter: i32,
    link: Link,
}

impl ButtonState {
    fn new(id: u8) -> ButtonState {
        ButtonState {
            id,
            enabled: EventMask::NONE,
            status: EventMask::NONE,
            pressed: false,
            click_cancel: false,
            debounce: BUTTON_PRESS_DEBOUNCE_TICKS,
            hold_time_ticks: 0,
            hold_counter: 0,
            double_press_ticks: 0,
            last_pressed_counter: 0,
            link: Link::None,
        }
    }
}

#[derive(Debug)]
struct EncoderState {
    id: u8,
    enabled: EventMask,
    status: EventMask,
    pressed: bool,
    click_cancel: bool,
    debounce: u8,
    hold_time_ticks: u16,
    hold_counter: u16,
    // previous channel A/B sample pair
    state: u8,
    counter: i16,
    steps: u8,
}

impl EncoderState {
    fn new(id: u8) -> EncoderState {
        EncoderState {
            id,
            enabled: EventMask::NONE,
            status: EventMask::NONE,
            pressed: false,
            click_cancel: false,
            debounce: ENCODER_PRESS_DEBOUNCE_TICKS,
            hold_time_ticks: 0,
            hold_counter: 0,
            state: 0,
            counter: 0,
            steps: 4,
        }
    }
}

/// Raw pin sample for one encoder on one tick.
#[derive(Clone, Copy, Debug, Default)]
pub struct EncoderPins {
    pub channel_a: bool,
    pub channel_b: bool,
    pub switch: bool,
}

pub type EventVec = Vec<InputEvent, MAX_EVENTS_PER_TICK>;

#[derive(Debug, Default)]
pub struct ActuatorBank {
    buttons: Vec<ButtonState, MAX_BUTTONS>,
    encoders: Vec<EncoderState, MAX_ENCODERS>,
}

impl ActuatorBank {
    pub fn new() -> ActuatorBank {
        ActuatorBank::default()
    }

    pub fn add_button(&mut self, id: u8) {
        if self.buttons.push(ButtonState::new(id)).is_err() {
            panic!("button table full");
        }
    }

    pub fn add_encoder(&mut self, id: u8) {
        if self.encoders.push(EncoderState::new(id)).is_err() {
            panic!("encoder table full");
        }
    }

    pub fn enable_button_events(&mut self, index: usize, mask: EventMask) {
        self.buttons[index].enabled = mask;
    }

    pub fn enable_encoder_events(&mut self, index: usize, mask: EventMask) {
        self.encoders[index].enabled = mask;
    }

    pub fn set_button_hold_time(&mut self, index: usize, ticks: u16) {
        self.buttons[index].hold_time_ticks = ticks;
        self.buttons[index].hold_counter = ticks;
    }

    pub fn set_encoder_hold_time(&mut self, index: usize, ticks: u16) {
        self.encoders[index].hold_time_ticks = ticks;
        self.encoders[index].hold_counter = ticks;
    }

    pub fn set_double_press_time(&mut self, index: usize, ticks: u16) {
        self.buttons[index].double_press_ticks = ticks;
        self.buttons[index].last_pressed_counter = ticks as i32;
    }

    /// Quadrature counts needed per emitted turn event.
    pub fn set_encoder_steps(&mut self, index: usize, steps: u8) {
        self.encoders[index].steps = steps;
    }

    /// Declares `primary` and `partner` a double-press pair. The pair
    /// shares the primary's double-press window.
    pub fn link_buttons(&mut self, primary: usize, partner: usize) {
        let window = self.buttons[primary].double_press_ticks;
        self.buttons[primary].link = Link::Primary(partner);
        let other = &mut self.buttons[partner];
        other.link = Link::Linked;
        if other.double_press_ticks == 0 {
            other.double_press_ticks = window;
            other.last_pressed_counter = window as i32;
        }
    }

    pub fn button_pressed(&self, index: usize) -> bool {
        self.buttons[index].pressed
    }

    /// Runs one debounce tick over every actuator. `button_levels[i]` is
    /// the debounce-raw "active" level of button `i`; `encoder_pins[i]`
    /// carries the quadrature channels and push switch of encoder `i`.
    /// Returns the events raised on this tick, each delivered at most once.
    pub fn clock(&mut self, button_levels: &[bool], encoder_pins: &[EncoderPins]) -> EventVec {
        let mut events = EventVec::new();

        for i in 0..self.buttons.len() {
            self.clock_button(i, button_levels.get(i).copied().unwrap_or(false), &mut events);
        }
        for i in 0..self.encoders.len() {
            self.clock_encoder(i, encoder_pins.get(i).copied().unwrap_or_default(), &mut events);
        }

        events
    }

    fn clock_button(&mut self, i: usize, level: bool, events: &mut EventVec) {
        let partner_pressed = match self.buttons[i].link {
            Link::Primary(p) => self.buttons[p].pressed,
            _ => false,
        };

        let button = &mut self.buttons[i];
        if level == button.pressed {
            if level {
                button.debounce = BUTTON_RELEASE_DEBOUNCE_TICKS;

                if button.hold_counter > 0 {
                    button.hold_counter -= 1;
                    if button.hold_counter == 0 {
                        button.status.remove(EventMask::PRESSED);
                        button.status.remove(EventMask::RELEASED);
                        button.status.remove(EventMask::PRESSED_DOUBLE);
                        button.status.insert(EventMask::HELD);
                        button.click_cancel = true;
                        Self::deliver(button.id, ActuatorKind::Button, &mut button.status, button.enabled, EventMask::HELD, events);
                    }
                }

                if button.last_pressed_counter > 0 {
                    button.last_pressed_counter -= 1;

                    if matches!(button.link, Link::Primary(_)) && partner_pressed {
                        button.status.remove(EventMask::PRESSED);
                        button.status.remove(EventMask::RELEASED);
                        button.status.insert(EventMask::PRESSED_DOUBLE);
                        Self::deliver(button.id, ActuatorKind::Button, &mut button.status, button.enabled, EventMask::PRESSED_DOUBLE, events);
                        // fire only once per press cycle
                        button.last_pressed_counter = -1;

                        if let Link::Primary(p) = self.buttons[i].link {
                            let other = &mut self.buttons[p];
                            other.status.remove(EventMask::PRESSED);
                            other.status.remove(EventMask::RELEASED);
                            other.status.insert(EventMask::PRESSED_DOUBLE);
                            Self::deliver(other.id, ActuatorKind::Button, &mut other.status, other.enabled, EventMask::PRESSED_DOUBLE, events);
                        }
                        return;
                    }

                    if button.last_pressed_counter <= 0 {
                        // window expired while a linked partner holds us
                        if button.link == Link::Locked {
                            return;
                        }
                        button.status.remove(EventMask::RELEASED);
                        button.status.insert(EventMask::PRESSED);
                        Self::deliver(button.id, ActuatorKind::Button, &mut button.status, button.enabled, EventMask::PRESSED, events);
                    }
                }
            } else {
                button.debounce = BUTTON_PRESS_DEBOUNCE_TICKS;
                if button.hold_time_ticks > 0 {
                    button.hold_counter = button.hold_time_ticks;
                }
                if button.double_press_ticks > 0 {
                    button.last_pressed_counter = button.double_press_ticks as i32;
                }
            }
            return;
        }

        button.debounce = button.debounce.saturating_sub(1);
        if button.debounce != 0 {
            return;
        }

        button.pressed = level;
        if level {
            button.debounce = BUTTON_RELEASE_DEBOUNCE_TICKS;
            match button.link {
                Link::None => {
                    button.status.remove(EventMask::RELEASED);
                    button.status.insert(EventMask::PRESSED);
                    Self::deliver(button.id, ActuatorKind::Button, &mut button.status, button.enabled, EventMask::PRESSED, events);
                }
                Link::Primary(p) => {
                    // hold the partner silent until we are released
                    self.buttons[p].link = Link::Locked;
                }
                // secondary of a pair: the press is deferred until the
                // double-press window decides between single and double
                Link::Linked | Link::Locked => {}
            }
        } else {
            button.debounce = BUTTON_PRESS_DEBOUNCE_TICKS;
            button.status.remove(EventMask::PRESSED);
            button.status.remove(EventMask::PRESSED_DOUBLE);
            button.status.insert(EventMask::RELEASED);
            if !button.click_cancel {
                button.status.insert(EventMask::CLICKED);
            }
            button.click_cancel = false;
            Self::deliver(
                button.id,
                ActuatorKind::Button,
                &mut button.status,
                button.enabled,
                EventMask::RELEASED.union(EventMask::CLICKED),
                events,
            );
            if let Link::Primary(p) = self.buttons[i].link {
                self.buttons[p].link = Link::Linked;
            }
        }
    }

    fn clock_encoder(&mut self, i: usize, pins: EncoderPins, events: &mut EventVec) {
        let encoder = &mut self.encoders[i];

        // push switch, same count-down debounce as the buttons
        if pins.switch == encoder.pressed {
            if pins.switch {
                encoder.debounce = ENCODER_RELEASE_DEBOUNCE_TICKS;
                if encoder.hold_counter > 0 {
                    encoder.hold_counter -= 1;
                    if encoder.hold_counter == 0 {
                        encoder.status.insert(EventMask::HELD);
                        encoder.status.insert(EventMask::PRESSED);
                        Self::deliver(
                            encoder.id,
                            ActuatorKind::Encoder,
                            &mut encoder.status,
                            encoder.enabled,
                            EventMask::HELD.union(EventMask::PRESSED),
                            events,
                        );
                    }
                }
            } else {
                encoder.debounce = ENCODER_PRESS_DEBOUNCE_TICKS;
                encoder.hold_counter = encoder.hold_time_ticks;
            }
        } else {
            encoder.debounce = encoder.debounce.saturating_sub(1);
            if encoder.debounce == 0 {
                encoder.pressed = pins.switch;
                if pins.switch {
                    encoder.debounce = ENCODER_RELEASE_DEBOUNCE_TICKS;
                    encoder.status.remove(EventMask::RELEASED);
                    encoder.status.insert(EventMask::PRESSED);
                    Self::deliver(encoder.id, ActuatorKind::Encoder, &mut encoder.status, encoder.enabled, EventMask::PRESSED, events);
                } else {
                    encoder.debounce = ENCODER_PRESS_DEBOUNCE_TICKS;
                    encoder.status.remove(EventMask::PRESSED);
                    encoder.status.insert(EventMask::RELEASED);
                    if !encoder.click_cancel {
                        encoder.status.insert(EventMask::CLICKED);
                    }
                    encoder.click_cancel = false;
                    Self::deliver(
                        encoder.id,
                        ActuatorKind::Encoder,
                        &mut encoder.status,
                        encoder.enabled,
                        EventMask::RELEASED.union(EventMask::CLICKED),
                        events,
                    );
                }
            }
        }

        // quadrature decode
        let mut seq = encoder.state & 3;
        if pins.channel_a {
            seq |= 4;
        }
        if pins.channel_b {
            seq |= 8;
        }

        match seq {
            0 | 5 | 10 | 15 => {}
            1 | 7 | 8 | 14 => {
                // opposite pulse mid-sequence: restart the count
                if encoder.counter > 0 {
                    encoder.counter = 0;
                }
                encoder.counter -= 1;
            }
            2 | 4 | 11 | 13 => {
                if encoder.counter < 0 {
                    encoder.counter = 0;
                }
                encoder.counter += 1;
            }
            3 | 12 => encoder.counter -= 2,
            6 | 9 => encoder.counter += 2,
            _ => unreachable!(),
        }

        encoder.state = seq >> 2;

        if encoder.counter.unsigned_abs() >= encoder.steps as u16 {
            encoder.status.remove(EventMask::TURNED_CW);
            encoder.status.remove(EventMask::TURNED_ACW);
            encoder.status.insert(EventMask::TURNED);
            if encoder.counter > 0 {
                encoder.status.insert(EventMask::TURNED_CW);
            } else {
                encoder.status.insert(EventMask::TURNED_ACW);
            }
            Self::deliver(
                encoder.id,
                ActuatorKind::Encoder,
                &mut encoder.status,
                encoder.enabled,
                EventMask::TURNED
                    .union(EventMask::TURNED_CW)
                    .union(EventMask::TURNED_ACW)
                    .union(EventMask::HELD),
                events,
            );
            encoder.counter = 0;
        }
    }

    /// At-most-once delivery: snapshot the status masked to the enabled
    /// bits, then clear the trigger bits that were part of this delivery.
    fn deliver(
        id: u8,
        kind: ActuatorKind,
        status: &mut EventMask,
        enabled: EventMask,
        flags: EventMask,
        events: &mut EventVec,
    ) {
        if !enabled.intersects(flags) {
            return;
        }
        let snapshot = EventMask(status.0 & enabled.0);
        let _ = events.push(InputEvent {
            kind,
            id,
            status: snapshot,
        });
        status.remove(EventMask(enabled.0 & flags.0 & EventMask::TRIGGER.0));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HOLD_TICKS: u16 = 50;
    const DOUBLE_TICKS: u16 = 20;

    fn bank_with_button() -> ActuatorBank {
        let mut bank = ActuatorBank::new();
        bank.add_button(0);
        bank.enable_button_events(0, EventMask::ALL_BUTTON);
        bank
    }

    fn tick_button(bank: &mut ActuatorBank, level: bool) -> EventVec {
        bank.clock(&[level], &[])
    }

    fn press_accepted(bank: &mut ActuatorBank) -> EventVec {
        let mut all = EventVec::new();
        for _ in 0..BUTTON_PRESS_DEBOUNCE_TICKS {
            all.extend(tick_button(bank, true));
        }
        all
    }

    fn release_accepted(bank: &mut ActuatorBank) -> EventVec {
        let mut all = EventVec::new();
        for _ in 0..BUTTON_RELEASE_DEBOUNCE_TICKS {
            all.extend(tick_button(bank, false));
        }
        all
    }

    #[test]
    fn button_glitch_shorter_than_debounce_should_raise_nothing() {
        let mut bank = bank_with_button();
        for _ in 0..BUTTON_PRESS_DEBOUNCE_TICKS - 1 {
            assert!(tick_button(&mut bank, true).is_empty());
        }
        // back to released before acceptance
        for _ in 0..100 {
            assert!(tick_button(&mut bank, false).is_empty());
        }
        assert!(!bank.button_pressed(0));
    }

    #[test]
    fn button_press_should_fire_after_debounce() {
        let mut bank = bank_with_button();
        let events = press_accepted(&mut bank);
        assert_eq!(1, events.len());
        assert!(events[0].status.contains(EventMask::PRESSED));
        assert!(bank.button_pressed(0));
    }

    #[test]
    fn button_release_should_fire_released_and_clicked() {
        let mut bank = bank_with_button();
        press_accepted(&mut bank);
        let events = release_accepted(&mut bank);
        assert_eq!(1, events.len());
        assert!(events[0].status.contains(EventMask::RELEASED));
        assert!(events[0].status.contains(EventMask::CLICKED));
    }

    #[test]
    fn button_held_should_fire_once_and_cancel_click() {
        let mut bank = bank_with_button();
        bank.set_button_hold_time(0, HOLD_TICKS);
        press_accepted(&mut bank);

        let mut held_events = 0;
        for _ in 0..HOLD_TICKS + 10 {
            for event in tick_button(&mut bank, true) {
                if event.status.contains(EventMask::HELD) {
                    held_events += 1;
                }
            }
        }
        assert_eq!(1, held_events);

        let events = release_accepted(&mut bank);
        assert_eq!(1, events.len());
        assert!(events[0].status.contains(EventMask::RELEASED));
        assert!(!events[0].status.contains(EventMask::CLICKED));
    }

    fn linked_pair() -> ActuatorBank {
        let mut bank = ActuatorBank::new();
        bank.add_button(0);
        bank.add_button(1);
        bank.enable_button_events(0, EventMask::ALL_BUTTON);
        bank.enable_button_events(1, EventMask::ALL_BUTTON);
        bank.set_double_press_time(0, DOUBLE_TICKS);
        bank.link_buttons(0, 1);
        bank
    }

    #[test]
    fn linked_pair_pressed_together_should_fire_double_press_on_both() {
        let mut bank = linked_pair();
        // press primary, then partner a few ticks later
        for _ in 0..BUTTON_PRESS_DEBOUNCE_TICKS {
            bank.clock(&[true, false], &[]);
        }
        let mut doubles = 0;
        let mut singles = 0;
        for _ in 0..DOUBLE_TICKS + BUTTON_PRESS_DEBOUNCE_TICKS as u16 {
            for event in bank.clock(&[true, true], &[]) {
                if event.status.contains(EventMask::PRESSED_DOUBLE) {
                    doubles += 1;
                }
                if event.status.contains(EventMask::PRESSED) {
                    singles += 1;
                }
            }
        }
        assert_eq!(2, doubles);
        assert_eq!(0, singles);
    }

    #[test]
    fn linked_primary_pressed_alone_should_fire_single_press_after_window() {
        let mut bank = linked_pair();
        for _ in 0..BUTTON_PRESS_DEBOUNCE_TICKS {
            bank.clock(&[true, false], &[]);
        }
        let mut singles = 0;
        let mut doubles = 0;
        for _ in 0..DOUBLE_TICKS + 5 {
            for event in bank.clock(&[true, false], &[]) {
                if event.status.contains(EventMask::PRESSED) {
                    singles += 1;
                }
                if event.status.contains(EventMask::PRESSED_DOUBLE) {
                    doubles += 1;
                }
            }
        }
        assert_eq!(1, singles);
        assert_eq!(0, doubles);
    }

    #[test]
    fn locked_partner_should_stay_silent_while_primary_is_down() {
        let mut bank = linked_pair();
        // primary press locks the partner
        for _ in 0..BUTTON_PRESS_DEBOUNCE_TICKS {
            bank.clock(&[true, false], &[]);
        }
        // drain the primary's own single-press window
        for _ in 0..DOUBLE_TICKS + 5 {
            bank.clock(&[true, false], &[]);
        }
        // partner pressed well after the window: no event until unlock
        let mut partner_events = 0;
        for _ in 0..BUTTON_PRESS_DEBOUNCE_TICKS + DOUBLE_TICKS as u8 {
            for event in bank.clock(&[true, true], &[]) {
                if event.id == 1 && event.status.intersects(EventMask::PRESSED) {
                    partner_events += 1;
                }
            }
        }
        assert_eq!(0, partner_events);
    }

    fn bank_with_encoder(steps: u8) -> ActuatorBank {
        let mut bank = ActuatorBank::new();
        bank.add_encoder(0);
        bank.enable_encoder_events(0, EventMask::ALL_ENCODER);
        bank.set_encoder_steps(0, steps);
        bank
    }

    // one full Gray-code cycle in the "counter++" direction
    const CW_CYCLE: [(bool, bool); 4] = [(true, false), (true, true), (false, true), (false, false)];

    fn turn(bank: &mut ActuatorBank, pins: (bool, bool)) -> EventVec {
        bank.clock(
            &[],
            &[EncoderPins {
                channel_a: pins.0,
                channel_b: pins.1,
                switch: false,
            }],
        )
    }

    #[test]
    fn encoder_full_cycle_should_fire_exactly_one_turn_event() {
        let mut bank = bank_with_encoder(4);
        let mut turns = 0;
        let mut last_status = EventMask::NONE;
        for pins in CW_CYCLE {
            for event in turn(&mut bank, pins) {
                if event.status.contains(EventMask::TURNED) {
                    turns += 1;
                    last_status = event.status;
                }
            }
        }
        assert_eq!(1, turns);
        assert!(last_status.contains(EventMask::TURNED_CW));
        assert!(!last_status.contains(EventMask::TURNED_ACW));
        assert_eq!(0, bank.encoders[0].counter);
    }

    #[test]
    fn encoder_reversal_should_reset_counter_before_counting() {
        let mut bank = bank_with_encoder(4);
        // two steps forward
        turn(&mut bank, CW_CYCLE[0]);
        turn(&mut bank, CW_CYCLE[1]);
        assert_eq!(2, bank.encoders[0].counter);
        // one step back: partial forward count must not survive
        turn(&mut bank, CW_CYCLE[0]);
        assert_eq!(-1, bank.encoders[0].counter);
    }

    #[test]
    fn encoder_turn_event_should_deliver_at_most_once() {
        let mut bank = bank_with_encoder(4);
        for pins in CW_CYCLE {
            turn(&mut bank, pins);
        }
        // idle ticks afterwards deliver nothing
        for _ in 0..10 {
            let events = turn(&mut bank, (false, false));
            assert!(events.is_empty());
        }
    }

    #[test]
    fn encoder_switch_should_click_like_a_button() {
        let mut bank = bank_with_encoder(4);
        let mut clicks = 0;
        for _ in 0..ENCODER_PRESS_DEBOUNCE_TICKS {
            bank.clock(&[], &[EncoderPins { switch: true, ..Default::default() }]);
        }
        for _ in 0..ENCODER_RELEASE_DEBOUNCE_TICKS {
            for event in bank.clock(&[], &[EncoderPins::default()]) {
                if event.status.contains(EventMask::CLICKED) {
                    clicks += 1;
                }
            }
        }
        assert_eq!(1, clicks);
    }
}
