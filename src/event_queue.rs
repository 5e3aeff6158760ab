//! Bounded handoff queue between the actuator tick context and the input
//! dispatch task. Button edges must never be lost, so they go in at the
//! front; encoder turns are plentiful and disposable, so they go in at the
//! back and are dropped once the queue gets close to full.

use heapless::Deque;

use crate::actuator::InputEvent;

pub const QUEUE_DEPTH: usize = 20;
/// Free slots kept in reserve for button events. Encoder events are
/// dropped once fewer than this many slots remain.
pub const RESERVED_SLOTS: usize = 10;

#[derive(Debug, Default)]
pub struct DispatchQueue {
    events: Deque<InputEvent, QUEUE_DEPTH>,
    dropped: u32,
}

impl DispatchQueue {
    pub fn new() -> DispatchQueue {
        DispatchQueue::default()
    }

    /// Button edges take priority: enqueued at the front, refused only
    /// when the queue is completely full.
    pub fn push_button(&mut self, event: InputEvent) {
        if self.events.push_front(event).is_err() {
            self.dropped += 1;
        }
    }

    /// Encoder turns are dropped early to keep slack for buttons.
    pub fn push_encoder(&mut self, event: InputEvent) {
        if self.free_slots() <= RESERVED_SLOTS {
            self.dropped += 1;
            return;
        }
        // cannot fail: free_slots() > RESERVED_SLOTS >= 1
        let _ = self.events.push_back(event);
    }

    pub fn pop(&mut self) -> Option<InputEvent> {
        self.events.pop_front()
    }

    /// Discards everything queued, e.g. when a page switch makes pending
    /// input stale.
    pub fn clear(&mut self) {
        self.events.clear();
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn dropped(&self) -> u32 {
        self.dropped
    }

    fn free_slots(&self) -> usize {
        QUEUE_DEPTH - self.events.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actuator::{ActuatorKind, EventMask};

    fn button_event(id: u8) -> InputEvent {
        InputEvent {
            kind: ActuatorKind::Button,
            id,
            status: EventMask::PRESSED,
        }
    }

    fn encoder_event(id: u8) -> InputEvent {
        InputEvent {
            kind: ActuatorKind::Encoder,
            id,
            status: EventMask::TURNED.union(EventMask::TURNED_CW),
        }
    }

    #[test]
    fn buttons_should_jump_the_queue() {
        let mut queue = DispatchQueue::new();
        queue.push_encoder(encoder_event(0));
        queue.push_encoder(encoder_event(1));
        queue.push_button(button_event(5));
        assert_eq!(ActuatorKind::Button, queue.pop().unwrap().kind);
    }

    #[test]
    fn encoder_events_should_drop_once_reserve_is_reached() {
        let mut queue = DispatchQueue::new();
        let room_for_encoders = QUEUE_DEPTH - RESERVED_SLOTS;
        for i in 0..room_for_encoders + 5 {
            queue.push_encoder(encoder_event(i as u8));
        }
        assert_eq!(room_for_encoders, queue.len());
        assert_eq!(5, queue.dropped());
    }

    #[test]
    fn buttons_should_fit_where_encoders_are_refused() {
        let mut queue = DispatchQueue::new();
        for i in 0..QUEUE_DEPTH {
            queue.push_encoder(encoder_event(i as u8));
        }
        let before = queue.len();
        queue.push_button(button_event(3));
        assert_eq!(before + 1, queue.len());
        assert_eq!(ActuatorKind::Button, queue.pop().unwrap().kind);
    }

    #[test]
    fn clear_should_discard_stale_events() {
        let mut queue = DispatchQueue::new();
        queue.push_button(button_event(0));
        queue.push_encoder(encoder_event(0));
        queue.clear();
        assert!(queue.is_empty());
        assert_eq!(None, queue.pop());
    }
}
