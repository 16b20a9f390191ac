// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// Fixed-capacity mailbox ring buffer with overwrite-on-full eviction.
//
// Cursors stay in [0, capacity). With equal cursors the ring is either
// empty or full, so the fill state is kept as an explicit tri-state that is
// recomputed after every mutation: a write that closes the gap means FULL,
// a read that closes it means EMPTY. All `capacity` slots are usable.

use crate::error::{MqError, Result};
use crate::message::Message;

/// Derived fill state of a [`MessageQueue`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueState {
    Empty,
    Partial,
    Full,
}

/// Bounded FIFO of owned messages.
pub struct MessageQueue {
    slots: Vec<Option<Message>>,
    wp: usize,
    rp: usize,
    state: QueueState,
}

impl MessageQueue {
    /// Create an empty queue with `capacity` slots. A zero capacity is a
    /// caller bug: it asserts in debug builds and becomes one slot otherwise.
    pub fn new(capacity: usize) -> Self {
        debug_assert!(capacity > 0, "MessageQueue capacity must be non-zero");
        let capacity = capacity.max(1);
        let mut slots = Vec::with_capacity(capacity);
        slots.resize_with(capacity, || None);
        Self {
            slots,
            wp: 0,
            rp: 0,
            state: QueueState::Empty,
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn state(&self) -> QueueState {
        self.state
    }

    pub fn is_empty(&self) -> bool {
        self.state == QueueState::Empty
    }

    pub fn is_full(&self) -> bool {
        self.state == QueueState::Full
    }

    /// Number of messages waiting to be read.
    pub fn len(&self) -> usize {
        match self.state {
            QueueState::Empty => 0,
            QueueState::Full => self.capacity(),
            QueueState::Partial => self.filled(),
        }
    }

    fn filled(&self) -> usize {
        let cap = self.capacity();
        (self.wp + cap - self.rp) % cap
    }

    fn update_state(&mut self, after_write: bool) {
        self.state = match (self.filled(), after_write) {
            (0, true) => QueueState::Full,
            (0, false) => QueueState::Empty,
            _ => QueueState::Partial,
        };
    }

    /// Append `msg`, evicting the oldest unread message if the queue is full.
    ///
    /// Returns `true` when an eviction happened. Never fails.
    pub fn enqueue(&mut self, msg: Message) -> bool {
        let cap = self.capacity();
        let evicted = if self.state == QueueState::Full {
            let oldest = self.slots[self.rp].take();
            debug_assert!(oldest.is_some(), "full queue with a vacant read slot");
            self.rp = (self.rp + 1) % cap;
            log::debug!(
                "queue full, evicting oldest message from \"{}\"",
                oldest.as_ref().map(Message::sender).unwrap_or("")
            );
            true
        } else {
            false
        };
        debug_assert!(self.slots[self.wp].is_none(), "write slot still occupied");
        self.slots[self.wp] = Some(msg);
        self.wp = (self.wp + 1) % cap;
        self.update_state(true);
        evicted
    }

    /// Take the oldest unread message out of the queue.
    ///
    /// # Errors
    /// `QueueEmpty` if nothing is queued.
    pub fn dequeue(&mut self) -> Result<Message> {
        if self.state == QueueState::Empty {
            return Err(MqError::QueueEmpty);
        }
        let msg = self.slots[self.rp].take().ok_or(MqError::QueueEmpty)?;
        self.rp = (self.rp + 1) % self.capacity();
        self.update_state(false);
        Ok(msg)
    }

    /// Borrow the oldest unread message without removing it.
    pub fn peek(&self) -> Option<&Message> {
        if self.state == QueueState::Empty {
            return None;
        }
        self.slots[self.rp].as_ref()
    }

    /// Queued messages, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &Message> + '_ {
        let cap = self.capacity();
        (0..self.len()).filter_map(move |i| self.slots[(self.rp + i) % cap].as_ref())
    }

    /// Free every occupied slot and reset the cursors. Returns how many
    /// messages were dropped.
    pub fn clear(&mut self) -> usize {
        let mut freed = 0;
        for slot in self.slots.iter_mut() {
            if slot.take().is_some() {
                freed += 1;
            }
        }
        self.wp = 0;
        self.rp = 0;
        self.state = QueueState::Empty;
        freed
    }
}

impl std::fmt::Debug for MessageQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessageQueue")
            .field("capacity", &self.capacity())
            .field("wp", &self.wp)
            .field("rp", &self.rp)
            .field("state", &self.state)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn msg(text: &str) -> Message {
        Message::new(text.as_bytes(), "t").unwrap()
    }

    #[test]
    fn cursors_wrap_and_state_tracks_fill() {
        let mut q = MessageQueue::new(3);
        assert_eq!(q.state(), QueueState::Empty);
        q.enqueue(msg("a"));
        assert_eq!(q.state(), QueueState::Partial);
        q.enqueue(msg("b"));
        q.enqueue(msg("c"));
        assert_eq!(q.state(), QueueState::Full);
        assert_eq!(q.wp, 0);
        assert_eq!(q.rp, 0);
        q.dequeue().unwrap();
        assert_eq!(q.state(), QueueState::Partial);
        assert_eq!(q.len(), 2);
    }

    #[test]
    fn single_slot_queue_overwrites() {
        let mut q = MessageQueue::new(1);
        assert!(!q.enqueue(msg("a")));
        assert!(q.is_full());
        assert!(q.enqueue(msg("b")));
        assert_eq!(q.dequeue().unwrap().payload(), b"b");
        assert!(q.is_empty());
    }

    #[test]
    fn clear_resets_cursors() {
        let mut q = MessageQueue::new(4);
        for t in ["a", "b", "c", "d", "e"] {
            q.enqueue(msg(t));
        }
        assert_eq!(q.clear(), 4);
        assert_eq!((q.wp, q.rp), (0, 0));
        assert!(q.slots.iter().all(Option::is_none));
    }
}
