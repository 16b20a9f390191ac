// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// Mailbox ring buffer: FIFO order, overwrite-on-full and the tri-state fill.

use std::collections::VecDeque;

use proptest::prelude::*;

use libmq::{Message, MessageQueue, MqError, QueueState};

fn msg(text: &str) -> Message {
    Message::new(text.as_bytes(), "tester").unwrap()
}

fn drain(q: &mut MessageQueue) -> Vec<String> {
    let mut out = Vec::new();
    while let Ok(m) = q.dequeue() {
        out.push(m.text().into_owned());
    }
    out
}

#[test]
fn new_queue_is_empty() {
    let q = MessageQueue::new(3);
    assert_eq!(q.capacity(), 3);
    assert_eq!(q.state(), QueueState::Empty);
    assert!(q.is_empty());
    assert_eq!(q.len(), 0);
    assert!(q.peek().is_none());
}

#[test]
#[cfg_attr(debug_assertions, should_panic)]
fn zero_capacity_asserts_or_clamps() {
    let mut q = MessageQueue::new(0);
    assert_eq!(q.capacity(), 1);
    assert!(!q.enqueue(msg("only")));
    assert!(q.is_full());
}

#[test]
fn dequeue_on_empty_fails() {
    let mut q = MessageQueue::new(3);
    assert!(matches!(q.dequeue(), Err(MqError::QueueEmpty)));
}

#[test]
fn fifo_order() {
    let mut q = MessageQueue::new(5);
    for t in ["one", "two", "three"] {
        assert!(!q.enqueue(msg(t)));
    }
    assert_eq!(q.state(), QueueState::Partial);
    assert_eq!(q.len(), 3);
    assert_eq!(q.peek().map(|m| m.text().into_owned()), Some("one".into()));
    assert_eq!(drain(&mut q), ["one", "two", "three"]);
    assert_eq!(q.state(), QueueState::Empty);
}

#[test]
fn every_slot_is_usable() {
    let mut q = MessageQueue::new(3);
    q.enqueue(msg("a"));
    q.enqueue(msg("b"));
    assert_eq!(q.state(), QueueState::Partial);
    assert!(!q.enqueue(msg("c")));
    assert_eq!(q.state(), QueueState::Full);
    assert!(q.is_full());
    assert_eq!(q.len(), 3);
}

#[test]
fn full_queue_overwrites_oldest() {
    let mut q = MessageQueue::new(3);
    q.enqueue(msg("m1"));
    q.enqueue(msg("m2"));
    q.enqueue(msg("m3"));
    assert!(q.enqueue(msg("m4")));
    assert_eq!(q.state(), QueueState::Full);
    assert_eq!(drain(&mut q), ["m2", "m3", "m4"]);
}

#[test]
fn wraparound_after_partial_reads() {
    let mut q = MessageQueue::new(3);
    q.enqueue(msg("a"));
    q.enqueue(msg("b"));
    assert_eq!(q.dequeue().unwrap().text(), "a");
    q.enqueue(msg("c"));
    q.enqueue(msg("d"));
    assert_eq!(q.state(), QueueState::Full);
    let seen: Vec<_> = q.iter().map(|m| m.text().into_owned()).collect();
    assert_eq!(seen, ["b", "c", "d"]);
    assert_eq!(drain(&mut q), ["b", "c", "d"]);
}

#[test]
fn eviction_scenario_then_empty() {
    // capacity 3: "hi", "hi", "bye", then a fourth overwrites the first.
    let mut q = MessageQueue::new(3);
    for t in ["x", "hi", "hi", "bye"] {
        q.enqueue(msg(t));
    }
    assert_eq!(drain(&mut q), ["hi", "hi", "bye"]);
    assert!(matches!(q.dequeue(), Err(MqError::QueueEmpty)));
}

#[test]
fn clear_frees_everything() {
    let mut q = MessageQueue::new(4);
    for t in ["a", "b", "c", "d", "e"] {
        q.enqueue(msg(t));
    }
    assert_eq!(q.clear(), 4);
    assert_eq!(q.state(), QueueState::Empty);
    assert_eq!(q.clear(), 0);
    q.enqueue(msg("f"));
    assert_eq!(drain(&mut q), ["f"]);
}

#[derive(Debug, Clone)]
enum Op {
    Push(u8),
    Pop,
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![any::<u8>().prop_map(Op::Push), Just(Op::Pop)]
}

proptest! {
    #[test]
    fn matches_bounded_deque_model(cap in 3usize..=20, ops in prop::collection::vec(op(), 0..200)) {
        let mut q = MessageQueue::new(cap);
        let mut model: VecDeque<u8> = VecDeque::new();

        for op in ops {
            match op {
                Op::Push(b) => {
                    let full = model.len() == cap;
                    if full {
                        model.pop_front();
                    }
                    model.push_back(b);
                    prop_assert_eq!(q.enqueue(Message::new(&[b], "p").unwrap()), full);
                }
                Op::Pop => match (q.dequeue(), model.pop_front()) {
                    (Ok(m), Some(b)) => prop_assert_eq!(m.payload(), &[b][..]),
                    (Err(MqError::QueueEmpty), None) => {}
                    (got, want) => prop_assert!(false, "queue gave {:?}, model {:?}", got, want),
                },
            }

            prop_assert_eq!(q.len(), model.len());
            let expected = match model.len() {
                0 => QueueState::Empty,
                n if n == cap => QueueState::Full,
                _ => QueueState::Partial,
            };
            prop_assert_eq!(q.state(), expected);
        }
    }
}
