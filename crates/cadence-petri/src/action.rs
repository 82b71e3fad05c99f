//! Scheduled transition actions

use crate::identity::TransitionId;
use crate::time::Date;
use std::cmp::Ordering;
use std::collections::BinaryHeap;

/// Boundary of a transition's crossing window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionKind {
    /// Earliest date the transition may cross
    Start,
    /// Latest date; the transition is forced across
    End,
}

/// A `{time, transition, kind}` entry of the action queue
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PriorityTransitionAction {
    pub time: Date,
    pub transition: TransitionId,
    pub kind: ActionKind,
    pub(crate) generation: u64,
    seq: u64,
}

impl Ord for PriorityTransitionAction {
    // Reversed so the heap pops the earliest action; ties keep insertion order.
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .time
            .cmp(&self.time)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for PriorityTransitionAction {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Time-ordered queue of transition actions
#[derive(Debug, Clone, Default)]
pub struct ActionQueue {
    heap: BinaryHeap<PriorityTransitionAction>,
    next_seq: u64,
}

impl ActionQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, time: Date, transition: TransitionId, kind: ActionKind, generation: u64) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.heap.push(PriorityTransitionAction {
            time,
            transition,
            kind,
            generation,
            seq,
        });
    }

    /// Earliest action, if any
    pub fn top(&self) -> Option<&PriorityTransitionAction> {
        self.heap.peek()
    }

    pub fn pop(&mut self) -> Option<PriorityTransitionAction> {
        self.heap.pop()
    }

    /// Pop the earliest action if it is due at `now`
    pub fn pop_due(&mut self, now: Date) -> Option<PriorityTransitionAction> {
        if self.heap.peek()?.time <= now {
            self.heap.pop()
        } else {
            None
        }
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    pub fn clear(&mut self) {
        self.heap.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_queue_orders_by_time_then_insertion() {
        let mut queue = ActionQueue::new();
        queue.push(300, TransitionId::new(1), ActionKind::Start, 0);
        queue.push(100, TransitionId::new(2), ActionKind::End, 0);
        queue.push(100, TransitionId::new(3), ActionKind::Start, 0);

        let order: Vec<_> = std::iter::from_fn(|| queue.pop())
            .map(|a| a.transition.raw())
            .collect();
        assert_eq!(order, vec![2, 3, 1]);
    }

    #[test]
    fn test_pop_due() {
        let mut queue = ActionQueue::new();
        queue.push(50, TransitionId::new(1), ActionKind::Start, 0);
        assert!(queue.pop_due(49).is_none());
        assert_eq!(queue.top().map(|a| a.time), Some(50));
        assert!(queue.pop_due(50).is_some());
        assert!(queue.is_empty());
    }
}
