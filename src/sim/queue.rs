//! Pending-event structure for one equipment.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use super::event::Event;
use super::time::SimTime;

/// Handle returned by [`EventQueue::schedule`], used to cancel an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EventId(u64);

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Total order: occurrence time, then priority rank, then insertion order.
///
/// The rank agrees with [`Event::has_priority_over`]; the insertion
/// sequence turns its same-kind ties into a strict, reproducible order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct QueueKey {
    time: SimTime,
    rank: u8,
    seq: u64,
}

/// Time-ordered queue of pending events supporting cancellation by handle.
///
/// Cancelled events stay queued with their flag set so the executor can
/// observe and skip them when they come due.
#[derive(Debug, Default)]
pub struct EventQueue {
    pending: BTreeMap<QueueKey, (EventId, Event)>,
    index: HashMap<EventId, QueueKey>,
    next_seq: u64,
}

impl EventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enqueues `event` and returns its handle.
    pub fn schedule(&mut self, event: Event) -> EventId {
        let seq = self.next_seq;
        self.next_seq += 1;
        let id = EventId(seq);
        let key = QueueKey {
            time: event.time_of_occurrence(),
            rank: event.kind().rank(),
            seq,
        };
        self.pending.insert(key, (id, event));
        self.index.insert(id, key);
        id
    }

    /// Sets the cancellation flag of a pending event.
    ///
    /// Returns `false` if the event already left the queue.
    pub fn cancel(&mut self, id: EventId) -> bool {
        let Some(key) = self.index.get(&id) else {
            return false;
        };
        match self.pending.get_mut(key) {
            Some((_, event)) => {
                event.cancel();
                true
            }
            None => false,
        }
    }

    /// Removes and returns the next event in total order.
    pub fn pop(&mut self) -> Option<(EventId, Event)> {
        let (_, (id, event)) = self.pending.pop_first()?;
        self.index.remove(&id);
        Some((id, event))
    }

    /// Occurrence time of the next event, if any.
    pub fn peek_time(&self) -> Option<SimTime> {
        self.pending.first_key_value().map(|(k, _)| k.time)
    }

    pub fn get(&self, id: EventId) -> Option<&Event> {
        let key = self.index.get(&id)?;
        self.pending.get(key).map(|(_, e)| e)
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::event::{EventKind, PowerVariation};

    fn t(secs: f64) -> SimTime {
        SimTime::from_secs(secs).unwrap()
    }

    fn range() -> PowerVariation {
        PowerVariation::new(0.0, 100.0).unwrap()
    }

    #[test]
    fn pops_in_time_order() {
        let mut q = EventQueue::new();
        q.schedule(Event::switch_off(t(30.0)));
        q.schedule(Event::switch_on(t(10.0)));
        q.schedule(Event::set_power(t(20.0), 5.0, None, &range()).unwrap());

        let times: Vec<f64> = std::iter::from_fn(|| q.pop())
            .map(|(_, e)| e.time_of_occurrence().as_secs())
            .collect();
        assert_eq!(times, vec![10.0, 20.0, 30.0]);
    }

    #[test]
    fn same_time_ties_follow_priority() {
        let mut q = EventQueue::new();
        q.schedule(Event::switch_off(t(5.0)));
        q.schedule(Event::set_power(t(5.0), 5.0, None, &range()).unwrap());
        q.schedule(Event::switch_on(t(5.0)));

        let kinds: Vec<EventKind> = std::iter::from_fn(|| q.pop())
            .map(|(_, e)| e.kind())
            .collect();
        assert_eq!(
            kinds,
            vec![EventKind::SwitchOn, EventKind::SetPower, EventKind::SwitchOff]
        );
    }

    #[test]
    fn popped_order_is_consistent_with_priority() {
        let mut q = EventQueue::new();
        q.schedule(Event::switch_off(t(1.0)));
        q.schedule(Event::switch_on(t(1.0)));
        q.schedule(Event::set_power(t(1.0), 1.0, None, &range()).unwrap());
        q.schedule(Event::switch_on(t(1.0)));

        let popped: Vec<Event> = std::iter::from_fn(|| q.pop()).map(|(_, e)| e).collect();
        for pair in popped.windows(2) {
            assert!(pair[0].has_priority_over(&pair[1]));
        }
    }

    #[test]
    fn same_kind_ties_keep_insertion_order() {
        let mut q = EventQueue::new();
        let first = q.schedule(Event::set_power(t(1.0), 10.0, None, &range()).unwrap());
        let second = q.schedule(Event::set_power(t(1.0), 20.0, None, &range()).unwrap());
        assert_eq!(q.pop().map(|(id, _)| id), Some(first));
        assert_eq!(q.pop().map(|(id, _)| id), Some(second));
        assert!(q.is_empty());
    }

    #[test]
    fn cancel_flags_pending_event() {
        let mut q = EventQueue::new();
        let id = q.schedule(Event::switch_on(t(1.0)));
        assert!(q.cancel(id));
        assert_eq!(q.get(id).map(Event::is_cancelled), Some(true));
        assert_eq!(q.len(), 1);

        let (_, popped) = q.pop().unwrap();
        assert!(popped.is_cancelled());
        assert!(!q.cancel(id));
    }

    #[test]
    fn peek_time_reports_head() {
        let mut q = EventQueue::new();
        assert_eq!(q.peek_time(), None);
        q.schedule(Event::switch_on(t(7.0)));
        q.schedule(Event::switch_on(t(3.0)));
        assert_eq!(q.peek_time(), Some(t(3.0)));
    }
}
