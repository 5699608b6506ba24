//! Time-ordered timer queue shared by the scheduler workers.
use std::cmp::{Ordering, Reverse};
use std::collections::{BinaryHeap, HashMap};
use std::sync::{Mutex, PoisonError};

use effect_core::{ActorId, EffectId, Registration, TimerKind};
use tokio::sync::Notify;

/// One pending timer.
///
/// Ordered by due time, then by insertion sequence so timers due at the same
/// instant fire in the order they were scheduled.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TimerEntry {
    pub due_ms: u64,
    pub seq: u64,
    pub registration: Registration,
}

impl Ord for TimerEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.due_ms, self.seq).cmp(&(other.due_ms, other.seq))
    }
}

impl TimerEntry {
    fn key(&self) -> (ActorId, EffectId) {
        (self.registration.actor, self.registration.effect)
    }
}

impl PartialOrd for TimerEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Timer currently owned by an effect.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Live {
    seq: u64,
    due_ms: u64,
    kind: TimerKind,
}

#[derive(Debug, Default)]
struct Inner {
    heap: BinaryHeap<Reverse<TimerEntry>>,
    /// At most one live timer per effect. Heap entries not listed here were
    /// cancelled or replaced and are dropped when they surface.
    live: HashMap<(ActorId, EffectId), Live>,
    next_seq: u64,
}

impl Inner {
    fn is_live(&self, entry: &TimerEntry) -> bool {
        self.live
            .get(&entry.key())
            .is_some_and(|live| live.seq == entry.seq)
    }

    /// Drops cancelled entries sitting at the top of the heap.
    fn skip_dead(&mut self) {
        while let Some(Reverse(entry)) = self.heap.peek() {
            if self.is_live(entry) {
                break;
            }
            self.heap.pop();
        }
    }

    /// Rebuilds the heap once cancelled entries outnumber live ones.
    fn compact(&mut self) {
        if self.heap.len() <= COMPACT_SLACK + 2 * self.live.len() {
            return;
        }
        let live = &self.live;
        self.heap.retain(|Reverse(entry)| {
            live.get(&entry.key())
                .is_some_and(|timer| timer.seq == entry.seq)
        });
    }
}

const COMPACT_SLACK: usize = 64;

/// Min-heap of timers keyed by due time.
///
/// Each effect owns at most one timer. Scheduling a new one for the same
/// effect (a refresh or the next periodic tick) replaces the old one, and
/// [`TickQueue::cancel`] removes it when the effect ends early.
#[derive(Debug, Default)]
pub struct TickQueue {
    inner: Mutex<Inner>,
    notify: Notify,
}

impl TickQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues `registration` to fire at `due_ms`, replacing any timer the
    /// effect already had, and wakes idle workers.
    pub fn schedule_at(&self, registration: Registration, due_ms: u64) {
        {
            let mut inner = self.lock();
            let seq = inner.next_seq;
            inner.next_seq += 1;
            let entry = TimerEntry {
                due_ms,
                seq,
                registration,
            };
            let replaced = inner.live.insert(
                entry.key(),
                Live {
                    seq,
                    due_ms,
                    kind: registration.kind,
                },
            );
            inner.heap.push(Reverse(entry));
            if replaced.is_some() {
                inner.compact();
            }
        }
        self.notify.notify_waiters();
    }

    /// Removes the pending timer of `effect`. Returns false if it had none.
    pub fn cancel(&self, actor: ActorId, effect: EffectId) -> bool {
        let mut inner = self.lock();
        let cancelled = inner.live.remove(&(actor, effect)).is_some();
        if cancelled {
            inner.compact();
        }
        cancelled
    }

    /// Pops up to `max` live entries due at or before `now_ms`, earliest first.
    pub fn pop_due(&self, now_ms: u64, max: usize) -> Vec<TimerEntry> {
        let mut inner = self.lock();
        let mut due = Vec::new();
        while due.len() < max {
            inner.skip_dead();
            match inner.heap.peek() {
                Some(Reverse(entry)) if entry.due_ms <= now_ms => {
                    let entry = *entry;
                    inner.heap.pop();
                    inner.live.remove(&entry.key());
                    due.push(entry);
                }
                _ => break,
            }
        }
        due
    }

    /// Due time of the earliest pending entry.
    pub fn next_due(&self) -> Option<u64> {
        let mut inner = self.lock();
        inner.skip_dead();
        inner.heap.peek().map(|Reverse(entry)| entry.due_ms)
    }

    /// Due time of the expiry timer pending for `effect`, if any.
    pub fn expiry_of(&self, actor: ActorId, effect: EffectId) -> Option<u64> {
        self.lock()
            .live
            .get(&(actor, effect))
            .filter(|live| live.kind == TimerKind::Expire)
            .map(|live| live.due_ms)
    }

    /// Number of pending timers.
    pub fn len(&self) -> usize {
        self.lock().live.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub(crate) fn notify(&self) -> &Notify {
        &self.notify
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
