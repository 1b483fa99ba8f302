use crate::slot::Slot;
use std::{collections::BTreeMap, sync::Arc, time::Duration};

/// The pending table and watermark guarded by the synchronizer's state
/// lock.
///
/// Slots live in a map ordered by stamp; the drop sweeps depend on that
/// order. Every mutation here is pure bookkeeping: evicted slots are
/// returned to the caller, which owns signal emission.
pub(crate) struct State<T> {
    /// Pending slots, ascending by stamp.
    slots: BTreeMap<Duration, Slot<T>>,

    /// Stamp of the most recently completed set. Pending stamps at or
    /// below this value are unreachable and get swept.
    pub(crate) last_signal_time: Option<Duration>,

    /// Soft cap on the number of pending slots. Zero disables the bound.
    queue_size: usize,

    arity: usize,
}

impl<T> State<T> {
    pub(crate) fn new(arity: usize, queue_size: usize) -> Self {
        Self {
            slots: BTreeMap::new(),
            last_signal_time: None,
            queue_size,
            arity,
        }
    }

    /// Whether `stamp` is at or behind the watermark and can no longer
    /// complete.
    pub(crate) fn is_stale(&self, stamp: Duration) -> bool {
        self.last_signal_time
            .is_some_and(|watermark| stamp <= watermark)
    }

    /// Store `msg` in the slot for `stamp`, creating the slot on first
    /// arrival. When the placement completes the slot, it is removed
    /// from the table and returned.
    pub(crate) fn place(
        &mut self,
        channel: usize,
        stamp: Duration,
        msg: Arc<T>,
    ) -> Option<Slot<T>> {
        let arity = self.arity;
        let slot = self
            .slots
            .entry(stamp)
            .or_insert_with(|| Slot::new(arity, stamp));
        slot.place(channel, msg);

        if slot.is_complete() {
            self.slots.remove(&stamp)
        } else {
            None
        }
    }

    /// Remove every slot at or behind the watermark, ascending by stamp.
    ///
    /// The table is ordered, so the scan stops at the first surviving
    /// stamp.
    pub(crate) fn sweep_stale(&mut self) -> Vec<Slot<T>> {
        let Some(watermark) = self.last_signal_time else {
            return Vec::new();
        };

        let mut swept = Vec::new();
        while let Some(entry) = self.slots.first_entry() {
            if *entry.key() <= watermark {
                swept.push(entry.remove());
            } else {
                break;
            }
        }
        swept
    }

    /// Remove oldest slots until the table fits the queue bound,
    /// ascending by stamp. No-op when unbounded.
    pub(crate) fn evict_overflow(&mut self) -> Vec<Slot<T>> {
        let mut evicted = Vec::new();
        while self.queue_size > 0 && self.slots.len() > self.queue_size {
            let Some((_, slot)) = self.slots.pop_first() else {
                break;
            };
            evicted.push(slot);
        }
        evicted
    }

    pub(crate) fn len(&self) -> usize {
        self.slots.len()
    }

    /// Total number of messages held across all pending slots.
    pub(crate) fn message_count(&self) -> usize {
        self.slots.values().map(|slot| slot.occupied()).sum()
    }
}
