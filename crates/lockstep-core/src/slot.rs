use std::{fmt, sync::Arc, time::Duration};

/// A fixed-arity record of pending messages sharing one stamp.
///
/// A slot is created on the first arrival for its stamp and holds one
/// optional message per channel until every position is occupied, the
/// stamp falls behind the watermark, or the pending table overflows.
/// Incomplete slots reach drop subscribers as-is, with the vacant
/// positions still empty.
pub struct Slot<T> {
    stamp: Duration,
    messages: Vec<Option<Arc<T>>>,
}

impl<T> Slot<T> {
    pub(crate) fn new(arity: usize, stamp: Duration) -> Self {
        let mut messages = Vec::with_capacity(arity);
        messages.resize_with(arity, || None);
        Self { stamp, messages }
    }

    /// A slot holding a single message, used when a late arrival is
    /// turned straight into a drop without entering the pending table.
    pub(crate) fn single(arity: usize, stamp: Duration, channel: usize, msg: Arc<T>) -> Self {
        let mut slot = Self::new(arity, stamp);
        slot.place(channel, msg);
        slot
    }

    /// The stamp every occupant of this slot projects to.
    pub fn stamp(&self) -> Duration {
        self.stamp
    }

    /// Number of channel positions, occupied or not.
    pub fn arity(&self) -> usize {
        self.messages.len()
    }

    /// The message held for `channel`, if one has arrived.
    pub fn get(&self, channel: usize) -> Option<&Arc<T>> {
        self.messages.get(channel).and_then(|slot| slot.as_ref())
    }

    /// All positions in channel order.
    pub fn messages(&self) -> &[Option<Arc<T>>] {
        &self.messages
    }

    /// Number of occupied positions.
    pub fn occupied(&self) -> usize {
        self.messages.iter().filter(|slot| slot.is_some()).count()
    }

    pub fn is_complete(&self) -> bool {
        self.messages.iter().all(|slot| slot.is_some())
    }

    /// Store `msg` at `channel`, replacing any previous occupant.
    ///
    /// Replacement is silent: the upstream contract promises at most one
    /// message per (stream, stamp), so a second arrival is a re-publish
    /// and the latest handle wins.
    pub(crate) fn place(&mut self, channel: usize, msg: Arc<T>) {
        debug_assert!(channel < self.messages.len());
        self.messages[channel] = Some(msg);
    }

    /// Consume a complete slot, yielding the messages in channel order.
    pub(crate) fn take(self) -> Vec<Arc<T>> {
        debug_assert!(self.is_complete());
        self.messages.into_iter().flatten().collect()
    }
}

impl<T> Clone for Slot<T> {
    fn clone(&self) -> Self {
        Self {
            stamp: self.stamp,
            messages: self.messages.clone(),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Slot<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Slot")
            .field("stamp", &self.stamp)
            .field("messages", &self.messages)
            .finish()
    }
}
