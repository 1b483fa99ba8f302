use std::{fmt, ops::Index, sync::Arc, time::Duration};

/// Creates a timestamp from a message passed to the synchronizer.
///
/// Implement this for message types that carry their own stamp, then
/// describe their channels with [`ChannelDescriptor::stamped`].
pub trait WithTimestamp: Send + Sync {
    fn timestamp(&self) -> Duration;
}

/// A channel-specific timestamp projection.
///
/// Projections must be pure and cheap; the synchronizer calls them once
/// per delivered message, outside its state lock.
pub type StampFn<T> = Arc<dyn Fn(&T) -> Duration + Send + Sync>;

/// Describes one input channel of a [`Synchronizer`](crate::Synchronizer):
/// how to extract the match key from its messages, plus an optional label
/// used in trace output.
pub struct ChannelDescriptor<T> {
    pub(crate) stamp_fn: StampFn<T>,
    pub(crate) label: Option<String>,
}

impl<T: 'static> ChannelDescriptor<T> {
    /// A channel whose messages carry their own stamp via [`WithTimestamp`].
    pub fn stamped() -> Self
    where
        T: WithTimestamp,
    {
        Self {
            stamp_fn: Arc::new(|msg: &T| msg.timestamp()),
            label: None,
        }
    }

    /// A channel with a custom projection function.
    pub fn projected<F>(stamp_fn: F) -> Self
    where
        F: Fn(&T) -> Duration + Send + Sync + 'static,
    {
        Self {
            stamp_fn: Arc::new(stamp_fn),
            label: None,
        }
    }

    /// A channel whose messages have no usable stamp.
    ///
    /// Every message projects to the zero sentinel, so the channel only
    /// ever matches other unstamped channels. This keeps the arity of the
    /// synchronizer intact when a position must exist but cannot
    /// participate in real matching.
    pub fn unstamped() -> Self {
        Self {
            stamp_fn: Arc::new(|_: &T| Duration::ZERO),
            label: None,
        }
    }

    /// Attach a diagnostic label.
    pub fn labeled(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }
}

impl<T> Clone for ChannelDescriptor<T> {
    fn clone(&self) -> Self {
        Self {
            stamp_fn: Arc::clone(&self.stamp_fn),
            label: self.label.clone(),
        }
    }
}

impl<T> fmt::Debug for ChannelDescriptor<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChannelDescriptor")
            .field("label", &self.label)
            .finish_non_exhaustive()
    }
}

/// A completed set of messages, one per channel, all bearing the same
/// stamp. Emitted through the output signal.
pub struct Group<T> {
    stamp: Duration,
    messages: Vec<Arc<T>>,
}

impl<T> Group<T> {
    pub(crate) fn new(stamp: Duration, messages: Vec<Arc<T>>) -> Self {
        Self { stamp, messages }
    }

    /// The stamp shared by every message in the group.
    pub fn stamp(&self) -> Duration {
        self.stamp
    }

    /// Number of channels, equal to the synchronizer arity.
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// The message delivered on `channel`.
    pub fn get(&self, channel: usize) -> Option<&Arc<T>> {
        self.messages.get(channel)
    }

    /// All messages in channel order.
    pub fn messages(&self) -> &[Arc<T>] {
        &self.messages
    }

    /// Consume the group, yielding the messages in channel order.
    pub fn into_messages(self) -> Vec<Arc<T>> {
        self.messages
    }
}

impl<T> Index<usize> for Group<T> {
    type Output = Arc<T>;

    fn index(&self, channel: usize) -> &Self::Output {
        &self.messages[channel]
    }
}

impl<T> Clone for Group<T> {
    fn clone(&self) -> Self {
        Self {
            stamp: self.stamp,
            messages: self.messages.clone(),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Group<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Group")
            .field("stamp", &self.stamp)
            .field("messages", &self.messages)
            .finish()
    }
}
