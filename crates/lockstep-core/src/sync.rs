use crate::{
    config::Config,
    input::{MessageSource, Sink, SourceConnection},
    signal::{Signal, Subscription},
    slot::Slot,
    state::State,
    types::{ChannelDescriptor, Group},
};
use eyre::{Result, ensure};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;

/// Smallest supported channel count.
pub const MIN_CHANNELS: usize = 2;

/// Largest supported channel count.
pub const MAX_CHANNELS: usize = 9;

/// Groups messages from multiple channels by exact stamp equality.
///
/// Each channel delivers messages through [`add`](Synchronizer::add), a
/// [`Sink`], or a bound [`MessageSource`]. The first arrival for a stamp
/// opens a pending set; when every channel has contributed to it, the
/// set fires through the output signal as a [`Group`]. Firing advances a
/// watermark: older pending sets can no longer complete and are swept to
/// the drop signal, as is the oldest set whenever the pending table
/// outgrows the configured queue bound.
///
/// All of this happens under one state lock, and output and drop
/// subscribers run while it is held. That is what makes emissions
/// totally ordered across producer threads, and it is also why callback
/// bodies must not block on calls back into the same synchronizer.
pub struct Synchronizer<T> {
    inner: Arc<Inner<T>>,
}

pub(crate) struct Inner<T> {
    channels: Vec<ChannelDescriptor<T>>,
    state: Mutex<State<T>>,
    output: Signal<Group<T>>,
    dropped: Signal<Slot<T>>,
    bindings: Mutex<Vec<SourceConnection>>,
    name: Mutex<String>,
}

impl<T> Synchronizer<T>
where
    T: Send + Sync + 'static,
{
    /// Create a synchronizer over the given channels.
    ///
    /// Fails when the channel count is outside
    /// [`MIN_CHANNELS`]..=[`MAX_CHANNELS`].
    pub fn new(channels: Vec<ChannelDescriptor<T>>, config: Config) -> Result<Self> {
        ensure!(
            (MIN_CHANNELS..=MAX_CHANNELS).contains(&channels.len()),
            "channel count must be within {MIN_CHANNELS}..={MAX_CHANNELS}, got {}",
            channels.len()
        );

        let arity = channels.len();
        Ok(Self {
            inner: Arc::new(Inner {
                channels,
                state: Mutex::new(State::new(arity, config.queue_size)),
                output: Signal::new(),
                dropped: Signal::new(),
                bindings: Mutex::new(Vec::new()),
                name: Mutex::new(config.name),
            }),
        })
    }

    /// Deliver a message on `channel`.
    ///
    /// Equivalent to an arrival from a bound source. Fails without
    /// touching any state when `channel` is out of range.
    pub fn add(&self, channel: usize, msg: Arc<T>) -> Result<()> {
        self.inner.add(channel, msg)
    }

    /// Register a callback invoked with every completed [`Group`].
    ///
    /// Callbacks run under the synchronizer state lock and must not
    /// block on calls back into this synchronizer.
    pub fn register_callback<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&Group<T>) + Send + Sync + 'static,
    {
        self.inner.output.connect(callback)
    }

    /// Register a callback invoked with every dropped [`Slot`].
    ///
    /// The slot carries whatever had arrived by the time it was dropped;
    /// vacant positions stay empty. The same locking contract as
    /// [`register_callback`](Synchronizer::register_callback) applies.
    pub fn register_drop_callback<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&Slot<T>) + Send + Sync + 'static,
    {
        self.inner.dropped.connect(callback)
    }

    /// Bind one source per channel, replacing all current bindings.
    ///
    /// Old bindings are released before any new sink is handed out, so
    /// no upstream event can reach the synchronizer through both an old
    /// and a new registration.
    pub fn connect_input(&self, sources: &mut [&mut dyn MessageSource<T>]) -> Result<()> {
        ensure!(
            sources.len() == self.channel_count(),
            "expected {} sources, got {}",
            self.channel_count(),
            sources.len()
        );

        let mut bindings = lock(&self.inner.bindings);
        bindings.clear();
        for (channel, source) in sources.iter_mut().enumerate() {
            let sink = Sink::new(Arc::downgrade(&self.inner), channel);
            bindings.push(source.register_sink(sink));
        }

        debug!(
            name = %lock(&self.inner.name),
            channels = sources.len(),
            "inputs connected"
        );
        Ok(())
    }

    /// Release every input binding. Messages already delivered stay
    /// pending.
    pub fn disconnect_all(&self) {
        lock(&self.inner.bindings).clear();
    }

    /// A cloneable delivery endpoint for `channel`, for producers that
    /// push directly instead of binding a [`MessageSource`].
    pub fn sink(&self, channel: usize) -> Result<Sink<T>> {
        ensure!(
            channel < self.channel_count(),
            "channel index {channel} out of range for {} channels",
            self.channel_count()
        );
        Ok(Sink::new(Arc::downgrade(&self.inner), channel))
    }

    /// Number of channels fixed at construction.
    pub fn channel_count(&self) -> usize {
        self.inner.channels.len()
    }

    /// Number of stamps currently pending.
    pub fn pending_len(&self) -> usize {
        self.inner.lock_state().len()
    }

    /// Number of messages held across all pending stamps.
    pub fn pending_message_count(&self) -> usize {
        self.inner.lock_state().message_count()
    }

    /// The diagnostic label.
    pub fn name(&self) -> String {
        lock(&self.inner.name).clone()
    }

    /// Replace the diagnostic label. No semantic effect.
    pub fn set_name(&self, name: impl Into<String>) {
        *lock(&self.inner.name) = name.into();
    }
}

impl<T> Inner<T>
where
    T: Send + Sync + 'static,
{
    pub(crate) fn add(&self, channel: usize, msg: Arc<T>) -> Result<()> {
        ensure!(
            channel < self.channels.len(),
            "channel index {channel} out of range for {} channels",
            self.channels.len()
        );
        let stamp = (self.channels[channel].stamp_fn)(&msg);

        let mut state = self.lock_state();

        // A stamp at or behind the watermark can never complete: hand
        // the message straight to drop subscribers as a one-element set
        // instead of parking it in the table.
        if state.is_stale(stamp) {
            debug!(channel, stamp = ?stamp, "drop a late message");
            let slot = Slot::single(self.channels.len(), stamp, channel, msg);
            self.dropped.emit(&slot);
            return Ok(());
        }

        if let Some(slot) = state.place(channel, stamp, msg) {
            let group = Group::new(stamp, slot.take());
            self.output.emit(&group);
            state.last_signal_time = Some(stamp);

            let swept = state.sweep_stale();
            if !swept.is_empty() {
                debug!(count = swept.len(), watermark = ?stamp, "swept sets behind the watermark");
            }
            for slot in swept {
                self.dropped.emit(&slot);
            }
        }

        let evicted = state.evict_overflow();
        if !evicted.is_empty() {
            debug!(count = evicted.len(), "dropped oldest sets past the queue bound");
        }
        for slot in evicted {
            self.dropped.emit(&slot);
        }

        Ok(())
    }

    fn lock_state(&self) -> MutexGuard<'_, State<T>> {
        // Subscriber panics are contained inside Signal::emit, so a
        // poisoned guard cannot carry a half-applied mutation.
        self.state.lock().unwrap_or_else(|err| err.into_inner())
    }
}

fn lock<V>(mutex: &Mutex<V>) -> MutexGuard<'_, V> {
    mutex.lock().unwrap_or_else(|err| err.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::WithTimestamp;
    use std::time::Duration;

    #[derive(Debug)]
    struct TestMessage {
        timestamp: Duration,
    }

    impl WithTimestamp for TestMessage {
        fn timestamp(&self) -> Duration {
            self.timestamp
        }
    }

    fn message(ms: u64) -> Arc<TestMessage> {
        Arc::new(TestMessage {
            timestamp: Duration::from_millis(ms),
        })
    }

    fn channels(count: usize) -> Vec<ChannelDescriptor<TestMessage>> {
        (0..count).map(|_| ChannelDescriptor::stamped()).collect()
    }

    #[test]
    fn test_new_accepts_supported_arities() {
        for count in MIN_CHANNELS..=MAX_CHANNELS {
            let result = Synchronizer::new(channels(count), Config::bounded(4));
            assert!(result.is_ok(), "arity {count} should be accepted");
        }
    }

    #[test]
    fn test_new_rejects_single_channel() {
        let result = Synchronizer::new(channels(1), Config::bounded(4));
        assert!(result.is_err());
    }

    #[test]
    fn test_new_rejects_excess_channels() {
        let result = Synchronizer::new(channels(10), Config::bounded(4));
        assert!(result.is_err());
    }

    #[test]
    fn test_add_rejects_out_of_range_channel() {
        let sync = Synchronizer::new(channels(2), Config::bounded(4)).unwrap();

        let result = sync.add(2, message(100));
        assert!(result.is_err());
        assert_eq!(sync.pending_len(), 0);
    }

    #[test]
    fn test_sink_rejects_out_of_range_channel() {
        let sync = Synchronizer::new(channels(2), Config::bounded(4)).unwrap();

        assert!(sync.sink(1).is_ok());
        assert!(sync.sink(2).is_err());
    }

    #[test]
    fn test_name_round_trip() {
        let sync =
            Synchronizer::new(channels(2), Config::bounded(4).named("fusion")).unwrap();
        assert_eq!(sync.name(), "fusion");

        sync.set_name("relabeled");
        assert_eq!(sync.name(), "relabeled");
    }

    #[test]
    fn test_unbounded_queue_keeps_everything() {
        let sync = Synchronizer::new(channels(2), Config::unbounded()).unwrap();

        for ms in 1..=100 {
            sync.add(0, message(ms)).unwrap();
        }
        assert_eq!(sync.pending_len(), 100);
    }
}
