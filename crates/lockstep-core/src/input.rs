use crate::sync::Inner;
use eyre::Result;
use futures::{Stream, StreamExt, pin_mut};
use std::{
    fmt,
    sync::{Arc, Weak},
};

/// An external stream of messages that can feed one synchronizer
/// channel.
///
/// `register_sink` installs `sink` as the receiver of every subsequent
/// message and returns the connection that keeps the registration alive.
/// Dropping the connection must stop delivery; a source is re-bindable
/// after that.
pub trait MessageSource<T> {
    fn register_sink(&mut self, sink: Sink<T>) -> SourceConnection;
}

/// A source that never delivers anything.
///
/// Useful to fill a channel slot that exists only to keep the arity
/// intact, typically paired with
/// [`ChannelDescriptor::unstamped`](crate::ChannelDescriptor::unstamped).
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSource;

impl<T> MessageSource<T> for NullSource {
    fn register_sink(&mut self, _sink: Sink<T>) -> SourceConnection {
        SourceConnection::inert()
    }
}

/// Delivery endpoint for one channel of a synchronizer.
///
/// Sinks are cheap to clone and safe to hold past the synchronizer's
/// lifetime: delivery to a torn-down synchronizer is a silent no-op,
/// matching the teardown rule that still-pending messages vanish without
/// notification.
pub struct Sink<T> {
    inner: Weak<Inner<T>>,
    channel: usize,
}

impl<T> Sink<T>
where
    T: Send + Sync + 'static,
{
    pub(crate) fn new(inner: Weak<Inner<T>>, channel: usize) -> Self {
        Self { inner, channel }
    }

    /// The channel this sink feeds.
    pub fn channel(&self) -> usize {
        self.channel
    }

    /// Deliver a shared message handle to the synchronizer.
    pub fn deliver(&self, msg: Arc<T>) -> Result<()> {
        let Some(inner) = self.inner.upgrade() else {
            return Ok(());
        };
        inner.add(self.channel, msg)
    }

    /// Deliver an owned message, wrapping it in a shared handle.
    pub fn send(&self, msg: T) -> Result<()> {
        self.deliver(Arc::new(msg))
    }

    /// Drain `stream`, delivering every item in order.
    ///
    /// The caller supplies the executor; this only awaits the stream
    /// itself. Delivery stops at the first contract violation.
    pub async fn forward<S>(&self, stream: S) -> Result<()>
    where
        S: Stream<Item = Arc<T>>,
    {
        pin_mut!(stream);
        while let Some(msg) = stream.next().await {
            self.deliver(msg)?;
        }
        Ok(())
    }
}

impl<T> Clone for Sink<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Weak::clone(&self.inner),
            channel: self.channel,
        }
    }
}

impl<T> fmt::Debug for Sink<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sink")
            .field("channel", &self.channel)
            .finish_non_exhaustive()
    }
}

/// Handle to an upstream registration made through
/// [`MessageSource::register_sink`].
///
/// Dropping the connection releases the registration; after release the
/// source must not deliver through the sink it was given.
pub struct SourceConnection {
    release: Option<Box<dyn FnOnce() + Send>>,
}

impl SourceConnection {
    /// A connection that runs `release` when dropped.
    pub fn new(release: impl FnOnce() + Send + 'static) -> Self {
        Self {
            release: Some(Box::new(release)),
        }
    }

    /// A connection with nothing to release.
    pub fn inert() -> Self {
        Self { release: None }
    }

    /// Release the registration now.
    pub fn disconnect(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

impl Drop for SourceConnection {
    fn drop(&mut self) {
        self.release();
    }
}

impl fmt::Debug for SourceConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceConnection")
            .field("connected", &self.release.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};

    #[test]
    fn test_source_connection_releases_on_drop() {
        let released = Arc::new(AtomicBool::new(false));

        let connection = {
            let released = Arc::clone(&released);
            SourceConnection::new(move || released.store(true, Ordering::SeqCst))
        };

        assert!(!released.load(Ordering::SeqCst));
        drop(connection);
        assert!(released.load(Ordering::SeqCst));
    }

    #[test]
    fn test_source_connection_disconnect_releases_once() {
        let count = Arc::new(std::sync::atomic::AtomicUsize::new(0));

        let connection = {
            let count = Arc::clone(&count);
            SourceConnection::new(move || {
                count.fetch_add(1, Ordering::SeqCst);
            })
        };

        connection.disconnect();
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_inert_connection_is_a_no_op() {
        let connection = SourceConnection::inert();
        connection.disconnect();
    }
}
