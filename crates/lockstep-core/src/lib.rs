//! This library groups messages bearing identical timestamps from
//! multiple input channels into complete sets, one message per channel.
//!
//! A [`Synchronizer`] buffers arrivals keyed by their stamp. The moment
//! every channel has delivered a message for some stamp, the full set
//! fires through the output signal; sets left behind by that match, or
//! squeezed out of a bounded pending table, reach drop subscribers
//! instead. Matching is exact: stamps either compare equal or they never
//! meet.
//!
//! # Usage
//!
//! ```rust
//! use lockstep_core::{ChannelDescriptor, Config, Synchronizer, WithTimestamp};
//! use std::{sync::Arc, time::Duration};
//!
//! // Define your message type
//! #[derive(Debug)]
//! struct Sample {
//!     stamp: Duration,
//!     value: u32,
//! }
//!
//! impl WithTimestamp for Sample {
//!     fn timestamp(&self) -> Duration {
//!         self.stamp
//!     }
//! }
//!
//! # fn main() -> eyre::Result<()> {
//! // Two channels, at most ten stamps pending at once.
//! let sync = Synchronizer::new(
//!     vec![ChannelDescriptor::stamped(), ChannelDescriptor::stamped()],
//!     Config::bounded(10),
//! )?;
//!
//! let _matched = sync.register_callback(|group| {
//!     println!("matched {} messages at {:?}", group.len(), group.stamp());
//! });
//! let _dropped = sync.register_drop_callback(|slot| {
//!     println!("dropped a set with {} of {} messages", slot.occupied(), slot.arity());
//! });
//!
//! // Arrivals may interleave across channels in any order.
//! let t1 = Duration::from_millis(1);
//! sync.add(0, Arc::new(Sample { stamp: t1, value: 40 }))?;
//! sync.add(1, Arc::new(Sample { stamp: t1, value: 2 }))?;
//! # Ok(())
//! # }
//! ```

mod config;
pub mod input;
mod signal;
pub mod slot;
mod state;
mod sync;
mod types;

pub use config::Config;
pub use input::{MessageSource, NullSource, Sink, SourceConnection};
pub use signal::Subscription;
pub use slot::Slot;
pub use sync::{MAX_CHANNELS, MIN_CHANNELS, Synchronizer};
pub use types::{ChannelDescriptor, Group, StampFn, WithTimestamp};
