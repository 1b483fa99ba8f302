use futures::stream;
use lockstep_core::{ChannelDescriptor, Config, Synchronizer, WithTimestamp};
use std::{sync::Arc, time::Duration};
use tracing_subscriber::EnvFilter;

// Define your message type
#[derive(Debug)]
struct Reading(Duration, f64);

impl WithTimestamp for Reading {
    fn timestamp(&self) -> Duration {
        self.0
    }
}

#[tokio::main]
async fn main() -> eyre::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug")),
        )
        .init();

    let sync = Synchronizer::new(
        vec![
            ChannelDescriptor::<Reading>::stamped(),
            ChannelDescriptor::<Reading>::stamped(),
        ],
        Config::bounded(16).named("simple"),
    )?;

    let _matched = sync.register_callback(|group| {
        println!(
            "matched at {:?}: {:?}",
            group.stamp(),
            group.messages().iter().map(|msg| msg.1).collect::<Vec<_>>()
        );
    });
    let _dropped = sync.register_drop_callback(|slot| {
        println!(
            "dropped at {:?}: {} of {} arrived",
            slot.stamp(),
            slot.occupied(),
            slot.arity()
        );
    });

    macro_rules! make_stream {
        ($seq:expr) => {{
            stream::iter(
                $seq.iter()
                    .map(|&(ms, value)| Arc::new(Reading(Duration::from_millis(ms), value))),
            )
        }};
    }

    // Channel 1 never sees the reading at 2000ms, so that set is swept
    // to the drop callback when 3000ms completes.
    let camera_seq = &[(1000, 1.0), (2000, 2.0), (3000, 3.0)];
    let depth_seq = &[(1000, 10.0), (3000, 30.0)];

    let camera = sync.sink(0)?;
    let depth = sync.sink(1)?;

    camera.forward(make_stream!(camera_seq)).await?;
    depth.forward(make_stream!(depth_seq)).await?;

    Ok(())
}
