use lockstep_core::{
    ChannelDescriptor, Config, Group, Slot, Subscription, Synchronizer, WithTimestamp,
};
use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestMessage {
    pub timestamp: Duration,
    pub data: String,
}

impl TestMessage {
    pub fn new(timestamp_ms: u64, data: &str) -> Self {
        Self {
            timestamp: Duration::from_millis(timestamp_ms),
            data: data.to_string(),
        }
    }
}

impl WithTimestamp for TestMessage {
    fn timestamp(&self) -> Duration {
        self.timestamp
    }
}

#[allow(dead_code)]
pub fn ms(timestamp_ms: u64) -> Duration {
    Duration::from_millis(timestamp_ms)
}

pub fn message(timestamp_ms: u64, data: &str) -> Arc<TestMessage> {
    Arc::new(TestMessage::new(timestamp_ms, data))
}

/// Build a synchronizer over `channel_count` stamped channels.
pub fn build_sync(channel_count: usize, queue_size: usize) -> Synchronizer<TestMessage> {
    let channels = (0..channel_count)
        .map(|_| ChannelDescriptor::stamped())
        .collect();
    Synchronizer::new(channels, Config::bounded(queue_size)).unwrap()
}

/// One observed emission, in the order the synchronizer produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Fired {
        stamp: Duration,
        data: Vec<String>,
    },
    Dropped {
        stamp: Duration,
        data: Vec<Option<String>>,
    },
}

/// Records every output and drop emission of one synchronizer into a
/// single interleaved log.
pub struct Recorder {
    events: Arc<Mutex<Vec<Event>>>,
    _subscriptions: Vec<Subscription>,
}

impl Recorder {
    pub fn attach(sync: &Synchronizer<TestMessage>) -> Self {
        let events = Arc::new(Mutex::new(Vec::new()));

        let fired = Arc::clone(&events);
        let on_group = sync.register_callback(move |group: &Group<TestMessage>| {
            fired.lock().unwrap().push(Event::Fired {
                stamp: group.stamp(),
                data: group
                    .messages()
                    .iter()
                    .map(|msg| msg.data.clone())
                    .collect(),
            });
        });

        let dropped = Arc::clone(&events);
        let on_drop = sync.register_drop_callback(move |slot: &Slot<TestMessage>| {
            dropped.lock().unwrap().push(Event::Dropped {
                stamp: slot.stamp(),
                data: slot
                    .messages()
                    .iter()
                    .map(|position| position.as_ref().map(|msg| msg.data.clone()))
                    .collect(),
            });
        });

        Self {
            events,
            _subscriptions: vec![on_group, on_drop],
        }
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }

    pub fn fired(&self) -> Vec<(Duration, Vec<String>)> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                Event::Fired { stamp, data } => Some((stamp, data)),
                Event::Dropped { .. } => None,
            })
            .collect()
    }

    #[allow(dead_code)]
    pub fn fired_stamps(&self) -> Vec<Duration> {
        self.fired().into_iter().map(|(stamp, _)| stamp).collect()
    }

    pub fn dropped(&self) -> Vec<(Duration, Vec<Option<String>>)> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                Event::Dropped { stamp, data } => Some((stamp, data)),
                Event::Fired { .. } => None,
            })
            .collect()
    }

    /// Total messages observed across all drop emissions.
    #[allow(dead_code)]
    pub fn dropped_message_count(&self) -> usize {
        self.dropped()
            .iter()
            .map(|(_, data)| data.iter().filter(|position| position.is_some()).count())
            .sum()
    }
}

/// Assert that fire stamps only ever move forward.
#[allow(dead_code)]
pub fn assert_strictly_increasing(stamps: &[Duration]) {
    for window in stamps.windows(2) {
        assert!(
            window[0] < window[1],
            "fire stamps must strictly increase: {:?} then {:?}",
            window[0],
            window[1]
        );
    }
}
