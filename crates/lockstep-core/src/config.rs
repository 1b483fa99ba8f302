/// Configuration parameters for a [`Synchronizer`](crate::Synchronizer).
#[derive(Debug, Clone)]
pub struct Config {
    /// Maximum number of stamps kept pending while their sets fill up.
    /// When a completing or arriving message would push the table past
    /// this bound, the oldest pending sets are dropped first. Zero
    /// disables the bound entirely.
    pub queue_size: usize,

    /// Diagnostic label carried into trace output. No semantic effect.
    pub name: String,
}

impl Config {
    /// A bounded pending table holding at most `queue_size` stamps.
    pub fn bounded(queue_size: usize) -> Self {
        Self {
            queue_size,
            name: String::new(),
        }
    }

    /// An unbounded pending table; only watermark sweeps remove
    /// incomplete sets.
    pub fn unbounded() -> Self {
        Self::bounded(0)
    }

    /// Set the diagnostic label.
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}
