use std::time::Duration;

#[derive(Clone, Debug)]
pub struct Settings {
    /// Period of the scheduler tick. Ticks that come due while the previous
    /// one is still running are skipped, not queued.
    pub tick_interval: Duration,
    /// Stop and leave when channel membership (bot included) drops below
    /// this. 2 means "at least one human listener".
    pub autoleave_threshold: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_secs(1),
            autoleave_threshold: 2,
        }
    }
}
