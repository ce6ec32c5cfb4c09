/// Driver configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Config {
    /// Transaction slots reserved at construction. The queue still grows
    /// past this; it only avoids reallocating while the schedule is built.
    pub capacity: usize,
    /// Start dispatching immediately instead of waiting for
    /// [`I2cQueue::start`](crate::I2cQueue::start).
    pub auto_start: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self { capacity: 8, auto_start: false }
    }
}
