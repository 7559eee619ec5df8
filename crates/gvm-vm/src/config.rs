//! Process configuration.

/// Instructions a context may run before it is moved to the back of the
/// ready queue.
pub const TIME_SLICE: u32 = 1000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessConfig {
    /// Heap capacity in words, rounded down to a power of two.
    pub heap_words: usize,
    pub time_slice: u32,
    /// Total instructions across all contexts before the run is aborted.
    pub max_instructions: u64,
    /// Seed for select case shuffling. `None` picks a random seed.
    pub select_seed: Option<u64>,
    /// Fail with `Deadlock` when the main context can never resume.
    pub detect_deadlock: bool,
}

impl ProcessConfig {
    pub fn new() -> Self {
        Self {
            heap_words: 1 << 16,
            time_slice: TIME_SLICE,
            max_instructions: 10_000_000,
            select_seed: None,
            detect_deadlock: true,
        }
    }

    pub fn with_heap_words(mut self, heap_words: usize) -> Self {
        self.heap_words = heap_words;
        self
    }

    pub fn with_time_slice(mut self, time_slice: u32) -> Self {
        self.time_slice = time_slice.max(1);
        self
    }

    pub fn with_max_instructions(mut self, max_instructions: u64) -> Self {
        self.max_instructions = max_instructions;
        self
    }

    pub fn with_select_seed(mut self, seed: u64) -> Self {
        self.select_seed = Some(seed);
        self
    }

    pub fn with_deadlock_detection(mut self, enabled: bool) -> Self {
        self.detect_deadlock = enabled;
        self
    }
}

impl Default for ProcessConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ProcessConfig::default();
        assert_eq!(config.heap_words, 65536);
        assert_eq!(config.time_slice, TIME_SLICE);
        assert_eq!(config.max_instructions, 10_000_000);
        assert_eq!(config.select_seed, None);
        assert!(config.detect_deadlock);
    }

    #[test]
    fn test_builders() {
        let config = ProcessConfig::new()
            .with_heap_words(1024)
            .with_time_slice(0)
            .with_select_seed(7)
            .with_deadlock_detection(false);
        assert_eq!(config.heap_words, 1024);
        assert_eq!(config.time_slice, 1);
        assert_eq!(config.select_seed, Some(7));
        assert!(!config.detect_deadlock);
    }
}
