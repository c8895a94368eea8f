use crate::engine::Stats;

/// Live snapshot taken once per sampling tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    /// whole seconds since the test started
    pub t: u64,
    pub wpm: u32,
    pub accuracy: u32,
}

impl Sample {
    pub fn new(t: u64, stats: &Stats) -> Self {
        Self {
            t,
            wpm: stats.wpm,
            accuracy: stats.accuracy,
        }
    }

    pub fn wpm_point(&self) -> (f64, f64) {
        (self.t as f64, self.wpm as f64)
    }

    pub fn accuracy_point(&self) -> (f64, f64) {
        (self.t as f64, self.accuracy as f64)
    }
}
