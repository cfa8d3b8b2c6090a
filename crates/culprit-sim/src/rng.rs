use serde::{Deserialize, Serialize};

/// Seeded LCG used to derive scenarios.
///
/// The same seed yields the same scenario on every platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeterministicRng {
    state: u64,
}

impl DeterministicRng {
    #[must_use]
    pub const fn new(seed: u64) -> Self {
        Self {
            state: seed ^ 0x9E37_79B9_7F4A_7C15,
        }
    }

    #[must_use]
    pub const fn next_u64(&mut self) -> u64 {
        self.state = self
            .state
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1_442_695_040_888_963_407);
        // High bits of an LCG are the well-mixed ones.
        self.state >> 16
    }

    /// Value in `range`, or `range.start` when the range is empty.
    #[must_use]
    pub fn in_range(&mut self, range: std::ops::Range<usize>) -> usize {
        let span = range.end.saturating_sub(range.start) as u64;
        if span == 0 {
            return range.start;
        }
        // `span` came from a usize, so the remainder fits back into one.
        #[allow(clippy::cast_possible_truncation)]
        let offset = (self.next_u64() % span) as usize;
        range.start + offset
    }

    /// Bernoulli trial with an integer percentage.
    #[must_use]
    pub fn chance(&mut self, percent: u8) -> bool {
        match percent {
            0 => false,
            100.. => true,
            p => self.next_u64() % 100 < u64::from(p),
        }
    }
}
