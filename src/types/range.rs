use std::num::NonZeroU64;

// Inclusive range. `first > last` is allowed and means "empty".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Range {
    pub first: u64,
    pub last: u64,
}

impl Range {
    pub fn new(first: u64, last: u64) -> Self {
        Self { first, last }
    }

    pub fn is_empty(&self) -> bool {
        self.first > self.last
    }

    pub fn len(&self) -> u64 {
        if self.is_empty() {
            0
        } else {
            (self.last - self.first).saturating_add(1)
        }
    }

    pub fn values(&self) -> std::ops::RangeInclusive<u64> {
        self.first..=self.last
    }
}

impl std::fmt::Display for Range {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}, {}]", self.first, self.last)
    }
}

/// Splits `[0, max_val)` into consecutive ranges of `interval` values.
/// The last range is truncated so that it ends at `max_val - 1`.
pub fn partition(max_val: u64, interval: NonZeroU64) -> impl Iterator<Item = Range> {
    let interval = interval.get();
    std::iter::successors(Some(0u64), move |&first| first.checked_add(interval))
        .take_while(move |&first| first < max_val)
        .map(move |first| Range::new(first, first.saturating_add(interval).min(max_val) - 1))
}
