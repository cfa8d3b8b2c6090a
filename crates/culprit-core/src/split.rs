//! Halving of the remaining search window.

use std::ops::Range;

/// Split `items` into two ordered halves, the first one rounded up.
///
/// `first.len() == ceil(n / 2)` and `first ++ second == items` for every `n`,
/// including zero.
#[must_use]
pub fn split<T>(items: &[T]) -> (&[T], &[T]) {
    items.split_at(items.len().div_ceil(2))
}

/// Range form of [`split`], used by the bisector to avoid copying units.
#[must_use]
pub fn split_range(range: Range<usize>) -> (Range<usize>, Range<usize>) {
    let len = range.end.saturating_sub(range.start);
    let mid = range.start + len.div_ceil(2);
    (range.start..mid, mid..range.end)
}
