use std::ops::RangeInclusive;

/// Splits `start..=end` into consecutive inclusive chunks of at most `max_block_range` blocks.
#[derive(Debug, Clone)]
pub(crate) struct RangeIterator {
    next_start: u64,
    end: u64,
    max_block_range: u64,
    done: bool,
}

impl RangeIterator {
    /// A `max_block_range` of zero is treated as one.
    pub(crate) fn new(start: u64, end: u64, max_block_range: u64) -> Self {
        Self { next_start: start, end, max_block_range: max_block_range.max(1), done: start > end }
    }
}

impl Iterator for RangeIterator {
    type Item = RangeInclusive<u64>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let start = self.next_start;
        let end = start.saturating_add(self.max_block_range - 1).min(self.end);
        if end == self.end {
            self.done = true;
        } else {
            self.next_start = end + 1;
        }

        Some(start..=end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_into_chunks() {
        let ranges: Vec<_> = RangeIterator::new(100, 250, 50).collect();
        assert_eq!(ranges, vec![100..=149, 150..=199, 200..=249, 250..=250]);
    }

    #[test]
    fn single_chunk_when_range_fits() {
        let ranges: Vec<_> = RangeIterator::new(101, 101, 1000).collect();
        assert_eq!(ranges, vec![101..=101]);
    }

    #[test]
    fn exact_boundary() {
        let ranges: Vec<_> = RangeIterator::new(100, 199, 50).collect();
        assert_eq!(ranges, vec![100..=149, 150..=199]);
    }

    #[test]
    fn empty_when_start_after_end() {
        assert_eq!(RangeIterator::new(200, 100, 50).next(), None);
    }

    #[test]
    fn zero_range_size_yields_single_blocks() {
        let ranges: Vec<_> = RangeIterator::new(7, 9, 0).collect();
        assert_eq!(ranges, vec![7..=7, 8..=8, 9..=9]);
    }

    #[test]
    fn reaches_u64_max_without_overflow() {
        let ranges: Vec<_> = RangeIterator::new(u64::MAX - 1, u64::MAX, 10).collect();
        assert_eq!(ranges, vec![u64::MAX - 1..=u64::MAX]);
    }
}
