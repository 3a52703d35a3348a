//! Misc utility functions

/// The fields of a binary search header for a run of equal-size records.
///
/// The guard record, if any, is not counted.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SearchRange {
    pub search_range: u16,
    pub entry_selector: u16,
    pub range_shift: u16,
}

impl SearchRange {
    /// Compute the header fields for `n_units` records of `unit_size` bytes.
    ///
    /// Values are truncated to 16 bits; callers that can produce more than
    /// 0xFFFF records reject them during validation.
    pub fn compute(n_units: usize, unit_size: usize) -> Self {
        let entry_selector = n_units.checked_ilog2().unwrap_or(0);
        let pow = 1usize << entry_selector;
        SearchRange {
            search_range: (unit_size * pow) as u16,
            entry_selector: entry_selector as u16,
            range_shift: (unit_size * n_units.saturating_sub(pow)) as u16,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(0, 4, (4, 0, 0))]
    #[case(1, 4, (4, 0, 0))]
    #[case(2, 4, (8, 1, 0))]
    #[case(3, 6, (12, 1, 6))]
    #[case(4, 6, (24, 2, 0))]
    #[case(39, 6, (192, 5, 42))]
    fn search_range(#[case] n_units: usize, #[case] unit_size: usize, #[case] expected: (u16, u16, u16)) {
        let range = SearchRange::compute(n_units, unit_size);
        assert_eq!(
            (range.search_range, range.entry_selector, range.range_shift),
            expected
        );
    }
}
