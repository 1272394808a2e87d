//! Contiguous fixed-size batching shared by map and reduce rounds.

use std::ops::Range;

/// A contiguous slice of a round's unit list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Batch {
    /// Position of the batch within its round.
    pub index: usize,
    /// Indices of the units it covers.
    pub range: Range<usize>,
}

impl Batch {
    pub fn start(&self) -> usize {
        self.range.start
    }

    pub fn len(&self) -> usize {
        self.range.len()
    }

    pub fn is_empty(&self) -> bool {
        self.range.is_empty()
    }

    /// Whether this batch starts at the last unit of a `total`-unit list.
    ///
    /// Reduce rounds drop such a batch without invoking the model.
    pub fn is_trailing_single(&self, total: usize) -> bool {
        self.range.start + 1 == total
    }
}

/// Number of batches needed to cover `len` units.
///
/// # Panics
///
/// Panics if `batch_size` is zero.
pub fn batch_count(len: usize, batch_size: usize) -> usize {
    len.div_ceil(batch_size)
}

/// Partition `0..len` into consecutive batches of at most `batch_size`.
///
/// Unit `i` lands in batch `i / batch_size`.
///
/// # Panics
///
/// Panics if `batch_size` is zero.
pub fn batches(len: usize, batch_size: usize) -> impl Iterator<Item = Batch> {
    (0..batch_count(len, batch_size)).map(move |index| {
        let start = index * batch_size;
        Batch {
            index,
            range: start..(start + batch_size).min(len),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ranges(len: usize, batch_size: usize) -> Vec<Range<usize>> {
        batches(len, batch_size).map(|b| b.range).collect()
    }

    #[test]
    fn even_split() {
        assert_eq!(ranges(4, 2), vec![0..2, 2..4]);
    }

    #[test]
    fn trailing_partial_batch() {
        assert_eq!(ranges(5, 2), vec![0..2, 2..4, 4..5]);
        assert_eq!(ranges(7, 3), vec![0..3, 3..6, 6..7]);
    }

    #[test]
    fn fewer_units_than_batch_size() {
        assert_eq!(ranges(1, 4), vec![0..1]);
    }

    #[test]
    fn batch_lengths_cover_every_unit() {
        let all: Vec<Batch> = batches(7, 3).collect();
        let lens: Vec<usize> = all.iter().map(Batch::len).collect();
        assert_eq!(lens, vec![3, 3, 1]);
        assert!(all.iter().all(|b| !b.is_empty()));
        assert_eq!(lens.iter().sum::<usize>(), 7);
    }

    #[test]
    fn empty_input_has_no_batches() {
        assert_eq!(batches(0, 3).count(), 0);
        assert_eq!(batch_count(0, 3), 0);
    }

    #[test]
    fn count_matches_ceiling_division() {
        for len in 0..20 {
            for batch_size in 1..6 {
                let expected = (len + batch_size - 1) / batch_size;
                assert_eq!(batch_count(len, batch_size), expected);
                assert_eq!(batches(len, batch_size).count(), expected);
            }
        }
    }

    #[test]
    fn unit_index_maps_to_batch_index() {
        let all: Vec<Batch> = batches(11, 3).collect();
        for unit in 0..11 {
            let batch = &all[unit / 3];
            assert!(batch.range.contains(&unit));
        }
    }

    #[test]
    fn trailing_single_detection() {
        let all: Vec<Batch> = batches(5, 2).collect();
        assert!(!all[0].is_trailing_single(5));
        assert!(!all[1].is_trailing_single(5));
        assert!(all[2].is_trailing_single(5));

        // A two-element trailing batch does not start at the last index.
        let all: Vec<Batch> = batches(6, 2).collect();
        assert!(all.iter().all(|b| !b.is_trailing_single(6)));
    }
}
