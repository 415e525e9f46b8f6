//! uORF ranking
//!
//! Rank 1 is the uORF whose start codon is closest to the CDS start. Ties are
//! broken by the smaller distance to the cap, then by the smaller genomic
//! start coordinate, then by input order.

/// Sort key of one uORF
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RankKey {
    /// Distance from the uORF start codon to the CDS start codon
    pub cds_distance: usize,
    /// Distance from the cap to the uORF start codon
    pub cap_distance: usize,
    /// Genomic position of the start codon's first transcribed base
    pub genomic_start: u64,
}

/// Assign 1-based ranks, returned in input order
///
/// # Examples
///
/// ```
/// use ferro_uorf::uorf::rank::{assign_ranks, RankKey};
///
/// let keys = [
///     RankKey { cds_distance: 30, cap_distance: 5, genomic_start: 105 },
///     RankKey { cds_distance: 12, cap_distance: 23, genomic_start: 123 },
/// ];
/// assert_eq!(assign_ranks(&keys), vec![2, 1]);
/// ```
pub fn assign_ranks(keys: &[RankKey]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..keys.len()).collect();
    order.sort_by_key(|&i| (keys[i], i));
    let mut ranks = vec![0; keys.len()];
    for (rank, i) in order.into_iter().enumerate() {
        ranks[i] = rank + 1;
    }
    ranks
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn key(cds_distance: usize, cap_distance: usize, genomic_start: u64) -> RankKey {
        RankKey {
            cds_distance,
            cap_distance,
            genomic_start,
        }
    }

    #[test]
    fn test_empty() {
        assert!(assign_ranks(&[]).is_empty());
    }

    #[test]
    fn test_tie_breaks() {
        let keys = [key(9, 5, 300), key(9, 4, 200), key(9, 4, 100), key(3, 10, 50)];
        assert_eq!(assign_ranks(&keys), vec![4, 3, 2, 1]);
    }

    #[test]
    fn test_full_tie_keeps_input_order() {
        let keys = [key(6, 6, 10), key(6, 6, 10)];
        assert_eq!(assign_ranks(&keys), vec![1, 2]);
    }

    proptest! {
        #[test]
        fn prop_ranks_idempotent(raw in proptest::collection::vec((0usize..50, 0usize..50, 0u64..50), 0..20)) {
            let keys: Vec<RankKey> = raw.iter().map(|&(a, b, c)| key(a, b, c)).collect();
            let ranks = assign_ranks(&keys);

            // Re-ranking the uORFs listed in rank order yields 1..=n
            let mut ordered: Vec<(usize, RankKey)> = ranks.iter().copied().zip(keys.iter().copied()).collect();
            ordered.sort_by_key(|(r, _)| *r);
            let reordered: Vec<RankKey> = ordered.iter().map(|(_, k)| *k).collect();
            let again = assign_ranks(&reordered);
            prop_assert_eq!(again, (1..=keys.len()).collect::<Vec<_>>());

            // Ranks are a permutation of 1..=n
            let mut sorted = ranks.clone();
            sorted.sort_unstable();
            prop_assert_eq!(sorted, (1..=keys.len()).collect::<Vec<_>>());
            prop_assert_eq!(assign_ranks(&keys), ranks);
        }
    }
}
