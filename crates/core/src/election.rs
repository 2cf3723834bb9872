//! Leader selection.

use authring_types::HashValue;

/// Select the winning pool slot for a round.
///
/// Pure modulus of the previous round's value over the current pool size.
/// The selection is only meaningful when every node evaluates it against
/// the same pool snapshot and the same previous value; the coordinator
/// hands both out in one critical section.
///
/// # Panics
///
/// Panics if `pool_size` is zero. Elections only run against a non-empty
/// pool.
pub fn select_winner(last_hash: HashValue, pool_size: usize) -> usize {
    (last_hash.0 % pool_size as u64) as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selection_is_modulus() {
        // Pool [A, B, C] with previous value 7 elects slot 1.
        assert_eq!(select_winner(HashValue(7), 3), 1);
        assert_eq!(select_winner(HashValue(0), 3), 0);
        assert_eq!(select_winner(HashValue(8), 3), 2);
        assert_eq!(select_winner(HashValue(9), 3), 0);
    }

    #[test]
    fn test_singleton_pool_always_elects_origin() {
        for value in [0u64, 1, 7, 9, 1_000_003] {
            assert_eq!(select_winner(HashValue(value), 1), 0);
        }
        assert_eq!(select_winner(HashValue::UNINIT, 1), 0);
    }

    #[test]
    fn test_selection_stays_in_range() {
        for pool_size in 1..=7 {
            for value in 0..100u64 {
                assert!(select_winner(HashValue(value), pool_size) < pool_size);
            }
        }
    }
}
