use std::cmp::Ordering;

/// A Comparator object provides a total order across byte slices that are
/// used as keys in an sstable or a database. A Comparator implementation
/// must be thread-safe since it may invoke its methods concurrently
/// from multiple threads.
pub trait Comparator: Sync + Send {
    /// Three-way comparison. Returns value:
    /// Ordering::Less iff a < b
    /// Ordering::Equal iff a == b
    /// Ordering::Greater iff a > b
    fn compare(&self, a: &[u8], b: &[u8]) -> Ordering;

    /// The name of comparator. Used to check for comparator
    /// mismatches (i.e., a DB created with one comparator is
    /// accessed using a different comparator.)
    fn name(&self) -> &str;

    /// Advance functions: these are used to reduce the space requirements
    /// for internal data structures like index blocks.
    ///
    /// If start > limit, returns a vec in [start,limit).
    /// Simple comparator implementations may return with start unchanged,
    /// i.e., an implementation of this method that does nothing is correct.
    fn find_shortest_separator(&self, start: &[u8], limit: &[u8]) -> Vec<u8>;

    /// Returns a short string >= key.
    fn find_short_successor(&self, key: &[u8]) -> Vec<u8>;
}

/// `BytewiseComparator` uses lexicographic byte-wise ordering.
#[derive(Default, Clone, Copy)]
pub struct BytewiseComparator {}

impl Comparator for BytewiseComparator {
    fn compare(&self, a: &[u8], b: &[u8]) -> Ordering {
        a.cmp(b)
    }

    fn name(&self) -> &str {
        "BytewiseComparator"
    }

    fn find_shortest_separator(&self, start: &[u8], limit: &[u8]) -> Vec<u8> {
        // Find length of common prefix.
        let min_length = std::cmp::min(start.len(), limit.len());
        let mut diff_index = 0;
        while diff_index < min_length && start[diff_index] == limit[diff_index] {
            diff_index += 1;
        }
        if diff_index >= min_length {
            // Do not shorten if one string is a prefix of the other.
        } else {
            let diff_byte = start[diff_index];
            if diff_byte < 0xff && diff_byte + 1 < limit[diff_index] {
                let mut res = vec![0; diff_index + 1];
                res[0..=diff_index].copy_from_slice(&start[0..=diff_index]);
                *(res.last_mut().unwrap()) += 1;
                return res;
            }
        }
        start.to_owned()
    }

    fn find_short_successor(&self, key: &[u8]) -> Vec<u8> {
        // Find first character that can be incremented.
        let n = key.len();
        for i in 0..n {
            let byte = key[i];
            if byte != 0xff {
                let mut res = vec![0; i + 1];
                res[0..=i].copy_from_slice(&key[0..=i]);
                *(res.last_mut().unwrap()) += 1;
                return res;
            }
        }
        key.to_owned()
    }
}
