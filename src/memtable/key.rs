use std::cmp::Ordering;

use crate::util::coding::{decode_fixed_64, put_fixed_64};
use crate::util::comparator::{BytewiseComparator, Comparator};

/// The max key sequence number. The value is 2^56 - 1 because the sequence
/// number only takes 56 bits when it is serialized into an internal key.
pub const MAX_KEY_SEQUENCE: u64 = (1u64 << 56) - 1;

/// The tail bytes length of an internal key:
/// 7 bytes sequence number + 1 byte type number.
pub const INTERNAL_KEY_TAIL: usize = 8;

#[derive(Debug, Clone, Copy, Eq, PartialEq, FromPrimitive)]
pub enum ValueType {
    KTypeDeletion = 0x0,
    KTypeValue = 0x1,
}

/// Composes the sequence number and value type into the single u64 tag that
/// trails every internal key.
pub fn compose_seq_number_and_type(seq_number: u64, value_type: ValueType) -> u64 {
    assert!(
        seq_number <= MAX_KEY_SEQUENCE,
        "key sequence number should be less than {}, but got {}",
        MAX_KEY_SEQUENCE,
        seq_number
    );
    seq_number << 8 | value_type as u64
}

/// A `LookupKey` represents a 'Get' request from the user by the given key
/// with a specific sequence number to perform an MVCC style query.
///
/// The format of a `LookupKey`:
///
/// ```text
///
///   +---------------------+--------------------------+
///   | user key bytes      | sequence (7) |  type (1) |
///   +---------------------+--------------------------+
///
/// ```
pub struct LookupKey {
    data: Vec<u8>,
}

impl LookupKey {
    pub fn new(user_key: &[u8], sequence_number: u64) -> Self {
        let mut data = Vec::with_capacity(user_key.len() + INTERNAL_KEY_TAIL);
        data.extend_from_slice(user_key);
        put_fixed_64(
            &mut data,
            compose_seq_number_and_type(sequence_number, ValueType::KTypeValue),
        );
        LookupKey { data }
    }

    /// Returns a key suitable for seeking in a MemTable.
    pub fn memtable_key(&self) -> &[u8] {
        &self.data
    }

    /// Returns the user key part.
    pub fn user_key(&self) -> &[u8] {
        &self.data[..self.data.len() - INTERNAL_KEY_TAIL]
    }
}

/// A comparator that additionally understands the internal-key layout, so
/// the memtable can compare extracted user keys directly.
pub trait KeyComparator: Comparator + Clone {
    fn compare_key(&self, a: &[u8], b: &[u8]) -> Ordering;

    fn same_key(&self, a: &[u8], b: &[u8]) -> bool {
        self.compare_key(a, b) == Ordering::Equal
    }
}

/// Orders internal keys by user key ascending, then by the fixed-width tag
/// suffix descending, so the newest generation of a key sorts first.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixedLengthSuffixComparator {
    len: usize,
}

impl FixedLengthSuffixComparator {
    pub fn new(len: usize) -> Self {
        assert_eq!(
            len, INTERNAL_KEY_TAIL,
            "suffix must be the {}-byte internal key tag",
            INTERNAL_KEY_TAIL
        );
        Self { len }
    }
}

impl Comparator for FixedLengthSuffixComparator {
    fn compare(&self, a: &[u8], b: &[u8]) -> Ordering {
        assert!(
            a.len() >= self.len && b.len() >= self.len,
            "internal key shorter than its suffix"
        );
        let (a_key, a_suffix) = a.split_at(a.len() - self.len);
        let (b_key, b_suffix) = b.split_at(b.len() - self.len);
        match a_key.cmp(b_key) {
            Ordering::Equal => decode_fixed_64(b_suffix).cmp(&decode_fixed_64(a_suffix)),
            ord => ord,
        }
    }

    fn name(&self) -> &str {
        "FixedLengthSuffixComparator"
    }

    fn find_shortest_separator(&self, start: &[u8], _limit: &[u8]) -> Vec<u8> {
        start.to_owned()
    }

    fn find_short_successor(&self, key: &[u8]) -> Vec<u8> {
        key.to_owned()
    }
}

impl KeyComparator for FixedLengthSuffixComparator {
    fn compare_key(&self, a: &[u8], b: &[u8]) -> Ordering {
        a.cmp(b)
    }
}

impl KeyComparator for BytewiseComparator {
    fn compare_key(&self, a: &[u8], b: &[u8]) -> Ordering {
        self.compare(a, b)
    }
}
