use bytes::Bytes;
use num_traits::FromPrimitive;

use crate::error::Error;
use crate::iterator::Iter;
use crate::memtable::key::{
    compose_seq_number_and_type, KeyComparator, LookupKey, ValueType, INTERNAL_KEY_TAIL,
};
use crate::memtable::skiplist::{Skiplist, SkiplistIterator};
use crate::util::coding::{decode_fixed_64, put_fixed_64};
use crate::IResult;

mod arena;
pub mod key;
pub mod skiplist;

/// The in-memory write buffer: a skiplist over internal keys. Entries are
/// insert-only; an updated key gets a new entry under a fresh sequence
/// number and the comparator surfaces the newest generation first.
pub struct MemTable<C> {
    table: Skiplist<C>,
}

impl<C: KeyComparator> MemTable<C> {
    pub fn with_capacity(cmp: C, capacity: u32) -> Self {
        Self {
            table: Skiplist::with_capacity(cmp, capacity),
        }
    }

    /// Add an entry into memtable that maps key to value at the
    /// specified sequence number and with the specified type.
    /// Typically value will be empty if type==KTypeDeletion.
    ///
    /// ```text
    /// Format of an entry is concatenation of:
    ///
    /// internal key : user_key + sequence number + type
    /// value bytes  : stored as the skiplist value
    /// ```
    ///
    /// Returns `Error::ArenaFull` once the memtable is out of space; the
    /// caller is expected to rotate to a fresh memtable and flush this one.
    pub fn add(
        &self,
        sequence_number: u64,
        value_type: ValueType,
        key: &[u8],
        value: &[u8],
    ) -> IResult<()> {
        let mut buf = Vec::with_capacity(key.len() + INTERNAL_KEY_TAIL);
        buf.extend_from_slice(key);
        put_fixed_64(
            &mut buf,
            compose_seq_number_and_type(sequence_number, value_type),
        );
        self.table.put(buf, Bytes::copy_from_slice(value))?;
        Ok(())
    }

    /// If memtable contains a value for key, returns `Some(Ok(value))`.
    /// If memtable contains a deletion for key, returns
    /// `Some(Err(Error::NotFound))`, otherwise returns `None`.
    pub fn get(&self, key: &LookupKey) -> Option<IResult<Vec<u8>>> {
        let mem_key = key.memtable_key();
        let mut iter = self.table.iter();
        iter.seek_ge(mem_key);
        if iter.valid() {
            let ikey = iter.key();
            let key_size = ikey.len();
            match self
                .table
                .c
                .compare_key(&ikey[..key_size - INTERNAL_KEY_TAIL], key.user_key())
            {
                std::cmp::Ordering::Equal => {
                    let tag = decode_fixed_64(&ikey[key_size - INTERNAL_KEY_TAIL..]);
                    match ValueType::from_u64(tag & 0xff_u64) {
                        Some(ValueType::KTypeValue) => return Some(Ok(iter.value().to_vec())),
                        Some(ValueType::KTypeDeletion) => return Some(Err(Error::NotFound)),
                        None => {}
                    }
                }
                _ => return None,
            }
        }
        None
    }

    pub fn iter(&self) -> MemTableIterator<C> {
        MemTableIterator {
            iter: self.table.iter(),
        }
    }

    /// Returns an estimate of the number of bytes of data in use by this
    /// data structure. It is safe to call while the MemTable is being
    /// modified.
    pub fn memory_usage(&self) -> usize {
        self.table.memory_usage()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }
}

pub struct MemTableIterator<C: KeyComparator> {
    iter: SkiplistIterator<C>,
}

impl<C: KeyComparator> Iter for MemTableIterator<C> {
    fn valid(&self) -> bool {
        self.iter.valid()
    }

    fn seek_to_first(&mut self) {
        self.iter.first();
    }

    fn seek_to_last(&mut self) {
        self.iter.last();
    }

    fn seek(&mut self, target: &[u8]) {
        self.iter.seek_ge(target);
    }

    fn seek_for_prev(&mut self, target: &[u8]) {
        self.iter.seek_le(target);
    }

    fn next(&mut self) {
        self.iter.next();
    }

    fn prev(&mut self) {
        self.iter.prev();
    }

    fn key(&self) -> &[u8] {
        self.iter.key()
    }

    fn value(&self) -> &[u8] {
        self.iter.value()
    }

    fn status(&mut self) -> IResult<()> {
        Ok(())
    }
}
