use std::ptr::NonNull;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use rand::Rng;

use crate::memtable::arena::Arena;
use crate::util::comparator::Comparator;
use crate::IResult;

const MAX_HEIGHT: usize = 20;
const HEIGHT_INCREASE: u32 = u32::MAX / 3;

#[repr(C)]
struct Links {
    next: AtomicU32,
    prev: AtomicU32,
}

/// One record in the index. Key and value live in the arena and are referred
/// to by offset; the tower holds the per-level forward and backward links.
#[repr(C)]
pub struct Node {
    key_offset: u32,
    key_size: u32,
    value_offset: u32,
    value_size: u32,
    height: usize,
    // The actual size will vary depending on the height that a node was
    // allocated with.
    tower: [Links; MAX_HEIGHT],
}

impl Node {
    fn alloc(arena: &Arena, key: &[u8], value: &[u8], height: usize) -> IResult<u32> {
        let key_offset = arena.alloc_bytes(key)?;
        let value_offset = arena.alloc_bytes(value)?;

        let align = std::mem::align_of::<Node>();
        let size = std::mem::size_of::<Node>();
        let not_used = (MAX_HEIGHT - height - 1) * std::mem::size_of::<Links>();
        let node_offset = arena.alloc_align(align, size - not_used)?;
        unsafe {
            let node_ptr: *mut Node = arena.get_ptr(node_offset);
            let node = &mut *node_ptr;
            node.key_offset = key_offset;
            node.key_size = key.len() as u32;
            node.value_offset = value_offset;
            node.value_size = value.len() as u32;
            node.height = height;
            std::ptr::write_bytes(node.tower.as_mut_ptr(), 0, height + 1);
        }
        Ok(node_offset)
    }

    fn next_offset(&self, height: usize) -> u32 {
        self.tower[height].next.load(Ordering::SeqCst)
    }

    fn prev_offset(&self, height: usize) -> u32 {
        self.tower[height].prev.load(Ordering::SeqCst)
    }

    #[inline]
    unsafe fn key<'a>(&self, arena: &'a Arena) -> &'a [u8] {
        arena.slice(self.key_offset, self.key_size as usize)
    }

    #[inline]
    unsafe fn value<'a>(&self, arena: &'a Arena) -> &'a [u8] {
        arena.slice(self.value_offset, self.value_size as usize)
    }
}

/// The (prev, next) pair bracketing a key at one level during descent.
#[derive(Clone, Copy)]
struct Splice {
    prev: *mut Node,
    next: *mut Node,
}

impl Default for Splice {
    fn default() -> Self {
        Splice {
            prev: std::ptr::null_mut(),
            next: std::ptr::null_mut(),
        }
    }
}

struct SkiplistCore {
    height: AtomicUsize,
    head: NonNull<Node>,
    tail: NonNull<Node>,
    arena: Arena,
}

/// A concurrent, insert-only skiplist over arena-allocated nodes. Readers
/// need no coordination with the writer or with each other: nodes are linked
/// level by level from the base with their tower fully initialized before
/// publication, keys and values are never mutated in place, and nothing is
/// reclaimed before the whole arena is retired.
#[derive(Clone)]
pub struct Skiplist<C> {
    core: Arc<SkiplistCore>,
    pub c: C,
}

impl<C> Skiplist<C> {
    pub fn with_capacity(c: C, arena_size: u32) -> Skiplist<C> {
        let arena = Arena::with_capacity(arena_size);
        let head_offset = Node::alloc(&arena, &[], &[], MAX_HEIGHT - 1)
            .expect("arena capacity too small for skiplist sentinels");
        let tail_offset = Node::alloc(&arena, &[], &[], MAX_HEIGHT - 1)
            .expect("arena capacity too small for skiplist sentinels");
        let (head, tail) = unsafe {
            let head_ptr = arena.get_ptr::<Node>(head_offset);
            let tail_ptr = arena.get_ptr::<Node>(tail_offset);
            for i in 0..MAX_HEIGHT {
                (*head_ptr).tower[i].next.store(tail_offset, Ordering::SeqCst);
                (*tail_ptr).tower[i].prev.store(head_offset, Ordering::SeqCst);
            }
            (
                NonNull::new_unchecked(head_ptr),
                NonNull::new_unchecked(tail_ptr),
            )
        };
        Skiplist {
            core: Arc::new(SkiplistCore {
                height: AtomicUsize::new(0),
                head,
                tail,
                arena,
            }),
            c,
        }
    }

    fn random_height(&self) -> usize {
        let mut rng = rand::thread_rng();
        for h in 0..(MAX_HEIGHT - 1) {
            if !rng.gen_ratio(HEIGHT_INCREASE, u32::MAX) {
                return h;
            }
        }
        MAX_HEIGHT - 1
    }

    #[inline]
    fn height(&self) -> usize {
        self.core.height.load(Ordering::SeqCst)
    }

    unsafe fn get_next(&self, nd: *const Node, level: usize) -> *mut Node {
        self.core.arena.get_ptr::<Node>((*nd).next_offset(level))
    }

    unsafe fn get_prev(&self, nd: *const Node, level: usize) -> *mut Node {
        self.core.arena.get_ptr::<Node>((*nd).prev_offset(level))
    }
}

impl<C: Comparator> Skiplist<C> {
    /// Returns the value stored for `key`, if any.
    pub fn get(&self, key: &[u8]) -> Option<&[u8]> {
        self.get_with_key(key).map(|(_, v)| v)
    }

    /// Returns the stored key and value for the given key, or None if
    /// the key is not present.
    pub fn get_with_key(&self, key: &[u8]) -> Option<(&[u8], &[u8])> {
        let (_, n, found) = unsafe { self.seek_for_base_splice(key) };
        if !found {
            return None;
        }
        unsafe { Some(((*n).key(&self.core.arena), (*n).value(&self.core.arena))) }
    }

    /// Puts the key and value to skiplist. The list is insert-only: if the
    /// same key already exists nothing is replaced. Consider the follow-up
    /// situations:
    /// a).the value is the same too, then directly return none.
    /// b).the value is different, then return (key,value) to the caller.
    /// Exhaustion of the arena surfaces as `Error::ArenaFull`; a failed
    /// insert is never observable in traversal.
    pub fn put(
        &self,
        key: impl Into<Bytes>,
        value: impl Into<Bytes>,
    ) -> IResult<Option<(Bytes, Bytes)>> {
        let (key, value) = (key.into(), value.into());
        let mut list_height = self.height();
        let mut splices = [Splice::default(); MAX_HEIGHT + 1];
        splices[list_height + 1] = Splice {
            prev: self.core.head.as_ptr(),
            next: self.core.tail.as_ptr(),
        };
        for i in (0..=list_height).rev() {
            let (p, n, found) = unsafe { self.find_splice_for_level(&key, i, splices[i + 1].prev) };
            splices[i] = Splice { prev: p, next: n };
            if found {
                let existing = unsafe { (*n).value(&self.core.arena) };
                if existing != value.as_ref() {
                    return Ok(Some((key, value)));
                }
                return Ok(None);
            }
        }

        let height = self.random_height();
        let node_offset = Node::alloc(&self.core.arena, &key, &value, height)?;
        while height > list_height {
            match self.core.height.compare_exchange_weak(
                list_height,
                height,
                Ordering::SeqCst,
                Ordering::SeqCst,
            ) {
                Ok(_) => break,
                Err(h) => list_height = h,
            }
        }
        let x = unsafe { &*self.core.arena.get_ptr::<Node>(node_offset) };
        debug_assert_eq!(x.height, height);

        // We always insert from the base level and up. After a node is linked
        // at the base level, scans at the levels above would already discover
        // it through the drop-down search.
        for i in 0..=height {
            loop {
                if splices[i].prev.is_null() {
                    assert!(i > 1);
                    // We haven't computed prev, next for this level because
                    // height exceeds the old list height. The lists up here
                    // are sparse, so searching from head is cheap.
                    let (p, n, _) =
                        unsafe { self.find_splice_for_level(&key, i, self.core.head.as_ptr()) };
                    splices[i] = Splice { prev: p, next: n };
                    assert!(!std::ptr::eq(p, n));
                }

                let prev_offset = self.core.arena.offset(splices[i].prev);
                let next_offset = self.core.arena.offset(splices[i].next);
                x.tower[i].next.store(next_offset, Ordering::SeqCst);
                x.tower[i].prev.store(prev_offset, Ordering::SeqCst);
                match unsafe { &*splices[i].prev }.tower[i].next.compare_exchange(
                    next_offset,
                    node_offset,
                    Ordering::SeqCst,
                    Ordering::SeqCst,
                ) {
                    Ok(_) => {
                        // Repair the forward neighbour's back link. With a
                        // single active writer this cannot fail; under racing
                        // writers a stale back link only costs a reader one
                        // extra hop.
                        unsafe { &*splices[i].next }.tower[i]
                            .prev
                            .compare_exchange(
                                prev_offset,
                                node_offset,
                                Ordering::SeqCst,
                                Ordering::SeqCst,
                            )
                            .ok();
                        break;
                    }
                    Err(_) => {
                        // CAS failed, another writer got in between. Recompute
                        // the splice starting from the last known prev.
                        let (p, n, found) =
                            unsafe { self.find_splice_for_level(&key, i, splices[i].prev) };
                        if found {
                            assert_eq!(i, 0);
                            // The freshly allocated node stays unlinked in the
                            // arena and is reclaimed with it.
                            let existing = unsafe { (*n).value(&self.core.arena) };
                            if existing != value.as_ref() {
                                return Ok(Some((key, value)));
                            }
                            return Ok(None);
                        }
                        splices[i] = Splice { prev: p, next: n };
                    }
                }
            }
        }
        Ok(None)
    }

    /// Returns memory usage of the underlying arena.
    #[inline]
    pub fn memory_usage(&self) -> usize {
        self.core.arena.memory_used()
    }

    /// Returns true if skiplist is empty, otherwise return false.
    pub fn is_empty(&self) -> bool {
        unsafe {
            std::ptr::eq(
                self.get_next(self.core.head.as_ptr(), 0),
                self.core.tail.as_ptr(),
            )
        }
    }

    /// Returns the node count in skiplist.
    pub fn len(&self) -> usize {
        let mut count = 0;
        unsafe {
            let mut node = self.get_next(self.core.head.as_ptr(), 0);
            while !std::ptr::eq(node, self.core.tail.as_ptr()) {
                count += 1;
                node = self.get_next(node, 0);
            }
        }
        count
    }

    /// Returns the (prev, next) pair bracketing `key` at `level`, starting
    /// the scan at `start`. When an exact match exists, `next` is the
    /// matching node and the flag is true.
    unsafe fn find_splice_for_level(
        &self,
        key: &[u8],
        level: usize,
        start: *mut Node,
    ) -> (*mut Node, *mut Node, bool) {
        let mut prev = start;
        loop {
            let next = self.get_next(prev, level);
            if std::ptr::eq(next, self.core.tail.as_ptr()) {
                return (prev, next, false);
            }
            let next_key = (*next).key(&self.core.arena);
            match self.c.compare(key, next_key) {
                std::cmp::Ordering::Greater => prev = next,
                std::cmp::Ordering::Equal => return (prev, next, true),
                std::cmp::Ordering::Less => return (prev, next, false),
            }
        }
    }

    /// Classic drop-down search: from the top occupied level, bracket the
    /// key per level and reuse the level's prev as the next level's starting
    /// hint, until an exact match short-circuits or level 0 is exhausted.
    unsafe fn seek_for_base_splice(&self, key: &[u8]) -> (*mut Node, *mut Node, bool) {
        let mut level = self.height();
        let mut prev = self.core.head.as_ptr();
        loop {
            let (p, n, found) = self.find_splice_for_level(key, level, prev);
            if found {
                return (p, n, true);
            }
            if level == 0 {
                return (p, n, false);
            }
            prev = p;
            level -= 1;
        }
    }
}

impl<C: Comparator + Clone> Skiplist<C> {
    pub fn iter(&self) -> SkiplistIterator<C> {
        SkiplistIterator::new(self.clone())
    }
}

unsafe impl<C: Send> Send for Skiplist<C> {}

unsafe impl<C: Sync> Sync for Skiplist<C> {}

/// Returns true if the two slices are views over exactly the same underlying
/// bytes: same length, same starting address, both non-empty. Two empty
/// slices share no identity, so the answer for them is always false.
pub fn is_same_array(val1: &[u8], val2: &[u8]) -> bool {
    val1.len() == val2.len() && !val1.is_empty() && std::ptr::eq(val1.as_ptr(), val2.as_ptr())
}

/// A cursor over a skiplist. The current state of the iterator can be cloned
/// by simply value copying the struct; the clone navigates independently.
/// All read methods are thread-safe.
#[derive(Clone)]
pub struct SkiplistIterator<C: Comparator> {
    list: Option<Skiplist<C>>,
    nd: *const Node,
}

impl<C: Comparator + Clone> SkiplistIterator<C> {
    pub fn new(list: Skiplist<C>) -> Self {
        Self {
            list: Some(list),
            nd: std::ptr::null(),
        }
    }

    fn list(&self) -> &Skiplist<C> {
        self.list
            .as_ref()
            .expect("skiplist iterator used after close")
    }

    /// Drops the iterator's references. Idempotent; any further navigation
    /// call panics.
    pub fn close(&mut self) {
        self.list = None;
        self.nd = std::ptr::null();
    }

    /// Returns true iff the iterator is positioned at a real node.
    pub fn valid(&self) -> bool {
        match &self.list {
            None => false,
            Some(list) => {
                !self.nd.is_null()
                    && !std::ptr::eq(self.nd, list.core.head.as_ptr())
                    && !std::ptr::eq(self.nd, list.core.tail.as_ptr())
            }
        }
    }

    /// Moves to the first entry whose key is greater than or equal to the
    /// given key. Returns true if that exact key exists.
    pub fn seek_ge(&mut self, key: &[u8]) -> bool {
        let (_, next, found) = unsafe { self.list().seek_for_base_splice(key) };
        self.nd = next;
        found
    }

    /// Moves to the last entry whose key is less than or equal to the given
    /// key. Returns true if that exact key exists.
    pub fn seek_le(&mut self, key: &[u8]) -> bool {
        let (prev, next, found) = unsafe { self.list().seek_for_base_splice(key) };
        self.nd = if found { next } else { prev };
        found
    }

    /// Positions at the first entry in list. Final state is valid() iff the
    /// list is not empty.
    pub fn first(&mut self) -> bool {
        let (nd, ok) = {
            let list = self.list();
            let nd = unsafe { list.get_next(list.core.head.as_ptr(), 0) };
            (nd, !std::ptr::eq(nd, list.core.tail.as_ptr()))
        };
        self.nd = nd;
        ok
    }

    /// Positions at the last entry in list. Final state is valid() iff the
    /// list is not empty.
    pub fn last(&mut self) -> bool {
        let (nd, ok) = {
            let list = self.list();
            let nd = unsafe { list.get_prev(list.core.tail.as_ptr(), 0) };
            (nd, !std::ptr::eq(nd, list.core.head.as_ptr()))
        };
        self.nd = nd;
        ok
    }

    /// Advances to the next position. Stepping past the last entry lands on
    /// the tail sentinel and valid() turns false; that is the terminal
    /// condition, not an error.
    pub fn next(&mut self) -> bool {
        assert!(self.valid(), "invalid skiplist iterator");
        let (nd, ok) = {
            let list = self.list();
            let nd = unsafe { list.get_next(self.nd, 0) };
            (nd, !std::ptr::eq(nd, list.core.tail.as_ptr()))
        };
        self.nd = nd;
        ok
    }

    /// Moves to the previous position. Stepping before the first entry lands
    /// on the head sentinel and valid() turns false.
    pub fn prev(&mut self) -> bool {
        assert!(self.valid(), "invalid skiplist iterator");
        let (nd, ok) = {
            let list = self.list();
            let nd = unsafe { list.get_prev(self.nd, 0) };
            (nd, !std::ptr::eq(nd, list.core.head.as_ptr()))
        };
        self.nd = nd;
        ok
    }

    /// Returns the key at the current position. The span is borrowed from
    /// the arena and stays valid until the arena is torn down.
    pub fn key(&self) -> &[u8] {
        assert!(self.valid(), "invalid skiplist iterator");
        unsafe { (*self.nd).key(&self.list().core.arena) }
    }

    /// Returns the value at the current position.
    pub fn value(&self) -> &[u8] {
        assert!(self.valid(), "invalid skiplist iterator");
        unsafe { (*self.nd).value(&self.list().core.arena) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::comparator::BytewiseComparator;
    use std::sync::atomic::AtomicBool;
    use std::sync::mpsc;
    use std::thread;
    use std::time::Duration;

    fn new_value(v: usize) -> Bytes {
        Bytes::from(format!("{:05}", v))
    }

    fn key_with_ts(key: &str, ts: u64) -> Bytes {
        Bytes::from(format!("{}{:08}", key, ts))
    }

    #[test]
    fn test_empty() {
        let comp = BytewiseComparator::default();
        let list = Skiplist::with_capacity(comp, 1 << 20);
        let key = b"aaa";
        assert!(list.get(key).is_none());
        assert!(list.is_empty());
        assert_eq!(list.len(), 0);

        let mut iter = list.iter();
        assert!(!iter.valid());
        assert!(!iter.first());
        assert!(!iter.valid());
        assert!(!iter.last());
        assert!(!iter.valid());
        assert!(!iter.seek_ge(key));
        assert!(!iter.valid());
        assert!(!iter.seek_le(key));
        assert!(!iter.valid());
    }

    #[test]
    fn test_basic() {
        let comp = BytewiseComparator::default();
        let list = Skiplist::with_capacity(comp, 1 << 20);
        let table = vec![
            ("key1", new_value(42)),
            ("key2", new_value(52)),
            ("key3", new_value(62)),
            ("key5", Bytes::from({
                // Equivalent to the original `format!("{:0102400}", 1)`: a
                // left-zero-padded string of total width 102400 (102399 '0's
                // followed by '1'). Written this way because newer rustc caps
                // format-string widths at u16 (65535).
                let mut s = "0".repeat(102399);
                s.push('1');
                s
            })),
            ("key4", new_value(72)),
        ];

        for (key, value) in &table {
            assert!(list
                .put(key_with_ts(*key, 0), value.clone())
                .unwrap()
                .is_none());
        }

        assert_eq!(list.get(&key_with_ts("key", 0)), None);
        assert_eq!(list.len(), 5);
        assert!(!list.is_empty());
        for (key, value) in &table {
            let get_key = key_with_ts(*key, 0);
            assert_eq!(list.get(&get_key), Some(value.as_ref()), "{}", key);
        }
    }

    #[test]
    fn test_put_conflict() {
        let comp = BytewiseComparator::default();
        let list = Skiplist::with_capacity(comp, 1 << 20);
        let key = key_with_ts("dup", 0);
        assert!(list.put(key.clone(), new_value(1)).unwrap().is_none());
        // Same key, same value: silently ignored.
        assert!(list.put(key.clone(), new_value(1)).unwrap().is_none());
        // Same key, different value: the pair comes back untouched.
        let conflict = list.put(key.clone(), new_value(2)).unwrap();
        assert_eq!(conflict, Some((key.clone(), new_value(2))));
        assert_eq!(list.len(), 1);
        assert_eq!(list.get(&key), Some(new_value(1).as_ref()));
    }

    #[test]
    fn test_arena_full() {
        let comp = BytewiseComparator::default();
        let list = Skiplist::with_capacity(comp, 1 << 10);
        let huge = vec![0u8; 4096];
        match list.put(key_with_ts("k", 0), huge) {
            Err(crate::Error::ArenaFull { .. }) => {}
            other => panic!("expected ArenaFull, got {:?}", other.map(|_| ())),
        }
        // The failed insert must not be observable.
        assert!(list.is_empty());
        let mut iter = list.iter();
        assert!(!iter.first());
    }

    fn test_concurrent_basic(n: usize, cap: u32, value_len: usize) {
        let comp = BytewiseComparator::default();
        let list = Skiplist::with_capacity(comp, cap);
        let kvs: Vec<_> = (0..n)
            .map(|i| {
                (
                    key_with_ts(format!("{:05}", i).as_str(), 0),
                    Bytes::from(format!("{1:00$}", value_len, i)),
                )
            })
            .collect();
        let (tx, rx) = mpsc::channel();
        for (k, v) in kvs.clone() {
            let tx = tx.clone();
            let list = list.clone();
            thread::spawn(move || {
                list.put(k, v).unwrap();
                tx.send(()).unwrap();
            });
        }
        for _ in 0..n {
            rx.recv_timeout(Duration::from_secs(3)).unwrap();
        }
        for (k, v) in kvs {
            let tx = tx.clone();
            let list = list.clone();
            thread::spawn(move || {
                let val = list.get(&k);
                assert_eq!(val, Some(v.as_ref()), "{:?}", k);
                tx.send(()).unwrap();
            });
        }
        for _ in 0..n {
            rx.recv_timeout(Duration::from_secs(3)).unwrap();
        }
        assert_eq!(list.len(), n);
    }

    #[test]
    fn test_concurrent_basic_small_value() {
        test_concurrent_basic(1000, 1 << 20, 5);
    }

    #[test]
    fn test_one_key() {
        let n = 100;
        let comp = BytewiseComparator::default();
        let list = Skiplist::with_capacity(comp, 1 << 20);
        let key = key_with_ts("thekey", 0);
        let (tx, rx) = mpsc::channel();
        list.put(key.clone(), new_value(0)).unwrap();
        for i in 0..n {
            let tx = tx.clone();
            let list = list.clone();
            let key = key.clone();
            let value = new_value(i);
            thread::spawn(move || {
                list.put(key, value).unwrap();
                tx.send("w").unwrap();
            });
        }
        let mark = Arc::new(AtomicBool::new(false));
        for _ in 0..n {
            let tx = tx.clone();
            let list = list.clone();
            let mark = mark.clone();
            let key = key.clone();
            thread::spawn(move || {
                let val = list.get(&key);
                if val.is_none() {
                    return;
                }
                let s = unsafe { std::str::from_utf8_unchecked(val.unwrap()) };
                let val: usize = s.parse().unwrap();
                assert!(val < n);
                mark.store(true, Ordering::SeqCst);
                tx.send("r").unwrap();
            });
        }
        let mut r = 0;
        let mut w = 0;
        for _ in 0..(n * 2) {
            match rx.recv_timeout(Duration::from_secs(3)) {
                Ok("w") => w += 1,
                Ok("r") => r += 1,
                Err(err) => panic!("timeout on receiving r{} w{} msg {:?}", r, w, err),
                _ => panic!("unexpected value"),
            }
        }
        assert_eq!(list.len(), 1);
        assert!(mark.load(Ordering::SeqCst));
    }

    #[test]
    fn test_iterator_next() {
        let n = 100;
        let comp = BytewiseComparator::default();
        let list = Skiplist::with_capacity(comp, 1 << 20);
        let mut iter_ref = list.iter();
        assert!(!iter_ref.valid());
        assert!(!iter_ref.first());
        for i in (0..n).rev() {
            let key = key_with_ts(format!("{:05}", i).as_str(), 0);
            list.put(key, new_value(i)).unwrap();
        }
        iter_ref.first();
        for i in 0..n {
            assert!(iter_ref.valid());
            let v = iter_ref.value();
            assert_eq!(v, new_value(i));
            iter_ref.next();
        }
        assert!(!iter_ref.valid());
    }

    #[test]
    fn test_iterator_prev() {
        let n = 100;
        let comp = BytewiseComparator::default();
        let list = Skiplist::with_capacity(comp, 1 << 20);
        let mut iter_ref = list.iter();
        assert!(!iter_ref.valid());
        assert!(!iter_ref.last());
        for i in (0..n).rev() {
            let key = key_with_ts(format!("{:05}", i).as_str(), 0);
            list.put(key, new_value(i)).unwrap();
        }
        iter_ref.last();
        for i in (0..n).rev() {
            assert!(iter_ref.valid());
            let v = iter_ref.value();
            assert_eq!(v, new_value(i));
            iter_ref.prev();
        }
        assert!(!iter_ref.valid());
    }

    #[test]
    fn test_iterator_seek() {
        let n = 100;
        let comp = BytewiseComparator::default();
        let list = Skiplist::with_capacity(comp, 1 << 20);
        let mut iter_ref = list.iter();
        assert!(!iter_ref.valid());
        for i in (0..n).rev() {
            let v = i * 10 + 1000;
            let key = key_with_ts(format!("{:05}", v).as_str(), 0);
            list.put(key, new_value(v)).unwrap();
        }
        iter_ref.first();
        assert!(iter_ref.valid());
        assert_eq!(iter_ref.value(), b"01000" as &[u8]);

        let cases = vec![
            ("00000", Some(b"01000"), None, false),
            ("01000", Some(b"01000"), Some(b"01000"), true),
            ("01005", Some(b"01010"), Some(b"01000"), false),
            ("01010", Some(b"01010"), Some(b"01010"), true),
            ("99999", None, Some(b"01990"), false),
        ];
        for (key, ge_expect, le_expect, exists) in cases {
            let key = key_with_ts(key, 0);
            assert_eq!(iter_ref.seek_ge(&key), exists);
            assert_eq!(iter_ref.valid(), ge_expect.is_some());
            if let Some(v) = ge_expect {
                assert_eq!(iter_ref.value(), &v[..]);
            }
            assert_eq!(iter_ref.seek_le(&key), exists);
            assert_eq!(iter_ref.valid(), le_expect.is_some());
            if let Some(v) = le_expect {
                assert_eq!(iter_ref.value(), &v[..]);
            }
        }
    }

    #[test]
    fn test_iterator_clone_independent() {
        let comp = BytewiseComparator::default();
        let list = Skiplist::with_capacity(comp, 1 << 20);
        for i in 0..10 {
            list.put(key_with_ts(format!("{:05}", i).as_str(), 0), new_value(i))
                .unwrap();
        }
        let mut original = list.iter();
        original.first();
        let original_key = original.key().to_vec();

        let mut cloned = original.clone();
        cloned.next();
        cloned.next();
        assert_eq!(original.key(), original_key.as_slice());
        assert_ne!(cloned.key(), original.key());
    }

    #[test]
    fn test_iterator_close() {
        let comp = BytewiseComparator::default();
        let list = Skiplist::with_capacity(comp, 1 << 20);
        list.put(key_with_ts("a", 0), new_value(1)).unwrap();
        let mut iter = list.iter();
        iter.first();
        assert!(iter.valid());
        iter.close();
        assert!(!iter.valid());
        // Close is idempotent.
        iter.close();
        assert!(!iter.valid());
    }

    #[test]
    #[should_panic(expected = "used after close")]
    fn test_iterator_seek_after_close() {
        let comp = BytewiseComparator::default();
        let list = Skiplist::with_capacity(comp, 1 << 20);
        let mut iter = list.iter();
        iter.close();
        iter.seek_ge(b"a");
    }

    #[test]
    fn test_is_same_array() {
        let comp = BytewiseComparator::default();
        let list = Skiplist::with_capacity(comp, 1 << 20);
        let key = key_with_ts("k", 0);
        list.put(key.clone(), new_value(7)).unwrap();

        // Two reads of the same stored value alias the same arena bytes.
        let a = list.get(&key).unwrap();
        let b = list.get(&key).unwrap();
        assert!(is_same_array(a, b));

        // Equal content in independent allocations is not the same array.
        let x = new_value(7);
        assert!(!is_same_array(a, &x));

        // Empty spans carry no identity.
        assert!(!is_same_array(b"", b""));
    }
}
