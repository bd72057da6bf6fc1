#[macro_use]
extern crate num_derive;

mod error;
mod util;
pub mod opt;
pub mod iterator;
mod memtable;
mod version;
mod compaction;

pub use error::{Error, IResult};
pub use memtable::skiplist;
pub use memtable::{key, MemTable, MemTableIterator};
pub use util::comparator;
pub use util::time::{Clock, MockClock, SystemClock};
pub use version::version_edit::{FileMetaData, VersionEdit};
pub use version::version_set::{total_file_size, Version};
pub use compaction::universal::{calculate_sorted_runs, SortedRunInfo, UniversalCompactionPicker};
pub use compaction::{CompactionInput, CompactionReason, FileWithLevel, PickedCompaction};
