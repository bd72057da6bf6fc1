use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use fxhash::FxHashSet;

/// Metadata for one on-disk sorted table file. Created by the manifest layer
/// on flush or compaction completion and shared immutably from then on; the
/// only mutable piece is the being-compacted flag, and writes to it are
/// funneled through `Version::mark_files_being_compacted`.
#[derive(Debug, Default)]
pub struct FileMetaData {
    pub number: u64,
    pub file_size: u64,
    /// Smallest user key served by this file.
    pub smallest: Bytes,
    /// Largest user key served by this file.
    pub largest: Bytes,
    /// Seconds since the unix epoch at which the file was written.
    pub creation_time: u64,
    pub num_entries: u64,
    pub num_deletions: u64,
    being_compacted: AtomicBool,
}

impl FileMetaData {
    pub fn new(
        number: u64,
        file_size: u64,
        smallest: impl Into<Bytes>,
        largest: impl Into<Bytes>,
    ) -> Self {
        Self {
            number,
            file_size,
            smallest: smallest.into(),
            largest: largest.into(),
            creation_time: 0,
            num_entries: 0,
            num_deletions: 0,
            being_compacted: AtomicBool::new(false),
        }
    }

    /// True while a scheduled compaction holds this file as an input.
    pub fn is_compacting(&self) -> bool {
        self.being_compacted.load(Ordering::SeqCst)
    }

    /// Flips the flag and returns its previous value. Only the version
    /// layer may call this; everyone else goes through
    /// `Version::mark_files_being_compacted`.
    pub(in crate::version) fn set_being_compacted(&self, in_progress: bool) -> bool {
        self.being_compacted.swap(in_progress, Ordering::SeqCst)
    }

    /// The raw size inflated to account for space held by pending deletions
    /// that have not been physically reclaimed yet: each tombstone is
    /// charged the file's average entry size.
    pub fn compensated_file_size(&self) -> u64 {
        if self.num_entries == 0 {
            return self.file_size;
        }
        let avg_entry_size = self.file_size / self.num_entries;
        self.file_size + self.num_deletions * avg_entry_size
    }
}

/// A structural change to a version: files added per level and file numbers
/// removed. Applying an edit produces a new `Version`; the old snapshot is
/// left untouched for readers still holding it.
#[derive(Debug, Default)]
pub struct VersionEdit {
    pub(crate) added: Vec<(usize, Arc<FileMetaData>)>,
    pub(crate) deleted: FxHashSet<u64>,
}

impl VersionEdit {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `file` for `level` and returns the shared handle.
    pub fn add_file(&mut self, level: usize, file: FileMetaData) -> Arc<FileMetaData> {
        let file = Arc::new(file);
        self.added.push((level, file.clone()));
        file
    }

    pub fn delete_file(&mut self, number: u64) {
        self.deleted.insert(number);
    }
}
