use std::sync::Arc;

use crate::version::version_edit::{FileMetaData, VersionEdit};

/// Calculate the total size of given files.
#[inline]
pub fn total_file_size(files: &[Arc<FileMetaData>]) -> u64 {
    files.iter().fold(0, |acc, file| acc + file.file_size)
}

/// An immutable snapshot of which files exist at which level. Level 0 files
/// may overlap and are kept newest first; deeper levels are overlap-free and
/// sorted by smallest key. Structural changes never mutate a version:
/// applying a `VersionEdit` yields the superseding snapshot.
#[derive(Debug, Default)]
pub struct Version {
    levels: Vec<Vec<Arc<FileMetaData>>>,
}

impl Version {
    pub fn new(num_levels: usize) -> Self {
        Self {
            levels: vec![Vec::new(); num_levels],
        }
    }

    #[inline]
    pub fn num_levels(&self) -> usize {
        self.levels.len()
    }

    /// The files at `level`, or an empty slice for a level out of range.
    pub fn files(&self, level: usize) -> &[Arc<FileMetaData>] {
        self.levels.get(level).map(|f| f.as_slice()).unwrap_or(&[])
    }

    pub fn level_size(&self, level: usize) -> u64 {
        total_file_size(self.files(level))
    }

    pub fn level_compensated_size(&self, level: usize) -> u64 {
        self.files(level)
            .iter()
            .map(|f| f.compensated_file_size())
            .sum()
    }

    /// Produces the next version with `edit` folded in.
    pub fn apply(&self, edit: &VersionEdit) -> Version {
        let mut levels: Vec<Vec<Arc<FileMetaData>>> = self
            .levels
            .iter()
            .map(|files| {
                files
                    .iter()
                    .filter(|f| !edit.deleted.contains(&f.number))
                    .cloned()
                    .collect()
            })
            .collect();
        for (level, file) in &edit.added {
            assert!(
                *level < levels.len(),
                "level {} out of range for a version with {} levels",
                level,
                levels.len()
            );
            if *level == 0 {
                // Level 0 is ordered newest first.
                levels[*level].insert(0, file.clone());
            } else {
                levels[*level].push(file.clone());
            }
        }
        for level_files in levels.iter_mut().skip(1) {
            level_files.sort_by(|a, b| a.smallest.cmp(&b.smallest));
        }
        Version { levels }
    }

    /// The single serialization point for the being-compacted flags: the
    /// engine marks a picked compaction's inputs here, under its scheduling
    /// lock, before handing the compaction to an executor. Marking a file
    /// that is already held by another compaction indicates a scheduling
    /// bug and asserts.
    pub fn mark_files_being_compacted<'a, I>(&self, files: I, in_progress: bool)
    where
        I: IntoIterator<Item = &'a Arc<FileMetaData>>,
    {
        for file in files {
            let prev = file.set_being_compacted(in_progress);
            if in_progress {
                assert!(
                    !prev,
                    "file {} is already an input of another compaction",
                    file.number
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta(number: u64, file_size: u64, smallest: &str, largest: &str) -> FileMetaData {
        FileMetaData::new(
            number,
            file_size,
            smallest.as_bytes().to_vec(),
            largest.as_bytes().to_vec(),
        )
    }

    #[test]
    fn test_total_file_size() {
        let files = vec![
            Arc::new(meta(1, 100, "a", "b")),
            Arc::new(meta(2, 250, "c", "d")),
        ];
        assert_eq!(total_file_size(&files), 350);
        assert_eq!(total_file_size(&[]), 0);
    }

    #[test]
    fn test_apply_add_and_delete() {
        let mut edit = VersionEdit::new();
        edit.add_file(0, meta(1, 10, "a", "c"));
        edit.add_file(0, meta(2, 20, "b", "d"));
        edit.add_file(1, meta(3, 30, "m", "p"));
        edit.add_file(1, meta(4, 40, "e", "h"));
        let v1 = Version::new(7).apply(&edit);

        // Level 0 keeps newest first, deeper levels sort by smallest key.
        let l0: Vec<u64> = v1.files(0).iter().map(|f| f.number).collect();
        assert_eq!(l0, vec![2, 1]);
        let l1: Vec<u64> = v1.files(1).iter().map(|f| f.number).collect();
        assert_eq!(l1, vec![4, 3]);
        assert_eq!(v1.level_size(0), 30);
        assert_eq!(v1.level_size(1), 70);

        let mut edit2 = VersionEdit::new();
        edit2.delete_file(1);
        edit2.delete_file(4);
        let v2 = v1.apply(&edit2);
        assert_eq!(v2.files(0).len(), 1);
        assert_eq!(v2.files(1).len(), 1);
        // The superseded snapshot is untouched.
        assert_eq!(v1.files(0).len(), 2);
    }

    #[test]
    fn test_files_out_of_range() {
        let v = Version::new(2);
        assert!(v.files(5).is_empty());
        assert_eq!(v.level_size(5), 0);
    }

    #[test]
    fn test_mark_files_being_compacted() {
        let mut edit = VersionEdit::new();
        let f = edit.add_file(1, meta(1, 10, "a", "b"));
        let vers = Version::new(7).apply(&edit);

        vers.mark_files_being_compacted(std::iter::once(&f), true);
        assert!(f.is_compacting());
        vers.mark_files_being_compacted(std::iter::once(&f), false);
        assert!(!f.is_compacting());
    }

    #[test]
    #[should_panic(expected = "already an input of another compaction")]
    fn test_double_mark_panics() {
        let mut edit = VersionEdit::new();
        let f = edit.add_file(1, meta(1, 10, "a", "b"));
        let vers = Version::new(7).apply(&edit);

        vers.mark_files_being_compacted(std::iter::once(&f), true);
        vers.mark_files_being_compacted(std::iter::once(&f), true);
    }
}
