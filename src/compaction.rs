use std::sync::Arc;

use crate::version::version_edit::FileMetaData;

pub mod universal;

/// Why a compaction was picked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompactionReason {
    /// A file outlived the configured age threshold.
    PeriodicCompaction,
    /// The newer sorted runs outgrew the oldest one.
    SizeAmplification,
    /// A span of consecutive sorted runs of similar size.
    SizeRatio,
}

/// A file paired with the level it lives at.
#[derive(Debug, Clone)]
pub struct FileWithLevel {
    pub file: Arc<FileMetaData>,
    pub level: usize,
}

/// The files a compaction consumes from one level.
#[derive(Debug, Clone)]
pub struct CompactionInput {
    pub level: usize,
    pub files: Vec<Arc<FileMetaData>>,
}

/// A compaction selected by the picker. Selection is all-or-nothing for a
/// trigger evaluation: either every run of the chosen span is here, or the
/// trigger did not fire. The picker never mutates version state; the engine
/// routes the inputs through `Version::mark_files_being_compacted` before
/// releasing the task to an executor.
#[derive(Debug)]
pub struct PickedCompaction {
    pub reason: CompactionReason,
    pub inputs: Vec<CompactionInput>,
    pub output_level: usize,
}

impl PickedCompaction {
    /// All input files across levels, shallowest first.
    pub fn input_files(&self) -> impl Iterator<Item = &Arc<FileMetaData>> {
        self.inputs.iter().flat_map(|input| input.files.iter())
    }

    pub fn num_input_files(&self) -> usize {
        self.inputs.iter().map(|input| input.files.len()).sum()
    }
}
