use std::sync::Arc;

use bytes::Bytes;
use fxhash::FxHashSet;
use tracing::{debug, info};

use crate::compaction::{CompactionInput, CompactionReason, FileWithLevel, PickedCompaction};
use crate::opt::Options;
use crate::util::time::Clock;
use crate::version::version_edit::FileMetaData;
use crate::version::version_set::{total_file_size, Version};

/// A read-only view over one sorted run, derived from a version snapshot.
/// Level-0 files may overlap in key range, so each is a run of its own;
/// deeper levels are overlap-free and aggregate into a single run.
#[derive(Debug, Clone)]
pub struct SortedRunInfo {
    pub level: usize,
    /// Set only for level-0 runs; the run is this one file.
    pub file: Option<Arc<FileMetaData>>,
    /// For level > 0, the sum of sizes of all files in the level.
    pub size: u64,
    pub compensated_file_size: u64,
    /// For level > 0, true if any file in the level is mid-compaction.
    pub being_compacted: bool,
}

/// Derives the sorted runs of `vers`, ordered from newest (level 0) to
/// oldest (deepest level). A level above 0 contributes a run only when its
/// compensated size is greater than zero.
pub fn calculate_sorted_runs(vers: &Version, last_level: usize) -> Vec<SortedRunInfo> {
    let mut ret = Vec::new();

    for f in vers.files(0) {
        ret.push(SortedRunInfo {
            level: 0,
            file: Some(f.clone()),
            size: f.file_size,
            compensated_file_size: f.compensated_file_size(),
            being_compacted: f.is_compacting(),
        });
    }

    for level in 1..=last_level {
        let files = vers.files(level);
        let total_compensated_size: u64 = files.iter().map(|f| f.compensated_file_size()).sum();
        let being_compacted = files.iter().any(|f| f.is_compacting());
        if total_compensated_size > 0 {
            ret.push(SortedRunInfo {
                level,
                file: None,
                size: total_file_size(files),
                compensated_file_size: total_compensated_size,
                being_compacted,
            });
        }
    }

    ret
}

/// The user-key bounds of a run, if any are recorded.
fn run_key_bounds(vers: &Version, run: &SortedRunInfo) -> Option<(Bytes, Bytes)> {
    match &run.file {
        Some(f) => Some((f.smallest.clone(), f.largest.clone())),
        None => {
            let files = vers.files(run.level);
            let smallest = files.iter().map(|f| f.smallest.clone()).min()?;
            let largest = files.iter().map(|f| f.largest.clone()).max()?;
            Some((smallest, largest))
        }
    }
}

/// Picks universal (tiered) compactions over a version's sorted runs.
///
/// The picker itself performs no I/O, takes no locks and never mutates the
/// version; "nothing to do" is a normal outcome. The surrounding engine
/// serializes invocations and marks the inputs of a returned compaction
/// through `Version::mark_files_being_compacted` before executing it, so a
/// later pick cannot select the same files: runs whose being-compacted flag
/// is set are never selected here.
pub struct UniversalCompactionPicker {
    opts: Arc<Options>,
    clock: Arc<dyn Clock>,
}

impl UniversalCompactionPicker {
    pub fn new(opts: Arc<Options>, clock: Arc<dyn Clock>) -> Self {
        Self { opts, clock }
    }

    /// Returns the files whose creation time is strictly older than
    /// `now - periodic_compaction_seconds`, level-major in the version's
    /// iteration order. A zero threshold disables periodic compaction; a
    /// threshold reaching past the epoch qualifies nothing yet.
    pub fn compute_files_marked_for_periodic_compaction(
        &self,
        vers: &Version,
        last_level: usize,
    ) -> Vec<FileWithLevel> {
        let mut marked = Vec::new();

        let threshold = self.opts.periodic_compaction_seconds;
        if threshold == 0 {
            return marked;
        }
        let current_time = self.clock.now();
        if threshold > current_time {
            return marked;
        }

        let allowed_time_limit = current_time - threshold;
        for level in 0..=last_level {
            for f in vers.files(level) {
                if f.creation_time < allowed_time_limit {
                    marked.push(FileWithLevel {
                        file: f.clone(),
                        level,
                    });
                }
            }
        }
        marked
    }

    /// Decides the next compaction for the given version snapshot, if any.
    /// Age-qualified files outrank the size-based triggers; among those,
    /// size amplification outranks size ratio.
    pub fn pick_auto(&self, vers: &Version) -> Option<PickedCompaction> {
        let num_levels = vers.num_levels().min(self.opts.max_levels);
        if num_levels == 0 {
            return None;
        }
        let last_level = num_levels - 1;

        let runs = calculate_sorted_runs(vers, last_level);
        if runs.is_empty() {
            return None;
        }

        let marked = self.compute_files_marked_for_periodic_compaction(vers, last_level);
        if let Some(pc) = self.pick_periodic_compaction(vers, &runs, &marked, last_level) {
            return Some(pc);
        }
        if let Some(pc) = self.pick_size_amplification(vers, &runs, last_level) {
            return Some(pc);
        }
        if let Some(pc) = self.pick_size_ratio(vers, &runs, last_level) {
            return Some(pc);
        }
        debug!("universal compaction: nothing to do.");
        None
    }

    /// Rewrites the oldest age-qualified file together with the contiguous
    /// span of deeper runs its key range overlaps.
    fn pick_periodic_compaction(
        &self,
        vers: &Version,
        runs: &[SortedRunInfo],
        marked: &[FileWithLevel],
        last_level: usize,
    ) -> Option<PickedCompaction> {
        let mut candidates: Vec<&FileWithLevel> = marked
            .iter()
            .filter(|fl| !fl.file.is_compacting())
            .collect();
        candidates.sort_by_key(|fl| fl.file.creation_time);

        'candidate: for fl in candidates {
            let orig = match runs.iter().position(|r| match &r.file {
                Some(f) => f.number == fl.file.number,
                None => r.level == fl.level,
            }) {
                Some(idx) => idx,
                None => continue,
            };
            // Level-0 runs may overlap each other, so a span touching
            // level 0 must begin at the newest run.
            let (start, mut end) = if runs[orig].level == 0 {
                (0, orig)
            } else {
                (orig, orig)
            };
            if runs[start..=end].iter().any(|r| r.being_compacted) {
                continue;
            }

            let mut bounds: Option<(Bytes, Bytes)> = None;
            for run in &runs[start..=end] {
                match run_key_bounds(vers, run) {
                    Some((s, l)) => {
                        bounds = Some(match bounds {
                            None => (s, l),
                            Some((cs, cl)) => (cs.min(s), cl.max(l)),
                        })
                    }
                    None => continue 'candidate,
                }
            }
            let (mut smallest, mut largest) = match bounds {
                Some(b) => b,
                None => continue,
            };

            while end + 1 < runs.len() {
                let next = &runs[end + 1];
                if next.being_compacted {
                    break;
                }
                let (next_smallest, next_largest) = match run_key_bounds(vers, next) {
                    Some(b) => b,
                    None => break,
                };
                if next_largest < smallest || next_smallest > largest {
                    break;
                }
                smallest = smallest.min(next_smallest);
                largest = largest.max(next_largest);
                end += 1;
            }

            info!(
                "universal compaction triggered by file age: file {} at level {}.",
                fl.file.number, fl.level
            );
            let all = start == 0 && end == runs.len() - 1;
            return Some(self.compaction_from_span(
                vers,
                &runs[start..=end],
                CompactionReason::PeriodicCompaction,
                all,
                last_level,
            ));
        }
        None
    }

    /// Fires when the combined compensated size of every run above the
    /// oldest exceeds the configured percentage of the oldest run. The
    /// rewrite covers all runs, so every run must be free.
    fn pick_size_amplification(
        &self,
        vers: &Version,
        runs: &[SortedRunInfo],
        last_level: usize,
    ) -> Option<PickedCompaction> {
        if runs.len() < 2 {
            return None;
        }
        if runs.iter().any(|r| r.being_compacted) {
            return None;
        }

        let base_size = runs[runs.len() - 1].compensated_file_size;
        let candidate_size: u64 = runs[..runs.len() - 1]
            .iter()
            .map(|r| r.compensated_file_size)
            .sum();
        if base_size == 0 {
            return None;
        }
        if (candidate_size as u128) * 100
            < (base_size as u128) * (self.opts.max_size_amplification_percent as u128)
        {
            return None;
        }

        info!(
            "universal compaction triggered by size amplification: {} bytes above a base of {} bytes.",
            candidate_size, base_size
        );
        Some(self.compaction_from_span(
            vers,
            runs,
            CompactionReason::SizeAmplification,
            true,
            last_level,
        ))
    }

    /// Grows a span from the newest free run while the next run's size stays
    /// within `size_ratio` percent of the accumulated candidate, and fires
    /// once the span reaches `min_merge_width` runs.
    fn pick_size_ratio(
        &self,
        vers: &Version,
        runs: &[SortedRunInfo],
        last_level: usize,
    ) -> Option<PickedCompaction> {
        let min_merge_width = self.opts.min_merge_width.max(2);
        let max_merge_width = self.opts.max_merge_width.unwrap_or(usize::MAX);

        let mut start = 0;
        while start < runs.len() {
            // Level-0 runs may overlap, so a span touching level 0 must
            // begin at the newest run.
            if runs[start].being_compacted || (runs[start].level == 0 && start != 0) {
                start += 1;
                continue;
            }

            let mut candidate_size = runs[start].compensated_file_size as u128;
            let mut end = start;
            while end + 1 < runs.len() && end + 2 - start <= max_merge_width {
                let next = &runs[end + 1];
                if next.being_compacted {
                    break;
                }
                if (next.compensated_file_size as u128) * 100
                    > candidate_size * (100 + self.opts.size_ratio as u128)
                {
                    break;
                }
                candidate_size += next.compensated_file_size as u128;
                end += 1;
            }

            let width = end - start + 1;
            if width >= min_merge_width {
                info!(
                    "universal compaction triggered by size ratio: {} sorted runs starting at run {}.",
                    width, start
                );
                let all = start == 0 && end == runs.len() - 1;
                return Some(self.compaction_from_span(
                    vers,
                    &runs[start..=end],
                    CompactionReason::SizeRatio,
                    all,
                    last_level,
                ));
            }
            start += 1;
        }
        None
    }

    /// Materializes a contiguous span of runs into per-level inputs.
    fn compaction_from_span(
        &self,
        vers: &Version,
        span: &[SortedRunInfo],
        reason: CompactionReason,
        all_runs_selected: bool,
        last_level: usize,
    ) -> PickedCompaction {
        let mut inputs: Vec<CompactionInput> = Vec::new();
        for run in span {
            match &run.file {
                Some(f) => match inputs.last_mut() {
                    Some(input) if input.level == 0 => input.files.push(f.clone()),
                    _ => inputs.push(CompactionInput {
                        level: 0,
                        files: vec![f.clone()],
                    }),
                },
                None => inputs.push(CompactionInput {
                    level: run.level,
                    files: vers.files(run.level).to_vec(),
                }),
            }
        }

        if cfg!(debug_assertions) {
            let mut seen = FxHashSet::default();
            for f in inputs.iter().flat_map(|input| input.files.iter()) {
                assert!(seen.insert(f.number), "file {} selected twice", f.number);
            }
        }

        let output_level = if all_runs_selected {
            last_level
        } else {
            span.last().map(|r| r.level).unwrap_or(0)
        };
        PickedCompaction {
            reason,
            inputs,
            output_level,
        }
    }
}
