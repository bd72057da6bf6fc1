use crate::IResult;

/// The internal iterator contract shared by the memtable and the higher
/// read paths. Navigation methods position the cursor; `key`/`value` must
/// only be called while `valid` returns true.
pub trait Iter {
    fn valid(&self) -> bool;

    /// Positions at the first entry.
    fn seek_to_first(&mut self);

    /// Positions at the last entry.
    fn seek_to_last(&mut self);

    /// Positions at the first entry with a key >= target.
    fn seek(&mut self, target: &[u8]);

    /// Positions at the last entry with a key <= target.
    fn seek_for_prev(&mut self, target: &[u8]);

    fn next(&mut self);

    fn prev(&mut self);

    fn key(&self) -> &[u8];

    fn value(&self) -> &[u8];

    fn status(&mut self) -> IResult<()>;
}
