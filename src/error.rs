use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("key not found.")]
    NotFound,
    #[error("arena capacity exhausted: requested {requested} bytes, {remaining} remaining.")]
    ArenaFull { requested: usize, remaining: usize },
}

pub type IResult<T> = std::result::Result<T, Error>;
