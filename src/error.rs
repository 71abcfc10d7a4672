use thiserror::Error;

/// Errors raised by the tuple key codec.
///
/// `NoNextGreater` and `PrefixMismatch` from the design are not represented
/// here — they are signalled as `Option::None` / an empty result at the
/// call site rather than as errors (see `Key::next_greater` and
/// `tuple::unpack`).
#[derive(Debug, Error)]
pub enum Error {
    #[error("truncated: expected at least {needed} more byte(s), found {found}")]
    Truncated { needed: usize, found: usize },

    #[error("corrupt key: {0}")]
    Corrupt(String),

    #[error("type mismatch: {0}")]
    TypeMismatch(String),

    #[error("index {index} out of range (length {len})")]
    OutOfRange { index: i64, len: usize },

    #[error("engine error: {0}")]
    Engine(#[from] Box<dyn std::error::Error + Send + Sync>),
}

pub type Result<T> = std::result::Result<T, Error>;
