//! Errors reported by the executor.
//!
//! Building and finalizing never fail. Execution can only fail when the side
//! table does not match what the program touches, and that is detected
//! before any lane runs.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExecError {
    #[error("side-table index {index} is not bound (table has {len} entries)")]
    MissingBinding { index: usize, len: usize },
    #[error("side-table buffer {index} holds {len} elements but {lanes} lanes were requested")]
    ShortBinding {
        index: usize,
        len: usize,
        lanes: usize,
    },
    #[error("side-table buffer {index} is stored to but was bound read-only")]
    ReadOnlyBinding { index: usize },
    #[error("uniform load at offset {offset} is past the end of side-table buffer {index} ({len} elements)")]
    UniformOutOfRange {
        index: usize,
        offset: u32,
        len: usize,
    },
}
