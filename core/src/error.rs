//! Error types for the microprop-core library.
//!
//! Every fallible operation returns `NetResult<T>`. Nothing panics and
//! nothing is logged-and-ignored: a failed allocation, an empty training
//! store or an out-of-range neuron lookup all come back to the caller.

use core::fmt;

/// All possible error conditions in the microprop-core library.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetError {
    /// A zero-sized dimension, a zero-length training example, an
    /// accumulator fan-in the profile cannot hold, or a degenerate scaling
    /// range.
    InvalidArgument,
    /// The arena or the heap could not satisfy an allocation.
    OutOfMemory {
        requested: usize,
        remaining: usize,
    },
    /// Statistics or sampling requested on a store with no entries.
    EmptyCollection,
    /// A layer, neuron, connection or class index beyond its bounds.
    IndexOutOfRange {
        index: usize,
        len: usize,
    },
    /// An input sample whose length differs from the input layer width.
    DimensionMismatch {
        expected: usize,
        actual: usize,
    },
}

pub type NetResult<T> = Result<T, NetError>;

impl fmt::Display for NetError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NetError::InvalidArgument => write!(f, "invalid argument"),
            NetError::OutOfMemory { requested, remaining } => write!(
                f,
                "out of memory: requested {requested} bytes with {remaining} remaining"
            ),
            NetError::EmptyCollection => write!(f, "the training store is empty"),
            NetError::IndexOutOfRange { index, len } => {
                write!(f, "index {index} is out of range for length {len}")
            }
            NetError::DimensionMismatch { expected, actual } => {
                write!(f, "expected {expected} elements, got {actual}")
            }
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for NetError {}
