use crate::Index;

pub type Result<T> = core::result::Result<T, Error>;

#[derive(Debug, Clone, Eq, PartialEq, thiserror::Error)]
pub enum Error {
    #[error("bit {bit} is outside of a bitset of {bit_count} bits")]
    BitOutOfRange { bit: Index, bit_count: usize },

    #[error("bitsets differ in size ({left} vs {right} bits)")]
    SizeMismatch { left: usize, right: usize },

    #[error("failed to allocate {bytes} bytes")]
    OutOfMemory { bytes: usize },
}

/// Coarse classification of an [`Error`].
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum ErrorKind {
    InvalidInput,
    OutOfMemory,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::BitOutOfRange { .. } | Error::SizeMismatch { .. } => ErrorKind::InvalidInput,
            Error::OutOfMemory { .. } => ErrorKind::OutOfMemory,
        }
    }
}
