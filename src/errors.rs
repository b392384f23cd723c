/// Errors that can occur when operating on the list.
///
/// Every variant is recoverable: the operation that reports it leaves the
/// list exactly as it found it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ChainListError {
    #[error("list is empty")]
    EmptyList,

    #[error("anchor value not found")]
    AnchorNotFound,

    #[error("value not found")]
    ValueNotFound,

    #[error("failed to allocate storage for new nodes")]
    AllocationFailure,

    #[error("cannot advance a cursor past the end position")]
    InvalidAdvance,

    #[error("cursor is at the end position")]
    EndPosition,

    #[error("cursor refers to a removed node")]
    StaleCursor,

    #[error("cursor belongs to another list")]
    ForeignCursor,
}

pub type Result<T> = std::result::Result<T, ChainListError>;
