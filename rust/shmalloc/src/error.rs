use thiserror::Error;

/// Errors produced by shared-memory allocation and placement.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// The arena could not satisfy an allocation request.
    ///
    /// Never retried internally; the caller may destroy other shared
    /// objects and try again, or give up on the operation that needed the
    /// memory.
    #[error("shared arena exhausted")]
    Exhausted,

    /// A size computation for an allocation request overflowed.
    #[error("capacity overflow in shared allocation request")]
    CapacityOverflow,

    /// No process-global arena has been installed.
    #[error("no shared arena installed; call shmalloc::install first")]
    NoArena,

    /// A process-global arena was already installed.
    #[error("a shared arena is already installed for this process")]
    AlreadyInstalled,

    /// The shared mapping for a new arena could not be established.
    #[error("failed to create shared arena: {source}")]
    ArenaCreate {
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    pub(crate) fn arena_create(source: std::io::Error) -> Error {
        Error::ArenaCreate { source }
    }
}

impl From<rune_alloc::alloc::AllocError> for Error {
    fn from(_: rune_alloc::alloc::AllocError) -> Error {
        Error::Exhausted
    }
}

impl From<rune_alloc::Error> for Error {
    fn from(err: rune_alloc::Error) -> Error {
        match err {
            rune_alloc::Error::CapacityOverflow => Error::CapacityOverflow,
            _ => Error::Exhausted,
        }
    }
}

/// The result type used throughout the shared-memory crates.
pub type Result<T> = std::result::Result<T, Error>;
