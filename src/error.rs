use thiserror::Error;

/// Errors reported while setting up a [`Pool`](crate::Pool) or its
/// [`Compressor`](crate::Compressor)
///
/// Allocation failures are not errors: `alloc` and `realloc` report them as `None` and leave the
/// pool in a consistent state.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum Error {
    /// No size classes were configured
    #[error("no size classes configured")]
    NoClasses,

    /// A size class has a block size of zero bytes
    #[error("size class {index} has a zero block size")]
    ZeroBlockSize {
        /// Position of the offending class
        index: usize,
    },

    /// Block sizes, once rounded up to the alignment, are not strictly ascending
    #[error("size class {index} is not larger than the class before it")]
    UnsortedClasses {
        /// Position of the offending class
        index: usize,
    },

    /// The region is too large to be addressed by the pool's offsets or compressed pointers
    #[error("memory region is too large")]
    RegionTooLarge,

    /// No scaling parameter gives every class at least one block within the region
    #[error("size classes do not fit in the memory region")]
    Infeasible,

    /// The ROM table holds more entries than the reserved compressed range
    #[error("ROM table holds more than {max} entries")]
    RomTableTooLarge {
        /// Capacity of the reserved range
        max: usize,
    },

    /// The scratch buffer passed to `RomTable::new` is shorter than the table
    #[error("ROM index scratch holds {len} entries but the table has {needed}")]
    ScratchTooSmall {
        /// Length of the scratch buffer
        len: usize,
        /// Number of ROM entries
        needed: usize,
    },

    /// The pointer is neither inside the pool nor registered in the ROM table
    #[error("pointer cannot be compressed")]
    NotCompressible,
}
