use thiserror::Error;

/// Every failure mode the driver can surface, per the error taxonomy.
///
/// Policy: no retries. A malformed directory entry name skips that entry
/// rather than aborting iteration (see `dir.rs`); everything else here is
/// surfaced straight to the caller.
#[derive(Error, Debug)]
pub enum UdfError {
    #[error("disk I/O error: {0}")]
    DiskIo(#[from] crate::disk::DiskError),

    #[error("not a UDF volume")]
    NotUDF,

    #[error("unexpected or out-of-range descriptor tag")]
    InvalidTag,

    #[error("ICB descriptor tag is not FE or EFE")]
    InvalidFEDescriptor,

    #[error("directory entry tag is not FID")]
    InvalidFIDTag,

    #[error("allocation extent descriptor tag is not AED")]
    InvalidAEDTag,

    #[error("too many partition descriptors in volume descriptor sequence")]
    TooManyPDs,

    #[error("too many partition maps in logical volume descriptor")]
    TooManyPartMaps,

    #[error("partition map type is not Type 1")]
    UnsupportedPartmap,

    #[error("partition map references an unknown partition descriptor")]
    CantFindPD,

    #[error("partition reference number out of range")]
    InvalidPartRef,

    #[error("extended allocation descriptors are not supported")]
    InvalidExtentType,

    #[error("malformed dchars/dstring compression id")]
    InvalidString,

    #[error("malformed symbolic link path component")]
    InvalidSymlink,

    #[error("allocation failure")]
    AllocFailure,

    #[error("path not found")]
    NotFound,
}

pub type Result<T> = std::result::Result<T, UdfError>;
