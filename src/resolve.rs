//! C5: Block Resolver — `(part_ref, rel_block)` → absolute logical block.
//!
//! Kept as a free function rather than a `Volume` method so `mount.rs` can
//! resolve the root FSD's location before a `Volume` value fully exists.

use crate::descriptors::{PartitionDescriptor, Type1PartitionMap};
use crate::error::{Result, UdfError};

pub fn resolve(
    pds: &[PartitionDescriptor],
    pms: &[Type1PartitionMap],
    part_ref: usize,
    rel_block: u64,
) -> Result<u64> {
    let pm = pms.get(part_ref).ok_or(UdfError::InvalidPartRef)?;
    let pd = pds
        .get(pm.part_num as usize)
        .ok_or(UdfError::InvalidPartRef)?;
    Ok(pd.partition_starting_location as u64 + rel_block)
}
