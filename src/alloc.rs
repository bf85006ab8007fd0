//! C7: Allocation Walker — maps a file-relative block index to an
//! absolute logical block, or signals a hole. §4.7.

use crate::descriptors::{
    AdType, AllocationExtentDescriptor, ExtentType, LongAd, ShortAd,
};
use crate::error::{Result, UdfError};
use crate::icb::Node;
use crate::mount::Volume;
use crate::tag::ident;

/// Result of walking to a single file-relative block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockLocation {
    /// Absolute logical block number (same units `DiskAdapter::read_block`
    /// expects).
    Block(u64),
    /// The range is an unrecorded extent (§4.7 adtype 1/2) or no extent
    /// covers it at all (exhausted iteration). Reads return zero bytes.
    Hole,
}

/// A single decoded allocation descriptor, short or long, normalized to
/// the fields the walker needs regardless of shape.
struct Ad {
    length_bytes: u32,
    extent_type: ExtentType,
    part_ref: usize,
    block_num: u64,
}

fn decode_ad(ad_type: AdType, bytes: &[u8], node_part_ref: usize) -> Result<Ad> {
    match ad_type {
        AdType::Short => {
            let ad = ShortAd::read(bytes)?;
            Ok(Ad {
                length_bytes: ad.length_bytes(),
                extent_type: ad.extent_type(),
                part_ref: node_part_ref,
                block_num: ad.position as u64,
            })
        }
        AdType::Long => {
            let ad = LongAd::read(bytes)?;
            Ok(Ad {
                length_bytes: ad.length_bytes(),
                extent_type: ad.extent_type(),
                part_ref: ad.extent_location.partition_reference_number as usize,
                block_num: ad.extent_location.logical_block_number as u64,
            })
        }
        _ => unreachable!("caller filters to Short/Long before decode_ad"),
    }
}

/// Walk `node`'s allocation descriptors to the file-relative block `k`.
/// Callers must not invoke this for inline-in-ICB files (§4.7: "not a
/// block-granular case; handled by FileReader").
pub fn walk(volume: &Volume, node: &Node, k: u64) -> Result<BlockLocation> {
    let ad_type = node.entry.ad_type();
    let ad_size = match ad_type {
        AdType::Short => ShortAd::SIZE,
        AdType::Long => LongAd::SIZE,
        AdType::Extended => return Err(UdfError::InvalidExtentType),
        AdType::InlineInIcb => return Err(UdfError::InvalidExtentType),
    };

    let bsize = volume.disk.block_size() as u64;
    let mut file_bytes = k * bsize;

    let mut scratch: Option<Vec<u8>> = None;
    let mut offset = 0usize;
    let mut remaining = node.entry.alloc_descs_length();

    loop {
        if (remaining as usize) < ad_size {
            return Ok(BlockLocation::Hole);
        }
        let buf: &[u8] = match &scratch {
            Some(v) => v.as_slice(),
            None => node.ad_region(),
        };
        let entry_bytes = buf
            .get(offset..offset + ad_size)
            .ok_or(UdfError::InvalidTag)?;
        let ad = decode_ad(ad_type, entry_bytes, node.part_ref)?;

        if ad.extent_type == ExtentType::NextExtent {
            let sector = volume.resolve(ad.part_ref, ad.block_num)?;
            let cont = volume.disk.read_block(sector)?;
            let tag = crate::tag::Tag::read(&cont)?;
            if tag.tag_ident != ident::AED {
                return Err(UdfError::InvalidAEDTag);
            }
            let aed = AllocationExtentDescriptor::read(&cont)?;
            remaining = aed.length_of_allocation_descriptors;
            offset = AllocationExtentDescriptor::HEADER_SIZE;
            scratch = Some(cont);
            continue;
        }

        if file_bytes < ad.length_bytes as u64 {
            if matches!(
                ad.extent_type,
                ExtentType::NotRecordedAllocated | ExtentType::NotRecordedNotAllocated
            ) {
                return Ok(BlockLocation::Hole);
            }
            let base = volume.resolve(ad.part_ref, ad.block_num)?;
            let within = file_bytes >> (9 + volume.lb_shift as u32);
            return Ok(BlockLocation::Block(base + within));
        }

        file_bytes -= ad.length_bytes as u64;
        offset += ad_size;
        remaining = remaining.saturating_sub(ad_size as u32);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptors::{FileEntry, IcbTag, LbAddr};
    use crate::disk::MemDisk;
    use crate::icb::IcbEntry;

    fn mk_volume(disk: &MemDisk) -> Volume {
        Volume {
            disk: crate::disk::DiskAdapter::new(disk, 0),
            lb_shift: 0,
            pvd: crate::descriptors::Pvd {
                tag: Default::default(),
                volume_descriptor_sequence_number: 0,
                volume_identifier: String::new(),
                volume_set_identifier: String::new(),
                recording_date_and_time: Default::default(),
            },
            lvd: crate::descriptors::Lvd {
                tag: Default::default(),
                logical_volume_identifier: String::new(),
                logical_block_size: 512,
                map_table_length: 0,
                number_of_partition_maps: 0,
                root_fileset: LongAd::default(),
            },
            pds: vec![crate::descriptors::PartitionDescriptor {
                tag: Default::default(),
                part_num: 0,
                partition_starting_location: 100,
                partition_length: 1000,
            }],
            pms: vec![crate::descriptors::Type1PartitionMap {
                volume_sequence_number: 0,
                part_num: 0,
            }],
            root_icb: LongAd::default(),
        }
    }

    fn node_with_short_ads(ad_bytes: &[u8], alloc_descs_length: u32, file_size: u64) -> Node {
        let icb_tag = IcbTag::default(); // flags=0 => short AD
        let fe = FileEntry {
            icb_tag,
            file_size,
            modification_time: Default::default(),
            ext_attr_length: 0,
            alloc_descs_length,
            ea_base: 0,
        };
        let mut buffer = vec![0u8; ad_bytes.len()];
        buffer.copy_from_slice(ad_bytes);
        Node {
            part_ref: 0,
            entry: IcbEntry::Fe(fe),
            buffer,
            sector: 0,
        }
    }

    #[test]
    fn resolves_block_within_single_short_extent() {
        let disk = MemDisk::new(200);
        let volume = mk_volume(&disk);
        // one short AD: length=512 (recorded, type 0), position=5
        let mut ad = [0u8; 8];
        ad[0..4].copy_from_slice(&512u32.to_le_bytes());
        ad[4..8].copy_from_slice(&5u32.to_le_bytes());
        let node = node_with_short_ads(&ad, 8, 512);
        let loc = walk(&volume, &node, 0).unwrap();
        assert_eq!(loc, BlockLocation::Block(105));
    }

    #[test]
    fn unrecorded_extent_is_a_hole() {
        let disk = MemDisk::new(200);
        let volume = mk_volume(&disk);
        let mut ad = [0u8; 8];
        let len_and_type = 512u32 | (1u32 << 30); // NotRecordedAllocated
        ad[0..4].copy_from_slice(&len_and_type.to_le_bytes());
        ad[4..8].copy_from_slice(&5u32.to_le_bytes());
        let node = node_with_short_ads(&ad, 8, 512);
        let loc = walk(&volume, &node, 0).unwrap();
        assert_eq!(loc, BlockLocation::Hole);
    }

    #[test]
    fn block_past_all_extents_is_a_hole() {
        let disk = MemDisk::new(200);
        let volume = mk_volume(&disk);
        let mut ad = [0u8; 8];
        ad[0..4].copy_from_slice(&512u32.to_le_bytes());
        ad[4..8].copy_from_slice(&5u32.to_le_bytes());
        let node = node_with_short_ads(&ad, 8, 512);
        let loc = walk(&volume, &node, 4).unwrap();
        assert_eq!(loc, BlockLocation::Hole);
    }
}
