//! C6: ICB Loader and the `Node` transient handle (§3 Data Model, §4.6,
//! §9 "Union of FE/EFE").

use crate::descriptors::{AdType, ExtendedFileEntry, FileEntry, IcbTag, LongAd, Timestamp};
use crate::error::{Result, UdfError};
use crate::mount::Volume;
use crate::tag::{ident, Tag};

/// Tagged union of FE and EFE (§3, §9). Both variants wrap the same
/// `FileEntry` header shape; the tag distinguishes provenance while
/// `FileEntry::ea_base` already accounts for the different fixed header
/// sizes (176 vs 216 bytes).
#[derive(Debug, Clone)]
pub enum IcbEntry {
    Fe(FileEntry),
    Efe(FileEntry),
}

impl IcbEntry {
    fn inner(&self) -> &FileEntry {
        match self {
            IcbEntry::Fe(fe) => fe,
            IcbEntry::Efe(fe) => fe,
        }
    }

    pub fn icb_tag(&self) -> IcbTag {
        self.inner().icb_tag
    }

    pub fn file_size(&self) -> u64 {
        self.inner().file_size
    }

    pub fn ext_attr_length(&self) -> u32 {
        self.inner().ext_attr_length
    }

    pub fn alloc_descs_length(&self) -> u32 {
        self.inner().alloc_descs_length
    }

    pub fn ea_base(&self) -> usize {
        self.inner().ea_base
    }

    pub fn modification_time(&self) -> &Timestamp {
        &self.inner().modification_time
    }

    pub fn ad_type(&self) -> AdType {
        self.icb_tag().ad_type()
    }
}

/// A node reached during path descent: the ICB's part_ref (the implicit
/// partition for any ShortADs in its own allocation descriptors), the
/// decoded FE/EFE header, and the raw logical block backing the
/// ext_attr/allocation-descriptor tail. Cheap to clone (used to
/// synthesize the `.` directory entry, §9).
#[derive(Debug, Clone)]
pub struct Node {
    pub part_ref: usize,
    pub entry: IcbEntry,
    pub buffer: Vec<u8>,
    /// Absolute logical block this ICB was loaded from. Not part of
    /// spec.md's Node shape; see `identity()`.
    pub(crate) sector: u64,
}

impl Node {
    /// Slice of the node's buffer holding `ext_attr` followed by the
    /// allocation descriptors (§4.7's `ad_ptr = ea_base + ea_length`).
    pub fn ad_region(&self) -> &[u8] {
        let start = self.entry.ea_base() + self.entry.ext_attr_length() as usize;
        self.buffer.get(start..).unwrap_or(&[])
    }

    pub fn is_directory(&self) -> bool {
        self.entry.icb_tag().file_type == crate::descriptors::file_type::DIRECTORY
    }

    pub fn is_symlink(&self) -> bool {
        self.entry.icb_tag().file_type == crate::descriptors::file_type::SYMLINK
    }

    /// The absolute logical block this ICB was loaded from. Two nodes
    /// with the same `identity()` are the same on-disk FE/EFE reached
    /// through two different FIDs (a hard link), not two distinct files.
    /// `spec.md` doesn't name this (directory iteration emits one entry
    /// per FID regardless), but a host `PathResolver` doing its own
    /// ancestor-cycle detection needs a stable per-ICB key that a hard
    /// link can't spoof the way a name can — see SPEC_FULL.md's
    /// supplemented hard-link-detection note.
    pub fn identity(&self) -> u64 {
        self.sector
    }
}

/// Load the FE/EFE referenced by `long_ad` through the Block Resolver.
/// §4.6: require `tag_ident ∈ {FE(261), EFE(266)}`.
pub fn load(volume: &Volume, long_ad: &LongAd) -> Result<Node> {
    let part_ref = long_ad.extent_location.partition_reference_number as usize;
    let block = long_ad.extent_location.logical_block_number as u64;
    let sector = volume.resolve(part_ref, block)?;
    let buffer = volume.disk.read_block(sector)?;

    let tag = Tag::read(&buffer)?;
    let entry = match tag.tag_ident {
        ident::FE => IcbEntry::Fe(FileEntry::read(&buffer)?),
        ident::EFE => IcbEntry::Efe(ExtendedFileEntry::read(&buffer)?.inner),
        _ => return Err(UdfError::InvalidFEDescriptor),
    };

    Ok(Node {
        part_ref,
        entry,
        buffer,
        sector,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptors::{LbAddr, PartitionDescriptor, Type1PartitionMap};
    use crate::disk::MemDisk;

    fn write_tag(buf: &mut [u8], ident: u16) {
        buf[0..2].copy_from_slice(&ident.to_le_bytes());
        let checksum = buf[0..4]
            .iter()
            .chain(&buf[5..16])
            .fold(0u8, |acc, &b| acc.wrapping_add(b));
        buf[4] = checksum;
    }

    fn test_volume(disk: &MemDisk) -> Volume {
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
            pds: vec![PartitionDescriptor {
                tag: Default::default(),
                part_num: 0,
                partition_starting_location: 10,
                partition_length: 100,
            }],
            pms: vec![Type1PartitionMap {
                volume_sequence_number: 0,
                part_num: 0,
            }],
            root_icb: LongAd::default(),
        }
    }

    #[test]
    fn load_rejects_non_icb_tag() {
        let mut disk = MemDisk::new(200);
        write_tag(disk.sector_mut(10), ident::PVD);
        let volume = test_volume(&disk);
        let long_ad = LongAd {
            extent_length_and_type: 0,
            extent_location: LbAddr {
                logical_block_number: 0,
                partition_reference_number: 0,
            },
        };
        assert!(matches!(
            load(&volume, &long_ad),
            Err(UdfError::InvalidFEDescriptor)
        ));
    }

    #[test]
    fn load_accepts_file_entry() {
        let mut disk = MemDisk::new(200);
        write_tag(disk.sector_mut(10), ident::FE);
        let volume = test_volume(&disk);
        let long_ad = LongAd {
            extent_length_and_type: 0,
            extent_location: LbAddr {
                logical_block_number: 0,
                partition_reference_number: 0,
            },
        };
        let node = load(&volume, &long_ad).unwrap();
        assert!(matches!(node.entry, IcbEntry::Fe(_)));
    }
}
