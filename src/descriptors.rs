//! On-disk ECMA-167 / UDF descriptor layouts (§3 Data Model).
//!
//! Every struct here is a decoded, bounds-checked view of a fixed-layout
//! on-disk record. This crate is read-only (writing/formatting UDF
//! volumes is an explicit non-goal), so there are no `write` methods —
//! only `read`. Layout and field names follow ECMA-167 / UDF 2.60,
//! decoding strings and timestamps eagerly instead of keeping raw byte
//! arrays.

use crate::dstring::decode_dstring;
use crate::error::{Result, UdfError};
use crate::tag::{ident, read_u16, read_u32, read_u64, Tag};

/// ECMA-167 7.1 Extent Descriptor ("extent_ad").
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtentAd {
    pub length_bytes: u32,
    pub location_sector: u32,
}

impl ExtentAd {
    pub const SIZE: usize = 8;

    pub fn read(bytes: &[u8]) -> Result<Self> {
        Ok(Self {
            length_bytes: read_u32(bytes, 0)?,
            location_sector: read_u32(bytes, 4)?,
        })
    }
}

/// ECMA-167 7.4 Entity Identifier.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EntityId {
    pub flags: u8,
    pub identifier: [u8; 23],
    pub identifier_suffix: [u8; 8],
}

impl EntityId {
    pub const SIZE: usize = 32;

    pub fn read(bytes: &[u8]) -> Result<Self> {
        let b = bytes.get(0..Self::SIZE).ok_or(UdfError::InvalidTag)?;
        let mut identifier = [0u8; 23];
        identifier.copy_from_slice(&b[1..24]);
        let mut identifier_suffix = [0u8; 8];
        identifier_suffix.copy_from_slice(&b[24..32]);
        Ok(Self {
            flags: b[0],
            identifier,
            identifier_suffix,
        })
    }
}

/// ECMA-167 1/7.3 Timestamp, decoded with the §6 local-time/timezone rule
/// applied to `tz_offset_minutes`. Converting these components further
/// (e.g. to Unix epoch seconds) is an external date/time utility's job —
/// out of scope here by design (§1 non-goals).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Timestamp {
    pub year: u16,
    pub month: u8,
    pub day: u8,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
    pub centiseconds: u8,
    pub hundreds_of_microseconds: u8,
    pub microseconds: u8,
    /// Local-time offset from UTC in minutes. Always present: an
    /// unspecified-timezone sentinel or a non-local `type` both collapse
    /// to 0, per §6.
    pub tz_offset_minutes: i16,
}

impl Timestamp {
    pub const SIZE: usize = 12;

    pub fn read(bytes: &[u8]) -> Result<Self> {
        let b = bytes.get(0..Self::SIZE).ok_or(UdfError::InvalidTag)?;
        let type_and_timezone = read_u16(b, 0)?;
        let kind = (type_and_timezone >> 12) & 0xF;
        let raw12 = type_and_timezone & 0x0FFF;
        let signed = if raw12 & 0x0800 != 0 {
            (raw12 as i16) - 0x1000
        } else {
            raw12 as i16
        };
        let tz_offset_minutes = if kind != 1 || signed == -2047 { 0 } else { signed };
        Ok(Self {
            year: read_u16(b, 2)?,
            month: b[4],
            day: b[5],
            hour: b[6],
            minute: b[7],
            second: b[8],
            centiseconds: b[9],
            hundreds_of_microseconds: b[10],
            microseconds: b[11],
            tz_offset_minutes,
        })
    }
}

/// ECMA-167 7.1 Recorded Address ("lb_addr").
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LbAddr {
    pub logical_block_number: u32,
    pub partition_reference_number: u16,
}

impl LbAddr {
    pub const SIZE: usize = 6;

    pub fn read(bytes: &[u8]) -> Result<Self> {
        Ok(Self {
            logical_block_number: read_u32(bytes, 0)?,
            partition_reference_number: read_u16(bytes, 4)?,
        })
    }
}

/// High 2 bits of an allocation descriptor's length field (§6).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtentType {
    RecordedAllocated,
    NotRecordedAllocated,
    NotRecordedNotAllocated,
    NextExtent,
}

impl ExtentType {
    fn from_bits(v: u8) -> Self {
        match v & 0b11 {
            0 => ExtentType::RecordedAllocated,
            1 => ExtentType::NotRecordedAllocated,
            2 => ExtentType::NotRecordedNotAllocated,
            _ => ExtentType::NextExtent,
        }
    }
}

/// ECMA-167 4/14.14.2 Long Allocation Descriptor ("long_ad").
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LongAd {
    pub extent_length_and_type: u32,
    pub extent_location: LbAddr,
}

impl LongAd {
    pub const SIZE: usize = 16;

    pub fn read(bytes: &[u8]) -> Result<Self> {
        Ok(Self {
            extent_length_and_type: read_u32(bytes, 0)?,
            extent_location: LbAddr::read(bytes.get(4..10).ok_or(UdfError::InvalidTag)?)?,
            // bytes[10..16] implementation_use, not needed read-only
        })
    }

    pub fn length_bytes(&self) -> u32 {
        self.extent_length_and_type & 0x3FFF_FFFF
    }

    pub fn extent_type(&self) -> ExtentType {
        ExtentType::from_bits((self.extent_length_and_type >> 30) as u8)
    }
}

/// ECMA-167 4/14.14.1 Short Allocation Descriptor ("short_ad").
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ShortAd {
    pub extent_length_and_type: u32,
    pub position: u32,
}

impl ShortAd {
    pub const SIZE: usize = 8;

    pub fn read(bytes: &[u8]) -> Result<Self> {
        Ok(Self {
            extent_length_and_type: read_u32(bytes, 0)?,
            position: read_u32(bytes, 4)?,
        })
    }

    pub fn length_bytes(&self) -> u32 {
        self.extent_length_and_type & 0x3FFF_FFFF
    }

    pub fn extent_type(&self) -> ExtentType {
        ExtentType::from_bits((self.extent_length_and_type >> 30) as u8)
    }
}

/// Anchor Volume Descriptor Pointer (ident 2).
#[derive(Debug, Clone)]
pub struct Avdp {
    pub tag: Tag,
    pub main_vds: ExtentAd,
    pub reserve_vds: ExtentAd,
}

impl Avdp {
    pub fn read(bytes: &[u8]) -> Result<Self> {
        let tag = Tag::read(bytes)?;
        tag.validate(ident::AVDP, bytes)?;
        Ok(Self {
            tag,
            main_vds: ExtentAd::read(bytes.get(16..24).ok_or(UdfError::InvalidTag)?)?,
            reserve_vds: ExtentAd::read(bytes.get(24..32).ok_or(UdfError::InvalidTag)?)?,
        })
    }
}

/// Primary Volume Descriptor (ident 1). `pvd (...) verbatim` per §3 means
/// every field survives decoding losslessly, not that the raw byte image
/// is retained — dstrings are decoded eagerly since every downstream
/// consumer (label/uuid derivation) wants the decoded form.
#[derive(Debug, Clone)]
pub struct Pvd {
    pub tag: Tag,
    pub volume_descriptor_sequence_number: u32,
    pub volume_identifier: String,
    pub volume_set_identifier: String,
    pub recording_date_and_time: Timestamp,
}

impl Pvd {
    pub fn read(bytes: &[u8]) -> Result<Self> {
        let tag = Tag::read(bytes)?;
        tag.validate(ident::PVD, bytes)?;
        let volume_identifier = decode_dstring(bytes.get(24..56).ok_or(UdfError::InvalidTag)?)?;
        let volume_set_identifier = decode_dstring(bytes.get(72..200).ok_or(UdfError::InvalidTag)?)?;
        let recording_date_and_time =
            Timestamp::read(bytes.get(376..388).ok_or(UdfError::InvalidTag)?)?;
        Ok(Self {
            tag,
            volume_descriptor_sequence_number: read_u32(bytes, 16)?,
            volume_identifier,
            volume_set_identifier,
            recording_date_and_time,
        })
    }
}

/// ECMA-167 10.7 Partition Map — only Type 1 is supported (§1 non-goals:
/// virtual/sparable Type 2 maps are out of scope).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Type1PartitionMap {
    pub volume_sequence_number: u16,
    /// On-disk logical partition number. Rewritten to an index into
    /// `Volume::pds` during mount (§3 Data Model invariant).
    pub part_num: u16,
}

pub(crate) fn partition_map_length(bytes: &[u8]) -> Result<u8> {
    bytes.get(1).copied().ok_or(UdfError::InvalidTag)
}

pub(crate) fn partition_map_type(bytes: &[u8]) -> Result<u8> {
    bytes.first().copied().ok_or(UdfError::InvalidTag)
}

impl Type1PartitionMap {
    pub const SIZE: usize = 6;

    pub fn read(bytes: &[u8]) -> Result<Self> {
        if partition_map_type(bytes)? != 1 || partition_map_length(bytes)? as usize != Self::SIZE
        {
            return Err(UdfError::UnsupportedPartmap);
        }
        Ok(Self {
            volume_sequence_number: read_u16(bytes, 2)?,
            part_num: read_u16(bytes, 4)?,
        })
    }
}

/// Logical Volume Descriptor (ident 6), with its partition map table
/// decoded alongside it (the table's length and count live in the fixed
/// header, but the maps themselves are a variable-length tail).
#[derive(Debug, Clone)]
pub struct Lvd {
    pub tag: Tag,
    pub logical_volume_identifier: String,
    pub logical_block_size: u32,
    pub map_table_length: u32,
    pub number_of_partition_maps: u32,
    /// `long_ad` pointing to the root File Set Descriptor, decoded from
    /// `LogicalVolumeContentsUse` (UDF 2.60 2.2.14.5). This is the
    /// `lvd.root_fileset` §4.4 step 5 refers to.
    pub root_fileset: LongAd,
}

impl Lvd {
    pub const FIXED_SIZE: usize = 440;

    pub fn read(bytes: &[u8]) -> Result<Self> {
        let tag = Tag::read(bytes)?;
        tag.validate(ident::LVD, bytes)?;
        let logical_volume_identifier =
            decode_dstring(bytes.get(84..212).ok_or(UdfError::InvalidTag)?)?;
        let root_fileset = LongAd::read(bytes.get(248..264).ok_or(UdfError::InvalidTag)?)?;
        Ok(Self {
            tag,
            logical_volume_identifier,
            logical_block_size: read_u32(bytes, 212)?,
            map_table_length: read_u32(bytes, 264)?,
            number_of_partition_maps: read_u32(bytes, 268)?,
            root_fileset,
        })
    }

    /// Parse the `number_of_partition_maps` Type-1 maps living in
    /// `partition_maps_bytes` (the tail past `FIXED_SIZE`, at least
    /// `map_table_length` bytes). §4.4 step 3: non-Type-1 maps error.
    pub fn read_partition_maps(&self, partition_maps_bytes: &[u8]) -> Result<Vec<Type1PartitionMap>> {
        let mut maps = Vec::new();
        let mut offset = 0usize;
        for _ in 0..self.number_of_partition_maps {
            let entry = partition_maps_bytes
                .get(offset..)
                .ok_or(UdfError::InvalidTag)?;
            let map = Type1PartitionMap::read(entry)?;
            maps.push(map);
            offset += partition_map_length(entry)? as usize;
        }
        Ok(maps)
    }
}

/// Partition Descriptor (ident 5).
#[derive(Debug, Clone)]
pub struct PartitionDescriptor {
    pub tag: Tag,
    pub part_num: u16,
    pub partition_starting_location: u32,
    pub partition_length: u32,
}

impl PartitionDescriptor {
    pub const SIZE: usize = 512;

    pub fn read(bytes: &[u8]) -> Result<Self> {
        let tag = Tag::read(bytes)?;
        tag.validate(ident::PD, bytes)?;
        Ok(Self {
            tag,
            part_num: read_u16(bytes, 22)?,
            partition_starting_location: read_u32(bytes, 188)?,
            partition_length: read_u32(bytes, 192)?,
        })
    }
}

/// File Set Descriptor (ident 256).
#[derive(Debug, Clone)]
pub struct FileSetDescriptor {
    pub tag: Tag,
    pub root_directory_icb: LongAd,
}

impl FileSetDescriptor {
    pub fn read(bytes: &[u8]) -> Result<Self> {
        let tag = Tag::read(bytes)?;
        tag.validate(ident::FSD, bytes)?;
        Ok(Self {
            tag,
            root_directory_icb: LongAd::read(bytes.get(400..416).ok_or(UdfError::InvalidTag)?)?,
        })
    }
}

/// ECMA-167 4/14.6 ICB Tag.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct IcbTag {
    pub file_type: u8,
    pub flags: u16,
}

/// ICB `file_type` byte values (§6). 14-247 reserved, 248-255 agreement.
pub mod file_type {
    pub const DIRECTORY: u8 = 4;
    pub const REGULAR: u8 = 5;
    pub const SYMLINK: u8 = 12;
}

/// Low 3 bits of `icb_tag.flags` — which allocation descriptor shape the
/// ICB's tail uses (§4.7/§6).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdType {
    Short,
    Long,
    Extended,
    InlineInIcb,
}

impl IcbTag {
    pub const SIZE: usize = 20;

    pub fn read(bytes: &[u8]) -> Result<Self> {
        Ok(Self {
            file_type: *bytes.get(11).ok_or(UdfError::InvalidTag)?,
            flags: read_u16(bytes, 18)?,
        })
    }

    pub fn ad_type(&self) -> AdType {
        match self.flags & 0x7 {
            0 => AdType::Short,
            1 => AdType::Long,
            2 => AdType::Extended,
            _ => AdType::InlineInIcb,
        }
    }
}

/// FE (261) and EFE (266), unified behind the accessors `icb.rs`/`alloc.rs`
/// need (§9 "Union of FE/EFE").
#[derive(Debug, Clone)]
pub struct FileEntry {
    pub icb_tag: IcbTag,
    pub file_size: u64,
    pub modification_time: Timestamp,
    pub ext_attr_length: u32,
    pub alloc_descs_length: u32,
    /// Offset within the ICB's logical block where `ext_attr` begins
    /// (`ea_base` in §3/§4.7 terms).
    pub ea_base: usize,
}

impl FileEntry {
    pub const HEADER_SIZE: usize = 176;

    fn read_common(bytes: &[u8], expected_ident: u16, header_size: usize) -> Result<(Tag, Self)> {
        let tag = Tag::read(bytes)?;
        tag.validate(expected_ident, bytes)?;
        let icb_tag = IcbTag::read(bytes.get(16..36).ok_or(UdfError::InvalidTag)?)?;
        Ok((
            tag,
            Self {
                icb_tag,
                file_size: 0,
                modification_time: Timestamp::default(),
                ext_attr_length: 0,
                alloc_descs_length: 0,
                ea_base: header_size,
            },
        ))
    }

    pub fn read(bytes: &[u8]) -> Result<Self> {
        let (_tag, mut fe) = Self::read_common(bytes, ident::FE, Self::HEADER_SIZE)?;
        fe.file_size = read_u64(bytes, 56)?;
        fe.modification_time = Timestamp::read(bytes.get(84..96).ok_or(UdfError::InvalidTag)?)?;
        fe.ext_attr_length = read_u32(bytes, 168)?;
        fe.alloc_descs_length = read_u32(bytes, 172)?;
        Ok(fe)
    }
}

/// Extended File Entry (ident 266): same role as `FileEntry`, 216-byte
/// fixed header (UDF 2.60 2.3.6.1) instead of 176.
#[derive(Debug, Clone)]
pub struct ExtendedFileEntry {
    pub inner: FileEntry,
}

impl ExtendedFileEntry {
    pub const HEADER_SIZE: usize = 216;

    pub fn read(bytes: &[u8]) -> Result<Self> {
        let (_tag, mut fe) = FileEntry::read_common(bytes, ident::EFE, Self::HEADER_SIZE)?;
        fe.file_size = read_u64(bytes, 56)?;
        fe.modification_time = Timestamp::read(bytes.get(92..104).ok_or(UdfError::InvalidTag)?)?;
        fe.ext_attr_length = read_u32(bytes, 208)?;
        fe.alloc_descs_length = read_u32(bytes, 212)?;
        Ok(Self { inner: fe })
    }
}

/// FID `file_characteristics` bits (§3 Data Model).
pub mod fid_characteristics {
    pub const EXISTENCE: u8 = 0b0000_0001;
    pub const DIRECTORY: u8 = 0b0000_0010;
    pub const DELETED: u8 = 0b0000_0100;
    pub const PARENT: u8 = 0b0000_1000;
}

/// File Identifier Descriptor (ident 257) — a directory record.
#[derive(Debug, Clone)]
pub struct FileIdentifierDescriptor {
    pub file_characteristics: u8,
    pub icb: LongAd,
    pub file_identifier_length: u8,
    pub implementation_use_length: u16,
    pub name: String,
}

impl FileIdentifierDescriptor {
    pub const HEADER_SIZE: usize = 38;

    /// Parses the FID starting at `bytes[0]`. `bytes` must extend at
    /// least to the full padded record size; the caller (directory
    /// iterator) is responsible for bounding this against the
    /// directory's remaining `file_size`, which the original driver this
    /// is modeled on does not do (§9 design notes call this out).
    pub fn read(bytes: &[u8]) -> Result<Self> {
        let tag = Tag::read(bytes)?;
        tag.validate(ident::FID, bytes)?;
        let file_characteristics = *bytes.get(18).ok_or(UdfError::InvalidTag)?;
        let file_identifier_length = *bytes.get(19).ok_or(UdfError::InvalidTag)?;
        let icb = LongAd::read(bytes.get(20..36).ok_or(UdfError::InvalidTag)?)?;
        let implementation_use_length = read_u16(bytes, 36)?;
        let name_start = Self::HEADER_SIZE + implementation_use_length as usize;
        let name_end = name_start + file_identifier_length as usize;
        let name = if file_identifier_length == 0 {
            String::new()
        } else {
            let raw = bytes.get(name_start..name_end).ok_or(UdfError::InvalidTag)?;
            crate::dstring::decode_dchars(raw)?
        };
        Ok(Self {
            file_characteristics,
            icb,
            file_identifier_length,
            implementation_use_length,
            name,
        })
    }

    /// Unpadded record size: `38 + file_ident_length + imp_use_length`.
    pub fn unpadded_size(&self) -> usize {
        Self::HEADER_SIZE
            + self.implementation_use_length as usize
            + self.file_identifier_length as usize
    }

    /// Record size padded to a 4-byte boundary (§3 Data Model).
    pub fn padded_size(&self) -> usize {
        (self.unpadded_size() + 3) & !3
    }
}

/// Allocation Extent Descriptor (ident 258) — a continuation header for
/// an AD chain (§4.7).
#[derive(Debug, Clone)]
pub struct AllocationExtentDescriptor {
    pub tag: Tag,
    pub length_of_allocation_descriptors: u32,
}

impl AllocationExtentDescriptor {
    pub const HEADER_SIZE: usize = 24;

    pub fn read(bytes: &[u8]) -> Result<Self> {
        let tag = Tag::read(bytes)?;
        tag.validate(ident::AED, bytes)?;
        Ok(Self {
            tag,
            length_of_allocation_descriptors: read_u32(bytes, 20)?,
        })
    }
}
