//! C1: Endian/Tag Primitives.
//!
//! All on-disk multi-byte integers are little-endian (ECMA-167 1/7.1.1).
//! `read_u16`/`read_u32`/`read_u64` bounds-check against the slice length
//! rather than panicking, since every other module feeds them
//! attacker/medium-controlled byte ranges.

use log::warn;

use crate::error::{Result, UdfError};

pub fn read_u16(bytes: &[u8], at: usize) -> Result<u16> {
    let b = bytes.get(at..at + 2).ok_or(UdfError::InvalidTag)?;
    Ok(u16::from_le_bytes([b[0], b[1]]))
}

pub fn read_u32(bytes: &[u8], at: usize) -> Result<u32> {
    let b = bytes.get(at..at + 4).ok_or(UdfError::InvalidTag)?;
    Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
}

pub fn read_u64(bytes: &[u8], at: usize) -> Result<u64> {
    let b = bytes.get(at..at + 8).ok_or(UdfError::InvalidTag)?;
    Ok(u64::from_le_bytes([
        b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7],
    ]))
}

/// Well-known tag identifiers (§6, bit-exact).
pub mod ident {
    pub const PVD: u16 = 1;
    pub const AVDP: u16 = 2;
    pub const VDS_POINTER: u16 = 3;
    pub const IUD: u16 = 4;
    pub const PD: u16 = 5;
    pub const LVD: u16 = 6;
    pub const USD: u16 = 7;
    pub const TD: u16 = 8;
    pub const LVID: u16 = 9;
    pub const FSD: u16 = 256;
    pub const FID: u16 = 257;
    pub const AED: u16 = 258;
    pub const IE: u16 = 259;
    pub const TE: u16 = 260;
    pub const FE: u16 = 261;
    pub const EAHD: u16 = 262;
    pub const USE: u16 = 263;
    pub const SBD: u16 = 264;
    pub const PIE: u16 = 265;
    pub const EFE: u16 = 266;
}

/// ECMA-167 7.2 Descriptor Tag — the 16-byte header of every descriptor.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Tag {
    pub tag_ident: u16,
    pub descriptor_version: u16,
    pub tag_checksum: u8,
    pub tag_serial_number: u16,
    pub descriptor_crc: u16,
    pub descriptor_crc_length: u16,
    pub tag_location: u32,
}

impl Tag {
    pub const SIZE: usize = 16;

    pub fn read(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < Self::SIZE {
            return Err(UdfError::InvalidTag);
        }
        Ok(Self {
            tag_ident: read_u16(bytes, 0)?,
            descriptor_version: read_u16(bytes, 2)?,
            tag_checksum: bytes[4],
            // bytes[5] reserved
            tag_serial_number: read_u16(bytes, 6)?,
            descriptor_crc: read_u16(bytes, 8)?,
            descriptor_crc_length: read_u16(bytes, 10)?,
            tag_location: read_u32(bytes, 12)?,
        })
    }

    /// Sum modulo 256 of bytes 0-3 and 5-15 of the 16-byte tag (ECMA-167
    /// 7.2.3). `full_descriptor` must start at the tag.
    fn checksum(full_descriptor: &[u8]) -> Option<u8> {
        full_descriptor.get(0..Self::SIZE)?;
        Some(
            full_descriptor[0..4]
                .iter()
                .chain(&full_descriptor[5..16])
                .fold(0u8, |acc, &b| acc.wrapping_add(b)),
        )
    }

    /// Checks `tag_ident` against the expected value at a required
    /// position and, best-effort, the tag checksum and descriptor CRC.
    /// CRC mismatches are tolerated (logged, not fatal) unless the
    /// `strict-crc` feature is enabled — §4.1/§9 "tolerate, not require".
    pub fn validate(&self, expected_ident: u16, full_descriptor: &[u8]) -> Result<()> {
        if self.tag_ident != expected_ident {
            return Err(UdfError::InvalidTag);
        }
        match Self::checksum(full_descriptor) {
            Some(sum) if sum == self.tag_checksum => {}
            Some(sum) => {
                warn!(
                    "tag checksum mismatch: expected {:#x} got {:#x}",
                    self.tag_checksum, sum
                );
                #[cfg(feature = "strict-crc")]
                return Err(UdfError::InvalidTag);
            }
            None => return Err(UdfError::InvalidTag),
        }
        self.validate_crc(full_descriptor)
    }

    fn validate_crc(&self, full_descriptor: &[u8]) -> Result<()> {
        if self.descriptor_crc_length == 0 {
            return Ok(());
        }
        let start = Self::SIZE;
        let end = (start + self.descriptor_crc_length as usize).min(full_descriptor.len());
        let Some(checked) = full_descriptor.get(start..end) else {
            return Ok(());
        };
        let computed = crate::crc16::cksum(checked);
        if computed != self.descriptor_crc {
            warn!(
                "descriptor CRC mismatch: expected {:#x} got {:#x}",
                self.descriptor_crc, computed
            );
            #[cfg(feature = "strict-crc")]
            return Err(UdfError::InvalidTag);
        }
        Ok(())
    }
}
