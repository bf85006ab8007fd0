//! C4: Volume Mounter — AVDP search, VRS check, VDS walk, root FSD load.

use log::debug;

use crate::descriptors::{Avdp, FileSetDescriptor, Lvd, PartitionDescriptor, Pvd, Type1PartitionMap};
use crate::disk::{Disk, DiskAdapter, SECTOR_SIZE};
use crate::error::{Result, UdfError};
use crate::resolve::resolve;
use crate::tag::{ident, Tag};

/// Fixed caps on volume descriptor sequence contents (§3 invariants:
/// `npd ≤ MAX_PDS`, `npm ≤ MAX_PMS`).
const MAX_PDS: usize = 16;
const MAX_PARTMAPS: usize = 16;

/// Hard stop on the VDS walk so a descriptor chain that never reaches a
/// Terminating Descriptor can't loop forever (§9 open question, same
/// spirit applied here as to the VRS cap below).
const MAX_VDS_BLOCKS: usize = 256;

/// Hard stop on the VRS scan (§9 open question: "implementers should
/// impose a finite cap").
const MAX_VRS_STEPS: usize = 64;

const AVDP_CANDIDATE_SECTORS: [u64; 2] = [256, 512];

/// An immutable, mounted UDF volume. See §3 Data Model.
pub struct Volume<'d> {
    pub disk: DiskAdapter<'d>,
    pub lb_shift: u8,
    pub pvd: Pvd,
    pub lvd: Lvd,
    pub pds: Vec<PartitionDescriptor>,
    pub pms: Vec<Type1PartitionMap>,
    pub root_icb: crate::descriptors::LongAd,
}

impl<'d> Volume<'d> {
    pub fn resolve(&self, part_ref: usize, rel_block: u64) -> Result<u64> {
        resolve(&self.pds, &self.pms, part_ref, rel_block)
    }
}

/// §4.4 step 1: try every `(lb_shift, b)` combination until an AVDP is
/// found whose `tag_location` matches the sector it was read from.
fn search_avdp(disk: &dyn Disk) -> Result<(u8, Avdp)> {
    let mut buf = [0u8; SECTOR_SIZE];
    for lb_shift in 0u8..=3 {
        for &b in &AVDP_CANDIDATE_SECTORS {
            let sector = b << lb_shift;
            if disk.read(sector, 0, SECTOR_SIZE, &mut buf).is_err() {
                continue;
            }
            let Ok(tag) = Tag::read(&buf) else { continue };
            if tag.tag_ident != ident::AVDP || tag.tag_location as u64 != b {
                continue;
            }
            if let Ok(avdp) = Avdp::read(&buf) {
                debug!("AVDP found at lb_shift={lb_shift} b={b}");
                return Ok((lb_shift, avdp));
            }
        }
    }
    Err(UdfError::NotUDF)
}

const VRS_IDENTIFIERS_SKIP: [&[u8]; 5] = [b"BEA01", b"BOOT2", b"CD001", b"CDW02", b"TEA01"];

/// §4.4 step 2. `TEA01` without a prior `NSR0x` means absence, per
/// text ("it must also terminate on TEA01 if NSR never appears").
fn check_vrs(disk: &dyn Disk, lb_shift: u8) -> Result<()> {
    let lbsize = SECTOR_SIZE << lb_shift;
    let start = (32768 / lbsize) * lbsize;
    let mut buf = [0u8; 7];
    for step in 0..MAX_VRS_STEPS {
        let offset = start + step * 2048;
        let sector = (offset / SECTOR_SIZE) as u64;
        let in_sector_offset = offset % SECTOR_SIZE;
        disk.read(sector, in_sector_offset, 7, &mut buf)
            .map_err(|source| UdfError::DiskIo(crate::disk::DiskError {
                sector,
                offset: in_sector_offset,
                len: 7,
                source,
            }))?;
        let id = &buf[1..6];
        if id == b"NSR02" || id == b"NSR03" {
            return Ok(());
        }
        if id == b"TEA01" {
            return Err(UdfError::NotUDF);
        }
        if !VRS_IDENTIFIERS_SKIP.contains(&id) {
            return Err(UdfError::NotUDF);
        }
    }
    Err(UdfError::NotUDF)
}

/// §4.4 step 3: walk the VDS one logical block at a time, dispatching on
/// tag identifier. Tags above `TD` are a hard error; lesser tags other
/// than PVD/PD/LVD/TD (e.g. VDS-Pointer, IUD, USD) are skipped.
fn walk_vds(
    adapter: &DiskAdapter,
    vds_start: u64,
) -> Result<(Pvd, Vec<PartitionDescriptor>, Option<(Lvd, Vec<Type1PartitionMap>)>)> {
    let mut pvd = None;
    let mut pds = Vec::new();
    let mut lvd_and_pms = None;

    for step in 0..MAX_VDS_BLOCKS {
        let block = vds_start + step as u64;
        let buf = adapter.read_block(block)?;
        let tag = Tag::read(&buf)?;
        match tag.tag_ident {
            ident::PVD => pvd = Some(Pvd::read(&buf)?),
            ident::PD => {
                if pds.len() >= MAX_PDS {
                    return Err(UdfError::TooManyPDs);
                }
                pds.push(PartitionDescriptor::read(&buf)?);
            }
            ident::LVD => {
                let lvd = Lvd::read(&buf)?;
                let maps_tail = buf.get(Lvd::FIXED_SIZE..).ok_or(UdfError::InvalidTag)?;
                let pms = lvd.read_partition_maps(maps_tail)?;
                if pms.len() > MAX_PARTMAPS {
                    return Err(UdfError::TooManyPartMaps);
                }
                lvd_and_pms = Some((lvd, pms));
            }
            ident::TD => return Ok((pvd.ok_or(UdfError::NotUDF)?, pds, lvd_and_pms)),
            other if other > ident::TD => return Err(UdfError::InvalidTag),
            other => debug!("skipping VDS tag {other} at block {block}"),
        }
    }
    Err(UdfError::NotUDF)
}

/// Mount a UDF volume from `disk`. §4.4.
pub fn mount(disk: &dyn Disk) -> Result<Volume> {
    let (lb_shift, avdp) = search_avdp(disk)?;
    check_vrs(disk, lb_shift)?;

    let adapter = DiskAdapter::new(disk, lb_shift);
    let vds_start = avdp.main_vds.location_sector as u64;
    let (pvd, mut pds, lvd_and_pms) = walk_vds(&adapter, vds_start)?;
    let (lvd, mut pms) = lvd_and_pms.ok_or(UdfError::NotUDF)?;

    // §4.4 step 4: partition map fixup.
    for pm in pms.iter_mut() {
        let j = pds
            .iter()
            .position(|pd| pd.part_num == pm.part_num)
            .ok_or(UdfError::CantFindPD)?;
        pm.part_num = j as u16;
    }

    // §4.4 step 5: root FSD.
    let root_part_ref = lvd.root_fileset.extent_location.partition_reference_number as usize;
    let root_block = lvd.root_fileset.extent_location.logical_block_number as u64;
    let fsd_sector = resolve(&pds, &pms, root_part_ref, root_block)?;
    let fsd_buf = adapter.read_block(fsd_sector)?;
    let fsd = FileSetDescriptor::read(&fsd_buf)?;

    pds.shrink_to_fit();
    pms.shrink_to_fit();

    Ok(Volume {
        disk: adapter,
        lb_shift,
        pvd,
        lvd,
        pds,
        pms,
        root_icb: fsd.root_directory_icb,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::disk::MemDisk;

    fn tag_bytes(buf: &mut [u8], ident: u16, location: u32) {
        buf[0..2].copy_from_slice(&ident.to_le_bytes());
        buf[12..16].copy_from_slice(&location.to_le_bytes());
        let checksum = buf[0..4]
            .iter()
            .chain(&buf[5..16])
            .fold(0u8, |acc, &b| acc.wrapping_add(b));
        buf[4] = checksum;
    }

    #[test]
    fn mount_fails_without_avdp() {
        let disk = MemDisk::new(1200);
        assert!(matches!(mount(&disk), Err(UdfError::NotUDF)));
    }

    #[test]
    fn vrs_rejects_unknown_identifier() {
        let mut disk = MemDisk::new(1200);
        let sector = (32768 / SECTOR_SIZE) as u64;
        disk.sector_mut(sector)[1..6].copy_from_slice(b"XXXXX");
        tag_bytes(disk.sector_mut(256), ident::AVDP, 256);
        assert!(matches!(mount(&disk), Err(UdfError::NotUDF)));
    }

    /// S5 (§8): a VDS with more PDs than `MAX_PDS` is rejected outright
    /// rather than silently truncated.
    #[test]
    fn mount_rejects_too_many_partition_descriptors() {
        let mut disk = MemDisk::new(2000);
        disk.sector_mut(64)[1..6].copy_from_slice(b"NSR02");
        {
            let buf = disk.sector_mut(256);
            tag_bytes(buf, ident::AVDP, 256);
            buf[16..20].copy_from_slice(&100u32.to_le_bytes());
            buf[20..24].copy_from_slice(&300u32.to_le_bytes());
        }
        for i in 0..(MAX_PDS as u64 + 1) {
            let buf = disk.sector_mut(300 + i);
            buf[0..2].copy_from_slice(&ident::PD.to_le_bytes());
        }
        assert!(matches!(mount(&disk), Err(UdfError::TooManyPDs)));
    }

    /// S6 (§8): a Type-2 (virtual/sparable) partition map is an explicit
    /// non-goal (§1) and must fail mount rather than being half-handled.
    #[test]
    fn mount_rejects_type2_partition_map() {
        let mut disk = MemDisk::new(2000);
        disk.sector_mut(64)[1..6].copy_from_slice(b"NSR02");
        {
            let buf = disk.sector_mut(256);
            tag_bytes(buf, ident::AVDP, 256);
            buf[16..20].copy_from_slice(&100u32.to_le_bytes());
            buf[20..24].copy_from_slice(&300u32.to_le_bytes());
        }
        {
            let buf = disk.sector_mut(300);
            tag_bytes(buf, ident::PVD, 0);
        }
        {
            let buf = disk.sector_mut(301);
            tag_bytes(buf, ident::LVD, 0);
            buf[212..216].copy_from_slice(&512u32.to_le_bytes());
            buf[264..268].copy_from_slice(&6u32.to_le_bytes());
            buf[268..272].copy_from_slice(&1u32.to_le_bytes());
            buf[440] = 2; // partition map type 2 (virtual/sparable) — unsupported
            buf[441] = 6;
        }
        assert!(matches!(mount(&disk), Err(UdfError::UnsupportedPartmap)));
    }
}
