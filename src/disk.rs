//! C3: Disk Adapter — typed sector reads parameterized by logical-block shift.
//!
//! `Disk` is the host-provided block device abstraction (§6 "Disk
//! interface (consumed)"). `DiskAdapter` is the only thing above it that
//! knows the volume's logical block size; everything else in this crate
//! reads through `DiskAdapter::read_block`/`read_at`.

use std::num::NonZeroUsize;

use log::debug;
use lru::LruCache;
use thiserror::Error;

/// Underlying sector size in bytes. ECMA-167 fixes this at 512.
pub const SECTOR_SIZE: usize = 512;

#[derive(Error, Debug)]
#[error("disk read failed at sector {sector} (offset {offset}, len {len}): {source}")]
pub struct DiskError {
    pub sector: u64,
    pub offset: usize,
    pub len: usize,
    #[source]
    pub source: Box<dyn std::error::Error + Send + Sync + 'static>,
}

/// Host-provided block device. Sector size is fixed at 512 bytes; all
/// addressing above this layer is in 512-byte sectors regardless of the
/// volume's logical block size.
pub trait Disk {
    fn read(
        &self,
        sector: u64,
        in_sector_offset: usize,
        length: usize,
        dst_buf: &mut [u8],
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync + 'static>>;
}

/// Number of logical blocks the adapter's internal cache holds.
const CACHE_BLOCKS: usize = 64;

/// Reads logical blocks through a `Disk`, parameterized by `lb_shift`
/// (logical block size = `512 << lb_shift`). Caches whole logical blocks
/// by absolute sector so repeated ICB/directory/AED reads during a single
/// path descent don't re-issue the same disk read (§9 resource bounds:
/// one logical block per active `Node`, plus this bounded cache).
pub struct DiskAdapter<'d> {
    disk: &'d dyn Disk,
    pub lb_shift: u8,
    cache: std::cell::RefCell<LruCache<u64, Vec<u8>>>,
}

impl<'d> DiskAdapter<'d> {
    pub fn new(disk: &'d dyn Disk, lb_shift: u8) -> Self {
        Self {
            disk,
            lb_shift,
            cache: std::cell::RefCell::new(LruCache::new(
                NonZeroUsize::new(CACHE_BLOCKS).unwrap(),
            )),
        }
    }

    pub fn block_size(&self) -> usize {
        SECTOR_SIZE << self.lb_shift
    }

    /// Read one whole logical block `b` (absolute, volume-relative).
    pub fn read_block(&self, b: u64) -> Result<Vec<u8>, DiskError> {
        if let Some(hit) = self.cache.borrow_mut().get(&b) {
            return Ok(hit.clone());
        }
        let bsize = self.block_size();
        debug!("DiskAdapter::read_block: b={b} bsize={bsize}");
        let mut buf = vec![0u8; bsize];
        let sector = b << self.lb_shift;
        self.disk
            .read(sector, 0, bsize, &mut buf)
            .map_err(|source| DiskError {
                sector,
                offset: 0,
                len: bsize,
                source,
            })?;
        self.cache.borrow_mut().put(b, buf.clone());
        Ok(buf)
    }

    /// Read `len` bytes at absolute sector `sector`, byte offset `offset`
    /// within it. Used for sub-block reads inside `FileReader`.
    pub fn read_at(&self, sector: u64, offset: usize, buf: &mut [u8]) -> Result<(), DiskError> {
        debug!(
            "DiskAdapter::read_at: sector={sector} offset={offset} len={}",
            buf.len()
        );
        self.disk
            .read(sector, offset, buf.len(), buf)
            .map_err(|source| DiskError {
                sector,
                offset,
                len: buf.len(),
                source,
            })
    }
}

#[cfg(test)]
/// A flat in-memory `Disk`, addressed in 512-byte sectors. Used by every
/// other module's tests to author small synthetic UDF images.
pub struct MemDisk {
    pub data: Vec<u8>,
}

#[cfg(test)]
impl MemDisk {
    pub fn new(sectors: usize) -> Self {
        Self {
            data: vec![0u8; sectors * SECTOR_SIZE],
        }
    }

    pub fn sector_mut(&mut self, sector: u64) -> &mut [u8] {
        let start = sector as usize * SECTOR_SIZE;
        &mut self.data[start..start + SECTOR_SIZE]
    }
}

#[cfg(test)]
impl Disk for MemDisk {
    fn read(
        &self,
        sector: u64,
        in_sector_offset: usize,
        length: usize,
        dst_buf: &mut [u8],
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync + 'static>> {
        let start = sector as usize * SECTOR_SIZE + in_sector_offset;
        let end = start + length;
        if end > self.data.len() {
            return Err("read past end of MemDisk".into());
        }
        dst_buf[..length].copy_from_slice(&self.data[start..end]);
        Ok(())
    }
}
