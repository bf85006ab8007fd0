//! C8: File Reader — serves `(offset, len)` reads, including
//! inline-in-ICB data. §4.8.

use crate::alloc::{walk, BlockLocation};
use crate::descriptors::AdType;
use crate::error::{Result, UdfError};
use crate::icb::Node;
use crate::mount::Volume;

/// Per-disk-read telemetry/block-listing hook: `(sector, in_sector_offset, len)`.
pub type ReadHook<'a> = Option<&'a mut dyn FnMut(u64, usize, usize)>;

/// Read up to `buf.len()` bytes starting at file-relative `offset`,
/// clamped to `file_size`. Returns the number of bytes written into
/// `buf`. Reads within a single call happen in ascending offset order
/// (§5 Ordering).
pub fn read(volume: &Volume, node: &Node, offset: u64, buf: &mut [u8], mut hook: ReadHook) -> Result<usize> {
    let file_size = node.entry.file_size();
    if offset >= file_size {
        return Ok(0);
    }
    let want = (buf.len() as u64).min(file_size - offset) as usize;
    if want == 0 {
        return Ok(0);
    }

    match node.entry.ad_type() {
        AdType::InlineInIcb => {
            let start = node.entry.ea_base() + node.entry.ext_attr_length() as usize + offset as usize;
            let src = node
                .buffer
                .get(start..start + want)
                .ok_or(UdfError::InvalidTag)?;
            buf[..want].copy_from_slice(src);
            Ok(want)
        }
        AdType::Extended => Err(UdfError::InvalidExtentType),
        AdType::Short | AdType::Long => {
            let bsize = volume.disk.block_size() as u64;
            let mut done = 0usize;
            let mut pos = offset;
            while done < want {
                let block_idx = pos / bsize;
                let in_block = (pos % bsize) as usize;
                let chunk = (bsize as usize - in_block).min(want - done);
                match walk(volume, node, block_idx)? {
                    BlockLocation::Hole => {
                        buf[done..done + chunk].fill(0);
                    }
                    BlockLocation::Block(b) => {
                        let sector = b << volume.lb_shift;
                        volume
                            .disk
                            .read_at(sector, in_block, &mut buf[done..done + chunk])?;
                        if let Some(hook) = hook.as_deref_mut() {
                            hook(sector, in_block, chunk);
                        }
                    }
                }
                done += chunk;
                pos += chunk as u64;
            }
            Ok(done)
        }
    }
}
