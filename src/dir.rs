//! C9: Directory Iterator — streams File Identifier Descriptors from a
//! directory FE/EFE. §4.9.

use crate::descriptors::{fid_characteristics, file_type, FileIdentifierDescriptor};
use crate::error::{Result, UdfError};
use crate::icb::{self, Node};
use crate::tag::{ident, read_u16, Tag};
use crate::{file, mount::Volume};

/// Classification of a directory entry's target. `Special` carries the
/// raw ICB `file_type` byte for anything that isn't DIR/REG/SYMLINK —
/// §6: "others pass through as REG with their byte value preserved if
/// ever surfaced".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirEntryType {
    Dir,
    Reg,
    Symlink,
    Special(u8),
}

pub struct DirEntry {
    pub name: String,
    pub entry_type: DirEntryType,
    pub node: Node,
}

fn classify(characteristics: u8, child: &Node) -> DirEntryType {
    let ft = child.entry.icb_tag().file_type;
    if ft == file_type::SYMLINK {
        DirEntryType::Symlink
    } else if characteristics & fid_characteristics::DIRECTORY != 0 {
        DirEntryType::Dir
    } else if ft == file_type::REGULAR {
        DirEntryType::Reg
    } else {
        DirEntryType::Special(ft)
    }
}

/// Stream `dir_node`'s entries to `visit`, starting with a synthesized
/// `"."` entry whose node is a clone of `dir_node` itself (§9). Stops
/// early if `visit` returns `true`. A directory entry whose name fails
/// to decode is skipped, not fatal (§7 policy).
pub fn iterate(
    volume: &Volume,
    dir_node: &Node,
    visit: &mut dyn FnMut(DirEntry) -> bool,
) -> Result<()> {
    if visit(DirEntry {
        name: ".".to_string(),
        entry_type: DirEntryType::Dir,
        node: dir_node.clone(),
    }) {
        return Ok(());
    }

    let file_size = dir_node.entry.file_size();
    let mut offset = 0u64;

    while offset < file_size {
        let remaining = file_size - offset;
        if remaining < FileIdentifierDescriptor::HEADER_SIZE as u64 {
            break;
        }
        let mut header = [0u8; FileIdentifierDescriptor::HEADER_SIZE];
        file::read(volume, dir_node, offset, &mut header, None)?;

        let tag = Tag::read(&header)?;
        if tag.tag_ident != ident::FID {
            return Err(UdfError::InvalidFIDTag);
        }
        let characteristics = header[18];
        let file_identifier_length = header[19];
        let implementation_use_length = read_u16(&header, 36)?;

        // §9 design note: bound the record against the directory's
        // remaining file_size, which the source does not do.
        let unpadded = FileIdentifierDescriptor::HEADER_SIZE
            + implementation_use_length as usize
            + file_identifier_length as usize;
        if unpadded as u64 > remaining {
            return Err(UdfError::InvalidFIDTag);
        }
        let padded = ((unpadded + 3) & !3) as u64;

        if characteristics & fid_characteristics::DELETED != 0 {
            offset += padded;
            continue;
        }

        let mut record = vec![0u8; unpadded];
        file::read(volume, dir_node, offset, &mut record, None)?;
        offset += padded;

        let fid = match FileIdentifierDescriptor::read(&record) {
            Err(UdfError::InvalidString) => continue,
            Err(e) => return Err(e),
            Ok(fid) => fid,
        };

        let child = icb::load(volume, &fid.icb)?;
        let (name, entry_type) = if characteristics & fid_characteristics::PARENT != 0 {
            ("..".to_string(), DirEntryType::Dir)
        } else {
            (fid.name.clone(), classify(characteristics, &child))
        };

        if visit(DirEntry {
            name,
            entry_type,
            node: child,
        }) {
            return Ok(());
        }
    }
    Ok(())
}
