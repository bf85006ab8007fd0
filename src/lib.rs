//! Read-only decoder and path resolver for UDF (ECMA-167 / ISO 13346)
//! volumes, as found on optical media and some removable disks.
//!
//! This crate answers three questions a host file abstraction asks of a
//! block device: does it hold a UDF volume, and what's its label/UUID
//! (`mount`, `label`, `uuid`); what files exist under a path (`dir`);
//! and what are a file's bytes at `(offset, len)` (`open`/`read`).
//!
//! Block device I/O, UCS-2 character-set conversion, epoch-seconds
//! timestamp normalization, and path tokenization/`.`/`..` folding are
//! all external collaborators — see [`Disk`] and [`PathResolver`].

pub mod alloc;
pub mod crc16;
pub mod descriptors;
pub mod dir;
pub mod disk;
pub mod dstring;
pub mod error;
pub mod file;
pub mod icb;
pub mod label;
pub mod mount;
pub mod resolve;
pub mod resolver;
pub mod symlink;
pub mod tag;

pub use descriptors::Timestamp;
pub use dir::{DirEntry, DirEntryType};
pub use disk::Disk;
pub use error::{Result, UdfError};
pub use icb::Node;
pub use mount::Volume;
pub use resolver::{ExpectedType, PathResolver};

/// Directory entry metadata surfaced through [`dir`]'s callback (§4.12).
#[derive(Debug, Clone)]
pub struct DirInfo {
    pub is_dir: bool,
    pub mtime: Option<Timestamp>,
}

/// A file opened for reading. Owns the leaf [`Node`] reached by path
/// resolution and borrows the [`Volume`] it was opened from. There is no
/// seek: `offset` is a parameter to every [`read`] call, held by the
/// caller. `Opened -> (Read)* -> Closed` (§4.12) is modeled by
/// ownership — [`close`] consumes the handle, so a closed handle can't
/// be read from again; this is enforced at compile time rather than
/// with a runtime state flag.
pub struct FileHandle<'v, 'd> {
    volume: &'v Volume<'d>,
    node: Node,
}

/// Mount a UDF volume from `disk`. §4.4.
pub fn mount(disk: &dyn Disk) -> Result<Volume> {
    mount::mount(disk)
}

/// Volume label, decoded from the Logical Volume Descriptor (§4.11).
pub fn label(volume: &Volume) -> Option<String> {
    label::label(volume)
}

/// 16-lowercase-hex-character UUID derived from the Primary Volume
/// Descriptor's volume set identifier (§4.11).
pub fn uuid(volume: &Volume) -> Option<String> {
    label::uuid(volume)
}

fn root_node(volume: &Volume) -> Result<Node> {
    icb::load(volume, &volume.root_icb)
}

/// List `path`'s directory entries through `callback(name, info)`.
/// `callback` returning `true` stops iteration early. The leading `"."`
/// entry is always delivered first (§4.9).
pub fn dir(
    volume: &Volume,
    resolver: &dyn PathResolver,
    path: &str,
    callback: &mut dyn FnMut(&str, DirInfo) -> bool,
) -> Result<()> {
    let root = root_node(volume)?;
    let mut iterate_dir =
        |node: &Node, visit: &mut dyn FnMut(DirEntry) -> bool| dir::iterate(volume, node, visit);
    let mut read_symlink = |node: &Node| symlink::read_target(volume, node);
    let target = resolver.find_file(
        path,
        &root,
        &mut iterate_dir,
        &mut read_symlink,
        ExpectedType::Dir,
    )?;

    dir::iterate(
        volume,
        &target,
        &mut |entry: DirEntry| {
            let info = DirInfo {
                is_dir: matches!(entry.entry_type, DirEntryType::Dir),
                mtime: Some(entry.node.entry.modification_time().clone()),
            };
            callback(&entry.name, info)
        },
    )
}

/// Resolve `path` to a regular file and open it for reading. §4.12.
pub fn open<'v, 'd>(
    volume: &'v Volume<'d>,
    resolver: &dyn PathResolver,
    path: &str,
) -> Result<FileHandle<'v, 'd>> {
    let root = root_node(volume)?;
    let mut iterate_dir =
        |node: &Node, visit: &mut dyn FnMut(DirEntry) -> bool| dir::iterate(volume, node, visit);
    let mut read_symlink = |node: &Node| symlink::read_target(volume, node);
    let node = resolver.find_file(
        path,
        &root,
        &mut iterate_dir,
        &mut read_symlink,
        ExpectedType::Reg,
    )?;
    Ok(FileHandle { volume, node })
}

/// Read up to `buf.len()` bytes at file-relative `offset`. §4.12.
pub fn read(handle: &FileHandle, offset: u64, buf: &mut [u8]) -> Result<usize> {
    file::read(handle.volume, &handle.node, offset, buf, None)
}

/// Close a file handle. A plain `drop(handle)` would do the same thing —
/// this exists so callers have the named operation §4.12 lists.
pub fn close(_handle: FileHandle) {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptors::*;
    use crate::disk::MemDisk;

    /// A resolver that only supports single-component absolute paths
    /// rooted at `/`, enough to exercise `dir`/`open` without pulling in
    /// a full tokenizing path resolver (which is this crate's host's
    /// job, not its own — §1 non-goals).
    struct FlatResolver;

    impl PathResolver for FlatResolver {
        fn find_file(
            &self,
            path: &str,
            root: &Node,
            iterate_dir: &mut resolver::IterateDirFn,
            _read_symlink: &mut resolver::ReadSymlinkFn,
            _expected_type: ExpectedType,
        ) -> Result<Node> {
            let name = path.trim_start_matches('/');
            if name.is_empty() {
                return Ok(root.clone());
            }
            let mut found = None;
            iterate_dir(root, &mut |entry: DirEntry| {
                if entry.name == name {
                    found = Some(entry.node);
                    true
                } else {
                    false
                }
            })?;
            found.ok_or(UdfError::NotFound)
        }
    }

    fn checksum_tag(buf: &mut [u8], ident: u16) {
        buf[0..2].copy_from_slice(&ident.to_le_bytes());
        let c = buf[0..4]
            .iter()
            .chain(&buf[5..16])
            .fold(0u8, |acc, &b| acc.wrapping_add(b));
        buf[4] = c;
    }

    /// Build a minimal valid UDF image in memory: AVDP at sector 256,
    /// NSR02 VRS marker, a VDS with one PVD/PD/LVD/TD, a root FSD, a
    /// root directory (inline FID for one regular file), and that
    /// file's content (inline).
    fn build_minimal_image() -> MemDisk {
        let mut disk = MemDisk::new(2000);

        // VRS: NSR02 at byte 32768 (sector 64).
        disk.sector_mut(64)[1..6].copy_from_slice(b"NSR02");

        // AVDP at sector 256, main_vds at logical block 300.
        {
            let buf = disk.sector_mut(256);
            checksum_tag(buf, ident::AVDP);
            buf[12..16].copy_from_slice(&256u32.to_le_bytes()); // tag_location
            buf[16..20].copy_from_slice(&100u32.to_le_bytes()); // main_vds length
            buf[20..24].copy_from_slice(&300u32.to_le_bytes()); // main_vds location
        }

        // VDS at block 300: PVD
        {
            let buf = disk.sector_mut(300);
            checksum_tag(buf, ident::PVD);
            let vset = crate::dstring::test_encode_dchars("0123456789abcdef");
            // volume_set_identifier field is 72..200, length byte at 199
            buf[72..72 + vset.len()].copy_from_slice(&vset);
            buf[199] = vset.len() as u8;
        }

        // VDS at block 301: PD, part_num=0, starting at logical block 1000
        {
            let buf = disk.sector_mut(301);
            checksum_tag(buf, ident::PD);
            buf[22..24].copy_from_slice(&0u16.to_le_bytes());
            buf[188..192].copy_from_slice(&1000u32.to_le_bytes());
            buf[192..196].copy_from_slice(&1000u32.to_le_bytes());
        }

        // VDS at block 302: LVD with one Type-1 partition map and
        // root_fileset pointing at partition-relative block 0.
        {
            let buf = disk.sector_mut(302);
            checksum_tag(buf, ident::LVD);
            let lvol = crate::dstring::test_encode_dchars("TESTVOL");
            buf[84..84 + lvol.len()].copy_from_slice(&lvol);
            buf[211] = lvol.len() as u8;
            buf[212..216].copy_from_slice(&512u32.to_le_bytes()); // logical_block_size
            // root_fileset long_ad at 248..264: block 0, part_ref 0
            buf[264..268].copy_from_slice(&6u32.to_le_bytes()); // map_table_length
            buf[268..272].copy_from_slice(&1u32.to_le_bytes()); // number_of_partition_maps
            // partition map at offset 440: type=1, len=6, vol_seq=0, part_num=0
            buf[440] = 1;
            buf[441] = 6;
        }

        // VDS at block 303: TD
        {
            let buf = disk.sector_mut(303);
            checksum_tag(buf, ident::TD);
        }

        // Root FSD at partition-relative block 0 => absolute block 1000.
        {
            let buf = disk.sector_mut(1000);
            checksum_tag(buf, ident::FSD);
            // root_directory_icb at 400..416: block 1, part_ref 0
            buf[404..408].copy_from_slice(&1u32.to_le_bytes());
        }

        // Root directory FE at absolute block 1001 (partition-relative 1).
        {
            let buf = disk.sector_mut(1001);
            checksum_tag(buf, ident::FE);
            buf[18..20].copy_from_slice(&0u16.to_le_bytes()); // flags set below
            buf[11] = file_type::DIRECTORY;
            buf[18..20].copy_from_slice(&3u16.to_le_bytes()); // inline AD type

            // One FID for "GREETING.TXT" -> FE at partition-relative block 2.
            let name = crate::dstring::test_encode_dchars("GREETING.TXT");
            let fid_start = FileEntry::HEADER_SIZE;
            buf[fid_start + 18] = 0; // characteristics
            buf[fid_start + 19] = name.len() as u8;
            buf[fid_start + 24..fid_start + 28].copy_from_slice(&2u32.to_le_bytes());
            buf[fid_start + 36..fid_start + 38].copy_from_slice(&0u16.to_le_bytes());
            buf[fid_start + 38..fid_start + 38 + name.len()].copy_from_slice(&name);
            checksum_tag(&mut buf[fid_start..], ident::FID);

            let unpadded = FileIdentifierDescriptor::HEADER_SIZE + name.len();
            let file_size = unpadded as u64;
            buf[56..64].copy_from_slice(&file_size.to_le_bytes());
        }

        // The file's FE at absolute block 1002, inline content "hello\n".
        {
            let buf = disk.sector_mut(1002);
            checksum_tag(buf, ident::FE);
            buf[11] = file_type::REGULAR;
            buf[18..20].copy_from_slice(&3u16.to_le_bytes()); // inline

            let content = b"hello\n";
            let start = FileEntry::HEADER_SIZE;
            buf[start..start + content.len()].copy_from_slice(content);
            buf[56..64].copy_from_slice(&(content.len() as u64).to_le_bytes());
        }

        disk
    }

    #[test]
    fn mount_reports_label_and_uuid() {
        let _ = env_logger::try_init();
        let disk = build_minimal_image();
        let volume = mount(&disk).unwrap();
        assert_eq!(label(&volume).as_deref(), Some("TESTVOL"));
        assert_eq!(uuid(&volume).as_deref(), Some("0123456789abcdef"));
    }

    #[test]
    fn dir_lists_dot_and_the_authored_file() {
        let disk = build_minimal_image();
        let volume = mount(&disk).unwrap();
        let resolver = FlatResolver;
        let mut names = Vec::new();
        dir(&volume, &resolver, "/", &mut |name, _info| {
            names.push(name.to_string());
            false
        })
        .unwrap();
        assert_eq!(names, vec![".".to_string(), "GREETING.TXT".to_string()]);
    }

    #[test]
    fn open_and_read_returns_authored_content() {
        let disk = build_minimal_image();
        let volume = mount(&disk).unwrap();
        let resolver = FlatResolver;
        let handle = open(&volume, &resolver, "/GREETING.TXT").unwrap();
        let mut buf = [0u8; 6];
        let n = read(&handle, 0, &mut buf).unwrap();
        assert_eq!(n, 6);
        assert_eq!(&buf, b"hello\n");
        close(handle);
    }
}
