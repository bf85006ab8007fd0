//! C10: Symlink Decoder — Path Component records to a POSIX-style path.
//! §4.10.

use crate::dstring::decode_dchars;
use crate::error::{Result, UdfError};
use crate::icb::Node;
use crate::mount::Volume;

const HEADER_SIZE: usize = 4;

/// Read and decode a symlink's target path. The body is read through the
/// File Reader like any other file content (inline or block-addressed).
pub fn read_target(volume: &Volume, node: &Node) -> Result<String> {
    let file_size = node.entry.file_size();
    let mut body = vec![0u8; file_size as usize];
    crate::file::read(volume, node, 0, &mut body, None)?;
    decode_components(&body)
}

fn decode_components(body: &[u8]) -> Result<String> {
    let mut out = String::new();
    let mut ptr = 0usize;
    let end = body.len();

    while ptr < end {
        if ptr + HEADER_SIZE > end {
            return Err(UdfError::InvalidSymlink);
        }
        let component_type = body[ptr];
        let length = body[ptr + 1] as usize;
        let reserved = u16::from_le_bytes([body[ptr + 2], body[ptr + 3]]);
        if reserved != 0 {
            return Err(UdfError::InvalidSymlink);
        }
        if ptr + HEADER_SIZE + length > end {
            return Err(UdfError::InvalidSymlink);
        }
        let data = &body[ptr + HEADER_SIZE..ptr + HEADER_SIZE + length];

        match component_type {
            1 | 2 => {
                if length != 0 {
                    return Err(UdfError::InvalidSymlink);
                }
                out.clear();
                out.push('/');
            }
            3 => {
                if !out.is_empty() && !out.ends_with('/') {
                    out.push('/');
                }
                out.push_str("..");
            }
            4 => {
                if !out.is_empty() && !out.ends_with('/') {
                    out.push('/');
                }
                out.push('.');
            }
            5 => {
                if !out.is_empty() && !out.ends_with('/') {
                    out.push('/');
                }
                out.push_str(&decode_dchars(data)?);
            }
            _ => return Err(UdfError::InvalidSymlink),
        }

        ptr += HEADER_SIZE + length;
    }

    Ok(out)
}
