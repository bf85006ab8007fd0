//! C11: Label & UUID. §4.11.
//!
//! UUID derivation operates on the UTF-8 bytes of the already-decoded
//! `volume_set_identifier` string rather than the raw on-disk dstring
//! bytes (this crate doesn't retain the latter past `Pvd::read` — see
//! DESIGN.md for the open-question resolution).

use crate::mount::Volume;

pub fn label(volume: &Volume) -> Option<String> {
    let s = &volume.lvd.logical_volume_identifier;
    if s.is_empty() {
        None
    } else {
        Some(s.clone())
    }
}

fn is_lowercase_hex(c: char) -> bool {
    c.is_ascii_digit() || ('a'..='f').contains(&c)
}

pub fn uuid(volume: &Volume) -> Option<String> {
    let ident = &volume.pvd.volume_set_identifier;
    if ident.chars().count() < 8 {
        return None;
    }
    let leading16: String = ident.chars().take(16).collect();
    let n = leading16.chars().take_while(|&c| is_lowercase_hex(c)).count();

    if n >= 16 {
        Some(leading16)
    } else {
        let bytes: Vec<u8> = ident.bytes().take(8).collect();
        if bytes.len() < 8 {
            return None;
        }
        Some(bytes.iter().map(|b| format!("{b:02x}")).collect())
    }
}
