//! ECMA-167 7.2.6 Descriptor CRC aka UDF 6.5 CRC Calculation.
//!
//! CRC-16/CCITT-FALSE with UDF's specific parameters. Used by
//! `tag::Tag::validate_crc`, which treats a mismatch as tolerable unless
//! the `strict-crc` feature is on.

use crc::{Algorithm, Crc};

const UDF_CRC_ALGO: Algorithm<u16> = Algorithm {
    width: 16,
    poly: 0x1021,
    init: 0x0000,
    refin: false,
    refout: false,
    xorout: 0x0000,
    check: 0x29b1,
    residue: 0x0000,
};

const UDF_CRC: Crc<u16> = Crc::<u16>::new(&UDF_CRC_ALGO);

pub fn cksum(data: &[u8]) -> u16 {
    UDF_CRC.checksum(data)
}
