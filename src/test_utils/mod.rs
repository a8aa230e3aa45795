// Copyright 2019-2023 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

//! Helpers for building in-memory digit file fixtures.
//!
//! The prefix cache is process-wide, so every fixture that is read through
//! the cache must be built from the same canonical digits with the same
//! block shape; otherwise concurrently running tests would disagree about
//! the cached bytes. The canonical shape is `block_size = 50`, digits from
//! [`PI_DEC`]/[`PI_HEX`]. Fixtures that bypass the cache are free to use any
//! shape.

use std::sync::Arc;

use crate::cdf::{CdfFile, Radix};
use crate::resultset::ResultSet;
use crate::store::memory::MemoryBucket;

/// First 150 decimal digits of pi after the decimal point.
pub const PI_DEC: &str = "141592653589793238462643383279502884197169399375105820974944592307816406286208998628034825342117067982148086513282306647093844609550582231725359408128";

/// First 144 hexadecimal digits of pi after the radix point.
pub const PI_HEX: &str = "243f6a8885a308d313198a2e03707344a4093822299f31d0082efa98ec4e6c89452821e638d01377be5466cf34e90c6cc0ac29b7c97c50dd3f84d5b5b54709179216d5d98979fb1b";

pub const FIRST_DIGITS_DEC: &str = "3.14159265358979323846264338327950288419716939937510";
pub const FIRST_DIGITS_HEX: &str = "3.243f6a8885a308d313198a2e03707344a4093822299f31d008";

/// A result set served out of an in-memory bucket, with the ground-truth
/// packed byte stream alongside.
pub struct Fixture {
    pub set: Arc<ResultSet>,
    pub bucket: Arc<MemoryBucket>,
    pub packed: Vec<u8>,
}

/// Packs an ASCII digit string into little-endian words, the inverse of the
/// unpacker: each word-sized chunk is read as a base-`radix` integer with
/// absent digits at the tail filling the low slots with zeros.
pub fn pack_digits(digits: &str, radix: Radix) -> Vec<u8> {
    let dpw = radix.digits_per_word() as usize;
    let base = u64::from(radix.base());
    let mut packed = Vec::with_capacity(digits.len().div_ceil(dpw) * 8);
    for chunk in digits.as_bytes().chunks(dpw) {
        let mut word = 0u64;
        for &b in chunk {
            let digit = (b as char)
                .to_digit(radix.base())
                .expect("digit in radix alphabet");
            word = word * base + u64::from(digit);
        }
        for _ in chunk.len()..dpw {
            word *= base;
        }
        packed.extend_from_slice(&word.to_le_bytes());
    }
    packed
}

/// Renders a complete CDF image: CRLF header, NUL pad, packed payload.
pub fn cdf_image(
    radix: Radix,
    total_digits: u64,
    block_size: u64,
    block_id: u64,
    packed: &[u8],
) -> Vec<u8> {
    let first_digits = match radix {
        Radix::Decimal => FIRST_DIGITS_DEC,
        Radix::Hexadecimal => FIRST_DIGITS_HEX,
    };
    let header = format!(
        "#Compressed Digit File\r\n\
         \r\n\
         FileVersion:\t1.1.0\r\n\
         \r\n\
         Base:\t{base}\r\n\
         \r\n\
         FirstDigits:\t{first_digits}\r\n\
         \r\n\
         TotalDigits:\t{total_digits}\r\n\
         \r\n\
         Blocksize:\t{block_size}\r\n\
         BlockID:\t{block_id}\r\n\
         \r\n\
         EndHeader\r\n\
         \r\n",
        base = radix.base(),
    );
    let mut image = header.into_bytes();
    image.push(0);
    image.extend_from_slice(packed);
    image
}

/// Builds a result set over `digits` split into blocks of `block_size`,
/// backed by a fresh in-memory bucket. `total` truncates the result to fewer
/// digits than provided; the tail file then carries the total in its header
/// and holds only the words its digits need.
pub fn fixture(radix: Radix, digits: &str, block_size: usize, total: Option<u64>) -> Fixture {
    fixture_in(
        Arc::new(MemoryBucket::default()),
        radix,
        digits,
        block_size,
        total,
    )
}

/// Like [`fixture`], but seeds an existing bucket so several result sets can
/// share one store.
pub fn fixture_in(
    bucket: Arc<MemoryBucket>,
    radix: Radix,
    digits: &str,
    block_size: usize,
    total: Option<u64>,
) -> Fixture {
    let total = total.map_or(digits.len(), |t| t as usize);
    let digits = &digits[..total];
    let mut files = Vec::new();
    let mut packed_stream = Vec::new();

    for (id, chunk) in digits.as_bytes().chunks(block_size).enumerate() {
        let chunk = std::str::from_utf8(chunk).expect("ascii digits");
        let file_total = if chunk.len() < block_size {
            total as u64
        } else {
            0
        };
        let packed = pack_digits(chunk, radix);
        let image = cdf_image(radix, file_total, block_size as u64, id as u64, &packed);
        let name = format!("pi-{radix}-{id:05}.cdf");

        let mut file = CdfFile::parse(image.as_slice()).expect("fixture header parses");
        file.name = name.clone();
        bucket.insert(name, image);
        files.push(file);
        packed_stream.extend_from_slice(&packed);
    }

    Fixture {
        set: Arc::new(ResultSet::new(files)),
        bucket,
        packed: packed_stream,
    }
}

/// Canonical decimal fixture; safe to read through the prefix cache.
pub fn decimal_fixture() -> Fixture {
    fixture(Radix::Decimal, &PI_DEC[..100], 50, None)
}

/// Canonical decimal fixture with a truncated tail block. Shares its packed
/// prefix with [`decimal_fixture`], so it is also cache-safe.
pub fn decimal_truncated_fixture() -> Fixture {
    fixture(Radix::Decimal, PI_DEC, 50, Some(120))
}

/// Canonical hexadecimal fixture; safe to read through the prefix cache.
pub fn hex_fixture() -> Fixture {
    fixture(Radix::Hexadecimal, &PI_HEX[..100], 50, None)
}

/// A spread of block shapes for tests that bypass the prefix cache:
/// word-aligned and unaligned block sizes, full and truncated tails.
pub fn plain_fixtures() -> Vec<(Fixture, String)> {
    vec![
        (
            fixture(Radix::Decimal, &PI_DEC[..100], 50, None),
            PI_DEC[..100].to_owned(),
        ),
        (fixture(Radix::Decimal, PI_DEC, 40, None), PI_DEC.to_owned()),
        (
            fixture(Radix::Hexadecimal, &PI_HEX[..100], 50, None),
            PI_HEX[..100].to_owned(),
        ),
        (
            fixture(Radix::Hexadecimal, PI_HEX, 48, None),
            PI_HEX.to_owned(),
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use byteorder::{ByteOrder, LittleEndian};

    #[test]
    fn pack_digits_matches_known_words() {
        let packed = pack_digits("1415926535897932384", Radix::Decimal);
        assert_eq!(packed, [0x60, 0xe2, 0x3e, 0xb8, 0xae, 0x61, 0xa6, 0x13]);

        // A short tail chunk fills the low slots with zeros.
        let packed = pack_digits("5", Radix::Decimal);
        assert_eq!(LittleEndian::read_u64(&packed), 5_000_000_000_000_000_000);

        let packed = pack_digits(&PI_HEX[..16], Radix::Hexadecimal);
        assert_eq!(LittleEndian::read_u64(&packed), 0x243f_6a88_85a3_08d3);
    }

    #[test]
    fn fixture_images_parse_back() {
        let fx = fixture(Radix::Decimal, &PI_DEC[..100], 50, None);
        assert_eq!(fx.set.len(), 2);
        assert_eq!(fx.set.total_digits(), 100);
        assert_eq!(fx.set.block_byte_length(), 24);
        assert_eq!(fx.packed.len(), 48);
        assert_eq!(fx.set.first_digit(), b'3');
    }

    #[test]
    fn truncated_fixture_marks_the_tail() {
        let fx = fixture(Radix::Decimal, PI_DEC, 50, Some(120));
        assert_eq!(fx.set.len(), 3);
        assert_eq!(fx.set.total_digits(), 120);
        let tail = &fx.set.files()[2];
        assert_eq!(tail.header.total_digits, 120);
        // 20 digits need two words; the file is physically shorter than the
        // block byte length.
        assert_eq!(fx.packed.len(), 24 + 24 + 16);
    }
}
