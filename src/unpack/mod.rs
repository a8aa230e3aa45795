// Copyright 2019-2023 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

//! Conversion between packed 64-bit digit words and ASCII digits.
//!
//! Each little-endian word encodes `digits_per_word` digits,
//! least-significant first. Blocks are word-aligned, so when the block size
//! is not a multiple of the word's digit count, the last word of every block
//! carries unused digit slots that the offset translation must skip.

mod reader;

pub use reader::UnpackReader;

use byteorder::{ByteOrder, LittleEndian};

use crate::cdf::{Radix, WORD_SIZE};
use crate::error::{Error, Result};
use crate::resultset::block_padding;

const ZEROS: &[u8; 19] = b"0000000000000000000";

/// Packed byte offsets covering a digit range, produced by
/// [`to_packed_offsets`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PackedOffsets {
    /// Byte offset of the first word containing the range.
    pub start: u64,
    /// Bytes to fetch to cover the whole range.
    pub n: u64,
    /// Digits to discard at the front of the first decoded word.
    pub pre: u64,
    /// Digits to discard at the tail of the last decoded word.
    pub post: u64,
}

/// Translates the digit range `[off, off + len)` into packed byte offsets,
/// accounting for the unused digit slots at every block boundary the range
/// crosses. `start` and `n` are multiples of the word size.
pub fn to_packed_offsets(
    mut off: u64,
    block_size: u64,
    mut len: u64,
    dpw: u64,
) -> Result<PackedOffsets> {
    if dpw == 0 {
        return Err(Error::BadArgument("to_packed_offsets: zero digits per word"));
    }
    if block_size == 0 {
        return Err(Error::BadArgument("to_packed_offsets: zero block size"));
    }

    // Padding digits physically exist in the stream but are logically
    // absent, so inflate the range by the block boundaries it crosses.
    let padding = block_padding(block_size, dpw);
    len += padding * ((off + len) / block_size - off / block_size);
    off += padding * (off / block_size);

    let start_word = off / dpw;
    let pre = off - start_word * dpw;
    let (words, post) = if len == 0 {
        (0, 0)
    } else {
        let words = (len + pre).div_ceil(dpw);
        (words, words * dpw - (len + pre))
    };

    Ok(PackedOffsets {
        start: start_word * WORD_SIZE as u64,
        n: words * WORD_SIZE as u64,
        pre,
        post,
    })
}

/// Bytes needed to hold the unpacked form of `n` packed bytes.
pub fn unpacked_len(n: u64, radix: Radix) -> u64 {
    n / WORD_SIZE as u64 * radix.digits_per_word()
}

fn copy_clamped(dst: &mut [u8], src: &[u8]) -> usize {
    let n = dst.len().min(src.len());
    dst[..n].copy_from_slice(&src[..n]);
    n
}

fn format_word(word: u64, radix: Radix) -> String {
    match radix {
        Radix::Decimal => word.to_string(),
        Radix::Hexadecimal => format!("{word:x}"),
    }
}

fn decode_word(packed: &[u8], radix: Radix, dpw: usize) -> Result<(String, usize)> {
    let word = LittleEndian::read_u64(packed);
    let s = format_word(word, radix);
    match dpw.checked_sub(s.len()) {
        Some(nz) => Ok((s, nz)),
        None => Err(Error::InvalidWord {
            word,
            dpw: dpw as u64,
        }),
    }
}

/// Decodes `packed` words into ASCII digits, skipping the first `pre`
/// digits. The tail is trimmed implicitly by the length of `dst`: callers
/// size it to `unpacked_len(packed.len()) - pre - post`. Returns the number
/// of digit bytes written.
pub fn unpack_block(dst: &mut [u8], packed: &[u8], radix: Radix, pre: u64) -> Result<usize> {
    if packed.is_empty() || dst.is_empty() {
        return Ok(0);
    }
    if packed.len() % WORD_SIZE != 0 {
        return Err(Error::NotFullWord(packed.len()));
    }
    let dpw = radix.digits_per_word() as usize;
    let pre = pre as usize;

    // Everything up to the last word must fit; the last word may be cut off.
    let required = unpacked_len((packed.len() - 1) as u64, radix).saturating_sub(pre as u64);
    if (dst.len() as u64) < required {
        return Err(Error::BufferTooSmall {
            required,
            actual: dst.len(),
        });
    }

    // First word: the leading zero pad absorbs part of the skip unless the
    // skip reaches into the formatted digits themselves.
    let (s, nz) = decode_word(packed, radix, dpw)?;
    let s = s.as_bytes();
    let nz_needed = nz.saturating_sub(pre);
    let mut n = copy_clamped(dst, &ZEROS[..nz_needed]);
    if n < dpw.saturating_sub(pre) && n < dst.len() {
        if nz < pre {
            n += copy_clamped(&mut dst[n..], &s[(pre - nz).min(s.len())..]);
        } else {
            n += copy_clamped(&mut dst[n..], s);
        }
    }

    if packed.len() == WORD_SIZE {
        return Ok(n);
    }

    // Middle words emit all their digits including leading zeros.
    let mut i = WORD_SIZE;
    while i < packed.len() - WORD_SIZE {
        let (s, nz) = decode_word(&packed[i..], radix, dpw)?;
        n += copy_clamped(&mut dst[n..], &ZEROS[..nz]);
        n += copy_clamped(&mut dst[n..], s.as_bytes());
        i += WORD_SIZE;
    }

    // Last word: write only what `dst` still allows.
    let (s, nz) = decode_word(&packed[packed.len() - WORD_SIZE..], radix, dpw)?;
    n += copy_clamped(&mut dst[n..], &ZEROS[..nz]);
    if n < dst.len() {
        n += copy_clamped(&mut dst[n..], s.as_bytes());
    }
    Ok(n)
}
