// Copyright 2019-2023 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

//! An ordered collection of compressed digit files exposed as one logical
//! byte stream of packed digits.

mod reader;

pub use reader::SetReader;

use std::io::SeekFrom;
use std::sync::Arc;

use async_trait::async_trait;

use crate::cdf::{CdfFile, Radix};
use crate::error::Result;
use crate::store::Bucket;

/// Sequential and random access over packed digit bytes, with the backing
/// result set attached. Implemented by every layer of the reader stack so
/// the layers can be composed.
#[async_trait]
pub trait DigitStream: Send {
    /// Reads up to `buf.len()` bytes at the current position. A short read
    /// with no error marks a block boundary; callers loop for more.
    async fn read(&mut self, buf: &mut [u8]) -> Result<usize>;

    /// Reads up to `buf.len()` bytes starting at `off`, independent of the
    /// current position. A short read means the stream ended.
    async fn read_at(&mut self, buf: &mut [u8], off: u64) -> Result<usize>;

    /// Updates the position for the next `read`.
    fn seek(&mut self, pos: SeekFrom) -> Result<u64>;

    /// The result set this stream reads from.
    fn result_set(&self) -> &ResultSet;
}

/// A `block_id`-ordered set of digit files for one radix.
///
/// Built once at startup and then only read; all accessors are pure.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResultSet {
    files: Vec<CdfFile>,
}

impl ResultSet {
    pub fn new(mut files: Vec<CdfFile>) -> Self {
        files.sort_by_key(|f| f.header.block_id);
        ResultSet { files }
    }

    pub fn files(&self) -> &[CdfFile] {
        &self.files
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn radix(&self) -> Option<Radix> {
        self.files.first().map(|f| f.header.radix)
    }

    /// Digits per block. All files in a set share this.
    pub fn block_size(&self) -> u64 {
        self.files.first().map_or(0, |f| f.header.block_size)
    }

    /// Total number of digits in the set. A file with a non-zero
    /// `total_digits` header marks the logical end of the result; otherwise
    /// every block is full.
    pub fn total_digits(&self) -> u64 {
        let mut total = 0;
        for file in &self.files {
            if file.header.total_digits != 0 {
                return file.header.total_digits;
            }
            total += file.header.block_size;
        }
        total
    }

    /// Byte length of each block's packed payload.
    pub fn block_byte_length(&self) -> u64 {
        self.files.first().map_or(0, CdfFile::block_byte_length)
    }

    /// Byte length of the whole packed stream. Does not account for a
    /// truncated tail block; callers clamp with [`ResultSet::total_digits`].
    pub fn total_byte_length(&self) -> u64 {
        self.block_byte_length() * self.files.len() as u64
    }

    pub fn digits_per_word(&self) -> u64 {
        self.radix().map_or(0, Radix::digits_per_word)
    }

    /// First digit of the expansion, before the radix point. Always `b'3'`
    /// for a non-empty set.
    pub fn first_digit(&self) -> u8 {
        self.files
            .first()
            .and_then(|f| f.header.first_digits.bytes().next())
            .unwrap_or(0)
    }

    /// Splits a byte offset in the packed stream into `(block_id, block_off)`.
    pub fn offset_to_block_pos(&self, off: u64) -> (u64, u64) {
        if self.block_size() == 0 {
            return (0, off);
        }
        let block_byte_length = self.block_byte_length();
        (off / block_byte_length, off % block_byte_length)
    }

    /// Returns a range reader over the packed stream, fetching from `bucket`.
    pub fn reader(self: Arc<Self>, bucket: Arc<dyn Bucket>) -> SetReader {
        SetReader::new(self, bucket)
    }
}

/// Unused digit slots in the last word of each block. These slots physically
/// exist in the stream but carry no logical digits.
pub fn block_padding(block_size: u64, dpw: u64) -> u64 {
    (dpw - block_size % dpw) % dpw
}
