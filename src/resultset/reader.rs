// Copyright 2019-2023 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use std::io::SeekFrom;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::io::AsyncReadExt;

use super::{DigitStream, ResultSet};
use crate::error::{Error, Result};
use crate::store::{Bucket, RangeStream};

/// Reader over the concatenated packed payloads of a result set, where
/// logical byte 0 is the first packed byte of block 0.
///
/// Sequential reads transparently cross file boundaries, returning short at
/// each boundary; `read_at` reads an arbitrary range. One reader serves one
/// request and is dropped afterwards.
pub struct SetReader {
    set: Arc<ResultSet>,
    bucket: Arc<dyn Bucket>,
    off: u64,
    stream: Option<Box<dyn RangeStream>>,
    seeked: bool,
}

impl SetReader {
    pub fn new(set: Arc<ResultSet>, bucket: Arc<dyn Bucket>) -> Self {
        SetReader {
            set,
            bucket,
            off: 0,
            stream: None,
            seeked: false,
        }
    }
}

/// Opens a ranged object read for stream section `[off, off + length)`,
/// clamped so it does not cross the block boundary. A negative `length`
/// reads to the end of the block.
async fn new_range_reader(
    set: &ResultSet,
    bucket: &dyn Bucket,
    off: u64,
    length: i64,
) -> Result<Box<dyn RangeStream>> {
    if off >= set.total_byte_length() {
        return Err(Error::Eof);
    }
    let (block, block_off) = set.offset_to_block_pos(off);
    let file = &set.files()[block as usize];
    let object = bucket.object(&file.name);

    let to_block_end = (file.block_byte_length() - block_off) as i64;
    let length = if length < 0 {
        to_block_end
    } else {
        length.min(to_block_end)
    };

    object
        .new_range_reader(block_off + file.first_digit_offset, length)
        .await
}

/// Reads from a fresh ranged reader until `buf` is full or the range ends.
/// Returns [`Error::Eof`] if the range yielded nothing at all.
async fn read_once(
    set: &ResultSet,
    bucket: &dyn Bucket,
    buf: &mut [u8],
    off: u64,
) -> Result<usize> {
    let mut stream = new_range_reader(set, bucket, off, buf.len() as i64).await?;
    let mut n = 0;
    while n < buf.len() {
        let read = stream.read(&mut buf[n..]).await?;
        if read == 0 {
            break;
        }
        n += read;
    }
    if n == 0 { Err(Error::Eof) } else { Ok(n) }
}

#[async_trait]
impl DigitStream for SetReader {
    /// Reads packed digit bytes at the current position, using one ranged
    /// fetch per block. Returns short with no error at block boundaries.
    async fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        if self.seeked {
            self.stream = None;
            self.seeked = false;
        }
        if self.stream.is_none() {
            let stream =
                new_range_reader(&self.set, self.bucket.as_ref(), self.off, -1).await?;
            self.stream = Some(stream);
        }

        let mut n = 0;
        if let Some(stream) = self.stream.as_mut() {
            n = stream.read(buf).await?;
        }
        self.off += n as u64;
        if n == 0 && !buf.is_empty() {
            // Block exhausted; the next call opens the next block.
            self.stream = None;
        }
        Ok(n)
    }

    /// Fills `buf` from byte `off`, crossing block boundaries as needed.
    /// Returns short only at the end of the result set.
    async fn read_at(&mut self, buf: &mut [u8], off: u64) -> Result<usize> {
        let mut n = 0;
        while n < buf.len() {
            match read_once(&self.set, self.bucket.as_ref(), &mut buf[n..], off + n as u64)
                .await
            {
                Ok(read) => n += read,
                Err(Error::Eof) if n > 0 => return Ok(n),
                Err(e) => return Err(e),
            }
        }
        Ok(n)
    }

    fn seek(&mut self, pos: SeekFrom) -> Result<u64> {
        let off = match pos {
            SeekFrom::Start(off) => Some(off),
            SeekFrom::Current(delta) => self.off.checked_add_signed(delta),
            SeekFrom::End(delta) => self.set.total_byte_length().checked_add_signed(delta),
        }
        .ok_or(Error::BadArgument("seek: negative offset"))?;

        if self.off != off {
            self.off = off;
            self.seeked = true;
        }
        Ok(off)
    }

    fn result_set(&self) -> &ResultSet {
        &self.set
    }
}
