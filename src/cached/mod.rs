// Copyright 2019-2023 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

//! Process-wide cache of the first megabyte of packed digits per radix.
//!
//! Nearly all traffic asks for digits near the start of the expansion, so a
//! small append-only prefix cache absorbs most object-store fetches. The
//! cache never shrinks and once a byte is visible it never changes.

use std::io::SeekFrom;
use std::sync::LazyLock;

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::cdf::Radix;
use crate::error::{Error, Result};
use crate::resultset::{DigitStream, ResultSet};

/// Cached bytes per radix.
pub const CACHE_SIZE: usize = 1024 * 1024; // 1 MiB

#[derive(Default)]
struct PrefixCache {
    data: RwLock<Vec<u8>>,
}

/// One slot per supported radix, allocated lazily on first touch.
static CACHES: LazyLock<[PrefixCache; 2]> = LazyLock::new(Default::default);

fn slot(radix: Radix) -> &'static PrefixCache {
    &CACHES[radix.cache_slot()]
}

/// Copies cached bytes at `off` into `buf`. `None` is a miss.
fn read_cache(cache: &PrefixCache, buf: &mut [u8], off: u64) -> Option<usize> {
    let data = cache.data.read();
    if off >= data.len() as u64 {
        return None;
    }
    let off = off as usize;
    let n = buf.len().min(data.len() - off);
    buf[..n].copy_from_slice(&data[off..off + n]);
    Some(n)
}

/// Extends the cache with `buf` if it is contiguous with (or overlaps) the
/// cached prefix and within capacity. Anything else is silently dropped.
fn update_cache(cache: &PrefixCache, buf: &[u8], off: u64) {
    if buf.is_empty() || off >= CACHE_SIZE as u64 {
        return;
    }
    // Cheap precondition check under the shared lock first.
    {
        let data = cache.data.read();
        if (data.len() as u64) < off {
            return;
        }
    }

    let mut data = cache.data.write();
    // Re-check under the exclusive lock; a racing request may have appended.
    let len = data.len() as u64;
    if len < off {
        return;
    }
    let overlap = (len - off) as usize;
    if overlap >= buf.len() {
        return;
    }
    let n = (buf.len() - overlap).min(CACHE_SIZE - data.len());
    data.extend_from_slice(&buf[overlap..overlap + n]);
}

/// Reader layer that serves the first [`CACHE_SIZE`] bytes of the packed
/// stream from the shared cache and feeds downstream reads back into it.
pub struct CachedReader<R> {
    off: u64,
    rd: R,
    cache: Option<&'static PrefixCache>,
}

impl<R: DigitStream> CachedReader<R> {
    pub fn new(rd: R) -> Self {
        let cache = rd.result_set().radix().map(slot);
        CachedReader { off: 0, rd, cache }
    }
}

#[async_trait]
impl<R: DigitStream> DigitStream for CachedReader<R> {
    async fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        if let Some(cache) = self.cache
            && let Some(n) = read_cache(cache, buf, self.off)
            && n > 0
        {
            self.seek(SeekFrom::Current(n as i64))?;
            return Ok(n);
        }
        let n = self.rd.read(buf).await?;
        if let Some(cache) = self.cache {
            update_cache(cache, &buf[..n], self.off);
        }
        self.off += n as u64;
        Ok(n)
    }

    async fn read_at(&mut self, buf: &mut [u8], off: u64) -> Result<usize> {
        let mut n = 0;
        if let Some(cache) = self.cache
            && let Some(read) = read_cache(cache, buf, off)
        {
            n = read;
            if n == buf.len() {
                return Ok(n);
            }
        }
        match self.rd.read_at(&mut buf[n..], off + n as u64).await {
            Ok(read) => {
                if let Some(cache) = self.cache {
                    update_cache(cache, &buf[n..n + read], off + n as u64);
                }
                Ok(n + read)
            }
            Err(Error::Eof) if n > 0 => Ok(n),
            Err(e) => Err(e),
        }
    }

    fn seek(&mut self, pos: SeekFrom) -> Result<u64> {
        let off = self.rd.seek(pos)?;
        self.off = off;
        Ok(off)
    }

    fn result_set(&self) -> &ResultSet {
        self.rd.result_set()
    }
}
