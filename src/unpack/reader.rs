// Copyright 2019-2023 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use std::io::SeekFrom;

use async_trait::async_trait;

use super::{to_packed_offsets, unpack_block};
use crate::cdf::{Radix, WORD_SIZE};
use crate::error::{Error, Result};
use crate::resultset::{DigitStream, ResultSet};

/// Reader that turns the packed byte stream of an upstream [`DigitStream`]
/// into ASCII digits.
///
/// Offsets are in digit units: digit 0 is the first digit after the radix
/// point. Reads never extend past the result's `total_digits`.
pub struct UnpackReader<R> {
    radix: Radix,
    off: u64,
    total_digits: u64,
    block_size: u64,
    rd: R,
    seeked: bool,
    /// A word at a block boundary can supply digits to two consecutive
    /// reads, so the final partially-consumed word of a fetch is retained
    /// for the next one.
    unread: Option<[u8; WORD_SIZE]>,
}

impl<R: DigitStream> UnpackReader<R> {
    pub fn new(rd: R) -> Self {
        let set = rd.result_set();
        UnpackReader {
            // An empty set never passes the `total_digits` bound below, so
            // the radix fallback is never observable.
            radix: set.radix().unwrap_or(Radix::Decimal),
            off: 0,
            total_digits: set.total_digits(),
            block_size: set.block_size(),
            rd,
            seeked: false,
            unread: None,
        }
    }

    /// Decodes `packed` into `dst` one block at a time. `pre` applies to the
    /// first decoded word only; later chunks restart at a block's word
    /// boundary because the fetch was inflated over the padding slots.
    fn unpack(&self, dst: &mut [u8], packed: &[u8], mut offset: u64, mut pre: u64) -> Result<usize> {
        let dpw = self.radix.digits_per_word();
        let mut poff = 0;
        let mut written = 0;

        while poff < packed.len() && written < dst.len() {
            let remaining = (dst.len() - written) as u64;
            let block_off = offset % self.block_size;
            let req_digits = if block_off + remaining > self.block_size {
                self.block_size - block_off
            } else {
                remaining
            } as usize;
            let req_bytes =
                ((req_digits as u64).div_ceil(dpw) as usize * WORD_SIZE).min(packed.len() - poff);

            let n = unpack_block(
                &mut dst[written..written + req_digits],
                &packed[poff..poff + req_bytes],
                self.radix,
                pre,
            )?;
            poff += req_bytes;
            written += n;
            offset += n as u64;
            pre = 0;
        }
        Ok(written)
    }
}

#[async_trait]
impl<R: DigitStream> DigitStream for UnpackReader<R> {
    /// Reads digits at the current digit offset. Short reads only happen at
    /// the end of the result.
    async fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        if self.off >= self.total_digits {
            return Err(Error::Eof);
        }

        let dpw = self.radix.digits_per_word();
        let offsets = to_packed_offsets(self.off, self.block_size, buf.len() as u64, dpw)?;
        if self.seeked {
            self.rd.seek(SeekFrom::Start(offsets.start))?;
            self.unread = None;
            self.seeked = false;
        }

        let mut packed = vec![0u8; offsets.n as usize];
        let mut read = 0;
        if let Some(unread) = self.unread {
            read += unread.len().min(packed.len());
            packed[..read].copy_from_slice(&unread[..read]);
            if offsets.post == 0 || packed.len() > 2 * WORD_SIZE {
                self.unread = None;
            }
        }

        // Fill the rest from upstream; short reads at block boundaries are
        // absorbed here, the stream end is not.
        while read < packed.len() {
            match self.rd.read(&mut packed[read..]).await {
                Ok(n) => read += n,
                Err(Error::Eof) => break,
                Err(e) => return Err(e),
            }
        }
        if read % WORD_SIZE != 0 {
            return Err(Error::NotFullWord(read));
        }

        let remaining = (buf.len() as u64).min(self.total_digits - self.off) as usize;
        let written = self.unpack(&mut buf[..remaining], &packed[..read], self.off, offsets.pre)?;
        self.off += written as u64;

        if read == packed.len() && offsets.post > 0 {
            let mut word = [0u8; WORD_SIZE];
            word.copy_from_slice(&packed[read - WORD_SIZE..]);
            self.unread = Some(word);
        }
        Ok(written)
    }

    /// Reads digits `[off, off + buf.len())`. `buf` is clamped to the end of
    /// the result; a short read means the end was reached.
    async fn read_at(&mut self, buf: &mut [u8], off: u64) -> Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        if off >= self.total_digits {
            return Err(Error::Eof);
        }

        let dpw = self.radix.digits_per_word();
        let offsets = to_packed_offsets(off, self.block_size, buf.len() as u64, dpw)?;
        let mut packed = vec![0u8; offsets.n as usize];
        let read = self.rd.read_at(&mut packed, offsets.start).await?;
        if read % WORD_SIZE != 0 {
            return Err(Error::NotFullWord(read));
        }

        let remaining = (buf.len() as u64).min(self.total_digits - off) as usize;
        self.unpack(&mut buf[..remaining], &packed[..read], off, offsets.pre)
    }

    fn seek(&mut self, pos: SeekFrom) -> Result<u64> {
        let off = match pos {
            SeekFrom::Start(off) => Some(off),
            SeekFrom::Current(delta) => self.off.checked_add_signed(delta),
            SeekFrom::End(delta) => self.total_digits.checked_add_signed(delta),
        }
        .ok_or(Error::BadArgument("seek: negative offset"))?;

        if self.off != off {
            self.off = off;
            self.seeked = true;
        }
        Ok(off)
    }

    fn result_set(&self) -> &ResultSet {
        self.rd.result_set()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{PI_DEC, PI_HEX, fixture, plain_fixtures};

    // These fixtures bypass the prefix cache, so they are free to use block
    // shapes the canonical cached fixtures do not.

    async fn read_all(reader: &mut UnpackReader<impl DigitStream>, chunk: usize) -> String {
        let mut out = Vec::new();
        let mut buf = vec![0u8; chunk];
        loop {
            match reader.read(&mut buf).await {
                Ok(n) => out.extend_from_slice(&buf[..n]),
                Err(Error::Eof) => break,
                Err(e) => panic!("read failed: {e}"),
            }
        }
        String::from_utf8(out).unwrap()
    }

    #[tokio::test]
    async fn read_at_round_trips_every_range() {
        for (fx, digits) in plain_fixtures() {
            let mut reader = UnpackReader::new(fx.set.clone().reader(fx.bucket.clone()));
            let total = fx.set.total_digits() as usize;
            assert_eq!(total, digits.len());

            for off in 0..total {
                for len in [1, 2, 7, 19, 16, 20, 38, 50, total - off] {
                    let mut buf = vec![0u8; len];
                    let n = reader.read_at(&mut buf, off as u64).await.unwrap();
                    let expected = &digits[off..total.min(off + len)];
                    assert_eq!(
                        std::str::from_utf8(&buf[..n]).unwrap(),
                        expected,
                        "off {off} len {len}"
                    );
                }
            }
        }
    }

    #[tokio::test]
    async fn read_at_clamps_to_total_digits() {
        let fx = fixture(crate::cdf::Radix::Decimal, PI_DEC, 50, Some(120));
        let mut reader = UnpackReader::new(fx.set.clone().reader(fx.bucket.clone()));

        let mut buf = vec![0u8; 40];
        let n = reader.read_at(&mut buf, 100).await.unwrap();
        assert_eq!(n, 20);
        assert_eq!(&buf[..n], &PI_DEC.as_bytes()[100..120]);

        assert!(matches!(
            reader.read_at(&mut buf, 120).await,
            Err(Error::Eof)
        ));
    }

    #[tokio::test]
    async fn sequential_reads_cross_word_and_block_boundaries() {
        for chunk in [1, 3, 19, 16, 25, 64, 200] {
            for (fx, digits) in plain_fixtures() {
                let mut reader = UnpackReader::new(fx.set.clone().reader(fx.bucket.clone()));
                assert_eq!(read_all(&mut reader, chunk).await, digits, "chunk {chunk}");
            }
        }
    }

    #[tokio::test]
    async fn seek_restarts_the_stream() {
        let fx = fixture(crate::cdf::Radix::Hexadecimal, PI_HEX, 50, None);
        let mut reader = UnpackReader::new(fx.set.clone().reader(fx.bucket.clone()));

        let mut buf = [0u8; 10];
        let n = reader.read(&mut buf).await.unwrap();
        assert_eq!(&buf[..n], &PI_HEX.as_bytes()[..n]);

        reader.seek(SeekFrom::Start(73)).unwrap();
        let n = reader.read(&mut buf).await.unwrap();
        assert_eq!(&buf[..n], &PI_HEX.as_bytes()[73..73 + n]);

        let pos = reader.seek(SeekFrom::End(-4)).unwrap();
        assert_eq!(pos, PI_HEX.len() as u64 - 4);
        let n = reader.read(&mut buf).await.unwrap();
        assert_eq!(&buf[..n], &PI_HEX.as_bytes()[PI_HEX.len() - 4..]);

        assert!(matches!(
            reader.seek(SeekFrom::Current(-1000)),
            Err(Error::BadArgument(_))
        ));
    }

    #[tokio::test]
    async fn reads_stopping_at_boundaries_match_crossing_reads() {
        // Block size deliberately not a multiple of either word digit count.
        let fx = fixture(crate::cdf::Radix::Decimal, &PI_DEC[..100], 50, None);
        let mut reader = UnpackReader::new(fx.set.clone().reader(fx.bucket.clone()));

        let mut crossing = vec![0u8; 30];
        let n = reader.read_at(&mut crossing, 35).await.unwrap();
        assert_eq!(n, 30);

        let mut first = vec![0u8; 15];
        let mut second = vec![0u8; 15];
        assert_eq!(reader.read_at(&mut first, 35).await.unwrap(), 15);
        assert_eq!(reader.read_at(&mut second, 50).await.unwrap(), 15);

        let stitched = [first, second].concat();
        assert_eq!(crossing, stitched);
        assert_eq!(&crossing, &PI_DEC.as_bytes()[35..65]);
    }
}
