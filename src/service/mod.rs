// Copyright 2019-2023 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

//! Request-level façade over the reader stack.

use std::sync::Arc;

use tracing::error;

use crate::cached::CachedReader;
use crate::resultset::{DigitStream, ResultSet};
use crate::store::Bucket;
use crate::unpack::UnpackReader;

pub struct Service {
    bucket: Arc<dyn Bucket>,
}

impl Service {
    pub fn new(bucket: Arc<dyn Bucket>) -> Self {
        Service { bucket }
    }

    /// Returns up to `n` digits of the expansion starting at position
    /// `start`, where position 0 is the leading `3` before the radix point.
    ///
    /// The digit files index from the first fractional digit, so the leading
    /// digit is synthesised from the header and the remaining positions are
    /// shifted down by one. A request reaching past the end of the result
    /// returns short rather than failing.
    pub async fn get(
        &self,
        set: &Arc<ResultSet>,
        mut start: u64,
        n: u64,
    ) -> anyhow::Result<Vec<u8>> {
        if n == 0 {
            return Ok(Vec::new());
        }

        let zero = start == 0;
        let mut unpacked = vec![0u8; n as usize];
        let mut off = 0;
        if zero {
            unpacked[0] = set.first_digit();
            off = 1;
        } else {
            start -= 1;
        }

        let range_reader = set.clone().reader(self.bucket.clone());
        let mut reader = UnpackReader::new(CachedReader::new(range_reader));
        let mut read = match reader.read_at(&mut unpacked[off..], start).await {
            Ok(read) => read,
            Err(e) if e.is_eof() => 0,
            Err(e) => {
                error!(start, n, error = %e, "digit read failed");
                anyhow::bail!("internal error");
            }
        };
        if zero {
            read += 1;
        }
        unpacked.truncate(read);
        Ok(unpacked)
    }
}
