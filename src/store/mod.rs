// Copyright 2019-2023 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

//! Object storage capability boundary.
//!
//! The reader stack only needs ranged reads over named objects; everything
//! else about the backing store is behind these traits. Production wiring
//! uses [`http::HttpStore`], tests use [`memory::MemoryBucket`].

pub mod http;
pub mod memory;

use std::sync::Arc;

use async_trait::async_trait;
use tokio::io::AsyncRead;

use crate::error::Result;

/// A readable byte range of an object. Dropping the stream closes it and
/// aborts any in-flight fetch.
pub trait RangeStream: AsyncRead + Send + Unpin {}

impl<T: AsyncRead + Send + Unpin + ?Sized> RangeStream for T {}

/// Client for an object store.
pub trait ObjectStore: Send + Sync {
    /// Returns a handle to the bucket named `name`.
    fn bucket(&self, name: &str) -> Arc<dyn Bucket>;
}

/// A bucket of named objects.
pub trait Bucket: Send + Sync {
    /// Returns a handle to the object named `name`.
    fn object(&self, name: &str) -> Box<dyn Object>;
}

/// A single immutable object.
#[async_trait]
pub trait Object: Send + Sync {
    /// Opens the byte range `[off, off + length)` of the object.
    /// A negative `length` means "to the end of the object". Requesting a
    /// range past the end of the object fails with [`crate::Error::Eof`].
    async fn new_range_reader(&self, off: u64, length: i64) -> Result<Box<dyn RangeStream>>;
}
