// Copyright 2019-2023 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

//! In-memory object store used by the test suite.

use std::collections::HashMap;
use std::io::Cursor;
use std::sync::Arc;

use anyhow::anyhow;
use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::RwLock;

use super::{Bucket, Object, ObjectStore, RangeStream};
use crate::error::{Error, Result};

/// A thread-safe map of bucket name to in-memory bucket.
#[derive(Debug, Default)]
pub struct MemoryStore {
    buckets: RwLock<HashMap<String, Arc<MemoryBucket>>>,
}

impl ObjectStore for MemoryStore {
    fn bucket(&self, name: &str) -> Arc<dyn Bucket> {
        let mut buckets = self.buckets.write();
        buckets.entry(name.to_owned()).or_default().clone()
    }
}

/// A bucket of byte-slice objects.
#[derive(Debug, Default)]
pub struct MemoryBucket {
    objects: RwLock<HashMap<String, Bytes>>,
}

impl MemoryBucket {
    pub fn insert(&self, name: impl Into<String>, data: impl Into<Bytes>) {
        self.objects.write().insert(name.into(), data.into());
    }
}

impl Bucket for MemoryBucket {
    fn object(&self, name: &str) -> Box<dyn Object> {
        Box::new(MemoryObject {
            name: name.to_owned(),
            data: self.objects.read().get(name).cloned(),
        })
    }
}

struct MemoryObject {
    name: String,
    data: Option<Bytes>,
}

#[async_trait]
impl Object for MemoryObject {
    async fn new_range_reader(&self, off: u64, length: i64) -> Result<Box<dyn RangeStream>> {
        let data = self
            .data
            .as_ref()
            .ok_or_else(|| Error::Transport(anyhow!("no such object: {}", self.name)))?;
        if off >= data.len() as u64 {
            return Err(Error::Eof);
        }
        let off = off as usize;
        let end = if length < 0 {
            data.len()
        } else {
            data.len().min(off + length as usize)
        };
        Ok(Box::new(Cursor::new(data.slice(off..end))))
    }
}
