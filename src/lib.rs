// Copyright 2019-2023 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

//! Delivery of pre-computed digits of pi over HTTP.
//!
//! The source data is an ordered family of "compressed digit" files (CDF) in
//! object storage, produced by a high-precision arithmetic run: an ASCII
//! header followed by digits packed into little-endian 64-bit words. A
//! request for `(radix, start, n)` flows through a three-stage reader stack:
//!
//! ```text
//! service -> unpack (words -> ASCII) -> cached (1 MiB prefix) -> range reader -> object store
//! ```
//!
//! The range reader maps logical byte offsets to ranged GETs that never
//! cross a file boundary; the unpacker translates digit positions to word
//! offsets, skipping the unused digit slots word-aligned blocks carry.

pub mod api;
pub mod cached;
pub mod cdf;
pub mod config;
pub mod error;
pub mod index;
pub mod logger;
pub mod resultset;
pub mod service;
pub mod store;
pub mod test_utils;
pub mod unpack;

pub use error::{Error, Result};
