// Copyright 2019-2023 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

//! The static index of digit files available in the backing bucket.
//!
//! The index is produced offline by the indexer that enumerates the bucket,
//! shipped as a JSON manifest next to the binary, and loaded once at
//! startup into one immutable [`ResultSet`] per radix.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context as _, ensure};
use serde::{Deserialize, Serialize};

use crate::cdf::{CdfFile, Header, Radix, SUPPORTED_FILE_VERSION};
use crate::resultset::ResultSet;

/// One digit file as recorded by the offline indexer. The header fields are
/// already parsed and validated; serving never re-reads file headers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestEntry {
    /// Object key in the bucket.
    pub name: String,
    pub radix: Radix,
    pub first_digits: String,
    #[serde(default)]
    pub total_digits: u64,
    pub block_size: u64,
    pub block_id: u64,
    pub header_length: usize,
    pub first_digit_offset: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manifest {
    pub files: Vec<ManifestEntry>,
}

impl From<ManifestEntry> for CdfFile {
    fn from(entry: ManifestEntry) -> Self {
        CdfFile {
            header: Header {
                file_version: SUPPORTED_FILE_VERSION.to_owned(),
                radix: entry.radix,
                first_digits: entry.first_digits,
                total_digits: entry.total_digits,
                block_size: entry.block_size,
                block_id: entry.block_id,
                length: entry.header_length,
            },
            name: entry.name,
            first_digit_offset: entry.first_digit_offset,
        }
    }
}

/// The two result sets the service can read from.
#[derive(Debug)]
pub struct Index {
    decimal: Arc<ResultSet>,
    hexadecimal: Arc<ResultSet>,
}

impl Index {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let data = std::fs::read_to_string(path)
            .with_context(|| format!("reading digit file index {}", path.display()))?;
        let manifest: Manifest = serde_json::from_str(&data)
            .with_context(|| format!("parsing digit file index {}", path.display()))?;
        Self::from_manifest(manifest)
    }

    pub fn from_manifest(manifest: Manifest) -> anyhow::Result<Self> {
        let (decimal, hexadecimal): (Vec<_>, Vec<_>) = manifest
            .files
            .into_iter()
            .map(CdfFile::from)
            .partition(|f| f.header.radix == Radix::Decimal);

        Ok(Index {
            decimal: build_set(decimal, Radix::Decimal)?,
            hexadecimal: build_set(hexadecimal, Radix::Hexadecimal)?,
        })
    }

    /// Builds an index directly from result sets; used by tests.
    pub fn from_sets(decimal: Arc<ResultSet>, hexadecimal: Arc<ResultSet>) -> Self {
        Index {
            decimal,
            hexadecimal,
        }
    }

    pub fn result_set(&self, radix: Radix) -> &Arc<ResultSet> {
        match radix {
            Radix::Decimal => &self.decimal,
            Radix::Hexadecimal => &self.hexadecimal,
        }
    }
}

fn build_set(files: Vec<CdfFile>, radix: Radix) -> anyhow::Result<Arc<ResultSet>> {
    ensure!(!files.is_empty(), "no base-{radix} digit files in the index");
    let set = ResultSet::new(files);
    let block_size = set.block_size();
    for (i, file) in set.files().iter().enumerate() {
        ensure!(
            file.header.block_id == i as u64,
            "base-{radix} digit files are not contiguous: expected block {i}, got {} ({})",
            file.header.block_id,
            file.name,
        );
        ensure!(
            file.header.block_size == block_size,
            "digit file {} has block size {}, expected {block_size}",
            file.name,
            file.header.block_size,
        );
    }
    Ok(Arc::new(set))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(radix: Radix, block_id: u64) -> ManifestEntry {
        ManifestEntry {
            name: format!("pi-{radix}-{block_id}.cdf"),
            radix,
            first_digits: "3.14159265358979323846264338327950288419716939937510".into(),
            total_digits: 0,
            block_size: 1_000_000,
            block_id,
            header_length: 192,
            first_digit_offset: 195,
        }
    }

    fn manifest() -> Manifest {
        Manifest {
            files: vec![
                entry(Radix::Decimal, 1),
                entry(Radix::Decimal, 0),
                entry(Radix::Hexadecimal, 0),
            ],
        }
    }

    #[test]
    fn builds_sorted_sets_per_radix() {
        let index = Index::from_manifest(manifest()).unwrap();

        let decimal = index.result_set(Radix::Decimal);
        assert_eq!(decimal.len(), 2);
        assert_eq!(decimal.total_digits(), 2_000_000);
        assert_eq!(decimal.files()[0].header.block_id, 0);

        let hexadecimal = index.result_set(Radix::Hexadecimal);
        assert_eq!(hexadecimal.len(), 1);
        assert_eq!(hexadecimal.radix(), Some(Radix::Hexadecimal));
    }

    #[test]
    fn round_trips_through_json() {
        let json = serde_json::to_string(&manifest()).unwrap();
        let index = Index::from_manifest(serde_json::from_str(&json).unwrap()).unwrap();
        assert_eq!(index.result_set(Radix::Decimal).len(), 2);
    }

    #[test]
    fn rejects_missing_radix() {
        let manifest = Manifest {
            files: vec![entry(Radix::Decimal, 0)],
        };
        let err = Index::from_manifest(manifest).unwrap_err();
        assert!(err.to_string().contains("base-16"));
    }

    #[test]
    fn rejects_gaps_in_blocks() {
        let manifest = Manifest {
            files: vec![
                entry(Radix::Decimal, 0),
                entry(Radix::Decimal, 2),
                entry(Radix::Hexadecimal, 0),
            ],
        };
        let err = Index::from_manifest(manifest).unwrap_err();
        assert!(err.to_string().contains("not contiguous"));
    }

    #[test]
    fn rejects_mismatched_block_sizes() {
        let mut files = vec![
            entry(Radix::Decimal, 0),
            entry(Radix::Decimal, 1),
            entry(Radix::Hexadecimal, 0),
        ];
        files[1].block_size = 500;
        let err = Index::from_manifest(Manifest { files }).unwrap_err();
        assert!(err.to_string().contains("block size"));
    }
}
