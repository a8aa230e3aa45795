// Copyright 2019-2023 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

//! Object store backed by ranged HTTP GETs against a public object-store
//! endpoint (the Cloud Storage XML API by default).

use std::sync::Arc;

use async_trait::async_trait;
use futures::TryStreamExt;
use reqwest::StatusCode;
use reqwest::header;
use tokio_util::io::StreamReader;
use url::Url;

use super::{Bucket, Object, ObjectStore, RangeStream};
use crate::error::{Error, Result};

/// The public Google Cloud Storage endpoint.
pub const DEFAULT_ENDPOINT: &str = "https://storage.googleapis.com";

pub struct HttpStore {
    client: reqwest::Client,
    endpoint: Url,
}

impl HttpStore {
    pub fn new(endpoint: Url) -> Self {
        HttpStore {
            client: reqwest::Client::new(),
            endpoint,
        }
    }
}

impl ObjectStore for HttpStore {
    fn bucket(&self, name: &str) -> Arc<dyn Bucket> {
        Arc::new(HttpBucket {
            client: self.client.clone(),
            endpoint: self.endpoint.clone(),
            bucket: name.to_owned(),
        })
    }
}

struct HttpBucket {
    client: reqwest::Client,
    endpoint: Url,
    bucket: String,
}

impl Bucket for HttpBucket {
    fn object(&self, name: &str) -> Box<dyn Object> {
        Box::new(HttpObject {
            client: self.client.clone(),
            url: format!(
                "{}/{}/{}",
                self.endpoint.as_str().trim_end_matches('/'),
                self.bucket,
                name
            ),
        })
    }
}

struct HttpObject {
    client: reqwest::Client,
    url: String,
}

fn transport(e: reqwest::Error) -> Error {
    Error::Transport(e.into())
}

#[async_trait]
impl Object for HttpObject {
    async fn new_range_reader(&self, off: u64, length: i64) -> Result<Box<dyn RangeStream>> {
        if length == 0 {
            return Ok(Box::new(tokio::io::empty()));
        }
        let range = if length < 0 {
            format!("bytes={off}-")
        } else {
            format!("bytes={}-{}", off, off + length as u64 - 1)
        };

        // `Url::parse` percent-encodes the spaces object keys may contain.
        let url = Url::parse(&self.url).map_err(|e| Error::Transport(e.into()))?;
        let response = self
            .client
            .get(url)
            .header(header::RANGE, range)
            .send()
            .await
            .map_err(transport)?;
        if response.status() == StatusCode::RANGE_NOT_SATISFIABLE {
            return Err(Error::Eof);
        }
        let response = response.error_for_status().map_err(transport)?;

        let stream = Box::pin(response.bytes_stream().map_err(std::io::Error::other));
        Ok(Box::new(StreamReader::new(stream)))
    }
}
