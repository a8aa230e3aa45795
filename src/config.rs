// Copyright 2019-2023 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::warn;
use url::Url;

use crate::store::http::DEFAULT_ENDPOINT;

/// Service configuration, populated from the environment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Port the HTTP API listens on.
    pub port: u16,
    /// Object-store bucket holding the digit files.
    pub bucket_name: String,
    /// Upper bound on `numberOfDigits` per request.
    pub max_digits_per_request: i64,
    /// Path to the JSON digit file index.
    pub index_path: PathBuf,
    /// Base URL of the object-store HTTP endpoint.
    pub object_store_endpoint: Url,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            port: 8080,
            bucket_name: "pi100t".into(),
            max_digits_per_request: 100_000,
            index_path: "index.json".into(),
            object_store_endpoint: Url::parse(DEFAULT_ENDPOINT).expect("valid default endpoint"),
        }
    }
}

impl Config {
    /// Reads overrides from the environment. Unparsable values are logged
    /// and fall back to the defaults.
    pub fn from_env() -> Self {
        let mut config = Config::default();
        if let Some(port) = env_parse("PORT") {
            config.port = port;
        }
        if let Ok(name) = std::env::var("BUCKET_NAME") {
            config.bucket_name = name;
        }
        if let Some(max) = env_parse("MAX_DIGITS_PER_REQUEST") {
            config.max_digits_per_request = max;
        }
        if let Ok(path) = std::env::var("INDEX_PATH") {
            config.index_path = path.into();
        }
        if let Some(endpoint) = env_parse("OBJECT_STORE_ENDPOINT") {
            config.object_store_endpoint = endpoint;
        }
        config
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    let value = std::env::var(name).ok()?;
    match value.parse() {
        Ok(parsed) => Some(parsed),
        Err(_) => {
            warn!(name, %value, "invalid environment value, using default");
            None
        }
    }
}
