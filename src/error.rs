// Copyright 2019-2023 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use thiserror::Error;

/// Errors surfaced by the digit reader stack.
#[derive(Debug, Error)]
pub enum Error {
    /// Malformed or unsupported compressed digit file header.
    #[error("bad digit file header: {0}")]
    BadHeader(String),
    /// Caller-supplied argument out of domain (e.g. negative seek offset).
    #[error("bad argument: {0}")]
    BadArgument(&'static str),
    /// Destination buffer cannot hold the required unpacked digits.
    #[error("buffer too small: required {required} bytes, actual {actual} bytes")]
    BufferTooSmall { required: u64, actual: usize },
    /// A packed word decoded to more digits than fit in one word.
    #[error("invalid word {word:#018x}: decodes to more than {dpw} digits")]
    InvalidWord { word: u64, dpw: u64 },
    /// Upstream produced a byte count that is not a whole number of words.
    #[error("read {0} bytes, not a whole number of words")]
    NotFullWord(usize),
    /// Underlying object store failure.
    #[error("object store: {0}")]
    Transport(#[from] anyhow::Error),
    /// The request was cancelled before the read completed.
    #[error("request cancelled")]
    Cancelled,
    /// End of the digit stream. Consumed at the service layer; a short read
    /// past the tail is a valid response.
    #[error("end of digit stream")]
    Eof,
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

impl Error {
    pub fn is_eof(&self) -> bool {
        matches!(self, Error::Eof)
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        match e.kind() {
            std::io::ErrorKind::UnexpectedEof => Error::Eof,
            std::io::ErrorKind::Interrupted => Error::Cancelled,
            _ => Error::Transport(e.into()),
        }
    }
}
