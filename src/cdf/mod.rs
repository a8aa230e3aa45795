// Copyright 2019-2023 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

//! Model and parser for compressed digit files (CDF): an ASCII header,
//! a NUL pad, then little-endian 64-bit words of packed digits.

use std::fmt;
use std::io::{BufRead, Read as _};

use crate::error::{Error, Result};

/// Size of one packed word in bytes.
pub const WORD_SIZE: usize = 8;

/// The only header version this crate understands.
pub const SUPPORTED_FILE_VERSION: &str = "1.1.0";

/// Radix of a digit file. Only decimal and hexadecimal expansions exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub enum Radix {
    Decimal,
    Hexadecimal,
}

impl Radix {
    pub const fn base(self) -> u32 {
        match self {
            Radix::Decimal => 10,
            Radix::Hexadecimal => 16,
        }
    }

    /// Digits encoded in one 64-bit word: 19 for decimal (`10^19 < 2^64`),
    /// 16 for hexadecimal.
    pub const fn digits_per_word(self) -> u64 {
        match self {
            Radix::Decimal => 19,
            Radix::Hexadecimal => 16,
        }
    }

    pub(crate) const fn cache_slot(self) -> usize {
        match self {
            Radix::Decimal => 0,
            Radix::Hexadecimal => 1,
        }
    }
}

impl TryFrom<u32> for Radix {
    type Error = Error;

    fn try_from(value: u32) -> Result<Self> {
        match value {
            10 => Ok(Radix::Decimal),
            16 => Ok(Radix::Hexadecimal),
            other => Err(Error::BadHeader(format!("unknown radix: {other}"))),
        }
    }
}

impl From<Radix> for u32 {
    fn from(radix: Radix) -> u32 {
        radix.base()
    }
}

impl fmt::Display for Radix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.base())
    }
}

/// Parsed CDF header fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    pub file_version: String,
    pub radix: Radix,
    /// First digits of the expansion including the integer part,
    /// e.g. `3.14159...`. Only the leading digit is ever served from here.
    pub first_digits: String,
    /// Zero unless this file holds fewer digits than `block_size`
    /// (a truncated tail block), in which case it is the total digit count
    /// of the whole result.
    pub total_digits: u64,
    /// Digits per full block.
    pub block_size: u64,
    /// Position of this file in the block sequence, starting at 0.
    pub block_id: u64,
    /// Byte length of the header, up to and including the `EndHeader` line.
    pub length: usize,
}

/// One compressed digit file: header plus its location in the object store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CdfFile {
    pub header: Header,
    /// Object key in the backing bucket.
    pub name: String,
    /// Byte offset of the first packed digit word within the object.
    /// `header.length` plus the blank line and NUL pad that follow it.
    pub first_digit_offset: u64,
}

impl CdfFile {
    /// Parses a CDF header from `reader` and locates the first digit byte.
    ///
    /// The object name is not part of the file format; callers fill it in.
    pub fn parse(mut reader: impl BufRead) -> Result<Self> {
        let header = parse_header(&mut reader)?;

        // A NUL byte separates the header from the first packed word.
        let mut first_digit_offset = header.length as u64;
        loop {
            let mut byte = [0u8; 1];
            let n = reader.read(&mut byte).map_err(|e| {
                Error::BadHeader(format!("reading digit separator: {e}"))
            })?;
            if n == 0 {
                return Err(Error::BadHeader(
                    "unexpected end of file before first digit".into(),
                ));
            }
            first_digit_offset += 1;
            if byte[0] == 0 {
                break;
            }
        }

        Ok(CdfFile {
            header,
            name: String::new(),
            first_digit_offset,
        })
    }

    /// Byte length of this file's packed payload, rounded up to word
    /// alignment.
    pub fn block_byte_length(&self) -> u64 {
        let dpw = self.header.radix.digits_per_word();
        self.header.block_size.div_ceil(dpw) * WORD_SIZE as u64
    }
}

fn read_line(reader: &mut impl BufRead, buf: &mut Vec<u8>) -> Result<usize> {
    buf.clear();
    let n = reader
        .read_until(b'\n', buf)
        .map_err(|e| Error::BadHeader(format!("reading header line: {e}")))?;
    if n == 0 {
        return Err(Error::BadHeader("unexpected end of header".into()));
    }
    Ok(n)
}

fn parse_header(reader: &mut impl BufRead) -> Result<Header> {
    let mut length = 0;
    let mut buf = Vec::new();

    length += read_line(reader, &mut buf)?;
    let first = String::from_utf8_lossy(&buf);
    if first.trim() != "#Compressed Digit File" {
        return Err(Error::BadHeader(format!(
            "first line should be '#Compressed Digit File': {}",
            first.trim()
        )));
    }

    let mut file_version = String::new();
    let mut radix = 0u32;
    let mut first_digits = String::new();
    let mut total_digits = 0u64;
    let mut block_size = 0u64;
    let mut block_id = 0u64;

    loop {
        let n = read_line(reader, &mut buf)?;
        length += n;
        // The delimiter is CRLF, so a blank line is two bytes long.
        if n == 2 {
            continue;
        }
        let line = String::from_utf8_lossy(&buf);
        let (key, value) = match line.split_once(':') {
            Some((key, value)) => (key.trim(), value.trim()),
            None => (line.trim(), ""),
        };
        if key == "EndHeader" {
            break;
        }

        match key {
            "FileVersion" => file_version = value.to_owned(),
            "Base" => radix = parse_value(key, value)?,
            "FirstDigits" => first_digits = value.to_owned(),
            "TotalDigits" => total_digits = parse_value(key, value)?,
            "Blocksize" => block_size = parse_value(key, value)?,
            "BlockID" => block_id = parse_value(key, value)?,
            other => {
                return Err(Error::BadHeader(format!("unknown header key: {other}")));
            }
        }
    }

    if file_version != SUPPORTED_FILE_VERSION {
        return Err(Error::BadHeader(format!(
            "unknown file version: {file_version}"
        )));
    }
    let radix = Radix::try_from(radix)?;

    Ok(Header {
        file_version,
        radix,
        first_digits,
        total_digits,
        block_size,
        block_id,
        length,
    })
}

fn parse_value<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .parse()
        .map_err(|_| Error::BadHeader(format!("invalid value for {key}: {value}")))
}
