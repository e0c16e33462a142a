//! Tag-length-value primitives.
//!
//! Every field is `[tag: u8][len: u32 LE][value]`. Integers travel as
//! 8-byte little-endian values; nested records are length-delimited
//! byte fields holding their own field sequence. Readers skip tags they
//! do not know, which is the whole forward-compatibility story.

use beacon_core::errors::NetworkError;

/// Field tags for the request envelope.
pub mod tags {
    pub const PROTOCOL_VERSION: u8 = 0x01;
    pub const API_KEY: u8 = 0x02;
    pub const INSTALL_ID: u8 = 0x03;
    pub const SENT_AT: u8 = 0x04;
    pub const APP_INFO: u8 = 0x05;
    pub const EVENT: u8 = 0x10;

    /// Nested inside [`APP_INFO`].
    pub mod app {
        pub const APP_VERSION: u8 = 0x01;
        pub const OS_NAME: u8 = 0x02;
        pub const OS_VERSION: u8 = 0x03;
        pub const DEVICE_MODEL: u8 = 0x04;
        pub const LOCALE: u8 = 0x05;
    }

    /// Nested inside [`EVENT`].
    pub mod event {
        pub const ID: u8 = 0x01;
        pub const KIND: u8 = 0x02;
        pub const TIMESTAMP: u8 = 0x03;
        pub const SESSION_ID: u8 = 0x04;
        pub const PAYLOAD: u8 = 0x05;
    }
}

// --- encoding ---

pub fn put_bytes(out: &mut Vec<u8>, tag: u8, value: &[u8]) {
    out.push(tag);
    out.extend_from_slice(&(value.len() as u32).to_le_bytes());
    out.extend_from_slice(value);
}

pub fn put_str(out: &mut Vec<u8>, tag: u8, value: &str) {
    put_bytes(out, tag, value.as_bytes());
}

pub fn put_u64(out: &mut Vec<u8>, tag: u8, value: u64) {
    put_bytes(out, tag, &value.to_le_bytes());
}

pub fn put_i64(out: &mut Vec<u8>, tag: u8, value: i64) {
    put_bytes(out, tag, &value.to_le_bytes());
}

// --- decoding ---

/// Iterates the fields of one record. Bounds failures surface as
/// [`NetworkError::MalformedFrame`].
pub struct FieldReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> FieldReader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// Next `(tag, value)` pair, or `None` at end of record.
    pub fn next_field(&mut self) -> Result<Option<(u8, &'a [u8])>, NetworkError> {
        if self.pos == self.buf.len() {
            return Ok(None);
        }
        if self.buf.len() - self.pos < 5 {
            return Err(malformed(format!(
                "truncated field header at offset {}",
                self.pos
            )));
        }

        let tag = self.buf[self.pos];
        let mut len_bytes = [0u8; 4];
        len_bytes.copy_from_slice(&self.buf[self.pos + 1..self.pos + 5]);
        let len = u32::from_le_bytes(len_bytes) as usize;

        let start = self.pos + 5;
        let end = start.checked_add(len).filter(|end| *end <= self.buf.len());
        let end = match end {
            Some(end) => end,
            None => {
                return Err(malformed(format!(
                    "field 0x{tag:02x} claims {len} bytes past end of record"
                )))
            }
        };

        self.pos = end;
        Ok(Some((tag, &self.buf[start..end])))
    }
}

pub fn read_u64(tag: u8, value: &[u8]) -> Result<u64, NetworkError> {
    let bytes: [u8; 8] = value
        .try_into()
        .map_err(|_| malformed(format!("field 0x{tag:02x} is not an 8-byte integer")))?;
    Ok(u64::from_le_bytes(bytes))
}

pub fn read_i64(tag: u8, value: &[u8]) -> Result<i64, NetworkError> {
    let bytes: [u8; 8] = value
        .try_into()
        .map_err(|_| malformed(format!("field 0x{tag:02x} is not an 8-byte integer")))?;
    Ok(i64::from_le_bytes(bytes))
}

pub fn read_str(tag: u8, value: &[u8]) -> Result<String, NetworkError> {
    String::from_utf8(value.to_vec())
        .map_err(|_| malformed(format!("field 0x{tag:02x} is not valid UTF-8")))
}

pub(crate) fn malformed(details: String) -> NetworkError {
    NetworkError::MalformedFrame { details }
}
