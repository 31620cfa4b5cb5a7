use std::collections::HashSet;
use std::fmt::Display;
use std::io::Cursor;

use bytes::{BufMut, Bytes, BytesMut};
use itertools::Itertools;
use tracing::trace;

use super::Networkable;
use crate::DnsError;

pub const MAX_LABEL_LEN: usize = 63;
pub const MAX_NAME_LEN: usize = 253;
// Wire form, including length bytes and the terminating zero.
const MAX_WIRE_LEN: usize = 255;

const POINTER_MASK: u8 = 0b1100_0000;

#[derive(Debug, Clone, Default, Hash, PartialEq, Eq)]
pub struct Name {
    pub labels: Vec<String>,
}

impl Name {
    /// Parses a dotted name, enforcing the label and total length limits.
    /// A single trailing dot is accepted; `""` and `"."` are the root.
    pub fn parse(name: &str) -> Result<Self, DnsError> {
        let trimmed = name.strip_suffix('.').unwrap_or(name);
        if trimmed.is_empty() {
            return Ok(Self::default());
        }

        if trimmed.len() > MAX_NAME_LEN {
            return Err(DnsError::encoding(name, "name exceeds 253 bytes"));
        }

        let mut labels = Vec::new();
        for label in trimmed.split('.') {
            if label.is_empty() {
                return Err(DnsError::encoding(name, "empty label"));
            }
            if label.len() > MAX_LABEL_LEN {
                return Err(DnsError::encoding(name, "label exceeds 63 bytes"));
            }
            labels.push(label.to_owned());
        }

        Ok(Self { labels })
    }

    pub fn is_root(&self) -> bool {
        self.labels.is_empty()
    }

    /// Reads a possibly compressed name starting at `offset`.
    ///
    /// Returns the name and the offset just past it in the original position:
    /// after the terminating zero, or after the first pointer followed.
    pub fn read(buf: &[u8], offset: usize) -> Result<(Self, usize), DnsError> {
        let mut labels = Vec::new();
        let mut visited = HashSet::new();
        let mut wire_len = 1;
        let mut pos = offset;
        let mut next = None;

        loop {
            let Some(&len) = buf.get(pos) else {
                return Err(DnsError::malformed(
                    pos as u64,
                    "name runs past end of message",
                ));
            };

            match len & POINTER_MASK {
                POINTER_MASK => {
                    let Some(&low) = buf.get(pos + 1) else {
                        return Err(DnsError::malformed(
                            pos as u64,
                            "truncated compression pointer",
                        ));
                    };

                    if !visited.insert(pos) {
                        return Err(DnsError::malformed(pos as u64, "compression pointer loop"));
                    }

                    let target = (((len & !POINTER_MASK) as usize) << 8) | low as usize;
                    trace!(from = pos, to = target, "following compression pointer");

                    next.get_or_insert(pos + 2);
                    pos = target;
                }
                0 if len == 0 => break,
                0 => {
                    let len = len as usize;
                    let start = pos + 1;
                    let Some(label) = buf.get(start..start + len) else {
                        return Err(DnsError::malformed(
                            pos as u64,
                            "label runs past end of message",
                        ));
                    };

                    wire_len += len + 1;
                    if wire_len > MAX_WIRE_LEN {
                        return Err(DnsError::malformed(pos as u64, "name exceeds 255 bytes"));
                    }

                    labels.push(String::from_utf8_lossy(label).into_owned());
                    pos = start + len;
                }
                _ => {
                    return Err(DnsError::malformed(pos as u64, "reserved label type"));
                }
            }
        }

        Ok((Self { labels }, next.unwrap_or(pos + 1)))
    }
}

impl Display for Name {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_root() {
            return f.write_str(".");
        }

        write!(f, "{}", self.labels.iter().join("."))
    }
}

impl Networkable for Name {
    fn to_bytes(&self) -> Bytes {
        let mut ret = BytesMut::new();

        for label in self.labels.iter() {
            ret.put_u8(label.len() as u8);
            ret.extend_from_slice(label.as_bytes());
        }

        ret.put_u8(0);

        ret.into()
    }

    fn from_bytes(bytes: &mut Cursor<&[u8]>) -> Result<Self, DnsError> {
        let (name, next) = Self::read(bytes.get_ref(), bytes.position() as usize)?;
        bytes.set_position(next as u64);

        Ok(name)
    }
}
