use thiserror::Error;

use crate::ResponseCode;

#[derive(Debug, Error)]
pub enum DnsError {
    #[error("invalid domain name {name:?}: {reason}")]
    Encoding { name: String, reason: &'static str },

    #[error("timeout of {0:?} is too large")]
    InvalidTimeout(std::time::Duration),

    #[error("no response from server after {attempts} attempt(s)")]
    TimeoutExceeded { attempts: u32 },

    #[error("malformed message at offset {offset}: {reason}")]
    Malformed { offset: usize, reason: &'static str },

    #[error("{section} record {index}: {source}")]
    InRecord {
        section: &'static str,
        index: usize,
        #[source]
        source: Box<DnsError>,
    },

    #[error("unsupported record type {0}")]
    UnsupportedRecordType(u16),

    #[error("{0}")]
    Server(ResponseCode),

    #[error("response id {actual:#06x} does not match query id {expected:#06x}")]
    IdMismatch { expected: u16, actual: u16 },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl DnsError {
    pub(crate) fn malformed(offset: u64, reason: &'static str) -> Self {
        Self::Malformed {
            offset: offset as usize,
            reason,
        }
    }

    pub(crate) fn encoding(name: &str, reason: &'static str) -> Self {
        Self::Encoding {
            name: name.to_owned(),
            reason,
        }
    }
}
