use std::fmt::Display;

use num_derive::FromPrimitive;
use num_traits::cast::FromPrimitive;

use crate::DnsError;

/// The record types this client can query for and decode.
#[derive(FromPrimitive, Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum RecordType {
    A = 1,
    Ns = 2,
    Cname = 5,
    Mx = 15,
}

impl RecordType {
    pub fn to_int(self) -> u16 {
        self as u16
    }
}

impl TryFrom<u16> for RecordType {
    type Error = DnsError;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        Self::from_u16(value).ok_or(DnsError::UnsupportedRecordType(value))
    }
}

impl Display for RecordType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::A => "A",
            Self::Ns => "NS",
            Self::Cname => "CNAME",
            Self::Mx => "MX",
        };
        f.write_str(s)
    }
}
